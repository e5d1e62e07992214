/// Token scan record types
///
/// `TokenRecord` is the wire shape shared by the server and the client:
/// camelCase JSON keys, absent attributes omitted.
use serde::{Deserialize, Deserializer, Serialize};

/// One token's scan result, keyed by `address`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenRecord {
    pub address: String,

    // Basic token info
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub symbol: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decimals: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_supply: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creation_time: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age_hours: Option<f64>,

    // Pair info
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pair_address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pair_creation_time: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pair_age_hours: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_token_symbol: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_token_decimals: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reserves_token0: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reserves_token1: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creation_tx: Option<String>,

    // Honeypot analysis
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_honeypot: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gp_is_honeypot: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub honeypot_reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub simulation_success: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub simulation_error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub honeypot_failures: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub risk_level: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub risk_type: Option<String>,

    // Contract info
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contract_verified: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gp_is_open_source: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gp_is_proxy: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gp_is_mintable: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gp_external_call: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_open_source: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_proxy: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_mintable: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub can_be_minted: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub has_proxy_calls: Option<bool>,

    // Tax and gas info
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gp_buy_tax: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gp_sell_tax: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gp_transfer_tax: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gp_estimated_gas: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gp_buy_gas: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gp_sell_gas: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub buy_tax: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sell_tax: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transfer_tax: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub buy_gas: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sell_gas: Option<i64>,

    // Ownership info
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gp_ownership_renounced: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gp_hidden_owner: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gp_can_take_back_ownership: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gp_owner_change_balance: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gp_is_blacklisted: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gp_owner_address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gp_owner_balance: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gp_owner_percent: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gp_creator_balance: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gp_creator_percent: Option<f64>,

    // Security info
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gp_cannot_buy: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gp_cannot_sell_all: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gp_trading_cooldown: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gp_transfer_pausable: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gp_is_anti_whale: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gp_anti_whale_modifiable: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gp_slippage_modifiable: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gp_personal_slippage_modifiable: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gp_is_whitelisted: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gp_self_destruct: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gp_honeypot_with_same_creator: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub safety_score: Option<i64>,

    // Holders and LP info
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gp_holder_count: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gp_top_holder_count: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gp_top_holder_share: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gp_lp_holder_count: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gp_lp_top_holder_count: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gp_lp_top_holder_share: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gp_lp_total_supply: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub liq30: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub holders_changed: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub liquidity_changed: Option<bool>,

    // DEX info
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dex: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub router: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub factory: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gp_dex_info: Option<Vec<DexInfo>>,

    // Additional metadata
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chain: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chain_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deployer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub implementation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_scans: Option<i64>,

    // Liquidity history
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub liquidity_history: Option<Vec<LiquidityPoint>>,

    // Scan info
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_scan: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_update: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scan_count: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scan_timestamp: Option<String>,
}

/// One DEX listing reported by the security API
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DexInfo {
    #[serde(default)]
    pub name: String,
    #[serde(default, deserialize_with = "string_or_number")]
    pub liquidity: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub liquidity_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pair: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct LiquidityPoint {
    pub timestamp: i64,
    pub value: f64,
}

/// Scanners emit liquidity either as `"1234.5"` or `1234.5`
fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        serde_json::Value::Null => Ok(String::new()),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number, got {}",
            other
        ))),
    }
}

/// Overwrite `dst.field` with `src.field` for every field that is present in `src`
macro_rules! merge_present {
    ($dst:ident, $src:ident; $($field:ident),* $(,)?) => {
        $(
            if $src.$field.is_some() {
                $dst.$field = $src.$field;
            }
        )*
    };
}

impl TokenRecord {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            ..Default::default()
        }
    }

    /// Shallow merge: present fields of `update` overwrite, absent ones keep
    /// their current value.
    pub fn merge_from(&mut self, update: TokenRecord) {
        let src = update;
        let dst = self;
        dst.address = src.address;
        merge_present!(dst, src;
            name, symbol, decimals, total_supply, creation_time, age_hours,
            pair_address, pair_creation_time, pair_age_hours, base_token, base_token_symbol,
            base_token_decimals, reserves_token0, reserves_token1, creation_tx,
            is_honeypot, gp_is_honeypot, honeypot_reason, simulation_success, simulation_error,
            honeypot_failures, risk_level, risk_type,
            contract_verified, gp_is_open_source, gp_is_proxy, gp_is_mintable, gp_external_call,
            is_open_source, is_proxy, is_mintable, can_be_minted, has_proxy_calls,
            gp_buy_tax, gp_sell_tax, gp_transfer_tax, gp_estimated_gas, gp_buy_gas, gp_sell_gas,
            buy_tax, sell_tax, transfer_tax, buy_gas, sell_gas,
            gp_ownership_renounced, gp_hidden_owner, gp_can_take_back_ownership,
            gp_owner_change_balance, gp_is_blacklisted, gp_owner_address, gp_owner_balance,
            gp_owner_percent, gp_creator_balance, gp_creator_percent,
            gp_cannot_buy, gp_cannot_sell_all, gp_trading_cooldown, gp_transfer_pausable,
            gp_is_anti_whale, gp_anti_whale_modifiable, gp_slippage_modifiable,
            gp_personal_slippage_modifiable, gp_is_whitelisted, gp_self_destruct,
            gp_honeypot_with_same_creator, safety_score,
            gp_holder_count, gp_top_holder_count, gp_top_holder_share, gp_lp_holder_count,
            gp_lp_top_holder_count, gp_lp_top_holder_share, gp_lp_total_supply, liq30,
            holders_changed, liquidity_changed,
            dex, router, factory, gp_dex_info,
            chain, chain_id, deployer, implementation, total_scans,
            liquidity_history,
            last_scan, last_update, scan_count, scan_timestamp,
        );
    }

    /// Merged copy of `self` with `update` applied
    pub fn merged(&self, update: &TokenRecord) -> TokenRecord {
        let mut merged = self.clone();
        merged.merge_from(update.clone());
        merged
    }

    /// Either honeypot flag set
    pub fn flagged_honeypot(&self) -> bool {
        self.is_honeypot.unwrap_or(false) || self.gp_is_honeypot.unwrap_or(false)
    }

    /// Liquidity of the first DEX listing, 0 when unknown
    pub fn primary_liquidity(&self) -> f64 {
        self.gp_dex_info
            .as_ref()
            .and_then(|dexes| dexes.first())
            .and_then(|dex| dex.liquidity.trim().parse::<f64>().ok())
            .unwrap_or(0.0)
    }

    /// Short label for logs
    pub fn label(&self) -> &str {
        self.symbol.as_deref().unwrap_or(&self.address)
    }
}

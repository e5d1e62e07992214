/// Raw scan rows and their conversion into [`TokenRecord`]
///
/// The scanner writes loosely typed SQLite columns: booleans as 0/1 or text,
/// numbers as text, lists as JSON text. Every accessor here accepts those
/// shapes and reports anything else as a [`RecordMappingError`].
use std::collections::HashMap;

use chrono::{DateTime, NaiveDateTime};
use rusqlite::types::Value;
use serde::de::DeserializeOwned;

use super::types::TokenRecord;
use crate::errors::RecordMappingError;

const DEFAULT_NAME: &str = "Unknown";
const DEFAULT_SYMBOL: &str = "UNKNOWN";
const DEFAULT_DECIMALS: i64 = 18;
const DEFAULT_TOTAL_SUPPLY: &str = "0";

/// Millisecond timestamps are above this, second timestamps below
const MILLIS_THRESHOLD: i64 = 1_000_000_000_000;

/// Largest readable epoch magnitude for REAL timestamp columns (ms up to year ~33000)
const MAX_EPOCH_REAL: f64 = 1e15;

/// Ages beyond this (~114 years) are scanner garbage
const MAX_AGE_HOURS: f64 = 1_000_000.0;

/// One row of `scan_records`, addressed by column name
#[derive(Debug, Clone, Default)]
pub struct ScanRow {
    values: HashMap<String, Value>,
}

impl ScanRow {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from parallel column-name / value lists as read from a statement
    pub fn from_columns(columns: &[String], values: Vec<Value>) -> Self {
        Self {
            values: columns.iter().cloned().zip(values).collect(),
        }
    }

    pub fn with(mut self, column: &str, value: Value) -> Self {
        self.values.insert(column.to_string(), value);
        self
    }

    /// First candidate column holding a non-NULL value
    fn first(&self, columns: &[&'static str]) -> Option<(&'static str, &Value)> {
        columns.iter().find_map(|col| match self.values.get(*col) {
            Some(Value::Null) | None => None,
            Some(value) => Some((*col, value)),
        })
    }

    fn text(&self, columns: &[&'static str]) -> Result<Option<String>, RecordMappingError> {
        let Some((col, value)) = self.first(columns) else {
            return Ok(None);
        };
        match value {
            Value::Text(s) if s.trim().is_empty() => Ok(None),
            Value::Text(s) => Ok(Some(s.clone())),
            Value::Integer(i) => Ok(Some(i.to_string())),
            Value::Real(f) => Ok(Some(f.to_string())),
            Value::Blob(_) => Err(RecordMappingError::invalid(col, "blob where text expected")),
            Value::Null => Ok(None),
        }
    }

    fn int(&self, columns: &[&'static str]) -> Result<Option<i64>, RecordMappingError> {
        let Some((col, value)) = self.first(columns) else {
            return Ok(None);
        };
        match value {
            Value::Integer(i) => Ok(Some(*i)),
            Value::Real(f) => whole_number(col, *f).map(Some),
            Value::Text(s) => {
                let s = s.trim();
                if s.is_empty() {
                    return Ok(None);
                }
                if let Ok(i) = s.parse::<i64>() {
                    return Ok(Some(i));
                }
                let f = s
                    .parse::<f64>()
                    .map_err(|_| RecordMappingError::invalid(col, format!("'{}' is not an integer", s)))?;
                whole_number(col, f).map(Some)
            }
            Value::Blob(_) => Err(RecordMappingError::invalid(col, "blob where integer expected")),
            Value::Null => Ok(None),
        }
    }

    fn float(&self, columns: &[&'static str]) -> Result<Option<f64>, RecordMappingError> {
        let Some((col, value)) = self.first(columns) else {
            return Ok(None);
        };
        match value {
            Value::Integer(i) => Ok(Some(*i as f64)),
            Value::Real(f) => Ok(Some(*f)),
            Value::Text(s) => {
                let s = s.trim();
                if s.is_empty() {
                    return Ok(None);
                }
                s.parse::<f64>()
                    .map(Some)
                    .map_err(|_| RecordMappingError::invalid(col, format!("'{}' is not a number", s)))
            }
            Value::Blob(_) => Err(RecordMappingError::invalid(col, "blob where number expected")),
            Value::Null => Ok(None),
        }
    }

    fn flag(&self, columns: &[&'static str]) -> Result<Option<bool>, RecordMappingError> {
        let Some((col, value)) = self.first(columns) else {
            return Ok(None);
        };
        match value {
            Value::Integer(i) => Ok(Some(*i != 0)),
            Value::Real(f) => Ok(Some(*f != 0.0)),
            Value::Text(s) => match s.trim().to_ascii_lowercase().as_str() {
                "" => Ok(None),
                "1" | "true" | "yes" => Ok(Some(true)),
                "0" | "false" | "no" => Ok(Some(false)),
                other => Err(RecordMappingError::invalid(
                    col,
                    format!("'{}' is not a boolean", other),
                )),
            },
            Value::Blob(_) => Err(RecordMappingError::invalid(col, "blob where boolean expected")),
            Value::Null => Ok(None),
        }
    }

    fn json<T: DeserializeOwned>(
        &self,
        columns: &[&'static str],
    ) -> Result<Option<T>, RecordMappingError> {
        let Some((col, value)) = self.first(columns) else {
            return Ok(None);
        };
        let raw = match value {
            Value::Text(s) if s.trim().is_empty() => return Ok(None),
            Value::Text(s) => s,
            _ => {
                return Err(RecordMappingError::InvalidJson {
                    column: col.to_string(),
                    reason: "expected JSON text".to_string(),
                })
            }
        };
        serde_json::from_str(raw)
            .map(Some)
            .map_err(|e| RecordMappingError::InvalidJson {
                column: col.to_string(),
                reason: e.to_string(),
            })
    }

    /// Scan time in unix seconds, when the timestamp column is readable
    fn scan_time_secs(&self) -> Option<i64> {
        match self.first(&["scan_timestamp"])?.1 {
            Value::Integer(i) => Some(normalize_epoch(*i)),
            Value::Real(f) if f.is_finite() && f.abs() < MAX_EPOCH_REAL => {
                Some(normalize_epoch(*f as i64))
            }
            Value::Text(s) => parse_timestamp_text(s),
            _ => None,
        }
    }
}

fn whole_number(col: &str, f: f64) -> Result<i64, RecordMappingError> {
    if f.is_finite() && f.fract() == 0.0 {
        Ok(f as i64)
    } else {
        Err(RecordMappingError::invalid(col, format!("{} is not a whole number", f)))
    }
}

fn normalize_epoch(raw: i64) -> i64 {
    if raw > MILLIS_THRESHOLD {
        raw / 1000
    } else {
        raw
    }
}

/// Accepts epoch seconds/millis, RFC 3339, and SQLite's `CURRENT_TIMESTAMP` format (UTC)
pub fn parse_timestamp_text(raw: &str) -> Option<i64> {
    let raw = raw.trim();
    if let Ok(epoch) = raw.parse::<i64>() {
        return Some(normalize_epoch(epoch));
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.timestamp());
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
        .ok()
        .map(|dt| dt.and_utc().timestamp())
}

/// Convert one row into a record with the documented fallbacks applied
pub fn map_scan_row(row: &ScanRow) -> Result<TokenRecord, RecordMappingError> {
    let address = row
        .text(&["token_address", "address"])?
        .map(|a| a.trim().to_string())
        .ok_or(RecordMappingError::MissingAddress)?;

    let age_hours = row.float(&["age_hours"])?.unwrap_or(0.0);
    if !(0.0..=MAX_AGE_HOURS).contains(&age_hours) {
        return Err(RecordMappingError::invalid(
            "age_hours",
            format!("{} is outside 0..={}", age_hours, MAX_AGE_HOURS),
        ));
    }
    let creation_time = match row.int(&["creation_time"])? {
        Some(ts) => Some(normalize_epoch(ts)),
        None => match row.scan_time_secs() {
            Some(scan) => Some(
                scan.checked_sub((age_hours * 3600.0).floor() as i64)
                    .ok_or_else(|| {
                        RecordMappingError::invalid("age_hours", "creation time out of range")
                    })?,
            ),
            None => None,
        },
    };

    let mut record = TokenRecord {
        address,
        name: Some(row.text(&["name"])?.unwrap_or_else(|| DEFAULT_NAME.to_string())),
        symbol: Some(row.text(&["symbol"])?.unwrap_or_else(|| DEFAULT_SYMBOL.to_string())),
        decimals: Some(row.int(&["decimals"])?.unwrap_or(DEFAULT_DECIMALS)),
        total_supply: Some(
            row.text(&["total_supply"])?
                .unwrap_or_else(|| DEFAULT_TOTAL_SUPPLY.to_string()),
        ),
        creation_time,
        age_hours: Some(age_hours),

        pair_address: row.text(&["pair_address"])?,
        pair_creation_time: row.int(&["pair_creation_time"])?,
        pair_age_hours: row.float(&["pair_age_hours"])?,
        base_token: row.text(&["base_token"])?,
        base_token_symbol: row.text(&["base_token_symbol"])?,
        base_token_decimals: row.int(&["base_token_decimals"])?,
        reserves_token0: row.text(&["reserves_token0"])?,
        reserves_token1: row.text(&["reserves_token1"])?,
        creation_tx: row.text(&["creation_tx"])?,

        is_honeypot: Some(row.flag(&["is_honeypot"])?.unwrap_or(false)),
        gp_is_honeypot: row.flag(&["gp_is_honeypot"])?,
        honeypot_reason: row.text(&["honeypot_reason"])?,
        simulation_success: row.flag(&["simulation_success"])?,
        simulation_error: row.text(&["simulation_error"])?,
        honeypot_failures: Some(row.int(&["honeypot_failures"])?.unwrap_or(0)),
        risk_level: row.text(&["risk_level"])?,
        risk_type: row.text(&["risk_type"])?,

        contract_verified: row.flag(&["contract_verified"])?,
        gp_is_open_source: Some(
            row.flag(&["gp_is_open_source", "is_open_source"])?
                .unwrap_or(false),
        ),
        gp_is_proxy: Some(row.flag(&["gp_is_proxy", "is_proxy"])?.unwrap_or(false)),
        gp_is_mintable: Some(row.flag(&["gp_is_mintable", "is_mintable"])?.unwrap_or(false)),
        gp_external_call: row.flag(&["gp_external_call"])?,
        is_open_source: row.flag(&["is_open_source"])?,
        is_proxy: row.flag(&["is_proxy"])?,
        is_mintable: row.flag(&["is_mintable"])?,
        can_be_minted: row.flag(&["can_be_minted"])?,
        has_proxy_calls: row.flag(&["has_proxy_calls"])?,

        gp_buy_tax: Some(row.float(&["gp_buy_tax", "buy_tax"])?.unwrap_or(0.0)),
        gp_sell_tax: Some(row.float(&["gp_sell_tax", "sell_tax"])?.unwrap_or(0.0)),
        gp_transfer_tax: row.float(&["gp_transfer_tax", "transfer_tax"])?,
        gp_estimated_gas: row.int(&["gp_estimated_gas"])?,
        gp_buy_gas: row.int(&["gp_buy_gas"])?,
        gp_sell_gas: row.int(&["gp_sell_gas"])?,
        buy_tax: row.float(&["buy_tax"])?,
        sell_tax: row.float(&["sell_tax"])?,
        transfer_tax: row.float(&["transfer_tax"])?,
        buy_gas: row.int(&["buy_gas"])?,
        sell_gas: row.int(&["sell_gas"])?,

        gp_ownership_renounced: row.flag(&["gp_ownership_renounced"])?,
        gp_hidden_owner: row.flag(&["gp_hidden_owner"])?,
        gp_can_take_back_ownership: row.flag(&["gp_can_take_back_ownership"])?,
        gp_owner_change_balance: row.flag(&["gp_owner_change_balance"])?,
        gp_is_blacklisted: row.flag(&["gp_is_blacklisted"])?,
        gp_owner_address: row.text(&["gp_owner_address"])?,
        gp_owner_balance: row.text(&["gp_owner_balance"])?,
        gp_owner_percent: row.float(&["gp_owner_percent"])?,
        gp_creator_balance: row.text(&["gp_creator_balance"])?,
        gp_creator_percent: row.float(&["gp_creator_percent"])?,

        gp_cannot_buy: row.flag(&["gp_cannot_buy"])?,
        gp_cannot_sell_all: row.flag(&["gp_cannot_sell_all"])?,
        gp_trading_cooldown: row.flag(&["gp_trading_cooldown"])?,
        gp_transfer_pausable: row.flag(&["gp_transfer_pausable"])?,
        gp_is_anti_whale: row.flag(&["gp_is_anti_whale"])?,
        gp_anti_whale_modifiable: row.flag(&["gp_anti_whale_modifiable"])?,
        gp_slippage_modifiable: row.flag(&["gp_slippage_modifiable"])?,
        gp_personal_slippage_modifiable: row.flag(&["gp_personal_slippage_modifiable"])?,
        gp_is_whitelisted: row.flag(&["gp_is_whitelisted"])?,
        gp_self_destruct: row.flag(&["gp_self_destruct"])?,
        gp_honeypot_with_same_creator: row.flag(&["gp_honeypot_with_same_creator"])?,
        safety_score: None,

        gp_holder_count: Some(
            row.int(&["gp_holder_count", "holder_count"])?
                .unwrap_or(0),
        ),
        gp_top_holder_count: row.int(&["gp_top_holder_count"])?,
        gp_top_holder_share: row.float(&["gp_top_holder_share"])?,
        gp_lp_holder_count: row.int(&["gp_lp_holder_count"])?,
        gp_lp_top_holder_count: row.int(&["gp_lp_top_holder_count"])?,
        gp_lp_top_holder_share: row.float(&["gp_lp_top_holder_share"])?,
        gp_lp_total_supply: row.text(&["gp_lp_total_supply"])?,
        liq30: row.float(&["liq30"])?,
        holders_changed: None,
        liquidity_changed: None,

        dex: row.text(&["dex"])?,
        router: row.text(&["router"])?,
        factory: row.text(&["factory"])?,
        gp_dex_info: row.json(&["gp_dex_info", "dex_info"])?,

        chain: row.text(&["chain"])?,
        chain_id: row.int(&["chain_id"])?,
        deployer: row.text(&["deployer"])?,
        implementation: row.text(&["implementation"])?,
        total_scans: Some(row.int(&["total_scans"])?.unwrap_or(0)),

        liquidity_history: row.json(&["liquidity_history"])?,

        last_scan: row.int(&["last_scan"])?,
        last_update: row.int(&["last_update"])?,
        scan_count: row.int(&["scan_count"])?,
        scan_timestamp: row.text(&["scan_timestamp"])?,
    };

    record.safety_score = Some(match row.int(&["safety_score"])? {
        Some(score) => score.clamp(0, 100),
        None => derive_safety_score(&record),
    });

    Ok(record)
}

/// Taxes are stored as percents (`5.0` is 5%), the unit the dashboard displays
fn tax_percent(raw: Option<f64>) -> f64 {
    match raw {
        Some(v) if v.is_finite() && v > 0.0 => v.min(100.0),
        _ => 0.0,
    }
}

/// Deterministic 0-100 score: honeypots are 0, every risk flag and tax costs points
pub fn derive_safety_score(record: &TokenRecord) -> i64 {
    if record.flagged_honeypot() {
        return 0;
    }

    let set = |flag: Option<bool>| flag.unwrap_or(false);
    let penalties: [(bool, f64); 16] = [
        (set(record.gp_cannot_buy), 40.0),
        (set(record.gp_cannot_sell_all), 40.0),
        (set(record.gp_honeypot_with_same_creator), 30.0),
        (set(record.gp_self_destruct), 25.0),
        (set(record.gp_hidden_owner), 20.0),
        (set(record.gp_can_take_back_ownership), 20.0),
        (set(record.gp_owner_change_balance), 20.0),
        (record.gp_is_open_source == Some(false), 15.0),
        (set(record.gp_transfer_pausable), 15.0),
        (set(record.gp_is_proxy), 10.0),
        (set(record.gp_is_mintable), 10.0),
        (set(record.gp_is_blacklisted), 10.0),
        (set(record.gp_slippage_modifiable), 10.0),
        (set(record.gp_personal_slippage_modifiable), 10.0),
        (set(record.gp_external_call), 5.0),
        (set(record.gp_trading_cooldown), 5.0),
    ];

    let mut score = 100.0;
    for (hit, penalty) in penalties {
        if hit {
            score -= penalty;
        }
    }

    let taxes = tax_percent(record.gp_buy_tax) + tax_percent(record.gp_sell_tax);
    score -= (taxes * 0.5).min(40.0);

    let failures = record.honeypot_failures.unwrap_or(0).max(0) as f64;
    score -= (failures * 5.0).min(20.0);

    score.clamp(0.0, 100.0).round() as i64
}

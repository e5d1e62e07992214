/// Filtered and sorted views over a [`ClientStore`]
///
/// [`derive_view`] is a pure function of the store contents and the options.
/// [`TokenView`] memoizes it on (store revision, options).
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use super::store::ClientStore;
use crate::records::TokenRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortKey {
    #[default]
    CreationTime,
    Holders,
    /// Liquidity of the first DEX listing
    Liquidity,
    SafetyScore,
    Age,
    /// Total scans
    Records,
}

impl SortKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortKey::CreationTime => "creationTime",
            SortKey::Holders => "holders",
            SortKey::Liquidity => "liquidity",
            SortKey::SafetyScore => "safetyScore",
            SortKey::Age => "age",
            SortKey::Records => "records",
        }
    }

    fn value(&self, record: &TokenRecord) -> f64 {
        match self {
            SortKey::CreationTime => record.creation_time.unwrap_or(0) as f64,
            SortKey::Holders => record.gp_holder_count.unwrap_or(0) as f64,
            SortKey::Liquidity => record.primary_liquidity(),
            SortKey::SafetyScore => record.safety_score.unwrap_or(0) as f64,
            SortKey::Age => record.age_hours.unwrap_or(0.0),
            SortKey::Records => record.total_scans.unwrap_or(0) as f64,
        }
    }
}

impl FromStr for SortKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "creationTime" => Ok(SortKey::CreationTime),
            "holders" => Ok(SortKey::Holders),
            "liquidity" => Ok(SortKey::Liquidity),
            "safetyScore" => Ok(SortKey::SafetyScore),
            "age" => Ok(SortKey::Age),
            "records" => Ok(SortKey::Records),
            other => Err(format!("unknown sort key '{}'", other)),
        }
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    Asc,
    #[default]
    Desc,
}

impl FromStr for SortDirection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "asc" => Ok(SortDirection::Asc),
            "desc" => Ok(SortDirection::Desc),
            other => Err(format!("unknown sort direction '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ViewOptions {
    pub sort_key: SortKey,
    pub direction: SortDirection,
    pub hide_honeypots: bool,
    pub min_holders: Option<i64>,
    /// Case-insensitive match on address, name or symbol; empty matches all
    pub query: String,
}

fn passes_filters(record: &TokenRecord, options: &ViewOptions, query: &str) -> bool {
    if options.hide_honeypots && record.flagged_honeypot() {
        return false;
    }
    if let Some(min) = options.min_holders {
        if record.gp_holder_count.unwrap_or(0) < min {
            return false;
        }
    }
    if query.is_empty() {
        return true;
    }
    let contains = |field: Option<&str>| {
        field
            .map(|v| v.to_lowercase().contains(query))
            .unwrap_or(false)
    };
    contains(Some(record.address.as_str()))
        || contains(record.name.as_deref())
        || contains(record.symbol.as_deref())
}

/// Filter then stable-sort; ties keep store order
pub fn derive_view(tokens: &[TokenRecord], options: &ViewOptions) -> Vec<TokenRecord> {
    let query = options.query.trim().to_lowercase();
    let mut rows: Vec<TokenRecord> = tokens
        .iter()
        .filter(|t| passes_filters(t, options, &query))
        .cloned()
        .collect();

    let key = options.sort_key;
    rows.sort_by(|a, b| {
        let ord = key
            .value(a)
            .partial_cmp(&key.value(b))
            .unwrap_or(Ordering::Equal);
        match options.direction {
            SortDirection::Asc => ord,
            SortDirection::Desc => ord.reverse(),
        }
    });
    rows
}

/// Memoized [`derive_view`]
#[derive(Debug, Default)]
pub struct TokenView {
    cache: Option<(u64, ViewOptions, Vec<TokenRecord>)>,
    computations: usize,
}

impl TokenView {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rows for `options`, recomputed only when the store or the options changed
    pub fn rows(&mut self, store: &ClientStore, options: &ViewOptions) -> &[TokenRecord] {
        let fresh = matches!(
            &self.cache,
            Some((revision, cached, _)) if *revision == store.revision() && cached == options
        );

        if !fresh {
            self.computations += 1;
            let rows = derive_view(store.tokens(), options);
            self.cache = Some((store.revision(), options.clone(), rows));
        }

        match &self.cache {
            Some((_, _, rows)) => rows,
            None => &[],
        }
    }

    /// How many times the view has been recomputed
    pub fn computations(&self) -> usize {
        self.computations
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::webserver::ws::ServerMessage;

    fn token(address: &str, symbol: &str, holders: i64, created: i64) -> TokenRecord {
        let mut record = TokenRecord::new(address);
        record.symbol = Some(symbol.to_string());
        record.gp_holder_count = Some(holders);
        record.creation_time = Some(created);
        record
    }

    fn sample() -> Vec<TokenRecord> {
        let mut honeypot = token("0xccc", "TRAP", 500, 300);
        honeypot.is_honeypot = Some(true);
        vec![
            token("0xaaa", "PEPE", 100, 100),
            token("0xbbb", "DOGE", 50, 200),
            honeypot,
            token("0xddd", "pepe2", 50, 400),
        ]
    }

    fn symbols(rows: &[TokenRecord]) -> Vec<&str> {
        rows.iter().filter_map(|r| r.symbol.as_deref()).collect()
    }

    #[test]
    fn test_default_sort_newest_first() {
        let rows = derive_view(&sample(), &ViewOptions::default());
        assert_eq!(symbols(&rows), vec!["pepe2", "TRAP", "DOGE", "PEPE"]);
    }

    #[test]
    fn test_filters() {
        let options = ViewOptions {
            hide_honeypots: true,
            min_holders: Some(60),
            ..Default::default()
        };
        assert_eq!(symbols(&derive_view(&sample(), &options)), vec!["PEPE"]);

        let options = ViewOptions {
            query: "  Pepe ".to_string(),
            ..Default::default()
        };
        assert_eq!(symbols(&derive_view(&sample(), &options)), vec!["pepe2", "PEPE"]);

        let options = ViewOptions {
            query: "0xBB".to_string(),
            ..Default::default()
        };
        assert_eq!(symbols(&derive_view(&sample(), &options)), vec!["DOGE"]);
    }

    #[test]
    fn test_ties_keep_store_order() {
        let asc = ViewOptions {
            sort_key: SortKey::Holders,
            direction: SortDirection::Asc,
            ..Default::default()
        };
        assert_eq!(
            symbols(&derive_view(&sample(), &asc)),
            vec!["DOGE", "pepe2", "PEPE", "TRAP"]
        );

        let desc = ViewOptions {
            sort_key: SortKey::Holders,
            ..Default::default()
        };
        assert_eq!(
            symbols(&derive_view(&sample(), &desc)),
            vec!["TRAP", "PEPE", "DOGE", "pepe2"]
        );
    }

    #[test]
    fn test_sort_key_parsing() {
        for key in [
            SortKey::CreationTime,
            SortKey::Holders,
            SortKey::Liquidity,
            SortKey::SafetyScore,
            SortKey::Age,
            SortKey::Records,
        ] {
            assert_eq!(key.as_str().parse::<SortKey>(), Ok(key));
        }
        assert!("volume".parse::<SortKey>().is_err());
        assert_eq!("asc".parse::<SortDirection>(), Ok(SortDirection::Asc));
    }

    #[test]
    fn test_view_is_memoized() {
        let mut store = ClientStore::new();
        store.apply(ServerMessage::TokenList(sample()));
        let mut view = TokenView::new();
        let options = ViewOptions::default();

        assert_eq!(view.rows(&store, &options).len(), 4);
        assert_eq!(view.rows(&store, &options).len(), 4);
        assert_eq!(view.computations(), 1);

        store.apply(ServerMessage::TokenRemove("0xaaa".to_string()));
        assert_eq!(view.rows(&store, &options).len(), 3);
        assert_eq!(view.computations(), 2);

        let filtered = ViewOptions {
            hide_honeypots: true,
            ..Default::default()
        };
        assert_eq!(view.rows(&store, &filtered).len(), 2);
        assert_eq!(view.computations(), 3);
    }
}

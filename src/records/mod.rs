//! Token scan records: wire types, row mapping and snapshot sources

pub mod mapping;
pub mod source;
pub mod types;

pub use mapping::{derive_safety_score, map_scan_row, ScanRow};
pub use source::{ScanSource, SqliteScanSource};
pub use types::{DexInfo, LiquidityPoint, TokenRecord};

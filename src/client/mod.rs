//! Dashboard client state
//!
//! - `store`: applies server events to a local ordered copy of the records
//! - `view`: memoized filter/sort over the store

pub mod store;
pub mod view;

pub use store::ClientStore;
pub use view::{derive_view, SortDirection, SortKey, TokenView, ViewOptions};

//! Configuration system
//!
//! - `macros`: `config_struct!` for structs with embedded defaults
//! - `schemas`: the configuration tree
//! - `utils`: loading, CLI overrides, validation and global access

#[macro_use]
pub mod macros;
pub mod schemas;
pub mod utils;

pub use schemas::*;
pub use utils::{
    apply_cli_overrides, load_config, load_config_from_path, validate_config,
    with_config, CONFIG_FILE_PATH,
};

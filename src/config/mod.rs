//! Configuration module for photo-harvest
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//!
//! # Example
//!
//! ```no_run
//! use photo_harvest::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("harvest.toml")).unwrap();
//! println!("Fetch workers: {}", config.harvest.fetch_workers);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{Config, FlickrConfig, HarvestConfig, StoreConfig, DEFAULT_ENDPOINT};

// Re-export parser functions
pub use parser::{
    apply_env_overrides, compute_config_hash, load_config, load_config_with_hash,
    parse_config, API_KEY_ENV,
};
pub use validation::validate;

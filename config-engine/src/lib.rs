//! Layered configuration loading for NextMarket
//!
//! Sources, lowest to highest precedence:
//!
//! - compiled defaults (the target type's `Default` impl)
//! - an optional TOML/YAML/JSON file
//! - environment variables under a prefix, `__` separating sections
//!   (`NEXTMARKET__STORAGE__BUCKET` sets `storage.bucket`)
//!
//! A `.env` file is read into the process environment first when present.
//!
//! # Example
//!
//! ```rust,no_run
//! use config_engine::ConfigLoader;
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Debug, Default, Serialize, Deserialize)]
//! struct AppConfig {
//!     port: u16,
//! }
//!
//! let config: AppConfig = ConfigLoader::new("NEXTMARKET")
//!     .optional_file("nextmarket.toml")
//!     .load()
//!     .unwrap();
//! ```

pub mod error;
pub mod loader;

pub use error::*;
pub use loader::*;

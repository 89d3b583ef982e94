//! Configuration module for loadout
//!
//! Loads config from `$XDG_CONFIG_HOME/loadout/config.toml` or `~/.config/loadout/config.toml`.
//! Falls back to embedded defaults if file doesn't exist.
//! Partial configs are merged with defaults using serde's default attributes.
//!
//! The loaded value is threaded explicitly through `EnvironmentProbe`,
//! `IntegrityCache` and `ModelOrchestrator` construction; there is no
//! process-wide configuration singleton, so multiple independently-configured
//! orchestrators can coexist in one process.
//!
//! # Example
//!
//! ```no_run
//! use loadout::config::Config;
//!
//! let config = Config::load().expect("Failed to load config");
//! println!("Hub root: {}", config.hub.root);
//! println!("Cache bucket: {}", config.cache.bucket);
//! ```

pub mod schema;

pub use schema::{CacheConfig, Config, HubConfig, ProbeConfig};

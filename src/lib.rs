pub mod cache;
pub mod config;
pub mod engine;
pub mod error;
pub mod hub;
pub mod manifest;
pub mod orchestrator;
pub mod probe;
pub mod select;

pub use error::{LoadoutError, Result};

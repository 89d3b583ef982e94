use thiserror::Error;

/// Main error type for Loadout
#[derive(Error, Debug)]
pub enum LoadoutError {
    #[error("Manifest error: {0}\n\nTroubleshooting:\n- Verify the manifest URL is reachable\n- The payload must contain a non-empty \"version\" string and a \"bases\" array")]
    Manifest(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Adapter '{adapter}' targets base '{declared}' but active base is '{active}'")]
    AdapterMismatch {
        adapter: String,
        declared: String,
        active: String,
    },

    #[error("Fetch failed with HTTP {status}: {url}")]
    Fetch { status: u16, url: String },

    #[error("Integrity check failed for {url}: expected sha256 {expected}, got {actual}")]
    Integrity {
        url: String,
        expected: String,
        actual: String,
    },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Config error: {0}\n\nTroubleshooting:\n- Check config file: ~/.config/loadout/config.toml\n- Run with RUST_LOG=debug for more details")]
    Config(String),

    #[error("Engine error: {0}")]
    Engine(String),

    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, LoadoutError>;

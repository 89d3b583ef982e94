pub mod load;
pub mod schema;

pub use load::load_manifest;
pub use schema::{AdapterEntry, BaseEntry, Manifest, Precision, Provider, TokenizerRef, VariantEntry};

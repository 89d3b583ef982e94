use serde::{Deserialize, Serialize};

/// Versioned catalog of base models and their deployable variants.
///
/// Loaded once per orchestrator session and read-only thereafter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Manifest {
    /// e.g. "2025.08.01"
    pub version: String,
    pub bases: Vec<BaseEntry>,
}

/// A logical model family offering multiple deployable variants
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BaseEntry {
    /// e.g. "phi3-mini-4k"
    pub id: String,
    pub tokenizer: TokenizerRef,
    #[serde(default)]
    pub variants: Vec<VariantEntry>,
}

/// Hub repository holding tokenizer files for a base
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenizerRef {
    pub repo: String,
    #[serde(default = "default_rev")]
    pub rev: String,
}

/// A specific precision/accelerator-targeted binary artifact of a base model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VariantEntry {
    /// e.g. "gpu-fp16"
    pub id: String,
    /// Hub repo holding the model blob
    pub repo: String,
    /// Path to the blob within the repo
    pub path: String,
    #[serde(default = "default_rev")]
    pub rev: String,
    pub precision: Precision,
    /// Execution providers this variant targets
    #[serde(default)]
    pub providers: Vec<Provider>,
    pub min_vram_mb: Option<u64>,
    pub max_seq_len: Option<u64>,
    /// Optional integrity check, lowercase hex
    pub sha256: Option<String>,
    /// Optional IO signature hash
    pub graph_signature: Option<String>,
}

impl VariantEntry {
    #[must_use]
    pub fn supports(&self, provider: Provider) -> bool {
        self.providers.contains(&provider)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Precision {
    Fp16,
    Int8,
    Int4,
    #[serde(other)]
    Other,
}

/// Execution path a variant targets. Unknown wire values map to `Other` and
/// never match a capability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    /// Hardware-backed path (wire: "gpu", "webgpu", "cuda")
    #[serde(alias = "webgpu", alias = "cuda")]
    Gpu,
    /// Portable software fallback (wire: "cpu", "wasm")
    #[serde(alias = "wasm")]
    Cpu,
    #[serde(other)]
    Other,
}

/// Adapter artifact declared against a base. The core fetches these and hands
/// them to the engine; it does not process their contents.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdapterEntry {
    pub id: String,
    /// Must reference an existing `BaseEntry::id`
    pub base: String,
    /// Absolute or hub-resolvable URL
    pub url: String,
    pub sha256: Option<String>,
    /// Optional layer names, for downstream validation
    pub targets: Option<Vec<String>>,
    pub format_version: Option<String>,
}

fn default_rev() -> String {
    "main".to_string()
}

impl Manifest {
    /// Find base by exact id
    #[must_use]
    pub fn find_base(&self, id: &str) -> Option<&BaseEntry> {
        self.bases.iter().find(|b| b.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_wire_aliases() {
        let providers: Vec<Provider> =
            serde_json::from_str(r#"["webgpu", "wasm", "cuda", "cpu", "gpu", "npu"]"#).unwrap();
        assert_eq!(
            providers,
            vec![
                Provider::Gpu,
                Provider::Cpu,
                Provider::Gpu,
                Provider::Cpu,
                Provider::Gpu,
                Provider::Other,
            ]
        );
    }

    #[test]
    fn test_precision_unknown_maps_to_other() {
        let p: Precision = serde_json::from_str(r#""bf16""#).unwrap();
        assert_eq!(p, Precision::Other);

        let p: Precision = serde_json::from_str(r#""fp16""#).unwrap();
        assert_eq!(p, Precision::Fp16);
    }

    #[test]
    fn test_variant_defaults() {
        let v: VariantEntry = serde_json::from_str(
            r#"{"id":"v1","repo":"r/r","path":"model.onnx","precision":"int8"}"#,
        )
        .unwrap();

        assert_eq!(v.rev, "main");
        assert!(v.providers.is_empty());
        assert!(v.min_vram_mb.is_none());
        assert!(v.sha256.is_none());
    }

    #[test]
    fn test_find_base() {
        let manifest: Manifest = serde_json::from_str(
            r#"{"version":"1","bases":[{"id":"m1","tokenizer":{"repo":"t/t"}}]}"#,
        )
        .unwrap();

        assert!(manifest.find_base("m1").is_some());
        assert!(manifest.find_base("m2").is_none());
        assert_eq!(manifest.find_base("m1").unwrap().tokenizer.rev, "main");
    }
}

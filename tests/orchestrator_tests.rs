use async_trait::async_trait;
use loadout::cache::{sha256_hex, BlobTransport, TransportResponse};
use loadout::config::{Config, ProbeConfig};
use loadout::engine::{AdapterApply, StubEngine};
use loadout::manifest::AdapterEntry;
use loadout::orchestrator::ModelOrchestrator;
use loadout::{LoadoutError, Result};
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

const HUB: &str = "https://hub.test";
const MANIFEST_URL: &str = "https://hub.test/manifest.json";
const CPU_BLOB: &[u8] = b"cpu model bytes";
const GPU_BLOB: &[u8] = b"gpu model bytes";
const ADAPTER_BLOB: &[u8] = b"adapter bytes";

/// Canned-response transport shared between the orchestrator and the test
#[derive(Clone, Default)]
struct MemoryTransport {
    inner: Arc<TransportInner>,
}

#[derive(Default)]
struct TransportInner {
    responses: Mutex<HashMap<String, (u16, Vec<u8>)>>,
    requests: AtomicUsize,
}

impl MemoryTransport {
    fn serve(&self, url: &str, status: u16, body: &[u8]) {
        self.inner
            .responses
            .lock()
            .unwrap()
            .insert(url.to_string(), (status, body.to_vec()));
    }

    fn request_count(&self) -> usize {
        self.inner.requests.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BlobTransport for MemoryTransport {
    async fn get(&self, url: &str, _auth_token: Option<&str>) -> Result<TransportResponse> {
        self.inner.requests.fetch_add(1, Ordering::SeqCst);
        let (status, body) = self
            .inner
            .responses
            .lock()
            .unwrap()
            .get(url)
            .cloned()
            .unwrap_or((404, Vec::new()));

        Ok(TransportResponse {
            status,
            content_type: Some("application/octet-stream".to_string()),
            body,
        })
    }
}

fn test_config(cache_dir: &Path, accelerator: bool) -> Config {
    let mut config = Config::default();
    config.hub.root = HUB.to_string();
    // Point at an env var nobody sets so token lookup stays inert
    config.hub.token_env = "LOADOUT_TEST_TOKEN".to_string();
    config.cache.dir = Some(cache_dir.to_path_buf());
    config.probe = ProbeConfig {
        accelerator: Some(accelerator),
        threads: Some(4),
        simd: Some(true),
        memory_budget_mb: Some(4096),
    };
    config
}

fn manifest_json() -> String {
    format!(
        r#"{{"version":"1","bases":[{{"id":"m1","tokenizer":{{"repo":"t/t"}},
            "variants":[
              {{"id":"v1","repo":"r/r","path":"model.onnx","precision":"fp16","providers":["wasm"],"sha256":"{}"}},
              {{"id":"v2","repo":"r/r","path":"model-gpu.onnx","precision":"fp16","providers":["webgpu"],"sha256":"{}"}}
            ]}}]}}"#,
        sha256_hex(CPU_BLOB),
        sha256_hex(GPU_BLOB),
    )
}

fn serve_catalog(transport: &MemoryTransport) {
    transport.serve(MANIFEST_URL, 200, manifest_json().as_bytes());
    transport.serve(
        "https://hub.test/r/r/resolve/main/model.onnx?download=1",
        200,
        CPU_BLOB,
    );
    transport.serve(
        "https://hub.test/r/r/resolve/main/model-gpu.onnx?download=1",
        200,
        GPU_BLOB,
    );
}

async fn init_orchestrator(
    cache_dir: &Path,
    accelerator: bool,
) -> (MemoryTransport, ModelOrchestrator<StubEngine, MemoryTransport>) {
    let transport = MemoryTransport::default();
    serve_catalog(&transport);

    let mut orchestrator = ModelOrchestrator::new(
        test_config(cache_dir, accelerator),
        MANIFEST_URL,
        StubEngine,
        transport.clone(),
    )
    .unwrap();
    orchestrator.init().await.unwrap();

    (transport, orchestrator)
}

#[tokio::test]
async fn selects_portable_variant_without_accelerator() {
    let dir = TempDir::new().unwrap();
    let (_transport, mut orchestrator) = init_orchestrator(dir.path(), false).await;

    let variant = orchestrator.use_base("m1", None).await.unwrap();
    assert_eq!(variant.id, "v1");
    assert_eq!(orchestrator.active_base(), Some("m1"));
}

#[tokio::test]
async fn selects_accelerator_variant_when_available() {
    let dir = TempDir::new().unwrap();
    let (_transport, mut orchestrator) = init_orchestrator(dir.path(), true).await;

    let variant = orchestrator.use_base("m1", None).await.unwrap();
    assert_eq!(variant.id, "v2");
}

#[tokio::test]
async fn second_activation_is_served_from_cache() {
    let dir = TempDir::new().unwrap();
    let (transport, mut orchestrator) = init_orchestrator(dir.path(), false).await;

    orchestrator.use_base("m1", None).await.unwrap();
    let after_first = transport.request_count();

    orchestrator.use_base("m1", None).await.unwrap();
    // No new blob request; the verified cache entry satisfied the fetch
    assert_eq!(transport.request_count(), after_first);
}

#[tokio::test]
async fn unknown_base_is_not_found() {
    let dir = TempDir::new().unwrap();
    let (_transport, mut orchestrator) = init_orchestrator(dir.path(), false).await;

    let result = orchestrator.use_base("nope", None).await;
    assert!(matches!(result, Err(LoadoutError::NotFound(_))));
}

#[tokio::test]
async fn unknown_override_variant_is_a_hard_error() {
    let dir = TempDir::new().unwrap();
    let (_transport, mut orchestrator) = init_orchestrator(dir.path(), false).await;

    // No silent fallback to the first variant
    let result = orchestrator.use_base("m1", Some("typo-variant")).await;
    assert!(matches!(result, Err(LoadoutError::NotFound(_))));
    assert_eq!(orchestrator.active_base(), None);
}

#[tokio::test]
async fn override_pins_a_specific_variant() {
    let dir = TempDir::new().unwrap();
    let (_transport, mut orchestrator) = init_orchestrator(dir.path(), false).await;

    // Pin the GPU build even though the profile has no accelerator
    let variant = orchestrator.use_base("m1", Some("v2")).await.unwrap();
    assert_eq!(variant.id, "v2");
}

#[tokio::test]
async fn corrupted_blob_fails_and_leaves_previous_session_untouched() {
    let dir = TempDir::new().unwrap();
    let (transport, mut orchestrator) = init_orchestrator(dir.path(), false).await;

    orchestrator.use_base("m1", None).await.unwrap();

    // Now the hub starts serving tampered bytes for the GPU variant
    transport.serve(
        "https://hub.test/r/r/resolve/main/model-gpu.onnx?download=1",
        200,
        b"tampered bytes",
    );

    let result = orchestrator.use_base("m1", Some("v2")).await;
    assert!(matches!(result, Err(LoadoutError::Integrity { .. })));

    // The earlier session is still the active one
    assert_eq!(orchestrator.active_base(), Some("m1"));
    assert_eq!(orchestrator.run(&[1, 2]).await.unwrap(), vec![1, 2]);
}

#[tokio::test]
async fn manifest_without_version_fails_init() {
    let dir = TempDir::new().unwrap();
    let transport = MemoryTransport::default();
    transport.serve(MANIFEST_URL, 200, br#"{"bases":[]}"#);

    let mut orchestrator = ModelOrchestrator::new(
        test_config(dir.path(), false),
        MANIFEST_URL,
        StubEngine,
        transport,
    )
    .unwrap();

    let result = orchestrator.init().await;
    assert!(matches!(result, Err(LoadoutError::Manifest(_))));
}

#[tokio::test]
async fn unfetchable_manifest_fails_init() {
    let dir = TempDir::new().unwrap();
    let transport = MemoryTransport::default();
    // Nothing served: the manifest URL 404s

    let mut orchestrator = ModelOrchestrator::new(
        test_config(dir.path(), false),
        MANIFEST_URL,
        StubEngine,
        transport,
    )
    .unwrap();

    let result = orchestrator.init().await;
    assert!(matches!(result, Err(LoadoutError::Manifest(_))));
}

#[tokio::test]
async fn adapter_lifecycle() {
    let dir = TempDir::new().unwrap();
    let (transport, mut orchestrator) = init_orchestrator(dir.path(), false).await;
    transport.serve("https://cdn.test/adapter.bin", 200, ADAPTER_BLOB);

    orchestrator.use_base("m1", None).await.unwrap();

    // None means base only
    assert_eq!(
        orchestrator.use_adapter(None).await.unwrap(),
        AdapterApply::Skipped
    );

    // Unknown id fails
    let result = orchestrator.use_adapter(Some("ghost")).await;
    assert!(matches!(result, Err(LoadoutError::NotFound(_))));

    orchestrator
        .register_adapter(AdapterEntry {
            id: "style-a".to_string(),
            base: "m1".to_string(),
            url: "https://cdn.test/adapter.bin".to_string(),
            sha256: None,
            targets: None,
            format_version: None,
        })
        .unwrap();

    // The stub engine cannot patch weights; that is data, not an error
    assert_eq!(
        orchestrator.use_adapter(Some("style-a")).await.unwrap(),
        AdapterApply::Unsupported
    );
}

#[tokio::test]
async fn adapter_against_wrong_base_is_rejected() {
    let dir = TempDir::new().unwrap();
    let (_transport, mut orchestrator) = init_orchestrator(dir.path(), false).await;

    orchestrator.use_base("m1", None).await.unwrap();

    let result = orchestrator.register_adapter(AdapterEntry {
        id: "wrong".to_string(),
        base: "other-base".to_string(),
        url: "https://cdn.test/adapter.bin".to_string(),
        sha256: None,
        targets: None,
        format_version: None,
    });

    match result {
        Err(LoadoutError::AdapterMismatch {
            adapter,
            declared,
            active,
        }) => {
            assert_eq!(adapter, "wrong");
            assert_eq!(declared, "other-base");
            assert_eq!(active, "m1");
        }
        other => panic!("expected AdapterMismatch, got {other:?}"),
    }
}

#[tokio::test]
async fn adapter_registration_requires_active_base() {
    let dir = TempDir::new().unwrap();
    let (_transport, mut orchestrator) = init_orchestrator(dir.path(), false).await;

    let result = orchestrator.register_adapter(AdapterEntry {
        id: "early".to_string(),
        base: "m1".to_string(),
        url: "https://cdn.test/adapter.bin".to_string(),
        sha256: None,
        targets: None,
        format_version: None,
    });
    assert!(matches!(result, Err(LoadoutError::InvalidInput(_))));
}

#[tokio::test]
async fn registering_same_adapter_id_overwrites() {
    let dir = TempDir::new().unwrap();
    let (transport, mut orchestrator) = init_orchestrator(dir.path(), false).await;
    transport.serve("https://cdn.test/adapter-v2.bin", 200, ADAPTER_BLOB);

    orchestrator.use_base("m1", None).await.unwrap();

    let entry = |url: &str| AdapterEntry {
        id: "style-a".to_string(),
        base: "m1".to_string(),
        url: url.to_string(),
        sha256: None,
        targets: None,
        format_version: None,
    };

    orchestrator
        .register_adapter(entry("https://cdn.test/old.bin"))
        .unwrap();
    orchestrator
        .register_adapter(entry("https://cdn.test/adapter-v2.bin"))
        .unwrap();

    // The overwriting registration's URL is the one fetched
    assert_eq!(
        orchestrator.use_adapter(Some("style-a")).await.unwrap(),
        AdapterApply::Unsupported
    );
}

#[tokio::test]
async fn failed_use_adapter_downloads_nothing() {
    let dir = TempDir::new().unwrap();
    let (transport, mut orchestrator) = init_orchestrator(dir.path(), false).await;
    let after_init = transport.request_count();

    // No base activated: the call must fail before any adapter bytes move
    let result = orchestrator.use_adapter(Some("style-a")).await;
    assert!(result.is_err());
    assert_eq!(transport.request_count(), after_init);
}

#[tokio::test]
async fn tokenizer_url_resolves_through_hub() {
    let dir = TempDir::new().unwrap();
    let (_transport, orchestrator) = init_orchestrator(dir.path(), false).await;

    assert_eq!(
        orchestrator.tokenizer_url_for("m1").unwrap(),
        "https://hub.test/t/t/resolve/main/tokenizer.json?download=1"
    );
    assert!(matches!(
        orchestrator.tokenizer_url_for("nope"),
        Err(LoadoutError::NotFound(_))
    ));
}

#[tokio::test]
async fn use_base_before_init_is_invalid() {
    let dir = TempDir::new().unwrap();
    let transport = MemoryTransport::default();
    serve_catalog(&transport);

    let mut orchestrator = ModelOrchestrator::new(
        test_config(dir.path(), false),
        MANIFEST_URL,
        StubEngine,
        transport,
    )
    .unwrap();

    let result = orchestrator.use_base("m1", None).await;
    assert!(matches!(result, Err(LoadoutError::InvalidInput(_))));
}

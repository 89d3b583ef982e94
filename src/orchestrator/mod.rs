//! Model orchestration
//!
//! Composes the manifest, environment probe, selector, and integrity cache,
//! and hands verified blobs to an external inference engine. One orchestrator
//! is one logical session: the manifest and capability profile are loaded
//! once at `init` and held read-only for its lifetime.

use crate::cache::{BlobTransport, HttpTransport, IntegrityCache};
use crate::config::Config;
use crate::engine::{AdapterApply, InferenceEngine};
use crate::error::{LoadoutError, Result};
use crate::hub;
use crate::manifest::{load_manifest, AdapterEntry, Manifest, VariantEntry};
use crate::probe::{CapabilityProfile, EnvironmentProbe};
use crate::select::select_variant;
use std::collections::HashMap;
use std::sync::Arc;

pub struct ModelOrchestrator<E: InferenceEngine, T: BlobTransport = HttpTransport> {
    config: Config,
    manifest_url: String,
    engine: E,
    transport: Arc<T>,
    cache: IntegrityCache<Arc<T>>,
    manifest: Option<Manifest>,
    profile: Option<CapabilityProfile>,
    active_base: Option<String>,
    session: Option<E::Session>,
    adapters: HashMap<String, AdapterEntry>,
}

impl<E: InferenceEngine> ModelOrchestrator<E, HttpTransport> {
    /// Create an orchestrator over the real HTTP transport
    pub fn with_http(config: Config, manifest_url: impl Into<String>, engine: E) -> Result<Self> {
        Self::new(config, manifest_url, engine, HttpTransport::new())
    }
}

impl<E: InferenceEngine, T: BlobTransport> ModelOrchestrator<E, T> {
    /// Create an orchestrator. Call [`init`](Self::init) before use.
    pub fn new(
        config: Config,
        manifest_url: impl Into<String>,
        engine: E,
        transport: T,
    ) -> Result<Self> {
        let transport = Arc::new(transport);
        let cache = IntegrityCache::new(
            &config.cache_dir()?,
            &config.cache.bucket,
            Arc::clone(&transport),
        )?;

        Ok(Self {
            config,
            manifest_url: manifest_url.into(),
            engine,
            transport,
            cache,
            manifest: None,
            profile: None,
            active_base: None,
            session: None,
            adapters: HashMap::new(),
        })
    }

    /// Load and validate the manifest, then probe the environment.
    ///
    /// The manifest is fetched uncached so a new session always sees the
    /// current catalog. The capability profile is computed once here and
    /// never reprobed mid-session.
    pub async fn init(&mut self) -> Result<()> {
        let manifest = load_manifest(self.transport.as_ref(), &self.manifest_url).await?;
        let profile = EnvironmentProbe::new(self.config.probe.clone()).detect();

        self.manifest = Some(manifest);
        self.profile = Some(profile);
        Ok(())
    }

    /// Activate a base model: resolve, fetch, verify, and create a session.
    ///
    /// With `override_variant_id` the named variant is used; an unknown
    /// override id is a hard [`LoadoutError::NotFound`]. Without one the
    /// selector picks the best fit for the probed profile. On any failure the
    /// previous session, if any, is left untouched.
    ///
    /// Returns the chosen variant descriptor.
    pub async fn use_base(
        &mut self,
        base_id: &str,
        override_variant_id: Option<&str>,
    ) -> Result<VariantEntry> {
        let variant = {
            let manifest = self.require_manifest()?;
            let profile = self
                .profile
                .as_ref()
                .ok_or_else(|| LoadoutError::InvalidInput("init() has not been called".to_string()))?;

            let base = manifest.find_base(base_id).ok_or_else(|| {
                LoadoutError::NotFound(format!("Unknown base '{base_id}' in manifest"))
            })?;

            let variant = match override_variant_id {
                Some(id) => base.variants.iter().find(|v| v.id == id).ok_or_else(|| {
                    LoadoutError::NotFound(format!(
                        "Variant '{id}' not found in base '{base_id}'"
                    ))
                })?,
                None => select_variant(profile, &base.variants)?,
            };
            variant.clone()
        };

        tracing::info!(
            base = base_id,
            variant = %variant.id,
            precision = ?variant.precision,
            "activating base"
        );

        let url = hub::variant_url(&self.config.hub.root, &variant);
        let token = self.config.hub_token();
        let bytes = self
            .cache
            .fetch(&url, token.as_deref(), variant.sha256.as_deref())
            .await?;

        let session = self.engine.create_session(&bytes).await?;

        // Commit only after every fallible step succeeded
        self.session = Some(session);
        self.active_base = Some(base_id.to_string());
        Ok(variant)
    }

    /// Register an adapter against the currently active base.
    ///
    /// Overwrites any prior entry with the same id.
    pub fn register_adapter(&mut self, entry: AdapterEntry) -> Result<()> {
        let active = self.active_base.as_deref().ok_or_else(|| {
            LoadoutError::InvalidInput(
                "Cannot register an adapter before a base is active".to_string(),
            )
        })?;

        if entry.base != active {
            return Err(LoadoutError::AdapterMismatch {
                adapter: entry.id,
                declared: entry.base,
                active: active.to_string(),
            });
        }

        self.adapters.insert(entry.id.clone(), entry);
        Ok(())
    }

    /// Apply a registered adapter to the active session.
    ///
    /// `None` is a valid no-op meaning base only. Adapter bytes are fetched
    /// without a hash check; the engine reports whether application is
    /// supported at all.
    pub async fn use_adapter(&mut self, adapter_id: Option<&str>) -> Result<AdapterApply> {
        let Some(id) = adapter_id else {
            return Ok(AdapterApply::Skipped);
        };

        let entry = self
            .adapters
            .get(id)
            .cloned()
            .ok_or_else(|| LoadoutError::NotFound(format!("Unknown adapter '{id}'")))?;

        // Refuse before downloading anything
        if self.session.is_none() {
            return Err(LoadoutError::InvalidInput(
                "No active session to apply an adapter to".to_string(),
            ));
        }

        let url = hub::absolute_url(&self.config.hub.root, &entry.url);
        let token = self.config.hub_token();
        let bytes = self.cache.fetch(&url, token.as_deref(), None).await?;

        let session = self.session.as_mut().ok_or_else(|| {
            LoadoutError::InvalidInput("No active session to apply an adapter to".to_string())
        })?;

        let outcome = self.engine.apply_adapter(session, &bytes).await?;
        match outcome {
            AdapterApply::Unsupported => {
                tracing::warn!(adapter = id, engine = self.engine.engine_name(), "adapter application unsupported");
            }
            _ => tracing::info!(adapter = id, "adapter applied"),
        }
        Ok(outcome)
    }

    /// Run the engine over token ids using the active session
    pub async fn run(&mut self, inputs: &[u32]) -> Result<Vec<u32>> {
        let session = self.session.as_mut().ok_or_else(|| {
            LoadoutError::InvalidInput("No active session; call use_base first".to_string())
        })?;
        self.engine.run(session, inputs).await
    }

    /// Tokenizer.json URL for a base, for wiring an external tokenizer
    pub fn tokenizer_url_for(&self, base_id: &str) -> Result<String> {
        let manifest = self.require_manifest()?;
        let base = manifest.find_base(base_id).ok_or_else(|| {
            LoadoutError::NotFound(format!("Unknown base '{base_id}' in manifest"))
        })?;
        Ok(hub::tokenizer_url(&self.config.hub.root, &base.tokenizer))
    }

    #[must_use]
    pub fn manifest(&self) -> Option<&Manifest> {
        self.manifest.as_ref()
    }

    #[must_use]
    pub fn profile(&self) -> Option<&CapabilityProfile> {
        self.profile.as_ref()
    }

    #[must_use]
    pub fn active_base(&self) -> Option<&str> {
        self.active_base.as_deref()
    }

    fn require_manifest(&self) -> Result<&Manifest> {
        self.manifest
            .as_ref()
            .ok_or_else(|| LoadoutError::InvalidInput("init() has not been called".to_string()))
    }
}

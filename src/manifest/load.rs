use crate::cache::transport::BlobTransport;
use crate::error::{LoadoutError, Result};
use crate::manifest::schema::Manifest;

impl Manifest {
    /// Parse and minimally validate a manifest payload.
    ///
    /// Validation is intentionally shallow: a truthy `version` and a `bases`
    /// array. Deeper shape problems surface later as lookup failures.
    pub fn from_json(payload: &str) -> Result<Self> {
        let manifest: Self = serde_json::from_str(payload)
            .map_err(|e| LoadoutError::Manifest(format!("Invalid manifest format: {e}")))?;

        if manifest.version.is_empty() {
            return Err(LoadoutError::Manifest(
                "Manifest version must be non-empty".to_string(),
            ));
        }

        Ok(manifest)
    }
}

/// Fetch a manifest over HTTP and validate it.
///
/// Manifests are deliberately not routed through the integrity cache: the
/// catalog is expected to move between sessions, and a stale copy would pin
/// clients to old artifacts.
pub async fn load_manifest<T: BlobTransport + ?Sized>(transport: &T, url: &str) -> Result<Manifest> {
    tracing::debug!(url, "loading manifest");

    let response = transport.get(url, None).await?;
    if !response.is_success() {
        return Err(LoadoutError::Manifest(format!(
            "Failed to load manifest ({}): {url}",
            response.status
        )));
    }

    let payload = String::from_utf8(response.body)
        .map_err(|e| LoadoutError::Manifest(format!("Manifest is not valid UTF-8: {e}")))?;

    let manifest = Manifest::from_json(&payload)?;
    tracing::info!(
        version = %manifest.version,
        bases = manifest.bases.len(),
        "manifest loaded"
    );

    Ok(manifest)
}

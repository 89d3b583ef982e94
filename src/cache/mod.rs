//! Integrity-verified fetch cache
//!
//! Content-addressed fetch layer: looks up a persistent bucket by exact URL,
//! validates a hit against an expected sha256 when one is given, falls back
//! to a network fetch, verifies the downloaded bytes, and persists them on
//! success. Cached and freshly-fetched bytes are judged by the same digest
//! function, so a stale or corrupted entry is silently bypassed and healed by
//! re-fetching.
//!
//! Records persist across sessions. There is no eviction policy; callers that
//! manage disk space can remove individual entries with
//! [`IntegrityCache::evict`].

pub mod transport;

pub use transport::{BlobTransport, HttpTransport, TransportResponse};

use crate::error::{LoadoutError, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};

/// Compute the sha256 of a byte buffer as lowercase hex
#[must_use]
pub fn sha256_hex(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}

/// Sidecar metadata persisted next to each cached payload
#[derive(Debug, Clone, Serialize, Deserialize)]
struct CacheRecordMeta {
    url: String,
    content_type: Option<String>,
    sha256: String,
    fetched_at: String,
}

/// URL-keyed persistent cache with sha256 verification.
///
/// Payloads are stored as `{hex(sha256(url))}.bin` with a `.meta.json`
/// sidecar inside the named bucket directory. The URL digest is only a
/// filename-safe key; the content hash is an out-of-band correctness check,
/// not the cache key. Two URLs with identical content are stored twice.
pub struct IntegrityCache<T: BlobTransport> {
    bucket_dir: PathBuf,
    transport: T,
}

impl<T: BlobTransport> IntegrityCache<T> {
    /// Create a cache over `transport`, backed by `{cache_dir}/{bucket}`
    pub fn new(cache_dir: &Path, bucket: &str, transport: T) -> Result<Self> {
        let bucket_dir = cache_dir.join(bucket);
        std::fs::create_dir_all(&bucket_dir)?;

        Ok(Self {
            bucket_dir,
            transport,
        })
    }

    /// Fetch `url`, preferring the cache.
    ///
    /// Protocol:
    /// 1. On a cache hit with no `expected_sha256`, return the cached bytes.
    /// 2. On a hit with a hash, verify; a mismatch is treated as a miss.
    /// 3. On a miss, fetch over the network. Non-2xx fails with
    ///    [`LoadoutError::Fetch`].
    /// 4. Verify fresh bytes when a hash is expected; a mismatch fails with
    ///    [`LoadoutError::Integrity`] and nothing is cached or returned.
    /// 5. Persist and return. A cache-write failure is logged and swallowed;
    ///    the fetched bytes are still returned.
    ///
    /// No retries and no timeouts; callers needing a deadline wrap the call.
    pub async fn fetch(
        &self,
        url: &str,
        auth_token: Option<&str>,
        expected_sha256: Option<&str>,
    ) -> Result<Vec<u8>> {
        if let Some(cached) = self.lookup(url).await {
            match expected_sha256 {
                None => {
                    tracing::debug!(url, "cache hit (unverified)");
                    return Ok(cached);
                }
                Some(expected) if sha256_hex(&cached) == expected => {
                    tracing::debug!(url, "cache hit (verified)");
                    return Ok(cached);
                }
                Some(_) => {
                    // Stale or corrupted entry; recoverable by re-fetching
                    tracing::warn!(url, "cached bytes failed verification, re-fetching");
                }
            }
        }

        tracing::info!(url, "fetching");
        let response = self.transport.get(url, auth_token).await?;

        if !response.is_success() {
            return Err(LoadoutError::Fetch {
                status: response.status,
                url: url.to_string(),
            });
        }

        let digest = sha256_hex(&response.body);
        if let Some(expected) = expected_sha256 {
            if digest != expected {
                return Err(LoadoutError::Integrity {
                    url: url.to_string(),
                    expected: expected.to_string(),
                    actual: digest,
                });
            }
        }

        // Best-effort persistence; the cache is not a correctness dependency
        if let Err(e) = self
            .store(url, response.content_type.as_deref(), &response.body, &digest)
            .await
        {
            tracing::warn!(url, error = %e, "cache write failed, returning bytes anyway");
        }

        Ok(response.body)
    }

    /// Read a cached payload without verification, if present
    pub async fn lookup(&self, url: &str) -> Option<Vec<u8>> {
        tokio::fs::read(self.payload_path(url)).await.ok()
    }

    /// Remove the cached entry for `url`, if any
    pub async fn evict(&self, url: &str) -> Result<()> {
        for path in [self.payload_path(url), self.meta_path(url)] {
            match tokio::fs::remove_file(&path).await {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }

    async fn store(
        &self,
        url: &str,
        content_type: Option<&str>,
        bytes: &[u8],
        digest: &str,
    ) -> Result<()> {
        let payload_path = self.payload_path(url);

        // Write atomically (tmp + rename) so concurrent readers never see a
        // partial payload. Concurrent writers race benignly: last write wins,
        // and every verified write carries identical content anyway.
        let tmp_path = payload_path.with_extension("bin.tmp");
        tokio::fs::write(&tmp_path, bytes).await?;
        tokio::fs::rename(&tmp_path, &payload_path).await?;

        let meta = CacheRecordMeta {
            url: url.to_string(),
            content_type: content_type.map(ToString::to_string),
            sha256: digest.to_string(),
            fetched_at: chrono::Utc::now().to_rfc3339(),
        };
        let meta_json = serde_json::to_string_pretty(&meta)
            .map_err(|e| LoadoutError::Config(format!("Failed to serialize cache record: {e}")))?;
        tokio::fs::write(self.meta_path(url), meta_json).await?;

        tracing::debug!(url, bytes = bytes.len(), "cached");
        Ok(())
    }

    fn payload_path(&self, url: &str) -> PathBuf {
        self.bucket_dir.join(format!("{}.bin", key_for(url)))
    }

    fn meta_path(&self, url: &str) -> PathBuf {
        self.bucket_dir.join(format!("{}.meta.json", key_for(url)))
    }
}

/// Filename-safe key for an exact URL string, query included
fn key_for(url: &str) -> String {
    sha256_hex(url.as_bytes())
}

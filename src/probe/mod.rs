//! Environment probing
//!
//! Produces an immutable [`CapabilityProfile`] describing what the host can
//! run: accelerator availability, CPU threads, SIMD support, and a rough
//! memory budget. Every query is best-effort; anything that fails or is
//! unsupported degrades to a conservative default (`false` / `0`) rather than
//! returning an error.

use crate::config::ProbeConfig;
use std::path::Path;

/// Snapshot of what the current runtime environment supports.
///
/// Computed once per orchestrator session and never reprobed, even if the
/// underlying hardware availability changes mid-session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapabilityProfile {
    pub has_accelerator: bool,
    pub has_portable_runtime: bool,
    pub simd_supported: bool,
    pub thread_count: usize,
    /// Rough budget in MB; 0 when it cannot be estimated. This is a
    /// heuristic, not a guarantee.
    pub approx_memory_budget_mb: u64,
}

/// Probes the host environment for a [`CapabilityProfile`].
pub struct EnvironmentProbe {
    config: ProbeConfig,
}

impl EnvironmentProbe {
    #[must_use]
    pub fn new(config: ProbeConfig) -> Self {
        Self { config }
    }

    /// Detect host capabilities. Never fails.
    ///
    /// Config overrides take precedence over auto-detection, which lets
    /// callers pin a profile for reproducibility or testing.
    #[must_use]
    pub fn detect(&self) -> CapabilityProfile {
        let has_accelerator = self
            .config
            .accelerator
            .unwrap_or_else(detect_accelerator);

        let approx_memory_budget_mb = match self.config.memory_budget_mb {
            Some(mb) => mb,
            None if has_accelerator => accelerator_limit_bytes()
                .map(memory_budget_mb)
                .unwrap_or(0),
            None => 0,
        };

        let thread_count = self.config.threads.unwrap_or_else(detect_threads);
        let simd_supported = self.config.simd.unwrap_or_else(detect_simd);

        let profile = CapabilityProfile {
            has_accelerator,
            // A CPU execution path is always available to this process
            has_portable_runtime: true,
            simd_supported,
            thread_count,
            approx_memory_budget_mb,
        };

        tracing::debug!(?profile, "environment probe complete");
        profile
    }
}

/// Estimate a memory budget from a reported accelerator limit.
///
/// `limit / 1 MiB * 1.5`, rounded to the nearest integer. Accelerators
/// typically report a per-binding limit well below total memory, hence the
/// 1.5 factor.
#[must_use]
#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn memory_budget_mb(limit_bytes: u64) -> u64 {
    (limit_bytes as f64 / 1_048_576.0 * 1.5).round() as u64
}

/// Best-effort accelerator presence check via device nodes.
fn detect_accelerator() -> bool {
    if Path::new("/dev/nvidia0").exists() {
        return true;
    }

    // DRM render nodes cover AMD/Intel GPUs
    std::fs::read_dir("/dev/dri")
        .map(|entries| {
            entries.flatten().any(|e| {
                e.file_name()
                    .to_str()
                    .is_some_and(|n| n.starts_with("renderD"))
            })
        })
        .unwrap_or(false)
}

/// Best-effort accelerator handshake: read a reported memory limit.
///
/// Scans sysfs for a VRAM total (exposed by amdgpu); any failure is
/// swallowed and reported as `None`.
fn accelerator_limit_bytes() -> Option<u64> {
    let entries = std::fs::read_dir("/sys/class/drm").ok()?;

    for entry in entries.flatten() {
        let vram_path = entry.path().join("device/mem_info_vram_total");
        if let Ok(raw) = std::fs::read_to_string(&vram_path) {
            if let Ok(bytes) = raw.trim().parse::<u64>() {
                tracing::debug!(path = %vram_path.display(), bytes, "accelerator limit discovered");
                return Some(bytes);
            }
        }
    }

    None
}

fn detect_threads() -> usize {
    std::thread::available_parallelism()
        .map(std::num::NonZeroUsize::get)
        .unwrap_or(4)
}

fn detect_simd() -> bool {
    #[cfg(target_arch = "x86_64")]
    {
        std::arch::is_x86_feature_detected!("avx2")
            || std::arch::is_x86_feature_detected!("sse4.2")
    }
    #[cfg(target_arch = "aarch64")]
    {
        // NEON is baseline on aarch64
        true
    }
    #[cfg(not(any(target_arch = "x86_64", target_arch = "aarch64")))]
    {
        false
    }
}

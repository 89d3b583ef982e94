//! Variant selection
//!
//! Pure filter-then-score matching of manifest variants against a capability
//! profile. Deterministic, no I/O.

use crate::error::{LoadoutError, Result};
use crate::manifest::{Precision, Provider, VariantEntry};
use crate::probe::CapabilityProfile;
use std::cmp::Reverse;

/// Pick the best-fit variant for `profile`.
///
/// Variants are first filtered to a viable set (provider matches the
/// accelerator situation, memory requirement fits), then every candidate is
/// scored additively. The top-scoring viable variant wins; if nothing is
/// strictly viable, the top-scoring member of the full set is returned so a
/// usable answer always comes back. Ties resolve to whichever variant appears
/// earlier in the manifest.
///
/// An empty `variants` slice is a caller contract violation and fails with
/// [`LoadoutError::InvalidInput`].
pub fn select_variant<'a>(
    profile: &CapabilityProfile,
    variants: &'a [VariantEntry],
) -> Result<&'a VariantEntry> {
    if variants.is_empty() {
        return Err(LoadoutError::InvalidInput(
            "select_variant requires a non-empty variant list".to_string(),
        ));
    }

    let viable: Vec<&VariantEntry> = variants
        .iter()
        .filter(|v| is_viable(profile, v))
        .collect();

    let mut pool = if viable.is_empty() {
        variants.iter().collect::<Vec<_>>()
    } else {
        viable
    };

    // Stable sort keeps manifest order for equal scores
    pool.sort_by_key(|v| Reverse(score(profile, v)));
    Ok(pool[0])
}

fn is_viable(profile: &CapabilityProfile, variant: &VariantEntry) -> bool {
    let provider_ok = if profile.has_accelerator {
        variant.supports(Provider::Gpu)
    } else {
        variant.supports(Provider::Cpu)
    };

    let memory_ok = variant
        .min_vram_mb
        .map_or(true, |required| required <= profile.approx_memory_budget_mb);

    provider_ok && memory_ok
}

fn score(profile: &CapabilityProfile, variant: &VariantEntry) -> u32 {
    let mut s = 0;

    if variant.supports(Provider::Gpu) && profile.has_accelerator {
        s += 100;
    }

    s += match variant.precision {
        Precision::Fp16 => 6,
        Precision::Int8 => 4,
        Precision::Int4 => 2,
        Precision::Other => 0,
    };

    // Unset requirement counts as 0, i.e. always satisfied
    if variant.min_vram_mb.unwrap_or(0) <= profile.approx_memory_budget_mb {
        s += 5;
    }

    s
}

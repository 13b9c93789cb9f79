//! Benchmark workloads for the freestack allocator.
//!
//! Provides deterministic allocation traces for benchmarking:
//!
//! - [`ChurnProfile::reference`]: small requests against a 4 KiB arena
//! - [`ChurnProfile::stress`]: mixed sizes that regularly spill to the fallback
//! - [`churn_workload`]: seeded trace generation
//! - [`replay`]: drive a trace through an allocator and free what is left

#![deny(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

use freestack_arena::{BoundedFreeListAllocator, Fallback};
use rand_chacha::rand_core::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Shape of a generated allocation trace.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChurnProfile {
    /// Arena size in machine words.
    pub arena_words: usize,
    /// Largest single request, in bytes.
    pub max_request: usize,
    /// Number of steps in the trace.
    pub steps: usize,
    /// Out of 100, how often a step frees instead of allocating.
    pub free_percent: u32,
}

impl ChurnProfile {
    /// 512-word arena, requests up to 64 bytes, balanced churn.
    pub fn reference() -> Self {
        Self {
            arena_words: 512,
            max_request: 64,
            steps: 1_000,
            free_percent: 45,
        }
    }

    /// Same arena, requests up to 1 KiB, allocation-heavy.
    pub fn stress() -> Self {
        Self {
            arena_words: 512,
            max_request: 1_024,
            steps: 10_000,
            free_percent: 35,
        }
    }
}

/// One step of an allocation trace.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Step {
    /// Allocate this many bytes.
    Alloc(usize),
    /// Free the live allocation at this index (modulo the live count).
    Free(usize),
}

/// Generate a deterministic trace for `profile` from `seed`.
pub fn churn_workload(profile: &ChurnProfile, seed: u64) -> Vec<Step> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    (0..profile.steps)
        .map(|_| {
            if rng.next_u32() % 100 < profile.free_percent {
                Step::Free(rng.next_u64() as usize)
            } else {
                Step::Alloc(1 + rng.next_u64() as usize % profile.max_request)
            }
        })
        .collect()
}

/// Run `steps` through `alloc`, then free every remaining allocation.
///
/// Returns the peak number of simultaneously live allocations.
pub fn replay<F: Fallback>(alloc: &BoundedFreeListAllocator<'_, u8, F>, steps: &[Step]) -> usize {
    let mut live = Vec::new();
    let mut peak = 0;
    for &step in steps {
        match step {
            Step::Alloc(bytes) => {
                if let Ok(ptr) = alloc.allocate(bytes) {
                    live.push((ptr, bytes));
                    peak = peak.max(live.len());
                }
            }
            Step::Free(i) if !live.is_empty() => {
                let (ptr, bytes) = live.swap_remove(i % live.len());
                free(alloc, ptr, bytes);
            }
            Step::Free(_) => {}
        }
    }
    for (ptr, bytes) in live {
        free(alloc, ptr, bytes);
    }
    peak
}

#[allow(unsafe_code)]
fn free<F: Fallback>(
    alloc: &BoundedFreeListAllocator<'_, u8, F>,
    ptr: std::ptr::NonNull<u8>,
    bytes: usize,
) {
    // SAFETY: every pointer in a replay comes from `alloc` with this count
    // and is freed exactly once.
    unsafe { alloc.deallocate(ptr, bytes) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use freestack_arena::SystemFallback;

    #[test]
    fn workload_is_deterministic() {
        let profile = ChurnProfile::reference();
        assert_eq!(churn_workload(&profile, 42), churn_workload(&profile, 42));
        assert_ne!(churn_workload(&profile, 42), churn_workload(&profile, 43));
    }

    #[test]
    fn requests_respect_profile_bounds() {
        let profile = ChurnProfile::reference();
        let steps = churn_workload(&profile, 7);
        assert_eq!(steps.len(), profile.steps);
        for step in steps {
            if let Step::Alloc(bytes) = step {
                assert!((1..=profile.max_request).contains(&bytes));
            }
        }
    }

    #[test]
    fn replay_returns_arena_to_full_free_bytes() {
        let profile = ChurnProfile::stress();
        let mut buf = vec![0usize; profile.arena_words];
        let alloc = BoundedFreeListAllocator::<u8, _>::new(&mut buf, SystemFallback).unwrap();
        let before = alloc.stats().free_bytes;

        let peak = replay(&alloc, &churn_workload(&profile, 1));
        assert!(peak > 0);

        let stats = alloc.stats();
        assert_eq!(stats.free_bytes, before);
        assert_eq!(stats.arena_allocations, stats.arena_deallocations);
        assert_eq!(stats.fallback_allocations, stats.fallback_deallocations);
        assert!(stats.fallback_allocations > 0);
    }
}

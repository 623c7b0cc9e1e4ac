use rand::{rngs::StdRng, Rng, SeedableRng};
use std::ops::RangeInclusive;
use std::sync::{Mutex, MutexGuard};

/// Source of the engine's random choices
///
/// Page sampling approximates a uniform pick over a remote result set too
/// large to download; candidate choice is uniform among the survivors.
pub trait RandomSource: Send + Sync {
    /// A page number within `range`
    fn page_in(&self, range: RangeInclusive<u32>) -> u32;

    /// An index below `len`; `len` is never zero
    fn index_below(&self, len: usize) -> usize;
}

pub struct SeededRandom {
    rng: Mutex<StdRng>,
}

impl SeededRandom {
    pub fn from_entropy() -> Self {
        Self {
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    fn rng(&self) -> MutexGuard<'_, StdRng> {
        self.rng.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl RandomSource for SeededRandom {
    fn page_in(&self, range: RangeInclusive<u32>) -> u32 {
        if range.is_empty() {
            return *range.start();
        }
        self.rng().gen_range(range)
    }

    fn index_below(&self, len: usize) -> usize {
        if len <= 1 {
            return 0;
        }
        self.rng().gen_range(0..len)
    }
}

use rand::{Rng, SeedableRng, rngs::StdRng};
use std::collections::HashSet;

/// Deals values from `[0, max]` without replacement. Once every value has been
/// dealt the pool refills and a new generation starts.
#[derive(Debug)]
pub struct Sampler {
    max: usize,
    used: HashSet<usize>,
    rng: StdRng,
}

impl Sampler {
    pub fn new(max: usize) -> Self {
        Self::with_rng(max, StdRng::from_os_rng())
    }

    /// Builds a sampler holding `count` distinct values, `[0, count - 1]`.
    pub fn for_deck(count: usize) -> Self {
        Self::new(count.saturating_sub(1))
    }

    pub fn with_seed(max: usize, seed: u64) -> Self {
        Self::with_rng(max, StdRng::seed_from_u64(seed))
    }

    fn with_rng(max: usize, rng: StdRng) -> Self {
        Self {
            max,
            used: HashSet::new(),
            rng,
        }
    }

    /// Values still undealt in the current generation.
    #[cfg(test)]
    fn remaining(&self) -> usize {
        self.max - self.used.len() + 1
    }

    pub fn draw(&mut self) -> usize {
        loop {
            let candidate = self.rng.random_range(0..=self.max);
            if !self.used.insert(candidate) {
                continue;
            }
            if self.used.len() > self.max {
                self.reset();
            }
            return candidate;
        }
    }

    fn reset(&mut self) {
        self.used.clear();
    }
}

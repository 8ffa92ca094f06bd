//! The biased random gate deciding whether a mutation site is used.
//!
//! Mutation operators visit many candidate sites; the sampler keeps the
//! mutant population tractable by letting each site through with a fixed
//! probability. The generator is passed in explicitly so that runs seeded
//! by the orchestrating collaborator are reproducible; this module never
//! seeds anything.

use rand::Rng;

/// Draws an independent biased boolean per candidate mutation site.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RandomSampler {
    percentage: u32,
}

impl RandomSampler {
    /// Create a sampler firing with the given probability, in percent.
    ///
    /// Any percentage not strictly between 0 and 100 is replaced with 100,
    /// i.e. "always mutate". Note that this deliberately includes values
    /// at or below 0 — longstanding observed behavior that callers rely on.
    pub fn new(percentage: i64) -> Self {
        let percentage = if percentage > 0 && percentage < 100 {
            percentage as u32
        } else {
            100
        };
        RandomSampler { percentage }
    }

    /// The effective (clamped) percentage.
    pub fn percentage(&self) -> u32 {
        self.percentage
    }

    /// One independent trial: true with `percentage`% probability.
    ///
    /// Each call draws a fresh uniform integer in [0, 100); there is no
    /// memory across calls.
    pub fn is_mutation_time(&self, rng: &mut impl Rng) -> bool {
        rng.gen_range(0..100u32) < self.percentage
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn in_range_percentage_is_kept() {
        assert_eq!(RandomSampler::new(1).percentage(), 1);
        assert_eq!(RandomSampler::new(50).percentage(), 50);
        assert_eq!(RandomSampler::new(99).percentage(), 99);
    }

    #[test]
    fn out_of_range_percentages_coerce_to_always() {
        assert_eq!(RandomSampler::new(0).percentage(), 100);
        assert_eq!(RandomSampler::new(-5).percentage(), 100);
        assert_eq!(RandomSampler::new(100).percentage(), 100);
        assert_eq!(RandomSampler::new(150).percentage(), 100);
    }

    #[test]
    fn full_percentage_always_fires() {
        let mut rng = StdRng::seed_from_u64(7);
        for sampler in [
            RandomSampler::new(100),
            RandomSampler::new(0),
            RandomSampler::new(150),
        ] {
            for _ in 0..1_000 {
                assert!(sampler.is_mutation_time(&mut rng));
            }
        }
    }

    #[test]
    fn half_percentage_fires_about_half_the_time() {
        let sampler = RandomSampler::new(50);
        let mut rng = StdRng::seed_from_u64(42);
        let trials = 10_000;
        let fired = (0..trials)
            .filter(|_| sampler.is_mutation_time(&mut rng))
            .count();
        // Within a few percent of the expected rate over 10k trials.
        assert!((4_600..=5_400).contains(&fired), "fired {fired} times");
    }

    #[test]
    fn draws_are_reproducible_under_the_same_seed() {
        let sampler = RandomSampler::new(30);
        let mut first = StdRng::seed_from_u64(1234);
        let mut second = StdRng::seed_from_u64(1234);
        let a: Vec<bool> = (0..100)
            .map(|_| sampler.is_mutation_time(&mut first))
            .collect();
        let b: Vec<bool> = (0..100)
            .map(|_| sampler.is_mutation_time(&mut second))
            .collect();
        assert_eq!(a, b);
    }
}

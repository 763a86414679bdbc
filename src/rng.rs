use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// The single random stream behind every stochastic decision
/// made during a training run.
///
/// All randomness is drawn from one seeded [`StdRng`], which makes
/// runs reproducible: the same seed, settings and fitness function
/// yield bit-identical populations. The library never touches
/// `thread_rng`.
pub struct EvolutionRng {
    rng: StdRng,
}

impl EvolutionRng {
    /// Creates a new stream from the given seed.
    pub fn seeded(seed: u64) -> EvolutionRng {
        EvolutionRng {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Returns `true` with probability `chance`.
    ///
    /// A `chance` of 0 is (almost) never successful,
    /// a `chance` of 1 always is.
    pub fn success(&mut self, chance: f32) -> bool {
        self.rng.gen::<f64>() <= chance as f64
    }

    /// Returns a uniformly distributed value in `[min, max)`.
    ///
    /// # Panics
    /// Panics if `min >= max`.
    pub fn range(&mut self, min: f32, max: f32) -> f32 {
        assert!(
            min < max,
            "invalid range [{}, {}), min must be smaller than max",
            min,
            max
        );
        self.rng.gen_range(min..max)
    }

    /// Returns a uniformly distributed index into a
    /// collection of length `len`.
    ///
    /// # Panics
    /// Panics if `len` is zero.
    pub fn index(&mut self, len: usize) -> usize {
        assert!(len > 0, "cannot pick an element from an empty collection");
        self.rng.gen_range(0..len)
    }

    /// Picks a uniformly random element of `items`.
    ///
    /// # Panics
    /// Panics if `items` is empty.
    pub fn pick<'a, T>(&mut self, items: &'a [T]) -> &'a T {
        &items[self.index(items.len())]
    }
}

//! Seeded random stream for the simulation.
//!
//! Every replica seeds the same ChaCha8 generator and draws from it in the
//! same order, so spawn positions and spins agree bit for bit. The generator
//! state is serialized with the world, which lets a rejoining replica resume
//! mid-stream from a snapshot.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

/// Deterministic random source owned by a world.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimRng {
    inner: ChaCha8Rng,
}

impl SimRng {
    pub fn new(seed: u64) -> Self {
        Self {
            inner: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    /// Uniform value in `[0, 1)`.
    pub fn next_f64(&mut self) -> f64 {
        self.inner.gen::<f64>()
    }

    /// Uniform value in `[lo, hi)`.
    pub fn range(&mut self, lo: f64, hi: f64) -> f64 {
        let u = self.next_f64();
        scale_unit(lo, hi, u)
    }

    /// Fair coin flip.
    pub fn coin(&mut self) -> bool {
        self.next_f64() < 0.5
    }
}

/// Maps `u` in `[0, 1)` onto `[lo, hi)`. The product can round up to
/// exactly `hi` when `u` is just below 1; that case folds back to `lo`.
fn scale_unit(lo: f64, hi: f64, u: f64) -> f64 {
    let v = lo + u * (hi - lo);
    if v >= hi {
        lo
    } else {
        v
    }
}

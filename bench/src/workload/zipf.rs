//! Zipfian key generator (Gray et al., "Quickly Generating Billion-Record
//! Synthetic Databases").
//!
//! Draws are O(1) after an O(keyspace) zeta precomputation, so a 2M-op trace
//! over 100K keys costs one pass over the keyspace plus 2M `powf` calls.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Reproducible stream of skewed keys in `[0, keyspace)`
pub struct ZipfGenerator {
    rng: StdRng,
    keyspace: u64,
    spread: f64,
    theta: f64,
    zeta_n: f64,
    alpha: f64,
    eta: f64,
    /// `1 + 0.5^theta`
    second_threshold: f64,
}

impl ZipfGenerator {
    /// `theta` must lie in (0, 1). `keyspace` of 0 is treated as 1.
    pub fn new(keyspace: u64, theta: f64, seed: u64) -> Self {
        let keyspace = keyspace.max(1);
        let spread = keyspace + 1;
        let zeta_2 = zeta(2, theta);
        let zeta_n = zeta(spread, theta);
        let spread = spread as f64;

        Self {
            rng: seeded_rng(seed),
            keyspace,
            spread,
            theta,
            zeta_n,
            alpha: 1.0 / (1.0 - theta),
            eta: (1.0 - (2.0 / spread).powf(1.0 - theta)) / (1.0 - zeta_2 / zeta_n),
            second_threshold: 1.0 + 0.5f64.powf(theta),
        }
    }

    pub fn theta(&self) -> f64 {
        self.theta
    }

    pub fn next_key(&mut self) -> u64 {
        let u: f64 = self.rng.gen();
        let uz = u * self.zeta_n;

        let key = if uz < 1.0 {
            0
        } else if uz < self.second_threshold {
            1
        } else {
            (self.spread * (self.eta * u - self.eta + 1.0).powf(self.alpha)) as u64
        };
        key.min(self.keyspace - 1)
    }
}

impl Iterator for ZipfGenerator {
    type Item = u64;

    fn next(&mut self) -> Option<u64> {
        Some(self.next_key())
    }
}

/// `n` Zipf-distributed keys in `[0, keyspace)`.
///
/// Identical arguments always produce an identical sequence.
pub fn generate_zipf(n: usize, keyspace: u64, theta: f64, seed: u64) -> Vec<u64> {
    ZipfGenerator::new(keyspace, theta, seed).take(n).collect()
}

/// Generalized harmonic number: sum of `i^-theta` for i in 1..=n.
fn zeta(n: u64, theta: f64) -> f64 {
    (1..=n).map(|i| (i as f64).powf(-theta)).sum()
}

/// StdRng keyed by the two-word seed `(seed, seed + 1)`.
fn seeded_rng(seed: u64) -> StdRng {
    let mut bytes = [0u8; 32];
    bytes[..8].copy_from_slice(&seed.to_le_bytes());
    bytes[8..16].copy_from_slice(&seed.wrapping_add(1).to_le_bytes());
    StdRng::from_seed(bytes)
}

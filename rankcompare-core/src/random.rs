use std::cell::RefCell;

use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;

pub trait RandomProvider {
    /// Returns a random u64.
    fn random_u64(&self) -> u64;
}

#[derive(Debug)]
pub struct TrueRandomProvider;

impl TrueRandomProvider {
    pub fn new() -> Self {
        Self {}
    }
}

impl Default for TrueRandomProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl RandomProvider for TrueRandomProvider {
    fn random_u64(&self) -> u64 {
        rand::random()
    }
}

/// A sequential seeded generator. Used on a single thread to hand out sub-seeds before work is dispatched.
#[derive(Debug)]
pub struct DeterministicRandomProvider {
    rand: RefCell<ChaCha8Rng>,
}

impl DeterministicRandomProvider {
    pub fn new(seed: u64) -> Self {
        DeterministicRandomProvider {
            rand: RefCell::new(ChaCha8Rng::seed_from_u64(seed)),
        }
    }
}

impl RandomProvider for DeterministicRandomProvider {
    fn random_u64(&self) -> u64 {
        self.rand.borrow_mut().next_u64()
    }
}

/// The generator of one permutation round.
///
/// Every round reads its own ChaCha stream of the master seed, so the draws of a round depend only on
/// `(seed, round)` and never on which worker runs it or when.
pub fn round_rng(seed: u64, round: usize) -> ChaCha8Rng {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    rng.set_stream(round as u64);
    rng
}

/// Use the given seed, or draw a fresh one. Either way the seed is logged so the run can be repeated.
pub fn resolve_seed(seed: Option<u64>) -> u64 {
    match seed {
        Some(seed) => {
            log::info!("Seed: {}", seed);
            seed
        }
        None => {
            let seed = TrueRandomProvider::new().random_u64();
            log::info!("Seed: {} (drawn, pass it back to reproduce this run)", seed);
            seed
        }
    }
}

#[cfg(test)]
mod tests {
    use rand::Rng;

    use super::*;

    #[test]
    fn deterministic_provider_repeats() {
        let first = DeterministicRandomProvider::new(42);
        let second = DeterministicRandomProvider::new(42);
        let a: Vec<u64> = (0..4).map(|_| first.random_u64()).collect();
        let b: Vec<u64> = (0..4).map(|_| second.random_u64()).collect();
        assert_eq!(a, b);
        assert_ne!(a, (0..4).map(|_| first.random_u64()).collect::<Vec<_>>());
    }

    #[test]
    fn rounds_are_independent_streams() {
        let mut round0 = round_rng(42, 0);
        let mut round0_again = round_rng(42, 0);
        let mut round1 = round_rng(42, 1);

        let a: u64 = round0.gen();
        assert_eq!(a, round0_again.gen::<u64>());
        assert_ne!(a, round1.gen::<u64>());
    }

    #[test]
    fn resolved_seed_is_kept() {
        assert_eq!(resolve_seed(Some(9)), 9);
    }
}

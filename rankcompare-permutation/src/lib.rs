//! Monte Carlo permutation test for the distance between two rankings.
//!
//! Every round shuffles the items of both rankings independently, leaving the weights attached
//! to their positions, and measures the distance between the shuffled rankings. The rounds form
//! the null distribution the observed distance is compared with.
//!
//! Rounds run on a bounded worker pool. Each round draws from its own generator derived from
//! `(seed, round)` and writes to its own slot, so the output is the same for every pool size.

use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};

use rankcompare_core::{
    random::round_rng, ranked_set::shuffled_order, AlignedPair, ComparisonSettings,
    ComputationError, ConfigError, Metric, PValueTail, RankedSet, Result,
};
use rayon::prelude::*;

mod summary;

pub use summary::NullSummary;
use summary::NullTally;

/// Name of the counter of completed permutation rounds.
pub const ROUNDS_COMPLETED_COUNTER: &str = "rankcompare_permutation_rounds_completed";

/// Rounds evaluated between two folds into the tally. Bounds the memory of streamed tests.
const ROUNDS_PER_CHUNK: usize = 4096;

/// Outcome of a permutation test that kept its null distribution.
#[derive(Debug, Clone, PartialEq)]
pub struct PermutationResult {
    pub observed: f64,
    pub pvalue: f64,
    /// One distance per round, in round order.
    pub null_distribution: Vec<f64>,
    pub summary: NullSummary,
}

/// Outcome of a permutation test whose rounds were folded away.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StreamedPermutationResult {
    pub observed: f64,
    pub pvalue: f64,
    pub summary: NullSummary,
}

pub struct PermutationEngine {
    pool: rayon::ThreadPool,
    parallelism: usize,
    tail: PValueTail,
    progress: Option<Arc<AtomicU64>>,
}

impl PermutationEngine {
    /// Build an engine with a pool of `parallelism` workers.
    pub fn new(parallelism: usize, tail: PValueTail) -> Result<Self> {
        if parallelism < 1 {
            return Err(ConfigError::InvalidParallelism(parallelism).into());
        }

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(parallelism)
            .thread_name(|index| format!("rankcompare-worker-{}", index))
            .build()
            .map_err(|err| ConfigError::ThreadPool(err.to_string()))?;

        log::debug!(
            "Permutation engine with {} worker(s), {} tail",
            parallelism,
            tail
        );

        Ok(Self {
            pool,
            parallelism,
            tail,
            progress: None,
        })
    }

    pub fn from_settings(settings: &ComparisonSettings) -> Result<Self> {
        settings.validate()?;
        Self::new(settings.parallelism, settings.pvalue_tail)
    }

    /// Add every completed round to `counter`, for progress reporting.
    pub fn with_progress(mut self, counter: Arc<AtomicU64>) -> Self {
        self.progress = Some(counter);
        self
    }

    /// Rounds completed so far, when a progress counter is attached.
    pub fn rounds_completed(&self) -> Option<u64> {
        self.progress
            .as_ref()
            .map(|progress| progress.load(Ordering::Relaxed))
    }

    pub fn parallelism(&self) -> usize {
        self.parallelism
    }

    pub fn tail(&self) -> PValueTail {
        self.tail
    }

    /// Run `op` inside the worker pool, so its rayon iterators use the pool's workers.
    pub fn install<OP, R>(&self, op: OP) -> R
    where
        OP: FnOnce() -> R + Send,
        R: Send,
    {
        self.pool.install(op)
    }

    /// Permutation test keeping the full null distribution.
    pub fn test(
        &self,
        a: &RankedSet,
        b: &RankedSet,
        metric: Metric,
        niter: usize,
        seed: u64,
    ) -> Result<PermutationResult> {
        validate_iterations(niter)?;
        let pair = AlignedPair::new(a, b)?;
        let observed = metric.distance_aligned(&pair);

        let mut null_distribution = vec![0.0; niter];
        let mut tally = NullTally::default();
        for (chunk_index, slots) in null_distribution.chunks_mut(ROUNDS_PER_CHUNK).enumerate() {
            let first_round = chunk_index * ROUNDS_PER_CHUNK;
            self.fill_rounds(&pair, metric, seed, first_round, slots)?;
            tally.extend(observed, slots);
        }

        let result = PermutationResult {
            observed,
            pvalue: tally.pvalue(self.tail),
            null_distribution,
            summary: tally.summary(observed),
        };
        log_result(a, b, metric, observed, result.pvalue, niter);
        Ok(result)
    }

    /// Permutation test that folds every round into the p-value and summary without keeping it.
    /// Gives the same observed value, p-value and summary as [`PermutationEngine::test`].
    pub fn test_streaming(
        &self,
        a: &RankedSet,
        b: &RankedSet,
        metric: Metric,
        niter: usize,
        seed: u64,
    ) -> Result<StreamedPermutationResult> {
        validate_iterations(niter)?;
        let pair = AlignedPair::new(a, b)?;
        let observed = metric.distance_aligned(&pair);

        let mut buffer = vec![0.0; niter.min(ROUNDS_PER_CHUNK)];
        let mut tally = NullTally::default();
        while tally.rounds() < niter {
            let first_round = tally.rounds();
            let len = (niter - first_round).min(ROUNDS_PER_CHUNK);
            let slots = &mut buffer[..len];
            self.fill_rounds(&pair, metric, seed, first_round, slots)?;
            tally.extend(observed, slots);
        }

        let pvalue = tally.pvalue(self.tail);
        log_result(a, b, metric, observed, pvalue, niter);
        Ok(StreamedPermutationResult {
            observed,
            pvalue,
            summary: tally.summary(observed),
        })
    }

    /// Evaluate rounds `first_round..first_round + slots.len()`, each into its own slot.
    fn fill_rounds(
        &self,
        pair: &AlignedPair,
        metric: Metric,
        seed: u64,
        first_round: usize,
        slots: &mut [f64],
    ) -> Result<()> {
        self.pool.install(|| {
            slots
                .par_iter_mut()
                .enumerate()
                .try_for_each(|(offset, slot)| {
                    *slot = round_distance(pair, metric, seed, first_round + offset)?;
                    Ok::<(), rankcompare_core::RankCompareError>(())
                })
        })?;

        metrics::counter!(ROUNDS_COMPLETED_COUNTER).increment(slots.len() as u64);
        if let Some(progress) = &self.progress {
            progress.fetch_add(slots.len() as u64, Ordering::Relaxed);
        }
        Ok(())
    }
}

/// The distance of one round: both rankings shuffled independently, A first.
fn round_distance(pair: &AlignedPair, metric: Metric, seed: u64, round: usize) -> Result<f64> {
    let mut rng = round_rng(seed, round);
    let order_a = shuffled_order(pair.len(), &mut rng);
    let order_b = shuffled_order(pair.len(), &mut rng);
    let distance = metric.distance_aligned(&pair.reordered(&order_a, &order_b));

    if !distance.is_finite() {
        return Err(ComputationError::NonFiniteDistance {
            round,
            value: distance,
        }
        .into());
    }
    Ok(distance)
}

fn validate_iterations(niter: usize) -> Result<()> {
    if niter < 1 {
        return Err(ConfigError::InvalidIterations(niter).into());
    }
    Ok(())
}

fn log_result(a: &RankedSet, b: &RankedSet, metric: Metric, observed: f64, pvalue: f64, niter: usize) {
    log::debug!(
        "{} vs {}: {} = {}, p-value = {} over {} rounds",
        a.name(),
        b.name(),
        metric,
        observed,
        pvalue,
        niter
    );
}

#[cfg(test)]
mod test;

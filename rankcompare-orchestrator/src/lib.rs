//! Compares every ranking of one table with every ranking of another.

use std::sync::{atomic::AtomicU64, Arc};

use itertools::iproduct;
use rankcompare_core::{
    intersect,
    random::{resolve_seed, DeterministicRandomProvider, RandomProvider},
    table::align_tables,
    AlignmentMode, BatchPolicy, ComparisonSettings, Metric, RankCompareError, RankingTable,
    Result,
};
use rankcompare_permutation::PermutationEngine;
use rayon::prelude::*;

mod results;

pub use results::{ComparisonResult, NullSummaryMatrices, PairFailure};
use results::ComparisonResultBuilder;

pub struct ComparisonOrchestrator {
    settings: ComparisonSettings,
    engine: PermutationEngine,
}

impl ComparisonOrchestrator {
    /// Validate the settings and build the worker pool.
    pub fn new(settings: ComparisonSettings) -> Result<Self> {
        let engine = PermutationEngine::from_settings(&settings)?
            .with_progress(Arc::new(AtomicU64::new(0)));
        Ok(Self { settings, engine })
    }

    /// Use an existing engine, for example one reporting progress.
    /// The engine's worker count and p-value tail take precedence over the settings.
    pub fn with_engine(settings: ComparisonSettings, engine: PermutationEngine) -> Result<Self> {
        settings.validate()?;
        Ok(Self { settings, engine })
    }

    pub fn settings(&self) -> &ComparisonSettings {
        &self.settings
    }

    /// Compare every ranking of `table_a` (rows) with every ranking of `table_b` (columns).
    pub fn compare(
        &self,
        table_a: &RankingTable,
        table_b: &RankingTable,
    ) -> Result<ComparisonResult> {
        let settings = &self.settings;
        let seed = resolve_seed(settings.seed);

        let aligned;
        let (table_a, table_b) = match settings.alignment {
            AlignmentMode::Pairwise => (table_a, table_b),
            AlignmentMode::Shared => {
                aligned = align_tables(table_a, table_b)?;
                (&aligned.0, &aligned.1)
            }
        };

        log::info!(
            "Comparing {} ranking(s) of {:?} with {} ranking(s) of {:?} using the {}",
            table_a.len(),
            table_a.label(),
            table_b.len(),
            table_b.label(),
            settings.metric.description()
        );
        if settings.metric == Metric::EarthMovers {
            let uniform = uniformly_weighted(table_a, table_b);
            if !uniform.is_empty() {
                log::warn!(
                    "{} carry a single weight for every item, the earth mover's distance cannot see their order",
                    uniform.join(", ")
                );
            }
        }

        let pairs: Vec<(usize, usize)> = iproduct!(0..table_a.len(), 0..table_b.len()).collect();

        // Every pair gets its own sub-seed, handed out in row-major order before any work starts.
        let base_random_provider = DeterministicRandomProvider::new(seed);
        let pair_seeds: Vec<u64> = pairs
            .iter()
            .map(|_| base_random_provider.random_u64())
            .collect();

        let mut builder = ComparisonResultBuilder::new(
            settings.metric,
            seed,
            table_a.names(),
            table_b.names(),
            settings.test_mode,
            settings
                .retain_null_distributions
                .then_some(settings.niter),
        );

        if settings.test_mode {
            self.run_tests(table_a, table_b, &pairs, &pair_seeds, &mut builder)?;
        } else {
            self.run_distances(table_a, table_b, &pairs, &mut builder)?;
        }

        let result = builder.build();
        if !result.is_complete() {
            log::warn!(
                "{} of {} pair(s) failed and were left empty",
                result.failures.len(),
                pairs.len()
            );
        }
        Ok(result)
    }

    /// Observed distances only. Pairs are spread over the pool.
    fn run_distances(
        &self,
        table_a: &RankingTable,
        table_b: &RankingTable,
        pairs: &[(usize, usize)],
        builder: &mut ComparisonResultBuilder,
    ) -> Result<()> {
        let metric = self.settings.metric;
        // Collecting an indexed iterator keeps the row-major slot of every pair.
        let outcomes: Vec<Result<f64>> = self.engine.install(|| {
            pairs
                .par_iter()
                .map(|&(row, column)| {
                    let (a, b) =
                        intersect(&table_a.rankings()[row], &table_b.rankings()[column])?;
                    metric.distance(&a, &b)
                })
                .collect()
        });

        for (&(row, column), outcome) in pairs.iter().zip(outcomes) {
            match outcome {
                Ok(distance) => builder.record_distance(row, column, distance),
                Err(err) => self.handle_failure(table_a, table_b, row, column, err, builder)?,
            }
        }
        Ok(())
    }

    /// Full permutation tests. Pairs run one after the other, the rounds of each pair spread over the pool.
    fn run_tests(
        &self,
        table_a: &RankingTable,
        table_b: &RankingTable,
        pairs: &[(usize, usize)],
        pair_seeds: &[u64],
        builder: &mut ComparisonResultBuilder,
    ) -> Result<()> {
        let settings = &self.settings;

        for (index, (&(row, column), &pair_seed)) in pairs.iter().zip(pair_seeds).enumerate() {
            let ranking_a = &table_a.rankings()[row];
            let ranking_b = &table_b.rankings()[column];
            log::info!(
                "[{}/{}] Testing {} against {}",
                index + 1,
                pairs.len(),
                ranking_a.name(),
                ranking_b.name()
            );

            let outcome = intersect(ranking_a, ranking_b).and_then(|(a, b)| {
                if settings.retain_null_distributions {
                    self.engine
                        .test(&a, &b, settings.metric, settings.niter, pair_seed)
                        .map(|result| builder.record_test(row, column, &result))
                } else {
                    self.engine
                        .test_streaming(&a, &b, settings.metric, settings.niter, pair_seed)
                        .map(|result| builder.record_streamed_test(row, column, &result))
                }
            });

            if let Err(err) = outcome {
                self.handle_failure(table_a, table_b, row, column, err, builder)?;
            } else if let Some(rounds) = self.engine.rounds_completed() {
                log::info!(
                    "[{}/{}] Done, {} permutation round(s) so far",
                    index + 1,
                    pairs.len(),
                    rounds
                );
            }
        }
        Ok(())
    }

    /// Apply the batch policy to a failed pair.
    fn handle_failure(
        &self,
        table_a: &RankingTable,
        table_b: &RankingTable,
        row: usize,
        column: usize,
        err: RankCompareError,
        builder: &mut ComparisonResultBuilder,
    ) -> Result<()> {
        let row_name = table_a.rankings()[row].name();
        let column_name = table_b.rankings()[column].name();

        match self.settings.batch_policy {
            BatchPolicy::AbortAll => Err(err.for_pair(row_name, column_name)),
            BatchPolicy::SkipAndReport => {
                log::warn!("Skipping {} against {}: {}", row_name, column_name, err);
                builder.record_failure(row_name, column_name, err);
                Ok(())
            }
        }
    }
}

/// Names of the rankings of both tables whose items all weigh the same.
fn uniformly_weighted<'a>(table_a: &'a RankingTable, table_b: &'a RankingTable) -> Vec<&'a str> {
    table_a
        .iter()
        .chain(table_b.iter())
        .filter(|ranking| ranking.has_uniform_weights())
        .map(|ranking| ranking.name())
        .collect()
}

/// Compare two tables with a one-off orchestrator.
pub fn compare(
    table_a: &RankingTable,
    table_b: &RankingTable,
    settings: ComparisonSettings,
) -> Result<ComparisonResult> {
    ComparisonOrchestrator::new(settings)?.compare(table_a, table_b)
}

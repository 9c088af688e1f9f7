use rankcompare_core::{Matrix, Metric, RankCompareError};
use rankcompare_permutation::{NullSummary, PermutationResult, StreamedPermutationResult};

/// Mean, standard deviation and observed z-score of every cell's null distribution.
#[derive(Debug, Clone, PartialEq)]
pub struct NullSummaryMatrices {
    pub mean: Matrix,
    pub std_dev: Matrix,
    pub z_score: Matrix,
}

/// A pair that failed under [`rankcompare_core::BatchPolicy::SkipAndReport`].
#[derive(Debug)]
pub struct PairFailure {
    pub row: String,
    pub column: String,
    pub error: RankCompareError,
}

/// The comparison of every ranking of one table with every ranking of another.
/// Rows follow the first table's declared order, columns the second's.
#[derive(Debug)]
pub struct ComparisonResult {
    pub metric: Metric,
    /// The master seed the run used, drawn if none was given.
    pub seed: u64,
    pub distances: Matrix,
    /// Present in test mode.
    pub pvalues: Option<Matrix>,
    /// Present in test mode.
    pub null_summaries: Option<NullSummaryMatrices>,
    /// Present in test mode when null distributions are retained. Matrix `k` holds round `k` of every cell.
    pub null_distributions: Option<Vec<Matrix>>,
    /// Only ever filled when failing pairs are skipped.
    pub failures: Vec<PairFailure>,
}

impl ComparisonResult {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// This struct collects per-pair outcomes into pre-sized matrices.
/// This should never be returned to the application, but instead be used `build` to create a `ComparisonResult` struct.
pub(crate) struct ComparisonResultBuilder {
    metric: Metric,
    seed: u64,
    distances: Matrix,
    pvalues: Option<Matrix>,
    null_summaries: Option<NullSummaryMatrices>,
    null_distributions: Option<Vec<Matrix>>,
    failures: Vec<PairFailure>,
}

impl ComparisonResultBuilder {
    /// Every cell starts as NaN, so a skipped pair stays visibly empty.
    pub fn new(
        metric: Metric,
        seed: u64,
        row_names: Vec<String>,
        column_names: Vec<String>,
        test_mode: bool,
        retained_rounds: Option<usize>,
    ) -> Self {
        let empty = || Matrix::filled(row_names.clone(), column_names.clone(), f64::NAN);

        Self {
            metric,
            seed,
            distances: empty(),
            pvalues: test_mode.then(empty),
            null_summaries: test_mode.then(|| NullSummaryMatrices {
                mean: empty(),
                std_dev: empty(),
                z_score: empty(),
            }),
            null_distributions: retained_rounds
                .filter(|_| test_mode)
                .map(|rounds| (0..rounds).map(|_| empty()).collect()),
            failures: Vec::new(),
        }
    }

    pub fn record_distance(&mut self, row: usize, column: usize, distance: f64) {
        self.distances.set(row, column, distance);
    }

    pub fn record_test(&mut self, row: usize, column: usize, result: &PermutationResult) {
        self.record_pvalue(row, column, result.observed, result.pvalue, result.summary);
        if let Some(null_distributions) = &mut self.null_distributions {
            for (matrix, &distance) in null_distributions
                .iter_mut()
                .zip(&result.null_distribution)
            {
                matrix.set(row, column, distance);
            }
        }
    }

    pub fn record_streamed_test(
        &mut self,
        row: usize,
        column: usize,
        result: &StreamedPermutationResult,
    ) {
        self.record_pvalue(row, column, result.observed, result.pvalue, result.summary);
    }

    fn record_pvalue(
        &mut self,
        row: usize,
        column: usize,
        observed: f64,
        pvalue: f64,
        summary: NullSummary,
    ) {
        self.distances.set(row, column, observed);
        if let Some(pvalues) = &mut self.pvalues {
            pvalues.set(row, column, pvalue);
        }
        if let Some(summaries) = &mut self.null_summaries {
            summaries.mean.set(row, column, summary.mean);
            summaries.std_dev.set(row, column, summary.std_dev);
            summaries.z_score.set(row, column, summary.z_score);
        }
    }

    pub fn record_failure(&mut self, row: &str, column: &str, error: RankCompareError) {
        self.failures.push(PairFailure {
            row: row.to_string(),
            column: column.to_string(),
            error,
        });
    }

    pub fn build(self) -> ComparisonResult {
        ComparisonResult {
            metric: self.metric,
            seed: self.seed,
            distances: self.distances,
            pvalues: self.pvalues,
            null_summaries: self.null_summaries,
            null_distributions: self.null_distributions,
            failures: self.failures,
        }
    }
}

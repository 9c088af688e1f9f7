use serde::{Deserialize, Serialize};

use crate::{error::ConfigError, metric::Metric};

/// Which side of the null distribution counts towards the p-value.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Default,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum PValueTail {
    /// Fraction of null distances at or below the observed one.
    /// Small values mean the rankings are more similar than chance.
    #[default]
    Lower,
    /// Fraction of null distances at or above the observed one.
    Upper,
}

/// How the rankings of two tables are restricted to common items.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Default,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum AlignmentMode {
    /// Every pair of rankings is intersected on its own.
    #[default]
    Pairwise,
    /// All rankings of both tables are restricted once to the items they all share.
    Shared,
}

/// What happens to a batch when one pair fails.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Default,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum BatchPolicy {
    /// The first failing pair fails the whole comparison.
    #[default]
    AbortAll,
    /// Failing cells are set to NaN and reported next to the results.
    SkipAndReport,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ComparisonSettings {
    /// The distance used to compare two rankings.
    pub metric: Metric,
    /// The number of permutation rounds per pair of rankings.
    pub niter: usize,
    /// Whether to run the permutation test, or only compute distances.
    pub test_mode: bool,
    /// The master seed. If unset, a seed is drawn and logged.
    pub seed: Option<u64>,
    /// The number of worker threads.
    pub parallelism: usize,
    /// Which side of the null distribution counts towards the p-value.
    pub pvalue_tail: PValueTail,
    /// How rankings are restricted to common items.
    pub alignment: AlignmentMode,
    /// What happens to the batch when a pair fails.
    pub batch_policy: BatchPolicy,
    /// Keep every null distribution instead of only their summaries.
    /// This costs `niter` floats per pair of rankings.
    pub retain_null_distributions: bool,
}

impl Default for ComparisonSettings {
    fn default() -> Self {
        Self {
            metric: Metric::KendallTau,
            niter: 1000,
            test_mode: false,
            seed: None,
            parallelism: 1,
            pvalue_tail: PValueTail::Lower,
            alignment: AlignmentMode::Pairwise,
            batch_policy: BatchPolicy::AbortAll,
            retain_null_distributions: false,
        }
    }
}

impl ComparisonSettings {
    /// Reject settings that cannot run.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.niter < 1 {
            return Err(ConfigError::InvalidIterations(self.niter));
        }
        if self.parallelism < 1 {
            return Err(ConfigError::InvalidParallelism(self.parallelism));
        }
        Ok(())
    }
}

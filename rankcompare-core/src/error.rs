use thiserror::Error;

/// Unified error type for ranking comparisons.
#[derive(Debug, Error)]
pub enum RankCompareError {
    #[error("input error: {0}")]
    Input(#[from] InputError),

    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("computation error: {0}")]
    Computation(#[from] ComputationError),

    /// A single pair of an orchestrated comparison failed.
    #[error("comparing {row:?} with {column:?} failed: {source}")]
    Pair {
        row: String,
        column: String,
        source: Box<RankCompareError>,
    },
}

/// Malformed or empty ranking input.
#[derive(Debug, Error)]
pub enum InputError {
    #[error("malformed input in {origin}: {reason}")]
    Malformed { origin: String, reason: String },

    #[error("rankings {left:?} and {right:?} have no items in common")]
    EmptyIntersection { left: String, right: String },

    #[error("rankings {left:?} and {right:?} are not drawn from the same items")]
    UniverseMismatch { left: String, right: String },

    #[error("ranking name {0:?} is used more than once")]
    DuplicateRanking(String),
}

/// Settings rejected before any computation starts.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("the number of iterations must be at least 1, got {0}")]
    InvalidIterations(usize),

    #[error("the parallelism must be at least 1, got {0}")]
    InvalidParallelism(usize),

    #[error("unknown metric {0:?}, expected one of kt, ktw, emd")]
    UnknownMetric(String),

    #[error("could not build the worker pool: {0}")]
    ThreadPool(String),
}

/// Unexpected failure inside a permutation round.
#[derive(Debug, Error)]
pub enum ComputationError {
    #[error("permutation round {round} produced the non-finite distance {value}")]
    NonFiniteDistance { round: usize, value: f64 },
}

impl RankCompareError {
    pub fn is_input(&self) -> bool {
        match self {
            RankCompareError::Input(_) => true,
            RankCompareError::Pair { source, .. } => source.is_input(),
            _ => false,
        }
    }

    pub fn is_config(&self) -> bool {
        matches!(self, RankCompareError::Config(_))
    }

    pub fn is_computation(&self) -> bool {
        match self {
            RankCompareError::Computation(_) => true,
            RankCompareError::Pair { source, .. } => source.is_computation(),
            _ => false,
        }
    }

    /// Attach the ranking names of the pair that produced this error.
    pub fn for_pair(self, row: &str, column: &str) -> Self {
        RankCompareError::Pair {
            row: row.to_string(),
            column: column.to_string(),
            source: Box::new(self),
        }
    }
}

pub type Result<T> = std::result::Result<T, RankCompareError>;

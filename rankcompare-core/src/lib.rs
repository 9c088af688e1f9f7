//! Rankings, ranking distances and the settings shared by the permutation engine and the orchestrator.

mod error;
pub mod matrix;
pub mod metric;
pub mod random;
pub mod ranked_set;
pub mod settings;
pub mod table;

pub use error::{ComputationError, ConfigError, InputError, RankCompareError, Result};
pub use matrix::Matrix;
pub use metric::{AlignedPair, Metric};
pub use ranked_set::{intersect, Item, RankedSet};
pub use settings::{AlignmentMode, BatchPolicy, ComparisonSettings, PValueTail};
pub use table::RankingTable;

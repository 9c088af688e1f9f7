use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::{
    error::{ConfigError, InputError, Result},
    ranked_set::RankedSet,
};

/// The distance between two rankings over the same items.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Default,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
    strum::EnumIs,
)]
pub enum Metric {
    /// Share of item pairs ordered differently by the two rankings.
    #[default]
    #[serde(rename = "kt")]
    #[strum(serialize = "kt")]
    KendallTau,
    /// Kendall tau distance where pairs of heavy items count more.
    #[serde(rename = "ktw")]
    #[strum(serialize = "ktw")]
    WeightedKendallTau,
    /// Earth mover's distance between the weight distributions over rank position.
    #[serde(rename = "emd")]
    #[strum(serialize = "emd")]
    EarthMovers,
}

impl Metric {
    pub fn from_name(name: &str) -> std::result::Result<Self, ConfigError> {
        name.parse()
            .map_err(|_| ConfigError::UnknownMetric(name.to_string()))
    }

    pub fn description(&self) -> &'static str {
        match self {
            Metric::KendallTau => "Kendall tau distance",
            Metric::WeightedKendallTau => "weighted Kendall tau distance",
            Metric::EarthMovers => "earth mover's distance",
        }
    }

    /// Whether the metric always lies in `[0, 1]`.
    /// The earth mover's distance has no fixed range, so plots should not assume one.
    pub fn is_bounded(&self) -> bool {
        !self.is_earth_movers()
    }

    /// Distance between two ranked sets drawn from the same items.
    pub fn distance(&self, a: &RankedSet, b: &RankedSet) -> Result<f64> {
        Ok(self.distance_aligned(&AlignedPair::new(a, b)?))
    }

    pub fn distance_aligned(&self, pair: &AlignedPair) -> f64 {
        match self {
            Metric::KendallTau => kendall_tau::normalised_inversions(&pair.positions_b),
            Metric::WeightedKendallTau => {
                kendall_tau::weighted_kendall_tau(&pair.positions_b, &pair.item_weights())
            }
            Metric::EarthMovers => earth_movers_distance(pair),
        }
    }
}

/// Two rankings over the same items, reduced to positions and weights.
///
/// Items are indexed by their position in the first ranking. `positions_b[i]` is the position
/// of that item in the second ranking. Weights stay indexed by their own ranking's positions.
#[derive(Debug, Clone, PartialEq)]
pub struct AlignedPair {
    positions_b: Vec<usize>,
    weights_a: Vec<f64>,
    weights_b: Vec<f64>,
}

impl AlignedPair {
    /// Align two ranked sets. Both must contain exactly the same items.
    pub fn new(a: &RankedSet, b: &RankedSet) -> Result<Self> {
        let mismatch = || InputError::UniverseMismatch {
            left: a.name().to_string(),
            right: b.name().to_string(),
        };

        if a.len() != b.len() {
            return Err(mismatch().into());
        }

        let b_positions: HashMap<&str, usize> = b
            .items()
            .iter()
            .enumerate()
            .map(|(position, item)| (item.as_str(), position))
            .collect();

        let positions_b = a
            .items()
            .iter()
            .map(|item| b_positions.get(item.as_str()).copied())
            .collect::<Option<Vec<usize>>>()
            .ok_or_else(mismatch)?;

        Ok(Self {
            positions_b,
            weights_a: a.weights().to_vec(),
            weights_b: b.weights().to_vec(),
        })
    }

    pub fn len(&self) -> usize {
        self.positions_b.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions_b.is_empty()
    }

    /// The pair obtained by reordering the items of both rankings while weights stay at their positions.
    ///
    /// `order_a[p]` is the current position in the first ranking of the item moved to position `p`,
    /// likewise for `order_b`. This matches [`RankedSet::reordered`] applied to both sides.
    pub fn reordered(&self, order_a: &[usize], order_b: &[usize]) -> Self {
        let n = self.len();
        assert!(order_a.len() == n && order_b.len() == n);

        let mut new_position_b = vec![0; n];
        for (new_position, &old_position) in order_b.iter().enumerate() {
            new_position_b[old_position] = new_position;
        }

        Self {
            positions_b: order_a
                .iter()
                .map(|&old_a| new_position_b[self.positions_b[old_a]])
                .collect(),
            weights_a: self.weights_a.clone(),
            weights_b: self.weights_b.clone(),
        }
    }

    /// Combined weight of every item: the mean of its weights in both rankings.
    fn item_weights(&self) -> Vec<f64> {
        self.positions_b
            .iter()
            .zip(&self.weights_a)
            .map(|(&position_b, &weight_a)| (weight_a + self.weights_b[position_b]) / 2.0)
            .collect()
    }
}

/// Scale weights to sum to one. A set without weight is spread uniformly.
fn normalised(weights: &[f64]) -> Vec<f64> {
    let total: f64 = weights.iter().sum();
    if total > 0.0 {
        weights.iter().map(|weight| weight / total).collect()
    } else {
        vec![1.0 / weights.len() as f64; weights.len()]
    }
}

/// One dimensional earth mover's distance over the normalised position axis `p / (n - 1)`.
///
/// A ranking's weights, placed at its own positions, are compared with the same item weights
/// placed at the positions the other ranking gives those items. The distance of each
/// direction is the integral of the absolute difference of the two cumulative distributions,
/// and the metric is the mean of both directions, which makes it symmetric.
fn earth_movers_distance(pair: &AlignedPair) -> f64 {
    let n = pair.len();
    if n < 2 {
        return 0.0;
    }

    let weights_a = normalised(&pair.weights_a);
    let weights_b = normalised(&pair.weights_b);

    let mut a_at_b = vec![0.0; n];
    let mut b_at_a = vec![0.0; n];
    for (position_a, &position_b) in pair.positions_b.iter().enumerate() {
        a_at_b[position_b] = weights_a[position_a];
        b_at_a[position_a] = weights_b[position_b];
    }

    (cumulative_distance(&weights_a, &a_at_b) + cumulative_distance(&weights_b, &b_at_a)) / 2.0
}

/// Integral of `|F_p - F_q|` for two distributions on the evenly spaced grid over `[0, 1]`.
fn cumulative_distance(p: &[f64], q: &[f64]) -> f64 {
    let step = 1.0 / (p.len() - 1) as f64;
    let mut cumulative_p = 0.0;
    let mut cumulative_q = 0.0;
    let mut distance = 0.0;
    // The last grid point closes both distributions, so it adds nothing.
    for (mass_p, mass_q) in p.iter().zip(q).take(p.len() - 1) {
        cumulative_p += mass_p;
        cumulative_q += mass_q;
        distance += (cumulative_p - cumulative_q).abs() * step;
    }
    distance
}

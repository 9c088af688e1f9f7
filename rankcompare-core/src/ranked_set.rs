use std::collections::HashSet;

use itertools::Itertools;
use rand::{seq::SliceRandom, Rng};

use crate::error::{InputError, Result};

/// An opaque identifier of a ranked entity, compared by exact string match.
pub type Item = String;

/// An ordered, weighted list of unique items. Position 0 is the most central item.
///
/// Weights belong to positions: shuffling or reversing a set moves the items
/// and leaves the weight sequence untouched.
#[derive(Debug, Clone, PartialEq)]
pub struct RankedSet {
    name: String,
    items: Vec<Item>,
    weights: Vec<f64>,
}

impl RankedSet {
    /// Create a ranked set from `(item, weight)` pairs in rank order.
    ///
    /// The set must be non-empty, its items unique and its weights finite and non-negative.
    pub fn new(name: impl Into<String>, entries: Vec<(Item, f64)>) -> Result<Self> {
        let name = name.into();
        let malformed = |reason: String| InputError::Malformed {
            origin: format!("ranking {:?}", name),
            reason,
        };

        if entries.is_empty() {
            return Err(malformed("ranking is empty".to_string()).into());
        }
        if let Some((item, weight)) = entries
            .iter()
            .find(|(_, weight)| !weight.is_finite() || *weight < 0.0)
        {
            return Err(malformed(format!(
                "item {:?} has weight {}, weights must be finite and non-negative",
                item, weight
            ))
            .into());
        }
        if let Some(item) = entries.iter().map(|(item, _)| item).duplicates().next() {
            return Err(malformed(format!("item {:?} appears more than once", item)).into());
        }

        let (items, weights) = entries.into_iter().unzip();
        Ok(Self {
            name,
            items,
            weights,
        })
    }

    /// Convenience constructor for rankings without meaningful weights.
    pub fn unweighted<I, S>(name: impl Into<String>, items: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<Item>,
    {
        Self::new(
            name,
            items.into_iter().map(|item| (item.into(), 1.0)).collect(),
        )
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Always false for a constructed set, kept for API symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn items(&self) -> &[Item] {
        &self.items
    }

    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    /// True when every item carries the same weight, as for [`RankedSet::unweighted`] sets.
    pub fn has_uniform_weights(&self) -> bool {
        self.weights.iter().all_equal()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.items
            .iter()
            .map(String::as_str)
            .zip(self.weights.iter().copied())
    }

    pub fn contains(&self, item: &str) -> bool {
        self.items.iter().any(|own| own == item)
    }

    pub fn item_set(&self) -> HashSet<&str> {
        self.items.iter().map(String::as_str).collect()
    }

    /// Keep only the items in `keep`, preserving their relative order and weights.
    pub fn restrict_to<S>(&self, keep: &HashSet<S>) -> Result<Self>
    where
        S: std::borrow::Borrow<str> + std::hash::Hash + Eq,
    {
        let (items, weights): (Vec<Item>, Vec<f64>) = self
            .iter()
            .filter(|(item, _)| keep.contains(*item))
            .map(|(item, weight)| (item.to_string(), weight))
            .unzip();

        if items.is_empty() {
            return Err(InputError::EmptyIntersection {
                left: self.name.clone(),
                right: "the shared item universe".to_string(),
            }
            .into());
        }

        Ok(Self {
            name: self.name.clone(),
            items,
            weights,
        })
    }

    /// A private copy with its items reordered by `order`, where `order[p]` is the
    /// current position of the item that moves to position `p`. Weights stay in place.
    pub fn reordered(&self, order: &[usize]) -> Self {
        assert_eq!(order.len(), self.len(), "Order must cover every position");
        Self {
            name: self.name.clone(),
            items: order.iter().map(|&p| self.items[p].clone()).collect(),
            weights: self.weights.clone(),
        }
    }

    /// A private copy with uniformly shuffled items. Weights stay attached to positions.
    pub fn shuffled<R: Rng + ?Sized>(&self, rng: &mut R) -> Self {
        self.reordered(&shuffled_order(self.len(), rng))
    }

    /// A private copy with the item order reversed. Weights stay attached to positions.
    pub fn reversed(&self) -> Self {
        let order: Vec<usize> = (0..self.len()).rev().collect();
        self.reordered(&order)
    }
}

/// Draw a uniformly random order of `0..len`.
///
/// The draws only depend on `len`, so shuffling an index order and shuffling the items
/// themselves consume the generator identically.
pub fn shuffled_order<R: Rng + ?Sized>(len: usize, rng: &mut R) -> Vec<usize> {
    let mut order: Vec<usize> = (0..len).collect();
    order.shuffle(rng);
    order
}

/// Restrict two ranked sets to the items present in both.
///
/// Each side keeps its own relative order and weights, so the result is commutative in item set
/// but not in order. An empty intersection is an error.
pub fn intersect(a: &RankedSet, b: &RankedSet) -> Result<(RankedSet, RankedSet)> {
    let a_items = a.item_set();
    let b_items = b.item_set();
    let common: HashSet<&str> = a_items.intersection(&b_items).copied().collect();

    if common.is_empty() {
        return Err(InputError::EmptyIntersection {
            left: a.name.clone(),
            right: b.name.clone(),
        }
        .into());
    }

    log::trace!(
        "Intersection of {:?} ({}) and {:?} ({}) keeps {} items",
        a.name,
        a.len(),
        b.name,
        b.len(),
        common.len()
    );

    Ok((a.restrict_to(&common)?, b.restrict_to(&common)?))
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use test_log::test;

    use super::*;

    fn set(name: &str, entries: &[(&str, f64)]) -> RankedSet {
        RankedSet::new(
            name,
            entries
                .iter()
                .map(|(item, weight)| (item.to_string(), *weight))
                .collect(),
        )
        .unwrap()
    }

    #[test]
    fn rejects_malformed_sets() {
        assert!(RankedSet::new("empty", vec![]).unwrap_err().is_input());
        assert!(RankedSet::new("negative", vec![("x".into(), -1.0)])
            .unwrap_err()
            .is_input());
        assert!(RankedSet::new("nan", vec![("x".into(), f64::NAN)])
            .unwrap_err()
            .is_input());
        assert!(
            RankedSet::new("dup", vec![("x".into(), 1.0), ("x".into(), 0.5)])
                .unwrap_err()
                .is_input()
        );
    }

    #[test]
    fn uniform_weights_are_detected() {
        assert!(RankedSet::unweighted("u", ["x", "y", "z"]).unwrap().has_uniform_weights());
        assert!(set("single", &[("x", 0.3)]).has_uniform_weights());
        assert!(set("flat", &[("x", 2.0), ("y", 2.0)]).has_uniform_weights());
        assert!(!set("graded", &[("x", 2.0), ("y", 1.0), ("z", 1.0)]).has_uniform_weights());
    }

    #[test]
    fn intersection_keeps_each_sides_order() {
        let a = set("a", &[("w", 2.0), ("x", 1.0), ("y", 0.8), ("z", 0.5)]);
        let b = set("b", &[("z", 0.9), ("q", 0.7), ("x", 1.0), ("y", 0.2)]);

        let (a2, b2) = intersect(&a, &b).unwrap();
        assert_eq!(a2.items(), &["x", "y", "z"]);
        assert_eq!(a2.weights(), &[1.0, 0.8, 0.5]);
        assert_eq!(b2.items(), &["z", "x", "y"]);
        assert_eq!(b2.weights(), &[0.9, 1.0, 0.2]);
        assert_eq!(a2.name(), "a");

        let (b3, a3) = intersect(&b, &a).unwrap();
        assert_eq!(a3, a2);
        assert_eq!(b3, b2);
    }

    #[test]
    fn intersection_is_idempotent() {
        let a = set("a", &[("w", 2.0), ("x", 1.0), ("y", 0.8), ("z", 0.5)]);
        let b = set("b", &[("z", 0.9), ("q", 0.7), ("x", 1.0)]);

        let (once, _) = intersect(&a, &b).unwrap();
        let (twice, _) = intersect(&once, &b).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn empty_intersection_is_an_error() {
        let a = set("a", &[("x", 1.0)]);
        let b = set("b", &[("y", 1.0)]);
        let err = intersect(&a, &b).unwrap_err();
        assert!(err.is_input());
        assert!(err.to_string().contains("\"a\""));
        assert!(err.to_string().contains("\"b\""));
    }

    #[test]
    fn shuffling_moves_items_but_not_weights() {
        let a = set("a", &[("v", 5.0), ("w", 4.0), ("x", 3.0), ("y", 2.0), ("z", 1.0)]);
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let shuffled = a.shuffled(&mut rng);

        assert_eq!(shuffled.weights(), a.weights());
        let mut items = shuffled.items().to_vec();
        items.sort();
        assert_eq!(items, a.items());

        let reversed = a.reversed();
        assert_eq!(reversed.items(), &["z", "y", "x", "w", "v"]);
        assert_eq!(reversed.weights(), a.weights());
    }
}

use std::collections::HashSet;

use itertools::Itertools;

use crate::{
    error::{InputError, Result},
    ranked_set::{Item, RankedSet},
};

/// Named rankings in declared order. The order defines matrix rows and columns.
#[derive(Debug, Clone, PartialEq)]
pub struct RankingTable {
    label: String,
    rankings: Vec<RankedSet>,
}

impl RankingTable {
    /// `label` names the table in error messages, usually the file it was read from.
    pub fn new(label: impl Into<String>, rankings: Vec<RankedSet>) -> Result<Self> {
        let label = label.into();
        if rankings.is_empty() {
            return Err(InputError::Malformed {
                origin: label,
                reason: "table has no rankings".to_string(),
            }
            .into());
        }
        if let Some(name) = rankings.iter().map(RankedSet::name).duplicates().next() {
            return Err(InputError::DuplicateRanking(name.to_string()).into());
        }
        Ok(Self { label, rankings })
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn len(&self) -> usize {
        self.rankings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rankings.is_empty()
    }

    pub fn names(&self) -> Vec<String> {
        self.rankings
            .iter()
            .map(|ranking| ranking.name().to_string())
            .collect()
    }

    pub fn get(&self, name: &str) -> Option<&RankedSet> {
        self.rankings.iter().find(|ranking| ranking.name() == name)
    }

    pub fn rankings(&self) -> &[RankedSet] {
        &self.rankings
    }

    pub fn iter(&self) -> impl Iterator<Item = &RankedSet> {
        self.rankings.iter()
    }

    /// Items present in every ranking of the table.
    pub fn common_items(&self) -> HashSet<Item> {
        let mut rankings = self.rankings.iter();
        let Some(first) = rankings.next() else {
            return HashSet::new();
        };
        let mut common: HashSet<Item> = first.items().iter().cloned().collect();
        for ranking in rankings {
            common.retain(|item| ranking.contains(item));
        }
        common
    }

    /// Restrict every ranking to `keep`.
    pub fn restrict_to(&self, keep: &HashSet<Item>) -> Result<Self> {
        Ok(Self {
            label: self.label.clone(),
            rankings: self
                .rankings
                .iter()
                .map(|ranking| ranking.restrict_to(keep))
                .collect::<Result<_>>()?,
        })
    }
}

/// Restrict both tables to the items shared by every ranking of both.
pub fn align_tables(a: &RankingTable, b: &RankingTable) -> Result<(RankingTable, RankingTable)> {
    let b_items = b.common_items();
    let shared: HashSet<Item> = a
        .common_items()
        .into_iter()
        .filter(|item| b_items.contains(item))
        .collect();

    if shared.is_empty() {
        return Err(InputError::EmptyIntersection {
            left: a.label.clone(),
            right: b.label.clone(),
        }
        .into());
    }

    log::debug!(
        "Tables {:?} and {:?} share {} items",
        a.label,
        b.label,
        shared.len()
    );

    Ok((a.restrict_to(&shared)?, b.restrict_to(&shared)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(label: &str, rankings: &[(&str, &[&str])]) -> RankingTable {
        RankingTable::new(
            label,
            rankings
                .iter()
                .map(|(name, items)| RankedSet::unweighted(*name, items.iter().copied()).unwrap())
                .collect(),
        )
        .unwrap()
    }

    #[test]
    fn rejects_duplicate_names_and_empty_tables() {
        let ranking = RankedSet::unweighted("r", ["x"]).unwrap();
        let err = RankingTable::new("t", vec![ranking.clone(), ranking]).unwrap_err();
        assert!(err.is_input());
        assert!(RankingTable::new("t", vec![]).unwrap_err().is_input());
    }

    #[test]
    fn aligned_tables_share_one_universe() {
        let a = table("a", &[("a1", &["w", "x", "y", "z"]), ("a2", &["z", "y", "x"])]);
        let b = table("b", &[("b1", &["y", "x", "q", "z"])]);

        let (a, b) = align_tables(&a, &b).unwrap();
        assert_eq!(a.get("a1").unwrap().items(), &["x", "y", "z"]);
        assert_eq!(a.get("a2").unwrap().items(), &["z", "y", "x"]);
        assert_eq!(b.get("b1").unwrap().items(), &["y", "x", "z"]);
        assert_eq!(a.names(), vec!["a1", "a2"]);
    }

    #[test]
    fn disjoint_tables_fail() {
        let a = table("a", &[("a1", &["x", "y"])]);
        let b = table("b", &[("b1", &["p", "q"])]);
        assert!(align_tables(&a, &b).unwrap_err().is_input());
    }
}

use std::sync::{atomic::AtomicU64, Arc};

use rankcompare_core::{random::round_rng, Metric, PValueTail, RankedSet};

use test_log::test;

use crate::PermutationEngine;

fn ranking(name: &str, entries: &[(&str, f64)]) -> RankedSet {
    RankedSet::new(
        name,
        entries
            .iter()
            .map(|(item, weight)| (item.to_string(), *weight))
            .collect(),
    )
    .unwrap()
}

fn regions_a() -> RankedSet {
    ranking(
        "a",
        &[
            ("chr1:0", 9.0),
            ("chr1:1", 7.5),
            ("chr1:2", 7.0),
            ("chr1:3", 4.0),
            ("chr1:4", 3.5),
            ("chr1:5", 2.0),
            ("chr1:6", 1.0),
            ("chr1:7", 0.5),
        ],
    )
}

fn regions_b() -> RankedSet {
    ranking(
        "b",
        &[
            ("chr1:1", 8.0),
            ("chr1:0", 6.0),
            ("chr1:2", 5.5),
            ("chr1:5", 5.0),
            ("chr1:3", 2.5),
            ("chr1:4", 2.0),
            ("chr1:7", 1.5),
            ("chr1:6", 0.1),
        ],
    )
}

fn bits(values: &[f64]) -> Vec<u64> {
    values.iter().map(|value| value.to_bits()).collect()
}

#[test]
fn identical_rankings_are_never_beaten() {
    let a = ranking(
        "a",
        &[("v", 5.0), ("w", 4.0), ("x", 3.0), ("y", 2.0), ("z", 1.0)],
    );
    let b = ranking(
        "b",
        &[("v", 5.0), ("w", 4.0), ("x", 3.0), ("y", 2.0), ("z", 1.0)],
    );
    let engine = PermutationEngine::new(2, PValueTail::Upper).unwrap();

    for metric in [Metric::KendallTau, Metric::WeightedKendallTau, Metric::EarthMovers] {
        let result = engine.test(&a, &b, metric, 200, 1).unwrap();
        assert_eq!(result.observed, 0.0);
        assert_eq!(result.pvalue, 1.0, "{}", metric);
        assert_eq!(result.null_distribution.len(), 200);
    }
}

#[test]
fn lower_tail_counts_null_at_or_below_observed() {
    let a = regions_a();
    let b = regions_b();
    let engine = PermutationEngine::new(1, PValueTail::Lower).unwrap();
    let result = engine.test(&a, &b, Metric::KendallTau, 500, 5).unwrap();

    let expected = result
        .null_distribution
        .iter()
        .filter(|&&distance| distance <= result.observed)
        .count() as f64
        / 500.0;
    assert_eq!(result.pvalue, expected);
    assert!((0.0..=1.0).contains(&result.pvalue));
}

#[test]
fn similar_rankings_are_significant() {
    let items: Vec<String> = (0..20).map(|i| format!("region{}", i)).collect();
    let a = RankedSet::unweighted("a", items.clone()).unwrap();
    let mut swapped = items;
    swapped.swap(10, 11);
    let b = RankedSet::unweighted("b", swapped).unwrap();

    let engine = PermutationEngine::new(4, PValueTail::Lower).unwrap();
    let result = engine.test(&a, &b, Metric::KendallTau, 2000, 3).unwrap();
    assert!(result.observed > 0.0);
    assert!(result.pvalue < 0.01);
    assert!(result.summary.z_score < -3.0);
}

#[test]
fn same_seed_reproduces_across_parallelism() {
    let a = regions_a();
    let b = regions_b();
    let sequential = PermutationEngine::new(1, PValueTail::Lower).unwrap();
    let parallel = PermutationEngine::new(8, PValueTail::Lower).unwrap();

    for metric in [Metric::KendallTau, Metric::WeightedKendallTau, Metric::EarthMovers] {
        let first = sequential.test(&a, &b, metric, 5000, 42).unwrap();
        let again = sequential.test(&a, &b, metric, 5000, 42).unwrap();
        let wide = parallel.test(&a, &b, metric, 5000, 42).unwrap();

        for other in [&again, &wide] {
            assert_eq!(first.observed.to_bits(), other.observed.to_bits());
            assert_eq!(first.pvalue.to_bits(), other.pvalue.to_bits());
            assert_eq!(
                bits(&first.null_distribution),
                bits(&other.null_distribution)
            );
        }
    }
}

#[test]
fn seed_42_gives_known_results() {
    // (metric, observed bits, null rounds at or below observed, p-value bits)
    let known = [
        (Metric::KendallTau, 0x3fc2492492492492, 40, 0x3f80624dd2f1a9fc),
        (Metric::WeightedKendallTau, 0x3fc0bda793b0ad7b, 28, 0x3f76f0068db8bac7),
        (Metric::EarthMovers, 0x3fa0778e58d09979, 31, 0x3f79652bd3c36113),
    ];
    let a = regions_a();
    let b = regions_b();

    for workers in [1, 8] {
        let engine = PermutationEngine::new(workers, PValueTail::Lower).unwrap();
        for (metric, observed, below, pvalue) in known {
            let result = engine.test(&a, &b, metric, 5000, 42).unwrap();
            assert_eq!(result.observed.to_bits(), observed, "{} on {}", metric, workers);
            assert_eq!(
                result
                    .null_distribution
                    .iter()
                    .filter(|&&distance| distance <= result.observed)
                    .count(),
                below,
                "{} on {}",
                metric,
                workers
            );
            assert_eq!(result.pvalue.to_bits(), pvalue, "{} on {}", metric, workers);
            assert_eq!(result.pvalue, below as f64 / 5000.0);
        }
    }
}

#[test]
fn different_seeds_give_different_nulls() {
    let engine = PermutationEngine::new(2, PValueTail::Lower).unwrap();
    let first = engine
        .test(&regions_a(), &regions_b(), Metric::KendallTau, 100, 1)
        .unwrap();
    let second = engine
        .test(&regions_a(), &regions_b(), Metric::KendallTau, 100, 2)
        .unwrap();
    assert_ne!(first.null_distribution, second.null_distribution);
}

#[test]
fn rounds_shuffle_both_rankings() {
    let a = regions_a();
    let b = regions_b();
    let engine = PermutationEngine::new(3, PValueTail::Lower).unwrap();
    let result = engine.test(&a, &b, Metric::WeightedKendallTau, 25, 99).unwrap();

    for (round, &distance) in result.null_distribution.iter().enumerate() {
        let mut rng = round_rng(99, round);
        let shuffled_a = a.shuffled(&mut rng);
        let shuffled_b = b.shuffled(&mut rng);
        let expected = Metric::WeightedKendallTau
            .distance(&shuffled_a, &shuffled_b)
            .unwrap();
        assert_eq!(distance.to_bits(), expected.to_bits(), "round {}", round);
    }
}

#[test]
fn streaming_matches_retained() {
    let a = regions_a();
    let b = regions_b();
    let engine = PermutationEngine::new(4, PValueTail::Upper).unwrap();

    // More rounds than one chunk.
    let retained = engine.test(&a, &b, Metric::EarthMovers, 5000, 8).unwrap();
    let streamed = engine
        .test_streaming(&a, &b, Metric::EarthMovers, 5000, 8)
        .unwrap();

    assert_eq!(retained.observed.to_bits(), streamed.observed.to_bits());
    assert_eq!(retained.pvalue.to_bits(), streamed.pvalue.to_bits());
    assert_eq!(
        retained.summary.mean.to_bits(),
        streamed.summary.mean.to_bits()
    );
    assert_eq!(
        retained.summary.std_dev.to_bits(),
        streamed.summary.std_dev.to_bits()
    );
}

#[test]
fn pvalue_settles_with_many_rounds() {
    let a = regions_a();
    let b = regions_b();
    let engine = PermutationEngine::new(4, PValueTail::Lower).unwrap();

    let first = engine
        .test_streaming(&a, &b, Metric::KendallTau, 20000, 1)
        .unwrap();
    let second = engine
        .test_streaming(&a, &b, Metric::KendallTau, 20000, 2)
        .unwrap();
    assert!((first.pvalue - second.pvalue).abs() < 0.03);
}

#[test]
fn progress_counts_every_round() {
    let counter = Arc::new(AtomicU64::new(0));
    let engine = PermutationEngine::new(2, PValueTail::Lower)
        .unwrap()
        .with_progress(counter.clone());

    engine
        .test_streaming(&regions_a(), &regions_b(), Metric::KendallTau, 4500, 0)
        .unwrap();
    assert_eq!(counter.load(std::sync::atomic::Ordering::Relaxed), 4500);
}

#[test]
fn invalid_configuration_is_rejected() {
    assert!(PermutationEngine::new(0, PValueTail::Lower)
        .err()
        .unwrap()
        .is_config());

    let engine = PermutationEngine::new(1, PValueTail::Lower).unwrap();
    let err = engine
        .test(&regions_a(), &regions_b(), Metric::KendallTau, 0, 0)
        .unwrap_err();
    assert!(err.is_config());
}

#[test]
fn mismatched_items_are_rejected() {
    let a = ranking("a", &[("x", 1.0), ("y", 1.0)]);
    let b = ranking("b", &[("x", 1.0), ("z", 1.0)]);
    let engine = PermutationEngine::new(1, PValueTail::Lower).unwrap();
    assert!(engine
        .test(&a, &b, Metric::KendallTau, 10, 0)
        .unwrap_err()
        .is_input());
}

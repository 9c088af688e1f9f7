/// Calculate the Kendall tau distance between two slices.
/// This function is a direct implementation of the code found in the [Wikipedia article](https://en.wikipedia.org/wiki/Kendall_tau_distance).
/// The Kendall tau distance is a metric that counts the number of pairwise disagreements between two rankings.
/// It is quadratic in the length of the input, [`discordance_counts`] should be used for long rankings.
pub fn kendall_tau<T, K>(x: &[T], y: &[K]) -> usize
where
    T: Ord,
    K: Ord,
{
    assert_eq!(x.len(), y.len(), "Input slices must have the same length");
    let mut distance = 0;

    for i in 0..x.len() {
        for j in i + 1..x.len() {
            let a = x[i].cmp(&x[j]);
            let b = y[i].cmp(&y[j]);

            if a != b {
                distance += 1;
            }
        }
    }

    distance
}

/// Calculate the normalised Kendall tau distance between two slices.
/// The normalised Kendall tau distance is the Kendall tau distance divided by the maximum possible distance.
/// With fewer than two elements there are no pairs to disagree on, so the distance is 0.
pub fn normalised_kendall_tau<T, K>(x: &[T], y: &[K]) -> f64
where
    T: Ord,
    K: Ord,
{
    if x.len() < 2 {
        return 0.0;
    }
    let kt = kendall_tau(x, y) as f64;
    let n = x.len() as f64;
    kt / (n * (n - 1.0) / 2.0)
}

/// For every element of `positions`, count the number of other elements it forms a discordant pair with.
///
/// `positions[i]` is the position in the second ranking of the element found at position `i` of the first ranking,
/// so `positions` must be a permutation of `0..positions.len()`.
/// The counts sum to twice the Kendall tau distance. Runs in O(n log n).
pub fn discordance_counts(positions: &[usize]) -> Vec<u64> {
    let n = positions.len();
    let mut seen = CountTree::new(n);
    let mut counts = Vec::with_capacity(n);

    for (i, &position) in positions.iter().enumerate() {
        assert!(position < n, "Positions must be a permutation of 0..n");
        // Earlier elements that are also earlier in the second ranking.
        let concordant_before = seen.count_below(position);
        let discordant_before = i as u64 - concordant_before;
        // Every element placed before `position` in the second ranking that was not seen yet comes after `i` in the first ranking.
        let discordant_after = position as u64 - concordant_before;
        counts.push(discordant_before + discordant_after);
        seen.insert(position);
    }

    counts
}

/// Normalised Kendall tau distance for a permutation, see [`discordance_counts`] for the input format.
pub fn normalised_inversions(positions: &[usize]) -> f64 {
    let n = positions.len();
    if n < 2 {
        return 0.0;
    }
    let discordant = discordance_counts(positions).iter().sum::<u64>() / 2;
    let n = n as f64;
    discordant as f64 / (n * (n - 1.0) / 2.0)
}

/// Calculate the weighted Kendall tau distance for a permutation.
///
/// `weights[i]` is the weight of the element at position `i` of the first ranking.
/// A pair `(i, j)` contributes `weights[i] + weights[j]`, and the distance is the total contribution of the discordant pairs
/// divided by the total contribution of all pairs. With equal weights every pair contributes the same amount,
/// so the result equals the unweighted normalised distance. When all weights are zero the pairs are treated as equally weighted.
pub fn weighted_kendall_tau(positions: &[usize], weights: &[f64]) -> f64 {
    assert_eq!(
        positions.len(),
        weights.len(),
        "Input slices must have the same length"
    );
    let n = positions.len();
    if n < 2 {
        return 0.0;
    }

    let weight_sum: f64 = weights.iter().sum();
    if weight_sum <= 0.0 {
        return normalised_inversions(positions);
    }

    let discordant: f64 = discordance_counts(positions)
        .iter()
        .zip(weights)
        .map(|(&count, &weight)| count as f64 * weight)
        .sum();
    // Every element takes part in n - 1 pairs.
    let total = (n - 1) as f64 * weight_sum;

    (discordant / total).clamp(0.0, 1.0)
}

/// Fenwick tree over `0..n` that counts inserted values.
struct CountTree {
    tree: Vec<u64>,
}

impl CountTree {
    fn new(n: usize) -> Self {
        Self {
            tree: vec![0; n + 1],
        }
    }

    fn insert(&mut self, value: usize) {
        let mut index = value + 1;
        while index < self.tree.len() {
            self.tree[index] += 1;
            index += index & index.wrapping_neg();
        }
    }

    /// Number of inserted values strictly lower than `value`.
    fn count_below(&self, value: usize) -> u64 {
        let mut index = value;
        let mut count = 0;
        while index > 0 {
            count += self.tree[index];
            index -= index & index.wrapping_neg();
        }
        count
    }
}

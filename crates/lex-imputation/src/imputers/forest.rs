//! Tree-ensemble iterative imputer.
//!
//! Same chained-equations loop as [`IterativeImputer`](super::IterativeImputer),
//! but each column is modelled by a small forest of bootstrapped regression
//! trees, which picks up non-linear structure. Randomness comes from a seeded
//! `StdRng`, so a run is reproducible for a given seed.

use super::iterative::run_chained;
use super::{MatrixImputation, MatrixImputer};
use crate::error::Result;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

const MIN_SAMPLES_LEAF: usize = 2;
const MAX_THRESHOLDS: usize = 32;

pub struct ForestImputer {
    n_estimators: usize,
    max_depth: usize,
    max_iterations: usize,
    tolerance: f64,
    time_budget_ms: Option<u64>,
    seed: u64,
}

impl ForestImputer {
    pub fn new(n_estimators: usize, max_depth: usize) -> Self {
        Self {
            n_estimators: n_estimators.max(1),
            max_depth: max_depth.max(1),
            max_iterations: 10,
            tolerance: 1e-3,
            time_budget_ms: None,
            seed: 42,
        }
    }

    pub fn with_iterations(mut self, max_iterations: usize, tolerance: f64) -> Self {
        self.max_iterations = max_iterations.max(1);
        self.tolerance = tolerance.max(1e-12);
        self
    }

    pub fn with_time_budget(mut self, budget_ms: Option<u64>) -> Self {
        self.time_budget_ms = budget_ms;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }
}

impl MatrixImputer for ForestImputer {
    fn fit_transform(&self, matrix: &[Vec<Option<f64>>]) -> Result<MatrixImputation> {
        let mut rng = StdRng::seed_from_u64(self.seed);
        let (n_estimators, max_depth) = (self.n_estimators, self.max_depth);

        run_chained(
            matrix,
            self.max_iterations,
            self.tolerance,
            self.time_budget_ms,
            |x_train, y_train, x_test| {
                let forest = Forest::fit(x_train, y_train, n_estimators, max_depth, &mut rng);
                x_test.iter().map(|x| forest.predict(x)).collect()
            },
        )
    }

    fn name(&self) -> &str {
        "tree_iterative"
    }
}

struct Forest {
    trees: Vec<Node>,
    fallback: f64,
}

impl Forest {
    fn fit(x: &[Vec<f64>], y: &[f64], n_estimators: usize, max_depth: usize, rng: &mut StdRng) -> Self {
        let n = y.len();
        let fallback = if n > 0 { y.iter().sum::<f64>() / n as f64 } else { 0.0 };
        if n == 0 {
            return Self {
                trees: Vec::new(),
                fallback,
            };
        }

        let n_features = x.first().map(Vec::len).unwrap_or(0);
        let max_features = ((n_features as f64).sqrt().ceil() as usize).max(1);

        let trees = (0..n_estimators)
            .map(|_| {
                let sample: Vec<usize> = (0..n).map(|_| rng.gen_range(0..n)).collect();
                build(x, y, &sample, max_depth, max_features, rng)
            })
            .collect();

        Self { trees, fallback }
    }

    fn predict(&self, x: &[f64]) -> f64 {
        if self.trees.is_empty() {
            return self.fallback;
        }
        self.trees.iter().map(|t| t.predict(x)).sum::<f64>() / self.trees.len() as f64
    }
}

enum Node {
    Leaf(f64),
    Split {
        feature: usize,
        threshold: f64,
        left: Box<Node>,
        right: Box<Node>,
    },
}

impl Node {
    fn predict(&self, x: &[f64]) -> f64 {
        match self {
            Node::Leaf(value) => *value,
            Node::Split {
                feature,
                threshold,
                left,
                right,
            } => {
                if x[*feature] <= *threshold {
                    left.predict(x)
                } else {
                    right.predict(x)
                }
            }
        }
    }
}

fn mean_of(y: &[f64], rows: &[usize]) -> f64 {
    rows.iter().map(|&r| y[r]).sum::<f64>() / rows.len().max(1) as f64
}

fn build(
    x: &[Vec<f64>],
    y: &[f64],
    rows: &[usize],
    depth: usize,
    max_features: usize,
    rng: &mut StdRng,
) -> Node {
    let leaf = mean_of(y, rows);
    if depth == 0 || rows.len() < 2 * MIN_SAMPLES_LEAF {
        return Node::Leaf(leaf);
    }

    let n_features = x.first().map(Vec::len).unwrap_or(0);
    let mut features: Vec<usize> = (0..n_features).collect();
    features.shuffle(rng);
    features.truncate(max_features);

    let Some((feature, threshold)) = best_split(x, y, rows, &features) else {
        return Node::Leaf(leaf);
    };

    let (left, right): (Vec<usize>, Vec<usize>) =
        rows.iter().copied().partition(|&r| x[r][feature] <= threshold);

    Node::Split {
        feature,
        threshold,
        left: Box::new(build(x, y, &left, depth - 1, max_features, rng)),
        right: Box::new(build(x, y, &right, depth - 1, max_features, rng)),
    }
}

/// Split minimizing the summed squared error of both children.
fn best_split(x: &[Vec<f64>], y: &[f64], rows: &[usize], features: &[usize]) -> Option<(usize, f64)> {
    let mut best: Option<(usize, f64, f64)> = None;

    for &feature in features {
        let mut pairs: Vec<(f64, f64)> = rows.iter().map(|&r| (x[r][feature], y[r])).collect();
        pairs.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));

        let n = pairs.len();
        let total_sum: f64 = pairs.iter().map(|p| p.1).sum();
        let total_sq: f64 = pairs.iter().map(|p| p.1 * p.1).sum();
        let step = (n / MAX_THRESHOLDS).max(1);

        let mut left_sum = 0.0;
        let mut left_sq = 0.0;
        for i in 0..n.saturating_sub(1) {
            left_sum += pairs[i].1;
            left_sq += pairs[i].1 * pairs[i].1;
            let left_n = i + 1;
            let right_n = n - left_n;
            if left_n < MIN_SAMPLES_LEAF || right_n < MIN_SAMPLES_LEAF {
                continue;
            }
            if pairs[i].0 == pairs[i + 1].0 || (i + 1) % step != 0 {
                continue;
            }

            let right_sum = total_sum - left_sum;
            let right_sq = total_sq - left_sq;
            let sse = (left_sq - left_sum * left_sum / left_n as f64)
                + (right_sq - right_sum * right_sum / right_n as f64);

            if best.is_none_or(|(_, _, b)| sse < b) {
                best = Some((feature, (pairs[i].0 + pairs[i + 1].0) / 2.0, sse));
            }
        }
    }

    best.map(|(feature, threshold, _)| (feature, threshold))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tree_learns_step_function() {
        let x: Vec<Vec<f64>> = (0..40).map(|i| vec![i as f64]).collect();
        let y: Vec<f64> = (0..40).map(|i| if i < 20 { 0.0 } else { 10.0 }).collect();
        let rows: Vec<usize> = (0..40).collect();
        let mut rng = StdRng::seed_from_u64(1);

        let tree = build(&x, &y, &rows, 2, 1, &mut rng);
        assert!((tree.predict(&[5.0]) - 0.0).abs() < 1e-9);
        assert!((tree.predict(&[35.0]) - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_imputes_non_linear_relationship() {
        // b is a step of a; the missing rows sit well inside each step.
        let matrix: Vec<Vec<Option<f64>>> = (0..60)
            .map(|i| {
                let a = i as f64;
                let b = if i < 30 { 1.0 } else { 50.0 };
                let b = if i == 10 || i == 50 { None } else { Some(b) };
                vec![Some(a), b]
            })
            .collect();

        let result = ForestImputer::new(10, 3).with_seed(7).fit_transform(&matrix).unwrap();
        assert!(result.values[10][1] < 15.0);
        assert!(result.values[50][1] > 35.0);
        assert_eq!(result.values[0][1], 1.0);
    }

    #[test]
    fn test_same_seed_is_reproducible() {
        let matrix: Vec<Vec<Option<f64>>> = (0..30)
            .map(|i| {
                let a = (i * 7 % 11) as f64;
                vec![Some(a), if i % 4 == 0 { None } else { Some(a * a) }]
            })
            .collect();
        let first = ForestImputer::new(5, 3).with_seed(3).fit_transform(&matrix).unwrap();
        let second = ForestImputer::new(5, 3).with_seed(3).fit_transform(&matrix).unwrap();
        assert_eq!(first, second);
    }
}

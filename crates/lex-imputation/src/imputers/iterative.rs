//! Chained-equations (MICE-style) imputer with ridge regressions.

use super::{
    Deadline, MatrixImputation, MatrixImputer, column_moments, matrix_width, mean_filled,
    missing_flags, relative_change,
};
use crate::error::Result;
use tracing::debug;

/// Iterative imputer.
///
/// Starts from column means, then repeatedly regresses each incomplete
/// column on all other columns (using the current fill) and replaces its
/// missing cells with the predictions. Stops when the relative change of
/// the imputed cells drops below `tolerance`, or on the iteration/time cap
/// with the best-so-far values.
pub struct IterativeImputer {
    max_iterations: usize,
    tolerance: f64,
    time_budget_ms: Option<u64>,
    ridge_alpha: f64,
}

impl IterativeImputer {
    pub fn new(max_iterations: usize, tolerance: f64) -> Self {
        Self {
            max_iterations: max_iterations.max(1),
            tolerance: tolerance.max(1e-12),
            time_budget_ms: None,
            ridge_alpha: 1e-3,
        }
    }

    pub fn with_time_budget(mut self, budget_ms: Option<u64>) -> Self {
        self.time_budget_ms = budget_ms;
        self
    }

    pub fn with_ridge_alpha(mut self, alpha: f64) -> Self {
        self.ridge_alpha = alpha.max(0.0);
        self
    }
}

impl MatrixImputer for IterativeImputer {
    fn fit_transform(&self, matrix: &[Vec<Option<f64>>]) -> Result<MatrixImputation> {
        let alpha = self.ridge_alpha;
        run_chained(
            matrix,
            self.max_iterations,
            self.tolerance,
            self.time_budget_ms,
            |x_train, y_train, x_test| {
                let model = RidgeModel::fit(x_train, y_train, alpha);
                x_test.iter().map(|x| model.predict(x)).collect()
            },
        )
    }

    fn name(&self) -> &str {
        "iterative"
    }
}

/// Chained-equations driver shared by the regression-based imputers.
///
/// `fit_predict(x_train, y_train, x_test)` fits a model for one column and
/// returns predictions for its missing rows.
pub(super) fn run_chained<F>(
    matrix: &[Vec<Option<f64>>],
    max_iterations: usize,
    tolerance: f64,
    time_budget_ms: Option<u64>,
    mut fit_predict: F,
) -> Result<MatrixImputation>
where
    F: FnMut(&[Vec<f64>], &[f64], &[Vec<f64>]) -> Vec<f64>,
{
    let width = matrix_width(matrix)?;
    let moments = column_moments(matrix, width)?;
    let missing = missing_flags(matrix);
    let mut data = mean_filled(matrix, &moments);

    // Fewest missing first.
    let mut order: Vec<(usize, usize)> = (0..width)
        .map(|c| (c, missing.iter().filter(|row| row[c]).count()))
        .filter(|(_, n)| *n > 0)
        .collect();
    order.sort_by_key(|(c, n)| (*n, *c));
    let order: Vec<usize> = order.into_iter().map(|(c, _)| c).collect();

    if order.is_empty() {
        return Ok(MatrixImputation::single_pass(data));
    }

    let deadline = Deadline::new(time_budget_ms);
    let mut iterations = 0;
    let mut converged = false;
    let mut cap_reason = None;

    while iterations < max_iterations {
        if deadline.exceeded() {
            cap_reason = Some(format!(
                "time budget of {} ms exhausted",
                deadline.budget_ms()
            ));
            break;
        }
        let previous = data.clone();

        for &target in &order {
            let features: Vec<usize> = (0..width).filter(|&c| c != target).collect();
            let (train, test): (Vec<usize>, Vec<usize>) =
                (0..data.len()).partition(|&r| !missing[r][target]);

            let x_train: Vec<Vec<f64>> = train
                .iter()
                .map(|&r| features.iter().map(|&c| data[r][c]).collect())
                .collect();
            let y_train: Vec<f64> = train.iter().map(|&r| data[r][target]).collect();
            let x_test: Vec<Vec<f64>> = test
                .iter()
                .map(|&r| features.iter().map(|&c| data[r][c]).collect())
                .collect();

            let predictions = fit_predict(&x_train, &y_train, &x_test);
            for (&r, value) in test.iter().zip(predictions) {
                if value.is_finite() {
                    data[r][target] = value;
                }
            }
        }
        iterations += 1;

        let change = relative_change(&previous, &data, &missing);
        debug!("Chained pass {}: relative change {:.6}", iterations, change);
        if change < tolerance {
            converged = true;
            break;
        }
    }

    if !converged && cap_reason.is_none() {
        cap_reason = Some(format!("not converged within {} iterations", max_iterations));
    }

    Ok(MatrixImputation {
        values: data,
        iterations,
        converged,
        cap_reason,
    })
}

/// Linear model fitted on standardized features with an L2 penalty.
struct RidgeModel {
    x_means: Vec<f64>,
    x_scales: Vec<f64>,
    coefficients: Vec<f64>,
    intercept: f64,
}

impl RidgeModel {
    fn fit(x: &[Vec<f64>], y: &[f64], alpha: f64) -> Self {
        let n = x.len();
        let p = x.first().map(Vec::len).unwrap_or(0);
        let y_mean = if n > 0 { y.iter().sum::<f64>() / n as f64 } else { 0.0 };

        let mut x_means = vec![0.0; p];
        let mut x_scales = vec![1.0; p];
        for j in 0..p {
            if n == 0 {
                break;
            }
            let mean = x.iter().map(|row| row[j]).sum::<f64>() / n as f64;
            let var = x.iter().map(|row| (row[j] - mean).powi(2)).sum::<f64>() / n as f64;
            x_means[j] = mean;
            x_scales[j] = if var > 1e-12 { var.sqrt() } else { 1.0 };
        }

        let fallback = Self {
            x_means: x_means.clone(),
            x_scales: x_scales.clone(),
            coefficients: vec![0.0; p],
            intercept: y_mean,
        };
        if n < 2 || p == 0 {
            return fallback;
        }

        // Normal equations: (Z'Z + alpha*n*I) b = Z'y on standardized Z.
        let mut gram = vec![vec![0.0; p]; p];
        let mut rhs = vec![0.0; p];
        for (row, target) in x.iter().zip(y) {
            let z: Vec<f64> = (0..p).map(|j| (row[j] - x_means[j]) / x_scales[j]).collect();
            let yc = target - y_mean;
            for a in 0..p {
                rhs[a] += z[a] * yc;
                for b in 0..p {
                    gram[a][b] += z[a] * z[b];
                }
            }
        }
        for (j, row) in gram.iter_mut().enumerate() {
            row[j] += alpha * n as f64;
        }

        match solve(gram, rhs) {
            Some(coefficients) => Self {
                x_means,
                x_scales,
                coefficients,
                intercept: y_mean,
            },
            None => fallback,
        }
    }

    fn predict(&self, x: &[f64]) -> f64 {
        self.intercept
            + x.iter()
                .zip(&self.coefficients)
                .enumerate()
                .map(|(j, (v, b))| b * (v - self.x_means[j]) / self.x_scales[j])
                .sum::<f64>()
    }
}

/// Gaussian elimination with partial pivoting. None for a singular system.
fn solve(mut a: Vec<Vec<f64>>, mut b: Vec<f64>) -> Option<Vec<f64>> {
    let n = b.len();
    for col in 0..n {
        let pivot = (col..n).max_by(|&i, &j| {
            a[i][col]
                .abs()
                .partial_cmp(&a[j][col].abs())
                .unwrap_or(std::cmp::Ordering::Equal)
        })?;
        if a[pivot][col].abs() < 1e-12 {
            return None;
        }
        a.swap(col, pivot);
        b.swap(col, pivot);

        for row in col + 1..n {
            let factor = a[row][col] / a[col][col];
            if factor == 0.0 {
                continue;
            }
            for k in col..n {
                a[row][k] -= factor * a[col][k];
            }
            b[row] -= factor * b[col];
        }
    }

    let mut x = vec![0.0; n];
    for row in (0..n).rev() {
        let tail: f64 = (row + 1..n).map(|k| a[row][k] * x[k]).sum();
        x[row] = (b[row] - tail) / a[row][row];
    }
    Some(x)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_solve_small_system() {
        // 2x + y = 5, x + 3y = 10  =>  x = 1, y = 3
        let x = solve(vec![vec![2.0, 1.0], vec![1.0, 3.0]], vec![5.0, 10.0]).unwrap();
        assert!((x[0] - 1.0).abs() < 1e-12);
        assert!((x[1] - 3.0).abs() < 1e-12);
        assert!(solve(vec![vec![0.0]], vec![1.0]).is_none());
    }

    #[test]
    fn test_recovers_linear_relationship() {
        // b = 2a + 1, with two cells of b missing.
        let matrix: Vec<Vec<Option<f64>>> = (0..20)
            .map(|i| {
                let a = i as f64;
                let b = if i == 5 || i == 12 { None } else { Some(2.0 * a + 1.0) };
                vec![Some(a), b]
            })
            .collect();

        let result = IterativeImputer::new(10, 1e-6)
            .with_ridge_alpha(0.0)
            .fit_transform(&matrix)
            .unwrap();
        assert!((result.values[5][1] - 11.0).abs() < 1e-6);
        assert!((result.values[12][1] - 25.0).abs() < 1e-6);
        assert!(result.converged);
        assert!(result.cap_reason.is_none());
    }

    #[test]
    fn test_iteration_cap_returns_best_so_far() {
        let matrix = vec![
            vec![Some(1.0), None, Some(3.0)],
            vec![None, Some(2.0), Some(1.0)],
            vec![Some(3.0), Some(1.0), None],
            vec![Some(2.0), Some(5.0), Some(4.0)],
            vec![Some(7.0), Some(3.0), Some(2.0)],
        ];
        let result = IterativeImputer::new(1, 1e-12).fit_transform(&matrix).unwrap();
        assert_eq!(result.iterations, 1);
        assert!(!result.converged);
        assert!(result.cap_reason.is_some());
        assert!(result.values.iter().flatten().all(|v| v.is_finite()));
        assert_eq!(result.values[0][0], 1.0);
    }

    #[test]
    fn test_complete_matrix_is_returned_unchanged() {
        let matrix = vec![vec![Some(1.0), Some(2.0)], vec![Some(3.0), Some(4.0)]];
        let result = IterativeImputer::new(5, 1e-3).fit_transform(&matrix).unwrap();
        assert_eq!(result.values, vec![vec![1.0, 2.0], vec![3.0, 4.0]]);
        assert!(result.converged);
    }

    #[test]
    fn test_zero_time_budget_stops_before_first_pass() {
        let matrix = vec![vec![Some(1.0), None], vec![Some(2.0), Some(4.0)], vec![Some(3.0), Some(6.0)]];
        let result = IterativeImputer::new(10, 1e-3)
            .with_time_budget(Some(0))
            .fit_transform(&matrix)
            .unwrap();
        assert_eq!(result.iterations, 0);
        assert_eq!(result.values[0][1], 5.0);
        assert!(result.cap_reason.unwrap().contains("time budget"));
    }
}

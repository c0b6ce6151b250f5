use super::{MatrixImputation, MatrixImputer, column_moments, matrix_width};
use crate::error::Result;
use tracing::debug;

/// K-nearest-neighbour imputer.
///
/// Distances are computed on standardized columns over the features both
/// rows observe, excluding the target column. Neighbours are weighted by
/// inverse distance. A cell with no usable neighbour gets the column mean.
pub struct KnnImputer {
    n_neighbors: usize,
}

impl KnnImputer {
    /// Create a new KNN imputer with specified number of neighbors
    pub fn new(n_neighbors: usize) -> Self {
        Self {
            n_neighbors: n_neighbors.max(1), // Ensure at least 1 neighbor
        }
    }

    pub fn n_neighbors(&self) -> usize {
        self.n_neighbors
    }

    /// Impute a single missing value
    fn impute_value(&self, scaled: &[Vec<Option<f64>>], target_row: usize, target_col: usize, fallback: f64) -> f64 {
        let mut distances: Vec<(usize, f64)> = scaled
            .iter()
            .enumerate()
            .filter(|(row, values)| *row != target_row && values[target_col].is_some())
            .map(|(row, values)| (row, calculate_distance(&scaled[target_row], values, target_col)))
            .filter(|(_, d)| d.is_finite())
            .collect();

        if distances.is_empty() {
            return fallback;
        }

        distances.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));

        let k = self.n_neighbors.min(distances.len());
        let mut weighted_sum = 0.0;
        let mut weight_sum = 0.0;

        for &(neighbor_row, distance) in distances.iter().take(k) {
            if let Some(value) = scaled[neighbor_row][target_col] {
                // Use inverse distance as weight (avoiding division by zero)
                let weight = if distance < 1e-10 { 1e10 } else { 1.0 / distance };
                weighted_sum += value * weight;
                weight_sum += weight;
            }
        }

        if weight_sum > 0.0 {
            weighted_sum / weight_sum
        } else {
            fallback
        }
    }
}

impl MatrixImputer for KnnImputer {
    fn fit_transform(&self, matrix: &[Vec<Option<f64>>]) -> Result<MatrixImputation> {
        let width = matrix_width(matrix)?;
        let moments = column_moments(matrix, width)?;

        // Standardize so no single column dominates the distance.
        let scaled: Vec<Vec<Option<f64>>> = matrix
            .iter()
            .map(|row| {
                row.iter()
                    .zip(&moments)
                    .map(|(v, (mean, std))| v.map(|x| (x - mean) / if *std > 0.0 { *std } else { 1.0 }))
                    .collect()
            })
            .collect();

        let mut values = Vec::with_capacity(matrix.len());
        let mut filled = 0usize;
        for (row_idx, row) in matrix.iter().enumerate() {
            let mut out = Vec::with_capacity(width);
            for (col_idx, cell) in row.iter().enumerate() {
                match cell {
                    Some(v) => out.push(*v),
                    None => {
                        let (mean, std) = moments[col_idx];
                        let scale = if std > 0.0 { std } else { 1.0 };
                        let z = self.impute_value(&scaled, row_idx, col_idx, 0.0);
                        out.push(mean + z * scale);
                        filled += 1;
                    }
                }
            }
            values.push(out);
        }

        debug!("KNN (k = {}) imputed {} cells", self.n_neighbors, filled);
        Ok(MatrixImputation::single_pass(values))
    }

    fn name(&self) -> &str {
        "knn"
    }
}

/// Normalized Euclidean distance between two rows, ignoring the target
/// column and cells missing in either row. Infinite when the rows share no
/// observed feature.
fn calculate_distance(row1: &[Option<f64>], row2: &[Option<f64>], skip_col: usize) -> f64 {
    let mut sum_squared_diff = 0.0;
    let mut count = 0;

    for (col_idx, (a, b)) in row1.iter().zip(row2).enumerate() {
        if col_idx == skip_col {
            continue;
        }
        if let (Some(val1), Some(val2)) = (a, b) {
            let diff = val1 - val2;
            sum_squared_diff += diff * diff;
            count += 1;
        }
    }

    if count > 0 {
        (sum_squared_diff / count as f64).sqrt()
    } else {
        f64::INFINITY
    }
}

//! Descriptive statistics over observed values.
//!
//! All functions take the observed (non-missing) values of a column and
//! never fail; degenerate inputs yield 0.0 or `None`.

/// Arithmetic mean. `None` for an empty slice.
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

/// Sample variance (n - 1 denominator). 0.0 for fewer than two values.
pub fn variance(values: &[f64]) -> f64 {
    let n = values.len();
    if n <= 1 {
        return 0.0;
    }
    let m = values.iter().sum::<f64>() / n as f64;
    values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (n as f64 - 1.0)
}

/// Sample standard deviation.
pub fn std_dev(values: &[f64]) -> f64 {
    variance(values).sqrt()
}

/// Skewness as the mean cubed z-score.
pub fn skewness(values: &[f64]) -> f64 {
    let std = std_dev(values);
    let Some(m) = mean(values) else {
        return 0.0;
    };
    if std == 0.0 {
        return 0.0;
    }
    values.iter().map(|v| ((v - m) / std).powi(3)).sum::<f64>() / values.len() as f64
}

/// Sort a copy of the values, NaN-safe.
pub fn sorted(values: &[f64]) -> Vec<f64> {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    sorted
}

/// Linear-interpolated quantile of pre-sorted values, `q` in [0, 1].
pub fn quantile_sorted(sorted: &[f64], q: f64) -> Option<f64> {
    if sorted.is_empty() {
        return None;
    }
    let q = q.clamp(0.0, 1.0);
    let pos = q * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    let frac = pos - lo as f64;
    Some(sorted[lo] + (sorted[hi] - sorted[lo]) * frac)
}

/// Median of unsorted values.
pub fn median(values: &[f64]) -> Option<f64> {
    quantile_sorted(&sorted(values), 0.5)
}

/// Pearson correlation of paired observations.
///
/// `None` when fewer than `min_pairs` pairs exist or either side has zero
/// variance.
pub fn pearson(pairs: &[(f64, f64)], min_pairs: usize) -> Option<f64> {
    let n = pairs.len();
    if n < min_pairs.max(2) {
        return None;
    }
    let nf = n as f64;
    let mean_x = pairs.iter().map(|(x, _)| x).sum::<f64>() / nf;
    let mean_y = pairs.iter().map(|(_, y)| y).sum::<f64>() / nf;

    let mut cov = 0.0;
    let mut var_x = 0.0;
    let mut var_y = 0.0;
    for (x, y) in pairs {
        let dx = x - mean_x;
        let dy = y - mean_y;
        cov += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }

    if var_x <= f64::EPSILON || var_y <= f64::EPSILON {
        return None;
    }
    let r = cov / (var_x.sqrt() * var_y.sqrt());
    Some(r.clamp(-1.0, 1.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    // ==================== mean / std tests ====================

    #[test]
    fn test_mean_basic() {
        assert_eq!(mean(&[1.0, 2.0, 3.0]), Some(2.0));
        assert_eq!(mean(&[]), None);
    }

    #[test]
    fn test_std_basic() {
        // Variance = 10 / 4 = 2.5
        let std = std_dev(&[1.0, 2.0, 3.0, 4.0, 5.0]);
        assert!((std - 2.5f64.sqrt()).abs() < 1e-12);
    }

    #[test]
    fn test_std_single_value() {
        assert_eq!(std_dev(&[5.0]), 0.0);
        assert_eq!(std_dev(&[5.0, 5.0, 5.0]), 0.0);
    }

    // ==================== skewness tests ====================

    #[test]
    fn test_skewness_symmetric() {
        assert!(skewness(&[1.0, 2.0, 3.0, 4.0, 5.0]).abs() < 1e-12);
    }

    #[test]
    fn test_skewness_right_tail() {
        assert!(skewness(&[1.0, 1.0, 1.0, 2.0, 10.0]) > 0.5);
    }

    // ==================== quantile tests ====================

    #[test]
    fn test_quantile_interpolates() {
        let values = [1.0, 2.0, 3.0, 4.0];
        assert_eq!(quantile_sorted(&values, 0.0), Some(1.0));
        assert_eq!(quantile_sorted(&values, 1.0), Some(4.0));
        assert_eq!(quantile_sorted(&values, 0.5), Some(2.5));
        assert_eq!(quantile_sorted(&[], 0.5), None);
    }

    #[test]
    fn test_median_unsorted() {
        assert_eq!(median(&[5.0, 1.0, 3.0]), Some(3.0));
    }

    // ==================== pearson tests ====================

    #[test]
    fn test_pearson_perfect() {
        let pairs: Vec<(f64, f64)> = (0..10).map(|i| (i as f64, 2.0 * i as f64 + 1.0)).collect();
        assert!((pearson(&pairs, 3).unwrap() - 1.0).abs() < 1e-12);

        let inverse: Vec<(f64, f64)> = (0..10).map(|i| (i as f64, -(i as f64))).collect();
        assert!((pearson(&inverse, 3).unwrap() + 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_pearson_degenerate() {
        let constant = [(1.0, 2.0), (2.0, 2.0), (3.0, 2.0)];
        assert_eq!(pearson(&constant, 3), None);
        assert_eq!(pearson(&[(1.0, 1.0), (2.0, 2.0)], 3), None);
    }
}

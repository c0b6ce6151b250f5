//! Order-dependent fills: propagation and interpolation.
//!
//! These rely on row order. Leading gaps (forward fill), trailing gaps
//! (backward fill) and edge gaps (interpolation) have no anchor and are
//! left missing; the engine reports them as unresolved edges.

use crate::types::InterpolationMethod;

/// Carry the last observed value forward. Returns cells filled.
pub fn forward_fill<T: Clone>(values: &mut [Option<T>]) -> usize {
    let mut last: Option<T> = None;
    let mut filled = 0;
    for value in values.iter_mut() {
        match value {
            Some(v) => last = Some(v.clone()),
            None => {
                if let Some(anchor) = &last {
                    *value = Some(anchor.clone());
                    filled += 1;
                }
            }
        }
    }
    filled
}

/// Carry the next observed value backward. Returns cells filled.
pub fn backward_fill<T: Clone>(values: &mut [Option<T>]) -> usize {
    let mut next: Option<T> = None;
    let mut filled = 0;
    for value in values.iter_mut().rev() {
        match value {
            Some(v) => next = Some(v.clone()),
            None => {
                if let Some(anchor) = &next {
                    *value = Some(anchor.clone());
                    filled += 1;
                }
            }
        }
    }
    filled
}

/// Interpolate interior gaps between the nearest observed neighbours,
/// using row position as the axis. Returns cells filled.
pub fn interpolate(values: &mut [Option<f64>], method: InterpolationMethod) -> usize {
    let anchors: Vec<usize> = values
        .iter()
        .enumerate()
        .filter_map(|(i, v)| v.map(|_| i))
        .collect();

    let mut filled = 0;
    for pair in anchors.windows(2) {
        let (lo, hi) = (pair[0], pair[1]);
        if hi - lo < 2 {
            continue;
        }
        let (Some(a), Some(b)) = (values[lo], values[hi]) else {
            continue;
        };
        let span = (hi - lo) as f64;
        for (i, cell) in values.iter_mut().enumerate().take(hi).skip(lo + 1) {
            let t = (i - lo) as f64 / span;
            *cell = Some(match method {
                InterpolationMethod::Linear => a + (b - a) * t,
                // Ties go to the earlier anchor.
                InterpolationMethod::Nearest => {
                    if t <= 0.5 {
                        a
                    } else {
                        b
                    }
                }
            });
            filled += 1;
        }
    }
    filled
}

//! Numeric kernels shared by the imputation stages.
//!
//! Series are `&[Option<f64>]` indexed by row position; rows are evenly
//! weighted regardless of the calendar gap between them.

use crate::error::{ProcessingError, Result};

/// Fill nulls by linear interpolation between neighbouring known values.
///
/// Interior gaps are interpolated by position, trailing nulls take the last
/// known value and leading nulls stay null. Returns the number of filled cells.
pub fn interpolate_linear(values: &mut [Option<f64>]) -> usize {
    let known = known_positions(values);
    let Some(&last) = known.last() else {
        return 0;
    };

    let mut filled = 0;
    for pair in known.windows(2) {
        let (left, right) = (pair[0], pair[1]);
        if right - left < 2 {
            continue;
        }
        let (Some(y0), Some(y1)) = (values[left], values[right]) else {
            continue;
        };
        let span = (right - left) as f64;
        for (offset, slot) in values[left + 1..right].iter_mut().enumerate() {
            let t = (offset + 1) as f64 / span;
            *slot = Some(y0 + (y1 - y0) * t);
            filled += 1;
        }
    }

    let tail = values[last];
    for slot in values[last + 1..].iter_mut() {
        *slot = tail;
        filled += 1;
    }

    filled
}

/// Fill interior gaps with a local polynomial through up to two known points
/// on each side of the gap (order up to `max_order`, degrading with fewer
/// neighbours). Trailing nulls take the last known value, leading nulls stay.
///
/// Fails when fewer than two known values exist, since no curve is defined.
pub fn interpolate_local_polynomial(values: &mut [Option<f64>], max_order: usize) -> Result<usize> {
    let known = known_positions(values);
    if known.len() < 2 {
        return Err(ProcessingError::numerical(format!(
            "curve interpolation needs at least 2 known points, found {}",
            known.len()
        )));
    }

    let per_side = max_order.div_ceil(2).max(1);
    let snapshot: Vec<Option<f64>> = values.to_vec();
    let mut work = snapshot.clone();
    let mut filled = 0;

    for (k, pair) in known.windows(2).enumerate() {
        let (left, right) = (pair[0], pair[1]);
        if right - left < 2 {
            continue;
        }

        let lo = (k + 1).saturating_sub(per_side);
        let hi = (k + 1 + per_side).min(known.len());
        let mut support: Vec<(f64, f64)> = known[lo..hi]
            .iter()
            .filter_map(|&i| snapshot[i].map(|y| (i as f64, y)))
            .collect();
        support.truncate(max_order + 1);

        for (i, slot) in work.iter_mut().enumerate().take(right).skip(left + 1) {
            let y = lagrange(&support, i as f64);
            if !y.is_finite() {
                return Err(ProcessingError::numerical(format!(
                    "curve interpolation produced a non-finite value at row {}",
                    i
                )));
            }
            *slot = Some(y);
            filled += 1;
        }
    }

    if let Some(&last) = known.last() {
        let tail = work[last];
        for slot in work[last + 1..].iter_mut() {
            *slot = tail;
            filled += 1;
        }
    }

    values.copy_from_slice(&work);
    Ok(filled)
}

fn lagrange(points: &[(f64, f64)], x: f64) -> f64 {
    points
        .iter()
        .enumerate()
        .map(|(j, &(xj, yj))| {
            let basis = points
                .iter()
                .enumerate()
                .filter(|(m, _)| *m != j)
                .fold(1.0, |acc, (_, &(xm, _))| acc * (x - xm) / (xj - xm));
            yj * basis
        })
        .sum()
}

fn known_positions(values: &[Option<f64>]) -> Vec<usize> {
    values
        .iter()
        .enumerate()
        .filter_map(|(i, v)| v.map(|_| i))
        .collect()
}

/// Ordinary least squares fit of `y = intercept + slope * x`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearFit {
    pub intercept: f64,
    pub slope: f64,
    pub samples: usize,
}

impl LinearFit {
    pub fn fit(x: &[f64], y: &[f64]) -> Result<Self> {
        if x.len() != y.len() {
            return Err(ProcessingError::numerical(format!(
                "regression inputs differ in length ({} vs {})",
                x.len(),
                y.len()
            )));
        }
        let n = x.len();
        if n < 2 {
            return Err(ProcessingError::numerical(format!(
                "regression needs at least 2 samples, got {}",
                n
            )));
        }

        let mean_x = x.iter().sum::<f64>() / n as f64;
        let mean_y = y.iter().sum::<f64>() / n as f64;

        let (sxx, sxy) = x.iter().zip(y).fold((0.0, 0.0), |(sxx, sxy), (xi, yi)| {
            let dx = xi - mean_x;
            (sxx + dx * dx, sxy + dx * (yi - mean_y))
        });

        if sxx <= f64::EPSILON * n as f64 {
            return Err(ProcessingError::numerical(
                "regression predictor has zero variance",
            ));
        }

        let slope = sxy / sxx;
        let intercept = mean_y - slope * mean_x;
        if !slope.is_finite() || !intercept.is_finite() {
            return Err(ProcessingError::numerical("regression coefficients are not finite"));
        }

        Ok(Self {
            intercept,
            slope,
            samples: n,
        })
    }

    pub fn predict(&self, x: f64) -> f64 {
        self.intercept + self.slope * x
    }
}

/// Median of the given values; the mean of the middle pair for even counts.
pub fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        Some((sorted[mid - 1] + sorted[mid]) / 2.0)
    } else {
        Some(sorted[mid])
    }
}

/// Centered rolling median over a window of `window` positions, skipping
/// nulls; a position yields `None` when fewer than `min_periods` values are known.
pub fn rolling_median_centered(
    values: &[Option<f64>],
    window: usize,
    min_periods: usize,
) -> Vec<Option<f64>> {
    let window = window.max(1);
    let before = window / 2;
    let after = (window - 1) / 2;

    (0..values.len())
        .map(|i| {
            let lo = i.saturating_sub(before);
            let hi = (i + after + 1).min(values.len());
            let known: Vec<f64> = values[lo..hi].iter().flatten().copied().collect();
            if known.len() < min_periods.max(1) {
                None
            } else {
                median(&known)
            }
        })
        .collect()
}

/// Mean of `|a - b|` over rows where both are known, 0 when no row qualifies.
pub fn mean_abs_diff(a: &[Option<f64>], b: &[Option<f64>]) -> f64 {
    let (sum, count) = a
        .iter()
        .zip(b)
        .filter_map(|(x, y)| Some((x.as_ref()? - y.as_ref()?).abs()))
        .fold((0.0, 0usize), |(sum, count), d| (sum + d, count + 1));

    if count == 0 {
        0.0
    } else {
        sum / count as f64
    }
}

//! Weighted ridge regression for the local surrogate.

use crate::explain::ExplainError;

const PIVOT_EPS: f64 = 1e-12;

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct RidgeFit {
    pub intercept: f64,
    pub coefficients: Vec<f64>,
    /// Weighted coefficient of determination on the training rows.
    pub score: f64,
}

impl RidgeFit {
    pub fn predict(&self, row: &[f64]) -> f64 {
        self.intercept
            + self
                .coefficients
                .iter()
                .zip(row)
                .map(|(c, x)| c * x)
                .sum::<f64>()
    }
}

/// Fit `y ~ b + X·β` minimizing `Σ wᵢ(yᵢ - ŷᵢ)² + alpha·|β|²`.
///
/// Only the columns listed in `columns` are used; the returned coefficients
/// follow that order.
pub(crate) fn fit_weighted(
    rows: &[Vec<f64>],
    columns: &[usize],
    y: &[f64],
    weights: &[f64],
    alpha: f64,
) -> Result<RidgeFit, ExplainError> {
    let w_sum: f64 = weights.iter().sum();
    if rows.is_empty() || w_sum <= 0.0 {
        return Err(ExplainError::Singular);
    }
    let k = columns.len();

    let y_mean = weighted_mean(y.iter().copied(), weights) / w_sum;
    let x_mean: Vec<f64> = columns
        .iter()
        .map(|&c| weighted_mean(rows.iter().map(|r| r[c]), weights) / w_sum)
        .collect();

    // normal equations on centred data
    let mut a = vec![vec![0.0; k]; k];
    let mut rhs = vec![0.0; k];
    for ((row, yi), wi) in rows.iter().zip(y).zip(weights) {
        let xc: Vec<f64> = columns
            .iter()
            .zip(&x_mean)
            .map(|(&c, m)| row[c] - m)
            .collect();
        let yc = yi - y_mean;
        for i in 0..k {
            rhs[i] += wi * xc[i] * yc;
            for j in i..k {
                a[i][j] += wi * xc[i] * xc[j];
            }
        }
    }
    for i in 0..k {
        for j in 0..i {
            a[i][j] = a[j][i];
        }
        a[i][i] += alpha;
    }

    let coefficients = solve(a, rhs)?;
    let intercept = y_mean
        - coefficients
            .iter()
            .zip(&x_mean)
            .map(|(b, m)| b * m)
            .sum::<f64>();

    let mut fit = RidgeFit {
        intercept,
        coefficients,
        score: 0.0,
    };
    fit.score = weighted_r2(&fit, rows, columns, y, weights, y_mean);
    Ok(fit)
}

fn weighted_mean(values: impl Iterator<Item = f64>, weights: &[f64]) -> f64 {
    values.zip(weights).map(|(v, w)| v * w).sum()
}

fn weighted_r2(
    fit: &RidgeFit,
    rows: &[Vec<f64>],
    columns: &[usize],
    y: &[f64],
    weights: &[f64],
    y_mean: f64,
) -> f64 {
    let mut ss_res = 0.0;
    let mut ss_tot = 0.0;
    let mut projected = vec![0.0; columns.len()];
    for ((row, yi), wi) in rows.iter().zip(y).zip(weights) {
        for (p, &c) in projected.iter_mut().zip(columns) {
            *p = row[c];
        }
        let r = yi - fit.predict(&projected);
        ss_res += wi * r * r;
        ss_tot += wi * (yi - y_mean) * (yi - y_mean);
    }
    if ss_tot <= PIVOT_EPS {
        return if ss_res <= PIVOT_EPS { 1.0 } else { 0.0 };
    }
    1.0 - ss_res / ss_tot
}

/// Gaussian elimination with partial pivoting.
pub(crate) fn solve(mut a: Vec<Vec<f64>>, mut b: Vec<f64>) -> Result<Vec<f64>, ExplainError> {
    let n = b.len();
    for col in 0..n {
        let pivot = (col..n)
            .max_by(|&i, &j| a[i][col].abs().total_cmp(&a[j][col].abs()))
            .ok_or(ExplainError::Singular)?;
        if a[pivot][col].abs() < PIVOT_EPS {
            return Err(ExplainError::Singular);
        }
        a.swap(col, pivot);
        b.swap(col, pivot);
        for row in col + 1..n {
            let factor = a[row][col] / a[col][col];
            if factor == 0.0 {
                continue;
            }
            for j in col..n {
                a[row][j] -= factor * a[col][j];
            }
            b[row] -= factor * b[col];
        }
    }
    let mut x = vec![0.0; n];
    for i in (0..n).rev() {
        let tail: f64 = (i + 1..n).map(|j| a[i][j] * x[j]).sum();
        x[i] = (b[i] - tail) / a[i][i];
    }
    Ok(x)
}

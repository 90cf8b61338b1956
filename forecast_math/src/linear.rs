//! Linear least squares
//!
//! Contains:
//! - Gaussian elimination with partial pivoting
//! - Ridge regression solved through the normal equations

use crate::{MathError, Result};
use serde::{Deserialize, Serialize};

/// Pivot magnitude below which a system is treated as singular
const SINGULAR_TOLERANCE: f64 = 1e-12;

/// Solve `A x = b` for a square matrix `A`.
///
/// `matrix` is row-major and consumed, as elimination happens in place.
pub fn solve_linear_system(mut matrix: Vec<Vec<f64>>, mut rhs: Vec<f64>) -> Result<Vec<f64>> {
    let n = rhs.len();
    if matrix.len() != n || matrix.iter().any(|row| row.len() != n) {
        return Err(MathError::InvalidInput(format!(
            "Expected a {}x{} system matrix",
            n, n
        )));
    }

    for col in 0..n {
        let pivot_row = (col..n)
            .max_by(|&a, &b| matrix[a][col].abs().total_cmp(&matrix[b][col].abs()))
            .unwrap_or(col);

        if matrix[pivot_row][col].abs() < SINGULAR_TOLERANCE {
            return Err(MathError::CalculationError(format!(
                "Singular system: no usable pivot in column {}",
                col
            )));
        }

        matrix.swap(col, pivot_row);
        rhs.swap(col, pivot_row);

        for row in (col + 1)..n {
            let factor = matrix[row][col] / matrix[col][col];
            if factor == 0.0 {
                continue;
            }
            for k in col..n {
                matrix[row][k] -= factor * matrix[col][k];
            }
            rhs[row] -= factor * rhs[col];
        }
    }

    let mut solution = vec![0.0; n];
    for row in (0..n).rev() {
        let tail: f64 = ((row + 1)..n).map(|k| matrix[row][k] * solution[k]).sum();
        solution[row] = (rhs[row] - tail) / matrix[row][row];
    }

    if solution.iter().any(|v| !v.is_finite()) {
        return Err(MathError::CalculationError(
            "Solution contains non-finite values".to_string(),
        ));
    }

    Ok(solution)
}

/// Ridge regression with a per-coefficient penalty
#[derive(Debug, Clone)]
pub struct RidgeRegression {
    penalties: Vec<f64>,
}

/// Result of a ridge fit
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RidgeFit {
    /// Fitted coefficients, one per design column
    pub coefficients: Vec<f64>,
    /// In-sample fitted values
    pub fitted: Vec<f64>,
    /// Sum of squared residuals
    pub ssr: f64,
}

impl RidgeRegression {
    /// Create a ridge regression with one penalty per design column.
    ///
    /// A zero penalty leaves that coefficient unregularized (used for the intercept).
    pub fn new(penalties: Vec<f64>) -> Result<Self> {
        if penalties.is_empty() {
            return Err(MathError::InvalidInput(
                "At least one design column is required".to_string(),
            ));
        }
        if penalties.iter().any(|p| !p.is_finite() || *p < 0.0) {
            return Err(MathError::InvalidInput(
                "Ridge penalties must be finite and non-negative".to_string(),
            ));
        }

        Ok(Self { penalties })
    }

    /// Fit coefficients for `design` rows against `target`
    pub fn fit(&self, design: &[Vec<f64>], target: &[f64]) -> Result<RidgeFit> {
        let p = self.penalties.len();

        if design.len() != target.len() {
            return Err(MathError::InvalidInput(format!(
                "Design has {} rows but target has {} values",
                design.len(),
                target.len()
            )));
        }
        if design.is_empty() {
            return Err(MathError::InsufficientData(
                "Cannot fit a regression without observations".to_string(),
            ));
        }
        if let Some(row) = design.iter().find(|row| row.len() != p) {
            return Err(MathError::InvalidInput(format!(
                "Design row has {} columns, expected {}",
                row.len(),
                p
            )));
        }

        // Normal equations: (X'X + diag(penalties)) b = X'y
        let mut gram = vec![vec![0.0; p]; p];
        let mut moment = vec![0.0; p];
        for (row, &y) in design.iter().zip(target.iter()) {
            for i in 0..p {
                moment[i] += row[i] * y;
                for j in i..p {
                    gram[i][j] += row[i] * row[j];
                }
            }
        }
        for i in 0..p {
            for j in 0..i {
                gram[i][j] = gram[j][i];
            }
            gram[i][i] += self.penalties[i];
        }

        let coefficients = solve_linear_system(gram, moment)?;

        let fitted: Vec<f64> = design.iter().map(|row| dot(row, &coefficients)).collect();
        let ssr = fitted
            .iter()
            .zip(target.iter())
            .map(|(f, y)| (y - f).powi(2))
            .sum();

        Ok(RidgeFit {
            coefficients,
            fitted,
            ssr,
        })
    }
}

impl RidgeFit {
    /// Evaluate the fitted linear combination for one design row
    pub fn predict_row(&self, row: &[f64]) -> Result<f64> {
        if row.len() != self.coefficients.len() {
            return Err(MathError::InvalidInput(format!(
                "Row has {} columns, expected {}",
                row.len(),
                self.coefficients.len()
            )));
        }
        Ok(dot(row, &self.coefficients))
    }
}

fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn solves_small_system() {
        let a = vec![vec![2.0, 1.0], vec![1.0, 3.0]];
        let x = solve_linear_system(a, vec![3.0, 5.0]).unwrap();
        assert_relative_eq!(x[0], 0.8, epsilon = 1e-12);
        assert_relative_eq!(x[1], 1.4, epsilon = 1e-12);
    }

    #[test]
    fn singular_system_is_an_error() {
        let a = vec![vec![1.0, 2.0], vec![2.0, 4.0]];
        assert!(matches!(
            solve_linear_system(a, vec![1.0, 2.0]),
            Err(MathError::CalculationError(_))
        ));
    }

    #[test]
    fn penalty_keeps_zero_column_solvable() {
        // Second column is all zeros, only the ridge term keeps the system regular
        let design = vec![vec![1.0, 0.0], vec![1.0, 0.0], vec![1.0, 0.0]];
        let fit = RidgeRegression::new(vec![0.0, 1e-3])
            .unwrap()
            .fit(&design, &[2.0, 2.0, 2.0])
            .unwrap();
        assert_relative_eq!(fit.coefficients[0], 2.0, epsilon = 1e-12);
        assert_relative_eq!(fit.coefficients[1], 0.0, epsilon = 1e-12);
    }
}

// src/algorithms/ridge.rs

use crate::core::{IncidentLimeError, Result};
use ndarray::{Array1, Array2, ArrayView1, ArrayView2};

/// Solution of a weighted ridge regression with an unpenalised intercept.
#[derive(Debug, Clone, PartialEq)]
pub struct RidgeFit {
    pub intercept: f64,
    pub coefficients: Array1<f64>,
}

/// Minimises `sum_i w_i (y_i - b - x_i·β)² + alpha ||β||²`.
///
/// With `alpha > 0` and a positive total weight the normal-equation matrix is
/// symmetric positive definite, so the solution exists and is unique even
/// when there are fewer samples than features.
pub fn solve_weighted_ridge(
    features: ArrayView2<f64>,
    target: ArrayView1<f64>,
    weights: ArrayView1<f64>,
    alpha: f64,
) -> Result<RidgeFit> {
    let n_samples = features.nrows();
    let n_features = features.ncols();

    if target.len() != n_samples || weights.len() != n_samples {
        return Err(IncidentLimeError::InvalidInput(format!(
            "Ridge inputs disagree: {} rows, {} targets, {} weights.",
            n_samples,
            target.len(),
            weights.len()
        )));
    }
    if weights.iter().any(|&w| !(w.is_finite() && w >= 0.0)) {
        return Err(IncidentLimeError::InvalidInput(
            "Ridge sample weights must be finite and non-negative.".to_string(),
        ));
    }
    let total_weight = weights.sum();
    if total_weight <= 0.0 {
        return Err(IncidentLimeError::InvalidInput(
            "Ridge sample weights sum to zero.".to_string(),
        ));
    }

    // Column 0 is the intercept.
    let n_coeffs = n_features + 1;
    let mut x_augmented = Array2::<f64>::ones((n_samples, n_coeffs));
    x_augmented
        .slice_mut(ndarray::s![.., 1..])
        .assign(&features);

    // Scale rows by sqrt(w) so that X_wᵀ X_w = Xᵀ W X.
    let sqrt_w = weights.mapv(f64::sqrt);
    let mut x_w = x_augmented;
    for (mut row, &s) in x_w.rows_mut().into_iter().zip(sqrt_w.iter()) {
        row *= s;
    }
    let y_w = &target * &sqrt_w;

    let mut gram = x_w.t().dot(&x_w);
    for j in 1..n_coeffs {
        gram[[j, j]] += alpha;
    }
    let rhs = x_w.t().dot(&y_w);

    let solution = solve_spd(gram, rhs)?;
    Ok(RidgeFit {
        intercept: solution[0],
        coefficients: solution.slice(ndarray::s![1..]).to_owned(),
    })
}

#[cfg(feature = "linalg")]
fn solve_spd(a: Array2<f64>, b: Array1<f64>) -> Result<Array1<f64>> {
    use ndarray_linalg::Solve;
    a.solve_into(b)
        .map_err(|e| IncidentLimeError::Explanation(format!("Ridge solve failed: {}", e)))
}

/// Cholesky factorisation `A = L Lᵀ` followed by forward and back substitution.
#[cfg(not(feature = "linalg"))]
fn solve_spd(a: Array2<f64>, b: Array1<f64>) -> Result<Array1<f64>> {
    let n = a.nrows();
    let mut l = Array2::<f64>::zeros((n, n));

    for i in 0..n {
        for j in 0..=i {
            let mut sum = a[[i, j]];
            for k in 0..j {
                sum -= l[[i, k]] * l[[j, k]];
            }
            if i == j {
                if sum <= 0.0 || !sum.is_finite() {
                    return Err(IncidentLimeError::Explanation(format!(
                        "Ridge system is not positive definite (pivot {} = {}).",
                        i, sum
                    )));
                }
                l[[i, i]] = sum.sqrt();
            } else {
                l[[i, j]] = sum / l[[j, j]];
            }
        }
    }

    // L z = b
    let mut z = Array1::<f64>::zeros(n);
    for i in 0..n {
        let mut sum = b[i];
        for k in 0..i {
            sum -= l[[i, k]] * z[k];
        }
        z[i] = sum / l[[i, i]];
    }

    // Lᵀ x = z
    let mut x = Array1::<f64>::zeros(n);
    for i in (0..n).rev() {
        let mut sum = z[i];
        for k in (i + 1)..n {
            sum -= l[[k, i]] * x[k];
        }
        x[i] = sum / l[[i, i]];
    }
    Ok(x)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    #[test]
    fn recovers_exact_linear_relation_with_tiny_penalty() -> Result<()> {
        // y = 1 + 2 x1 - 3 x2
        let x = array![[0.0, 0.0], [1.0, 0.0], [0.0, 1.0], [1.0, 1.0], [2.0, 1.0]];
        let y = array![1.0, 3.0, -2.0, 0.0, 2.0];
        let w = array![1.0, 1.0, 1.0, 1.0, 1.0];
        let fit = solve_weighted_ridge(x.view(), y.view(), w.view(), 1e-10)?;
        assert_abs_diff_eq!(fit.intercept, 1.0, epsilon = 1e-6);
        assert_abs_diff_eq!(fit.coefficients[0], 2.0, epsilon = 1e-6);
        assert_abs_diff_eq!(fit.coefficients[1], -3.0, epsilon = 1e-6);
        Ok(())
    }

    #[test]
    fn underdetermined_system_still_has_a_solution() -> Result<()> {
        // One sample, three features.
        let x = array![[1.0, 1.0, 1.0]];
        let y = array![0.9];
        let w = array![1.0];
        let fit = solve_weighted_ridge(x.view(), y.view(), w.view(), 1.0)?;
        assert_eq!(fit.coefficients.len(), 3);
        assert!(fit.coefficients.iter().all(|c| c.is_finite()));
        // Symmetric features get identical coefficients.
        assert_abs_diff_eq!(fit.coefficients[0], fit.coefficients[2], epsilon = 1e-12);
        Ok(())
    }

    #[test]
    fn zero_weight_rows_are_ignored() -> Result<()> {
        let x = array![[0.0], [1.0], [1.0]];
        let y = array![0.0, 1.0, 100.0];
        let with_outlier = solve_weighted_ridge(x.view(), y.view(), array![1.0, 1.0, 0.0].view(), 1e-9)?;
        assert_abs_diff_eq!(with_outlier.coefficients[0], 1.0, epsilon = 1e-6);
        Ok(())
    }

    #[test]
    fn mismatched_lengths_are_rejected() {
        let x = array![[0.0], [1.0]];
        let err = solve_weighted_ridge(x.view(), array![1.0].view(), array![1.0, 1.0].view(), 1.0)
            .unwrap_err();
        assert!(matches!(err, IncidentLimeError::InvalidInput(_)));
    }

    #[test]
    fn all_zero_weights_are_rejected() {
        let x = array![[0.0], [1.0]];
        let y = array![0.0, 1.0];
        let w = array![0.0, 0.0];
        assert!(solve_weighted_ridge(x.view(), y.view(), w.view(), 1.0).is_err());
    }
}

//! Diagonal (Jacobi) preconditioner
//!
//! Scales by the inverse diagonal of A. Used for the inner mass-matrix solves
//! of the saddle-point solver, where the mass matrix is spectrally close to
//! its diagonal.

use crate::sparse::CsrMatrix;
use crate::traits::{Preconditioner, Scalar};
use ndarray::Array1;

/// Diagonal (Jacobi) preconditioner
///
/// M = diag(A), so M^(-1) scales each component by 1/A_ii.
/// Zero diagonal entries are left unscaled.
#[derive(Debug, Clone)]
pub struct DiagonalPreconditioner<T: Scalar> {
    /// Inverse diagonal elements
    inv_diag: Array1<T>,
}

impl<T: Scalar> DiagonalPreconditioner<T> {
    /// Create a diagonal preconditioner from a CSR matrix
    pub fn from_csr(matrix: &CsrMatrix<T>) -> Self {
        Self::from_diagonal(&matrix.diagonal())
    }

    /// Create from a diagonal vector directly
    pub fn from_diagonal(diag: &Array1<T>) -> Self {
        let tol = T::from_f64_lossy(1e-30);
        let inv_diag = diag.mapv(|d| if d.abs() > tol { d.recip() } else { T::one() });
        Self { inv_diag }
    }

    /// The stored inverse diagonal
    pub fn inverse_diagonal(&self) -> &Array1<T> {
        &self.inv_diag
    }
}

impl<T: Scalar> Preconditioner<T> for DiagonalPreconditioner<T> {
    fn apply(&self, r: &Array1<T>) -> Array1<T> {
        r * &self.inv_diag
    }

    fn dim(&self) -> Option<usize> {
        Some(self.inv_diag.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::array;

    #[test]
    fn test_diagonal_preconditioner() {
        let precond = DiagonalPreconditioner::from_diagonal(&array![2.0_f64, 4.0, 0.0]);

        let result = precond.apply(&array![2.0, 8.0, 3.0]);

        assert_relative_eq!(result[0], 1.0, epsilon = 1e-10);
        assert_relative_eq!(result[1], 2.0, epsilon = 1e-10);
        // Zero diagonal is passed through unscaled
        assert_relative_eq!(result[2], 3.0, epsilon = 1e-10);
        assert_eq!(precond.dim(), Some(3));
    }

    #[test]
    fn test_diagonal_from_csr() {
        let matrix = CsrMatrix::from_dense(&array![[4.0_f64, 1.0], [1.0, 2.0]], 1e-15);
        let precond = DiagonalPreconditioner::from_csr(&matrix);

        let result = precond.apply(&array![4.0, 4.0]);

        assert_relative_eq!(result[0], 1.0, epsilon = 1e-10);
        assert_relative_eq!(result[1], 2.0, epsilon = 1e-10);
    }
}

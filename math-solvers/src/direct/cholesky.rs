//! Sparse Cholesky factorisation backed by faer
//!
//! The projected auxiliary matrix of the two-space fast solver is symmetric
//! positive definite, so it is factorised once with a fill-reducing sparse
//! LLᵀ and every preconditioner application is a pair of sparse triangular
//! solves. Memory grows with the fill of the factor rather than with `n²`.

use crate::sparse::CsrMatrix;
use crate::traits::Preconditioner;
use faer::linalg::cholesky::llt::factor::LltError;
use faer::prelude::*;
use faer::sparse::linalg::LltError as SparseLltError;
use faer::sparse::linalg::solvers::{Llt, SymbolicLlt};
use faer::sparse::{SparseColMat, SymbolicSparseColMat};
use ndarray::Array1;
use thiserror::Error;

/// Errors raised by the sparse Cholesky factorisation
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CholeskyError {
    #[error("Matrix is not positive definite (pivot {index})")]
    NotPositiveDefinite { index: usize },
    #[error("Sparse Cholesky analysis failed: {0}")]
    Analysis(String),
    #[error("Matrix dimensions mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },
}

/// Convert a CSR matrix to faer's compressed-column storage
///
/// Rows are visited in order, so the row indices of every column come out
/// sorted.
fn csr_to_faer_csc(csr: &CsrMatrix<f64>) -> SparseColMat<usize, f64> {
    let nrows = csr.num_rows;
    let ncols = csr.num_cols;

    let mut col_offsets = vec![0usize; ncols + 1];
    for &col in &csr.col_indices {
        col_offsets[col + 1] += 1;
    }
    for j in 0..ncols {
        col_offsets[j + 1] += col_offsets[j];
    }

    let nnz = csr.nnz();
    let mut row_indices = vec![0usize; nnz];
    let mut values = vec![0.0f64; nnz];
    let mut next = col_offsets[..ncols].to_vec();
    for row in 0..nrows {
        for (col, val) in csr.row_entries(row) {
            let pos = next[col];
            row_indices[pos] = row;
            values[pos] = val;
            next[col] += 1;
        }
    }

    let symbolic = SymbolicSparseColMat::new_checked(nrows, ncols, col_offsets, None, row_indices);
    SparseColMat::new(symbolic, values)
}

/// LLᵀ factorisation of a sparse symmetric positive definite matrix
///
/// Only the lower triangle of the input is read.
pub struct SparseCholesky {
    llt: Llt<usize, f64>,
    n: usize,
}

impl SparseCholesky {
    /// Symbolic analysis and numeric factorisation in one step
    pub fn factorize(matrix: &CsrMatrix<f64>) -> Result<Self, CholeskyError> {
        let n = matrix.num_rows;
        if n != matrix.num_cols {
            return Err(CholeskyError::DimensionMismatch {
                expected: n,
                got: matrix.num_cols,
            });
        }

        let csc = csr_to_faer_csc(matrix);
        let csc_ref = csc.as_ref();

        let symbolic = SymbolicLlt::try_new(csc_ref.symbolic(), faer::Side::Lower)
            .map_err(|e| CholeskyError::Analysis(format!("{:?}", e)))?;

        let llt = Llt::try_new_with_symbolic(symbolic, csc_ref, faer::Side::Lower).map_err(|e| {
            match e {
                SparseLltError::Generic(err) => CholeskyError::Analysis(format!("{:?}", err)),
                SparseLltError::Numeric(LltError::NonPositivePivot { index }) => {
                    CholeskyError::NotPositiveDefinite { index }
                }
            }
        })?;

        log::debug!("[SparseCholesky] factorised n = {}, nnz = {}", n, matrix.nnz());

        Ok(Self { llt, n })
    }

    /// Dimension of the factorised matrix
    pub fn dim(&self) -> usize {
        self.n
    }

    /// Solve `A x = b` with the stored factors
    pub fn solve(&self, b: &Array1<f64>) -> Result<Array1<f64>, CholeskyError> {
        if b.len() != self.n {
            return Err(CholeskyError::DimensionMismatch {
                expected: self.n,
                got: b.len(),
            });
        }
        Ok(self.substitute(b))
    }

    fn substitute(&self, b: &Array1<f64>) -> Array1<f64> {
        let mut x = faer::Mat::from_fn(self.n, 1, |i, _| b[i]);
        self.llt.solve_in_place(x.as_mut());
        Array1::from_iter((0..self.n).map(|i| x[(i, 0)]))
    }
}

/// The factorisation as an exact preconditioner: y = A⁻¹ r
///
/// # Panics
///
/// Panics if `r` does not have the factorised dimension.
impl Preconditioner<f64> for SparseCholesky {
    fn apply(&self, r: &Array1<f64>) -> Array1<f64> {
        assert_eq!(r.len(), self.n, "Cholesky input vector size mismatch");
        self.substitute(r)
    }

    fn dim(&self) -> Option<usize> {
        Some(self.n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::array;

    fn laplacian_1d(n: usize) -> CsrMatrix<f64> {
        let mut triplets = Vec::new();
        for i in 0..n {
            triplets.push((i, i, 2.0));
            if i + 1 < n {
                triplets.push((i, i + 1, -1.0));
                triplets.push((i + 1, i, -1.0));
            }
        }
        CsrMatrix::from_triplets(n, n, triplets)
    }

    #[test]
    fn test_cholesky_small_spd() {
        // [4 2; 2 3] x = [4; 5] has x = [0.25, 1.5]
        let a = CsrMatrix::from_dense(&array![[4.0, 2.0], [2.0, 3.0]], 0.0);
        let chol = SparseCholesky::factorize(&a).expect("factorization");
        let x = chol.solve(&array![4.0, 5.0]).expect("solve");
        assert_relative_eq!(x[0], 0.25, epsilon = 1e-12);
        assert_relative_eq!(x[1], 1.5, epsilon = 1e-12);
    }

    #[test]
    fn test_cholesky_large_tridiagonal() {
        // A dense factor of this size would need 80 GB
        let n = 100_000;
        let a = laplacian_1d(n);
        let chol = SparseCholesky::factorize(&a).expect("factorization");
        assert_eq!(chol.dim(), n);

        let x_exact = Array1::from_iter((0..n).map(|i| (i as f64 * 1e-4).sin()));
        let x = chol.apply(&a.matvec(&x_exact));
        let err = x.iter().zip(&x_exact).map(|(a, b)| (a - b).abs()).fold(0.0, f64::max);
        assert!(err < 1e-4, "max error {}", err);
    }

    #[test]
    fn test_cholesky_rejects_indefinite() {
        let a = CsrMatrix::from_dense(&array![[1.0, 1.0], [1.0, 1.0]], 0.0);
        assert!(matches!(
            SparseCholesky::factorize(&a),
            Err(CholeskyError::NotPositiveDefinite { .. })
        ));
    }

    #[test]
    fn test_cholesky_dimension_checks() {
        let rect = CsrMatrix::from_dense(&array![[1.0, 0.0, 0.0], [0.0, 1.0, 0.0]], 0.0);
        assert!(matches!(
            SparseCholesky::factorize(&rect),
            Err(CholeskyError::DimensionMismatch { expected: 2, got: 3 })
        ));

        let chol = SparseCholesky::factorize(&laplacian_1d(3)).expect("factorization");
        assert_eq!(chol.dim(), 3);
        assert_eq!(
            chol.solve(&array![1.0]).err(),
            Some(CholeskyError::DimensionMismatch { expected: 3, got: 1 })
        );
    }
}

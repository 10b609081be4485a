//! LU decomposition solver
//!
//! Dense LU factorization with partial pivoting. The factorisation is
//! computed once and reused for every right-hand side; the multigrid
//! hierarchy uses it on its coarsest level, which is small by construction.

use crate::sparse::CsrMatrix;
use crate::traits::{Preconditioner, Scalar};
use ndarray::{Array1, Array2};
use thiserror::Error;

/// Errors that can occur during LU factorization
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LuError {
    #[error("Matrix is singular or nearly singular (pivot column {column})")]
    SingularMatrix { column: usize },
    #[error("Matrix dimensions mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },
}

/// LU factorization result
///
/// `P A = L U` with L unit lower triangular stored below the diagonal of `lu`.
#[derive(Debug, Clone)]
pub struct LuFactorization<T: Scalar> {
    /// Combined L and U factors
    pub lu: Array2<T>,
    /// Row permutation: row `i` of `P A` is row `perm[i]` of `A`
    pub perm: Vec<usize>,
    /// Matrix dimension
    pub n: usize,
}

impl<T: Scalar> LuFactorization<T> {
    /// Factorise a sparse matrix (densified; intended for small coarse systems)
    pub fn from_csr(matrix: &CsrMatrix<T>) -> Result<Self, LuError> {
        lu_factorize(&matrix.to_dense())
    }

    /// Solve Ax = b using the pre-computed LU factorization
    pub fn solve(&self, b: &Array1<T>) -> Result<Array1<T>, LuError> {
        if b.len() != self.n {
            return Err(LuError::DimensionMismatch {
                expected: self.n,
                got: b.len(),
            });
        }
        Ok(self.substitute(b))
    }

    fn substitute(&self, b: &Array1<T>) -> Array1<T> {
        let mut x = Array1::from_iter(self.perm.iter().map(|&p| b[p]));

        // Forward substitution: Ly = Pb
        for i in 0..self.n {
            let mut sum = x[i];
            for j in 0..i {
                sum -= self.lu[[i, j]] * x[j];
            }
            x[i] = sum;
        }

        // Backward substitution: Ux = y
        for i in (0..self.n).rev() {
            let mut sum = x[i];
            for j in (i + 1)..self.n {
                sum -= self.lu[[i, j]] * x[j];
            }
            x[i] = sum / self.lu[[i, i]];
        }

        x
    }
}

/// An LU factorisation used as an exact preconditioner: y = A^{-1} r
///
/// # Panics
///
/// Panics if `r` does not have the factorised dimension.
impl<T: Scalar> Preconditioner<T> for LuFactorization<T> {
    fn apply(&self, r: &Array1<T>) -> Array1<T> {
        assert_eq!(r.len(), self.n, "LU input vector size mismatch");
        self.substitute(r)
    }

    fn dim(&self) -> Option<usize> {
        Some(self.n)
    }
}

/// Compute LU factorization with partial pivoting
pub fn lu_factorize<T: Scalar>(a: &Array2<T>) -> Result<LuFactorization<T>, LuError> {
    let n = a.nrows();
    if n != a.ncols() {
        return Err(LuError::DimensionMismatch {
            expected: n,
            got: a.ncols(),
        });
    }

    let mut lu = a.clone();
    let mut perm: Vec<usize> = (0..n).collect();

    // Pivots are compared against the largest entry of the matrix
    let scale = a.iter().fold(T::zero(), |m, v| m.max(v.abs()));
    let tol = scale * T::epsilon() * T::from_usize(n.max(1)).unwrap_or_else(T::one);

    for k in 0..n {
        let (max_row, max_val) = (k..n)
            .map(|i| (i, lu[[i, k]].abs()))
            .fold((k, T::zero()), |best, cur| if cur.1 > best.1 { cur } else { best });

        if !(max_val > tol) {
            return Err(LuError::SingularMatrix { column: k });
        }

        if max_row != k {
            for j in 0..n {
                lu.swap([k, j], [max_row, j]);
            }
            perm.swap(k, max_row);
        }

        let pivot = lu[[k, k]];
        for i in (k + 1)..n {
            let mult = lu[[i, k]] / pivot;
            lu[[i, k]] = mult;
            if mult == T::zero() {
                continue;
            }
            for j in (k + 1)..n {
                let update = mult * lu[[k, j]];
                lu[[i, j]] -= update;
            }
        }
    }

    Ok(LuFactorization { lu, perm, n })
}

/// Solve Ax = b using LU decomposition
///
/// This is a convenience function that combines factorization and solve.
pub fn lu_solve<T: Scalar>(a: &Array2<T>, b: &Array1<T>) -> Result<Array1<T>, LuError> {
    lu_factorize(a)?.solve(b)
}

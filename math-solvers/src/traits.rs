//! Core traits for linear algebra operations
//!
//! This module defines the fundamental abstractions used throughout the solver library:
//! - [`Scalar`]: Trait for the real floating-point types the solvers work over
//! - [`LinearOperator`]: Trait for matrix-like objects that can perform matrix-vector products
//! - [`Preconditioner`]: Trait for preconditioning operations

use ndarray::Array1;
use num_traits::{Float, FromPrimitive, NumAssign, ToPrimitive};
use std::fmt::Debug;
use std::iter::Sum;

/// Trait for scalar types that can be used in linear algebra operations.
///
/// Finite element stiffness, mass and elasticity systems are real-valued, so
/// this is implemented for every `Float` that also supports in-place
/// arithmetic (in practice `f64` and `f32`).
pub trait Scalar:
    Float + NumAssign + FromPrimitive + ToPrimitive + Sum + Send + Sync + Debug + Default + 'static
{
    /// Convert an `f64` constant into this type.
    ///
    /// Tolerances and weights are written as `f64` literals; for `f32` they
    /// are rounded, and unrepresentable values become NaN.
    #[inline]
    fn from_f64_lossy(v: f64) -> Self {
        Self::from_f64(v).unwrap_or_else(Self::nan)
    }

    /// Check if this is approximately zero
    #[inline]
    fn is_zero_approx(&self, tol: Self) -> bool {
        self.abs() < tol
    }
}

impl<T> Scalar for T where
    T: Float + NumAssign + FromPrimitive + ToPrimitive + Sum + Send + Sync + Debug + Default + 'static
{
}

/// Trait for linear operators (matrices) that can perform matrix-vector products.
///
/// This abstraction allows solvers to work with sparse matrices and
/// matrix-free operators (e.g. a Schur complement) interchangeably.
pub trait LinearOperator<T: Scalar>: Send + Sync {
    /// Number of rows in the operator
    fn num_rows(&self) -> usize;

    /// Number of columns in the operator
    fn num_cols(&self) -> usize;

    /// Apply the operator: y = A * x
    fn apply(&self, x: &Array1<T>) -> Array1<T>;

    /// Apply the transpose: y = A^T * x
    fn apply_transpose(&self, x: &Array1<T>) -> Array1<T>;

    /// Check if the operator is square
    fn is_square(&self) -> bool {
        self.num_rows() == self.num_cols()
    }
}

/// Trait for preconditioners used in iterative solvers.
///
/// A preconditioner M approximates A^(-1), so that M*A is better conditioned
/// than A alone. Preconditioners whose action is computed algorithmically
/// (an inner solve, a transfer between spaces) are matrix-free: only the
/// action and the dimension are exposed.
pub trait Preconditioner<T: Scalar>: Send + Sync {
    /// Apply the preconditioner: y = M * r
    ///
    /// This should approximate solving A * y = r
    fn apply(&self, r: &Array1<T>) -> Array1<T>;

    /// Length of the vectors the preconditioner acts on, if fixed
    fn dim(&self) -> Option<usize> {
        None
    }
}

/// Identity preconditioner (no preconditioning)
#[derive(Clone, Debug, Default)]
pub struct IdentityPreconditioner;

impl<T: Scalar> Preconditioner<T> for IdentityPreconditioner {
    fn apply(&self, r: &Array1<T>) -> Array1<T> {
        r.clone()
    }
}

//! Direct solvers for linear systems
//!
//! This module provides direct (non-iterative) solvers:
//! - [`lu_solve`]: LU decomposition with partial pivoting
//! - [`LuFactorization`]: factor once, solve for many right-hand sides
//! - [`SparseCholesky`]: sparse LLᵀ for symmetric positive definite matrices

mod cholesky;
mod lu;

pub use cholesky::{CholeskyError, SparseCholesky};
pub use lu::{LuError, LuFactorization, lu_factorize, lu_solve};

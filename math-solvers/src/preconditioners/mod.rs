//! Preconditioners for iterative solvers
//!
//! Preconditioners approximate A^(-1) to accelerate convergence of iterative methods.
//!
//! # Available Preconditioners
//!
//! - **DiagonalPreconditioner** (Jacobi): Simple diagonal scaling
//! - **AmgPreconditioner**: Ruge-Stüben algebraic multigrid V-cycle

mod amg;
mod diagonal;

pub use amg::{AmgConfig, AmgDiagnostics, AmgInterpolation, AmgPreconditioner, AmgSmoother};
pub use diagonal::DiagonalPreconditioner;

pub use crate::traits::IdentityPreconditioner;

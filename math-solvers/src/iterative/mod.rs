//! Iterative solvers for linear systems
//!
//! - [`cg`]: Conjugate Gradient for symmetric positive definite systems
//! - [`pcg`]: preconditioned CG with an initial guess, accepting matrix-free
//!   preconditioners

mod cg;

pub use cg::{CgConfig, CgSolution, ConvergenceInfo, cg, pcg};

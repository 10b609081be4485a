//! Boundary condition handling for finite element problems
//!
//! Dirichlet (essential) conditions are imposed by row-and-column
//! elimination: constrained rows become identity rows and the right-hand
//! side is lifted by the prescribed values. This is the form the fast
//! solvers expect.

mod dirichlet;

pub use dirichlet::*;

//! Preconditioned solvers for finite element systems
//!
//! This crate provides sparse matrices, Krylov and direct solvers, algebraic
//! multigrid, and the block "fast solvers" built on top of them for vector
//! valued problems such as linear elasticity.
//!
//! # Features
//!
//! - **Sparse Matrices**: CSR format with products, transposes and filtering
//! - **Iterative Solvers**: preconditioned Conjugate Gradient with status codes
//! - **Direct Solvers**: dense LU for small systems, sparse Cholesky (faer)
//! - **Preconditioners**: Jacobi, Ruge-Stüben AMG
//! - **Fast Solvers**: block AMG and auxiliary-space preconditioners for
//!   elasticity, Schur-complement solver for saddle-point systems
//!
//! With the `parallel` feature, matrix-vector products on large matrices and
//! the per-component preconditioner solves run on the rayon thread pool.
//!
//! # Example
//!
//! ```ignore
//! use femkit_solvers::{FastSolverConfig, LinearElasticityFastSolver};
//!
//! // `a` is the elasticity matrix with Dirichlet rows eliminated,
//! // `p` the scalar Laplacian of the same mesh
//! let solver = LinearElasticityFastSolver::new(a, &p, &is_bd_dof, FastSolverConfig::default())?;
//! let result = solver.solve(&uh, &f)?;
//! println!("status {} after {} iterations", result.info.code(), result.iterations);
//! ```

pub mod blas_helpers;
pub mod direct;
pub mod fast;
pub mod iterative;
pub mod parallel;
pub mod preconditioners;
pub mod sparse;
pub mod traits;

// Re-export main types
pub use sparse::CsrMatrix;
pub use traits::{LinearOperator, Preconditioner, Scalar};

// Re-export iterative solvers
pub use iterative::{CgConfig, CgSolution, ConvergenceInfo, cg, pcg};

// Re-export direct solvers
pub use direct::{CholeskyError, LuError, LuFactorization, SparseCholesky, lu_solve};

// Re-export preconditioners
pub use preconditioners::{
    AmgConfig, AmgDiagnostics, AmgInterpolation, AmgPreconditioner, AmgSmoother,
    DiagonalPreconditioner, IdentityPreconditioner,
};

// Re-export fast solvers
pub use fast::{
    BlockAmgPreconditioner, FastSolveResult, FastSolverConfig, InterpolatedDirectPreconditioner,
    LinearElasticityFastSolver, LinearElasticityFastSolverTwoSpace, SaddlePointFastSolver,
    SaddlePointSolution, SolverError, project_boundary,
};

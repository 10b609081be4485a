//! Fast solvers for linear elasticity and related block systems
//!
//! The solvers in this module take an assembled system matrix `A` for a
//! vector field with `GD` components and a scalar auxiliary matrix `P`
//! (typically the Laplacian stiffness matrix of the same mesh), and solve
//! `A u = f` with preconditioned conjugate gradients where the
//! preconditioner works block by block on `P`:
//!
//! - [`LinearElasticityFastSolver`]: `A` and `P` live on the same scalar
//!   space; each displacement component is preconditioned by an inner CG
//!   solve with `P` accelerated by algebraic multigrid.
//! - [`LinearElasticityFastSolverTwoSpace`]: `P` lives on an auxiliary space
//!   reached through an interpolation matrix `I`; the preconditioner is
//!   `Iᵀ P⁻¹ I` with `P` factorised once by a sparse Cholesky.
//! - [`SaddlePointFastSolver`]: a Schur-complement solver for
//!   `[M B; Bᵀ -C]` systems (mixed formulations).
//!
//! Dirichlet conditions are expected to be applied to `A` already (identity
//! rows and columns at constrained dofs, lifted right-hand side). The
//! preconditioners leave constrained entries unchanged, so they keep the
//! Dirichlet values carried by the iterates.
//!
//! # Example
//!
//! ```ignore
//! use femkit_solvers::{FastSolverConfig, LinearElasticityFastSolver};
//!
//! let solver = LinearElasticityFastSolver::new(a, &laplacian, &is_bd_dof, FastSolverConfig::default())?;
//! let result = solver.solve(&uh, &f)?;
//! assert_eq!(result.info.code(), 0);
//! ```

mod block;
mod elasticity;
mod projection;
mod saddle;

pub use block::{BlockAmgPreconditioner, InterpolatedDirectPreconditioner};
pub use elasticity::{LinearElasticityFastSolver, LinearElasticityFastSolverTwoSpace};
pub use projection::project_boundary;
pub use saddle::{SaddlePointFastSolver, SaddlePointSolution};

use crate::direct::CholeskyError;
use crate::iterative::{CgConfig, ConvergenceInfo, pcg};
use crate::preconditioners::AmgConfig;
use crate::sparse::CsrMatrix;
use crate::traits::Preconditioner;
use ndarray::Array1;
use std::time::Instant;
use thiserror::Error;

/// Errors raised while setting up or running a fast solver
///
/// Iteration failures are not errors: they are reported through
/// [`FastSolveResult::info`].
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SolverError {
    #[error("Dimension mismatch for {what}: expected {expected}, got {actual}")]
    DimensionMismatch {
        what: &'static str,
        expected: usize,
        actual: usize,
    },
    #[error("Direct solver failed: {0}")]
    SingularMatrix(#[from] CholeskyError),
    #[error("Projected preconditioner matrix has a non-positive diagonal at row {row}")]
    DegeneratePreconditioner { row: usize },
}

pub type Result<T> = std::result::Result<T, SolverError>;

/// Configuration shared by the fast solvers
#[derive(Debug, Clone)]
pub struct FastSolverConfig {
    /// Maximum number of outer CG iterations
    pub max_iterations: usize,
    /// Relative residual tolerance of the outer CG iteration
    pub tolerance: f64,
    /// Relative tolerance of the per-block inner solves
    pub inner_tolerance: f64,
    /// Maximum iterations of each per-block inner solve
    pub inner_max_iterations: usize,
    /// Multigrid setup used for the per-block inner solves
    pub amg: AmgConfig,
    /// Log outer progress every N iterations (0 = silent)
    pub print_interval: usize,
}

impl Default for FastSolverConfig {
    fn default() -> Self {
        Self {
            max_iterations: 500,
            tolerance: 1e-8,
            inner_tolerance: 1e-8,
            inner_max_iterations: 100,
            amg: AmgConfig::for_fem(),
            print_interval: 0,
        }
    }
}

impl FastSolverConfig {
    fn outer_cg(&self, tolerance: f64) -> CgConfig<f64> {
        CgConfig {
            max_iterations: self.max_iterations,
            tolerance,
            print_interval: self.print_interval,
        }
    }

    fn inner_cg(&self) -> CgConfig<f64> {
        CgConfig {
            max_iterations: self.inner_max_iterations,
            tolerance: self.inner_tolerance,
            print_interval: 0,
        }
    }
}

/// Result of a fast solve
#[derive(Debug, Clone)]
pub struct FastSolveResult {
    /// Solution vector
    pub uh: Array1<f64>,
    /// Convergence status; `info.code()` is 0 on success
    pub info: ConvergenceInfo,
    /// Number of outer iterations
    pub iterations: usize,
    /// Final relative residual of the outer iteration
    pub residual: f64,
}

impl FastSolveResult {
    pub fn converged(&self) -> bool {
        self.info.is_converged()
    }
}

fn check_dim(what: &'static str, expected: usize, actual: usize) -> Result<()> {
    if expected == actual {
        Ok(())
    } else {
        Err(SolverError::DimensionMismatch {
            what,
            expected,
            actual,
        })
    }
}

/// Outer preconditioned CG shared by the elasticity solvers
fn solve_outer<P>(
    label: &str,
    a: &CsrMatrix<f64>,
    preconditioner: &P,
    uh: &Array1<f64>,
    f: &Array1<f64>,
    config: &FastSolverConfig,
    tolerance: f64,
) -> Result<FastSolveResult>
where
    P: Preconditioner<f64>,
{
    check_dim("initial guess", a.num_rows, uh.len())?;
    check_dim("right-hand side", a.num_rows, f.len())?;

    let start = Instant::now();
    let solution = pcg(a, preconditioner, f, Some(uh), &config.outer_cg(tolerance));

    match solution.info {
        ConvergenceInfo::Converged => log::info!(
            "[{}] converged in {} iterations (relative residual {:.3e}, {:.1}ms)",
            label,
            solution.iterations,
            solution.residual,
            start.elapsed().as_secs_f64() * 1000.0
        ),
        info => log::warn!(
            "[{}] stopped with status {} after {} iterations (relative residual {:.3e})",
            label,
            info.code(),
            solution.iterations,
            solution.residual
        ),
    }

    Ok(FastSolveResult {
        uh: solution.x,
        info: solution.info,
        iterations: solution.iterations,
        residual: solution.residual,
    })
}

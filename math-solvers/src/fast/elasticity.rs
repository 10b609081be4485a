//! Linear elasticity fast solvers (single-space and two-space)

use super::block::{BlockAmgPreconditioner, InterpolatedDirectPreconditioner};
use super::{
    FastSolveResult, FastSolverConfig, Result, SolverError, check_dim, project_boundary,
    solve_outer,
};
use crate::direct::SparseCholesky;
use crate::sparse::CsrMatrix;
use crate::traits::Preconditioner;
use ndarray::Array1;
use std::time::Instant;

fn component_count(what: &'static str, total: usize, block: usize) -> Result<usize> {
    if block == 0 || total == 0 || total % block != 0 {
        // Report the nearest admissible size
        return Err(SolverError::DimensionMismatch {
            what,
            expected: block * (total / block.max(1)).max(1),
            actual: total,
        });
    }
    Ok(total / block)
}

fn check_square(what: &'static str, m: &CsrMatrix<f64>) -> Result<()> {
    check_dim(what, m.num_rows, m.num_cols)
}

/// Fast solver for `A u = f` where each displacement component lives on the
/// same scalar space as the auxiliary matrix `P`
///
/// The number of components is `GD = A.rows / P.rows`; `is_bd_dof` flags the
/// Dirichlet dofs of one scalar block.
pub struct LinearElasticityFastSolver {
    a: CsrMatrix<f64>,
    preconditioner: BlockAmgPreconditioner,
    config: FastSolverConfig,
}

impl LinearElasticityFastSolver {
    pub fn new(
        a: CsrMatrix<f64>,
        p: &CsrMatrix<f64>,
        is_bd_dof: &[bool],
        config: FastSolverConfig,
    ) -> Result<Self> {
        check_square("system matrix columns", &a)?;
        let gdof = p.num_rows;
        let num_components = component_count("system matrix rows", a.num_rows, gdof)?;

        let start = Instant::now();
        let projected = project_boundary(p, is_bd_dof)?;
        let preconditioner = BlockAmgPreconditioner::new(
            &projected,
            is_bd_dof,
            num_components,
            config.amg.clone(),
            config.inner_cg(),
        );

        log::info!(
            "[FastSolver] {} components x {} dofs, {} boundary dofs, AMG {} levels (op. complexity {:.2}), setup {:.1}ms",
            num_components,
            gdof,
            is_bd_dof.iter().filter(|&&bd| bd).count(),
            preconditioner.amg().num_levels(),
            preconditioner.amg().operator_complexity(),
            start.elapsed().as_secs_f64() * 1000.0
        );

        Ok(Self {
            a,
            preconditioner,
            config,
        })
    }

    /// Number of displacement components `GD`
    pub fn num_components(&self) -> usize {
        self.preconditioner.num_blocks()
    }

    /// Number of scalar dofs per component
    pub fn gdof(&self) -> usize {
        self.preconditioner.block_size()
    }

    pub fn system_matrix(&self) -> &CsrMatrix<f64> {
        &self.a
    }

    pub fn preconditioner(&self) -> &BlockAmgPreconditioner {
        &self.preconditioner
    }

    pub fn config(&self) -> &FastSolverConfig {
        &self.config
    }

    /// Apply the block preconditioner to a residual vector
    pub fn precondition(&self, b: &Array1<f64>) -> Result<Array1<f64>> {
        check_dim("residual", self.a.num_rows, b.len())?;
        Ok(self.preconditioner.apply(b))
    }

    /// Solve with the configured tolerance, starting from `uh`
    ///
    /// `uh` must carry the Dirichlet values at constrained dofs.
    pub fn solve(&self, uh: &Array1<f64>, f: &Array1<f64>) -> Result<FastSolveResult> {
        self.solve_with_tolerance(uh, f, self.config.tolerance)
    }

    pub fn solve_with_tolerance(
        &self,
        uh: &Array1<f64>,
        f: &Array1<f64>,
        tolerance: f64,
    ) -> Result<FastSolveResult> {
        solve_outer(
            "FastSolver",
            &self.a,
            &self.preconditioner,
            uh,
            f,
            &self.config,
            tolerance,
        )
    }
}

/// Fast solver where `P` lives on an auxiliary space reached through the
/// interpolation matrix `I` (auxiliary dofs x solution dofs)
///
/// `P` is either scalar (`I.rows` square, applied per component) or
/// vector-valued (`GD * I.rows` square, applied to the stacked components).
/// `is_bd_dof` has the length of `P` and flags its Dirichlet dofs.
pub struct LinearElasticityFastSolverTwoSpace {
    a: CsrMatrix<f64>,
    preconditioner: InterpolatedDirectPreconditioner,
    config: FastSolverConfig,
}

impl LinearElasticityFastSolverTwoSpace {
    pub fn new(
        a: CsrMatrix<f64>,
        interpolation: CsrMatrix<f64>,
        p: &CsrMatrix<f64>,
        is_bd_dof: &[bool],
        config: FastSolverConfig,
    ) -> Result<Self> {
        check_square("system matrix columns", &a)?;
        let gdof0 = interpolation.num_rows;
        let gdof1 = interpolation.num_cols;
        let num_components = component_count("system matrix rows", a.num_rows, gdof1)?;

        check_square("auxiliary matrix columns", p)?;
        if p.num_rows != gdof0 && p.num_rows != num_components * gdof0 {
            return Err(SolverError::DimensionMismatch {
                what: "auxiliary matrix rows",
                expected: gdof0,
                actual: p.num_rows,
            });
        }

        let start = Instant::now();
        let projected = project_boundary(p, is_bd_dof)?;
        let factor = SparseCholesky::factorize(&projected)?;
        let preconditioner = InterpolatedDirectPreconditioner::new(interpolation, factor, num_components);

        log::info!(
            "[FastSolverTwoSpace] {} components, {} -> {} dofs, {} auxiliary matrix, setup {:.1}ms",
            num_components,
            gdof1,
            gdof0,
            if preconditioner.is_vector_valued() { "vector" } else { "scalar" },
            start.elapsed().as_secs_f64() * 1000.0
        );

        Ok(Self {
            a,
            preconditioner,
            config,
        })
    }

    pub fn system_matrix(&self) -> &CsrMatrix<f64> {
        &self.a
    }

    pub fn preconditioner(&self) -> &InterpolatedDirectPreconditioner {
        &self.preconditioner
    }

    /// Apply `Iᵀ P'⁻¹ I` blockwise to a residual vector
    pub fn precondition(&self, b: &Array1<f64>) -> Result<Array1<f64>> {
        check_dim("residual", self.a.num_rows, b.len())?;
        Ok(self.preconditioner.apply(b))
    }

    pub fn solve(&self, uh: &Array1<f64>, f: &Array1<f64>) -> Result<FastSolveResult> {
        self.solve_with_tolerance(uh, f, self.config.tolerance)
    }

    pub fn solve_with_tolerance(
        &self,
        uh: &Array1<f64>,
        f: &Array1<f64>,
        tolerance: f64,
    ) -> Result<FastSolveResult> {
        solve_outer(
            "FastSolverTwoSpace",
            &self.a,
            &self.preconditioner,
            uh,
            f,
            &self.config,
            tolerance,
        )
    }
}

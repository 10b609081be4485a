//! Schur-complement solver for saddle-point systems
//!
//! Solves
//!
//! ```text
//! [ M   B ] [u]   [F0]
//! [ Bᵀ -C ] [p] = [F1]
//! ```
//!
//! with `M` symmetric positive definite (a mass matrix in mixed
//! formulations) and `C` optional. Eliminating `u` gives the SPD system
//! `(Bᵀ M⁻¹ B + C) p = Bᵀ M⁻¹ F0 − F1`, solved with CG on the matrix-free
//! Schur complement. The preconditioner is AMG on the sparse approximation
//! `Bᵀ diag(M)⁻¹ B + C`.

use super::{FastSolverConfig, Result, SolverError, check_dim};
use crate::iterative::{CgConfig, ConvergenceInfo, pcg};
use crate::preconditioners::{AmgPreconditioner, DiagonalPreconditioner};
use crate::sparse::CsrMatrix;
use crate::traits::LinearOperator;
use ndarray::Array1;
use std::time::Instant;

/// Result of a saddle-point solve
#[derive(Debug, Clone)]
pub struct SaddlePointSolution {
    /// Primal unknown (e.g. flux)
    pub u: Array1<f64>,
    /// Multiplier unknown (e.g. pressure or potential)
    pub p: Array1<f64>,
    /// Status of the Schur-complement iteration
    pub info: ConvergenceInfo,
    pub iterations: usize,
}

/// `S p = Bᵀ M⁻¹ B p + C p`, with `M⁻¹` applied by Jacobi-PCG
struct SchurComplement<'a> {
    solver: &'a SaddlePointFastSolver,
}

impl LinearOperator<f64> for SchurComplement<'_> {
    fn num_rows(&self) -> usize {
        self.solver.b.num_cols
    }

    fn num_cols(&self) -> usize {
        self.solver.b.num_cols
    }

    fn apply(&self, x: &Array1<f64>) -> Array1<f64> {
        let mut y = self.solver.bt.matvec(&self.solver.solve_mass(&self.solver.b.matvec(x)));
        if let Some(c) = &self.solver.c {
            y += &c.matvec(x);
        }
        y
    }

    fn apply_transpose(&self, x: &Array1<f64>) -> Array1<f64> {
        self.apply(x)
    }
}

/// Fast solver for `[M B; Bᵀ -C]` systems
pub struct SaddlePointFastSolver {
    m: CsrMatrix<f64>,
    b: CsrMatrix<f64>,
    bt: CsrMatrix<f64>,
    c: Option<CsrMatrix<f64>>,
    mass_jacobi: DiagonalPreconditioner<f64>,
    schur_amg: AmgPreconditioner<f64>,
    mass_cg: CgConfig<f64>,
    config: FastSolverConfig,
}

impl SaddlePointFastSolver {
    /// `m` is `n_u x n_u`, `b` is `n_u x n_p`, `c` (if any) is `n_p x n_p`
    pub fn new(
        m: CsrMatrix<f64>,
        b: CsrMatrix<f64>,
        c: Option<CsrMatrix<f64>>,
        config: FastSolverConfig,
    ) -> Result<Self> {
        check_dim("mass matrix columns", m.num_rows, m.num_cols)?;
        check_dim("coupling matrix rows", m.num_rows, b.num_rows)?;
        if let Some(c) = &c {
            check_dim("stabilisation matrix rows", b.num_cols, c.num_rows)?;
            check_dim("stabilisation matrix columns", b.num_cols, c.num_cols)?;
        }

        let start = Instant::now();
        let mass_jacobi = DiagonalPreconditioner::from_csr(&m);
        let bt = b.transpose();

        let ones = Array1::ones(b.num_cols);
        let mut approx_schur = bt.matmul(&b.scale_rows_cols(mass_jacobi.inverse_diagonal(), &ones));
        if let Some(c) = &c {
            approx_schur = approx_schur.add_scaled(1.0, c);
        }
        if let Some(row) = approx_schur.diagonal().iter().position(|&d| !(d > 0.0)) {
            return Err(SolverError::DegeneratePreconditioner { row });
        }
        let schur_amg = AmgPreconditioner::from_csr(&approx_schur, config.amg.clone());

        // Mass solves sit inside the outer operator and must be much tighter
        let mass_cg = CgConfig {
            max_iterations: 10 * config.inner_max_iterations,
            tolerance: (config.tolerance * 1e-3).max(1e-14),
            print_interval: 0,
        };

        log::info!(
            "[SaddlePoint] {} primal x {} multiplier dofs, Schur AMG {} levels, setup {:.1}ms",
            m.num_rows,
            b.num_cols,
            schur_amg.num_levels(),
            start.elapsed().as_secs_f64() * 1000.0
        );

        Ok(Self {
            m,
            b,
            bt,
            c,
            mass_jacobi,
            schur_amg,
            mass_cg,
            config,
        })
    }

    fn solve_mass(&self, rhs: &Array1<f64>) -> Array1<f64> {
        let solution = pcg(&self.m, &self.mass_jacobi, rhs, None, &self.mass_cg);
        if !solution.converged() {
            log::debug!(
                "mass solve stopped with status {} (relative residual {:.3e})",
                solution.info.code(),
                solution.residual
            );
        }
        solution.x
    }

    /// Solve for `(u, p)` given `F0` (length `n_u`) and `F1` (length `n_p`)
    pub fn solve(&self, f0: &Array1<f64>, f1: &Array1<f64>) -> Result<SaddlePointSolution> {
        check_dim("primal right-hand side", self.m.num_rows, f0.len())?;
        check_dim("multiplier right-hand side", self.b.num_cols, f1.len())?;

        let start = Instant::now();
        let rhs = self.bt.matvec(&self.solve_mass(f0)) - f1;

        let schur = SchurComplement { solver: self };
        let cg_config = CgConfig {
            max_iterations: self.config.max_iterations,
            tolerance: self.config.tolerance,
            print_interval: self.config.print_interval,
        };
        let solution = pcg(&schur, &self.schur_amg, &rhs, None, &cg_config);

        let u = self.solve_mass(&(f0 - &self.b.matvec(&solution.x)));

        if solution.converged() {
            log::info!(
                "[SaddlePoint] converged in {} iterations ({:.1}ms)",
                solution.iterations,
                start.elapsed().as_secs_f64() * 1000.0
            );
        } else {
            log::warn!(
                "[SaddlePoint] stopped with status {} after {} iterations",
                solution.info.code(),
                solution.iterations
            );
        }

        Ok(SaddlePointSolution {
            u,
            p: solution.x,
            info: solution.info,
            iterations: solution.iterations,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 1D mixed Poisson: M lumped-ish mass on n cells, B the divergence
    fn mixed_system(n: usize) -> (CsrMatrix<f64>, CsrMatrix<f64>) {
        let h = 1.0 / n as f64;
        let nu = n + 1;
        let mut m = Vec::new();
        for i in 0..nu {
            let diag = if i == 0 || i == n { h / 3.0 } else { 2.0 * h / 3.0 };
            m.push((i, i, diag));
            if i + 1 < nu {
                m.push((i, i + 1, h / 6.0));
                m.push((i + 1, i, h / 6.0));
            }
        }
        let mut b = Vec::new();
        for k in 0..n {
            b.push((k, k, -1.0));
            b.push((k + 1, k, 1.0));
        }
        (
            CsrMatrix::from_triplets(nu, nu, m),
            CsrMatrix::from_triplets(nu, n, b),
        )
    }

    fn check_residual(
        m: &CsrMatrix<f64>,
        b: &CsrMatrix<f64>,
        c: Option<&CsrMatrix<f64>>,
        sol: &SaddlePointSolution,
        f0: &Array1<f64>,
        f1: &Array1<f64>,
    ) {
        let r0 = f0 - &(m.matvec(&sol.u) + b.matvec(&sol.p));
        let mut bt_u = b.matvec_transpose(&sol.u);
        if let Some(c) = c {
            bt_u -= &c.matvec(&sol.p);
        }
        let r1 = f1 - &bt_u;
        let scale = f0.dot(f0) + f1.dot(f1);
        let rel = ((r0.dot(&r0) + r1.dot(&r1)) / scale).sqrt();
        assert!(rel < 1e-6, "relative residual {}", rel);
    }

    #[test]
    fn test_mixed_poisson_1d() {
        let n = 40;
        let (m, b) = mixed_system(n);
        let f0 = Array1::zeros(n + 1);
        let f1 = Array1::from_iter((0..n).map(|k| -(((k as f64) + 0.5) / n as f64).sin() / n as f64));

        let solver = SaddlePointFastSolver::new(m.clone(), b.clone(), None, FastSolverConfig::default())
            .expect("setup");
        let sol = solver.solve(&f0, &f1).expect("solve");

        assert_eq!(sol.info.code(), 0);
        check_residual(&m, &b, None, &sol, &f0, &f1);
    }

    #[test]
    fn test_with_stabilisation() {
        let n = 20;
        let (m, b) = mixed_system(n);
        let c: CsrMatrix<f64> = CsrMatrix::from_diagonal(&Array1::from_elem(n, 0.01));
        let f0 = Array1::from_iter((0..=n).map(|i| (i as f64 * 0.2).cos()));
        let f1 = Array1::from_elem(n, 0.1);

        let solver = SaddlePointFastSolver::new(m.clone(), b.clone(), Some(c.clone()), FastSolverConfig::default())
            .expect("setup");
        let sol = solver.solve(&f0, &f1).expect("solve");

        assert!(sol.info.is_converged());
        check_residual(&m, &b, Some(&c), &sol, &f0, &f1);
    }

    #[test]
    fn test_dimension_errors() {
        let (m, b) = mixed_system(5);
        let c: CsrMatrix<f64> = CsrMatrix::identity(4);
        assert!(matches!(
            SaddlePointFastSolver::new(m.clone(), b.clone(), Some(c), FastSolverConfig::default()),
            Err(SolverError::DimensionMismatch { .. })
        ));

        let solver = SaddlePointFastSolver::new(m, b, None, FastSolverConfig::default()).expect("setup");
        assert!(solver.solve(&Array1::zeros(6), &Array1::zeros(4)).is_err());
    }
}

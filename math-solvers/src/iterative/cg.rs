//! CG (Conjugate Gradient) solver
//!
//! The Conjugate Gradient method for symmetric positive definite systems,
//! with an optional preconditioner and initial guess. This is the method of
//! choice for SPD matrices as it has optimal convergence.

use crate::blas_helpers::{axpy, inner_product, vector_norm, xpby};
use crate::traits::{IdentityPreconditioner, LinearOperator, Preconditioner, Scalar};
use ndarray::Array1;

/// CG solver configuration
#[derive(Debug, Clone)]
pub struct CgConfig<R> {
    /// Maximum number of iterations
    pub max_iterations: usize,
    /// Relative tolerance for convergence (||r|| <= tol * ||b||)
    pub tolerance: R,
    /// Print progress every N iterations (0 = no output)
    pub print_interval: usize,
}

impl Default for CgConfig<f64> {
    fn default() -> Self {
        Self {
            max_iterations: 1000,
            tolerance: 1e-6,
            print_interval: 0,
        }
    }
}

/// Outcome of a Krylov iteration
///
/// Non-convergence is reported, never raised: the caller decides whether to
/// retry with another tolerance or preconditioner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConvergenceInfo {
    /// Relative residual reached the tolerance
    Converged,
    /// Iteration cap reached; carries the number of iterations performed
    MaxIterations(usize),
    /// A curvature term (p, Ap) or (r, Mr) was not positive
    Breakdown,
}

impl ConvergenceInfo {
    /// Integer status: 0 converged, > 0 iteration cap reached, < 0 breakdown
    pub fn code(&self) -> i64 {
        match self {
            ConvergenceInfo::Converged => 0,
            ConvergenceInfo::MaxIterations(n) => (*n).max(1) as i64,
            ConvergenceInfo::Breakdown => -1,
        }
    }

    pub fn is_converged(&self) -> bool {
        matches!(self, ConvergenceInfo::Converged)
    }
}

/// CG solver result
#[derive(Debug, Clone)]
pub struct CgSolution<T: Scalar> {
    /// Solution vector
    pub x: Array1<T>,
    /// Number of iterations
    pub iterations: usize,
    /// Final relative residual
    pub residual: T,
    /// Convergence status
    pub info: ConvergenceInfo,
}

impl<T: Scalar> CgSolution<T> {
    /// Whether convergence was achieved
    pub fn converged(&self) -> bool {
        self.info.is_converged()
    }
}

/// Solve Ax = b using the Conjugate Gradient method, starting from zero
///
/// Note: This method is only correct for symmetric positive definite matrices.
pub fn cg<T, A>(operator: &A, b: &Array1<T>, config: &CgConfig<T>) -> CgSolution<T>
where
    T: Scalar,
    A: LinearOperator<T> + ?Sized,
{
    pcg(operator, &IdentityPreconditioner, b, None, config)
}

/// Solve Ax = b with preconditioned CG
///
/// `x0` is the initial guess (zero when `None`). The preconditioner must be
/// symmetric positive definite; it may be matrix-free (an inner solve), in
/// which case it should be accurate enough to act as a fixed linear operator.
pub fn pcg<T, A, P>(
    operator: &A,
    preconditioner: &P,
    b: &Array1<T>,
    x0: Option<&Array1<T>>,
    config: &CgConfig<T>,
) -> CgSolution<T>
where
    T: Scalar,
    A: LinearOperator<T> + ?Sized,
    P: Preconditioner<T> + ?Sized,
{
    let n = b.len();
    let b_norm = vector_norm(b);
    if b_norm == T::zero() {
        return CgSolution {
            x: Array1::from_elem(n, T::zero()),
            iterations: 0,
            residual: T::zero(),
            info: ConvergenceInfo::Converged,
        };
    }

    let (mut x, mut r) = match x0 {
        Some(x0) => {
            assert_eq!(x0.len(), n, "Initial guess size mismatch");
            let r = b - &operator.apply(x0);
            (x0.clone(), r)
        }
        None => (Array1::from_elem(n, T::zero()), b.clone()),
    };

    let mut rel_residual = vector_norm(&r) / b_norm;
    if rel_residual <= config.tolerance {
        return CgSolution {
            x,
            iterations: 0,
            residual: rel_residual,
            info: ConvergenceInfo::Converged,
        };
    }

    let mut z = preconditioner.apply(&r);
    let mut rz = inner_product(&r, &z);
    if !(rz > T::zero() && rz.is_finite()) {
        return CgSolution {
            x,
            iterations: 0,
            residual: rel_residual,
            info: ConvergenceInfo::Breakdown,
        };
    }
    let mut p = z.clone();

    for iter in 0..config.max_iterations {
        let q = operator.apply(&p);

        let pq = inner_product(&p, &q);
        if !(pq > T::zero() && pq.is_finite()) {
            log::debug!("CG breakdown at iteration {}: (p, Ap) = {:?}", iter, pq);
            return CgSolution {
                x,
                iterations: iter,
                residual: rel_residual,
                info: ConvergenceInfo::Breakdown,
            };
        }

        let alpha = rz / pq;
        axpy(alpha, &p, &mut x);
        axpy(-alpha, &q, &mut r);

        rel_residual = vector_norm(&r) / b_norm;

        if config.print_interval > 0 && (iter + 1) % config.print_interval == 0 {
            log::info!(
                "CG iteration {}: relative residual = {:.6e}",
                iter + 1,
                rel_residual.to_f64().unwrap_or(f64::NAN)
            );
        }

        if rel_residual <= config.tolerance {
            return CgSolution {
                x,
                iterations: iter + 1,
                residual: rel_residual,
                info: ConvergenceInfo::Converged,
            };
        }

        z = preconditioner.apply(&r);
        let rz_new = inner_product(&r, &z);
        if !(rz_new > T::zero() && rz_new.is_finite()) {
            return CgSolution {
                x,
                iterations: iter + 1,
                residual: rel_residual,
                info: ConvergenceInfo::Breakdown,
            };
        }

        let beta = rz_new / rz;
        rz = rz_new;

        // p = z + beta * p
        xpby(&z, beta, &mut p);
    }

    CgSolution {
        x,
        iterations: config.max_iterations,
        residual: rel_residual,
        info: ConvergenceInfo::MaxIterations(config.max_iterations),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::preconditioners::DiagonalPreconditioner;
    use crate::sparse::CsrMatrix;
    use ndarray::array;

    fn laplacian_1d(n: usize) -> CsrMatrix<f64> {
        let mut triplets = Vec::new();
        for i in 0..n {
            triplets.push((i, i, 2.0));
            if i > 0 {
                triplets.push((i, i - 1, -1.0));
            }
            if i + 1 < n {
                triplets.push((i, i + 1, -1.0));
            }
        }
        CsrMatrix::from_triplets(n, n, triplets)
    }

    #[test]
    fn test_cg_spd() {
        let dense = array![[4.0_f64, 1.0], [1.0, 3.0]];

        let a = CsrMatrix::from_dense(&dense, 1e-15);
        let b = array![1.0_f64, 2.0];

        let config = CgConfig {
            max_iterations: 100,
            tolerance: 1e-10,
            print_interval: 0,
        };

        let solution = cg(&a, &b, &config);

        assert!(solution.converged(), "CG should converge for SPD matrix");
        assert_eq!(solution.info.code(), 0);

        let ax = a.matvec(&solution.x);
        let error: f64 = (&ax - &b).iter().map(|e| e * e).sum::<f64>().sqrt();
        assert!(error < 1e-8, "Solution should satisfy Ax = b");
    }

    #[test]
    fn test_cg_identity() {
        let n = 5;
        let id: CsrMatrix<f64> = CsrMatrix::identity(n);
        let b = Array1::from_iter((1..=n).map(|i| i as f64));

        let config = CgConfig {
            max_iterations: 10,
            tolerance: 1e-12,
            print_interval: 0,
        };

        let solution = cg(&id, &b, &config);

        assert!(solution.converged());
        assert!(solution.iterations <= 2);

        let error: f64 = (&solution.x - &b).iter().map(|e| e * e).sum::<f64>().sqrt();
        assert!(error < 1e-10);
    }

    #[test]
    fn test_pcg_initial_guess_is_solution() {
        let a = laplacian_1d(8);
        let x_true = Array1::from_iter((0..8).map(|i| (i as f64 * 0.3).sin()));
        let b = a.matvec(&x_true);

        let solution = pcg(
            &a,
            &IdentityPreconditioner,
            &b,
            Some(&x_true),
            &CgConfig::default(),
        );

        assert_eq!(solution.iterations, 0);
        assert!(solution.converged());
        assert_eq!(solution.x, x_true);
    }

    #[test]
    fn test_pcg_jacobi() {
        let n = 40;
        let mut a = laplacian_1d(n);
        // Vary the diagonal so Jacobi has something to do
        for i in 0..n {
            for idx in a.row_range(i) {
                if a.col_indices[idx] == i {
                    a.values[idx] += i as f64 * 0.1;
                }
            }
        }
        let b = Array1::from_elem(n, 1.0);
        let precond = DiagonalPreconditioner::from_csr(&a);

        let config = CgConfig {
            max_iterations: 200,
            tolerance: 1e-10,
            print_interval: 0,
        };
        let solution = pcg(&a, &precond, &b, None, &config);

        assert!(solution.converged());
        let r = &b - &a.matvec(&solution.x);
        assert!(vector_norm(&r) / vector_norm(&b) <= 1e-10);
    }

    #[test]
    fn test_cg_reports_iteration_cap() {
        let a = laplacian_1d(50);
        let b = Array1::from_elem(50, 1.0);

        let config = CgConfig {
            max_iterations: 3,
            tolerance: 1e-12,
            print_interval: 0,
        };
        let solution = cg(&a, &b, &config);

        assert_eq!(solution.info, ConvergenceInfo::MaxIterations(3));
        assert_eq!(solution.info.code(), 3);
        assert_eq!(solution.iterations, 3);
    }

    #[test]
    fn test_cg_reports_breakdown_on_indefinite() {
        let a = CsrMatrix::from_diagonal(&array![1.0_f64, -1.0]);
        let b = array![1.0_f64, 1.0];

        let solution = cg(&a, &b, &CgConfig::default());

        assert_eq!(solution.info, ConvergenceInfo::Breakdown);
        assert!(solution.info.code() < 0);
    }

    #[test]
    fn test_cg_zero_rhs() {
        let a = laplacian_1d(4);
        let solution = cg(&a, &Array1::zeros(4), &CgConfig::default());
        assert!(solution.converged());
        assert_eq!(solution.x, Array1::<f64>::zeros(4));
    }
}

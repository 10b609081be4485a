//! Block preconditioners for vector-valued systems
//!
//! A vector of length `GD * n` is viewed as `GD` consecutive blocks of
//! length `n` (component-major ordering); each block is preconditioned
//! independently with the same scalar operator.

use crate::direct::SparseCholesky;
use crate::iterative::{CgConfig, pcg};
use crate::parallel::parallel_map_indexed;
use crate::preconditioners::{AmgConfig, AmgPreconditioner};
use crate::sparse::CsrMatrix;
use crate::traits::Preconditioner;
use ndarray::{Array1, s};

fn concat_blocks(blocks: Vec<Array1<f64>>, block_size: usize) -> Array1<f64> {
    let mut out = Array1::zeros(blocks.len() * block_size);
    for (k, block) in blocks.into_iter().enumerate() {
        out.slice_mut(s![k * block_size..(k + 1) * block_size])
            .assign(&block);
    }
    out
}

/// Per-block inner CG on the projected auxiliary matrix, preconditioned by AMG
///
/// For each block `b_k` the inner solve starts from a vector carrying the
/// boundary entries of `b_k` and zeros elsewhere. Since `P'` is the identity
/// on boundary rows and columns those entries are already exact; they are
/// also copied back after the solve, so the output equals the input at every
/// boundary dof.
pub struct BlockAmgPreconditioner {
    amg: AmgPreconditioner<f64>,
    is_bd: Vec<bool>,
    num_blocks: usize,
    inner: CgConfig<f64>,
}

impl BlockAmgPreconditioner {
    /// Set up AMG on an already projected matrix `P'`
    pub fn new(
        projected: &CsrMatrix<f64>,
        is_bd: &[bool],
        num_blocks: usize,
        amg_config: AmgConfig,
        inner: CgConfig<f64>,
    ) -> Self {
        assert_eq!(
            is_bd.len(),
            projected.num_rows,
            "Boundary flags must match the auxiliary matrix"
        );
        let amg = AmgPreconditioner::from_csr(projected, amg_config);
        Self {
            amg,
            is_bd: is_bd.to_vec(),
            num_blocks,
            inner,
        }
    }

    /// Size of one block (number of scalar dofs)
    pub fn block_size(&self) -> usize {
        self.is_bd.len()
    }

    pub fn num_blocks(&self) -> usize {
        self.num_blocks
    }

    /// The multigrid hierarchy built on `P'`
    pub fn amg(&self) -> &AmgPreconditioner<f64> {
        &self.amg
    }

    /// Approximately solve `P' x = b` for one block
    pub fn solve_block(&self, b: &Array1<f64>) -> Array1<f64> {
        let mut x0 = Array1::zeros(b.len());
        for (i, _) in self.is_bd.iter().enumerate().filter(|(_, bd)| **bd) {
            x0[i] = b[i];
        }

        let solution = pcg(self.amg.matrix(), &self.amg, b, Some(&x0), &self.inner);
        if !solution.converged() {
            log::debug!(
                "inner block solve stopped with status {} (relative residual {:.3e})",
                solution.info.code(),
                solution.residual
            );
        }

        let mut x = solution.x;
        for (i, _) in self.is_bd.iter().enumerate().filter(|(_, bd)| **bd) {
            x[i] = b[i];
        }
        x
    }
}

impl Preconditioner<f64> for BlockAmgPreconditioner {
    fn apply(&self, r: &Array1<f64>) -> Array1<f64> {
        let n = self.block_size();
        assert_eq!(r.len(), self.num_blocks * n, "Block vector size mismatch");

        let blocks = parallel_map_indexed(self.num_blocks, |k| {
            self.solve_block(&r.slice(s![k * n..(k + 1) * n]).to_owned())
        });
        concat_blocks(blocks, n)
    }

    fn dim(&self) -> Option<usize> {
        Some(self.num_blocks * self.block_size())
    }
}

/// Transfer preconditioner `Iᵀ P'⁻¹ I` through an auxiliary space
///
/// `I` maps the solution space (size `n1` per component) to the auxiliary
/// space (size `n0` per component). When `P'` has size `n0` it is applied to
/// each component separately; when it has size `GD * n0` it acts on the
/// concatenated interpolated vector.
pub struct InterpolatedDirectPreconditioner {
    interpolation: CsrMatrix<f64>,
    factor: SparseCholesky,
    num_blocks: usize,
    vector_valued: bool,
}

impl InterpolatedDirectPreconditioner {
    /// `factor` must factorise a matrix of size `I.rows` or `num_blocks * I.rows`
    pub fn new(interpolation: CsrMatrix<f64>, factor: SparseCholesky, num_blocks: usize) -> Self {
        let n0 = interpolation.num_rows;
        let vector_valued = factor.dim() != n0;
        assert!(
            factor.dim() == n0 || factor.dim() == num_blocks * n0,
            "Factorised matrix size {} fits neither {} nor {}",
            factor.dim(),
            n0,
            num_blocks * n0
        );
        Self {
            interpolation,
            factor,
            num_blocks,
            vector_valued,
        }
    }

    /// Whether `P'` couples the components
    pub fn is_vector_valued(&self) -> bool {
        self.vector_valued
    }

    pub fn interpolation(&self) -> &CsrMatrix<f64> {
        &self.interpolation
    }
}

impl Preconditioner<f64> for InterpolatedDirectPreconditioner {
    fn apply(&self, r: &Array1<f64>) -> Array1<f64> {
        let n0 = self.interpolation.num_rows;
        let n1 = self.interpolation.num_cols;
        assert_eq!(r.len(), self.num_blocks * n1, "Block vector size mismatch");

        let coarse: Vec<Array1<f64>> = (0..self.num_blocks)
            .map(|k| {
                self.interpolation
                    .matvec(&r.slice(s![k * n1..(k + 1) * n1]).to_owned())
            })
            .collect();

        let corrected: Vec<Array1<f64>> = if self.vector_valued {
            let y = self.factor.apply(&concat_blocks(coarse, n0));
            (0..self.num_blocks)
                .map(|k| y.slice(s![k * n0..(k + 1) * n0]).to_owned())
                .collect()
        } else {
            coarse.iter().map(|y| self.factor.apply(y)).collect()
        };

        let fine = corrected
            .iter()
            .map(|y| self.interpolation.matvec_transpose(y))
            .collect();
        concat_blocks(fine, n1)
    }

    fn dim(&self) -> Option<usize> {
        Some(self.num_blocks * self.interpolation.num_cols)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fast::project_boundary;
    use approx::assert_relative_eq;
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

    fn inner() -> CgConfig<f64> {
        CgConfig {
            max_iterations: 100,
            tolerance: 1e-10,
            print_interval: 0,
        }
    }

    #[test]
    fn test_block_amg_keeps_boundary_entries() {
        let n = 20;
        let mut is_bd = vec![false; n];
        is_bd[0] = true;
        is_bd[n - 1] = true;
        let projected = project_boundary(&laplacian_1d(n), &is_bd).expect("projection");
        let precond = BlockAmgPreconditioner::new(&projected, &is_bd, 2, AmgConfig::for_fem(), inner());

        let r = Array1::from_iter((0..2 * n).map(|i| 1.0 + (i as f64 * 0.7).cos()));
        let z = precond.apply(&r);

        assert_eq!(precond.dim(), Some(2 * n));
        for k in 0..2 {
            assert_eq!(z[k * n], r[k * n]);
            assert_eq!(z[k * n + n - 1], r[k * n + n - 1]);
        }
    }

    #[test]
    fn test_block_amg_solves_each_block() {
        let n = 30;
        let mut is_bd = vec![false; n];
        is_bd[0] = true;
        let projected = project_boundary(&laplacian_1d(n), &is_bd).expect("projection");
        let precond = BlockAmgPreconditioner::new(&projected, &is_bd, 3, AmgConfig::for_fem(), inner());

        let r = Array1::from_iter((0..3 * n).map(|i| (i % 7) as f64 - 2.0));
        let z = precond.apply(&r);

        for k in 0..3 {
            let rk = r.slice(s![k * n..(k + 1) * n]).to_owned();
            let zk = z.slice(s![k * n..(k + 1) * n]).to_owned();
            let res = &rk - &projected.matvec(&zk);
            let rel = res.dot(&res).sqrt() / rk.dot(&rk).sqrt();
            assert!(rel < 1e-8, "block {} relative residual {}", k, rel);
        }
    }

    #[test]
    fn test_interpolated_direct_scalar_blocks() {
        // Auxiliary space of size 2, solution space of size 3
        let interpolation = CsrMatrix::from_dense(&array![[1.0, 0.5, 0.0], [0.0, 0.5, 1.0]], 0.0);
        let p = CsrMatrix::from_dense(&array![[2.0, 0.0], [0.0, 4.0]], 0.0);
        let factor = SparseCholesky::factorize(&p).expect("factorization");
        let precond = InterpolatedDirectPreconditioner::new(interpolation, factor, 2);

        let r = array![2.0, 0.0, 0.0, 0.0, 0.0, 4.0];
        let z = precond.apply(&r);

        assert!(!precond.is_vector_valued());
        // Block 0: I r = [2, 0], P^-1 = [1, 0], I^T = [1, 0.5, 0]
        assert_relative_eq!(z[0], 1.0, epsilon = 1e-14);
        assert_relative_eq!(z[1], 0.5, epsilon = 1e-14);
        assert_relative_eq!(z[2], 0.0, epsilon = 1e-14);
        // Block 1: I r = [0, 4], P^-1 = [0, 1], I^T = [0, 0.5, 1]
        assert_relative_eq!(z[3], 0.0, epsilon = 1e-14);
        assert_relative_eq!(z[4], 0.5, epsilon = 1e-14);
        assert_relative_eq!(z[5], 1.0, epsilon = 1e-14);
    }

    #[test]
    fn test_interpolated_direct_vector_valued() {
        let interpolation: CsrMatrix<f64> = CsrMatrix::identity(2);
        let p = CsrMatrix::from_dense(
            &array![
                [2.0, 0.0, 1.0, 0.0],
                [0.0, 2.0, 0.0, 0.0],
                [1.0, 0.0, 2.0, 0.0],
                [0.0, 0.0, 0.0, 2.0]
            ],
            0.0,
        );
        let factor = SparseCholesky::factorize(&p).expect("factorization");
        let precond = InterpolatedDirectPreconditioner::new(interpolation, factor, 2);
        assert!(precond.is_vector_valued());

        let x = array![1.0, -1.0, 0.5, 2.0];
        let z = precond.apply(&p.matvec(&x));
        for i in 0..4 {
            assert_relative_eq!(z[i], x[i], epsilon = 1e-12);
        }
    }
}

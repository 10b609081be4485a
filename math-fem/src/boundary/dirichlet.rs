//! Dirichlet (essential) boundary conditions
//!
//! Implements u = g on the boundary by modifying the system matrix and RHS.

use crate::mesh::{Point, TriangleMesh};
use ndarray::Array1;
use solvers::CsrMatrix;

/// Boundary flags of the P1 dofs (mesh nodes)
pub fn boundary_node_mask(mesh: &TriangleMesh) -> Vec<bool> {
    mesh.is_boundary_node()
}

/// Boundary flags of the Crouzeix-Raviart dofs (mesh edges, sorted)
pub fn boundary_edge_mask(mesh: &TriangleMesh) -> Vec<bool> {
    mesh.is_boundary_edge()
}

/// Repeat a scalar mask once per component (component-major layout)
pub fn replicate_mask(mask: &[bool], num_components: usize) -> Vec<bool> {
    mask.repeat(num_components)
}

/// Prescribed values at flagged dofs, zero elsewhere
///
/// `points` holds the location of each scalar dof. For `GD` components the
/// result has length `GD * points.len()` and `g(p, c)` gives component `c`.
pub fn boundary_values<G>(
    points: &[Point],
    is_bd: &[bool],
    num_components: usize,
    g: G,
) -> Array1<f64>
where
    G: Fn(&Point, usize) -> f64,
{
    assert_eq!(points.len(), is_bd.len(), "One boundary flag per dof");
    let n = points.len();
    let mut values = Array1::zeros(num_components * n);
    for c in 0..num_components {
        for (i, p) in points.iter().enumerate().filter(|&(i, _)| is_bd[i]) {
            values[c * n + i] = g(p, c);
        }
    }
    values
}

/// Apply Dirichlet conditions using row and column elimination
///
/// `uh` carries the prescribed values at flagged dofs (its other entries are
/// ignored). For each flagged dof i with value g_i:
/// - Set A[i, :] = A[:, i] = 0 and A[i, i] = 1
/// - Set f[i] = g_i
/// - Modify f[j] -= A[j, i] * g_i for every free j (keeps A symmetric)
///
/// Returns the modified matrix and right-hand side.
pub fn apply_dirichlet_rows(
    a: &CsrMatrix<f64>,
    f: &Array1<f64>,
    uh: &Array1<f64>,
    is_bd: &[bool],
) -> (CsrMatrix<f64>, Array1<f64>) {
    let n = a.num_rows;
    assert_eq!(a.num_cols, n, "System matrix must be square");
    assert_eq!(f.len(), n, "Right-hand side size mismatch");
    assert_eq!(uh.len(), n, "Boundary value vector size mismatch");
    assert_eq!(is_bd.len(), n, "Boundary flag size mismatch");

    let lift = Array1::from_iter((0..n).map(|i| if is_bd[i] { uh[i] } else { 0.0 }));
    let mut rhs = f - &a.matvec(&lift);

    let mut triplets = Vec::with_capacity(a.nnz());
    for i in 0..n {
        if is_bd[i] {
            triplets.push((i, i, 1.0));
            rhs[i] = uh[i];
        } else {
            triplets.extend(
                a.row_entries(i)
                    .filter(|&(j, _)| !is_bd[j])
                    .map(|(j, v)| (i, j, v)),
            );
        }
    }

    (CsrMatrix::from_triplets(n, n, triplets), rhs)
}

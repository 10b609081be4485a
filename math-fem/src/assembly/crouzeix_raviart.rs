//! Nonconforming Crouzeix-Raviart assembly
//!
//! Dofs are the mesh edges in the order of [`TriangleMesh::edges`]. The basis
//! function of local edge k is 1 - 2λ_k, which is one at the midpoint of edge
//! k and zero at the other two midpoints.

use super::{TripletMatrix, assemble_cells, dot2, local_triplets};
use crate::mesh::TriangleMesh;
use solvers::CsrMatrix;

/// Assemble the Crouzeix-Raviart stiffness matrix of -div(c ∇u)
pub fn assemble_cr_stiffness(mesh: &TriangleMesh, c: f64) -> TripletMatrix {
    let cell_to_edge = mesh.cell_to_edge();
    let ne = mesh.number_of_edges();
    assemble_cells(mesh.number_of_cells(), ne, ne, |cell| {
        let grads = mesh.grad_lambda(cell);
        let area = mesh.cell_area(cell);
        let local: [[f64; 3]; 3] = std::array::from_fn(|i| {
            std::array::from_fn(|j| 4.0 * c * area * dot2(&grads[i], &grads[j]))
        });
        local_triplets(&cell_to_edge[cell], &local)
    })
}

/// Interpolation from P1 node values to Crouzeix-Raviart edge values
///
/// Row e holds 1/2 at both endpoints of edge e, so the result has shape
/// `number_of_edges x number_of_nodes`. P1 functions are reproduced exactly.
pub fn cr_interpolation_matrix(mesh: &TriangleMesh) -> CsrMatrix<f64> {
    let edges = mesh.edges();
    let triplets = edges
        .iter()
        .enumerate()
        .flat_map(|(e, edge)| [(e, edge.0, 0.5), (e, edge.1, 0.5)])
        .collect();
    CsrMatrix::from_triplets(edges.len(), mesh.number_of_nodes(), triplets)
}

//! Linear Lagrange (P1) assembly on triangles
//!
//! Dofs are the mesh nodes. The gradients of P1 basis functions are the
//! gradients of the barycentric coordinates, constant per cell.

use super::{TripletMatrix, assemble_cells, dot2, local_triplets};
use crate::mesh::{Point, TriangleMesh};
use ndarray::Array1;

/// Element stiffness c * area * ∇λ_i · ∇λ_j
fn element_stiffness(mesh: &TriangleMesh, cell: usize, c: f64) -> Vec<(usize, usize, f64)> {
    let grads = mesh.grad_lambda(cell);
    let area = mesh.cell_area(cell);
    let local: [[f64; 3]; 3] =
        std::array::from_fn(|i| std::array::from_fn(|j| c * area * dot2(&grads[i], &grads[j])));
    local_triplets(&mesh.cells[cell], &local)
}

/// Element mass area / 12 * (1 + δ_ij)
fn element_mass(mesh: &TriangleMesh, cell: usize) -> Vec<(usize, usize, f64)> {
    let area = mesh.cell_area(cell);
    let local: [[f64; 3]; 3] = std::array::from_fn(|i| {
        std::array::from_fn(|j| if i == j { area / 6.0 } else { area / 12.0 })
    });
    local_triplets(&mesh.cells[cell], &local)
}

/// Assemble the P1 stiffness matrix of -div(c ∇u)
pub fn assemble_stiffness(mesh: &TriangleMesh, c: f64) -> TripletMatrix {
    let n = mesh.number_of_nodes();
    assemble_cells(mesh.number_of_cells(), n, n, |cell| {
        element_stiffness(mesh, cell, c)
    })
}

/// Assemble the consistent P1 mass matrix
pub fn assemble_mass(mesh: &TriangleMesh) -> TripletMatrix {
    let n = mesh.number_of_nodes();
    assemble_cells(mesh.number_of_cells(), n, n, |cell| element_mass(mesh, cell))
}

/// Assemble the P1 load vector with vertex quadrature
///
/// F_i = Σ_cells f(x_i) |T| / 3 over the cells containing node i.
pub fn assemble_load<F>(mesh: &TriangleMesh, f: F) -> Array1<f64>
where
    F: Fn(&Point) -> f64,
{
    let values: Vec<f64> = mesh.nodes.iter().map(&f).collect();
    let mut load = Array1::zeros(mesh.number_of_nodes());
    for (c, cell) in mesh.cells.iter().enumerate() {
        let weight = mesh.cell_area(c) / 3.0;
        for &v in cell {
            load[v] += values[v] * weight;
        }
    }
    load
}

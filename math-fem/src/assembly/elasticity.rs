//! Vector P1 assembly for plane linear elasticity
//!
//! The displacement has two components stored component-major: dof
//! `(c, i)` has global index `c * number_of_nodes + i`. This is the layout
//! the block preconditioners of the fast solvers expect.

use super::{TripletMatrix, assemble_cells, dot2, local_triplets};
use crate::mesh::{Point, TriangleMesh};
use ndarray::Array1;

/// Number of displacement components in the plane
pub const ELASTICITY_COMPONENTS: usize = 2;

/// Lamé parameters of an isotropic material
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LameParameters {
    pub lambda: f64,
    pub mu: f64,
}

impl LameParameters {
    pub fn new(lambda: f64, mu: f64) -> Self {
        Self { lambda, mu }
    }

    /// Convert from Young's modulus and Poisson ratio
    pub fn from_young_poisson(e: f64, nu: f64) -> Self {
        Self {
            lambda: e * nu / ((1.0 + nu) * (1.0 - 2.0 * nu)),
            mu: e / (2.0 * (1.0 + nu)),
        }
    }
}

fn element_elasticity(
    mesh: &TriangleMesh,
    cell: usize,
    lame: LameParameters,
) -> Vec<(usize, usize, f64)> {
    let n = mesh.number_of_nodes();
    let vertices = mesh.cells[cell];
    let grads = mesh.grad_lambda(cell);
    let area = mesh.cell_area(cell);
    let LameParameters { lambda, mu } = lame;

    // Local dof a = 3 * component + vertex
    let dofs: [usize; 6] = std::array::from_fn(|a| (a / 3) * n + vertices[a % 3]);
    let local: [[f64; 6]; 6] = std::array::from_fn(|a| {
        std::array::from_fn(|b| {
            let (c, i) = (a / 3, a % 3);
            let (d, j) = (b / 3, b % 3);
            let shear = if c == d { mu * dot2(&grads[i], &grads[j]) } else { 0.0 };
            area * (shear + mu * grads[i][d] * grads[j][c] + lambda * grads[i][c] * grads[j][d])
        })
    });
    local_triplets(&dofs, &local)
}

/// Assemble the elasticity stiffness ∫ 2μ ε(u):ε(v) + λ div u div v
pub fn assemble_linear_elasticity(mesh: &TriangleMesh, lame: LameParameters) -> TripletMatrix {
    let gdof = ELASTICITY_COMPONENTS * mesh.number_of_nodes();
    assemble_cells(mesh.number_of_cells(), gdof, gdof, |cell| {
        element_elasticity(mesh, cell, lame)
    })
}

/// Assemble a body force load with vertex quadrature, component-major
pub fn assemble_vector_load<F>(mesh: &TriangleMesh, f: F) -> Array1<f64>
where
    F: Fn(&Point) -> [f64; ELASTICITY_COMPONENTS],
{
    let n = mesh.number_of_nodes();
    let values: Vec<[f64; ELASTICITY_COMPONENTS]> = mesh.nodes.iter().map(&f).collect();
    let mut load = Array1::zeros(ELASTICITY_COMPONENTS * n);
    for (c, cell) in mesh.cells.iter().enumerate() {
        let weight = mesh.cell_area(c) / 3.0;
        for &v in cell {
            for (d, value) in values[v].iter().enumerate() {
                load[d * n + v] += value * weight;
            }
        }
    }
    load
}

//! Adaptive triangle meshes and finite element assembly for the fast solvers
//!
//! This crate provides the mesh side of `femkit`: structured triangulations,
//! the Tritree hierarchy for local red-green refinement, and
//! the P1, vector P1 and Crouzeix-Raviart assembly routines whose matrices
//! feed the block preconditioned solvers of `femkit-solvers`.
//!
//! # Features
//!
//! - **Meshes**: conforming triangle meshes with edge and neighbour topology
//! - **Tritree**: marked refinement with closure, 2:1 balance and green-pair
//!   compaction, exported as a conforming leaf [`mesh::TriangleMesh`]
//! - **Marking**: Dörfler and maximum strategies for adaptive loops
//! - **Assembly**: Laplacian, mass, plane elasticity and Crouzeix-Raviart
//! - **Boundary conditions**: Dirichlet row and column elimination
//!
//! # Example
//!
//! ```ignore
//! use fem::assembly::{LameParameters, assemble_linear_elasticity, assemble_stiffness};
//! use fem::boundary::{apply_dirichlet_rows, boundary_node_mask, replicate_mask};
//! use fem::mesh::unit_square_triangles;
//! use solvers::{FastSolverConfig, LinearElasticityFastSolver};
//!
//! let mesh = unit_square_triangles(32);
//! let a = assemble_linear_elasticity(&mesh, LameParameters::new(1.0, 1.0)).to_csr();
//! let p = assemble_stiffness(&mesh, 1.0).to_csr();
//! let is_bd = replicate_mask(&boundary_node_mask(&mesh), 2);
//! let (a, f) = apply_dirichlet_rows(&a, &f, &uh, &is_bd);
//! let solver = LinearElasticityFastSolver::new(a, &p, &is_bd, FastSolverConfig::default())?;
//! let result = solver.solve(&uh, &f)?;
//! ```

pub mod assembly;
pub mod boundary;
pub mod mesh;

/// Library version
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!version().is_empty());
    }
}

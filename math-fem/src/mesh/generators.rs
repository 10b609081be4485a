//! Mesh generators for common domains
//!
//! Structured triangulations: every grid square is split along its
//! lower-left to upper-right diagonal into two counter-clockwise triangles.

use super::types::{Point, TriangleMesh};

/// Generate a rectangular mesh with triangular elements
///
/// Node `(i, j)` of the `(nx + 1) x (ny + 1)` grid has index `j * (nx + 1) + i`.
pub fn rectangular_mesh_triangles(
    x_min: f64,
    x_max: f64,
    y_min: f64,
    y_max: f64,
    nx: usize,
    ny: usize,
) -> TriangleMesh {
    assert!(nx > 0 && ny > 0, "Grid must have at least one square");

    let dx = (x_max - x_min) / nx as f64;
    let dy = (y_max - y_min) / ny as f64;

    let mut nodes = Vec::with_capacity((nx + 1) * (ny + 1));
    for j in 0..=ny {
        for i in 0..=nx {
            nodes.push(Point::new(x_min + i as f64 * dx, y_min + j as f64 * dy));
        }
    }

    // Two triangles per square
    let mut cells = Vec::with_capacity(2 * nx * ny);
    for j in 0..ny {
        for i in 0..nx {
            let n00 = j * (nx + 1) + i;
            let n10 = n00 + 1;
            let n01 = n00 + (nx + 1);
            let n11 = n01 + 1;

            cells.push([n00, n10, n11]);
            cells.push([n00, n11, n01]);
        }
    }

    TriangleMesh { nodes, cells }
}

/// Generate a unit square mesh with triangles
pub fn unit_square_triangles(n: usize) -> TriangleMesh {
    rectangular_mesh_triangles(0.0, 1.0, 0.0, 1.0, n, n)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_unit_square_triangles() {
        let mesh = unit_square_triangles(2);
        assert_eq!(mesh.number_of_nodes(), 9);
        assert_eq!(mesh.number_of_cells(), 8);
        assert_eq!(mesh.cells[0], [0, 1, 4]);
        assert_eq!(mesh.cells[7], [4, 8, 7]);

        let total: f64 = (0..mesh.number_of_cells()).map(|c| mesh.cell_area(c)).sum();
        assert_relative_eq!(total, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_rectangular_boundary() {
        let mesh = rectangular_mesh_triangles(0.0, 2.0, -1.0, 1.0, 4, 3);
        assert_eq!(mesh.number_of_nodes(), 20);
        assert_eq!(mesh.boundary_edges().len(), 2 * (4 + 3));
        // Euler: V - E + F = 1 for a disc
        assert_eq!(
            mesh.number_of_nodes() + mesh.number_of_cells(),
            mesh.number_of_edges() + 1
        );
        // Interior nodes of a 5 x 4 grid
        assert_eq!(mesh.is_boundary_node().iter().filter(|&&b| !b).count(), 6);
    }
}

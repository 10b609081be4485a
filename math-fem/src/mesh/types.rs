//! Mesh types for 2D triangle meshes
//!
//! Cells store their three corners counter-clockwise. Local edge `k` of a
//! cell is the edge opposite corner `k`, i.e. `(v[k+1], v[k+2])` modulo 3.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// A point in the plane
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another point
    pub fn distance(&self, other: &Point) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }

    /// Midpoint between two points
    pub fn midpoint(&self, other: &Point) -> Point {
        Point {
            x: 0.5 * (self.x + other.x),
            y: 0.5 * (self.y + other.y),
        }
    }
}

impl From<(f64, f64)> for Point {
    fn from(p: (f64, f64)) -> Self {
        Point::new(p.0, p.1)
    }
}

/// Edge represented by sorted node indices
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Edge(pub usize, pub usize);

impl Edge {
    pub fn new(a: usize, b: usize) -> Self {
        if a < b { Edge(a, b) } else { Edge(b, a) }
    }

    pub fn contains(&self, node: usize) -> bool {
        self.0 == node || self.1 == node
    }
}

/// Local edges of a cell, edge `k` opposite corner `k`
pub fn cell_edges(cell: &[usize; 3]) -> [Edge; 3] {
    [
        Edge::new(cell[1], cell[2]),
        Edge::new(cell[2], cell[0]),
        Edge::new(cell[0], cell[1]),
    ]
}

/// Errors raised when building a mesh from raw arrays
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MeshError {
    #[error("Cell {cell} references node {node}, which does not exist")]
    InvalidCell { cell: usize, node: usize },
    #[error("Cell {cell} repeats a corner node")]
    DegenerateCell { cell: usize },
}

/// A conforming (or, for tree meshes, hanging-node) triangle mesh
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriangleMesh {
    /// Node coordinates
    pub nodes: Vec<Point>,
    /// Corner node indices, counter-clockwise
    pub cells: Vec<[usize; 3]>,
}

impl TriangleMesh {
    /// Create a mesh, checking that every cell references existing, distinct nodes
    pub fn new(nodes: Vec<Point>, cells: Vec<[usize; 3]>) -> Result<Self, MeshError> {
        for (c, cell) in cells.iter().enumerate() {
            if let Some(&node) = cell.iter().find(|&&v| v >= nodes.len()) {
                return Err(MeshError::InvalidCell { cell: c, node });
            }
            if cell[0] == cell[1] || cell[1] == cell[2] || cell[2] == cell[0] {
                return Err(MeshError::DegenerateCell { cell: c });
            }
        }
        Ok(Self { nodes, cells })
    }

    pub fn number_of_nodes(&self) -> usize {
        self.nodes.len()
    }

    pub fn number_of_cells(&self) -> usize {
        self.cells.len()
    }

    pub fn number_of_edges(&self) -> usize {
        self.edges().len()
    }

    /// Unique edges, sorted
    pub fn edges(&self) -> Vec<Edge> {
        let mut edges: Vec<Edge> = self.cells.iter().flat_map(cell_edges).collect();
        edges.sort_unstable();
        edges.dedup();
        edges
    }

    fn edge_index(&self) -> HashMap<Edge, usize> {
        self.edges()
            .into_iter()
            .enumerate()
            .map(|(i, e)| (e, i))
            .collect()
    }

    /// Global edge index of each local edge of each cell
    pub fn cell_to_edge(&self) -> Vec<[usize; 3]> {
        let index = self.edge_index();
        self.cells
            .iter()
            .map(|cell| cell_edges(cell).map(|e| index[&e]))
            .collect()
    }

    /// Neighbour across each local edge (`None` on the boundary)
    pub fn cell_to_cell(&self) -> Vec<[Option<usize>; 3]> {
        let mut owners: HashMap<Edge, Vec<usize>> = HashMap::new();
        for (c, cell) in self.cells.iter().enumerate() {
            for e in cell_edges(cell) {
                owners.entry(e).or_default().push(c);
            }
        }
        self.cells
            .iter()
            .enumerate()
            .map(|(c, cell)| {
                cell_edges(cell).map(|e| owners[&e].iter().copied().find(|&other| other != c))
            })
            .collect()
    }

    /// Edges owned by exactly one cell
    pub fn boundary_edges(&self) -> Vec<Edge> {
        let mut count: HashMap<Edge, usize> = HashMap::new();
        for cell in &self.cells {
            for e in cell_edges(cell) {
                *count.entry(e).or_insert(0) += 1;
            }
        }
        let mut edges: Vec<Edge> = count
            .into_iter()
            .filter(|&(_, n)| n == 1)
            .map(|(e, _)| e)
            .collect();
        edges.sort_unstable();
        edges
    }

    /// Boundary flag per edge, in the order of [`TriangleMesh::edges`]
    pub fn is_boundary_edge(&self) -> Vec<bool> {
        let index = self.edge_index();
        let mut flags = vec![false; index.len()];
        for e in self.boundary_edges() {
            flags[index[&e]] = true;
        }
        flags
    }

    /// Boundary flag per node
    pub fn is_boundary_node(&self) -> Vec<bool> {
        let mut flags = vec![false; self.nodes.len()];
        for Edge(a, b) in self.boundary_edges() {
            flags[a] = true;
            flags[b] = true;
        }
        flags
    }

    /// Twice the signed area (positive for counter-clockwise cells)
    fn signed_area2(&self, c: usize) -> f64 {
        let [p0, p1, p2] = self.cells[c].map(|v| self.nodes[v]);
        (p1.x - p0.x) * (p2.y - p0.y) - (p2.x - p0.x) * (p1.y - p0.y)
    }

    pub fn cell_area(&self, c: usize) -> f64 {
        0.5 * self.signed_area2(c).abs()
    }

    pub fn cell_barycenter(&self, c: usize) -> Point {
        let [p0, p1, p2] = self.cells[c].map(|v| self.nodes[v]);
        Point::new((p0.x + p1.x + p2.x) / 3.0, (p0.y + p1.y + p2.y) / 3.0)
    }

    pub fn edge_barycenter(&self, edge: Edge) -> Point {
        self.nodes[edge.0].midpoint(&self.nodes[edge.1])
    }

    /// Gradients of the barycentric coordinates of cell `c`
    pub fn grad_lambda(&self, c: usize) -> [[f64; 2]; 3] {
        let pts = self.cells[c].map(|v| self.nodes[v]);
        let area2 = self.signed_area2(c);
        std::array::from_fn(|i| {
            let pj = pts[(i + 1) % 3];
            let pk = pts[(i + 2) % 3];
            [(pj.y - pk.y) / area2, (pk.x - pj.x) / area2]
        })
    }

    /// Longest edge length
    pub fn mesh_size(&self) -> f64 {
        self.edges()
            .iter()
            .map(|e| self.nodes[e.0].distance(&self.nodes[e.1]))
            .fold(0.0, f64::max)
    }
}

//! Finite element matrix assembly
//!
//! Element contributions are computed cell by cell as triplets and summed
//! into a [`CsrMatrix`].

mod crouzeix_raviart;
mod elasticity;
mod lagrange;

pub use crouzeix_raviart::*;
pub use elasticity::*;
pub use lagrange::*;

use solvers::CsrMatrix;

/// Assembled matrix in triplet format
#[derive(Debug, Clone)]
pub struct TripletMatrix {
    /// Row indices
    pub rows: Vec<usize>,
    /// Column indices
    pub cols: Vec<usize>,
    /// Values, duplicates are summed on conversion
    pub values: Vec<f64>,
    pub num_rows: usize,
    pub num_cols: usize,
}

impl TripletMatrix {
    pub fn new(num_rows: usize, num_cols: usize) -> Self {
        Self {
            rows: Vec::new(),
            cols: Vec::new(),
            values: Vec::new(),
            num_rows,
            num_cols,
        }
    }

    /// Add a triplet (i, j, value)
    pub fn add(&mut self, i: usize, j: usize, value: f64) {
        self.rows.push(i);
        self.cols.push(j);
        self.values.push(value);
    }

    /// Number of stored triplets (before duplicates are summed)
    pub fn nnz(&self) -> usize {
        self.values.len()
    }

    /// Convert to CSR, summing duplicate entries
    pub fn to_csr(&self) -> CsrMatrix<f64> {
        let triplets = self
            .rows
            .iter()
            .zip(&self.cols)
            .zip(&self.values)
            .map(|((&i, &j), &v)| (i, j, v))
            .collect();
        CsrMatrix::from_triplets(self.num_rows, self.num_cols, triplets)
    }
}

/// Run `element` on every cell and gather its triplets into one matrix
fn assemble_cells<F>(num_cells: usize, num_rows: usize, num_cols: usize, element: F) -> TripletMatrix
where
    F: Fn(usize) -> Vec<(usize, usize, f64)>,
{
    let mut matrix = TripletMatrix::new(num_rows, num_cols);
    for cell in 0..num_cells {
        for (i, j, v) in element(cell) {
            matrix.add(i, j, v);
        }
    }
    matrix
}

/// Symmetric local matrix to triplets, dropping exact zeros
fn local_triplets<const N: usize>(dofs: &[usize; N], local: &[[f64; N]; N]) -> Vec<(usize, usize, f64)> {
    let mut triplets = Vec::with_capacity(N * N);
    for (i, &gi) in dofs.iter().enumerate() {
        for (j, &gj) in dofs.iter().enumerate() {
            if local[i][j] != 0.0 {
                triplets.push((gi, gj, local[i][j]));
            }
        }
    }
    triplets
}

fn dot2(a: &[f64; 2], b: &[f64; 2]) -> f64 {
    a[0] * b[0] + a[1] * b[1]
}

//! Compressed Sparse Row (CSR) matrix format
//!
//! CSR format stores:
//! - `values`: Non-zero entries in row-major order
//! - `col_indices`: Column index for each value
//! - `row_ptrs`: Index into values/col_indices where each row starts

use crate::traits::{LinearOperator, Scalar};
use ndarray::{Array1, Array2};
use std::ops::Range;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Rows below which the parallel mat-vec is not worth the scheduling cost
#[cfg(feature = "parallel")]
const PARALLEL_MATVEC_MIN_ROWS: usize = 256;

/// Compressed Sparse Row (CSR) matrix format
///
/// Memory-efficient storage for sparse matrices with O(nnz) space complexity.
/// Column indices within a row are kept sorted by every constructor.
#[derive(Debug, Clone, PartialEq)]
pub struct CsrMatrix<T: Scalar> {
    /// Number of rows
    pub num_rows: usize,
    /// Number of columns
    pub num_cols: usize,
    /// Non-zero values in row-major order
    pub values: Vec<T>,
    /// Column indices for each value
    pub col_indices: Vec<usize>,
    /// Row pointers: row_ptrs[i] is the start index in values/col_indices for row i
    /// row_ptrs[num_rows] = nnz (total number of non-zeros)
    pub row_ptrs: Vec<usize>,
}

impl<T: Scalar> CsrMatrix<T> {
    /// Create a new empty (all-zero) CSR matrix
    pub fn new(num_rows: usize, num_cols: usize) -> Self {
        Self {
            num_rows,
            num_cols,
            values: Vec::new(),
            col_indices: Vec::new(),
            row_ptrs: vec![0; num_rows + 1],
        }
    }

    /// Create a CSR matrix from a dense matrix
    ///
    /// Only stores entries with magnitude > threshold
    pub fn from_dense(dense: &Array2<T>, threshold: T) -> Self {
        let (num_rows, num_cols) = dense.dim();

        let mut values = Vec::new();
        let mut col_indices = Vec::new();
        let mut row_ptrs = Vec::with_capacity(num_rows + 1);
        row_ptrs.push(0);

        for row in dense.rows() {
            for (j, &val) in row.iter().enumerate() {
                if val.abs() > threshold {
                    values.push(val);
                    col_indices.push(j);
                }
            }
            row_ptrs.push(values.len());
        }

        Self {
            num_rows,
            num_cols,
            values,
            col_indices,
            row_ptrs,
        }
    }

    /// Create a CSR matrix from COO (Coordinate) format triplets
    ///
    /// Triplets are (row, col, value). Duplicate entries are summed, which is
    /// what finite element assembly relies on.
    pub fn from_triplets(
        num_rows: usize,
        num_cols: usize,
        mut triplets: Vec<(usize, usize, T)>,
    ) -> Self {
        triplets.sort_unstable_by_key(|&(i, j, _)| (i, j));

        let mut values: Vec<T> = Vec::with_capacity(triplets.len());
        let mut col_indices: Vec<usize> = Vec::with_capacity(triplets.len());
        let mut row_counts = vec![0usize; num_rows];
        let mut last: Option<(usize, usize)> = None;

        for (i, j, val) in triplets {
            debug_assert!(i < num_rows && j < num_cols, "triplet ({i}, {j}) out of range");
            if last == Some((i, j)) {
                if let Some(acc) = values.last_mut() {
                    *acc += val;
                }
                continue;
            }
            values.push(val);
            col_indices.push(j);
            row_counts[i] += 1;
            last = Some((i, j));
        }

        let mut row_ptrs = Vec::with_capacity(num_rows + 1);
        row_ptrs.push(0);
        for count in row_counts {
            let next = row_ptrs[row_ptrs.len() - 1] + count;
            row_ptrs.push(next);
        }

        Self {
            num_rows,
            num_cols,
            values,
            col_indices,
            row_ptrs,
        }
    }

    /// Number of non-zero entries
    pub fn nnz(&self) -> usize {
        self.values.len()
    }

    /// Get the range of indices in values/col_indices for a given row
    pub fn row_range(&self, row: usize) -> Range<usize> {
        self.row_ptrs[row]..self.row_ptrs[row + 1]
    }

    /// Get the (col, value) pairs for a row
    pub fn row_entries(&self, row: usize) -> impl Iterator<Item = (usize, T)> + '_ {
        let range = self.row_range(row);
        self.col_indices[range.clone()]
            .iter()
            .copied()
            .zip(self.values[range].iter().copied())
    }

    /// Matrix-vector product: y = A * x
    ///
    /// Uses the rayon row-parallel kernel when the `parallel` feature is
    /// enabled and the matrix is large enough. Each row sum is accumulated in
    /// the same order either way, so results are bit-identical.
    pub fn matvec(&self, x: &Array1<T>) -> Array1<T> {
        assert_eq!(x.len(), self.num_cols, "Input vector size mismatch");

        #[cfg(feature = "parallel")]
        {
            if self.num_rows >= PARALLEL_MATVEC_MIN_ROWS {
                return self.matvec_parallel(x);
            }
        }

        self.matvec_sequential(x)
    }

    fn row_dot(&self, i: usize, x: &Array1<T>) -> T {
        self.row_entries(i)
            .fold(T::zero(), |acc, (j, a_ij)| acc + a_ij * x[j])
    }

    fn matvec_sequential(&self, x: &Array1<T>) -> Array1<T> {
        Array1::from_iter((0..self.num_rows).map(|i| self.row_dot(i, x)))
    }

    #[cfg(feature = "parallel")]
    fn matvec_parallel(&self, x: &Array1<T>) -> Array1<T> {
        let results: Vec<T> = (0..self.num_rows)
            .into_par_iter()
            .map(|i| self.row_dot(i, x))
            .collect();
        Array1::from_vec(results)
    }

    /// Transpose matrix-vector product: y = A^T * x
    pub fn matvec_transpose(&self, x: &Array1<T>) -> Array1<T> {
        assert_eq!(x.len(), self.num_rows, "Input vector size mismatch");

        let mut y = Array1::from_elem(self.num_cols, T::zero());
        for i in 0..self.num_rows {
            for (j, a_ij) in self.row_entries(i) {
                y[j] += a_ij * x[i];
            }
        }
        y
    }

    /// Get element at (i, j), returns 0 if not stored
    pub fn get(&self, i: usize, j: usize) -> T {
        let range = self.row_range(i);
        match self.col_indices[range.clone()].binary_search(&j) {
            Ok(pos) => self.values[range.start + pos],
            Err(_) => T::zero(),
        }
    }

    /// Extract diagonal elements
    pub fn diagonal(&self) -> Array1<T> {
        let n = self.num_rows.min(self.num_cols);
        Array1::from_iter((0..n).map(|i| self.get(i, i)))
    }

    /// Create identity matrix in CSR format
    pub fn identity(n: usize) -> Self {
        Self {
            num_rows: n,
            num_cols: n,
            values: vec![T::one(); n],
            col_indices: (0..n).collect(),
            row_ptrs: (0..=n).collect(),
        }
    }

    /// Create diagonal matrix from vector
    pub fn from_diagonal(diag: &Array1<T>) -> Self {
        let n = diag.len();
        Self {
            num_rows: n,
            num_cols: n,
            values: diag.to_vec(),
            col_indices: (0..n).collect(),
            row_ptrs: (0..=n).collect(),
        }
    }

    /// Convert to dense matrix (for direct factorisation of small systems)
    pub fn to_dense(&self) -> Array2<T> {
        let mut dense = Array2::from_elem((self.num_rows, self.num_cols), T::zero());
        for i in 0..self.num_rows {
            for (j, a_ij) in self.row_entries(i) {
                dense[[i, j]] = a_ij;
            }
        }
        dense
    }

    /// Explicit transpose A^T
    pub fn transpose(&self) -> CsrMatrix<T> {
        let mut counts = vec![0usize; self.num_cols];
        for &j in &self.col_indices {
            counts[j] += 1;
        }

        let mut row_ptrs = Vec::with_capacity(self.num_cols + 1);
        row_ptrs.push(0);
        for count in &counts {
            let next = row_ptrs[row_ptrs.len() - 1] + count;
            row_ptrs.push(next);
        }

        // Rows of A are visited in order, so each row of A^T comes out sorted
        let mut cursor = row_ptrs[..self.num_cols].to_vec();
        let mut col_indices = vec![0usize; self.nnz()];
        let mut values = vec![T::zero(); self.nnz()];
        for i in 0..self.num_rows {
            for (j, a_ij) in self.row_entries(i) {
                let pos = cursor[j];
                col_indices[pos] = i;
                values[pos] = a_ij;
                cursor[j] += 1;
            }
        }

        CsrMatrix {
            num_rows: self.num_cols,
            num_cols: self.num_rows,
            values,
            col_indices,
            row_ptrs,
        }
    }

    /// Keep only the entries for which `keep(row, col, value)` holds
    pub fn filter<F>(&self, mut keep: F) -> CsrMatrix<T>
    where
        F: FnMut(usize, usize, T) -> bool,
    {
        let mut values = Vec::with_capacity(self.nnz());
        let mut col_indices = Vec::with_capacity(self.nnz());
        let mut row_ptrs = Vec::with_capacity(self.num_rows + 1);
        row_ptrs.push(0);

        for i in 0..self.num_rows {
            for (j, a_ij) in self.row_entries(i) {
                if keep(i, j, a_ij) {
                    values.push(a_ij);
                    col_indices.push(j);
                }
            }
            row_ptrs.push(values.len());
        }

        CsrMatrix {
            num_rows: self.num_rows,
            num_cols: self.num_cols,
            values,
            col_indices,
            row_ptrs,
        }
    }

    /// Scale row i by `left[i]` and column j by `right[j]`: diag(left) * A * diag(right)
    pub fn scale_rows_cols(&self, left: &Array1<T>, right: &Array1<T>) -> CsrMatrix<T> {
        assert_eq!(left.len(), self.num_rows, "Row scaling size mismatch");
        assert_eq!(right.len(), self.num_cols, "Column scaling size mismatch");

        let mut scaled = self.clone();
        for i in 0..self.num_rows {
            for idx in self.row_range(i) {
                let j = self.col_indices[idx];
                scaled.values[idx] = left[i] * self.values[idx] * right[j];
            }
        }
        scaled
    }

    /// Entry-wise sum A + alpha * B of two matrices with the same shape
    pub fn add_scaled(&self, alpha: T, other: &CsrMatrix<T>) -> CsrMatrix<T> {
        assert_eq!(
            (self.num_rows, self.num_cols),
            (other.num_rows, other.num_cols),
            "Matrix shape mismatch in add_scaled"
        );

        let mut triplets = Vec::with_capacity(self.nnz() + other.nnz());
        for i in 0..self.num_rows {
            triplets.extend(self.row_entries(i).map(|(j, v)| (i, j, v)));
            triplets.extend(other.row_entries(i).map(|(j, v)| (i, j, alpha * v)));
        }
        CsrMatrix::from_triplets(self.num_rows, self.num_cols, triplets)
    }

    /// Compute C = A * B
    ///
    /// Row-wise sorted accumulation. An entry is dropped when it is within
    /// rounding of zero relative to the largest product summed into its row,
    /// which keeps Galerkin coarse operators from filling in with
    /// cancellation noise whatever the scale of the factors.
    pub fn matmul(&self, other: &CsrMatrix<T>) -> CsrMatrix<T> {
        assert_eq!(
            self.num_cols, other.num_rows,
            "Matrix dimension mismatch: A.cols ({}) != B.rows ({})",
            self.num_cols, other.num_rows
        );

        let m = self.num_rows;
        let n = other.num_cols;
        if m == 0 || n == 0 || self.nnz() == 0 || other.nnz() == 0 {
            return CsrMatrix::new(m, n);
        }

        let rel_tol = T::epsilon() * T::from_f64_lossy(64.0);
        let mut values = Vec::with_capacity(self.nnz());
        let mut col_indices = Vec::with_capacity(self.nnz());
        let mut row_ptrs = Vec::with_capacity(m + 1);
        row_ptrs.push(0);
        let mut row_data: Vec<(usize, T)> = Vec::new();

        for i in 0..m {
            row_data.clear();
            for (k, a_ik) in self.row_entries(i) {
                row_data.extend(other.row_entries(k).map(|(j, b_kj)| (j, a_ik * b_kj)));
            }
            row_data.sort_unstable_by_key(|&(j, _)| j);
            let tol = rel_tol * row_data.iter().fold(T::zero(), |m, &(_, v)| m.max(v.abs()));

            let mut iter = row_data.iter().copied();
            if let Some((mut current_j, mut current_val)) = iter.next() {
                for (j, val) in iter {
                    if j == current_j {
                        current_val += val;
                    } else {
                        if current_val.abs() > tol {
                            col_indices.push(current_j);
                            values.push(current_val);
                        }
                        current_j = j;
                        current_val = val;
                    }
                }
                if current_val.abs() > tol {
                    col_indices.push(current_j);
                    values.push(current_val);
                }
            }
            row_ptrs.push(values.len());
        }

        CsrMatrix {
            num_rows: m,
            num_cols: n,
            values,
            col_indices,
            row_ptrs,
        }
    }
}

impl<T: Scalar> LinearOperator<T> for CsrMatrix<T> {
    fn num_rows(&self) -> usize {
        self.num_rows
    }

    fn num_cols(&self) -> usize {
        self.num_cols
    }

    fn apply(&self, x: &Array1<T>) -> Array1<T> {
        self.matvec(x)
    }

    fn apply_transpose(&self, x: &Array1<T>) -> Array1<T> {
        self.matvec_transpose(x)
    }
}

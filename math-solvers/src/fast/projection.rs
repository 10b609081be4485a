//! Boundary projection of the auxiliary matrix

use super::{Result, SolverError};
use crate::sparse::CsrMatrix;

/// Build `P' = T P T + T_bd`
///
/// `T` is the diagonal 0/1 matrix selecting interior dofs and `T_bd` its
/// complement. Rows and columns of boundary dofs are cleared and their
/// diagonal set to one; interior entries of `P` are kept exactly. The
/// result is checked to have a positive diagonal, which AMG and CG on `P'`
/// require.
pub fn project_boundary(p: &CsrMatrix<f64>, is_bd: &[bool]) -> Result<CsrMatrix<f64>> {
    if p.num_rows != p.num_cols {
        return Err(SolverError::DimensionMismatch {
            what: "auxiliary matrix columns",
            expected: p.num_rows,
            actual: p.num_cols,
        });
    }
    if is_bd.len() != p.num_rows {
        return Err(SolverError::DimensionMismatch {
            what: "boundary flags",
            expected: p.num_rows,
            actual: is_bd.len(),
        });
    }

    let n = p.num_rows;
    let mut triplets = Vec::with_capacity(p.nnz());
    for (i, &bd) in is_bd.iter().enumerate() {
        if bd {
            triplets.push((i, i, 1.0));
        } else {
            triplets.extend(
                p.row_entries(i)
                    .filter(|&(j, _)| !is_bd[j])
                    .map(|(j, v)| (i, j, v)),
            );
        }
    }
    let projected = CsrMatrix::from_triplets(n, n, triplets);

    if let Some(row) = projected.diagonal().iter().position(|&d| !(d > 0.0)) {
        return Err(SolverError::DegeneratePreconditioner { row });
    }

    Ok(projected)
}

//! Marking strategies for adaptive refinement
//!
//! Both strategies take one error indicator per leaf (in
//! [`Tritree::leaf_cell_index`](super::Tritree::leaf_cell_index) order) and
//! return positions into that list.

/// Mark elements for refinement based on Dörfler marking strategy
///
/// Marks the smallest set of largest indicators whose squared sum reaches a
/// fraction `theta` of the total. Ties keep their original order.
pub fn doerfler_marking(element_errors: &[f64], theta: f64) -> Vec<usize> {
    let total_error_sq: f64 = element_errors.iter().map(|e| e * e).sum();
    let target = theta * total_error_sq;
    if target <= 0.0 {
        return Vec::new();
    }

    // Sort elements by error (descending)
    let mut indexed_errors: Vec<(usize, f64)> = element_errors.iter().copied().enumerate().collect();
    indexed_errors.sort_by(|a, b| b.1.total_cmp(&a.1));

    let mut marked = Vec::new();
    let mut accumulated = 0.0;

    for (idx, error) in indexed_errors {
        marked.push(idx);
        accumulated += error * error;
        if accumulated >= target {
            break;
        }
    }

    marked.sort_unstable();
    marked
}

/// Mark elements whose indicator exceeds `fraction` of the largest one
pub fn maximum_marking(element_errors: &[f64], fraction: f64) -> Vec<usize> {
    let max = element_errors.iter().copied().fold(0.0, f64::max);
    if max <= 0.0 {
        return Vec::new();
    }
    element_errors
        .iter()
        .enumerate()
        .filter(|&(_, &e)| e >= fraction * max)
        .map(|(i, _)| i)
        .collect()
}

//! Parallel utilities with feature-gated implementations
//!
//! With the `parallel` feature the maps run on the rayon pool, otherwise they
//! fall back to sequential iterators. Results are collected in index order in
//! both cases.

/// Check if parallel processing is available
pub fn is_parallel_available() -> bool {
    cfg!(feature = "parallel")
}

/// Map `f` over `0..n`, collecting results in index order
#[cfg(feature = "parallel")]
pub fn parallel_map_indexed<U, F>(n: usize, f: F) -> Vec<U>
where
    U: Send,
    F: Fn(usize) -> U + Sync + Send,
{
    use rayon::prelude::*;
    (0..n).into_par_iter().map(f).collect()
}

/// Map `f` over `0..n`, collecting results in index order
#[cfg(not(feature = "parallel"))]
pub fn parallel_map_indexed<U, F>(n: usize, f: F) -> Vec<U>
where
    F: Fn(usize) -> U,
{
    (0..n).map(f).collect()
}

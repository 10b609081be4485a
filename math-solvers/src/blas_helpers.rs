//! Level-1 vector kernels shared by the Krylov solvers
//!
//! Inner products are accumulated sequentially so a solve is bit-for-bit
//! reproducible for a given input.

use crate::traits::Scalar;
use ndarray::Array1;

/// Compute inner product (x, y) = Σ x_i * y_i
#[inline]
pub fn inner_product<T: Scalar>(x: &Array1<T>, y: &Array1<T>) -> T {
    assert_eq!(
        x.len(),
        y.len(),
        "Vector lengths must match for inner product"
    );
    x.iter()
        .zip(y.iter())
        .fold(T::zero(), |acc, (&xi, &yi)| acc + xi * yi)
}

/// Compute vector 2-norm: ||x||_2 = sqrt(Σ x_i^2)
#[inline]
pub fn vector_norm<T: Scalar>(x: &Array1<T>) -> T {
    inner_product(x, x).sqrt()
}

/// y = y + α * x
#[inline]
pub fn axpy<T: Scalar>(alpha: T, x: &Array1<T>, y: &mut Array1<T>) {
    y.zip_mut_with(x, |yi, &xi| *yi += alpha * xi);
}

/// y = x + β * y
#[inline]
pub fn xpby<T: Scalar>(x: &Array1<T>, beta: T, y: &mut Array1<T>) {
    y.zip_mut_with(x, |yi, &xi| *yi = xi + beta * *yi);
}

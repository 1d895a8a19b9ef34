// src/linalg.rs

//! Dense helpers shared by the batch and incremental routines.

use crate::error::{PcaError, Result};
use ndarray::{s, Array2, ArrayView2};

/// Replaces a square matrix `C` with `(C + C^T) / 2`.
///
/// Covariance and Gram matrices are symmetric in exact arithmetic, but the
/// products that form them are not bitwise symmetric. The eigensolver only
/// reads the upper triangle, so both halves are averaged first.
pub fn symmetrize(matrix: &mut Array2<f64>) {
    debug_assert_eq!(matrix.nrows(), matrix.ncols(), "symmetrize expects a square matrix");
    let symmetric = (&*matrix + &matrix.t()) * 0.5;
    matrix.assign(&symmetric);
}

/// Computes `A · B` and writes the result into the leading rows of `B`.
///
/// `a` is `p x n` and `b` is `n x d` with `p <= n`. After the call the first
/// `p` rows of `b` hold the product; the remaining `n - p` rows are left as
/// they were. The product is formed `block_size` columns at a time, so the
/// extra memory is `p x block_size` instead of `p x d`.
///
/// # Errors
/// Returns `InvalidShape` if the inner dimensions differ, if `p > n`, or if
/// `block_size` is zero.
pub fn dot_inplace_right(a: ArrayView2<f64>, b: &mut Array2<f64>, block_size: usize) -> Result<()> {
    let (p, n) = a.dim();
    let (n_b, d) = b.dim();
    if n != n_b {
        return Err(PcaError::InvalidShape(format!(
            "Cannot multiply a {}x{} matrix by a {}x{} matrix.",
            p, n, n_b, d
        )));
    }
    if p > n {
        return Err(PcaError::InvalidShape(format!(
            "In-place product needs at most {} output rows, got {}.",
            n, p
        )));
    }
    if block_size == 0 {
        return Err(PcaError::InvalidShape("Block size must be greater than 0.".into()));
    }

    for start in (0..d).step_by(block_size) {
        let end = (start + block_size).min(d);
        // The whole column strip is read before any of it is overwritten.
        let block = a.dot(&b.slice(s![.., start..end]));
        b.slice_mut(s![..p, start..end]).assign(&block);
    }
    Ok(())
}

//! Sparse matrix helpers.
//!
//! Problem data (cost Hessian, constraint Jacobians) arrive as `sprs` CSC
//! matrices. These helpers build them from triplets and provide the few
//! dense-vector kernels used by the solver and diagnostics.

use sprs::{CsMat, TriMat};

/// Sparse matrix in CSC format (general, not necessarily symmetric).
pub type SparseCsc = CsMat<f64>;

/// Sparse symmetric matrix in CSC format (upper triangle only).
pub type SparseSymmetricCsc = CsMat<f64>;

/// Build a sparse CSC matrix from triplets (row, col, value).
///
/// Duplicate entries are summed.
pub fn from_triplets<I>(nrows: usize, ncols: usize, triplets: I) -> SparseCsc
where
    I: IntoIterator<Item = (usize, usize, f64)>,
{
    let mut tri = TriMat::new((nrows, ncols));
    for (i, j, v) in triplets {
        tri.add_triplet(i, j, v);
    }
    tri.to_csc()
}

/// Build a symmetric sparse CSC matrix from upper triangle triplets.
///
/// Only stores the upper triangle. Assumes triplets satisfy j >= i.
pub fn from_triplets_symmetric<I>(n: usize, triplets: I) -> SparseSymmetricCsc
where
    I: IntoIterator<Item = (usize, usize, f64)>,
{
    let mut tri = TriMat::new((n, n));
    for (i, j, v) in triplets {
        assert!(j >= i, "Symmetric matrix must only contain upper triangle");
        tri.add_triplet(i, j, v);
    }
    tri.to_csc()
}

/// True when `a` and `b` have the same shape and the same stored structure.
pub fn same_structure(a: &SparseCsc, b: &SparseCsc) -> bool {
    a.shape() == b.shape()
        && a.is_csc() == b.is_csc()
        && a.indptr().raw_storage() == b.indptr().raw_storage()
        && a.indices() == b.indices()
}

/// Symmetric product `y = K x` with `K` given by its upper triangle as raw
/// CSC arrays.
pub fn symm_matvec_upper(
    col_ptr: &[usize],
    row_idx: &[usize],
    values: &[f64],
    x: &[f64],
    y: &mut [f64],
) {
    y.fill(0.0);
    for col in 0..col_ptr.len() - 1 {
        let xc = x[col];
        let mut acc = 0.0;
        for p in col_ptr[col]..col_ptr[col + 1] {
            let row = row_idx[p];
            let val = values[p];
            y[row] += val * xc;
            if row != col {
                acc += val * x[row];
            }
        }
        y[col] += acc;
    }
}

#[inline]
pub fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b.iter()).map(|(ai, bi)| ai * bi).sum()
}

#[inline]
pub fn norm_sq(v: &[f64]) -> f64 {
    dot(v, v)
}

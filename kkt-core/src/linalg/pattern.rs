//! Symmetric sparsity patterns.
//!
//! A [`SymmetricPattern`] is the upper triangle of an N×N symmetric matrix in
//! CSC form with sorted row indices. Every diagonal slot is structurally
//! present, so the diagonal of column `j` is always the last slot of that
//! column. Numeric values live outside the pattern as a plain slice aligned
//! with its slots.

use super::sparse::SparseCsc;
use crate::error::{KktError, KktResult};

/// Upper-triangular CSC pattern of a symmetric matrix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymmetricPattern {
    n: usize,
    col_ptr: Vec<usize>,
    row_idx: Vec<usize>,
}

impl SymmetricPattern {
    /// Build from upper-triangle coordinates `(row, col)` with `row <= col`.
    ///
    /// Duplicates are merged and missing diagonal slots inserted.
    pub fn from_upper_entries<I>(n: usize, entries: I) -> KktResult<Self>
    where
        I: IntoIterator<Item = (usize, usize)>,
    {
        let mut columns: Vec<Vec<usize>> = (0..n).map(|j| vec![j]).collect();
        for (row, col) in entries {
            check_bounds(n, row, col)?;
            if row > col {
                return Err(KktError::config(format!(
                    "entry ({}, {}) lies below the diagonal of an upper-triangle pattern",
                    row, col
                )));
            }
            columns[col].push(row);
        }
        Ok(Self::from_columns(n, columns))
    }

    /// Build from the coordinates of a full symmetric pattern.
    ///
    /// Fails unless `(row, col)` is present exactly when `(col, row)` is.
    pub fn from_full_entries<I>(n: usize, entries: I) -> KktResult<Self>
    where
        I: IntoIterator<Item = (usize, usize)>,
    {
        let mut upper: Vec<Vec<usize>> = (0..n).map(|j| vec![j]).collect();
        let mut lower: Vec<Vec<usize>> = (0..n).map(|j| vec![j]).collect();
        for (row, col) in entries {
            check_bounds(n, row, col)?;
            if row <= col {
                upper[col].push(row);
            } else {
                // (row, col) below the diagonal mirrors to (col, row) above it
                lower[row].push(col);
            }
        }
        for (col, (up, low)) in upper.iter_mut().zip(lower.iter_mut()).enumerate() {
            up.sort_unstable();
            up.dedup();
            low.sort_unstable();
            low.dedup();
            if up != low {
                let missing = up
                    .iter()
                    .find(|r| !low.contains(r))
                    .or_else(|| low.iter().find(|r| !up.contains(r)))
                    .copied()
                    .unwrap_or(col);
                return Err(KktError::config(format!(
                    "pattern is not symmetric: entry ({}, {}) has no mirror",
                    missing, col
                )));
            }
        }
        Ok(Self::from_columns(n, upper))
    }

    /// Build from the structure of a square `sprs` matrix.
    ///
    /// A matrix whose entries all satisfy `row <= col` is taken as an upper
    /// triangle; otherwise it must be structurally symmetric.
    pub fn from_csc(mat: &SparseCsc) -> KktResult<Self> {
        let (rows, cols) = mat.shape();
        if rows != cols {
            return Err(KktError::config(format!(
                "pattern must be square, got {}x{}",
                rows, cols
            )));
        }
        let entries: Vec<(usize, usize)> = mat.iter().map(|(_, (r, c))| (r, c)).collect();
        if entries.iter().all(|&(r, c)| r <= c) {
            Self::from_upper_entries(rows, entries)
        } else {
            Self::from_full_entries(rows, entries)
        }
    }

    /// Adopt raw upper-triangular CSC arrays without reordering them.
    ///
    /// Slot positions are preserved, so a value array laid out for these
    /// arrays can be passed to the factorizer unchanged.
    pub fn from_raw_parts(n: usize, col_ptr: Vec<usize>, row_idx: Vec<usize>) -> KktResult<Self> {
        if col_ptr.len() != n + 1 {
            return Err(KktError::config(format!(
                "col_ptr length {} != n+1 = {}",
                col_ptr.len(),
                n + 1
            )));
        }
        if col_ptr[0] != 0 || col_ptr[n] != row_idx.len() {
            return Err(KktError::config(format!(
                "col_ptr must start at 0 and end at nnz = {}, got {}..{}",
                row_idx.len(),
                col_ptr[0],
                col_ptr[n]
            )));
        }
        for col in 0..n {
            let (start, end) = (col_ptr[col], col_ptr[col + 1]);
            if start > end {
                return Err(KktError::config(format!(
                    "col_ptr decreases at column {}",
                    col
                )));
            }
            let rows = &row_idx[start..end];
            if rows.windows(2).any(|w| w[0] >= w[1]) {
                return Err(KktError::config(format!(
                    "row indices of column {} are not strictly increasing",
                    col
                )));
            }
            match rows.last() {
                Some(&last) if last == col => {}
                Some(&last) if last > col => {
                    return Err(KktError::config(format!(
                        "entry ({}, {}) lies below the diagonal of an upper-triangle pattern",
                        last, col
                    )));
                }
                _ => {
                    return Err(KktError::config(format!(
                        "column {} has no diagonal slot",
                        col
                    )));
                }
            }
        }
        Ok(Self { n, col_ptr, row_idx })
    }

    fn from_columns(n: usize, mut columns: Vec<Vec<usize>>) -> Self {
        let mut col_ptr = Vec::with_capacity(n + 1);
        let mut row_idx = Vec::new();
        col_ptr.push(0);
        for rows in columns.iter_mut() {
            rows.sort_unstable();
            rows.dedup();
            row_idx.extend_from_slice(rows);
            col_ptr.push(row_idx.len());
        }
        Self { n, col_ptr, row_idx }
    }

    /// Matrix dimension.
    pub fn n(&self) -> usize {
        self.n
    }

    /// Number of stored slots (upper triangle including the diagonal).
    pub fn nnz(&self) -> usize {
        self.row_idx.len()
    }

    /// Number of stored strictly-upper slots.
    pub fn offdiag_nnz(&self) -> usize {
        self.nnz() - self.n
    }

    pub fn col_ptr(&self) -> &[usize] {
        &self.col_ptr
    }

    pub fn row_idx(&self) -> &[usize] {
        &self.row_idx
    }

    /// Slot holding the diagonal entry of `col`.
    #[inline]
    pub fn diag_slot(&self, col: usize) -> usize {
        self.col_ptr[col + 1] - 1
    }

    /// Slot holding entry `(row, col)` (either triangle), if present.
    pub fn slot(&self, row: usize, col: usize) -> Option<usize> {
        let (r, c) = if row <= col { (row, col) } else { (col, row) };
        if c >= self.n {
            return None;
        }
        let start = self.col_ptr[c];
        let rows = &self.row_idx[start..self.col_ptr[c + 1]];
        rows.binary_search(&r).ok().map(|k| start + k)
    }

    /// Iterate `(row, col)` over stored slots in slot order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        (0..self.n).flat_map(move |col| {
            self.row_idx[self.col_ptr[col]..self.col_ptr[col + 1]]
                .iter()
                .map(move |&row| (row, col))
        })
    }

    /// Gather the values of `mat` into slot order.
    ///
    /// Entries below the diagonal are ignored (the matrix is symmetric).
    /// Pattern slots absent from `mat` are zero; entries of `mat` that have
    /// no slot in the pattern are rejected.
    pub fn gather_values(&self, mat: &SparseCsc) -> KktResult<Vec<f64>> {
        let (rows, cols) = mat.shape();
        if rows != self.n || cols != self.n {
            return Err(KktError::dim("gather_values", self.n, rows.max(cols)));
        }
        let mut values = vec![0.0; self.nnz()];
        for (&val, (row, col)) in mat.iter() {
            if row > col {
                continue;
            }
            let slot = self.slot(row, col).ok_or_else(|| {
                KktError::config(format!(
                    "entry ({}, {}) is not part of the fixed pattern",
                    row, col
                ))
            })?;
            values[slot] += val;
        }
        Ok(values)
    }
}

fn check_bounds(n: usize, row: usize, col: usize) -> KktResult<()> {
    if row >= n || col >= n {
        return Err(KktError::config(format!(
            "entry ({}, {}) out of range for dimension {}",
            row, col, n
        )));
    }
    Ok(())
}

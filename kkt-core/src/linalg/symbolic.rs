//! Symbolic analysis for sparse LDL^T factorization.
//!
//! Runs once per problem structure and produces everything the numeric
//! phase needs, so that per-tick work follows a fixed schedule:
//! - the elimination order and the permuted upper-triangular pattern of A,
//!   with a map from every caller slot to its permuted slot
//! - the elimination tree
//! - the column structure of L (sorted row indices, unit diagonal implicit)
//! - the row schedule: for every row k, the ascending columns j < k with
//!   L[k, j] != 0 and the L storage slot of each

use super::ordering::{compute_ordering, Ordering, Permutation};
use super::pattern::SymmetricPattern;
use crate::error::{KktError, KktResult};

/// Expected sign of a pivot after regularization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PivotSign {
    /// Cost / primal / slack-barrier rows.
    Positive,
    /// Multiplier rows of the (regularized) zero block.
    Negative,
}

impl PivotSign {
    #[inline]
    pub fn value(self) -> f64 {
        match self {
            PivotSign::Positive => 1.0,
            PivotSign::Negative => -1.0,
        }
    }

    /// True when `d` lies strictly on this side of zero.
    #[inline]
    pub fn matches(self, d: f64) -> bool {
        self.value() * d > 0.0
    }
}

/// Complete symbolic analysis result.
#[derive(Debug, Clone)]
pub struct SymbolicFactor {
    n: usize,
    perm: Permutation,

    /// Expected pivot signs in elimination order.
    signs: Vec<PivotSign>,

    /// Permuted upper triangle of A.
    a_col_ptr: Vec<usize>,
    a_row_idx: Vec<usize>,
    /// caller slot -> permuted slot
    slot_map: Vec<usize>,

    /// Elimination tree; `None` marks a root.
    etree: Vec<Option<usize>>,

    /// Strictly-lower L in CSC form.
    l_col_ptr: Vec<usize>,
    l_row_idx: Vec<usize>,

    /// Row schedule (CSR view of L's pattern with slots into L storage).
    row_ptr: Vec<usize>,
    row_cols: Vec<usize>,
    row_slots: Vec<usize>,
}

impl SymbolicFactor {
    /// Analyze `pattern` with per-row expected pivot signs (natural order).
    pub fn analyze(
        pattern: &SymmetricPattern,
        signs: &[PivotSign],
        ordering: &Ordering,
    ) -> KktResult<Self> {
        let n = pattern.n();
        if signs.len() != n {
            return Err(KktError::config(format!(
                "row-sign metadata has length {}, pattern dimension is {}",
                signs.len(),
                n
            )));
        }

        let perm = compute_ordering(pattern, ordering)?;
        let (a_col_ptr, a_row_idx, slot_map) = permute_upper(pattern, perm.perm_inv());
        let etree = elimination_tree(n, &a_col_ptr, &a_row_idx);
        let (row_ptr, row_cols) = row_patterns(n, &a_col_ptr, &a_row_idx, &etree);

        // Column structure of L from the row patterns. Rows are visited in
        // increasing order, so each column comes out sorted.
        let mut l_col_ptr = vec![0usize; n + 1];
        for &j in &row_cols {
            l_col_ptr[j + 1] += 1;
        }
        for j in 0..n {
            l_col_ptr[j + 1] += l_col_ptr[j];
        }
        let nnz_l = row_cols.len();
        let mut l_row_idx = vec![0usize; nnz_l];
        let mut row_slots = vec![0usize; nnz_l];
        let mut next = l_col_ptr[..n].to_vec();
        for k in 0..n {
            for q in row_ptr[k]..row_ptr[k + 1] {
                let j = row_cols[q];
                let slot = next[j];
                l_row_idx[slot] = k;
                row_slots[q] = slot;
                next[j] += 1;
            }
        }

        let signs = perm.perm().iter().map(|&old| signs[old]).collect();

        let symbolic = Self {
            n,
            perm,
            signs,
            a_col_ptr,
            a_row_idx,
            slot_map,
            etree,
            l_col_ptr,
            l_row_idx,
            row_ptr,
            row_cols,
            row_slots,
        };

        log::debug!(
            "symbolic analysis: n={} nnz(A)={} nnz(L)={} fill-in={} natural_order={}",
            n,
            pattern.nnz(),
            symbolic.nnz_l(),
            symbolic.fill_in(),
            symbolic.perm.is_identity()
        );

        Ok(symbolic)
    }

    /// Matrix dimension.
    pub fn n(&self) -> usize {
        self.n
    }

    /// Number of stored strictly-lower entries of L.
    pub fn nnz_l(&self) -> usize {
        self.l_row_idx.len()
    }

    /// Number of stored slots of A (upper triangle with diagonal).
    pub fn nnz_a(&self) -> usize {
        self.a_row_idx.len()
    }

    /// Entries of L that are structurally zero in A.
    pub fn fill_in(&self) -> usize {
        self.nnz_l() - (self.nnz_a() - self.n)
    }

    /// Multiply-add count of one numeric factorization.
    pub fn factor_flops(&self) -> usize {
        (0..self.n)
            .map(|j| {
                let c = self.l_col_ptr[j + 1] - self.l_col_ptr[j];
                c * (c + 1) / 2
            })
            .sum()
    }

    pub fn permutation(&self) -> &Permutation {
        &self.perm
    }

    /// new index -> natural index
    pub fn perm(&self) -> &[usize] {
        self.perm.perm()
    }

    /// natural index -> new index
    pub fn perm_inv(&self) -> &[usize] {
        self.perm.perm_inv()
    }

    /// Expected pivot signs in elimination order.
    pub fn signs(&self) -> &[PivotSign] {
        &self.signs
    }

    pub fn etree(&self) -> &[Option<usize>] {
        &self.etree
    }

    pub fn a_col_ptr(&self) -> &[usize] {
        &self.a_col_ptr
    }

    pub fn a_row_idx(&self) -> &[usize] {
        &self.a_row_idx
    }

    /// Caller slot -> permuted slot.
    pub fn slot_map(&self) -> &[usize] {
        &self.slot_map
    }

    /// Permuted slot of the diagonal of elimination column `k`.
    #[inline]
    pub fn a_diag_slot(&self, k: usize) -> usize {
        self.a_col_ptr[k + 1] - 1
    }

    pub fn l_col_ptr(&self) -> &[usize] {
        &self.l_col_ptr
    }

    pub fn l_row_idx(&self) -> &[usize] {
        &self.l_row_idx
    }

    /// Columns `j < k` with `L[k, j] != 0`, ascending.
    #[inline]
    pub fn row_cols(&self, k: usize) -> &[usize] {
        &self.row_cols[self.row_ptr[k]..self.row_ptr[k + 1]]
    }

    /// L storage slots of [`row_cols`](Self::row_cols), aligned entry by entry.
    #[inline]
    pub fn row_slots(&self, k: usize) -> &[usize] {
        &self.row_slots[self.row_ptr[k]..self.row_ptr[k + 1]]
    }
}

/// Permute the upper triangle by `perm_inv` (old -> new), keeping it upper
/// and sorted. Returns (col_ptr, row_idx, old slot -> new slot).
fn permute_upper(
    pattern: &SymmetricPattern,
    perm_inv: &[usize],
) -> (Vec<usize>, Vec<usize>, Vec<usize>) {
    let n = pattern.n();
    let mut entries: Vec<(usize, usize, usize)> = pattern
        .iter()
        .enumerate()
        .map(|(slot, (row, col))| {
            let (r, c) = (perm_inv[row], perm_inv[col]);
            (r.max(c), r.min(c), slot)
        })
        .collect();
    entries.sort_unstable();

    let mut col_ptr = vec![0usize; n + 1];
    let mut row_idx = Vec::with_capacity(entries.len());
    let mut slot_map = vec![0usize; entries.len()];
    for (new_slot, &(col, row, old_slot)) in entries.iter().enumerate() {
        col_ptr[col + 1] += 1;
        row_idx.push(row);
        slot_map[old_slot] = new_slot;
    }
    for j in 0..n {
        col_ptr[j + 1] += col_ptr[j];
    }
    (col_ptr, row_idx, slot_map)
}

/// Elimination tree of an upper-triangular CSC pattern, with path
/// compression through `ancestor`.
fn elimination_tree(n: usize, col_ptr: &[usize], row_idx: &[usize]) -> Vec<Option<usize>> {
    let mut parent = vec![None; n];
    let mut ancestor: Vec<Option<usize>> = vec![None; n];

    for k in 0..n {
        for &row in &row_idx[col_ptr[k]..col_ptr[k + 1]] {
            let mut i = Some(row);
            while let Some(node) = i {
                if node >= k {
                    break;
                }
                let next = ancestor[node];
                ancestor[node] = Some(k);
                if next.is_none() {
                    parent[node] = Some(k);
                }
                i = next;
            }
        }
    }
    parent
}

/// Nonzero pattern of every row of L: the etree reach of the entries above
/// the diagonal in column k. Returned as CSR (row_ptr, cols), each row sorted.
fn row_patterns(
    n: usize,
    col_ptr: &[usize],
    row_idx: &[usize],
    etree: &[Option<usize>],
) -> (Vec<usize>, Vec<usize>) {
    let mut row_ptr = Vec::with_capacity(n + 1);
    let mut cols = Vec::new();
    let mut flag = vec![usize::MAX; n];
    row_ptr.push(0);

    for k in 0..n {
        flag[k] = k;
        let start = cols.len();
        for &row in &row_idx[col_ptr[k]..col_ptr[k + 1]] {
            let mut i = row;
            // Walk up to the first node already reached from this row.
            while flag[i] != k {
                cols.push(i);
                flag[i] = k;
                match etree[i] {
                    Some(p) => i = p,
                    None => break,
                }
            }
        }
        cols[start..].sort_unstable();
        row_ptr.push(cols.len());
    }
    (row_ptr, cols)
}

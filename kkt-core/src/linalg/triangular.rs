//! Triangular solves with a completed LDL^T factor.
//!
//! Solves K x = b as P^T L D L^T P x = b:
//! permute, forward substitute with L, scale by D^-1, back substitute with
//! L^T, unpermute. No allocation; the permuted work vector lives in
//! [`SolveWorkspace`].

use super::ldl::LdlFactor;
use super::symbolic::SymbolicFactor;
use crate::error::{KktError, KktResult};

/// Scratch space for solves and residual checks against one factorization.
#[derive(Debug, Clone)]
pub struct SolveWorkspace {
    /// Work vector in elimination order.
    pub(crate) work: Vec<f64>,
    /// Second work vector (residuals, matrix products).
    pub(crate) aux: Vec<f64>,
    /// Refinement correction.
    pub(crate) corr: Vec<f64>,
}

impl SolveWorkspace {
    pub fn new(n: usize) -> Self {
        Self {
            work: vec![0.0; n],
            aux: vec![0.0; n],
            corr: vec![0.0; n],
        }
    }

    pub fn len(&self) -> usize {
        self.work.len()
    }

    pub fn is_empty(&self) -> bool {
        self.work.is_empty()
    }
}

/// Solve L D L^T x = x in place, in elimination order.
pub(crate) fn solve_permuted_in_place(symbolic: &SymbolicFactor, factor: &LdlFactor, x: &mut [f64]) {
    let n = symbolic.n();
    let l_col_ptr = symbolic.l_col_ptr();
    let l_row_idx = symbolic.l_row_idx();
    let l_x = factor.l_values();
    let d_inv = factor.d_inv();

    // L y = b
    for j in 0..n {
        let xj = x[j];
        if xj != 0.0 {
            for p in l_col_ptr[j]..l_col_ptr[j + 1] {
                x[l_row_idx[p]] -= l_x[p] * xj;
            }
        }
    }

    for (xi, &di) in x.iter_mut().zip(d_inv) {
        *xi *= di;
    }

    // L^T x = z
    for j in (0..n).rev() {
        let mut acc = x[j];
        for p in l_col_ptr[j]..l_col_ptr[j + 1] {
            acc -= l_x[p] * x[l_row_idx[p]];
        }
        x[j] = acc;
    }
}

/// Solve K x = rhs in natural ordering.
///
/// `rhs` and `out` must both have length N; they may not alias.
pub fn solve(
    symbolic: &SymbolicFactor,
    factor: &LdlFactor,
    ws: &mut SolveWorkspace,
    rhs: &[f64],
    out: &mut [f64],
) -> KktResult<()> {
    let n = symbolic.n();
    KktError::check_len("solve rhs", n, rhs.len())?;
    KktError::check_len("solve output", n, out.len())?;
    KktError::check_len("solve workspace", n, ws.len())?;

    let perm = symbolic.perm();
    for (w, &old) in ws.work.iter_mut().zip(perm) {
        *w = rhs[old];
    }

    solve_permuted_in_place(symbolic, factor, &mut ws.work);

    for (&w, &old) in ws.work.iter().zip(perm) {
        out[old] = w;
    }
    Ok(())
}

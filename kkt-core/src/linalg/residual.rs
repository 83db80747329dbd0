//! Residual and factorization-quality checks.
//!
//! Everything here runs against the assembled matrix before regularization,
//! so the numbers measure how far a (regularized) solve is from the system
//! the caller actually asked about. Off the hot path.

use super::ldl::LdlFactor;
use super::sparse::{norm_sq, symm_matvec_upper};
use super::symbolic::SymbolicFactor;
use super::triangular::{solve_permuted_in_place, SolveWorkspace};
use crate::error::{KktError, KktResult};

/// Outcome of iterative refinement.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RefineInfo {
    /// Correction steps that were kept
    pub iterations: usize,
    /// ‖K x − b‖ of the initial solution
    pub initial_residual: f64,
    /// ‖K x − b‖ of the returned solution
    pub final_residual: f64,
}

/// `ws.aux = A_perm · ws.corr` (elimination order).
fn permuted_matvec(symbolic: &SymbolicFactor, factor: &LdlFactor, ws: &mut SolveWorkspace) {
    symm_matvec_upper(
        symbolic.a_col_ptr(),
        symbolic.a_row_idx(),
        factor.permuted_values(),
        &ws.corr,
        &mut ws.aux,
    );
}

/// `ws.aux = b_perm − A_perm · ws.corr`; returns its squared norm.
fn permuted_residual(
    symbolic: &SymbolicFactor,
    factor: &LdlFactor,
    ws: &mut SolveWorkspace,
    rhs: &[f64],
) -> f64 {
    permuted_matvec(symbolic, factor, ws);
    for (r, &old) in ws.aux.iter_mut().zip(symbolic.perm()) {
        *r = rhs[old] - *r;
    }
    norm_sq(&ws.aux)
}

fn load_permuted(symbolic: &SymbolicFactor, src: &[f64], dst: &mut [f64]) {
    for (d, &old) in dst.iter_mut().zip(symbolic.perm()) {
        *d = src[old];
    }
}

fn check_lengths(symbolic: &SymbolicFactor, ws: &SolveWorkspace, rhs: &[f64], x: &[f64]) -> KktResult<()> {
    let n = symbolic.n();
    KktError::check_len("residual rhs", n, rhs.len())?;
    KktError::check_len("residual solution", n, x.len())?;
    KktError::check_len("residual workspace", n, ws.len())
}

/// ‖A·x − b‖² with A the unregularized assembled matrix.
pub fn residual_norm_sq(
    symbolic: &SymbolicFactor,
    factor: &LdlFactor,
    ws: &mut SolveWorkspace,
    rhs: &[f64],
    x: &[f64],
) -> KktResult<f64> {
    check_lengths(symbolic, ws, rhs, x)?;
    load_permuted(symbolic, x, &mut ws.corr);
    Ok(permuted_residual(symbolic, factor, ws, rhs))
}

/// ‖A − L·D·Lᵀ‖² over the stored pattern of A.
///
/// Each upper-triangle slot is counted once. The value includes the effect of
/// static and dynamic regularization as well as rounding.
pub fn factor_error_norm_sq(symbolic: &SymbolicFactor, factor: &LdlFactor, ws: &mut SolveWorkspace) -> f64 {
    let n = symbolic.n();
    let a_col_ptr = symbolic.a_col_ptr();
    let a_row_idx = symbolic.a_row_idx();
    let a = factor.permuted_values();
    let l_x = factor.l_values();
    let d = factor.d();

    // work holds row c of L (unit diagonal included) while column c of A is checked.
    let row = &mut ws.work;
    row.fill(0.0);

    let mut err = 0.0;
    for c in 0..n {
        for (&j, &slot) in symbolic.row_cols(c).iter().zip(symbolic.row_slots(c)) {
            row[j] = l_x[slot];
        }
        row[c] = 1.0;

        for p in a_col_ptr[c]..a_col_ptr[c + 1] {
            let r = a_row_idx[p];
            // (L D L^T)[r, c] = sum_j L[r, j] D[j] L[c, j], j <= r
            let mut ldl = d[r] * row[r];
            for (&j, &slot) in symbolic.row_cols(r).iter().zip(symbolic.row_slots(r)) {
                ldl += l_x[slot] * d[j] * row[j];
            }
            let diff = a[p] - ldl;
            err += diff * diff;
        }

        for &j in symbolic.row_cols(c) {
            row[j] = 0.0;
        }
        row[c] = 0.0;
    }
    err
}

/// Iterative refinement of `x` against the unregularized matrix.
///
/// `x` holds an initial solution on entry. Correction steps continue while
/// the residual norm is above `tol` and strictly decreasing, for at most
/// `max_iters` steps. A step that makes the residual worse is undone.
pub fn refine(
    symbolic: &SymbolicFactor,
    factor: &LdlFactor,
    ws: &mut SolveWorkspace,
    rhs: &[f64],
    x: &mut [f64],
    tol: f64,
    max_iters: usize,
) -> KktResult<RefineInfo> {
    check_lengths(symbolic, ws, rhs, x)?;
    load_permuted(symbolic, x, &mut ws.corr);

    let initial = permuted_residual(symbolic, factor, ws, rhs).sqrt();
    let mut best = initial;
    let mut iterations = 0;

    while best > tol && iterations < max_iters {
        // aux holds the residual; turn it into the correction.
        solve_permuted_in_place(symbolic, factor, &mut ws.aux);
        ws.work.copy_from_slice(&ws.corr);
        for (xi, dx) in ws.corr.iter_mut().zip(&ws.aux) {
            *xi += dx;
        }

        let norm = permuted_residual(symbolic, factor, ws, rhs).sqrt();
        if norm >= best {
            ws.corr.copy_from_slice(&ws.work);
            break;
        }
        best = norm;
        iterations += 1;
    }

    for (&v, &old) in ws.corr.iter().zip(symbolic.perm()) {
        x[old] = v;
    }

    log::trace!(
        "refinement: {} step(s), residual {:.3e} -> {:.3e}",
        iterations,
        initial,
        best
    );

    Ok(RefineInfo {
        iterations,
        initial_residual: initial,
        final_residual: best,
    })
}

//! Sign-regularized numeric LDL^T factorization.
//!
//! Computes L and D such that L D L^T equals the (permuted, regularized)
//! quasi-definite matrix, following the elimination schedule fixed by
//! [`SymbolicFactor`]:
//! - L is lower triangular with unit diagonal (diagonal not stored)
//! - D is diagonal; each entry carries the sign fixed by the row-sign metadata
//!
//! The factorization is the up-looking (row by row) variant. For row k the
//! scheduled columns `j < k` are visited in ascending order, so every
//! multiplier and the raw pivot
//!
//! ```text
//! d_k = A_kk - sum_j L[k, j]^2 D[j]
//! ```
//!
//! are produced without any sparsity decision at run time. A pivot whose sign
//! disagrees with its expected sign `σ_k`, or whose magnitude is below the
//! floor, is replaced by `σ_k · max(|d_k|, delta)`. This correction is
//! unconditional, so the factorization always completes.

use super::symbolic::SymbolicFactor;
use crate::error::{KktError, KktResult, NumericalWarning};
use crate::settings::LdlSettings;

/// Summary of one numeric factorization.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FactorInfo {
    /// Number of pivots that were regularized
    pub regularized_pivots: usize,
    /// Sum of absolute pivot corrections
    pub reg_magnitude: f64,
    /// Signed static shift applied to every diagonal entry
    pub static_reg: f64,
    /// Smallest |D[k]| after regularization
    pub min_abs_pivot: f64,
    /// Largest |D[k]| after regularization
    pub max_abs_pivot: f64,
    /// Set when `reg_magnitude` exceeded the advisory threshold
    pub warning: Option<NumericalWarning>,
}

impl FactorInfo {
    /// Ratio of the largest to smallest pivot magnitude.
    pub fn pivot_ratio(&self) -> f64 {
        if self.min_abs_pivot > 0.0 {
            self.max_abs_pivot / self.min_abs_pivot
        } else {
            f64::INFINITY
        }
    }
}

/// Numeric storage for one LDL^T factorization.
///
/// All buffers are sized from the symbolic analysis at construction;
/// [`factorize`](Self::factorize) does not allocate.
#[derive(Debug, Clone)]
pub struct LdlFactor {
    /// Assembled values in permuted slot order (unregularized).
    a_perm: Vec<f64>,
    /// Strictly-lower L values.
    l_x: Vec<f64>,
    d: Vec<f64>,
    d_inv: Vec<f64>,
    /// Dense accumulator for the row being factored; all zero between rows.
    y: Vec<f64>,
    info: FactorInfo,
    factored: bool,
}

impl LdlFactor {
    pub fn new(symbolic: &SymbolicFactor) -> Self {
        let n = symbolic.n();
        Self {
            a_perm: vec![0.0; symbolic.nnz_a()],
            l_x: vec![0.0; symbolic.nnz_l()],
            d: vec![0.0; n],
            d_inv: vec![0.0; n],
            y: vec![0.0; n],
            info: FactorInfo::default(),
            factored: false,
        }
    }

    /// Factor the matrix whose values are given in caller slot order.
    pub fn factorize(
        &mut self,
        symbolic: &SymbolicFactor,
        values: &[f64],
        settings: &LdlSettings,
    ) -> KktResult<FactorInfo> {
        KktError::check_len("factorize values", symbolic.nnz_a(), values.len())?;
        self.factored = false;

        if settings.check_finite {
            if let Some(slot) = values.iter().position(|v| !v.is_finite()) {
                return Err(KktError::NonFinite { slot });
            }
        }

        for (&new_slot, &v) in symbolic.slot_map().iter().zip(values) {
            self.a_perm[new_slot] = v;
        }

        let n = symbolic.n();
        let a_col_ptr = symbolic.a_col_ptr();
        let a_row_idx = symbolic.a_row_idx();
        let l_col_ptr = symbolic.l_col_ptr();
        let l_row_idx = symbolic.l_row_idx();
        let signs = symbolic.signs();

        let eps = settings.dynamic_reg_eps;
        let delta = settings.dynamic_reg_delta;
        let static_reg = settings.static_reg;

        let mut regularized_pivots = 0usize;
        let mut reg_magnitude = 0.0f64;
        let mut min_abs_pivot = f64::INFINITY;
        let mut max_abs_pivot = 0.0f64;

        for k in 0..n {
            // Scatter column k of the upper triangle; the diagonal is last.
            let diag = symbolic.a_diag_slot(k);
            for p in a_col_ptr[k]..diag {
                self.y[a_row_idx[p]] = self.a_perm[p];
            }
            let sigma = signs[k].value();
            let mut dk = self.a_perm[diag] + sigma * static_reg;

            for (&j, &slot) in symbolic.row_cols(k).iter().zip(symbolic.row_slots(k)) {
                let yj = self.y[j];
                self.y[j] = 0.0;
                // Rows of column j already computed are exactly those before row k.
                for p in l_col_ptr[j]..slot {
                    self.y[l_row_idx[p]] -= self.l_x[p] * yj;
                }
                let lkj = yj * self.d_inv[j];
                self.l_x[slot] = lkj;
                dk -= lkj * yj;
            }

            if sigma * dk <= eps {
                let fixed = sigma * dk.abs().max(delta);
                log::trace!("pivot {} regularized: {:.3e} -> {:.3e}", k, dk, fixed);
                reg_magnitude += (fixed - dk).abs();
                regularized_pivots += 1;
                dk = fixed;
            }

            self.d[k] = dk;
            self.d_inv[k] = 1.0 / dk;
            min_abs_pivot = min_abs_pivot.min(dk.abs());
            max_abs_pivot = max_abs_pivot.max(dk.abs());
        }

        if n == 0 {
            min_abs_pivot = 0.0;
        }

        let warning = if reg_magnitude > settings.reg_warn_threshold {
            let w = NumericalWarning {
                magnitude: reg_magnitude,
                pivots: regularized_pivots,
                threshold: settings.reg_warn_threshold,
            };
            log::warn!("{}", w);
            Some(w)
        } else {
            None
        };

        self.info = FactorInfo {
            regularized_pivots,
            reg_magnitude,
            static_reg,
            min_abs_pivot,
            max_abs_pivot,
            warning,
        };
        self.factored = true;
        Ok(self.info)
    }

    /// Whether the stored values form a complete factorization.
    pub fn is_factored(&self) -> bool {
        self.factored
    }

    pub fn info(&self) -> &FactorInfo {
        &self.info
    }

    /// Assembled matrix values in permuted slot order, before any regularization.
    pub fn permuted_values(&self) -> &[f64] {
        &self.a_perm
    }

    /// Strictly-lower L values, aligned with the symbolic L structure.
    pub fn l_values(&self) -> &[f64] {
        &self.l_x
    }

    /// Pivots in elimination order.
    pub fn d(&self) -> &[f64] {
        &self.d
    }

    pub fn d_inv(&self) -> &[f64] {
        &self.d_inv
    }
}

//! Factorization settings.
//!
//! Defaults follow the usual QDLDL/Clarabel choices for dynamic
//! regularization. Every field can be overridden from the environment with
//! [`LdlSettings::from_env`], which is how offline tuning runs adjust the
//! regularization constants without recompiling the controller.

use crate::error::{KktError, KktResult};
use crate::linalg::ordering::Ordering;
use std::env;

/// Settings for symbolic analysis, numeric factorization and solves.
#[derive(Debug, Clone, PartialEq)]
pub struct LdlSettings {
    /// Elimination order used by the symbolic analysis
    pub ordering: Ordering,

    /// Signed static shift applied to every diagonal entry before factoring
    /// (`+static_reg` on positive rows, `-static_reg` on negative rows).
    ///
    /// Zero by default so a quasi-definite matrix whose pivots already carry
    /// their expected signs is factored exactly. KKT systems with a zero
    /// multiplier diagonal factored under [`Ordering::Amd`] may meet zero
    /// pivots; those are lifted to `dynamic_reg_delta` and the solve is off by
    /// a bounded amount that `solve_refined` removes against the unshifted
    /// matrix.
    pub static_reg: f64,

    /// A pivot `d` with expected sign `σ` is regularized when `σ·d <= dynamic_reg_eps`
    pub dynamic_reg_eps: f64,

    /// Smallest pivot magnitude left after regularization
    pub dynamic_reg_delta: f64,

    /// Cumulative regularization magnitude above which a warning is raised
    pub reg_warn_threshold: f64,

    /// Reject NaN/inf matrix values before factoring
    pub check_finite: bool,

    /// Residual norm below which iterative refinement stops
    pub refine_tol: f64,

    /// Maximum iterative refinement passes taken by `solve_refined`
    pub max_refine_iters: usize,
}

impl Default for LdlSettings {
    fn default() -> Self {
        Self {
            ordering: Ordering::Amd,
            static_reg: 0.0,
            dynamic_reg_eps: 1e-13,
            dynamic_reg_delta: 2e-7,
            reg_warn_threshold: 1e-4,
            check_finite: true,
            refine_tol: 1e-12,
            max_refine_iters: 3,
        }
    }
}

impl LdlSettings {
    /// Defaults overridden by `KKT_*` environment variables.
    ///
    /// Unparseable values are ignored. Recognised keys: `KKT_ORDERING`
    /// (`natural` | `amd`), `KKT_STATIC_REG`, `KKT_DYN_REG_EPS`,
    /// `KKT_DYN_REG_DELTA`, `KKT_REG_WARN`, `KKT_CHECK_FINITE`,
    /// `KKT_REFINE_TOL`, `KKT_REFINE_ITERS`.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub(crate) fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut settings = Self::default();
        let float = |key: &str| lookup(key).and_then(|v| v.trim().parse::<f64>().ok());

        if let Some(v) = lookup("KKT_ORDERING") {
            match v.trim().to_lowercase().as_str() {
                "natural" => settings.ordering = Ordering::Natural,
                "amd" => settings.ordering = Ordering::Amd,
                _ => {}
            }
        }
        if let Some(v) = float("KKT_STATIC_REG") {
            settings.static_reg = v;
        }
        if let Some(v) = float("KKT_DYN_REG_EPS") {
            settings.dynamic_reg_eps = v;
        }
        if let Some(v) = float("KKT_DYN_REG_DELTA") {
            settings.dynamic_reg_delta = v;
        }
        if let Some(v) = float("KKT_REG_WARN") {
            settings.reg_warn_threshold = v;
        }
        if let Some(v) = float("KKT_REFINE_TOL") {
            settings.refine_tol = v;
        }
        if let Some(v) = lookup("KKT_REFINE_ITERS").and_then(|v| v.trim().parse::<usize>().ok()) {
            settings.max_refine_iters = v;
        }
        if let Some(v) = lookup("KKT_CHECK_FINITE") {
            let v = v.trim().to_lowercase();
            settings.check_finite = v != "0" && v != "false";
        }
        settings
    }

    /// Reject settings the factorizer cannot honour.
    pub fn validate(&self) -> KktResult<()> {
        if !self.static_reg.is_finite() || self.static_reg < 0.0 {
            return Err(KktError::config(format!(
                "static_reg must be finite and non-negative, got {}",
                self.static_reg
            )));
        }
        if !self.dynamic_reg_eps.is_finite() || self.dynamic_reg_eps < 0.0 {
            return Err(KktError::config(format!(
                "dynamic_reg_eps must be finite and non-negative, got {}",
                self.dynamic_reg_eps
            )));
        }
        if !self.dynamic_reg_delta.is_finite() || self.dynamic_reg_delta <= 0.0 {
            return Err(KktError::config(format!(
                "dynamic_reg_delta must be finite and positive, got {}",
                self.dynamic_reg_delta
            )));
        }
        if self.reg_warn_threshold.is_nan() || self.reg_warn_threshold <= 0.0 {
            return Err(KktError::config(format!(
                "reg_warn_threshold must be positive, got {}",
                self.reg_warn_threshold
            )));
        }
        if self.refine_tol.is_nan() || self.refine_tol < 0.0 {
            return Err(KktError::config(format!(
                "refine_tol must be non-negative, got {}",
                self.refine_tol
            )));
        }
        Ok(())
    }
}

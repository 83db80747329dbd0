//! Owned solver context for one fixed-structure KKT system.
//!
//! [`KktSolver`] runs the symbolic analysis once and owns every buffer the
//! per-tick sequence touches. A tick is
//!
//! ```text
//! factorize(values) -> Factorization -> solve (once or twice) -> [check] -> drop
//! ```
//!
//! The [`Factorization`] handle borrows the solver mutably, so values cannot
//! be refactored while solves are still using L and D, and only shares L and
//! D with the solves, so no solve can alter them.

use crate::error::{KktError, KktResult, NumericalWarning};
use crate::kkt::assembler::KktAssembler;
use crate::linalg::ldl::{FactorInfo, LdlFactor};
use crate::linalg::pattern::SymmetricPattern;
use crate::linalg::residual::{self, RefineInfo};
use crate::linalg::sparse::SparseCsc;
use crate::linalg::symbolic::{PivotSign, SymbolicFactor};
use crate::linalg::triangular::{self, SolveWorkspace};
use crate::perf::{PerfSection, PerfTimers};
use crate::settings::LdlSettings;

/// Running counters across ticks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SolverCounters {
    pub factorizations: u64,
    pub solves: u64,
    /// Pivots regularized over all factorizations
    pub regularized_pivots: u64,
    /// Factorizations that raised a [`NumericalWarning`]
    pub warnings: u64,
}

/// Sparse LDL^T solver for a quasi-definite KKT system with fixed pattern.
#[derive(Debug, Clone)]
pub struct KktSolver {
    pattern: SymmetricPattern,
    settings: LdlSettings,
    symbolic: SymbolicFactor,
    factor: LdlFactor,
    ws: SolveWorkspace,
    timers: PerfTimers,
    counters: SolverCounters,
}

impl KktSolver {
    /// Analyze `pattern` and allocate every per-tick buffer.
    ///
    /// `signs` gives the expected pivot sign of each row in natural order.
    pub fn new(pattern: SymmetricPattern, signs: &[PivotSign], settings: LdlSettings) -> KktResult<Self> {
        settings.validate()?;
        let symbolic = SymbolicFactor::analyze(&pattern, signs, &settings.ordering)?;
        let factor = LdlFactor::new(&symbolic);
        let ws = SolveWorkspace::new(symbolic.n());
        Ok(Self {
            pattern,
            settings,
            symbolic,
            factor,
            ws,
            timers: PerfTimers::default(),
            counters: SolverCounters::default(),
        })
    }

    /// Solver for the pattern and row signs of an assembled KKT system.
    pub fn from_assembler(assembler: &KktAssembler, settings: LdlSettings) -> KktResult<Self> {
        Self::new(assembler.pattern().clone(), assembler.signs(), settings)
    }

    /// Factor the matrix with values aligned to the pattern's slots.
    pub fn factorize(&mut self, values: &[f64]) -> KktResult<Factorization<'_>> {
        let info = {
            let _g = self.timers.scoped(PerfSection::Factorize);
            self.factor.factorize(&self.symbolic, values, &self.settings)?
        };
        self.counters.factorizations += 1;
        self.counters.regularized_pivots += info.regularized_pivots as u64;
        if info.warning.is_some() {
            self.counters.warnings += 1;
        }
        Ok(self.handle())
    }

    /// Factor a matrix given as an `sprs` matrix (upper triangle or full).
    ///
    /// Entries outside the fixed pattern are a configuration error.
    pub fn factorize_csc(&mut self, mat: &SparseCsc) -> KktResult<Factorization<'_>> {
        let values = self.pattern.gather_values(mat)?;
        self.factorize(&values)
    }

    /// ‖A·x − b‖² against the most recently factored values.
    pub fn check_residual(&mut self, rhs: &[f64], x: &[f64]) -> KktResult<f64> {
        if !self.factor.is_factored() {
            return Err(KktError::NotFactored("residual check"));
        }
        let _g = self.timers.scoped(PerfSection::Check);
        residual::residual_norm_sq(&self.symbolic, &self.factor, &mut self.ws, rhs, x)
    }

    fn handle(&mut self) -> Factorization<'_> {
        Factorization {
            symbolic: &self.symbolic,
            factor: &self.factor,
            settings: &self.settings,
            ws: &mut self.ws,
            timers: &mut self.timers,
            counters: &mut self.counters,
        }
    }

    /// System dimension N.
    pub fn n(&self) -> usize {
        self.symbolic.n()
    }

    pub fn pattern(&self) -> &SymmetricPattern {
        &self.pattern
    }

    pub fn symbolic(&self) -> &SymbolicFactor {
        &self.symbolic
    }

    pub fn settings(&self) -> &LdlSettings {
        &self.settings
    }

    pub fn counters(&self) -> &SolverCounters {
        &self.counters
    }

    pub fn timers(&self) -> &PerfTimers {
        &self.timers
    }

    pub fn timers_mut(&mut self) -> &mut PerfTimers {
        &mut self.timers
    }

    /// Info of the last successful factorization.
    pub fn last_info(&self) -> Option<&FactorInfo> {
        self.factor.is_factored().then(|| self.factor.info())
    }
}

/// A completed factorization, valid until dropped.
pub struct Factorization<'a> {
    symbolic: &'a SymbolicFactor,
    factor: &'a LdlFactor,
    settings: &'a LdlSettings,
    ws: &'a mut SolveWorkspace,
    timers: &'a mut PerfTimers,
    counters: &'a mut SolverCounters,
}

impl Factorization<'_> {
    pub fn info(&self) -> &FactorInfo {
        self.factor.info()
    }

    pub fn warning(&self) -> Option<&NumericalWarning> {
        self.factor.info().warning.as_ref()
    }

    /// Pivots in elimination order.
    pub fn d(&self) -> &[f64] {
        self.factor.d()
    }

    /// Strictly-lower L values, aligned with the symbolic L structure.
    pub fn l_values(&self) -> &[f64] {
        self.factor.l_values()
    }

    pub fn symbolic(&self) -> &SymbolicFactor {
        self.symbolic
    }

    /// Solve K x = rhs.
    pub fn solve(&mut self, rhs: &[f64]) -> KktResult<Vec<f64>> {
        let mut out = vec![0.0; self.symbolic.n()];
        self.solve_into(rhs, &mut out)?;
        Ok(out)
    }

    /// Solve K x = rhs into `out` without allocating.
    pub fn solve_into(&mut self, rhs: &[f64], out: &mut [f64]) -> KktResult<()> {
        let _g = self.timers.scoped(PerfSection::Solve);
        triangular::solve(self.symbolic, self.factor, self.ws, rhs, out)?;
        self.counters.solves += 1;
        Ok(())
    }

    /// Predictor / corrector: two right-hand sides against one factorization.
    pub fn solve_pair(
        &mut self,
        rhs1: &[f64],
        rhs2: &[f64],
        out1: &mut [f64],
        out2: &mut [f64],
    ) -> KktResult<()> {
        self.solve_into(rhs1, out1)?;
        self.solve_into(rhs2, out2)
    }

    /// Solve, then refine against the unregularized matrix for at most
    /// `max_refine_iters` steps.
    pub fn solve_refined(&mut self, rhs: &[f64], out: &mut [f64]) -> KktResult<RefineInfo> {
        self.solve_into(rhs, out)?;
        let _g = self.timers.scoped(PerfSection::Solve);
        residual::refine(
            self.symbolic,
            self.factor,
            self.ws,
            rhs,
            out,
            self.settings.refine_tol,
            self.settings.max_refine_iters,
        )
    }

    /// ‖A·x − b‖² with A the unregularized assembled matrix.
    pub fn residual_norm_sq(&mut self, rhs: &[f64], x: &[f64]) -> KktResult<f64> {
        let _g = self.timers.scoped(PerfSection::Check);
        residual::residual_norm_sq(self.symbolic, self.factor, self.ws, rhs, x)
    }

    /// ‖A − L·D·Lᵀ‖² over the pattern of A.
    pub fn factor_error_norm_sq(&mut self) -> f64 {
        let _g = self.timers.scoped(PerfSection::Check);
        residual::factor_error_norm_sq(self.symbolic, self.factor, self.ws)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::linalg::ordering::Ordering;
    use crate::linalg::sparse;

    fn diag3() -> SymmetricPattern {
        SymmetricPattern::from_upper_entries(3, Vec::new()).unwrap()
    }

    const SIGNS: [PivotSign; 3] = [PivotSign::Positive, PivotSign::Negative, PivotSign::Positive];

    #[test]
    fn test_solver_is_send() {
        fn assert_send<T: Send>() {}
        assert_send::<KktSolver>();
    }

    #[test]
    fn test_factorize_and_solve() {
        let mut solver = KktSolver::new(diag3(), &SIGNS, LdlSettings::default()).unwrap();
        let mut f = solver.factorize(&[1.0, -1.0, 2.0]).unwrap();
        assert_eq!(f.info().regularized_pivots, 0);
        let x = f.solve(&[1.0, 1.0, 1.0]).unwrap();
        assert_eq!(x, vec![1.0, -1.0, 0.5]);
        drop(f);

        assert_eq!(solver.counters().factorizations, 1);
        assert_eq!(solver.counters().solves, 1);
        assert!(solver.check_residual(&[1.0, 1.0, 1.0], &x).unwrap() < 1e-30);
    }

    #[test]
    fn test_check_residual_requires_factorization() {
        let mut solver = KktSolver::new(diag3(), &SIGNS, LdlSettings::default()).unwrap();
        assert!(solver.last_info().is_none());
        assert_eq!(
            solver.check_residual(&[0.0; 3], &[0.0; 3]),
            Err(KktError::NotFactored("residual check"))
        );

        // A rejected factorization leaves nothing to check against either.
        assert!(solver.factorize(&[1.0, f64::NAN, 2.0]).is_err());
        assert!(matches!(
            solver.check_residual(&[0.0; 3], &[0.0; 3]),
            Err(KktError::NotFactored(_))
        ));

        // The instance stays usable.
        solver.factorize(&[1.0, -1.0, 2.0]).unwrap();
        assert!(solver.check_residual(&[1.0, 1.0, 1.0], &[1.0, -1.0, 0.5]).unwrap() < 1e-30);
    }

    #[test]
    fn test_factorize_csc_rejects_foreign_entries() {
        let mut solver = KktSolver::new(diag3(), &SIGNS, LdlSettings::default()).unwrap();
        let ok = sparse::from_triplets(3, 3, vec![(0, 0, 1.0), (1, 1, -1.0), (2, 2, 2.0)]);
        assert!(solver.factorize_csc(&ok).is_ok());

        let foreign = sparse::from_triplets(3, 3, vec![(0, 1, 1.0)]);
        assert!(matches!(
            solver.factorize_csc(&foreign),
            Err(KktError::Configuration(_))
        ));
    }

    #[test]
    fn test_invalid_settings_rejected() {
        let settings = LdlSettings {
            dynamic_reg_delta: 0.0,
            ..Default::default()
        };
        assert!(KktSolver::new(diag3(), &SIGNS, settings).is_err());

        let bad_order = LdlSettings {
            ordering: Ordering::Supplied(vec![0, 1]),
            ..Default::default()
        };
        assert!(KktSolver::new(diag3(), &SIGNS, bad_order).is_err());
    }

    #[test]
    fn test_refinement_follows_settings() {
        // The static shift leaves a residual that shrinks by at least 5x per step.
        for (max_iters, expected) in [(0, 0), (3, 3)] {
            let settings = LdlSettings {
                static_reg: 0.25,
                max_refine_iters: max_iters,
                ..Default::default()
            };
            let mut solver = KktSolver::new(diag3(), &SIGNS, settings).unwrap();
            let mut f = solver.factorize(&[1.0, -1.0, 2.0]).unwrap();
            let mut x = [0.0; 3];
            let info = f.solve_refined(&[1.0, 1.0, 1.0], &mut x).unwrap();

            assert_eq!(info.iterations, expected);
            if expected == 0 {
                assert_eq!(info.final_residual, info.initial_residual);
                assert_eq!(x, [0.8, -0.8, 1.0 / 2.25]);
            } else {
                assert!(info.final_residual < 1e-2 * info.initial_residual);
            }
        }
    }

    #[test]
    fn test_warning_counted() {
        let settings = LdlSettings {
            reg_warn_threshold: 0.5,
            ..Default::default()
        };
        let mut solver = KktSolver::new(diag3(), &SIGNS, settings).unwrap();
        {
            let f = solver.factorize(&[1.0, 1.0, 2.0]).unwrap();
            let w = f.warning().copied().unwrap();
            assert_eq!(w.pivots, 1);
            assert_eq!(w.magnitude, 2.0);
        }
        solver.factorize(&[1.0, -1.0, 2.0]).unwrap();
        assert_eq!(solver.counters().warnings, 1);
        assert_eq!(solver.counters().regularized_pivots, 1);
        assert_eq!(solver.counters().factorizations, 2);
    }
}

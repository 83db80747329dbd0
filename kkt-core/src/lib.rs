//! kkt-core: sparse quasi-definite LDL^T for real-time interior-point MPC
//!
//! This crate is the linear-algebra core of a primal-dual interior point
//! method for convex QPs. Every controller tick one Newton step is computed by
//! solving a KKT system whose sparsity never changes:
//!
//! ```text
//!       x     s     z     y
//! x [   P     0     G^T   A^T ]
//! s [   0     Σ     I     0   ]
//! z [   G     I     0     0   ]
//! y [   A     0     0     0   ]
//! ```
//!
//! # Pipeline
//!
//! - **Symbolic analysis** ([`linalg::symbolic`]): elimination order, L
//!   structure and the per-row elimination schedule, computed once.
//! - **Assembly** ([`kkt::KktAssembler`]): fixed blocks written once, the
//!   barrier diagonal Σ rewritten per iteration.
//! - **Factorization** ([`linalg::ldl`]): up-looking LDL^T with dynamic
//!   regularization that forces each pivot to its expected sign.
//! - **Solves** ([`kkt::Factorization`]): permuted triangular solves, once or
//!   twice per tick, with optional iterative refinement.
//! - **Diagnostics** ([`linalg::residual`]): residual and factor-error norms
//!   against the unregularized matrix.
//!
//! # Example
//!
//! ```ignore
//! use kkt_core::{KktAssembler, KktLayout, KktSolver, LdlSettings, QpData};
//!
//! let layout = KktLayout::new(n_x, n_eq, n_ineq);
//! let mut asm = KktAssembler::new(layout, &QpData { p: Some(&p), a: Some(&a), g: Some(&g) })?;
//! let mut solver = KktSolver::from_assembler(&asm, LdlSettings::from_env())?;
//!
//! // every tick
//! asm.update_barrier(&s, &z)?;
//! let mut f = solver.factorize(asm.values())?;
//! f.solve_pair(&rhs_aff, &rhs_cc, &mut d_aff, &mut d_cc)?;
//! ```

#![allow(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::too_many_arguments)]

pub mod error;
pub mod kkt;
pub mod linalg;
pub mod perf;
pub mod settings;

pub use error::{KktError, KktResult, NumericalWarning};
pub use kkt::{Factorization, KktAssembler, KktBlocks, KktBlocksMut, KktLayout, KktSolver, QpData, SolverCounters};
pub use linalg::ldl::FactorInfo;
pub use linalg::ordering::{Ordering, Permutation};
pub use linalg::pattern::SymmetricPattern;
pub use linalg::residual::RefineInfo;
pub use linalg::sparse::{SparseCsc, SparseSymmetricCsc};
pub use linalg::symbolic::{PivotSign, SymbolicFactor};
pub use perf::{PerfSection, PerfTimers};
pub use settings::LdlSettings;

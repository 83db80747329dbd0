//! Sparse LDL^T machinery.
//!
//! - `pattern`: fixed symmetric sparsity pattern
//! - `ordering`: elimination orderings (natural, AMD, supplied)
//! - `symbolic`: elimination tree, L structure, row schedule
//! - `ldl`: numeric factorization with sign-driven regularization
//! - `triangular`: forward / diagonal / backward solves
//! - `residual`: residual, factor-error and refinement diagnostics

pub mod ldl;
pub mod ordering;
pub mod pattern;
pub mod residual;
pub mod sparse;
pub mod symbolic;
pub mod triangular;

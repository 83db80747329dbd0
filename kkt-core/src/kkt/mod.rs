//! KKT system layout, assembly and the owned solver context.

pub mod assembler;
pub mod layout;
pub mod solver;

pub use assembler::{KktAssembler, QpData};
pub use layout::{KktBlocks, KktBlocksMut, KktLayout};
pub use solver::{Factorization, KktSolver, SolverCounters};

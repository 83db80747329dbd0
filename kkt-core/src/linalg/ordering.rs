//! Elimination orderings.
//!
//! The elimination order is fixed once per problem structure. For a
//! finite-horizon MPC the stage-by-stage block structure often gives a natural
//! order that is both low-fill and well-conditioned, so callers may supply
//! their own permutation; otherwise approximate minimum degree (faer's AMD)
//! is used.

use super::pattern::SymmetricPattern;
use crate::error::{KktError, KktResult};
use faer::dyn_stack::{MemBuffer, MemStack};
use faer::sparse::linalg::amd;
use faer::sparse::SymbolicSparseColMatRef;

/// How the elimination order is chosen.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Ordering {
    /// Eliminate in natural index order.
    Natural,
    /// Approximate minimum degree.
    #[default]
    Amd,
    /// Caller-supplied order: `perm[k]` is the natural index eliminated k-th.
    Supplied(Vec<usize>),
}

/// A validated bijection between natural and elimination indices.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Permutation {
    /// new index -> old index
    perm: Vec<usize>,
    /// old index -> new index
    perm_inv: Vec<usize>,
}

impl Permutation {
    pub fn identity(n: usize) -> Self {
        let perm: Vec<usize> = (0..n).collect();
        Self { perm_inv: perm.clone(), perm }
    }

    /// Validate `perm` (new -> old) and build its inverse.
    pub fn from_perm(perm: Vec<usize>) -> KktResult<Self> {
        let n = perm.len();
        let mut perm_inv = vec![usize::MAX; n];
        for (new, &old) in perm.iter().enumerate() {
            if old >= n {
                return Err(KktError::config(format!(
                    "ordering entry {} out of range for dimension {}",
                    old, n
                )));
            }
            if perm_inv[old] != usize::MAX {
                return Err(KktError::config(format!(
                    "ordering is not a permutation: index {} appears twice",
                    old
                )));
            }
            perm_inv[old] = new;
        }
        Ok(Self { perm, perm_inv })
    }

    pub fn len(&self) -> usize {
        self.perm.len()
    }

    pub fn is_empty(&self) -> bool {
        self.perm.is_empty()
    }

    pub fn perm(&self) -> &[usize] {
        &self.perm
    }

    pub fn perm_inv(&self) -> &[usize] {
        &self.perm_inv
    }

    pub fn is_identity(&self) -> bool {
        self.perm.iter().enumerate().all(|(i, &p)| i == p)
    }
}

/// Compute the elimination order for `pattern`.
pub fn compute_ordering(pattern: &SymmetricPattern, ordering: &Ordering) -> KktResult<Permutation> {
    let n = pattern.n();
    match ordering {
        Ordering::Natural => Ok(Permutation::identity(n)),
        Ordering::Supplied(perm) => {
            if perm.len() != n {
                return Err(KktError::config(format!(
                    "supplied ordering has length {}, pattern dimension is {}",
                    perm.len(),
                    n
                )));
            }
            Permutation::from_perm(perm.clone())
        }
        Ordering::Amd => match amd_order(pattern) {
            Ok(perm) => Permutation::from_perm(perm),
            Err(msg) => {
                log::warn!("AMD ordering failed ({}), falling back to natural order", msg);
                Ok(Permutation::identity(n))
            }
        },
    }
}

fn amd_order(pattern: &SymmetricPattern) -> Result<Vec<usize>, String> {
    let n = pattern.n();
    if n == 0 {
        return Ok(Vec::new());
    }

    let symbolic = SymbolicSparseColMatRef::new_checked(
        n,
        n,
        pattern.col_ptr(),
        None,
        pattern.row_idx(),
    );

    let mut perm = vec![0usize; n];
    let mut perm_inv = vec![0usize; n];
    let mut mem = MemBuffer::new(amd::order_scratch::<usize>(n, pattern.nnz()));

    amd::order(
        &mut perm,
        &mut perm_inv,
        symbolic,
        amd::Control::default(),
        MemStack::new(&mut mem),
    )
    .map_err(|e| format!("{:?}", e))?;

    Ok(perm)
}

//! KKT matrix assembly.
//!
//! Builds the fixed pattern of
//!
//! ```text
//!       x     s     z     y
//! x [   P     0     G^T   A^T ]
//! s [   0     Σ     I     0   ]
//! z [   G     I     0     0   ]
//! y [   A     0     0     0   ]
//! ```
//!
//! once, together with a map from every problem-data entry to its slot in the
//! value array. Per iteration only the Σ diagonal slots are rewritten.

use super::layout::KktLayout;
use crate::error::{KktError, KktResult};
use crate::linalg::pattern::SymmetricPattern;
use crate::linalg::sparse::{self, SparseCsc, SparseSymmetricCsc};
use crate::linalg::symbolic::PivotSign;

/// Fixed problem data of a QP.
///
/// `p` holds the upper triangle of the cost Hessian (entries below the
/// diagonal are ignored); `a` is n_eq × n_x, `g` is n_ineq × n_x. A missing
/// block is structurally zero.
#[derive(Debug, Clone, Copy, Default)]
pub struct QpData<'a> {
    pub p: Option<&'a SparseSymmetricCsc>,
    pub a: Option<&'a SparseCsc>,
    pub g: Option<&'a SparseCsc>,
}

/// Value-array slots of every block, in the iteration order of the source
/// matrices.
#[derive(Debug, Clone)]
struct KktDataMap {
    /// P entry -> slot (`None` for entries below the diagonal)
    p: Vec<Option<usize>>,
    /// A entry -> slot of K[x_j, y_i]
    a: Vec<usize>,
    /// G entry -> slot of K[x_j, z_i]
    g: Vec<usize>,
    /// Σ_ii slots
    sigma: Vec<usize>,
    /// K[s_i, z_i] slots
    slack: Vec<usize>,
}

/// Owns the KKT value array and keeps it in sync with the problem data.
#[derive(Debug, Clone)]
pub struct KktAssembler {
    layout: KktLayout,
    pattern: SymmetricPattern,
    signs: Vec<PivotSign>,
    map: KktDataMap,
    values: Vec<f64>,
    // Current fixed blocks; their structure is frozen at construction.
    p: Option<SparseSymmetricCsc>,
    a: Option<SparseCsc>,
    g: Option<SparseCsc>,
    revision: u64,
}

fn check_shape(
    context: &'static str,
    mat: Option<&SparseCsc>,
    rows: usize,
    cols: usize,
) -> KktResult<()> {
    if let Some(m) = mat {
        KktError::check_len(context, rows, m.rows())?;
        KktError::check_len(context, cols, m.cols())?;
    }
    Ok(())
}

fn same_block_structure(old: Option<&SparseCsc>, new: &SparseCsc) -> bool {
    match old {
        Some(old) => sparse::same_structure(old, new),
        None => new.nnz() == 0,
    }
}

impl KktAssembler {
    /// Build the fixed pattern and slot maps, and write the fixed blocks.
    ///
    /// Σ starts at the identity (s = z = 1).
    pub fn new(layout: KktLayout, data: &QpData<'_>) -> KktResult<Self> {
        let n_x = layout.n_x();
        check_shape("cost matrix P", data.p, n_x, n_x)?;
        check_shape("equality Jacobian A", data.a, layout.n_eq(), n_x)?;
        check_shape("inequality Jacobian G", data.g, layout.n_ineq(), n_x)?;

        let y0 = layout.y_range().start;
        let z0 = layout.z_range().start;
        let s0 = layout.s_range().start;

        let mut entries: Vec<(usize, usize)> = Vec::new();
        if let Some(p) = data.p {
            entries.extend(p.iter().map(|(_, (r, c))| (r, c)).filter(|&(r, c)| r <= c));
        }
        if let Some(a) = data.a {
            entries.extend(a.iter().map(|(_, (i, j))| (j, y0 + i)));
        }
        if let Some(g) = data.g {
            entries.extend(g.iter().map(|(_, (i, j))| (j, z0 + i)));
        }
        entries.extend((0..layout.n_ineq()).map(|i| (s0 + i, z0 + i)));

        let pattern = SymmetricPattern::from_upper_entries(layout.dim(), entries)?;

        let slot = |r: usize, c: usize| {
            pattern
                .slot(r, c)
                .ok_or_else(|| KktError::config(format!("KKT entry ({}, {}) missing from pattern", r, c)))
        };
        let map = KktDataMap {
            p: match data.p {
                Some(p) => p
                    .iter()
                    .map(|(_, (r, c))| if r <= c { slot(r, c).map(Some) } else { Ok(None) })
                    .collect::<KktResult<_>>()?,
                None => Vec::new(),
            },
            a: match data.a {
                Some(a) => a.iter().map(|(_, (i, j))| slot(j, y0 + i)).collect::<KktResult<_>>()?,
                None => Vec::new(),
            },
            g: match data.g {
                Some(g) => g.iter().map(|(_, (i, j))| slot(j, z0 + i)).collect::<KktResult<_>>()?,
                None => Vec::new(),
            },
            sigma: layout.s_range().map(|i| pattern.diag_slot(i)).collect(),
            slack: (0..layout.n_ineq())
                .map(|i| slot(s0 + i, z0 + i))
                .collect::<KktResult<_>>()?,
        };

        let mut assembler = Self {
            signs: layout.pivot_signs(),
            layout,
            values: vec![0.0; pattern.nnz()],
            pattern,
            map,
            p: data.p.cloned(),
            a: data.a.cloned(),
            g: data.g.cloned(),
            revision: 0,
        };

        assembler.write_cost();
        assembler.write_eq();
        assembler.write_ineq();
        for &k in &assembler.map.slack {
            assembler.values[k] = 1.0;
        }
        for &k in &assembler.map.sigma {
            assembler.values[k] = 1.0;
        }

        log::debug!(
            "KKT assembled: n_x={} n_eq={} n_ineq={} dim={} nnz={}",
            layout.n_x(),
            layout.n_eq(),
            layout.n_ineq(),
            layout.dim(),
            assembler.pattern.nnz()
        );

        Ok(assembler)
    }

    fn write_cost(&mut self) {
        if let Some(p) = &self.p {
            for ((&v, _), slot) in p.iter().zip(&self.map.p) {
                if let Some(k) = *slot {
                    self.values[k] = v;
                }
            }
        }
    }

    fn write_eq(&mut self) {
        if let Some(a) = &self.a {
            for ((&v, _), &k) in a.iter().zip(&self.map.a) {
                self.values[k] = v;
            }
        }
    }

    fn write_ineq(&mut self) {
        if let Some(g) = &self.g {
            for ((&v, _), &k) in g.iter().zip(&self.map.g) {
                self.values[k] = v;
            }
        }
    }

    /// Write the barrier term `Σ_ii = z_i / s_i`.
    ///
    /// Only the Σ diagonal slots change. Values are not checked for sign or
    /// finiteness here.
    pub fn update_barrier(&mut self, s: &[f64], z: &[f64]) -> KktResult<()> {
        let m = self.layout.n_ineq();
        KktError::check_len("barrier slacks s", m, s.len())?;
        KktError::check_len("barrier multipliers z", m, z.len())?;
        for ((&k, &si), &zi) in self.map.sigma.iter().zip(s).zip(z) {
            self.values[k] = zi / si;
        }
        Ok(())
    }

    /// Write the barrier diagonal Σ directly.
    pub fn update_barrier_diag(&mut self, sigma: &[f64]) -> KktResult<()> {
        KktError::check_len("barrier diagonal", self.layout.n_ineq(), sigma.len())?;
        for (&k, &v) in self.map.sigma.iter().zip(sigma) {
            self.values[k] = v;
        }
        Ok(())
    }

    /// Replace the cost Hessian; the nonzero structure must not change.
    pub fn set_cost(&mut self, p: &SparseSymmetricCsc) -> KktResult<()> {
        let n_x = self.layout.n_x();
        check_shape("cost matrix P", Some(p), n_x, n_x)?;
        if !same_block_structure(self.p.as_ref(), p) {
            return Err(KktError::config("cost matrix P changed its nonzero structure"));
        }
        if self.p.is_some() {
            self.p = Some(p.clone());
            self.write_cost();
        }
        self.revision += 1;
        Ok(())
    }

    /// Replace the equality Jacobian; the nonzero structure must not change.
    pub fn set_eq_jacobian(&mut self, a: &SparseCsc) -> KktResult<()> {
        check_shape("equality Jacobian A", Some(a), self.layout.n_eq(), self.layout.n_x())?;
        if !same_block_structure(self.a.as_ref(), a) {
            return Err(KktError::config("equality Jacobian A changed its nonzero structure"));
        }
        if self.a.is_some() {
            self.a = Some(a.clone());
            self.write_eq();
        }
        self.revision += 1;
        Ok(())
    }

    /// Replace the inequality Jacobian; the nonzero structure must not change.
    pub fn set_ineq_jacobian(&mut self, g: &SparseCsc) -> KktResult<()> {
        check_shape("inequality Jacobian G", Some(g), self.layout.n_ineq(), self.layout.n_x())?;
        if !same_block_structure(self.g.as_ref(), g) {
            return Err(KktError::config("inequality Jacobian G changed its nonzero structure"));
        }
        if self.g.is_some() {
            self.g = Some(g.clone());
            self.write_ineq();
        }
        self.revision += 1;
        Ok(())
    }

    pub fn layout(&self) -> &KktLayout {
        &self.layout
    }

    pub fn pattern(&self) -> &SymmetricPattern {
        &self.pattern
    }

    /// Expected pivot sign per natural row.
    pub fn signs(&self) -> &[PivotSign] {
        &self.signs
    }

    /// Value array aligned with [`pattern`](Self::pattern).
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Slots of the Σ diagonal, in inequality order.
    pub fn barrier_slots(&self) -> &[usize] {
        &self.map.sigma
    }

    /// Number of fixed-data refreshes since construction.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// The assembled upper triangle as an `sprs` matrix.
    pub fn to_csc(&self) -> SparseSymmetricCsc {
        let n = self.layout.dim();
        sparse::from_triplets_symmetric(
            n,
            self.pattern
                .iter()
                .zip(&self.values)
                .map(|((r, c), &v)| (r, c, v)),
        )
    }
}

//! Index layout of the KKT system.
//!
//! Unknowns are ordered `[x | s | z | y]`:
//! - `x` primal variables (n_x)
//! - `s` inequality slacks (n_ineq)
//! - `z` inequality multipliers (n_ineq)
//! - `y` equality multipliers (n_eq)
//!
//! Rows of `x` and `s` carry positive pivots, rows of `z` and `y` negative ones.

use std::ops::Range;

use crate::error::{KktError, KktResult};
use crate::linalg::symbolic::PivotSign;

/// Block dimensions of a KKT system.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KktLayout {
    n_x: usize,
    n_eq: usize,
    n_ineq: usize,
}

/// Borrowed view of a length-N vector split into its KKT blocks.
#[derive(Debug, Clone, Copy)]
pub struct KktBlocks<'a> {
    pub x: &'a [f64],
    pub s: &'a [f64],
    pub z: &'a [f64],
    pub y: &'a [f64],
}

/// Mutable view of a length-N vector split into its KKT blocks.
#[derive(Debug)]
pub struct KktBlocksMut<'a> {
    pub x: &'a mut [f64],
    pub s: &'a mut [f64],
    pub z: &'a mut [f64],
    pub y: &'a mut [f64],
}

impl KktLayout {
    pub fn new(n_x: usize, n_eq: usize, n_ineq: usize) -> Self {
        Self { n_x, n_eq, n_ineq }
    }

    pub fn n_x(&self) -> usize {
        self.n_x
    }

    pub fn n_eq(&self) -> usize {
        self.n_eq
    }

    pub fn n_ineq(&self) -> usize {
        self.n_ineq
    }

    /// Total system dimension N = n_x + 2·n_ineq + n_eq.
    pub fn dim(&self) -> usize {
        self.n_x + 2 * self.n_ineq + self.n_eq
    }

    pub fn x_range(&self) -> Range<usize> {
        0..self.n_x
    }

    pub fn s_range(&self) -> Range<usize> {
        let start = self.n_x;
        start..start + self.n_ineq
    }

    pub fn z_range(&self) -> Range<usize> {
        let start = self.n_x + self.n_ineq;
        start..start + self.n_ineq
    }

    pub fn y_range(&self) -> Range<usize> {
        let start = self.n_x + 2 * self.n_ineq;
        start..start + self.n_eq
    }

    /// Expected pivot sign of every row in natural order.
    pub fn pivot_signs(&self) -> Vec<PivotSign> {
        let mut signs = vec![PivotSign::Positive; self.dim()];
        signs[self.n_x + self.n_ineq..].fill(PivotSign::Negative);
        signs
    }

    /// Split a length-N vector into its blocks.
    pub fn split<'a>(&self, v: &'a [f64]) -> KktResult<KktBlocks<'a>> {
        KktError::check_len("KKT vector", self.dim(), v.len())?;
        let (x, rest) = v.split_at(self.n_x);
        let (s, rest) = rest.split_at(self.n_ineq);
        let (z, y) = rest.split_at(self.n_ineq);
        Ok(KktBlocks { x, s, z, y })
    }

    /// Split a length-N vector into mutable blocks.
    pub fn split_mut<'a>(&self, v: &'a mut [f64]) -> KktResult<KktBlocksMut<'a>> {
        KktError::check_len("KKT vector", self.dim(), v.len())?;
        let (x, rest) = v.split_at_mut(self.n_x);
        let (s, rest) = rest.split_at_mut(self.n_ineq);
        let (z, y) = rest.split_at_mut(self.n_ineq);
        Ok(KktBlocksMut { x, s, z, y })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ranges_and_signs() {
        let layout = KktLayout::new(3, 1, 2);
        assert_eq!(layout.dim(), 8);
        assert_eq!(layout.x_range(), 0..3);
        assert_eq!(layout.s_range(), 3..5);
        assert_eq!(layout.z_range(), 5..7);
        assert_eq!(layout.y_range(), 7..8);

        let signs = layout.pivot_signs();
        assert!(signs[..5].iter().all(|&s| s == PivotSign::Positive));
        assert!(signs[5..].iter().all(|&s| s == PivotSign::Negative));
    }

    #[test]
    fn test_split() {
        let layout = KktLayout::new(2, 1, 1);
        let mut v = [1.0, 2.0, 3.0, 4.0, 5.0];
        {
            let b = layout.split_mut(&mut v).unwrap();
            b.z[0] = -4.0;
            b.y[0] = -5.0;
        }
        let b = layout.split(&v).unwrap();
        assert_eq!(b.x, &[1.0, 2.0]);
        assert_eq!(b.s, &[3.0]);
        assert_eq!(b.z, &[-4.0]);
        assert_eq!(b.y, &[-5.0]);

        assert!(layout.split(&v[..4]).is_err());
    }

    #[test]
    fn test_equality_only() {
        let layout = KktLayout::new(2, 2, 0);
        assert_eq!(layout.dim(), 4);
        assert!(layout.s_range().is_empty());
        assert_eq!(
            layout.pivot_signs(),
            vec![
                PivotSign::Positive,
                PivotSign::Positive,
                PivotSign::Negative,
                PivotSign::Negative
            ]
        );
    }
}

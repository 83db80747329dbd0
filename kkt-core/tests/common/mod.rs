//! Shared fixtures: synthetic MPC problems, random sparse matrices and
//! dense reference solves.

#![allow(dead_code)]

use kkt_core::linalg::sparse;
use kkt_core::{KktAssembler, KktLayout, PivotSign, QpData, SparseCsc, SparseSymmetricCsc, SymmetricPattern};
use nalgebra::{DMatrix, DVector};
use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

pub fn rng(seed: u64) -> ChaCha8Rng {
    ChaCha8Rng::seed_from_u64(seed)
}

/// Full dense symmetric matrix from an upper-triangle pattern and values.
pub fn dense_from_upper(pattern: &SymmetricPattern, values: &[f64]) -> DMatrix<f64> {
    let n = pattern.n();
    let mut k = DMatrix::zeros(n, n);
    for ((r, c), &v) in pattern.iter().zip(values) {
        k[(r, c)] = v;
        k[(c, r)] = v;
    }
    k
}

/// Reference solve with dense LU.
pub fn dense_solve(k: &DMatrix<f64>, b: &[f64]) -> Vec<f64> {
    let rhs = DVector::from_column_slice(b);
    let x = k
        .clone()
        .lu()
        .solve(&rhs)
        .expect("reference matrix is singular");
    x.iter().copied().collect()
}

pub fn max_abs_diff(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).fold(0.0, |acc, (x, y)| acc.max((x - y).abs()))
}

pub fn inf_norm(v: &[f64]) -> f64 {
    v.iter().fold(0.0, |acc, x| acc.max(x.abs()))
}

pub fn random_vec(rng: &mut ChaCha8Rng, n: usize) -> Vec<f64> {
    (0..n).map(|_| rng.gen_range(-1.0..1.0)).collect()
}

/// Random sparse SPD matrix (strictly diagonally dominant).
pub fn random_spd(rng: &mut ChaCha8Rng, n: usize, density: f64) -> (SymmetricPattern, Vec<f64>) {
    let mut upper = Vec::new();
    let mut row_sum = vec![0.0; n];
    for c in 0..n {
        for r in 0..c {
            if rng.gen::<f64>() < density {
                let v = rng.gen_range(-1.0..1.0);
                row_sum[r] += f64::abs(v);
                row_sum[c] += f64::abs(v);
                upper.push((r, c, v));
            }
        }
    }
    for (i, s) in row_sum.iter().enumerate() {
        upper.push((i, i, s + rng.gen_range(0.5..2.0)));
    }
    pattern_and_values(n, &upper)
}

/// Random quasi-definite matrix `[[H, B^T], [B, -E]]` with H, E diagonally
/// dominant; the first `n1` rows are positive.
pub fn random_quasi_definite(
    rng: &mut ChaCha8Rng,
    n1: usize,
    n2: usize,
    density: f64,
) -> (SymmetricPattern, Vec<f64>, Vec<PivotSign>) {
    let (h_pat, h_vals) = random_spd(rng, n1, density);
    let (e_pat, e_vals) = random_spd(rng, n2, density);

    let mut upper: Vec<(usize, usize, f64)> = h_pat
        .iter()
        .zip(&h_vals)
        .map(|((r, c), &v)| (r, c, v))
        .collect();
    upper.extend(e_pat.iter().zip(&e_vals).map(|((r, c), &v)| (n1 + r, n1 + c, -v)));
    for i in 0..n2 {
        for j in 0..n1 {
            if rng.gen::<f64>() < density {
                upper.push((j, n1 + i, rng.gen_range(-2.0..2.0)));
            }
        }
    }

    let (pattern, values) = pattern_and_values(n1 + n2, &upper);
    let mut signs = vec![PivotSign::Positive; n1];
    signs.extend(std::iter::repeat(PivotSign::Negative).take(n2));
    (pattern, values, signs)
}

pub fn pattern_and_values(n: usize, upper: &[(usize, usize, f64)]) -> (SymmetricPattern, Vec<f64>) {
    let pattern = SymmetricPattern::from_upper_entries(n, upper.iter().map(|&(r, c, _)| (r, c)))
        .expect("valid pattern");
    let mut values = vec![0.0; pattern.nnz()];
    for &(r, c, v) in upper {
        values[pattern.slot(r, c).expect("slot exists")] += v;
    }
    (pattern, values)
}

/// Linear MPC over `stages` stages with `nx` states and `nu` inputs.
///
/// Variables are `[x_0, u_0, ..., x_{N-1}, u_{N-1}, x_N]`; the equality block
/// carries the initial condition and the stage-to-stage dynamics, the
/// inequality block the input bounds.
pub struct MpcData {
    pub layout: KktLayout,
    pub p: SparseSymmetricCsc,
    pub a: SparseCsc,
    pub g: SparseCsc,
}

impl MpcData {
    pub fn generate(rng: &mut ChaCha8Rng, stages: usize, nx: usize, nu: usize) -> Self {
        let stage = nx + nu;
        let n = stages * stage + nx;

        let mut p_trip = Vec::new();
        for k in 0..=stages {
            for i in 0..nx {
                let d = k * stage + i;
                p_trip.push((d, d, rng.gen_range(1.0..3.0)));
                if i + 1 < nx {
                    p_trip.push((d, d + 1, rng.gen_range(-0.2..0.2)));
                }
            }
            if k < stages {
                for i in 0..nu {
                    let d = k * stage + nx + i;
                    p_trip.push((d, d, rng.gen_range(0.1..1.0)));
                }
            }
        }

        let dyn_a: Vec<f64> = (0..nx * nx)
            .map(|idx| {
                let ident = if idx / nx == idx % nx { 1.0 } else { 0.0 };
                ident + rng.gen_range(-0.1..0.1)
            })
            .collect();
        let dyn_b: Vec<f64> = (0..nx * nu).map(|_| rng.gen_range(-1.0..1.0)).collect();

        let mut a_trip = Vec::new();
        for i in 0..nx {
            a_trip.push((i, i, 1.0));
        }
        for k in 0..stages {
            let row = (k + 1) * nx;
            let (xk, uk, xnext) = (k * stage, k * stage + nx, (k + 1) * stage);
            for i in 0..nx {
                a_trip.push((row + i, xnext + i, 1.0));
                for j in 0..nx {
                    a_trip.push((row + i, xk + j, -dyn_a[i * nx + j]));
                }
                for j in 0..nu {
                    a_trip.push((row + i, uk + j, -dyn_b[i * nu + j]));
                }
            }
        }

        let mut g_trip = Vec::new();
        for k in 0..stages {
            for j in 0..nu {
                let col = k * stage + nx + j;
                g_trip.push((2 * (k * nu + j), col, 1.0));
                g_trip.push((2 * (k * nu + j) + 1, col, -1.0));
            }
        }

        let n_eq = (stages + 1) * nx;
        let n_ineq = 2 * stages * nu;
        Self {
            layout: KktLayout::new(n, n_eq, n_ineq),
            p: sparse::from_triplets_symmetric(n, p_trip),
            a: sparse::from_triplets(n_eq, n, a_trip),
            g: sparse::from_triplets(n_ineq, n, g_trip),
        }
    }

    pub fn assembler(&self) -> KktAssembler {
        KktAssembler::new(
            self.layout,
            &QpData {
                p: Some(&self.p),
                a: Some(&self.a),
                g: Some(&self.g),
            },
        )
        .expect("MPC data assembles")
    }
}

/// ‖K x − b‖∞ with dense K.
pub fn dense_residual_inf(k: &DMatrix<f64>, x: &[f64], b: &[f64]) -> f64 {
    let kx = k * DVector::from_column_slice(x);
    kx.iter().zip(b).fold(0.0, |acc, (v, bi)| acc.max((v - bi).abs()))
}

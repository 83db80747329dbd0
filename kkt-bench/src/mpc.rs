//! Synthetic linear MPC problems.
//!
//! Decision vector, stage by stage: `[x_0, u_0, x_1, u_1, ..., x_{N-1}, u_{N-1}, x_N]`.
//!
//! - cost: `sum x_k^T Q x_k + u_k^T R u_k` with Q tridiagonal, R diagonal
//! - equalities: `x_0 = x_init`, `x_{k+1} - A x_k - B u_k = 0`
//! - inequalities: `-u_max <= u_k <= u_max`

use kkt_core::linalg::sparse;
use kkt_core::{KktLayout, QpData, SparseCsc, SparseSymmetricCsc};
use rand::Rng;

pub struct MpcProblem {
    pub stages: usize,
    pub nx: usize,
    pub nu: usize,
    pub p: SparseSymmetricCsc,
    pub a: SparseCsc,
    pub g: SparseCsc,
}

impl MpcProblem {
    pub fn generate<R: Rng>(stages: usize, nx: usize, nu: usize, rng: &mut R) -> Self {
        let stage = nx + nu;
        let n = stages * stage + nx;
        let x_off = |k: usize| k * stage;
        let u_off = |k: usize| k * stage + nx;

        let mut p_trip = Vec::new();
        for k in 0..=stages {
            for i in 0..nx {
                p_trip.push((x_off(k) + i, x_off(k) + i, rng.gen_range(1.0..4.0)));
                if i + 1 < nx {
                    p_trip.push((x_off(k) + i, x_off(k) + i + 1, rng.gen_range(-0.3..0.3)));
                }
            }
            if k < stages {
                for i in 0..nu {
                    p_trip.push((u_off(k) + i, u_off(k) + i, rng.gen_range(0.1..1.0)));
                }
            }
        }
        let p = sparse::from_triplets_symmetric(n, p_trip);

        // Dynamics shared by all stages.
        let dyn_a: Vec<f64> = (0..nx * nx)
            .map(|idx| {
                let ident = if idx / nx == idx % nx { 1.0 } else { 0.0 };
                ident + rng.gen_range(-0.1..0.1)
            })
            .collect();
        let dyn_b: Vec<f64> = (0..nx * nu).map(|_| rng.gen_range(-1.0..1.0)).collect();

        let mut a_trip = Vec::new();
        for i in 0..nx {
            a_trip.push((i, x_off(0) + i, 1.0));
        }
        for k in 0..stages {
            let row0 = (k + 1) * nx;
            for i in 0..nx {
                a_trip.push((row0 + i, x_off(k + 1) + i, 1.0));
                for j in 0..nx {
                    a_trip.push((row0 + i, x_off(k) + j, -dyn_a[i * nx + j]));
                }
                for j in 0..nu {
                    a_trip.push((row0 + i, u_off(k) + j, -dyn_b[i * nu + j]));
                }
            }
        }
        let a = sparse::from_triplets((stages + 1) * nx, n, a_trip);

        let mut g_trip = Vec::new();
        for k in 0..stages {
            for j in 0..nu {
                let row = 2 * (k * nu + j);
                g_trip.push((row, u_off(k) + j, 1.0));
                g_trip.push((row + 1, u_off(k) + j, -1.0));
            }
        }
        let g = sparse::from_triplets(2 * stages * nu, n, g_trip);

        Self { stages, nx, nu, p, a, g }
    }

    pub fn layout(&self) -> KktLayout {
        KktLayout::new(self.p.rows(), self.a.rows(), self.g.rows())
    }

    pub fn data(&self) -> QpData<'_> {
        QpData {
            p: Some(&self.p),
            a: Some(&self.a),
            g: Some(&self.g),
        }
    }
}

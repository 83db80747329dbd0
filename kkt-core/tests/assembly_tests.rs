//! Assembly of MPC KKT systems and refresh of fixed problem data.

mod common;

use common::{dense_from_upper, dense_solve, inf_norm, max_abs_diff, random_vec, rng, MpcData};
use kkt_core::linalg::sparse;
use kkt_core::{KktError, KktSolver, LdlSettings, Ordering};

fn natural() -> LdlSettings {
    LdlSettings {
        ordering: Ordering::Natural,
        ..Default::default()
    }
}

#[test]
fn mpc_layout_and_pattern() {
    let mut r = rng(1);
    let mpc = MpcData::generate(&mut r, 7, 4, 2);
    let asm = mpc.assembler();
    let layout = asm.layout();

    // 7 stages of (4 + 2) plus the terminal state
    assert_eq!(layout.n_x(), 46);
    assert_eq!(layout.n_eq(), 32);
    assert_eq!(layout.n_ineq(), 28);
    assert_eq!(layout.dim(), 46 + 2 * 28 + 32);
    assert_eq!(asm.pattern().n(), layout.dim());

    // every s row couples to its z row through the identity
    for (s, z) in layout.s_range().zip(layout.z_range()) {
        let slot = asm.pattern().slot(s, z).unwrap();
        assert_eq!(asm.values()[slot], 1.0);
    }
    // y rows never couple to each other
    for i in layout.y_range() {
        for j in layout.y_range() {
            if i != j {
                assert!(asm.pattern().slot(i, j).is_none());
            }
        }
    }
    assert_eq!(asm.to_csc().rows(), layout.dim());
}

#[test]
fn barrier_update_changes_solution_only_through_sigma() {
    let mut r = rng(2);
    let mpc = MpcData::generate(&mut r, 4, 3, 1);
    let mut asm = mpc.assembler();
    let m = mpc.layout.n_ineq();
    let mut solver = KktSolver::from_assembler(&asm, natural()).unwrap();
    let b = random_vec(&mut r, mpc.layout.dim());

    for sigma in [0.01, 1.0, 100.0] {
        asm.update_barrier(&vec![1.0; m], &vec![sigma; m]).unwrap();
        for &k in asm.barrier_slots() {
            assert_eq!(asm.values()[k], sigma);
        }

        let x_ref = dense_solve(&dense_from_upper(asm.pattern(), asm.values()), &b);
        let x = solver.factorize(asm.values()).unwrap().solve(&b).unwrap();
        assert!(max_abs_diff(&x, &x_ref) < 1e-9 * inf_norm(&x_ref).max(1.0));
    }
}

#[test]
fn refreshed_cost_is_used_by_next_factorization() {
    let mut r = rng(3);
    let mpc = MpcData::generate(&mut r, 3, 2, 1);
    let mut asm = mpc.assembler();
    let mut solver = KktSolver::from_assembler(&asm, natural()).unwrap();
    let b = random_vec(&mut r, mpc.layout.dim());
    let x_old = solver.factorize(asm.values()).unwrap().solve(&b).unwrap();

    // Same structure, doubled values.
    let mut p2 = mpc.p.clone();
    p2.map_inplace(|v| 2.0 * v);
    asm.set_cost(&p2).unwrap();
    assert_eq!(asm.revision(), 1);

    let x_ref = dense_solve(&dense_from_upper(asm.pattern(), asm.values()), &b);
    let x_new = solver.factorize(asm.values()).unwrap().solve(&b).unwrap();
    assert!(max_abs_diff(&x_new, &x_ref) < 1e-9 * inf_norm(&x_ref).max(1.0));
    assert!(max_abs_diff(&x_new, &x_old) > 1e-6);
}

#[test]
fn structural_change_is_rejected() {
    let mut r = rng(4);
    let mpc = MpcData::generate(&mut r, 2, 2, 1);
    let mut asm = mpc.assembler();
    let before = asm.values().to_vec();

    let n_x = mpc.layout.n_x();
    let dense_row = sparse::from_triplets(
        mpc.layout.n_eq(),
        n_x,
        (0..n_x).map(|j| (0, j, 1.0)).collect::<Vec<_>>(),
    );
    assert!(matches!(
        asm.set_eq_jacobian(&dense_row),
        Err(KktError::Configuration(_))
    ));
    assert_eq!(asm.values(), before.as_slice());
    assert_eq!(asm.revision(), 0);
}

#[test]
fn factorize_csc_matches_slot_values() {
    let mut r = rng(5);
    let mpc = MpcData::generate(&mut r, 2, 2, 1);
    let asm = mpc.assembler();
    let mut solver = KktSolver::from_assembler(&asm, natural()).unwrap();
    let b = random_vec(&mut r, mpc.layout.dim());

    let x_slots = solver.factorize(asm.values()).unwrap().solve(&b).unwrap();
    let x_csc = solver.factorize_csc(&asm.to_csc()).unwrap().solve(&b).unwrap();
    assert_eq!(x_slots, x_csc);
}

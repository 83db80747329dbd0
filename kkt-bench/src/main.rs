//! Per-tick latency benchmark for the KKT factorization core.
//!
//! Builds a synthetic MPC problem and replays the controller tick
//! (barrier update, factorization, predictor and corrector solves, optional
//! residual check) with fresh barrier values every tick.

mod mpc;

use std::time::Duration;

use anyhow::{ensure, Context, Result};
use clap::{Parser, ValueEnum};
use kkt_core::{KktAssembler, KktSolver, LdlSettings, Ordering, PerfSection};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::mpc::MpcProblem;

#[derive(ValueEnum, Clone, Copy, Debug)]
enum OrderingChoice {
    Natural,
    Amd,
}

impl From<OrderingChoice> for Ordering {
    fn from(choice: OrderingChoice) -> Self {
        match choice {
            OrderingChoice::Natural => Ordering::Natural,
            OrderingChoice::Amd => Ordering::Amd,
        }
    }
}

#[derive(Parser)]
#[command(name = "kkt-bench")]
#[command(about = "Per-tick latency of the quasi-definite KKT factorization on a synthetic MPC")]
struct Args {
    /// Prediction horizon (number of stages)
    #[arg(long, default_value = "20")]
    stages: usize,

    /// State dimension per stage
    #[arg(long, default_value = "12")]
    nx: usize,

    /// Input dimension per stage
    #[arg(long, default_value = "6")]
    nu: usize,

    /// Number of simulated controller ticks
    #[arg(long, default_value = "1000")]
    ticks: usize,

    /// Elimination ordering
    #[arg(long, value_enum, default_value = "amd")]
    ordering: OrderingChoice,

    /// Static regularization (overrides KKT_STATIC_REG)
    #[arg(long)]
    static_reg: Option<f64>,

    /// Random seed for problem data and barrier values
    #[arg(long, default_value = "42")]
    seed: u64,

    /// Run residual checks every tick
    #[arg(long)]
    check: bool,
}

struct LatencyStats {
    min: Duration,
    mean: Duration,
    p99: Duration,
    max: Duration,
}

fn latency_stats(samples: &mut [Duration]) -> Option<LatencyStats> {
    if samples.is_empty() {
        return None;
    }
    samples.sort_unstable();
    let total: Duration = samples.iter().sum();
    let p99_idx = ((samples.len() as f64 * 0.99).ceil() as usize).clamp(1, samples.len()) - 1;
    Some(LatencyStats {
        min: samples[0],
        mean: total / samples.len() as u32,
        p99: samples[p99_idx],
        max: samples[samples.len() - 1],
    })
}

fn us(d: Duration) -> f64 {
    d.as_secs_f64() * 1e6
}

fn main() -> Result<()> {
    let args = Args::parse();
    ensure!(args.stages > 0 && args.nx > 0, "stages and nx must be positive");

    let mut settings = LdlSettings::from_env();
    settings.ordering = args.ordering.into();
    settings.static_reg = args.static_reg.unwrap_or(if settings.static_reg > 0.0 {
        settings.static_reg
    } else {
        1e-8
    });

    let mut rng = ChaCha8Rng::seed_from_u64(args.seed);
    let problem = MpcProblem::generate(args.stages, args.nx, args.nu, &mut rng);
    let layout = problem.layout();

    let mut assembler =
        KktAssembler::new(layout, &problem.data()).context("failed to assemble KKT system")?;
    let mut solver = KktSolver::from_assembler(&assembler, settings.clone())
        .context("symbolic analysis failed")?;

    let sym = solver.symbolic();
    println!("KKT Factorization Benchmark");
    println!("===========================\n");
    println!("Stages:            {}", problem.stages);
    println!("State / input:     {} / {}", problem.nx, problem.nu);
    println!(
        "KKT dimension:     {} (x={}, s=z={}, y={})",
        layout.dim(),
        layout.n_x(),
        layout.n_ineq(),
        layout.n_eq()
    );
    println!("Ordering:          {:?}", args.ordering);
    println!("Static reg:        {:.1e}", settings.static_reg);
    println!("nnz(A upper):      {}", sym.nnz_a());
    println!("nnz(L):            {}", sym.nnz_l());
    println!("Fill-in:           {}", sym.fill_in());
    println!("Factor flops:      {}", sym.factor_flops());
    println!();

    let n = layout.dim();
    let m = layout.n_ineq();
    let mut s = vec![0.0; m];
    let mut z = vec![0.0; m];
    let mut rhs_aff = vec![0.0; n];
    let mut rhs_cc = vec![0.0; n];
    let mut d_aff = vec![0.0; n];
    let mut d_cc = vec![0.0; n];

    let mut samples: Vec<(PerfSection, Vec<Duration>)> = PerfSection::ALL
        .iter()
        .map(|&section| (section, Vec::with_capacity(args.ticks)))
        .collect();
    let mut tick_total = Vec::with_capacity(args.ticks);
    let mut worst_residual: f64 = 0.0;
    let mut worst_pivot_ratio: f64 = 0.0;

    for _ in 0..args.ticks {
        for (si, zi) in s.iter_mut().zip(z.iter_mut()) {
            *si = 10f64.powf(rng.gen_range(-4.0..1.0));
            *zi = 10f64.powf(rng.gen_range(-4.0..1.0));
        }
        for (a, c) in rhs_aff.iter_mut().zip(rhs_cc.iter_mut()) {
            *a = rng.gen_range(-1.0..1.0);
            *c = rng.gen_range(-1.0..1.0);
        }

        let before = solver.timers().clone();
        {
            let _g = solver.timers_mut().scoped(PerfSection::Assemble);
            assembler.update_barrier(&s, &z)?;
        }
        {
            let mut f = solver.factorize(assembler.values())?;
            worst_pivot_ratio = worst_pivot_ratio.max(f.info().pivot_ratio());
            f.solve_pair(&rhs_aff, &rhs_cc, &mut d_aff, &mut d_cc)?;
            if args.check {
                let r1 = f.residual_norm_sq(&rhs_aff, &d_aff)?.sqrt();
                let r2 = f.residual_norm_sq(&rhs_cc, &d_cc)?.sqrt();
                worst_residual = worst_residual.max(r1).max(r2);
            }
        }

        let after = solver.timers();
        for (section, bucket) in samples.iter_mut() {
            bucket.push(after.get(*section) - before.get(*section));
        }
        tick_total.push(after.total() - before.total());
    }

    println!(
        "{:<12} {:>10} {:>10} {:>10} {:>10}",
        "section", "min [us]", "mean [us]", "p99 [us]", "max [us]"
    );
    println!("{}", "-".repeat(56));
    for (section, bucket) in samples.iter_mut() {
        if *section == PerfSection::Check && !args.check {
            continue;
        }
        if let Some(st) = latency_stats(bucket) {
            println!(
                "{:<12} {:>10.2} {:>10.2} {:>10.2} {:>10.2}",
                section.name(),
                us(st.min),
                us(st.mean),
                us(st.p99),
                us(st.max)
            );
        }
    }
    if let Some(st) = latency_stats(&mut tick_total) {
        println!(
            "{:<12} {:>10.2} {:>10.2} {:>10.2} {:>10.2}",
            "tick",
            us(st.min),
            us(st.mean),
            us(st.p99),
            us(st.max)
        );
    }
    println!();

    let counters = solver.counters();
    println!("Factorizations:    {}", counters.factorizations);
    println!("Solves:            {}", counters.solves);
    println!("Reg. pivots:       {}", counters.regularized_pivots);
    println!("Warnings:          {}", counters.warnings);
    println!("Worst |D| ratio:   {:.3e}", worst_pivot_ratio);
    if args.check {
        println!("Worst residual:    {:.3e}", worst_residual);
    }

    Ok(())
}

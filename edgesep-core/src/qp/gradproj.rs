//! Projected-gradient descent on the relaxed cut cost.
//!
//! Minimizes `f(x) = x'A(1-x)` over `{x in [0,1]^n : lo <= a'x <= hi}` by
//! gradient steps projected through the napsack. The previous multiplier and
//! the bound classification of the current iterate seed each projection, so
//! consecutive calls stay near-linear once the iterates settle.

use std::time::Instant;

use crate::linalg;
use crate::problem::{Graph, Options, QpResult, SolveError, SolveInfo, SolveStatus};

use super::diagnostics::DiagnosticsConfig;
use super::napsack::napsack_unchecked;
use super::{FreeStatus, QpWorkspace};

/// Sufficient-decrease factor for the line search.
const ARMIJO_SIGMA: f64 = 1e-4;

/// Step-size floor; below this the line search is declared dead.
const MIN_STEP: f64 = 1e-20;

/// Compute the continuous edge-separator relaxation for `graph`.
pub fn solve(graph: &Graph, options: &Options) -> Result<QpResult, SolveError> {
    options.validate()?;
    graph.validate()?;
    let n = graph.num_vertices();
    if n == 0 {
        return Err(SolveError::Empty);
    }

    let start = Instant::now();
    let diag = DiagnosticsConfig::from_env();

    let total = graph.total_vertex_weight();
    let lo = (options.target_split - options.soft_split_tolerance) * total;
    let hi = (options.target_split + options.soft_split_tolerance) * total;
    debug_assert!(lo <= hi && hi >= 0.0 && lo <= total);

    let weights = graph.vertex_weights.as_deref();
    let adjacency = &graph.adjacency;
    let mut ws = QpWorkspace::new(n);
    let mut info = SolveInfo::default();

    let mut x = match options.initial_partition.as_deref() {
        Some(partition) => {
            if partition.len() != n {
                return Err(SolveError::LenMismatch { expected: n, actual: partition.len() });
            }
            partition.iter().map(|&side| if side { 1.0 } else { 0.0 }).collect()
        }
        None => natural_order_guess(graph, options.target_split * total),
    };

    // bring the guess into the feasible slab before measuring the cost
    let mut lambda = {
        let outcome = napsack_unchecked(
            &mut x,
            lo,
            hi,
            weights,
            0.0,
            None,
            &mut ws.breaks,
            &mut ws.heap_slots,
            &mut ws.heap_pos,
        );
        info.napsack_calls += 1;
        info.transitions += outcome.transitions;
        outcome.lambda
    };
    update_free_status(&x, &mut ws.free_status);

    let mut f_cur = linalg::relaxed_cut_cost(adjacency, &x);
    let mut alpha = 1.0;
    let mut status = SolveStatus::IterationLimit;

    for iter in 0..options.grad_proj_iteration_limit {
        linalg::cut_gradient(adjacency, &x, &mut ws.grad);

        // shrink the step until the projected move decreases the cost
        let mut accepted = None;
        while alpha >= MIN_STEP {
            for k in 0..n {
                ws.trial[k] = x[k] - alpha * ws.grad[k];
            }
            let outcome = napsack_unchecked(
                &mut ws.trial,
                lo,
                hi,
                weights,
                lambda,
                Some(&ws.free_status),
                &mut ws.breaks,
                &mut ws.heap_slots,
                &mut ws.heap_pos,
            );
            info.napsack_calls += 1;
            info.transitions += outcome.transitions;

            let f_new = linalg::relaxed_cut_cost(adjacency, &ws.trial);
            let step_sq: f64 = x
                .iter()
                .zip(&ws.trial)
                .map(|(xi, ti)| (xi - ti) * (xi - ti))
                .sum();
            if f_new <= f_cur - ARMIJO_SIGMA * step_sq / alpha {
                accepted = Some((outcome, f_new));
                break;
            }
            alpha *= 0.5;
            info.backtracks += 1;
        }
        info.iters = iter + 1;

        let Some((outcome, f_new)) = accepted else {
            status = SolveStatus::Stalled;
            break;
        };
        lambda = outcome.lambda;
        f_cur = f_new;

        let step_inf = linalg::inf_norm_diff(&x, &ws.trial);
        x.copy_from_slice(&ws.trial);
        update_free_status(&x, &mut ws.free_status);
        info.final_step = step_inf;

        if diag.should_log(iter) || options.verbose {
            eprintln!(
                "gradproj iter {iter}: case {} lambda {:.6e} cost {:.6e} step {:.3e} alpha {:.3e}",
                outcome.case, lambda, f_cur, step_inf, alpha
            );
        }

        if step_inf < options.grad_proj_tolerance {
            status = SolveStatus::Converged;
            break;
        }
    }

    info.solve_time_ms = start.elapsed().as_millis() as u64;
    Ok(QpResult { status, x, lambda, obj_val: f_cur, info })
}

/// Integer starting guess: side B gets vertices in natural order until the
/// target weight is covered.
fn natural_order_guess(graph: &Graph, target: f64) -> Vec<f64> {
    let n = graph.num_vertices();
    let mut x = vec![0.0; n];
    let mut covered = 0.0;
    for (k, slot) in x.iter_mut().enumerate() {
        if covered >= target {
            break;
        }
        *slot = 1.0;
        covered += graph.vertex_weight(k);
    }
    x
}

fn update_free_status(x: &[f64], status: &mut [FreeStatus]) {
    for (s, &v) in status.iter_mut().zip(x) {
        *s = if v <= 0.0 {
            FreeStatus::AtLower
        } else if v >= 1.0 {
            FreeStatus::AtUpper
        } else {
            FreeStatus::Free
        };
    }
}

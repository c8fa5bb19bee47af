//! Continuous napsack projection.
//!
//! Finds the `x` minimizing `||x - y||` subject to `0 <= x <= 1` and
//! `lo <= a'x <= hi`, where the vertex weights `a` are strictly positive
//! (absent weights mean all ones). The solution is recovered from the dual of
//! the constraint `a'x = b`, `lo <= b <= hi`:
//!
//! ```text
//! L(t) = min { ||x - y||^2 + t (a'x - b) : 0 <= x <= 1, lo <= b <= hi }
//! ```
//!
//! `L` is concave and continuously differentiable except at `t = 0`. For the
//! maximizer `m`, the primal solution is `x = proj(y - m*a)` with `proj` the
//! componentwise clamp onto `[0, 1]`, and the slope is
//!
//! ```text
//! L'(t) = a'proj(y - t*a) - hi   (t > 0)
//!         a'proj(y - t*a) - lo   (t < 0)
//! ```
//!
//! The maximum sits at `t = 0` exactly when `lo <= a'proj(y) <= hi`.
//! Otherwise a directional search walks the breakpoints of the piecewise
//! linear slope: [`napup`](super::napup::napup) raises the multiplier when
//! the slope is too large, [`napdown`](super::napdown::napdown) lowers it
//! when too small. The dispatch below starts from the caller's guess and
//! keeps a single search from crossing zero, where the slope jumps by
//! `hi - lo`. Total work is `O(n + h log n)` with `h` the number of free-set
//! membership transitions; when the slope already vanishes at the guess or at
//! zero, no heap is built and the call is O(n).
//!
//! With an estimated free set and a nonzero guess, the starting multiplier is
//! instead taken as the closed-form zero of the slope under that estimate,
//! which makes warm-started calls near-linear when the estimate is close.

use std::fmt;

use crate::problem::SolveError;

use super::napdown::napdown;
use super::napup::napup;
use super::project::project;
use super::{vertex_weight, FreeStatus, QpWorkspace};

/// Dispatch label for one napsack call, mirroring the dual case analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NapsackCase {
    Case1Up,
    Case1Noop,
    Case2Down,
    Case2Noop,
    Case3aDown,
    Case3bDown,
    Case3cNoop,
    Case3dDown,
    Case3eNoop,
    Case4aUp,
    Case4bUp,
    Case4cNoop,
    Case4dUp,
    Case4eNoop,
}

impl fmt::Display for NapsackCase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            NapsackCase::Case1Up => "1 up",
            NapsackCase::Case1Noop => "1 nothing",
            NapsackCase::Case2Down => "2 down",
            NapsackCase::Case2Noop => "2 nothing",
            NapsackCase::Case3aDown => "3a down",
            NapsackCase::Case3bDown => "3b down",
            NapsackCase::Case3cNoop => "3c nothing",
            NapsackCase::Case3dDown => "3d down",
            NapsackCase::Case3eNoop => "3e nothing",
            NapsackCase::Case4aUp => "4a up",
            NapsackCase::Case4bUp => "4b up",
            NapsackCase::Case4cNoop => "4c nothing",
            NapsackCase::Case4dUp => "4d up",
            NapsackCase::Case4eNoop => "4e nothing",
        };
        write!(f, "{label}")
    }
}

/// Outcome of one napsack call.
#[derive(Debug, Clone, Copy)]
pub struct NapsackOutcome {
    /// Final dual multiplier.
    pub lambda: f64,
    /// Which dispatch case ran.
    pub case: NapsackCase,
    /// Free-set membership transitions performed by the directional search.
    pub transitions: usize,
}

/// Project `x` onto `{0 <= x <= 1, lo <= a'x <= hi}`.
///
/// On entry `x` holds the unconstrained point `y`; on exit it holds the
/// projection. `lambda` is the starting guess for the dual multiplier and
/// `free_status`, when given, seeds a better one. The workspace buffers are
/// borrowed for the duration of the call and carry no meaning afterwards.
pub fn napsack(
    x: &mut [f64],
    lo: f64,
    hi: f64,
    weights: Option<&[f64]>,
    lambda: f64,
    free_status: Option<&[FreeStatus]>,
    ws: &mut QpWorkspace,
) -> Result<NapsackOutcome, SolveError> {
    let n = x.len();
    if n == 0 {
        return Err(SolveError::Empty);
    }
    if lo > hi {
        return Err(SolveError::BoundsReversed { lo, hi });
    }
    if hi < 0.0 {
        return Err(SolveError::NegativeUpper { hi });
    }
    let mut total = 0.0;
    if let Some(a) = weights {
        if a.len() != n {
            return Err(SolveError::LenMismatch { expected: n, actual: a.len() });
        }
        for (index, &value) in a.iter().enumerate() {
            if !value.is_finite() || value <= 0.0 {
                return Err(SolveError::NonPositiveWeight { index, value });
            }
            total += value;
        }
    } else {
        total = n as f64;
    }
    if lo > total {
        return Err(SolveError::LowerExceedsWeight { lo, total });
    }
    if let Some(status) = free_status {
        if status.len() != n {
            return Err(SolveError::LenMismatch { expected: n, actual: status.len() });
        }
    }
    if ws.breaks.len() < n {
        return Err(SolveError::LenMismatch { expected: n, actual: ws.breaks.len() });
    }

    Ok(napsack_unchecked(
        x,
        lo,
        hi,
        weights,
        lambda,
        free_status,
        &mut ws.breaks,
        &mut ws.heap_slots,
        &mut ws.heap_pos,
    ))
}

/// `a'proj(y - lambda*a)` without the bound adjustment.
pub(crate) fn clamped_weighted_sum(y: &[f64], weights: Option<&[f64]>, lambda: f64) -> f64 {
    let mut slope = 0.0;
    for (k, &yk) in y.iter().enumerate() {
        let ak = vertex_weight(weights, k);
        let xi = yk - ak * lambda;
        if xi >= 1.0 {
            slope += ak;
        } else if xi > 0.0 {
            slope += ak * xi;
        }
    }
    slope
}

#[allow(clippy::too_many_arguments)]
pub(crate) fn napsack_unchecked(
    x: &mut [f64],
    lo: f64,
    hi: f64,
    weights: Option<&[f64]>,
    lambda: f64,
    free_status: Option<&[FreeStatus]>,
    breaks: &mut [f64],
    heap_slots: &mut [usize],
    heap_pos: &mut [usize],
) -> NapsackOutcome {
    let n = x.len();
    let mut lambda = lambda;

    // Closed-form starting guess from the estimated free set: the zero of
    // the slope assuming the estimate is exact.
    if let Some(status) = free_status {
        if lambda != 0.0 {
            let mut asum = if lambda > 0.0 { -hi } else { -lo };
            let mut a2sum = 0.0;
            for k in 0..n {
                let ak = vertex_weight(weights, k);
                match status[k] {
                    FreeStatus::AtUpper => asum += ak,
                    FreeStatus::Free => {
                        asum += x[k] * ak;
                        a2sum += ak * ak;
                    }
                    FreeStatus::AtLower => {}
                }
            }
            if a2sum != 0.0 {
                lambda = asum / a2sum;
            }
        }
    }

    let slope = clamped_weighted_sum(x, weights, lambda);

    let case;
    let mut transitions = 0;
    if lambda >= 0.0 && slope >= hi {
        // case 1: the maximizer is at or above the guess
        if slope > hi {
            case = NapsackCase::Case1Up;
            let (l, t) = napup(x, lambda, weights, hi, breaks, heap_slots, heap_pos);
            lambda = l.max(0.0);
            transitions = t;
        } else {
            case = NapsackCase::Case1Noop;
        }
    } else if lambda <= 0.0 && slope <= lo {
        // case 2: the maximizer is at or below the guess
        if slope < lo {
            case = NapsackCase::Case2Down;
            let (l, t) = napdown(x, lambda, weights, lo, breaks, heap_slots, heap_pos);
            lambda = l.min(0.0);
            transitions = t;
        } else {
            case = NapsackCase::Case2Noop;
        }
    } else if lambda != 0.0 {
        let slope0 = clamped_weighted_sum(x, weights, 0.0);
        if lambda >= 0.0 && slope < hi {
            // case 3: overshot from above; the slope at zero decides the side
            if slope0 < lo {
                case = NapsackCase::Case3aDown;
                let (l, t) = napdown(x, 0.0, weights, lo, breaks, heap_slots, heap_pos);
                lambda = l.min(0.0);
                transitions = t;
            } else if slope0 > hi {
                case = NapsackCase::Case3bDown;
                let (l, t) = napdown(x, lambda, weights, hi, breaks, heap_slots, heap_pos);
                lambda = l.max(0.0);
                transitions = t;
            } else {
                case = NapsackCase::Case3cNoop;
                lambda = 0.0;
            }
        } else {
            // case 4: lambda <= 0 and slope > lo
            if slope0 > hi {
                case = NapsackCase::Case4aUp;
                let (l, t) = napup(x, 0.0, weights, hi, breaks, heap_slots, heap_pos);
                lambda = l.max(0.0);
                transitions = t;
            } else if slope0 < lo {
                case = NapsackCase::Case4bUp;
                let (l, t) = napup(x, lambda, weights, lo, breaks, heap_slots, heap_pos);
                lambda = l.min(0.0);
                transitions = t;
            } else {
                case = NapsackCase::Case4cNoop;
                lambda = 0.0;
            }
        }
    } else if slope < hi {
        // lambda == 0: only reachable with lo < slope < hi, kept in full to
        // mirror the dispatch table
        if slope < lo {
            case = NapsackCase::Case3dDown;
            let (l, t) = napdown(x, lambda, weights, lo, breaks, heap_slots, heap_pos);
            lambda = l.min(0.0);
            transitions = t;
        } else {
            case = NapsackCase::Case3eNoop;
        }
    } else if slope > hi {
        case = NapsackCase::Case4dUp;
        let (l, t) = napup(x, lambda, weights, hi, breaks, heap_slots, heap_pos);
        lambda = l.max(0.0);
        transitions = t;
    } else {
        case = NapsackCase::Case4eNoop;
    }

    // replace y with proj(y - lambda*a)
    project(x, weights, lambda);

    #[cfg(debug_assertions)]
    check_projection(x, weights, lo, hi);

    NapsackOutcome { lambda, case, transitions }
}

/// Fatal invariant check on the projected point (debug builds only).
#[cfg(debug_assertions)]
fn check_projection(x: &[f64], weights: Option<&[f64]>, lo: f64, hi: f64) {
    let eps = 1e-3 * 1.0_f64.max(hi.abs()).max(lo.abs());
    let mut atx = 0.0;
    for (k, &xk) in x.iter().enumerate() {
        assert!(
            (0.0..=1.0).contains(&xk),
            "napsack error: x[{k}] = {xk} outside [0, 1]"
        );
        atx += vertex_weight(weights, k) * xk;
    }
    assert!(
        atx >= lo - eps && atx <= hi + eps,
        "napsack error: lo {lo} a'x {atx} hi {hi}"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::linalg::weighted_sum;

    fn run(
        y: &[f64],
        lo: f64,
        hi: f64,
        weights: Option<&[f64]>,
        lambda: f64,
        status: Option<&[FreeStatus]>,
    ) -> (Vec<f64>, NapsackOutcome) {
        let mut x = y.to_vec();
        let mut ws = QpWorkspace::new(y.len());
        let outcome = napsack(&mut x, lo, hi, weights, lambda, status, &mut ws).unwrap();
        (x, outcome)
    }

    fn assert_close(actual: &[f64], expected: &[f64], tol: f64) {
        assert_eq!(actual.len(), expected.len());
        for (k, (a, e)) in actual.iter().zip(expected).enumerate() {
            assert!((a - e).abs() < tol, "x[{k}] = {a}, expected {e}");
        }
    }

    #[test]
    fn test_sum_above_hi_walks_up() {
        let y = vec![0.2, 0.5, 0.9, 1.3];
        let (x, outcome) = run(&y, 1.0, 1.5, None, 0.0, None);
        assert!((outcome.lambda - 0.4).abs() < 1e-12);
        assert_close(&x, &[0.0, 0.1, 0.5, 0.9], 1e-12);
        assert!((weighted_sum(None, &x) - 1.5).abs() < 1e-12);
        assert_eq!(outcome.case, NapsackCase::Case1Up);
    }

    #[test]
    fn test_interior_point_is_untouched() {
        let y = vec![0.5, 0.5, 0.5];
        let a = [1.0, 2.0, 3.0];
        let (x, outcome) = run(&y, 0.0, 6.0, Some(&a), 0.0, None);
        assert_eq!(outcome.lambda, 0.0);
        assert_eq!(x, y);
        assert_eq!(outcome.case, NapsackCase::Case3eNoop);
        assert_eq!(outcome.transitions, 0);
    }

    #[test]
    fn test_narrow_window_pushes_two_components_out() {
        let y = vec![2.0, -1.0, 0.5];
        let (x, outcome) = run(&y, 0.4, 0.6, None, 0.0, None);
        assert!((outcome.lambda - 1.4).abs() < 1e-12);
        assert_close(&x, &[0.6, 0.0, 0.0], 1e-12);
    }

    #[test]
    fn test_uniform_ones_split_evenly() {
        let y = vec![1.0; 5];
        let (x, outcome) = run(&y, 0.0, 2.0, None, 0.0, None);
        assert!((outcome.lambda - 0.6).abs() < 1e-12);
        assert_close(&x, &[0.4; 5], 1e-12);
    }

    #[test]
    fn test_sum_below_lo_walks_down() {
        let y = vec![0.5];
        let (x, outcome) = run(&y, 0.7, 0.7, None, 0.0, None);
        assert!((outcome.lambda + 0.2).abs() < 1e-12);
        assert_close(&x, &[0.7], 1e-12);
        assert_eq!(outcome.case, NapsackCase::Case2Down);
    }

    #[test]
    fn test_free_set_seeding_lands_near_the_optimum() {
        let y = vec![0.2, 0.5, 0.9, 1.3];
        let status = [
            FreeStatus::AtLower,
            FreeStatus::Free,
            FreeStatus::Free,
            FreeStatus::AtUpper,
        ];
        let (x, outcome) = run(&y, 1.0, 1.5, None, 0.3, Some(&status));
        // seeded guess (1 + 1.4 - 1.5)/2 = 0.45 overshoots; one descending
        // piece recovers the exact multiplier with no heap traffic
        assert!((outcome.lambda - 0.4).abs() < 1e-12);
        assert_close(&x, &[0.0, 0.1, 0.5, 0.9], 1e-12);
        assert_eq!(outcome.case, NapsackCase::Case3bDown);
        assert!(outcome.transitions <= 2);
    }

    #[test]
    fn test_case_dispatch_labels() {
        // slope at the guess equals hi exactly: nothing to do
        let y = vec![0.5, 1.5];
        let (_, outcome) = run(&y, 0.0, 1.5, None, 0.0, None);
        assert_eq!(outcome.case, NapsackCase::Case1Noop);

        // slope at the guess equals lo exactly
        let (_, outcome) = run(&[0.5, 0.5], 1.0, 2.0, None, 0.0, None);
        assert_eq!(outcome.case, NapsackCase::Case2Noop);

        // positive guess, already past the zero, feasible at zero
        let (_, outcome) = run(&[0.4, 0.4], 0.0, 2.0, None, 0.5, None);
        assert_eq!(outcome.case, NapsackCase::Case3cNoop);

        // negative guess, feasible at zero
        let (_, outcome) = run(&[0.4, 0.4], 0.0, 2.0, None, -0.5, None);
        assert_eq!(outcome.case, NapsackCase::Case4cNoop);

        // positive guess but the point needs pulling up past zero
        let (x, outcome) = run(&[0.1, 0.1], 1.0, 2.0, None, 0.5, None);
        assert_eq!(outcome.case, NapsackCase::Case3aDown);
        assert!((weighted_sum(None, &x) - 1.0).abs() < 1e-9);
        assert!(outcome.lambda <= 0.0);

        // negative guess but the point needs pushing down past zero
        let (x, outcome) = run(&[0.9, 0.9], 0.0, 1.0, None, -0.5, None);
        assert_eq!(outcome.case, NapsackCase::Case4aUp);
        assert!((weighted_sum(None, &x) - 1.0).abs() < 1e-9);
        assert!(outcome.lambda >= 0.0);
    }

    #[test]
    fn test_idempotent_on_own_output() {
        let y = vec![0.2, 0.5, 0.9, 1.3];
        let (x1, o1) = run(&y, 1.0, 1.5, None, 0.0, None);
        let (x2, o2) = run(&x1, 1.0, 1.5, None, o1.lambda, None);
        assert_eq!(x1, x2);
        // the re-projection needs no shift
        assert_eq!(o2.lambda, 0.0);
        let atx = weighted_sum(None, &x2);
        assert!(atx >= 1.0 - 1e-9 && atx <= 1.5 + 1e-9);
    }

    #[test]
    fn test_projected_sum_is_monotone_in_lambda() {
        let y = vec![0.3, -0.2, 1.7, 0.8, 0.55];
        let a = [1.0, 0.5, 2.0, 1.5, 3.0];
        let mut prev = f64::INFINITY;
        let mut t = -2.0;
        while t <= 2.0 {
            let mut x = y.clone();
            project(&mut x, Some(&a), t);
            let s = weighted_sum(Some(&a), &x);
            assert!(s <= prev + 1e-12);
            prev = s;
            t += 0.01;
        }
    }

    #[test]
    fn test_optimality_of_the_active_bound() {
        // lambda > 0 must pin a'x to hi, lambda < 0 to lo
        let cases: &[(Vec<f64>, f64, f64)] = &[
            (vec![0.9, 0.8, 0.7], 0.5, 1.0),
            (vec![0.1, 0.0, 0.2], 1.5, 2.0),
            (vec![0.4, 0.6], 0.0, 2.0),
        ];
        for (y, lo, hi) in cases {
            let (x, outcome) = run(y, *lo, *hi, None, 0.0, None);
            let atx = weighted_sum(None, &x);
            if outcome.lambda > 0.0 {
                assert!((atx - hi).abs() < 1e-9);
            } else if outcome.lambda < 0.0 {
                assert!((atx - lo).abs() < 1e-9);
            } else {
                assert!(atx >= lo - 1e-9 && atx <= hi + 1e-9);
            }
        }
    }

    #[test]
    fn test_matches_bisection_reference_on_random_inputs() {
        // deterministic xorshift generator
        let mut state = 0x9e3779b97f4a7c15_u64;
        let mut next = move || {
            state ^= state << 13;
            state ^= state >> 7;
            state ^= state << 17;
            (state >> 11) as f64 / (1u64 << 53) as f64
        };

        for trial in 0..50 {
            let n = 1 + (next() * 20.0) as usize;
            let y: Vec<f64> = (0..n).map(|_| next() * 4.0 - 1.5).collect();
            let a: Vec<f64> = (0..n).map(|_| 0.1 + next() * 3.0).collect();
            let total: f64 = a.iter().sum();
            let mid = next() * total;
            let half_width = next() * 0.2 * total;
            let lo = (mid - half_width).max(0.0);
            let hi = (mid + half_width).min(total);

            let (x, _) = run(&y, lo, hi, Some(&a), 0.0, None);
            let reference = bisection_reference(&y, &a, lo, hi);
            assert_close(&x, &reference, 1e-6);
            let _ = trial;
        }
    }

    /// Slow reference: bisect the monotone map `t -> a'proj(y - t*a)`.
    fn bisection_reference(y: &[f64], a: &[f64], lo: f64, hi: f64) -> Vec<f64> {
        let sum_at = |t: f64| {
            let mut x = y.to_vec();
            project(&mut x, Some(a), t);
            weighted_sum(Some(a), &x)
        };
        let at_zero = sum_at(0.0);
        let target = if at_zero > hi {
            hi
        } else if at_zero < lo {
            lo
        } else {
            let mut x = y.to_vec();
            project(&mut x, Some(a), 0.0);
            return x;
        };

        let mut left = -1.0;
        let mut right = 1.0;
        while sum_at(left) < target {
            left *= 2.0;
        }
        while sum_at(right) > target {
            right *= 2.0;
        }
        for _ in 0..200 {
            let mid = 0.5 * (left + right);
            if sum_at(mid) > target {
                left = mid;
            } else {
                right = mid;
            }
        }
        let mut x = y.to_vec();
        project(&mut x, Some(a), 0.5 * (left + right));
        x
    }

    #[test]
    fn test_rejects_bad_inputs() {
        let mut ws = QpWorkspace::new(2);
        let mut x = vec![0.5, 0.5];
        assert!(matches!(
            napsack(&mut x, 1.0, 0.5, None, 0.0, None, &mut ws),
            Err(SolveError::BoundsReversed { .. })
        ));
        assert!(matches!(
            napsack(&mut x, -2.0, -1.0, None, 0.0, None, &mut ws),
            Err(SolveError::NegativeUpper { .. })
        ));
        assert!(matches!(
            napsack(&mut x, 3.0, 4.0, None, 0.0, None, &mut ws),
            Err(SolveError::LowerExceedsWeight { .. })
        ));
        assert!(matches!(
            napsack(&mut x, 0.0, 1.0, Some(&[1.0, -1.0]), 0.0, None, &mut ws),
            Err(SolveError::NonPositiveWeight { index: 1, .. })
        ));
        assert!(matches!(
            napsack(&mut x, 0.0, 1.0, Some(&[1.0]), 0.0, None, &mut ws),
            Err(SolveError::LenMismatch { .. })
        ));
        let mut empty: Vec<f64> = Vec::new();
        let mut ws0 = QpWorkspace::new(0);
        assert!(matches!(
            napsack(&mut empty, 0.0, 1.0, None, 0.0, None, &mut ws0),
            Err(SolveError::Empty)
        ));
    }
}

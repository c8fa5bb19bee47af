//! Descending dual search.
//!
//! Mirror image of the ascending walk: `lambda` falls until the dual slope
//! `a'proj(y - lambda*a) - bound` vanishes. As `lambda` drops, a component at
//! the lower bound is released into the free set at `lambda = y_i/a_i` and a
//! free component climbs onto the upper bound at `lambda = (y_i - 1)/a_i`;
//! components with `y_i - lambda*a_i >= 1` at the start stay pinned at one.
//! The heap keeps the largest unprocessed breakpoint at the root.

use super::heap::{HeapOrder, IndexedHeap};
use super::vertex_weight;

/// Lower `lambda` from `start` until the slope reaches `bound`.
///
/// `y` is the unprojected iterate; it is not modified. Returns the final
/// multiplier and the number of membership transitions.
pub(crate) fn napdown(
    y: &[f64],
    start: f64,
    weights: Option<&[f64]>,
    bound: f64,
    breaks: &mut [f64],
    heap_slots: &mut [usize],
    heap_pos: &mut [usize],
) -> (f64, usize) {
    let mut heap = IndexedHeap::new(HeapOrder::Max, breaks, heap_slots, heap_pos);
    let mut asum = 0.0;
    let mut a2sum = 0.0;

    for (k, &yk) in y.iter().enumerate() {
        let ak = vertex_weight(weights, k);
        let xi = yk - ak * start;
        if xi >= 1.0 {
            // pinned at the upper bound for every smaller lambda
            asum += ak;
        } else if xi > 0.0 {
            asum += ak * yk;
            a2sum += ak * ak;
            heap.seed(k, (yk - 1.0) / ak);
        } else {
            heap.seed(k, yk / ak);
        }
    }
    heap.build();

    let mut lambda = start;
    let mut transitions = 0;
    loop {
        // zero of the linear slope on the current piece
        if a2sum > 0.0 {
            let hat = (asum - bound) / a2sum;
            let crossing = heap.top().map(|k| heap.key(k));
            if crossing.map_or(true, |brk| hat >= brk) {
                return (hat.min(lambda), transitions);
            }
        }
        let Some(k) = heap.top() else {
            return (lambda, transitions);
        };
        if a2sum == 0.0 && asum >= bound {
            // constant piece already at or above the bound
            return (lambda, transitions);
        }

        let brk = heap.key(k);
        let ak = vertex_weight(weights, k);
        lambda = brk;
        transitions += 1;
        if y[k] - ak * brk > 0.5 {
            // free component climbs onto the upper bound
            asum += ak - ak * y[k];
            a2sum -= ak * ak;
            heap.pop();
        } else {
            // released from the lower bound; next stop is the upper bound
            asum += ak * y[k];
            a2sum += ak * ak;
            heap.update(k, (y[k] - 1.0) / ak);
        }
    }
}

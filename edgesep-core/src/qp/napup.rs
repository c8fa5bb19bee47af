//! Ascending dual search.
//!
//! Raises `lambda` until the dual slope `a'proj(y - lambda*a) - bound`
//! vanishes. As `lambda` grows, a component at the upper bound drops into the
//! free set at `lambda = (y_i - 1)/a_i` and a free component reaches zero at
//! `lambda = y_i/a_i`; everything already at zero stays there. Between
//! breakpoints the slope is linear, `asum - lambda*a2sum - bound`, with
//! `asum = sum_upper a_i + sum_free a_i*y_i` and `a2sum = sum_free a_i^2`.
//!
//! The heap keeps the smallest unprocessed breakpoint at the root, so the
//! walk visits crossings in the order `lambda` meets them. Seeding is O(n);
//! each of the `h` membership transitions costs one O(log n) heap operation.

use super::heap::{HeapOrder, IndexedHeap};
use super::vertex_weight;

/// Raise `lambda` from `start` until the slope reaches `bound`.
///
/// `y` is the unprojected iterate; it is not modified. Returns the final
/// multiplier and the number of membership transitions.
pub(crate) fn napup(
    y: &[f64],
    start: f64,
    weights: Option<&[f64]>,
    bound: f64,
    breaks: &mut [f64],
    heap_slots: &mut [usize],
    heap_pos: &mut [usize],
) -> (f64, usize) {
    let mut heap = IndexedHeap::new(HeapOrder::Min, breaks, heap_slots, heap_pos);
    let mut asum = 0.0;
    let mut a2sum = 0.0;

    for (k, &yk) in y.iter().enumerate() {
        let ak = vertex_weight(weights, k);
        let xi = yk - ak * start;
        if xi >= 1.0 {
            asum += ak;
            heap.seed(k, (yk - 1.0) / ak);
        } else if xi > 0.0 {
            asum += ak * yk;
            a2sum += ak * ak;
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
            if crossing.map_or(true, |brk| hat <= brk) {
                return (hat.max(lambda), transitions);
            }
        }
        let Some(k) = heap.top() else {
            return (lambda, transitions);
        };
        if a2sum == 0.0 && asum <= bound {
            // constant piece already at or below the bound
            return (lambda, transitions);
        }

        let brk = heap.key(k);
        let ak = vertex_weight(weights, k);
        lambda = brk;
        transitions += 1;
        if y[k] - ak * brk > 0.5 {
            // leaves the upper bound and becomes free; next stop is zero
            asum += ak * y[k] - ak;
            a2sum += ak * ak;
            heap.update(k, y[k] / ak);
        } else {
            // free component reaches zero
            asum -= ak * y[k];
            a2sum -= ak * ak;
            heap.pop();
        }
    }
}

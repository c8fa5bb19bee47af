//! edgesep: continuous core of a multilevel edge-separator refiner.
//!
//! Given a weighted undirected graph, this crate computes a relaxed
//! two-sided partition indicator `x in [0,1]^n` whose weighted split
//! `a'x` lands inside a target window and whose relaxed cut cost
//! `x'A(1-x)` is driven down by projected-gradient descent. The pieces:
//!
//! - **Napsack projection** ([`napsack`]): minimum-distance projection onto
//!   `{0 <= x <= 1, lo <= a'x <= hi}` via a dual search over a scalar
//!   multiplier.
//! - **Breakpoint traversal** ([`qp::napup`], [`qp::napdown`]): the
//!   directional searches walk the piecewise-linear dual slope through an
//!   indexed heap of breakpoints in `O(n + h log n)`.
//! - **Gradient projection** ([`qp::gradproj`]): the outer loop that carries
//!   the multiplier and free-set estimate between projections.
//!
//! The result is handed back as a continuous indicator plus the final dual
//! multiplier; rounding to a discrete partition is the caller's concern.
//!
//! # Example
//!
//! ```
//! use edgesep_core::{solve, Graph, Options};
//!
//! // a path of four vertices; the cheapest balanced cut is the middle edge
//! let graph = Graph::from_edges(4, &[(0, 1, 1.0), (1, 2, 1.0), (2, 3, 1.0)]);
//! let result = solve(&graph, &Options::default()).unwrap();
//!
//! assert_eq!(result.x, vec![1.0, 1.0, 0.0, 0.0]);
//! assert_eq!(result.obj_val, 1.0);
//! ```
//!
//! Everything is strictly sequential and deterministic: identical inputs
//! produce identical outputs.

#![warn(clippy::all)]

pub mod linalg;
pub mod problem;
pub mod qp;

// Re-export main types
pub use problem::{Graph, Options, QpResult, SolveError, SolveInfo, SolveStatus};
pub use qp::{napsack, FreeStatus, NapsackCase, NapsackOutcome, QpWorkspace};

/// Main solve entry point.
///
/// Validates the inputs and runs the projected-gradient relaxation.
pub fn solve(graph: &Graph, options: &Options) -> Result<QpResult, SolveError> {
    qp::gradproj::solve(graph, options)
}

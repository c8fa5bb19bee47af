//! Problem data structures and validation.
//!
//! This module defines the graph the separator is computed on, the solver
//! options, and all result/error types.

use std::fmt;

use sprs::{CsMat, TriMat};
use thiserror::Error;

/// Errors reported for malformed inputs or infeasible bound configurations.
///
/// Programming bugs inside the dual search are caught by debug assertions
/// instead; they never surface as a variant here.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SolveError {
    #[error("problem has no vertices")]
    Empty,

    #[error("infeasible bounds: lo {lo} > hi {hi}")]
    BoundsReversed { lo: f64, hi: f64 },

    #[error("infeasible bounds: upper bound {hi} is negative")]
    NegativeUpper { hi: f64 },

    #[error("infeasible bounds: lower bound {lo} exceeds the total vertex weight {total}")]
    LowerExceedsWeight { lo: f64, total: f64 },

    #[error("vertex weight at index {index} is {value}, expected > 0")]
    NonPositiveWeight { index: usize, value: f64 },

    #[error("input sets don't have the same length (expected {expected}, got {actual})")]
    LenMismatch { expected: usize, actual: usize },

    #[error("adjacency matrix is {rows}x{cols}, expected square")]
    NotSquare { rows: usize, cols: usize },

    #[error("self-loop on vertex {index}; the diagonal must be empty")]
    SelfLoop { index: usize },

    #[error("edge ({u}, {v}) has weight {value}, expected finite and >= 0")]
    BadEdgeWeight { u: usize, v: usize, value: f64 },

    #[error("option out of range: {0}")]
    InvalidOption(String),
}

/// Weighted undirected graph in compressed sparse column form.
///
/// The adjacency matrix is assumed symmetric with an empty diagonal; each
/// undirected edge is stored twice, once per direction. Vertex weights are
/// strictly positive; `None` means every vertex weighs 1.
#[derive(Debug, Clone)]
pub struct Graph {
    /// Symmetric adjacency matrix (CSC, no diagonal).
    pub adjacency: CsMat<f64>,

    /// Per-vertex weights (length n), or `None` for unit weights.
    pub vertex_weights: Option<Vec<f64>>,
}

impl Graph {
    /// Wrap an existing sparse adjacency matrix.
    pub fn new(adjacency: CsMat<f64>) -> Self {
        Self { adjacency, vertex_weights: None }
    }

    /// Build a graph from an undirected edge list.
    ///
    /// Each `(u, v, w)` entry is inserted in both directions; list every
    /// undirected edge exactly once.
    pub fn from_edges(n: usize, edges: &[(usize, usize, f64)]) -> Self {
        let mut tri = TriMat::new((n, n));
        for &(u, v, w) in edges {
            tri.add_triplet(u, v, w);
            tri.add_triplet(v, u, w);
        }
        Self { adjacency: tri.to_csc(), vertex_weights: None }
    }

    /// Attach vertex weights (length n, strictly positive).
    pub fn with_vertex_weights(mut self, weights: Vec<f64>) -> Self {
        self.vertex_weights = Some(weights);
        self
    }

    /// Number of vertices.
    pub fn num_vertices(&self) -> usize {
        self.adjacency.cols()
    }

    /// Number of undirected edges.
    pub fn num_edges(&self) -> usize {
        self.adjacency.nnz() / 2
    }

    /// Weight of vertex `k`.
    pub fn vertex_weight(&self, k: usize) -> f64 {
        match &self.vertex_weights {
            Some(w) => w[k],
            None => 1.0,
        }
    }

    /// Sum of all vertex weights.
    pub fn total_vertex_weight(&self) -> f64 {
        match &self.vertex_weights {
            Some(w) => w.iter().sum(),
            None => self.num_vertices() as f64,
        }
    }

    /// Total weight of the edges whose endpoints lie on opposite sides.
    pub fn edge_cut(&self, partition: &[bool]) -> f64 {
        debug_assert_eq!(partition.len(), self.num_vertices());
        let mut cut = 0.0;
        for (val, (row, col)) in self.adjacency.iter() {
            if partition[row] != partition[col] {
                cut += *val;
            }
        }
        // each undirected edge appears once per direction
        cut / 2.0
    }

    /// Validate dimensions, edge weights, and vertex weights.
    pub fn validate(&self) -> Result<(), SolveError> {
        let rows = self.adjacency.rows();
        let cols = self.adjacency.cols();
        if rows != cols {
            return Err(SolveError::NotSquare { rows, cols });
        }
        for (val, (row, col)) in self.adjacency.iter() {
            if row == col {
                return Err(SolveError::SelfLoop { index: row });
            }
            if !val.is_finite() || *val < 0.0 {
                return Err(SolveError::BadEdgeWeight { u: row, v: col, value: *val });
            }
        }
        if let Some(weights) = &self.vertex_weights {
            if weights.len() != cols {
                return Err(SolveError::LenMismatch {
                    expected: cols,
                    actual: weights.len(),
                });
            }
            for (index, &value) in weights.iter().enumerate() {
                if !value.is_finite() || value <= 0.0 {
                    return Err(SolveError::NonPositiveWeight { index, value });
                }
            }
        }
        Ok(())
    }
}

/// Solver options and parameters.
#[derive(Debug, Clone)]
pub struct Options {
    /// Termination tolerance on the infinity norm of the iterate change.
    pub grad_proj_tolerance: f64,

    /// Maximum number of projected-gradient iterations.
    pub grad_proj_iteration_limit: usize,

    /// Desired split ratio in (0, 1); 0.5 asks for equal halves.
    pub target_split: f64,

    /// Allowed soft deviation from the target split, as a fraction of the
    /// total vertex weight. Sets `lo = (target_split - tol) * W` and
    /// `hi = (target_split + tol) * W`.
    pub soft_split_tolerance: f64,

    /// Starting partition guess (`true` = side B). When absent, vertices are
    /// assigned to side B in natural order up to the target weight.
    pub initial_partition: Option<Vec<bool>>,

    /// Enable per-iteration logging on stderr.
    pub verbose: bool,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            grad_proj_tolerance: 1e-3,
            grad_proj_iteration_limit: 50,
            target_split: 0.5,
            soft_split_tolerance: 0.0,
            initial_partition: None,
            verbose: false,
        }
    }
}

impl Options {
    /// Validate option ranges.
    pub fn validate(&self) -> Result<(), SolveError> {
        if !(self.grad_proj_tolerance > 0.0 && self.grad_proj_tolerance.is_finite()) {
            return Err(SolveError::InvalidOption(format!(
                "grad_proj_tolerance must be positive, got {}",
                self.grad_proj_tolerance
            )));
        }
        if self.grad_proj_iteration_limit == 0 {
            return Err(SolveError::InvalidOption(
                "grad_proj_iteration_limit must be at least 1".to_string(),
            ));
        }
        if !(self.target_split > 0.0 && self.target_split < 1.0) {
            return Err(SolveError::InvalidOption(format!(
                "target_split must lie in (0, 1), got {}",
                self.target_split
            )));
        }
        if !(self.soft_split_tolerance >= 0.0 && self.soft_split_tolerance.is_finite()) {
            return Err(SolveError::InvalidOption(format!(
                "soft_split_tolerance must be >= 0, got {}",
                self.soft_split_tolerance
            )));
        }
        Ok(())
    }
}

/// Solution status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolveStatus {
    /// Iterate change fell below the tolerance.
    Converged,

    /// Iteration limit reached; the best iterate so far is returned.
    IterationLimit,

    /// The line search could not make progress at the smallest step size.
    Stalled,
}

impl fmt::Display for SolveStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SolveStatus::Converged => write!(f, "Converged"),
            SolveStatus::IterationLimit => write!(f, "IterationLimit"),
            SolveStatus::Stalled => write!(f, "Stalled"),
        }
    }
}

/// Result of the continuous relaxation solve.
///
/// `x` is the relaxed partition indicator in `[0,1]^n`; rounding it to a
/// discrete partition is left to the caller.
#[derive(Debug, Clone)]
pub struct QpResult {
    /// Solution status.
    pub status: SolveStatus,

    /// Relaxed indicator vector (length n, in `[0,1]`).
    pub x: Vec<f64>,

    /// Final dual multiplier of the split constraint.
    pub lambda: f64,

    /// Objective value `x'A(1-x)` at the returned iterate.
    pub obj_val: f64,

    /// Detailed solve statistics.
    pub info: SolveInfo,
}

/// Detailed solve statistics.
#[derive(Debug, Clone, Default)]
pub struct SolveInfo {
    /// Projected-gradient iterations completed.
    pub iters: usize,

    /// Napsack projections performed (including rejected line-search trials).
    pub napsack_calls: usize,

    /// Total breakpoint membership transitions across all napsack calls.
    pub transitions: usize,

    /// Line-search step halvings.
    pub backtracks: usize,

    /// Infinity norm of the last accepted iterate change.
    pub final_step: f64,

    /// Total solve time in milliseconds.
    pub solve_time_ms: u64,
}

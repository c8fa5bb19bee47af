//! Synthetic graph builders for benchmarking.

use edgesep_core::Graph;

/// Rectangular grid with unit edge weights. The cheapest balanced separator
/// of an `r x c` grid (with `c >= r`) cuts a column seam of weight `r`.
pub fn grid_graph(rows: usize, cols: usize) -> Graph {
    let index = |r: usize, c: usize| r * cols + c;
    let mut edges = Vec::with_capacity(2 * rows * cols);
    for r in 0..rows {
        for c in 0..cols {
            if c + 1 < cols {
                edges.push((index(r, c), index(r, c + 1), 1.0));
            }
            if r + 1 < rows {
                edges.push((index(r, c), index(r + 1, c), 1.0));
            }
        }
    }
    Graph::from_edges(rows * cols, &edges)
}

/// Random graph with roughly `avg_degree` neighbors per vertex and edge
/// weights in `(0, 1]`, plus a Hamiltonian path so it stays connected.
pub fn random_graph(n: usize, avg_degree: f64, seed: u64) -> Graph {
    // Simple LCG random number generator
    let mut rng_state = seed;
    let mut rand = || -> f64 {
        rng_state = rng_state.wrapping_mul(6364136223846793005).wrapping_add(1);
        ((rng_state >> 33) as f64) / (u32::MAX as f64)
    };

    let mut edges = Vec::new();
    for u in 0..n.saturating_sub(1) {
        edges.push((u, u + 1, rand().max(0.05)));
    }

    let p = (avg_degree / n as f64).min(1.0);
    for u in 0..n {
        for v in (u + 2)..n {
            if rand() < p {
                edges.push((u, v, rand().max(0.05)));
            }
        }
    }
    Graph::from_edges(n, &edges)
}

/// Random strictly positive vertex weights in `[1, max_weight]`.
pub fn random_vertex_weights(n: usize, max_weight: f64, seed: u64) -> Vec<f64> {
    let mut rng_state = seed;
    let mut rand = || -> f64 {
        rng_state = rng_state.wrapping_mul(6364136223846793005).wrapping_add(1);
        ((rng_state >> 33) as f64) / (u32::MAX as f64)
    };
    (0..n).map(|_| 1.0 + rand() * (max_weight - 1.0)).collect()
}

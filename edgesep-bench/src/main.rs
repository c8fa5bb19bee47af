//! Benchmarking CLI for the edgesep solver.

mod graphs;

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use edgesep_core::{solve, Graph, Options, QpResult};
use std::time::Instant;

#[derive(Parser)]
#[command(name = "edgesep-bench")]
#[command(about = "Benchmarking CLI for the edgesep solver")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Partition a rectangular grid graph
    Grid {
        /// Grid rows
        #[arg(long, default_value = "32")]
        rows: usize,
        /// Grid columns
        #[arg(long, default_value = "32")]
        cols: usize,
        /// Soft split tolerance
        #[arg(long, default_value = "0.01")]
        tolerance: f64,
        /// Maximum iterations
        #[arg(long, default_value = "100")]
        max_iter: usize,
    },
    /// Partition a random graph
    Random {
        /// Number of vertices
        #[arg(long, default_value = "1000")]
        n: usize,
        /// Average vertex degree
        #[arg(long, default_value = "6.0")]
        degree: f64,
        /// RNG seed
        #[arg(long, default_value = "42")]
        seed: u64,
        /// Attach random vertex weights in [1, w]
        #[arg(long)]
        max_vertex_weight: Option<f64>,
        /// Soft split tolerance
        #[arg(long, default_value = "0.01")]
        tolerance: f64,
        /// Maximum iterations
        #[arg(long, default_value = "100")]
        max_iter: usize,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Grid { rows, cols, tolerance, max_iter } => {
            if rows * cols == 0 {
                bail!("grid must have at least one vertex");
            }
            let graph = graphs::grid_graph(rows, cols);
            println!(
                "grid {rows}x{cols}: {} vertices, {} edges",
                graph.num_vertices(),
                graph.num_edges()
            );
            run(&graph, tolerance, max_iter)
        }
        Commands::Random { n, degree, seed, max_vertex_weight, tolerance, max_iter } => {
            if n == 0 {
                bail!("graph must have at least one vertex");
            }
            let mut graph = graphs::random_graph(n, degree, seed);
            if let Some(w) = max_vertex_weight {
                graph = graph.with_vertex_weights(graphs::random_vertex_weights(n, w, seed ^ 1));
            }
            println!(
                "random n={n} degree={degree} seed={seed}: {} edges",
                graph.num_edges()
            );
            run(&graph, tolerance, max_iter)
        }
    }
}

fn run(graph: &Graph, tolerance: f64, max_iter: usize) -> Result<()> {
    let options = Options {
        soft_split_tolerance: tolerance,
        grad_proj_iteration_limit: max_iter,
        ..Default::default()
    };

    let start = Instant::now();
    let result = solve(graph, &options)?;
    let elapsed = start.elapsed();

    report(graph, &options, &result);
    println!("solve time: {:.1} ms", elapsed.as_secs_f64() * 1e3);
    Ok(())
}

fn report(graph: &Graph, options: &Options, result: &QpResult) {
    let total = graph.total_vertex_weight();

    // round at 1/2 to get a discrete partition for reporting
    let partition: Vec<bool> = result.x.iter().map(|&v| v >= 0.5).collect();
    let side_b: f64 = partition
        .iter()
        .enumerate()
        .filter(|(_, &side)| side)
        .map(|(k, _)| graph.vertex_weight(k))
        .sum();

    println!("status: {}", result.status);
    println!("relaxed cost: {:.4}", result.obj_val);
    println!("rounded cut: {:.4}", graph.edge_cut(&partition));
    println!(
        "rounded balance: {:.4} (target {:.4})",
        side_b / total,
        options.target_split
    );
    println!("lambda: {:.6e}", result.lambda);
    println!(
        "iters: {}  napsack calls: {}  transitions: {}  backtracks: {}",
        result.info.iters,
        result.info.napsack_calls,
        result.info.transitions,
        result.info.backtracks
    );
}

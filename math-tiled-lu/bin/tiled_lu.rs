//! Solve a random diagonally dominant system with the tiled LU solver
//!
//! Builds an M×M grid of N×N tiles, factors it, solves against a known
//! solution and prints the relative error of the recovered solution.
//!
//! Usage:
//!     cargo run --release --bin tiled-lu -- --tiles 4 --tile-size 64 --sync dataflow

use anyhow::{Context, bail};
use clap::{Parser, ValueEnum};
use math_audio_tiled_lu::{
    DiagonallyDominantProblem, RunConfig, SyncPolicy, relative_error, tiled_lu_solve,
};
use std::time::Instant;

#[derive(Parser, Debug)]
#[command(
    name = "tiled-lu",
    about = "Tiled LU factorization of a random diagonally dominant system"
)]
struct Cli {
    /// Number of tiles per grid dimension (M) [default: 3]
    #[arg(long)]
    tiles: Option<usize>,

    /// Order of each square tile (N) [default: 16]
    #[arg(long)]
    tile_size: Option<usize>,

    /// Seed of the problem generator [default: 42]
    #[arg(long)]
    seed: Option<u64>,

    /// Number of worker threads (0 = use all available cores)
    #[arg(long)]
    threads: Option<usize>,

    /// Synchronization between factorization levels [default: barrier]
    #[arg(long, value_enum)]
    sync: Option<SyncChoice>,

    /// Largest relative error accepted before exiting with failure
    #[arg(long, default_value_t = 1e-9)]
    tolerance: f64,

    /// JSON run configuration; command-line flags override its values
    #[arg(long)]
    config: Option<String>,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum SyncChoice {
    Barrier,
    Dataflow,
}

impl From<SyncChoice> for SyncPolicy {
    fn from(value: SyncChoice) -> Self {
        match value {
            SyncChoice::Barrier => SyncPolicy::Barrier,
            SyncChoice::Dataflow => SyncPolicy::Dataflow,
        }
    }
}

impl Cli {
    fn run_config(&self) -> anyhow::Result<RunConfig> {
        let mut config = match &self.config {
            Some(path) => RunConfig::from_file(path)
                .with_context(|| format!("loading run configuration {path}"))?,
            None => RunConfig::default(),
        };

        if let Some(tiles) = self.tiles {
            config.problem.tiles = tiles;
        }
        if let Some(tile_size) = self.tile_size {
            config.problem.tile_size = tile_size;
        }
        if let Some(seed) = self.seed {
            config.problem.seed = seed;
        }
        if let Some(threads) = self.threads {
            config.solver.threads = threads;
        }
        if let Some(sync) = self.sync {
            config.solver.sync = sync.into();
        }

        config.problem.validate()?;
        config.solver.validate()?;
        Ok(config)
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    let config = cli.run_config()?;
    log::info!(
        "{}x{} tiles of order {}, seed {}, {:?}",
        config.problem.tiles,
        config.problem.tiles,
        config.problem.tile_size,
        config.problem.seed,
        config.solver.sync
    );

    let start = Instant::now();
    let problem = DiagonallyDominantProblem::from_config(&config.problem)?;
    let solution = tiled_lu_solve(problem.matrix, &problem.b, &config.solver)?;
    let error = relative_error(problem.x_known.as_slice(), solution.x.as_slice())?;
    log::info!("total time {:.3?}", start.elapsed());
    log::debug!("substitution statistics: {:?}", solution.solve_stats);

    println!("Error: {error:e}");

    if !(error <= cli.tolerance) {
        bail!(
            "relative error {error:e} exceeds tolerance {:e}",
            cli.tolerance
        );
    }
    Ok(())
}

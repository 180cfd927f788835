//! Profiling binary for the scoring pipeline.
//! Run with: cargo flamegraph --profile release-with-debug --example profile_score
//!
//! Set `RUST_LOG=hull_separability=debug` to see per-stage logs.

use std::process::ExitCode;

use hull_separability::{Error, ScoreAggregator, SeparabilityConfig};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing_subscriber::EnvFilter;

/// `dim` unit-box clouds, class `c` shifted by `0.2 * c` along every axis.
#[allow(clippy::cast_precision_loss)]
fn overlapping_classes(dim: usize, per_class: usize, seed: u64) -> (Vec<Vec<f64>>, Vec<usize>) {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut points = Vec::with_capacity(dim * per_class);
    let mut labels = Vec::with_capacity(dim * per_class);
    for class in 0..dim {
        let shift = 0.2 * class as f64;
        for _ in 0..per_class {
            points.push((0..dim).map(|_| shift + rng.random_range(0.0..1.0)).collect());
            labels.push(class);
        }
    }
    (points, labels)
}

/// Score once, report it, then score `iterations` more times.
fn run(dim: usize, per_class: usize, iterations: usize) -> Result<(), Error> {
    let (points, labels) = overlapping_classes(dim, per_class, 2024);
    let aggregator = ScoreAggregator::new(SeparabilityConfig::default());

    let score = aggregator.score(&points, &labels, 0.0)?;
    println!(
        "{dim} classes x {per_class} points: volume {:.6}, degenerate {:?}",
        score.volume, score.degenerate
    );

    println!("Running {iterations} scoring iterations...");
    for _ in 0..iterations {
        aggregator.score(&points, &labels, 0.0)?;
    }

    println!("Done.");
    Ok(())
}

fn main() -> ExitCode {
    const DIM: usize = 4;
    const PER_CLASS: usize = 500;
    const ITERATIONS: usize = 50;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    match run(DIM, PER_CLASS, ITERATIONS) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("scoring failed: {err}");
            ExitCode::FAILURE
        }
    }
}

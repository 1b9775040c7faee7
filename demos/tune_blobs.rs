//! Tune the pipeline on three synthetic blobs and print the trial table.
//!
//! Run with `RUST_LOG=clump_tune=debug` to see the per-trial metric breakdown.

use clump_tune::{export, ClusterTrainer, CostStrategy, SearchSpace, Tpe};
use rand::prelude::*;
use tracing_subscriber::EnvFilter;

fn main() -> clump_tune::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let mut rng = StdRng::seed_from_u64(7);
    let mut embeddings = Vec::new();
    let mut labels = Vec::new();
    for (label, axis) in [(0i64, 0usize), (1, 1), (2, 2)] {
        for _ in 0..40 {
            let mut point: Vec<f32> = (0..12).map(|_| rng.random::<f32>() * 0.6 - 0.3).collect();
            point[axis] += 4.0;
            embeddings.push(point);
            labels.push(label);
        }
    }

    let strategy = CostStrategy::default();
    let mut trainer = ClusterTrainer::new(SearchSpace::default_space(), strategy, embeddings, labels)?;
    trainer.train(30, &mut Tpe::new(0))?;

    if let Some(best) = trainer.best() {
        println!("best parameters: {}", best.best_params);
        println!(
            "clusters: {}, noise points: {}",
            best.best_clusters.n_clusters(),
            best.best_clusters.noise_count()
        );
    }

    let table = export(trainer.logs(), &strategy, Some("blobs"))?;
    table.write_csv(std::io::stdout().lock())?;
    Ok(())
}

//! Basic example demonstrating mrkmeans-rs usage
//!
//! Run with: cargo run --example basic --release

use mrkmeans_rs::{ExecutionMode, FragmentKMeans, GenerationMode, RunConfig};
use ndarray::array;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    println!("=== mrkmeans-rs example ===\n");

    let config = RunConfig::new(4)
        .with_n_points(200_000)
        .with_dimensions(2)
        .with_n_fragments(32)
        .with_iterations(10)
        .with_seed(42)
        .with_generation(GenerationMode::Stationary)
        .with_execution(ExecutionMode::ThreadPool { threads: 0 })
        .with_verbose(true);

    println!(
        "Clustering {} points in {} fragments of {} points...\n",
        config.points_per_iteration(),
        config.n_fragments,
        config.points_per_fragment()
    );

    let mut kmeans = FragmentKMeans::new(config);
    let summary = kmeans.train().expect("Training failed").clone();

    println!("\nIteration timings:");
    for stats in &summary.iterations {
        println!(
            "  Iteration {}: {:.4}s, shift = {:.6}, empty clusters = {}",
            stats.iteration + 1,
            stats.elapsed.as_secs_f64(),
            stats.shift,
            stats.empty_clusters
        );
    }
    println!("Total: {:.4}s\n", summary.total_elapsed.as_secs_f64());

    // Uniform points in the unit square: expect roughly one center per quadrant
    println!("Learned centroids:");
    let centroids = kmeans.centroids().unwrap();
    for i in 0..centroids.k() {
        let c = centroids.row(i);
        println!("  Centroid {}: ({:.4}, {:.4})", i, c[0], c[1]);
    }
    println!();

    let probes = array![[0.1, 0.1], [0.9, 0.1], [0.1, 0.9], [0.9, 0.9]];
    let labels = kmeans.predict(&probes.view()).expect("Prediction failed");

    println!("Corner assignments:");
    for (i, label) in labels.iter().enumerate() {
        println!(
            "  ({:.1}, {:.1}) -> Cluster {}",
            probes[[i, 0]],
            probes[[i, 1]],
            label
        );
    }

    println!("\n=== Done! ===");
}

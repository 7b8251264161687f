//! Run fragment-parallel k-means on generated data and report timings.
//!
//! Usage: `run_kmeans [--reference] [--points N] [-k K] ... [--output centroids.npy]`

use clap::Parser;
use log::{error, info};
use mrkmeans_rs::{ExecutionMode, FragmentKMeans, GenerationMode, RunConfig};
use ndarray_npy::WriteNpyExt;
use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Start from the full-scale reference workload
    #[arg(long)]
    reference: bool,

    /// Load the run configuration from a YAML file
    #[arg(long, conflicts_with = "reference")]
    config: Option<PathBuf>,

    /// Total number of points
    #[arg(long)]
    points: Option<usize>,

    /// Point dimensionality
    #[arg(short, long)]
    dimensions: Option<usize>,

    /// Number of clusters
    #[arg(short)]
    k: Option<usize>,

    /// Number of fragments (map tasks per iteration)
    #[arg(short, long)]
    fragments: Option<usize>,

    /// Number of iterations
    #[arg(short, long)]
    iterations: Option<usize>,

    /// Global random seed
    #[arg(short, long)]
    seed: Option<u64>,

    /// Draw a fresh sample every iteration instead of reusing one dataset
    #[arg(long)]
    resample: bool,

    /// Regenerate fragments inside each map task instead of caching them
    #[arg(long)]
    no_cache: bool,

    /// Run map tasks inline on the main thread
    #[arg(long, conflicts_with = "threads")]
    sequential: bool,

    /// Worker threads for the map tasks (0 = one per core)
    #[arg(short, long)]
    threads: Option<usize>,

    /// Write the effective configuration to this YAML file
    #[arg(long)]
    save_config: Option<PathBuf>,

    /// Write the final centroids to this .npy file
    #[arg(short, long)]
    output: Option<PathBuf>,
}

impl Args {
    fn run_config(&self) -> mrkmeans_rs::Result<RunConfig> {
        let mut config = match (&self.config, self.reference) {
            (Some(path), _) => RunConfig::from_yaml_file(path)?,
            (None, true) => RunConfig::reference(),
            (None, false) => RunConfig::default(),
        };
        // per-iteration timing is always reported by the CLI
        config.verbose = true;

        if let Some(points) = self.points {
            config.n_points = points;
        }
        if let Some(dimensions) = self.dimensions {
            config.dimensions = dimensions;
        }
        if let Some(k) = self.k {
            config.k = k;
        }
        if let Some(fragments) = self.fragments {
            config.n_fragments = fragments;
        }
        if let Some(iterations) = self.iterations {
            config.iterations = iterations;
        }
        if let Some(seed) = self.seed {
            config.seed = seed;
        }
        if self.resample {
            config.generation = GenerationMode::Resample;
        }
        if self.no_cache {
            config.cache_fragments = false;
        }
        if self.sequential {
            config.execution = ExecutionMode::Sequential;
        } else if let Some(threads) = self.threads {
            config.execution = ExecutionMode::ThreadPool { threads };
        }

        Ok(config)
    }
}

fn run(args: &Args) -> Result<(), Box<dyn std::error::Error>> {
    let config = args.run_config()?;

    if let Some(path) = &args.save_config {
        config.to_yaml_file(path)?;
        info!("Saved configuration to {}", path.display());
    }

    info!("========== KMEANS ==========");
    info!("Total points : {}", config.n_points);
    info!("Dimensions   : {}", config.dimensions);
    info!("Clusters (K) : {}", config.k);
    info!("Fragments    : {}", config.n_fragments);
    info!("Iterations   : {}", config.iterations);
    info!("============================");

    let mut kmeans = FragmentKMeans::new(config);
    kmeans.train()?;

    if let Some(path) = &args.output {
        let centroids = kmeans.centroids().ok_or("No centroids after training")?;
        let writer = BufWriter::new(File::create(path)?);
        centroids.as_array().write_npy(writer)?;
        info!("Saved centroids to {}", path.display());
    }

    Ok(())
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempdir::TempDir;

    #[test]
    fn test_yaml_config_reports_iterations() {
        let temp_dir = TempDir::new("run_kmeans_cli").unwrap();
        let path = temp_dir.path().join("config.yaml");
        RunConfig::new(3).with_verbose(false).to_yaml_file(&path).unwrap();

        let args = Args::parse_from(["run_kmeans", "--config", path.to_str().unwrap(), "-i", "2"]);
        let config = args.run_config().unwrap();

        assert!(config.verbose);
        assert_eq!(config.k, 3);
        assert_eq!(config.iterations, 2);
    }

    #[test]
    fn test_default_config_reports_iterations() {
        let args = Args::parse_from(["run_kmeans", "--sequential", "--resample"]);
        let config = args.run_config().unwrap();

        assert!(config.verbose);
        assert_eq!(config.execution, ExecutionMode::Sequential);
        assert_eq!(config.generation, GenerationMode::Resample);
    }
}

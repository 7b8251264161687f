//! # mrkmeans-rs
//!
//! Fragment-parallel k-means clustering in a map/reduce style, built on
//! ndarray and rayon.
//!
//! ## How a run works
//!
//! - **Fragments**: the point set is split into `n_fragments` equally sized
//!   blocks, each generated deterministically from `(seed, fragment id)`.
//! - **Map**: every fragment is assigned to the current centroids by an
//!   independent task that returns per-cluster sums and counts.
//! - **Reduce**: once all fragments have reported, their statistics are
//!   folded into new centroids. Empty clusters keep their previous center.
//! - **Iterate**: the controller repeats this a fixed number of times.
//!
//! Tasks run on an [`ExecutionSubstrate`]: inline ([`SequentialSubstrate`]) or
//! on a rayon thread pool ([`RayonSubstrate`]).
//!
//! ## Example
//!
//! ```rust
//! use mrkmeans_rs::{ExecutionMode, FragmentKMeans, GenerationMode, RunConfig};
//!
//! let config = RunConfig::new(10)
//!     .with_n_points(20_000)
//!     .with_dimensions(16)
//!     .with_n_fragments(16)
//!     .with_iterations(5)
//!     .with_seed(42)
//!     .with_generation(GenerationMode::Stationary)
//!     .with_execution(ExecutionMode::ThreadPool { threads: 4 });
//!
//! let mut kmeans = FragmentKMeans::new(config);
//! let summary = kmeans.train().unwrap();
//! assert_eq!(summary.iterations.len(), 5);
//! ```
//!
//! ## Lower-level building blocks
//!
//! ```rust
//! use mrkmeans_rs::{generate_fragment, map_fragment, reduce, CentroidSet};
//! use ndarray::array;
//!
//! let fragment = generate_fragment(42, 0, 1_000, 2, None).unwrap();
//! let centroids = CentroidSet::new(array![[0.25, 0.25], [0.75, 0.75]]).unwrap();
//!
//! let partial = map_fragment(&fragment, &centroids).unwrap();
//! assert_eq!(partial.total_count(), 1_000);
//!
//! let reduction = reduce(&centroids, &[partial], 1).unwrap();
//! assert_eq!(reduction.centroids.k(), 2);
//! ```

mod algorithm;
mod centroids;
mod config;
mod distance;
mod error;
mod fragment;
mod kmeans;
mod reducer;
mod substrate;
mod worker;

pub use algorithm::{run_iterations, IterationController, IterationStats, RunSummary};
pub use centroids::{CentroidSet, ClusterState};
pub use config::{ExecutionMode, GenerationMode, RunConfig};
pub use distance::{compute_centroid_shift, nearest_centroid};
pub use error::{KMeansError, Result};
pub use fragment::{
    fragment_rng, generate_fragment, generate_fragments, generate_initial_centroids,
    seeding_iteration, Fragment,
};
pub use kmeans::FragmentKMeans;
pub use reducer::{reduce, Reduction};
pub use substrate::{
    await_first_failure, ExecutionSubstrate, RayonSubstrate, SequentialSubstrate, Substrate,
    TaskHandle,
};
pub use worker::{map_fragment, PartialResult};

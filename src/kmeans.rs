use crate::algorithm::{run_iterations, RunSummary};
use crate::centroids::CentroidSet;
use crate::config::RunConfig;
use crate::distance::nearest_centroids;
use crate::error::{KMeansError, Result};
use crate::fragment::generate_initial_centroids;
use crate::substrate::{ExecutionSubstrate, Substrate};
use log::info;
use ndarray::{Array1, ArrayView2};

/// Fragment-parallel k-means over a generated point set.
///
/// Each iteration maps every fragment against a snapshot of the current
/// centroids on an execution substrate, then reduces all partial statistics
/// into new centroids. The run always performs `config.iterations` rounds.
///
/// # Example
///
/// ```
/// use mrkmeans_rs::{ExecutionMode, FragmentKMeans, RunConfig};
///
/// let config = RunConfig::new(4)
///     .with_n_points(4_000)
///     .with_dimensions(8)
///     .with_n_fragments(8)
///     .with_iterations(3)
///     .with_execution(ExecutionMode::Sequential);
///
/// let mut kmeans = FragmentKMeans::new(config);
/// kmeans.train().unwrap();
///
/// let centroids = kmeans.centroids().unwrap();
/// assert_eq!(centroids.k(), 4);
/// ```
pub struct FragmentKMeans {
    /// Run configuration
    config: RunConfig,

    /// Caller-supplied starting centroids; generated from the seed when absent
    initial: Option<CentroidSet>,

    /// Trained centroids (None if not yet trained)
    centroids: Option<CentroidSet>,

    /// Statistics of the last successful run
    summary: Option<RunSummary>,
}

impl FragmentKMeans {
    /// Create a new instance for the given run configuration.
    pub fn new(config: RunConfig) -> Self {
        Self {
            config,
            initial: None,
            centroids: None,
            summary: None,
        }
    }

    /// Start from the given centroids instead of seeded random ones.
    pub fn with_initial_centroids(mut self, initial: CentroidSet) -> Self {
        self.initial = Some(initial);
        self
    }

    /// Run all iterations on the substrate selected by `config.execution`.
    ///
    /// # Errors
    ///
    /// Returns the first failure of any iteration, tagged with its index.
    /// Previously trained centroids are kept when a run fails.
    pub fn train(&mut self) -> Result<&RunSummary> {
        let substrate = Substrate::from_mode(self.config.execution)?;
        self.train_with(&substrate)
    }

    /// Run all iterations on a caller-provided substrate.
    pub fn train_with<S: ExecutionSubstrate>(&mut self, substrate: &S) -> Result<&RunSummary> {
        let config = &self.config;
        config.validate()?;

        info!(
            "Training k-means: {} points ({} fragments x {}), {} dimensions, {} clusters, {} iterations, {:?} data, {} substrate",
            config.points_per_iteration(),
            config.n_fragments,
            config.points_per_fragment(),
            config.dimensions,
            config.k,
            config.iterations,
            config.generation,
            substrate.name()
        );

        let initial = match &self.initial {
            Some(initial) => initial.clone(),
            None => generate_initial_centroids(config.seed, config.k, config.dimensions)?,
        };

        let summary = run_iterations(config, substrate, initial)?;

        info!(
            "Total time ({} iterations): {:.2}s",
            summary.iterations.len(),
            summary.total_elapsed.as_secs_f64()
        );

        self.centroids = Some(summary.centroids.clone());
        Ok(self.summary.insert(summary))
    }

    /// Predict cluster assignments for new data.
    ///
    /// Equidistant points are assigned to the lower-indexed centroid.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The model has not been trained yet
    /// - Data dimensions don't match the trained centroids
    pub fn predict(&self, data: &ArrayView2<f64>) -> Result<Array1<usize>> {
        let centroids = self.centroids.as_ref().ok_or(KMeansError::NotFitted)?;

        if data.ncols() != centroids.dim() {
            return Err(KMeansError::InvalidDimensions(format!(
                "Expected {} features, got {}",
                centroids.dim(),
                data.ncols()
            )));
        }

        Ok(nearest_centroids(data, &centroids.view()))
    }

    /// Get the trained centroids, if any.
    pub fn centroids(&self) -> Option<&CentroidSet> {
        self.centroids.as_ref()
    }

    /// Statistics of the last successful run.
    pub fn summary(&self) -> Option<&RunSummary> {
        self.summary.as_ref()
    }

    /// Get the number of clusters.
    pub fn k(&self) -> usize {
        self.config.k
    }

    /// Get the number of features (dimensions).
    pub fn d(&self) -> usize {
        self.config.dimensions
    }

    /// Get the configuration.
    pub fn config(&self) -> &RunConfig {
        &self.config
    }
}

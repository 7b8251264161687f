use crate::error::{KMeansError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// How fragment points relate across iterations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum GenerationMode {
    /// One fixed dataset, reused unchanged by every iteration.
    #[default]
    Stationary,
    /// Every iteration draws a fresh sample, seeded with the iteration index.
    Resample,
}

/// Which execution substrate runs the map tasks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExecutionMode {
    /// Run each task inline on the calling thread
    Sequential,
    /// Run tasks on a rayon thread pool. `threads == 0` uses rayon's default.
    ThreadPool { threads: usize },
}

impl Default for ExecutionMode {
    fn default() -> Self {
        ExecutionMode::ThreadPool { threads: 0 }
    }
}

/// Configuration for a fragment-parallel k-means run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Total number of points across all fragments
    pub n_points: usize,

    /// Dimensionality of every point
    pub dimensions: usize,

    /// Number of clusters
    pub k: usize,

    /// Number of fragments, i.e. map tasks per iteration.
    /// Fragment size is `n_points / n_fragments`; the remainder is dropped.
    pub n_fragments: usize,

    /// Number of iterations. There is no early stopping.
    pub iterations: usize,

    /// Global seed for fragment and initial centroid generation
    pub seed: u64,

    /// Stationary dataset or per-iteration resampling
    pub generation: GenerationMode,

    /// Keep stationary fragments in memory instead of regenerating them inside
    /// every map task. Ignored in resampling mode.
    pub cache_fragments: bool,

    /// Execution substrate selector
    pub execution: ExecutionMode,

    /// Log per-iteration details at info level
    pub verbose: bool,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            n_points: 100_000,
            dimensions: 16,
            k: 8,
            n_fragments: 16,
            iterations: 10,
            seed: 42,
            generation: GenerationMode::Stationary,
            cache_fragments: true,
            execution: ExecutionMode::default(),
            verbose: false,
        }
    }
}

impl RunConfig {
    /// Create a new configuration with the specified number of clusters
    pub fn new(k: usize) -> Self {
        Self {
            k,
            ..Default::default()
        }
    }

    /// The full-scale reference workload: 131M points of 100 dimensions in
    /// 1024 fragments, 1000 clusters, 10 iterations.
    pub fn reference() -> Self {
        Self {
            n_points: 131_072_000,
            dimensions: 100,
            k: 1000,
            n_fragments: 1024,
            iterations: 10,
            seed: 42,
            generation: GenerationMode::Stationary,
            // 105 GB of points; regenerate per task instead
            cache_fragments: false,
            execution: ExecutionMode::default(),
            verbose: true,
        }
    }

    /// Set the total number of points
    pub fn with_n_points(mut self, n_points: usize) -> Self {
        self.n_points = n_points;
        self
    }

    /// Set the point dimensionality
    pub fn with_dimensions(mut self, dimensions: usize) -> Self {
        self.dimensions = dimensions;
        self
    }

    /// Set the number of fragments
    pub fn with_n_fragments(mut self, n_fragments: usize) -> Self {
        self.n_fragments = n_fragments;
        self
    }

    /// Set the number of iterations
    pub fn with_iterations(mut self, iterations: usize) -> Self {
        self.iterations = iterations;
        self
    }

    /// Set the random seed
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Set the generation mode
    pub fn with_generation(mut self, generation: GenerationMode) -> Self {
        self.generation = generation;
        self
    }

    /// Set whether stationary fragments are cached between iterations
    pub fn with_cache_fragments(mut self, cache_fragments: bool) -> Self {
        self.cache_fragments = cache_fragments;
        self
    }

    /// Set the execution mode
    pub fn with_execution(mut self, execution: ExecutionMode) -> Self {
        self.execution = execution;
        self
    }

    /// Set verbose mode
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Number of points in each fragment (integer division)
    pub fn points_per_fragment(&self) -> usize {
        if self.n_fragments == 0 {
            0
        } else {
            self.n_points / self.n_fragments
        }
    }

    /// Number of points actually processed per iteration
    pub fn points_per_iteration(&self) -> usize {
        self.points_per_fragment() * self.n_fragments
    }

    /// Check that the run parameters describe a non-empty problem
    pub fn validate(&self) -> Result<()> {
        if self.dimensions == 0 {
            return Err(KMeansError::Generation(
                "dimensions must be greater than 0".to_string(),
            ));
        }
        if self.k == 0 {
            return Err(KMeansError::Generation(
                "k must be greater than 0".to_string(),
            ));
        }
        if self.n_fragments == 0 {
            return Err(KMeansError::Generation(
                "n_fragments must be greater than 0".to_string(),
            ));
        }
        if self.points_per_fragment() == 0 {
            return Err(KMeansError::Generation(format!(
                "fragment size is 0 ({} points over {} fragments)",
                self.n_points, self.n_fragments
            )));
        }
        Ok(())
    }

    /// Load a configuration from a YAML file. Missing fields take defaults.
    pub fn from_yaml_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: RunConfig = serde_yaml::from_str(&contents)?;
        Ok(config)
    }

    /// Write this configuration to a YAML file
    pub fn to_yaml_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        fs::write(path, serde_yaml::to_string(self)?)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempdir::TempDir;

    #[test]
    fn test_points_per_fragment_drops_remainder() {
        let config = RunConfig::new(2).with_n_points(103).with_n_fragments(10);
        assert_eq!(config.points_per_fragment(), 10);
        assert_eq!(config.points_per_iteration(), 100);
    }

    #[test]
    fn test_validate_rejects_empty_fragments() {
        let config = RunConfig::new(2).with_n_points(3).with_n_fragments(4);
        assert!(matches!(
            config.validate(),
            Err(KMeansError::Generation(_))
        ));
    }

    #[test]
    fn test_validate_rejects_zero_dimensions() {
        let config = RunConfig::new(2).with_dimensions(0);
        assert!(matches!(
            config.validate(),
            Err(KMeansError::Generation(_))
        ));
    }

    #[test]
    fn test_reference_config() {
        let config = RunConfig::reference();
        assert_eq!(config.points_per_fragment(), 128_000);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_yaml_round_trip() {
        let temp_dir = TempDir::new("run_config_test").unwrap();
        let path = temp_dir.path().join("config.yaml");

        let config = RunConfig::new(5)
            .with_generation(GenerationMode::Resample)
            .with_execution(ExecutionMode::Sequential)
            .with_seed(7);
        config.to_yaml_file(&path).unwrap();

        let loaded = RunConfig::from_yaml_file(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_yaml_partial_uses_defaults() {
        let temp_dir = TempDir::new("run_config_partial").unwrap();
        let path = temp_dir.path().join("config.yaml");
        std::fs::write(&path, "k: 3\ngeneration: resample\n").unwrap();

        let loaded = RunConfig::from_yaml_file(&path).unwrap();
        assert_eq!(loaded.k, 3);
        assert_eq!(loaded.generation, GenerationMode::Resample);
        assert_eq!(loaded.n_fragments, RunConfig::default().n_fragments);
    }
}

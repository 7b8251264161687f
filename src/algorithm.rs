use crate::centroids::{CentroidSet, ClusterState};
use crate::config::{GenerationMode, RunConfig};
use crate::distance::compute_centroid_shift;
use crate::error::{KMeansError, Result};
use crate::fragment::{generate_fragment, seeding_iteration, Fragment};
use crate::reducer::reduce;
use crate::substrate::{ExecutionSubstrate, TaskHandle};
use crate::worker::{map_fragment, PartialResult};
use log::{debug, log, warn, Level};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Timing and bookkeeping for one completed iteration
#[derive(Debug, Clone)]
pub struct IterationStats {
    /// Zero-based iteration index
    pub iteration: usize,

    /// Wall time from dispatch to adopted centroids
    pub elapsed: Duration,

    /// Sum of L2 movements of all centroids
    pub shift: f64,

    /// Clusters that received no point and kept their center
    pub empty_clusters: usize,

    /// Points assigned across all fragments
    pub points: u64,
}

/// Result of a complete run
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub centroids: CentroidSet,
    pub iterations: Vec<IterationStats>,
    pub total_elapsed: Duration,
}

enum FragmentSource {
    /// Stationary fragments generated once before the first iteration
    Cached(Vec<Arc<Fragment>>),
    /// Fragments rebuilt inside each map task from their seed
    Regenerated,
}

/// Drives map, barrier and reduce for a fixed number of iterations.
///
/// The controller is the only owner of the current centroids. Each map task
/// receives a snapshot of them, and the slot is replaced once per iteration
/// after the reducer has seen every fragment's partial result.
pub struct IterationController<'a, S: ExecutionSubstrate> {
    config: &'a RunConfig,
    substrate: &'a S,
    state: ClusterState,
    fragments: FragmentSource,
}

impl<'a, S: ExecutionSubstrate> IterationController<'a, S> {
    /// Validate the run and prepare fragments.
    ///
    /// With a cached stationary dataset every fragment is generated here,
    /// through the substrate, before the first iteration.
    pub fn new(config: &'a RunConfig, substrate: &'a S, initial: CentroidSet) -> Result<Self> {
        config.validate()?;

        if initial.k() != config.k || initial.dim() != config.dimensions {
            return Err(KMeansError::InvalidDimensions(format!(
                "initial centroids are {}x{}, run expects {}x{}",
                initial.k(),
                initial.dim(),
                config.k,
                config.dimensions
            )));
        }

        let fragments = match (config.generation, config.cache_fragments) {
            (GenerationMode::Stationary, true) => {
                FragmentSource::Cached(generate_cached_fragments(config, substrate)?)
            }
            _ => FragmentSource::Regenerated,
        };

        Ok(Self {
            config,
            substrate,
            state: ClusterState::new(initial),
            fragments,
        })
    }

    /// Current centroids and the index of the next iteration
    pub fn state(&self) -> &ClusterState {
        &self.state
    }

    /// Whether the fixed iteration count has been reached
    pub fn is_finished(&self) -> bool {
        self.state.iteration >= self.config.iterations
    }

    /// Run one iteration. Any failure is tagged with the iteration index and
    /// leaves the current centroids untouched.
    pub fn step(&mut self) -> Result<IterationStats> {
        let iteration = self.state.iteration;
        self.run_iteration(iteration)
            .map_err(|e| e.in_iteration(iteration))
    }

    /// Run every remaining iteration. There is no convergence test.
    pub fn run(mut self) -> Result<RunSummary> {
        let start = Instant::now();
        let mut iterations = Vec::with_capacity(self.config.iterations);

        while !self.is_finished() {
            iterations.push(self.step()?);
        }

        Ok(RunSummary {
            centroids: self.state.centroids,
            iterations,
            total_elapsed: start.elapsed(),
        })
    }

    fn run_iteration(&mut self, iteration: usize) -> Result<IterationStats> {
        let iter_start = Instant::now();
        let level = if self.config.verbose {
            Level::Info
        } else {
            Level::Debug
        };

        debug!(
            "Iteration {}/{}: dispatching {} map tasks on {} substrate",
            iteration + 1,
            self.config.iterations,
            self.config.n_fragments,
            self.substrate.name()
        );

        let handles = self.dispatch(iteration);
        let partials = self.substrate.await_all(handles)?;

        let reduction = reduce(&self.state.centroids, &partials, self.config.n_fragments)?;

        let expected_points = self.config.points_per_iteration() as u64;
        if reduction.total_count() != expected_points {
            return Err(KMeansError::Aggregation(format!(
                "partial results counted {} points, expected {}",
                reduction.total_count(),
                expected_points
            )));
        }

        let shift = compute_centroid_shift(
            &self.state.centroids.view(),
            &reduction.centroids.view(),
        );
        let empty_clusters = reduction.empty_clusters();
        self.state.advance(reduction.centroids);

        let stats = IterationStats {
            iteration,
            elapsed: iter_start.elapsed(),
            shift,
            empty_clusters,
            points: expected_points,
        };

        log!(
            level,
            "Iteration {}/{} completed in {:.2}s: shift = {:.6}, empty clusters = {}",
            iteration + 1,
            self.config.iterations,
            stats.elapsed.as_secs_f64(),
            shift,
            empty_clusters
        );
        if empty_clusters > 0 {
            warn!(
                "Iteration {}: {} of {} clusters received no points and kept their previous centroid",
                iteration + 1,
                empty_clusters,
                self.config.k
            );
        }

        Ok(stats)
    }

    /// Submit one map task per fragment, each carrying the current snapshot
    fn dispatch(&self, iteration: usize) -> Vec<TaskHandle<PartialResult>> {
        let snapshot = &self.state.centroids;

        match &self.fragments {
            FragmentSource::Cached(fragments) => fragments
                .iter()
                .map(|fragment| {
                    let fragment = Arc::clone(fragment);
                    let centroids = snapshot.clone();
                    self.substrate
                        .submit(move || map_fragment(&fragment, &centroids))
                })
                .collect(),
            FragmentSource::Regenerated => {
                let seed = self.config.seed;
                let points_per_fragment = self.config.points_per_fragment();
                let dimensions = self.config.dimensions;
                let seeding = seeding_iteration(self.config.generation, iteration);

                (0..self.config.n_fragments)
                    .map(|fragment_id| {
                        let centroids = snapshot.clone();
                        self.substrate.submit(move || {
                            let fragment = generate_fragment(
                                seed,
                                fragment_id,
                                points_per_fragment,
                                dimensions,
                                seeding,
                            )?;
                            map_fragment(&fragment, &centroids)
                        })
                    })
                    .collect()
            }
        }
    }
}

fn generate_cached_fragments<S: ExecutionSubstrate>(
    config: &RunConfig,
    substrate: &S,
) -> Result<Vec<Arc<Fragment>>> {
    let seed = config.seed;
    let points_per_fragment = config.points_per_fragment();
    let dimensions = config.dimensions;

    let handles = (0..config.n_fragments)
        .map(|fragment_id| {
            substrate.submit(move || {
                generate_fragment(seed, fragment_id, points_per_fragment, dimensions, None)
                    .map(Arc::new)
            })
        })
        .collect();

    let fragments = substrate.await_all(handles)?;
    debug!(
        "Generated {} stationary fragments of {} points",
        fragments.len(),
        points_per_fragment
    );
    Ok(fragments)
}

/// Run a full fixed-iteration k-means from `initial` centroids
pub fn run_iterations<S: ExecutionSubstrate>(
    config: &RunConfig,
    substrate: &S,
    initial: CentroidSet,
) -> Result<RunSummary> {
    IterationController::new(config, substrate, initial)?.run()
}

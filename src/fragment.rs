use crate::centroids::CentroidSet;
use crate::config::GenerationMode;
use crate::error::{KMeansError, Result};
use ndarray::{Array2, ArrayView2};
use ndarray_rand::rand_distr::Uniform;
use ndarray_rand::RandomExt;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

// Odd constant (2^64 / golden ratio) used to spread iteration indices over the seed space.
const ITERATION_SEED_MIX: u64 = 0x9E37_79B9_7F4A_7C15;

/// A fixed-size, independently processable block of points
#[derive(Debug, Clone, PartialEq)]
pub struct Fragment {
    /// Fragment identity, `0..n_fragments`
    pub id: usize,

    /// Seed the points were drawn from
    pub seed: u64,

    /// Points, one per row
    pub points: Array2<f64>,
}

impl Fragment {
    /// Build a fragment from existing points. Values are not checked here;
    /// the map task rejects malformed fragments.
    pub fn from_points(id: usize, seed: u64, points: Array2<f64>) -> Self {
        Self { id, seed, points }
    }

    /// Number of points
    pub fn len(&self) -> usize {
        self.points.nrows()
    }

    pub fn is_empty(&self) -> bool {
        self.points.nrows() == 0
    }

    /// Number of dimensions
    pub fn dim(&self) -> usize {
        self.points.ncols()
    }

    pub fn view(&self) -> ArrayView2<'_, f64> {
        self.points.view()
    }
}

/// Which iteration index feeds fragment seeding under `mode`.
///
/// Stationary datasets ignore the iteration so every round sees the same points.
pub fn seeding_iteration(mode: GenerationMode, iteration: usize) -> Option<usize> {
    match mode {
        GenerationMode::Stationary => None,
        GenerationMode::Resample => Some(iteration),
    }
}

/// Seed for a fragment, mixed with the iteration index when resampling
pub fn fragment_seed(global_seed: u64, iteration: Option<usize>) -> u64 {
    match iteration {
        None => global_seed,
        Some(i) => global_seed.wrapping_add((i as u64 + 1).wrapping_mul(ITERATION_SEED_MIX)),
    }
}

/// Build the generator for one fragment.
///
/// Every fragment reads its own ChaCha stream, so the points do not depend on
/// which thread generates them or in what order. Stream 0 is reserved for the
/// initial centroids.
pub fn fragment_rng(global_seed: u64, fragment_id: usize, iteration: Option<usize>) -> ChaCha8Rng {
    let mut rng = ChaCha8Rng::seed_from_u64(fragment_seed(global_seed, iteration));
    rng.set_stream(fragment_id as u64 + 1);
    rng
}

/// Generate the points of fragment `fragment_id`, uniform in `[0, 1)`.
pub fn generate_fragment(
    global_seed: u64,
    fragment_id: usize,
    points_per_fragment: usize,
    dimensions: usize,
    iteration: Option<usize>,
) -> Result<Fragment> {
    if dimensions == 0 {
        return Err(KMeansError::Generation(
            "dimensions must be greater than 0".to_string(),
        ));
    }
    if points_per_fragment == 0 {
        return Err(KMeansError::Generation(format!(
            "fragment {} would be empty",
            fragment_id
        )));
    }

    let mut rng = fragment_rng(global_seed, fragment_id, iteration);
    let points = Array2::random_using(
        (points_per_fragment, dimensions),
        Uniform::new(0.0f64, 1.0),
        &mut rng,
    );

    Ok(Fragment {
        id: fragment_id,
        seed: fragment_seed(global_seed, iteration),
        points,
    })
}

/// Generate all fragments of a stationary dataset.
pub fn generate_fragments(
    global_seed: u64,
    n_fragments: usize,
    points_per_fragment: usize,
    dimensions: usize,
) -> Result<Vec<Fragment>> {
    (0..n_fragments)
        .map(|id| generate_fragment(global_seed, id, points_per_fragment, dimensions, None))
        .collect()
}

/// Draw K x D initial centroids, uniform in `[0, 1)`, from stream 0 of the global seed.
pub fn generate_initial_centroids(global_seed: u64, k: usize, dimensions: usize) -> Result<CentroidSet> {
    if k == 0 || dimensions == 0 {
        return Err(KMeansError::Generation(format!(
            "cannot generate a {}x{} centroid set",
            k, dimensions
        )));
    }

    let mut rng = ChaCha8Rng::seed_from_u64(global_seed);
    let matrix = Array2::random_using((k, dimensions), Uniform::new(0.0f64, 1.0), &mut rng);
    CentroidSet::new(matrix)
}

use crate::centroids::CentroidSet;
use crate::distance::nearest_centroid;
use crate::error::{KMeansError, Result};
use crate::fragment::Fragment;
use ndarray::{Array1, Array2, Zip};

/// Per-fragment cluster statistics: a K x D sum matrix and K point counts
#[derive(Debug, Clone, PartialEq)]
pub struct PartialResult {
    /// Id of the fragment these statistics were computed from
    pub fragment_id: usize,

    /// Sum of the points assigned to each cluster
    pub sums: Array2<f64>,

    /// Number of points assigned to each cluster
    pub counts: Array1<u64>,
}

impl PartialResult {
    /// All-zero statistics for `k` clusters of `dimensions` coordinates
    pub fn zeros(fragment_id: usize, k: usize, dimensions: usize) -> Self {
        Self {
            fragment_id,
            sums: Array2::zeros((k, dimensions)),
            counts: Array1::zeros(k),
        }
    }

    /// Total number of points counted
    pub fn total_count(&self) -> u64 {
        self.counts.sum()
    }

    /// Number of clusters
    pub fn k(&self) -> usize {
        self.counts.len()
    }
}

/// Map task: assign every point of `fragment` to its nearest centroid and
/// accumulate per-cluster sums and counts.
///
/// Pure function of its inputs. Either every point is accounted for or an
/// error is returned; there is no partially filled result.
///
/// # Errors
///
/// `WorkerCompute` when the fragment and centroids disagree on dimensionality,
/// when either contains a non-finite coordinate, or when a cluster sum overflows.
pub fn map_fragment(fragment: &Fragment, centroids: &CentroidSet) -> Result<PartialResult> {
    let k = centroids.k();
    let n_features = centroids.dim();

    if fragment.dim() != n_features {
        return Err(KMeansError::WorkerCompute(format!(
            "fragment {} has {} dimensions, centroids have {}",
            fragment.id,
            fragment.dim(),
            n_features
        )));
    }
    if centroids.view().iter().any(|v| !v.is_finite()) {
        return Err(KMeansError::WorkerCompute(
            "centroid set contains non-finite values".to_string(),
        ));
    }
    if let Some((row, _)) = fragment
        .points
        .outer_iter()
        .enumerate()
        .find(|(_, point)| point.iter().any(|v| !v.is_finite()))
    {
        return Err(KMeansError::WorkerCompute(format!(
            "fragment {} point {} has a non-finite coordinate",
            fragment.id, row
        )));
    }

    let centroid_view = centroids.view();
    let mut partial = PartialResult::zeros(fragment.id, k, n_features);

    for point in fragment.points.outer_iter() {
        let (cluster_idx, _) = nearest_centroid(&point, &centroid_view);
        partial.counts[cluster_idx] += 1;
        Zip::from(partial.sums.row_mut(cluster_idx))
            .and(&point)
            .for_each(|sum, &x| *sum += x);
    }

    // finite points can still overflow when summed
    if let Some((cluster_idx, _)) = partial
        .sums
        .outer_iter()
        .enumerate()
        .find(|(_, row)| row.iter().any(|v| !v.is_finite()))
    {
        return Err(KMeansError::WorkerCompute(format!(
            "fragment {} sum of cluster {} overflowed",
            fragment.id, cluster_idx
        )));
    }

    Ok(partial)
}

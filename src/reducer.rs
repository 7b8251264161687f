use crate::centroids::CentroidSet;
use crate::error::{KMeansError, Result};
use crate::worker::PartialResult;
use ndarray::{Array1, Array2};

/// Outcome of one reduction
#[derive(Debug, Clone)]
pub struct Reduction {
    /// Updated centers, same shape as the previous set
    pub centroids: CentroidSet,

    /// Points counted per cluster across all fragments
    pub counts: Array1<u64>,
}

impl Reduction {
    /// Clusters that received no point and kept their previous center
    pub fn empty_clusters(&self) -> usize {
        self.counts.iter().filter(|&&c| c == 0).count()
    }

    /// Total points counted across all fragments
    pub fn total_count(&self) -> u64 {
        self.counts.sum()
    }
}

/// Reduce task: fold every fragment's partial statistics into new centroids.
///
/// `partials` must hold exactly `expected_fragments` results, in any order,
/// each shaped K x D like `previous`. Clusters with a total count of zero keep
/// their previous center; they are never reseeded or dropped.
///
/// # Errors
///
/// `Aggregation` when the collection is incomplete, a result has the wrong
/// shape, or the combined sums overflow to a non-finite centroid.
pub fn reduce(
    previous: &CentroidSet,
    partials: &[PartialResult],
    expected_fragments: usize,
) -> Result<Reduction> {
    let k = previous.k();
    let n_features = previous.dim();

    if partials.len() != expected_fragments {
        return Err(KMeansError::Aggregation(format!(
            "expected {} partial results, got {}",
            expected_fragments,
            partials.len()
        )));
    }

    let mut total_sum: Array2<f64> = Array2::zeros((k, n_features));
    let mut total_count: Array1<u64> = Array1::zeros(k);

    for partial in partials {
        if partial.sums.dim() != (k, n_features) || partial.counts.len() != k {
            return Err(KMeansError::Aggregation(format!(
                "partial result of fragment {} has shape {:?}/{}, expected ({}, {})/{}",
                partial.fragment_id,
                partial.sums.dim(),
                partial.counts.len(),
                k,
                n_features,
                k
            )));
        }
        total_sum += &partial.sums;
        total_count += &partial.counts;
    }

    let mut new_centroids = previous.as_array().clone();
    for (cluster_idx, &count) in total_count.iter().enumerate() {
        if count > 0 {
            let mean = &total_sum.row(cluster_idx) / count as f64;
            if mean.iter().any(|v| !v.is_finite()) {
                return Err(KMeansError::Aggregation(format!(
                    "cluster {} mean is not finite after combining {} fragments",
                    cluster_idx,
                    partials.len()
                )));
            }
            new_centroids.row_mut(cluster_idx).assign(&mean);
        }
    }

    Ok(Reduction {
        centroids: CentroidSet::from_reduced(new_centroids),
        counts: total_count,
    })
}

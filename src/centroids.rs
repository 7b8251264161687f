use crate::error::{KMeansError, Result};
use ndarray::{Array2, ArrayView1, ArrayView2};
use std::sync::Arc;

/// A K x D matrix of cluster centers.
///
/// The matrix lives behind an `Arc`, so `clone()` hands out an immutable
/// snapshot without copying. A new iteration builds a new `CentroidSet`
/// rather than writing into one that map tasks may still be reading.
#[derive(Debug, Clone, PartialEq)]
pub struct CentroidSet {
    matrix: Arc<Array2<f64>>,
}

impl CentroidSet {
    /// Wrap a K x D matrix. Rejects empty shapes and non-finite values.
    pub fn new(matrix: Array2<f64>) -> Result<Self> {
        if matrix.nrows() == 0 || matrix.ncols() == 0 {
            return Err(KMeansError::InvalidDimensions(format!(
                "centroid set must be non-empty, got {}x{}",
                matrix.nrows(),
                matrix.ncols()
            )));
        }
        if let Some(value) = matrix.iter().find(|v| !v.is_finite()) {
            return Err(KMeansError::Generation(format!(
                "centroid set contains non-finite value {}",
                value
            )));
        }
        Ok(Self {
            matrix: Arc::new(matrix),
        })
    }

    /// Wrap a matrix produced by the reducer, which keeps the shape of the
    /// previous set and rejects non-finite means before calling this.
    pub(crate) fn from_reduced(matrix: Array2<f64>) -> Self {
        Self {
            matrix: Arc::new(matrix),
        }
    }

    /// Number of clusters
    pub fn k(&self) -> usize {
        self.matrix.nrows()
    }

    /// Number of dimensions
    pub fn dim(&self) -> usize {
        self.matrix.ncols()
    }

    pub fn view(&self) -> ArrayView2<'_, f64> {
        self.matrix.view()
    }

    /// The center of cluster `k`
    pub fn row(&self, k: usize) -> ArrayView1<'_, f64> {
        self.matrix.row(k)
    }

    pub fn as_array(&self) -> &Array2<f64> {
        &self.matrix
    }

    /// Take the matrix out, copying only if other snapshots are still alive.
    pub fn into_array(self) -> Array2<f64> {
        Arc::try_unwrap(self.matrix).unwrap_or_else(|shared| (*shared).clone())
    }
}

/// The controller's view of the run: current centers plus the index of the
/// next iteration to execute.
#[derive(Debug, Clone)]
pub struct ClusterState {
    pub centroids: CentroidSet,
    pub iteration: usize,
}

impl ClusterState {
    pub fn new(centroids: CentroidSet) -> Self {
        Self {
            centroids,
            iteration: 0,
        }
    }

    /// Adopt the reducer output and move to the next iteration.
    pub fn advance(&mut self, centroids: CentroidSet) {
        self.centroids = centroids;
        self.iteration += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_snapshot_shares_storage() {
        let set = CentroidSet::new(array![[1.0, 2.0], [3.0, 4.0]]).unwrap();
        let snapshot = set.clone();

        assert!(Arc::ptr_eq(&set.matrix, &snapshot.matrix));
        assert_eq!(snapshot.k(), 2);
        assert_eq!(snapshot.dim(), 2);
    }

    #[test]
    fn test_rejects_non_finite() {
        let result = CentroidSet::new(array![[1.0, f64::NAN]]);
        assert!(matches!(result, Err(KMeansError::Generation(_))));
    }

    #[test]
    fn test_rejects_empty() {
        let result = CentroidSet::new(Array2::zeros((0, 3)));
        assert!(matches!(result, Err(KMeansError::InvalidDimensions(_))));
    }

    #[test]
    fn test_advance_replaces_centroids() {
        let first = CentroidSet::new(array![[0.0]]).unwrap();
        let second = CentroidSet::new(array![[5.0]]).unwrap();
        let mut state = ClusterState::new(first.clone());

        state.advance(second.clone());

        assert_eq!(state.iteration, 1);
        assert_eq!(state.centroids, second);
        // the old snapshot is untouched
        assert_eq!(first.row(0)[0], 0.0);
    }
}

use ndarray::{Array1, ArrayView1, ArrayView2};
use rayon::prelude::*;

/// Squared L2 distance between two points of equal length
#[inline]
pub fn squared_euclidean(a: &ArrayView1<f64>, b: &ArrayView1<f64>) -> f64 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| {
            let d = x - y;
            d * d
        })
        .sum()
}

/// Find the nearest centroid for one point.
///
/// Distances are computed directly rather than through the
/// `||x||^2 + ||c||^2 - 2*x.c` expansion so that equal distances compare
/// equal. Only a strictly smaller distance replaces the current best, which
/// sends ties to the lowest centroid index.
///
/// # Returns
/// * `(label, squared_distance)`
#[inline]
pub fn nearest_centroid(point: &ArrayView1<f64>, centroids: &ArrayView2<f64>) -> (usize, f64) {
    let mut best_label = 0;
    let mut best_dist = f64::INFINITY;

    for (j, centroid) in centroids.outer_iter().enumerate() {
        let dist = squared_euclidean(point, &centroid);
        if dist < best_dist {
            best_dist = dist;
            best_label = j;
        }
    }

    (best_label, best_dist)
}

/// Find the nearest centroid for each row of `data`, in parallel over rows
pub fn nearest_centroids(data: &ArrayView2<f64>, centroids: &ArrayView2<f64>) -> Array1<usize> {
    let labels: Vec<usize> = (0..data.nrows())
        .into_par_iter()
        .map(|i| nearest_centroid(&data.row(i), centroids).0)
        .collect();

    Array1::from(labels)
}

/// Compute centroid shift (sum of L2 norms of centroid movements)
pub fn compute_centroid_shift(
    old_centroids: &ArrayView2<f64>,
    new_centroids: &ArrayView2<f64>,
) -> f64 {
    let k = old_centroids.nrows();

    (0..k)
        .into_par_iter()
        .map(|i| squared_euclidean(&old_centroids.row(i), &new_centroids.row(i)).sqrt())
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::array;

    #[test]
    fn test_squared_euclidean() {
        let a = array![1.0, 2.0, 3.0];
        let b = array![4.0, 6.0, 3.0];
        assert_relative_eq!(squared_euclidean(&a.view(), &b.view()), 25.0);
    }

    #[test]
    fn test_nearest_centroid() {
        let centroids = array![[0.0, 0.0], [10.0, 10.0]];

        let (label, dist) = nearest_centroid(&array![1.0, 1.0].view(), &centroids.view());
        assert_eq!(label, 0);
        assert_relative_eq!(dist, 2.0);

        let (label, _) = nearest_centroid(&array![9.0, 9.5].view(), &centroids.view());
        assert_eq!(label, 1);
    }

    #[test]
    fn test_tie_goes_to_lowest_index() {
        // (5,5) is equidistant from both centroids
        let centroids = array![[0.0, 0.0], [10.0, 10.0]];
        let (label, _) = nearest_centroid(&array![5.0, 5.0].view(), &centroids.view());
        assert_eq!(label, 0);

        // duplicated centroids: first copy wins
        let centroids = array![[3.0], [1.0], [1.0]];
        let (label, _) = nearest_centroid(&array![1.0].view(), &centroids.view());
        assert_eq!(label, 1);
    }

    #[test]
    fn test_nearest_centroids_batch() {
        let data = array![[0.0], [4.0], [10.0], [6.0]];
        let centroids = array![[0.0], [10.0]];

        let labels = nearest_centroids(&data.view(), &centroids.view());
        assert_eq!(labels.to_vec(), vec![0, 0, 1, 1]);
    }

    #[test]
    fn test_centroid_shift() {
        let old = array![[0.0, 0.0], [1.0, 1.0]];
        let new = array![[1.0, 0.0], [1.0, 1.0]];

        let shift = compute_centroid_shift(&old.view(), &new.view());
        assert_relative_eq!(shift, 1.0, epsilon = 1e-12);
    }
}

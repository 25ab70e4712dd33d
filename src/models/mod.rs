//! Nearest-neighbour models over the rating matrix.
pub mod knn;

/// Distance metric used to compare item rating vectors.
///
/// The metric is part of the fitted index rather than a query-time choice:
/// different metrics produce materially different neighbour sets for sparse
/// rating vectors, so an index must keep answering with the metric it was
/// fit with.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum Distance {
    /// Straight-line (L2) distance between rating vectors.
    Euclidean,
    /// One minus the cosine similarity of the rating vectors.
    Cosine,
}

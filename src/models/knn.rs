//! Exhaustive k-nearest-neighbour search over rating matrix rows.
//!
//! Every fitted row is scanned on every query, so results are exact and
//! reproducible; there is no approximate index structure to tune. Queries
//! are cheap relative to the offline build for the matrix sizes this crate
//! targets, and the per-row distance computations are spread across threads.
use std::cmp::Ordering;

use ndarray::Array1;
use rayon::prelude::*;

use data::RatingMatrix;
use Rating;

use super::Distance;

/// Nearest-neighbour query error types.
#[derive(Debug, Fail, PartialEq)]
pub enum QueryError {
    /// The index was fit on a matrix with zero rows.
    #[fail(display = "cannot query an index fit on zero rows")]
    EmptyIndex,
    /// The query vector's dimensionality does not match the fitted columns.
    #[fail(
        display = "query vector has {} entries but the index was fit on {} columns",
        found, expected
    )]
    DimensionMismatch {
        /// Number of columns the index was fit on.
        expected: usize,
        /// Number of entries in the query vector.
        found: usize,
    },
    /// More neighbours were requested than the index holds rows.
    #[fail(
        display = "{} neighbours requested but only {} rows are indexed",
        requested, available
    )]
    NotEnoughRows {
        /// Number of neighbours requested.
        requested: usize,
        /// Number of fitted rows.
        available: usize,
    },
}

/// Hyperparameters describing the nearest-neighbour index.
#[derive(Clone, Debug)]
pub struct Hyperparameters {
    distance: Distance,
}

impl Hyperparameters {
    /// Build new hyperparameters with the default metric.
    pub fn new() -> Self {
        Hyperparameters {
            distance: Distance::Euclidean,
        }
    }

    /// Set the distance metric.
    pub fn distance(mut self, distance: Distance) -> Self {
        self.distance = distance;
        self
    }

    /// Fit an index over the rows of `matrix`.
    ///
    /// The index copies the matrix rows (and caches their squared norms) so
    /// that it can be persisted and queried independently of the matrix it
    /// was fit on. Fitting an empty matrix succeeds; querying the resulting
    /// index does not.
    pub fn fit(&self, matrix: &RatingMatrix) -> KnnIndex {
        let mut row_pointers = Vec::with_capacity(matrix.num_rows() + 1);
        row_pointers.push(0);

        let mut column_indices = Vec::new();
        let mut values = Vec::new();
        let mut squared_norms = Vec::with_capacity(matrix.num_rows());

        for row in matrix.iter_rows() {
            column_indices.extend_from_slice(row.column_indices);
            values.extend_from_slice(row.values);
            squared_norms.push(row.values.iter().map(|value| value * value).sum());
            row_pointers.push(column_indices.len());
        }

        KnnIndex {
            distance: self.distance,
            num_columns: matrix.num_users(),
            row_pointers,
            column_indices,
            values,
            squared_norms,
        }
    }
}

impl Default for Hyperparameters {
    fn default() -> Self {
        Hyperparameters::new()
    }
}

/// An exhaustive nearest-neighbour structure fit over rating matrix rows.
///
/// Fit once per training run, persisted, and loaded read-only for serving;
/// never mutated in place. Queries need only a shared reference, so any
/// number of them may run concurrently.
#[derive(Clone, Serialize, Deserialize, Debug)]
pub struct KnnIndex {
    distance: Distance,
    num_columns: usize,
    row_pointers: Vec<usize>,
    column_indices: Vec<usize>,
    values: Vec<Rating>,
    squared_norms: Vec<Rating>,
}

impl KnnIndex {
    /// Number of fitted rows.
    pub fn num_rows(&self) -> usize {
        self.row_pointers.len() - 1
    }

    /// Number of columns the index was fit on.
    pub fn num_columns(&self) -> usize {
        self.num_columns
    }

    /// The metric the index was fit with.
    pub fn distance(&self) -> Distance {
        self.distance
    }

    /// Return the `k` nearest fitted rows to `query` as
    /// `(distances, row_indices)`, sorted by increasing distance with ties
    /// broken by ascending row index.
    ///
    /// Exactly `k` rows come back. When the query vector is itself a fitted
    /// row it is part of the result (at distance zero); callers wanting to
    /// exclude self-matches must do so themselves.
    pub fn query(
        &self,
        query: &Array1<Rating>,
        k: usize,
    ) -> Result<(Vec<Rating>, Vec<usize>), QueryError> {
        let num_rows = self.num_rows();

        if num_rows == 0 {
            return Err(QueryError::EmptyIndex);
        }

        if query.len() != self.num_columns {
            return Err(QueryError::DimensionMismatch {
                expected: self.num_columns,
                found: query.len(),
            });
        }

        if k > num_rows {
            return Err(QueryError::NotEnoughRows {
                requested: k,
                available: num_rows,
            });
        }

        let query_squared_norm = query.dot(query);

        let mut scored: Vec<(Rating, usize)> = (0..num_rows)
            .into_par_iter()
            .map(|row| (self.distance_to_row(row, query, query_squared_norm), row))
            .collect();

        scored.sort_by(|a, b| {
            a.0
                .partial_cmp(&b.0)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.1.cmp(&b.1))
        });
        scored.truncate(k);

        Ok(scored.into_iter().unzip())
    }

    fn distance_to_row(
        &self,
        row: usize,
        query: &Array1<Rating>,
        query_squared_norm: Rating,
    ) -> Rating {
        let start = self.row_pointers[row];
        let stop = self.row_pointers[row + 1];

        let mut dot = 0.0;
        for idx in start..stop {
            dot += self.values[idx] * query[self.column_indices[idx]];
        }

        match self.distance {
            Distance::Euclidean => {
                (query_squared_norm + self.squared_norms[row] - 2.0 * dot)
                    .max(0.0)
                    .sqrt()
            }
            Distance::Cosine => {
                let denominator = (query_squared_norm * self.squared_norms[row]).sqrt();

                if denominator == 0.0 {
                    1.0
                } else {
                    1.0 - dot / denominator
                }
            }
        }
    }
}

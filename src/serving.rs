//! Query-time resolution of a title to its most similar titles.
use failure::Error;

use artifacts::{self, ArtifactConfig};
use data::{PosterCatalog, RatingMatrix};
use models::knn::{KnnIndex, QueryError};

/// Number of rows requested from the index per query.
///
/// The query vector is itself a fitted row, so it comes back as its own
/// nearest neighbour; after excluding it a query yields up to
/// `NUM_NEIGHBOURS - 1` recommendations.
pub const NUM_NEIGHBOURS: usize = 6;

/// A single recommended title with its optional cover image.
///
/// Pairing each title with its own poster keeps the two aligned even when
/// some titles have no cover on record.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    /// The recommended title.
    pub title: String,
    /// The title's cover image URL, when the poster catalog has one.
    pub poster: Option<String>,
}

/// Recommendation error types.
#[derive(Debug, Fail, PartialEq)]
pub enum RecommendationError {
    /// The query title is not part of the rating matrix.
    #[fail(display = "book '{}' not found in the rating matrix", title)]
    NotFound {
        /// The title that was looked up.
        title: String,
    },
    /// The matrix and index shapes disagree; the artifacts come from
    /// different training runs.
    #[fail(
        display = "rating matrix is {}x{} but the index was fit on {}x{}",
        matrix_rows, matrix_columns, index_rows, index_columns
    )]
    DimensionMismatch {
        /// Rows in the loaded matrix.
        matrix_rows: usize,
        /// Columns in the loaded matrix.
        matrix_columns: usize,
        /// Rows the index was fit on.
        index_rows: usize,
        /// Columns the index was fit on.
        index_columns: usize,
    },
    /// The nearest-neighbour query failed.
    #[fail(display = "nearest-neighbour query failed: {}", _0)]
    Query(#[fail(cause)] QueryError),
}

/// Serves similar-title queries over immutable, pre-built artifacts.
///
/// A service is constructed once at startup and holds the matrix, index and
/// poster catalog read-only for its whole lifetime. `recommend` performs no
/// I/O and takes no locks, so a single instance can answer any number of
/// concurrent queries; hot-reloading artifacts means building a fresh
/// service and swapping it in whole.
#[derive(Debug)]
pub struct RecommendationService {
    matrix: RatingMatrix,
    index: KnnIndex,
    posters: PosterCatalog,
}

impl RecommendationService {
    /// Build a service from in-memory artifacts.
    ///
    /// Fails with [`DimensionMismatch`](enum.RecommendationError.html) when
    /// the index was not fit on a matrix of this shape.
    pub fn new(
        matrix: RatingMatrix,
        index: KnnIndex,
        posters: PosterCatalog,
    ) -> Result<Self, RecommendationError> {
        if matrix.num_rows() != index.num_rows() || matrix.num_users() != index.num_columns() {
            return Err(RecommendationError::DimensionMismatch {
                matrix_rows: matrix.num_rows(),
                matrix_columns: matrix.num_users(),
                index_rows: index.num_rows(),
                index_columns: index.num_columns(),
            });
        }

        Ok(RecommendationService {
            matrix,
            index,
            posters,
        })
    }

    /// Load a service from persisted artifacts.
    ///
    /// The standalone title list is loaded through its fallback path where
    /// necessary and cross-checked against the matrix row labels, so that a
    /// mismatched set of artifacts is rejected at startup rather than
    /// surfacing as wrong answers later.
    pub fn load(config: &ArtifactConfig) -> Result<Self, Error> {
        info!("loading artifacts from {:?}", config.dir());

        let index: KnnIndex = artifacts::load(&config.index_path())?;
        let matrix: RatingMatrix = artifacts::load(&config.matrix_path())?;
        let titles = artifacts::load_titles(config)?;
        let posters: PosterCatalog = artifacts::load(&config.posters_path())?;

        ensure!(
            titles.as_slice() == matrix.titles(),
            "title list does not match the matrix row labels ({} titles vs {} rows)",
            titles.len(),
            matrix.num_rows()
        );

        Ok(RecommendationService::new(matrix, index, posters)?)
    }

    /// The titles the service can answer queries for, in matrix row order.
    pub fn titles(&self) -> &[String] {
        self.matrix.titles()
    }

    /// Return the titles most similar to `title`, closest first, each
    /// paired with its cover image URL where one is known.
    ///
    /// The query title itself is never part of the result. A missing cover
    /// image is logged and yields a `None` poster; it is not an error.
    pub fn recommend(&self, title: &str) -> Result<Vec<Recommendation>, RecommendationError> {
        let row = self
            .matrix
            .row_index(title)
            .ok_or_else(|| RecommendationError::NotFound {
                title: title.to_owned(),
            })?;

        let vector = self.matrix.dense_row(row);
        let (_, indices) = self
            .index
            .query(&vector, NUM_NEIGHBOURS)
            .map_err(RecommendationError::Query)?;

        let mut recommendations = Vec::with_capacity(NUM_NEIGHBOURS - 1);

        for &idx in &indices {
            let neighbour = self.matrix.titles()[idx].as_str();

            if neighbour == title {
                continue;
            }

            let poster = match self.posters.get(neighbour) {
                Some(url) => Some(url.to_owned()),
                None => {
                    warn!("no cover image on record for '{}'", neighbour);
                    None
                }
            };

            recommendations.push(Recommendation {
                title: neighbour.to_owned(),
                poster,
            });
        }

        recommendations.truncate(NUM_NEIGHBOURS - 1);

        Ok(recommendations)
    }
}

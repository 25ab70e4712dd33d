//! Opaque persistence for trained artifacts.
//!
//! Artifacts are bincode-encoded files under a single directory. The
//! directory defaults to `./artifacts` and can be overridden through the
//! `ARTIFACT_DIR` environment variable; loading hands back exactly the
//! objects that were saved, or fails.
use std::env;
use std::fs::{create_dir_all, File};
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use bincode;
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Environment variable overriding the artifact directory.
pub const ARTIFACT_DIR_VAR: &'static str = "ARTIFACT_DIR";

/// Artifact load/save error types.
#[derive(Debug, Fail)]
pub enum ArtifactError {
    /// The artifact file could not be opened.
    #[fail(display = "artifact {} is missing: {}", path, cause)]
    Missing {
        /// Path that failed to open.
        path: String,
        /// The underlying I/O error.
        #[fail(cause)]
        cause: io::Error,
    },
    /// The artifact file exists but could not be decoded.
    #[fail(display = "artifact {} is malformed: {}", path, cause)]
    Malformed {
        /// Path that failed to decode.
        path: String,
        /// The underlying decoding error.
        #[fail(cause)]
        cause: bincode::Error,
    },
    /// The artifact could not be written out.
    #[fail(display = "artifact {} could not be written: {}", path, cause)]
    WriteFailed {
        /// Path that failed to write.
        path: String,
        /// The underlying encoding or I/O error.
        #[fail(cause)]
        cause: bincode::Error,
    },
}

/// Locations of the persisted artifacts.
#[derive(Clone, Debug)]
pub struct ArtifactConfig {
    dir: PathBuf,
}

impl ArtifactConfig {
    /// Store artifacts under `dir`.
    pub fn new<P: Into<PathBuf>>(dir: P) -> Self {
        ArtifactConfig { dir: dir.into() }
    }

    /// Resolve the artifact directory from `ARTIFACT_DIR`, defaulting to
    /// `./artifacts`.
    pub fn from_env() -> Self {
        match env::var(ARTIFACT_DIR_VAR) {
            Ok(dir) => ArtifactConfig::new(dir),
            Err(_) => ArtifactConfig::new("artifacts"),
        }
    }

    /// The artifact directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the fitted nearest-neighbour index.
    pub fn index_path(&self) -> PathBuf {
        self.dir.join("model.bin")
    }

    /// Path of the rating matrix.
    pub fn matrix_path(&self) -> PathBuf {
        self.dir.join("book_pivot.bin")
    }

    /// Primary path of the standalone title list.
    pub fn titles_path(&self) -> PathBuf {
        self.dir.join("books_title.bin")
    }

    /// Fallback path of the title list, as written by older training runs.
    pub fn titles_fallback_path(&self) -> PathBuf {
        self.dir.join("books_name.bin")
    }

    /// Path of the poster catalog.
    pub fn posters_path(&self) -> PathBuf {
        self.dir.join("ratings.bin")
    }
}

/// Persist `value` at `path`, creating the directory if needed.
pub fn save<T: Serialize>(path: &Path, value: &T) -> Result<(), ArtifactError> {
    if let Some(parent) = path.parent() {
        create_dir_all(parent).map_err(|cause| ArtifactError::WriteFailed {
            path: path.display().to_string(),
            cause: Box::new(bincode::ErrorKind::Io(cause)),
        })?;
    }

    let file = File::create(path).map_err(|cause| ArtifactError::WriteFailed {
        path: path.display().to_string(),
        cause: Box::new(bincode::ErrorKind::Io(cause)),
    })?;

    let mut writer = BufWriter::new(file);

    bincode::serialize_into(&mut writer, value).map_err(|cause| ArtifactError::WriteFailed {
        path: path.display().to_string(),
        cause,
    })?;

    writer.flush().map_err(|cause| ArtifactError::WriteFailed {
        path: path.display().to_string(),
        cause: Box::new(bincode::ErrorKind::Io(cause)),
    })
}

/// Load the artifact stored at `path`.
pub fn load<T: DeserializeOwned>(path: &Path) -> Result<T, ArtifactError> {
    let file = File::open(path).map_err(|cause| ArtifactError::Missing {
        path: path.display().to_string(),
        cause,
    })?;

    bincode::deserialize_from(BufReader::new(file)).map_err(|cause| ArtifactError::Malformed {
        path: path.display().to_string(),
        cause,
    })
}

/// Load the standalone title list, trying the fallback path when the
/// primary one cannot be read.
///
/// Failure on both paths propagates the fallback's error.
pub fn load_titles(config: &ArtifactConfig) -> Result<Vec<String>, ArtifactError> {
    match load(&config.titles_path()) {
        Ok(titles) => Ok(titles),
        Err(primary_error) => {
            warn!(
                "failed to load the title list from {:?}, trying {:?}: {}",
                config.titles_path(),
                config.titles_fallback_path(),
                primary_error
            );
            load(&config.titles_fallback_path())
        }
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::TempDir;

    use data::{Book, MatrixBuilder, RatingEvent, RatingMatrix};
    use models::knn::{Hyperparameters, KnnIndex};

    use super::*;

    fn tiny_artifacts() -> (RatingMatrix, KnnIndex) {
        let books: Vec<Book> = (0..3)
            .map(|num| {
                Book::new(
                    format!("isbn-{}", num),
                    format!("Book {}", num),
                    "An Author",
                    "A Publisher",
                    format!("http://covers.test/{}.jpg", num),
                )
            })
            .collect();
        let mut ratings = Vec::new();

        for user in 0..3u32 {
            for num in 0..3 {
                ratings.push(RatingEvent::new(
                    user,
                    format!("isbn-{}", num),
                    (user as usize + num * 2) as f32,
                ));
            }
        }

        let (matrix, _) = MatrixBuilder::new()
            .min_user_ratings(0)
            .min_book_ratings(1)
            .build(&ratings, &books, &[]);
        let index = Hyperparameters::new().fit(&matrix);

        (matrix, index)
    }

    #[test]
    fn a_reloaded_index_answers_like_the_original() {
        let (matrix, index) = tiny_artifacts();

        let dir = TempDir::new().unwrap();
        let config = ArtifactConfig::new(dir.path());

        save(&config.matrix_path(), &matrix).unwrap();
        save(&config.index_path(), &index).unwrap();

        let reloaded_matrix: RatingMatrix = load(&config.matrix_path()).unwrap();
        let reloaded_index: KnnIndex = load(&config.index_path()).unwrap();

        assert_eq!(reloaded_matrix, matrix);

        let query = matrix.dense_row(1);
        assert_eq!(
            reloaded_index.query(&query, 3).unwrap(),
            index.query(&query, 3).unwrap()
        );
    }

    #[test]
    fn missing_artifacts_are_reported_with_their_path() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nothing_here.bin");

        match load::<Vec<String>>(&path) {
            Err(ArtifactError::Missing { ref path, .. }) => {
                assert!(path.ends_with("nothing_here.bin"));
            }
            other => panic!("expected a missing artifact error, got {:?}", other),
        }
    }

    #[test]
    fn malformed_artifacts_are_detected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("garbage.bin");
        fs::write(&path, &[0xff; 16][..]).unwrap();

        match load::<Vec<String>>(&path) {
            Err(ArtifactError::Malformed { .. }) => {}
            other => panic!("expected a malformed artifact error, got {:?}", other),
        }
    }

    #[test]
    fn the_title_list_falls_back_to_its_older_name() {
        let dir = TempDir::new().unwrap();
        let config = ArtifactConfig::new(dir.path());
        let titles = vec!["Book 0".to_owned(), "Book 1".to_owned()];

        save(&config.titles_fallback_path(), &titles).unwrap();

        assert_eq!(load_titles(&config).unwrap(), titles);
    }

    #[test]
    fn both_title_paths_missing_propagates_the_error() {
        let dir = TempDir::new().unwrap();
        let config = ArtifactConfig::new(dir.path());

        match load_titles(&config) {
            Err(ArtifactError::Missing { ref path, .. }) => {
                assert!(path.ends_with("books_name.bin"));
            }
            other => panic!("expected a missing artifact error, got {:?}", other),
        }
    }

    #[test]
    fn the_environment_overrides_the_artifact_directory() {
        env::set_var(ARTIFACT_DIR_VAR, "/tmp/ibr-test-artifacts");
        assert_eq!(
            ArtifactConfig::from_env().dir(),
            Path::new("/tmp/ibr-test-artifacts")
        );
        env::remove_var(ARTIFACT_DIR_VAR);

        assert_eq!(ArtifactConfig::from_env().dir(), Path::new("artifacts"));
    }
}

//! Offline training pipeline: data tables in, artifacts out.
//!
//! Reads the normalized `ratings.csv`, `books.csv` and `users.csv` tables
//! from the directory given as the first argument (default `artifacts`),
//! builds the rating matrix and poster catalog, fits the index, and writes
//! all four artifacts to the configured artifact directory.
extern crate env_logger;
extern crate failure;
extern crate ibr;
#[macro_use]
extern crate log;

use std::env;
use std::path::{Path, PathBuf};
use std::process;

use failure::Error;

use ibr::artifacts::{self, ArtifactConfig};
use ibr::data::MatrixBuilder;
use ibr::datasets;
use ibr::models::knn::Hyperparameters;

fn run(data_dir: &Path) -> Result<(), Error> {
    let ratings = datasets::read_ratings(data_dir.join("ratings.csv"))?;
    let books = datasets::read_books(data_dir.join("books.csv"))?;
    let users = datasets::read_users(data_dir.join("users.csv"))?;
    info!(
        "read {} ratings, {} books, {} users from {:?}",
        ratings.len(),
        books.len(),
        users.len(),
        data_dir
    );

    let (matrix, posters) = MatrixBuilder::new().build(&ratings, &books, &users);
    info!(
        "built a {:?} rating matrix with {} posters",
        matrix.shape(),
        posters.len()
    );

    let index = Hyperparameters::new().fit(&matrix);

    let config = ArtifactConfig::from_env();
    artifacts::save(&config.matrix_path(), &matrix)?;
    artifacts::save(&config.index_path(), &index)?;
    artifacts::save(&config.titles_path(), &matrix.titles().to_vec())?;
    artifacts::save(&config.posters_path(), &posters)?;
    info!("artifacts written to {:?}", config.dir());

    Ok(())
}

fn main() {
    env_logger::init();

    let data_dir = env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("artifacts"));

    if let Err(error) = run(&data_dir) {
        eprintln!("training failed: {}", error);
        process::exit(1);
    }
}

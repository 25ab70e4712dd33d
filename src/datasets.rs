//! Readers for the normalized rating, book and user tables.
//!
//! The upstream ingestion step (out of scope here) is expected to have
//! normalized raw column names down to `user_id`/`isbn`/`rating` and
//! friends; these helpers only deserialize its output.
use std::path::Path;

use csv;
use failure;

use data::{Book, RatingEvent, User};

/// Read rating events from a CSV file with `user_id,isbn,rating` columns.
pub fn read_ratings<P: AsRef<Path>>(path: P) -> Result<Vec<RatingEvent>, failure::Error> {
    let mut reader = csv::Reader::from_path(path)?;
    let events = reader.deserialize().collect::<Result<Vec<_>, _>>()?;

    Ok(events)
}

/// Read book reference data from a CSV file with
/// `isbn,title,author,publisher,url` columns.
pub fn read_books<P: AsRef<Path>>(path: P) -> Result<Vec<Book>, failure::Error> {
    let mut reader = csv::Reader::from_path(path)?;
    let books = reader.deserialize().collect::<Result<Vec<_>, _>>()?;

    Ok(books)
}

/// Read the user reference table from a CSV file with
/// `user_id,location,age` columns.
pub fn read_users<P: AsRef<Path>>(path: P) -> Result<Vec<User>, failure::Error> {
    let mut reader = csv::Reader::from_path(path)?;
    let users = reader.deserialize().collect::<Result<Vec<_>, _>>()?;

    Ok(users)
}

#![deny(missing_docs)]
//! # ibr
//!
//! `ibr` implements item-based collaborative filtering over book ratings:
//! every title is represented by its vector of reader ratings, and the
//! titles whose vectors lie closest to the query's are recommended for it,
//! independently of who is asking.
//!
//! The crate is split into an offline batch side (filtering raw rating
//! events into a sparse item-by-user matrix and fitting an exhaustive
//! nearest-neighbour index over its rows) and a serving side (resolving a
//! title to its neighbours and decorating them with cover images). Both
//! sides exchange data through bincode-encoded artifacts.
//!
//! ## Example
//! ```rust
//! # extern crate ibr;
//! use ibr::data::{Book, MatrixBuilder, RatingEvent};
//! use ibr::models::knn::Hyperparameters;
//! use ibr::serving::RecommendationService;
//!
//! let books: Vec<Book> = (0..6)
//!     .map(|num| {
//!         Book::new(
//!             format!("isbn-{}", num),
//!             format!("Book {}", num),
//!             "An Author",
//!             "A Publisher",
//!             format!("http://covers.test/{}.jpg", num),
//!         )
//!     })
//!     .collect();
//! let ratings: Vec<RatingEvent> = (0..6)
//!     .map(|num| RatingEvent::new(1, format!("isbn-{}", num), 10.0 - num as f32))
//!     .collect();
//!
//! let (matrix, posters) = MatrixBuilder::new()
//!     .min_user_ratings(0)
//!     .min_book_ratings(1)
//!     .build(&ratings, &books, &[]);
//! let index = Hyperparameters::new().fit(&matrix);
//!
//! let service = RecommendationService::new(matrix, index, posters).unwrap();
//! let similar = service.recommend("Book 0").unwrap();
//!
//! assert_eq!(similar.len(), 5);
//! assert!(similar.iter().all(|r| r.title != "Book 0"));
//! ```
#[macro_use]
extern crate serde_derive;

#[macro_use]
extern crate failure;

#[macro_use]
extern crate log;

extern crate bincode;
extern crate csv;
extern crate ndarray;
extern crate rayon;
extern crate serde;

#[cfg(test)]
extern crate rand;
#[cfg(test)]
extern crate tempfile;

pub mod artifacts;
pub mod data;
pub mod datasets;
pub mod models;
pub mod serving;

/// Alias for raw user identifiers.
pub type UserId = u32;
/// Alias for rating values.
pub type Rating = f32;

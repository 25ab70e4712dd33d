//! Rating data containers and the matrix construction pipeline.
//!
//! The pipeline turns raw rating events into a filtered item-by-user
//! matrix: only sufficiently active users and sufficiently rated titles
//! survive, so that every row carries enough signal for similarity search.
use std::collections::{BTreeSet, HashMap, HashSet};

use ndarray::Array1;

use super::{Rating, UserId};

/// Users whose total rating count exceeds this threshold are "active".
///
/// Ratings from anyone less prolific are discarded before the matrix is
/// built: their rating vectors are too sparse to say anything about which
/// books resemble each other.
pub const MIN_USER_RATINGS: usize = 200;

/// Titles rated at least this many times (by active users) are "qualified".
///
/// Rarely rated titles produce near-empty rows whose nearest neighbours are
/// noise, so they are dropped from the matrix entirely.
pub const MIN_BOOK_RATINGS: usize = 50;

/// A single observed rating of a book by a user.
#[derive(Clone, Serialize, Deserialize, Debug)]
pub struct RatingEvent {
    user_id: UserId,
    isbn: String,
    rating: Rating,
}

impl RatingEvent {
    /// Build a new rating event.
    pub fn new<S: Into<String>>(user_id: UserId, isbn: S, rating: Rating) -> Self {
        RatingEvent {
            user_id,
            isbn: isbn.into(),
            rating,
        }
    }

    /// The identifier of the rating user.
    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    /// The ISBN of the rated book.
    pub fn isbn(&self) -> &str {
        &self.isbn
    }

    /// The rating value.
    pub fn rating(&self) -> Rating {
        self.rating
    }
}

/// Reference data describing a single book edition, keyed by ISBN.
#[derive(Clone, Serialize, Deserialize, Debug)]
pub struct Book {
    isbn: String,
    title: String,
    author: String,
    publisher: String,
    url: String,
}

impl Book {
    /// Build a new book record.
    pub fn new<S1, S2, S3, S4, S5>(isbn: S1, title: S2, author: S3, publisher: S4, url: S5) -> Self
    where
        S1: Into<String>,
        S2: Into<String>,
        S3: Into<String>,
        S4: Into<String>,
        S5: Into<String>,
    {
        Book {
            isbn: isbn.into(),
            title: title.into(),
            author: author.into(),
            publisher: publisher.into(),
            url: url.into(),
        }
    }

    /// The book's ISBN.
    pub fn isbn(&self) -> &str {
        &self.isbn
    }

    /// The book's title. Titles are the public identifier of a book
    /// everywhere downstream of the matrix build.
    pub fn title(&self) -> &str {
        &self.title
    }

    /// The book's author.
    pub fn author(&self) -> &str {
        &self.author
    }

    /// The book's publisher.
    pub fn publisher(&self) -> &str {
        &self.publisher
    }

    /// URL of the book's cover image. May be empty when no cover is known.
    pub fn url(&self) -> &str {
        &self.url
    }
}

/// A row of the user reference table.
///
/// The matrix pipeline derives user activity from the rating events
/// themselves; this table is carried along for completeness and logging.
#[derive(Clone, Serialize, Deserialize, Debug)]
pub struct User {
    user_id: UserId,
    location: String,
    age: Option<f32>,
}

impl User {
    /// Build a new user record.
    pub fn new<S: Into<String>>(user_id: UserId, location: S, age: Option<f32>) -> Self {
        User {
            user_id,
            location: location.into(),
            age,
        }
    }

    /// The user's identifier.
    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    /// The user's self-reported location.
    pub fn location(&self) -> &str {
        &self.location
    }

    /// The user's self-reported age, when present.
    pub fn age(&self) -> Option<f32> {
        self.age
    }
}

/// A single matrix row viewed as parallel CSR slices.
#[derive(Debug)]
pub struct MatrixRow<'a> {
    /// The title this row belongs to.
    pub title: &'a str,
    /// Column positions of the stored entries.
    pub column_indices: &'a [usize],
    /// Rating values of the stored entries.
    pub values: &'a [Rating],
}

/// The filtered item-by-user rating matrix in compressed sparse row form.
///
/// Rows are titles sorted ascending, columns are user ids sorted ascending,
/// and a stored value of 0.0 is indistinguishable from an absent cell (both
/// mean "no rating"). Row order is the sole mapping between a row index and
/// its title, and stays fixed for the lifetime of any index fit on the
/// matrix.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
pub struct RatingMatrix {
    titles: Vec<String>,
    user_ids: Vec<UserId>,
    row_pointers: Vec<usize>,
    column_indices: Vec<usize>,
    values: Vec<Rating>,
    title_indices: HashMap<String, usize>,
}

impl RatingMatrix {
    fn from_cells(titles: Vec<String>, user_ids: Vec<UserId>, mut cells: Vec<Vec<(usize, Rating)>>) -> Self {
        let mut row_pointers = Vec::with_capacity(titles.len() + 1);
        row_pointers.push(0);

        let mut column_indices = Vec::new();
        let mut values = Vec::new();

        for row in &mut cells {
            row.sort_by_key(|&(column, _)| column);

            for &(column, value) in row.iter() {
                column_indices.push(column);
                values.push(value);
            }

            row_pointers.push(column_indices.len());
        }

        let title_indices = titles
            .iter()
            .enumerate()
            .map(|(idx, title)| (title.clone(), idx))
            .collect();

        RatingMatrix {
            titles,
            user_ids,
            row_pointers,
            column_indices,
            values,
            title_indices,
        }
    }

    /// Number of rows (titles).
    pub fn num_rows(&self) -> usize {
        self.titles.len()
    }

    /// Number of columns (users).
    pub fn num_users(&self) -> usize {
        self.user_ids.len()
    }

    /// The matrix shape as `(rows, columns)`.
    pub fn shape(&self) -> (usize, usize) {
        (self.num_rows(), self.num_users())
    }

    /// True when the matrix has no rows.
    pub fn is_empty(&self) -> bool {
        self.titles.is_empty()
    }

    /// The row labels, in row order.
    pub fn titles(&self) -> &[String] {
        &self.titles
    }

    /// The column labels, in column order.
    pub fn user_ids(&self) -> &[UserId] {
        &self.user_ids
    }

    /// The title of the given row, if the row exists.
    pub fn title(&self, row: usize) -> Option<&str> {
        self.titles.get(row).map(|title| title.as_str())
    }

    /// The row index of the given title, if the title is in the matrix.
    pub fn row_index(&self, title: &str) -> Option<usize> {
        self.title_indices.get(title).cloned()
    }

    /// The given row as CSR slices, if the row exists.
    pub fn row(&self, row: usize) -> Option<MatrixRow> {
        if row >= self.num_rows() {
            return None;
        }

        let start = self.row_pointers[row];
        let stop = self.row_pointers[row + 1];

        Some(MatrixRow {
            title: &self.titles[row],
            column_indices: &self.column_indices[start..stop],
            values: &self.values[start..stop],
        })
    }

    /// Iterate over all rows in row order.
    pub fn iter_rows(&self) -> MatrixRowIterator {
        MatrixRowIterator {
            matrix: &self,
            idx: 0,
        }
    }

    /// The given row as a dense vector over all user columns.
    ///
    /// Panics if `row` is out of range.
    pub fn dense_row(&self, row: usize) -> Array1<Rating> {
        let start = self.row_pointers[row];
        let stop = self.row_pointers[row + 1];

        let mut dense = Array1::zeros(self.user_ids.len());

        for idx in start..stop {
            dense[self.column_indices[idx]] = self.values[idx];
        }

        dense
    }
}

/// Iterator over the rows of a `RatingMatrix`.
pub struct MatrixRowIterator<'a> {
    matrix: &'a RatingMatrix,
    idx: usize,
}

impl<'a> Iterator for MatrixRowIterator<'a> {
    type Item = MatrixRow<'a>;
    fn next(&mut self) -> Option<Self::Item> {
        let value = self.matrix.row(self.idx);

        self.idx += 1;

        value
    }
}

/// Lookup from title to cover image URL, used to decorate query results.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct PosterCatalog {
    urls: HashMap<String, String>,
}

impl PosterCatalog {
    /// The cover URL recorded for `title`, if any.
    pub fn get(&self, title: &str) -> Option<&str> {
        self.urls.get(title).map(|url| url.as_str())
    }

    /// Number of titles with a recorded cover.
    pub fn len(&self) -> usize {
        self.urls.len()
    }

    /// True when no title has a recorded cover.
    pub fn is_empty(&self) -> bool {
        self.urls.is_empty()
    }
}

/// Builds the filtered rating matrix and its poster catalog.
///
/// The thresholds default to [`MIN_USER_RATINGS`](constant.MIN_USER_RATINGS.html)
/// and [`MIN_BOOK_RATINGS`](constant.MIN_BOOK_RATINGS.html); the setters
/// exist so the filtering stages can be exercised on small corpora.
#[derive(Clone, Debug)]
pub struct MatrixBuilder {
    min_user_ratings: usize,
    min_book_ratings: usize,
}

impl MatrixBuilder {
    /// Build new matrix construction settings with the default thresholds.
    pub fn new() -> Self {
        MatrixBuilder {
            min_user_ratings: MIN_USER_RATINGS,
            min_book_ratings: MIN_BOOK_RATINGS,
        }
    }

    /// Set the user activity threshold: only ratings from users with
    /// strictly more than `count` ratings are kept.
    pub fn min_user_ratings(mut self, count: usize) -> Self {
        self.min_user_ratings = count;
        self
    }

    /// Set the title popularity threshold: only titles with at least
    /// `count` ratings (after the activity filter) are kept.
    pub fn min_book_ratings(mut self, count: usize) -> Self {
        self.min_book_ratings = count;
        self
    }

    /// Run the construction pipeline over raw rating events.
    ///
    /// Events are filtered to active users, inner-joined to `books` by ISBN
    /// (events for unknown ISBNs are dropped), filtered to qualified
    /// titles, and deduplicated by `(title, user)` keeping the first
    /// occurrence. The surviving cells are pivoted into a [`RatingMatrix`](struct.RatingMatrix.html)
    /// whose absent cells read as 0.0, and the same cells yield the
    /// [`PosterCatalog`](struct.PosterCatalog.html) (first non-empty URL per
    /// title wins).
    ///
    /// An input where nothing survives produces an empty matrix rather than
    /// an error; the absence of recommendations surfaces at query time.
    pub fn build(
        &self,
        ratings: &[RatingEvent],
        books: &[Book],
        users: &[User],
    ) -> (RatingMatrix, PosterCatalog) {
        info!(
            "building rating matrix from {} events, {} books, {} users",
            ratings.len(),
            books.len(),
            users.len()
        );

        let mut rating_counts: HashMap<UserId, usize> = HashMap::new();
        for event in ratings {
            *rating_counts.entry(event.user_id).or_insert(0) += 1;
        }

        let active_users: HashSet<UserId> = rating_counts
            .iter()
            .filter(|&(_, &count)| count > self.min_user_ratings)
            .map(|(&user_id, _)| user_id)
            .collect();
        info!(
            "{} of {} users are active",
            active_users.len(),
            rating_counts.len()
        );

        let mut books_by_isbn: HashMap<&str, &Book> = HashMap::with_capacity(books.len());
        for book in books {
            books_by_isbn.entry(book.isbn.as_str()).or_insert(book);
        }

        let joined: Vec<(&Book, &RatingEvent)> = ratings
            .iter()
            .filter(|event| active_users.contains(&event.user_id))
            .filter_map(|event| {
                books_by_isbn
                    .get(event.isbn.as_str())
                    .map(|&book| (book, event))
            })
            .collect();

        let mut title_counts: HashMap<&str, usize> = HashMap::new();
        for &(book, _) in &joined {
            *title_counts.entry(book.title.as_str()).or_insert(0) += 1;
        }

        let mut seen: HashSet<(&str, UserId)> = HashSet::new();
        let mut surviving: Vec<(&Book, &RatingEvent)> = Vec::new();

        for &(book, event) in &joined {
            if title_counts[book.title.as_str()] < self.min_book_ratings {
                continue;
            }

            if seen.insert((book.title.as_str(), event.user_id)) {
                surviving.push((book, event));
            }
        }

        let title_set: BTreeSet<&str> = surviving.iter().map(|&(book, _)| book.title.as_str()).collect();
        let user_set: BTreeSet<UserId> = surviving.iter().map(|&(_, event)| event.user_id).collect();
        info!(
            "{} ratings survive filtering, covering {} qualified titles",
            surviving.len(),
            title_set.len()
        );

        let row_of: HashMap<&str, usize> = title_set
            .iter()
            .enumerate()
            .map(|(idx, &title)| (title, idx))
            .collect();
        let column_of: HashMap<UserId, usize> = user_set
            .iter()
            .enumerate()
            .map(|(idx, &user_id)| (user_id, idx))
            .collect();

        let mut cells: Vec<Vec<(usize, Rating)>> = vec![Vec::new(); title_set.len()];
        let mut posters: HashMap<String, String> = HashMap::new();

        for &(book, event) in &surviving {
            cells[row_of[book.title.as_str()]].push((column_of[&event.user_id], event.rating));

            if !book.url.is_empty() && !posters.contains_key(&book.title) {
                posters.insert(book.title.clone(), book.url.clone());
            }
        }

        let titles: Vec<String> = title_set.iter().map(|&title| title.to_owned()).collect();
        let user_ids: Vec<UserId> = user_set.into_iter().collect();

        (
            RatingMatrix::from_cells(titles, user_ids, cells),
            PosterCatalog { urls: posters },
        )
    }
}

impl Default for MatrixBuilder {
    fn default() -> Self {
        MatrixBuilder::new()
    }
}

#[cfg(test)]
mod tests {
    use rand::{Rng, SeedableRng, XorShiftRng};

    use super::*;

    fn book(num: usize) -> Book {
        Book::new(
            format!("isbn-{}", num),
            format!("Book {}", num),
            "An Author",
            "A Publisher",
            format!("http://covers.test/{}.jpg", num),
        )
    }

    #[test]
    fn no_active_users_means_an_empty_matrix() {
        let books: Vec<Book> = (0..5).map(book).collect();
        let mut ratings = Vec::new();

        for user in 0..5u32 {
            for num in 0..5 {
                ratings.push(RatingEvent::new(user, format!("isbn-{}", num), 7.0));
            }
        }

        let (matrix, posters) = MatrixBuilder::new().build(&ratings, &books, &[]);

        assert!(matrix.is_empty());
        assert_eq!(matrix.shape(), (0, 0));
        assert!(posters.is_empty());
    }

    #[test]
    fn activity_is_counted_before_the_books_join() {
        // Each user clears the activity bar only thanks to ratings whose
        // ISBNs never join to a book.
        let books = vec![book(0)];
        let mut ratings = Vec::new();

        for user in 0..55u32 {
            ratings.push(RatingEvent::new(user, "isbn-0", 8.0));
            for junk in 0..200 {
                ratings.push(RatingEvent::new(user, format!("unlisted-{}", junk), 5.0));
            }
        }

        let (matrix, _) = MatrixBuilder::new().build(&ratings, &books, &[]);

        assert_eq!(matrix.shape(), (1, 55));
        assert_eq!(matrix.title(0), Some("Book 0"));
    }

    #[test]
    fn duplicate_pairs_keep_the_first_rating() {
        let books = vec![book(0), book(1)];
        let ratings = vec![
            RatingEvent::new(1, "isbn-0", 7.0),
            RatingEvent::new(1, "isbn-0", 3.0),
            RatingEvent::new(1, "isbn-1", 5.0),
        ];

        let (matrix, _) = MatrixBuilder::new()
            .min_user_ratings(0)
            .min_book_ratings(1)
            .build(&ratings, &books, &[]);

        assert_eq!(matrix.shape(), (2, 1));

        let row = matrix.row(0).unwrap();
        assert_eq!(row.title, "Book 0");
        assert_eq!(row.values, &[7.0]);
    }

    #[test]
    fn duplicate_pairs_across_editions_collapse() {
        let books = vec![
            Book::new("isbn-a", "Shared Title", "An Author", "A Publisher", "http://covers.test/a.jpg"),
            Book::new("isbn-b", "Shared Title", "An Author", "A Publisher", "http://covers.test/b.jpg"),
        ];
        let ratings = vec![
            RatingEvent::new(1, "isbn-a", 9.0),
            RatingEvent::new(1, "isbn-b", 2.0),
        ];

        let (matrix, posters) = MatrixBuilder::new()
            .min_user_ratings(0)
            .min_book_ratings(1)
            .build(&ratings, &books, &[]);

        assert_eq!(matrix.shape(), (1, 1));
        assert_eq!(matrix.row(0).unwrap().values, &[9.0]);
        assert_eq!(posters.get("Shared Title"), Some("http://covers.test/a.jpg"));
    }

    #[test]
    fn row_and_column_order_is_deterministic() {
        let books: Vec<Book> = (0..6).map(book).collect();
        let mut ratings = Vec::new();

        for user in 0..4u32 {
            for num in 0..6u32 {
                ratings.push(RatingEvent::new(
                    user,
                    format!("isbn-{}", num),
                    (user + num) as Rating,
                ));
            }
        }

        let builder = MatrixBuilder::new().min_user_ratings(0).min_book_ratings(1);
        let (reference, _) = builder.build(&ratings, &books, &[]);

        let mut sorted_titles = reference.titles().to_vec();
        sorted_titles.sort();
        assert_eq!(reference.titles(), sorted_titles.as_slice());

        let mut rng = XorShiftRng::from_seed([42; 16]);

        for _ in 0..3 {
            rng.shuffle(&mut ratings);
            let (shuffled, _) = builder.build(&ratings, &books, &[]);

            assert_eq!(shuffled, reference);
        }
    }

    #[test]
    fn missing_pairs_are_stored_as_zero() {
        let books = vec![book(0), book(1)];
        let ratings = vec![
            RatingEvent::new(1, "isbn-0", 6.0),
            RatingEvent::new(2, "isbn-1", 4.0),
        ];

        let (matrix, _) = MatrixBuilder::new()
            .min_user_ratings(0)
            .min_book_ratings(1)
            .build(&ratings, &books, &[]);

        assert_eq!(matrix.shape(), (2, 2));
        assert_eq!(matrix.user_ids(), &[1, 2]);
        assert_eq!(matrix.dense_row(0).to_vec(), vec![6.0, 0.0]);
        assert_eq!(matrix.dense_row(1).to_vec(), vec![0.0, 4.0]);
    }

    #[test]
    fn posters_skip_books_without_a_cover_url() {
        let books = vec![
            Book::new("isbn-0", "Covered", "An Author", "A Publisher", "http://covers.test/0.jpg"),
            Book::new("isbn-1", "Bare", "An Author", "A Publisher", ""),
        ];
        let ratings = vec![
            RatingEvent::new(1, "isbn-0", 8.0),
            RatingEvent::new(1, "isbn-1", 8.0),
        ];

        let (_, posters) = MatrixBuilder::new()
            .min_user_ratings(0)
            .min_book_ratings(1)
            .build(&ratings, &books, &[]);

        assert_eq!(posters.get("Covered"), Some("http://covers.test/0.jpg"));
        assert_eq!(posters.get("Bare"), None);
        assert_eq!(posters.len(), 1);
    }
}

#[macro_use]
extern crate criterion;

extern crate ibr;

use criterion::Criterion;

use ibr::data::{Book, MatrixBuilder, RatingEvent, RatingMatrix};
use ibr::models::knn::Hyperparameters;

fn synthetic_matrix(num_titles: usize, num_users: usize) -> RatingMatrix {
    let books: Vec<Book> = (0..num_titles)
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

    let mut ratings = Vec::with_capacity(num_titles * num_users);

    for user in 0..num_users {
        for num in 0..num_titles {
            let value = ((user * 7 + num * 13) % 11) as f32;

            if value != 0.0 {
                ratings.push(RatingEvent::new(
                    user as u32,
                    format!("isbn-{}", num),
                    value,
                ));
            }
        }
    }

    MatrixBuilder::new()
        .min_user_ratings(0)
        .min_book_ratings(1)
        .build(&ratings, &books, &[])
        .0
}

fn bench_query(c: &mut Criterion) {
    c.bench_function("knn_query", |b| {
        let matrix = synthetic_matrix(500, 100);
        let index = Hyperparameters::new().fit(&matrix);
        let query = matrix.dense_row(0);

        b.iter(|| index.query(&query, 6).unwrap())
    });
}

criterion_group! {
    name = benches;
    config = Criterion::default().sample_size(10);
    targets = bench_query
}
criterion_main!(benches);

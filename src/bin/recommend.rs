//! Command-line front end: print the titles most similar to one book.
extern crate env_logger;
extern crate ibr;

use std::env;
use std::process;

use ibr::artifacts::ArtifactConfig;
use ibr::serving::{RecommendationError, RecommendationService};

fn main() {
    env_logger::init();

    let title = match env::args().nth(1) {
        Some(title) => title,
        None => {
            eprintln!("usage: recommend <book title>");
            process::exit(2);
        }
    };

    let service = match RecommendationService::load(&ArtifactConfig::from_env()) {
        Ok(service) => service,
        Err(error) => {
            eprintln!("failed to load artifacts: {}", error);
            process::exit(1);
        }
    };

    match service.recommend(&title) {
        Ok(ref recommendations) if recommendations.is_empty() => {
            println!("No recommendations found for '{}'.", title);
        }
        Ok(recommendations) => {
            println!("Recommendations for '{}':", title);
            for (position, recommendation) in recommendations.iter().enumerate() {
                match recommendation.poster {
                    Some(ref poster) => println!(
                        "{}. {} | cover: {}",
                        position + 1,
                        recommendation.title,
                        poster
                    ),
                    None => println!("{}. {}", position + 1, recommendation.title),
                }
            }
        }
        Err(RecommendationError::NotFound { title }) => {
            eprintln!("Book '{}' not found in catalog.", title);
            process::exit(1);
        }
        Err(error) => {
            eprintln!("error generating recommendations: {}", error);
            process::exit(1);
        }
    }
}

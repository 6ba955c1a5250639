pub mod handler;
mod model;
pub mod page;

pub use model::{
    MOVIES_PER_PAGE, Movie, MovieDetail, MovieInput, Review, ReviewOutcome, ReviewRequest,
    ReviewWithAuthor, SearchQuery, average_rating,
};

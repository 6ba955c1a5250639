pub mod handler;
mod model;
pub mod page;

pub use model::{About, CreateNewsRequest, MAX_NEWS_PER_PAGE, NEWS_PER_PAGE, News};

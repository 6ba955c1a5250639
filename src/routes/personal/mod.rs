pub mod handler;
mod model;

pub use model::{CollectOutcome, Collection, DEFAULT_CONTEST, Photo};

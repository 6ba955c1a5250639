pub mod handler;
mod model;
pub mod page;

pub use model::{
    EventDetail, EventInput, EventStatus, EventStatusRequest, MovieEvent, Participant,
    Registration, RegistrationStatus, parse_event_date,
};

pub mod handler;
mod model;
pub mod page;

pub use model::{DashboardStats, MemberRoster};

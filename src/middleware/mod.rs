mod auth;
mod error_handler;
mod rate_limit;

pub use auth::{CurrentUser, SESSION_COOKIE, identify, session_cookie, session_removal_cookie};
pub use error_handler::log_errors;
pub use rate_limit::{RateLimiter, rate_limit};

pub mod handler;
mod model;
pub mod page;

pub use model::{
    ActivateRequest, CredentialsRequest, LoginResponse, Profile, Role, SetRoleRequest,
    UpdateProfileRequest, User, UserListItem, UserSummary, validate_password, validate_username,
};

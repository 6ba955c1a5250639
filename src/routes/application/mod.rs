pub mod handler;
mod model;
pub mod page;

pub use model::{
    ApplicationFilter, ApplicationStatus, ApplyRequest, MemberApplication, ProvisionedAccount,
    ReviewAction, ReviewApplicationRequest, ReviewOutcome,
};

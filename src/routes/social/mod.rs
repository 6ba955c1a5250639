pub mod handler;
mod model;
pub mod page;

pub use model::{
    AddFriendOutcome, CreateLogRequest, Friend, FriendIdForm, FriendNameRequest, FriendSpace,
    Friendship, Log, PublicLog, RemoveFriendOutcome,
};

pub mod user;

pub use user::{User, UserId, NOT_SET};

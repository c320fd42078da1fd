pub mod filter;
pub mod user;

pub use filter::{FilterValue, UserColumn, UserFilter};
pub use user::UserRepository;

pub mod key_builder;
pub mod user_cache;

pub use key_builder::KeyBuilder;
pub use user_cache::UserCache;

//! Redis key construction
//!
//! All keys share the configured prefix so several deployments can use one
//! Redis instance.

use crate::{models::UserId, Config};

#[derive(Debug, Clone)]
pub struct KeyBuilder {
    prefix: String,
}

impl KeyBuilder {
    /// Create a new `KeyBuilder` with the given prefix
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    /// Create `KeyBuilder` from configuration
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self::new(config.redis.key_prefix.clone())
    }

    /// Cached user record
    ///
    /// Type: String (JSON) + TTL
    #[must_use]
    pub fn user(&self, user_id: UserId) -> String {
        format!("{}user:{}", self.prefix, user_id)
    }
}

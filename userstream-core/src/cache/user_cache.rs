//! User record cache (L1: Moka in-memory, L2: Redis)
//!
//! - L1: in-process Moka cache, local to this node
//! - L2: Redis, shared with anything else reading user records by id

use redis::{aio::MultiplexedConnection, AsyncCommands, Client};
use std::sync::Arc;
use std::time::Duration;

use super::KeyBuilder;
use crate::{
    models::{User, UserId},
    Error, Result,
};

/// User cache with L1 (Moka) + L2 (Redis) strategy
#[derive(Clone)]
pub struct UserCache {
    redis_client: Option<Client>,
    l1_cache: Arc<moka::future::Cache<UserId, User>>,
    l2_ttl_seconds: u64,
    keys: KeyBuilder,
}

impl UserCache {
    /// Create a new `UserCache`
    ///
    /// # Arguments
    /// * `redis_client` - Optional Redis client. If None, only L1 caching is used.
    /// * `l1_max_capacity` - Maximum number of entries in L1 cache
    /// * `l1_ttl` - TTL for L1 cache entries
    /// * `l2_ttl_seconds` - TTL for Redis entries in seconds (0 = no expiry)
    /// * `keys` - Redis key builder
    #[must_use]
    pub fn new(
        redis_client: Option<Client>,
        l1_max_capacity: u64,
        l1_ttl: Duration,
        l2_ttl_seconds: u64,
        keys: KeyBuilder,
    ) -> Self {
        let l1_cache = moka::future::CacheBuilder::new(l1_max_capacity)
            .time_to_live(l1_ttl)
            .build();

        Self {
            redis_client,
            l1_cache: Arc::new(l1_cache),
            l2_ttl_seconds,
            keys,
        }
    }

    async fn connection(client: &Client) -> Result<MultiplexedConnection> {
        client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| Error::Internal(format!("Redis connection failed: {e}")))
    }

    /// Get a user from cache
    ///
    /// Checks L1 first, then L2. Returns None if not found in either cache.
    pub async fn get(&self, user_id: UserId) -> Result<Option<User>> {
        if let Some(user) = self.l1_cache.get(&user_id).await {
            tracing::debug!(user_id, "User cache hit (L1)");
            return Ok(Some(user));
        }

        if let Some(ref client) = self.redis_client {
            let mut conn = Self::connection(client).await?;

            let user_json: Option<String> = conn.get(self.keys.user(user_id)).await?;

            if let Some(json) = user_json {
                tracing::debug!(user_id, "User cache hit (L2)");

                let user: User = serde_json::from_str(&json).map_err(|e| {
                    Error::Internal(format!("Failed to deserialize cached user: {e}"))
                })?;

                self.l1_cache.insert(user_id, user.clone()).await;
                return Ok(Some(user));
            }
        }

        tracing::debug!(user_id, "User cache miss");
        Ok(None)
    }

    /// Store a user in both tiers, keyed by its id
    pub async fn put(&self, user: &User) -> Result<()> {
        self.l1_cache.insert(user.id, user.clone()).await;

        if let Some(ref client) = self.redis_client {
            let mut conn = Self::connection(client).await?;

            let key = self.keys.user(user.id);
            let json = serde_json::to_string(user)?;

            if self.l2_ttl_seconds > 0 {
                let _: () = conn.set_ex(&key, json, self.l2_ttl_seconds).await?;
            } else {
                let _: () = conn.set(&key, json).await?;
            }

            tracing::debug!(
                user_id = user.id,
                ttl_seconds = self.l2_ttl_seconds,
                "User cached"
            );
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::UserFixture;

    fn l1_only() -> UserCache {
        UserCache::new(
            None,
            100,
            Duration::from_secs(60),
            0,
            KeyBuilder::new("test:"),
        )
    }

    #[tokio::test]
    async fn test_put_then_get_l1() {
        let cache = l1_only();
        let user = UserFixture::new()
            .with_id(5)
            .with_name("Grace", "Hopper")
            .build();

        cache.put(&user).await.unwrap();

        assert_eq!(cache.get(5).await.unwrap(), Some(user));
        assert_eq!(cache.get(6).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_put_overwrites() {
        let cache = l1_only();
        cache.put(&UserFixture::new().with_id(1).build()).await.unwrap();

        let updated = UserFixture::new().with_id(1).with_parent(9).build();
        cache.put(&updated).await.unwrap();

        assert_eq!(cache.get(1).await.unwrap().unwrap().parent_user_id, Some(9));
    }

    #[tokio::test]
    #[ignore] // Requires Redis
    async fn test_l2_round_trip() {
        let client = Client::open("redis://127.0.0.1:6379").unwrap();
        let writer = UserCache::new(
            Some(client.clone()),
            100,
            Duration::from_secs(60),
            30,
            KeyBuilder::new("test:"),
        );
        let reader = UserCache::new(
            Some(client),
            100,
            Duration::from_secs(60),
            30,
            KeyBuilder::new("test:"),
        );
        let user = UserFixture::new().with_id(77).build();

        writer.put(&user).await.unwrap();
        assert_eq!(reader.get(77).await.unwrap(), Some(user));
    }
}

//! Construction of the store, cache and payload cipher shared by the
//! pipeline and the HTTP layer

use anyhow::{Context, Result};
use sqlx::PgPool;
use std::time::Duration;
use tracing::info;

use crate::{
    cache::{KeyBuilder, UserCache},
    repository::UserRepository,
    service::PayloadCipher,
    Config,
};

/// Services built from configuration
#[derive(Clone)]
pub struct CoreServices {
    pub user_repository: UserRepository,
    pub user_cache: UserCache,
    pub cipher: PayloadCipher,
    pub redis_client: redis::Client,
}

/// Initialize core services
///
/// Opening the Redis client does not connect; connections are made per use.
pub fn init_services(pool: PgPool, config: &Config) -> Result<CoreServices> {
    let redis_client =
        redis::Client::open(config.redis_url()).context("Failed to create Redis client")?;

    let user_cache = UserCache::new(
        Some(redis_client.clone()),
        config.redis.l1_max_capacity,
        Duration::from_secs(config.redis.l1_ttl_seconds),
        config.redis.cache_ttl_seconds,
        KeyBuilder::from_config(config),
    );

    let cipher = PayloadCipher::from_key_str(&config.encryption.key)
        .context("Failed to initialize payload cipher")?;

    info!("Core services initialized");

    Ok(CoreServices {
        user_repository: UserRepository::new(pool),
        user_cache,
        cipher,
        redis_client,
    })
}

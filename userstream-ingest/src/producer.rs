//! Work queue producer: encrypts users and appends them to the stream

use redis::streams::StreamMaxlen;
use redis::{AsyncCommands, Client as RedisClient};
use tokio::time::{timeout, Duration};
use tracing::{debug, info};

use userstream_core::{config::QueueConfig, models::User, service::PayloadCipher, Error, Result};

use crate::consumer::PAYLOAD_FIELD;

/// Timeout for Redis operations in seconds
const REDIS_TIMEOUT_SECS: u64 = 5;

pub struct QueueProducer {
    redis_client: RedisClient,
    stream_key: String,
    max_length: usize,
    cipher: PayloadCipher,
}

impl QueueProducer {
    #[must_use]
    pub fn new(redis_client: RedisClient, config: &QueueConfig, cipher: PayloadCipher) -> Self {
        Self {
            redis_client,
            stream_key: config.stream_key.clone(),
            max_length: config.max_length,
            cipher,
        }
    }

    /// Encrypt every user and append them over a single connection, in order
    pub async fn enqueue_all(&self, users: &[User]) -> Result<usize> {
        let mut conn = self.connect().await?;
        for user in users {
            self.enqueue_on(&mut conn, user).await?;
        }

        info!(count = users.len(), stream = %self.stream_key, "Users enqueued");
        Ok(users.len())
    }

    async fn connect(&self) -> Result<redis::aio::MultiplexedConnection> {
        timeout(
            Duration::from_secs(REDIS_TIMEOUT_SECS),
            self.redis_client.get_multiplexed_async_connection(),
        )
        .await
        .map_err(|_| Error::Internal("Timed out getting Redis connection".to_string()))?
        .map_err(Error::from)
    }

    async fn enqueue_on(
        &self,
        conn: &mut redis::aio::MultiplexedConnection,
        user: &User,
    ) -> Result<String> {
        let json = serde_json::to_vec(user)?;
        let payload = self.cipher.encrypt(&json)?;

        let entry_id: String = timeout(
            Duration::from_secs(REDIS_TIMEOUT_SECS),
            conn.xadd_maxlen(
                &self.stream_key,
                StreamMaxlen::Approx(self.max_length),
                "*",
                &[(PAYLOAD_FIELD, payload.as_str())],
            ),
        )
        .await
        .map_err(|_| Error::Internal("Timed out appending to queue".to_string()))??;

        debug!(user_id = user.id, entry_id = %entry_id, "User enqueued");
        Ok(entry_id)
    }
}

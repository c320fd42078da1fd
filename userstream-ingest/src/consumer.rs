//! Work queue consumer over a Redis Stream consumer group
//!
//! Entries are handed to the pipeline one at a time and acknowledged after
//! handling, whatever the outcome. A failed message is not retried. An
//! entry read but not acknowledged before a crash stays in this consumer's
//! pending list and is handled again on the next session.

use anyhow::anyhow;
use redis::aio::MultiplexedConnection;
use redis::streams::{StreamId, StreamReadOptions, StreamReadReply};
use redis::{AsyncCommands, Client as RedisClient};
use std::sync::Arc;
use tokio::time::{timeout, Duration};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use userstream_core::config::QueueConfig;

use crate::pipeline::IngestPipeline;

/// Timeout for Redis operations in seconds
const REDIS_TIMEOUT_SECS: u64 = 5;

/// Initial backoff delay for reconnection
const INITIAL_BACKOFF_SECS: u64 = 1;

/// Maximum backoff delay for reconnection
const MAX_BACKOFF_SECS: u64 = 30;

/// Stream field holding the encrypted payload
pub const PAYLOAD_FIELD: &str = "payload";

/// Read position for entries never delivered to any consumer
const NEW_ENTRIES: &str = ">";

/// Read position for this consumer's own unacknowledged entries
const PENDING_ENTRIES: &str = "0";

/// Sequential consumer feeding queue entries into an [`IngestPipeline`]
pub struct QueueConsumer {
    redis_client: RedisClient,
    stream_key: String,
    group: String,
    consumer: String,
    block_ms: usize,
    batch_size: usize,
    pipeline: Arc<IngestPipeline>,
    cancel_token: CancellationToken,
}

impl QueueConsumer {
    pub fn new(
        redis_client: RedisClient,
        config: &QueueConfig,
        pipeline: Arc<IngestPipeline>,
        cancel_token: CancellationToken,
    ) -> Self {
        let consumer = if config.consumer.is_empty() {
            default_consumer_name()
        } else {
            config.consumer.clone()
        };

        Self {
            redis_client,
            stream_key: config.stream_key.clone(),
            group: config.group.clone(),
            consumer,
            block_ms: config.block_ms,
            batch_size: config.batch_size.max(1),
            pipeline,
            cancel_token,
        }
    }

    #[must_use]
    pub fn consumer_name(&self) -> &str {
        &self.consumer
    }

    /// Consume until the cancellation token fires, reconnecting with
    /// exponential backoff whenever Redis becomes unreachable.
    pub async fn run(self) {
        info!(
            stream = %self.stream_key,
            group = %self.group,
            consumer = %self.consumer,
            "Queue consumer starting"
        );

        let mut backoff_secs = INITIAL_BACKOFF_SECS;

        loop {
            match self.run_session().await {
                SessionExit::Cancelled => {
                    info!("Queue consumer cancelled");
                    return;
                }
                SessionExit::Disconnected(e) => {
                    error!(
                        error = %e,
                        "Queue connection lost, reconnecting after {}s",
                        INITIAL_BACKOFF_SECS
                    );
                    backoff_secs = INITIAL_BACKOFF_SECS;
                }
                SessionExit::ConnectFailed(e) => {
                    error!(
                        error = %e,
                        backoff_secs = backoff_secs,
                        "Queue consumer failed to connect, retrying after backoff"
                    );
                }
            }

            tokio::select! {
                () = self.cancel_token.cancelled() => {
                    info!("Queue consumer cancelled during backoff");
                    return;
                }
                () = tokio::time::sleep(Duration::from_secs(backoff_secs)) => {}
            }

            backoff_secs = (backoff_secs * 2).min(MAX_BACKOFF_SECS);
        }
    }

    /// One connection's worth of consumption.
    ///
    /// Starts by draining this consumer's pending entries, then switches to
    /// new ones. Falls back to the pending list whenever a blocking read
    /// times out client-side, since the server may still have delivered it.
    async fn run_session(&self) -> SessionExit {
        let mut conn = match timeout(
            Duration::from_secs(REDIS_TIMEOUT_SECS),
            self.redis_client.get_multiplexed_async_connection(),
        )
        .await
        {
            Ok(Ok(conn)) => conn,
            Ok(Err(e)) => {
                return SessionExit::ConnectFailed(
                    anyhow!(e).context("Failed to get Redis connection"),
                );
            }
            Err(_) => {
                return SessionExit::ConnectFailed(anyhow!("Timed out getting Redis connection"));
            }
        };

        if let Err(e) = self.ensure_group(&mut conn).await {
            return SessionExit::ConnectFailed(e);
        }

        info!(stream = %self.stream_key, "Queue consumer connected");

        let mut cursor = PENDING_ENTRIES;

        loop {
            let opts = StreamReadOptions::default()
                .group(&self.group, &self.consumer)
                .count(self.batch_size)
                .block(self.block_ms);

            let keys = [&self.stream_key];
            let ids = [cursor];
            let read = tokio::select! {
                () = self.cancel_token.cancelled() => return SessionExit::Cancelled,
                read = conn.xread_options::<_, _, Option<StreamReadReply>>(
                    &keys,
                    &ids,
                    &opts,
                ) => read,
            };

            let entries: Vec<StreamId> = match read {
                Ok(Some(reply)) => reply.keys.into_iter().flat_map(|key| key.ids).collect(),
                Ok(None) => Vec::new(),
                Err(e) if e.is_timeout() => {
                    debug!("Queue read timed out, checking pending entries");
                    cursor = PENDING_ENTRIES;
                    continue;
                }
                Err(e) => {
                    return SessionExit::Disconnected(anyhow!(e).context("Queue read failed"));
                }
            };

            if entries.is_empty() {
                cursor = NEW_ENTRIES;
                continue;
            }

            if cursor == PENDING_ENTRIES {
                info!(count = entries.len(), "Handling pending queue entries");
            }

            for entry in entries {
                if let Err(e) = self.handle_entry(&mut conn, &entry).await {
                    return SessionExit::Disconnected(e);
                }
            }
        }
    }

    /// Create the consumer group (and the stream) if missing
    async fn ensure_group(&self, conn: &mut MultiplexedConnection) -> anyhow::Result<()> {
        let created: redis::RedisResult<()> = timeout(
            Duration::from_secs(REDIS_TIMEOUT_SECS),
            conn.xgroup_create_mkstream(&self.stream_key, &self.group, "0"),
        )
        .await
        .map_err(|_| anyhow!("Timed out creating consumer group"))?;

        match created {
            Ok(()) => {
                info!(stream = %self.stream_key, group = %self.group, "Consumer group created");
                Ok(())
            }
            Err(e) if e.code() == Some("BUSYGROUP") => Ok(()),
            Err(e) => Err(anyhow!(e).context("Failed to create consumer group")),
        }
    }

    /// Run one entry through the pipeline, then acknowledge it
    async fn handle_entry(
        &self,
        conn: &mut MultiplexedConnection,
        entry: &StreamId,
    ) -> anyhow::Result<()> {
        match entry.get::<Vec<u8>>(PAYLOAD_FIELD) {
            Some(payload) => {
                // Outcome already logged by the pipeline
                let _ = self.pipeline.handle_message(&payload).await;
            }
            None => {
                warn!(entry_id = %entry.id, "Queue entry has no payload field, dropping");
            }
        }

        let _: usize = timeout(
            Duration::from_secs(REDIS_TIMEOUT_SECS),
            conn.xack(&self.stream_key, &self.group, &[&entry.id]),
        )
        .await
        .map_err(|_| anyhow!("Timed out acknowledging queue entry"))?
        .map_err(|e| anyhow!(e).context("Failed to acknowledge queue entry"))?;

        debug!(entry_id = %entry.id, "Queue entry acknowledged");
        Ok(())
    }
}

/// How a consumer session ended, which decides the backoff that follows
enum SessionExit {
    /// Shutdown requested
    Cancelled,
    /// Connected and consuming, then the connection failed
    Disconnected(anyhow::Error),
    /// Could not connect or set up the consumer group
    ConnectFailed(anyhow::Error),
}

/// Stable per-host name, so a restarted process picks up its own pending
/// entries
fn default_consumer_name() -> String {
    let hostname = hostname::get()
        .ok()
        .and_then(|h| h.into_string().ok())
        .unwrap_or_else(|| "unknown".to_string());

    format!("userstream-{hostname}")
}

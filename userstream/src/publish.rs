//! `publish` subcommand: load users from a CSV file and enqueue them

use anyhow::{Context, Result};
use std::path::Path;
use tracing::info;

use userstream_core::{models::User, service::PayloadCipher, Config};
use userstream_ingest::{parse_users_csv, QueueProducer};

pub async fn run(config: &Config, path: &Path) -> Result<()> {
    let users = read_users(path).await?;
    info!(count = users.len(), file = %path.display(), "Loaded users");

    let redis_client =
        redis::Client::open(config.redis_url()).context("Failed to create Redis client")?;
    let cipher = PayloadCipher::from_key_str(&config.encryption.key)
        .context("Failed to initialize payload cipher")?;

    let producer = QueueProducer::new(redis_client, &config.queue, cipher);
    let count = producer
        .enqueue_all(&users)
        .await
        .context("Failed to enqueue users")?;

    info!(count, stream = %config.queue.stream_key, "Publish complete");
    Ok(())
}

async fn read_users(path: &Path) -> Result<Vec<User>> {
    let data = tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    parse_users_csv(&data).with_context(|| format!("Invalid user file {}", path.display()))
}

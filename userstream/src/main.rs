mod publish;
mod server;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};

use userstream_core::{
    bootstrap::{init_database, init_services, load_config},
    logging, Config,
};
use userstream_hub::SubscriberRegistry;

use server::UserStreamServer;

#[derive(Parser, Debug)]
#[command(name = "userstream")]
#[command(about = "Queue-to-browser user record fan-out service", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Consume the work queue and serve the HTTP API (default)
    Serve,
    /// Encrypt users from a CSV file and append them to the work queue
    Publish {
        /// Path to a CSV file with an `id` column and optional user columns
        #[arg(long, short)]
        file: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // 1. Load and validate configuration
    let config = load_config()?;

    // 2. Initialize logging
    logging::init_logging(&config.logging)?;

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(config).await,
        Command::Publish { file } => publish::run(&config, &file).await,
    }
}

async fn serve(config: Config) -> Result<()> {
    info!("userstream server starting...");
    info!("HTTP address: {}", config.http_address());
    info!(
        stream = %config.queue.stream_key,
        group = %config.queue.group,
        "Work queue"
    );

    // 3. Initialize database
    let pool = init_database(&config).await?;

    // 4. Run migrations
    info!("Running database migrations...");
    sqlx::migrate!("../migrations")
        .run(&pool)
        .await
        .map_err(|e| {
            error!("Failed to run migrations: {}", e);
            anyhow::anyhow!("Migration failed: {e}")
        })?;
    info!("Migrations completed");

    // 5. Initialize store, cache and cipher
    let services = init_services(pool.clone(), &config)?;

    // 6. One registry shared by the pipeline and every stream connection
    let registry = Arc::new(SubscriberRegistry::new(config.streaming.subscriber_buffer));
    info!(
        subscriber_buffer = registry.capacity(),
        "Subscriber registry initialized"
    );

    UserStreamServer::new(config, pool, services, registry)
        .start()
        .await
}

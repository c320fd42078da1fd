//! Server lifecycle management
//!
//! Runs the queue consumer and the HTTP server side by side and shuts both
//! down on SIGINT/SIGTERM.

use anyhow::Context;
use sqlx::PgPool;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use userstream_api::AppState;
use userstream_core::{bootstrap::CoreServices, models::User, Config};
use userstream_hub::{BroadcastDispatcher, SubscriberRegistry};
use userstream_ingest::{IngestPipeline, QueueConsumer, QueueProducer};

/// How long each component gets to stop before it is aborted
const DRAIN_TIMEOUT: Duration = Duration::from_secs(30);

pub struct UserStreamServer {
    config: Config,
    pool: PgPool,
    services: CoreServices,
    registry: Arc<SubscriberRegistry<User>>,
}

impl UserStreamServer {
    pub const fn new(
        config: Config,
        pool: PgPool,
        services: CoreServices,
        registry: Arc<SubscriberRegistry<User>>,
    ) -> Self {
        Self {
            config,
            pool,
            services,
            registry,
        }
    }

    /// Start all components and run until a shutdown signal arrives or a
    /// component stops on its own.
    pub async fn start(self) -> anyhow::Result<()> {
        let consumer_token = CancellationToken::new();
        let http_token = CancellationToken::new();

        // Bind first so a bad address fails startup instead of a background task
        let listener = self.bind_http().await?;

        let mut consumer = self.spawn_queue_consumer(consumer_token.clone());
        let mut http = self.spawn_http_server(listener, http_token.clone());

        info!("All components started successfully");

        tokio::select! {
            _ = &mut consumer => error!("Queue consumer stopped unexpectedly"),
            _ = &mut http => error!("HTTP server stopped unexpectedly"),
            () = shutdown_signal() => info!("Shutdown signal received, starting graceful shutdown..."),
        }

        // Nothing new is broadcast once the consumer is gone
        consumer_token.cancel();
        drain("Queue consumer", &mut consumer).await;

        // Open event streams would otherwise hold the graceful shutdown forever.
        // Closing first also ends streams opened on connections still draining.
        let closed = self.registry.close();
        info!(subscribers = closed, "Live event streams closed");
        http_token.cancel();
        drain("HTTP server", &mut http).await;

        self.pool.close().await;
        info!("Database pool closed, userstream server stopped");

        Ok(())
    }

    async fn bind_http(&self) -> anyhow::Result<TcpListener> {
        let address = self.config.http_address();
        let addr: SocketAddr = address
            .parse()
            .with_context(|| format!("Invalid HTTP address '{address}'"))?;

        let listener = TcpListener::bind(addr)
            .await
            .with_context(|| format!("Failed to bind HTTP address {addr}"))?;

        info!("HTTP server listening on {}", addr);
        Ok(listener)
    }

    fn spawn_queue_consumer(&self, cancel_token: CancellationToken) -> JoinHandle<()> {
        let dispatcher = BroadcastDispatcher::new(Arc::clone(&self.registry));
        let pipeline = Arc::new(IngestPipeline::from_services(&self.services, dispatcher));

        let consumer = QueueConsumer::new(
            self.services.redis_client.clone(),
            &self.config.queue,
            pipeline,
            cancel_token,
        );

        tokio::spawn(consumer.run())
    }

    fn spawn_http_server(
        &self,
        listener: TcpListener,
        cancel_token: CancellationToken,
    ) -> JoinHandle<()> {
        let keep_alive_seconds = self.config.streaming.keep_alive_seconds;
        let producer = QueueProducer::new(
            self.services.redis_client.clone(),
            &self.config.queue,
            self.services.cipher.clone(),
        );
        let router = userstream_api::create_router(AppState {
            user_repository: self.services.user_repository.clone(),
            user_cache: self.services.user_cache.clone(),
            registry: Arc::clone(&self.registry),
            producer: Arc::new(producer),
            keep_alive: (keep_alive_seconds > 0).then(|| Duration::from_secs(keep_alive_seconds)),
        });

        tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, router)
                .with_graceful_shutdown(cancel_token.cancelled_owned())
                .await
            {
                error!("HTTP server error: {}", e);
            }
            info!("HTTP server shut down gracefully");
        })
    }
}

/// Wait up to `DRAIN_TIMEOUT` for a component task, aborting it after that
async fn drain(name: &str, handle: &mut JoinHandle<()>) {
    if handle.is_finished() {
        return;
    }
    if tokio::time::timeout(DRAIN_TIMEOUT, &mut *handle).await.is_err() {
        warn!(component = name, "Did not stop in time, aborting");
        handle.abort();
    }
}

/// Resolves on SIGINT (Ctrl+C) or, on Unix, SIGTERM
async fn shutdown_signal() {
    let interrupt = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
        info!("Received Ctrl+C signal");
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
                info!("Received SIGTERM signal");
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = interrupt => {}
        () = terminate => {}
    }
}

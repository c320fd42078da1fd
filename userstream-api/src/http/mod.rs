// HTTP/JSON API module

pub mod error;
pub mod health;
pub mod stream;
pub mod upload;
pub mod users;

use axum::Router;
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use userstream_core::{cache::UserCache, models::User, repository::UserRepository};
use userstream_hub::SubscriberRegistry;
use userstream_ingest::QueueProducer;

pub use error::{AppError, AppResult};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub user_repository: UserRepository,
    pub user_cache: UserCache,
    /// The same registry the ingest pipeline broadcasts into
    pub registry: Arc<SubscriberRegistry<User>>,
    /// Writes uploaded users to the work queue
    pub producer: Arc<QueueProducer>,
    /// Keep-alive comment interval on event streams; `None` disables it
    pub keep_alive: Option<Duration>,
}

/// Create the HTTP router with all routes
pub fn create_router(state: AppState) -> Router {
    let router = Router::new()
        .merge(health::create_health_router())
        .merge(users::create_users_router())
        .merge(upload::create_upload_router());

    // Apply layers before state; the browser UI is served from another origin
    let router = router
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http());

    router.with_state(state)
}

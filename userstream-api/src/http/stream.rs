//! Live user event stream (Server-Sent Events)
//!
//! Each connection registers a subscriber and relays every broadcast user
//! as one `data: <json>` event. The subscriber is unregistered when the
//! response body is dropped: client disconnect, write failure, or the
//! stream ending after the dispatcher evicted it. Records still buffered
//! at that point are discarded.

use axum::{
    extract::State,
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse,
    },
};
use futures::Stream;
use std::convert::Infallible;
use std::pin::Pin;
use std::task::{Context, Poll};
use tracing::{debug, info, warn};

use userstream_core::models::User;
use userstream_hub::SubscriberHandle;

use super::AppState;

/// GET /users/stream
pub async fn user_stream(State(state): State<AppState>) -> impl IntoResponse {
    let handle = state.registry.register();
    info!(subscriber_id = handle.id(), "Event stream opened");

    let sse = Sse::new(UserEventStream { handle });
    if let Some(interval) = state.keep_alive {
        return sse
            .keep_alive(KeepAlive::new().interval(interval))
            .into_response();
    }
    sse.into_response()
}

/// Adapts a subscriber handle into SSE events
struct UserEventStream {
    handle: SubscriberHandle<User>,
}

impl Stream for UserEventStream {
    type Item = Result<Event, Infallible>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        loop {
            match Pin::new(&mut self.handle).poll_next(cx) {
                Poll::Ready(Some(user)) => match Event::default().json_data(&user) {
                    Ok(event) => return Poll::Ready(Some(Ok(event))),
                    Err(e) => {
                        warn!(user_id = user.id, error = %e, "Failed to encode user event");
                    }
                },
                Poll::Ready(None) => {
                    debug!(subscriber_id = self.handle.id(), "Subscriber queue closed");
                    return Poll::Ready(None);
                }
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}

impl Drop for UserEventStream {
    fn drop(&mut self) {
        info!(subscriber_id = self.handle.id(), "Event stream closed");
    }
}

//! HTTP surface for userstream: health, user lookups, CSV upload and the live event stream

pub mod http;

pub use http::{create_router, AppState};

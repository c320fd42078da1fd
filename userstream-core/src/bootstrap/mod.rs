//! Bootstrap module for initializing the userstream service
//!
//! This module handles:
//! - Configuration loading
//! - Database initialization
//! - Construction of the store, cache and payload cipher

pub mod config;
pub mod database;
pub mod services;

pub use config::load_config;
pub use database::init_database;
pub use services::{init_services, CoreServices};

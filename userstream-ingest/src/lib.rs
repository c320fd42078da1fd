//! Queue ingestion for userstream
//!
//! [`QueueConsumer`] reads encrypted user records from a Redis Stream and
//! feeds them one at a time into an [`IngestPipeline`], which broadcasts,
//! persists and caches each record. [`QueueProducer`] is the writing side,
//! fed from user CSV files via [`parse_users_csv`].

pub mod consumer;
pub mod csv_import;
pub mod error;
pub mod pipeline;
pub mod producer;
pub mod sink;

pub use consumer::QueueConsumer;
pub use csv_import::parse_users_csv;
pub use error::IngestError;
pub use pipeline::IngestPipeline;
pub use producer::QueueProducer;
pub use sink::{PayloadDecryptor, RecordCache, RecordStore};

//! Collaborators the pipeline calls through
//!
//! Production implementations are the core crate's repository, cache and
//! cipher. Tests substitute in-memory doubles.

use async_trait::async_trait;

use userstream_core::{
    cache::UserCache, models::User, repository::UserRepository, service::PayloadCipher, Result,
};

/// Durable store for ingested users
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn insert(&self, user: &User) -> Result<()>;
}

/// Fast lookup cache keyed by user id
#[async_trait]
pub trait RecordCache: Send + Sync {
    async fn put(&self, user: &User) -> Result<()>;
}

/// Turns a raw queue payload into plaintext
pub trait PayloadDecryptor: Send + Sync {
    fn decrypt(&self, raw: &[u8]) -> Result<Vec<u8>>;
}

#[async_trait]
impl RecordStore for UserRepository {
    async fn insert(&self, user: &User) -> Result<()> {
        Self::insert(self, user).await
    }
}

#[async_trait]
impl RecordCache for UserCache {
    async fn put(&self, user: &User) -> Result<()> {
        Self::put(self, user).await
    }
}

impl PayloadDecryptor for PayloadCipher {
    fn decrypt(&self, raw: &[u8]) -> Result<Vec<u8>> {
        Self::decrypt(self, raw)
    }
}

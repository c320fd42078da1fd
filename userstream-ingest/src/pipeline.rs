//! Per-message processing: decrypt, decode, broadcast, persist, cache
//!
//! Broadcast runs before persistence so live subscribers see a record as
//! soon as it is decoded. Each later stage only runs if the previous one
//! succeeded; a record that fails to persist is never cached.

use std::sync::Arc;
use tracing::{debug, error, info, warn};

use userstream_core::{bootstrap::CoreServices, models::User};
use userstream_hub::BroadcastDispatcher;

use crate::error::IngestError;
use crate::sink::{PayloadDecryptor, RecordCache, RecordStore};

/// Drives one queue message through every stage.
///
/// Callers invoke `handle_message` sequentially; the pipeline itself holds
/// no per-message state.
#[derive(Clone)]
pub struct IngestPipeline {
    decryptor: Arc<dyn PayloadDecryptor>,
    store: Arc<dyn RecordStore>,
    cache: Arc<dyn RecordCache>,
    dispatcher: BroadcastDispatcher<User>,
}

impl IngestPipeline {
    pub fn new(
        decryptor: Arc<dyn PayloadDecryptor>,
        store: Arc<dyn RecordStore>,
        cache: Arc<dyn RecordCache>,
        dispatcher: BroadcastDispatcher<User>,
    ) -> Self {
        Self {
            decryptor,
            store,
            cache,
            dispatcher,
        }
    }

    /// Build a pipeline backed by the production store, cache and cipher
    #[must_use]
    pub fn from_services(services: &CoreServices, dispatcher: BroadcastDispatcher<User>) -> Self {
        Self::new(
            Arc::new(services.cipher.clone()),
            Arc::new(services.user_repository.clone()),
            Arc::new(services.user_cache.clone()),
            dispatcher,
        )
    }

    /// Process one raw queue payload.
    ///
    /// The outcome is logged here; callers that only need the side effects
    /// may ignore the result.
    pub async fn handle_message(&self, raw: &[u8]) -> Result<User, IngestError> {
        let result = self.process(raw).await;

        match &result {
            Ok(user) => info!(user_id = user.id, "User ingested"),
            Err(e @ (IngestError::Decrypt(_) | IngestError::Decode(_))) => {
                warn!(stage = e.stage(), error = %e, "Dropping queue message");
            }
            Err(e @ IngestError::Persist { user_id, .. }) => {
                error!(stage = e.stage(), user_id, error = %e, "Failed to persist user");
            }
            Err(e @ IngestError::Cache { user_id, .. }) => {
                warn!(stage = e.stage(), user_id, error = %e, "Failed to cache user");
            }
        }

        result
    }

    async fn process(&self, raw: &[u8]) -> Result<User, IngestError> {
        let plaintext = self.decryptor.decrypt(raw).map_err(IngestError::Decrypt)?;
        let user = User::from_json(&plaintext).map_err(IngestError::Decode)?;

        let report = self.dispatcher.publish(&user);
        debug!(
            user_id = user.id,
            delivered = report.delivered,
            evicted = report.evicted,
            "User broadcast"
        );

        self.store
            .insert(&user)
            .await
            .map_err(|source| IngestError::Persist {
                user_id: user.id,
                source,
            })?;

        self.cache
            .put(&user)
            .await
            .map_err(|source| IngestError::Cache {
                user_id: user.id,
                source,
            })?;

        Ok(user)
    }
}

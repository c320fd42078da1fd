use thiserror::Error;
use userstream_core::models::UserId;

/// Stage at which one queue message was abandoned
#[derive(Error, Debug)]
pub enum IngestError {
    #[error("Decrypt failure: {0}")]
    Decrypt(#[source] userstream_core::Error),

    #[error("Decode failure: {0}")]
    Decode(#[source] serde_json::Error),

    #[error("Persist failure for user {user_id}: {source}")]
    Persist {
        user_id: UserId,
        #[source]
        source: userstream_core::Error,
    },

    #[error("Cache failure for user {user_id}: {source}")]
    Cache {
        user_id: UserId,
        #[source]
        source: userstream_core::Error,
    },
}

impl IngestError {
    #[must_use]
    pub const fn stage(&self) -> &'static str {
        match self {
            Self::Decrypt(_) => "decrypt",
            Self::Decode(_) => "decode",
            Self::Persist { .. } => "persist",
            Self::Cache { .. } => "cache",
        }
    }

    /// Id of the record, once it got far enough to have one
    #[must_use]
    pub const fn user_id(&self) -> Option<UserId> {
        match self {
            Self::Decrypt(_) | Self::Decode(_) => None,
            Self::Persist { user_id, .. } | Self::Cache { user_id, .. } => Some(*user_id),
        }
    }
}

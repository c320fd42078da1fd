//! User record carried from the work queue to the store, cache and live subscribers

use serde::{Deserialize, Serialize};

/// User identity
pub type UserId = i64;

/// Sentinel stored in `deleted_at` / `merged_at` when the event never happened
pub const NOT_SET: i64 = -1;

/// A user record as produced upstream and rendered by the browser UI.
///
/// Timestamps are epoch milliseconds. Producers emit them as strings, so
/// decoding accepts either form and encoding always writes strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    #[serde(deserialize_with = "lenient_i64::deserialize")]
    pub id: UserId,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub email_address: String,
    #[serde(with = "lenient_i64", default)]
    pub created_at: i64,
    #[serde(with = "lenient_i64", default = "not_set")]
    pub deleted_at: i64,
    #[serde(with = "lenient_i64", default = "not_set")]
    pub merged_at: i64,
    #[serde(deserialize_with = "lenient_i64::deserialize_option", default)]
    pub parent_user_id: Option<UserId>,
}

const fn not_set() -> i64 {
    NOT_SET
}

impl User {
    /// Create a user with only an identity; other fields empty or unset
    #[must_use]
    pub fn new(id: UserId) -> Self {
        Self {
            id,
            first_name: String::new(),
            last_name: String::new(),
            email_address: String::new(),
            created_at: 0,
            deleted_at: NOT_SET,
            merged_at: NOT_SET,
            parent_user_id: None,
        }
    }

    /// Decode a user from a JSON payload
    pub fn from_json(payload: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(payload)
    }

    #[must_use]
    pub const fn is_deleted(&self) -> bool {
        self.deleted_at != NOT_SET
    }

    #[must_use]
    pub const fn is_merged(&self) -> bool {
        self.merged_at != NOT_SET
    }
}

/// Integers that may arrive as JSON numbers or numeric strings.
mod lenient_i64 {
    use serde::{de, Deserialize, Deserializer, Serializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Int(i64),
        Str(String),
    }

    fn parse<E: de::Error>(s: &str) -> Result<i64, E> {
        s.trim()
            .parse::<i64>()
            .map_err(|_| E::custom(format!("expected an integer, got {s:?}")))
    }

    pub fn serialize<S: Serializer>(value: &i64, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(value)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
        match Raw::deserialize(deserializer)? {
            Raw::Int(i) => Ok(i),
            Raw::Str(s) => parse(&s),
        }
    }

    pub fn deserialize_option<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<i64>, D::Error> {
        match Option::<Raw>::deserialize(deserializer)? {
            None => Ok(None),
            Some(Raw::Int(i)) => Ok(Some(i)),
            Some(Raw::Str(s)) if s.trim().is_empty() => Ok(None),
            Some(Raw::Str(s)) => parse(&s).map(Some),
        }
    }
}

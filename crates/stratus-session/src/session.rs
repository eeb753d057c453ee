//! The per-visitor session record.

use std::time::Duration;

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use chrono::{DateTime, Utc};
use rand::RngCore;
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::{Map, Value};

/// Opaque keyed state for one browser identity.
///
/// Values are stored as JSON so that backends never need to know what a
/// session holds; typed access goes through [`Session::get`] and
/// [`Session::insert`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    id: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    #[serde(default)]
    values: Map<String, Value>,
}

impl Session {
    /// Create an empty session with a fresh random id.
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            id: generate_session_id(),
            created_at: now,
            updated_at: now,
            values: Map::new(),
        }
    }

    /// Unique session key.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// When the session was first created.
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// When the session was last written.
    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Read a typed value. Missing keys and values of the wrong shape are `None`.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.values
            .get(key)
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }

    /// Store a typed value, replacing any previous value under `key`.
    pub fn insert<T: Serialize>(&mut self, key: &str, value: &T) -> crate::Result<()> {
        let value = serde_json::to_value(value)?;
        self.values.insert(key.to_string(), value);
        Ok(())
    }

    /// Remove a value, returning whether it was present.
    pub fn remove(&mut self, key: &str) -> bool {
        self.values.remove(key).is_some()
    }

    /// Whether a value exists under `key`.
    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// Check the session against a maximum age, measured from its last write.
    pub fn is_expired(&self, max_age: Duration, now: DateTime<Utc>) -> bool {
        let Ok(max_age) = chrono::Duration::from_std(max_age) else {
            return false;
        };
        now - self.updated_at > max_age
    }

    /// Stamp the session as written now. Backends call this before persisting.
    pub(crate) fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    /// Serialize into the wire form persisted by backends.
    pub(crate) fn to_bytes(&self) -> crate::Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Parse the wire form persisted by backends.
    pub(crate) fn from_bytes(bytes: &[u8]) -> crate::Result<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }

    #[cfg(test)]
    pub(crate) fn set_updated_at(&mut self, ts: DateTime<Utc>) {
        self.updated_at = ts;
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

/// 32 random bytes, URL-safe base64 without padding.
fn generate_session_id() -> String {
    let mut bytes = [0u8; 32];
    rand::rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Whether `id` could have been produced by [`generate_session_id`].
///
/// Backends that derive file names or keys from ids refuse anything else.
pub(crate) fn is_well_formed_id(id: &str) -> bool {
    id.len() == 43
        && id
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
}

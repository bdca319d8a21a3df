use std::collections::HashMap;

use base64::{engine::general_purpose, Engine as _};
use ed25519_dalek::{VerifyingKey, PUBLIC_KEY_LENGTH};

use crate::error::{Result, UpdaterError};

/// Trusted manifest signing keys indexed by key id.
///
/// The keyring is provisioned by the host application and treated as an
/// opaque input; this crate never generates or stores keys.
#[derive(Debug, Clone, Default)]
pub struct Keyring {
    keys: HashMap<String, VerifyingKey>,
}

impl Keyring {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a key, replacing any previous key with the same id.
    pub fn insert(&mut self, key_id: impl Into<String>, key: VerifyingKey) -> Option<VerifyingKey> {
        self.keys.insert(key_id.into(), key)
    }

    pub fn get(&self, key_id: &str) -> Option<&VerifyingKey> {
        self.keys.get(key_id)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Build a keyring from `key id -> standard base64 public key` pairs.
    ///
    /// Keys that are not 32 bytes, are not valid curve points, or are of small
    /// order are refused.
    pub fn from_encoded<I, K, V>(entries: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: AsRef<str>,
    {
        let mut keyring = Self::new();
        for (key_id, encoded) in entries {
            let key_id = key_id.into();
            let key = decode_key(&key_id, encoded.as_ref())?;
            keyring.insert(key_id, key);
        }
        Ok(keyring)
    }

    /// Build a keyring from a JSON object mapping key ids to base64 keys,
    /// e.g. `{"prod-2026-01": "base64..."}`.
    pub fn from_json(bytes: &[u8]) -> Result<Self> {
        let entries: HashMap<String, String> =
            serde_json::from_slice(bytes).map_err(|err| UpdaterError::KeyringConfig {
                reason: err.to_string(),
            })?;
        Self::from_encoded(entries)
    }
}

impl FromIterator<(String, VerifyingKey)> for Keyring {
    fn from_iter<T: IntoIterator<Item = (String, VerifyingKey)>>(iter: T) -> Self {
        Self {
            keys: iter.into_iter().collect(),
        }
    }
}

fn decode_key(key_id: &str, encoded: &str) -> Result<VerifyingKey> {
    let invalid = |reason: String| UpdaterError::KeyringConfig {
        reason: format!("entry `{key_id}`: {reason}"),
    };

    let raw = general_purpose::STANDARD
        .decode(encoded.trim())
        .map_err(|err| invalid(format!("malformed base64: {err}")))?;
    let bytes: [u8; PUBLIC_KEY_LENGTH] = raw
        .try_into()
        .map_err(|raw: Vec<u8>| invalid(format!("expected 32 bytes, got {}", raw.len())))?;
    let key = VerifyingKey::from_bytes(&bytes)
        .map_err(|_| invalid("not a valid Ed25519 public key".to_owned()))?;
    if key.is_weak() {
        return Err(invalid("weak Ed25519 public key".to_owned()));
    }
    Ok(key)
}

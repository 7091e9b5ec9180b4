//! Session state and its encrypted cookie codec.
//!
//! Wire form of a token: `base64std(nonce[12] || ciphertext || tag[16])`,
//! sealed with AES-256-GCM. The plaintext is the JSON object
//! `{"ttl": <RFC 3339>, "policies": [..]}` with that field order.
//!
//! The codec never checks expiry; that is the caller's policy decision
//! (see [`Session::is_expired`]).

use aes_gcm::aead::{Aead, KeyInit, Nonce};
use aes_gcm::Aes256Gcm;
use base64::{engine::general_purpose::STANDARD, Engine};
use chrono::{DateTime, Duration, Utc};
use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};

use crate::acl::PolicySet;
use crate::error::{AuthGateError, Result};

/// AES-GCM nonce length in bytes.
pub const NONCE_LEN: usize = 12;
/// AES-256 key length in bytes.
pub const KEY_LEN: usize = 32;

/// Decrypted session state carried by the cookie.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// Absolute expiry. Declared first: field order is part of the wire form.
    pub ttl: DateTime<Utc>,
    /// Policies granted by the identity backend. `null` decodes as empty.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub policies: Vec<String>,
}

fn null_as_empty<'de, D>(de: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<Vec<String>>::deserialize(de)?.unwrap_or_default())
}

impl Session {
    pub fn new(policies: Vec<String>, ttl: DateTime<Utc>) -> Self {
        Self { ttl, policies }
    }

    /// Session valid for `lifetime` starting at `now`.
    pub fn issue(policies: Vec<String>, lifetime: Duration, now: DateTime<Utc>) -> Self {
        Self::new(policies, now + lifetime)
    }

    /// Inclusive boundary: a session whose ttl equals `now` is expired.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.ttl
    }

    /// `ExpiredSession` once `now` reaches the ttl.
    pub fn ensure_fresh(&self, now: DateTime<Utc>) -> Result<()> {
        if self.is_expired(now) {
            return Err(AuthGateError::ExpiredSession);
        }
        Ok(())
    }

    /// Policies as a set (duplicates collapse here, not at storage time).
    pub fn policy_set(&self) -> PolicySet {
        self.policies.iter().cloned().collect()
    }
}

/// Encrypts sessions into tokens and back.
///
/// Holds only the cipher; safe to share across threads and call concurrently.
#[derive(Clone)]
pub struct SessionCodec {
    cipher: Aes256Gcm,
}

impl std::fmt::Debug for SessionCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionCodec").finish_non_exhaustive()
    }
}

impl SessionCodec {
    /// Build a codec from a raw 256-bit key.
    pub fn new(key: &[u8]) -> Result<Self> {
        if key.len() != KEY_LEN {
            return Err(AuthGateError::config(format!(
                "cookie encryption key must be {KEY_LEN} bytes, got {}",
                key.len()
            )));
        }
        let cipher = Aes256Gcm::new_from_slice(key)
            .map_err(|_| AuthGateError::config("cookie encryption key rejected"))?;
        Ok(Self { cipher })
    }

    /// Seal a session under a fresh random nonce.
    pub fn encode(&self, session: &Session) -> Result<String> {
        let plaintext = serde_json::to_vec(session)
            .map_err(|e| AuthGateError::Internal(format!("session serialize failed: {e}")))?;

        let mut nonce = [0u8; NONCE_LEN];
        OsRng.fill_bytes(&mut nonce);

        let sealed = self
            .cipher
            .encrypt(Nonce::<Aes256Gcm>::from_slice(&nonce), plaintext.as_slice())
            .map_err(|_| AuthGateError::Internal("session encrypt failed".into()))?;

        let mut out = Vec::with_capacity(NONCE_LEN + sealed.len());
        out.extend_from_slice(&nonce);
        out.extend_from_slice(&sealed);
        Ok(STANDARD.encode(out))
    }

    /// Open and parse a token. Does not check expiry.
    pub fn decode(&self, token: &str) -> Result<Session> {
        let raw = STANDARD
            .decode(token)
            .map_err(|e| AuthGateError::Decode(e.to_string()))?;

        if raw.len() <= NONCE_LEN {
            return Err(AuthGateError::MalformedToken("token shorter than nonce"));
        }
        let (nonce, ciphertext) = raw.split_at(NONCE_LEN);
        if nonce.iter().all(|b| *b == 0) {
            return Err(AuthGateError::MalformedToken("zero nonce"));
        }
        if ciphertext.is_empty() {
            return Err(AuthGateError::MalformedToken("ciphertext missing"));
        }

        let plaintext = self
            .cipher
            .decrypt(Nonce::<Aes256Gcm>::from_slice(nonce), ciphertext)
            .map_err(|_| AuthGateError::Authentication)?;

        serde_json::from_slice(&plaintext).map_err(|e| AuthGateError::Deserialize(e.to_string()))
    }
}

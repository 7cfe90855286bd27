//! Credential handling for provider records
//!
//! Two concerns live here:
//! - `SecretString`, a wrapper that keeps credentials out of Display/Debug
//!   output and log lines.
//! - The reversible transport encoding used when credentials cross a
//!   process boundary (settings export, legacy import). The encoding is
//!   base64 and is NOT confidentiality protection; durable secret storage
//!   belongs to an external secret store.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A wrapper type for sensitive strings like API keys
#[derive(Clone, Default, Deserialize, Serialize)]
#[serde(transparent)]
pub struct SecretString {
    value: String,
}

impl SecretString {
    /// Create a new secret string
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
        }
    }

    /// Get the actual value (use with caution)
    pub fn expose_secret(&self) -> &str {
        &self.value
    }

    /// Check if the secret is empty
    pub fn is_empty(&self) -> bool {
        self.value.is_empty()
    }

    /// Get a partially redacted version for debugging
    pub fn partial_redact(&self) -> String {
        if self.value.is_empty() {
            return "[EMPTY]".to_string();
        }

        let len = self.value.len();
        if len <= 8 {
            // Very short secrets get fully redacted
            "[REDACTED]".to_string()
        } else if self.value.starts_with("sk-") || self.value.starts_with("pk-") {
            // API keys with prefixes
            format!("{}...{}", &self.value[..3], &self.value[len - 4..])
        } else {
            format!(
                "{}...{}",
                &self.value[..2.min(len)],
                &self.value[len.saturating_sub(2)..]
            )
        }
    }

    /// Encode for transport using the reversible non-secret encoding
    pub fn encode_for_transport(&self) -> String {
        encode_credential(&self.value)
    }

    /// Decode a transport-encoded credential
    pub fn decode_from_transport(encoded: &str) -> Result<Self, CredentialCodecError> {
        decode_credential(encoded).map(Self::new)
    }
}

impl fmt::Debug for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[REDACTED]")
    }
}

impl fmt::Display for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[REDACTED]")
    }
}

impl PartialEq for SecretString {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
    }
}

impl From<String> for SecretString {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl From<&str> for SecretString {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Error decoding a transport-encoded credential
#[derive(Debug, thiserror::Error)]
#[error("invalid credential encoding: {message}")]
pub struct CredentialCodecError {
    pub message: String,
}

/// Encode a credential with the reversible transport encoding.
///
/// Base64 only. Anyone holding the encoded form holds the credential.
pub fn encode_credential(raw: &str) -> String {
    BASE64.encode(raw.as_bytes())
}

/// Decode a transport-encoded credential
pub fn decode_credential(encoded: &str) -> Result<String, CredentialCodecError> {
    let bytes = BASE64
        .decode(encoded.as_bytes())
        .map_err(|e| CredentialCodecError {
            message: e.to_string(),
        })?;
    String::from_utf8(bytes).map_err(|e| CredentialCodecError {
        message: e.to_string(),
    })
}

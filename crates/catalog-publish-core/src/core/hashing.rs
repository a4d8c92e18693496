// crates/catalog-publish-core/src/core/hashing.rs
// ============================================================================
// Module: Catalog Publish Snapshot Hashing
// Description: RFC 8785 canonical digests for external sync payloads.
// Purpose: Detect unchanged registry payloads without relying on key order.
// Dependencies: serde, serde_jcs, sha2
// ============================================================================

//! ## Overview
//! External sync snapshots are compared by the SHA-256 digest of their RFC 8785
//! canonical JSON form. Structurally equal payloads always hash identically,
//! independent of map ordering or whitespace, so a digest match is exactly the
//! "byte-for-byte identical payload" test used for no-op detection.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;
use sha2::Digest;
use sha2::Sha256;
use thiserror::Error;

// ============================================================================
// SECTION: Hash Algorithm
// ============================================================================

/// Supported digest algorithms for sync snapshots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HashAlgorithm {
    /// SHA-256 hashing.
    Sha256,
}

impl HashAlgorithm {
    /// Returns the stable label persisted next to digests.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Sha256 => "sha256",
        }
    }

    /// Parses a persisted algorithm label.
    #[must_use]
    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            "sha256" => Some(Self::Sha256),
            _ => None,
        }
    }
}

/// Algorithm used for every new snapshot digest.
pub const DEFAULT_HASH_ALGORITHM: HashAlgorithm = HashAlgorithm::Sha256;

// ============================================================================
// SECTION: Snapshot Digest
// ============================================================================

/// Content digest of a synced registry payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotDigest {
    /// Digest algorithm.
    pub algorithm: HashAlgorithm,
    /// Lowercase hex-encoded digest bytes.
    pub value: String,
}

impl SnapshotDigest {
    /// Computes the canonical digest of a serializable payload.
    ///
    /// # Errors
    ///
    /// Returns [`HashError::Canonicalization`] when the payload cannot be
    /// serialized as canonical JSON.
    pub fn of<T: Serialize + ?Sized>(
        algorithm: HashAlgorithm,
        payload: &T,
    ) -> Result<Self, HashError> {
        let bytes = canonical_json_bytes(payload)?;
        let value = match algorithm {
            HashAlgorithm::Sha256 => hex_encode(&Sha256::digest(&bytes)),
        };
        Ok(Self {
            algorithm,
            value,
        })
    }

    /// Returns true when `self` describes the same content as `other`.
    ///
    /// Digests from different algorithms never match.
    #[must_use]
    pub fn matches(&self, other: &Self) -> bool {
        self.algorithm == other.algorithm && self.value == other.value
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors raised when computing canonical digests.
#[derive(Debug, Error)]
pub enum HashError {
    /// JSON canonicalization failed.
    #[error("failed to canonicalize json: {0}")]
    Canonicalization(String),
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Returns canonical JSON bytes for a serializable value using RFC 8785.
///
/// # Errors
///
/// Returns [`HashError::Canonicalization`] when serialization fails.
pub fn canonical_json_bytes<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>, HashError> {
    serde_jcs::to_vec(value).map_err(|err| HashError::Canonicalization(err.to_string()))
}

/// Encodes bytes as a lowercase hex string.
fn hex_encode(bytes: &[u8]) -> String {
    const HEX: &[u8; 16] = b"0123456789abcdef";
    let mut out = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        out.push(HEX[usize::from(byte >> 4)] as char);
        out.push(HEX[usize::from(byte & 0x0f)] as char);
    }
    out
}

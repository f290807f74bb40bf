//! Fold pointer: a hash-chained cursor into an action log.
//!
//! A [`FoldPointer`] names a prefix of an action log by its length and a
//! running SHA-256 digest over every entry in that prefix. Each stored entry
//! carries the pointer *after* it, so a reader can check a segment link by link
//! with [`verify_segment`] before trusting any of it.
//!
//! ```
//! use soulbound_core::event::SerializedEvent;
//! use soulbound_core::pointer::FoldPointer;
//!
//! let entry = SerializedEvent::new("Example.v1".to_string(), vec![1, 2, 3], None);
//! let next = FoldPointer::EMPTY.advance(&entry);
//!
//! assert_eq!(next.position(), 1);
//! assert_ne!(next, FoldPointer::EMPTY);
//! assert_eq!(next, FoldPointer::EMPTY.advance(&entry));
//! ```

use crate::action_log::LoggedAction;
use crate::event::SerializedEvent;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use thiserror::Error;

const DOMAIN_TAG: &[u8] = b"soulbound.action-log.v1";

/// A 32-byte SHA-256 chain digest.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChainDigest([u8; 32]);

impl ChainDigest {
    /// The digest of the empty log.
    pub const ZERO: Self = Self([0; 32]);

    /// Wrap raw digest bytes.
    #[must_use]
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Raw digest bytes.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Display for ChainDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

/// Cursor marking the last action folded into an aggregate.
///
/// Two pointers are equal only if both the position and the digest match, so
/// a pointer taken from one log never matches a different log of the same
/// length.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FoldPointer {
    position: u64,
    digest: ChainDigest,
}

impl FoldPointer {
    /// Pointer to the empty log.
    pub const EMPTY: Self = Self {
        position: 0,
        digest: ChainDigest::ZERO,
    };

    /// Build a pointer from raw parts.
    #[must_use]
    pub const fn new(position: u64, digest: ChainDigest) -> Self {
        Self { position, digest }
    }

    /// Number of log entries this pointer covers.
    #[must_use]
    pub const fn position(&self) -> u64 {
        self.position
    }

    /// Running digest over the covered entries.
    #[must_use]
    pub const fn digest(&self) -> ChainDigest {
        self.digest
    }

    /// Whether this is the empty-log sentinel.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::EMPTY
    }

    /// The pointer after appending `entry` to the prefix this pointer names.
    ///
    /// Only `event_type` and `data` are hashed; metadata is advisory.
    #[must_use]
    pub fn advance(&self, entry: &SerializedEvent) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(DOMAIN_TAG);
        hasher.update(self.digest.as_bytes());
        hash_field(&mut hasher, entry.event_type.as_bytes());
        hash_field(&mut hasher, &entry.data);

        Self {
            position: self.position.saturating_add(1),
            digest: ChainDigest(hasher.finalize().into()),
        }
    }
}

// Length-prefixed so (type, data) boundaries are unambiguous.
fn hash_field(hasher: &mut Sha256, bytes: &[u8]) {
    let len = u64::try_from(bytes.len()).unwrap_or(u64::MAX);
    hasher.update(len.to_be_bytes());
    hasher.update(bytes);
}

impl Default for FoldPointer {
    fn default() -> Self {
        Self::EMPTY
    }
}

impl fmt::Display for FoldPointer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let hex = self.digest.to_string();
        write!(f, "#{}:{}", self.position, &hex[..12])
    }
}

/// A segment of the log that does not chain from where it claims to start.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChainError {
    /// Entry at `position` does not carry the pointer its predecessor implies.
    #[error("Chain broken at position {position}: expected {expected}")]
    Broken {
        /// Position the entry claims.
        position: u64,
        /// Pointer recomputed from the previous link.
        expected: FoldPointer,
    },
}

/// Check that `segment` chains from `start`, returning the final pointer.
///
/// An empty segment verifies trivially and returns `start`.
///
/// # Errors
///
/// Returns [`ChainError::Broken`] at the first entry whose stored pointer does
/// not equal `advance` of the previous one.
pub fn verify_segment(start: FoldPointer, segment: &[LoggedAction]) -> Result<FoldPointer, ChainError> {
    segment.iter().try_fold(start, |prev, logged| {
        let expected = prev.advance(&logged.event);
        if logged.pointer == expected {
            Ok(expected)
        } else {
            Err(ChainError::Broken {
                position: logged.pointer.position(),
                expected,
            })
        }
    })
}

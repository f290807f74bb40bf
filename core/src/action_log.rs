//! Action log trait and related types.
//!
//! An action log is an append-only, externally ordered sequence of lifecycle
//! actions per aggregate. Entries are immutable once dispatched. Each entry is
//! stored together with the [`FoldPointer`] that names the log prefix ending at
//! it, which makes the log tamper-evident.
//!
//! # Implementations
//!
//! - `InMemoryLedger` (in `soulbound-credential`): the in-process platform,
//!   which also commits aggregate state alongside each dispatch
//!
//! # Example
//!
//! ```no_run
//! use soulbound_core::action_log::{ActionLog, ActionLogError};
//! use soulbound_core::event::SerializedEvent;
//! use soulbound_core::pointer::FoldPointer;
//! use soulbound_core::stream::AggregateId;
//!
//! async fn example<L: ActionLog>(log: &L) -> Result<(), ActionLogError> {
//!     let id = AggregateId::new("credential-123");
//!     let entry = SerializedEvent::new("Example.v1".to_string(), vec![1], None);
//!
//!     let head = log.dispatch_action(id.clone(), Some(FoldPointer::EMPTY), entry).await?;
//!     let since_start = log.actions_since(id, FoldPointer::EMPTY).await?;
//!     assert_eq!(since_start.last().map(|a| a.pointer), Some(head));
//!     Ok(())
//! }
//! ```

use crate::event::SerializedEvent;
use crate::pointer::FoldPointer;
use crate::stream::AggregateId;
use std::future::Future;
use std::pin::Pin;
use thiserror::Error;

/// Errors that can occur during action log operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ActionLogError {
    /// Optimistic concurrency conflict: the log head moved since it was read.
    #[error("Head mismatch on {aggregate_id}: expected {expected}, found {actual}")]
    HeadMismatch {
        /// The aggregate whose log was appended to.
        aggregate_id: AggregateId,
        /// The head the caller expected.
        expected: FoldPointer,
        /// The actual head of the log.
        actual: FoldPointer,
    },

    /// The pointer does not name any prefix of this aggregate's log.
    #[error("Unknown pointer {pointer} for {aggregate_id}")]
    UnknownPointer {
        /// The aggregate whose log was read.
        aggregate_id: AggregateId,
        /// The pointer that was not found.
        pointer: FoldPointer,
    },

    /// Backing storage failed.
    #[error("Storage error: {0}")]
    StorageError(String),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    SerializationError(String),
}

/// One stored log entry and the pointer covering the log up to and including it.
#[derive(Clone, Debug, PartialEq)]
pub struct LoggedAction {
    /// Pointer after this entry.
    pub pointer: FoldPointer,
    /// The dispatched action.
    pub event: SerializedEvent,
}

/// Entries of `log` strictly after `pointer`.
///
/// Returns `None` if `pointer` does not name a prefix of `log`, i.e. the entry
/// at its position is missing or carries a different pointer.
///
/// ```
/// use soulbound_core::action_log::{LoggedAction, entries_after};
/// use soulbound_core::event::SerializedEvent;
/// use soulbound_core::pointer::FoldPointer;
///
/// let event = SerializedEvent::new("Example.v1".to_string(), vec![1], None);
/// let pointer = FoldPointer::EMPTY.advance(&event);
/// let log = vec![LoggedAction { pointer, event }];
///
/// assert_eq!(entries_after(&log, FoldPointer::EMPTY).map(<[_]>::len), Some(1));
/// assert_eq!(entries_after(&log, pointer).map(<[_]>::len), Some(0));
/// ```
#[must_use]
pub fn entries_after(log: &[LoggedAction], pointer: FoldPointer) -> Option<&[LoggedAction]> {
    if pointer.is_empty() {
        return Some(log);
    }
    let index = usize::try_from(pointer.position()).ok()?;
    match log.get(index.checked_sub(1)?) {
        Some(entry) if entry.pointer == pointer => log.get(index..),
        _ => None,
    }
}

/// Append-only action log, keyed by aggregate.
///
/// # Design Note
///
/// Methods return `Pin<Box<dyn Future>>` instead of `async fn` so the trait
/// stays dyn-compatible and can be held as `Arc<dyn ActionLog>`.
///
/// # Ordering
///
/// Implementations must return entries in acceptance order, and
/// `dispatch_action` must be atomic: either the entry is stored with its
/// pointer, or nothing changes.
pub trait ActionLog: Send + Sync {
    /// Append one action, returning the new head pointer.
    ///
    /// `expected_head` enables optimistic concurrency. `None` appends
    /// unconditionally.
    ///
    /// # Errors
    ///
    /// - [`ActionLogError::HeadMismatch`]: the head moved since it was read
    /// - [`ActionLogError::StorageError`]: backing storage failed
    fn dispatch_action(
        &self,
        aggregate_id: AggregateId,
        expected_head: Option<FoldPointer>,
        action: SerializedEvent,
    ) -> Pin<Box<dyn Future<Output = Result<FoldPointer, ActionLogError>> + Send + '_>>;

    /// All entries strictly after `pointer`, in log order.
    ///
    /// Returned entries are as stored; callers verify the chain themselves.
    ///
    /// # Errors
    ///
    /// - [`ActionLogError::UnknownPointer`]: `pointer` is not a prefix of the log
    /// - [`ActionLogError::StorageError`]: backing storage failed
    fn actions_since(
        &self,
        aggregate_id: AggregateId,
        pointer: FoldPointer,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<LoggedAction>, ActionLogError>> + Send + '_>>;

    /// Pointer after the newest entry, or [`FoldPointer::EMPTY`] for an empty log.
    ///
    /// # Errors
    ///
    /// Returns [`ActionLogError::StorageError`] if backing storage failed.
    fn head(
        &self,
        aggregate_id: AggregateId,
    ) -> Pin<Box<dyn Future<Output = Result<FoldPointer, ActionLogError>> + Send + '_>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn head_mismatch_error_display() {
        let error = ActionLogError::HeadMismatch {
            aggregate_id: AggregateId::new("credential-1"),
            expected: FoldPointer::EMPTY,
            actual: FoldPointer::EMPTY,
        };

        let message = error.to_string();
        assert!(message.contains("credential-1"));
        assert!(message.contains("#0:"));
    }

    #[test]
    fn unknown_pointer_error_display() {
        let error = ActionLogError::UnknownPointer {
            aggregate_id: AggregateId::new("credential-1"),
            pointer: FoldPointer::EMPTY,
        };

        assert!(error.to_string().contains("Unknown pointer"));
    }
}

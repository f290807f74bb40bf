//! Error types for credential operations.
//!
//! Each operation has its own error enum. [`ErrorKind`] flattens all of them
//! into one `Copy` taxonomy for logging, metric labels and exit codes.

use crate::ledger::LedgerError;
use soulbound_core::pointer::{ChainError, FoldPointer};
use std::fmt;
use thiserror::Error;

/// Flat classification of every credential error
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Credential already issued
    AlreadyIssued,
    /// Credential not issued yet
    NotIssued,
    /// Sender is not the issuer
    NotIssuer,
    /// Sender is not the owner
    NotOwner,
    /// Credential was issued non-revocable
    NotRevocable,
    /// Credential was issued non-transferable
    NotTransferable,
    /// Revoke on an already revoked credential
    AlreadyRevoked,
    /// Transfer of a revoked credential
    Revoked,
    /// Action log failed verification or could not be read
    CorruptActionLog,
    /// Issuance without owner or issuer
    MissingIdentity,
    /// Issuance policy refused the sender
    Unauthorized,
    /// Transfer to the empty account
    EmptyRecipient,
    /// Platform rejection or storage failure
    Ledger,
}

impl ErrorKind {
    /// Stable `snake_case` name
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::AlreadyIssued => "already_issued",
            Self::NotIssued => "not_issued",
            Self::NotIssuer => "not_issuer",
            Self::NotOwner => "not_owner",
            Self::NotRevocable => "not_revocable",
            Self::NotTransferable => "not_transferable",
            Self::AlreadyRevoked => "already_revoked",
            Self::Revoked => "revoked",
            Self::CorruptActionLog => "corrupt_action_log",
            Self::MissingIdentity => "missing_identity",
            Self::Unauthorized => "unauthorized",
            Self::EmptyRecipient => "empty_recipient",
            Self::Ledger => "ledger",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What was wrong with the action log
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Corruption {
    /// An entry does not chain from its predecessor
    #[error(transparent)]
    Chain(#[from] ChainError),

    /// The aggregate's fold pointer is not a prefix of the log
    #[error("fold pointer {0} is not on the log")]
    UnknownPointer(FoldPointer),

    /// An entry's payload does not decode as a credential action
    #[error("entry {position} does not decode: {reason}")]
    Undecodable {
        /// Log position of the entry
        position: u64,
        /// Decoder message
        reason: String,
    },

    /// An entry's payload kind disagrees with its stored type name
    #[error("entry {position} is stored as {event_type} but decodes as another kind")]
    KindMismatch {
        /// Log position of the entry
        position: u64,
        /// Stored type name
        event_type: String,
    },

    /// The credential is issued but its log is empty
    #[error("credential is issued but the action log is empty")]
    MissingHistory,

    /// The log could not be read
    #[error("action log unavailable: {0}")]
    Unavailable(String),
}

/// Errors from [`issue`](crate::service::CredentialService::issue)
#[derive(Error, Debug)]
pub enum IssueError {
    /// Owner or issuer is already set
    #[error("credential already issued")]
    AlreadyIssued,

    /// Properties lack an owner or an issuer
    #[error("issuance requires both an owner and an issuer")]
    MissingIdentity,

    /// Issuance policy refused the sender
    #[error("sender {sender} may not issue: {reason}")]
    Unauthorized {
        /// Dispatching account
        sender: String,
        /// Policy message
        reason: String,
    },

    /// Platform rejection or storage failure
    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

impl IssueError {
    /// Flat classification
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::AlreadyIssued => ErrorKind::AlreadyIssued,
            Self::MissingIdentity => ErrorKind::MissingIdentity,
            Self::Unauthorized { .. } => ErrorKind::Unauthorized,
            Self::Ledger(_) => ErrorKind::Ledger,
        }
    }
}

/// Errors from [`revoke`](crate::service::CredentialService::revoke)
#[derive(Error, Debug)]
pub enum RevokeError {
    /// Nothing to revoke
    #[error("credential not issued")]
    NotIssued,

    /// Only the issuer may revoke
    #[error("sender {0} is not the issuer")]
    NotIssuer(String),

    /// Issued non-revocable
    #[error("credential is not revocable")]
    NotRevocable,

    /// Already revoked
    #[error("credential already revoked")]
    AlreadyRevoked,

    /// Latest action could not be read
    #[error("corrupt action log: {0}")]
    CorruptActionLog(#[from] Corruption),

    /// Platform rejection or storage failure
    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

impl RevokeError {
    /// Flat classification
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::NotIssued => ErrorKind::NotIssued,
            Self::NotIssuer(_) => ErrorKind::NotIssuer,
            Self::NotRevocable => ErrorKind::NotRevocable,
            Self::AlreadyRevoked => ErrorKind::AlreadyRevoked,
            Self::CorruptActionLog(_) => ErrorKind::CorruptActionLog,
            Self::Ledger(_) => ErrorKind::Ledger,
        }
    }
}

/// Errors from [`transfer`](crate::service::CredentialService::transfer)
#[derive(Error, Debug)]
pub enum TransferError {
    /// Nothing to transfer
    #[error("credential not issued")]
    NotIssued,

    /// Only the owner may transfer
    #[error("sender {0} is not the owner")]
    NotOwner(String),

    /// Issued non-transferable
    #[error("credential is not transferable")]
    NotTransferable,

    /// Revoked credentials cannot move
    #[error("credential is revoked")]
    Revoked,

    /// New owner is the empty account
    #[error("new owner must not be empty")]
    EmptyRecipient,

    /// Latest action could not be read
    #[error("corrupt action log: {0}")]
    CorruptActionLog(#[from] Corruption),

    /// Platform rejection or storage failure
    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

impl TransferError {
    /// Flat classification
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::NotIssued => ErrorKind::NotIssued,
            Self::NotOwner(_) => ErrorKind::NotOwner,
            Self::NotTransferable => ErrorKind::NotTransferable,
            Self::Revoked => ErrorKind::Revoked,
            Self::EmptyRecipient => ErrorKind::EmptyRecipient,
            Self::CorruptActionLog(_) => ErrorKind::CorruptActionLog,
            Self::Ledger(_) => ErrorKind::Ledger,
        }
    }
}

/// Errors from folding and the read views built on it
#[derive(Error, Debug)]
pub enum FoldError {
    /// The log segment is missing or inconsistent; nothing was committed
    #[error("corrupt action log: {0}")]
    CorruptActionLog(#[from] Corruption),

    /// Platform rejection or storage failure
    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

impl FoldError {
    /// Flat classification
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::CorruptActionLog(_) => ErrorKind::CorruptActionLog,
            Self::Ledger(_) => ErrorKind::Ledger,
        }
    }
}

impl From<FoldError> for RevokeError {
    fn from(error: FoldError) -> Self {
        match error {
            FoldError::CorruptActionLog(corruption) => Self::CorruptActionLog(corruption),
            FoldError::Ledger(ledger) => Self::Ledger(ledger),
        }
    }
}

impl From<FoldError> for TransferError {
    fn from(error: FoldError) -> Self {
        match error {
            FoldError::CorruptActionLog(corruption) => Self::CorruptActionLog(corruption),
            FoldError::Ledger(ledger) => Self::Ledger(ledger),
        }
    }
}

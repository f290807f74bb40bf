//! Soulbound credential lifecycle engine.
//!
//! A credential is issued by an authority to an owner, may be revoked by the
//! issuer and, if allowed, transferred by its owner. Only a small commitment
//! ([`CredentialAggregate`]) is stored; every lifecycle event is dispatched to
//! an append-only, hash-chained action log and folded into the commitment
//! later by [`CredentialReducer`].
//!
//! # Architecture
//!
//! ```text
//!  caller ──► CredentialService ──► CredentialMachine (pure checks)
//!                   │
//!                   ├─ Proposal{prior, next, action, proof}
//!                   ▼
//!            CredentialLedger ──► action log ──► fold ──► aggregate
//! ```
//!
//! # Quick Start
//!
//! ```
//! use soulbound_core::environment::SystemClock;
//! use soulbound_core::stream::AggregateId;
//! use soulbound_credential::{
//!     AccountId, CredentialEnvironment, CredentialProperties, CredentialService, InMemoryLedger,
//!     RelayPolicy, Timestamp,
//! };
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let env = CredentialEnvironment::new(Arc::new(SystemClock), Arc::new(RelayPolicy));
//! let service = CredentialService::new(
//!     AggregateId::new("credential-1"),
//!     Arc::new(InMemoryLedger::new()),
//!     env,
//! );
//!
//! let props = CredentialProperties::new(
//!     AccountId::new("issuer"),
//!     AccountId::new("alice"),
//!     AccountId::new("relay-app"),
//!     Timestamp::from_millis(1_000),
//! )
//! .revocable(true);
//!
//! service.issue(&AccountId::new("relay"), props).await?;
//! service.revoke(&AccountId::new("issuer"), Timestamp::from_millis(2_000)).await?;
//!
//! let state = service.current_state().await?;
//! assert!(state.was_revoked);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod environment;
pub mod error;
pub mod ledger;
pub mod machine;
pub mod memory;
pub mod metrics;
pub mod proof;
pub mod reducer;
pub mod service;
pub mod types;

pub use config::{CredentialConfig, PolicyKind};
pub use environment::{CredentialEnvironment, IssuancePolicy, IssuerOnlyPolicy, RelayPolicy};
pub use error::{Corruption, ErrorKind, FoldError, IssueError, RevokeError, TransferError};
pub use ledger::{Commit, CredentialLedger, LedgerError, Proposal, Rejection};
pub use machine::{CredentialMachine, Transition};
pub use memory::InMemoryLedger;
pub use proof::{TransitionKind, TransitionProof};
pub use reducer::CredentialReducer;
pub use service::CredentialService;
pub use types::{
    AccountId, ActionKind, CredentialAction, CredentialAggregate, CredentialProperties,
    CredentialStatus, Timestamp,
};

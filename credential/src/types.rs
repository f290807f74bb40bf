//! Core domain types for soulbound credentials.
//!
//! A credential is a small aggregate ([`CredentialAggregate`]) plus an
//! append-only log of [`CredentialAction`] records. The aggregate carries the
//! synchronous identity fields and the derived flags as of the last fold;
//! every action carries the full cumulative flags as of its dispatch.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use soulbound_core::event::Event;
use soulbound_core::pointer::FoldPointer;
use std::fmt;

/// Account identifier on the commitment platform.
///
/// The empty string is the "no account" sentinel used before issuance.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AccountId(String);

impl AccountId {
    /// The empty sentinel.
    pub const EMPTY: Self = Self(String::new());

    /// Creates a new `AccountId`
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the inner string value
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether this is the empty sentinel
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            write!(f, "<empty>")
        } else {
            write!(f, "{}", self.0)
        }
    }
}

impl From<&str> for AccountId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// Milliseconds since the Unix epoch, UTC.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Timestamp(u64);

impl Timestamp {
    /// Creates a timestamp from epoch milliseconds
    #[must_use]
    pub const fn from_millis(millis: u64) -> Self {
        Self(millis)
    }

    /// Epoch milliseconds
    #[must_use]
    pub const fn as_millis(&self) -> u64 {
        self.0
    }

    /// Converts a `chrono` time; instants before the epoch clamp to zero.
    #[must_use]
    pub fn from_datetime(time: DateTime<Utc>) -> Self {
        Self(u64::try_from(time.timestamp_millis()).unwrap_or(0))
    }

    /// Converts back to `chrono`, if representable.
    #[must_use]
    pub fn to_datetime(&self) -> Option<DateTime<Utc>> {
        i64::try_from(self.0)
            .ok()
            .and_then(DateTime::from_timestamp_millis)
    }

    /// Expiry from its wire form, where zero means "never expires".
    #[must_use]
    pub const fn expiry_from_millis(millis: u64) -> Option<Self> {
        if millis == 0 { None } else { Some(Self(millis)) }
    }

    /// This timestamp moved forward by `millis`, saturating.
    #[must_use]
    pub const fn plus_millis(&self, millis: u64) -> Self {
        Self(self.0.saturating_add(millis))
    }
}

impl From<DateTime<Utc>> for Timestamp {
    fn from(time: DateTime<Utc>) -> Self {
        Self::from_datetime(time)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_datetime() {
            Some(time) => write!(f, "{}", time.to_rfc3339()),
            None => write!(f, "{}ms", self.0),
        }
    }
}

/// Serde adapter encoding `Option<Timestamp>` as `u64`, with zero for `None`.
mod expiry_millis {
    use super::Timestamp;
    use serde::{Deserialize, Deserializer, Serializer};

    #[allow(clippy::ref_option)] // serde's `with` passes `&Option<T>`
    pub fn serialize<S: Serializer>(value: &Option<Timestamp>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.map_or(0, |t| t.as_millis()))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Timestamp>, D::Error> {
        u64::deserialize(deserializer).map(Timestamp::expiry_from_millis)
    }
}

/// Issuance payload. Immutable once issued.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialProperties {
    /// Issuing authority
    pub issuer_id: AccountId,
    /// Initial owner
    pub owner_id: AccountId,
    /// Originating application or relay that requested issuance
    pub origin_id: AccountId,
    /// Associated token identifier
    pub token_id: u64,
    /// Token balance bound to the credential
    pub balance: u64,
    /// Issuance time; also the ISSUED action's `action_utc`
    pub issued_utc: Timestamp,
    /// Expiry; `None` never expires
    #[serde(with = "expiry_millis")]
    pub expires_utc: Option<Timestamp>,
    /// Whether the issuer may revoke
    pub is_revocable: bool,
    /// Whether the owner may transfer
    pub is_transferable: bool,
    /// Off-platform metadata location
    pub metadata_uri: String,
}

impl CredentialProperties {
    /// Creates properties for a non-revocable, non-transferable, non-expiring
    /// credential. Use the builder methods to change that.
    #[must_use]
    pub fn new(
        issuer_id: AccountId,
        owner_id: AccountId,
        origin_id: AccountId,
        issued_utc: Timestamp,
    ) -> Self {
        Self {
            issuer_id,
            owner_id,
            origin_id,
            token_id: 0,
            balance: 0,
            issued_utc,
            expires_utc: None,
            is_revocable: false,
            is_transferable: false,
            metadata_uri: String::new(),
        }
    }

    /// Sets `is_revocable`
    #[must_use]
    pub const fn revocable(mut self, revocable: bool) -> Self {
        self.is_revocable = revocable;
        self
    }

    /// Sets `is_transferable`
    #[must_use]
    pub const fn transferable(mut self, transferable: bool) -> Self {
        self.is_transferable = transferable;
        self
    }

    /// Sets the expiry. A zero timestamp means "never".
    #[must_use]
    pub const fn expires_at(mut self, expires: Timestamp) -> Self {
        self.expires_utc = Timestamp::expiry_from_millis(expires.as_millis());
        self
    }

    /// Binds a token and balance
    #[must_use]
    pub const fn with_token(mut self, token_id: u64, balance: u64) -> Self {
        self.token_id = token_id;
        self.balance = balance;
        self
    }

    /// Sets the metadata URI
    #[must_use]
    pub fn with_metadata_uri(mut self, uri: impl Into<String>) -> Self {
        self.metadata_uri = uri.into();
        self
    }
}

/// Kind of lifecycle action
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActionKind {
    /// First and only issuance
    Issued,
    /// Issuer revoked the credential
    Revoked,
    /// Owner handed the credential to a new owner
    Transferred,
}

impl ActionKind {
    /// Versioned event type name stored in the log
    #[must_use]
    pub const fn event_type(self) -> &'static str {
        match self {
            Self::Issued => "CredentialIssued.v1",
            Self::Revoked => "CredentialRevoked.v1",
            Self::Transferred => "CredentialTransferred.v1",
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Issued => write!(f, "ISSUED"),
            Self::Revoked => write!(f, "REVOKED"),
            Self::Transferred => write!(f, "TRANSFERRED"),
        }
    }
}

/// One immutable lifecycle record.
///
/// Fixed fields are copied from issuance into every action and cumulative
/// flags are recomputed at dispatch, so the newest action alone describes the
/// credential's full pending state.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialAction {
    /// What happened
    pub kind: ActionKind,
    /// When it happened
    pub action_utc: Timestamp,
    /// Who dispatched it
    pub sender_id: AccountId,

    // Fixed at issuance
    /// Originating application or relay
    pub origin_id: AccountId,
    /// Issuance time
    pub issued_utc: Timestamp,
    /// Expiry; `None` never expires
    #[serde(with = "expiry_millis")]
    pub expires_utc: Option<Timestamp>,
    /// Whether the issuer may revoke
    pub is_revocable: bool,
    /// Whether the owner may transfer
    pub is_transferable: bool,

    // Cumulative
    /// Expired as of this action or any earlier one
    pub has_expired: bool,
    /// Revoked by this action or any earlier one
    pub was_revoked: bool,
    /// Transferred by this action or any earlier one
    pub was_transferred: bool,
    /// Previous owner at the most recent transfer; empty until one happens
    pub who_transferred_id: AccountId,
}

impl CredentialAction {
    /// Whether the credential counts as expired at `now`
    #[must_use]
    pub fn expired_at(&self, now: Timestamp) -> bool {
        self.expires_utc.is_some_and(|expires| now >= expires)
    }
}

impl Event for CredentialAction {
    fn event_type(&self) -> &'static str {
        self.kind.event_type()
    }
}

/// The fixed-size credential commitment.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialAggregate {
    /// Current owner; empty until issued
    pub owner_id: AccountId,
    /// Issuing authority; empty until issued
    pub issuer_id: AccountId,
    /// Last folded log entry
    pub last_fold_pointer: FoldPointer,
    /// Derived: expired as of the last folded action
    pub has_expired: bool,
    /// Derived: revoked as of the last folded action
    pub was_revoked: bool,
    /// Derived: transferred as of the last folded action
    pub was_transferred: bool,
    /// Derived: previous owner at the last folded transfer
    pub who_transferred_id: AccountId,
}

impl CredentialAggregate {
    /// An unissued credential with an empty log pointer
    #[must_use]
    pub const fn new() -> Self {
        Self {
            owner_id: AccountId::EMPTY,
            issuer_id: AccountId::EMPTY,
            last_fold_pointer: FoldPointer::EMPTY,
            has_expired: false,
            was_revoked: false,
            was_transferred: false,
            who_transferred_id: AccountId::EMPTY,
        }
    }

    /// Whether the credential has been issued
    #[must_use]
    pub fn is_issued(&self) -> bool {
        !self.owner_id.is_empty() || !self.issuer_id.is_empty()
    }
}

impl Default for CredentialAggregate {
    fn default() -> Self {
        Self::new()
    }
}

/// Read-only view combining the committed aggregate, the newest pending
/// action and the current time.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialStatus {
    /// Whether the credential has been issued
    pub issued: bool,
    /// Current owner
    pub owner_id: AccountId,
    /// Issuing authority
    pub issuer_id: AccountId,
    /// Revoked, folded or pending
    pub revoked: bool,
    /// Transferred at least once, folded or pending
    pub transferred: bool,
    /// Expired as of the time the status was taken
    pub expired: bool,
    /// Previous owner at the most recent transfer
    pub who_transferred_id: AccountId,
    /// Log entries not yet folded into the aggregate
    pub pending_actions: u64,
    /// Time the status was evaluated at
    pub as_of: Timestamp,
}

impl CredentialStatus {
    /// Issued, not revoked and not expired
    #[must_use]
    pub const fn is_valid(&self) -> bool {
        self.issued && !self.revoked && !self.expired
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)] // Test code can use unwrap/expect
mod tests {
    use super::*;

    fn action(expires: Option<Timestamp>) -> CredentialAction {
        CredentialAction {
            kind: ActionKind::Issued,
            action_utc: Timestamp::from_millis(100),
            sender_id: AccountId::new("relay"),
            origin_id: AccountId::new("relay"),
            issued_utc: Timestamp::from_millis(100),
            expires_utc: expires,
            is_revocable: true,
            is_transferable: false,
            has_expired: false,
            was_revoked: false,
            was_transferred: false,
            who_transferred_id: AccountId::EMPTY,
        }
    }

    #[test]
    fn account_id_empty_sentinel() {
        assert!(AccountId::EMPTY.is_empty());
        assert!(AccountId::default().is_empty());
        assert!(!AccountId::new("alice").is_empty());
        assert_eq!(AccountId::EMPTY.to_string(), "<empty>");
    }

    #[test]
    fn timestamp_round_trips_through_chrono() {
        let time = DateTime::parse_from_rfc3339("2025-01-01T00:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let ts = Timestamp::from_datetime(time);

        assert_eq!(ts.as_millis(), 1_735_689_600_000);
        assert_eq!(ts.to_datetime(), Some(time));
    }

    #[test]
    fn zero_expiry_means_never() {
        assert_eq!(Timestamp::expiry_from_millis(0), None);

        let props = CredentialProperties::new(
            AccountId::new("issuer"),
            AccountId::new("owner"),
            AccountId::new("origin"),
            Timestamp::from_millis(1),
        )
        .expires_at(Timestamp::from_millis(0));
        assert_eq!(props.expires_utc, None);
    }

    #[test]
    fn expiry_is_inclusive() {
        let expiring = action(Some(Timestamp::from_millis(500)));
        assert!(!expiring.expired_at(Timestamp::from_millis(499)));
        assert!(expiring.expired_at(Timestamp::from_millis(500)));
        assert!(expiring.expired_at(Timestamp::from_millis(501)));

        let forever = action(None);
        assert!(!forever.expired_at(Timestamp::from_millis(u64::MAX)));
    }

    #[test]
    fn expiry_encodes_none_as_zero() {
        let encoded = bincode::serialize(&action(None)).expect("serialize");
        let decoded: CredentialAction = bincode::deserialize(&encoded).expect("deserialize");
        assert_eq!(decoded.expires_utc, None);

        let json = serde_json::to_value(action(None)).expect("json");
        assert_eq!(json["expires_utc"], 0);
    }

    #[test]
    fn action_event_type_follows_kind() {
        let mut a = action(None);
        assert_eq!(a.event_type(), "CredentialIssued.v1");
        a.kind = ActionKind::Revoked;
        assert_eq!(a.event_type(), "CredentialRevoked.v1");
        a.kind = ActionKind::Transferred;
        assert_eq!(a.event_type(), "CredentialTransferred.v1");
    }

    #[test]
    fn new_aggregate_is_unissued() {
        let aggregate = CredentialAggregate::new();
        assert!(!aggregate.is_issued());
        assert!(aggregate.last_fold_pointer.is_empty());
        assert_eq!(aggregate, CredentialAggregate::default());
    }

    #[test]
    fn status_validity() {
        let mut status = CredentialStatus {
            issued: true,
            owner_id: AccountId::new("owner"),
            issuer_id: AccountId::new("issuer"),
            revoked: false,
            transferred: false,
            expired: false,
            who_transferred_id: AccountId::EMPTY,
            pending_actions: 0,
            as_of: Timestamp::from_millis(0),
        };
        assert!(status.is_valid());

        status.expired = true;
        assert!(!status.is_valid());
    }
}

//! Core data models for the escrow system
//!
//! States, validated creation terms, read snapshots and audit events.

use crate::{EscrowError, EscrowResult};
use chrono::{DateTime, Utc};
use pactum_core::{AccountId, PartyId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Escrow state machine enum
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EscrowState {
    /// Funded and holding the deposit, zero or one approval
    Created,
    /// Funds released to the receiver
    Released,
    /// Funds returned to the sender
    Refunded,
}

impl EscrowState {
    /// Check if this is a terminal state (no further transitions possible)
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Released | Self::Refunded)
    }

    /// Check if this state accepts approvals
    pub fn can_approve(&self) -> bool {
        matches!(self, Self::Created)
    }

    /// Check if this state allows a refund
    pub fn can_refund(&self) -> bool {
        matches!(self, Self::Created)
    }

    /// Validate a state transition
    pub fn validate_transition(&self, to_state: EscrowState) -> EscrowResult<()> {
        let valid = matches!(
            (self, to_state),
            (Self::Created, Self::Released) | (Self::Created, Self::Refunded)
        );

        if valid {
            Ok(())
        } else {
            Err(EscrowError::state_transition(
                format!("{:?}", self),
                format!("{:?}", to_state),
                "Invalid state transition".to_string(),
            ))
        }
    }
}

/// How a settled escrow disposed of its deposit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SettlementOutcome {
    /// Paid to the receiver after dual approval
    Released,
    /// Returned to the sender
    Refunded,
}

/// The two parties of an escrow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Sender,
    Receiver,
}

impl Role {
    /// The other party
    pub fn counterpart(self) -> Role {
        match self {
            Self::Sender => Self::Receiver,
            Self::Receiver => Self::Sender,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sender => f.write_str("sender"),
            Self::Receiver => f.write_str("receiver"),
        }
    }
}

/// Validated creation terms.
///
/// Built before any funds move so a rejected creation never touches the
/// ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EscrowTerms {
    sender: PartyId,
    receiver: PartyId,
    amount: Decimal,
}

impl EscrowTerms {
    /// Check creation preconditions in order: deposit, amount, parties
    pub fn new(
        sender: PartyId,
        receiver: PartyId,
        amount: Decimal,
        deposit: Decimal,
    ) -> EscrowResult<Self> {
        if deposit != amount {
            return Err(EscrowError::InvalidDeposit {
                expected: amount,
                actual: deposit,
            });
        }

        if amount <= Decimal::ZERO {
            return Err(EscrowError::ZeroAmount(amount));
        }

        if sender == receiver {
            return Err(EscrowError::SelfDealing(sender));
        }

        Ok(Self {
            sender,
            receiver,
            amount,
        })
    }

    pub fn sender(&self) -> &PartyId {
        &self.sender
    }

    pub fn receiver(&self) -> &PartyId {
        &self.receiver
    }

    pub fn amount(&self) -> Decimal {
        self.amount
    }

    pub(crate) fn into_parts(self) -> (PartyId, PartyId, Decimal) {
        (self.sender, self.receiver, self.amount)
    }
}

/// Human-readable description attached at creation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EscrowMetadata {
    pub alias: String,
    pub description: String,
}

/// Read-only view of an escrow account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountSnapshot {
    pub id: AccountId,
    pub sender: PartyId,
    pub receiver: PartyId,
    pub amount: Decimal,
    pub sender_approved: bool,
    pub receiver_approved: bool,
    pub state: EscrowState,
    pub settled: bool,
    /// Value currently in custody (equals `amount` until settlement, then zero)
    pub held: Decimal,
    pub alias: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub settled_at: Option<DateTime<Utc>>,
}

impl AccountSnapshot {
    /// Whether `party` is the sender or the receiver
    pub fn involves(&self, party: &PartyId) -> bool {
        &self.sender == party || &self.receiver == party
    }
}

/// Audit event kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EscrowEventKind {
    #[serde(rename = "escrow.created")]
    Created,
    #[serde(rename = "escrow.approved")]
    Approved,
    #[serde(rename = "escrow.released")]
    Released,
    #[serde(rename = "escrow.refunded")]
    Refunded,
    #[serde(rename = "escrow.delisted")]
    Delisted,
}

/// Escrow event for audit trail
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EscrowEvent {
    pub id: u64,
    pub account_id: AccountId,
    pub kind: EscrowEventKind,
    pub actor: Option<PartyId>,
    pub amount: Option<Decimal>,
    pub metadata: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn party(raw: &str) -> PartyId {
        PartyId::parse(raw).unwrap()
    }

    #[test]
    fn test_terms_accept_valid_input() {
        let terms =
            EscrowTerms::new(party("alice"), party("bob"), Decimal::from(5), Decimal::from(5))
                .unwrap();
        assert_eq!(terms.amount(), Decimal::from(5));
        assert_eq!(terms.sender(), &party("alice"));
        assert_eq!(terms.receiver(), &party("bob"));
    }

    #[test]
    fn test_terms_reject_mismatched_deposit() {
        let err =
            EscrowTerms::new(party("alice"), party("bob"), Decimal::from(5), Decimal::from(3))
                .unwrap_err();
        assert!(matches!(err, EscrowError::InvalidDeposit { .. }));
    }

    #[test]
    fn test_terms_reject_zero_and_negative_amounts() {
        let err = EscrowTerms::new(party("alice"), party("bob"), Decimal::ZERO, Decimal::ZERO)
            .unwrap_err();
        assert!(matches!(err, EscrowError::ZeroAmount(_)));

        let err = EscrowTerms::new(
            party("alice"),
            party("bob"),
            Decimal::from(-1),
            Decimal::from(-1),
        )
        .unwrap_err();
        assert!(matches!(err, EscrowError::ZeroAmount(_)));
    }

    #[test]
    fn test_terms_reject_self_dealing_case_insensitively() {
        let err =
            EscrowTerms::new(party("0xABC"), party("0xabc"), Decimal::ONE, Decimal::ONE)
                .unwrap_err();
        assert!(matches!(err, EscrowError::SelfDealing(_)));
    }

    #[test]
    fn test_deposit_checked_before_amount() {
        let err = EscrowTerms::new(party("alice"), party("alice"), Decimal::ZERO, Decimal::ONE)
            .unwrap_err();
        assert!(matches!(err, EscrowError::InvalidDeposit { .. }));
    }

    #[test]
    fn test_state_transitions() {
        assert!(EscrowState::Created
            .validate_transition(EscrowState::Released)
            .is_ok());
        assert!(EscrowState::Created
            .validate_transition(EscrowState::Refunded)
            .is_ok());
        assert!(EscrowState::Released
            .validate_transition(EscrowState::Refunded)
            .is_err());
        assert!(EscrowState::Refunded
            .validate_transition(EscrowState::Created)
            .is_err());
        assert!(EscrowState::Released.is_terminal());
        assert!(!EscrowState::Created.is_terminal());
    }

    #[test]
    fn test_event_kind_wire_names() {
        assert_eq!(
            serde_json::to_string(&EscrowEventKind::Released).unwrap(),
            "\"escrow.released\""
        );
    }

    #[test]
    fn test_snapshot_involves_only_its_parties() {
        let snapshot = AccountSnapshot {
            id: AccountId::new(),
            sender: party("alice"),
            receiver: party("bob"),
            amount: Decimal::from(5),
            sender_approved: false,
            receiver_approved: false,
            state: EscrowState::Created,
            settled: false,
            held: Decimal::from(5),
            alias: String::new(),
            description: String::new(),
            created_at: Utc::now(),
            settled_at: None,
        };

        assert!(snapshot.involves(&party("alice")));
        assert!(snapshot.involves(&party("BOB")));
        assert!(!snapshot.involves(&party("mallory")));
    }
}

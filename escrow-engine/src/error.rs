//! Error types for the escrow system
//!
//! Creation-time rejections, operation-time rejections, ledger failures and
//! registry sync failures. Every variant is raised before any state is
//! mutated, so a failed call leaves the account and the ledger unchanged.

use crate::models::Role;
use crate::registry::RegistryError;
use pactum_core::{AccountId, PartyId};
use rust_decimal::Decimal;
use thiserror::Error;

/// Main error type for escrow operations
#[derive(Error, Debug)]
pub enum EscrowError {
    /// Deposit attached at creation does not match the agreed amount
    #[error("Invalid deposit: expected {expected}, got {actual}")]
    InvalidDeposit { expected: Decimal, actual: Decimal },

    /// Agreed amount is zero or negative
    #[error("Escrow amount must be greater than 0, got {0}")]
    ZeroAmount(Decimal),

    /// Sender and receiver are the same party
    #[error("Sender and receiver must differ: {0}")]
    SelfDealing(PartyId),

    /// Caller is not the party the operation is reserved for
    #[error("Unauthorized: {caller} is not the {role} of this escrow")]
    Unauthorized { caller: PartyId, role: Role },

    /// Caller is neither the sender nor the receiver
    #[error("Unauthorized: {caller} is not a party to escrow {account}")]
    NotAParty { caller: PartyId, account: AccountId },

    /// Approval flag is already set
    #[error("{0} has already approved")]
    AlreadyApproved(Role),

    /// Account has been released or refunded
    #[error("Escrow {0} is already settled")]
    AlreadySettled(AccountId),

    /// Refund attempted after both parties approved
    #[error("Escrow {0} has been approved by both parties")]
    BothApproved(AccountId),

    /// No account with this identifier
    #[error("Escrow {0} not found")]
    AccountNotFound(AccountId),

    /// Ledger balance is too low for the requested debit
    #[error("Insufficient funds: {party} has {available}, needs {requested}")]
    InsufficientFunds {
        party: PartyId,
        available: Decimal,
        requested: Decimal,
    },

    /// Ledger amounts must be positive
    #[error("Invalid amount: {0}")]
    InvalidAmount(Decimal),

    /// Issued supply would exceed the representable range
    #[error("Balance overflow")]
    BalanceOverflow,

    /// State machine transition errors
    #[error("Invalid state transition: {from_state} -> {to_state}: {reason}")]
    StateTransition {
        from_state: String,
        to_state: String,
        reason: String,
    },

    /// Registry sync errors
    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),
}

impl EscrowError {
    /// Create an unauthorized error
    pub fn unauthorized(caller: &PartyId, role: Role) -> Self {
        Self::Unauthorized {
            caller: caller.clone(),
            role,
        }
    }

    /// Create a state transition error
    pub fn state_transition<S: Into<String>>(from_state: S, to_state: S, reason: S) -> Self {
        Self::StateTransition {
            from_state: from_state.into(),
            to_state: to_state.into(),
            reason: reason.into(),
        }
    }

    /// Stable machine-readable code
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidDeposit { .. } => "INVALID_DEPOSIT",
            Self::ZeroAmount(_) => "ZERO_AMOUNT",
            Self::SelfDealing(_) => "SELF_DEALING",
            Self::Unauthorized { .. } | Self::NotAParty { .. } => "UNAUTHORIZED",
            Self::AlreadyApproved(_) => "ALREADY_APPROVED",
            Self::AlreadySettled(_) => "ALREADY_SETTLED",
            Self::BothApproved(_) => "BOTH_APPROVED",
            Self::AccountNotFound(_) => "ACCOUNT_NOT_FOUND",
            Self::InsufficientFunds { .. } => "INSUFFICIENT_FUNDS",
            Self::InvalidAmount(_) => "INVALID_AMOUNT",
            Self::BalanceOverflow => "BALANCE_OVERFLOW",
            Self::StateTransition { .. } => "STATE_TRANSITION",
            Self::Registry(_) => "REGISTRY_ERROR",
        }
    }
}

//! Escrow account - dual approval state machine
//!
//! An account owns exactly one deposit from creation until settlement. The
//! deposit leaves the account through one of two terminal transitions:
//!
//! - the second approval releases it to the receiver inside the same call
//! - a sender refund, while fewer than two approvals are set, returns it
//!
//! Every precondition is checked before the first field is written, so a
//! rejected call leaves the account exactly as it was.

use crate::{
    error::EscrowError,
    ledger::Funds,
    models::{AccountSnapshot, EscrowMetadata, EscrowState, EscrowTerms, Role, SettlementOutcome},
    EscrowResult,
};
use chrono::{DateTime, Utc};
use pactum_core::{AccountId, PartyId};
use rust_decimal::Decimal;

/// Funds leaving an account through a terminal transition
#[derive(Debug)]
#[must_use = "settled funds must be credited to the beneficiary"]
pub struct Settlement {
    pub account_id: AccountId,
    pub outcome: SettlementOutcome,
    pub beneficiary: PartyId,
    pub funds: Funds,
}

/// One escrow agreement and its held deposit
#[derive(Debug)]
pub struct EscrowAccount {
    id: AccountId,
    sender: PartyId,
    receiver: PartyId,
    amount: Decimal,
    metadata: EscrowMetadata,
    sender_approved: bool,
    receiver_approved: bool,
    state: EscrowState,
    held: Option<Funds>,
    created_at: DateTime<Utc>,
    settled_at: Option<DateTime<Utc>>,
}

impl EscrowAccount {
    /// Open an account over validated terms, holding `deposit`.
    ///
    /// `deposit` is the value debited for `terms.amount()`.
    pub fn open(id: AccountId, terms: EscrowTerms, metadata: EscrowMetadata, deposit: Funds) -> Self {
        debug_assert_eq!(deposit.amount(), terms.amount());
        let (sender, receiver, amount) = terms.into_parts();

        Self {
            id,
            sender,
            receiver,
            amount,
            metadata,
            sender_approved: false,
            receiver_approved: false,
            state: EscrowState::Created,
            held: Some(deposit),
            created_at: Utc::now(),
            settled_at: None,
        }
    }

    /// Record the sender's approval, releasing funds if the receiver already approved
    pub fn approve_as_sender(&mut self, caller: &PartyId) -> EscrowResult<Option<Settlement>> {
        self.approve(Role::Sender, caller)
    }

    /// Record the receiver's approval, releasing funds if the sender already approved
    pub fn approve_as_receiver(&mut self, caller: &PartyId) -> EscrowResult<Option<Settlement>> {
        self.approve(Role::Receiver, caller)
    }

    /// Record an approval for `role`
    pub fn approve(&mut self, role: Role, caller: &PartyId) -> EscrowResult<Option<Settlement>> {
        if caller != self.party(role) {
            return Err(EscrowError::unauthorized(caller, role));
        }

        if !self.state.can_approve() {
            return Err(EscrowError::AlreadySettled(self.id));
        }

        if self.is_approved(role) {
            return Err(EscrowError::AlreadyApproved(role));
        }

        if !self.is_approved(role.counterpart()) {
            self.set_approved(role);
            return Ok(None);
        }

        // Completing approval: flag and release commit together.
        self.state.validate_transition(EscrowState::Released)?;
        let funds = self.take_held(EscrowState::Released)?;
        self.set_approved(role);
        self.finish(EscrowState::Released);

        Ok(Some(Settlement {
            account_id: self.id,
            outcome: SettlementOutcome::Released,
            beneficiary: self.receiver.clone(),
            funds,
        }))
    }

    /// Return the deposit to the sender while fewer than two approvals are set
    pub fn refund(&mut self, caller: &PartyId) -> EscrowResult<Settlement> {
        if caller != &self.sender {
            return Err(EscrowError::unauthorized(caller, Role::Sender));
        }

        if !self.state.can_refund() {
            return Err(EscrowError::AlreadySettled(self.id));
        }

        // Not reachable through `approve`: the approval that sets the second
        // flag also settles the account, so `can_refund` fails first.
        if self.sender_approved && self.receiver_approved {
            return Err(EscrowError::BothApproved(self.id));
        }

        self.state.validate_transition(EscrowState::Refunded)?;
        let funds = self.take_held(EscrowState::Refunded)?;
        self.finish(EscrowState::Refunded);

        Ok(Settlement {
            account_id: self.id,
            outcome: SettlementOutcome::Refunded,
            beneficiary: self.sender.clone(),
            funds,
        })
    }

    /// Remove the held deposit; no mutation when custody is already empty
    fn take_held(&mut self, to_state: EscrowState) -> EscrowResult<Funds> {
        self.held.take().ok_or_else(|| {
            EscrowError::state_transition(
                format!("{:?}", self.state),
                format!("{:?}", to_state),
                "No deposit in custody".to_string(),
            )
        })
    }

    fn set_approved(&mut self, role: Role) {
        match role {
            Role::Sender => self.sender_approved = true,
            Role::Receiver => self.receiver_approved = true,
        }
    }

    fn finish(&mut self, state: EscrowState) {
        self.state = state;
        self.settled_at = Some(Utc::now());
    }

    pub fn id(&self) -> AccountId {
        self.id
    }

    pub fn sender(&self) -> &PartyId {
        &self.sender
    }

    pub fn receiver(&self) -> &PartyId {
        &self.receiver
    }

    /// The party holding `role`
    pub fn party(&self, role: Role) -> &PartyId {
        match role {
            Role::Sender => &self.sender,
            Role::Receiver => &self.receiver,
        }
    }

    /// Role of `party` in this escrow, if any
    pub fn role_of(&self, party: &PartyId) -> Option<Role> {
        if party == &self.sender {
            Some(Role::Sender)
        } else if party == &self.receiver {
            Some(Role::Receiver)
        } else {
            None
        }
    }

    pub fn amount(&self) -> Decimal {
        self.amount
    }

    pub fn metadata(&self) -> &EscrowMetadata {
        &self.metadata
    }

    pub fn sender_approved(&self) -> bool {
        self.sender_approved
    }

    pub fn receiver_approved(&self) -> bool {
        self.receiver_approved
    }

    pub fn is_approved(&self, role: Role) -> bool {
        match role {
            Role::Sender => self.sender_approved,
            Role::Receiver => self.receiver_approved,
        }
    }

    pub fn state(&self) -> EscrowState {
        self.state
    }

    pub fn is_settled(&self) -> bool {
        self.state.is_terminal()
    }

    /// Value currently in custody
    pub fn held(&self) -> Decimal {
        self.held.as_ref().map(Funds::amount).unwrap_or(Decimal::ZERO)
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn settled_at(&self) -> Option<DateTime<Utc>> {
        self.settled_at
    }

    /// Read-only copy of the account
    pub fn snapshot(&self) -> AccountSnapshot {
        AccountSnapshot {
            id: self.id,
            sender: self.sender.clone(),
            receiver: self.receiver.clone(),
            amount: self.amount,
            sender_approved: self.sender_approved,
            receiver_approved: self.receiver_approved,
            state: self.state,
            settled: self.is_settled(),
            held: self.held(),
            alias: self.metadata.alias.clone(),
            description: self.metadata.description.clone(),
            created_at: self.created_at,
            settled_at: self.settled_at,
        }
    }
}

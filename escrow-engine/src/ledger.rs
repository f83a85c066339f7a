//! Ledger - party balances and value in custody
//!
//! Value leaves a balance only as a [`Funds`] token and re-enters a balance
//! only by consuming one. `Funds` is not `Clone`, so a deposit cannot be
//! duplicated or dropped silently while it is held by an escrow.
//!
//! Conservation: the sum of all balances plus the value held in custody always
//! equals the issued supply.

use crate::{EscrowError, EscrowResult};
use pactum_core::PartyId;
use rust_decimal::Decimal;
use std::collections::HashMap;
use tracing::debug;

/// Value in custody, moved out of a balance by [`Ledger::debit`]
#[derive(Debug, PartialEq, Eq)]
#[must_use = "funds must be held by an escrow or credited back to a party"]
pub struct Funds {
    amount: Decimal,
}

impl Funds {
    pub fn amount(&self) -> Decimal {
        self.amount
    }
}

/// In-memory balance book
#[derive(Debug, Default)]
pub struct Ledger {
    balances: HashMap<PartyId, Decimal>,
    supply: Decimal,
    held: Decimal,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue new value to a party, returning the new balance
    pub fn mint(&mut self, party: &PartyId, amount: Decimal) -> EscrowResult<Decimal> {
        if amount <= Decimal::ZERO {
            return Err(EscrowError::InvalidAmount(amount));
        }

        let supply = self
            .supply
            .checked_add(amount)
            .ok_or(EscrowError::BalanceOverflow)?;

        self.supply = supply;
        let balance = self.balances.entry(party.clone()).or_insert(Decimal::ZERO);
        *balance += amount;

        debug!(%party, %amount, "minted");
        Ok(*balance)
    }

    /// Balance of a party (zero when unknown)
    pub fn balance_of(&self, party: &PartyId) -> Decimal {
        self.balances.get(party).copied().unwrap_or(Decimal::ZERO)
    }

    /// Move `amount` out of a party's balance into custody
    pub fn debit(&mut self, party: &PartyId, amount: Decimal) -> EscrowResult<Funds> {
        if amount <= Decimal::ZERO {
            return Err(EscrowError::InvalidAmount(amount));
        }

        let available = self.balance_of(party);
        if available < amount {
            return Err(EscrowError::InsufficientFunds {
                party: party.clone(),
                available,
                requested: amount,
            });
        }

        self.balances.insert(party.clone(), available - amount);
        self.held += amount;

        debug!(%party, %amount, "debited into custody");
        Ok(Funds { amount })
    }

    /// Release custody funds to a party, returning the new balance
    pub fn credit(&mut self, party: &PartyId, funds: Funds) -> Decimal {
        let amount = funds.amount;
        self.held -= amount;

        // Bounded by supply, which was overflow-checked at mint time.
        let balance = self.balances.entry(party.clone()).or_insert(Decimal::ZERO);
        *balance += amount;

        debug!(%party, %amount, "credited from custody");
        *balance
    }

    /// Total value ever issued
    pub fn supply(&self) -> Decimal {
        self.supply
    }

    /// Value currently in custody
    pub fn held(&self) -> Decimal {
        self.held
    }

    /// Check the conservation invariant
    pub fn is_balanced(&self) -> bool {
        let circulating: Decimal = self.balances.values().copied().sum();
        circulating + self.held == self.supply
    }
}

//! Escrow Manager - Coordinates escrow lifecycle and fund custody
//!
//! Accounts, the ledger and the audit trail live together in one book behind
//! a single `RwLock`. Every mutating operation holds the write lock across
//! the whole check, flag update and ledger movement, so no caller can observe
//! both approvals set with the deposit still in custody, or the deposit moved
//! with a flag unset.
//!
//! Registry sync runs after the lock is released and is best-effort. Sync
//! calls for one account are ordered by a per-account mutex that creation
//! takes before the book lock is released, so a de-index can never overtake
//! the registration it undoes.

use crate::{
    account::{EscrowAccount, Settlement},
    error::EscrowError,
    ledger::Ledger,
    models::{
        AccountSnapshot, EscrowEvent, EscrowEventKind, EscrowMetadata, EscrowTerms, Role,
        SettlementOutcome,
    },
    registry::{InMemoryRegistry, RegistryEntry, RegistrySync},
    EscrowResult,
};
use chrono::Utc;
use pactum_core::{AccountId, PartyId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::{collections::HashMap, sync::Arc};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

/// Escrow creation request; `sender` is the authenticated caller
#[derive(Debug, Clone)]
pub struct CreateEscrowRequest {
    pub sender: PartyId,
    pub receiver: PartyId,
    pub alias: String,
    pub description: String,
    pub amount: Decimal,
    /// Value attached by the sender, must equal `amount`
    pub deposit: Decimal,
}

/// Result of an approval call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalOutcome {
    pub snapshot: AccountSnapshot,
    /// True when this approval completed the pair and released the deposit
    pub released: bool,
}

/// Ledger totals for monitoring
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerTotals {
    pub supply: Decimal,
    pub held: Decimal,
    pub balanced: bool,
}

/// Everything guarded by the manager's lock
#[derive(Debug, Default)]
struct Book {
    accounts: HashMap<AccountId, EscrowAccount>,
    ledger: Ledger,
    /// Audit trail for the life of the process, like the rest of the book.
    /// Callers needing retention export it through `events_for`.
    events: Vec<EscrowEvent>,
    /// Orders registry calls per account
    sync_locks: HashMap<AccountId, Arc<Mutex<()>>>,
}

impl Book {
    fn account_mut(&mut self, id: AccountId) -> EscrowResult<&mut EscrowAccount> {
        self.accounts
            .get_mut(&id)
            .ok_or(EscrowError::AccountNotFound(id))
    }

    fn account(&self, id: AccountId) -> EscrowResult<&EscrowAccount> {
        self.accounts.get(&id).ok_or(EscrowError::AccountNotFound(id))
    }

    fn sync_lock(&self, id: AccountId) -> Arc<Mutex<()>> {
        self.sync_locks.get(&id).cloned().unwrap_or_default()
    }

    fn fresh_id(&self) -> AccountId {
        let mut id = AccountId::new();
        while self.accounts.contains_key(&id) {
            id = AccountId::new();
        }
        id
    }

    /// Append to the audit trail
    fn record(
        &mut self,
        account_id: AccountId,
        kind: EscrowEventKind,
        actor: Option<PartyId>,
        amount: Option<Decimal>,
        metadata: Option<serde_json::Value>,
    ) {
        let event = EscrowEvent {
            id: self.events.len() as u64 + 1,
            account_id,
            kind,
            actor,
            amount,
            metadata,
            created_at: Utc::now(),
        };

        self.events.push(event);
    }

    /// Credit settled funds to their beneficiary
    fn settle(&mut self, settlement: Settlement) {
        let Settlement {
            account_id,
            outcome,
            beneficiary,
            funds,
        } = settlement;

        let amount = funds.amount();
        let balance = self.ledger.credit(&beneficiary, funds);
        debug_assert!(self.ledger.is_balanced());

        let kind = match outcome {
            SettlementOutcome::Released => EscrowEventKind::Released,
            SettlementOutcome::Refunded => EscrowEventKind::Refunded,
        };

        self.record(
            account_id,
            kind,
            Some(beneficiary.clone()),
            Some(amount),
            Some(serde_json::json!({
                "beneficiary": beneficiary,
                "beneficiary_balance": balance,
            })),
        );

        info!(
            "Settled escrow {} ({:?}): {} to {}",
            account_id, outcome, amount, beneficiary
        );
    }
}

/// Main escrow manager
pub struct EscrowManager {
    book: RwLock<Book>,
    registry: Arc<dyn RegistrySync>,
}

impl EscrowManager {
    /// Create a manager syncing to `registry`
    pub fn new(registry: Arc<dyn RegistrySync>) -> Self {
        Self {
            book: RwLock::new(Book::default()),
            registry,
        }
    }

    /// Create an escrow, moving the deposit from the sender's balance into custody
    pub async fn create_escrow(&self, request: CreateEscrowRequest) -> EscrowResult<AccountSnapshot> {
        info!(
            "Creating escrow: {} -> {} for {}",
            request.sender, request.receiver, request.amount
        );

        let terms = EscrowTerms::new(
            request.sender,
            request.receiver,
            request.amount,
            request.deposit,
        )?;
        let metadata = EscrowMetadata {
            alias: request.alias,
            description: request.description,
        };

        let (snapshot, sync_guard) = {
            let mut guard = self.book.write().await;
            let book = &mut *guard;

            let deposit = book.ledger.debit(terms.sender(), terms.amount())?;
            let id = book.fresh_id();
            let account = EscrowAccount::open(id, terms, metadata, deposit);
            let snapshot = account.snapshot();

            let sync_lock = Arc::new(Mutex::new(()));
            let sync_guard = sync_lock.clone().lock_owned().await;
            book.sync_locks.insert(id, sync_lock);

            book.accounts.insert(id, account);
            book.record(
                id,
                EscrowEventKind::Created,
                Some(snapshot.sender.clone()),
                Some(snapshot.amount),
                Some(serde_json::json!({
                    "receiver": snapshot.receiver,
                    "alias": snapshot.alias,
                })),
            );

            (snapshot, sync_guard)
        };

        info!("Created escrow: {}", snapshot.id);

        self.sync_register(&snapshot).await;
        drop(sync_guard);

        Ok(snapshot)
    }

    /// Sender approval; releases the deposit when the receiver already approved
    pub async fn approve_as_sender(
        &self,
        id: AccountId,
        caller: &PartyId,
    ) -> EscrowResult<ApprovalOutcome> {
        self.approve(id, Role::Sender, caller).await
    }

    /// Receiver approval; releases the deposit when the sender already approved
    pub async fn approve_as_receiver(
        &self,
        id: AccountId,
        caller: &PartyId,
    ) -> EscrowResult<ApprovalOutcome> {
        self.approve(id, Role::Receiver, caller).await
    }

    async fn approve(&self, id: AccountId, role: Role, caller: &PartyId) -> EscrowResult<ApprovalOutcome> {
        info!("Approving escrow {} as {}: {}", id, role, caller);

        let (outcome, sync_lock) = {
            let mut guard = self.book.write().await;
            let book = &mut *guard;

            let account = book.account_mut(id)?;
            let settlement = account.approve(role, caller)?;
            let snapshot = account.snapshot();

            book.record(
                id,
                EscrowEventKind::Approved,
                Some(caller.clone()),
                None,
                Some(serde_json::json!({ "role": role })),
            );

            let released = settlement.is_some();
            if let Some(settlement) = settlement {
                book.settle(settlement);
            }

            let outcome = ApprovalOutcome {
                snapshot,
                released,
            };
            (outcome, book.sync_lock(id))
        };

        if outcome.released {
            let _order = sync_lock.lock().await;
            self.sync_deregister(id, caller).await;
        }

        Ok(outcome)
    }

    /// Return the deposit to the sender while fewer than two approvals are set
    pub async fn refund(&self, id: AccountId, caller: &PartyId) -> EscrowResult<AccountSnapshot> {
        info!("Refunding escrow {}: {}", id, caller);

        let (snapshot, sync_lock) = {
            let mut guard = self.book.write().await;
            let book = &mut *guard;

            let account = book.account_mut(id)?;
            let settlement = account.refund(caller)?;
            let snapshot = account.snapshot();

            book.settle(settlement);
            (snapshot, book.sync_lock(id))
        };

        let _order = sync_lock.lock().await;
        self.sync_deregister(id, caller).await;

        Ok(snapshot)
    }

    /// Remove an escrow from the registry at the request of either party.
    ///
    /// Custody is untouched; registry failures are returned to the caller.
    pub async fn delist(&self, id: AccountId, caller: &PartyId) -> EscrowResult<()> {
        let sync_lock = {
            let book = self.book.read().await;
            let account = book.account(id)?;
            if account.role_of(caller).is_none() {
                return Err(EscrowError::NotAParty {
                    caller: caller.clone(),
                    account: id,
                });
            }
            book.sync_lock(id)
        };

        {
            let _order = sync_lock.lock().await;
            self.registry.deregister(id, caller).await?;
        }

        self.book.write().await.record(
            id,
            EscrowEventKind::Delisted,
            Some(caller.clone()),
            None,
            None,
        );

        info!("Delisted escrow {}: {}", id, caller);

        Ok(())
    }

    /// Get a snapshot of one escrow
    pub async fn get_account(&self, id: AccountId) -> EscrowResult<AccountSnapshot> {
        debug!("Reading escrow {}", id);
        let book = self.book.read().await;
        book.account(id).map(EscrowAccount::snapshot)
    }

    /// All escrows where `party` is sender or receiver, oldest first
    pub async fn accounts_for(&self, party: &PartyId) -> Vec<AccountSnapshot> {
        let book = self.book.read().await;
        let mut accounts: Vec<AccountSnapshot> = book
            .accounts
            .values()
            .filter(|account| account.role_of(party).is_some())
            .map(EscrowAccount::snapshot)
            .collect();

        accounts.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        accounts
    }

    /// Audit trail of one escrow
    pub async fn events_for(&self, id: AccountId) -> EscrowResult<Vec<EscrowEvent>> {
        let book = self.book.read().await;
        book.account(id)?;

        Ok(book
            .events
            .iter()
            .filter(|event| event.account_id == id)
            .cloned()
            .collect())
    }

    /// Ledger balance of a party
    pub async fn balance_of(&self, party: &PartyId) -> Decimal {
        self.book.read().await.ledger.balance_of(party)
    }

    /// Issue value to a party, returning the new balance
    pub async fn mint(&self, party: &PartyId, amount: Decimal) -> EscrowResult<Decimal> {
        let balance = self.book.write().await.ledger.mint(party, amount)?;
        info!("Minted {} to {}", amount, party);
        Ok(balance)
    }

    /// Supply, custody and conservation check
    pub async fn ledger_totals(&self) -> LedgerTotals {
        let book = self.book.read().await;
        LedgerTotals {
            supply: book.ledger.supply(),
            held: book.ledger.held(),
            balanced: book.ledger.is_balanced(),
        }
    }

    async fn sync_register(&self, snapshot: &AccountSnapshot) {
        if let Err(e) = self
            .registry
            .register(RegistryEntry::from_snapshot(snapshot))
            .await
        {
            warn!(id = %snapshot.id, error = %e, "registry register failed");
        }
    }

    async fn sync_deregister(&self, id: AccountId, actor: &PartyId) {
        if let Err(e) = self.registry.deregister(id, actor).await {
            warn!(%id, error = %e, "registry deregister failed");
        }
    }
}

impl Default for EscrowManager {
    fn default() -> Self {
        Self::new(Arc::new(InMemoryRegistry::new()))
    }
}

//! Dual-approval escrow custody
//!
//! A sender locks a deposit for a named receiver; the deposit is released to
//! the receiver only once both parties have approved, or returned to the
//! sender while approval is incomplete.
//!
//! - [`account`]: per-escrow state machine owning the held deposit
//! - [`ledger`]: party balances and the move-only [`Funds`] token
//! - [`manager`]: single-writer coordinator, the transaction boundary
//! - [`registry`]: advisory discovery index (in-process or over HTTP)

pub mod account;
pub mod error;
pub mod ledger;
pub mod manager;
pub mod models;
pub mod registry;

pub use account::EscrowAccount;
pub use error::EscrowError;
pub use ledger::{Funds, Ledger};
pub use manager::{ApprovalOutcome, CreateEscrowRequest, EscrowManager, LedgerTotals};
pub use models::{AccountSnapshot, EscrowEvent, EscrowEventKind, EscrowState, Role};
pub use registry::{HttpRegistry, InMemoryRegistry, RegistryEntry, RegistryError, RegistrySync};

/// Result type alias for escrow operations
pub type EscrowResult<T> = Result<T, EscrowError>;

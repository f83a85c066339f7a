pub mod escrow;
pub mod ledger;
pub mod registry;

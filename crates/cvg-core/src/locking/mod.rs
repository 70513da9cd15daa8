//! Lock ledger: vote-escrow positions with governance and yield-share weights.

pub mod ledger;
pub mod types;

pub use ledger::LockingLedger;
pub use types::{LockExtension, LockPosition, MintPosition, MAX_LOCK, TDE_DURATION};

//! Chunked reward distributor.
//!
//! CHECKPOINT -> TOTAL_WEIGHT -> DISTRIBUTE -> SYNC, each phase spread over as many
//! `advance` calls as its chunk size requires. The vote ledger stays locked from the
//! first checkpoint chunk until SYNC.

pub mod invariants;
pub mod state;
pub mod step;


pub use invariants::check_invariants;
pub use state::{ChunkSizes, Phase, RewardDistributor, State};
pub use step::Effects;

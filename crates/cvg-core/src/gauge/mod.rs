//! Gauge registry and vote ledger.
//!
//! Gauges are stored in an arena addressed by stable [`GaugeId`](crate::GaugeId)s.
//! The list the distributor iterates is kept apart and compacted when a gauge is killed.

pub mod controller;
pub mod types;

pub use controller::GaugeController;
pub use types::{Gauge, GaugeDirectory, GaugeType, GaugeVote, Point, VoteSlope};

//! Candidate selection & scheduler (spec.md §4.5): filter, rank, and
//! materialize execution plans; persist the plan queue atomically.

pub mod filter;
pub mod materialize;
pub mod queue;
pub mod rank;

pub use filter::{filter, FilterCounters, RejectReason};
pub use materialize::{materialize, materialize_all};
pub use queue::PlanQueue;
pub use rank::rank;

use crate::config::EngineConfig;
use crate::state::Candidate;

/// Filter then rank in one step, the scheduler tick's selection phase
/// (spec.md §4.5).
pub fn select(candidates: Vec<Candidate>, cfg: &EngineConfig) -> (Vec<Candidate>, FilterCounters) {
    let (mut survivors, counters) = filter(candidates, cfg);
    rank(&mut survivors);
    (survivors, counters)
}

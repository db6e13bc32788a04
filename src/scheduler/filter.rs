//! Candidate filter stage (spec.md §4.5): reject candidates missing health
//! or borrow value, force-include eligible ones, reject on ev/ttl/hazard
//! thresholds while tracking per-reason counters.

use crate::config::EngineConfig;
use crate::state::Candidate;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    MissingHealth,
    MissingBorrowValue,
    Ev,
    Ttl,
    Hazard,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct FilterCounters {
    pub missing_health: u32,
    pub missing_borrow_value: u32,
    pub ev: u32,
    pub ttl: u32,
    pub hazard: u32,
}

impl FilterCounters {
    fn record(&mut self, reason: RejectReason) {
        match reason {
            RejectReason::MissingHealth => self.missing_health += 1,
            RejectReason::MissingBorrowValue => self.missing_borrow_value += 1,
            RejectReason::Ev => self.ev += 1,
            RejectReason::Ttl => self.ttl += 1,
            RejectReason::Hazard => self.hazard += 1,
        }
    }

    pub fn total_rejected(&self) -> u32 {
        self.missing_health + self.missing_borrow_value + self.ev + self.ttl + self.hazard
    }
}

/// Normalize and filter candidates, returning survivors plus per-reason
/// rejection counts.
pub fn filter(candidates: Vec<Candidate>, cfg: &EngineConfig) -> (Vec<Candidate>, FilterCounters) {
    let mut counters = FilterCounters::default();
    let mut survivors = Vec::with_capacity(candidates.len());

    for candidate in candidates {
        if !candidate.health_ratio.is_finite() {
            counters.record(RejectReason::MissingHealth);
            continue;
        }
        if candidate.borrow_usd <= 0.0 {
            counters.record(RejectReason::MissingBorrowValue);
            continue;
        }

        if cfg.force_include_eligible && candidate.liquidation_eligible {
            survivors.push(candidate);
            continue;
        }

        if candidate.ev <= cfg.min_ev {
            counters.record(RejectReason::Ev);
            continue;
        }
        if let Some(ttl) = candidate.ttl_min {
            if ttl > cfg.max_ttl_min {
                counters.record(RejectReason::Ttl);
                continue;
            }
        }
        if candidate.hazard.0 <= cfg.min_hazard {
            counters.record(RejectReason::Hazard);
            continue;
        }

        survivors.push(candidate);
    }

    (survivors, counters)
}

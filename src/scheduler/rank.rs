//! Candidate ranking (spec.md §4.5): sort by eligibility, then ev, ttl,
//! hazard, all descending except ttl (ascending, null last).

use std::cmp::Ordering;

use crate::state::Candidate;

fn ttl_cmp(a: Option<f64>, b: Option<f64>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.partial_cmp(&b).unwrap_or(Ordering::Equal),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Sort candidates in place per spec.md §4.5's four-key order.
pub fn rank(candidates: &mut [Candidate]) {
    candidates.sort_by(|a, b| {
        b.liquidation_eligible
            .cmp(&a.liquidation_eligible)
            .then_with(|| b.ev.partial_cmp(&a.ev).unwrap_or(Ordering::Equal))
            .then_with(|| ttl_cmp(a.ttl_min, b.ttl_min))
            .then_with(|| b.hazard.0.partial_cmp(&a.hazard.0).unwrap_or(Ordering::Equal))
    });
}

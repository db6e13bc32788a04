use solana_sdk::pubkey::Pubkey;

use crate::state::plan::Plan;

/// Monotone risk score used for ranking (spec.md GLOSSARY, §4.5).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hazard(pub f64);

impl Hazard {
    /// `1 - exp(-alpha * max(0, 1 - hr))`.
    pub fn compute(health_ratio: f64, alpha: f64) -> Self {
        let shortfall = (1.0 - health_ratio).max(0.0);
        Hazard(1.0 - (-alpha * shortfall).exp())
    }
}

/// A derived, scored record attached to an obligation (spec.md §3.4).
#[derive(Debug, Clone)]
pub struct Candidate {
    pub obligation: Pubkey,
    pub health_ratio: f64,
    pub health_ratio_raw: f64,
    pub borrow_usd: f64,
    pub collateral_usd: f64,
    pub hazard: Hazard,
    pub ev: f64,
    pub ttl_min: Option<f64>,
    pub liquidation_eligible: bool,
    pub plan: Option<Plan>,
}

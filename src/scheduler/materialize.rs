//! Candidate/plan materialization (spec.md §4.5): turn a scored obligation
//! into a ranked `Candidate`, computing hazard, expected value, and
//! time-to-liquidation, and populating the execution-critical `Plan` fields.

use std::cmp::Ordering;
use std::collections::HashMap;

use solana_sdk::pubkey::Pubkey;

use crate::cache::reserve::ReserveIndex;
use crate::config::{EngineConfig, EvParams};
use crate::scorer::{value_borrow, value_deposit, Scored};
use crate::state::obligation::Obligation;
use crate::state::oracle::OraclePrice;
use crate::state::plan::{Plan, PLAN_VERSION};
use crate::state::{Candidate, Hazard};

/// Turn one scored obligation into a ranked candidate with a materialized
/// plan, wherever the obligation's deposit/borrow lines resolve cleanly
/// enough to pick a repay and seize target (spec.md §4.5: "all
/// execution-critical fields populated"). A missing plan still yields a
/// candidate — the filter stage rejects on borrow/health value, not on plan
/// presence.
pub fn materialize(
    obligation: &Obligation,
    scored: &Scored,
    reserves: &ReserveIndex,
    oracles: &HashMap<Pubkey, OraclePrice>,
    cfg: &EngineConfig,
    now_unix: i64,
) -> Candidate {
    let hazard = Hazard::compute(scored.health_ratio, cfg.hazard_alpha);
    let plan = build_plan(obligation, scored, reserves, oracles, cfg, now_unix);
    let ev = plan
        .as_ref()
        .map(|(_, repay_usd_capped)| expected_value(*repay_usd_capped, &cfg.ev_params))
        .unwrap_or(0.0);
    let ttl_min = time_to_liquidation(scored.health_ratio, cfg);

    Candidate {
        obligation: obligation.address,
        health_ratio: scored.health_ratio,
        health_ratio_raw: scored.health_ratio_raw,
        borrow_usd: scored.borrow_value,
        collateral_usd: scored.collateral_value,
        hazard,
        ev,
        ttl_min,
        liquidation_eligible: scored.liquidation_eligible,
        plan: plan.map(|(plan, _)| plan),
    }
}

/// Materialize every already-scored obligation into a candidate, ready for
/// `filter`/`rank` (spec.md §4.5's selection pipeline).
pub fn materialize_all<'a>(
    scored_obligations: impl IntoIterator<Item = (&'a Obligation, &'a Scored)>,
    reserves: &ReserveIndex,
    oracles: &HashMap<Pubkey, OraclePrice>,
    cfg: &EngineConfig,
    now_unix: i64,
) -> Vec<Candidate> {
    scored_obligations
        .into_iter()
        .map(|(obligation, scored)| materialize(obligation, scored, reserves, oracles, cfg, now_unix))
        .collect()
}

fn largest_by_value<T>(items: &[T], value: impl Fn(&T) -> Option<f64>) -> Option<(&T, f64)> {
    items
        .iter()
        .filter_map(|item| value(item).map(|v| (item, v)))
        .max_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(Ordering::Equal))
}

/// Pick the largest-value borrow line as the repay target and the
/// largest-value deposit line as the seize target, then build the plan's
/// amount from the repay line capped by `closeFactorPct` (spec.md §6.5).
/// Returns the capped repay USD alongside the plan so the caller can feed it
/// into the EV model without recomputing the line selection.
fn build_plan(
    obligation: &Obligation,
    scored: &Scored,
    reserves: &ReserveIndex,
    oracles: &HashMap<Pubkey, OraclePrice>,
    cfg: &EngineConfig,
    now_unix: i64,
) -> Option<(Plan, f64)> {
    let (repay_borrow, repay_raw_value) = largest_by_value(&obligation.borrows, |b| {
        value_borrow(b, reserves, oracles).ok().map(|(raw, _)| raw)
    })?;
    let (seize_deposit, _) = largest_by_value(&obligation.deposits, |d| {
        value_deposit(d, reserves, oracles).ok().map(|(raw, _)| raw)
    })?;

    let repay_reserve = reserves.by_reserve.get(&repay_borrow.reserve)?;
    let seize_reserve = reserves.by_reserve.get(&seize_deposit.reserve)?;
    let repay_price = oracles.get(&repay_reserve.liquidity_mint)?;
    let repay_decimals = repay_reserve.liquidity_decimals?;
    let seize_decimals = seize_reserve.collateral_decimals?;

    let repay_usd_capped = repay_raw_value * (cfg.ev_params.close_factor_pct / 100.0);
    let amount_ui = repay_usd_capped / repay_price.ui_price();
    if !amount_ui.is_finite() || amount_ui <= 0.0 {
        return None;
    }

    Some((
        Plan {
            version: PLAN_VERSION,
            obligation: obligation.address,
            repay_mint: repay_reserve.liquidity_mint,
            seize_mint: seize_reserve.collateral_mint,
            repay_reserve: repay_borrow.reserve,
            collateral_reserve: seize_deposit.reserve,
            amount_ui,
            repay_decimals,
            seize_decimals,
            created_at_unix: now_unix,
            liquidation_eligible: scored.liquidation_eligible,
        },
        repay_usd_capped,
    ))
}

/// Expected USD value of liquidating `repayUsd` of debt: the liquidation
/// bonus less slippage buffer on proceeds, minus the flashloan fee and fixed
/// gas cost (spec.md §6.5 `evParams.*`).
fn expected_value(repay_usd: f64, params: &EvParams) -> f64 {
    let proceeds = repay_usd
        * (1.0 + params.liquidation_bonus_pct / 100.0)
        * (1.0 - params.slippage_buffer_pct / 100.0);
    let cost = repay_usd * (1.0 + params.flashloan_fee_pct / 100.0) + params.fixed_gas_usd;
    proceeds - cost
}

/// Minutes until `healthRatio` crosses 1.0 under a constant geometric
/// collateral-value decay of `ttlDropPerMinPct`% per minute (spec.md §6.5).
/// `Some(0.0)` when already eligible, `None` when the required drop exceeds
/// `ttlMaxDropPct` (beyond the modeled horizon).
fn time_to_liquidation(health_ratio: f64, cfg: &EngineConfig) -> Option<f64> {
    if !health_ratio.is_finite() {
        return None;
    }
    if health_ratio <= 1.0 {
        return Some(0.0);
    }

    let required_drop_fraction = 1.0 - 1.0 / health_ratio;
    if required_drop_fraction > cfg.ttl_max_drop_pct / 100.0 {
        return None;
    }

    let drop_per_min = cfg.ttl_drop_per_min_pct / 100.0;
    if !(0.0..1.0).contains(&drop_per_min) {
        return None;
    }

    let t = (1.0 / health_ratio).ln() / (1.0 - drop_per_min).ln();
    if t.is_finite() && t >= 0.0 {
        Some(t)
    } else {
        None
    }
}

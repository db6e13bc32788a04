//! Health scorer (spec.md §4.3): a pure function from an obligation plus the
//! reserve/oracle caches to a scored outcome. No I/O, hand-fixturable.

use std::collections::HashMap;

use solana_sdk::pubkey::Pubkey;

use crate::cache::reserve::ReserveIndex;
use crate::config::{EngineConfig, HealthSource};
use crate::error::UnscoredReason;
use crate::fixed::sf_div_bsf;
use crate::state::obligation::Obligation;
use crate::state::oracle::OraclePrice;

/// Health ratio is clamped to this range for ranking purposes (§4.3).
const HEALTH_RATIO_CLAMP_MAX: f64 = 2.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Scored {
    pub health_ratio: f64,
    pub health_ratio_raw: f64,
    pub borrow_value: f64,
    pub collateral_value: f64,
    pub collateral_value_adj: f64,
    pub total_borrow_usd: f64,
    pub liquidation_eligible: bool,
    /// Diagnostic only, never used for gating (§4.3).
    pub liquidation_eligible_protocol: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ScoreOutcome {
    Scored(Scored),
    Unscored(UnscoredReason),
}

/// Score one obligation against the current reserve/oracle snapshot.
pub fn score(
    obligation: &Obligation,
    reserves: &ReserveIndex,
    oracles: &HashMap<Pubkey, OraclePrice>,
    market: &Pubkey,
    current_slot: u64,
    cfg: &EngineConfig,
) -> ScoreOutcome {
    if obligation.is_empty() {
        return ScoreOutcome::Unscored(UnscoredReason::EmptyObligation);
    }
    if obligation.market != *market {
        return ScoreOutcome::Unscored(UnscoredReason::OtherMarket);
    }

    if let Some(reason) = check_scope(obligation, reserves, cfg) {
        return ScoreOutcome::Unscored(reason);
    }

    let mut collateral_value = 0.0;
    let mut collateral_value_adj = 0.0;
    for deposit in &obligation.deposits {
        match value_deposit(deposit, reserves, oracles) {
            Ok((raw, adj)) => {
                collateral_value += raw;
                collateral_value_adj += adj;
            }
            Err(reason) => return ScoreOutcome::Unscored(reason),
        }
    }

    let mut borrow_value = 0.0;
    let mut total_borrow_usd = 0.0;
    for borrow in &obligation.borrows {
        match value_borrow(borrow, reserves, oracles) {
            Ok((raw, weighted)) => {
                borrow_value += raw;
                total_borrow_usd += weighted;
            }
            Err(reason) => return ScoreOutcome::Unscored(reason),
        }
    }

    let health_ratio_raw = if total_borrow_usd == 0.0 {
        HEALTH_RATIO_CLAMP_MAX
    } else if collateral_value_adj == 0.0 {
        0.0
    } else {
        collateral_value_adj / total_borrow_usd
    };
    let recomputed_ratio = health_ratio_raw.clamp(0.0, HEALTH_RATIO_CLAMP_MAX);

    let hybrid_ratio = hybrid_ratio(obligation, current_slot, cfg);

    let (health_ratio, health_ratio_raw) = match cfg.health_source {
        HealthSource::Recomputed => (recomputed_ratio, health_ratio_raw),
        HealthSource::Hybrid => match hybrid_ratio {
            Some(hybrid) => (hybrid, hybrid),
            None => (recomputed_ratio, health_ratio_raw),
        },
    };

    let liquidation_eligible = health_ratio < 1.0;
    let liquidation_eligible_protocol = obligation.stored.unhealthy_borrow_value_sf
        <= obligation.stored.borrow_factor_adjusted_debt_sf;

    ScoreOutcome::Scored(Scored {
        health_ratio,
        health_ratio_raw,
        borrow_value,
        collateral_value,
        collateral_value_adj,
        total_borrow_usd,
        liquidation_eligible,
        liquidation_eligible_protocol,
    })
}

fn check_scope(
    obligation: &Obligation,
    reserves: &ReserveIndex,
    cfg: &EngineConfig,
) -> Option<UnscoredReason> {
    if cfg.allowlist_mints.is_empty() {
        return None;
    }
    let mut saw_in_scope = false;
    let mut saw_out_of_scope = false;
    for mint in obligation
        .deposits
        .iter()
        .map(|d| d.mint)
        .chain(obligation.borrows.iter().map(|b| b.mint))
    {
        if cfg.allowlist_mints.contains(&mint) && reserves.by_mint.contains_key(&mint) {
            saw_in_scope = true;
        } else {
            saw_out_of_scope = true;
        }
    }
    if saw_out_of_scope && saw_in_scope {
        Some(UnscoredReason::MixedOutOfScopeReserve)
    } else if saw_out_of_scope {
        Some(UnscoredReason::NotInAllowlist)
    } else {
        None
    }
}

pub(crate) fn value_deposit(
    deposit: &crate::state::obligation::Deposit,
    reserves: &ReserveIndex,
    oracles: &HashMap<Pubkey, OraclePrice>,
) -> Result<(f64, f64), UnscoredReason> {
    let reserve = reserves
        .by_reserve
        .get(&deposit.reserve)
        .ok_or(UnscoredReason::MissingReserve)?;
    let price = oracles
        .get(&reserve.liquidity_mint)
        .ok_or(UnscoredReason::MissingOraclePrice)?;
    let exchange_rate = reserve
        .exchange_rate()
        .ok_or(UnscoredReason::MissingExchangeRate)?;
    let collateral_decimals = reserve
        .collateral_decimals
        .ok_or(UnscoredReason::MissingExchangeRate)?;

    let deposited_notes_ui =
        deposit.deposited_amount_notes as f64 / 10f64.powi(collateral_decimals as i32);
    let underlying_ui = deposited_notes_ui / exchange_rate;
    if !underlying_ui.is_finite() {
        return Err(UnscoredReason::InvalidMath);
    }

    let conservative_price = (price.ui_price() - price.ui_confidence()).max(0.0);
    let raw_value = underlying_ui * conservative_price;
    let weight = reserve.liquidation_threshold_pct as f64 / 100.0;
    Ok((raw_value, raw_value * weight))
}

pub(crate) fn value_borrow(
    borrow: &crate::state::obligation::Borrow,
    reserves: &ReserveIndex,
    oracles: &HashMap<Pubkey, OraclePrice>,
) -> Result<(f64, f64), UnscoredReason> {
    let reserve = reserves
        .by_reserve
        .get(&borrow.reserve)
        .ok_or(UnscoredReason::MissingReserve)?;
    let price = oracles
        .get(&reserve.liquidity_mint)
        .ok_or(UnscoredReason::MissingOraclePrice)?;
    let liquidity_decimals = reserve
        .liquidity_decimals
        .ok_or(UnscoredReason::MissingExchangeRate)?;

    let borrowed_raw_sf = sf_div_bsf(borrow.borrowed_amount_sf, reserve.cumulative_borrow_rate_bsf)
        .ok_or(UnscoredReason::InvalidMath)?;
    let borrowed_raw = crate::fixed::sf_to_raw(borrowed_raw_sf);
    let borrowed_ui = crate::fixed::raw_to_ui(borrowed_raw, liquidity_decimals);

    let aggressive_price = price.ui_price() + price.ui_confidence();
    let raw_value = borrowed_ui * aggressive_price;
    let weight = reserve.borrow_factor_pct as f64 / 100.0;
    Ok((raw_value, raw_value * weight))
}

fn hybrid_ratio(obligation: &Obligation, current_slot: u64, cfg: &EngineConfig) -> Option<f64> {
    if obligation.slot_lag(current_slot) > cfg.sf_stale_slot_threshold {
        return None;
    }
    let debt = obligation.stored.borrow_factor_adjusted_debt_sf;
    if debt == 0 {
        return Some(HEALTH_RATIO_CLAMP_MAX);
    }
    let ratio = obligation.stored.unhealthy_borrow_value_sf as f64 / debt as f64;
    Some(ratio.clamp(0.0, HEALTH_RATIO_CLAMP_MAX))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixed::{SF_SCALE, U256};
    use crate::state::obligation::{Borrow, Deposit, StoredRiskValues};
    use crate::state::oracle::OracleVariant;
    use crate::state::Reserve;

    fn sol_reserve(address: Pubkey, mint: Pubkey, liq_thresh: u8) -> Reserve {
        Reserve {
            address,
            liquidity_mint: mint,
            collateral_mint: Pubkey::new_unique(),
            liquidity_decimals: Some(9),
            collateral_decimals: Some(9),
            loan_to_value_pct: 70,
            liquidation_threshold_pct: liq_thresh,
            liquidation_bonus_bps: 500,
            borrow_factor_pct: 100,
            oracle_accounts: vec![],
            available_liquidity_raw: 1_000_000_000,
            borrowed_amount_sf: 0,
            cumulative_borrow_rate_bsf: U256::from(SF_SCALE),
            collateral_mint_total_supply: 1_000_000_000,
            scope_price_chain: None,
        }
    }

    fn usdc_reserve(address: Pubkey, mint: Pubkey, bf: u16) -> Reserve {
        Reserve {
            address,
            liquidity_mint: mint,
            collateral_mint: Pubkey::new_unique(),
            liquidity_decimals: Some(6),
            collateral_decimals: Some(6),
            loan_to_value_pct: 80,
            liquidation_threshold_pct: 85,
            liquidation_bonus_bps: 500,
            borrow_factor_pct: bf,
            oracle_accounts: vec![],
            available_liquidity_raw: 1_000_000,
            borrowed_amount_sf: 0,
            cumulative_borrow_rate_bsf: U256::from(SF_SCALE),
            collateral_mint_total_supply: 1_000_000,
            scope_price_chain: None,
        }
    }

    fn flat_price(mint: Pubkey, ui_price: f64) -> OraclePrice {
        OraclePrice {
            mint,
            variant: OracleVariant::Pyth,
            mantissa: (ui_price * 1e8) as i64,
            exponent: -8,
            confidence: 0,
            timestamp: 0,
            slot: 0,
        }
    }

    fn build_index(reserves: Vec<Reserve>) -> ReserveIndex {
        crate::cache::reserve::build_index(reserves, None)
    }

    /// Scenario 1 from spec.md §8: 1 SOL @ $100 (liqThresh 85%), 50 USDC
    /// borrowed @ $1 (bf 100%) -> collateralValue~85, borrowValue~50, hr~1.70.
    #[test]
    fn scenario_one_healthy_position() {
        let sol_reserve_addr = Pubkey::new_unique();
        let sol_mint = Pubkey::new_unique();
        let usdc_reserve_addr = Pubkey::new_unique();
        let usdc_mint = Pubkey::new_unique();

        let index = build_index(vec![
            sol_reserve(sol_reserve_addr, sol_mint, 85),
            usdc_reserve(usdc_reserve_addr, usdc_mint, 100),
        ]);
        let mut oracles = HashMap::new();
        oracles.insert(sol_mint, flat_price(sol_mint, 100.0));
        oracles.insert(usdc_mint, flat_price(usdc_mint, 1.0));

        let market = Pubkey::new_unique();
        let obligation = Obligation {
            address: Pubkey::new_unique(),
            owner: Pubkey::new_unique(),
            market,
            last_update_slot: 0,
            deposits: vec![Deposit {
                reserve: sol_reserve_addr,
                mint: sol_mint,
                deposited_amount_notes: 1_000_000_000,
            }],
            borrows: vec![Borrow {
                reserve: usdc_reserve_addr,
                mint: usdc_mint,
                borrowed_amount_sf: 50_000_000u128 * SF_SCALE,
            }],
            stored: StoredRiskValues::default(),
        };

        let cfg = EngineConfig::default();
        let outcome = score(&obligation, &index, &oracles, &market, 0, &cfg);
        match outcome {
            ScoreOutcome::Scored(scored) => {
                assert!((scored.collateral_value - 100.0).abs() < 1e-6);
                assert!((scored.collateral_value_adj - 85.0).abs() < 1e-6);
                assert!((scored.borrow_value - 50.0).abs() < 1e-6);
                assert!((scored.health_ratio - 1.70).abs() < 1e-6);
                assert!(!scored.liquidation_eligible);
            }
            other => panic!("expected Scored, got {other:?}"),
        }
    }

    /// Scenario 2: 0.5 SOL @ $100 (liqThresh 60%), 100 USDC @ $1 (bf 100%)
    /// -> hr~0.30, eligible.
    #[test]
    fn scenario_two_eligible_position() {
        let sol_reserve_addr = Pubkey::new_unique();
        let sol_mint = Pubkey::new_unique();
        let usdc_reserve_addr = Pubkey::new_unique();
        let usdc_mint = Pubkey::new_unique();

        let index = build_index(vec![
            sol_reserve(sol_reserve_addr, sol_mint, 60),
            usdc_reserve(usdc_reserve_addr, usdc_mint, 100),
        ]);
        let mut oracles = HashMap::new();
        oracles.insert(sol_mint, flat_price(sol_mint, 100.0));
        oracles.insert(usdc_mint, flat_price(usdc_mint, 1.0));

        let market = Pubkey::new_unique();
        let obligation = Obligation {
            address: Pubkey::new_unique(),
            owner: Pubkey::new_unique(),
            market,
            last_update_slot: 0,
            deposits: vec![Deposit {
                reserve: sol_reserve_addr,
                mint: sol_mint,
                deposited_amount_notes: 500_000_000,
            }],
            borrows: vec![Borrow {
                reserve: usdc_reserve_addr,
                mint: usdc_mint,
                borrowed_amount_sf: 100_000_000u128 * SF_SCALE,
            }],
            stored: StoredRiskValues::default(),
        };

        let cfg = EngineConfig::default();
        let outcome = score(&obligation, &index, &oracles, &market, 0, &cfg);
        match outcome {
            ScoreOutcome::Scored(scored) => {
                assert!((scored.health_ratio - 0.30).abs() < 1e-6);
                assert!(scored.liquidation_eligible);
            }
            other => panic!("expected Scored, got {other:?}"),
        }
    }

    /// Scenario 3: 10 SOL deposit, 0.1 SOL borrow, same reserve -> hr clamped
    /// to 2, hrRaw very large. Also covers invariant 2 (hrRaw >= hr).
    #[test]
    fn scenario_three_clamps_health_ratio() {
        let sol_reserve_addr = Pubkey::new_unique();
        let sol_mint = Pubkey::new_unique();
        let index = build_index(vec![sol_reserve(sol_reserve_addr, sol_mint, 85)]);
        let mut oracles = HashMap::new();
        oracles.insert(sol_mint, flat_price(sol_mint, 100.0));

        let market = Pubkey::new_unique();
        let obligation = Obligation {
            address: Pubkey::new_unique(),
            owner: Pubkey::new_unique(),
            market,
            last_update_slot: 0,
            deposits: vec![Deposit {
                reserve: sol_reserve_addr,
                mint: sol_mint,
                deposited_amount_notes: 10_000_000_000,
            }],
            borrows: vec![Borrow {
                reserve: sol_reserve_addr,
                mint: sol_mint,
                borrowed_amount_sf: 100_000_000u128 * SF_SCALE,
            }],
            stored: StoredRiskValues::default(),
        };

        let cfg = EngineConfig::default();
        let outcome = score(&obligation, &index, &oracles, &market, 0, &cfg);
        match outcome {
            ScoreOutcome::Scored(scored) => {
                assert_eq!(scored.health_ratio, 2.0);
                assert!(scored.health_ratio_raw >= scored.health_ratio);
                assert!(scored.health_ratio_raw > 2.0);
            }
            other => panic!("expected Scored, got {other:?}"),
        }
    }

    /// Scenario 4: obligation references a reserve absent from the cache.
    #[test]
    fn scenario_four_missing_reserve() {
        let index = build_index(vec![]);
        let oracles = HashMap::new();
        let market = Pubkey::new_unique();
        let obligation = Obligation {
            address: Pubkey::new_unique(),
            owner: Pubkey::new_unique(),
            market,
            last_update_slot: 0,
            deposits: vec![Deposit {
                reserve: Pubkey::new_unique(),
                mint: Pubkey::new_unique(),
                deposited_amount_notes: 1,
            }],
            borrows: vec![],
            stored: StoredRiskValues::default(),
        };
        let cfg = EngineConfig::default();
        let outcome = score(&obligation, &index, &oracles, &market, 0, &cfg);
        assert_eq!(
            outcome,
            ScoreOutcome::Unscored(UnscoredReason::MissingReserve)
        );
    }

    #[test]
    fn empty_obligation_is_unscored() {
        let index = build_index(vec![]);
        let oracles = HashMap::new();
        let market = Pubkey::new_unique();
        let obligation = Obligation {
            address: Pubkey::new_unique(),
            owner: Pubkey::new_unique(),
            market,
            last_update_slot: 0,
            deposits: vec![],
            borrows: vec![],
            stored: StoredRiskValues::default(),
        };
        let cfg = EngineConfig::default();
        assert_eq!(
            score(&obligation, &index, &oracles, &market, 0, &cfg),
            ScoreOutcome::Unscored(UnscoredReason::EmptyObligation)
        );
    }

    #[test]
    fn hybrid_source_disabled_when_stale_falls_back_to_recomputed() {
        let sol_reserve_addr = Pubkey::new_unique();
        let sol_mint = Pubkey::new_unique();
        let usdc_reserve_addr = Pubkey::new_unique();
        let usdc_mint = Pubkey::new_unique();

        let index = build_index(vec![
            sol_reserve(sol_reserve_addr, sol_mint, 85),
            usdc_reserve(usdc_reserve_addr, usdc_mint, 100),
        ]);
        let mut oracles = HashMap::new();
        oracles.insert(sol_mint, flat_price(sol_mint, 100.0));
        oracles.insert(usdc_mint, flat_price(usdc_mint, 1.0));

        let market = Pubkey::new_unique();
        let mut obligation = Obligation {
            address: Pubkey::new_unique(),
            owner: Pubkey::new_unique(),
            market,
            last_update_slot: 0,
            deposits: vec![Deposit {
                reserve: sol_reserve_addr,
                mint: sol_mint,
                deposited_amount_notes: 1_000_000_000,
            }],
            borrows: vec![Borrow {
                reserve: usdc_reserve_addr,
                mint: usdc_mint,
                borrowed_amount_sf: 50_000_000u128 * SF_SCALE,
            }],
            stored: StoredRiskValues {
                unhealthy_borrow_value_sf: 1,
                borrow_factor_adjusted_debt_sf: 100,
                ..Default::default()
            },
        };

        let cfg = EngineConfig {
            health_source: HealthSource::Hybrid,
            ..EngineConfig::default()
        };

        obligation.last_update_slot = 0;
        let current_slot = cfg.sf_stale_slot_threshold + 1;
        let outcome = score(&obligation, &index, &oracles, &market, current_slot, &cfg);
        match outcome {
            ScoreOutcome::Scored(scored) => {
                // Stale -> falls back to recomputed (~1.70), not the hybrid
                // ratio (0.01) that the stored values would otherwise yield.
                assert!((scored.health_ratio - 1.70).abs() < 1e-6);
            }
            other => panic!("expected Scored, got {other:?}"),
        }
    }
}

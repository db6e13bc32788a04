use solana_sdk::pubkey::Pubkey;

use crate::fixed::{sf_to_raw, U256};

/// A lending reserve, per spec.md §3.1.
#[derive(Debug, Clone)]
pub struct Reserve {
    pub address: Pubkey,
    pub liquidity_mint: Pubkey,
    pub collateral_mint: Pubkey,
    pub liquidity_decimals: Option<u8>,
    pub collateral_decimals: Option<u8>,
    /// Percent, 0-100.
    pub loan_to_value_pct: u8,
    /// Percent, 0-100.
    pub liquidation_threshold_pct: u8,
    /// Basis points.
    pub liquidation_bonus_bps: u16,
    /// Percent, >= 100 for risky assets.
    pub borrow_factor_pct: u16,
    pub oracle_accounts: Vec<Pubkey>,
    pub available_liquidity_raw: u64,
    pub borrowed_amount_sf: u128,
    pub cumulative_borrow_rate_bsf: U256,
    pub collateral_mint_total_supply: u64,
    /// Ordered feed indices into a Scope price-chain; product of hops -> USD.
    pub scope_price_chain: Option<Vec<u16>>,
}

impl Reserve {
    /// `collateralSupplyUi / totalLiquidityUi`, undefined (`None`) when
    /// either side is non-positive (spec.md §3.1, §4.1).
    ///
    /// All arithmetic on protocol-scaled fields is performed in integer form
    /// before any floating-point conversion: `borrowedRaw = borrowedSf /
    /// 10^18`, `totalLiqRaw = availableRaw + borrowedRaw`, each side then
    /// converted to UI using its own decimals.
    pub fn exchange_rate(&self) -> Option<f64> {
        let liquidity_decimals = self.liquidity_decimals?;
        let collateral_decimals = self.collateral_decimals?;

        let available_raw = self.available_liquidity_raw as u128;
        let borrowed_raw = sf_to_raw(self.borrowed_amount_sf);
        let total_liquidity_raw = available_raw + borrowed_raw;

        if total_liquidity_raw == 0 || self.collateral_mint_total_supply == 0 {
            return None;
        }

        let total_liquidity_ui =
            total_liquidity_raw as f64 / 10f64.powi(liquidity_decimals as i32);
        let collateral_supply_ui =
            self.collateral_mint_total_supply as f64 / 10f64.powi(collateral_decimals as i32);

        if total_liquidity_ui <= 0.0 || collateral_supply_ui <= 0.0 {
            return None;
        }

        Some(collateral_supply_ui / total_liquidity_ui)
    }

    pub fn has_resolved_decimals(&self) -> bool {
        self.liquidity_decimals.is_some() && self.collateral_decimals.is_some()
    }
}

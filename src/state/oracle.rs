use solana_sdk::pubkey::Pubkey;

/// Which oracle program produced a price record (spec.md §9: tagged variant
/// replacing duck-typed dispatch).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OracleVariant {
    Pyth,
    Switchboard,
    Scope,
}

/// One decoded oracle record per liquidity/collateral mint (spec.md §3.2).
#[derive(Debug, Clone)]
pub struct OraclePrice {
    pub mint: Pubkey,
    pub variant: OracleVariant,
    /// Integer mantissa; `ui_price = mantissa * 10^exponent`.
    pub mantissa: i64,
    pub exponent: i32,
    pub confidence: u64,
    pub timestamp: i64,
    pub slot: u64,
}

impl OraclePrice {
    pub fn ui_price(&self) -> f64 {
        self.mantissa as f64 * 10f64.powi(self.exponent)
    }

    pub fn ui_confidence(&self) -> f64 {
        self.confidence as f64 * 10f64.powi(self.exponent)
    }

    /// Freshness rule (§3.2, §4.2): any oracle older than 30s is rejected.
    pub fn is_fresh(&self, now_unix: i64, max_age_sec: i64) -> bool {
        now_unix.saturating_sub(self.timestamp) <= max_age_sec
    }
}

use serde::{Deserialize, Serialize};
use solana_sdk::pubkey::Pubkey;

/// Current plan schema version (spec.md §3.4, §6.4): the executor rejects
/// anything older.
pub const PLAN_VERSION: u32 = 2;

/// A versioned execution plan for one candidate (spec.md §3.4).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Plan {
    pub version: u32,
    pub obligation: Pubkey,
    pub repay_mint: Pubkey,
    pub seize_mint: Pubkey,
    pub repay_reserve: Pubkey,
    pub collateral_reserve: Pubkey,
    pub amount_ui: f64,
    pub repay_decimals: u8,
    pub seize_decimals: u8,
    pub created_at_unix: i64,
    pub liquidation_eligible: bool,
}

impl Plan {
    pub fn is_supported_version(&self) -> bool {
        self.version >= PLAN_VERSION
    }
}

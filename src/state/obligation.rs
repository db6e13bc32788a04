use solana_sdk::pubkey::Pubkey;

/// A deposit line inside an obligation: raw collateral-note units.
#[derive(Debug, Clone)]
pub struct Deposit {
    pub reserve: Pubkey,
    pub mint: Pubkey,
    pub deposited_amount_notes: u64,
}

/// A borrow line inside an obligation: scaled-fraction debt.
#[derive(Debug, Clone)]
pub struct Borrow {
    pub reserve: Pubkey,
    pub mint: Pubkey,
    pub borrowed_amount_sf: u128,
}

/// The protocol's own stored risk values, 1e18-scaled (spec.md §3.3).
#[derive(Debug, Clone, Copy, Default)]
pub struct StoredRiskValues {
    pub deposited_value_sf: u128,
    pub borrowed_market_value_sf: u128,
    pub borrow_factor_adjusted_debt_sf: u128,
    pub unhealthy_borrow_value_sf: u128,
}

/// A borrower position (spec.md §3.3).
#[derive(Debug, Clone)]
pub struct Obligation {
    pub address: Pubkey,
    pub owner: Pubkey,
    pub market: Pubkey,
    pub last_update_slot: u64,
    pub deposits: Vec<Deposit>,
    pub borrows: Vec<Borrow>,
    pub stored: StoredRiskValues,
}

impl Obligation {
    pub fn is_empty(&self) -> bool {
        self.deposits.is_empty() && self.borrows.is_empty()
    }

    /// Slot lag against a reference slot (current or bootstrap slot), used to
    /// decide whether the stored SF values are fresh enough for the hybrid
    /// health source (§4.3).
    pub fn slot_lag(&self, current_slot: u64) -> u64 {
        current_slot.saturating_sub(self.last_update_slot)
    }
}

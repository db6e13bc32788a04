//! Fixed-point helpers. All protocol-scaled ("SF"/"BSF") arithmetic must be
//! done in wide integer form before any floating-point coercion; the float
//! step is reserved for final USD aggregation and display (spec.md §9).

uint::construct_uint! {
    /// Wide unsigned integer for big-scaled-fraction (cumulative borrow rate)
    /// arithmetic, which can exceed u128 after long compounding periods.
    pub struct U256(4);
}

/// 1e18, the SF/BSF scale factor named throughout spec.md.
pub const SF_SCALE: u128 = 1_000_000_000_000_000_000;

/// Convert a raw SF-scaled u128 balance into a token-unit u128 (integer
/// division, matching the protocol's own truncating conversion).
pub fn sf_to_raw(sf: u128) -> u128 {
    sf / SF_SCALE
}

/// Convert a raw token amount (wide, `U256`-scaled cumulative rate division)
/// into UI units given a decimals exponent. Stays in integer math until the
/// final division, which is the single float coercion point.
pub fn raw_to_ui(raw: u128, decimals: u8) -> f64 {
    raw as f64 / 10f64.powi(decimals as i32)
}

/// Divide an SF-scaled balance by a big-scaled-fraction cumulative rate
/// (`BSF`, itself SF-scaled, 1.0 == `SF_SCALE`) to recover the underlying
/// amount, still SF-scaled — call `sf_to_raw` on the result to get the raw
/// base-unit amount. All of this stays in wide integer form throughout.
pub fn sf_div_bsf(balance_sf: u128, cumulative_rate_bsf: U256) -> Option<u128> {
    if cumulative_rate_bsf.is_zero() {
        return None;
    }
    let numerator = U256::from(balance_sf) * U256::from(SF_SCALE);
    let result = numerator / cumulative_rate_bsf;
    if result > U256::from(u128::MAX) {
        None
    } else {
        Some(result.as_u128())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sf_to_raw_truncates() {
        assert_eq!(sf_to_raw(SF_SCALE * 5), 5);
        assert_eq!(sf_to_raw(SF_SCALE * 5 + 1), 5);
    }

    #[test]
    fn raw_to_ui_applies_decimals() {
        assert!((raw_to_ui(1_000_000, 6) - 1.0).abs() < 1e-9);
        assert!((raw_to_ui(1_000_000_000, 9) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn sf_div_bsf_undefined_on_zero_rate() {
        assert_eq!(sf_div_bsf(1_000, U256::zero()), None);
    }

    #[test]
    fn sf_div_bsf_identity_rate_returns_token_amount() {
        // cumulative_rate == SF_SCALE means "no interest accrued yet".
        let rate = U256::from(SF_SCALE);
        let balance_sf = SF_SCALE * 42; // 42 tokens, SF-scaled
        assert_eq!(sf_div_bsf(balance_sf, rate), Some(42 * SF_SCALE));
    }
}

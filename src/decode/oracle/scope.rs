//! Scope price-chain decode (spec.md §4.2 table): per-mint chain lookup,
//! multi-hop product with oldest-timestamp freshness; exponent fixed at
//! -8, UI product reconverted to mantissa.

use crate::error::DecodeError;

/// Exponent Scope prices are always expressed in (spec.md §4.2).
pub const SCOPE_EXPONENT: i32 = -8;

const ENTRY_LEN: usize = 8 + 8; // price mantissa (i64 LE) + unix timestamp (i64 LE)

struct ScopeEntry {
    mantissa: i64,
    timestamp: i64,
}

fn read_entry(data: &[u8], index: u16) -> Result<ScopeEntry, DecodeError> {
    let offset = index as usize * ENTRY_LEN;
    let need = offset + ENTRY_LEN;
    if data.len() < need {
        return Err(DecodeError::TooShort {
            need,
            got: data.len(),
        });
    }
    let mantissa = i64::from_le_bytes(data[offset..offset + 8].try_into().unwrap());
    let timestamp = i64::from_le_bytes(data[offset + 8..offset + 16].try_into().unwrap());
    Ok(ScopeEntry { mantissa, timestamp })
}

pub struct ScopeChainPrice {
    /// Reconverted mantissa at `SCOPE_EXPONENT`, i.e. `ui_price * 1e8`.
    pub mantissa: i64,
    /// Minimum (oldest) timestamp across all hops.
    pub oldest_timestamp: i64,
}

/// Resolve a Scope multi-hop chain: the product of each hop's UI price,
/// freshness governed by the oldest hop timestamp (spec.md §8 scenario 7).
pub fn decode_chain(data: &[u8], chain: &[u16]) -> Result<ScopeChainPrice, DecodeError> {
    if chain.is_empty() {
        return Err(DecodeError::TooShort { need: 1, got: 0 });
    }

    let mut product_ui = 1.0f64;
    let mut oldest_timestamp = i64::MAX;

    for &index in chain {
        let entry = read_entry(data, index)?;
        let hop_ui = entry.mantissa as f64 * 10f64.powi(SCOPE_EXPONENT);
        product_ui *= hop_ui;
        oldest_timestamp = oldest_timestamp.min(entry.timestamp);
    }

    let mantissa = (product_ui / 10f64.powi(SCOPE_EXPONENT)).round() as i64;

    Ok(ScopeChainPrice {
        mantissa,
        oldest_timestamp,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode(entries: &[(i64, i64)]) -> Vec<u8> {
        let mut buf = Vec::new();
        for (mantissa, timestamp) in entries {
            buf.extend_from_slice(&mantissa.to_le_bytes());
            buf.extend_from_slice(&timestamp.to_le_bytes());
        }
        buf
    }

    #[test]
    fn single_hop_price_matches_entry() {
        let data = encode(&[(8_650_000_000, 1_700_000_000)]); // 86.5 USD
        let chain = decode_chain(&data, &[0]).unwrap();
        let ui = chain.mantissa as f64 * 10f64.powi(SCOPE_EXPONENT);
        assert!((ui - 86.5).abs() < 1e-6);
    }

    #[test]
    fn two_hop_chain_multiplies_and_takes_oldest_timestamp() {
        // Scenario 7 from spec.md §8: 86.5 USD * 1.15 ~= 99.475 USD.
        let data = encode(&[(8_650_000_000, 1_700_000_100), (115_000_000, 1_700_000_000)]);
        let chain = decode_chain(&data, &[0, 1]).unwrap();
        let ui = chain.mantissa as f64 * 10f64.powi(SCOPE_EXPONENT);
        assert!((ui - 99.475).abs() < 1e-3);
        assert_eq!(chain.oldest_timestamp, 1_700_000_000);
    }
}

use solana_sdk::pubkey::Pubkey;

use crate::decode::discriminator::{matches, reserve_discriminator};
use crate::error::DecodeError;
use crate::fixed::U256;
use crate::state::Reserve;

/// A decimals byte of `0xFF` means "unresolved" (spec.md §3.1: missing
/// decimals trigger an SPL-mint fallback fetch).
const DECIMALS_UNRESOLVED: u8 = 0xFF;

/// A scope-chain length byte of `0xFF` means "no Scope chain for this reserve".
const NO_SCOPE_CHAIN: u8 = 0xFF;

const FIXED_HEADER_LEN: usize = 8 + 32 + 32 + 1 + 1 + 1 + 1 + 2 + 2 + 8 + 16 + 32 + 8 + 1;

/// Decode a raw `Reserve` account blob (spec.md §6.1).
///
/// Layout: 8-byte discriminator, liquidity mint (32), collateral mint (32),
/// liquidity decimals (1, `0xFF` = unresolved), collateral decimals (1),
/// loan-to-value pct (1), liquidation threshold pct (1), liquidation bonus
/// bps (u16 LE), borrow factor pct (u16 LE), available liquidity raw (u64
/// LE), borrowed amount SF (u128 LE), cumulative borrow rate BSF (4x u64 LE),
/// collateral mint total supply (u64 LE), oracle count (u8), then that many
/// 32-byte oracle addresses, then a scope-chain length byte (`0xFF` = none)
/// followed by that many u16-LE feed indices.
pub fn decode_reserve(address: Pubkey, data: &[u8]) -> Result<Reserve, DecodeError> {
    if !matches(data, &reserve_discriminator()) {
        return Err(DecodeError::UnknownDiscriminator);
    }
    if data.len() < FIXED_HEADER_LEN {
        return Err(DecodeError::TooShort {
            need: FIXED_HEADER_LEN,
            got: data.len(),
        });
    }

    let mut liquidity_mint_bytes = [0u8; 32];
    liquidity_mint_bytes.copy_from_slice(&data[8..40]);
    let liquidity_mint = Pubkey::new_from_array(liquidity_mint_bytes);

    let mut collateral_mint_bytes = [0u8; 32];
    collateral_mint_bytes.copy_from_slice(&data[40..72]);
    let collateral_mint = Pubkey::new_from_array(collateral_mint_bytes);

    let mut cursor = 8 + 32 + 32;
    let liquidity_decimals_raw = data[cursor];
    cursor += 1;
    let collateral_decimals_raw = data[cursor];
    cursor += 1;
    let loan_to_value_pct = data[cursor];
    cursor += 1;
    let liquidation_threshold_pct = data[cursor];
    cursor += 1;
    let liquidation_bonus_bps = u16::from_le_bytes(data[cursor..cursor + 2].try_into().unwrap());
    cursor += 2;
    let borrow_factor_pct = u16::from_le_bytes(data[cursor..cursor + 2].try_into().unwrap());
    cursor += 2;
    let available_liquidity_raw = u64::from_le_bytes(data[cursor..cursor + 8].try_into().unwrap());
    cursor += 8;
    let borrowed_amount_sf = u128::from_le_bytes(data[cursor..cursor + 16].try_into().unwrap());
    cursor += 16;

    let mut rate_limbs = [0u64; 4];
    for limb in rate_limbs.iter_mut() {
        *limb = u64::from_le_bytes(data[cursor..cursor + 8].try_into().unwrap());
        cursor += 8;
    }
    let cumulative_borrow_rate_bsf = U256(rate_limbs);

    let collateral_mint_total_supply = u64::from_le_bytes(data[cursor..cursor + 8].try_into().unwrap());
    cursor += 8;

    let oracle_count = data[cursor] as usize;
    cursor += 1;

    let need_oracles = cursor + oracle_count * 32;
    if data.len() < need_oracles + 1 {
        return Err(DecodeError::TooShort {
            need: need_oracles + 1,
            got: data.len(),
        });
    }

    let mut oracle_accounts = Vec::with_capacity(oracle_count);
    for _ in 0..oracle_count {
        let mut key = [0u8; 32];
        key.copy_from_slice(&data[cursor..cursor + 32]);
        oracle_accounts.push(Pubkey::new_from_array(key));
        cursor += 32;
    }

    let chain_len = data[cursor];
    cursor += 1;
    let scope_price_chain = if chain_len == NO_SCOPE_CHAIN {
        None
    } else {
        let chain_len = chain_len as usize;
        let need = cursor + chain_len * 2;
        if data.len() < need {
            return Err(DecodeError::TooShort {
                need,
                got: data.len(),
            });
        }
        let mut chain = Vec::with_capacity(chain_len);
        for _ in 0..chain_len {
            chain.push(u16::from_le_bytes(data[cursor..cursor + 2].try_into().unwrap()));
            cursor += 2;
        }
        Some(chain)
    };

    Ok(Reserve {
        address,
        liquidity_mint,
        collateral_mint,
        liquidity_decimals: (liquidity_decimals_raw != DECIMALS_UNRESOLVED)
            .then_some(liquidity_decimals_raw),
        collateral_decimals: (collateral_decimals_raw != DECIMALS_UNRESOLVED)
            .then_some(collateral_decimals_raw),
        loan_to_value_pct,
        liquidation_threshold_pct,
        liquidation_bonus_bps,
        borrow_factor_pct,
        oracle_accounts,
        available_liquidity_raw,
        borrowed_amount_sf,
        cumulative_borrow_rate_bsf,
        collateral_mint_total_supply,
        scope_price_chain,
    })
}

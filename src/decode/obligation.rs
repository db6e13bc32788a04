use solana_sdk::pubkey::Pubkey;

use crate::decode::discriminator::{matches, obligation_discriminator};
use crate::error::DecodeError;
use crate::state::obligation::{Borrow, Deposit, StoredRiskValues};
use crate::state::Obligation;

const HEADER_LEN: usize = 8 + 32 + 32 + 8 + 16 + 16 + 16 + 16 + 1;
const DEPOSIT_LEN: usize = 32 + 32 + 8;
const BORROW_LEN: usize = 32 + 32 + 16;

fn read_pubkey(data: &[u8], offset: usize) -> Pubkey {
    let mut bytes = [0u8; 32];
    bytes.copy_from_slice(&data[offset..offset + 32]);
    Pubkey::new_from_array(bytes)
}

/// Decode a raw `Obligation` account blob (spec.md §6.1).
///
/// Layout: 8-byte discriminator, owner (32), market (32), last-update slot
/// (u64 LE), four SF-scaled stored risk values in the order
/// [deposited_value, borrowed_market_value, borrow_factor_adjusted_debt,
/// unhealthy_borrow_value] (u128 LE each), deposit count (u8), then that
/// many `(reserve: 32, mint: 32, deposited_amount_notes: u64 LE)` records,
/// borrow count (u8), then that many `(reserve: 32, mint: 32,
/// borrowed_amount_sf: u128 LE)` records.
pub fn decode_obligation(address: Pubkey, data: &[u8]) -> Result<Obligation, DecodeError> {
    if !matches(data, &obligation_discriminator()) {
        return Err(DecodeError::UnknownDiscriminator);
    }
    if data.len() < HEADER_LEN {
        return Err(DecodeError::TooShort {
            need: HEADER_LEN,
            got: data.len(),
        });
    }

    let owner = read_pubkey(data, 8);
    let market = read_pubkey(data, 40);
    let mut cursor = 72;
    let last_update_slot = u64::from_le_bytes(data[cursor..cursor + 8].try_into().unwrap());
    cursor += 8;

    let deposited_value_sf = u128::from_le_bytes(data[cursor..cursor + 16].try_into().unwrap());
    cursor += 16;
    let borrowed_market_value_sf = u128::from_le_bytes(data[cursor..cursor + 16].try_into().unwrap());
    cursor += 16;
    let borrow_factor_adjusted_debt_sf =
        u128::from_le_bytes(data[cursor..cursor + 16].try_into().unwrap());
    cursor += 16;
    let unhealthy_borrow_value_sf = u128::from_le_bytes(data[cursor..cursor + 16].try_into().unwrap());
    cursor += 16;

    let deposit_count = data[cursor] as usize;
    cursor += 1;

    let need_deposits = cursor + deposit_count * DEPOSIT_LEN + 1;
    if data.len() < need_deposits {
        return Err(DecodeError::TooShort {
            need: need_deposits,
            got: data.len(),
        });
    }

    let mut deposits = Vec::with_capacity(deposit_count);
    for _ in 0..deposit_count {
        let reserve = read_pubkey(data, cursor);
        let mint = read_pubkey(data, cursor + 32);
        let deposited_amount_notes =
            u64::from_le_bytes(data[cursor + 64..cursor + 72].try_into().unwrap());
        deposits.push(Deposit {
            reserve,
            mint,
            deposited_amount_notes,
        });
        cursor += DEPOSIT_LEN;
    }

    let borrow_count = data[cursor] as usize;
    cursor += 1;

    let need_borrows = cursor + borrow_count * BORROW_LEN;
    if data.len() < need_borrows {
        return Err(DecodeError::TooShort {
            need: need_borrows,
            got: data.len(),
        });
    }

    let mut borrows = Vec::with_capacity(borrow_count);
    for _ in 0..borrow_count {
        let reserve = read_pubkey(data, cursor);
        let mint = read_pubkey(data, cursor + 32);
        let borrowed_amount_sf =
            u128::from_le_bytes(data[cursor + 64..cursor + 80].try_into().unwrap());
        borrows.push(Borrow {
            reserve,
            mint,
            borrowed_amount_sf,
        });
        cursor += BORROW_LEN;
    }

    Ok(Obligation {
        address,
        owner,
        market,
        last_update_slot,
        deposits,
        borrows,
        stored: StoredRiskValues {
            deposited_value_sf,
            borrowed_market_value_sf,
            borrow_factor_adjusted_debt_sf,
            unhealthy_borrow_value_sf,
        },
    })
}

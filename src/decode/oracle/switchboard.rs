//! Switchboard V2 aggregator account decode (spec.md §4.2 table): mantissa
//! and scale at fixed offsets, std-dev used as confidence. Manual decode —
//! Switchboard's on-chain layout is not Anchor/Borsh.

use crate::error::DecodeError;

const RESULT_OFFSET: usize = 8; // past the account's own discriminator
const LATEST_CONFIRMED_ROUND_OFFSET: usize = RESULT_OFFSET;

pub struct SwitchboardPrice {
    pub mantissa: i128,
    pub scale: u8,
    pub std_dev_mantissa: i128,
    pub round_open_timestamp: i64,
}

/// Layout past the 8-byte offset: mantissa (i128 LE), scale (u8), std-dev
/// mantissa (i128 LE), std-dev scale (u8, unused — matched to the result
/// scale per Switchboard's SbDecimal convention), round_open_timestamp (i64 LE).
pub fn decode(data: &[u8]) -> Result<SwitchboardPrice, DecodeError> {
    let need = LATEST_CONFIRMED_ROUND_OFFSET + 16 + 1 + 16 + 1 + 8;
    if data.len() < need {
        return Err(DecodeError::TooShort {
            need,
            got: data.len(),
        });
    }

    let mut cursor = LATEST_CONFIRMED_ROUND_OFFSET;
    let mantissa = i128::from_le_bytes(data[cursor..cursor + 16].try_into().unwrap());
    cursor += 16;
    let scale = data[cursor];
    cursor += 1;
    let std_dev_mantissa = i128::from_le_bytes(data[cursor..cursor + 16].try_into().unwrap());
    cursor += 16;
    cursor += 1; // std-dev scale, unused
    let round_open_timestamp = i64::from_le_bytes(data[cursor..cursor + 8].try_into().unwrap());

    Ok(SwitchboardPrice {
        mantissa,
        scale,
        std_dev_mantissa,
        round_open_timestamp,
    })
}

impl SwitchboardPrice {
    pub fn ui_price(&self) -> f64 {
        self.mantissa as f64 / 10f64.powi(self.scale as i32)
    }

    pub fn ui_confidence(&self) -> f64 {
        self.std_dev_mantissa.unsigned_abs() as f64 / 10f64.powi(self.scale as i32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode(mantissa: i128, scale: u8, std_dev: i128, ts: i64) -> Vec<u8> {
        let mut buf = vec![0u8; LATEST_CONFIRMED_ROUND_OFFSET];
        buf.extend_from_slice(&mantissa.to_le_bytes());
        buf.push(scale);
        buf.extend_from_slice(&std_dev.to_le_bytes());
        buf.push(scale);
        buf.extend_from_slice(&ts.to_le_bytes());
        buf
    }

    #[test]
    fn ui_price_applies_scale() {
        let data = encode(123_450_000, 6, 1_000, 1_700_000_000);
        let price = decode(&data).unwrap();
        assert!((price.ui_price() - 123.45).abs() < 1e-9);
    }
}

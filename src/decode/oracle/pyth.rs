//! Pyth oracle account decode (spec.md §4.2 table): price, confidence,
//! exponent, publish time; requires `status == trading`.

use crate::error::DecodeError;

const MAGIC_VERSION_TYPE_SIZE: usize = 4 * 4;
const PRICE_OFFSET: usize = MAGIC_VERSION_TYPE_SIZE;
const STATUS_TRADING: u8 = 1;

#[derive(Debug)]
pub struct PythPrice {
    pub mantissa: i64,
    pub confidence: u64,
    pub exponent: i32,
    pub publish_time: i64,
}

/// Layout (offsets past the 16-byte magic/version/type/size header):
/// price (i64 LE), conf (u64 LE), expo (i32 LE), publish_time (i64 LE),
/// status (u8, 1 == trading).
pub fn decode(data: &[u8]) -> Result<PythPrice, DecodeError> {
    let need = PRICE_OFFSET + 8 + 8 + 4 + 8 + 1;
    if data.len() < need {
        return Err(DecodeError::TooShort {
            need,
            got: data.len(),
        });
    }

    let mut cursor = PRICE_OFFSET;
    let price = i64::from_le_bytes(data[cursor..cursor + 8].try_into().unwrap());
    cursor += 8;
    let conf = u64::from_le_bytes(data[cursor..cursor + 8].try_into().unwrap());
    cursor += 8;
    let expo = i32::from_le_bytes(data[cursor..cursor + 4].try_into().unwrap());
    cursor += 4;
    let publish_time = i64::from_le_bytes(data[cursor..cursor + 8].try_into().unwrap());
    cursor += 8;
    let status = data[cursor];

    if status != STATUS_TRADING {
        return Err(DecodeError::PythNotTrading);
    }

    Ok(PythPrice {
        mantissa: price,
        confidence: conf,
        exponent: expo,
        publish_time,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode(price: i64, conf: u64, expo: i32, publish_time: i64, status: u8) -> Vec<u8> {
        let mut buf = vec![0u8; MAGIC_VERSION_TYPE_SIZE];
        buf.extend_from_slice(&price.to_le_bytes());
        buf.extend_from_slice(&conf.to_le_bytes());
        buf.extend_from_slice(&expo.to_le_bytes());
        buf.extend_from_slice(&publish_time.to_le_bytes());
        buf.push(status);
        buf
    }

    #[test]
    fn decodes_trading_price() {
        let data = encode(100_000_000, 50_000, -8, 1_700_000_000, STATUS_TRADING);
        let price = decode(&data).unwrap();
        assert_eq!(price.mantissa, 100_000_000);
        assert_eq!(price.exponent, -8);
    }

    #[test]
    fn rejects_non_trading_status() {
        let data = encode(100_000_000, 50_000, -8, 1_700_000_000, 0);
        assert_eq!(decode(&data).unwrap_err(), DecodeError::PythNotTrading);
    }

    #[test]
    fn rejects_truncated_account() {
        let data = encode(1, 1, 1, 1, STATUS_TRADING);
        assert!(matches!(
            decode(&data[..data.len() - 1]),
            Err(DecodeError::TooShort { .. })
        ));
    }
}

//! Oracle variant dispatch by owning-program address (spec.md §9:
//! replace duck-typed dispatch with an explicit tagged variant).

pub mod pyth;
pub mod scope;
pub mod switchboard;

use solana_sdk::pubkey::Pubkey;

use crate::error::DecodeError;
use crate::state::oracle::OracleVariant;

/// The three oracle program ids this engine recognizes. Populated by outer
/// configuration (the concrete program ids are deployment-specific).
#[derive(Debug, Clone, Copy)]
pub struct OracleProgramIds {
    pub pyth: Pubkey,
    pub switchboard: Pubkey,
    pub scope: Pubkey,
}

impl OracleProgramIds {
    pub fn variant_for_owner(&self, owner: &Pubkey) -> Option<OracleVariant> {
        if *owner == self.pyth {
            Some(OracleVariant::Pyth)
        } else if *owner == self.switchboard {
            Some(OracleVariant::Switchboard)
        } else if *owner == self.scope {
            Some(OracleVariant::Scope)
        } else {
            None
        }
    }
}

/// The raw decoded fields common to a single-account oracle read (Pyth,
/// Switchboard). Scope is handled separately via `scope::decode_chain`
/// since it resolves a multi-hop chain rather than a single account.
pub struct RawOraclePrice {
    pub mantissa: i64,
    pub exponent: i32,
    pub confidence: u64,
    pub timestamp: i64,
}

pub fn decode_by_variant(
    variant: OracleVariant,
    data: &[u8],
) -> Result<RawOraclePrice, DecodeError> {
    match variant {
        OracleVariant::Pyth => {
            let price = pyth::decode(data)?;
            Ok(RawOraclePrice {
                mantissa: price.mantissa,
                exponent: price.exponent,
                confidence: price.confidence,
                timestamp: price.publish_time,
            })
        }
        OracleVariant::Switchboard => {
            let price = switchboard::decode(data)?;
            // Normalize to a fixed-exponent mantissa so callers have one
            // representation regardless of the source's own scale.
            let ui = price.ui_price();
            let exponent = -8;
            let mantissa = (ui * 10f64.powi(-exponent)).round() as i64;
            let confidence = (price.ui_confidence() * 10f64.powi(-exponent)).round() as u64;
            Ok(RawOraclePrice {
                mantissa,
                exponent,
                confidence,
                timestamp: price.round_open_timestamp,
            })
        }
        OracleVariant::Scope => Err(DecodeError::UnknownOracleOwner),
    }
}

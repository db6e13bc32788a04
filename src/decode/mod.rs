//! Binary decoders for on-chain account blobs (spec.md §4.1, §4.2, §6.1).

pub mod discriminator;
pub mod obligation;
pub mod oracle;
pub mod reserve;

pub use obligation::decode_obligation;
pub use reserve::decode_reserve;

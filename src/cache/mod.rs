//! Reserve and oracle caches (spec.md §4.1, §4.2).

pub mod oracle;
pub mod reserve;

pub use oracle::OracleCacheParams;
pub use reserve::ReserveIndex;

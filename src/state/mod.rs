//! Owned, arena-style data model (spec.md §3, §9 "cyclic references").
//!
//! Cross-references between obligations, reserves and plans are addresses
//! (`Pubkey`s), never direct pointers — each entity type lives in exactly
//! one owning store (`ReserveIndex`, the obligation cache, the plan queue).

pub mod candidate;
pub mod obligation;
pub mod oracle;
pub mod plan;
pub mod presubmit;
pub mod reserve;

pub use candidate::{Candidate, Hazard};
pub use obligation::{Borrow, Deposit, Obligation};
pub use oracle::{OraclePrice, OracleVariant};
pub use plan::{Plan, PLAN_VERSION};
pub use presubmit::{PresubmitEntry, PresubmitMode};
pub use reserve::Reserve;

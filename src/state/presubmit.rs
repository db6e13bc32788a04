use solana_sdk::hash::Hash;
use solana_sdk::transaction::VersionedTransaction;

/// Which submission mode a presubmit entry was built for (spec.md §3.5).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresubmitMode {
    Atomic,
    Main,
    Partial,
}

/// A signed, unsent transaction plus the context needed to judge freshness
/// (spec.md §3.5, §4.8).
#[derive(Debug, Clone)]
pub struct PresubmitEntry {
    pub transaction: VersionedTransaction,
    pub blockhash: Hash,
    pub built_at_unix_ms: i64,
    pub expected_seized_base_units: u64,
    pub expected_output_base_units: u64,
    pub mode: PresubmitMode,
    pub requires_setup: bool,
}

impl PresubmitEntry {
    /// Fresh iff built against the current blockhash and within TTL (§4.8).
    pub fn is_fresh(&self, current_blockhash: &Hash, now_unix_ms: i64, ttl_ms: i64) -> bool {
        self.blockhash == *current_blockhash && now_unix_ms - self.built_at_unix_ms <= ttl_ms
    }
}

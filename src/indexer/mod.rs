//! Live obligation indexer (spec.md §4.4): bootstrap from a snapshot file,
//! then stream account updates under an explicit state machine. The
//! streaming transport is abstracted behind `AccountStream` so the gRPC
//! wiring is swappable and unit-testable with an in-memory fake.

pub mod grpc;
pub mod run;
pub mod stream;

use std::collections::HashMap;
use std::collections::VecDeque;
use std::time::Duration;

use solana_sdk::pubkey::Pubkey;
use tracing::debug;

use crate::decode::decode_obligation;
use crate::error::IndexerError;
use crate::state::obligation::Obligation;
pub use stream::{AccountStream, AccountUpdate, StreamEvent};

/// Lifecycle states for the indexer (spec.md §4.4, §9: explicit state
/// machine replacing event-driven callback soup).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexerState {
    Idle,
    Bootstrapping,
    Streaming,
    Reconnecting { attempt: u32 },
    /// One-shot scoring mode: bootstrap only, never transitions to Streaming.
    BootstrapOnly,
    Stopped,
}

#[derive(Debug, Clone, Copy)]
pub struct ObligationEntry {
    pub slot: u64,
}

/// Hot cache of decoded obligations, single writer (the stream task),
/// many readers (spec.md §5).
#[derive(Debug, Default)]
pub struct ObligationCache {
    obligations: HashMap<Pubkey, Obligation>,
    entries: HashMap<Pubkey, ObligationEntry>,
}

impl ObligationCache {
    pub fn get(&self, pubkey: &Pubkey) -> Option<&Obligation> {
        self.obligations.get(pubkey)
    }

    pub fn len(&self) -> usize {
        self.obligations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.obligations.is_empty()
    }

    pub fn values(&self) -> impl Iterator<Item = &Obligation> {
        self.obligations.values()
    }

    /// Apply a decoded update. Returns `true` if it replaced the existing
    /// entry, `false` if dropped as stale (invariant 4, spec.md §8).
    pub fn upsert(&mut self, pubkey: Pubkey, obligation: Obligation, slot: u64) -> bool {
        if let Some(existing) = self.entries.get(&pubkey) {
            if slot < existing.slot {
                debug!(%pubkey, slot, existing_slot = existing.slot, "dropping stale obligation update");
                return false;
            }
        }
        self.entries.insert(pubkey, ObligationEntry { slot });
        self.obligations.insert(pubkey, obligation);
        true
    }
}

/// Count of decode failures inside a fixed sliding window, used by the
/// circuit breaker (spec.md §4.4, §5).
struct FailureWindow {
    window: Duration,
    threshold: u32,
    timestamps: VecDeque<std::time::Instant>,
}

impl FailureWindow {
    fn new(window: Duration, threshold: u32) -> Self {
        Self {
            window,
            threshold,
            timestamps: VecDeque::new(),
        }
    }

    /// Record one failure "now" (instant passed in for testability) and
    /// report whether the breaker should trip.
    fn record(&mut self, now: std::time::Instant) -> bool {
        self.timestamps.push_back(now);
        while let Some(&front) = self.timestamps.front() {
            if now.duration_since(front) > self.window {
                self.timestamps.pop_front();
            } else {
                break;
            }
        }
        self.timestamps.len() as u32 >= self.threshold
    }
}

pub struct Indexer {
    pub state: IndexerState,
    pub cache: ObligationCache,
    market_owner_program: Pubkey,
    circuit_breaker: FailureWindow,
}

impl Indexer {
    pub fn new(market_owner_program: Pubkey, breaker_window: Duration, breaker_threshold: u32) -> Self {
        Self {
            state: IndexerState::Idle,
            cache: ObligationCache::default(),
            market_owner_program,
            circuit_breaker: FailureWindow::new(breaker_window, breaker_threshold),
        }
    }

    /// Parse a line-delimited base58 snapshot file (spec.md §6.4): invalid
    /// lines are skipped, not fatal.
    pub fn parse_snapshot(contents: &str) -> Vec<Pubkey> {
        contents
            .lines()
            .filter_map(|line| {
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    return None;
                }
                trimmed.parse::<Pubkey>().ok()
            })
            .collect()
    }

    /// Bootstrap: batch-decode known obligation addresses, inserting at
    /// slot 0 (lowest priority, spec.md §4.4).
    pub fn bootstrap(&mut self, accounts: &[(Pubkey, Vec<u8>)]) {
        self.state = IndexerState::Bootstrapping;
        for (address, data) in accounts {
            match decode_obligation(*address, data) {
                Ok(obligation) => {
                    self.cache.upsert(*address, obligation, 0);
                }
                Err(err) => {
                    debug!(%address, error = %err, "skipping undecodable obligation during bootstrap");
                }
            }
        }
    }

    /// Apply one streamed account update, honoring slot-ordering and the
    /// circuit breaker (spec.md §4.4, §5, invariant 4).
    pub fn apply_update(
        &mut self,
        update: &AccountUpdate,
        now: std::time::Instant,
    ) -> Result<bool, IndexerError> {
        match decode_obligation(update.pubkey, &update.data) {
            Ok(obligation) => Ok(self.cache.upsert(update.pubkey, obligation, update.slot)),
            Err(err) => {
                debug!(pubkey = %update.pubkey, error = %err, "decode failure counted toward circuit breaker");
                if self.circuit_breaker.record(now) {
                    self.state = IndexerState::Stopped;
                    return Err(IndexerError::CircuitBreaker(self.circuit_breaker.threshold));
                }
                Ok(false)
            }
        }
    }

    /// The account-filter discriminator every subscription must carry, even
    /// if the caller supplied none (spec.md §4.4).
    pub fn default_obligation_filter(&self) -> [u8; 8] {
        crate::decode::discriminator::obligation_discriminator()
    }

    pub fn owner_program(&self) -> Pubkey {
        self.market_owner_program
    }

    pub fn begin_streaming(&mut self) {
        self.state = IndexerState::Streaming;
    }

    /// Enter one-shot scoring mode: bootstrap and stream the initial
    /// snapshot, but never transition to continuous `Streaming` (spec.md
    /// §4.4).
    pub fn enter_bootstrap_only(&mut self) {
        self.state = IndexerState::BootstrapOnly;
    }

    pub fn begin_reconnecting(&mut self, attempt: u32) {
        self.state = IndexerState::Reconnecting { attempt };
    }

    /// `stop()` is idempotent (spec.md §8 round-trip property).
    pub fn stop(&mut self) {
        self.state = IndexerState::Stopped;
    }
}

//! Presubmit cache (spec.md §4.8): keyed by obligation address, guarded by
//! a single `RwLock` (spec.md §5's single-writer/many-reader model),
//! rebuilt under a per-obligation refresh throttle.

use std::collections::HashMap;
use std::future::Future;

use solana_sdk::hash::Hash;
use solana_sdk::pubkey::Pubkey;
use tokio::sync::{Mutex, RwLock};

use crate::state::presubmit::PresubmitEntry;

pub struct PresubmitCache {
    entries: RwLock<HashMap<Pubkey, PresubmitEntry>>,
    last_build_attempt_ms: Mutex<HashMap<Pubkey, i64>>,
    ttl_ms: i64,
    refresh_ms: i64,
}

impl PresubmitCache {
    pub fn new(ttl_ms: i64, refresh_ms: i64) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            last_build_attempt_ms: Mutex::new(HashMap::new()),
            ttl_ms,
            refresh_ms,
        }
    }

    /// Return the fresh cached entry, or rebuild it via `build` subject to
    /// the per-obligation refresh throttle. Returns `None` when throttled
    /// or when `build` itself yields nothing.
    pub async fn get_or_build<F, Fut>(
        &self,
        obligation: Pubkey,
        current_blockhash: Hash,
        now_unix_ms: i64,
        build: F,
    ) -> Option<PresubmitEntry>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Option<PresubmitEntry>>,
    {
        {
            let entries = self.entries.read().await;
            if let Some(entry) = entries.get(&obligation) {
                if entry.is_fresh(&current_blockhash, now_unix_ms, self.ttl_ms) {
                    return Some(entry.clone());
                }
            }
        }

        {
            let mut last_attempt = self.last_build_attempt_ms.lock().await;
            if let Some(&last) = last_attempt.get(&obligation) {
                if now_unix_ms - last < self.refresh_ms {
                    return None;
                }
            }
            last_attempt.insert(obligation, now_unix_ms);
        }

        let built = build().await?;
        let mut entries = self.entries.write().await;
        entries.insert(obligation, built.clone());
        Some(built)
    }

    /// Warm the cache for the top-ranked plans (spec.md §4.8 `prebuildTopK`).
    pub async fn prebuild_top_k<F, Fut>(
        &self,
        top_ranked: &[Pubkey],
        current_blockhash: Hash,
        now_unix_ms: i64,
        build: impl Fn(Pubkey) -> Fut,
    ) where
        Fut: Future<Output = Option<PresubmitEntry>>,
    {
        for &obligation in top_ranked {
            self.get_or_build(obligation, current_blockhash, now_unix_ms, || {
                build(obligation)
            })
            .await;
        }
    }

    /// Purge stale entries in bulk at the start of a tick (spec.md §4.8).
    pub async fn evict_stale(&self, current_blockhash: &Hash, now_unix_ms: i64) {
        let mut entries = self.entries.write().await;
        entries.retain(|_, entry| entry.is_fresh(current_blockhash, now_unix_ms, self.ttl_ms));
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

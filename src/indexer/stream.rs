//! Streaming transport abstraction (spec.md §4.4, §6.2, §9: event-driven
//! control flow modeled as a task owning a channel plus interval tickers).
//! The gRPC-specific wiring lives behind this trait so tests can drive the
//! indexer with an in-memory fake instead of a live Geyser stream.

use async_trait::async_trait;
use solana_sdk::pubkey::Pubkey;

use crate::error::IndexerError;

/// One decoded frame off the wire (spec.md §6.2: account update, ping,
/// slot, or end-of-stream).
#[derive(Debug, Clone)]
pub enum StreamEvent {
    Account(AccountUpdate),
    Ping,
    Slot(u64),
    EndOfStream,
}

#[derive(Debug, Clone)]
pub struct AccountUpdate {
    pub pubkey: Pubkey,
    pub data: Vec<u8>,
    pub slot: u64,
    pub is_startup: bool,
}

/// A live or fake subscription to account updates for a given owner program
/// (spec.md §6.2's subscription request/response shape, `yellowstone_grpc_*`
/// for the real transport).
#[async_trait]
pub trait AccountStream: Send {
    /// Block until the next frame, or `None` on clean end-of-stream.
    async fn next_event(&mut self) -> Result<Option<StreamEvent>, IndexerError>;

    /// Send an outbound keepalive ping (spec.md §4.4: every 5s).
    async fn send_keepalive(&mut self) -> Result<(), IndexerError>;

    /// Idempotent close; a second call must not error (spec.md §8).
    async fn close(&mut self);
}

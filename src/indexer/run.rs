//! Streaming control loop (spec.md §4.4, §9: a task owning a receive future
//! and two interval tickers). Drives one `AccountStream` under an
//! inactivity watchdog and a keepalive cadence, reconnecting with
//! exponential backoff up to a capped attempt count, and in bootstrap/
//! snapshot mode ending cleanly once no new frames arrive for the
//! configured quiet interval after the startup marker clears.

use std::future::Future;
use std::time::Duration;

use tokio::time::{sleep, sleep_until, Instant};

use crate::config::StreamParams;
use crate::error::IndexerError;
use crate::indexer::{AccountStream, Indexer, IndexerState, StreamEvent};

/// Why one streaming attempt ended; the outer loop decides whether to
/// reconnect or stop.
#[derive(Debug)]
enum StreamEnd {
    CleanEof,
    Inactivity,
    SnapshotQuiet,
    TransportError(IndexerError),
}

/// Drive one already-connected stream until it needs to end.
async fn drive_stream<S: AccountStream>(
    indexer: &mut Indexer,
    stream: &mut S,
    cfg: &StreamParams,
    bootstrap_mode: bool,
) -> StreamEnd {
    let inactivity_timeout = Duration::from_secs(if bootstrap_mode {
        cfg.inactivity_timeout_bootstrap_sec
    } else {
        cfg.inactivity_timeout_sec
    });
    let keepalive_interval = Duration::from_secs(cfg.keepalive_interval_sec);
    let quiet_interval = Duration::from_secs(cfg.snapshot_quiet_interval_sec);

    let mut watchdog_deadline = Instant::now() + inactivity_timeout;
    let mut keepalive_due = Instant::now() + keepalive_interval;
    let mut startup_complete_at: Option<Instant> = None;

    loop {
        if bootstrap_mode {
            if let Some(at) = startup_complete_at {
                if at.elapsed() >= quiet_interval {
                    return StreamEnd::SnapshotQuiet;
                }
            }
        }

        tokio::select! {
            event = stream.next_event() => {
                match event {
                    Ok(None) | Ok(Some(StreamEvent::EndOfStream)) => return StreamEnd::CleanEof,
                    Ok(Some(StreamEvent::Account(update))) => {
                        if !update.is_startup {
                            startup_complete_at.get_or_insert_with(Instant::now);
                        }
                        if let Err(err) = indexer.apply_update(&update, std::time::Instant::now()) {
                            return StreamEnd::TransportError(err);
                        }
                        watchdog_deadline = Instant::now() + inactivity_timeout;
                    }
                    Ok(Some(StreamEvent::Ping)) | Ok(Some(StreamEvent::Slot(_))) => {
                        watchdog_deadline = Instant::now() + inactivity_timeout;
                    }
                    Err(err) => return StreamEnd::TransportError(err),
                }
            }
            _ = sleep_until(watchdog_deadline) => {
                return StreamEnd::Inactivity;
            }
            _ = sleep_until(keepalive_due) => {
                if let Err(err) = stream.send_keepalive().await {
                    return StreamEnd::TransportError(err);
                }
                keepalive_due = Instant::now() + keepalive_interval;
            }
        }
    }
}

async fn backoff_delay(cfg: &StreamParams, attempt: u32) {
    let factor = cfg.reconnect_backoff_factor.powi(attempt.saturating_sub(1) as i32);
    let delay_ms = (cfg.reconnect_delay_ms as f64 * factor).round() as u64;
    sleep(Duration::from_millis(delay_ms)).await;
}

/// Run the indexer's streaming loop to completion: connect via `connect`,
/// drive frames through `indexer`, and reconnect with backoff on inactivity
/// or transport errors, up to `cfg.max_reconnect_attempts` (spec.md §4.4).
/// Returns `Ok(())` on a clean end (snapshot quiet interval or end-of-stream
/// in bootstrap mode), or the terminal error once attempts are exhausted or
/// the circuit breaker trips.
pub async fn run<S, F, Fut>(
    indexer: &mut Indexer,
    mut connect: F,
    cfg: &StreamParams,
    bootstrap_mode: bool,
) -> Result<(), IndexerError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<S, IndexerError>>,
    S: AccountStream,
{
    let mut attempt: u32 = 0;

    loop {
        let mut stream = match connect().await {
            Ok(stream) => stream,
            Err(err) => {
                attempt += 1;
                if attempt > cfg.max_reconnect_attempts {
                    indexer.stop();
                    return Err(err);
                }
                indexer.begin_reconnecting(attempt);
                backoff_delay(cfg, attempt).await;
                continue;
            }
        };

        if bootstrap_mode {
            indexer.enter_bootstrap_only();
        } else {
            indexer.begin_streaming();
        }

        let end = drive_stream(indexer, &mut stream, cfg, bootstrap_mode).await;
        stream.close().await;

        match end {
            StreamEnd::CleanEof | StreamEnd::SnapshotQuiet => {
                indexer.stop();
                return Ok(());
            }
            StreamEnd::Inactivity => {
                attempt += 1;
                if attempt > cfg.max_reconnect_attempts {
                    indexer.stop();
                    return Err(IndexerError::Inactivity(if bootstrap_mode {
                        cfg.inactivity_timeout_bootstrap_sec
                    } else {
                        cfg.inactivity_timeout_sec
                    }));
                }
                indexer.begin_reconnecting(attempt);
                backoff_delay(cfg, attempt).await;
            }
            StreamEnd::TransportError(err) => {
                // The circuit breaker already moved the indexer to Stopped;
                // honor that terminal decision rather than reconnecting.
                if indexer.state == IndexerState::Stopped {
                    return Err(err);
                }
                attempt += 1;
                if attempt > cfg.max_reconnect_attempts {
                    indexer.stop();
                    return Err(err);
                }
                indexer.begin_reconnecting(attempt);
                backoff_delay(cfg, attempt).await;
            }
        }
    }
}

use thiserror::Error;

/// Errors from the binary decoders (§4.1, §4.2 account-blob parsing).
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DecodeError {
    #[error("account too short: need at least {need} bytes, got {got}")]
    TooShort { need: usize, got: usize },

    #[error("unrecognized discriminator")]
    UnknownDiscriminator,

    #[error("unrecognized oracle owner program")]
    UnknownOracleOwner,

    #[error("pyth price status is not trading")]
    PythNotTrading,

    #[error("invalid utf8 in account field")]
    InvalidUtf8,
}

/// Errors from reserve/oracle cache construction (§4.1, §4.2).
#[derive(Error, Debug)]
pub enum CacheError {
    #[error("rpc transport error: {0}")]
    Transport(String),

    #[error("fewer than 5 reserves survived decode; likely misconfiguration")]
    TooFewReserves(usize),

    #[error("sol oracle missing or out of range in allowlist mode")]
    SolOracleOutOfRange,
}

/// Reasons an obligation could not be scored, per spec.md §4.3.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnscoredReason {
    #[error("referenced reserve missing from cache")]
    MissingReserve,
    #[error("referenced oracle price missing or stale")]
    MissingOraclePrice,
    #[error("reserve exchange rate undefined")]
    MissingExchangeRate,
    #[error("fixed-point math produced an invalid result")]
    InvalidMath,
    #[error("obligation belongs to a different market")]
    OtherMarket,
    #[error("obligation has no deposits and no borrows")]
    EmptyObligation,
    #[error("obligation touches a mint outside the allowlist")]
    NotInAllowlist,
    #[error("obligation mixes reserves outside (market, allowlist) scope")]
    MixedOutOfScopeReserve,
}

/// Configuration-class errors that abort scoring/loading but never the process (§7).
#[derive(Error, Debug)]
pub enum ScoreError {
    #[error("protocol stored risk values are stale (slot lag > threshold)")]
    SfStale,
    #[error("allowlisted SOL oracle missing or out of sanity range")]
    SolOracleMissing,
}

/// Errors surfaced by the live obligation indexer.
#[derive(Error, Debug)]
pub enum IndexerError {
    #[error("transport error: {0}")]
    Transport(String),
    #[error("inactivity watchdog tripped after {0}s with no inbound frame")]
    Inactivity(u64),
    #[error("circuit breaker tripped: {0} decode failures in the sliding window")]
    CircuitBreaker(u32),
}

/// Plan-validity errors (§7): skip the plan, continue the scheduler loop.
#[derive(Error, Debug)]
pub enum SchedulerError {
    #[error("plan version {0} is older than the minimum supported version {1}")]
    LegacyPlan(u32, u32),
    #[error("plan references a reserve absent from the cache: {0}")]
    MissingReserve(String),
    #[error("plan queue io error: {0}")]
    Io(String),
}

/// Invariant violation in the canonical instruction assembler: fatal, raised (§7).
#[derive(Error, Debug)]
pub enum AssemblerError {
    #[error("liquidate instruction not found in compiled message")]
    LiquidateNotFound,
    #[error("instruction window mismatch: {0}")]
    WindowMismatch(String),
    #[error("could not re-derive reserve/mint addresses from obligation: {0}")]
    Derivation(String),
}

/// Simulation/broadcast errors (§7): absorbed at the tick boundary.
#[derive(Error, Debug)]
pub enum ExecutorError {
    #[error("simulation failed: {0}")]
    Simulation(String),
    #[error("broadcast exhausted retries: {0}")]
    BroadcastFailed(String),
    #[error("no keypair configured")]
    NoKeypair,
}

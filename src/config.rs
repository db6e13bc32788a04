use serde::{Deserialize, Serialize};
use solana_sdk::pubkey::Pubkey;

/// Which health-ratio source is authoritative for `liquidationEligible` (§4.3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthSource {
    #[default]
    Recomputed,
    Hybrid,
}

/// Expected-value model parameters (§6.5 `evParams.*`).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct EvParams {
    pub close_factor_pct: f64,
    pub liquidation_bonus_pct: f64,
    pub flashloan_fee_pct: f64,
    pub fixed_gas_usd: f64,
    pub slippage_buffer_pct: f64,
}

impl Default for EvParams {
    fn default() -> Self {
        Self {
            close_factor_pct: 50.0,
            liquidation_bonus_pct: 5.0,
            flashloan_fee_pct: 0.09,
            fixed_gas_usd: 0.05,
            slippage_buffer_pct: 0.5,
        }
    }
}

/// Presubmit prebuild parameters (§6.5 `presubmit.*`).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct PresubmitParams {
    pub top_k: usize,
    pub ttl_ms: u64,
    pub refresh_ms: u64,
}

impl Default for PresubmitParams {
    fn default() -> Self {
        Self {
            top_k: 8,
            ttl_ms: 60_000,
            refresh_ms: 5_000,
        }
    }
}

/// Broadcast retry policy (§6.5 `broadcast.*`).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct BroadcastParams {
    pub max_attempts: u32,
    pub cu_limit: u32,
    pub cu_price: u64,
    pub cu_limit_bump_factor: f64,
    pub cu_price_bump_microlamports: u64,
}

impl Default for BroadcastParams {
    fn default() -> Self {
        Self {
            max_attempts: 2,
            cu_limit: 600_000,
            cu_price: 10_000,
            cu_limit_bump_factor: 1.5,
            cu_price_bump_microlamports: 5_000,
        }
    }
}

/// Stream resilience parameters (§6.5, §4.4).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamParams {
    pub inactivity_timeout_sec: u64,
    pub inactivity_timeout_bootstrap_sec: u64,
    pub max_reconnect_attempts: u32,
    pub reconnect_delay_ms: u64,
    pub reconnect_backoff_factor: f64,
    pub keepalive_interval_sec: u64,
    pub snapshot_quiet_interval_sec: u64,
    pub circuit_breaker_window_sec: u64,
    pub circuit_breaker_threshold: u32,
}

impl Default for StreamParams {
    fn default() -> Self {
        Self {
            inactivity_timeout_sec: 15,
            inactivity_timeout_bootstrap_sec: 10,
            max_reconnect_attempts: 10,
            reconnect_delay_ms: 500,
            reconnect_backoff_factor: 2.0,
            keepalive_interval_sec: 5,
            snapshot_quiet_interval_sec: 8,
            circuit_breaker_window_sec: 30,
            circuit_breaker_threshold: 50,
        }
    }
}

/// Full configuration surface of spec.md §6.5, the outer orchestration layer's
/// object (construction/parsing of it is out of scope — see spec.md §1).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub min_ev: f64,
    pub max_ttl_min: f64,
    pub min_hazard: f64,
    pub hazard_alpha: f64,
    pub ev_params: EvParams,
    pub ttl_drop_per_min_pct: f64,
    pub ttl_max_drop_pct: f64,
    pub health_source: HealthSource,
    pub allowlist_mints: Vec<Pubkey>,
    pub presubmit: PresubmitParams,
    pub broadcast: BroadcastParams,
    pub stream: StreamParams,
    /// Whether `liquidationEligible=true` candidates are force-included
    /// regardless of the ev/ttl/hazard filters (§4.5).
    pub force_include_eligible: bool,
    /// Slot-lag threshold beyond which stored SF risk values are considered
    /// stale and the hybrid source is disabled (§4.3, Open Question #1).
    pub sf_stale_slot_threshold: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            min_ev: 0.0,
            max_ttl_min: f64::MAX,
            min_hazard: 0.0,
            hazard_alpha: 25.0,
            ev_params: EvParams::default(),
            ttl_drop_per_min_pct: 0.5,
            ttl_max_drop_pct: 90.0,
            health_source: HealthSource::default(),
            allowlist_mints: Vec::new(),
            presubmit: PresubmitParams::default(),
            broadcast: BroadcastParams::default(),
            stream: StreamParams::default(),
            force_include_eligible: true,
            sf_stale_slot_threshold: 200_000,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_matches_spec_literals() {
        let cfg = EngineConfig::default();
        assert_eq!(cfg.hazard_alpha, 25.0);
        assert_eq!(cfg.broadcast.max_attempts, 2);
        assert_eq!(cfg.presubmit.ttl_ms, 60_000);
        assert_eq!(cfg.stream.inactivity_timeout_sec, 15);
        assert_eq!(cfg.stream.inactivity_timeout_bootstrap_sec, 10);
        assert_eq!(cfg.stream.circuit_breaker_threshold, 50);
        assert_eq!(cfg.sf_stale_slot_threshold, 200_000);
    }

    #[test]
    fn round_trips_through_json() {
        let cfg = EngineConfig::default();
        let json = serde_json::to_string(&cfg).unwrap();
        let back: EngineConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back.hazard_alpha, cfg.hazard_alpha);
    }
}

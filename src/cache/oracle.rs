//! Oracle cache (spec.md §4.2): owner-based dispatch across Pyth,
//! Switchboard, and Scope, with stablecoin clamping and a SOL sanity check.

use std::collections::HashMap;

use solana_client::nonblocking::rpc_client::RpcClient;
use solana_sdk::pubkey::Pubkey;
use tracing::{debug, warn};

use crate::cache::reserve::ReserveIndex;
use crate::decode::oracle::{decode_by_variant, scope, OracleProgramIds};
use crate::error::CacheError;
use crate::state::oracle::{OraclePrice, OracleVariant};

/// Stablecoins are clamped into this UI-price band regardless of the raw
/// oracle reading (spec.md §4.2 table).
const STABLECOIN_CLAMP_LOW: f64 = 0.99;
const STABLECOIN_CLAMP_HIGH: f64 = 1.01;

/// Stablecoins outside this wider band are logged even when the clamp above
/// still pulls the price back into range (spec.md §4.2).
const STABLECOIN_WARN_LOW: f64 = 0.95;
const STABLECOIN_WARN_HIGH: f64 = 1.05;

/// Plausibility band for the SOL/USD oracle in allowlist mode: outside this
/// the reading is treated as a bad feed and the cache load aborts (spec.md
/// §4.2).
const SOL_SANITY_ALLOWLIST_LOW: f64 = 5.0;
const SOL_SANITY_ALLOWLIST_HIGH: f64 = 2_000.0;

/// Wider band used in full-market mode, where a bad SOL feed only warrants a
/// warning rather than aborting the whole cache load (spec.md §4.2).
const SOL_SANITY_FULL_MARKET_LOW: f64 = 10.0;
const SOL_SANITY_FULL_MARKET_HIGH: f64 = 1_000.0;

/// Oracle readings older than this are dropped outright (spec.md §4.2); for
/// Scope chains the oldest hop timestamp stands in for the reading's age.
const ORACLE_MAX_AGE_SEC: i64 = 30;

pub struct OracleCacheParams<'a> {
    pub program_ids: OracleProgramIds,
    pub scope_price_feed: Pubkey,
    pub sol_mint: Pubkey,
    pub stablecoin_mints: &'a [Pubkey],
    pub now_unix: i64,
    /// Allowlist mode enforces the tighter SOL sanity band and aborts the
    /// whole load on violation; full-market mode only warns (spec.md §4.2).
    pub allowlist_mode: bool,
}

/// Fetch and decode one `OraclePrice` per mint referenced by `reserves`,
/// dispatching on each account's owning program (spec.md §9: tagged variant,
/// not duck typing).
pub async fn load(
    rpc: &RpcClient,
    reserves: &ReserveIndex,
    params: &OracleCacheParams<'_>,
) -> Result<HashMap<Pubkey, OraclePrice>, CacheError> {
    let mut oracle_accounts: Vec<Pubkey> = reserves
        .by_reserve
        .values()
        .flat_map(|reserve| reserve.oracle_accounts.iter().copied())
        .collect();
    oracle_accounts.push(params.scope_price_feed);
    oracle_accounts.sort();
    oracle_accounts.dedup();

    let mut fetched: HashMap<Pubkey, (Pubkey, Vec<u8>)> = HashMap::new();
    for chunk in oracle_accounts.chunks(100) {
        let accounts = rpc
            .get_multiple_accounts(chunk)
            .await
            .map_err(|e| CacheError::Transport(e.to_string()))?;
        for (address, account) in chunk.iter().zip(accounts) {
            if let Some(account) = account {
                fetched.insert(*address, (account.owner, account.data));
            }
        }
    }

    let mut prices: HashMap<Pubkey, OraclePrice> = HashMap::new();

    for reserve in reserves.by_reserve.values() {
        if prices.contains_key(&reserve.liquidity_mint) {
            continue;
        }

        let price = resolve_reserve_price(reserve, &fetched, reserves, params);
        if let Some(price) = price {
            prices.insert(reserve.liquidity_mint, price);
        }
    }

    if let Some(price) = prices.get(&params.sol_mint) {
        let ui = price.ui_price();
        if params.allowlist_mode {
            if !(SOL_SANITY_ALLOWLIST_LOW..=SOL_SANITY_ALLOWLIST_HIGH).contains(&ui) {
                warn!(ui_price = ui, "SOL oracle outside allowlist sanity range");
                return Err(CacheError::SolOracleOutOfRange);
            }
        } else if !(SOL_SANITY_FULL_MARKET_LOW..=SOL_SANITY_FULL_MARKET_HIGH).contains(&ui) {
            warn!(ui_price = ui, "SOL oracle outside full-market sanity range");
        }
    }

    Ok(prices)
}

fn resolve_reserve_price(
    reserve: &crate::state::Reserve,
    fetched: &HashMap<Pubkey, (Pubkey, Vec<u8>)>,
    reserves: &ReserveIndex,
    params: &OracleCacheParams<'_>,
) -> Option<OraclePrice> {
    if let Some(chain) = reserves.scope_chains.get(&reserve.liquidity_mint) {
        let (_, data) = fetched.get(&params.scope_price_feed)?;
        let resolved = scope::decode_chain(data, chain).ok()?;
        let price = OraclePrice {
            mint: reserve.liquidity_mint,
            variant: OracleVariant::Scope,
            mantissa: resolved.mantissa,
            exponent: scope::SCOPE_EXPONENT,
            confidence: 0,
            timestamp: resolved.oldest_timestamp,
            slot: 0,
        };
        if !price.is_fresh(params.now_unix, ORACLE_MAX_AGE_SEC) {
            debug!(mint = %reserve.liquidity_mint, timestamp = price.timestamp, "dropping stale scope price");
            return None;
        }
        return Some(clamp_if_stable(price, reserve.liquidity_mint, params.stablecoin_mints));
    }

    for account in &reserve.oracle_accounts {
        let Some((owner, data)) = fetched.get(account) else {
            continue;
        };
        let Some(variant) = params.program_ids.variant_for_owner(owner) else {
            continue;
        };
        if variant == OracleVariant::Scope {
            continue;
        }
        match decode_by_variant(variant, data) {
            Ok(raw) => {
                let price = OraclePrice {
                    mint: reserve.liquidity_mint,
                    variant,
                    mantissa: raw.mantissa,
                    exponent: raw.exponent,
                    confidence: raw.confidence,
                    timestamp: raw.timestamp,
                    slot: 0,
                };
                if !price.is_fresh(params.now_unix, ORACLE_MAX_AGE_SEC) {
                    debug!(oracle = %account, timestamp = price.timestamp, "dropping stale oracle price, trying next oracle account");
                    continue;
                }
                return Some(clamp_if_stable(price, reserve.liquidity_mint, params.stablecoin_mints));
            }
            Err(err) => {
                debug!(oracle = %account, error = %err, "oracle account failed to decode");
                continue;
            }
        }
    }

    None
}

fn clamp_if_stable(mut price: OraclePrice, mint: Pubkey, stablecoin_mints: &[Pubkey]) -> OraclePrice {
    if !stablecoin_mints.contains(&mint) {
        return price;
    }
    let ui = price.ui_price();
    if !(STABLECOIN_WARN_LOW..=STABLECOIN_WARN_HIGH).contains(&ui) {
        warn!(mint = %mint, ui_price = ui, "stablecoin oracle outside warn band");
    }
    if !(STABLECOIN_CLAMP_LOW..=STABLECOIN_CLAMP_HIGH).contains(&ui) {
        let clamped_ui = ui.clamp(STABLECOIN_CLAMP_LOW, STABLECOIN_CLAMP_HIGH);
        price.mantissa = (clamped_ui / 10f64.powi(price.exponent)).round() as i64;
    }
    price
}

//! Reserve cache (spec.md §4.1): index reserves by liquidity and collateral
//! mint, resolve missing decimals via SPL-mint fallback, build the Scope
//! price-chain map.

use std::collections::HashMap;
use std::sync::Arc;

use solana_account_decoder::UiAccountEncoding;
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_client::rpc_filter::{Memcmp, RpcFilterType};
use solana_sdk::commitment_config::CommitmentConfig;
use solana_sdk::program_pack::Pack;
use solana_sdk::pubkey::Pubkey;
use tracing::{debug, warn};

use crate::decode::discriminator::reserve_discriminator;
use crate::decode::reserve::decode_reserve;
use crate::error::CacheError;
use crate::state::Reserve;

/// Reserves survive with fewer than this many and the cache still builds,
/// but a warning is emitted — likely a configuration or RPC problem (§4.1).
const MIN_HEALTHY_RESERVE_COUNT: usize = 5;

/// Two-way index plus the Scope chain map other caches read from (spec.md
/// §9: mutable module-level maps become owned fields so tests get fresh
/// copies).
#[derive(Debug, Default)]
pub struct ReserveIndex {
    pub by_mint: HashMap<Pubkey, Arc<Reserve>>,
    pub by_reserve: HashMap<Pubkey, Arc<Reserve>>,
    pub scope_chains: HashMap<Pubkey, Vec<u16>>,
}

impl ReserveIndex {
    pub fn len(&self) -> usize {
        self.by_reserve.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_reserve.is_empty()
    }
}

/// Build an index from already-fetched, already-decoded reserves. Pure and
/// unit-testable without RPC I/O.
pub fn build_index(reserves: Vec<Reserve>, allowlist_mints: Option<&[Pubkey]>) -> ReserveIndex {
    let mut index = ReserveIndex::default();

    for reserve in reserves {
        if !reserve.has_resolved_decimals() {
            debug!(reserve = %reserve.address, "dropping reserve with unresolved decimals");
            continue;
        }
        if let Some(allowlist) = allowlist_mints {
            if !allowlist.contains(&reserve.liquidity_mint) {
                continue;
            }
        }

        if let Some(chain) = &reserve.scope_price_chain {
            index.scope_chains.insert(reserve.liquidity_mint, chain.clone());
        }

        let reserve = Arc::new(reserve);
        index
            .by_mint
            .insert(reserve.liquidity_mint, Arc::clone(&reserve));
        index
            .by_mint
            .insert(reserve.collateral_mint, Arc::clone(&reserve));
        index.by_reserve.insert(reserve.address, reserve);
    }

    if index.len() < MIN_HEALTHY_RESERVE_COUNT {
        warn!(
            count = index.len(),
            "fewer than {MIN_HEALTHY_RESERVE_COUNT} reserves survived decode; check config/RPC"
        );
    }

    index
}

/// Scan `program_id` for `Reserve` accounts, decode them, resolve missing
/// decimals via SPL-mint fallback, and build the two-way index (spec.md
/// §4.1).
pub async fn load(
    rpc: &RpcClient,
    program_id: &Pubkey,
    allowlist_mints: Option<&[Pubkey]>,
) -> Result<ReserveIndex, CacheError> {
    let filters = vec![RpcFilterType::Memcmp(Memcmp::new_base58_encoded(
        0,
        &reserve_discriminator(),
    ))];
    let config = solana_client::rpc_config::RpcProgramAccountsConfig {
        filters: Some(filters),
        account_config: solana_client::rpc_config::RpcAccountInfoConfig {
            encoding: Some(UiAccountEncoding::Base64),
            commitment: Some(CommitmentConfig::confirmed()),
            ..Default::default()
        },
        ..Default::default()
    };

    let accounts = rpc
        .get_program_accounts_with_config(program_id, config)
        .await
        .map_err(|e| CacheError::Transport(e.to_string()))?;

    let mut reserves = Vec::with_capacity(accounts.len());
    let mut missing_decimal_mints: Vec<Pubkey> = Vec::new();

    for (address, account) in &accounts {
        match decode_reserve(*address, &account.data) {
            Ok(reserve) => reserves.push(reserve),
            Err(err) => {
                debug!(reserve = %address, error = %err, "skipping undecodable reserve account");
                continue;
            }
        }
    }

    for reserve in &reserves {
        if reserve.liquidity_decimals.is_none() {
            missing_decimal_mints.push(reserve.liquidity_mint);
        }
        if reserve.collateral_decimals.is_none() {
            missing_decimal_mints.push(reserve.collateral_mint);
        }
    }

    if !missing_decimal_mints.is_empty() {
        let resolved = fetch_mint_decimals(rpc, &missing_decimal_mints).await?;
        for reserve in &mut reserves {
            if reserve.liquidity_decimals.is_none() {
                reserve.liquidity_decimals = resolved.get(&reserve.liquidity_mint).copied();
            }
            if reserve.collateral_decimals.is_none() {
                reserve.collateral_decimals = resolved.get(&reserve.collateral_mint).copied();
            }
        }
    }

    Ok(build_index(reserves, allowlist_mints))
}

async fn fetch_mint_decimals(
    rpc: &RpcClient,
    mints: &[Pubkey],
) -> Result<HashMap<Pubkey, u8>, CacheError> {
    let mut resolved = HashMap::new();
    for chunk in mints.chunks(100) {
        let accounts = rpc
            .get_multiple_accounts(chunk)
            .await
            .map_err(|e| CacheError::Transport(e.to_string()))?;
        for (mint, account) in chunk.iter().zip(accounts) {
            if let Some(account) = account {
                if let Ok(mint_state) = spl_token::state::Mint::unpack(&account.data) {
                    resolved.insert(*mint, mint_state.decimals);
                }
            }
        }
    }
    Ok(resolved)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixed::{SF_SCALE, U256};

    fn sample_reserve(decimals: Option<u8>) -> Reserve {
        Reserve {
            address: Pubkey::new_unique(),
            liquidity_mint: Pubkey::new_unique(),
            collateral_mint: Pubkey::new_unique(),
            liquidity_decimals: decimals,
            collateral_decimals: decimals,
            loan_to_value_pct: 75,
            liquidation_threshold_pct: 85,
            liquidation_bonus_bps: 500,
            borrow_factor_pct: 100,
            oracle_accounts: vec![],
            available_liquidity_raw: 1,
            borrowed_amount_sf: SF_SCALE,
            cumulative_borrow_rate_bsf: U256::from(SF_SCALE),
            collateral_mint_total_supply: 1,
            scope_price_chain: None,
        }
    }

    #[test]
    fn drops_reserves_with_unresolved_decimals() {
        let reserves = vec![sample_reserve(Some(6)), sample_reserve(None)];
        let index = build_index(reserves, None);
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn index_maps_both_mints_to_same_reserve() {
        let reserve = sample_reserve(Some(6));
        let liquidity_mint = reserve.liquidity_mint;
        let collateral_mint = reserve.collateral_mint;
        let index = build_index(vec![reserve], None);
        assert!(Arc::ptr_eq(
            index.by_mint.get(&liquidity_mint).unwrap(),
            index.by_mint.get(&collateral_mint).unwrap()
        ));
    }

    #[test]
    fn allowlist_filters_by_liquidity_mint() {
        let reserve = sample_reserve(Some(6));
        let liquidity_mint = reserve.liquidity_mint;
        let other_mint = Pubkey::new_unique();
        let index = build_index(vec![reserve], Some(&[other_mint]));
        assert!(index.is_empty());
        assert!(!index.by_mint.contains_key(&liquidity_mint));
    }
}

//! Executor & broadcast retry (spec.md §4.7): fetch a blockhash, build and
//! sign the setup/main transactions, then simulate or submit via a bounded
//! retry loop that bumps compute budget each attempt.

use solana_client::nonblocking::rpc_client::RpcClient;
use solana_client::rpc_config::RpcSimulateTransactionConfig;
use solana_sdk::commitment_config::CommitmentConfig;
use solana_sdk::instruction::Instruction;
use solana_sdk::message::{Message, VersionedMessage};
use solana_sdk::signature::{Keypair, Signature, Signer};
use solana_sdk::transaction::{TransactionError, VersionedTransaction};
use tracing::{info, warn};

use crate::config::BroadcastParams;
use crate::error::ExecutorError;

/// The exact status vocabulary `tick()` returns (spec.md §7).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickStatus {
    NoPlans,
    NoEligible,
    MinDelay,
    NoKeypair,
    InvalidPlan,
    IncompletePlan,
    BuildFailed,
    SetupRequired,
    SetupCompleted,
    SetupFailed,
    SetupSimError,
    SetupError,
    Simulated,
    Confirmed,
    BroadcastFailed,
    BroadcastError,
}

impl TickStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            TickStatus::NoPlans => "no-plans",
            TickStatus::NoEligible => "no-eligible",
            TickStatus::MinDelay => "min-delay",
            TickStatus::NoKeypair => "no-keypair",
            TickStatus::InvalidPlan => "invalid-plan",
            TickStatus::IncompletePlan => "incomplete-plan",
            TickStatus::BuildFailed => "build-failed",
            TickStatus::SetupRequired => "setup-required",
            TickStatus::SetupCompleted => "setup-completed",
            TickStatus::SetupFailed => "setup-failed",
            TickStatus::SetupSimError => "setup-sim-error",
            TickStatus::SetupError => "setup-error",
            TickStatus::Simulated => "simulated",
            TickStatus::Confirmed => "confirmed",
            TickStatus::BroadcastFailed => "broadcast-failed",
            TickStatus::BroadcastError => "broadcast-error",
        }
    }
}

impl std::fmt::Display for TickStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Known protocol error codes surfaced as `InstructionError::Custom(code)`
/// (spec.md §4.7). Seeded only from the codes spec.md names explicitly,
/// left `None` for anything else rather than guessing.
pub fn remediation_hint(code: u32) -> Option<&'static str> {
    match code {
        6006 => Some(
            "InvalidAccountInput: re-check the derived repay/collateral reserve and mint addresses against the obligation",
        ),
        6032 => Some(
            "NoFlashRepayFound: ensure a flashRepay instruction closes the same flash-loan window",
        ),
        _ => None,
    }
}

/// Bump compute-unit limit (by a multiplicative factor) and price (by a
/// fixed micro-lamport delta) for the next retry attempt, `attempt` being
/// 1-indexed (spec.md §4.7).
pub fn bump_compute_budget(cu_limit: u32, cu_price: u64, attempt: u32, cfg: &BroadcastParams) -> (u32, u64) {
    let bumped_limit = (cu_limit as f64 * cfg.cu_limit_bump_factor.powi(attempt as i32)) as u32;
    let bumped_price = cu_price + cfg.cu_price_bump_microlamports * attempt as u64;
    (bumped_limit, bumped_price)
}

fn decode_custom_error(error: &TransactionError) -> Option<u32> {
    match error {
        TransactionError::InstructionError(_, solana_sdk::instruction::InstructionError::Custom(code)) => {
            Some(*code)
        }
        _ => None,
    }
}

pub struct Executor {
    rpc: RpcClient,
    keypair: Option<Keypair>,
    broadcast: BroadcastParams,
}

impl Executor {
    pub fn new(rpc: RpcClient, keypair: Option<Keypair>, broadcast: BroadcastParams) -> Self {
        Self {
            rpc,
            keypair,
            broadcast,
        }
    }

    fn compile_and_sign(
        &self,
        instructions: &[Instruction],
        blockhash: solana_sdk::hash::Hash,
    ) -> Result<VersionedTransaction, ExecutorError> {
        let keypair = self.keypair.as_ref().ok_or(ExecutorError::NoKeypair)?;
        let mut message = Message::new(instructions, Some(&keypair.pubkey()));
        message.recent_blockhash = blockhash;
        VersionedTransaction::try_new(VersionedMessage::Legacy(message), &[keypair])
            .map_err(|e| ExecutorError::Simulation(e.to_string()))
    }

    /// Dry-run a transaction (spec.md §6.3: `sigVerify=false,
    /// replaceRecentBlockhash=true`).
    pub async fn simulate(&self, instructions: &[Instruction]) -> Result<(), ExecutorError> {
        let blockhash = self
            .rpc
            .get_latest_blockhash()
            .await
            .map_err(|e| ExecutorError::Simulation(e.to_string()))?;
        let tx = self.compile_and_sign(instructions, blockhash)?;

        let config = RpcSimulateTransactionConfig {
            sig_verify: false,
            replace_recent_blockhash: true,
            commitment: Some(CommitmentConfig::confirmed()),
            ..Default::default()
        };

        let result = self
            .rpc
            .simulate_transaction_with_config(&tx, config)
            .await
            .map_err(|e| ExecutorError::Simulation(e.to_string()))?;

        if let Some(err) = result.value.err {
            let hint = decode_custom_error(&err).and_then(remediation_hint);
            if let Some(hint) = hint {
                warn!(%err, hint, "simulation failed with a known protocol error code");
            }
            return Err(ExecutorError::Simulation(err.to_string()));
        }
        Ok(())
    }

    /// Submit a signed transaction with bounded retry, bumping compute
    /// budget each attempt (spec.md §4.7).
    pub async fn broadcast(
        &self,
        instructions: &[Instruction],
        cu_limit: u32,
        cu_price: u64,
    ) -> Result<Signature, ExecutorError> {
        let mut cu_limit = cu_limit;
        let mut cu_price = cu_price;
        let mut last_error = None;

        for attempt in 1..=self.broadcast.max_attempts {
            let blockhash = self
                .rpc
                .get_latest_blockhash()
                .await
                .map_err(|e| ExecutorError::BroadcastFailed(e.to_string()))?;

            let mut ixs = instructions.to_vec();
            ixs.insert(
                0,
                solana_sdk::compute_budget::ComputeBudgetInstruction::set_compute_unit_limit(cu_limit),
            );
            ixs.insert(
                1,
                solana_sdk::compute_budget::ComputeBudgetInstruction::set_compute_unit_price(cu_price),
            );

            let tx = self.compile_and_sign(&ixs, blockhash)?;

            match self.rpc.send_and_confirm_transaction(&tx).await {
                Ok(signature) => {
                    info!(%signature, attempt, "liquidation transaction confirmed");
                    return Ok(signature);
                }
                Err(e) => {
                    warn!(attempt, error = %e, "broadcast attempt failed");
                    last_error = Some(e.to_string());
                    let (next_limit, next_price) =
                        bump_compute_budget(cu_limit, cu_price, attempt, &self.broadcast);
                    cu_limit = next_limit;
                    cu_price = next_price;
                }
            }
        }

        Err(ExecutorError::BroadcastFailed(
            last_error.unwrap_or_else(|| "retries exhausted".to_string()),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remediation_hint_known_codes() {
        assert!(remediation_hint(6006).is_some());
        assert!(remediation_hint(6032).is_some());
        assert!(remediation_hint(1).is_none());
    }

    #[test]
    fn bump_compute_budget_applies_factor_and_delta() {
        let cfg = BroadcastParams::default();
        let (limit, price) = bump_compute_budget(600_000, 10_000, 1, &cfg);
        assert_eq!(limit, (600_000.0 * 1.5) as u32);
        assert_eq!(price, 10_000 + 5_000);
    }

    #[test]
    fn tick_status_strings_match_spec_vocabulary() {
        assert_eq!(TickStatus::NoPlans.as_str(), "no-plans");
        assert_eq!(TickStatus::BroadcastFailed.as_str(), "broadcast-failed");
        assert_eq!(TickStatus::SetupSimError.as_str(), "setup-sim-error");
    }
}

//! Canonical liquidation instruction assembler (spec.md §4.6): the single
//! source of truth for the strict-adjacency instruction window the
//! protocol enforces around a liquidate instruction.

pub mod validate;

use solana_sdk::compute_budget::ComputeBudgetInstruction;
use solana_sdk::instruction::{AccountMeta, Instruction};
use solana_sdk::pubkey::Pubkey;

use crate::decode::discriminator::instruction_discriminator;
use crate::error::AssemblerError;
use crate::state::obligation::Obligation;
use crate::state::plan::Plan;

pub use validate::{validate, WindowDiagnostic};

/// Re-derived addresses the assembler trusts over the plan's stated
/// preference (spec.md §4.6 "Derivation").
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DerivedReserves {
    pub repay_reserve: Pubkey,
    pub repay_mint: Pubkey,
    pub collateral_reserve: Pubkey,
    pub withdraw_collateral_mint: Pubkey,
}

/// Re-derive reserve/mint addresses from the obligation itself; the plan
/// supplies only a preference (spec.md §4.6). When `strict` is set, a
/// mismatch against the plan's stated addresses is a hard error rather
/// than a logged diagnostic.
pub fn derive_reserves(
    obligation: &Obligation,
    plan: &Plan,
    strict: bool,
) -> Result<DerivedReserves, AssemblerError> {
    let borrow = obligation
        .borrows
        .iter()
        .find(|b| b.mint == plan.repay_mint)
        .ok_or_else(|| {
            AssemblerError::Derivation(format!(
                "obligation has no borrow matching plan repay mint {}",
                plan.repay_mint
            ))
        })?;
    let deposit = obligation
        .deposits
        .iter()
        .find(|d| d.mint == plan.seize_mint)
        .ok_or_else(|| {
            AssemblerError::Derivation(format!(
                "obligation has no deposit matching plan seize mint {}",
                plan.seize_mint
            ))
        })?;

    let derived = DerivedReserves {
        repay_reserve: borrow.reserve,
        repay_mint: borrow.mint,
        collateral_reserve: deposit.reserve,
        withdraw_collateral_mint: deposit.mint,
    };

    let mismatch = derived.repay_reserve != plan.repay_reserve
        || derived.collateral_reserve != plan.collateral_reserve;
    if mismatch {
        let message = format!(
            "plan preference (repay {}, collateral {}) disagrees with obligation-derived (repay {}, collateral {})",
            plan.repay_reserve, plan.collateral_reserve, derived.repay_reserve, derived.collateral_reserve
        );
        if strict {
            return Err(AssemblerError::Derivation(message));
        }
        tracing::warn!(%message, "liquidation plan preference mismatch");
    }

    Ok(derived)
}

pub struct BuildParams<'a> {
    pub program_id: Pubkey,
    pub payer: Pubkey,
    pub obligation: &'a Obligation,
    pub derived: &'a DerivedReserves,
    pub farms_active: bool,
    pub flash_loan: bool,
    pub swap_ixs: Vec<Instruction>,
    pub missing_atas: Vec<(Pubkey, Pubkey)>, // (owner, mint)
    pub cu_limit: u32,
    pub cu_price: u64,
}

/// Build the setup (ATA) instructions and the canonical main instruction
/// window, kept as two separate arrays so the main liquidation transaction
/// never carries setup (spec.md §4.6 "Setup isolation").
pub fn build_liquidation_window(params: &BuildParams<'_>) -> (Vec<Instruction>, Vec<Instruction>) {
    let setup_ixs: Vec<Instruction> = params
        .missing_atas
        .iter()
        .map(|(owner, mint)| {
            spl_associated_token_account::instruction::create_associated_token_account(
                &params.payer,
                owner,
                mint,
                &spl_token::id(),
            )
        })
        .collect();

    let mut main_ixs = Vec::new();
    main_ixs.push(ComputeBudgetInstruction::set_compute_unit_limit(
        params.cu_limit,
    ));
    if params.cu_price > 0 {
        main_ixs.push(ComputeBudgetInstruction::set_compute_unit_price(
            params.cu_price,
        ));
    }

    if params.flash_loan {
        main_ixs.push(protocol_instruction(
            params.program_id,
            "flashBorrowReserveLiquidity",
            &[],
        ));
    }

    // Deposits-then-borrows order for refreshReserve, per spec.md §9's
    // open question resolution (see SPEC_FULL.md §9).
    let mut refreshed = Vec::new();
    for deposit in &params.obligation.deposits {
        if !refreshed.contains(&deposit.reserve) {
            refreshed.push(deposit.reserve);
        }
    }
    for borrow in &params.obligation.borrows {
        if !refreshed.contains(&borrow.reserve) {
            refreshed.push(borrow.reserve);
        }
    }
    for reserve in &refreshed {
        main_ixs.push(protocol_instruction(
            params.program_id,
            "refreshReserve",
            &[AccountMeta::new(*reserve, false)],
        ));
    }

    main_ixs.push(protocol_instruction(
        params.program_id,
        "refreshObligation",
        &[AccountMeta::new(params.obligation.address, false)],
    ));

    if params.farms_active {
        main_ixs.push(protocol_instruction(params.program_id, "refreshFarmsForObligation", &[]));
        main_ixs.push(protocol_instruction(params.program_id, "refreshFarmsForObligation", &[]));
    }

    main_ixs.push(protocol_instruction(
        params.program_id,
        "liquidateObligationAndRedeemReserveCollateral",
        &[
            AccountMeta::new(params.obligation.address, false),
            AccountMeta::new(params.derived.repay_reserve, false),
            AccountMeta::new(params.derived.collateral_reserve, false),
        ],
    ));

    if params.farms_active {
        main_ixs.push(protocol_instruction(params.program_id, "refreshFarmsForObligation", &[]));
        main_ixs.push(protocol_instruction(params.program_id, "refreshFarmsForObligation", &[]));
    }

    main_ixs.extend(params.swap_ixs.iter().cloned());

    if params.flash_loan {
        main_ixs.push(protocol_instruction(
            params.program_id,
            "flashRepayReserveLiquidity",
            &[],
        ));
    }

    (setup_ixs, main_ixs)
}

fn protocol_instruction(program_id: Pubkey, name: &str, accounts: &[AccountMeta]) -> Instruction {
    Instruction::new_with_bytes(program_id, &instruction_discriminator(name), accounts.to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::obligation::{Borrow, Deposit, StoredRiskValues};

    fn sample_obligation(deposit_reserve: Pubkey, borrow_reserve: Pubkey) -> Obligation {
        Obligation {
            address: Pubkey::new_unique(),
            owner: Pubkey::new_unique(),
            market: Pubkey::new_unique(),
            last_update_slot: 0,
            deposits: vec![Deposit {
                reserve: deposit_reserve,
                mint: Pubkey::new_unique(),
                deposited_amount_notes: 1,
            }],
            borrows: vec![Borrow {
                reserve: borrow_reserve,
                mint: Pubkey::new_unique(),
                borrowed_amount_sf: 1,
            }],
            stored: StoredRiskValues::default(),
        }
    }

    #[test]
    fn derive_reserves_matches_plan_preference() {
        let deposit_reserve = Pubkey::new_unique();
        let borrow_reserve = Pubkey::new_unique();
        let obligation = sample_obligation(deposit_reserve, borrow_reserve);
        let plan = Plan {
            version: 2,
            obligation: obligation.address,
            repay_mint: obligation.borrows[0].mint,
            seize_mint: obligation.deposits[0].mint,
            repay_reserve: borrow_reserve,
            collateral_reserve: deposit_reserve,
            amount_ui: 1.0,
            repay_decimals: 6,
            seize_decimals: 9,
            created_at_unix: 0,
            liquidation_eligible: true,
        };
        let derived = derive_reserves(&obligation, &plan, true).unwrap();
        assert_eq!(derived.repay_reserve, borrow_reserve);
        assert_eq!(derived.collateral_reserve, deposit_reserve);
    }

    #[test]
    fn strict_mode_rejects_preference_mismatch() {
        let deposit_reserve = Pubkey::new_unique();
        let borrow_reserve = Pubkey::new_unique();
        let obligation = sample_obligation(deposit_reserve, borrow_reserve);
        let plan = Plan {
            version: 2,
            obligation: obligation.address,
            repay_mint: obligation.borrows[0].mint,
            seize_mint: obligation.deposits[0].mint,
            repay_reserve: Pubkey::new_unique(), // wrong on purpose
            collateral_reserve: deposit_reserve,
            amount_ui: 1.0,
            repay_decimals: 6,
            seize_decimals: 9,
            created_at_unix: 0,
            liquidation_eligible: true,
        };
        assert!(matches!(
            derive_reserves(&obligation, &plan, true),
            Err(AssemblerError::Derivation(_))
        ));
    }

    /// Scenario 6 from spec.md §8: canonical builder with farms active.
    #[test]
    fn scenario_six_window_has_pre_and_post_farm_blocks() {
        let deposit_reserve = Pubkey::new_unique();
        let borrow_reserve = Pubkey::new_unique();
        let obligation = sample_obligation(deposit_reserve, borrow_reserve);
        let derived = DerivedReserves {
            repay_reserve: borrow_reserve,
            repay_mint: obligation.borrows[0].mint,
            collateral_reserve: deposit_reserve,
            withdraw_collateral_mint: obligation.deposits[0].mint,
        };
        let params = BuildParams {
            program_id: Pubkey::new_unique(),
            payer: Pubkey::new_unique(),
            obligation: &obligation,
            derived: &derived,
            farms_active: true,
            flash_loan: false,
            swap_ixs: vec![],
            missing_atas: vec![],
            cu_limit: 600_000,
            cu_price: 0,
        };
        let (setup, main) = build_liquidation_window(&params);
        assert!(setup.is_empty());

        let liquidate_disc = instruction_discriminator("liquidateObligationAndRedeemReserveCollateral");
        let farms_disc = instruction_discriminator("refreshFarmsForObligation");
        let liquidate_idx = main
            .iter()
            .position(|ix| ix.data.starts_with(&liquidate_disc))
            .unwrap();
        assert!(main[liquidate_idx - 1].data.starts_with(&farms_disc));
        assert!(main[liquidate_idx + 1].data.starts_with(&farms_disc));
    }

    #[test]
    fn refresh_reserve_order_is_deposits_then_borrows() {
        let deposit_reserve = Pubkey::new_unique();
        let borrow_reserve = Pubkey::new_unique();
        let obligation = sample_obligation(deposit_reserve, borrow_reserve);
        let derived = DerivedReserves {
            repay_reserve: borrow_reserve,
            repay_mint: obligation.borrows[0].mint,
            collateral_reserve: deposit_reserve,
            withdraw_collateral_mint: obligation.deposits[0].mint,
        };
        let params = BuildParams {
            program_id: Pubkey::new_unique(),
            payer: Pubkey::new_unique(),
            obligation: &obligation,
            derived: &derived,
            farms_active: false,
            flash_loan: false,
            swap_ixs: vec![],
            missing_atas: vec![],
            cu_limit: 600_000,
            cu_price: 0,
        };
        let (_, main) = build_liquidation_window(&params);
        let refresh_disc = instruction_discriminator("refreshReserve");
        let refresh_ixs: Vec<_> = main.iter().filter(|ix| ix.data.starts_with(&refresh_disc)).collect();
        assert_eq!(refresh_ixs.len(), 2);
        assert_eq!(refresh_ixs[0].accounts[0].pubkey, deposit_reserve);
        assert_eq!(refresh_ixs[1].accounts[0].pubkey, borrow_reserve);
    }
}

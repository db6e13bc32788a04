//! Compile-time window validation (spec.md §4.6): after compiling to a
//! versioned message, decode instruction *kinds* by `(programId,
//! discriminator)` and walk the canonical window backwards from the
//! liquidate instruction.

use solana_sdk::message::VersionedMessage;
use solana_sdk::pubkey::Pubkey;

use crate::decode::discriminator::instruction_discriminator;
use crate::error::AssemblerError;

const WINDOW_RADIUS: usize = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum InstructionKind {
    RefreshReserve,
    RefreshObligation,
    RefreshFarms,
    Liquidate,
    Other,
}

impl InstructionKind {
    fn label(self) -> &'static str {
        match self {
            InstructionKind::RefreshReserve => "refreshReserve",
            InstructionKind::RefreshObligation => "refreshObligation",
            InstructionKind::RefreshFarms => "refreshFarms",
            InstructionKind::Liquidate => "LIQUIDATE",
            InstructionKind::Other => "other",
        }
    }
}

fn classify(program_id: &Pubkey, data: &[u8], protocol_program: &Pubkey) -> InstructionKind {
    if program_id != protocol_program || data.len() < 8 {
        return InstructionKind::Other;
    }
    let disc = &data[0..8];
    if disc == instruction_discriminator("refreshReserve") {
        InstructionKind::RefreshReserve
    } else if disc == instruction_discriminator("refreshObligation") {
        InstructionKind::RefreshObligation
    } else if disc == instruction_discriminator("refreshFarmsForObligation") {
        InstructionKind::RefreshFarms
    } else if disc == instruction_discriminator("liquidateObligationAndRedeemReserveCollateral") {
        InstructionKind::Liquidate
    } else {
        InstructionKind::Other
    }
}

/// A structured report of the ±6-instruction window around the liquidate
/// instruction (spec.md §4.6).
#[derive(Debug, Clone)]
pub struct WindowDiagnostic {
    pub liquidate_index: usize,
    pub farm_count: usize,
    pub window: Vec<(usize, String)>,
}

impl WindowDiagnostic {
    fn render(&self) -> String {
        self.window
            .iter()
            .map(|(i, label)| format!("[{i}] {label}"))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

fn program_id_for(message: &VersionedMessage, program_id_index: u8) -> Option<Pubkey> {
    message
        .static_account_keys()
        .get(program_id_index as usize)
        .copied()
}

fn window_labels(
    message: &VersionedMessage,
    protocol_program: &Pubkey,
    center: usize,
) -> Vec<(usize, String)> {
    let instructions = message.instructions();
    let lo = center.saturating_sub(WINDOW_RADIUS);
    let hi = (center + WINDOW_RADIUS + 1).min(instructions.len());
    (lo..hi)
        .map(|i| {
            let ix = &instructions[i];
            let program_id = program_id_for(message, ix.program_id_index).unwrap_or_default();
            let kind = classify(&program_id, &ix.data, protocol_program);
            (i, kind.label().to_string())
        })
        .collect()
}

/// Walk the compiled message per spec.md §4.6's four-step algorithm.
pub fn validate(
    message: &VersionedMessage,
    protocol_program: &Pubkey,
) -> Result<WindowDiagnostic, AssemblerError> {
    let instructions = message.instructions();
    let kinds: Vec<InstructionKind> = instructions
        .iter()
        .map(|ix| {
            let program_id = program_id_for(message, ix.program_id_index).unwrap_or_default();
            classify(&program_id, &ix.data, protocol_program)
        })
        .collect();

    let liquidate_index = kinds
        .iter()
        .position(|k| *k == InstructionKind::Liquidate)
        .ok_or(AssemblerError::LiquidateNotFound)?;

    let mut cursor = liquidate_index;
    let mut farm_count = 0;

    let farms_before = cursor > 0 && kinds[cursor - 1] == InstructionKind::RefreshFarms;
    let farms_after =
        cursor + 1 < kinds.len() && kinds[cursor + 1] == InstructionKind::RefreshFarms;

    if farms_before != farms_after {
        return Err(mismatch(
            "farm refresh must appear symmetrically before and after liquidate",
            &kinds,
            liquidate_index,
            message,
            protocol_program,
        ));
    }

    if farms_before {
        farm_count = 1;
        cursor -= 1;
        while cursor > 0 && kinds[cursor - 1] == InstructionKind::RefreshFarms {
            cursor -= 1;
            farm_count += 1;
        }
    }

    if cursor == 0 || kinds[cursor - 1] != InstructionKind::RefreshObligation {
        return Err(mismatch(
            "expected refreshObligation immediately before the (optional) farm block",
            &kinds,
            liquidate_index,
            message,
            protocol_program,
        ));
    }
    cursor -= 1;

    let mut refresh_reserve_count = 0;
    while cursor > 0 && kinds[cursor - 1] == InstructionKind::RefreshReserve {
        cursor -= 1;
        refresh_reserve_count += 1;
    }
    if refresh_reserve_count < 2 {
        return Err(mismatch(
            "expected at least 2 contiguous refreshReserve instructions before refreshObligation",
            &kinds,
            liquidate_index,
            message,
            protocol_program,
        ));
    }

    Ok(WindowDiagnostic {
        liquidate_index,
        farm_count,
        window: window_labels(message, protocol_program, liquidate_index),
    })
}

fn mismatch(
    reason: &str,
    _kinds: &[InstructionKind],
    liquidate_index: usize,
    message: &VersionedMessage,
    protocol_program: &Pubkey,
) -> AssemblerError {
    let diagnostic = WindowDiagnostic {
        liquidate_index,
        farm_count: 0,
        window: window_labels(message, protocol_program, liquidate_index),
    };
    AssemblerError::WindowMismatch(format!("{reason}; window: {}", diagnostic.render()))
}

//! Headless auto-battles.
//!
//! Armies hold position and every turn the active side resolves its attack
//! phase. The battle runs until one side is wiped out, both sides pass a
//! full round without attacking, or the turn limit is hit.

use tactics_core::prelude::*;

/// How an auto-battle ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BattleOutcome {
    /// One side was wiped out.
    Victory(Side),
    /// Neither side could reach the other for a full round.
    Stalemate,
    /// The turn limit was reached with both sides still fighting.
    TurnLimit,
}

/// Summary of an auto-battle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BattleReport {
    /// How the battle ended.
    pub outcome: BattleOutcome,
    /// Last turn played.
    pub turns: u32,
    /// Attacks applied, counter-attacks included.
    pub attacks: usize,
    /// Total damage dealt.
    pub damage: u64,
    /// Living player troops at the end.
    pub player_survivors: usize,
    /// Living enemy troops at the end.
    pub enemy_survivors: usize,
    /// State hash at the end, for replay comparison.
    pub final_hash: u64,
}

/// Run an auto-battle to completion.
///
/// A battle still in preparation is started first.
///
/// # Errors
///
/// Returns an error if the battle is already over or the engine reports
/// an invariant violation.
pub fn run_battle(state: &mut BattleState, max_turns: u32) -> Result<BattleReport> {
    if state.phase() == BattlePhase::Preparation {
        state.apply_phase_command(PhaseCommand::Start)?;
    }
    if state.phase() != BattlePhase::Battle {
        return Err(GameError::InvalidState(
            "auto-battle needs a battle in progress".into(),
        ));
    }

    let mut attacks = 0;
    let mut damage = 0u64;
    let mut idle_sides = 0;
    let outcome = loop {
        if state.turn() > max_turns {
            break BattleOutcome::TurnLimit;
        }

        let resolution = state.run_attack_phase()?;
        let applied = state.apply_log(&resolution.log)?;
        attacks += applied.len();
        damage += applied.iter().map(|a| u64::from(a.entry.damage)).sum::<u64>();

        if state.phase() == BattlePhase::Result {
            match state.winner() {
                Some(side) => break BattleOutcome::Victory(side),
                None => break BattleOutcome::Stalemate,
            }
        }

        idle_sides = if applied.is_empty() { idle_sides + 1 } else { 0 };
        if idle_sides >= 2 {
            break BattleOutcome::Stalemate;
        }
        state.end_turn()?;
    };

    let survivors = |side: Side| {
        state
            .troops()
            .iter()
            .filter(|t| t.side == side && t.is_alive())
            .count()
    };
    let report = BattleReport {
        outcome,
        turns: state.turn(),
        attacks,
        damage,
        player_survivors: survivors(Side::Player),
        enemy_survivors: survivors(Side::Enemy),
        final_hash: state.state_hash(),
    };
    tracing::info!(
        outcome = ?report.outcome,
        turns = report.turns,
        attacks = report.attacks,
        "Auto-battle finished"
    );
    Ok(report)
}

//! Combat resolution: the attack phase, interceptions, and the morale
//! bookkeeping that follows each applied hit.
//!
//! Resolution is split in two steps. The `resolve_*` functions read a
//! snapshot and return an ordered log of attacks without touching any
//! state. [`apply_attack`] then applies one log entry at a time, so the
//! caller may pace the presentation between entries. A log must be fully
//! applied before resolution is invoked again.
//!
//! # Attack phase
//!
//! Each army that has not acted this turn selects one target for the whole
//! army. Every living member then attacks that target once.
//!
//! # Interception
//!
//! When an enemy army finishes a move with a tile inside a ready army's
//! threat range and the friendly side's vision, the ready army strikes with
//! a single representative troop (its first living member) and the struck
//! troop immediately counter-attacks that representative.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::damage::{compute_damage, DamageParams};
use crate::entity::{army_at, Army, ArmyId, Morale, Troop, TroopId, TroopIndex};
use crate::error::{GameError, Result};
use crate::grid::BattleMap;
use crate::targeting::{select_target, threat_range};
use crate::visibility::VisibleTiles;

/// Which morale the defender contributes to the damage formula.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum DefenderMorale {
    /// Defenders always count as baseline morale (1).
    #[default]
    Baseline,
    /// Defenders use the morale of the army they belong to, or baseline
    /// when they belong to none.
    Army,
}

/// Tunable combat rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct CombatRules {
    /// Defender morale policy.
    #[serde(default)]
    pub defender_morale: DefenderMorale,
}

impl CombatRules {
    /// Morale credited to a defender standing on one of `armies`' tiles.
    #[must_use]
    pub fn morale_of_defender(&self, defender: &Troop, armies: &[Army]) -> Morale {
        match self.defender_morale {
            DefenderMorale::Baseline => Morale::MIN,
            DefenderMorale::Army => {
                army_at(armies, defender.position).map_or(Morale::MIN, |a| a.morale)
            }
        }
    }
}

/// One resolved attack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AttackLogEntry {
    /// Position of this entry within its resolution pass.
    pub order: u32,
    /// Army the attacking troop fights for.
    pub attacker_army: ArmyId,
    /// Attacking troop.
    pub attacker: TroopId,
    /// Troop being hit.
    pub defender: TroopId,
    /// Damage to subtract from the defender.
    pub damage: u32,
    /// Whether this is a counter-attack answering an interception.
    pub is_counter_attack: bool,
}

/// Output of a resolution pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CombatResolution {
    /// Attacks in the order they must be applied.
    pub log: Vec<AttackLogEntry>,
    /// Armies that attacked and must be marked as acted.
    pub acted: Vec<ArmyId>,
}

impl CombatResolution {
    fn push(&mut self, mut entry: AttackLogEntry) {
        entry.order = self.log.len() as u32;
        self.log.push(entry);
    }

    /// Whether the pass produced no attacks.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.log.is_empty()
    }
}

/// Read-only view of the battlefield from one side's point of view.
#[derive(Debug, Clone, Copy)]
pub struct CombatContext<'a> {
    /// Battle map.
    pub map: &'a BattleMap,
    /// Armies of the acting side, in resolution order.
    pub friendly_armies: &'a [Army],
    /// Troops of the acting side.
    pub friendly_troops: &'a [Troop],
    /// Armies of the opposing side.
    pub enemy_armies: &'a [Army],
    /// Troops of the opposing side.
    pub enemy_troops: &'a [Troop],
    /// Tiles the acting side currently sees.
    pub visible: &'a VisibleTiles,
    /// Combat rules in force.
    pub rules: CombatRules,
}

impl CombatContext<'_> {
    fn exchange(
        &self,
        attacker: &Troop,
        attacker_morale: Morale,
        defender: &Troop,
        defender_morale: Morale,
    ) -> Result<DamageParams> {
        Ok(DamageParams {
            attacker_type: attacker.soldier_type,
            attacker_terrain: self.map.terrain(attacker.position)?,
            attacker_morale,
            defender_type: defender.soldier_type,
            defender_terrain: self.map.terrain(defender.position)?,
            defender_morale,
        })
    }
}

/// Resolve the acting side's attack phase.
///
/// Armies in `acted` are skipped. Armies that find no valid target are not
/// reported as acted.
///
/// # Errors
///
/// Returns `GameError::OutOfBounds` if a participating troop stands off
/// the map.
pub fn resolve_attack_phase(
    ctx: &CombatContext<'_>,
    acted: &BTreeSet<ArmyId>,
) -> Result<CombatResolution> {
    let index = TroopIndex::new(ctx.friendly_troops);
    let mut resolution = CombatResolution::default();

    for army in ctx.friendly_armies.iter().filter(|a| !acted.contains(&a.id)) {
        let members = index.live_members_of(army);
        if members.is_empty() {
            continue;
        }

        let Some(target) = select_target(
            army,
            ctx.friendly_troops,
            ctx.enemy_troops,
            ctx.visible,
            ctx.map,
        ) else {
            tracing::debug!(army = %army.id, "No valid target");
            continue;
        };

        let defender_morale = ctx.rules.morale_of_defender(target, ctx.enemy_armies);
        for member in members {
            let params = ctx.exchange(member, army.morale, target, defender_morale)?;
            resolution.push(AttackLogEntry {
                order: 0,
                attacker_army: army.id,
                attacker: member.id,
                defender: target.id,
                damage: compute_damage(&params),
                is_counter_attack: false,
            });
        }

        tracing::debug!(
            army = %army.id,
            target = %target.id,
            attacks = resolution.log.len(),
            "Army attacked"
        );
        resolution.acted.push(army.id);
    }

    Ok(resolution)
}

/// Resolve interceptions triggered by `moved` finishing a move.
///
/// `moved` belongs to the opposing side and already stands on its new
/// tiles in `ctx.enemy_troops`. Each ready friendly army whose threat range
/// and the side's vision both cover a tile of `moved` strikes once; the
/// target answers with a counter-attack.
///
/// The trigger checks `ctx.visible`, the combined vision of the whole
/// intercepting side, not the sight of the intercepting army alone.
///
/// The strike uses the first living member of the intercepting army. The
/// counter uses the moving army's morale, and the defending morale of the
/// struck member follows `ctx.rules`.
///
/// # Errors
///
/// Returns `GameError::OutOfBounds` if a participating troop stands off
/// the map.
pub fn resolve_interception(
    ctx: &CombatContext<'_>,
    moved: &Army,
    acted: &BTreeSet<ArmyId>,
) -> Result<CombatResolution> {
    let friendly = TroopIndex::new(ctx.friendly_troops);
    let movers = TroopIndex::new(ctx.enemy_troops).members_of(moved);
    let mut resolution = CombatResolution::default();

    for army in ctx.friendly_armies.iter().filter(|a| !acted.contains(&a.id)) {
        let members = friendly.live_members_of(army);
        let Some(&representative) = members.first() else {
            continue;
        };

        let threatened = threat_range(members.iter().copied(), army.facing, ctx.map);
        let triggered = moved
            .members
            .iter()
            .any(|c| threatened.contains(c) && ctx.visible.contains(c));
        if !triggered {
            continue;
        }

        let Some(target) = select_target(
            army,
            ctx.friendly_troops,
            movers.iter().copied(),
            ctx.visible,
            ctx.map,
        ) else {
            continue;
        };

        let defender_morale = ctx.rules.morale_of_defender(target, ctx.enemy_armies);
        let strike = ctx.exchange(representative, army.morale, target, defender_morale)?;
        resolution.push(AttackLogEntry {
            order: 0,
            attacker_army: army.id,
            attacker: representative.id,
            defender: target.id,
            damage: compute_damage(&strike),
            is_counter_attack: false,
        });

        let counter = ctx.exchange(
            target,
            moved.morale,
            representative,
            ctx.rules.morale_of_defender(representative, ctx.friendly_armies),
        )?;
        resolution.push(AttackLogEntry {
            order: 0,
            attacker_army: moved.id,
            attacker: target.id,
            defender: representative.id,
            damage: compute_damage(&counter),
            is_counter_attack: true,
        });

        tracing::debug!(
            army = %army.id,
            mover = %moved.id,
            target = %target.id,
            "Intercepted moving army"
        );
        resolution.acted.push(army.id);
    }

    Ok(resolution)
}

/// Result of applying one log entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppliedAttack {
    /// The applied entry.
    pub entry: AttackLogEntry,
    /// Defender hit points after the hit.
    pub defender_hp: u32,
    /// Whether this hit brought the defender to 0 hp.
    pub killed: bool,
    /// Defending army wiped out by this hit, if any.
    pub army_destroyed: Option<ArmyId>,
    /// Morale the attacking army gained (0-2).
    pub morale_gained: u8,
}

/// Apply one log entry to a snapshot.
///
/// Subtracts the damage from the defender, then updates the attacking
/// army's morale: +1 when the hit wipes out the defender's whole army and
/// +1 when the two armies face different directions (a flank attack).
/// Morale never exceeds 3.
///
/// # Errors
///
/// Returns `GameError::TroopNotFound` or `GameError::ArmyNotFound` if the
/// entry references something missing from the snapshot.
pub fn apply_attack(
    entry: &AttackLogEntry,
    troops: &mut [Troop],
    armies: &mut [Army],
) -> Result<AppliedAttack> {
    let defender_index = troops
        .iter()
        .position(|t| t.id == entry.defender)
        .ok_or(GameError::TroopNotFound(entry.defender))?;
    let attacker_index = armies
        .iter()
        .position(|a| a.id == entry.attacker_army)
        .ok_or(GameError::ArmyNotFound(entry.attacker_army))?;

    let defender = &mut troops[defender_index];
    let was_alive = defender.is_alive();
    let defender_hp = defender.apply_damage(entry.damage);
    let defender_pos = defender.position;
    let killed = was_alive && defender_hp == 0;

    let defender_army = armies
        .iter()
        .find(|a| a.id != entry.attacker_army && a.contains(defender_pos));

    let index = TroopIndex::new(&*troops);
    let army_destroyed = defender_army
        .filter(|_| killed)
        .filter(|a| index.members_of(a).iter().all(|t| t.is_dead()))
        .map(|a| a.id);
    let flanked = defender_army.is_some_and(|a| a.facing != armies[attacker_index].facing);

    let attacker = &mut armies[attacker_index];
    let mut morale_gained = 0;
    if army_destroyed.is_some() && attacker.morale.increment() {
        morale_gained += 1;
    }
    if flanked && attacker.morale.increment() {
        morale_gained += 1;
    }
    if morale_gained > 0 {
        tracing::debug!(
            army = %attacker.id,
            morale = attacker.morale.value(),
            flanked,
            wiped = army_destroyed.is_some(),
            "Morale increased"
        );
    }

    Ok(AppliedAttack {
        entry: *entry,
        defender_hp,
        killed,
        army_destroyed,
        morale_gained,
    })
}

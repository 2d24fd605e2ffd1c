//! Battle snapshot and the transitions the orchestration layer applies.
//!
//! [`BattleState`] is an owned value: the rules modules only ever read
//! borrowed slices of it, and every change goes through one of the methods
//! here. There is no global state, so two snapshots built from the same
//! inputs and fed the same commands always end with the same
//! [`BattleState::state_hash`].
//!
//! # Determinism
//!
//! - Troops and armies keep their insertion order, which is also the
//!   resolution order for attacks and interceptions.
//! - Hashing walks troops and armies sorted by id.
//! - No floating-point math and no randomness.
//!
//! # Example
//!
//! ```
//! use tactics_core::prelude::*;
//!
//! let mut state = BattleState::new(BattleMap::new());
//! state.place_troop(Side::Player, Coord::new(5, 5), SoldierType::Infantry).unwrap();
//! state.place_troop(Side::Player, Coord::new(6, 5), SoldierType::Archer).unwrap();
//! state.place_troop(Side::Enemy, Coord::new(5, 20), SoldierType::Shield).unwrap();
//!
//! let outcome = state
//!     .form_army(&[Coord::new(5, 5), Coord::new(6, 5)], "Vanguard", Direction::Down)
//!     .unwrap();
//! assert!(outcome.is_created());
//!
//! state.apply_phase_command(PhaseCommand::Start).unwrap();
//! assert_eq!(state.phase(), BattlePhase::Battle);
//! ```

use std::collections::hash_map::DefaultHasher;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use crate::combat::{
    apply_attack, resolve_attack_phase, resolve_interception, AppliedAttack, AttackLogEntry,
    CombatContext, CombatResolution, CombatRules,
};
use crate::entity::{Army, ArmyId, Morale, Side, Troop, TroopId, TroopIndex};
use crate::error::{GameError, Result};
use crate::formation::{is_army_intact, validate_selection, validate_split, FormationRejection};
use crate::grid::{BattleMap, Coord, Direction};
use crate::movement::{army_speed, footprint_allowed, movable_tiles, translate};
use crate::soldier::SoldierType;
use crate::targeting::army_threat_range;
use crate::visibility::{combined_visible_tiles, visible_targets, VisibleTiles};

/// Colour tags handed out to new armies in rotation.
const ARMY_COLORS: [&str; 6] = ["crimson", "azure", "amber", "jade", "violet", "slate"];

/// Phase of a battle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum BattlePhase {
    /// Troops are placed and armies formed.
    #[default]
    Preparation,
    /// Sides take turns moving and attacking.
    Battle,
    /// One side has won or the battle was finished.
    Result,
}

/// External command driving the phase machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PhaseCommand {
    /// Preparation to battle.
    Start,
    /// Battle to result.
    Finish,
    /// Any phase back to preparation.
    Reset,
}

/// Outcome of a formation request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormationOutcome {
    /// A new army was created.
    Created(ArmyId),
    /// The request broke a formation rule; nothing changed.
    Rejected(FormationRejection),
}

impl FormationOutcome {
    /// Whether an army was created.
    #[must_use]
    pub const fn is_created(&self) -> bool {
        matches!(self, Self::Created(_))
    }

    /// Id of the created army.
    #[must_use]
    pub const fn army_id(&self) -> Option<ArmyId> {
        match self {
            Self::Created(id) => Some(*id),
            Self::Rejected(_) => None,
        }
    }
}

/// Outcome of a move request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MoveOutcome {
    /// The army moved. `interception` holds the opposing side's reaction,
    /// which is empty outside the battle phase.
    Moved {
        /// Tiles the army now covers.
        footprint: Vec<Coord>,
        /// Interception attacks to apply with [`BattleState::apply_log`].
        interception: CombatResolution,
    },
    /// The target tile is not reachable this turn.
    Blocked,
}

/// Full battle snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BattleState {
    map: BattleMap,
    troops: Vec<Troop>,
    armies: Vec<Army>,
    phase: BattlePhase,
    turn: u32,
    active_side: Side,
    acted: BTreeSet<ArmyId>,
    rules: CombatRules,
    next_troop_id: u32,
    next_army_id: u32,
}

impl BattleState {
    /// Create an empty battle on `map`.
    #[must_use]
    pub fn new(map: BattleMap) -> Self {
        Self {
            map,
            troops: Vec::new(),
            armies: Vec::new(),
            phase: BattlePhase::Preparation,
            turn: 1,
            active_side: Side::Player,
            acted: BTreeSet::new(),
            rules: CombatRules::default(),
            next_troop_id: 1,
            next_army_id: 1,
        }
    }

    /// Builder method to set combat rules.
    #[must_use]
    pub const fn with_rules(mut self, rules: CombatRules) -> Self {
        self.rules = rules;
        self
    }

    /// Build a preparation-phase snapshot from existing troops and armies.
    ///
    /// # Errors
    ///
    /// Returns an error if the snapshot breaks a positional or army
    /// invariant (see [`BattleState::validate`]).
    pub fn from_parts(map: BattleMap, troops: Vec<Troop>, armies: Vec<Army>) -> Result<Self> {
        let next_troop_id = troops.iter().map(|t| t.id.as_u32() + 1).max().unwrap_or(1);
        let next_army_id = armies.iter().map(|a| a.id.as_u32() + 1).max().unwrap_or(1);
        let state = Self {
            troops,
            armies,
            next_troop_id,
            next_army_id,
            ..Self::new(map)
        };
        state.validate()?;
        Ok(state)
    }

    /// Check every snapshot invariant.
    ///
    /// # Errors
    ///
    /// - `OutOfBounds` if a troop or army tile lies off the map.
    /// - `TileOccupied` if two troops share a tile.
    /// - `InvalidState` for duplicate ids, armies whose tiles do not match
    ///   their side's troops, armies below two members or disconnected,
    ///   and troops claimed by two armies.
    pub fn validate(&self) -> Result<()> {
        let mut tiles = HashSet::new();
        let mut troop_ids = HashSet::new();
        for troop in &self.troops {
            let Coord { x, y } = troop.position;
            if !troop.position.in_bounds() {
                return Err(GameError::OutOfBounds { x, y });
            }
            if !tiles.insert(troop.position) {
                return Err(GameError::TileOccupied { x, y });
            }
            if !troop_ids.insert(troop.id) {
                return Err(GameError::InvalidState(format!(
                    "duplicate troop id {}",
                    troop.id
                )));
            }
        }

        let index = TroopIndex::new(&self.troops);
        let mut claimed = HashSet::new();
        let mut army_ids = HashSet::new();
        for army in &self.armies {
            if !army_ids.insert(army.id) {
                return Err(GameError::InvalidState(format!(
                    "duplicate army id {}",
                    army.id
                )));
            }
            for &member in &army.members {
                if !member.in_bounds() {
                    return Err(GameError::OutOfBounds {
                        x: member.x,
                        y: member.y,
                    });
                }
                if index.at(member).map(|t| t.side) != Some(army.side) {
                    return Err(GameError::InvalidState(format!(
                        "army {} has no troop of its side at {member}",
                        army.id
                    )));
                }
                if !claimed.insert(member) {
                    return Err(GameError::InvalidState(format!(
                        "troop at {member} belongs to more than one army"
                    )));
                }
            }
            if !is_army_intact(army, &index) {
                return Err(GameError::InvalidState(format!(
                    "army {} is too small or not connected",
                    army.id
                )));
            }
        }
        Ok(())
    }

    /// The battle map.
    #[must_use]
    pub const fn map(&self) -> &BattleMap {
        &self.map
    }

    /// Every troop, dead ones included.
    #[must_use]
    pub fn troops(&self) -> &[Troop] {
        &self.troops
    }

    /// Every army.
    #[must_use]
    pub fn armies(&self) -> &[Army] {
        &self.armies
    }

    /// Current phase.
    #[must_use]
    pub const fn phase(&self) -> BattlePhase {
        self.phase
    }

    /// Current turn, starting at 1.
    #[must_use]
    pub const fn turn(&self) -> u32 {
        self.turn
    }

    /// Side whose turn it is.
    #[must_use]
    pub const fn active_side(&self) -> Side {
        self.active_side
    }

    /// Armies that have attacked or intercepted this turn.
    #[must_use]
    pub const fn acted(&self) -> &BTreeSet<ArmyId> {
        &self.acted
    }

    /// Combat rules in force.
    #[must_use]
    pub const fn rules(&self) -> CombatRules {
        self.rules
    }

    /// Look up a troop by id.
    #[must_use]
    pub fn troop(&self, id: TroopId) -> Option<&Troop> {
        self.troops.iter().find(|t| t.id == id)
    }

    /// Look up an army by id.
    #[must_use]
    pub fn army(&self, id: ArmyId) -> Option<&Army> {
        self.armies.iter().find(|a| a.id == id)
    }

    /// Troops of one side, in snapshot order.
    #[must_use]
    pub fn troops_of(&self, side: Side) -> Vec<Troop> {
        self.troops.iter().filter(|t| t.side == side).cloned().collect()
    }

    /// Armies of one side, in snapshot order.
    #[must_use]
    pub fn armies_of(&self, side: Side) -> Vec<Army> {
        self.armies.iter().filter(|a| a.side == side).cloned().collect()
    }

    fn require_phase(&self, allowed: &[BattlePhase], action: &str) -> Result<()> {
        if allowed.contains(&self.phase) {
            Ok(())
        } else {
            Err(GameError::InvalidState(format!(
                "cannot {action} during {:?}",
                self.phase
            )))
        }
    }

    fn army_ref(&self, id: ArmyId) -> Result<&Army> {
        self.army(id).ok_or(GameError::ArmyNotFound(id))
    }

    // ------------------------------------------------------------------
    // Phase machine
    // ------------------------------------------------------------------

    /// Apply a phase command and return the new phase.
    ///
    /// `Start` is accepted only in preparation, `Finish` only in battle.
    /// `Reset` is accepted anywhere: it returns to preparation at turn 1
    /// with the player to act, clears the acted set and drops every
    /// army's morale back to 1.
    ///
    /// # Errors
    ///
    /// Returns `GameError::InvalidPhaseTransition` when the command does
    /// not apply to the current phase.
    pub fn apply_phase_command(&mut self, command: PhaseCommand) -> Result<BattlePhase> {
        let next = match (self.phase, command) {
            (BattlePhase::Preparation, PhaseCommand::Start) => BattlePhase::Battle,
            (BattlePhase::Battle, PhaseCommand::Finish) => BattlePhase::Result,
            (_, PhaseCommand::Reset) => BattlePhase::Preparation,
            (from, command) => return Err(GameError::InvalidPhaseTransition { from, command }),
        };

        match command {
            PhaseCommand::Start => {
                self.turn = 1;
                self.active_side = Side::Player;
                self.acted.clear();
            }
            PhaseCommand::Finish => {}
            PhaseCommand::Reset => {
                self.turn = 1;
                self.active_side = Side::Player;
                self.acted.clear();
                for army in &mut self.armies {
                    army.morale = Morale::MIN;
                }
            }
        }

        tracing::info!(from = ?self.phase, to = ?next, "Phase changed");
        self.phase = next;
        Ok(next)
    }

    /// Hand the turn to the other side.
    ///
    /// The turn counter advances each time play returns to the player.
    ///
    /// # Errors
    ///
    /// Returns `GameError::InvalidState` outside the battle phase.
    pub fn end_turn(&mut self) -> Result<()> {
        self.require_phase(&[BattlePhase::Battle], "end a turn")?;
        self.active_side = self.active_side.opponent();
        if self.active_side == Side::Player {
            self.turn += 1;
        }
        self.acted.clear();
        tracing::debug!(turn = self.turn, side = ?self.active_side, "Turn ended");
        Ok(())
    }

    // ------------------------------------------------------------------
    // Placement
    // ------------------------------------------------------------------

    /// Place a new troop at full health.
    ///
    /// # Errors
    ///
    /// - `InvalidState` outside preparation.
    /// - `OutOfBounds` if `position` is off the map.
    /// - `TileOccupied` if a troop already stands there.
    pub fn place_troop(
        &mut self,
        side: Side,
        position: Coord,
        soldier_type: SoldierType,
    ) -> Result<TroopId> {
        self.require_phase(&[BattlePhase::Preparation], "place troops")?;
        let Coord { x, y } = position;
        if !position.in_bounds() {
            return Err(GameError::OutOfBounds { x, y });
        }
        if self.troops.iter().any(|t| t.position == position) {
            return Err(GameError::TileOccupied { x, y });
        }

        let id = TroopId::new(self.next_troop_id);
        self.next_troop_id += 1;
        self.troops.push(Troop::new(id, side, position, soldier_type));
        tracing::trace!(troop = %id, %position, ?soldier_type, "Troop placed");
        Ok(id)
    }

    /// Remove a troop, pruning armies it leaves invalid.
    ///
    /// # Errors
    ///
    /// - `InvalidState` outside preparation.
    /// - `TroopNotFound` if no troop has `id`.
    pub fn remove_troop(&mut self, id: TroopId) -> Result<Troop> {
        self.require_phase(&[BattlePhase::Preparation], "remove troops")?;
        let slot = self
            .troops
            .iter()
            .position(|t| t.id == id)
            .ok_or(GameError::TroopNotFound(id))?;
        let troop = self.troops.remove(slot);
        self.prune_armies(&[troop.position]);
        Ok(troop)
    }

    /// Remove every dead troop and return how many were removed.
    ///
    /// # Errors
    ///
    /// Returns `GameError::InvalidState` outside preparation.
    pub fn clear_dead_troops(&mut self) -> Result<usize> {
        self.require_phase(&[BattlePhase::Preparation], "clear dead troops")?;
        let vacated: Vec<Coord> = self
            .troops
            .iter()
            .filter(|t| t.is_dead())
            .map(|t| t.position)
            .collect();
        self.troops.retain(Troop::is_alive);
        self.prune_armies(&vacated);
        Ok(vacated.len())
    }

    /// Drop vacated tiles from armies, then drop armies left invalid.
    fn prune_armies(&mut self, vacated: &[Coord]) {
        if vacated.is_empty() {
            return;
        }
        for army in &mut self.armies {
            army.members.retain(|c| !vacated.contains(c));
        }
        let index = TroopIndex::new(&self.troops);
        self.armies.retain(|army| {
            let keep = is_army_intact(army, &index);
            if !keep {
                tracing::debug!(army = %army.id, "Army disbanded after losing members");
            }
            keep
        });
    }

    // ------------------------------------------------------------------
    // Armies
    // ------------------------------------------------------------------

    /// Group the troops on `selected` into a new army facing `facing`.
    ///
    /// # Errors
    ///
    /// Returns `GameError::InvalidState` outside preparation. Formation
    /// rule failures are reported as [`FormationOutcome::Rejected`].
    pub fn form_army(
        &mut self,
        selected: &[Coord],
        name: impl Into<String>,
        facing: Direction,
    ) -> Result<FormationOutcome> {
        self.require_phase(&[BattlePhase::Preparation], "form armies")?;
        if let Some(rejection) = validate_selection(selected, &self.troops, &self.armies).rejection()
        {
            return Ok(FormationOutcome::Rejected(rejection));
        }

        let index = TroopIndex::new(&self.troops);
        let mut members = Vec::new();
        for &coord in selected {
            if index.is_occupied(coord) && !members.contains(&coord) {
                members.push(coord);
            }
        }
        let side = members
            .first()
            .and_then(|&c| index.at(c))
            .map(|t| t.side)
            .ok_or_else(|| GameError::InvalidState("formed army has no troops".into()))?;

        let id = self.allocate_army_id();
        let army =
            Army::new(id, side, name, facing, members).with_color_tag(default_color_tag(id));
        tracing::debug!(army = %id, name = %army.name, size = army.members.len(), "Army formed");
        self.armies.push(army);
        Ok(FormationOutcome::Created(id))
    }

    /// Split `selected` off army `source` into a new army.
    ///
    /// The new army inherits the source's side, facing and morale.
    ///
    /// # Errors
    ///
    /// - `InvalidState` outside preparation.
    /// - `ArmyNotFound` if `source` does not exist.
    pub fn split_army(
        &mut self,
        source: ArmyId,
        selected: &[Coord],
        name: impl Into<String>,
    ) -> Result<FormationOutcome> {
        self.require_phase(&[BattlePhase::Preparation], "split armies")?;
        let army = self.army_ref(source)?;
        if let Some(rejection) = validate_split(selected, army, &self.troops).rejection() {
            return Ok(FormationOutcome::Rejected(rejection));
        }

        let mut split_off = Vec::new();
        for &coord in &army.members {
            if selected.contains(&coord) {
                split_off.push(coord);
            }
        }
        let (side, facing, morale) = (army.side, army.facing, army.morale);

        let id = self.allocate_army_id();
        for army in self.armies.iter_mut().filter(|a| a.id == source) {
            army.members.retain(|c| !split_off.contains(c));
        }
        let new_army = Army::new(id, side, name, facing, split_off)
            .with_morale(morale)
            .with_color_tag(default_color_tag(id));
        tracing::debug!(source = %source, army = %id, "Army split");
        self.armies.push(new_army);
        Ok(FormationOutcome::Created(id))
    }

    /// Dissolve an army, leaving its troops in place.
    ///
    /// # Errors
    ///
    /// - `InvalidState` outside preparation.
    /// - `ArmyNotFound` if `id` does not exist.
    pub fn disband_army(&mut self, id: ArmyId) -> Result<Army> {
        self.require_phase(&[BattlePhase::Preparation], "disband armies")?;
        let slot = self
            .armies
            .iter()
            .position(|a| a.id == id)
            .ok_or(GameError::ArmyNotFound(id))?;
        tracing::debug!(army = %id, "Army disbanded");
        Ok(self.armies.remove(slot))
    }

    /// Turn an army to face `facing`.
    ///
    /// # Errors
    ///
    /// - `InvalidState` once the battle has a result.
    /// - `ArmyNotFound` if `id` does not exist.
    pub fn set_facing(&mut self, id: ArmyId, facing: Direction) -> Result<()> {
        self.require_phase(
            &[BattlePhase::Preparation, BattlePhase::Battle],
            "change facing",
        )?;
        let army = self
            .armies
            .iter_mut()
            .find(|a| a.id == id)
            .ok_or(GameError::ArmyNotFound(id))?;
        army.facing = facing;
        Ok(())
    }

    fn allocate_army_id(&mut self) -> ArmyId {
        let id = ArmyId::new(self.next_army_id);
        self.next_army_id += 1;
        id
    }

    // ------------------------------------------------------------------
    // Movement
    // ------------------------------------------------------------------

    /// Tiles army `id` could cover after one move from where it stands.
    ///
    /// # Errors
    ///
    /// Returns `GameError::ArmyNotFound` if `id` does not exist.
    pub fn army_movable_tiles(&self, id: ArmyId) -> Result<BTreeSet<Coord>> {
        let army = self.army_ref(id)?;
        let speed = army_speed(army, &self.troops, &self.map);
        Ok(movable_tiles(
            army,
            speed,
            &self.troops,
            &self.armies,
            &self.map,
        ))
    }

    /// Tiles army `id` currently threatens.
    ///
    /// # Errors
    ///
    /// Returns `GameError::ArmyNotFound` if `id` does not exist.
    pub fn army_threat_tiles(&self, id: ArmyId) -> Result<BTreeSet<Coord>> {
        let army = self.army_ref(id)?;
        Ok(army_threat_range(army, &self.troops, &self.map))
    }

    /// Move army `id` so that its rounded centroid lands on `target`.
    ///
    /// `target` must be one of the army's movable tiles and the translated
    /// footprint must itself be free. In battle only the active side may
    /// move, and the opposing side immediately resolves interceptions; the
    /// interceptors are marked acted but their attacks are returned for the
    /// caller to apply.
    ///
    /// # Errors
    ///
    /// - `InvalidState` after the battle, or when moving the inactive
    ///   side's army during battle.
    /// - `ArmyNotFound` if `id` does not exist.
    /// - `OutOfBounds` if a troop stands off the map.
    pub fn move_army(&mut self, id: ArmyId, target: Coord) -> Result<MoveOutcome> {
        self.require_phase(
            &[BattlePhase::Preparation, BattlePhase::Battle],
            "move armies",
        )?;
        let army = self.army_ref(id)?;
        if self.phase == BattlePhase::Battle && army.side != self.active_side {
            return Err(GameError::InvalidState(format!(
                "army {id} cannot move on the other side's turn"
            )));
        }

        let speed = army_speed(army, &self.troops, &self.map);
        let reachable = movable_tiles(army, speed, &self.troops, &self.armies, &self.map);
        if !reachable.contains(&target) {
            return Ok(MoveOutcome::Blocked);
        }
        let moved = translate(army, target);
        if !footprint_allowed(army, &moved.members, &self.troops, &self.armies, &self.map) {
            return Ok(MoveOutcome::Blocked);
        }

        let shift: HashMap<Coord, Coord> = army
            .members
            .iter()
            .copied()
            .zip(moved.members.iter().copied())
            .collect();
        for troop in self.troops.iter_mut().filter(|t| t.side == moved.side) {
            if let Some(&to) = shift.get(&troop.position) {
                troop.position = to;
            }
        }
        let footprint = moved.members.clone();
        if let Some(slot) = self.armies.iter_mut().find(|a| a.id == id) {
            *slot = moved.clone();
        }
        tracing::debug!(army = %id, %target, "Army moved");

        let interception = if self.phase == BattlePhase::Battle {
            let resolution = self.resolve_for(moved.side.opponent(), |ctx, acted| {
                resolve_interception(ctx, &moved, acted)
            })?;
            self.acted.extend(resolution.acted.iter().copied());
            resolution
        } else {
            CombatResolution::default()
        };

        Ok(MoveOutcome::Moved {
            footprint,
            interception,
        })
    }

    // ------------------------------------------------------------------
    // Combat
    // ------------------------------------------------------------------

    fn resolve_for<F>(&self, side: Side, resolve: F) -> Result<CombatResolution>
    where
        F: FnOnce(&CombatContext<'_>, &BTreeSet<ArmyId>) -> Result<CombatResolution>,
    {
        let friendly_armies = self.armies_of(side);
        let friendly_troops = self.troops_of(side);
        let enemy_armies = self.armies_of(side.opponent());
        let enemy_troops = self.troops_of(side.opponent());
        let visible = combined_visible_tiles(&friendly_troops, &self.map)?;

        let ctx = CombatContext {
            map: &self.map,
            friendly_armies: &friendly_armies,
            friendly_troops: &friendly_troops,
            enemy_armies: &enemy_armies,
            enemy_troops: &enemy_troops,
            visible: &visible,
            rules: self.rules,
        };
        resolve(&ctx, &self.acted)
    }

    /// Resolve the active side's attack phase and mark the attackers acted.
    ///
    /// The returned log has not been applied yet; pass it to
    /// [`BattleState::apply_log`].
    ///
    /// # Errors
    ///
    /// - `InvalidState` outside the battle phase.
    /// - `OutOfBounds` if a troop stands off the map.
    pub fn run_attack_phase(&mut self) -> Result<CombatResolution> {
        self.require_phase(&[BattlePhase::Battle], "attack")?;
        let resolution = self.resolve_for(self.active_side, resolve_attack_phase)?;
        self.acted.extend(resolution.acted.iter().copied());
        tracing::debug!(
            side = ?self.active_side,
            turn = self.turn,
            attacks = resolution.log.len(),
            "Attack phase resolved"
        );
        Ok(resolution)
    }

    /// Apply resolved attacks in order.
    ///
    /// When the log leaves one side without living troops, the battle
    /// moves to the result phase.
    ///
    /// # Errors
    ///
    /// Returns `TroopNotFound` or `ArmyNotFound` if an entry references
    /// something missing from this snapshot. Entries before the failing
    /// one stay applied.
    pub fn apply_log(&mut self, log: &[AttackLogEntry]) -> Result<Vec<AppliedAttack>> {
        let mut applied = Vec::with_capacity(log.len());
        for entry in log {
            applied.push(apply_attack(entry, &mut self.troops, &mut self.armies)?);
        }

        #[cfg(feature = "debug-validation")]
        self.validate()?;

        if self.phase == BattlePhase::Battle && self.is_battle_over() {
            self.phase = BattlePhase::Result;
            tracing::info!(winner = ?self.winner(), turn = self.turn, "Battle over");
        }
        Ok(applied)
    }

    /// Whether `side` fielded troops and all of them are dead.
    #[must_use]
    pub fn is_defeated(&self, side: Side) -> bool {
        let mut fielded = self.troops.iter().filter(|t| t.side == side).peekable();
        fielded.peek().is_some() && fielded.all(Troop::is_dead)
    }

    /// Whether either side has been wiped out.
    #[must_use]
    pub fn is_battle_over(&self) -> bool {
        self.is_defeated(Side::Player) || self.is_defeated(Side::Enemy)
    }

    /// The side whose opponent has been wiped out, if exactly one has.
    #[must_use]
    pub fn winner(&self) -> Option<Side> {
        match (self.is_defeated(Side::Player), self.is_defeated(Side::Enemy)) {
            (false, true) => Some(Side::Player),
            (true, false) => Some(Side::Enemy),
            _ => None,
        }
    }

    // ------------------------------------------------------------------
    // Vision
    // ------------------------------------------------------------------

    /// Tiles seen by any living troop of `side`.
    ///
    /// # Errors
    ///
    /// Returns `GameError::OutOfBounds` if a troop stands off the map.
    pub fn side_visible_tiles(&self, side: Side) -> Result<VisibleTiles> {
        combined_visible_tiles(self.troops.iter().filter(|t| t.side == side), &self.map)
    }

    /// Enemy troops seen by at least one living troop of `side`.
    ///
    /// # Errors
    ///
    /// Returns `GameError::OutOfBounds` if a troop stands off the map.
    pub fn visible_enemies(&self, side: Side) -> Result<Vec<&Troop>> {
        let observers = self.troops_of(side);
        let targets = self.troops_of(side.opponent());
        let seen: HashSet<TroopId> = visible_targets(&observers, &targets, &self.map)?
            .into_iter()
            .map(|t| t.id)
            .collect();
        Ok(self.troops.iter().filter(|t| seen.contains(&t.id)).collect())
    }

    // ------------------------------------------------------------------
    // Snapshots
    // ------------------------------------------------------------------

    /// Compute a hash of the current battle state.
    ///
    /// Used for replay verification and desync checks.
    #[must_use]
    pub fn state_hash(&self) -> u64 {
        let mut hasher = DefaultHasher::new();

        self.phase.hash(&mut hasher);
        self.turn.hash(&mut hasher);
        self.active_side.hash(&mut hasher);
        self.acted.hash(&mut hasher);
        self.rules.hash(&mut hasher);
        self.map.hash(&mut hasher);

        let mut troops: Vec<&Troop> = self.troops.iter().collect();
        troops.sort_by_key(|t| t.id);
        troops.len().hash(&mut hasher);
        for troop in troops {
            troop.hash(&mut hasher);
        }

        let mut armies: Vec<&Army> = self.armies.iter().collect();
        armies.sort_by_key(|a| a.id);
        armies.len().hash(&mut hasher);
        for army in armies {
            army.hash(&mut hasher);
        }

        hasher.finish()
    }

    /// Serialize the snapshot to bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn serialize(&self) -> Result<Vec<u8>> {
        bincode::serialize(self)
            .map_err(|e| GameError::Serialization(format!("failed to encode battle: {e}")))
    }

    /// Deserialize and validate a snapshot.
    ///
    /// # Errors
    ///
    /// Returns an error if decoding fails or the decoded snapshot breaks
    /// an invariant.
    pub fn deserialize(data: &[u8]) -> Result<Self> {
        let state: Self = bincode::deserialize(data)
            .map_err(|e| GameError::Serialization(format!("failed to decode battle: {e}")))?;
        state.validate()?;
        Ok(state)
    }
}

/// Colour tag assigned to army `id` when none is given.
pub(crate) fn default_color_tag(id: ArmyId) -> String {
    ARMY_COLORS[id.as_u32() as usize % ARMY_COLORS.len()].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::{TerrainType, Tile};

    /// Player infantry pair at (10,12),(11,12) facing up; enemy archer
    /// pair at (10,5),(11,5) facing down.
    fn skirmish() -> (BattleState, ArmyId, ArmyId) {
        let mut state = BattleState::new(BattleMap::new());
        for x in [10, 11] {
            state
                .place_troop(Side::Player, Coord::new(x, 12), SoldierType::Infantry)
                .unwrap();
            state
                .place_troop(Side::Enemy, Coord::new(x, 5), SoldierType::Archer)
                .unwrap();
        }
        let player = state
            .form_army(&[Coord::new(10, 12), Coord::new(11, 12)], "Foot", Direction::Up)
            .unwrap()
            .army_id()
            .unwrap();
        let enemy = state
            .form_army(&[Coord::new(10, 5), Coord::new(11, 5)], "Bows", Direction::Down)
            .unwrap()
            .army_id()
            .unwrap();
        (state, player, enemy)
    }

    #[test]
    fn test_phase_machine() {
        let mut state = BattleState::new(BattleMap::new());
        assert!(matches!(
            state.apply_phase_command(PhaseCommand::Finish),
            Err(GameError::InvalidPhaseTransition {
                from: BattlePhase::Preparation,
                command: PhaseCommand::Finish
            })
        ));
        assert_eq!(
            state.apply_phase_command(PhaseCommand::Start).unwrap(),
            BattlePhase::Battle
        );
        assert!(state.apply_phase_command(PhaseCommand::Start).is_err());
        assert_eq!(
            state.apply_phase_command(PhaseCommand::Finish).unwrap(),
            BattlePhase::Result
        );
        assert_eq!(
            state.apply_phase_command(PhaseCommand::Reset).unwrap(),
            BattlePhase::Preparation
        );
    }

    #[test]
    fn test_reset_restores_morale_and_turn() {
        let (mut state, player, _) = skirmish();
        state.armies[0].morale = Morale::new(3);
        state.apply_phase_command(PhaseCommand::Start).unwrap();
        state.end_turn().unwrap();
        state.end_turn().unwrap();
        assert_eq!(state.turn(), 2);

        state.apply_phase_command(PhaseCommand::Reset).unwrap();
        assert_eq!(state.turn(), 1);
        assert_eq!(state.active_side(), Side::Player);
        assert_eq!(state.army(player).unwrap().morale, Morale::MIN);
    }

    #[test]
    fn test_placement_rules() {
        let mut state = BattleState::new(BattleMap::new());
        state
            .place_troop(Side::Player, Coord::new(0, 0), SoldierType::General)
            .unwrap();
        assert!(matches!(
            state.place_troop(Side::Enemy, Coord::new(0, 0), SoldierType::General),
            Err(GameError::TileOccupied { x: 0, y: 0 })
        ));
        assert!(matches!(
            state.place_troop(Side::Enemy, Coord::new(30, 0), SoldierType::General),
            Err(GameError::OutOfBounds { x: 30, y: 0 })
        ));

        state.apply_phase_command(PhaseCommand::Start).unwrap();
        assert!(state
            .place_troop(Side::Enemy, Coord::new(5, 5), SoldierType::General)
            .is_err());
    }

    #[test]
    fn test_removing_member_prunes_army() {
        let (mut state, player, enemy) = skirmish();
        let victim = state.troops()[0].id;
        state.remove_troop(victim).unwrap();
        assert!(state.army(player).is_none());
        assert!(state.army(enemy).is_some());
        state.validate().unwrap();
    }

    #[test]
    fn test_form_army_rejection_is_not_an_error() {
        let (mut state, _, _) = skirmish();
        let outcome = state
            .form_army(&[Coord::new(10, 12), Coord::new(11, 12)], "Again", Direction::Up)
            .unwrap();
        assert!(matches!(
            outcome,
            FormationOutcome::Rejected(FormationRejection::AlreadyInArmy(_))
        ));
    }

    #[test]
    fn test_split_army() {
        let mut state = BattleState::new(BattleMap::new());
        let tiles: Vec<Coord> = (0..4).map(|x| Coord::new(x, 3)).collect();
        for &tile in &tiles {
            state
                .place_troop(Side::Player, tile, SoldierType::Shield)
                .unwrap();
        }
        let source = state
            .form_army(&tiles, "Line", Direction::Right)
            .unwrap()
            .army_id()
            .unwrap();
        let split = state
            .split_army(source, &tiles[2..], "Right wing")
            .unwrap()
            .army_id()
            .unwrap();

        assert_eq!(state.army(source).unwrap().members, tiles[..2].to_vec());
        let right = state.army(split).unwrap();
        assert_eq!(right.members, tiles[2..].to_vec());
        assert_eq!(right.facing, Direction::Right);
        state.validate().unwrap();
    }

    #[test]
    fn test_move_and_block() {
        let (mut state, player, _) = skirmish();
        // centroid (11,12), infantry speed 3
        let outcome = state.move_army(player, Coord::new(11, 10)).unwrap();
        match outcome {
            MoveOutcome::Moved {
                footprint,
                interception,
            } => {
                assert_eq!(footprint, vec![Coord::new(10, 10), Coord::new(11, 10)]);
                assert!(interception.is_empty());
            }
            MoveOutcome::Blocked => panic!("move should succeed"),
        }
        assert!(state.troops().iter().any(|t| t.position == Coord::new(10, 10)));

        // diagonal targets are never reachable in one move
        assert_eq!(
            state.move_army(player, Coord::new(13, 8)).unwrap(),
            MoveOutcome::Blocked
        );
        state.validate().unwrap();
    }

    #[test]
    fn test_move_into_archer_ray_is_intercepted() {
        let (mut state, player, enemy) = skirmish();
        state.apply_phase_command(PhaseCommand::Start).unwrap();

        // archers at y=5 face down with range 4: rays reach y=9
        let outcome = state.move_army(player, Coord::new(11, 9)).unwrap();
        let MoveOutcome::Moved { interception, .. } = outcome else {
            panic!("move should succeed");
        };
        assert_eq!(interception.log.len(), 2);
        assert!(interception.log[1].is_counter_attack);
        assert!(state.acted().contains(&enemy));

        let applied = state.apply_log(&interception.log).unwrap();
        assert_eq!(applied.len(), 2);
        // Archer 4 vs Infantry 3 on grass
        assert_eq!(applied[0].defender_hp, 900);
        assert_eq!(state.phase(), BattlePhase::Battle);
    }

    #[test]
    fn test_inactive_side_cannot_move() {
        let (mut state, _, enemy) = skirmish();
        state.apply_phase_command(PhaseCommand::Start).unwrap();
        assert!(state.move_army(enemy, Coord::new(11, 7)).is_err());
    }

    #[test]
    fn test_attack_phase_marks_acted_and_ends_battle() {
        let (mut state, player, enemy) = skirmish();
        // archers stand right in front of the infantry ray
        let front = [Coord::new(10, 11), Coord::new(11, 11)];
        for (troop, tile) in state
            .troops
            .iter_mut()
            .filter(|t| t.side == Side::Enemy)
            .zip(front)
        {
            troop.position = tile;
            troop.hp = 100;
        }
        state.armies[1].members = front.to_vec();
        state.validate().unwrap();
        state.apply_phase_command(PhaseCommand::Start).unwrap();

        let resolution = state.run_attack_phase().unwrap();
        assert_eq!(resolution.acted, vec![player]);
        assert!(state.acted().contains(&player));

        // Infantry 3 vs Archer 1: 200 per hit on (11,11), the nearer archer
        let applied = state.apply_log(&resolution.log).unwrap();
        assert!(applied[0].killed);
        assert_eq!(state.army(player).unwrap().morale, Morale::MAX);
        assert_eq!(state.phase(), BattlePhase::Battle);
        assert!(state.army(enemy).is_some());

        // second call this turn: player army already acted
        assert!(state.run_attack_phase().unwrap().is_empty());

        state.end_turn().unwrap();
        state.end_turn().unwrap();
        let resolution = state.run_attack_phase().unwrap();
        state.apply_log(&resolution.log).unwrap();
        assert_eq!(state.phase(), BattlePhase::Result);
        assert_eq!(state.winner(), Some(Side::Player));
    }

    #[test]
    fn test_vision_helpers() {
        let mut map = BattleMap::new();
        map.set_tile(Coord::new(10, 5), Tile::new(TerrainType::Forest));
        let mut state = BattleState::new(map);
        state
            .place_troop(Side::Player, Coord::new(10, 8), SoldierType::Infantry)
            .unwrap();
        state
            .place_troop(Side::Enemy, Coord::new(10, 5), SoldierType::Archer)
            .unwrap();
        state
            .place_troop(Side::Enemy, Coord::new(10, 20), SoldierType::Archer)
            .unwrap();

        let tiles = state.side_visible_tiles(Side::Player).unwrap();
        assert!(tiles.contains(&Coord::new(10, 3)));
        let seen = state.visible_enemies(Side::Player).unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].position, Coord::new(10, 5));
    }

    #[test]
    fn test_from_parts_rejects_overlap() {
        let troops = vec![
            Troop::new(TroopId::new(1), Side::Player, Coord::new(1, 1), SoldierType::General),
            Troop::new(TroopId::new(2), Side::Enemy, Coord::new(1, 1), SoldierType::General),
        ];
        assert!(matches!(
            BattleState::from_parts(BattleMap::new(), troops, Vec::new()),
            Err(GameError::TileOccupied { x: 1, y: 1 })
        ));
    }

    #[test]
    fn test_from_parts_rejects_disconnected_army() {
        let troops = vec![
            Troop::new(TroopId::new(1), Side::Player, Coord::new(1, 1), SoldierType::General),
            Troop::new(TroopId::new(2), Side::Player, Coord::new(3, 1), SoldierType::General),
        ];
        let armies = vec![Army::new(
            ArmyId::new(1),
            Side::Player,
            "Split",
            Direction::Up,
            vec![Coord::new(1, 1), Coord::new(3, 1)],
        )];
        let err = BattleState::from_parts(BattleMap::new(), troops, armies).unwrap_err();
        assert!(err.is_invariant_violation());
    }

    #[test]
    fn test_serialization_roundtrip() {
        let (mut state, player, _) = skirmish();
        state.move_army(player, Coord::new(11, 10)).unwrap();

        let bytes = state.serialize().unwrap();
        let restored = BattleState::deserialize(&bytes).unwrap();
        assert_eq!(state.state_hash(), restored.state_hash());
        assert!(BattleState::deserialize(&bytes[..bytes.len() / 2]).is_err());
    }

    #[test]
    fn test_determinism() {
        let run = || {
            let (mut state, player, _) = skirmish();
            state.apply_phase_command(PhaseCommand::Start).unwrap();
            if let MoveOutcome::Moved { interception, .. } =
                state.move_army(player, Coord::new(11, 9)).unwrap()
            {
                state.apply_log(&interception.log).unwrap();
            }
            state.state_hash()
        };
        let first = run();
        for _ in 0..10 {
            assert_eq!(run(), first);
        }
    }
}

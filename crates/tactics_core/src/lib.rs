//! # Tactics Core
//!
//! Deterministic rules engine for grid tactics battles.
//!
//! This crate contains **only** deterministic logic:
//! - No rendering
//! - No IO
//! - No randomness
//! - No floating-point math (averages use fixed-point)
//!
//! Callers own a [`state::BattleState`] snapshot and drive it through phase
//! commands, placement, army formation, movement and combat. The rules
//! modules underneath are plain functions over borrowed snapshots and can
//! be called directly.
//!
//! ## Crate Structure
//!
//! - [`grid`] - 30x30 battle map, coordinates and terrain
//! - [`soldier`] - Soldier types and base stats
//! - [`terrain`] - Terrain stat modifiers
//! - [`entity`] - Troops, armies and morale
//! - [`formation`] - Army formation and split rules
//! - [`movement`] - Army speed and reachable tiles
//! - [`visibility`] - Vision ranges and visible tiles
//! - [`targeting`] - Threat rays and target selection
//! - [`damage`] - Damage formula
//! - [`combat`] - Attack phase, interception and morale bookkeeping
//! - [`state`] - Battle snapshot and transitions
//! - [`data`] - RON scenario definitions

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod combat;
pub mod damage;
pub mod data;
pub mod entity;
pub mod error;
pub mod formation;
pub mod grid;
pub mod movement;
pub mod soldier;
pub mod state;
pub mod targeting;
pub mod terrain;
pub mod visibility;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::combat::{
        AppliedAttack, AttackLogEntry, CombatResolution, CombatRules, DefenderMorale,
    };
    pub use crate::damage::{compute_damage, DamageParams};
    pub use crate::data::ScenarioData;
    pub use crate::entity::{Army, ArmyId, Morale, Side, Troop, TroopId};
    pub use crate::error::{GameError, Result};
    pub use crate::formation::{FormationRejection, FormationVerdict};
    pub use crate::grid::{BattleMap, Coord, Direction, TerrainType, Tile, MAP_SIZE};
    pub use crate::soldier::{SoldierType, MAX_HP};
    pub use crate::state::{BattlePhase, BattleState, FormationOutcome, MoveOutcome, PhaseCommand};
    pub use crate::visibility::VisibleTiles;
}

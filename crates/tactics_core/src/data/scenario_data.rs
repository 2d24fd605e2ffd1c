//! Scenario definition: map, troops, armies and rules.

use serde::{Deserialize, Serialize};

use crate::combat::CombatRules;
use crate::entity::{Army, ArmyId, Morale, Side, Troop, TroopId};
use crate::error::{GameError, Result};
use crate::grid::{BattleMap, Coord, Direction};
use crate::soldier::{SoldierType, MAX_HP};
use crate::state::{default_color_tag, BattleState};

/// A troop placed before the battle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TroopPlacement {
    /// Owning side.
    pub side: Side,
    /// Column.
    pub x: i32,
    /// Row.
    pub y: i32,
    /// Soldier type.
    pub soldier: SoldierType,
    /// Starting hit points; full health when omitted.
    #[serde(default)]
    pub hp: Option<u32>,
}

/// An army formed before the battle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArmySetup {
    /// Owning side.
    pub side: Side,
    /// Display name.
    pub name: String,
    /// Initial facing.
    pub facing: Direction,
    /// Initial morale (1-3).
    #[serde(default)]
    pub morale: Morale,
    /// Member tiles as `(x, y)`, in formation order.
    pub members: Vec<(i32, i32)>,
    /// Presentation colour tag; assigned from a rotation when omitted.
    #[serde(default)]
    pub color_tag: Option<String>,
}

/// Complete scenario definition.
///
/// # Example RON
///
/// ```ron
/// ScenarioData(
///     name: "River crossing",
///     map: [
///         "..............................",
///         // 30 rows of 30 symbols: . ~ T 1 2 3
///     ],
///     troops: [
///         TroopPlacement(side: Player, x: 4, y: 20, soldier: Infantry),
///         TroopPlacement(side: Enemy, x: 4, y: 5, soldier: Archer, hp: Some(600)),
///     ],
///     armies: [
///         ArmySetup(side: Player, name: "Vanguard", facing: Up, members: [(4, 20), (5, 20)]),
///     ],
///     rules: CombatRules(defender_morale: Baseline),
/// )
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScenarioData {
    /// Scenario name.
    pub name: String,

    /// Human-readable description.
    #[serde(default)]
    pub description: String,

    /// Map layout rows; an empty list means open grass.
    #[serde(default)]
    pub map: Vec<String>,

    /// Troop placements, in snapshot order.
    pub troops: Vec<TroopPlacement>,

    /// Pre-formed armies, in resolution order.
    #[serde(default)]
    pub armies: Vec<ArmySetup>,

    /// Combat rules.
    #[serde(default)]
    pub rules: CombatRules,
}

impl ScenarioData {
    /// Parse a scenario from RON text.
    ///
    /// # Errors
    ///
    /// Returns `GameError::DataParseError` if the text is not a valid
    /// scenario.
    pub fn from_ron(source: &str) -> Result<Self> {
        ron::from_str(source).map_err(|e| GameError::DataParseError {
            source_name: "scenario".into(),
            message: e.to_string(),
        })
    }

    /// Render the scenario as pretty RON.
    ///
    /// # Errors
    ///
    /// Returns `GameError::Serialization` if encoding fails.
    pub fn to_ron(&self) -> Result<String> {
        ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
            .map_err(|e| GameError::Serialization(e.to_string()))
    }

    /// Build the battle map.
    ///
    /// # Errors
    ///
    /// Returns `GameError::DataParseError` on a malformed layout.
    pub fn build_map(&self) -> Result<BattleMap> {
        if self.map.is_empty() {
            Ok(BattleMap::new())
        } else {
            BattleMap::from_rows(&self.map)
        }
    }

    /// Build a validated preparation-phase battle.
    ///
    /// Troops and armies receive ids in listing order, starting at 1.
    ///
    /// # Errors
    ///
    /// Returns an error if the map is malformed, a hit point value exceeds
    /// the maximum, or the placements break a snapshot invariant.
    pub fn into_state(self) -> Result<BattleState> {
        let map = self.build_map()?;

        let mut troops = Vec::with_capacity(self.troops.len());
        for (i, placement) in self.troops.into_iter().enumerate() {
            let hp = placement.hp.unwrap_or(MAX_HP);
            if hp > MAX_HP {
                return Err(GameError::DataParseError {
                    source_name: "scenario".into(),
                    message: format!("troop {} has {hp} hp, maximum is {MAX_HP}", i + 1),
                });
            }
            troops.push(
                Troop::new(
                    TroopId::new(i as u32 + 1),
                    placement.side,
                    Coord::new(placement.x, placement.y),
                    placement.soldier,
                )
                .with_hp(hp),
            );
        }

        let armies = self
            .armies
            .into_iter()
            .enumerate()
            .map(|(i, setup)| {
                let id = ArmyId::new(i as u32 + 1);
                let members = setup
                    .members
                    .iter()
                    .map(|&(x, y)| Coord::new(x, y))
                    .collect();
                let color_tag = setup.color_tag.unwrap_or_else(|| default_color_tag(id));
                Army::new(id, setup.side, setup.name, setup.facing, members)
                    .with_morale(setup.morale)
                    .with_color_tag(color_tag)
            })
            .collect();

        let state = BattleState::from_parts(map, troops, armies)?.with_rules(self.rules);
        tracing::debug!(
            scenario = %self.name,
            troops = state.troops().len(),
            armies = state.armies().len(),
            "Scenario loaded"
        );
        Ok(state)
    }
}

//! Terrain effects on soldier statistics.
//!
//! A terrain effect is derived, never stored: it depends only on the
//! soldier type and the terrain of the tile the soldier stands on.
//!
//! | Terrain        | Soldier types      | Effect                                    |
//! |----------------|--------------------|-------------------------------------------|
//! | Grass          | any                | none                                      |
//! | Water          | any                | attack -2, defense -2, range -2, speed to 1 |
//! | Forest         | Archer             | range -2                                  |
//! | Forest         | Infantry, Shield   | attack +1, defense +1                     |
//! | Forest         | Cavalry, General   | attack -1, defense -1, speed -2           |
//! | Mountain 1/2/3 | any                | none                                      |

use serde::{Deserialize, Serialize};

use crate::grid::TerrainType;
use crate::soldier::SoldierType;

/// A modifiable soldier statistic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Stat {
    /// Attack strength.
    Attack,
    /// Defense strength.
    Defense,
    /// Attack range.
    Range,
    /// Movement speed.
    Speed,
}

/// One stat adjustment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StatDelta {
    /// Adjusted stat.
    pub stat: Stat,
    /// Signed adjustment.
    pub delta: i32,
}

/// Stat adjustments a terrain applies to a soldier type.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TerrainEffect {
    deltas: Vec<StatDelta>,
}

impl TerrainEffect {
    fn from_pairs(pairs: &[(Stat, i32)]) -> Self {
        Self {
            deltas: pairs
                .iter()
                .map(|&(stat, delta)| StatDelta { stat, delta })
                .collect(),
        }
    }

    /// Effect of `terrain` on a soldier of type `soldier`.
    #[must_use]
    pub fn of(soldier: SoldierType, terrain: TerrainType) -> Self {
        use SoldierType::{Archer, Cavalry, General, Infantry, Shield};
        use Stat::{Attack, Defense, Range, Speed};

        match (terrain, soldier) {
            (TerrainType::Water, _) => Self::from_pairs(&[
                (Attack, -2),
                (Defense, -2),
                (Range, -2),
                (Speed, 1 - soldier.stats().speed),
            ]),
            (TerrainType::Forest, Archer) => Self::from_pairs(&[(Range, -2)]),
            (TerrainType::Forest, Infantry | Shield) => {
                Self::from_pairs(&[(Attack, 1), (Defense, 1)])
            }
            (TerrainType::Forest, Cavalry | General) => {
                Self::from_pairs(&[(Attack, -1), (Defense, -1), (Speed, -2)])
            }
            (
                TerrainType::Grass
                | TerrainType::Mountain1
                | TerrainType::Mountain2
                | TerrainType::Mountain3,
                _,
            ) => Self::default(),
        }
    }

    /// Adjustment for one stat, 0 when the effect leaves it alone.
    #[must_use]
    pub fn delta(&self, stat: Stat) -> i32 {
        self.deltas
            .iter()
            .filter(|d| d.stat == stat)
            .map(|d| d.delta)
            .sum()
    }

    /// Whether the effect changes nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.deltas.is_empty()
    }

    /// All adjustments in this effect.
    #[must_use]
    pub fn deltas(&self) -> &[StatDelta] {
        &self.deltas
    }

    /// Apply this effect to a base value, never going below 1.
    #[must_use]
    pub fn modify(&self, base: i32, stat: Stat) -> i32 {
        (base + self.delta(stat)).max(1)
    }
}

/// Value of `stat` for `soldier` standing on `terrain`.
#[must_use]
pub fn effective_stat(soldier: SoldierType, terrain: TerrainType, stat: Stat) -> i32 {
    let base = soldier.stats();
    let base = match stat {
        Stat::Attack => base.attack,
        Stat::Defense => base.defense,
        Stat::Range => base.range,
        Stat::Speed => base.speed,
    };
    TerrainEffect::of(soldier, terrain).modify(base, stat)
}

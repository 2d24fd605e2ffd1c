//! Soldier types and their base statistics.

use serde::{Deserialize, Serialize};

/// Maximum hit points of any troop.
pub const MAX_HP: u32 = 1000;

/// Combat classification of a troop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SoldierType {
    /// Commander - hits hard, highest target priority.
    General,
    /// Line infantry.
    Infantry,
    /// Long-range archers.
    Archer,
    /// Heavily armoured shield bearers.
    Shield,
    /// Fast mounted troops that cannot enter water.
    Cavalry,
}

/// Base statistics shared by every troop of a soldier type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SoldierStats {
    /// Attack strength.
    pub attack: i32,
    /// Defense strength.
    pub defense: i32,
    /// Attack range in tiles along the facing ray.
    pub range: i32,
    /// Tiles moved per turn.
    pub speed: i32,
}

impl SoldierType {
    /// All soldier types.
    pub const ALL: [Self; 5] = [
        Self::General,
        Self::Infantry,
        Self::Archer,
        Self::Shield,
        Self::Cavalry,
    ];

    /// Base statistics for this soldier type.
    #[must_use]
    pub const fn stats(self) -> SoldierStats {
        let (attack, defense, range, speed) = match self {
            Self::General => (5, 4, 1, 3),
            Self::Infantry => (3, 3, 1, 3),
            Self::Archer => (4, 1, 4, 2),
            Self::Shield => (2, 5, 1, 2),
            Self::Cavalry => (4, 2, 1, 5),
        };
        SoldierStats {
            attack,
            defense,
            range,
            speed,
        }
    }

    /// Priority used to break distance ties when picking a target.
    ///
    /// Higher is preferred.
    #[must_use]
    pub const fn target_priority(self) -> u8 {
        match self {
            Self::General => 5,
            Self::Archer => 4,
            Self::Cavalry => 3,
            Self::Infantry => 2,
            Self::Shield => 1,
        }
    }

    /// Display name.
    #[must_use]
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::General => "General",
            Self::Infantry => "Infantry",
            Self::Archer => "Archer",
            Self::Shield => "Shield",
            Self::Cavalry => "Cavalry",
        }
    }
}

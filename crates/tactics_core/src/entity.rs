//! Troops, armies and the coordinate index used to look them up.
//!
//! Troops are individual units occupying exactly one tile. Armies are
//! named groupings of at least two orthogonally connected troops that
//! share morale and facing. Army membership is expressed by tile
//! coordinates, so moving an army means moving its member coordinates
//! together with the troops standing on them.

use std::collections::HashMap;

use fixed::types::I32F32;
use serde::{Deserialize, Serialize};

use crate::grid::{Coord, Direction};
use crate::soldier::{SoldierType, MAX_HP};

/// Unique identifier for troops.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
pub struct TroopId(u32);

impl TroopId {
    /// Create a troop id.
    #[must_use]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Raw numeric value.
    #[must_use]
    pub const fn as_u32(self) -> u32 {
        self.0
    }
}

impl std::fmt::Display for TroopId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for armies.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
pub struct ArmyId(u32);

impl ArmyId {
    /// Create an army id.
    #[must_use]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Raw numeric value.
    #[must_use]
    pub const fn as_u32(self) -> u32 {
        self.0
    }
}

impl std::fmt::Display for ArmyId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The two opposing sides of a battle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Side {
    /// The local player.
    Player,
    /// The opponent.
    Enemy,
}

impl Side {
    /// The opposing side.
    #[must_use]
    pub const fn opponent(self) -> Self {
        match self {
            Self::Player => Self::Enemy,
            Self::Enemy => Self::Player,
        }
    }
}

/// A single unit on the battlefield.
///
/// Dead troops (hp 0) stay on their tile until explicitly cleared.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Troop {
    /// Unique identifier.
    pub id: TroopId,
    /// Owning side.
    pub side: Side,
    /// Occupied tile.
    pub position: Coord,
    /// Combat classification.
    pub soldier_type: SoldierType,
    /// Hit points in `0..=1000`.
    pub hp: u32,
}

impl Troop {
    /// Create a troop at full health.
    #[must_use]
    pub const fn new(id: TroopId, side: Side, position: Coord, soldier_type: SoldierType) -> Self {
        Self {
            id,
            side,
            position,
            soldier_type,
            hp: MAX_HP,
        }
    }

    /// Builder method to set hit points (clamped to the maximum).
    #[must_use]
    pub fn with_hp(mut self, hp: u32) -> Self {
        self.hp = hp.min(MAX_HP);
        self
    }

    /// Whether the troop has no hit points left.
    #[must_use]
    pub const fn is_dead(&self) -> bool {
        self.hp == 0
    }

    /// Whether the troop still has hit points.
    #[must_use]
    pub const fn is_alive(&self) -> bool {
        self.hp > 0
    }

    /// Subtract damage, stopping at zero. Returns the remaining hp.
    pub fn apply_damage(&mut self, damage: u32) -> u32 {
        self.hp = self.hp.saturating_sub(damage);
        self.hp
    }
}

/// Army morale, always in `1..=3`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Morale(u8);

impl Morale {
    /// Lowest morale.
    pub const MIN: Self = Self(1);
    /// Highest morale.
    pub const MAX: Self = Self(3);

    /// Create a morale value, clamped to `1..=3`.
    #[must_use]
    pub fn new(value: u8) -> Self {
        Self(value.clamp(Self::MIN.0, Self::MAX.0))
    }

    /// Raw value.
    #[must_use]
    pub const fn value(self) -> u8 {
        self.0
    }

    /// Bonus added to attack and defense (`morale - 1`).
    #[must_use]
    pub const fn bonus(self) -> i32 {
        self.0 as i32 - 1
    }

    /// Raise morale by one, capped at the maximum.
    ///
    /// Returns `true` if morale actually increased.
    pub fn increment(&mut self) -> bool {
        if self.0 < Self::MAX.0 {
            self.0 += 1;
            true
        } else {
            false
        }
    }
}

impl Default for Morale {
    fn default() -> Self {
        Self::MIN
    }
}

impl TryFrom<u8> for Morale {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        if (Self::MIN.0..=Self::MAX.0).contains(&value) {
            Ok(Self(value))
        } else {
            Err(format!("morale must be between 1 and 3, got {value}"))
        }
    }
}

impl From<Morale> for u8 {
    fn from(morale: Morale) -> Self {
        morale.0
    }
}

/// A named, connected group of troops sharing morale and facing.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Army {
    /// Unique identifier.
    pub id: ArmyId,
    /// Owning side.
    pub side: Side,
    /// Display name.
    pub name: String,
    /// Shared morale.
    pub morale: Morale,
    /// Direction the army attacks in.
    pub facing: Direction,
    /// Tiles of the member troops, in formation order.
    pub members: Vec<Coord>,
    /// Presentation colour tag.
    pub color_tag: String,
}

impl Army {
    /// Create an army with baseline morale.
    #[must_use]
    pub fn new(
        id: ArmyId,
        side: Side,
        name: impl Into<String>,
        facing: Direction,
        members: Vec<Coord>,
    ) -> Self {
        Self {
            id,
            side,
            name: name.into(),
            morale: Morale::default(),
            facing,
            members,
            color_tag: String::new(),
        }
    }

    /// Builder method to set morale.
    #[must_use]
    pub const fn with_morale(mut self, morale: Morale) -> Self {
        self.morale = morale;
        self
    }

    /// Builder method to set the colour tag.
    #[must_use]
    pub fn with_color_tag(mut self, color_tag: impl Into<String>) -> Self {
        self.color_tag = color_tag.into();
        self
    }

    /// Whether `coord` is one of this army's tiles.
    #[must_use]
    pub fn contains(&self, coord: Coord) -> bool {
        self.members.contains(&coord)
    }

    /// Mean member position, rounded half up to the nearest tile.
    ///
    /// Returns `None` for an army without members.
    #[must_use]
    pub fn centroid(&self) -> Option<Coord> {
        centroid(&self.members)
    }
}

/// Mean position of `tiles`, each axis rounded half up.
#[must_use]
pub fn centroid(tiles: &[Coord]) -> Option<Coord> {
    if tiles.is_empty() {
        return None;
    }
    let count = I32F32::from_num(tiles.len());
    let half = I32F32::ONE / I32F32::from_num(2);
    let round = |sum: i32| (I32F32::from_num(sum) / count + half).floor().to_num::<i32>();

    let sum_x: i32 = tiles.iter().map(|c| c.x).sum();
    let sum_y: i32 = tiles.iter().map(|c| c.y).sum();
    Some(Coord::new(round(sum_x), round(sum_y)))
}

/// Coordinate-keyed view over a troop slice.
///
/// Replaces repeated linear scans when resolving which troop stands on a
/// tile. When two troops claim one tile the first one wins; snapshots are
/// validated for that elsewhere.
#[derive(Debug, Clone)]
pub struct TroopIndex<'a> {
    by_coord: HashMap<Coord, &'a Troop>,
}

impl<'a> TroopIndex<'a> {
    /// Index a set of troops by position.
    #[must_use]
    pub fn new(troops: impl IntoIterator<Item = &'a Troop>) -> Self {
        let mut by_coord = HashMap::new();
        for troop in troops {
            by_coord.entry(troop.position).or_insert(troop);
        }
        Self { by_coord }
    }

    /// Troop standing on `coord`.
    #[must_use]
    pub fn at(&self, coord: Coord) -> Option<&'a Troop> {
        self.by_coord.get(&coord).copied()
    }

    /// Whether any troop stands on `coord`.
    #[must_use]
    pub fn is_occupied(&self, coord: Coord) -> bool {
        self.by_coord.contains_key(&coord)
    }

    /// Troops standing on an army's tiles, in member order.
    #[must_use]
    pub fn members_of(&self, army: &Army) -> Vec<&'a Troop> {
        army.members.iter().filter_map(|&c| self.at(c)).collect()
    }

    /// Living troops standing on an army's tiles, in member order.
    #[must_use]
    pub fn live_members_of(&self, army: &Army) -> Vec<&'a Troop> {
        army.members
            .iter()
            .filter_map(|&c| self.at(c))
            .filter(|t| t.is_alive())
            .collect()
    }

    /// Number of indexed tiles.
    #[must_use]
    pub fn len(&self) -> usize {
        self.by_coord.len()
    }

    /// Whether the index is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_coord.is_empty()
    }
}

/// Army owning the tile `coord`, if any.
#[must_use]
pub fn army_at(armies: &[Army], coord: Coord) -> Option<&Army> {
    armies.iter().find(|a| a.contains(coord))
}

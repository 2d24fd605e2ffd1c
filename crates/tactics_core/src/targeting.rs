//! Threat ranges and target selection.
//!
//! Troops only attack along a straight ray in their army's facing
//! direction. An army threatens the union of its members' rays and picks
//! one enemy for the whole army: the nearest to its centroid, with soldier
//! type priority breaking ties.

use std::cmp::Reverse;
use std::collections::BTreeSet;

use crate::entity::{Army, Troop, TroopIndex};
use crate::grid::{BattleMap, Coord, Direction, TerrainType};
use crate::terrain::{effective_stat, Stat};
use crate::visibility::VisibleTiles;

/// Effective attack range of a troop on its current tile (at least 1).
#[must_use]
pub fn troop_range(troop: &Troop, map: &BattleMap) -> i32 {
    let terrain = map
        .get(troop.position)
        .map_or(TerrainType::Grass, |t| t.terrain);
    effective_stat(troop.soldier_type, terrain, Stat::Range)
}

/// Tiles a single troop threatens when facing `facing`.
///
/// A straight ray starting next to the troop, up to its range, clipped at
/// the map edge.
#[must_use]
pub fn threat_tiles(troop: &Troop, facing: Direction, map: &BattleMap) -> Vec<Coord> {
    (1..=troop_range(troop, map))
        .map(|distance| troop.position.step(facing, distance))
        .take_while(|c| c.in_bounds())
        .collect()
}

/// Union of the threat rays of `members`.
#[must_use]
pub fn threat_range<'a>(
    members: impl IntoIterator<Item = &'a Troop>,
    facing: Direction,
    map: &BattleMap,
) -> BTreeSet<Coord> {
    members
        .into_iter()
        .flat_map(|t| threat_tiles(t, facing, map))
        .collect()
}

/// Combined threat range of an army's living members.
#[must_use]
pub fn army_threat_range(army: &Army, troops: &[Troop], map: &BattleMap) -> BTreeSet<Coord> {
    let index = TroopIndex::new(troops);
    threat_range(index.live_members_of(army), army.facing, map)
}

/// Pick the enemy an army attacks this turn.
///
/// Valid targets are living enemies inside both the army's combined threat
/// range and `visible`. The nearest (Manhattan distance from the army's
/// rounded centroid) wins; ties go to the higher soldier type priority, then
/// to the earlier entry in `enemies`.
#[must_use]
pub fn select_target<'a>(
    army: &Army,
    attacker_troops: &[Troop],
    enemies: impl IntoIterator<Item = &'a Troop>,
    visible: &VisibleTiles,
    map: &BattleMap,
) -> Option<&'a Troop> {
    let centroid = army.centroid()?;
    let threatened = army_threat_range(army, attacker_troops, map);

    enemies
        .into_iter()
        .filter(|t| t.is_alive())
        .filter(|t| threatened.contains(&t.position))
        .filter(|t| visible.contains(&t.position))
        .min_by_key(|t| {
            (
                centroid.manhattan(t.position),
                Reverse(t.soldier_type.target_priority()),
            )
        })
}

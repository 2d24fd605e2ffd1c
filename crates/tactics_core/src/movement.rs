//! Army movement planning.
//!
//! Armies move as rigid bodies: every member tile is shifted by the same
//! offset, so the formation keeps its shape. Movement is limited to the
//! four cardinal directions, up to the army's speed, and is stopped by the
//! map edge, other troops, other armies, water for cavalry, and steep
//! height changes.
//!
//! Fractional averages use fixed-point math so results are identical on
//! every platform.

use std::collections::BTreeSet;

use fixed::types::I32F32;

use crate::entity::{centroid, Army, Troop, TroopIndex};
use crate::grid::{BattleMap, Coord, Direction, TerrainType};
use crate::soldier::SoldierType;
use crate::terrain::{Stat, TerrainEffect};

/// Maximum height difference between a destination tile and the army's
/// average height.
const MAX_HEIGHT_STEP: i32 = 1;

/// Effective speed of one troop on its current tile (at least 1).
#[must_use]
pub fn troop_speed(troop: &Troop, map: &BattleMap) -> i32 {
    let base = troop.soldier_type.stats().speed;
    let terrain = map
        .get(troop.position)
        .map_or(TerrainType::Grass, |t| t.terrain);
    TerrainEffect::of(troop.soldier_type, terrain).modify(base, Stat::Speed)
}

/// Speed of an army: the slowest member's effective speed, at least 1.
///
/// Members that do not resolve to a troop are ignored; an army with no
/// resolvable members has speed 1.
#[must_use]
pub fn army_speed(army: &Army, troops: &[Troop], map: &BattleMap) -> i32 {
    let index = TroopIndex::new(troops);
    index
        .members_of(army)
        .into_iter()
        .map(|t| troop_speed(t, map))
        .min()
        .unwrap_or(1)
        .max(1)
}

/// Average height of the army's current tiles.
fn average_height(army: &Army, map: &BattleMap) -> I32F32 {
    let heights: Vec<i32> = army
        .members
        .iter()
        .filter_map(|&c| map.get(c))
        .map(|t| i32::from(t.height))
        .collect();
    if heights.is_empty() {
        return I32F32::ONE;
    }
    I32F32::from_num(heights.iter().sum::<i32>()) / I32F32::from_num(heights.len())
}

/// Whether any member of the army is cavalry.
fn has_cavalry(army: &Army, index: &TroopIndex<'_>) -> bool {
    index
        .members_of(army)
        .iter()
        .any(|t| t.soldier_type == SoldierType::Cavalry)
}

/// Terrain check shared by [`movement_allowed`] and [`movable_tiles`].
fn terrain_allows(
    candidate: &[Coord],
    has_cavalry: bool,
    average: I32F32,
    map: &BattleMap,
) -> bool {
    let Some(tiles) = candidate
        .iter()
        .map(|&c| map.get(c))
        .collect::<Option<Vec<_>>>()
    else {
        return false;
    };

    if has_cavalry && tiles.iter().any(|t| t.terrain == TerrainType::Water) {
        return false;
    }

    let limit = I32F32::from_num(MAX_HEIGHT_STEP);
    tiles
        .iter()
        .filter(|t| t.terrain != TerrainType::Water)
        .all(|t| (I32F32::from_num(t.height) - average).abs() <= limit)
}

/// Whether the army may stand on `candidate`, judged by terrain alone.
///
/// Cavalry cannot enter water. Every non-water destination tile must be
/// within one height level of the army's current average height. Tiles
/// off the map are never allowed.
#[must_use]
pub fn movement_allowed(
    army: &Army,
    candidate: &[Coord],
    troops: &[Troop],
    map: &BattleMap,
) -> bool {
    let index = TroopIndex::new(troops);
    terrain_allows(
        candidate,
        has_cavalry(army, &index),
        average_height(army, map),
        map,
    )
}

/// Whether `footprint` collides with a troop or army other than `army`.
fn footprint_blocked(
    army: &Army,
    footprint: &[Coord],
    index: &TroopIndex<'_>,
    armies: &[Army],
) -> bool {
    footprint.iter().any(|&c| {
        let foreign_troop = index.is_occupied(c) && !army.contains(c);
        let foreign_army = armies.iter().any(|a| a.id != army.id && a.contains(c));
        foreign_troop || foreign_army
    })
}

/// Whether the army can occupy `footprint` as its next position.
///
/// Combines the bounds, collision and terrain checks used by
/// [`movable_tiles`].
#[must_use]
pub fn footprint_allowed(
    army: &Army,
    footprint: &[Coord],
    troops: &[Troop],
    armies: &[Army],
    map: &BattleMap,
) -> bool {
    let index = TroopIndex::new(troops);
    footprint.iter().all(|c| c.in_bounds())
        && !footprint_blocked(army, footprint, &index, armies)
        && movement_allowed(army, footprint, troops, map)
}

/// Member tiles shifted `distance` steps in `direction`.
fn shifted(army: &Army, direction: Direction, distance: i32) -> Vec<Coord> {
    army.members
        .iter()
        .map(|c| c.step(direction, distance))
        .collect()
}

/// All tiles the army could cover after one straight move.
///
/// Each cardinal direction is explored independently from distance 1 up
/// to `speed`. A direction stops at the first distance whose footprint
/// leaves the map, hits a foreign troop or army, or fails
/// [`movement_allowed`]; shorter distances already accepted stay valid.
/// Tiles of the army's current footprint are not reported.
#[must_use]
pub fn movable_tiles(
    army: &Army,
    speed: i32,
    troops: &[Troop],
    armies: &[Army],
    map: &BattleMap,
) -> BTreeSet<Coord> {
    let index = TroopIndex::new(troops);
    let cavalry = has_cavalry(army, &index);
    let average = average_height(army, map);
    let mut reachable = BTreeSet::new();

    for direction in Direction::ALL {
        for distance in 1..=speed {
            let footprint = shifted(army, direction, distance);

            if !footprint.iter().all(|c| c.in_bounds()) {
                break;
            }
            if footprint_blocked(army, &footprint, &index, armies) {
                break;
            }
            if !terrain_allows(&footprint, cavalry, average, map) {
                break;
            }

            reachable.extend(footprint.into_iter().filter(|c| !army.contains(*c)));
        }
    }

    tracing::trace!(
        army = %army.id,
        speed,
        tiles = reachable.len(),
        "Computed movable tiles"
    );
    reachable
}

/// Offset that moves the army's rounded centroid onto `target`.
#[must_use]
pub fn translation_offset(army: &Army, target: Coord) -> Option<(i32, i32)> {
    centroid(&army.members).map(|c| (target.x - c.x, target.y - c.y))
}

/// Move the army so that its rounded centroid lands on `target`.
///
/// Every member is shifted by the same offset. Because the centroid is
/// rounded, translating back does not always restore the original tiles
/// for armies whose true centroid is fractional.
#[must_use]
pub fn translate(army: &Army, target: Coord) -> Army {
    let mut moved = army.clone();
    if let Some((dx, dy)) = translation_offset(army, target) {
        for member in &mut moved.members {
            *member = member.offset(dx, dy);
        }
    }
    moved
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{ArmyId, Side, TroopId};
    use crate::grid::Tile;

    fn troop(id: u32, x: i32, y: i32, soldier_type: SoldierType) -> Troop {
        Troop::new(TroopId::new(id), Side::Player, Coord::new(x, y), soldier_type)
    }

    fn pair_army(id: u32, a: (i32, i32), b: (i32, i32)) -> Army {
        Army::new(
            ArmyId::new(id),
            Side::Player,
            "Pair",
            Direction::Up,
            vec![Coord::new(a.0, a.1), Coord::new(b.0, b.1)],
        )
    }

    #[test]
    fn test_army_speed_is_slowest_member() {
        let map = BattleMap::new();
        let troops = vec![
            troop(1, 5, 5, SoldierType::Cavalry),
            troop(2, 6, 5, SoldierType::Shield),
        ];
        let army = pair_army(1, (5, 5), (6, 5));
        assert_eq!(army_speed(&army, &troops, &map), 2);
    }

    #[test]
    fn test_army_speed_water_drops_to_one() {
        let mut map = BattleMap::new();
        map.set_tile(Coord::new(5, 5), Tile::new(TerrainType::Water));
        let troops = vec![
            troop(1, 5, 5, SoldierType::Cavalry),
            troop(2, 6, 5, SoldierType::Cavalry),
        ];
        let army = pair_army(1, (5, 5), (6, 5));
        assert_eq!(army_speed(&army, &troops, &map), 1);
    }

    #[test]
    fn test_army_speed_without_members_is_one() {
        let map = BattleMap::new();
        let army = pair_army(1, (5, 5), (6, 5));
        assert_eq!(army_speed(&army, &[], &map), 1);
    }

    #[test]
    fn test_cavalry_cannot_enter_water() {
        let mut map = BattleMap::new();
        map.set_tile(Coord::new(5, 4), Tile::new(TerrainType::Water));
        let troops = vec![
            troop(1, 5, 5, SoldierType::Cavalry),
            troop(2, 6, 5, SoldierType::Infantry),
        ];
        let army = pair_army(1, (5, 5), (6, 5));
        let candidate = [Coord::new(5, 4), Coord::new(6, 4)];
        assert!(!movement_allowed(&army, &candidate, &troops, &map));

        let foot = vec![
            troop(1, 5, 5, SoldierType::Infantry),
            troop(2, 6, 5, SoldierType::Infantry),
        ];
        assert!(movement_allowed(&army, &candidate, &foot, &map));
    }

    #[test]
    fn test_water_skips_height_check() {
        let mut map = BattleMap::new();
        map.set_tile(Coord::new(5, 5), Tile::new(TerrainType::Mountain3));
        map.set_tile(Coord::new(6, 5), Tile::new(TerrainType::Mountain3));
        map.set_tile(Coord::new(5, 4), Tile::new(TerrainType::Water));
        map.set_tile(Coord::new(6, 4), Tile::new(TerrainType::Water));
        let troops = vec![
            troop(1, 5, 5, SoldierType::Infantry),
            troop(2, 6, 5, SoldierType::Infantry),
        ];
        let army = pair_army(1, (5, 5), (6, 5));

        // average height 3, water sits at 1
        let wading = [Coord::new(5, 4), Coord::new(6, 4)];
        assert!(movement_allowed(&army, &wading, &troops, &map));

        // grass at the same height is two levels down
        let grass = [Coord::new(5, 6), Coord::new(6, 6)];
        assert!(!movement_allowed(&army, &grass, &troops, &map));
    }

    #[test]
    fn test_height_step_limit() {
        let mut map = BattleMap::new();
        map.set_tile(Coord::new(5, 4), Tile::new(TerrainType::Mountain2));
        map.set_tile(Coord::new(5, 3), Tile::new(TerrainType::Mountain3));
        let troops = vec![
            troop(1, 5, 5, SoldierType::Infantry),
            troop(2, 6, 5, SoldierType::Infantry),
        ];
        let army = pair_army(1, (5, 5), (6, 5));

        // height 2 vs average 1: allowed
        assert!(movement_allowed(
            &army,
            &[Coord::new(5, 4), Coord::new(6, 4)],
            &troops,
            &map
        ));
        // height 3 vs average 1: too steep
        assert!(!movement_allowed(
            &army,
            &[Coord::new(5, 3), Coord::new(6, 3)],
            &troops,
            &map
        ));
    }

    #[test]
    fn test_movable_tiles_open_field() {
        let map = BattleMap::new();
        let troops = vec![
            troop(1, 10, 10, SoldierType::Infantry),
            troop(2, 11, 10, SoldierType::Infantry),
        ];
        let army = pair_army(1, (10, 10), (11, 10));
        let tiles = movable_tiles(&army, 1, &troops, &[army.clone()], &map);

        let expected: BTreeSet<Coord> = [
            Coord::new(10, 9),
            Coord::new(11, 9),
            Coord::new(10, 11),
            Coord::new(11, 11),
            Coord::new(9, 10),
            Coord::new(12, 10),
        ]
        .into_iter()
        .collect();
        assert_eq!(tiles, expected);
    }

    #[test]
    fn test_blocked_step_keeps_shorter_steps() {
        let map = BattleMap::new();
        let troops = vec![
            troop(1, 10, 10, SoldierType::Infantry),
            troop(2, 10, 11, SoldierType::Infantry),
            // blocker two tiles above the army
            troop(3, 10, 7, SoldierType::Shield),
        ];
        let army = pair_army(1, (10, 10), (10, 11));
        let tiles = movable_tiles(&army, 3, &troops, &[army.clone()], &map);

        assert!(tiles.contains(&Coord::new(10, 9)));
        assert!(tiles.contains(&Coord::new(10, 8)));
        // distance 3 upward would put (10,7) under the army
        assert!(!tiles.contains(&Coord::new(10, 7)));
        // other directions unaffected
        assert!(tiles.contains(&Coord::new(10, 14)));
    }

    #[test]
    fn test_blocked_at_distance_two() {
        let map = BattleMap::new();
        let troops = vec![
            troop(1, 10, 10, SoldierType::Infantry),
            troop(2, 11, 10, SoldierType::Infantry),
            troop(3, 14, 10, SoldierType::Archer),
        ];
        let army = pair_army(1, (10, 10), (11, 10));
        let tiles = movable_tiles(&army, 3, &troops, &[army.clone()], &map);

        // distance 1 and 2 to the right are fine, distance 3 hits (14,10)
        assert!(tiles.contains(&Coord::new(12, 10)));
        assert!(tiles.contains(&Coord::new(13, 10)));
        assert!(!tiles.contains(&Coord::new(14, 10)));
    }

    #[test]
    fn test_other_army_tiles_block() {
        let map = BattleMap::new();
        let troops = vec![
            troop(1, 10, 10, SoldierType::Infantry),
            troop(2, 11, 10, SoldierType::Infantry),
        ];
        let army = pair_army(1, (10, 10), (11, 10));
        // another army claims tiles with no troop standing on them
        let other = pair_army(2, (10, 9), (11, 9));
        let tiles = movable_tiles(&army, 2, &troops, &[army.clone(), other], &map);
        assert!(!tiles.contains(&Coord::new(10, 9)));
        assert!(!tiles.contains(&Coord::new(10, 8)));
    }

    #[test]
    fn test_map_edge_stops_direction() {
        let map = BattleMap::new();
        let troops = vec![
            troop(1, 0, 0, SoldierType::Infantry),
            troop(2, 1, 0, SoldierType::Infantry),
        ];
        let army = pair_army(1, (0, 0), (1, 0));
        let tiles = movable_tiles(&army, 2, &troops, &[army.clone()], &map);
        assert!(tiles.iter().all(|c| c.in_bounds()));
        assert!(!tiles.iter().any(|c| c.y < 0 || c.x < 0));
        assert!(tiles.contains(&Coord::new(0, 2)));
    }

    #[test]
    fn test_translate_moves_centroid() {
        let army = pair_army(1, (4, 4), (5, 4));
        // centroid (4.5, 4) rounds to (5, 4)
        let moved = translate(&army, Coord::new(5, 2));
        assert_eq!(moved.members, vec![Coord::new(4, 2), Coord::new(5, 2)]);
    }

    #[test]
    fn test_translate_round_trip_not_guaranteed() {
        let army = pair_army(1, (4, 4), (5, 4));
        let moved = translate(&army, Coord::new(5, 4));
        // centroid already at (5, 4): nothing moves
        assert_eq!(moved.members, army.members);

        let there = translate(&army, Coord::new(10, 10));
        let back = translate(&there, Coord::new(4, 4));
        // (4,4) is not the rounded centroid of the original, so the
        // footprint ends one column to the left
        assert_eq!(back.members, vec![Coord::new(3, 4), Coord::new(4, 4)]);
    }
}

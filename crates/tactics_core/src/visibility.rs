//! Line-of-sight free visibility.
//!
//! A troop sees every tile within a Manhattan radius set by the terrain it
//! stands on. Water and forest also hide units from observers standing in
//! the same kind of terrain beyond a short distance.

use std::collections::BTreeSet;

use crate::entity::Troop;
use crate::error::Result;
use crate::grid::{BattleMap, Coord, TerrainType};

/// Set of tiles visible to a troop or a whole side.
pub type VisibleTiles = BTreeSet<Coord>;

/// Vision radius of a troop standing on `terrain`.
#[must_use]
pub const fn vision_range(terrain: TerrainType) -> u32 {
    match terrain {
        TerrainType::Grass => 5,
        TerrainType::Water => 2,
        TerrainType::Forest => 1,
        TerrainType::Mountain1 => 5,
        TerrainType::Mountain2 => 7,
        TerrainType::Mountain3 => 10,
    }
}

/// Maximum distance at which two units on the same terrain can see each
/// other, for terrains that impose one.
#[must_use]
pub const fn same_terrain_limit(terrain: TerrainType) -> Option<u32> {
    match terrain {
        TerrainType::Water => Some(2),
        TerrainType::Forest => Some(1),
        _ => None,
    }
}

/// Every in-bounds tile within the troop's vision radius.
///
/// # Errors
///
/// Returns `GameError::OutOfBounds` if the troop stands off the map.
pub fn visible_tiles(troop: &Troop, map: &BattleMap) -> Result<VisibleTiles> {
    let origin = troop.position;
    let range = vision_range(map.terrain(origin)?) as i32;

    let mut tiles = VisibleTiles::new();
    for dy in -range..=range {
        let span = range - dy.abs();
        for dx in -span..=span {
            let coord = origin.offset(dx, dy);
            if coord.in_bounds() {
                tiles.insert(coord);
            }
        }
    }
    Ok(tiles)
}

/// Whether an observer sees a target.
///
/// The target tile must be in the observer's visible set. When both stand
/// on the same terrain and that terrain has a same-terrain limit, they must
/// also be within that limit of each other.
#[must_use]
pub fn is_visible(
    observer_pos: Coord,
    observer_terrain: TerrainType,
    target_pos: Coord,
    target_terrain: TerrainType,
    observer_visible: &VisibleTiles,
) -> bool {
    if !observer_visible.contains(&target_pos) {
        return false;
    }
    if observer_terrain == target_terrain {
        if let Some(limit) = same_terrain_limit(observer_terrain) {
            return observer_pos.manhattan(target_pos) <= limit;
        }
    }
    true
}

/// Union of the visible tiles of every living troop in `troops`.
///
/// # Errors
///
/// Returns `GameError::OutOfBounds` if a troop stands off the map.
pub fn combined_visible_tiles<'a>(
    troops: impl IntoIterator<Item = &'a Troop>,
    map: &BattleMap,
) -> Result<VisibleTiles> {
    let mut tiles = VisibleTiles::new();
    for troop in troops.into_iter().filter(|t| t.is_alive()) {
        tiles.extend(visible_tiles(troop, map)?);
    }
    Ok(tiles)
}

/// Targets seen by at least one living observer, in target order.
///
/// # Errors
///
/// Returns `GameError::OutOfBounds` if any troop stands off the map.
pub fn visible_targets<'a>(
    observers: &[Troop],
    targets: &'a [Troop],
    map: &BattleMap,
) -> Result<Vec<&'a Troop>> {
    let mut sight = Vec::new();
    for observer in observers.iter().filter(|t| t.is_alive()) {
        let terrain = map.terrain(observer.position)?;
        sight.push((observer.position, terrain, visible_tiles(observer, map)?));
    }

    let mut seen = Vec::new();
    for target in targets {
        let target_terrain = map.terrain(target.position)?;
        let spotted = sight.iter().any(|(pos, terrain, tiles)| {
            is_visible(*pos, *terrain, target.position, target_terrain, tiles)
        });
        if spotted {
            seen.push(target);
        }
    }
    Ok(seen)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{Side, TroopId};
    use crate::grid::Tile;
    use crate::soldier::SoldierType;

    fn troop(id: u32, side: Side, x: i32, y: i32) -> Troop {
        Troop::new(TroopId::new(id), side, Coord::new(x, y), SoldierType::Archer)
    }

    #[test]
    fn test_vision_ranges() {
        assert_eq!(vision_range(TerrainType::Grass), 5);
        assert_eq!(vision_range(TerrainType::Water), 2);
        assert_eq!(vision_range(TerrainType::Forest), 1);
        assert_eq!(vision_range(TerrainType::Mountain1), 5);
        assert_eq!(vision_range(TerrainType::Mountain2), 7);
        assert_eq!(vision_range(TerrainType::Mountain3), 10);
    }

    #[test]
    fn test_visible_diamond_on_grass() {
        let map = BattleMap::new();
        let tiles = visible_tiles(&troop(1, Side::Player, 15, 15), &map).unwrap();
        // diamond of radius 5 has 2*5*5 + 2*5 + 1 tiles
        assert_eq!(tiles.len(), 61);
        assert!(tiles.contains(&Coord::new(20, 15)));
        assert!(!tiles.contains(&Coord::new(18, 18)));
    }

    #[test]
    fn test_visible_clipped_at_corner() {
        let map = BattleMap::new();
        let tiles = visible_tiles(&troop(1, Side::Player, 0, 0), &map).unwrap();
        assert!(tiles.iter().all(|c| c.in_bounds()));
        // quarter diamond including axes: 21 tiles for radius 5
        assert_eq!(tiles.len(), 21);
    }

    #[test]
    fn test_forest_limits_vision() {
        let mut map = BattleMap::new();
        map.set_tile(Coord::new(10, 10), Tile::new(TerrainType::Forest));
        let tiles = visible_tiles(&troop(1, Side::Player, 10, 10), &map).unwrap();
        assert_eq!(tiles.len(), 5);
    }

    #[test]
    fn test_visible_tiles_idempotent() {
        let map = BattleMap::new();
        let t = troop(1, Side::Player, 7, 3);
        assert_eq!(
            visible_tiles(&t, &map).unwrap(),
            visible_tiles(&t, &map).unwrap()
        );
    }

    #[test]
    fn test_off_map_troop_is_an_error() {
        let map = BattleMap::new();
        assert!(visible_tiles(&troop(1, Side::Player, 31, 0), &map).is_err());
    }

    #[test]
    fn test_same_terrain_limit() {
        let mut map = BattleMap::new();
        for x in 0..10 {
            map.set_tile(Coord::new(x, 0), Tile::new(TerrainType::Water));
        }
        let observer = troop(1, Side::Player, 0, 0);
        let seen = visible_tiles(&observer, &map).unwrap();

        assert!(is_visible(
            Coord::new(0, 0),
            TerrainType::Water,
            Coord::new(2, 0),
            TerrainType::Water,
            &seen
        ));
        // not in the visible set at all
        assert!(!is_visible(
            Coord::new(0, 0),
            TerrainType::Water,
            Coord::new(3, 0),
            TerrainType::Water,
            &seen
        ));
    }

    #[test]
    fn test_same_terrain_limit_applies_inside_visible_set() {
        // A mountain observer's set reaches far, but a forest limit only
        // applies when both stand in forest.
        let mut seen = VisibleTiles::new();
        seen.insert(Coord::new(3, 0));
        assert!(!is_visible(
            Coord::new(0, 0),
            TerrainType::Forest,
            Coord::new(3, 0),
            TerrainType::Forest,
            &seen
        ));
        assert!(is_visible(
            Coord::new(0, 0),
            TerrainType::Grass,
            Coord::new(3, 0),
            TerrainType::Forest,
            &seen
        ));
    }

    #[test]
    fn test_combined_visibility_skips_dead() {
        let map = BattleMap::new();
        let troops = vec![
            troop(1, Side::Player, 0, 0),
            troop(2, Side::Player, 29, 29).with_hp(0),
        ];
        let tiles = combined_visible_tiles(&troops, &map).unwrap();
        assert!(tiles.contains(&Coord::new(0, 5)));
        assert!(!tiles.contains(&Coord::new(29, 29)));
    }

    #[test]
    fn test_visible_targets() {
        let mut map = BattleMap::new();
        map.set_tile(Coord::new(12, 10), Tile::new(TerrainType::Forest));
        map.set_tile(Coord::new(10, 10), Tile::new(TerrainType::Forest));
        let observers = vec![troop(1, Side::Player, 10, 10)];
        let targets = vec![
            troop(2, Side::Enemy, 11, 10),
            troop(3, Side::Enemy, 12, 10),
        ];
        let seen = visible_targets(&observers, &targets, &map).unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].id, TroopId::new(2));
    }
}

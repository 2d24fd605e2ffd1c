//! Test fixtures and helpers.
//!
//! Pre-built maps, troops, armies and battle states for consistent
//! testing.

use tactics_core::prelude::*;

/// Create a troop at full health.
#[must_use]
pub fn troop(id: u32, side: Side, x: i32, y: i32, soldier_type: SoldierType) -> Troop {
    Troop::new(TroopId::new(id), side, Coord::new(x, y), soldier_type)
}

/// Create an army over `tiles` with baseline morale.
#[must_use]
pub fn army(id: u32, side: Side, facing: Direction, tiles: &[(i32, i32)]) -> Army {
    Army::new(
        ArmyId::new(id),
        side,
        format!("Army {id}"),
        facing,
        tiles.iter().map(|&(x, y)| Coord::new(x, y)).collect(),
    )
}

/// Open grass map with the listed tiles overridden.
#[must_use]
pub fn map_with(overrides: &[((i32, i32), TerrainType)]) -> BattleMap {
    let mut map = BattleMap::new();
    for &((x, y), terrain) in overrides {
        map.set_tile(Coord::new(x, y), Tile::new(terrain));
    }
    map
}

/// Horizontal run of `len` tiles starting at `(x, y)`.
#[must_use]
pub fn row(x: i32, y: i32, len: i32) -> Vec<(i32, i32)> {
    (x..x + len).map(|x| (x, y)).collect()
}

/// Place `soldier_type` troops on `tiles` and form them into one army.
///
/// # Panics
///
/// Panics if placement or formation fails.
pub fn deploy(
    state: &mut BattleState,
    side: Side,
    soldier_type: SoldierType,
    tiles: &[(i32, i32)],
    facing: Direction,
) -> ArmyId {
    let coords: Vec<Coord> = tiles.iter().map(|&(x, y)| Coord::new(x, y)).collect();
    for &coord in &coords {
        state
            .place_troop(side, coord, soldier_type)
            .expect("fixture placement failed");
    }
    state
        .form_army(&coords, format!("{side:?} {soldier_type:?}"), facing)
        .expect("fixture formation failed")
        .army_id()
        .expect("fixture formation rejected")
}

/// Two infantry lines facing each other across a one-tile gap.
///
/// Player line at y=15 facing up, enemy line at y=13 facing down, both
/// spanning x=10..14. Neither side can reach the other without moving.
#[must_use]
pub fn line_standoff() -> BattleState {
    let mut state = BattleState::new(BattleMap::new());
    deploy(
        &mut state,
        Side::Player,
        SoldierType::Infantry,
        &row(10, 15, 5),
        Direction::Up,
    );
    deploy(
        &mut state,
        Side::Enemy,
        SoldierType::Infantry,
        &row(10, 13, 5),
        Direction::Down,
    );
    state
}

/// Archers against a shield wall, already in range of each other.
///
/// Player archers at y=20 facing up, enemy shields at y=17 facing down,
/// both spanning x=5..8. The battle phase has started.
#[must_use]
pub fn archer_duel() -> BattleState {
    let mut state = BattleState::new(BattleMap::new());
    deploy(
        &mut state,
        Side::Player,
        SoldierType::Archer,
        &row(5, 20, 4),
        Direction::Up,
    );
    deploy(
        &mut state,
        Side::Enemy,
        SoldierType::Shield,
        &row(5, 17, 4),
        Direction::Down,
    );
    state
        .apply_phase_command(PhaseCommand::Start)
        .expect("fixture start failed");
    state
}

/// Mixed armies in contact on varied terrain, battle phase started.
///
/// Player: generals on a hill and cavalry on grass. Enemy: infantry in a
/// forest strip and archers behind them. Every army has something in reach.
#[must_use]
pub fn mixed_front() -> BattleState {
    let mut overrides = Vec::new();
    for x in 0..30 {
        overrides.push(((x, 12), TerrainType::Forest));
    }
    overrides.push(((3, 13), TerrainType::Mountain2));
    overrides.push(((4, 13), TerrainType::Mountain2));

    let mut state = BattleState::new(map_with(&overrides));
    deploy(
        &mut state,
        Side::Player,
        SoldierType::General,
        &[(3, 13), (4, 13)],
        Direction::Up,
    );
    deploy(
        &mut state,
        Side::Player,
        SoldierType::Cavalry,
        &row(8, 13, 3),
        Direction::Up,
    );
    deploy(
        &mut state,
        Side::Enemy,
        SoldierType::Infantry,
        &row(2, 12, 10),
        Direction::Down,
    );
    deploy(
        &mut state,
        Side::Enemy,
        SoldierType::Archer,
        &row(3, 10, 6),
        Direction::Down,
    );
    state
        .apply_phase_command(PhaseCommand::Start)
        .expect("fixture start failed");
    state
}

/// Resolve and apply the active side's attack phase, then end the turn.
///
/// Returns the number of attacks applied. Does nothing once the battle
/// has left the battle phase.
///
/// # Panics
///
/// Panics if the engine reports an invariant violation.
pub fn play_turn(state: &mut BattleState) -> usize {
    if state.phase() != BattlePhase::Battle {
        return 0;
    }
    let resolution = state.run_attack_phase().expect("attack phase failed");
    state.apply_log(&resolution.log).expect("apply log failed");
    if state.phase() == BattlePhase::Battle {
        state.end_turn().expect("end turn failed");
    }
    resolution.log.len()
}

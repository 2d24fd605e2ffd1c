//! ASCII battle renderer for quick terminal review.
//!
//! Terrain uses the scenario legend (`.` grass, `~` water, `T` forest,
//! `1`-`3` mountains). Troops are drawn as letters: upper case for the
//! player, lower case for the enemy, `x` for the dead. Highlighted tiles
//! show as `*` when empty.

use std::collections::BTreeSet;

use tactics_core::prelude::*;

/// Letter drawn for a soldier type.
#[must_use]
pub const fn soldier_symbol(soldier_type: SoldierType) -> char {
    match soldier_type {
        SoldierType::General => 'G',
        SoldierType::Infantry => 'I',
        SoldierType::Archer => 'A',
        SoldierType::Shield => 'S',
        SoldierType::Cavalry => 'C',
    }
}

fn troop_symbol(troop: &Troop) -> char {
    if troop.is_dead() {
        return 'x';
    }
    let symbol = soldier_symbol(troop.soldier_type);
    match troop.side {
        Side::Player => symbol,
        Side::Enemy => symbol.to_ascii_lowercase(),
    }
}

/// Render the battle as 30 lines of 30 characters.
#[must_use]
pub fn render_battle(state: &BattleState, highlight: &BTreeSet<Coord>) -> String {
    let mut grid: Vec<Vec<char>> = state
        .map()
        .to_rows()
        .into_iter()
        .map(|row| row.chars().collect())
        .collect();

    for &coord in highlight {
        if let Some(cell) = cell_mut(&mut grid, coord) {
            *cell = '*';
        }
    }
    for troop in state.troops() {
        if let Some(cell) = cell_mut(&mut grid, troop.position) {
            *cell = troop_symbol(troop);
        }
    }

    let mut out = String::with_capacity(grid.len() * (grid.len() + 1));
    for row in grid {
        out.extend(row);
        out.push('\n');
    }
    out
}

fn cell_mut(grid: &mut [Vec<char>], coord: Coord) -> Option<&mut char> {
    let x = usize::try_from(coord.x).ok()?;
    let y = usize::try_from(coord.y).ok()?;
    grid.get_mut(y)?.get_mut(x)
}

/// One line per army: id, side, name, facing, morale and living members.
#[must_use]
pub fn army_legend(state: &BattleState) -> String {
    let mut out = String::new();
    for army in state.armies() {
        let alive = army
            .members
            .iter()
            .filter_map(|&c| state.troops().iter().find(|t| t.position == c))
            .filter(|t| t.is_alive())
            .count();
        out.push_str(&format!(
            "#{} {:?} {:<16} facing {:?}, morale {}, {}/{} alive\n",
            army.id,
            army.side,
            army.name,
            army.facing,
            army.morale.value(),
            alive,
            army.members.len()
        ));
    }
    out
}

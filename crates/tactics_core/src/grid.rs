//! Battle grid and terrain model.
//!
//! The battlefield is a fixed 30x30 board stored in row-major order
//! (`index = y * 30 + x`). Each cell carries a terrain type and a height
//! level. Coordinates are signed so that formation offsets can be computed
//! freely and bounds-checked afterwards.

use serde::{Deserialize, Serialize};

use crate::error::{GameError, Result};

/// Width and height of the battle map in tiles.
pub const MAP_SIZE: i32 = 30;

/// Number of tiles on the battle map.
pub const TILE_COUNT: usize = (MAP_SIZE * MAP_SIZE) as usize;

/// A tile coordinate on the battle map.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
pub struct Coord {
    /// Column, growing to the right.
    pub x: i32,
    /// Row, growing downwards.
    pub y: i32,
}

impl Coord {
    /// Create a coordinate.
    #[must_use]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Manhattan distance to another coordinate.
    #[must_use]
    pub const fn manhattan(self, other: Self) -> u32 {
        self.x.abs_diff(other.x) + self.y.abs_diff(other.y)
    }

    /// Coordinate shifted by `(dx, dy)`.
    #[must_use]
    pub const fn offset(self, dx: i32, dy: i32) -> Self {
        Self::new(self.x + dx, self.y + dy)
    }

    /// Coordinate `distance` tiles away in `direction`.
    #[must_use]
    pub const fn step(self, direction: Direction, distance: i32) -> Self {
        let (dx, dy) = direction.delta();
        self.offset(dx * distance, dy * distance)
    }

    /// The four orthogonally adjacent coordinates (may be out of bounds).
    #[must_use]
    pub const fn neighbors(self) -> [Self; 4] {
        [
            self.step(Direction::Up, 1),
            self.step(Direction::Down, 1),
            self.step(Direction::Left, 1),
            self.step(Direction::Right, 1),
        ]
    }

    /// Whether the coordinate lies on the battle map.
    #[must_use]
    pub const fn in_bounds(self) -> bool {
        self.x >= 0 && self.x < MAP_SIZE && self.y >= 0 && self.y < MAP_SIZE
    }
}

impl std::fmt::Display for Coord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Cardinal facing of an army.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Direction {
    /// Towards row 0.
    #[default]
    Up,
    /// Towards the last row.
    Down,
    /// Towards column 0.
    Left,
    /// Towards the last column.
    Right,
}

impl Direction {
    /// All directions in a fixed order.
    pub const ALL: [Self; 4] = [Self::Up, Self::Down, Self::Left, Self::Right];

    /// Unit step for this direction.
    #[must_use]
    pub const fn delta(self) -> (i32, i32) {
        match self {
            Self::Up => (0, -1),
            Self::Down => (0, 1),
            Self::Left => (-1, 0),
            Self::Right => (1, 0),
        }
    }

    /// Whether this direction runs along a column.
    #[must_use]
    pub const fn is_vertical(self) -> bool {
        matches!(self, Self::Up | Self::Down)
    }
}

/// Terrain classification of a tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TerrainType {
    /// Open ground.
    #[default]
    Grass,
    /// Shallow water - slows and weakens everyone.
    Water,
    /// Woodland - favours foot soldiers.
    Forest,
    /// Low hills.
    Mountain1,
    /// Hills.
    Mountain2,
    /// High peaks.
    Mountain3,
}

impl TerrainType {
    /// All terrain types.
    pub const ALL: [Self; 6] = [
        Self::Grass,
        Self::Water,
        Self::Forest,
        Self::Mountain1,
        Self::Mountain2,
        Self::Mountain3,
    ];

    /// Height level a tile of this terrain has unless overridden.
    #[must_use]
    pub const fn natural_height(self) -> u8 {
        match self {
            Self::Mountain2 => 2,
            Self::Mountain3 => 3,
            _ => 1,
        }
    }

    /// Single-character symbol used in map layouts.
    #[must_use]
    pub const fn symbol(self) -> char {
        match self {
            Self::Grass => '.',
            Self::Water => '~',
            Self::Forest => 'T',
            Self::Mountain1 => '1',
            Self::Mountain2 => '2',
            Self::Mountain3 => '3',
        }
    }

    /// Parse a map layout symbol.
    #[must_use]
    pub const fn from_symbol(symbol: char) -> Option<Self> {
        match symbol {
            '.' => Some(Self::Grass),
            '~' => Some(Self::Water),
            'T' => Some(Self::Forest),
            '1' => Some(Self::Mountain1),
            '2' => Some(Self::Mountain2),
            '3' => Some(Self::Mountain3),
            _ => None,
        }
    }
}

/// A single battle map cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Tile {
    /// Terrain of the cell.
    pub terrain: TerrainType,
    /// Height level (1-3).
    pub height: u8,
}

impl Tile {
    /// Tile of the given terrain at its natural height.
    #[must_use]
    pub const fn new(terrain: TerrainType) -> Self {
        Self {
            terrain,
            height: terrain.natural_height(),
        }
    }

    /// Tile with an explicit height, clamped to 1-3.
    #[must_use]
    pub fn with_height(terrain: TerrainType, height: u8) -> Self {
        Self {
            terrain,
            height: height.clamp(1, 3),
        }
    }
}

impl Default for Tile {
    fn default() -> Self {
        Self::new(TerrainType::Grass)
    }
}

/// The fixed 30x30 battle map.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BattleMap {
    /// Cell data stored in row-major order.
    tiles: Vec<Tile>,
}

impl BattleMap {
    /// A map covered in grass.
    #[must_use]
    pub fn new() -> Self {
        Self {
            tiles: vec![Tile::default(); TILE_COUNT],
        }
    }

    /// Build a map from a flat row-major tile list.
    ///
    /// # Errors
    ///
    /// Returns `GameError::InvalidState` unless exactly 900 tiles are given.
    pub fn from_tiles(tiles: Vec<Tile>) -> Result<Self> {
        if tiles.len() != TILE_COUNT {
            return Err(GameError::InvalidState(format!(
                "battle map needs {TILE_COUNT} tiles, got {}",
                tiles.len()
            )));
        }
        Ok(Self { tiles })
    }

    /// Build a map from 30 layout rows of 30 terrain symbols each.
    ///
    /// # Errors
    ///
    /// Returns `GameError::DataParseError` on a wrong row count, row width
    /// or unknown symbol.
    pub fn from_rows<S: AsRef<str>>(rows: &[S]) -> Result<Self> {
        let parse_error = |message: String| GameError::DataParseError {
            source_name: "map layout".into(),
            message,
        };

        if rows.len() != MAP_SIZE as usize {
            return Err(parse_error(format!(
                "expected {MAP_SIZE} rows, got {}",
                rows.len()
            )));
        }

        let mut tiles = Vec::with_capacity(TILE_COUNT);
        for (y, row) in rows.iter().enumerate() {
            let row = row.as_ref();
            if row.chars().count() != MAP_SIZE as usize {
                return Err(parse_error(format!(
                    "row {y} has {} columns, expected {MAP_SIZE}",
                    row.chars().count()
                )));
            }
            for (x, symbol) in row.chars().enumerate() {
                let terrain = TerrainType::from_symbol(symbol).ok_or_else(|| {
                    parse_error(format!("unknown terrain symbol '{symbol}' at ({x}, {y})"))
                })?;
                tiles.push(Tile::new(terrain));
            }
        }

        Ok(Self { tiles })
    }

    /// Render the map back into layout rows.
    #[must_use]
    pub fn to_rows(&self) -> Vec<String> {
        self.tiles
            .chunks(MAP_SIZE as usize)
            .map(|row| row.iter().map(|t| t.terrain.symbol()).collect())
            .collect()
    }

    #[inline]
    fn index(coord: Coord) -> Option<usize> {
        coord
            .in_bounds()
            .then(|| (coord.y * MAP_SIZE + coord.x) as usize)
    }

    /// Tile at a coordinate, `None` when out of bounds.
    #[must_use]
    pub fn get(&self, coord: Coord) -> Option<Tile> {
        Self::index(coord).map(|i| self.tiles[i])
    }

    /// Tile at a coordinate.
    ///
    /// # Errors
    ///
    /// Returns `GameError::OutOfBounds` for coordinates off the map.
    pub fn tile(&self, coord: Coord) -> Result<Tile> {
        self.get(coord).ok_or(GameError::OutOfBounds {
            x: coord.x,
            y: coord.y,
        })
    }

    /// Terrain at a coordinate.
    ///
    /// # Errors
    ///
    /// Returns `GameError::OutOfBounds` for coordinates off the map.
    pub fn terrain(&self, coord: Coord) -> Result<TerrainType> {
        self.tile(coord).map(|t| t.terrain)
    }

    /// Replace a tile. Returns `false` if out of bounds.
    pub fn set_tile(&mut self, coord: Coord, tile: Tile) -> bool {
        match Self::index(coord) {
            Some(i) => {
                self.tiles[i] = tile;
                true
            }
            None => false,
        }
    }

    /// Flat row-major view of every tile.
    #[must_use]
    pub fn tiles(&self) -> &[Tile] {
        &self.tiles
    }
}

impl Default for BattleMap {
    fn default() -> Self {
        Self::new()
    }
}

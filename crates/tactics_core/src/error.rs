//! Error types for the battle engine.
//!
//! Game-rule outcomes (illegal formation, blocked move, no target) are
//! never errors. Errors are reserved for callers handing the engine an
//! inconsistent snapshot, plus data parsing and snapshot encoding.

use thiserror::Error;

use crate::entity::{ArmyId, TroopId};
use crate::state::{BattlePhase, PhaseCommand};

/// Result type alias using [`GameError`].
pub type Result<T> = std::result::Result<T, GameError>;

/// Top-level error type for all battle engine errors.
#[derive(Debug, Error)]
pub enum GameError {
    /// Coordinate outside the battle map.
    #[error("Coordinate ({x}, {y}) is outside the map")]
    OutOfBounds {
        /// X coordinate.
        x: i32,
        /// Y coordinate.
        y: i32,
    },

    /// Referenced troop is not part of the snapshot.
    #[error("Troop not found: {0}")]
    TroopNotFound(TroopId),

    /// Referenced army is not part of the snapshot.
    #[error("Army not found: {0}")]
    ArmyNotFound(ArmyId),

    /// Two troops would share one tile.
    #[error("Tile ({x}, {y}) is already occupied")]
    TileOccupied {
        /// X coordinate.
        x: i32,
        /// Y coordinate.
        y: i32,
    },

    /// Phase command issued from a phase that does not accept it.
    #[error("Cannot apply {command:?} while in {from:?}")]
    InvalidPhaseTransition {
        /// Phase the battle was in.
        from: BattlePhase,
        /// Rejected command.
        command: PhaseCommand,
    },

    /// Invalid game state.
    #[error("Invalid game state: {0}")]
    InvalidState(String),

    /// Data file parsing error.
    #[error("Failed to parse data '{source_name}': {message}")]
    DataParseError {
        /// Name of the data source that failed to parse.
        source_name: String,
        /// Error message.
        message: String,
    },

    /// Snapshot encoding or decoding failed.
    #[error("Serialization failed: {0}")]
    Serialization(String),
}

impl GameError {
    /// Whether this error means the caller passed an inconsistent snapshot.
    #[must_use]
    pub const fn is_invariant_violation(&self) -> bool {
        matches!(
            self,
            Self::OutOfBounds { .. }
                | Self::TroopNotFound(_)
                | Self::ArmyNotFound(_)
                | Self::TileOccupied { .. }
                | Self::InvalidPhaseTransition { .. }
                | Self::InvalidState(_)
        )
    }
}

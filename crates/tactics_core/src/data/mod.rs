//! Data structures for battle scenarios.
//!
//! This module contains pure data structures deserialized from RON files:
//! the map layout, troop placements, pre-formed armies and combat rules.
//!
//! **Note:** This module contains no IO - it only defines data types.
//! File loading is handled by `tactics_tools`.

mod scenario_data;

pub use scenario_data::{ArmySetup, ScenarioData, TroopPlacement};

//! Scenario file loading.

use std::path::Path;

use tactics_core::data::ScenarioData;
use tactics_core::error::GameError;
use tactics_core::state::BattleState;
use thiserror::Error;

/// Error type for scenario operations.
#[derive(Error, Debug)]
pub enum ScenarioError {
    /// File not found.
    #[error("Scenario file not found: {0}")]
    FileNotFound(String),
    /// Failed to read file.
    #[error("Failed to read scenario file: {0}")]
    ReadError(#[from] std::io::Error),
    /// The engine rejected the scenario.
    #[error(transparent)]
    Game(#[from] GameError),
}

/// Load a scenario from a RON file.
///
/// # Errors
///
/// Returns an error if the file is missing, unreadable or not a valid
/// scenario.
pub fn load_scenario<P: AsRef<Path>>(path: P) -> Result<ScenarioData, ScenarioError> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(ScenarioError::FileNotFound(path.display().to_string()));
    }
    let contents = std::fs::read_to_string(path)?;
    let data = ScenarioData::from_ron(&contents)?;
    tracing::debug!(path = %path.display(), name = %data.name, "Scenario file read");
    Ok(data)
}

/// Load a scenario file and build its battle state.
///
/// # Errors
///
/// Returns an error if loading fails or the scenario breaks a snapshot
/// invariant.
pub fn load_battle<P: AsRef<Path>>(path: P) -> Result<BattleState, ScenarioError> {
    Ok(load_scenario(path)?.into_state()?)
}

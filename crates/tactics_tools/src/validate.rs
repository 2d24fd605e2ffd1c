//! Scenario validation.

use std::path::{Path, PathBuf};

use tactics_core::entity::Side;

use crate::scenario::{load_battle, ScenarioError};

/// Summary of a scenario that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationReport {
    /// Scenario file.
    pub path: PathBuf,
    /// Player troop count.
    pub player_troops: usize,
    /// Enemy troop count.
    pub enemy_troops: usize,
    /// Army count, both sides.
    pub armies: usize,
}

/// Validate a single scenario file.
///
/// # Errors
///
/// Returns an error if the file cannot be read, parsed or turned into a
/// consistent battle.
pub fn validate_scenario_file(path: &Path) -> Result<ValidationReport, ScenarioError> {
    let state = load_battle(path)?;
    let count = |side: Side| state.troops().iter().filter(|t| t.side == side).count();
    Ok(ValidationReport {
        path: path.to_path_buf(),
        player_troops: count(Side::Player),
        enemy_troops: count(Side::Enemy),
        armies: state.armies().len(),
    })
}

/// Validate a scenario file, or every `.ron` file in a directory.
///
/// Files are checked in name order; every file is checked even after a
/// failure.
///
/// # Errors
///
/// Returns an error if the directory cannot be listed.
pub fn validate_path(
    path: &Path,
) -> Result<Vec<(PathBuf, Result<ValidationReport, ScenarioError>)>, ScenarioError> {
    if !path.is_dir() {
        return Ok(vec![(path.to_path_buf(), validate_scenario_file(path))]);
    }

    let mut files = Vec::new();
    for entry in std::fs::read_dir(path)? {
        let file = entry?.path();
        if file.extension().is_some_and(|ext| ext == "ron") {
            files.push(file);
        }
    }
    files.sort();

    Ok(files
        .into_iter()
        .map(|file| {
            let result = validate_scenario_file(&file);
            if let Err(e) = &result {
                tracing::warn!(file = %file.display(), error = %e, "Scenario invalid");
            }
            (file, result)
        })
        .collect())
}

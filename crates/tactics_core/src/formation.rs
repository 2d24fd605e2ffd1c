//! Legality of forming and splitting armies.
//!
//! Every army must hold at least two troops forming a single
//! 4-connected component. The validators below check a proposed
//! selection in a fixed order and report the first rule it breaks.

use std::collections::{HashSet, VecDeque};

use thiserror::Error;

use crate::entity::{Army, Troop, TroopIndex};
use crate::grid::Coord;

/// Minimum number of troops in an army.
pub const MIN_ARMY_SIZE: usize = 2;

/// Why a selection cannot become (or be split off as) an army.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum FormationRejection {
    /// Fewer than two troops selected.
    #[error("select at least two troops to form an army")]
    TooFewTroops,
    /// A selected troop already belongs to an army.
    #[error("troop at {0} already belongs to an army")]
    AlreadyInArmy(Coord),
    /// Selected troops are not one connected group.
    #[error("selected troops must be connected")]
    NotConnected,
    /// Selected troops belong to different sides.
    #[error("selected troops must all belong to the same side")]
    MixedSides,
    /// Split selection includes a tile outside the source army.
    #[error("tile {0} is not part of the army being split")]
    NotSubsetOfArmy(Coord),
    /// Split selection holds fewer than two troops.
    #[error("the new army needs at least two troops")]
    SelectionTooSmall,
    /// Troops left behind by a split are fewer than two.
    #[error("the remaining army needs at least two troops")]
    RemainderTooSmall,
    /// Split selection is not one connected group.
    #[error("the new army must be connected")]
    SelectionNotConnected,
    /// Troops left behind by a split are not one connected group.
    #[error("the remaining army must stay connected")]
    RemainderNotConnected,
}

/// Outcome of a formation check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormationVerdict {
    /// The selection is legal.
    Valid,
    /// The selection breaks a rule.
    Rejected(FormationRejection),
}

impl FormationVerdict {
    /// Whether the selection is legal.
    #[must_use]
    pub const fn is_valid(&self) -> bool {
        matches!(self, Self::Valid)
    }

    /// Reason for rejection, if any.
    #[must_use]
    pub const fn rejection(&self) -> Option<FormationRejection> {
        match self {
            Self::Valid => None,
            Self::Rejected(r) => Some(*r),
        }
    }

    /// Human-readable reason for rejection, if any.
    #[must_use]
    pub fn reason(&self) -> Option<String> {
        self.rejection().map(|r| r.to_string())
    }
}

impl From<FormationRejection> for FormationVerdict {
    fn from(rejection: FormationRejection) -> Self {
        Self::Rejected(rejection)
    }
}

/// Whether `tiles` form one 4-connected component.
///
/// Breadth-first traversal restricted to the given tiles. An empty set
/// is not connected.
#[must_use]
pub fn is_connected<I>(tiles: I) -> bool
where
    I: IntoIterator<Item = Coord>,
{
    let remaining: HashSet<Coord> = tiles.into_iter().collect();
    let Some(&start) = remaining.iter().min() else {
        return false;
    };

    let mut visited = HashSet::with_capacity(remaining.len());
    let mut queue = VecDeque::new();
    visited.insert(start);
    queue.push_back(start);

    while let Some(current) = queue.pop_front() {
        for next in current.neighbors() {
            if remaining.contains(&next) && visited.insert(next) {
                queue.push_back(next);
            }
        }
    }

    visited.len() == remaining.len()
}

/// Selected tiles that hold a troop, de-duplicated, in selection order.
fn selected_troops<'a>(selected: &[Coord], index: &TroopIndex<'a>) -> Vec<&'a Troop> {
    let mut seen = HashSet::new();
    selected
        .iter()
        .filter(|c| seen.insert(**c))
        .filter_map(|&c| index.at(c))
        .collect()
}

/// Check whether the troops on `selected` may form a new army.
///
/// Checks, in order: at least two troops, none already in an army, one
/// connected group, one side.
#[must_use]
pub fn validate_selection(selected: &[Coord], troops: &[Troop], armies: &[Army]) -> FormationVerdict {
    let index = TroopIndex::new(troops);
    let chosen = selected_troops(selected, &index);

    if chosen.len() < MIN_ARMY_SIZE {
        return FormationRejection::TooFewTroops.into();
    }

    if let Some(taken) = chosen
        .iter()
        .find(|t| armies.iter().any(|a| a.contains(t.position)))
    {
        return FormationRejection::AlreadyInArmy(taken.position).into();
    }

    if !is_connected(chosen.iter().map(|t| t.position)) {
        return FormationRejection::NotConnected.into();
    }

    if chosen.iter().any(|t| t.side != chosen[0].side) {
        return FormationRejection::MixedSides.into();
    }

    FormationVerdict::Valid
}

/// Check whether `selected` may be split off `source` as a new army.
///
/// Checks, in order: selection inside the source army, selection has two
/// troops, remainder has two troops, selection connected, remainder
/// connected.
#[must_use]
pub fn validate_split(selected: &[Coord], source: &Army, troops: &[Troop]) -> FormationVerdict {
    if let Some(&outside) = selected.iter().find(|c| !source.contains(**c)) {
        return FormationRejection::NotSubsetOfArmy(outside).into();
    }

    let index = TroopIndex::new(troops);
    let chosen = selected_troops(selected, &index);
    let remainder: Vec<&Troop> = source
        .members
        .iter()
        .filter(|c| !selected.contains(c))
        .filter_map(|&c| index.at(c))
        .collect();

    if chosen.len() < MIN_ARMY_SIZE {
        return FormationRejection::SelectionTooSmall.into();
    }
    if remainder.len() < MIN_ARMY_SIZE {
        return FormationRejection::RemainderTooSmall.into();
    }
    if !is_connected(chosen.iter().map(|t| t.position)) {
        return FormationRejection::SelectionNotConnected.into();
    }
    if !is_connected(remainder.iter().map(|t| t.position)) {
        return FormationRejection::RemainderNotConnected.into();
    }

    FormationVerdict::Valid
}

/// Whether an existing army still satisfies the size and shape rules.
#[must_use]
pub fn is_army_intact(army: &Army, index: &TroopIndex<'_>) -> bool {
    let members = index.members_of(army);
    members.len() == army.members.len()
        && members.len() >= MIN_ARMY_SIZE
        && is_connected(army.members.iter().copied())
}

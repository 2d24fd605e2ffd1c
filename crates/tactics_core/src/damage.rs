//! Deterministic damage formula.
//!
//! Formula:
//! ```text
//! Modified Attack  = max(1, Base Attack  + terrain attack delta)
//! Modified Defense = max(1, Base Defense + terrain defense delta)
//! Final Attack     = Modified Attack  + (Attacker Morale - 1)
//! Final Defense    = Modified Defense + (Defender Morale - 1)
//! Damage           = max(1, (Final Attack - Final Defense) x 100)
//! ```
//!
//! There is no randomness: the same inputs always produce the same damage.

use serde::{Deserialize, Serialize};

use crate::entity::Morale;
use crate::grid::TerrainType;
use crate::soldier::SoldierType;
use crate::terrain::{effective_stat, Stat};

/// Damage dealt per point of attack over defense.
pub const DAMAGE_PER_POINT: i32 = 100;

/// Minimum damage floor - every attack deals at least 1 damage.
pub const MIN_DAMAGE: u32 = 1;

/// Inputs to [`compute_damage`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DamageParams {
    /// Attacking soldier type.
    pub attacker_type: SoldierType,
    /// Terrain under the attacker.
    pub attacker_terrain: TerrainType,
    /// Morale of the attacking army.
    pub attacker_morale: Morale,
    /// Defending soldier type.
    pub defender_type: SoldierType,
    /// Terrain under the defender.
    pub defender_terrain: TerrainType,
    /// Morale credited to the defender.
    pub defender_morale: Morale,
}

impl DamageParams {
    /// Both sides on grass at baseline morale.
    #[must_use]
    pub fn on_open_ground(attacker_type: SoldierType, defender_type: SoldierType) -> Self {
        Self {
            attacker_type,
            attacker_terrain: TerrainType::Grass,
            attacker_morale: Morale::MIN,
            defender_type,
            defender_terrain: TerrainType::Grass,
            defender_morale: Morale::MIN,
        }
    }

    /// Builder method to set attacker morale.
    #[must_use]
    pub const fn with_attacker_morale(mut self, morale: Morale) -> Self {
        self.attacker_morale = morale;
        self
    }

    /// Builder method to set defender morale.
    #[must_use]
    pub const fn with_defender_morale(mut self, morale: Morale) -> Self {
        self.defender_morale = morale;
        self
    }

    /// Builder method to set both terrains.
    #[must_use]
    pub const fn with_terrain(mut self, attacker: TerrainType, defender: TerrainType) -> Self {
        self.attacker_terrain = attacker;
        self.defender_terrain = defender;
        self
    }

}

/// Damage dealt by one attack. Never less than [`MIN_DAMAGE`].
#[must_use]
pub fn compute_damage(params: &DamageParams) -> u32 {
    let attack = effective_stat(params.attacker_type, params.attacker_terrain, Stat::Attack)
        + params.attacker_morale.bonus();
    let defense = effective_stat(params.defender_type, params.defender_terrain, Stat::Defense)
        + params.defender_morale.bonus();

    let raw = (attack - defense) * DAMAGE_PER_POINT;
    u32::try_from(raw).map_or(MIN_DAMAGE, |d| d.max(MIN_DAMAGE))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_weak_attacker_deals_minimum() {
        // Infantry attack 3 vs Shield defense 5 -> (3 - 5) * 100 < 1
        let params = DamageParams::on_open_ground(SoldierType::Infantry, SoldierType::Shield);
        assert_eq!(compute_damage(&params), 1);
    }

    #[test]
    fn test_morale_adds_to_attack() {
        // General attack 5 + 2 morale vs Infantry defense 3 -> 400
        let params = DamageParams::on_open_ground(SoldierType::General, SoldierType::Infantry)
            .with_attacker_morale(Morale::new(3));
        assert_eq!(compute_damage(&params), 400);
    }

    #[test]
    fn test_defender_morale_reduces_damage() {
        let params = DamageParams::on_open_ground(SoldierType::General, SoldierType::Infantry)
            .with_defender_morale(Morale::new(2));
        // 5 - (3 + 1) = 1
        assert_eq!(compute_damage(&params), 100);
    }

    #[test]
    fn test_water_weakens_both_sides() {
        // Cavalry attack 4 - 2 in water vs Archer defense 1 on grass
        let params = DamageParams::on_open_ground(SoldierType::Cavalry, SoldierType::Archer)
            .with_terrain(TerrainType::Water, TerrainType::Grass);
        assert_eq!(compute_damage(&params), 100);

        // Archer defense 1 - 2 floors at 1, so in-water archers take the same
        let params = DamageParams::on_open_ground(SoldierType::Cavalry, SoldierType::Archer)
            .with_terrain(TerrainType::Grass, TerrainType::Water);
        assert_eq!(compute_damage(&params), 300);
    }

    #[test]
    fn test_forest_shield_wall() {
        // Infantry attack 3 + 1 in forest vs Archer defense 1
        let params = DamageParams::on_open_ground(SoldierType::Infantry, SoldierType::Archer)
            .with_terrain(TerrainType::Forest, TerrainType::Grass);
        assert_eq!(compute_damage(&params), 300);
    }

    #[test]
    fn test_determinism() {
        let params = DamageParams::on_open_ground(SoldierType::Cavalry, SoldierType::Shield)
            .with_terrain(TerrainType::Forest, TerrainType::Forest)
            .with_attacker_morale(Morale::new(3));

        for _ in 0..100 {
            assert_eq!(compute_damage(&params), compute_damage(&params));
        }
    }
}

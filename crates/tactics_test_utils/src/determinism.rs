//! Determinism testing utilities.
//!
//! Provides a harness for verifying that battles produce identical results
//! given identical inputs.
//!
//! # Testing Strategy
//!
//! Replays and desync checks depend on every rule being a pure function of
//! the snapshot. Sources of non-determinism include:
//!
//! - **Floating-point math**: averages use fixed-point arithmetic.
//!
//! - **HashMap iteration order**: Rust's default hasher is randomized.
//!   Resolution walks troops and armies in snapshot order; hash maps are
//!   only used for lookups.
//!
//! - **Randomness**: combat has no dice.
//!
//! # Test Levels
//!
//! 1. **Unit tests**: Individual rule determinism (damage, visibility, etc.)
//! 2. **Property tests**: Random inputs must still produce deterministic outputs
//! 3. **Integration tests**: Full battles are reproducible
//! 4. **Parallel tests**: Running N battles on separate threads all match

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::thread;

use tactics_core::state::BattleState;

/// Result of a determinism test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeterminismResult {
    /// Whether all runs produced identical results.
    pub is_deterministic: bool,
    /// Hashes from each run.
    pub hashes: Vec<u64>,
    /// Number of steps played per run.
    pub steps: u64,
}

impl DeterminismResult {
    /// Get all unique hashes (should be 1 for a deterministic battle).
    #[must_use]
    pub fn unique_hashes(&self) -> Vec<u64> {
        let mut unique: Vec<u64> = self.hashes.clone();
        unique.sort_unstable();
        unique.dedup();
        unique
    }

    /// Assert that the battle was deterministic, with a detailed error message.
    ///
    /// # Panics
    ///
    /// Panics if the runs produced different hashes.
    pub fn assert_deterministic(&self) {
        if !self.is_deterministic {
            let unique = self.unique_hashes();
            panic!(
                "Battle is non-deterministic!\n\
                 Runs: {}\n\
                 Steps: {}\n\
                 Unique hashes: {} (expected 1)\n\
                 All hashes: {:?}",
                self.hashes.len(),
                self.steps,
                unique.len(),
                self.hashes
            );
        }
    }
}

/// Run a battle multiple times and verify determinism.
///
/// # Arguments
///
/// * `runs` - Number of times to play the battle
/// * `steps` - Number of steps to play per run
/// * `setup` - Function to create the initial state
/// * `step` - Function to advance the state by one step
/// * `hash` - Function to compute the state hash
///
/// # Example
///
/// ```
/// use tactics_test_utils::determinism::verify_determinism;
/// use tactics_test_utils::fixtures::{archer_duel, play_turn};
///
/// let result = verify_determinism(
///     3,
///     6,
///     archer_duel,
///     |state| {
///         play_turn(state);
///     },
///     |state| state.state_hash(),
/// );
/// result.assert_deterministic();
/// ```
pub fn verify_determinism<S, Setup, Step, HashFn>(
    runs: usize,
    steps: u64,
    setup: Setup,
    step: Step,
    hash: HashFn,
) -> DeterminismResult
where
    Setup: Fn() -> S,
    Step: Fn(&mut S),
    HashFn: Fn(&S) -> u64,
{
    let mut hashes = Vec::with_capacity(runs);

    for _ in 0..runs {
        let mut state = setup();

        for _ in 0..steps {
            step(&mut state);
        }

        hashes.push(hash(&state));
    }

    let is_deterministic = hashes.windows(2).all(|w| w[0] == w[1]);

    DeterminismResult {
        is_deterministic,
        hashes,
        steps,
    }
}

/// Play a battle on `num_threads` scoped threads and collect final hashes.
///
/// # Panics
///
/// Panics if a worker thread panics.
pub fn run_parallel_battles<Setup, Step>(
    setup: Setup,
    step: Step,
    num_threads: usize,
    steps: u64,
) -> DeterminismResult
where
    Setup: Fn() -> BattleState + Sync,
    Step: Fn(&mut BattleState) + Sync,
{
    let hashes: Vec<u64> = thread::scope(|s| {
        let handles: Vec<_> = (0..num_threads)
            .map(|_| {
                s.spawn(|| {
                    let mut state = setup();
                    for _ in 0..steps {
                        step(&mut state);
                    }
                    state.state_hash()
                })
            })
            .collect();

        handles
            .into_iter()
            .map(|h| h.join().expect("battle thread panicked"))
            .collect()
    });

    DeterminismResult {
        is_deterministic: hashes.windows(2).all(|w| w[0] == w[1]),
        hashes,
        steps,
    }
}

/// Compare two battles step by step, finding the first divergence.
///
/// # Returns
///
/// `None` if the battles stay identical, `Some(step)` if they diverge
/// after that step (0 means the initial states already differ).
pub fn find_first_divergence<Setup, Step>(setup: Setup, step: Step, steps: u64) -> Option<u64>
where
    Setup: Fn() -> BattleState,
    Step: Fn(&mut BattleState),
{
    let mut first = setup();
    let mut second = setup();

    if first.state_hash() != second.state_hash() {
        return Some(0);
    }

    for n in 1..=steps {
        step(&mut first);
        step(&mut second);

        if first.state_hash() != second.state_hash() {
            tracing::debug!(step = n, "Battles diverged");
            return Some(n);
        }
    }

    None
}

/// Verify that a snapshot round trip preserves the battle exactly, and
/// that the restored battle keeps evolving identically.
pub fn verify_serialization_determinism<Setup, Step>(setup: Setup, step: Step, steps: u64) -> bool
where
    Setup: Fn() -> BattleState,
    Step: Fn(&mut BattleState),
{
    let mut original = setup();
    for _ in 0..steps {
        step(&mut original);
    }

    let Ok(bytes) = original.serialize() else {
        return false;
    };
    let Ok(mut restored) = BattleState::deserialize(&bytes) else {
        return false;
    };
    if original.state_hash() != restored.state_hash() {
        return false;
    }

    step(&mut original);
    step(&mut restored);
    original.state_hash() == restored.state_hash()
}

/// Compute a simple hash for any hashable value.
pub fn compute_hash<T: Hash>(value: &T) -> u64 {
    let mut hasher = DefaultHasher::new();
    value.hash(&mut hasher);
    hasher.finish()
}

/// Proptest strategies for battle inputs.
///
/// These strategies generate random but reproducible inputs for
/// property-based testing of the rules.
pub mod strategies {
    use proptest::prelude::*;
    use tactics_core::damage::DamageParams;
    use tactics_core::entity::{Morale, Side, Troop, TroopId};
    use tactics_core::grid::{BattleMap, Coord, Direction, TerrainType, Tile, MAP_SIZE, TILE_COUNT};
    use tactics_core::soldier::{SoldierType, MAX_HP};

    /// Generate an in-bounds coordinate.
    pub fn arb_coord() -> impl Strategy<Value = Coord> {
        (0..MAP_SIZE, 0..MAP_SIZE).prop_map(|(x, y)| Coord::new(x, y))
    }

    /// Generate any terrain type.
    pub fn arb_terrain() -> impl Strategy<Value = TerrainType> {
        proptest::sample::select(TerrainType::ALL.to_vec())
    }

    /// Generate any soldier type.
    pub fn arb_soldier_type() -> impl Strategy<Value = SoldierType> {
        proptest::sample::select(SoldierType::ALL.to_vec())
    }

    /// Generate any facing.
    pub fn arb_direction() -> impl Strategy<Value = Direction> {
        proptest::sample::select(Direction::ALL.to_vec())
    }

    /// Generate a morale value (1-3).
    pub fn arb_morale() -> impl Strategy<Value = Morale> {
        (1u8..=3).prop_map(Morale::new)
    }

    /// Generate hit points (0-1000).
    pub fn arb_hp() -> impl Strategy<Value = u32> {
        0u32..=MAX_HP
    }

    /// Generate damage values, including overkill.
    pub fn arb_damage() -> impl Strategy<Value = u32> {
        1u32..5000u32
    }

    /// Generate a complete damage exchange.
    pub fn arb_damage_params() -> impl Strategy<Value = DamageParams> {
        (
            arb_soldier_type(),
            arb_terrain(),
            arb_morale(),
            arb_soldier_type(),
            arb_terrain(),
            arb_morale(),
        )
            .prop_map(
                |(
                    attacker_type,
                    attacker_terrain,
                    attacker_morale,
                    defender_type,
                    defender_terrain,
                    defender_morale,
                )| DamageParams {
                    attacker_type,
                    attacker_terrain,
                    attacker_morale,
                    defender_type,
                    defender_terrain,
                    defender_morale,
                },
            )
    }

    /// Generate a troop anywhere on the map.
    pub fn arb_troop(side: Side) -> impl Strategy<Value = Troop> {
        (1u32..1000, arb_coord(), arb_soldier_type(), arb_hp()).prop_map(
            move |(id, position, soldier_type, hp)| {
                Troop::new(TroopId::new(id), side, position, soldier_type).with_hp(hp)
            },
        )
    }

    /// Generate a full map of random terrain at natural heights.
    pub fn arb_map() -> impl Strategy<Value = BattleMap> {
        proptest::collection::vec(arb_terrain(), TILE_COUNT).prop_map(|terrain| {
            let tiles = terrain.into_iter().map(Tile::new).collect();
            BattleMap::from_tiles(tiles).unwrap_or_default()
        })
    }

    /// Generate a connected army footprint: a horizontal or vertical line
    /// of 2-5 tiles fully on the map.
    pub fn arb_line_footprint() -> impl Strategy<Value = Vec<Coord>> {
        (2i32..=5, any::<bool>(), 0..MAP_SIZE - 5, 0..MAP_SIZE - 5).prop_map(
            |(len, vertical, x, y)| {
                (0..len)
                    .map(|i| {
                        if vertical {
                            Coord::new(x, y + i)
                        } else {
                            Coord::new(x + i, y)
                        }
                    })
                    .collect()
            },
        )
    }
}

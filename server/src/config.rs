//! Tunable game rules
//!
//! Defaults come from the constants in the `shared` crate. The server binary
//! overrides a handful of them from the command line; tests usually pin the
//! rng `seed` and zero the curse chance to make games reproducible.

use shared::{
    ARTIFACT_CHANCE, ARTIFACT_FIND_CHANCE, CURSE_CHANCE, MAX_ARTIFACTS, MAX_ENERGY, MAX_PLAYERS,
    MAX_RESOURCE_VALUE, MAX_STATUE_LEVEL, MIN_PLAYERS, MIN_RESOURCE_VALUE, SET_BONUS_MULTIPLIER,
    START_ENERGY, START_RUNES, TILES_PER_ROUND, TILE_PRICE,
};

#[derive(Debug, Clone, PartialEq)]
pub struct GameConfig {
    pub start_runes: u32,
    pub start_energy: u8,
    pub max_energy: u8,
    pub max_artifacts: usize,
    pub max_statue_level: u8,
    /// Tiles a player may buy before their turn ends
    pub tiles_per_round: u32,
    pub tile_price: u32,
    pub min_resource_value: u32,
    pub max_resource_value: u32,
    /// Percent chance a generated tile carries an artifact
    pub artifact_chance: f64,
    /// Base percent chance of finding an artifact on purchase
    pub artifact_find_chance: f64,
    /// Percent chance a level 3 statue curses its owner
    pub curse_chance: f64,
    pub set_bonus_multiplier: u32,
    pub min_players: usize,
    pub max_players: usize,
    /// Fixed rng seed; `None` seeds from system entropy
    pub seed: Option<u64>,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            start_runes: START_RUNES,
            start_energy: START_ENERGY,
            max_energy: MAX_ENERGY,
            max_artifacts: MAX_ARTIFACTS,
            max_statue_level: MAX_STATUE_LEVEL,
            tiles_per_round: TILES_PER_ROUND,
            tile_price: TILE_PRICE,
            min_resource_value: MIN_RESOURCE_VALUE,
            max_resource_value: MAX_RESOURCE_VALUE,
            artifact_chance: ARTIFACT_CHANCE,
            artifact_find_chance: ARTIFACT_FIND_CHANCE,
            curse_chance: CURSE_CHANCE,
            set_bonus_multiplier: SET_BONUS_MULTIPLIER,
            min_players: MIN_PLAYERS,
            max_players: MAX_PLAYERS,
            seed: None,
        }
    }
}

impl GameConfig {
    /// Reproducible configuration: fixed seed, no hidden artifacts, no curses.
    pub fn deterministic(seed: u64) -> Self {
        Self {
            artifact_chance: 0.0,
            artifact_find_chance: 0.0,
            curse_chance: 0.0,
            seed: Some(seed),
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_follow_shared_constants() {
        let config = GameConfig::default();
        assert_eq!(config.start_runes, 50);
        assert_eq!(config.max_energy, 4);
        assert_eq!(config.max_artifacts, 3);
        assert_eq!(config.tiles_per_round, 3);
        assert_eq!(config.tile_price, 10);
        assert!(config.seed.is_none());
    }

    #[test]
    fn test_deterministic_disables_randomised_rewards() {
        let config = GameConfig::deterministic(7);
        assert_eq!(config.seed, Some(7));
        assert_eq!(config.curse_chance, 0.0);
        assert_eq!(config.artifact_chance, 0.0);
        assert_eq!(config.start_runes, GameConfig::default().start_runes);
    }
}

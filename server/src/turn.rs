//! Turn rotation, upkeep and resource income
//!
//! The controller itself is a tiny state machine (`NotStarted` or
//! `Active { index }` plus a round counter). The work done on every turn
//! change lives in an `impl GameState` block below because it needs the
//! board and the roster.
//!
//! ## Turn change
//! 1. Upkeep for the outgoing player: activation flags cleared, disabled
//!    counters decremented, per-round purchase counter reset.
//! 2. The index advances; wrapping back to the first seat starts a new round.
//! 3. Income for the incoming player.

use crate::actions::structure;
use crate::entity::Entity;
use crate::game::GameState;
use crate::status::BuffType;
use log::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnPhase {
    NotStarted,
    Active { index: usize },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnController {
    phase: TurnPhase,
    round: u32,
}

impl Default for TurnController {
    fn default() -> Self {
        Self::new()
    }
}

impl TurnController {
    pub fn new() -> Self {
        Self {
            phase: TurnPhase::NotStarted,
            round: 0,
        }
    }

    pub fn phase(&self) -> TurnPhase {
        self.phase
    }

    pub fn round(&self) -> u32 {
        self.round
    }

    pub fn is_active(&self) -> bool {
        matches!(self.phase, TurnPhase::Active { .. })
    }

    pub fn active_index(&self) -> Option<usize> {
        match self.phase {
            TurnPhase::Active { index } => Some(index),
            TurnPhase::NotStarted => None,
        }
    }

    fn begin(&mut self) {
        self.phase = TurnPhase::Active { index: 0 };
        self.round = 0;
    }

    /// Moves to the next seat and returns its index
    fn advance(&mut self, player_count: usize) -> Option<usize> {
        let index = self.active_index()?;
        let next = (index + 1) % player_count.max(1);
        if next == 0 {
            self.round += 1;
        }
        self.phase = TurnPhase::Active { index: next };
        Some(next)
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }
}

/// What a player earned at the start of their turn
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Income {
    pub runes: u32,
    pub energy: u32,
}

fn scaled(value: u32, multiplier: f64) -> u32 {
    (f64::from(value) * multiplier).round().max(0.0) as u32
}

impl GameState {
    /// Hands the first turn to seat 0 and pays its income
    pub fn start_turns(&mut self) {
        self.turn.begin();
        if !self.players.is_empty() {
            self.run_income(0);
        }
    }

    /// Ends `player`'s turn. Returns `false` without any change when
    /// `player` is not the active player.
    pub fn end_turn(&mut self, player: &str) -> bool {
        let Some(index) = self.turn.active_index() else {
            return false;
        };
        if self.players.get(index).map(|p| p.name.as_str()) != Some(player) {
            return false;
        }

        self.run_upkeep(index);
        let Some(next) = self.turn.advance(self.players.len()) else {
            return false;
        };
        let income = self.run_income(next);

        info!(
            "Turn passed from {} to {} (round {}, income {} runes / {} energy)",
            player,
            self.players[next].name,
            self.turn.round(),
            income.runes,
            income.energy
        );
        true
    }

    fn run_upkeep(&mut self, index: usize) {
        let Some(player) = self.players.get_mut(index) else {
            return;
        };
        player.tiles_bought_this_round = 0;
        for &(x, y) in &player.entity_tiles {
            if let Some(entity) = self.board.get_mut(x, y).and_then(|t| t.entity.as_mut()) {
                entity.upkeep();
            }
        }
    }

    /// Pays the per-turn income of one player.
    ///
    /// Owned tiles yield their resource value scaled by the rune-generation
    /// multipliers of player and tile (and the river multipliers on river
    /// tiles). Enabled structures yield energy when their value is at most
    /// the energy cap, runes otherwise, then run their passive behaviour.
    /// Monuments yield their runes, multiplied by the set bonus when the
    /// player owns the whole set.
    pub fn run_income(&mut self, index: usize) -> Income {
        let Some(player) = self.players.get(index) else {
            return Income::default();
        };
        let name = player.name.clone();
        let status = player.status.clone();
        let max_energy = u32::from(self.config.max_energy);

        let mut income = Income::default();
        let mut passives = Vec::new();

        for &(x, y) in &player.owned_tiles {
            let Some(tile) = self.board.get(x, y) else {
                continue;
            };
            let mut rune_multiplier =
                status.get(BuffType::RuneGeneration) * tile.status.get(BuffType::RuneGeneration);
            if tile.has_river {
                rune_multiplier *= status.get(BuffType::RiverRuneGeneration)
                    * tile.status.get(BuffType::RiverRuneGeneration);
            }
            income.runes += scaled(tile.resource_value, rune_multiplier);

            match &tile.entity {
                Some(Entity::Structure(s)) if s.disabled_turns == 0 => {
                    if s.resource_value <= max_energy {
                        let energy_multiplier = status.get(BuffType::EnergyGeneration)
                            * tile.status.get(BuffType::EnergyGeneration);
                        income.energy += scaled(s.resource_value, energy_multiplier);
                    } else {
                        income.runes += scaled(s.resource_value, rune_multiplier);
                    }
                    if !s.fires_on_purchase() {
                        passives.push(s.effect.clone());
                    }
                }
                Some(Entity::Monument(m)) => {
                    let complete = m.set && m.disabled_turns == 0 && self.owns_complete_set(&name, m);
                    income.runes += if complete {
                        m.runes * self.config.set_bonus_multiplier
                    } else {
                        m.runes
                    };
                }
                _ => {}
            }
        }

        let player = &mut self.players[index];
        player.add_runes(i64::from(income.runes));
        player.add_energy(income.energy.min(max_energy) as i32);

        for effect in &passives {
            structure::apply_passive(self, index, effect);
        }

        debug!(
            "{} earned {} runes and {} energy",
            name, income.runes, income.energy
        );
        income
    }
}

/// Comprehensive test suite for turn rotation and income
#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Catalog;
    use crate::config::GameConfig;
    use std::sync::Arc;

    fn started(players: &[&str]) -> GameState {
        let catalog = Arc::new(Catalog::embedded().unwrap());
        let mut state = GameState::new(GameConfig::deterministic(3), catalog);
        let names: Vec<String> = players.iter().map(|s| s.to_string()).collect();
        state.start(&names).unwrap();
        state
    }

    #[test]
    fn test_controller_starts_idle() {
        let controller = TurnController::new();
        assert_eq!(controller.phase(), TurnPhase::NotStarted);
        assert_eq!(controller.active_index(), None);
        assert_eq!(controller.round(), 0);
    }

    #[test]
    fn test_round_rolls_over_after_every_seat() {
        let mut state = started(&["a", "b", "c"]);
        assert!(state.end_turn("a"));
        assert!(state.end_turn("b"));
        assert_eq!(state.turn.round(), 0);
        assert!(state.end_turn("c"));
        assert_eq!(state.turn.round(), 1);
        assert_eq!(state.turn.active_index(), Some(0));
    }

    #[test]
    fn test_end_turn_rejects_inactive_player() {
        let mut state = started(&["a", "b"]);
        assert!(!state.end_turn("b"));
        assert!(!state.end_turn("nobody"));
        assert_eq!(state.turn.active_index(), Some(0));
    }

    #[test]
    fn test_end_turn_before_start_fails() {
        let catalog = Arc::new(Catalog::embedded().unwrap());
        let mut state = GameState::new(GameConfig::deterministic(3), catalog);
        assert!(!state.end_turn("a"));
    }

    #[test]
    fn test_income_equals_tile_values_when_neutral() {
        let mut state = started(&["a", "b"]);
        let coords = [(0, 0), (1, 0), (2, 1)];
        let mut expected = 0;
        for coord in coords {
            state.grant_tile(coord, "a");
            expected += state.board.get(coord.0, coord.1).unwrap().resource_value;
        }

        let before = state.players[0].runes();
        let income = state.run_income(0);
        assert_eq!(income.runes, expected);
        assert_eq!(state.players[0].runes(), before + expected);
    }

    #[test]
    fn test_river_multipliers_apply_only_on_river() {
        let mut state = started(&["a", "b"]);
        state.grant_tile((0, 2), "a");
        state.players[0].status.buff(BuffType::RiverRuneGeneration, 1.0);
        let value = state.board.get(0, 2).unwrap().resource_value;
        assert_eq!(state.run_income(0).runes, value * 2);

        state.grant_tile((3, 0), "b");
        state.players[1].status.buff(BuffType::RiverRuneGeneration, 1.0);
        let value = state.board.get(3, 0).unwrap().resource_value;
        assert_eq!(state.run_income(1).runes, value);
    }

    #[test]
    fn test_upkeep_resets_purchase_counter_and_activation() {
        let mut state = started(&["a", "b"]);
        state.grant_tile((0, 0), "a");
        let mut table = state.catalog().structure(1).cloned().unwrap();
        table.activated = true;
        table.disabled_turns = 2;
        state.place_entity((0, 0), Entity::Structure(table));
        state.players[0].tiles_bought_this_round = 3;

        assert!(state.end_turn("a"));
        let entity = state.board.get(0, 0).unwrap().entity.as_ref().unwrap();
        assert!(!entity.is_activated());
        assert_eq!(entity.disabled_turns(), 1);
        assert_eq!(state.players[0].tiles_bought_this_round, 0);
    }

    #[test]
    fn test_structure_income_goes_to_energy_or_runes() {
        let mut state = started(&["a", "b"]);
        state.grant_tile((0, 0), "a");
        state.grant_tile((0, 2), "a");
        let table = state.catalog().structure(1).cloned().unwrap();
        let hall = state.catalog().structure(5).cloned().unwrap();
        state.place_entity((0, 0), Entity::Structure(table));
        state.place_entity((0, 2), Entity::Structure(hall));

        let tiles = state.board.get(0, 0).unwrap().resource_value
            + state.board.get(0, 2).unwrap().resource_value;
        let income = state.run_income(0);
        assert_eq!(income.energy, 2);
        assert_eq!(income.runes, tiles + 8);
    }

    #[test]
    fn test_disabled_structure_earns_nothing() {
        let mut state = started(&["a", "b"]);
        state.grant_tile((0, 0), "a");
        let mut table = state.catalog().structure(1).cloned().unwrap();
        table.disabled_turns = 1;
        state.place_entity((0, 0), Entity::Structure(table));
        assert_eq!(state.run_income(0).energy, 0);
    }

    #[test]
    fn test_tree_passive_pays_runes() {
        let mut state = started(&["a", "b"]);
        state.grant_tile((0, 0), "a");
        let tree = state.catalog().tree().unwrap();
        state.place_entity((0, 0), Entity::Structure(tree));

        let value = state.board.get(0, 0).unwrap().resource_value;
        let before = state.players[0].runes();
        state.run_income(0);
        assert_eq!(state.players[0].runes(), before + value + 5);
    }

    #[test]
    fn test_monument_set_bonus() {
        let mut state = started(&["a", "b"]);
        let monument = state
            .catalog()
            .monuments()
            .iter()
            .find(|m| m.set && m.tiles.len() == 2)
            .cloned()
            .unwrap();
        let tile_values: u32 = monument
            .tiles
            .iter()
            .map(|&(x, y)| state.board.get(x, y).unwrap().resource_value)
            .sum();

        state.grant_tile(monument.tiles[0], "a");
        let partial = state.run_income(0).runes;
        assert_eq!(
            partial,
            state.board.get(monument.tiles[0].0, monument.tiles[0].1).unwrap().resource_value
                + monument.runes
        );

        state.grant_tile(monument.tiles[1], "a");
        let full = state.run_income(0).runes;
        assert_eq!(full, tile_values + 2 * monument.runes * 2);
    }
}

//! Authoritative game state
//!
//! `GameState` is the aggregate root of a match: it owns the board, the
//! ordered player roster, the turn controller and the random source. All
//! mutation goes through `&mut GameState`, which the dispatcher only hands
//! out while it holds the exclusive lock.

use crate::board::Board;
use crate::catalog::Catalog;
use crate::config::GameConfig;
use crate::entity::{Coord, Entity, Monument};
use crate::error::GameError;
use crate::player::Player;
use crate::turn::TurnController;
use log::{debug, info};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use shared::DELIMITER;
use std::collections::HashSet;
use std::sync::Arc;

#[derive(Debug)]
pub struct GameState {
    pub(crate) config: GameConfig,
    pub(crate) catalog: Arc<Catalog>,
    pub board: Board,
    pub players: Vec<Player>,
    pub turn: TurnController,
    pub(crate) rng: StdRng,
}

impl GameState {
    /// Creates an idle state with a freshly generated board and no players
    pub fn new(config: GameConfig, catalog: Arc<Catalog>) -> Self {
        let mut rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let board = Board::generate(&config, &catalog, &mut rng);

        Self {
            config,
            catalog,
            board,
            players: Vec::new(),
            turn: TurnController::new(),
            rng,
        }
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn is_started(&self) -> bool {
        self.turn.is_active()
    }

    /// Seats the roster, builds a new board and hands the first turn to
    /// `names[0]`.
    pub fn start(&mut self, names: &[String]) -> Result<(), GameError> {
        if self.is_started() {
            return Err(GameError::AlreadyStarted);
        }
        self.validate_roster(names)?;

        self.board = Board::generate(&self.config, &self.catalog, &mut self.rng);
        self.players = names
            .iter()
            .map(|name| Player::new(name.as_str(), &self.config))
            .collect();
        self.start_turns();

        info!("Game started with players {:?}", names);
        Ok(())
    }

    fn validate_roster(&self, names: &[String]) -> Result<(), GameError> {
        if names.len() < self.config.min_players || names.len() > self.config.max_players {
            return Err(GameError::InvalidRoster(format!(
                "{} players, expected {}..={}",
                names.len(),
                self.config.min_players,
                self.config.max_players
            )));
        }
        let mut seen = HashSet::new();
        for name in names {
            if name.is_empty() || name.contains(DELIMITER) {
                return Err(GameError::InvalidRoster(format!("illegal name {:?}", name)));
            }
            if !seen.insert(name.as_str()) {
                return Err(GameError::InvalidRoster(format!("duplicate name {}", name)));
            }
        }
        Ok(())
    }

    /// Ends the match: clears every holding and returns to the idle state
    pub fn reset(&mut self) {
        for player in &mut self.players {
            player.reset(&self.config);
        }
        self.players.clear();
        self.turn.reset();
        self.board = Board::generate(&self.config, &self.catalog, &mut self.rng);
        info!("Game state reset");
    }

    pub fn player_index(&self, name: &str) -> Option<usize> {
        self.players.iter().position(|p| p.name == name)
    }

    pub fn player(&self, name: &str) -> Option<&Player> {
        self.players.iter().find(|p| p.name == name)
    }

    pub fn player_mut(&mut self, name: &str) -> Option<&mut Player> {
        self.players.iter_mut().find(|p| p.name == name)
    }

    pub fn active_player(&self) -> Option<&Player> {
        self.turn.active_index().and_then(|i| self.players.get(i))
    }

    pub fn is_active_player(&self, name: &str) -> bool {
        self.active_player().map_or(false, |p| p.name == name)
    }

    /// Player names ordered by rune balance, richest first
    pub fn standings(&self) -> Vec<(String, u32)> {
        let mut standings: Vec<(String, u32)> = self
            .players
            .iter()
            .map(|p| (p.name.clone(), p.runes()))
            .collect();
        standings.sort_by(|a, b| b.1.cmp(&a.1));
        standings
    }

    /// Whether `player` owns every tile the monument spans
    pub fn owns_complete_set(&self, player: &str, monument: &Monument) -> bool {
        monument.tiles.iter().all(|&(x, y)| {
            self.board
                .get(x, y)
                .map_or(false, |tile| tile.is_owned_by(player))
        })
    }

    /// Rolls a percent chance against the game rng
    pub fn roll(&mut self, percent: f64) -> bool {
        self.rng.gen_bool((percent / 100.0).clamp(0.0, 1.0))
    }

    /// Attaches an entity to a tile and records it with the tile's owner
    pub fn place_entity(&mut self, coord: Coord, entity: Entity) {
        let Some(tile) = self.board.get_mut(coord.0, coord.1) else {
            return;
        };
        debug!("Placing {} on ({}, {})", entity.name(), coord.0, coord.1);
        tile.entity = Some(entity);
        if let Some(owner) = tile.owner.clone() {
            if let Some(player) = self.player_mut(&owner) {
                player.track_entity(coord);
            }
        }
    }

    /// Detaches the tile's entity and forgets it on the owner's side
    pub fn remove_entity(&mut self, coord: Coord) -> Option<Entity> {
        let tile = self.board.get_mut(coord.0, coord.1)?;
        let entity = tile.entity.take()?;
        if let Some(owner) = tile.owner.clone() {
            if let Some(player) = self.player_mut(&owner) {
                player.untrack_entity(coord);
            }
        }
        debug!("Removed {} from ({}, {})", entity.name(), coord.0, coord.1);
        Some(entity)
    }

    /// Coordinates of the player's entities that satisfy `pred`
    pub fn entity_tiles_where(&self, player: &str, pred: impl Fn(&Entity) -> bool) -> Vec<Coord> {
        let Some(player) = self.player(player) else {
            return Vec::new();
        };
        player
            .entity_tiles
            .iter()
            .copied()
            .filter(|&(x, y)| {
                self.board
                    .get(x, y)
                    .and_then(|t| t.entity.as_ref())
                    .map_or(false, &pred)
            })
            .collect()
    }

    /// Picks one element at random
    pub fn pick<T: Copy>(&mut self, items: &[T]) -> Option<T> {
        items.choose(&mut self.rng).copied()
    }

    /// Gives the tile to `player` without charging for it
    pub fn grant_tile(&mut self, coord: Coord, player: &str) -> bool {
        let Some(tile) = self.board.get_mut(coord.0, coord.1) else {
            return false;
        };
        if tile.is_purchased() {
            return false;
        }
        tile.owner = Some(player.to_string());
        let has_entity = tile.has_entity();
        if let Some(p) = self.player_mut(player) {
            p.owned_tiles.push(coord);
            if has_entity {
                p.track_entity(coord);
            }
        }
        true
    }
}

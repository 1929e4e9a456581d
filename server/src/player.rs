//! Player holdings and resource accounting

use crate::config::GameConfig;
use crate::entity::{Artifact, Coord};
use crate::status::{BuffType, Status};
use log::debug;

/// A seat in the match
///
/// Tiles and entities live on the board; the player only keeps coordinates
/// pointing at them so ownership has a single source of truth.
#[derive(Debug, Clone, PartialEq)]
pub struct Player {
    pub name: String,
    runes: u32,
    energy: u8,
    max_energy: u8,
    max_artifacts: usize,
    /// Tiles this player owns
    pub owned_tiles: Vec<Coord>,
    /// Tiles carrying an entity this player owns (structures, statues, monuments)
    pub entity_tiles: Vec<Coord>,
    pub artifacts: Vec<Artifact>,
    pub status: Status,
    /// Tiles bought since the start of the current turn
    pub tiles_bought_this_round: u32,
}

impl Player {
    pub fn new(name: impl Into<String>, config: &GameConfig) -> Self {
        Self {
            name: name.into(),
            runes: config.start_runes,
            energy: config.start_energy.min(config.max_energy),
            max_energy: config.max_energy,
            max_artifacts: config.max_artifacts,
            owned_tiles: Vec::new(),
            entity_tiles: Vec::new(),
            artifacts: Vec::new(),
            status: Status::new(),
            tiles_bought_this_round: 0,
        }
    }

    pub fn runes(&self) -> u32 {
        self.runes
    }

    pub fn energy(&self) -> u8 {
        self.energy
    }

    /// Adds (or removes) runes, never dropping below zero
    pub fn add_runes(&mut self, amount: i64) {
        let updated = (i64::from(self.runes) + amount).clamp(0, i64::from(u32::MAX));
        self.runes = updated as u32;
    }

    /// Adds (or removes) energy, clamped to `0..=max_energy`
    pub fn add_energy(&mut self, amount: i32) {
        let updated = (i32::from(self.energy) + amount).clamp(0, i32::from(self.max_energy));
        self.energy = updated as u8;
    }

    /// Price after the shop-price multiplier
    pub fn adjusted_price(&self, price: u32) -> u32 {
        let multiplier = self.status.get(BuffType::ShopPrice).max(0.5);
        (f64::from(price) / multiplier).round() as u32
    }

    pub fn can_afford(&self, price: u32) -> bool {
        self.runes >= self.adjusted_price(price)
    }

    /// Charges the adjusted price; leaves the balance untouched on failure
    pub fn buy(&mut self, price: u32) -> bool {
        let cost = self.adjusted_price(price);
        if self.runes < cost {
            debug!("{} cannot afford {} runes", self.name, cost);
            return false;
        }
        self.runes -= cost;
        true
    }

    pub fn has_artifact_room(&self) -> bool {
        self.artifacts.len() < self.max_artifacts
    }

    /// Stores an artifact if the player has room for it
    pub fn add_artifact(&mut self, artifact: Artifact) -> bool {
        if !self.has_artifact_room() {
            return false;
        }
        self.artifacts.push(artifact);
        true
    }

    pub fn artifact(&self, id: u32) -> Option<&Artifact> {
        self.artifacts.iter().find(|a| a.id == id)
    }

    pub fn take_artifact(&mut self, id: u32) -> Option<Artifact> {
        let index = self.artifacts.iter().position(|a| a.id == id)?;
        Some(self.artifacts.remove(index))
    }

    pub fn owns_tile(&self, coord: Coord) -> bool {
        self.owned_tiles.contains(&coord)
    }

    pub fn track_entity(&mut self, coord: Coord) {
        if !self.entity_tiles.contains(&coord) {
            self.entity_tiles.push(coord);
        }
    }

    pub fn untrack_entity(&mut self, coord: Coord) {
        self.entity_tiles.retain(|c| *c != coord);
    }

    /// Clears every holding and restores the starting balances
    pub fn reset(&mut self, config: &GameConfig) {
        *self = Player::new(std::mem::take(&mut self.name), config);
    }
}

//! Buying tiles

use super::Action;
use crate::entity::{Entity, StructureEffect};
use crate::error::GameError;
use crate::game::GameState;
use crate::status::BuffType;
use log::{debug, info};
use shared::CommandTag;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuyTile {
    pub x: usize,
    pub y: usize,
}

impl Action for BuyTile {
    fn tag(&self) -> CommandTag {
        CommandTag::BuyTile
    }

    /// Buys an unowned tile at the buyer's adjusted price.
    ///
    /// A trap on the tile springs on the buyer and is removed. A monument
    /// on the tile becomes the buyer's. A hidden artifact (or one found by
    /// luck) goes to the buyer when they have room for it.
    fn attempt(&self, state: &mut GameState, player: &str) -> Result<bool, GameError> {
        let coord = (self.x, self.y);
        let Some(tile) = state.board.get(self.x, self.y) else {
            return Ok(false);
        };
        if tile.is_purchased() {
            return Ok(false);
        }
        let price = tile.price;
        let Some(index) = state.player_index(player) else {
            return Ok(false);
        };
        let buyer = &state.players[index];
        if buyer.tiles_bought_this_round >= state.config.tiles_per_round || !buyer.can_afford(price) {
            return Ok(false);
        }
        let find_chance =
            state.config.artifact_find_chance * buyer.status.get(BuffType::ArtifactChance);

        if !state.players[index].buy(price) {
            return Err(GameError::Internal(format!(
                "{} passed the price check but could not pay",
                player
            )));
        }

        let Some(tile) = state.board.get_mut(self.x, self.y) else {
            return Err(GameError::Internal("tile vanished during purchase".into()));
        };
        tile.owner = Some(player.to_string());
        let trap = match &tile.entity {
            Some(Entity::Structure(s)) => match s.effect {
                StructureEffect::Trap { runes_lost } => Some(runes_lost),
                _ => None,
            },
            _ => None,
        };
        if trap.is_some() {
            tile.entity = None;
        }
        let has_entity = tile.has_entity();
        let hidden_artifact = tile.artifact.is_some();

        let buyer = &mut state.players[index];
        buyer.owned_tiles.push(coord);
        buyer.tiles_bought_this_round += 1;
        if has_entity {
            buyer.track_entity(coord);
        }
        if let Some(runes_lost) = trap {
            buyer.add_runes(-i64::from(runes_lost));
            info!("{} sprang a trap on ({}, {})", player, self.x, self.y);
        }

        if !hidden_artifact && state.roll(find_chance) {
            let found = state.catalog.random_artifact(&mut state.rng);
            if let Some(tile) = state.board.get_mut(self.x, self.y) {
                tile.artifact = found;
            }
        }

        if state.players[index].has_artifact_room() {
            if let Some(artifact) = state
                .board
                .get_mut(self.x, self.y)
                .and_then(|t| t.artifact.take())
            {
                debug!("{} found {}", player, artifact.name);
                state.players[index].add_artifact(artifact);
            }
        }

        debug!("{} bought tile ({}, {}) for {} runes", player, self.x, self.y, price);
        Ok(true)
    }
}

/// Comprehensive test suite for tile purchases
#[cfg(test)]
mod tests {
    use super::*;
    use crate::actions::test_support::game;

    #[test]
    fn test_buy_unowned_tile() {
        let mut state = game();
        let before = state.players[0].runes();
        assert!(BuyTile { x: 0, y: 0 }.attempt(&mut state, "alice").unwrap());

        let tile = state.board.get(0, 0).unwrap();
        assert_eq!(tile.owner.as_deref(), Some("alice"));
        assert_eq!(state.players[0].runes(), before - tile.price);
        assert_eq!(state.players[0].owned_tiles, vec![(0, 0)]);
        assert_eq!(state.players[0].tiles_bought_this_round, 1);
    }

    #[test]
    fn test_second_buy_of_same_tile_is_rejected_without_change() {
        let mut state = game();
        assert!(BuyTile { x: 0, y: 0 }.attempt(&mut state, "alice").unwrap());
        let runes = state.players[0].runes();

        assert!(!BuyTile { x: 0, y: 0 }.attempt(&mut state, "alice").unwrap());
        assert_eq!(state.players[0].runes(), runes);
        assert_eq!(state.board.get(0, 0).unwrap().owner.as_deref(), Some("alice"));
        assert!(!BuyTile { x: 0, y: 0 }.attempt(&mut state, "bob").unwrap());
        assert!(state.players[1].owned_tiles.is_empty());
    }

    #[test]
    fn test_out_of_bounds_tile_rejected() {
        let mut state = game();
        assert!(!BuyTile { x: 99, y: 0 }.attempt(&mut state, "alice").unwrap());
    }

    #[test]
    fn test_per_round_limit() {
        let mut state = game();
        for x in 0..3 {
            assert!(BuyTile { x, y: 0 }.attempt(&mut state, "alice").unwrap());
        }
        assert!(!BuyTile { x: 3, y: 0 }.attempt(&mut state, "alice").unwrap());
        assert!(!state.board.get(3, 0).unwrap().is_purchased());
    }

    #[test]
    fn test_insufficient_runes_rejected() {
        let mut state = game();
        state.players[0].add_runes(-1000);
        assert!(!BuyTile { x: 0, y: 0 }.attempt(&mut state, "alice").unwrap());
        assert!(!state.board.get(0, 0).unwrap().is_purchased());
    }

    #[test]
    fn test_trap_springs_on_buyer() {
        let mut state = game();
        let trap = state.catalog().trap().unwrap();
        state.place_entity((0, 0), Entity::Structure(trap));
        let before = state.players[0].runes();
        let price = state.board.get(0, 0).unwrap().price;

        assert!(BuyTile { x: 0, y: 0 }.attempt(&mut state, "alice").unwrap());
        assert_eq!(state.players[0].runes(), before - price - 20);
        assert!(state.board.get(0, 0).unwrap().entity.is_none());
        assert!(state.players[0].entity_tiles.is_empty());
    }

    #[test]
    fn test_monument_tracked_on_purchase() {
        let mut state = game();
        let (x, y) = state.catalog().monuments()[0].tiles[0];
        assert!(BuyTile { x, y }.attempt(&mut state, "alice").unwrap());
        assert_eq!(state.players[0].entity_tiles, vec![(x, y)]);
    }

    #[test]
    fn test_hidden_artifact_goes_to_buyer() {
        let mut state = game();
        let artifact = state.catalog().artifact(40).cloned().unwrap();
        state.board.get_mut(0, 0).unwrap().artifact = Some(artifact);

        assert!(BuyTile { x: 0, y: 0 }.attempt(&mut state, "alice").unwrap());
        assert_eq!(state.players[0].artifacts.len(), 1);
        assert!(state.board.get(0, 0).unwrap().artifact.is_none());
    }
}

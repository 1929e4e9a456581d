//! Spending artifacts on tiles and players

use super::Action;
use crate::entity::{Artifact, ArtifactEffect, ArtifactTarget, Entity};
use crate::error::GameError;
use crate::game::GameState;
use log::info;
use shared::CommandTag;

/// The artifact `player` holds with this id, if it is aimed at `target`
fn held(state: &GameState, player: &str, id: u32, target: ArtifactTarget) -> Option<(usize, Artifact)> {
    let index = state.player_index(player)?;
    let artifact = state.players[index].artifact(id)?;
    (artifact.target == target).then(|| (index, artifact.clone()))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UseFieldArtifact {
    pub x: usize,
    pub y: usize,
    pub artifact_id: u32,
}

impl Action for UseFieldArtifact {
    fn tag(&self) -> CommandTag {
        CommandTag::UseFieldArtifact
    }

    /// Buff artifacts empower the entity standing on the tile; trap
    /// artifacts arm an unowned, empty tile. The artifact is consumed on
    /// success only.
    fn attempt(&self, state: &mut GameState, player: &str) -> Result<bool, GameError> {
        let Some((index, artifact)) = held(state, player, self.artifact_id, ArtifactTarget::Field) else {
            return Ok(false);
        };
        let Some(tile) = state.board.get(self.x, self.y) else {
            return Ok(false);
        };

        match artifact.effect {
            ArtifactEffect::Buff { buff, delta } => {
                if !tile.has_entity() || !tile.status.accepts(delta) {
                    return Ok(false);
                }
                if let Some(tile) = state.board.get_mut(self.x, self.y) {
                    tile.status.buff(buff, delta);
                }
            }
            ArtifactEffect::Trap => {
                if tile.is_purchased() || tile.has_entity() {
                    return Ok(false);
                }
                let trap = state.catalog.trap()?;
                state.place_entity((self.x, self.y), Entity::Structure(trap));
            }
            ArtifactEffect::Energy { .. } => return Ok(false),
        }

        state.players[index].take_artifact(self.artifact_id);
        info!("{} used {} on ({}, {})", player, artifact.name, self.x, self.y);
        Ok(true)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UsePlayerArtifact {
    pub artifact_id: u32,
    pub target: String,
}

impl Action for UsePlayerArtifact {
    fn tag(&self) -> CommandTag {
        CommandTag::UsePlayerArtifact
    }

    /// Applies the artifact to any seated player, the user included.
    /// Debuffs bounce off a warded target and the artifact is kept.
    fn attempt(&self, state: &mut GameState, player: &str) -> Result<bool, GameError> {
        let Some((index, artifact)) = held(state, player, self.artifact_id, ArtifactTarget::Player) else {
            return Ok(false);
        };
        let Some(target) = state.player_index(&self.target) else {
            return Ok(false);
        };

        let target = &mut state.players[target];
        match artifact.effect {
            ArtifactEffect::Energy { amount } => target.add_energy(amount),
            ArtifactEffect::Buff { buff, delta } => {
                if !target.status.accepts(delta) {
                    return Ok(false);
                }
                target.status.buff(buff, delta);
            }
            ArtifactEffect::Trap => return Ok(false),
        }

        state.players[index].take_artifact(self.artifact_id);
        info!("{} used {} on {}", player, artifact.name, self.target);
        Ok(true)
    }
}

//! Placing and using structures, plus their passive behaviours

use super::Action;
use crate::entity::{Coord, Entity, StructureEffect};
use crate::error::GameError;
use crate::game::GameState;
use crate::status::BuffType;
use log::{debug, info};
use shared::CommandTag;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlaceStructure {
    pub x: usize,
    pub y: usize,
    pub structure_id: u32,
}

impl Action for PlaceStructure {
    fn tag(&self) -> CommandTag {
        CommandTag::PlaceStructure
    }

    fn attempt(&self, state: &mut GameState, player: &str) -> Result<bool, GameError> {
        let Some(tile) = state.board.get(self.x, self.y) else {
            return Ok(false);
        };
        if !tile.is_owned_by(player) || tile.has_entity() {
            return Ok(false);
        }
        let Some(blueprint) = state.catalog.structure(self.structure_id) else {
            return Ok(false);
        };
        if !blueprint.purchasable || (blueprint.river_only && !tile.has_river) {
            return Ok(false);
        }
        let blueprint = blueprint.clone();

        let Some(owner) = state.player_mut(player) else {
            return Ok(false);
        };
        if !owner.buy(blueprint.price) {
            return Ok(false);
        }

        debug!("{} built {} on ({}, {})", player, blueprint.name, self.x, self.y);
        state.place_entity((self.x, self.y), Entity::Structure(blueprint));
        Ok(true)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UseStructure {
    pub x: usize,
    pub y: usize,
    pub structure_id: u32,
}

impl Action for UseStructure {
    fn tag(&self) -> CommandTag {
        CommandTag::UseStructure
    }

    /// Triggers the structure's active ability once per turn
    fn attempt(&self, state: &mut GameState, player: &str) -> Result<bool, GameError> {
        let Some(tile) = state.board.get(self.x, self.y) else {
            return Ok(false);
        };
        if !tile.is_owned_by(player) {
            return Ok(false);
        }
        let Some(structure) = tile.entity.as_ref().and_then(Entity::as_structure) else {
            return Ok(false);
        };
        if structure.id != self.structure_id || structure.activated || structure.disabled_turns > 0 {
            return Ok(false);
        }
        let effect = structure.effect.clone();
        let Some(index) = state.player_index(player) else {
            return Ok(false);
        };

        if !activate(state, index, (self.x, self.y), &effect)? {
            return Ok(false);
        }
        if let Some(s) = state
            .board
            .get_mut(self.x, self.y)
            .and_then(|t| t.entity.as_mut())
            .and_then(Entity::as_structure_mut)
        {
            s.activated = true;
        }
        Ok(true)
    }
}

/// Active ability of a structure; `Ok(false)` when it cannot fire
fn activate(
    state: &mut GameState,
    index: usize,
    coord: Coord,
    effect: &StructureEffect,
) -> Result<bool, GameError> {
    match *effect {
        StructureEffect::RuneTable { energy_cost, runes } => {
            let player = &mut state.players[index];
            if player.energy() < energy_cost {
                return Ok(false);
            }
            player.add_energy(-i32::from(energy_cost));
            player.add_runes(i64::from(runes));
            Ok(true)
        }
        StructureEffect::ArtifactWell => {
            if !state.players[index].has_artifact_room() {
                return Ok(false);
            }
            let Some(artifact) = state.catalog.random_artifact(&mut state.rng) else {
                return Ok(false);
            };
            debug!("{} drew {} from the well", state.players[index].name, artifact.name);
            Ok(state.players[index].add_artifact(artifact))
        }
        StructureEffect::Ward => {
            state.players[index].status.set(BuffType::Debuffable, 0.0);
            Ok(true)
        }
        StructureEffect::Smeltery { energy_cost, debuff } => forge(state, index, coord, energy_cost, debuff),
        StructureEffect::Income
        | StructureEffect::Tree { .. }
        | StructureEffect::Overgrowth
        | StructureEffect::Trap { .. } => Ok(false),
    }
}

/// Spends energy to forge artifacts; charges add extra artifacts and an
/// empowered smeltery also weakens every other player's rune generation.
fn forge(
    state: &mut GameState,
    index: usize,
    coord: Coord,
    energy_cost: u8,
    debuff: f64,
) -> Result<bool, GameError> {
    let player = &state.players[index];
    if player.energy() < energy_cost || !player.has_artifact_room() || state.catalog.artifacts().is_empty() {
        return Ok(false);
    }
    let Some(smeltery) = state
        .board
        .get_mut(coord.0, coord.1)
        .and_then(|t| t.entity.as_mut())
        .and_then(Entity::as_structure_mut)
    else {
        return Err(GameError::Internal("smeltery vanished while forging".into()));
    };
    let forged = 1 + usize::from(smeltery.charges);
    let empowered = smeltery.empowered;
    smeltery.charges = 0;
    smeltery.empowered = false;

    state.players[index].add_energy(-i32::from(energy_cost));
    for _ in 0..forged {
        if !state.players[index].has_artifact_room() {
            break;
        }
        if let Some(artifact) = state.catalog.random_artifact(&mut state.rng) {
            state.players[index].add_artifact(artifact);
        }
    }

    if empowered {
        for (i, other) in state.players.iter_mut().enumerate() {
            if i != index {
                other.status.buff(BuffType::RuneGeneration, debuff);
            }
        }
        info!("{}'s empowered smeltery weakened every rival", state.players[index].name);
    }
    Ok(true)
}

/// Passive behaviour run once per income step.
///
/// A ward clears the owner's `Debuffable` flag for good; losing the ward
/// does not restore it.
pub fn apply_passive(state: &mut GameState, index: usize, effect: &StructureEffect) {
    let Some(player) = state.players.get_mut(index) else {
        return;
    };
    match *effect {
        StructureEffect::Ward => player.status.set(BuffType::Debuffable, 0.0),
        StructureEffect::Tree { runes } => player.add_runes(i64::from(runes)),
        _ => {}
    }
}

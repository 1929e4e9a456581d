//! Statues: placement, upgrades and their deal / blessing / curse abilities
//!
//! A statue unlocks one ability per level:
//!
//! | Level | Ability |
//! |-------|---------|
//! | 1     | none    |
//! | 2     | deal    |
//! | 3     | blessing, or a curse with the configured curse chance |
//!
//! Abilities declare the parameters they need (`PLAYER`, `TILE`,
//! `ARTIFACT`); a missing parameter fails the action before anything
//! changes. Curses have no preconditions and always take effect.

use super::Action;
use crate::board::World;
use crate::entity::{Coord, Entity, StatueKind, StructureEffect};
use crate::error::GameError;
use crate::game::GameState;
use log::{debug, info};
use shared::CommandTag;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlaceStatue {
    pub x: usize,
    pub y: usize,
    pub statue_id: u32,
}

impl Action for PlaceStatue {
    fn tag(&self) -> CommandTag {
        CommandTag::PlaceStatue
    }

    /// Raises a level 1 statue; a player may only own one statue at a time
    fn attempt(&self, state: &mut GameState, player: &str) -> Result<bool, GameError> {
        let Some(tile) = state.board.get(self.x, self.y) else {
            return Ok(false);
        };
        if !tile.is_owned_by(player) || tile.has_entity() {
            return Ok(false);
        }
        let Some(blueprint) = state.catalog.statue(self.statue_id).cloned() else {
            return Ok(false);
        };
        if !state.entity_tiles_where(player, Entity::is_statue).is_empty() {
            return Ok(false);
        }
        let Some(owner) = state.player_mut(player) else {
            return Ok(false);
        };
        if !owner.buy(blueprint.price) {
            return Ok(false);
        }

        debug!("{} raised {} on ({}, {})", player, blueprint.name, self.x, self.y);
        state.place_entity((self.x, self.y), Entity::Statue(blueprint));
        Ok(true)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpgradeStatue {
    pub x: usize,
    pub y: usize,
    pub statue_id: u32,
}

impl Action for UpgradeStatue {
    fn tag(&self) -> CommandTag {
        CommandTag::UpgradeStatue
    }

    fn attempt(&self, state: &mut GameState, player: &str) -> Result<bool, GameError> {
        let max_level = state.config.max_statue_level;
        let Some(tile) = state.board.get(self.x, self.y) else {
            return Ok(false);
        };
        if !tile.is_owned_by(player) {
            return Ok(false);
        }
        let Some(statue) = tile.entity.as_ref().and_then(Entity::as_statue) else {
            return Ok(false);
        };
        if statue.id != self.statue_id || statue.level >= max_level {
            return Ok(false);
        }
        let price = statue.upgrade_price;

        let Some(owner) = state.player_mut(player) else {
            return Ok(false);
        };
        if !owner.buy(price) {
            return Ok(false);
        }
        if let Some(statue) = statue_mut(state, (self.x, self.y)) {
            statue.level += 1;
            info!("{} upgraded {} to level {}", player, statue.name, statue.level);
        }
        Ok(true)
    }
}

/// Targets of a statue ability, written `PLAYER:name;TILE:x,y;ARTIFACT:id`.
///
/// Every part is optional; `NONE` or an empty string means no targets.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatueParams {
    pub player: Option<String>,
    pub tile: Option<Coord>,
    pub artifact: Option<u32>,
}

impl FromStr for StatueParams {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut params = StatueParams::default();
        let s = s.trim();
        if s.is_empty() || s.eq_ignore_ascii_case("NONE") {
            return Ok(params);
        }

        for part in s.split(';').filter(|p| !p.trim().is_empty()) {
            let (key, value) = part
                .split_once(':')
                .ok_or_else(|| format!("missing ':' in {:?}", part))?;
            let value = value.trim();
            match key.trim().to_ascii_uppercase().as_str() {
                "PLAYER" => params.player = Some(value.to_string()),
                "TILE" => {
                    let (x, y) = value
                        .split_once(',')
                        .ok_or_else(|| format!("tile {:?} is not x,y", value))?;
                    let x = x.trim().parse().map_err(|_| format!("bad x in {:?}", value))?;
                    let y = y.trim().parse().map_err(|_| format!("bad y in {:?}", value))?;
                    params.tile = Some((x, y));
                }
                "ARTIFACT" => {
                    params.artifact =
                        Some(value.parse().map_err(|_| format!("bad artifact id {:?}", value))?);
                }
                other => return Err(format!("unknown statue parameter {}", other)),
            }
        }
        Ok(params)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ability {
    Deal,
    Blessing,
    Curse,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Need {
    Player,
    Tile,
    Artifact,
}

fn requirements(kind: StatueKind, ability: Ability) -> &'static [Need] {
    use Ability::*;
    use StatueKind::*;
    match (kind, ability) {
        (Freyr, Deal) | (Freyja, Blessing) | (Dwarf, Deal) | (Dwarf, Blessing) => &[Need::Tile],
        (Hel, Deal) | (Surtr, Deal) => &[Need::Player],
        (Jormungandr, Deal) | (Loki, Deal) => &[Need::Player, Need::Tile],
        (Nidhoggr, Deal) => &[Need::Artifact],
        _ => &[],
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UseStatue {
    pub x: usize,
    pub y: usize,
    pub statue_id: u32,
    pub params: StatueParams,
}

impl Action for UseStatue {
    fn tag(&self) -> CommandTag {
        CommandTag::UseStatue
    }

    fn attempt(&self, state: &mut GameState, player: &str) -> Result<bool, GameError> {
        let coord = (self.x, self.y);
        let Some(tile) = state.board.get(self.x, self.y) else {
            return Ok(false);
        };
        if !tile.is_owned_by(player) {
            return Ok(false);
        }
        let Some(statue) = tile.entity.as_ref().and_then(Entity::as_statue) else {
            return Ok(false);
        };
        if statue.id != self.statue_id || statue.activated || statue.disabled_turns > 0 {
            return Ok(false);
        }
        let (kind, level, runes) = (statue.kind, statue.level, statue.runes);
        let Some(index) = state.player_index(player) else {
            return Ok(false);
        };

        // Level 3 params must cover both outcomes; the curse roll comes after
        let possible: &[Ability] = match level {
            0 | 1 => return Ok(false),
            2 => &[Ability::Deal],
            _ => &[Ability::Blessing, Ability::Curse],
        };
        let params = &self.params;
        let missing = possible.iter().any(|&ability| {
            requirements(kind, ability).iter().any(|need| match need {
                Need::Player => params.player.is_none(),
                Need::Tile => params.tile.is_none(),
                Need::Artifact => params.artifact.is_none(),
            })
        });
        if missing {
            return Ok(false);
        }

        let ability = if level == 2 {
            Ability::Deal
        } else {
            let curse_chance = state.config.curse_chance;
            if state.roll(curse_chance) {
                Ability::Curse
            } else {
                Ability::Blessing
            }
        };

        let invocation = Invocation {
            index,
            player: player.to_string(),
            statue: coord,
            runes,
            params,
        };
        let applied = match kind {
            StatueKind::Freyr => freyr(state, &invocation, ability)?,
            StatueKind::Freyja => freyja(state, &invocation, ability)?,
            StatueKind::Hel => hel(state, &invocation, ability),
            StatueKind::Jormungandr => jormungandr(state, &invocation, ability),
            StatueKind::Dwarf => dwarf(state, &invocation, ability),
            StatueKind::Loki => loki(state, &invocation, ability)?,
            StatueKind::Surtr => surtr(state, &invocation, ability),
            StatueKind::Nidhoggr => nidhoggr(state, &invocation, ability),
        };
        if !applied {
            return Ok(false);
        }

        info!("{} invoked {:?} of {:?}", player, ability, kind);
        if let Some(statue) = statue_mut(state, coord) {
            statue.activated = true;
        }
        Ok(true)
    }
}

/// Context shared by every ability
struct Invocation<'a> {
    index: usize,
    player: String,
    statue: Coord,
    runes: u32,
    params: &'a StatueParams,
}

impl Invocation<'_> {
    /// Resolves `PLAYER:` to a rival's seat
    fn rival(&self, state: &GameState) -> Option<usize> {
        let name = self.params.player.as_deref()?;
        state.player_index(name).filter(|&i| i != self.index)
    }
}

fn statue_mut(state: &mut GameState, coord: Coord) -> Option<&mut crate::entity::Statue> {
    state
        .board
        .get_mut(coord.0, coord.1)
        .and_then(|t| t.entity.as_mut())
        .and_then(Entity::as_statue_mut)
}

fn is_tree(entity: &Entity) -> bool {
    entity
        .as_structure()
        .map_or(false, |s| matches!(s.effect, StructureEffect::Tree { .. }))
}

fn is_smeltery(entity: &Entity) -> bool {
    entity
        .as_structure()
        .map_or(false, |s| matches!(s.effect, StructureEffect::Smeltery { .. }))
}

fn is_structure_or_statue(entity: &Entity) -> bool {
    entity.is_structure() || entity.is_statue()
}

/// Tiles anywhere on the board whose entity matches
fn board_tiles_where(state: &GameState, pred: impl Fn(&Entity) -> bool) -> Vec<Coord> {
    state
        .board
        .tiles()
        .filter(|t| t.entity.as_ref().map_or(false, &pred))
        .map(|t| t.coord())
        .collect()
}

/// Removes one random entity of `player` matching `pred`
fn destroy_random(state: &mut GameState, player: &str, pred: impl Fn(&Entity) -> bool) -> bool {
    let candidates = state.entity_tiles_where(player, pred);
    match state.pick(&candidates) {
        Some(coord) => state.remove_entity(coord).is_some(),
        None => false,
    }
}

/// Swaps whatever stands on the tile for overgrowth and drains its value
fn overgrow(state: &mut GameState, coord: Coord) -> Result<(), GameError> {
    let overgrowth = state.catalog.overgrowth()?;
    state.remove_entity(coord);
    state.place_entity(coord, Entity::Structure(overgrowth));
    if let Some(tile) = state.board.get_mut(coord.0, coord.1) {
        tile.resource_value = 0;
    }
    Ok(())
}

fn freyr(state: &mut GameState, inv: &Invocation, ability: Ability) -> Result<bool, GameError> {
    match ability {
        Ability::Deal => {
            let Some((x, y)) = inv.params.tile else {
                return Ok(false);
            };
            let energy = state.players[inv.index].energy();
            let plantable = state
                .board
                .get(x, y)
                .map_or(false, |t| t.is_owned_by(&inv.player) && !t.has_entity());
            if !plantable || energy == 0 {
                return Ok(false);
            }
            let tree = state.catalog.tree()?;
            state.players[inv.index].add_energy(-i32::from(energy));
            state.place_entity((x, y), Entity::Structure(tree));
            Ok(true)
        }
        Ability::Blessing => {
            let targets: Vec<Coord> = state
                .board
                .tiles()
                .filter(|t| t.has_river && !t.has_entity())
                .map(|t| t.coord())
                .collect();
            if targets.is_empty() {
                return Ok(false);
            }
            let tree = state.catalog.tree()?;
            for coord in targets {
                state.place_entity(coord, Entity::Structure(tree.clone()));
            }
            Ok(true)
        }
        Ability::Curse => {
            overgrow(state, inv.statue)?;
            Ok(true)
        }
    }
}

fn freyja(state: &mut GameState, inv: &Invocation, ability: Ability) -> Result<bool, GameError> {
    match ability {
        Ability::Deal => {
            let player = &state.players[inv.index];
            if !player.has_artifact_room() || !player.can_afford(inv.runes) {
                return Ok(false);
            }
            let Some(artifact) = state.catalog.random_artifact(&mut state.rng) else {
                return Ok(false);
            };
            let player = &mut state.players[inv.index];
            player.buy(inv.runes);
            Ok(player.add_artifact(artifact))
        }
        Ability::Blessing => {
            let Some(coord) = inv.params.tile else {
                return Ok(false);
            };
            Ok(state.grant_tile(coord, &inv.player))
        }
        Ability::Curse => {
            let target = state.players[inv.index]
                .owned_tiles
                .iter()
                .copied()
                .find(|&(x, y)| state.board.get(x, y).map_or(false, |t| !t.has_entity()));
            if let Some(coord) = target {
                overgrow(state, coord)?;
            }
            Ok(true)
        }
    }
}

fn hel(state: &mut GameState, inv: &Invocation, ability: Ability) -> bool {
    match ability {
        Ability::Deal => {
            let Some(rival) = inv.rival(state) else {
                return false;
            };
            let rival_name = state.players[rival].name.clone();
            let Some(&(x, y)) = state.entity_tiles_where(&rival_name, Entity::is_statue).first() else {
                return false;
            };
            if let Some(entity) = state.board.get_mut(x, y).and_then(|t| t.entity.as_mut()) {
                entity.disable(1);
            }
            let own = state.entity_tiles_where(&inv.player, Entity::is_structure);
            if let Some((x, y)) = state.pick(&own) {
                if let Some(entity) = state.board.get_mut(x, y).and_then(|t| t.entity.as_mut()) {
                    entity.disable(2);
                }
            }
            true
        }
        Ability::Blessing => {
            let rivals: Vec<usize> = (0..state.players.len())
                .filter(|&i| i != inv.index)
                .filter(|&i| {
                    !state
                        .entity_tiles_where(&state.players[i].name, Entity::is_statue)
                        .is_empty()
                })
                .collect();
            let Some(victim) = state.pick(&rivals) else {
                return false;
            };
            let victim = state.players[victim].name.clone();
            destroy_random(state, &victim, Entity::is_statue)
        }
        Ability::Curse => {
            state.remove_entity(inv.statue);
            true
        }
    }
}

fn jormungandr(state: &mut GameState, inv: &Invocation, ability: Ability) -> bool {
    match ability {
        Ability::Deal => {
            let (Some(rival), Some((x, y))) = (inv.rival(state), inv.params.tile) else {
                return false;
            };
            let sacrifice = state.board.get(x, y).map_or(false, |t| {
                t.is_owned_by(&inv.player) && t.entity.as_ref().map_or(false, Entity::is_structure)
            });
            let rival_name = state.players[rival].name.clone();
            if !sacrifice || state.entity_tiles_where(&rival_name, Entity::is_structure).is_empty() {
                return false;
            }
            state.remove_entity((x, y));
            destroy_random(state, &rival_name, Entity::is_structure)
        }
        Ability::Blessing => {
            let rivals: Vec<String> = state
                .players
                .iter()
                .enumerate()
                .filter(|(i, _)| *i != inv.index)
                .map(|(_, p)| p.name.clone())
                .collect();
            let mut destroyed = false;
            for rival in rivals {
                destroyed |= destroy_random(state, &rival, Entity::is_structure);
            }
            destroyed
        }
        Ability::Curse => {
            destroy_random(state, &inv.player, Entity::is_structure);
            true
        }
    }
}

fn dwarf(state: &mut GameState, inv: &Invocation, ability: Ability) -> bool {
    let Some(forge) = inv.params.tile else {
        if ability == Ability::Curse {
            destroy_random(state, &inv.player, is_smeltery);
            return true;
        }
        return false;
    };
    let owns_smeltery = state.board.get(forge.0, forge.1).map_or(false, |t| {
        t.is_owned_by(&inv.player) && t.entity.as_ref().map_or(false, is_smeltery)
    });

    match ability {
        Ability::Deal | Ability::Blessing if !owns_smeltery => false,
        Ability::Deal => {
            let others: Vec<Coord> = state
                .entity_tiles_where(&inv.player, Entity::is_structure)
                .into_iter()
                .filter(|&c| c != forge)
                .collect();
            if let Some((x, y)) = state.pick(&others) {
                if let Some(entity) = state.board.get_mut(x, y).and_then(|t| t.entity.as_mut()) {
                    entity.disable(1);
                }
            }
            if let Some(smeltery) = state
                .board
                .get_mut(forge.0, forge.1)
                .and_then(|t| t.entity.as_mut())
                .and_then(Entity::as_structure_mut)
            {
                smeltery.charges = smeltery.charges.saturating_add(1);
            }
            true
        }
        Ability::Blessing => {
            if let Some(smeltery) = state
                .board
                .get_mut(forge.0, forge.1)
                .and_then(|t| t.entity.as_mut())
                .and_then(Entity::as_structure_mut)
            {
                smeltery.empowered = true;
            }
            true
        }
        Ability::Curse => {
            destroy_random(state, &inv.player, is_smeltery);
            true
        }
    }
}

fn loki(state: &mut GameState, inv: &Invocation, ability: Ability) -> Result<bool, GameError> {
    match ability {
        Ability::Deal => {
            let (Some(rival), Some((x, y))) = (inv.rival(state), inv.params.tile) else {
                return Ok(false);
            };
            let free = state
                .board
                .get(x, y)
                .map_or(false, |t| !t.is_purchased() && !t.has_entity());
            if !free
                || state.players[rival].artifacts.is_empty()
                || !state.players[inv.index].has_artifact_room()
            {
                return Ok(false);
            }
            let trap = state.catalog.trap()?;
            state.place_entity((x, y), Entity::Structure(trap));

            let ids: Vec<u32> = state.players[rival].artifacts.iter().map(|a| a.id).collect();
            if let Some(stolen) = state
                .pick(&ids)
                .and_then(|id| state.players[rival].take_artifact(id))
            {
                debug!("{} stole {}", inv.player, stolen.name);
                state.players[inv.index].add_artifact(stolen);
            }
            Ok(true)
        }
        Ability::Blessing => {
            let victims: Vec<usize> = (0..state.players.len())
                .filter(|&i| i != inv.index && state.players[i].runes() > 0)
                .collect();
            let Some(victim) = state.pick(&victims) else {
                return Ok(false);
            };
            let stolen = state.players[victim].runes().min(inv.runes);
            state.players[victim].add_runes(-i64::from(stolen));
            state.players[inv.index].add_runes(i64::from(stolen));
            Ok(true)
        }
        Ability::Curse => {
            let trap = state.catalog.trap()?;
            let mut free = state.board.free_tiles();
            for _ in 0..2 {
                let Some(coord) = state.pick(&free) else {
                    break;
                };
                free.retain(|&c| c != coord);
                state.place_entity(coord, Entity::Structure(trap.clone()));
            }
            Ok(true)
        }
    }
}

fn surtr(state: &mut GameState, inv: &Invocation, ability: Ability) -> bool {
    match ability {
        Ability::Deal => {
            let Some(rival) = inv.rival(state) else {
                return false;
            };
            let rival_name = state.players[rival].name.clone();
            destroy_random(state, &rival_name, is_structure_or_statue)
        }
        Ability::Blessing => {
            let mut free: Vec<Coord> = state
                .board
                .free_tiles()
                .into_iter()
                .filter(|&(x, y)| {
                    state
                        .board
                        .get(x, y)
                        .map_or(false, |t| t.world == World::Muspelheim)
                })
                .collect();
            let mut claimed = false;
            for _ in 0..2 {
                let Some(coord) = state.pick(&free) else {
                    break;
                };
                free.retain(|&c| c != coord);
                claimed |= state.grant_tile(coord, &inv.player);
            }
            claimed
        }
        Ability::Curse => {
            destroy_random(state, &inv.player, is_structure_or_statue);
            true
        }
    }
}

fn nidhoggr(state: &mut GameState, inv: &Invocation, ability: Ability) -> bool {
    match ability {
        Ability::Deal => {
            let Some(artifact) = inv.params.artifact else {
                return false;
            };
            let trees = board_tiles_where(state, is_tree);
            if state.players[inv.index].artifact(artifact).is_none() || trees.is_empty() {
                return false;
            }
            state.players[inv.index].take_artifact(artifact);
            if let Some(coord) = state.pick(&trees) {
                state.remove_entity(coord);
            }
            true
        }
        Ability::Blessing => {
            let trees = board_tiles_where(state, is_tree);
            if trees.is_empty() {
                return false;
            }
            for coord in trees {
                state.remove_entity(coord);
            }
            true
        }
        Ability::Curse => {
            destroy_random(state, &inv.player, Entity::is_structure);
            destroy_random(state, &inv.player, Entity::is_structure);
            true
        }
    }
}

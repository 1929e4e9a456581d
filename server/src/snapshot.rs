//! Text rendering of the full game state
//!
//! A snapshot is a single protocol line:
//!
//! ```text
//! SYNC$META:<round>,<index>,<active>|PLAYERS:<player>;...|BOARD:<tile>;...
//! ```
//!
//! It is rendered while the caller holds at least a read guard, so every
//! snapshot reflects a state between two complete actions. The `GSTS`,
//! `LEAD` and `GPRC` query answers are rendered here as well.

use crate::board::Tile;
use crate::entity::Entity;
use crate::game::GameState;
use crate::player::Player;
use shared::{CommandTag, DELIMITER};
use std::fmt::Write;

/// Renders the state as a `SYNC` line
pub fn render(state: &GameState) -> String {
    let mut out = String::with_capacity(4096);
    out.push_str(CommandTag::Synchronize.code());
    out.push(DELIMITER);
    write_state(&mut out, state);
    out
}

/// Answer to `GSTS`: the snapshot body behind an `OK$GSTS` prefix
pub fn render_status(state: &GameState) -> String {
    let mut out = String::with_capacity(4096);
    let _ = write!(
        out,
        "{}{d}{}{d}",
        CommandTag::Ok,
        CommandTag::GetStatus,
        d = DELIMITER
    );
    write_state(&mut out, state);
    out
}

fn write_state(out: &mut String, state: &GameState) {
    let active = state
        .active_player()
        .map_or("null", |p| p.name.as_str());
    let index = state
        .turn
        .active_index()
        .map_or_else(|| "-1".to_string(), |i| i.to_string());
    let _ = write!(out, "META:{},{},{}|", state.turn.round(), index, active);

    out.push_str("PLAYERS:");
    for player in &state.players {
        write_player(out, state, player);
        out.push(';');
    }

    out.push_str("|BOARD:");
    for tile in state.board.tiles() {
        write_tile(out, tile);
        out.push(';');
    }
}

fn write_player(out: &mut String, state: &GameState, player: &Player) {
    let tiles: Vec<String> = player
        .owned_tiles
        .iter()
        .filter_map(|&(x, y)| state.board.get(x, y))
        .map(|t| t.id.to_string())
        .collect();
    let artifacts: Vec<String> = player.artifacts.iter().map(|a| a.id.to_string()).collect();
    let entities: Vec<String> = player
        .entity_tiles
        .iter()
        .filter_map(|&(x, y)| state.board.get(x, y))
        .filter_map(|t| t.entity.as_ref())
        .map(|e| e.id().to_string())
        .collect();

    let _ = write!(
        out,
        "{}{{R:{},E:{},T:[{}],A:[{}],PE:[{}],ST:{{{}}}}}",
        player.name,
        player.runes(),
        player.energy(),
        tiles.join(","),
        artifacts.join(","),
        entities.join(","),
        player.status
    );
}

fn write_tile(out: &mut String, tile: &Tile) {
    let _ = write!(
        out,
        "{},{}{{O={}|P={}|ENT=",
        tile.x,
        tile.y,
        tile.owner.as_deref().unwrap_or("null"),
        tile.price
    );
    match &tile.entity {
        None => out.push_str("NONE"),
        Some(Entity::Structure(s)) => {
            let _ = write!(
                out,
                "STR,{},DI={},AC={}",
                s.id,
                u8::from(s.disabled_turns > 0),
                u8::from(s.activated)
            );
        }
        Some(Entity::Statue(s)) => {
            let _ = write!(
                out,
                "STA,{},DI={},AC={},LV={}",
                s.id,
                u8::from(s.disabled_turns > 0),
                u8::from(s.activated),
                s.level
            );
        }
        Some(Entity::Monument(m)) => {
            let _ = write!(out, "MON,{},DI={}", m.id, u8::from(m.disabled_turns > 0));
        }
    }
    let artifact = tile
        .artifact
        .as_ref()
        .map_or_else(|| "null".to_string(), |a| a.id.to_string());
    let _ = write!(
        out,
        "|AR={}|W={}|PU={}|RV={}|HR={}|ID={}|ST={}}}",
        artifact,
        tile.world,
        u8::from(tile.is_purchased()),
        tile.resource_value,
        u8::from(tile.has_river),
        tile.id,
        tile.status
    );
}

/// Renders final standings as `ENDG$name$runes$name$runes...`
pub fn render_standings(standings: &[(String, u32)]) -> String {
    let mut out = String::from(CommandTag::EndGame.code());
    write_standings(&mut out, standings);
    out
}

/// Answer to `LEAD`: the current standings, richest first
pub fn render_leaderboard(standings: &[(String, u32)]) -> String {
    let mut out = format!("{}{}{}", CommandTag::Ok, DELIMITER, CommandTag::Leaderboard);
    write_standings(&mut out, standings);
    out
}

fn write_standings(out: &mut String, standings: &[(String, u32)]) {
    for (name, runes) in standings {
        let _ = write!(out, "{d}{}{d}{}", name, runes, d = DELIMITER);
    }
}

/// Answer to `GPRC`: what `player` would pay right now.
///
/// `OK$GPRC$TILE:<price>|STR:<id>,<price>;...|STA:<id>,<price>,<upgrade>;...`
///
/// Prices go through the player's shop multiplier when they are seated and
/// are listed at catalog value otherwise. Structures that can't be bought
/// are left out.
pub fn render_prices(state: &GameState, player: &str) -> String {
    let price = |base: u32| state.player(player).map_or(base, |p| p.adjusted_price(base));
    let mut out = format!("{}{}{}", CommandTag::Ok, DELIMITER, CommandTag::GetPrices);
    let _ = write!(out, "{}TILE:{}|STR:", DELIMITER, price(state.config().tile_price));
    for structure in state.catalog().structures().iter().filter(|s| s.purchasable) {
        let _ = write!(out, "{},{};", structure.id, price(structure.price));
    }
    out.push_str("|STA:");
    for statue in state.catalog().statues() {
        let _ = write!(
            out,
            "{},{},{};",
            statue.id,
            price(statue.price),
            price(statue.upgrade_price)
        );
    }
    out
}

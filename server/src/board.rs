//! The game board: a fixed grid of purchasable tiles spread over the nine worlds

use crate::catalog::Catalog;
use crate::config::GameConfig;
use crate::entity::{Artifact, Coord, Entity};
use crate::status::Status;
use log::debug;
use rand::Rng;
use std::fmt;

pub const BOARD_WIDTH: usize = 8;
pub const BOARD_HEIGHT: usize = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum World {
    Alfheim,
    Asgard,
    Muspelheim,
    Vanaheim,
    Midgard,
    Jotunheim,
    Niflheim,
    Helheim,
    Svartalfheim,
}

impl World {
    pub fn name(self) -> &'static str {
        match self {
            World::Alfheim => "ALFHEIM",
            World::Asgard => "ASGARD",
            World::Muspelheim => "MUSPELHEIM",
            World::Vanaheim => "VANAHEIM",
            World::Midgard => "MIDGARD",
            World::Jotunheim => "JOTUNHEIM",
            World::Niflheim => "NIFLHEIM",
            World::Helheim => "HELHEIM",
            World::Svartalfheim => "SVARTALFHEIM",
        }
    }
}

impl fmt::Display for World {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

use World::*;

/// Region of every tile, indexed `[y][x]`
const WORLD_MAP: [[World; BOARD_WIDTH]; BOARD_HEIGHT] = [
    [Alfheim, Alfheim, Alfheim, Asgard, Asgard, Asgard, Muspelheim, Muspelheim],
    [Alfheim, Alfheim, Asgard, Asgard, Asgard, Asgard, Muspelheim, Muspelheim],
    [Vanaheim, Vanaheim, Vanaheim, Asgard, Midgard, Midgard, Muspelheim, Muspelheim],
    [Vanaheim, Vanaheim, Vanaheim, Midgard, Midgard, Midgard, Muspelheim, Muspelheim],
    [Vanaheim, Jotunheim, Vanaheim, Vanaheim, Niflheim, Helheim, Svartalfheim, Svartalfheim],
    [Jotunheim, Jotunheim, Niflheim, Niflheim, Helheim, Helheim, Helheim, Svartalfheim],
    [Jotunheim, Jotunheim, Niflheim, Niflheim, Niflheim, Helheim, Helheim, Helheim],
];

/// The river runs from the western edge through Vanaheim
fn river_at(x: usize, y: usize) -> bool {
    (y == 2 && x <= 2) || (y == 3 && x <= 1) || (y == 4 && x == 0)
}

#[derive(Debug, Clone, PartialEq)]
pub struct Tile {
    pub x: usize,
    pub y: usize,
    pub id: usize,
    pub price: u32,
    pub world: World,
    /// Name of the owning player; `Some` exactly when the tile is purchased
    pub owner: Option<String>,
    pub resource_value: u32,
    pub entity: Option<Entity>,
    pub artifact: Option<Artifact>,
    pub has_river: bool,
    pub status: Status,
}

impl Tile {
    pub fn coord(&self) -> Coord {
        (self.x, self.y)
    }

    pub fn is_purchased(&self) -> bool {
        self.owner.is_some()
    }

    pub fn is_owned_by(&self, player: &str) -> bool {
        self.owner.as_deref() == Some(player)
    }

    pub fn has_entity(&self) -> bool {
        self.entity.is_some()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Board {
    tiles: Vec<Tile>,
}

impl Board {
    /// Builds a fresh board.
    ///
    /// Regions and rivers are fixed; resource values and hidden artifacts
    /// are rolled from `rng`. Monuments are placed on every coordinate their
    /// catalog entry lists.
    pub fn generate<R: Rng + ?Sized>(config: &GameConfig, catalog: &Catalog, rng: &mut R) -> Self {
        let mut tiles = Vec::with_capacity(BOARD_WIDTH * BOARD_HEIGHT);
        let min_value = config.min_resource_value;
        let max_value = config.max_resource_value.max(min_value);

        for (y, row) in WORLD_MAP.iter().enumerate() {
            for (x, world) in row.iter().enumerate() {
                let artifact = if rng.gen_bool((config.artifact_chance / 100.0).clamp(0.0, 1.0)) {
                    catalog.random_artifact(rng)
                } else {
                    None
                };

                tiles.push(Tile {
                    x,
                    y,
                    id: y * BOARD_WIDTH + x,
                    price: config.tile_price,
                    world: *world,
                    owner: None,
                    resource_value: rng.gen_range(min_value..=max_value),
                    entity: None,
                    artifact,
                    has_river: river_at(x, y),
                    status: Status::new(),
                });
            }
        }

        let mut board = Board { tiles };
        for monument in catalog.monuments() {
            for &(x, y) in &monument.tiles {
                if let Some(tile) = board.get_mut(x, y) {
                    tile.entity = Some(Entity::Monument(monument.clone()));
                }
            }
        }

        debug!(
            "Generated board with {} tiles, {} hidden artifacts",
            board.tiles.len(),
            board.tiles.iter().filter(|t| t.artifact.is_some()).count()
        );
        board
    }

    pub fn get(&self, x: usize, y: usize) -> Option<&Tile> {
        if x < BOARD_WIDTH && y < BOARD_HEIGHT {
            self.tiles.get(y * BOARD_WIDTH + x)
        } else {
            None
        }
    }

    pub fn get_mut(&mut self, x: usize, y: usize) -> Option<&mut Tile> {
        if x < BOARD_WIDTH && y < BOARD_HEIGHT {
            self.tiles.get_mut(y * BOARD_WIDTH + x)
        } else {
            None
        }
    }

    pub fn tiles(&self) -> impl Iterator<Item = &Tile> {
        self.tiles.iter()
    }

    /// Coordinates of tiles that nobody owns and that carry no entity
    pub fn free_tiles(&self) -> Vec<Coord> {
        self.tiles
            .iter()
            .filter(|t| !t.is_purchased() && !t.has_entity())
            .map(Tile::coord)
            .collect()
    }

    /// Orthogonal neighbours of `(x, y)` that lie on the board
    pub fn adjacent(&self, x: usize, y: usize) -> Vec<Coord> {
        let mut neighbours = Vec::with_capacity(4);
        if x >= BOARD_WIDTH || y >= BOARD_HEIGHT {
            return neighbours;
        }
        if x > 0 {
            neighbours.push((x - 1, y));
        }
        if y > 0 {
            neighbours.push((x, y - 1));
        }
        if x + 1 < BOARD_WIDTH {
            neighbours.push((x + 1, y));
        }
        if y + 1 < BOARD_HEIGHT {
            neighbours.push((x, y + 1));
        }
        neighbours
    }
}

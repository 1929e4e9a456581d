//! Purchasable and found entities that can sit on a tile, plus artifacts.
//!
//! Blueprints are deserialized from the catalog; the runtime fields
//! (`activated`, `disabled_turns`, statue `level`, smeltery charges) are
//! skipped by serde and start from their neutral values.

use crate::status::BuffType;
use serde::Deserialize;

/// Board coordinate as `(x, y)`
pub type Coord = (usize, usize);

fn first_level() -> u8 {
    1
}

fn purchasable_default() -> bool {
    true
}

/// Behaviour attached to a structure
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StructureEffect {
    /// Spends energy for a burst of runes
    RuneTable { energy_cost: u8, runes: u32 },
    /// Yields a random artifact
    ArtifactWell,
    /// Shields the owner from debuffs
    Ward,
    /// No behaviour beyond its resource value
    Income,
    /// Forges artifacts from energy; can be charged and empowered by a statue
    Smeltery { energy_cost: u8, debuff: f64 },
    Tree { runes: u32 },
    Overgrowth,
    /// Fires once when the tile is bought
    Trap { runes_lost: u32 },
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Structure {
    pub id: u32,
    pub name: String,
    pub price: u32,
    pub resource_value: u32,
    #[serde(default)]
    pub river_only: bool,
    #[serde(default = "purchasable_default")]
    pub purchasable: bool,
    pub effect: StructureEffect,
    #[serde(skip)]
    pub activated: bool,
    #[serde(skip)]
    pub disabled_turns: u8,
    #[serde(skip)]
    pub charges: u8,
    #[serde(skip)]
    pub empowered: bool,
}

impl Structure {
    /// Whether the behaviour only fires on purchase and never during income
    pub fn fires_on_purchase(&self) -> bool {
        matches!(self.effect, StructureEffect::Trap { .. })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatueKind {
    Freyr,
    Freyja,
    Hel,
    Jormungandr,
    Dwarf,
    Loki,
    Surtr,
    Nidhoggr,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Statue {
    pub id: u32,
    pub name: String,
    pub kind: StatueKind,
    pub price: u32,
    pub upgrade_price: u32,
    /// Rune amount some abilities pay or steal
    #[serde(default)]
    pub runes: u32,
    #[serde(skip, default = "first_level")]
    pub level: u8,
    #[serde(skip)]
    pub activated: bool,
    #[serde(skip)]
    pub disabled_turns: u8,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Monument {
    pub id: u32,
    pub name: String,
    pub runes: u32,
    /// Whether owning every tile doubles the income
    #[serde(default)]
    pub set: bool,
    pub tiles: Vec<Coord>,
    #[serde(skip)]
    pub disabled_turns: u8,
}

/// Anything that can be attached to a tile
#[derive(Debug, Clone, PartialEq)]
pub enum Entity {
    Structure(Structure),
    Statue(Statue),
    Monument(Monument),
}

impl Entity {
    pub fn id(&self) -> u32 {
        match self {
            Entity::Structure(s) => s.id,
            Entity::Statue(s) => s.id,
            Entity::Monument(m) => m.id,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Entity::Structure(s) => &s.name,
            Entity::Statue(s) => &s.name,
            Entity::Monument(m) => &m.name,
        }
    }

    pub fn is_structure(&self) -> bool {
        matches!(self, Entity::Structure(_))
    }

    pub fn is_statue(&self) -> bool {
        matches!(self, Entity::Statue(_))
    }

    pub fn is_monument(&self) -> bool {
        matches!(self, Entity::Monument(_))
    }

    pub fn resource_value(&self) -> u32 {
        match self {
            Entity::Structure(s) => s.resource_value,
            Entity::Statue(_) => 0,
            Entity::Monument(m) => m.runes,
        }
    }

    /// Statue level; other entities report level 0
    pub fn level(&self) -> u8 {
        match self {
            Entity::Statue(s) => s.level,
            _ => 0,
        }
    }

    pub fn disabled_turns(&self) -> u8 {
        match self {
            Entity::Structure(s) => s.disabled_turns,
            Entity::Statue(s) => s.disabled_turns,
            Entity::Monument(m) => m.disabled_turns,
        }
    }

    pub fn is_disabled(&self) -> bool {
        self.disabled_turns() > 0
    }

    pub fn is_activated(&self) -> bool {
        match self {
            Entity::Structure(s) => s.activated,
            Entity::Statue(s) => s.activated,
            Entity::Monument(_) => false,
        }
    }

    /// Disables the entity for at least `turns` upkeeps
    pub fn disable(&mut self, turns: u8) {
        let counter = match self {
            Entity::Structure(s) => &mut s.disabled_turns,
            Entity::Statue(s) => &mut s.disabled_turns,
            Entity::Monument(m) => &mut m.disabled_turns,
        };
        *counter = (*counter).max(turns);
    }

    /// Upkeep: clears the activation flag and counts down disabled turns
    pub fn upkeep(&mut self) {
        match self {
            Entity::Structure(s) => {
                s.activated = false;
                s.disabled_turns = s.disabled_turns.saturating_sub(1);
            }
            Entity::Statue(s) => {
                s.activated = false;
                s.disabled_turns = s.disabled_turns.saturating_sub(1);
            }
            Entity::Monument(m) => m.disabled_turns = m.disabled_turns.saturating_sub(1),
        }
    }

    pub fn as_structure(&self) -> Option<&Structure> {
        match self {
            Entity::Structure(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_structure_mut(&mut self) -> Option<&mut Structure> {
        match self {
            Entity::Structure(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_statue(&self) -> Option<&Statue> {
        match self {
            Entity::Statue(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_statue_mut(&mut self) -> Option<&mut Statue> {
        match self {
            Entity::Statue(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_monument(&self) -> Option<&Monument> {
        match self {
            Entity::Monument(m) => Some(m),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactTarget {
    Player,
    Field,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ArtifactEffect {
    Energy { amount: i32 },
    Buff { buff: BuffType, delta: f64 },
    /// Places an active trap on an unowned tile
    Trap,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Artifact {
    pub id: u32,
    pub name: String,
    pub target: ArtifactTarget,
    pub effect: ArtifactEffect,
}

//! Immutable entity catalog
//!
//! Every structure, statue, monument and artifact blueprint the game knows
//! about. The catalog is built once at startup (from the embedded JSON file
//! or an override path) and shared read-only through an `Arc`.

use crate::entity::{Artifact, Monument, Statue, Structure, StructureEffect};
use crate::error::GameError;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::Deserialize;
use std::collections::HashSet;
use std::path::Path;

const EMBEDDED_CATALOG: &str = include_str!("../data/catalog.json");

#[derive(Debug, Clone, Deserialize)]
pub struct Catalog {
    structures: Vec<Structure>,
    statues: Vec<Statue>,
    monuments: Vec<Monument>,
    artifacts: Vec<Artifact>,
}

impl Catalog {
    /// Catalog shipped with the server
    pub fn embedded() -> Result<Self, GameError> {
        Self::from_json(EMBEDDED_CATALOG)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, GameError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    pub fn from_json(json: &str) -> Result<Self, GameError> {
        let catalog: Catalog = serde_json::from_str(json)?;
        catalog.validate()?;
        Ok(catalog)
    }

    /// Ids are shared across all entity kinds and must be unique. The
    /// tree, overgrowth and trap blueprints must exist since rules spawn them.
    fn validate(&self) -> Result<(), GameError> {
        let mut seen = HashSet::new();
        let ids = self
            .structures
            .iter()
            .map(|s| s.id)
            .chain(self.statues.iter().map(|s| s.id))
            .chain(self.monuments.iter().map(|m| m.id))
            .chain(self.artifacts.iter().map(|a| a.id));
        for id in ids {
            if !seen.insert(id) {
                return Err(GameError::InvalidCatalog(format!("duplicate id {}", id)));
            }
        }
        for structure in &self.structures {
            if let StructureEffect::Smeltery { debuff, .. } = structure.effect {
                if debuff > 0.0 {
                    return Err(GameError::InvalidCatalog(format!(
                        "{} must debuff with a negative delta",
                        structure.name
                    )));
                }
            }
        }
        let required: [(&str, fn(&StructureEffect) -> bool); 3] = [
            ("tree", |e| matches!(e, StructureEffect::Tree { .. })),
            ("overgrowth", |e| matches!(e, StructureEffect::Overgrowth)),
            ("trap", |e| matches!(e, StructureEffect::Trap { .. })),
        ];
        for (what, pred) in required {
            if self.structure_where(pred).is_none() {
                return Err(GameError::InvalidCatalog(format!("no {} structure", what)));
            }
        }
        Ok(())
    }

    pub fn structure(&self, id: u32) -> Option<&Structure> {
        self.structures.iter().find(|s| s.id == id)
    }

    pub fn statue(&self, id: u32) -> Option<&Statue> {
        self.statues.iter().find(|s| s.id == id)
    }

    pub fn artifact(&self, id: u32) -> Option<&Artifact> {
        self.artifacts.iter().find(|a| a.id == id)
    }

    pub fn structures(&self) -> &[Structure] {
        &self.structures
    }

    pub fn statues(&self) -> &[Statue] {
        &self.statues
    }

    pub fn monuments(&self) -> &[Monument] {
        &self.monuments
    }

    pub fn artifacts(&self) -> &[Artifact] {
        &self.artifacts
    }

    /// First structure blueprint whose behaviour matches
    pub fn structure_where(&self, pred: impl Fn(&StructureEffect) -> bool) -> Option<&Structure> {
        self.structures.iter().find(|s| pred(&s.effect))
    }

    pub fn tree(&self) -> Result<Structure, GameError> {
        self.required(|e| matches!(e, StructureEffect::Tree { .. }), "tree")
    }

    pub fn overgrowth(&self) -> Result<Structure, GameError> {
        self.required(|e| matches!(e, StructureEffect::Overgrowth), "overgrowth")
    }

    pub fn trap(&self) -> Result<Structure, GameError> {
        self.required(|e| matches!(e, StructureEffect::Trap { .. }), "trap")
    }

    fn required(
        &self,
        pred: impl Fn(&StructureEffect) -> bool,
        what: &str,
    ) -> Result<Structure, GameError> {
        self.structure_where(pred)
            .cloned()
            .ok_or_else(|| GameError::Internal(format!("catalog has no {} structure", what)))
    }

    pub fn random_artifact<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<Artifact> {
        self.artifacts.choose(rng).cloned()
    }
}

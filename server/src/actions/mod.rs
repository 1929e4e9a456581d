//! Game action executors
//!
//! One executor per state-changing action. Every executor implements
//! [`Action`] and follows the same contract:
//!
//! - it runs only while the dispatcher holds the exclusive lock, so it never
//!   locks and never performs I/O itself
//! - it resolves its target and checks ownership, possession and resources
//!   before touching anything
//! - it returns `Ok(false)` for a rule violation, leaving the state exactly
//!   as it found it
//! - `Err` is reserved for broken invariants (such as a catalog missing a
//!   required blueprint)

pub mod artifact;
pub mod statue;
pub mod structure;
pub mod tile;

use crate::error::GameError;
use crate::game::GameState;
use shared::CommandTag;
use std::str::FromStr;

pub use artifact::{UseFieldArtifact, UsePlayerArtifact};
pub use statue::{PlaceStatue, StatueParams, UpgradeStatue, UseStatue};
pub use structure::{PlaceStructure, UseStructure};
pub use tile::BuyTile;

pub trait Action: std::fmt::Debug + Send + Sync {
    /// Protocol tag of the request that carries this action
    fn tag(&self) -> CommandTag;

    /// Validates and, when every check passes, applies the action for `player`.
    fn attempt(&self, state: &mut GameState, player: &str) -> Result<bool, GameError>;
}

/// Parses the argument at `index`, mapping failures to `InvalidParameters`
pub(crate) fn arg<T: FromStr>(args: &[String], index: usize, tag: CommandTag) -> Result<T, GameError> {
    args.get(index)
        .and_then(|raw| raw.trim().parse().ok())
        .ok_or(GameError::InvalidParameters { tag })
}

//! Error taxonomy of the game engine
//!
//! Every variant is recoverable: the dispatcher turns it into an `ERR$...`
//! line for the issuing player and keeps serving the session.

use shared::{error_response, CommandTag, ProtocolError, CODE_COMMAND};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GameError {
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
    #[error("no game is running")]
    NotStarted,
    #[error("a game is already running")]
    AlreadyStarted,
    #[error("{player} acted outside their turn")]
    NotPlayerTurn { player: String },
    #[error("invalid parameters for {tag}")]
    InvalidParameters { tag: CommandTag },
    #[error("no game handler for {tag}")]
    Unhandled { tag: CommandTag },
    #[error("{tag} was rejected by the game rules")]
    ActionFailed { tag: CommandTag },
    #[error("invalid roster: {0}")]
    InvalidRoster(String),
    #[error("invalid catalog: {0}")]
    InvalidCatalog(String),
    #[error("catalog parse error: {0}")]
    Catalog(#[from] serde_json::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("internal error: {0}")]
    Internal(String),
}

impl GameError {
    /// Broken invariants rather than rejected requests
    pub fn is_internal(&self) -> bool {
        matches!(
            self,
            GameError::InvalidCatalog(_)
                | GameError::Catalog(_)
                | GameError::Io(_)
                | GameError::Internal(_)
        )
    }

    /// Wire response sent back to the issuer
    pub fn to_response(&self) -> String {
        match self {
            GameError::Protocol(err) => err.to_response(),
            GameError::NotStarted => error_response(CODE_COMMAND, "GAME_NOT_STARTED", None),
            GameError::AlreadyStarted => error_response(CODE_COMMAND, "GAME_ALREADY_STARTED", None),
            GameError::NotPlayerTurn { .. } => error_response(CODE_COMMAND, "NOT_PLAYER_TURN", None),
            GameError::InvalidParameters { tag } => {
                error_response(CODE_COMMAND, "INVALID_PARAMETERS", Some(*tag))
            }
            GameError::Unhandled { tag } => {
                error_response(CODE_COMMAND, "UNHANDLED_COMMAND", Some(*tag))
            }
            GameError::ActionFailed { tag } => {
                error_response(CODE_COMMAND, "GAME_COMMAND_FAILED", Some(*tag))
            }
            GameError::InvalidRoster(_) => error_response(CODE_COMMAND, "INVALID_ROSTER", None),
            GameError::InvalidCatalog(_)
            | GameError::Catalog(_)
            | GameError::Io(_)
            | GameError::Internal(_) => {
                error_response(CODE_COMMAND, "INTERNAL_ERROR", None)
            }
        }
    }
}

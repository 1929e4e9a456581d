//! Wire protocol and game-wide defaults shared by the server and its clients.
//!
//! Every message is a single UTF-8 line of tokens joined by [`DELIMITER`].
//! The first token is a four-letter [`CommandTag`], the remaining tokens are
//! its arguments. Responses follow the same shape:
//!
//! - `OK$<TAG>$<echoed args>$<player>` for accepted commands
//! - `ERR$<code>$<MESSAGE>[$<TAG>]` for rejected ones
//!
//! Arity is checked here, before a command can reach any game handler.

use std::fmt;
use std::str::FromStr;
use thiserror::Error;

pub const DELIMITER: char = '$';
const DELIMITER_STR: &str = "$";

pub const START_RUNES: u32 = 50;
pub const START_ENERGY: u8 = 0;
pub const MAX_ENERGY: u8 = 4;
pub const MAX_ARTIFACTS: usize = 3;
pub const TILES_PER_ROUND: u32 = 3;
pub const TILE_PRICE: u32 = 10;
pub const MIN_RESOURCE_VALUE: u32 = 10;
pub const MAX_RESOURCE_VALUE: u32 = 20;
/// Percent chance that a freshly generated tile hides an artifact
pub const ARTIFACT_CHANCE: f64 = 10.0;
/// Base percent chance of discovering an artifact when buying an empty tile
pub const ARTIFACT_FIND_CHANCE: f64 = 1.0;
/// Percent chance that a level 3 statue curses instead of blessing
pub const CURSE_CHANCE: f64 = 1.0;
pub const SET_BONUS_MULTIPLIER: u32 = 2;
pub const MAX_STATUE_LEVEL: u8 = 3;
pub const MIN_PLAYERS: usize = 2;
pub const MAX_PLAYERS: usize = 4;
pub const CLIENT_TIMEOUT_SECS: u64 = 30;

/// Error code used for malformed or empty input
pub const CODE_NULL_MESSAGE: u16 = 103;
/// Error code used for every rejected game command
pub const CODE_COMMAND: u16 = 106;

/// Every tag the server understands, on or off the game path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandTag {
    Ok,
    Err,
    Test,
    Ping,
    Register,
    Exit,
    StartGame,
    EndGame,
    Turn,
    EndTurn,
    Synchronize,
    GetStatus,
    Leaderboard,
    GetPrices,
    BuyTile,
    PlaceStructure,
    UseStructure,
    PlaceStatue,
    UpgradeStatue,
    UseStatue,
    UseFieldArtifact,
    UsePlayerArtifact,
}

impl CommandTag {
    pub const ALL: [CommandTag; 22] = [
        CommandTag::Ok,
        CommandTag::Err,
        CommandTag::Test,
        CommandTag::Ping,
        CommandTag::Register,
        CommandTag::Exit,
        CommandTag::StartGame,
        CommandTag::EndGame,
        CommandTag::Turn,
        CommandTag::EndTurn,
        CommandTag::Synchronize,
        CommandTag::GetStatus,
        CommandTag::Leaderboard,
        CommandTag::GetPrices,
        CommandTag::BuyTile,
        CommandTag::PlaceStructure,
        CommandTag::UseStructure,
        CommandTag::PlaceStatue,
        CommandTag::UpgradeStatue,
        CommandTag::UseStatue,
        CommandTag::UseFieldArtifact,
        CommandTag::UsePlayerArtifact,
    ];

    /// The token written on the wire
    pub fn code(self) -> &'static str {
        match self {
            CommandTag::Ok => "OK",
            CommandTag::Err => "ERR",
            CommandTag::Test => "TEST",
            CommandTag::Ping => "PING",
            CommandTag::Register => "RGST",
            CommandTag::Exit => "EXIT",
            CommandTag::StartGame => "STRT",
            CommandTag::EndGame => "ENDG",
            CommandTag::Turn => "TURN",
            CommandTag::EndTurn => "ENDT",
            CommandTag::Synchronize => "SYNC",
            CommandTag::GetStatus => "GSTS",
            CommandTag::Leaderboard => "LEAD",
            CommandTag::GetPrices => "GPRC",
            CommandTag::BuyTile => "BUYT",
            CommandTag::PlaceStructure => "PLST",
            CommandTag::UseStructure => "USSR",
            CommandTag::PlaceStatue => "PLSU",
            CommandTag::UpgradeStatue => "UPST",
            CommandTag::UseStatue => "USTA",
            CommandTag::UseFieldArtifact => "USFA",
            CommandTag::UsePlayerArtifact => "USPA",
        }
    }

    /// Number of arguments the tag must carry.
    ///
    /// `None` marks acknowledgement tags that are accepted with any
    /// argument count.
    pub fn arity(self) -> Option<usize> {
        match self {
            CommandTag::Ok | CommandTag::Err | CommandTag::Test => None,
            CommandTag::Exit
            | CommandTag::StartGame
            | CommandTag::EndGame
            | CommandTag::EndTurn
            | CommandTag::Synchronize
            | CommandTag::GetStatus
            | CommandTag::Leaderboard
            | CommandTag::GetPrices => Some(0),
            CommandTag::Ping | CommandTag::Register | CommandTag::Turn => Some(1),
            CommandTag::BuyTile | CommandTag::UsePlayerArtifact => Some(2),
            CommandTag::PlaceStructure
            | CommandTag::UseStructure
            | CommandTag::PlaceStatue
            | CommandTag::UpgradeStatue
            | CommandTag::UseFieldArtifact => Some(3),
            CommandTag::UseStatue => Some(4),
        }
    }

    /// Tags that only read the game state
    pub fn is_read_only(self) -> bool {
        matches!(
            self,
            CommandTag::Synchronize
                | CommandTag::GetStatus
                | CommandTag::Leaderboard
                | CommandTag::GetPrices
        )
    }
}

impl fmt::Display for CommandTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for CommandTag {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, <CommandTag as FromStr>::Err> {
        CommandTag::ALL
            .iter()
            .copied()
            .find(|tag| tag.code() == s)
            .ok_or_else(|| ProtocolError::UnknownTag(s.to_string()))
    }
}

/// Reasons a line is rejected before it reaches a handler
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    #[error("empty message received")]
    Empty,
    #[error("unknown command tag `{0}`")]
    UnknownTag(String),
    #[error("{tag} expects {expected} arguments, got {actual}")]
    WrongArity {
        tag: CommandTag,
        expected: usize,
        actual: usize,
    },
}

impl ProtocolError {
    /// Wire response sent back to the issuer
    pub fn to_response(&self) -> String {
        match self {
            ProtocolError::Empty => error_response(CODE_NULL_MESSAGE, "NULL_MESSAGE_RECEIVED", None),
            ProtocolError::UnknownTag(_) => error_response(CODE_COMMAND, "UNKNOWN_COMMAND", None),
            ProtocolError::WrongArity { tag, .. } => {
                error_response(CODE_COMMAND, "INVALID_COMMAND", Some(*tag))
            }
        }
    }
}

/// A validated protocol line, attributed to the player that sent it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    pub player: String,
    pub tag: CommandTag,
    pub args: Vec<String>,
}

impl Command {
    pub fn new(player: impl Into<String>, tag: CommandTag, args: Vec<String>) -> Self {
        Self {
            player: player.into(),
            tag,
            args,
        }
    }

    /// Parses one line into a command.
    ///
    /// Trailing line terminators are ignored. Blank input, unknown tags and
    /// argument counts that do not match the tag's arity are rejected.
    pub fn parse(line: &str, player: &str) -> Result<Command, ProtocolError> {
        let line = line.trim_end_matches(['\r', '\n']);
        if line.trim().is_empty() {
            return Err(ProtocolError::Empty);
        }

        let mut tokens = line.split(DELIMITER);
        let tag: CommandTag = tokens.next().unwrap_or_default().parse()?;
        let args: Vec<String> = tokens.map(str::to_string).collect();

        if let Some(expected) = tag.arity() {
            if args.len() != expected {
                return Err(ProtocolError::WrongArity {
                    tag,
                    expected,
                    actual: args.len(),
                });
            }
        }

        Ok(Command::new(player, tag, args))
    }

    /// Success response echoing the arguments and the issuing player
    pub fn success_response(&self) -> String {
        let mut parts = vec![CommandTag::Ok.code(), self.tag.code()];
        parts.extend(self.args.iter().map(String::as_str));
        parts.push(&self.player);
        join(&parts)
    }
}

/// Joins tokens with the protocol delimiter
pub fn join(parts: &[&str]) -> String {
    parts.join(DELIMITER_STR)
}

/// Builds an `ERR$code$MESSAGE[$TAG]` line
pub fn error_response(code: u16, message: &str, tag: Option<CommandTag>) -> String {
    match tag {
        Some(tag) => format!("ERR{d}{code}{d}{message}{d}{tag}", d = DELIMITER),
        None => format!("ERR{d}{code}{d}{message}", d = DELIMITER),
    }
}

/// Builds a server-initiated notification such as `TURN$name`
pub fn notification(tag: CommandTag, args: &[&str]) -> String {
    let mut parts = vec![tag.code()];
    parts.extend_from_slice(args);
    join(&parts)
}

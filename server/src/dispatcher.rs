//! Command dispatcher: the only way into the game state
//!
//! Every parsed [`Command`] becomes a typed [`GameRequest`]. Read-only
//! requests share the read guard; everything else runs under the exclusive
//! write guard in a fixed order:
//!
//! 1. game running?
//! 2. issuer is the active player?
//! 3. run the action
//!
//! A successful mutation downgrades the write guard, renders the snapshot
//! and enqueues it before the read guard is released. The next writer waits
//! for that guard, so broadcasts leave in commit order while socket writes
//! happen later on the sender task.

use crate::actions::{
    arg, Action, BuyTile, PlaceStatue, PlaceStructure, StatueParams, UpgradeStatue,
    UseFieldArtifact, UsePlayerArtifact, UseStatue, UseStructure,
};
use crate::error::GameError;
use crate::game::GameState;
use crate::session::SessionHandle;
use crate::snapshot;
use log::{debug, error, info, warn};
use shared::{error_response, join, notification, Command, CommandTag, CODE_COMMAND};
use tokio::sync::{RwLock, RwLockReadGuard};

/// A command that reached the game path, with typed arguments
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GameRequest {
    EndTurn,
    Synchronize,
    GetStatus,
    Leaderboard,
    GetPrices,
    BuyTile(BuyTile),
    PlaceStructure(PlaceStructure),
    UseStructure(UseStructure),
    PlaceStatue(PlaceStatue),
    UpgradeStatue(UpgradeStatue),
    UseStatue(UseStatue),
    UseFieldArtifact(UseFieldArtifact),
    UsePlayerArtifact(UsePlayerArtifact),
}

impl GameRequest {
    /// Converts a parsed command, rejecting malformed arguments and tags
    /// without a game handler.
    pub fn from_command(command: &Command) -> Result<Self, GameError> {
        let tag = command.tag;
        let args = &command.args;
        let request = match tag {
            CommandTag::EndTurn => GameRequest::EndTurn,
            CommandTag::Synchronize => GameRequest::Synchronize,
            CommandTag::GetStatus => GameRequest::GetStatus,
            CommandTag::Leaderboard => GameRequest::Leaderboard,
            CommandTag::GetPrices => GameRequest::GetPrices,
            CommandTag::BuyTile => GameRequest::BuyTile(BuyTile {
                x: arg(args, 0, tag)?,
                y: arg(args, 1, tag)?,
            }),
            CommandTag::PlaceStructure => GameRequest::PlaceStructure(PlaceStructure {
                x: arg(args, 0, tag)?,
                y: arg(args, 1, tag)?,
                structure_id: arg(args, 2, tag)?,
            }),
            CommandTag::UseStructure => GameRequest::UseStructure(UseStructure {
                x: arg(args, 0, tag)?,
                y: arg(args, 1, tag)?,
                structure_id: arg(args, 2, tag)?,
            }),
            CommandTag::PlaceStatue => GameRequest::PlaceStatue(PlaceStatue {
                x: arg(args, 0, tag)?,
                y: arg(args, 1, tag)?,
                statue_id: arg(args, 2, tag)?,
            }),
            CommandTag::UpgradeStatue => GameRequest::UpgradeStatue(UpgradeStatue {
                x: arg(args, 0, tag)?,
                y: arg(args, 1, tag)?,
                statue_id: arg(args, 2, tag)?,
            }),
            CommandTag::UseStatue => GameRequest::UseStatue(UseStatue {
                x: arg(args, 0, tag)?,
                y: arg(args, 1, tag)?,
                statue_id: arg(args, 2, tag)?,
                params: arg::<StatueParams>(args, 3, tag)?,
            }),
            CommandTag::UseFieldArtifact => GameRequest::UseFieldArtifact(UseFieldArtifact {
                x: arg(args, 0, tag)?,
                y: arg(args, 1, tag)?,
                artifact_id: arg(args, 2, tag)?,
            }),
            CommandTag::UsePlayerArtifact => {
                let target: String = arg(args, 1, tag)?;
                if target.is_empty() {
                    return Err(GameError::InvalidParameters { tag });
                }
                GameRequest::UsePlayerArtifact(UsePlayerArtifact {
                    artifact_id: arg(args, 0, tag)?,
                    target,
                })
            }
            CommandTag::Ok
            | CommandTag::Err
            | CommandTag::Test
            | CommandTag::Ping
            | CommandTag::Register
            | CommandTag::Exit
            | CommandTag::StartGame
            | CommandTag::EndGame
            | CommandTag::Turn => return Err(GameError::Unhandled { tag }),
        };
        Ok(request)
    }

    /// Answer to a read-only request
    fn query(&self, state: &GameState, player: &str) -> Option<String> {
        match self {
            GameRequest::Synchronize => Some(snapshot::render(state)),
            GameRequest::GetStatus => Some(snapshot::render_status(state)),
            GameRequest::Leaderboard => Some(snapshot::render_leaderboard(&state.standings())),
            GameRequest::GetPrices => Some(snapshot::render_prices(state, player)),
            _ => None,
        }
    }

    /// Executor behind an action request
    fn action(&self) -> Option<&dyn Action> {
        match self {
            GameRequest::EndTurn
            | GameRequest::Synchronize
            | GameRequest::GetStatus
            | GameRequest::Leaderboard
            | GameRequest::GetPrices => None,
            GameRequest::BuyTile(a) => Some(a),
            GameRequest::PlaceStructure(a) => Some(a),
            GameRequest::UseStructure(a) => Some(a),
            GameRequest::PlaceStatue(a) => Some(a),
            GameRequest::UpgradeStatue(a) => Some(a),
            GameRequest::UseStatue(a) => Some(a),
            GameRequest::UseFieldArtifact(a) => Some(a),
            GameRequest::UsePlayerArtifact(a) => Some(a),
        }
    }
}

pub struct Dispatcher {
    state: RwLock<GameState>,
    session: SessionHandle,
}

impl Dispatcher {
    pub fn new(state: GameState, session: SessionHandle) -> Self {
        Self {
            state: RwLock::new(state),
            session,
        }
    }

    /// Runs one command and returns the response line for its issuer.
    /// Rule violations come back as `ERR$...` lines; nothing here panics
    /// the session.
    pub async fn process_command(&self, command: &Command) -> String {
        match self.execute(command).await {
            Ok(response) => response,
            Err(err) => Self::reject(command, err),
        }
    }

    async fn execute(&self, command: &Command) -> Result<String, GameError> {
        let request = GameRequest::from_command(command)?;
        let tag = command.tag;
        let player = command.player.as_str();

        if tag.is_read_only() {
            let state = self.state.read().await;
            return request
                .query(&state, player)
                .ok_or_else(|| GameError::Internal(format!("{} has no query", tag)));
        }

        match &request {
            GameRequest::EndTurn => {
                let mut state = self.state.write().await;
                Self::authorize(&state, player)?;
                if !state.end_turn(player) {
                    return Err(GameError::ActionFailed { tag });
                }
                let next = state
                    .active_player()
                    .map(|p| p.name.clone())
                    .ok_or_else(|| GameError::Internal("no active player after turn change".into()))?;

                let state = state.downgrade();
                self.session.broadcast(snapshot::render(&state));
                self.session.broadcast(notification(CommandTag::Turn, &[next.as_str()]));
                drop(state);

                Ok(join(&[CommandTag::Ok.code(), CommandTag::Turn.code(), player, next.as_str()]))
            }
            _ => {
                let action = request
                    .action()
                    .ok_or_else(|| GameError::Internal(format!("{} has no executor", tag)))?;
                let mut state = self.state.write().await;
                Self::authorize(&state, player)?;
                if !action.attempt(&mut state, player)? {
                    return Err(GameError::ActionFailed { tag });
                }

                let state = state.downgrade();
                self.session.broadcast(snapshot::render(&state));
                drop(state);

                debug!("{} accepted from {}", tag, player);
                Ok(command.success_response())
            }
        }
    }

    fn authorize(state: &GameState, player: &str) -> Result<(), GameError> {
        if !state.is_started() {
            return Err(GameError::NotStarted);
        }
        if !state.is_active_player(player) {
            return Err(GameError::NotPlayerTurn {
                player: player.to_string(),
            });
        }
        Ok(())
    }

    fn reject(command: &Command, err: GameError) -> String {
        match &err {
            GameError::NotPlayerTurn { player } => {
                warn!("{} sent {} outside their turn", player, command.tag);
            }
            err if err.is_internal() => {
                error!("{} from {} failed: {}", command.tag, command.player, err);
                return error_response(CODE_COMMAND, "INTERNAL_ERROR", Some(command.tag));
            }
            err => debug!("{} from {} rejected: {}", command.tag, command.player, err),
        }
        err.to_response()
    }

    /// Seats the roster and announces the first snapshot and turn
    pub async fn start_game(&self, names: &[String]) -> Result<(), GameError> {
        let mut state = self.state.write().await;
        state.start(names)?;
        let first = state.active_player().map(|p| p.name.clone());

        let state = state.downgrade();
        self.session.broadcast(snapshot::render(&state));
        if let Some(first) = first {
            self.session.broadcast(notification(CommandTag::Turn, &[first.as_str()]));
        }
        Ok(())
    }

    /// Ends the match, broadcasts the final standings and resets the state.
    /// Standings are sorted by runes, richest first.
    pub async fn end_game(&self) -> Vec<(String, u32)> {
        let mut state = self.state.write().await;
        let standings = state.standings();
        state.reset();

        let _state = state.downgrade();
        if let Some((winner, _)) = standings.first() {
            info!("Game over, winner {}", winner);
            self.session.broadcast(snapshot::render_standings(&standings));
        }
        standings
    }

    pub async fn snapshot(&self) -> String {
        snapshot::render(&*self.state.read().await)
    }

    pub async fn is_started(&self) -> bool {
        self.state.read().await.is_started()
    }

    /// Shared read access for inspection
    pub async fn state(&self) -> RwLockReadGuard<'_, GameState> {
        self.state.read().await
    }
}

/// Comprehensive test suite for the dispatcher
#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Catalog;
    use crate::config::GameConfig;
    use crate::session::Outbound;
    use std::sync::Arc;
    use tokio::sync::mpsc::UnboundedReceiver;

    fn dispatcher() -> (Dispatcher, UnboundedReceiver<Outbound>) {
        let catalog = Arc::new(Catalog::embedded().unwrap());
        let config = GameConfig {
            start_runes: 100,
            ..GameConfig::deterministic(9)
        };
        let (session, rx) = SessionHandle::channel();
        (Dispatcher::new(GameState::new(config, catalog), session), rx)
    }

    async fn started() -> (Dispatcher, UnboundedReceiver<Outbound>) {
        let (dispatcher, mut rx) = dispatcher();
        dispatcher
            .start_game(&["player1".to_string(), "player2".to_string()])
            .await
            .unwrap();
        while rx.try_recv().is_ok() {}
        (dispatcher, rx)
    }

    fn cmd(line: &str, player: &str) -> Command {
        Command::parse(line, player).unwrap()
    }

    #[test]
    fn test_request_conversion() {
        let request = GameRequest::from_command(&cmd("BUYT$2$3", "p")).unwrap();
        assert_eq!(request, GameRequest::BuyTile(BuyTile { x: 2, y: 3 }));

        let request = GameRequest::from_command(&cmd("USTA$0$0$21$PLAYER:bob", "p")).unwrap();
        match request {
            GameRequest::UseStatue(u) => assert_eq!(u.params.player.as_deref(), Some("bob")),
            other => panic!("unexpected request {:?}", other),
        }
    }

    #[test]
    fn test_request_conversion_errors() {
        assert!(matches!(
            GameRequest::from_command(&cmd("BUYT$a$0", "p")),
            Err(GameError::InvalidParameters {
                tag: CommandTag::BuyTile
            })
        ));
        assert!(matches!(
            GameRequest::from_command(&cmd("USTA$0$0$21$COLOR:red", "p")),
            Err(GameError::InvalidParameters { .. })
        ));
        assert!(matches!(
            GameRequest::from_command(&cmd("PING$1", "p")),
            Err(GameError::Unhandled {
                tag: CommandTag::Ping
            })
        ));
    }

    #[test]
    fn test_snapshot_without_runtime_setup() {
        let (dispatcher, _rx) = dispatcher();
        let snapshot = tokio_test::block_on(dispatcher.snapshot());
        assert!(snapshot.starts_with("SYNC$META:"));
        assert!(!tokio_test::block_on(dispatcher.is_started()));
    }

    #[tokio::test]
    async fn test_commands_before_start() {
        let (dispatcher, _rx) = dispatcher();
        assert_eq!(
            dispatcher.process_command(&cmd("BUYT$0$0", "player1")).await,
            "ERR$106$GAME_NOT_STARTED"
        );
        assert_eq!(
            dispatcher.process_command(&cmd("ENDT", "player1")).await,
            "ERR$106$GAME_NOT_STARTED"
        );
        assert!(dispatcher
            .process_command(&cmd("SYNC", "player1"))
            .await
            .starts_with("SYNC$META:0,-1,null"));
    }

    #[tokio::test]
    async fn test_queries_answer_only_the_issuer() {
        let (dispatcher, mut rx) = started().await;
        dispatcher.process_command(&cmd("BUYT$0$0", "player1")).await;
        while rx.try_recv().is_ok() {}

        let status = dispatcher.process_command(&cmd("GSTS", "player2")).await;
        assert!(status.starts_with("OK$GSTS$META:0,0,player1|PLAYERS:player1{R:90"));
        let sync = dispatcher.process_command(&cmd("SYNC", "player2")).await;
        assert_eq!(&status["OK$GSTS$".len()..], &sync["SYNC$".len()..]);

        assert_eq!(
            dispatcher.process_command(&cmd("LEAD", "player2")).await,
            "OK$LEAD$player2$100$player1$90"
        );
        assert!(dispatcher
            .process_command(&cmd("GPRC", "player2"))
            .await
            .starts_with("OK$GPRC$TILE:10|STR:"));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_broadcast_is_queued_before_the_guard_is_released() {
        let (dispatcher, mut rx) = started().await;
        dispatcher.process_command(&cmd("BUYT$0$0", "player1")).await;

        // The last queued snapshot is the committed state
        let mut last = None;
        while let Ok(Outbound::Broadcast { text }) = rx.try_recv() {
            last = Some(text);
        }
        assert_eq!(last, Some(dispatcher.snapshot().await));
    }

    #[tokio::test]
    async fn test_buy_tile_success_broadcasts_snapshot() {
        let (dispatcher, mut rx) = started().await;
        let response = dispatcher.process_command(&cmd("BUYT$0$0", "player1")).await;
        assert_eq!(response, "OK$BUYT$0$0$player1");

        let state = dispatcher.state().await;
        assert_eq!(state.players[0].runes(), 90);
        assert_eq!(state.board.get(0, 0).unwrap().owner.as_deref(), Some("player1"));
        drop(state);

        match rx.try_recv().unwrap() {
            Outbound::Broadcast { text } => assert!(text.starts_with("SYNC$")),
            other => panic!("unexpected message {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_wrong_turn_is_rejected_without_change() {
        let (dispatcher, mut rx) = started().await;
        let before = dispatcher.snapshot().await;
        assert_eq!(
            dispatcher.process_command(&cmd("BUYT$0$0", "player2")).await,
            "ERR$106$NOT_PLAYER_TURN"
        );
        assert_eq!(before, dispatcher.snapshot().await);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_failed_action_reports_tag() {
        let (dispatcher, _rx) = started().await;
        assert_eq!(
            dispatcher.process_command(&cmd("PLST$0$0$1", "player1")).await,
            "ERR$106$GAME_COMMAND_FAILED$PLST"
        );
        assert_eq!(
            dispatcher.process_command(&cmd("BUYT$x$0", "player1")).await,
            "ERR$106$INVALID_PARAMETERS$BUYT"
        );
        assert_eq!(
            dispatcher.process_command(&cmd("RGST$someone", "player1")).await,
            "ERR$106$UNHANDLED_COMMAND$RGST"
        );
    }

    #[tokio::test]
    async fn test_end_turn_announces_next_player() {
        let (dispatcher, mut rx) = started().await;
        assert_eq!(
            dispatcher.process_command(&cmd("ENDT", "player1")).await,
            "OK$TURN$player1$player2"
        );
        let mut messages = Vec::new();
        while let Ok(Outbound::Broadcast { text }) = rx.try_recv() {
            messages.push(text);
        }
        assert_eq!(messages.len(), 2);
        assert!(messages[0].starts_with("SYNC$META:0,1,player2"));
        assert_eq!(messages[1], "TURN$player2");

        assert_eq!(
            dispatcher.process_command(&cmd("ENDT", "player1")).await,
            "ERR$106$NOT_PLAYER_TURN"
        );
    }

    #[tokio::test]
    async fn test_start_twice_and_bad_roster() {
        let (dispatcher, _rx) = dispatcher();
        assert!(matches!(
            dispatcher.start_game(&["solo".to_string()]).await,
            Err(GameError::InvalidRoster(_))
        ));
        assert!(!dispatcher.is_started().await);

        dispatcher
            .start_game(&["a".to_string(), "b".to_string()])
            .await
            .unwrap();
        assert!(matches!(
            dispatcher.start_game(&["a".to_string(), "b".to_string()]).await,
            Err(GameError::AlreadyStarted)
        ));
    }

    #[tokio::test]
    async fn test_end_game_returns_standings_and_resets() {
        let (dispatcher, mut rx) = started().await;
        dispatcher.process_command(&cmd("BUYT$0$0", "player1")).await;
        while rx.try_recv().is_ok() {}

        let standings = dispatcher.end_game().await;
        assert_eq!(
            standings,
            vec![("player2".to_string(), 100), ("player1".to_string(), 90)]
        );
        assert_eq!(
            rx.try_recv().unwrap(),
            Outbound::Broadcast {
                text: "ENDG$player2$100$player1$90".to_string()
            }
        );
        assert!(!dispatcher.is_started().await);
    }
}

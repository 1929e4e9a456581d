//! Server network layer: TCP line protocol, lobby handshake and delivery
//!
//! Each connection gets a reader task (this module) and a writer task that
//! drains the client's queue into the socket. Game output produced by the
//! dispatcher travels through the [`Outbound`] channel to a single sender
//! task that routes it to the right queues.

use crate::catalog::Catalog;
use crate::client_manager::{ClientManager, RegisterError};
use crate::config::GameConfig;
use crate::dispatcher::Dispatcher;
use crate::game::GameState;
use crate::session::{Outbound, SessionHandle};
use log::{debug, error, info, warn};
use shared::{error_response, Command, CommandTag, CODE_COMMAND};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, RwLock};

/// What the reader does after handling one line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineOutcome {
    Reply(String),
    /// Reply, then close the connection
    Close(String),
    Silent,
}

/// Main server accepting connections and feeding the dispatcher
pub struct Server {
    listener: TcpListener,
    clients: Arc<RwLock<ClientManager>>,
    dispatcher: Arc<Dispatcher>,
    outbound_rx: mpsc::UnboundedReceiver<Outbound>,
}

impl Server {
    pub async fn new(
        addr: &str,
        max_clients: usize,
        client_timeout: Duration,
        config: GameConfig,
        catalog: Arc<Catalog>,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let listener = TcpListener::bind(addr).await?;
        info!("Server listening on {}", listener.local_addr()?);

        let (session, outbound_rx) = SessionHandle::channel();
        let state = GameState::new(config, catalog);

        Ok(Server {
            listener,
            clients: Arc::new(RwLock::new(ClientManager::new(max_clients, client_timeout))),
            dispatcher: Arc::new(Dispatcher::new(state, session)),
            outbound_rx,
        })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    pub fn dispatcher(&self) -> Arc<Dispatcher> {
        Arc::clone(&self.dispatcher)
    }

    /// Spawns task that routes engine output to client queues
    fn spawn_network_sender(&mut self) {
        let clients = Arc::clone(&self.clients);
        let mut outbound_rx = std::mem::replace(&mut self.outbound_rx, mpsc::unbounded_channel().1);

        tokio::spawn(async move {
            while let Some(message) = outbound_rx.recv().await {
                let clients = clients.read().await;
                match message {
                    Outbound::ToPlayer { name, text } => match clients.find_by_name(&name) {
                        Some(client) => {
                            if !client.send(&text) {
                                warn!("Queue of {} is closed", name);
                            }
                        }
                        None => debug!("Dropping message for disconnected player {}", name),
                    },
                    Outbound::Broadcast { text } => clients.broadcast(&text),
                }
            }
        });
    }

    /// Spawns task that monitors client timeouts
    fn spawn_timeout_checker(&self) {
        let clients = Arc::clone(&self.clients);

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(1));

            loop {
                interval.tick().await;

                let timed_out = clients.write().await.check_timeouts();
                for client in timed_out {
                    warn!(
                        "Client {} ({}) timed out",
                        client.id,
                        client.name.as_deref().unwrap_or("unregistered")
                    );
                }
            }
        });
    }

    /// Accepts connections until the listener fails
    pub async fn run(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        self.spawn_network_sender();
        self.spawn_timeout_checker();
        info!("Server started successfully");

        loop {
            let (stream, addr) = self.listener.accept().await?;
            let clients = Arc::clone(&self.clients);
            let dispatcher = Arc::clone(&self.dispatcher);
            tokio::spawn(async move {
                handle_connection(stream, addr, clients, dispatcher).await;
            });
        }
    }
}

async fn handle_connection(
    stream: TcpStream,
    addr: SocketAddr,
    clients: Arc<RwLock<ClientManager>>,
    dispatcher: Arc<Dispatcher>,
) {
    let (reader, mut writer) = stream.into_split();
    let (tx, mut rx) = mpsc::unbounded_channel::<String>();

    let client_id = clients.write().await.add_client(addr, tx);
    let Some(client_id) = client_id else {
        warn!("Rejecting {}: server full", addr);
        let line = error_response(CODE_COMMAND, "SERVER_FULL", None);
        if let Err(e) = writer.write_all(format!("{}\n", line).as_bytes()).await {
            debug!("Failed to notify {}: {}", addr, e);
        }
        return;
    };

    let writer_task = tokio::spawn(async move {
        while let Some(line) = rx.recv().await {
            if let Err(e) = writer.write_all(format!("{}\n", line).as_bytes()).await {
                error!("Failed to write to {}: {}", addr, e);
                break;
            }
        }
    });

    let connection = Connection {
        client_id,
        clients: Arc::clone(&clients),
        dispatcher,
    };
    let mut lines = BufReader::new(reader).lines();
    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                warn!("Read error from {}: {}", addr, e);
                break;
            }
        };

        let outcome = connection.handle_line(&line).await;
        let (text, close) = match outcome {
            LineOutcome::Reply(text) => (Some(text), false),
            LineOutcome::Close(text) => (Some(text), true),
            LineOutcome::Silent => (None, false),
        };
        let guard = clients.read().await;
        let Some(client) = guard.get(client_id) else {
            break;
        };
        if let Some(text) = text {
            client.send(&text);
        }
        if close {
            break;
        }
    }

    clients.write().await.remove_client(client_id);
    if let Err(e) = writer_task.await {
        error!("Writer task for {} panicked: {}", addr, e);
    }
}

/// Per-connection context for line handling
pub struct Connection {
    pub client_id: u32,
    pub clients: Arc<RwLock<ClientManager>>,
    pub dispatcher: Arc<Dispatcher>,
}

impl Connection {
    /// Handles one received line: lobby tags here, game tags through the
    /// dispatcher.
    pub async fn handle_line(&self, line: &str) -> LineOutcome {
        let name = {
            let mut clients = self.clients.write().await;
            clients.touch(self.client_id);
            clients.get(self.client_id).and_then(|c| c.name.clone())
        };
        let player = name.clone().unwrap_or_default();

        let command = match Command::parse(line, &player) {
            Ok(command) => command,
            Err(e) => {
                debug!("Client {} sent an invalid line: {}", self.client_id, e);
                return LineOutcome::Reply(e.to_response());
            }
        };

        match command.tag {
            CommandTag::Ok | CommandTag::Err | CommandTag::Test => LineOutcome::Silent,
            CommandTag::Ping => LineOutcome::Reply(command.success_response()),
            CommandTag::Register => self.register(&command).await,
            CommandTag::Exit => LineOutcome::Close(command.success_response()),
            _ if name.is_none() => LineOutcome::Reply(error_response(
                CODE_COMMAND,
                "NOT_REGISTERED",
                Some(command.tag),
            )),
            CommandTag::StartGame => {
                let names = self.clients.read().await.names();
                match self.dispatcher.start_game(&names).await {
                    Ok(()) => LineOutcome::Reply(command.success_response()),
                    Err(e) => {
                        debug!("{} could not start the game: {}", player, e);
                        LineOutcome::Reply(e.to_response())
                    }
                }
            }
            CommandTag::EndGame => {
                if !self.dispatcher.is_started().await {
                    return LineOutcome::Reply(error_response(CODE_COMMAND, "GAME_NOT_STARTED", None));
                }
                let standings = self.dispatcher.end_game().await;
                info!("{} ended the game ({} players)", player, standings.len());
                LineOutcome::Reply(command.success_response())
            }
            _ => LineOutcome::Reply(self.dispatcher.process_command(&command).await),
        }
    }

    async fn register(&self, command: &Command) -> LineOutcome {
        let requested = command.args.first().map(String::as_str).unwrap_or_default();
        let result = self.clients.write().await.register(self.client_id, requested);
        match result {
            Ok(()) => {
                let name = requested.trim();
                LineOutcome::Reply(Command::new(name, command.tag, command.args.clone()).success_response())
            }
            Err(e) => {
                let message = match e {
                    RegisterError::NameTaken => "NAME_TAKEN",
                    RegisterError::InvalidName => "INVALID_NAME",
                    RegisterError::UnknownClient => "UNKNOWN_CLIENT",
                };
                LineOutcome::Reply(error_response(CODE_COMMAND, message, Some(CommandTag::Register)))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{IpAddr, Ipv4Addr};

    struct Lobby {
        clients: Arc<RwLock<ClientManager>>,
        dispatcher: Arc<Dispatcher>,
        _receivers: Vec<mpsc::UnboundedReceiver<String>>,
        _outbound: mpsc::UnboundedReceiver<Outbound>,
    }

    impl Lobby {
        fn new() -> Self {
            let catalog = Arc::new(Catalog::embedded().unwrap());
            let (session, outbound) = SessionHandle::channel();
            let state = GameState::new(GameConfig::deterministic(2), catalog);
            Self {
                clients: Arc::new(RwLock::new(ClientManager::new(4, Duration::from_secs(30)))),
                dispatcher: Arc::new(Dispatcher::new(state, session)),
                _receivers: Vec::new(),
                _outbound: outbound,
            }
        }

        async fn connect(&mut self, port: u16) -> Connection {
            let (tx, rx) = mpsc::unbounded_channel();
            let addr = SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), port);
            let client_id = self.clients.write().await.add_client(addr, tx).unwrap();
            self._receivers.push(rx);
            Connection {
                client_id,
                clients: Arc::clone(&self.clients),
                dispatcher: Arc::clone(&self.dispatcher),
            }
        }
    }

    fn reply(text: &str) -> LineOutcome {
        LineOutcome::Reply(text.to_string())
    }

    #[tokio::test]
    async fn test_register_and_ping() {
        let mut lobby = Lobby::new();
        let alice = lobby.connect(1).await;
        assert_eq!(alice.handle_line("RGST$alice").await, reply("OK$RGST$alice$alice"));
        assert_eq!(alice.handle_line("PING$42").await, reply("OK$PING$42$alice"));

        let impostor = lobby.connect(2).await;
        assert_eq!(
            impostor.handle_line("RGST$alice").await,
            reply("ERR$106$NAME_TAKEN$RGST")
        );
    }

    #[tokio::test]
    async fn test_invalid_lines() {
        let mut lobby = Lobby::new();
        let conn = lobby.connect(1).await;
        assert_eq!(conn.handle_line("").await, reply("ERR$103$NULL_MESSAGE_RECEIVED"));
        assert_eq!(conn.handle_line("HELLO").await, reply("ERR$106$UNKNOWN_COMMAND"));
        assert_eq!(conn.handle_line("BUYT$1").await, reply("ERR$106$INVALID_COMMAND$BUYT"));
        assert_eq!(conn.handle_line("OK$whatever").await, LineOutcome::Silent);
    }

    #[tokio::test]
    async fn test_game_commands_need_registration() {
        let mut lobby = Lobby::new();
        let conn = lobby.connect(1).await;
        assert_eq!(
            conn.handle_line("BUYT$0$0").await,
            reply("ERR$106$NOT_REGISTERED$BUYT")
        );
    }

    #[tokio::test]
    async fn test_start_needs_enough_players() {
        let mut lobby = Lobby::new();
        let alice = lobby.connect(1).await;
        alice.handle_line("RGST$alice").await;
        assert_eq!(alice.handle_line("STRT").await, reply("ERR$106$INVALID_ROSTER"));

        let bob = lobby.connect(2).await;
        bob.handle_line("RGST$bob").await;
        assert_eq!(alice.handle_line("STRT").await, reply("OK$STRT$alice"));
        assert_eq!(bob.handle_line("BUYT$0$0").await, reply("ERR$106$NOT_PLAYER_TURN"));
        assert_eq!(alice.handle_line("BUYT$0$0").await, reply("OK$BUYT$0$0$alice"));
        assert_eq!(bob.handle_line("ENDG").await, reply("OK$ENDG$bob"));
        assert!(!lobby.dispatcher.is_started().await);
    }

    #[tokio::test]
    async fn test_exit_closes() {
        let mut lobby = Lobby::new();
        let conn = lobby.connect(1).await;
        conn.handle_line("RGST$alice").await;
        assert_eq!(
            conn.handle_line("EXIT").await,
            LineOutcome::Close("OK$EXIT$alice".to_string())
        );
    }

    #[tokio::test]
    async fn test_tcp_round_trip() {
        let catalog = Arc::new(Catalog::embedded().unwrap());
        let mut server = Server::new(
            "127.0.0.1:0",
            4,
            Duration::from_secs(30),
            GameConfig::deterministic(4),
            catalog,
        )
        .await
        .unwrap();
        let addr = server.local_addr().unwrap();
        tokio::spawn(async move { server.run().await.ok() });

        let stream = TcpStream::connect(addr).await.unwrap();
        let (reader, mut writer) = stream.into_split();
        let mut lines = BufReader::new(reader).lines();

        writer.write_all(b"RGST$alice\n").await.unwrap();
        assert_eq!(lines.next_line().await.unwrap().unwrap(), "OK$RGST$alice$alice");
        writer.write_all(b"SYNC\n").await.unwrap();
        assert!(lines.next_line().await.unwrap().unwrap().starts_with("SYNC$META:"));
    }
}

//! Concurrency tests for the dispatcher
//!
//! Many tasks hammer one dispatcher at once. Whatever interleaving the
//! runtime picks, every observed snapshot must be a complete state and the
//! invariants must hold at the end.

use server::catalog::Catalog;
use server::config::GameConfig;
use server::dispatcher::Dispatcher;
use server::game::GameState;
use server::session::{Outbound, SessionHandle};
use shared::Command;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

const PLAYERS: [&str; 4] = ["p1", "p2", "p3", "p4"];

async fn started() -> (Arc<Dispatcher>, tokio::sync::mpsc::UnboundedReceiver<Outbound>) {
    let catalog = Arc::new(Catalog::embedded().unwrap());
    let config = GameConfig {
        start_runes: 500,
        ..GameConfig::deterministic(23)
    };
    let (session, rx) = SessionHandle::channel();
    let dispatcher = Arc::new(Dispatcher::new(GameState::new(config, catalog), session));
    let names: Vec<String> = PLAYERS.iter().map(|s| s.to_string()).collect();
    dispatcher.start_game(&names).await.unwrap();
    (dispatcher, rx)
}

/// Tests that concurrent buyers never double-sell a tile
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_purchases_keep_ownership_unique() {
    let (dispatcher, _rx) = started().await;
    let start = Instant::now();

    let mut handles = Vec::new();
    for round in 0..5 {
        for (seat, name) in PLAYERS.iter().enumerate() {
            let dispatcher = Arc::clone(&dispatcher);
            let name = name.to_string();
            handles.push(tokio::spawn(async move {
                let mut accepted = 0;
                for x in 0..8 {
                    let y = (seat + round) % 7;
                    let command = Command::parse(&format!("BUYT${}${}", x, y), &name).unwrap();
                    if dispatcher.process_command(&command).await.starts_with("OK") {
                        accepted += 1;
                    }
                    let end = Command::parse("ENDT", &name).unwrap();
                    dispatcher.process_command(&end).await;
                }
                accepted
            }));
        }
    }

    let mut accepted = 0;
    for handle in handles {
        accepted += handle.await.unwrap();
    }
    println!("{} purchases accepted in {:?}", accepted, start.elapsed());

    let state = dispatcher.state().await;
    let mut owned = HashSet::new();
    let mut total = 0;
    for player in &state.players {
        for &coord in &player.owned_tiles {
            assert!(owned.insert(coord), "{:?} sold twice", coord);
            total += 1;
        }
    }
    assert_eq!(total, accepted);
    for tile in state.board.tiles() {
        assert_eq!(tile.is_purchased(), owned.contains(&tile.coord()));
    }
}

/// Tests that readers never observe a half-applied action
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn snapshots_are_consistent_under_writes() {
    let (dispatcher, _rx) = started().await;

    let writer = {
        let dispatcher = Arc::clone(&dispatcher);
        tokio::spawn(async move {
            for i in 0..40 {
                let name = PLAYERS[i % PLAYERS.len()];
                let buy = Command::parse(&format!("BUYT${}${}", i % 8, i % 7), name).unwrap();
                dispatcher.process_command(&buy).await;
                let end = Command::parse("ENDT", name).unwrap();
                dispatcher.process_command(&end).await;
            }
        })
    };

    let mut readers = Vec::new();
    for _ in 0..4 {
        let dispatcher = Arc::clone(&dispatcher);
        readers.push(tokio::spawn(async move {
            for _ in 0..50 {
                let snapshot = dispatcher.snapshot().await;
                let board = snapshot.split("|BOARD:").nth(1).unwrap();
                let owned = board.matches("|PU=1|").count();
                let unowned_marked = board.matches("{O=null|").count();
                assert_eq!(owned + unowned_marked, 56);
                tokio::task::yield_now().await;
            }
        }));
    }

    writer.await.unwrap();
    for reader in readers {
        reader.await.unwrap();
    }

    let state = dispatcher.state().await;
    for player in &state.players {
        assert!(player.energy() <= state.config().max_energy);
    }
}

/// Reads `(round, active index, purchased tiles)` out of a SYNC line
fn progress(sync: &str) -> (u32, i64, usize) {
    let meta = sync
        .strip_prefix("SYNC$META:")
        .and_then(|rest| rest.split('|').next())
        .unwrap();
    let mut fields = meta.split(',');
    let round = fields.next().unwrap().parse().unwrap();
    let index = fields.next().unwrap().parse().unwrap();
    let owned = sync.matches("|PU=1|").count();
    (round, index, owned)
}

/// Tests that broadcasts leave in commit order under parallel writers
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn broadcasts_follow_commit_order() {
    let (dispatcher, mut rx) = started().await;
    while rx.try_recv().is_ok() {}

    let mut handles = Vec::new();
    for (seat, name) in PLAYERS.iter().enumerate() {
        let dispatcher = Arc::clone(&dispatcher);
        let name = name.to_string();
        handles.push(tokio::spawn(async move {
            let mut accepted = 0;
            for i in 0..30 {
                let line = if i % 3 == 2 {
                    "ENDT".to_string()
                } else {
                    format!("BUYT${}${}", (seat * 2 + i) % 8, (i / 3) % 7)
                };
                let command = Command::parse(&line, &name).unwrap();
                if dispatcher.process_command(&command).await.starts_with("OK") {
                    accepted += 1;
                }
                tokio::task::yield_now().await;
            }
            accepted
        }));
    }

    let mut accepted = 0;
    for handle in handles {
        accepted += handle.await.unwrap();
    }

    let mut syncs = Vec::new();
    while let Ok(message) = rx.try_recv() {
        if let Outbound::Broadcast { text } = message {
            if text.starts_with("SYNC$") {
                syncs.push(text);
            }
        }
    }
    assert_eq!(syncs.len(), accepted);

    // Every accepted action either buys a tile or moves the turn on
    for pair in syncs.windows(2) {
        let (before, after) = (progress(&pair[0]), progress(&pair[1]));
        assert!(before < after, "{:?} broadcast after {:?}", after, before);
    }
    if let Some(last) = syncs.last() {
        assert_eq!(*last, dispatcher.snapshot().await);
    }
}

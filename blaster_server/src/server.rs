//! Server implementation.
//!
//! An authoritative host loop around one `World`. It supports:
//! - Event submission over an `mpsc` channel (ordered by arrival)
//! - Console commands (status, scores, join, leave, thrust, fire, initials, quit)
//! - Highscore load at startup and save on change
//! - Snapshot publication over a `watch` channel
//!
//! Determinism notes:
//! - The world only advances in `step`, never mid-event.
//! - Events are applied in the order they were received, before the tick.
//! - Persistence and logging happen outside the world and cannot affect it.

use std::sync::Arc;

use blaster_shared::{
    config::BlasterConfig,
    event::{EventQueue, InputEvent, PlayerId, SessionEvent},
    highscore::{HighscoreStore, HighscoreTable, JsonFileStore, MemoryStore},
    sim::World,
    snapshot::WorldSnapshot,
};
use tokio::{
    sync::{mpsc, watch},
    time::Instant,
};
use tracing::{debug, info, warn};

/// Capacity of the event submission channel.
const EVENT_CHANNEL_CAPACITY: usize = 1024;

/// Game server.
pub struct GameServer {
    pub cfg: BlasterConfig,
    world: World,

    /// Events waiting for the next tick, in arrival order.
    pending: EventQueue,
    events_tx: mpsc::Sender<SessionEvent>,
    events_rx: mpsc::Receiver<SessionEvent>,

    snapshots: watch::Sender<WorldSnapshot>,
    store: Arc<dyn HighscoreStore>,

    /// Channel for console commands from stdin.
    console_rx: Option<mpsc::Receiver<String>>,
    shutdown: bool,
}

impl GameServer {
    /// Creates a server, loading persisted highscores from `store`.
    /// A failed load is logged and the session starts with an empty table.
    pub async fn new(cfg: BlasterConfig, store: Arc<dyn HighscoreStore>) -> anyhow::Result<Self> {
        let table = match store.load().await {
            Ok(table) => {
                info!(entries = table.len(), "Highscores loaded");
                table
            }
            Err(e) => {
                warn!(error = %e, "Failed to load highscores, starting empty");
                HighscoreTable::new()
            }
        };

        let world = World::with_config(&cfg).with_highscores(table);
        let (events_tx, events_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let (snapshots, _) = watch::channel(WorldSnapshot::capture(&world));

        info!(seed = cfg.seed, tick_ms = cfg.tick_ms, "World created");

        Ok(Self {
            cfg,
            world,
            pending: EventQueue::new(),
            events_tx,
            events_rx,
            snapshots,
            store,
            console_rx: None,
            shutdown: false,
        })
    }

    /// Creates a server persisting to `cfg.highscores_path`.
    pub async fn with_file_store(cfg: BlasterConfig) -> anyhow::Result<Self> {
        let store = Arc::new(JsonFileStore::new(&cfg.highscores_path));
        info!(path = %store.path().display(), "Using highscore file");
        Self::new(cfg, store).await
    }

    /// Sets the console input receiver.
    pub fn set_console_input(&mut self, rx: mpsc::Receiver<String>) {
        self.console_rx = Some(rx);
    }

    /// Sender for submitting events from other tasks.
    pub fn handle(&self) -> mpsc::Sender<SessionEvent> {
        self.events_tx.clone()
    }

    /// Receiver that always holds the latest snapshot.
    pub fn subscribe(&self) -> watch::Receiver<WorldSnapshot> {
        self.snapshots.subscribe()
    }

    /// Queues an event for the next tick.
    pub fn submit(&mut self, event: SessionEvent) {
        self.pending.push(event);
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    /// Whether `quit` was issued.
    pub fn is_shutdown(&self) -> bool {
        self.shutdown
    }

    /// Runs the server for a number of ticks at the configured rate.
    pub async fn run_for_ticks(&mut self, ticks: u32) -> anyhow::Result<()> {
        let dt = self.cfg.tick_interval();
        let mut next = Instant::now();

        for _ in 0..ticks {
            next += dt;
            self.step().await?;
            tokio::time::sleep_until(next).await;
        }
        Ok(())
    }

    /// Executes one fixed simulation step.
    pub async fn step(&mut self) -> anyhow::Result<()> {
        self.process_console_commands()?;
        self.recv_events();

        for event in self.pending.drain() {
            debug!(?event, tick = self.world.tick_count(), "Applying event");
            self.world.apply(event);
        }
        self.world.step();

        self.persist_highscores().await;
        self.snapshots.send_replace(WorldSnapshot::capture(&self.world));
        Ok(())
    }

    /// Saves the highscore table unconditionally, e.g. on shutdown.
    pub async fn flush_highscores(&mut self) -> anyhow::Result<()> {
        self.world.take_highscores_dirty();
        self.store.save(self.world.highscores()).await
    }

    async fn persist_highscores(&mut self) {
        if !self.world.take_highscores_dirty() {
            return;
        }
        match self.store.save(self.world.highscores()).await {
            Ok(()) => debug!(entries = self.world.highscores().len(), "Highscores saved"),
            Err(e) => {
                warn!(error = %e, "Failed to save highscores, retrying next tick");
                self.world.mark_highscores_dirty();
            }
        }
    }

    fn recv_events(&mut self) {
        while let Ok(event) = self.events_rx.try_recv() {
            self.pending.push(event);
        }
    }

    fn process_console_commands(&mut self) -> anyhow::Result<()> {
        // Collect lines first to avoid borrow conflict
        let lines: Vec<String> = if let Some(ref mut rx) = self.console_rx {
            let mut collected = Vec::new();
            while let Ok(line) = rx.try_recv() {
                collected.push(line);
            }
            collected
        } else {
            Vec::new()
        };

        for line in lines {
            for out in self.exec_console(&line)? {
                println!("{}", out);
            }
        }
        Ok(())
    }

    /// Executes a console command. Gameplay commands are queued like any
    /// other event and take effect on the next tick.
    pub fn exec_console(&mut self, line: &str) -> anyhow::Result<Vec<String>> {
        let tokens: Vec<&str> = line.split_whitespace().collect();
        if tokens.is_empty() {
            return Ok(Vec::new());
        }

        let player = |i: usize| tokens.get(i).and_then(|t| t.parse::<u32>().ok()).map(PlayerId);

        match tokens[0] {
            "status" => {
                let mut out = Vec::new();
                out.push(format!("Tick: {}", self.world.tick_count()));
                out.push(format!("Seed: {}", self.cfg.seed));
                out.push(format!("Asteroids: {}", self.world.asteroids().len()));
                out.push(format!("Blasts: {}", self.world.blasts().len()));
                out.push(format!("Ships: {}", self.world.ships().len()));
                for (id, ship) in self.world.ships().iter() {
                    out.push(format!(
                        "  player {} ship={:?} score={} hit={} initials={}",
                        ship.player,
                        id,
                        ship.score,
                        ship.hit,
                        ship.initials.as_deref().unwrap_or("-")
                    ));
                }
                Ok(out)
            }
            "scores" => {
                let ranked = self.world.highscores().ranked();
                if ranked.is_empty() {
                    return Ok(vec!["No highscores yet".to_string()]);
                }
                Ok(ranked
                    .iter()
                    .map(|e| format!("{:>3}. {:<3} {}", e.rank, e.initials, e.score))
                    .collect())
            }
            "join" | "leave" | "fire" => {
                let Some(p) = player(1) else {
                    return Ok(vec![format!("Usage: {} <player>", tokens[0])]);
                };
                let event = match tokens[0] {
                    "join" => SessionEvent::PlayerJoined(p),
                    "leave" => SessionEvent::PlayerLeft(p),
                    _ => SessionEvent::input(p, InputEvent::FireBlaster),
                };
                self.submit(event);
                Ok(Vec::new())
            }
            "thrust" => {
                let usage = || -> anyhow::Result<Vec<String>> {
                    Ok(vec![
                        "Usage: thrust <player> <left|right|forward> <on|off>".to_string(),
                    ])
                };
                let (Some(p), Some(which), Some(state)) = (player(1), tokens.get(2), tokens.get(3))
                else {
                    return usage();
                };
                let on = match *state {
                    "on" | "1" => true,
                    "off" | "0" => false,
                    _ => return usage(),
                };
                let input = match *which {
                    "left" => InputEvent::LeftThruster(on),
                    "right" => InputEvent::RightThruster(on),
                    "forward" => InputEvent::ForwardThruster(on),
                    _ => return usage(),
                };
                self.submit(SessionEvent::input(p, input));
                Ok(Vec::new())
            }
            "initials" => {
                let (Some(p), Some(text)) = (player(1), tokens.get(2)) else {
                    return Ok(vec!["Usage: initials <player> <text>".to_string()]);
                };
                self.submit(SessionEvent::input(p, InputEvent::SetInitials(text.to_string())));
                Ok(Vec::new())
            }
            "quit" | "exit" => {
                info!("Server shutting down");
                self.shutdown = true;
                Ok(Vec::new())
            }
            other => Ok(vec![format!("Unknown command: {}", other)]),
        }
    }
}

/// Helper for tests: a server backed by an in-memory store.
pub async fn in_memory(cfg: BlasterConfig) -> anyhow::Result<(GameServer, Arc<MemoryStore>)> {
    let store = Arc::new(MemoryStore::default());
    let server = GameServer::new(cfg, store.clone()).await?;
    Ok((server, store))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn console_join_takes_effect_next_tick() -> anyhow::Result<()> {
        let (mut server, _store) = in_memory(BlasterConfig::default()).await?;
        assert!(server.exec_console("join 1")?.is_empty());
        assert!(server.world().ships().is_empty());
        server.step().await?;
        assert_eq!(server.world().ships().len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn console_reports_usage_and_unknown_commands() -> anyhow::Result<()> {
        let (mut server, _store) = in_memory(BlasterConfig::default()).await?;
        assert!(server.exec_console("thrust 1 sideways on")?[0].starts_with("Usage"));
        assert!(server.exec_console("fire")?[0].starts_with("Usage"));
        assert!(server.exec_console("warp 9")?[0].starts_with("Unknown"));
        assert_eq!(server.exec_console("scores")?, vec!["No highscores yet"]);
        server.exec_console("quit")?;
        assert!(server.is_shutdown());
        Ok(())
    }

    #[tokio::test]
    async fn initials_change_is_persisted() -> anyhow::Result<()> {
        let (mut server, store) = in_memory(BlasterConfig::default()).await?;
        server.exec_console("join 1")?;
        server.exec_console("initials 1 AB")?;
        server.step().await?;
        assert_eq!(store.snapshot().await.get("AB"), Some(0));
        assert_eq!(store.save_count().await, 1);
        server.step().await?;
        assert_eq!(store.save_count().await, 1);
        Ok(())
    }

    #[tokio::test]
    async fn failing_store_does_not_stop_the_loop() -> anyhow::Result<()> {
        let store = Arc::new(MemoryStore::failing());
        let mut server = GameServer::new(BlasterConfig::default(), store).await?;
        server.submit(SessionEvent::PlayerJoined(PlayerId(1)));
        server.submit(SessionEvent::input(
            PlayerId(1),
            InputEvent::SetInitials("XY".into()),
        ));
        server.step().await?;
        server.step().await?;
        assert_eq!(server.world().highscores().get("XY"), Some(0));
        Ok(())
    }

    #[tokio::test]
    async fn failed_save_is_retried_on_a_later_tick() -> anyhow::Result<()> {
        let store = Arc::new(MemoryStore::failing());
        let mut server = GameServer::new(BlasterConfig::default(), store.clone()).await?;
        server.exec_console("join 1")?;
        server.exec_console("initials 1 RT")?;
        server.step().await?;
        server.step().await?;
        assert_eq!(store.save_count().await, 0);

        store.set_failing(false);
        server.step().await?;
        assert_eq!(store.save_count().await, 1);
        assert_eq!(store.snapshot().await.get("RT"), Some(0));

        server.step().await?;
        assert_eq!(store.save_count().await, 1);
        Ok(())
    }
}

//! Standalone server binary.
//!
//! Usage:
//!   cargo run -p blaster_server -- [--config blaster.json] [--tick-ms 50] [--seed 0] [--highscores highscores.json]
//!
//! The server runs a fixed-timestep simulation and persists highscores.
//! Players are driven from the console for now.
//!
//! Console commands:
//!   status                                   - Show world status
//!   scores                                   - Show the highscore table
//!   join <player> / leave <player>           - Add or remove a ship
//!   thrust <player> <left|right|forward> <on|off>
//!   fire <player>                            - Fire a blast
//!   initials <player> <text>                 - Claim initials
//!   quit                                     - Save and shut down

use std::env;
use std::io::{BufRead, Write};

use anyhow::Context;
use blaster_server::server::GameServer;
use blaster_shared::config::BlasterConfig;
use tokio::sync::mpsc;
use tracing::{info, warn};

fn parse_args() -> anyhow::Result<BlasterConfig> {
    let args: Vec<String> = env::args().collect();

    let mut cfg = match args.iter().position(|a| a == "--config") {
        Some(i) if i + 1 < args.len() => BlasterConfig::from_file(&args[i + 1])?,
        _ => BlasterConfig::default(),
    };

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--tick-ms" if i + 1 < args.len() => {
                cfg.tick_ms = args[i + 1].parse().context("parse --tick-ms")?;
                i += 2;
            }
            "--seed" if i + 1 < args.len() => {
                cfg.seed = args[i + 1].parse().context("parse --seed")?;
                i += 2;
            }
            "--highscores" if i + 1 < args.len() => {
                cfg.highscores_path = args[i + 1].clone();
                i += 2;
            }
            _ => i += 1,
        }
    }
    Ok(cfg)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cfg = parse_args()?;
    info!(
        tick_ms = cfg.tick_ms,
        seed = cfg.seed,
        highscores = %cfg.highscores_path,
        "Starting server"
    );

    let mut server = GameServer::with_file_store(cfg.clone())
        .await
        .context("create server")?;

    // Set up console input channel.
    let (console_tx, console_rx) = mpsc::channel::<String>(32);
    server.set_console_input(console_rx);

    // Spawn stdin reader thread.
    std::thread::spawn(move || {
        let stdin = std::io::stdin();
        let mut stdout = std::io::stdout();
        loop {
            print!("] ");
            let _ = stdout.flush();
            let mut line = String::new();
            match stdin.lock().read_line(&mut line) {
                Ok(0) | Err(_) => break,
                Ok(_) => {}
            }
            let line = line.trim().to_string();
            if !line.is_empty() && console_tx.blocking_send(line).is_err() {
                break;
            }
        }
    });

    println!("Server ready. Type 'join 1' to add a ship, 'status' for info, 'quit' to exit.");
    println!();

    // Main server loop.
    let tick_interval = cfg.tick_interval();
    let mut next_tick = tokio::time::Instant::now();

    while !server.is_shutdown() {
        server.step().await?;

        next_tick += tick_interval;
        tokio::time::sleep_until(next_tick).await;
    }

    if let Err(e) = server.flush_highscores().await {
        warn!(error = %e, "Failed to save highscores on shutdown");
    }
    info!(ticks = server.world().tick_count(), "Server stopped");
    Ok(())
}

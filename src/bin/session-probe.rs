//! Session probe - joins a room channel and prints the event log as it grows.
//!
//! ```text
//! session-probe --room ABCD1234 --player 3f2a... [--backend http://host:8000] [--ready]
//! ```

use std::cell::RefCell;
use std::process::ExitCode;
use std::rc::Rc;
use std::thread;
use std::time::{Duration, Instant};

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use strategy_session::{GameSession, LogEntry, SessionConfig, StoreChange};

const POLL_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Parser)]
#[command(name = "session-probe")]
#[command(about = "Follow a strategy game session from the command line", version)]
struct Cli {
    /// Room code
    #[arg(short, long)]
    room: String,

    /// Player id assigned when joining the room
    #[arg(short, long)]
    player: String,

    /// Backend URL (defaults to STRATEGY_BACKEND_URL or http://localhost:8000)
    #[arg(short, long)]
    backend: Option<String>,

    /// Mark the player ready once the first snapshot arrives
    #[arg(long)]
    ready: bool,
}

fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "strategy_session=info,session_probe=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .init();

    let cli = Cli::parse();
    let config = match cli.backend {
        Some(url) => SessionConfig::new(url),
        None => SessionConfig::from_env(),
    };

    let mut session = match GameSession::open(&config, &cli.room, &cli.player) {
        Ok(session) => session,
        Err(e) => {
            tracing::error!(error = %e, "Could not open session");
            return ExitCode::FAILURE;
        }
    };

    let fresh: Rc<RefCell<Vec<LogEntry>>> = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&fresh);
    session.store_mut().subscribe(move |change| {
        if let StoreChange::Logged(entry) = change {
            sink.borrow_mut().push(entry.clone());
        }
    });

    let mut ready_sent = !cli.ready;
    let mut last = Instant::now();

    loop {
        thread::sleep(POLL_INTERVAL);
        let now = Instant::now();
        let changes = session.poll(now - last);
        last = now;

        if !changes.is_empty() {
            tracing::debug!(changes = changes.len(), "Session updated");
        }

        if !ready_sent && session.room().is_some() && session.connection().is_open() {
            ready_sent = session.set_ready(true);
        }

        for entry in fresh.borrow_mut().drain(..) {
            println!(
                "[{}] {:<7} {}",
                entry.time_label(),
                entry.category.as_str(),
                entry.message
            );
        }

        if session.is_over() {
            println!("{}", session.turn_status().indicator(session.room()));
            if let Some(room) = session.room() {
                for player in room.players.values() {
                    println!(
                        "  {:<16} {:>3} VP  army {:>4} {}  {}",
                        player.name,
                        player.victory_points,
                        player.army.total(),
                        player.army.icon_summary(),
                        player.buildings_summary()
                    );
                }
            }
            break;
        }
    }

    if let Err(e) = session.close() {
        tracing::debug!(error = %e, "Session already closed");
    }
    ExitCode::SUCCESS
}

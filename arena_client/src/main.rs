//! Headless arena client binary.
//!
//! Usage:
//!   cargo run -p arena_client -- [--addr 127.0.0.1:5001] [--tick-hz 60]
//!                                [--width 1280] [--height 720]
//!                                [--config client.json] [--bot]
//!
//! Connects to the authority, runs the fixed-rate tick loop, and logs frames.
//! With `--bot` the player wanders and fires at random.
//!
//! Console commands:
//!   status            - Show session status
//!   fire [<x> <y>]    - Fire at a point (default: straight right)
//!   block / unblock   - Start or end blocking
//!   restart           - Ask the authority for a new round
//!   quit              - Exit client

use std::env;
use std::io::{BufRead, Write};
use std::time::Duration;

use anyhow::Context;
use arena_client::client::{ConnectionState, GameClient};
use arena_client::input::Key;
use arena_client::present::{LogPresenter, Presenter};
use arena_shared::{config::ClientConfig, net::Millis};
use rand::Rng;
use tokio::sync::mpsc;
use tracing::info;

struct Args {
    cfg: ClientConfig,
    bot: bool,
}

fn parse_args() -> anyhow::Result<Args> {
    let args: Vec<String> = env::args().collect();

    // The config file is the base layer; flags override it.
    let mut cfg = match args.iter().position(|a| a == "--config") {
        Some(i) if i + 1 < args.len() => {
            let path = &args[i + 1];
            let text = std::fs::read_to_string(path).with_context(|| format!("read {path}"))?;
            ClientConfig::from_json_str(&text).with_context(|| format!("parse {path}"))?
        }
        _ => ClientConfig::default(),
    };
    let mut bot = false;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--addr" if i + 1 < args.len() => {
                cfg.server_addr = args[i + 1].clone();
                i += 2;
            }
            "--tick-hz" if i + 1 < args.len() => {
                cfg.tick_hz = args[i + 1].parse().unwrap_or(60);
                i += 2;
            }
            "--width" if i + 1 < args.len() => {
                cfg.play_area.width = args[i + 1].parse().unwrap_or(cfg.play_area.width);
                i += 2;
            }
            "--height" if i + 1 < args.len() => {
                cfg.play_area.height = args[i + 1].parse().unwrap_or(cfg.play_area.height);
                i += 2;
            }
            "--bot" => {
                bot = true;
                i += 1;
            }
            _ => i += 1,
        }
    }
    cfg.validate().context("invalid configuration")?;
    Ok(Args { cfg, bot })
}

fn now_ms() -> Millis {
    chrono::Utc::now().timestamp_millis().max(0) as Millis
}

/// Random autopilot: holds a direction for a while, fires now and then.
struct Wander {
    held: Option<Key>,
    ticks_left: u32,
}

impl Wander {
    const DIRECTIONS: [Key; 4] = [Key::ArrowUp, Key::ArrowDown, Key::ArrowLeft, Key::ArrowRight];

    fn new() -> Self {
        Self {
            held: None,
            ticks_left: 0,
        }
    }

    fn drive(&mut self, client: &mut GameClient, now: Millis) {
        let mut rng = rand::thread_rng();
        if self.ticks_left == 0 {
            if let Some(key) = self.held.take() {
                client.key_up(now, key);
            }
            let key = Self::DIRECTIONS[rng.gen_range(0..Self::DIRECTIONS.len())];
            client.key_down(now, key);
            self.held = Some(key);
            self.ticks_left = rng.gen_range(20..90);
        }
        self.ticks_left -= 1;

        if rng.gen_bool(0.05) {
            let area = *client.session.play_area();
            let x = rng.gen_range(0.0..area.width);
            let y = rng.gen_range(0.0..area.height);
            client.click(now, x, y);
        }
        if rng.gen_bool(0.01) {
            client.key_down(now, Key::Shift);
        } else if client.session.local().is_blocking() && rng.gen_bool(0.05) {
            client.key_up(now, Key::Shift);
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let Args { cfg, bot } = parse_args()?;
    info!(server = %cfg.server_addr, tick_hz = cfg.tick_hz, bot, "Starting client");

    let mut client = GameClient::connect(&cfg).await.context("connect")?;
    let mut presenter = LogPresenter::new(u64::from(cfg.tick_hz) * 5);
    let mut wander = bot.then(Wander::new);

    // Set up console input channel.
    let (console_tx, mut console_rx) = mpsc::channel::<String>(32);

    // Spawn stdin reader thread.
    std::thread::spawn(move || {
        let stdin = std::io::stdin();
        let mut stdout = std::io::stdout();
        loop {
            print!("] ");
            let _ = stdout.flush();
            let mut line = String::new();
            if stdin.lock().read_line(&mut line).is_err() {
                break;
            }
            let line = line.trim().to_string();
            if !line.is_empty() && console_tx.blocking_send(line).is_err() {
                break;
            }
        }
    });

    println!("Client connected. Type 'status' for info, 'quit' to exit.");
    println!();

    let mut ticker = tokio::time::interval(Duration::from_secs_f32(1.0 / cfg.tick_hz as f32));
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        ticker.tick().await;
        let now = now_ms();

        while let Ok(line) = console_rx.try_recv() {
            if matches!(line.as_str(), "quit" | "exit") {
                info!("Quitting");
                return Ok(());
            }
            for out in client.exec_console(now, &line) {
                println!("{}", out);
            }
        }

        if let Some(w) = wander.as_mut() {
            w.drive(&mut client, now);
        }

        client.tick(now);
        presenter.present(&client.frame());

        if client.state == ConnectionState::Disconnected {
            println!("Disconnected from server.");
            break;
        }
    }

    Ok(())
}

//! Client implementation.
//!
//! The client maintains:
//! - One reliable connection to the authority, split into a reader task
//!   (frames -> inbox channel) and a writer task (outbox channel -> frames)
//! - The [`ArenaSession`] simulation context, fed from the inbox once per tick
//! - Held-key input state
//! - A small console for user commands

use std::net::SocketAddr;

use anyhow::Context;
use arena_shared::{
    config::ClientConfig,
    math::Vec2,
    net::{
        decode_from_bytes, ClientMsg, FrameReader, FrameWriter, Millis, ReliableConn, ServerMsg,
    },
};
use tokio::{
    io::{AsyncRead, AsyncWrite},
    sync::mpsc::{self, error::TryRecvError},
    task::JoinHandle,
};
use tracing::{debug, info, warn};

use crate::{
    input::{InputState, Intent, Key},
    present::FrameView,
    session::ArenaSession,
};

/// Client connection state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Connected,
    /// The authority closed the stream or it failed.
    Disconnected,
}

/// High-level game client.
pub struct GameClient {
    pub session: ArenaSession,
    pub input: InputState,
    pub state: ConnectionState,

    inbox_rx: mpsc::UnboundedReceiver<ServerMsg>,
    outbox_tx: mpsc::UnboundedSender<ClientMsg>,
    reader: JoinHandle<()>,
    writer: JoinHandle<()>,
}

impl GameClient {
    /// Connects to the authority over TCP.
    pub async fn connect(cfg: &ClientConfig) -> anyhow::Result<Self> {
        let server_addr: SocketAddr = cfg.server_addr.parse().context("parse server_addr")?;
        info!(server = %server_addr, "Connecting to server");

        let conn = ReliableConn::connect(server_addr).await?;
        let (reader, writer) = conn.into_split();
        Ok(Self::with_transport(cfg, reader, writer))
    }

    /// Wires a session to any framed byte stream.
    pub fn with_transport<R, W>(cfg: &ClientConfig, reader: FrameReader<R>, writer: FrameWriter<W>) -> Self
    where
        R: AsyncRead + Unpin + Send + 'static,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let (inbox_tx, inbox_rx) = mpsc::unbounded_channel();
        let (outbox_tx, outbox_rx) = mpsc::unbounded_channel();

        Self {
            session: ArenaSession::new(cfg),
            input: InputState::new(),
            state: ConnectionState::Connected,
            inbox_rx,
            outbox_tx,
            reader: tokio::spawn(read_loop(reader, inbox_tx)),
            writer: tokio::spawn(write_loop(writer, outbox_rx)),
        }
    }

    /// Moves everything that has arrived into the session inbox.
    pub fn pump_inbox(&mut self) {
        loop {
            match self.inbox_rx.try_recv() {
                Ok(msg) => self.session.enqueue(msg),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    if self.state == ConnectionState::Connected {
                        warn!("Connection to server lost");
                        self.state = ConnectionState::Disconnected;
                    }
                    break;
                }
            }
        }
    }

    /// Advances one client tick and sends whatever it produced.
    pub fn tick(&mut self, now: Millis) {
        self.pump_inbox();
        self.session.tick(now, &self.input);
        self.flush();
    }

    pub fn key_down(&mut self, now: Millis, key: Key) {
        if let Some(intent) = self.input.key_down(key) {
            self.intent(now, intent);
        }
    }

    pub fn key_up(&mut self, now: Millis, key: Key) {
        if let Some(intent) = self.input.key_up(key) {
            self.intent(now, intent);
        }
    }

    pub fn click(&mut self, now: Millis, x: f32, y: f32) {
        let intent = self.input.click(x, y);
        self.intent(now, intent);
    }

    pub fn restart(&mut self) {
        self.session.request_restart();
        self.flush();
    }

    pub fn frame(&self) -> FrameView {
        FrameView::capture(&self.session)
    }

    fn intent(&mut self, now: Millis, intent: Intent) {
        self.session.handle_intent(now, intent);
        self.flush();
    }

    /// Hands queued messages to the writer task without waiting.
    fn flush(&mut self) {
        for msg in self.session.drain_outbox() {
            if self.outbox_tx.send(msg).is_err() {
                debug!("Writer gone, dropping outbound message");
                self.state = ConnectionState::Disconnected;
            }
        }
    }

    /// Executes a console command.
    pub fn exec_console(&mut self, now: Millis, line: &str) -> Vec<String> {
        let tokens: Vec<&str> = line.split_whitespace().collect();
        let Some(&cmd) = tokens.first() else {
            return Vec::new();
        };

        match cmd {
            "status" => {
                let s = &self.session;
                let mut out = vec![
                    format!("Connection: {:?}", self.state),
                    format!("Phase: {:?}", s.phase()),
                    format!(
                        "Session: {}",
                        s.local_id().map_or("-".to_string(), |id| id.to_string())
                    ),
                    format!(
                        "Position: ({:.1}, {:.1}) health={} blocking={}",
                        s.local().position.x,
                        s.local().position.y,
                        s.local().health,
                        s.local().is_blocking()
                    ),
                    format!("Projectiles: {}", s.projectiles().len()),
                ];
                for p in s.world().ordered() {
                    out.push(format!(
                        "  #{} {}: health={:?} alive={:?}",
                        p.display_number.map_or("?".to_string(), |n| n.to_string()),
                        p.id,
                        p.health,
                        p.alive
                    ));
                }
                out
            }
            "restart" => {
                self.restart();
                vec!["Restart requested".to_string()]
            }
            "fire" => {
                let target = match tokens[1..] {
                    [x, y] => match (x.parse::<f32>(), y.parse::<f32>()) {
                        (Ok(x), Ok(y)) => Vec2::new(x, y),
                        _ => return vec!["Usage: fire <x> <y>".to_string()],
                    },
                    [] => self.session.local().default_fire_target(),
                    _ => return vec!["Usage: fire [<x> <y>]".to_string()],
                };
                self.intent(now, Intent::FireAt(target));
                Vec::new()
            }
            "block" => {
                self.intent(now, Intent::BlockStart);
                Vec::new()
            }
            "unblock" => {
                self.intent(now, Intent::BlockEnd);
                Vec::new()
            }
            other => vec![format!("Unknown command: {other}")],
        }
    }
}

impl Drop for GameClient {
    fn drop(&mut self) {
        self.reader.abort();
        self.writer.abort();
    }
}

async fn read_loop<R>(mut reader: FrameReader<R>, inbox: mpsc::UnboundedSender<ServerMsg>)
where
    R: AsyncRead + Unpin,
{
    loop {
        let payload = match reader.recv_frame().await {
            Ok(Some(payload)) => payload,
            Ok(None) => {
                info!("Server closed the connection");
                break;
            }
            Err(e) => {
                warn!(error = %e, "Reliable connection error");
                break;
            }
        };
        match decode_from_bytes::<ServerMsg>(&payload) {
            Ok(msg) => {
                if inbox.send(msg).is_err() {
                    break;
                }
            }
            Err(e) => warn!(error = %e, len = payload.len(), "Skipping malformed frame"),
        }
    }
}

async fn write_loop<W>(mut writer: FrameWriter<W>, mut outbox: mpsc::UnboundedReceiver<ClientMsg>)
where
    W: AsyncWrite + Unpin,
{
    while let Some(msg) = outbox.recv().await {
        if let Err(e) = writer.send(&msg).await {
            warn!(error = %e, "Failed to send to server");
            break;
        }
    }
}

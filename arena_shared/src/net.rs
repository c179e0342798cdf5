//! Networking primitives.
//!
//! Goals:
//! - Name every message the client and the authority exchange.
//! - Provide one reliable, ordered channel (length-prefixed JSON frames over
//!   any async byte stream, TCP in production).
//! - Keep serialization explicit and versionable.
//!
//! Delivery is fire-and-forget: nothing here acknowledges or resends.

use std::{collections::BTreeMap, fmt, net::SocketAddr};

use anyhow::Context;
use bytes::{BufMut, Bytes, BytesMut};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tokio::{
    io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt},
    net::{
        tcp::{OwnedReadHalf, OwnedWriteHalf},
        TcpStream,
    },
};
use tracing::debug;

/// Milliseconds on a wall clock shared by the client's own timers.
pub type Millis = u64;

/// Frames larger than this are treated as a protocol violation.
pub const MAX_FRAME_LEN: usize = 1 << 20;

/// Server-assigned identifier of one connected client.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(pub String);

impl SessionId {
    pub fn new(id: impl Into<String>) -> Self {
        SessionId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One player as the authority reports it in a roster.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RosterEntry {
    pub x: f32,
    pub y: f32,
    #[serde(default)]
    pub block: bool,
    #[serde(default)]
    pub last_shot: Millis,
    /// Authority-side health; may arrive fractional or below zero.
    pub health: f32,
    pub alive: bool,
    /// Display number assigned in join order.
    pub number: u32,
    #[serde(default)]
    pub upgrade: u32,
}

/// Full world roster keyed by session.
pub type Roster = BTreeMap<SessionId, RosterEntry>;

/// Client -> server messages.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum ClientMsg {
    /// Heartbeat position report, sent every playing tick.
    PlayerMovement { x: f32, y: f32, blocking: bool },
    /// A locally predicted shot.
    Shoot {
        x: f32,
        y: f32,
        vx: f32,
        vy: f32,
        damage: f32,
    },
    /// A locally detected hit on an unblocked target.
    PlayerHit {
        target: SessionId,
        damage: f32,
        shooter: SessionId,
    },
    RestartGame,
}

/// Server -> client messages.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum ServerMsg {
    /// Assigns the local session id.
    ConnectAck { session: SessionId },
    /// Full roster, broadcast whenever someone joins.
    CurrentPlayers(Roster),
    PlayerMoved {
        id: SessionId,
        x: f32,
        y: f32,
        blocking: bool,
    },
    PlayerDisconnected { id: SessionId },
    ProjectileFired {
        shooter: SessionId,
        x: f32,
        y: f32,
        vx: f32,
        vy: f32,
        damage: f32,
        timestamp: Millis,
    },
    HealthUpdate { id: SessionId, health: f32 },
    PlayerDied { id: SessionId },
    GameOver { winner: SessionId },
    /// Full roster after the authority reset every player.
    GameRestarted(Roster),
}

/// Reads length-prefixed JSON frames.
#[derive(Debug)]
pub struct FrameReader<R> {
    inner: R,
}

impl<R: AsyncRead + Unpin> FrameReader<R> {
    pub fn new(inner: R) -> Self {
        Self { inner }
    }

    /// Reads the next raw frame payload. Returns `Ok(None)` on a clean end
    /// of stream.
    pub async fn recv_frame(&mut self) -> anyhow::Result<Option<Bytes>> {
        let mut len_buf = [0u8; 4];
        match self.inner.read_exact(&mut len_buf).await {
            Ok(_) => {}
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
            Err(e) => return Err(e).context("read frame len"),
        }
        let len = u32::from_be_bytes(len_buf) as usize;
        if len > MAX_FRAME_LEN {
            anyhow::bail!("frame of {len} bytes exceeds limit of {MAX_FRAME_LEN}");
        }
        let mut payload = BytesMut::zeroed(len);
        self.inner
            .read_exact(&mut payload)
            .await
            .context("read frame payload")?;
        Ok(Some(payload.freeze()))
    }

    /// Reads and decodes the next frame.
    pub async fn recv<T: DeserializeOwned>(&mut self) -> anyhow::Result<Option<T>> {
        match self.recv_frame().await? {
            Some(payload) => decode_from_bytes(&payload).map(Some),
            None => Ok(None),
        }
    }
}

/// Writes length-prefixed JSON frames.
#[derive(Debug)]
pub struct FrameWriter<W> {
    inner: W,
}

impl<W: AsyncWrite + Unpin> FrameWriter<W> {
    pub fn new(inner: W) -> Self {
        Self { inner }
    }

    pub async fn send<T: Serialize>(&mut self, msg: &T) -> anyhow::Result<()> {
        let payload = serde_json::to_vec(msg).context("serialize frame")?;
        let mut buf = BytesMut::with_capacity(4 + payload.len());
        buf.put_u32(payload.len() as u32);
        buf.extend_from_slice(&payload);
        self.inner.write_all(&buf).await.context("write frame")?;
        self.inner.flush().await.context("flush frame")?;
        Ok(())
    }
}

/// Reliable ordered connection to the authority.
#[derive(Debug)]
pub struct ReliableConn {
    stream: TcpStream,
}

impl ReliableConn {
    pub fn new(stream: TcpStream) -> Self {
        Self { stream }
    }

    pub async fn connect(addr: SocketAddr) -> anyhow::Result<Self> {
        let stream = TcpStream::connect(addr).await.context("tcp connect")?;
        stream.set_nodelay(true).context("tcp nodelay")?;
        debug!(%addr, local = ?stream.local_addr().ok(), "Reliable connection established");
        Ok(Self { stream })
    }

    /// Splits into independently owned read and write halves.
    pub fn into_split(self) -> (FrameReader<OwnedReadHalf>, FrameWriter<OwnedWriteHalf>) {
        let (r, w) = self.stream.into_split();
        (FrameReader::new(r), FrameWriter::new(w))
    }
}

/// Decodes one frame payload.
pub fn decode_from_bytes<T: DeserializeOwned>(b: &[u8]) -> anyhow::Result<T> {
    serde_json::from_slice(b).context("deserialize")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roster_keys_serialize_as_plain_strings() {
        let mut roster = Roster::new();
        roster.insert(
            SessionId::new("abc"),
            RosterEntry {
                x: 100.0,
                y: 100.0,
                block: false,
                last_shot: 0,
                health: 100.0,
                alive: true,
                number: 1,
                upgrade: 0,
            },
        );
        let json = serde_json::to_string(&ServerMsg::CurrentPlayers(roster)).unwrap();
        assert!(json.contains(r#""abc":{"#), "{json}");
    }

    #[test]
    fn roster_entry_optional_fields_default() {
        let entry: RosterEntry =
            decode_from_bytes(br#"{"x":1,"y":2,"health":87.5,"alive":true,"number":4}"#).unwrap();
        assert!(!entry.block);
        assert_eq!(entry.upgrade, 0);
        assert_eq!(entry.health, 87.5);
    }

    #[tokio::test]
    async fn frames_survive_a_duplex_pipe() -> anyhow::Result<()> {
        let (a, b) = tokio::io::duplex(1024);
        let mut writer = FrameWriter::new(a);
        let mut reader = FrameReader::new(b);

        writer.send(&ClientMsg::RestartGame).await?;
        writer
            .send(&ClientMsg::PlayerMovement {
                x: 1.0,
                y: 2.0,
                blocking: true,
            })
            .await?;
        drop(writer);

        assert_eq!(reader.recv::<ClientMsg>().await?, Some(ClientMsg::RestartGame));
        assert!(matches!(
            reader.recv::<ClientMsg>().await?,
            Some(ClientMsg::PlayerMovement { blocking: true, .. })
        ));
        assert_eq!(reader.recv::<ClientMsg>().await?, None);
        Ok(())
    }

    #[tokio::test]
    async fn oversized_frame_is_rejected() {
        let (mut a, b) = tokio::io::duplex(64);
        let mut reader = FrameReader::new(b);
        a.write_all(&((MAX_FRAME_LEN as u32) + 1).to_be_bytes())
            .await
            .unwrap();
        assert!(reader.recv::<ServerMsg>().await.is_err());
    }
}

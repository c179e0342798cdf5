//! In-process arena harness for integration tests.
//!
//! [`Referee`] is a minimal stand-in for the authoritative server: it keeps
//! the roster, stamps shots, applies hit reports and decides the round.
//! [`LocalArena`] seats several [`ArenaSession`]s around one referee and
//! relays messages between them, one tick at a time, with no sockets.

use std::collections::BTreeMap;

use arena_client::{input::InputState, ArenaSession};
use arena_shared::{
    config::ClientConfig,
    math::Vec2,
    net::{ClientMsg, Millis, Roster, RosterEntry, ServerMsg, SessionId},
};
use tracing::debug;

/// One `PlayerHit` as the referee received it.
#[derive(Debug, Clone, PartialEq)]
pub struct HitReport {
    pub reporter: SessionId,
    pub target: SessionId,
    pub shooter: SessionId,
    pub damage: f32,
}

/// Authoritative roster and round rules.
#[derive(Debug)]
pub struct Referee {
    roster: Roster,
    spawns: BTreeMap<SessionId, Vec2>,
    joined: u32,
    max_health: f32,
    hits: Vec<HitReport>,
}

impl Referee {
    pub fn new(max_health: u8) -> Self {
        Self {
            roster: Roster::new(),
            spawns: BTreeMap::new(),
            joined: 0,
            max_health: f32::from(max_health),
            hits: Vec::new(),
        }
    }

    pub fn roster(&self) -> &Roster {
        &self.roster
    }

    pub fn entry(&self, id: &SessionId) -> Option<&RosterEntry> {
        self.roster.get(id)
    }

    /// Every hit report received so far, in arrival order.
    pub fn hits(&self) -> &[HitReport] {
        &self.hits
    }

    /// Registers a player and returns the roster broadcast.
    pub fn join(&mut self, id: SessionId, spawn: Vec2) -> ServerMsg {
        self.joined += 1;
        self.spawns.insert(id.clone(), spawn);
        self.roster.insert(
            id,
            RosterEntry {
                x: spawn.x,
                y: spawn.y,
                block: false,
                last_shot: 0,
                health: self.max_health,
                alive: true,
                number: self.joined,
                upgrade: 0,
            },
        );
        ServerMsg::CurrentPlayers(self.roster.clone())
    }

    pub fn leave(&mut self, id: &SessionId) -> ServerMsg {
        self.roster.remove(id);
        self.spawns.remove(id);
        ServerMsg::PlayerDisconnected { id: id.clone() }
    }

    /// Applies one client message; returns what goes out to everyone.
    pub fn handle(&mut self, now: Millis, from: &SessionId, msg: ClientMsg) -> Vec<ServerMsg> {
        match msg {
            ClientMsg::PlayerMovement { x, y, blocking } => {
                if let Some(entry) = self.roster.get_mut(from).filter(|e| e.alive) {
                    entry.x = x;
                    entry.y = y;
                    entry.block = blocking;
                }
                vec![ServerMsg::PlayerMoved {
                    id: from.clone(),
                    x,
                    y,
                    blocking,
                }]
            }
            ClientMsg::Shoot {
                x,
                y,
                vx,
                vy,
                damage,
            } => {
                if let Some(entry) = self.roster.get_mut(from) {
                    entry.last_shot = now;
                }
                vec![ServerMsg::ProjectileFired {
                    shooter: from.clone(),
                    x,
                    y,
                    vx,
                    vy,
                    damage,
                    timestamp: now,
                }]
            }
            ClientMsg::PlayerHit {
                target,
                damage,
                shooter,
            } => {
                self.hits.push(HitReport {
                    reporter: from.clone(),
                    target: target.clone(),
                    shooter,
                    damage,
                });
                self.apply_hit(target, damage)
            }
            ClientMsg::RestartGame => {
                for (id, entry) in self.roster.iter_mut() {
                    let spawn = self.spawns.get(id).copied().unwrap_or_default();
                    entry.x = spawn.x;
                    entry.y = spawn.y;
                    entry.block = false;
                    entry.health = self.max_health;
                    entry.alive = true;
                }
                vec![ServerMsg::GameRestarted(self.roster.clone())]
            }
        }
    }

    fn apply_hit(&mut self, target: SessionId, damage: f32) -> Vec<ServerMsg> {
        let Some(entry) = self.roster.get_mut(&target).filter(|e| e.alive) else {
            return Vec::new();
        };
        entry.health -= damage;
        if entry.health > 0.0 {
            return vec![ServerMsg::HealthUpdate {
                id: target,
                health: entry.health,
            }];
        }

        entry.alive = false;
        let mut out = vec![ServerMsg::PlayerDied { id: target }];
        let mut alive = self.roster.iter().filter(|(_, e)| e.alive);
        if let (Some((winner, _)), None) = (alive.next(), alive.next()) {
            out.push(ServerMsg::GameOver {
                winner: winner.clone(),
            });
        }
        out
    }
}

/// A client session plus the keys its player is holding.
pub struct Seat {
    pub session: ArenaSession,
    pub input: InputState,
}

/// Several sessions wired to one referee.
pub struct LocalArena {
    cfg: ClientConfig,
    pub referee: Referee,
    seats: BTreeMap<SessionId, Seat>,
    now: Millis,
}

impl LocalArena {
    pub fn new(cfg: ClientConfig, start: Millis) -> Self {
        Self {
            referee: Referee::new(cfg.tuning.max_health),
            cfg,
            seats: BTreeMap::new(),
            now: start,
        }
    }

    pub fn now(&self) -> Millis {
        self.now
    }

    /// Moves the shared clock forward without ticking anyone.
    pub fn advance(&mut self, ms: Millis) {
        self.now += ms;
    }

    /// Connects a new session and seats it at `spawn`.
    pub fn join(&mut self, id: &str, spawn: Vec2) -> SessionId {
        let id = SessionId::new(id);
        let mut session = ArenaSession::new(&self.cfg);
        session.apply(ServerMsg::ConnectAck {
            session: id.clone(),
        });
        self.seats.insert(
            id.clone(),
            Seat {
                session,
                input: InputState::new(),
            },
        );
        let roster = self.referee.join(id.clone(), spawn);
        self.broadcast(roster);
        id
    }

    pub fn leave(&mut self, id: &SessionId) {
        self.seats.remove(id);
        let msg = self.referee.leave(id);
        self.broadcast(msg);
    }

    pub fn seat(&self, id: &SessionId) -> &Seat {
        &self.seats[id]
    }

    pub fn seat_mut(&mut self, id: &SessionId) -> &mut Seat {
        self.seats.get_mut(id).expect("unknown seat")
    }

    pub fn session(&self, id: &SessionId) -> &ArenaSession {
        &self.seat(id).session
    }

    pub fn session_mut(&mut self, id: &SessionId) -> &mut ArenaSession {
        &mut self.seat_mut(id).session
    }

    /// Fires from `id` towards `target` and relays the shot.
    pub fn fire(&mut self, id: &SessionId, target: Vec2) -> bool {
        let now = self.now;
        let fired = self.session_mut(id).fire_at(now, target).is_some();
        self.relay();
        fired
    }

    pub fn restart(&mut self, id: &SessionId) {
        self.session_mut(id).request_restart();
        self.relay();
    }

    /// Ticks every seat once, relays their output, and advances the clock.
    pub fn tick(&mut self, dt: Millis) {
        let now = self.now;
        for seat in self.seats.values_mut() {
            seat.session.tick(now, &seat.input);
        }
        self.relay();
        self.now += dt;
    }

    pub fn run(&mut self, ticks: usize, dt: Millis) {
        for _ in 0..ticks {
            self.tick(dt);
        }
    }

    /// Delivers every queued client message to the referee and its answers
    /// to every seat's inbox.
    pub fn relay(&mut self) {
        let now = self.now;
        let mut outgoing = Vec::new();
        for (id, seat) in self.seats.iter_mut() {
            for msg in seat.session.drain_outbox() {
                outgoing.push((id.clone(), msg));
            }
        }
        for (from, msg) in outgoing {
            for reply in self.referee.handle(now, &from, msg) {
                self.broadcast(reply);
            }
        }
    }

    fn broadcast(&mut self, msg: ServerMsg) {
        debug!(?msg, seats = self.seats.len(), "Broadcast");
        for seat in self.seats.values_mut() {
            seat.session.enqueue(msg.clone());
        }
    }
}

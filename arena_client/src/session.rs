//! Session context and reconciliation.
//!
//! [`ArenaSession`] owns everything the client simulates: the local player,
//! the world snapshot, in-flight projectiles, the session phase, and the
//! inbound/outbound message queues. One controller drives it:
//!
//! ```text
//! tick(now, input):
//!   while playing:
//!     local player (movement, block expiry) -> movement heartbeat
//!     projectiles (integrate, collide, expire) -> hit reports
//!   drain inbox in arrival order -> apply()
//! ```
//!
//! Inbound messages are queued with [`ArenaSession::enqueue`] and applied at
//! the end of the next tick, so ordering against local prediction is always
//! "this tick's prediction, then everything that arrived before it ended".
//! Each handler touches only its own fields; the last write wins.
//!
//! Outbound messages are fire-and-forget. Nothing is acknowledged or resent,
//! so a lost report leaves the authority's view behind until the next
//! heartbeat (movement) or forever (shots, hits).

use std::collections::VecDeque;

use arena_shared::{
    config::{ClientConfig, HitReporting, Tuning},
    math::Vec2,
    net::{ClientMsg, Millis, Roster, ServerMsg, SessionId},
    physics::PlayArea,
};
use tracing::{debug, info, warn};

use crate::{
    input::{InputState, Intent},
    player::LocalPlayer,
    projectile::{Collision, Projectile, ProjectileSim},
    world::{health_from_wire, MoveMerge, World},
};

/// Who won, from this client's point of view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    LocalWin,
    Opponent {
        id: SessionId,
        display_number: Option<u32>,
    },
}

/// Client session phase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionPhase {
    /// Waiting for the connect acknowledgement.
    Connecting,
    Playing,
    /// Local player died; inbound updates still apply, nothing simulates.
    Dead,
    /// Round over; every simulation is frozen until a restart broadcast.
    GameOver(Outcome),
}

impl SessionPhase {
    /// Whether the death / game-over overlay should be shown.
    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionPhase::Dead | SessionPhase::GameOver(_))
    }
}

/// The simulation context.
#[derive(Debug)]
pub struct ArenaSession {
    tuning: Tuning,
    area: PlayArea,
    hit_reporting: HitReporting,

    phase: SessionPhase,
    local_id: Option<SessionId>,
    local: LocalPlayer,
    world: World,
    /// Most recent full roster, for an acknowledgement that arrives after it.
    roster: Roster,
    projectiles: ProjectileSim,

    inbox: VecDeque<ServerMsg>,
    outbox: Vec<ClientMsg>,
}

impl ArenaSession {
    pub fn new(cfg: &ClientConfig) -> Self {
        let tuning = cfg.tuning;
        let area = cfg.play_area;
        Self {
            tuning,
            area,
            hit_reporting: cfg.hit_reporting,
            phase: SessionPhase::Connecting,
            local_id: None,
            local: LocalPlayer::spawn(tuning, area),
            world: World::new(),
            roster: Roster::new(),
            projectiles: ProjectileSim::new(tuning.player_radius, tuning.projectile_radius),
            inbox: VecDeque::new(),
            outbox: Vec::new(),
        }
    }

    pub fn phase(&self) -> &SessionPhase {
        &self.phase
    }

    pub fn local_id(&self) -> Option<&SessionId> {
        self.local_id.as_ref()
    }

    pub fn local(&self) -> &LocalPlayer {
        &self.local
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn projectiles(&self) -> &ProjectileSim {
        &self.projectiles
    }

    pub fn play_area(&self) -> &PlayArea {
        &self.area
    }

    pub fn tuning(&self) -> &Tuning {
        &self.tuning
    }

    /// Queues an inbound message for the next tick.
    pub fn enqueue(&mut self, msg: ServerMsg) {
        self.inbox.push_back(msg);
    }

    pub fn pending_inbound(&self) -> usize {
        self.inbox.len()
    }

    /// Takes every outbound message produced since the last call.
    pub fn drain_outbox(&mut self) -> Vec<ClientMsg> {
        std::mem::take(&mut self.outbox)
    }

    /// Runs one tick.
    pub fn tick(&mut self, now: Millis, input: &InputState) {
        // Only a living player simulates; spectators and finished rounds
        // just apply what the authority says.
        if self.phase == SessionPhase::Playing {
            self.local.tick(now, input.movement());
            self.outbox.push(ClientMsg::PlayerMovement {
                x: self.local.position.x,
                y: self.local.position.y,
                blocking: self.local.is_blocking(),
            });
            self.sync_local();

            let collisions = self.projectiles.step(&self.world, &self.area);
            for c in collisions {
                self.report_collision(c);
            }
        }

        while let Some(msg) = self.inbox.pop_front() {
            self.apply(msg);
        }
    }

    /// Applies a device intent immediately.
    pub fn handle_intent(&mut self, now: Millis, intent: Intent) {
        // Releasing the block key always lands, whatever the phase.
        if intent == Intent::BlockEnd && self.local_id.is_some() {
            self.local.end_block(now);
            self.sync_local();
            return;
        }
        if self.phase != SessionPhase::Playing {
            debug!(?intent, phase = ?self.phase, "Intent ignored outside play");
            return;
        }
        match intent {
            Intent::BlockStart => {
                if self.local.start_block(now) {
                    debug!(now, "Block started");
                }
            }
            Intent::BlockEnd => self.local.end_block(now),
            Intent::FireAt(target) => {
                self.fire_at(now, target);
            }
            Intent::FireForward => {
                let target = self.local.default_fire_target();
                self.fire_at(now, target);
            }
        }
        self.sync_local();
    }

    /// Predicts a shot and reports it. Returns the spawned projectile.
    pub fn fire_at(&mut self, now: Millis, target: Vec2) -> Option<Projectile> {
        if self.phase != SessionPhase::Playing {
            return None;
        }
        let shooter = self.local_id.clone()?;
        let shot = self.local.try_fire(now, target, &shooter)?;
        self.outbox.push(ClientMsg::Shoot {
            x: shot.position.x,
            y: shot.position.y,
            vx: shot.velocity.x,
            vy: shot.velocity.y,
            damage: shot.damage,
        });
        self.projectiles.spawn(shot.clone());
        Some(shot)
    }

    /// The player asked for another round.
    pub fn request_restart(&mut self) {
        info!(phase = ?self.phase, "Restart requested");
        self.outbox.push(ClientMsg::RestartGame);
    }

    /// Reconciles one inbound message.
    pub fn apply(&mut self, msg: ServerMsg) {
        match msg {
            ServerMsg::ConnectAck { session } => self.on_connect_ack(session),
            ServerMsg::CurrentPlayers(roster) => self.on_roster(&roster, false),
            ServerMsg::GameRestarted(roster) => self.on_roster(&roster, true),
            ServerMsg::PlayerMoved {
                id,
                x,
                y,
                blocking,
            } => {
                if self.is_local(&id) {
                    // Our own heartbeat echoed back; prediction owns it.
                    return;
                }
                if self.world.merge_movement(&id, Vec2::new(x, y), blocking)
                    == MoveMerge::CreatedPlaceholder
                {
                    debug!(session = %id, "Placeholder created from movement");
                }
            }
            ServerMsg::PlayerDisconnected { id } => {
                if self.is_local(&id) {
                    warn!(session = %id, "Authority reported our own disconnect");
                    return;
                }
                if self.world.remove(&id).is_some() {
                    info!(session = %id, "Player disconnected");
                }
            }
            ServerMsg::ProjectileFired {
                shooter,
                x,
                y,
                vx,
                vy,
                damage,
                timestamp,
            } => {
                if self.is_local(&shooter) {
                    return;
                }
                self.projectiles.spawn(Projectile {
                    position: Vec2::new(x, y),
                    velocity: Vec2::new(vx, vy),
                    shooter,
                    created_at: timestamp,
                    damage,
                });
            }
            ServerMsg::HealthUpdate { id, health } => {
                let health = health_from_wire(health, self.tuning.max_health);
                if self.is_local(&id) {
                    self.local.set_health(health);
                }
                if self.world.set_health(&id, health) {
                    debug!(session = %id, health, "Health updated");
                }
            }
            ServerMsg::PlayerDied { id } => self.on_player_died(id),
            ServerMsg::GameOver { winner } => self.on_game_over(winner),
        }
    }

    fn is_local(&self, id: &SessionId) -> bool {
        self.local_id.as_ref() == Some(id)
    }

    /// Mirrors the local player into the world snapshot.
    fn sync_local(&mut self) {
        if let Some(id) = &self.local_id {
            self.world.insert(self.local.to_state(id));
        }
    }

    fn report_collision(&mut self, c: Collision) {
        if c.blocked {
            debug!(victim = %c.target, shooter = %c.shooter, "Shot absorbed by block");
            return;
        }
        let ours = self.is_local(&c.shooter);
        if self.hit_reporting == HitReporting::Shooter && !ours {
            return;
        }
        debug!(victim = %c.target, shooter = %c.shooter, damage = c.damage, "Hit detected");
        self.outbox.push(ClientMsg::PlayerHit {
            target: c.target,
            damage: c.damage,
            shooter: c.shooter,
        });
    }

    fn on_connect_ack(&mut self, session: SessionId) {
        info!(session = %session, "Connected");
        if let Some(entry) = self.roster.get(&session) {
            self.local.replace_from(entry);
        }
        if let Some(old) = self.local_id.replace(session) {
            self.world.remove(&old);
        }
        if self.phase == SessionPhase::Connecting {
            self.phase = if self.local.alive {
                SessionPhase::Playing
            } else {
                SessionPhase::Dead
            };
        }
        self.sync_local();
    }

    fn on_roster(&mut self, roster: &Roster, restart: bool) {
        self.world.replace_all(roster, self.tuning.max_health);
        self.roster = roster.clone();

        let local_entry = self.local_id.as_ref().and_then(|id| roster.get(id));
        match local_entry {
            Some(entry) => self.local.replace_from(entry),
            None if restart => self.local.revive(),
            None => {}
        }
        self.sync_local();

        if restart {
            self.projectiles.clear();
            if self.local_id.is_some() {
                info!(players = roster.len(), "Game restarted");
                self.phase = SessionPhase::Playing;
            }
            return;
        }

        // A join-time roster cannot end a round; only a restart can.
        match self.phase {
            SessionPhase::Playing | SessionPhase::Dead => {
                self.phase = if self.local.alive {
                    SessionPhase::Playing
                } else {
                    SessionPhase::Dead
                };
            }
            SessionPhase::Connecting | SessionPhase::GameOver(_) => {}
        }
    }

    fn on_player_died(&mut self, id: SessionId) {
        if self.is_local(&id) {
            self.local.kill();
            self.sync_local();
            if self.phase == SessionPhase::Playing {
                info!(session = %id, "You died, spectating");
                self.phase = SessionPhase::Dead;
            }
        } else if self.world.mark_dead(&id) {
            info!(session = %id, "Player died");
        }
    }

    fn on_game_over(&mut self, winner: SessionId) {
        let outcome = if self.is_local(&winner) {
            Outcome::LocalWin
        } else {
            let display_number = self.world.get(&winner).and_then(|p| p.display_number);
            Outcome::Opponent {
                id: winner,
                display_number,
            }
        };
        info!(?outcome, "Game over");
        self.phase = SessionPhase::GameOver(outcome);
    }
}

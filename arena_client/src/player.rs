//! Local player prediction.
//!
//! The locally controlled player is simulated optimistically: movement,
//! blocking and firing take effect immediately and are reported to the
//! authority afterwards. Every gate (dead, cooling down, already blocking)
//! is a silent no-op; late or repeated requests are simply dropped.

use arena_shared::{
    config::Tuning,
    math::Vec2,
    net::{Millis, RosterEntry, SessionId},
    physics::PlayArea,
};
use tracing::debug;

use crate::{projectile::Projectile, world::health_from_wire, world::PlayerState};

/// Blocking sub-state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BlockState {
    #[default]
    Idle,
    /// The authority reported a block we did not start; its timer starts
    /// at the next tick.
    Adopted,
    Active { started_at: Millis },
}

/// Locally controlled player.
#[derive(Debug, Clone)]
pub struct LocalPlayer {
    pub position: Vec2,
    pub speed: f32,
    pub health: u8,
    pub alive: bool,
    pub display_number: Option<u32>,
    pub upgrade_tier: u32,
    block: BlockState,
    /// When the last block ended; `None` if it never has.
    block_ended_at: Option<Millis>,
    last_shot_at: Option<Millis>,
    tuning: Tuning,
    area: PlayArea,
}

impl LocalPlayer {
    /// Fresh player at the centre of the play area.
    pub fn spawn(tuning: Tuning, area: PlayArea) -> Self {
        Self {
            position: area.center(),
            speed: tuning.player_speed,
            health: tuning.max_health,
            alive: true,
            display_number: None,
            upgrade_tier: 0,
            block: BlockState::Idle,
            block_ended_at: None,
            last_shot_at: None,
            tuning,
            area,
        }
    }

    pub fn block_state(&self) -> BlockState {
        self.block
    }

    pub fn is_blocking(&self) -> bool {
        matches!(self.block, BlockState::Adopted | BlockState::Active { .. })
    }

    pub fn last_shot_at(&self) -> Option<Millis> {
        self.last_shot_at
    }

    /// When the current cooldown started, if a block has ever ended.
    pub fn block_cooldown_from(&self) -> Option<Millis> {
        self.block_ended_at
    }

    /// Applies held movement and expires a block that has run its course.
    pub fn tick(&mut self, now: Millis, movement: Vec2) {
        if !self.alive {
            return;
        }
        self.position = self.area.clamp(self.position + movement * self.speed);

        match self.block {
            BlockState::Adopted => self.block = BlockState::Active { started_at: now },
            BlockState::Active { started_at }
                if now.saturating_sub(started_at) >= self.tuning.block_duration_ms =>
            {
                debug!(started_at, now, "Block expired");
                self.block = BlockState::Idle;
                self.block_ended_at = Some(now);
            }
            _ => {}
        }
    }

    pub fn start_block(&mut self, now: Millis) -> bool {
        if !self.alive || self.is_blocking() {
            return false;
        }
        if let Some(ended) = self.block_ended_at {
            if now.saturating_sub(ended) < self.tuning.block_cooldown_ms {
                debug!(ended, now, "Block still cooling down");
                return false;
            }
        }
        self.block = BlockState::Active { started_at: now };
        true
    }

    /// Ends any block and restarts the cooldown, blocking or not.
    pub fn end_block(&mut self, now: Millis) {
        self.block = BlockState::Idle;
        self.block_ended_at = Some(now);
    }

    /// Fires towards `target` if alive and off cooldown.
    pub fn try_fire(&mut self, now: Millis, target: Vec2, shooter: &SessionId) -> Option<Projectile> {
        if !self.alive {
            return None;
        }
        if let Some(last) = self.last_shot_at {
            if now.saturating_sub(last) < self.tuning.fire_cooldown_ms {
                debug!(last, now, "Fire still cooling down");
                return None;
            }
        }
        let direction = Vec2::from_angle(self.position.angle_to(target));
        self.last_shot_at = Some(now);
        Some(Projectile {
            position: self.position,
            velocity: direction * self.tuning.projectile_speed,
            shooter: shooter.clone(),
            created_at: now,
            damage: self.tuning.damage_for_tier(self.upgrade_tier),
        })
    }

    /// Target used by the fire key.
    pub fn default_fire_target(&self) -> Vec2 {
        self.position + Vec2::new(self.tuning.default_fire_offset, 0.0)
    }

    pub fn set_health(&mut self, health: u8) {
        if self.alive {
            self.health = health.min(self.tuning.max_health);
        }
    }

    pub fn kill(&mut self) {
        self.alive = false;
        self.health = 0;
        self.block = BlockState::Idle;
    }

    /// Replaces predicted state with the authority's record. Block timers
    /// start over, so a reported block runs its full duration from the next
    /// tick; the upgrade tier never goes down.
    pub fn replace_from(&mut self, entry: &RosterEntry) {
        self.position = self.area.clamp(Vec2::new(entry.x, entry.y));
        self.alive = entry.alive;
        self.health = if entry.alive {
            health_from_wire(entry.health, self.tuning.max_health)
        } else {
            0
        };
        self.display_number = Some(entry.number);
        self.upgrade_tier = self.upgrade_tier.max(entry.upgrade);
        self.block = if entry.block && entry.alive {
            BlockState::Adopted
        } else {
            BlockState::Idle
        };
        self.block_ended_at = None;
        self.last_shot_at = (entry.last_shot > 0).then_some(entry.last_shot);
    }

    /// Back on its feet with full health, keeping position and tier.
    pub fn revive(&mut self) {
        self.alive = true;
        self.health = self.tuning.max_health;
        self.block = BlockState::Idle;
        self.block_ended_at = None;
    }

    /// World-snapshot view of this player.
    pub fn to_state(&self, id: &SessionId) -> PlayerState {
        PlayerState {
            id: id.clone(),
            position: self.position,
            blocking: self.is_blocking(),
            health: Some(self.health),
            alive: Some(self.alive),
            display_number: self.display_number,
            upgrade_tier: self.upgrade_tier,
        }
    }
}

//! Projectile simulation.
//!
//! Every in-flight projectile, whether predicted locally or reported by the
//! authority, advances by the same fixed per-tick step:
//! integrate, then resolve collisions, then expire out-of-bounds shots.

use arena_shared::{
    math::Vec2,
    net::{Millis, SessionId},
    physics::{circles_overlap, PlayArea},
};
use tracing::debug;

use crate::world::World;

/// A projectile in flight.
#[derive(Debug, Clone, PartialEq)]
pub struct Projectile {
    pub position: Vec2,
    /// Displacement per tick.
    pub velocity: Vec2,
    pub shooter: SessionId,
    pub created_at: Millis,
    /// Fixed when fired.
    pub damage: f32,
}

impl Projectile {
    fn same_shot(&self, other: &Projectile) -> bool {
        self.created_at == other.created_at && self.shooter == other.shooter
    }
}

/// A projectile meeting a player this tick.
#[derive(Debug, Clone, PartialEq)]
pub struct Collision {
    pub target: SessionId,
    pub shooter: SessionId,
    pub damage: f32,
    /// The target was blocking: the shot is spent but deals nothing.
    pub blocked: bool,
}

/// Owns every in-flight projectile.
#[derive(Debug)]
pub struct ProjectileSim {
    projectiles: Vec<Projectile>,
    player_radius: f32,
    projectile_radius: f32,
}

impl ProjectileSim {
    pub fn new(player_radius: f32, projectile_radius: f32) -> Self {
        Self {
            projectiles: Vec::new(),
            player_radius,
            projectile_radius,
        }
    }

    pub fn len(&self) -> usize {
        self.projectiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.projectiles.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Projectile> {
        self.projectiles.iter()
    }

    /// Adds a projectile unless the same shot is already in flight.
    pub fn spawn(&mut self, projectile: Projectile) -> bool {
        if self.projectiles.iter().any(|p| p.same_shot(&projectile)) {
            debug!(
                shooter = %projectile.shooter,
                created_at = projectile.created_at,
                "Duplicate projectile dropped"
            );
            return false;
        }
        self.projectiles.push(projectile);
        true
    }

    pub fn clear(&mut self) {
        self.projectiles.clear();
    }

    /// Advances every projectile by one tick.
    pub fn integrate(&mut self) {
        for p in &mut self.projectiles {
            p.position += p.velocity;
        }
    }

    /// Consumes every projectile touching a living player other than its
    /// shooter. Players are tested in the world's stable order and the first
    /// match wins.
    pub fn resolve_collisions(&mut self, world: &World) -> Vec<Collision> {
        let targets: Vec<_> = world
            .ordered()
            .into_iter()
            .filter(|p| p.is_alive())
            .collect();

        let (proj_r, player_r) = (self.projectile_radius, self.player_radius);
        let mut collisions = Vec::new();
        self.projectiles.retain(|proj| {
            let hit = targets.iter().find(|t| {
                t.id != proj.shooter && circles_overlap(proj.position, proj_r, t.position, player_r)
            });
            match hit {
                Some(t) => {
                    collisions.push(Collision {
                        target: t.id.clone(),
                        shooter: proj.shooter.clone(),
                        damage: proj.damage,
                        blocked: t.blocking,
                    });
                    false
                }
                None => true,
            }
        });
        collisions
    }

    /// Drops projectiles that have left the play area. Returns how many.
    pub fn expire_out_of_bounds(&mut self, area: &PlayArea) -> usize {
        let before = self.projectiles.len();
        self.projectiles.retain(|p| area.contains(p.position));
        before - self.projectiles.len()
    }

    /// One full tick in the fixed order.
    ///
    /// A shot that starts the tick outside the area has already exited and
    /// never moves again, even if its velocity points back inside.
    pub fn step(&mut self, world: &World, area: &PlayArea) -> Vec<Collision> {
        self.expire_out_of_bounds(area);
        self.integrate();
        let collisions = self.resolve_collisions(world);
        self.expire_out_of_bounds(area);
        collisions
    }
}

//! World snapshot: every player the client knows about, keyed by session.
//!
//! Entries are created in three ways: from a full roster (everything known),
//! from the local connect acknowledgement, or as a placeholder when a
//! movement update names a session no roster has mentioned yet. Placeholders
//! carry position and blocking only; their vitals stay unknown until the
//! authority reports them, and unknown-vitals players are never hit targets.

use std::collections::{HashMap, HashSet};

use arena_shared::{
    math::Vec2,
    net::{Roster, RosterEntry, SessionId},
};

/// Converts authority-side health into the client's integer range.
pub fn health_from_wire(health: f32, max_health: u8) -> u8 {
    if health.is_nan() {
        return 0;
    }
    health.round().clamp(0.0, max_health as f32) as u8
}

/// One player as this client currently believes it to be.
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerState {
    pub id: SessionId,
    pub position: Vec2,
    pub blocking: bool,
    /// `None` until the authority reports it.
    pub health: Option<u8>,
    /// `None` until the authority reports it.
    pub alive: Option<bool>,
    pub display_number: Option<u32>,
    pub upgrade_tier: u32,
}

impl PlayerState {
    /// Entry created from a partial movement update.
    pub fn placeholder(id: SessionId, position: Vec2, blocking: bool) -> Self {
        Self {
            id,
            position,
            blocking,
            health: None,
            alive: None,
            display_number: None,
            upgrade_tier: 0,
        }
    }

    pub fn from_roster(id: SessionId, entry: &RosterEntry, max_health: u8) -> Self {
        let mut state = Self {
            id,
            position: Vec2::new(entry.x, entry.y),
            blocking: entry.block,
            health: Some(health_from_wire(entry.health, max_health)),
            alive: Some(entry.alive),
            display_number: Some(entry.number),
            upgrade_tier: entry.upgrade,
        };
        if !entry.alive {
            state.health = Some(0);
            state.blocking = false;
        }
        state
    }

    /// Only players known to be alive count; placeholders do not.
    pub fn is_alive(&self) -> bool {
        self.alive == Some(true)
    }

    pub fn is_dead(&self) -> bool {
        self.alive == Some(false)
    }
}

/// Result of merging a movement update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveMerge {
    Updated,
    CreatedPlaceholder,
    /// The session has disconnected or is dead.
    Ignored,
}

/// Session id -> player map with a deterministic iteration order.
#[derive(Debug, Default)]
pub struct World {
    players: HashMap<SessionId, PlayerState>,
    /// Sessions reported disconnected since the last roster.
    departed: HashSet<SessionId>,
}

impl World {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    pub fn get(&self, id: &SessionId) -> Option<&PlayerState> {
        self.players.get(id)
    }

    pub fn contains(&self, id: &SessionId) -> bool {
        self.players.contains_key(id)
    }

    pub fn insert(&mut self, state: PlayerState) {
        self.departed.remove(&state.id);
        self.players.insert(state.id.clone(), state);
    }

    pub fn remove(&mut self, id: &SessionId) -> Option<PlayerState> {
        self.departed.insert(id.clone());
        self.players.remove(id)
    }

    /// Players ordered by display number, then session id; unnumbered
    /// placeholders sort last.
    pub fn ordered(&self) -> Vec<&PlayerState> {
        let mut out: Vec<&PlayerState> = self.players.values().collect();
        out.sort_by(|a, b| {
            (a.display_number.is_none(), a.display_number, &a.id).cmp(&(
                b.display_number.is_none(),
                b.display_number,
                &b.id,
            ))
        });
        out
    }

    /// Replaces every entry with the roster's.
    ///
    /// Upgrade tiers never decrease for a session that survives the swap.
    pub fn replace_all(&mut self, roster: &Roster, max_health: u8) {
        let mut next = HashMap::with_capacity(roster.len());
        for (id, entry) in roster {
            let mut state = PlayerState::from_roster(id.clone(), entry, max_health);
            if let Some(prev) = self.players.get(id) {
                state.upgrade_tier = state.upgrade_tier.max(prev.upgrade_tier);
            }
            next.insert(id.clone(), state);
        }
        self.players = next;
        self.departed.clear();
    }

    /// Merges position and blocking; never touches vitals.
    pub fn merge_movement(&mut self, id: &SessionId, position: Vec2, blocking: bool) -> MoveMerge {
        if self.departed.contains(id) {
            return MoveMerge::Ignored;
        }
        match self.players.get_mut(id) {
            Some(p) if p.is_dead() => MoveMerge::Ignored,
            Some(p) => {
                p.position = position;
                p.blocking = blocking;
                MoveMerge::Updated
            }
            None => {
                self.players.insert(
                    id.clone(),
                    PlayerState::placeholder(id.clone(), position, blocking),
                );
                MoveMerge::CreatedPlaceholder
            }
        }
    }

    /// Overwrites health only. Unknown and dead sessions are left alone.
    pub fn set_health(&mut self, id: &SessionId, health: u8) -> bool {
        match self.players.get_mut(id) {
            Some(p) if !p.is_dead() => {
                p.health = Some(health);
                true
            }
            _ => false,
        }
    }

    /// Marks a known session dead.
    pub fn mark_dead(&mut self, id: &SessionId) -> bool {
        match self.players.get_mut(id) {
            Some(p) => {
                p.alive = Some(false);
                p.health = Some(0);
                p.blocking = false;
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(number: u32, health: f32, alive: bool) -> RosterEntry {
        RosterEntry {
            x: 100.0,
            y: 100.0,
            block: false,
            last_shot: 0,
            health,
            alive,
            number,
            upgrade: 0,
        }
    }

    #[test]
    fn movement_creates_placeholder_with_unknown_vitals() {
        let mut world = World::new();
        let id = SessionId::new("ghost");
        let res = world.merge_movement(&id, Vec2::new(5.0, 6.0), true);
        assert_eq!(res, MoveMerge::CreatedPlaceholder);

        let p = world.get(&id).unwrap();
        assert_eq!(p.position, Vec2::new(5.0, 6.0));
        assert!(p.blocking);
        assert_eq!(p.health, None);
        assert!(!p.is_alive());
    }

    #[test]
    fn movement_after_disconnect_is_ignored() {
        let mut world = World::new();
        let id = SessionId::new("gone");
        world.merge_movement(&id, Vec2::ZERO, false);
        world.remove(&id);

        assert_eq!(world.merge_movement(&id, Vec2::new(1.0, 1.0), false), MoveMerge::Ignored);
        assert!(!world.contains(&id));
    }

    #[test]
    fn movement_never_touches_health() {
        let mut world = World::new();
        let id = SessionId::new("p1");
        let mut roster = Roster::new();
        roster.insert(id.clone(), entry(1, 70.0, true));
        world.replace_all(&roster, 100);

        world.merge_movement(&id, Vec2::new(9.0, 9.0), false);
        assert_eq!(world.get(&id).unwrap().health, Some(70));
    }

    #[test]
    fn dead_players_do_not_move_or_heal() {
        let mut world = World::new();
        let id = SessionId::new("p1");
        let mut roster = Roster::new();
        roster.insert(id.clone(), entry(1, 40.0, true));
        world.replace_all(&roster, 100);

        assert!(world.mark_dead(&id));
        assert_eq!(world.merge_movement(&id, Vec2::new(1.0, 1.0), true), MoveMerge::Ignored);
        assert!(!world.set_health(&id, 50));
        let p = world.get(&id).unwrap();
        assert_eq!(p.health, Some(0));
        assert_eq!(p.position, Vec2::new(100.0, 100.0));
    }

    #[test]
    fn ordered_by_display_number_then_id() {
        let mut world = World::new();
        let mut roster = Roster::new();
        roster.insert(SessionId::new("zeta"), entry(1, 100.0, true));
        roster.insert(SessionId::new("beta"), entry(3, 100.0, true));
        roster.insert(SessionId::new("alpha"), entry(3, 100.0, true));
        world.replace_all(&roster, 100);
        world.merge_movement(&SessionId::new("aaa"), Vec2::ZERO, false);

        let ids: Vec<&str> = world.ordered().iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["zeta", "alpha", "beta", "aaa"]);
    }

    #[test]
    fn roster_swap_keeps_highest_upgrade_tier() {
        let mut world = World::new();
        let id = SessionId::new("p1");
        let mut roster = Roster::new();
        let mut e = entry(1, 100.0, true);
        e.upgrade = 4;
        roster.insert(id.clone(), e.clone());
        world.replace_all(&roster, 100);

        e.upgrade = 2;
        roster.insert(id.clone(), e);
        world.replace_all(&roster, 100);
        assert_eq!(world.get(&id).unwrap().upgrade_tier, 4);
    }

    #[test]
    fn wire_health_is_clamped_and_rounded() {
        assert_eq!(health_from_wire(-3.0, 100), 0);
        assert_eq!(health_from_wire(88.99, 100), 89);
        assert_eq!(health_from_wire(250.0, 100), 100);
        assert_eq!(health_from_wire(f32::NAN, 100), 0);
    }
}

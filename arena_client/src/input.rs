//! Input handling.
//!
//! Translates raw device events into discrete intents. Windowing is not this
//! crate's concern; callers feed [`Key`] presses/releases and pointer clicks,
//! and sample [`InputState::movement`] once per tick.

use arena_shared::math::Vec2;
use bitflags::bitflags;

/// Key that fires towards the player's right instead of moving.
pub const FIRE_KEY: char = 'a';

/// Raw keyboard key, as much as the arena cares about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    ArrowUp,
    ArrowDown,
    ArrowLeft,
    ArrowRight,
    Shift,
    Char(char),
}

bitflags! {
    /// Currently held movement directions.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct MoveKeys: u8 {
        const UP = 1 << 0;
        const DOWN = 1 << 1;
        const LEFT = 1 << 2;
        const RIGHT = 1 << 3;
    }
}

impl MoveKeys {
    /// Movement direction for a key, if it moves at all.
    ///
    /// `a` is reserved for firing, so left is only reachable via the arrow.
    pub fn for_key(key: Key) -> Option<MoveKeys> {
        match key {
            Key::ArrowUp | Key::Char('w') => Some(MoveKeys::UP),
            Key::ArrowDown | Key::Char('s') => Some(MoveKeys::DOWN),
            Key::ArrowLeft => Some(MoveKeys::LEFT),
            Key::ArrowRight | Key::Char('d') => Some(MoveKeys::RIGHT),
            _ => None,
        }
    }
}

/// Discrete one-shot intent produced by a device event.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Intent {
    BlockStart,
    BlockEnd,
    /// Fire towards a play-area point.
    FireAt(Vec2),
    /// Fire towards the default target to the player's right.
    FireForward,
}

/// Held-key state sampled every tick.
#[derive(Debug, Clone, Copy, Default)]
pub struct InputState {
    held: MoveKeys,
}

impl InputState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn key_down(&mut self, key: Key) -> Option<Intent> {
        if let Some(dir) = MoveKeys::for_key(key) {
            self.held.insert(dir);
        }
        match key {
            Key::Shift => Some(Intent::BlockStart),
            Key::Char(FIRE_KEY) => Some(Intent::FireForward),
            _ => None,
        }
    }

    pub fn key_up(&mut self, key: Key) -> Option<Intent> {
        if let Some(dir) = MoveKeys::for_key(key) {
            self.held.remove(dir);
        }
        match key {
            Key::Shift => Some(Intent::BlockEnd),
            _ => None,
        }
    }

    /// Pointer click at a play-area coordinate.
    pub fn click(&self, x: f32, y: f32) -> Intent {
        Intent::FireAt(Vec2::new(x, y))
    }

    /// Per-axis unit steps, not normalized: diagonals move faster.
    pub fn movement(&self) -> Vec2 {
        let axis = |neg: MoveKeys, pos: MoveKeys| {
            let mut v = 0.0;
            if self.held.contains(neg) {
                v -= 1.0;
            }
            if self.held.contains(pos) {
                v += 1.0;
            }
            v
        };
        Vec2::new(
            axis(MoveKeys::LEFT, MoveKeys::RIGHT),
            axis(MoveKeys::UP, MoveKeys::DOWN),
        )
    }
}

//! Presentation abstraction.
//!
//! This crate does not depend on a graphics backend. Once per frame the
//! session is flattened into a read-only [`FrameView`] and handed to a
//! [`Presenter`]; presenters never reach back into simulation state.

use arena_shared::{math::Vec2, net::SessionId};
use tracing::info;

use crate::session::{ArenaSession, Outcome, SessionPhase};

/// Body colour band for an upgrade tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TierColor {
    Grey,
    Red,
    Blue,
    Green,
    Gold,
    Black,
}

impl TierColor {
    pub fn for_tier(tier: u32) -> Self {
        match tier {
            0 => TierColor::Grey,
            1 => TierColor::Red,
            2 => TierColor::Blue,
            3 => TierColor::Green,
            4 => TierColor::Gold,
            _ => TierColor::Black,
        }
    }
}

/// A living player to draw.
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerView {
    pub id: SessionId,
    pub position: Vec2,
    pub display_number: Option<u32>,
    /// Health bar fill in `[0,1]`; unknown health draws empty.
    pub health_fraction: f32,
    pub blocking: bool,
    pub color: TierColor,
    pub is_local: bool,
}

/// One row of the health list, in stable display order.
#[derive(Debug, Clone, PartialEq)]
pub struct HealthRow {
    pub display_number: Option<u32>,
    pub health_fraction: f32,
}

/// Terminal-state overlay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Banner {
    pub text: String,
    pub show_restart: bool,
}

/// Everything a renderer needs for one frame.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameView {
    pub local_id: Option<SessionId>,
    pub phase: SessionPhase,
    pub players: Vec<PlayerView>,
    pub projectiles: Vec<Vec2>,
    pub health_list: Vec<HealthRow>,
    pub banner: Option<Banner>,
}

impl FrameView {
    pub fn capture(session: &ArenaSession) -> Self {
        let max = f32::from(session.tuning().max_health);
        let fraction = |h: Option<u8>| h.map_or(0.0, |h| (f32::from(h) / max).clamp(0.0, 1.0));
        let local_id = session.local_id().cloned();
        let ordered = session.world().ordered();

        let players = ordered
            .iter()
            .filter(|p| p.is_alive())
            .map(|p| PlayerView {
                id: p.id.clone(),
                position: p.position,
                display_number: p.display_number,
                health_fraction: fraction(p.health),
                blocking: p.blocking,
                color: TierColor::for_tier(p.upgrade_tier),
                is_local: local_id.as_ref() == Some(&p.id),
            })
            .collect();

        let health_list = ordered
            .iter()
            .map(|p| HealthRow {
                display_number: p.display_number,
                health_fraction: fraction(p.health),
            })
            .collect();

        Self {
            local_id,
            phase: session.phase().clone(),
            players,
            projectiles: session.projectiles().iter().map(|p| p.position).collect(),
            health_list,
            banner: banner_for(session.phase()),
        }
    }
}

fn banner_for(phase: &SessionPhase) -> Option<Banner> {
    let (text, show_restart) = match phase {
        SessionPhase::Dead => ("You died. Waiting for others...".to_string(), false),
        SessionPhase::GameOver(Outcome::LocalWin) => ("You win!".to_string(), true),
        SessionPhase::GameOver(Outcome::Opponent { display_number, .. }) => {
            let text = match display_number {
                Some(n) => format!("Player {n} wins!"),
                None => "Another player wins!".to_string(),
            };
            (text, true)
        }
        SessionPhase::Connecting | SessionPhase::Playing => return None,
    };
    Some(Banner { text, show_restart })
}

/// A minimal presentation API.
pub trait Presenter: Send {
    fn present(&mut self, frame: &FrameView);
}

/// A no-op presenter useful for headless tests.
#[derive(Default)]
pub struct NullPresenter;

impl Presenter for NullPresenter {
    fn present(&mut self, _frame: &FrameView) {}
}

/// Headless presenter: logs banner changes and a periodic summary.
pub struct LogPresenter {
    every: u64,
    frames: u64,
    last_banner: Option<Banner>,
}

impl LogPresenter {
    pub fn new(every: u64) -> Self {
        Self {
            every: every.max(1),
            frames: 0,
            last_banner: None,
        }
    }
}

impl Presenter for LogPresenter {
    fn present(&mut self, frame: &FrameView) {
        if frame.banner != self.last_banner {
            if let Some(b) = &frame.banner {
                info!(text = %b.text, restart = b.show_restart, "Overlay shown");
            } else if self.last_banner.is_some() {
                info!("Overlay hidden");
            }
            self.last_banner = frame.banner.clone();
        }
        if self.frames % self.every == 0 {
            info!(
                phase = ?frame.phase,
                players = frame.players.len(),
                projectiles = frame.projectiles.len(),
                "Frame"
            );
        }
        self.frames += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arena_shared::{
        config::ClientConfig,
        net::{Roster, RosterEntry, ServerMsg},
    };

    fn entry(number: u32, health: f32, upgrade: u32) -> RosterEntry {
        RosterEntry {
            x: 50.0,
            y: 50.0,
            block: false,
            last_shot: 0,
            health,
            alive: health > 0.0,
            number,
            upgrade,
        }
    }

    fn session() -> ArenaSession {
        let mut s = ArenaSession::new(&ClientConfig::default());
        s.apply(ServerMsg::ConnectAck {
            session: SessionId::new("me"),
        });
        let mut roster = Roster::new();
        roster.insert(SessionId::new("me"), entry(2, 100.0, 0));
        roster.insert(SessionId::new("rival"), entry(1, 45.0, 4));
        roster.insert(SessionId::new("fallen"), entry(3, 0.0, 7));
        s.apply(ServerMsg::CurrentPlayers(roster));
        s
    }

    #[test]
    fn tier_colors() {
        assert_eq!(TierColor::for_tier(0), TierColor::Grey);
        assert_eq!(TierColor::for_tier(4), TierColor::Gold);
        assert_eq!(TierColor::for_tier(9), TierColor::Black);
    }

    #[test]
    fn frame_lists_living_players_and_every_health_row() {
        let frame = FrameView::capture(&session());

        let drawn: Vec<&str> = frame.players.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(drawn, vec!["rival", "me"]);
        assert_eq!(frame.players[0].color, TierColor::Gold);
        assert!(frame.players[1].is_local);

        let rows: Vec<(Option<u32>, f32)> = frame
            .health_list
            .iter()
            .map(|r| (r.display_number, r.health_fraction))
            .collect();
        assert_eq!(rows, vec![(Some(1), 0.45), (Some(2), 1.0), (Some(3), 0.0)]);
        assert_eq!(frame.banner, None);
    }

    #[test]
    fn banners_follow_phase() {
        let mut s = session();
        s.apply(ServerMsg::PlayerDied {
            id: SessionId::new("me"),
        });
        let banner = FrameView::capture(&s).banner.unwrap();
        assert_eq!(banner.text, "You died. Waiting for others...");
        assert!(!banner.show_restart);

        s.apply(ServerMsg::GameOver {
            winner: SessionId::new("rival"),
        });
        let banner = FrameView::capture(&s).banner.unwrap();
        assert_eq!(banner.text, "Player 1 wins!");
        assert!(banner.show_restart);
    }
}

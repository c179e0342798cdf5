//! Multi-session rounds played through the in-process referee.

use arena_client::{input::Intent, present::FrameView, Outcome, SessionPhase};
use arena_shared::{
    config::{ClientConfig, HitReporting},
    math::Vec2,
    net::{ServerMsg, SessionId},
};
use arena_tests::LocalArena;

const T0: u64 = 100_000;
const DT: u64 = 16;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("info")
        .with_test_writer()
        .try_init();
}

/// "a" and "b" 15 units apart, settled so every world agrees on positions.
fn duel(cfg: ClientConfig) -> (LocalArena, SessionId, SessionId) {
    init_tracing();
    let mut arena = LocalArena::new(cfg, T0);
    let a = arena.join("a", Vec2::new(100.0, 100.0));
    let b = arena.join("b", Vec2::new(115.0, 100.0));
    arena.run(3, DT);
    (arena, a, b)
}

fn health_in(arena: &LocalArena, viewer: &SessionId, id: &SessionId) -> Option<u8> {
    arena.session(viewer).world().get(id).and_then(|p| p.health)
}

/// Lands one shot from `a` on `b` after the fire cooldown.
fn land_hit(arena: &mut LocalArena, a: &SessionId, b: &SessionId) {
    arena.advance(600);
    let target = arena.session(a).world().get(b).map(|p| p.position).unwrap();
    assert!(arena.fire(a, target));
    arena.run(3, DT);
}

#[test]
fn settled_worlds_agree() {
    let (arena, a, b) = duel(ClientConfig::default());
    for viewer in [&a, &b] {
        let s = arena.session(viewer);
        assert_eq!(s.phase(), &SessionPhase::Playing);
        assert_eq!(s.world().len(), 2);
        assert_eq!(s.world().get(&a).unwrap().position, Vec2::new(100.0, 100.0));
        assert_eq!(s.world().get(&b).unwrap().position, Vec2::new(115.0, 100.0));
    }
    assert_eq!(arena.session(&b).local().display_number, Some(2));
}

#[test]
fn unblocked_hit_costs_ten_health() {
    let (mut arena, a, b) = duel(ClientConfig::default());

    assert!(arena.fire(&a, Vec2::new(115.0, 100.0)));
    arena.run(3, DT);

    assert_eq!(arena.referee.entry(&b).unwrap().health, 90.0);
    assert_eq!(arena.session(&b).local().health, 90);
    assert_eq!(health_in(&arena, &a, &b), Some(90));
    assert_eq!(health_in(&arena, &b, &a), Some(100));

    // Only the shooter reports, and only once.
    let hits = arena.referee.hits();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].reporter, a);
    assert_eq!(hits[0].target, b);
    assert_eq!(hits[0].damage, 10.0);

    assert!(arena.session(&a).projectiles().is_empty());
    assert!(arena.session(&b).projectiles().is_empty());
}

#[test]
fn blocked_hit_is_not_reported() {
    let (mut arena, a, b) = duel(ClientConfig::default());
    land_hit(&mut arena, &a, &b);

    let now = arena.now();
    arena.session_mut(&b).handle_intent(now, Intent::BlockStart);
    arena.run(3, DT);
    assert!(arena.session(&a).world().get(&b).unwrap().blocking);
    assert!(arena.referee.entry(&b).unwrap().block);

    land_hit(&mut arena, &a, &b);

    assert_eq!(arena.referee.hits().len(), 1);
    assert_eq!(arena.referee.entry(&b).unwrap().health, 90.0);
    assert_eq!(arena.session(&b).local().health, 90);
    assert!(arena.session(&a).projectiles().is_empty());
}

#[test]
fn fire_cooldown_holds_across_the_wire() {
    let (mut arena, a, _b) = duel(ClientConfig::default());
    assert!(arena.fire(&a, Vec2::new(115.0, 100.0)));
    arena.advance(100);
    assert!(!arena.fire(&a, Vec2::new(115.0, 100.0)));
    arena.advance(500);
    assert!(arena.fire(&a, Vec2::new(115.0, 100.0)));
}

#[test]
fn last_player_standing_wins() {
    let (mut arena, a, b) = duel(ClientConfig::default());
    for _ in 0..10 {
        land_hit(&mut arena, &a, &b);
    }

    assert!(!arena.referee.entry(&b).unwrap().alive);
    assert_eq!(arena.session(&a).phase(), &SessionPhase::GameOver(Outcome::LocalWin));
    assert_eq!(
        arena.session(&b).phase(),
        &SessionPhase::GameOver(Outcome::Opponent {
            id: a.clone(),
            display_number: Some(1),
        })
    );
    assert!(!arena.session(&b).local().alive);
    assert!(arena.session(&a).world().get(&b).unwrap().is_dead());

    let banner = FrameView::capture(arena.session(&b)).banner.unwrap();
    assert_eq!(banner.text, "Player 1 wins!");
    assert!(banner.show_restart);
    assert_eq!(FrameView::capture(arena.session(&a)).banner.unwrap().text, "You win!");

    // Nothing moves once the round is decided.
    let frozen = arena.session(&a).local().position;
    arena.seat_mut(&a).input.key_down(arena_client::input::Key::ArrowRight);
    arena.run(5, DT);
    assert_eq!(arena.session(&a).local().position, frozen);
}

#[test]
fn restart_revives_everyone() {
    let (mut arena, a, b) = duel(ClientConfig::default());
    for _ in 0..10 {
        land_hit(&mut arena, &a, &b);
    }
    assert!(arena.session(&b).phase().is_terminal());

    arena.restart(&b);
    arena.run(2, DT);

    for viewer in [&a, &b] {
        let s = arena.session(viewer);
        assert_eq!(s.phase(), &SessionPhase::Playing);
        assert!(s.projectiles().is_empty());
        for id in [&a, &b] {
            let p = s.world().get(id).unwrap();
            assert!(p.is_alive());
            assert_eq!(p.health, Some(100));
        }
    }
    assert_eq!(arena.session(&b).local().position, Vec2::new(115.0, 100.0));
    assert!(FrameView::capture(arena.session(&b)).banner.is_none());

    // The new round is playable.
    land_hit(&mut arena, &a, &b);
    assert_eq!(arena.session(&b).local().health, 90);
}

#[test]
fn dead_player_spectates_while_others_fight() {
    init_tracing();
    let mut arena = LocalArena::new(ClientConfig::default(), T0);
    let a = arena.join("a", Vec2::new(100.0, 100.0));
    let b = arena.join("b", Vec2::new(115.0, 100.0));
    let c = arena.join("c", Vec2::new(900.0, 500.0));
    arena.run(3, DT);

    for _ in 0..10 {
        land_hit(&mut arena, &a, &b);
    }

    assert_eq!(arena.session(&b).phase(), &SessionPhase::Dead);
    assert_eq!(arena.session(&a).phase(), &SessionPhase::Playing);
    assert_eq!(arena.session(&c).phase(), &SessionPhase::Playing);
    assert_eq!(
        FrameView::capture(arena.session(&b)).banner.unwrap().text,
        "You died. Waiting for others..."
    );

    // A dead player cannot act.
    arena.advance(600);
    assert!(!arena.fire(&b, Vec2::new(100.0, 100.0)));

    // The spectator still receives shots but no longer simulates them.
    assert!(arena.fire(&a, Vec2::new(900.0, 100.0)));
    arena.run(2, DT);
    let seen: Vec<Vec2> = arena.session(&b).projectiles().iter().map(|p| p.position).collect();
    assert_eq!(seen, vec![Vec2::new(100.0, 100.0)]);

    // A dead body is no longer a target.
    let drawn: Vec<SessionId> = FrameView::capture(arena.session(&c))
        .players
        .into_iter()
        .map(|p| p.id)
        .collect();
    assert_eq!(drawn, vec![a.clone(), c.clone()]);
}

#[test]
fn shots_in_flight_when_the_shooter_dies_cost_nothing() {
    init_tracing();
    let mut arena = LocalArena::new(ClientConfig::default(), T0);
    let a = arena.join("a", Vec2::new(100.0, 100.0));
    let b = arena.join("b", Vec2::new(115.0, 100.0));
    let c = arena.join("c", Vec2::new(715.0, 100.0));
    arena.run(3, DT);

    // "b" shoots at "c", 600 units away, then dies before the shot lands.
    arena.advance(600);
    assert!(arena.fire(&b, Vec2::new(715.0, 100.0)));
    for _ in 0..10 {
        land_hit(&mut arena, &a, &b);
    }
    assert_eq!(arena.session(&b).phase(), &SessionPhase::Dead);
    arena.run(40, DT);

    assert!(arena.referee.hits().iter().all(|h| h.reporter != b));
    assert_eq!(arena.referee.entry(&c).unwrap().health, 100.0);
}

#[test]
fn late_join_does_not_end_a_decided_round() {
    let (mut arena, a, b) = duel(ClientConfig::default());
    for _ in 0..10 {
        land_hit(&mut arena, &a, &b);
    }
    let c = arena.join("c", Vec2::new(600.0, 300.0));
    arena.run(2, DT);

    assert_eq!(arena.session(&a).phase(), &SessionPhase::GameOver(Outcome::LocalWin));
    assert!(arena.session(&a).world().contains(&c));
    assert_eq!(arena.session(&c).local().display_number, Some(3));
}

#[test]
fn departed_players_stay_gone() {
    init_tracing();
    let mut arena = LocalArena::new(ClientConfig::default(), T0);
    let a = arena.join("a", Vec2::new(100.0, 100.0));
    let c = arena.join("c", Vec2::new(600.0, 300.0));
    arena.run(3, DT);
    assert!(arena.session(&a).world().contains(&c));

    arena.leave(&c);
    arena.run(2, DT);
    assert!(!arena.session(&a).world().contains(&c));

    // A straggling movement update must not resurrect it.
    arena.session_mut(&a).apply(ServerMsg::PlayerMoved {
        id: c.clone(),
        x: 10.0,
        y: 10.0,
        blocking: false,
    });
    assert!(!arena.session(&a).world().contains(&c));
}

#[test]
fn reporting_from_every_client_counts_each_hit_twice() {
    let cfg = ClientConfig {
        hit_reporting: HitReporting::All,
        ..Default::default()
    };
    let (mut arena, a, b) = duel(cfg);

    assert!(arena.fire(&a, Vec2::new(115.0, 100.0)));
    arena.run(3, DT);

    let reporters: Vec<&SessionId> = arena.referee.hits().iter().map(|h| &h.reporter).collect();
    assert_eq!(reporters, vec![&a, &b]);
    assert_eq!(arena.referee.entry(&b).unwrap().health, 80.0);
    assert_eq!(arena.session(&b).local().health, 80);
}

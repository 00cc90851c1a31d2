use std::cell::RefCell;
use std::collections::BTreeSet;
use std::rc::Rc;

use glam::Vec2;

use super::*;
use crate::consts::PHYSICS_DT;
use crate::platform::{ManualFrameScheduler, Tickers, due_ticks, fire_pending};
use crate::renderer::HeadlessSurface;

type Pending = Rc<RefCell<BTreeSet<FrameRequest>>>;

fn game_with(settings: Settings) -> (ArcherGame, Pending) {
    let (game, pending, _) = clocked_game(settings);
    (game, pending)
}

/// Game plus both scheduler views, for tests that drive the loop only
/// through scheduled callbacks
fn clocked_game(settings: Settings) -> (ArcherGame, Pending, Tickers) {
    let scheduler = ManualFrameScheduler::new();
    let pending = scheduler.pending();
    let tickers = scheduler.tickers();
    let mut game = ArcherGame::new(settings, Box::new(scheduler));
    let report = pollster::block_on(game.initialize(
        Box::new(HeadlessSurface::new(800, 600)),
        &assets::static_loader(),
    ));
    assert!(report.substituted.is_empty());
    (game, pending, tickers)
}

fn game() -> ArcherGame {
    game_with(Settings::default()).0
}

fn step_until(game: &mut ArcherGame, max_steps: usize, done: impl Fn(&ArcherGame) -> bool) {
    for _ in 0..max_steps {
        if done(game) {
            return;
        }
        game.run_physics(PHYSICS_DT);
    }
}

fn playing(game: &ArcherGame, player: &str) -> Vec<PlayerAnimation> {
    let record = game.player(player).unwrap();
    PlayerAnimation::ALL
        .into_iter()
        .filter(|slot| game.renderer().is_playing(&record.animation_ids[slot]))
        .collect()
}

#[test]
fn test_player_is_one_body_and_four_render_entities() {
    let mut game = game();
    let walls = game.physics().body_count();
    let sprites = game.renderer().sprite_count();

    game.create_player("p1", Vec2::new(100.0, 100.0)).unwrap();
    let ids = game.player("p1").unwrap().render_ids();
    assert_eq!(ids.len(), 4);
    assert!(game.renderer().contains_sprite(&ids[0]));
    for anim in &ids[1..] {
        assert!(game.renderer().contains_animation(anim));
    }
    assert_eq!(game.physics().body_count(), walls + 1);
    assert_eq!(game.renderer().is_visible("player-sprite-p1"), Some(false));
    assert_eq!(game.renderer().is_visible("player-idle-p1"), Some(true));
    assert_eq!(game.renderer().is_visible("player-run-p1"), Some(false));

    game.remove_player("p1");
    assert!(game.physics().player_state("p1").is_none());
    assert!(ids.iter().all(|id| game.renderer().entity_position(id).is_none()));
    assert_eq!(game.physics().body_count(), walls);
    assert_eq!(game.renderer().sprite_count(), sprites);
    assert_eq!(game.renderer().animation_count(), 0);
    assert!(game.state().player("p1").is_none());
}

#[test]
fn test_every_kind_removes_cleanly() {
    let mut game = game();
    let walls = game.physics().body_count();
    let sprites = game.renderer().sprite_count();

    game.create_arrow("a1", Vec2::new(400.0, 300.0), 0.0, Vec2::new(50.0, 0.0))
        .unwrap();
    game.create_obstacle("o1", Vec2::new(200.0, 200.0), 60.0, 40.0)
        .unwrap();
    game.create_powerup("u1", Vec2::new(600.0, 500.0), "health")
        .unwrap();
    assert_eq!(game.physics().body_count(), walls + 3);
    assert!(game.renderer().contains_sprite("arrow-sprite-a1"));
    assert!(game.renderer().contains_animation("powerup-anim-u1"));

    game.remove_arrow("a1");
    game.remove_obstacle("o1");
    game.remove_powerup("u1");
    assert_eq!(game.physics().body_count(), walls);
    assert_eq!(game.renderer().sprite_count(), sprites);
    assert_eq!(game.renderer().animation_count(), 0);
}

#[test]
fn test_removal_is_idempotent() {
    let mut game = game();
    game.create_player("p1", Vec2::new(100.0, 100.0)).unwrap();
    game.remove_player("p1");
    let bodies = game.physics().body_count();
    let nodes = game.renderer().node_count();

    game.remove_player("p1");
    game.remove_player("never-created");
    game.remove_arrow("ghost");
    game.remove_obstacle("ghost");
    game.remove_powerup("ghost");
    assert_eq!(game.physics().body_count(), bodies);
    assert_eq!(game.renderer().node_count(), nodes);
}

#[test]
fn test_recreating_an_id_replaces_the_entity() {
    let mut game = game();
    let walls = game.physics().body_count();
    game.create_player("p1", Vec2::new(100.0, 100.0)).unwrap();
    game.create_player("p1", Vec2::new(300.0, 300.0)).unwrap();
    assert_eq!(game.player_count(), 1);
    assert_eq!(game.physics().body_count(), walls + 1);
    assert_eq!(game.renderer().animation_count(), 3);
    let body = game.physics().player_state("p1").unwrap();
    assert_eq!(body.position, Vec2::new(300.0, 300.0));
}

#[test]
fn test_one_animation_plays_at_a_time() {
    let mut game = game();
    game.create_player("p1", Vec2::new(100.0, 100.0)).unwrap();
    assert_eq!(playing(&game, "p1"), vec![PlayerAnimation::Idle]);

    game.set_player_animation("p1", PlayerAnimation::Run);
    assert_eq!(playing(&game, "p1"), vec![PlayerAnimation::Run]);
    assert_eq!(game.renderer().is_visible("player-idle-p1"), Some(false));
    assert_eq!(game.renderer().is_visible("player-run-p1"), Some(true));

    let calls = game.renderer().animation_calls("player-run-p1");
    game.set_player_animation("p1", PlayerAnimation::Run);
    assert_eq!(game.renderer().animation_calls("player-run-p1"), calls);

    game.set_player_animation("p1", PlayerAnimation::Shoot);
    assert_eq!(playing(&game, "p1"), vec![PlayerAnimation::Shoot]);
}

#[test]
fn test_move_player_picks_run_or_idle() {
    let mut game = game();
    game.create_player("p1", Vec2::new(100.0, 100.0)).unwrap();
    game.move_player("p1", Vec2::new(5.0, 0.0));
    assert_eq!(game.current_animation("p1"), Some(PlayerAnimation::Run));
    game.move_player("p1", Vec2::new(0.05, 0.0));
    assert_eq!(game.current_animation("p1"), Some(PlayerAnimation::Idle));
}

#[test]
fn test_shot_arrow_flies_until_it_hits_the_wall() {
    let mut game = game();
    game.create_player("P", Vec2::new(100.0, 100.0)).unwrap();
    game.start();

    assert!(game.player_shoot("P", "a1", 0.0, 10.0));
    assert_eq!(game.current_animation("P"), Some(PlayerAnimation::Shoot));
    let arrow = game.physics().arrow_state("a1").unwrap();
    assert!((arrow.velocity - Vec2::new(10.0, 0.0)).length() < 1e-4);
    // spawned clear of the shooter's own collider
    let muzzle = game.settings().player.radius + ARROW_LENGTH / 2.0 + MUZZLE_GAP;
    assert!((arrow.position - Vec2::new(100.0 + muzzle, 100.0)).length() < 1e-3);
    assert_eq!(game.arrow("a1").unwrap().owner.as_deref(), Some("P"));

    step_until(&mut game, 8000, |g| g.arrow("a1").is_none());
    assert!(game.arrow("a1").is_none());
    assert!(game.physics().arrow_state("a1").is_none());
    assert!(!game.renderer().contains_sprite("arrow-sprite-a1"));
    assert!(game.diagnostics().counters().collisions >= 1);
    assert_eq!(game.state().player("P").unwrap().health, 100.0);
}

#[test]
fn test_shooting_without_a_body_fails() {
    let mut game = game();
    assert!(!game.player_shoot("nobody", "a1", 0.0, 100.0));
    assert_eq!(game.arrow_count(), 0);
}

#[test]
fn test_arrow_damages_the_player_it_hits() {
    let mut game = game();
    game.create_player("A", Vec2::new(100.0, 300.0)).unwrap();
    game.create_player("B", Vec2::new(300.0, 300.0)).unwrap();
    game.start();

    assert!(game.player_shoot("A", "a1", 0.0, 600.0));
    step_until(&mut game, 600, |g| g.arrow("a1").is_none());

    assert!(game.arrow("a1").is_none());
    assert_eq!(game.state().player("B").unwrap().health, 75.0);
    assert_eq!(game.state().player("A").unwrap().health, 100.0);
    assert!(game.particles().particle_count() > 0);
}

#[test]
fn test_lethal_hit_removes_the_player() {
    let mut settings = Settings::default();
    settings.player.arrow_damage = 500.0;
    let (mut game, _) = game_with(settings);
    game.create_player("A", Vec2::new(100.0, 300.0)).unwrap();
    game.create_player("B", Vec2::new(300.0, 300.0)).unwrap();
    game.start();

    assert!(game.player_shoot("A", "a1", 0.0, 600.0));
    step_until(&mut game, 600, |g| g.player("B").is_none());

    assert!(game.player("B").is_none());
    assert!(game.physics().player_state("B").is_none());
    assert!(game.state().player("B").is_none());
    assert_eq!(game.player_count(), 1);
}

#[test]
fn test_powerup_heals_and_disappears() {
    let mut game = game();
    game.create_player("p1", Vec2::new(100.0, 100.0)).unwrap();
    game.create_powerup("u1", Vec2::new(160.0, 100.0), "health")
        .unwrap();
    game.state().apply_damage("p1", 50.0);
    game.start();

    game.move_player("p1", Vec2::new(120.0, 0.0));
    step_until(&mut game, 120, |g| g.powerup("u1").is_none());

    assert!(game.powerup("u1").is_none());
    assert!(game.physics().powerup_state("u1").is_none());
    assert_eq!(game.state().player("p1").unwrap().health, 75.0);
}

#[test]
fn test_sync_moves_render_entities_with_bodies() {
    let mut game = game();
    game.create_player("p1", Vec2::new(100.0, 100.0)).unwrap();
    game.create_arrow("a1", Vec2::new(400.0, 300.0), 0.0, Vec2::new(120.0, 0.0))
        .unwrap();
    game.start();
    game.move_player("p1", Vec2::new(60.0, 0.0));
    game.run_physics(0.1);

    let (synced, skipped) = game.sync_physics_with_rendering();
    assert_eq!((synced, skipped), (2, 0));
    let body = game.physics().player_state("p1").unwrap();
    assert_eq!(game.renderer().entity_position("player-sprite-p1"), Some(body.position));
    assert_eq!(game.renderer().entity_position("player-run-p1"), Some(body.position));
    assert!(body.position.x > 100.0);
    let arrow = game.renderer().entity_position("arrow-sprite-a1").unwrap();
    assert!(arrow.x > 400.0);
    assert_eq!(game.state().player("p1").unwrap().position, body.position);
}

#[test]
fn test_resize_keeps_entities() {
    let mut game = game();
    game.create_player("p1", Vec2::new(100.0, 100.0)).unwrap();
    game.create_player("p2", Vec2::new(200.0, 100.0)).unwrap();
    game.create_obstacle("o1", Vec2::new(400.0, 300.0), 64.0, 64.0)
        .unwrap();
    let walls_and_entities = game.physics().body_count();

    game.resize(800, 600);
    game.resize(400, 300);
    assert_eq!(game.renderer().size(), (400, 300));
    assert_eq!(game.player_count(), 2);
    assert_eq!(game.obstacle_count(), 1);
    assert_eq!(game.physics().body_count(), walls_and_entities);
    assert_eq!(
        game.renderer().entity_position("background"),
        Some(Vec2::new(200.0, 150.0))
    );
    assert!(game.renderer().contains_sprite("obstacle-sprite-o1"));
}

#[test]
fn test_destroy_releases_everything() {
    let (mut game, pending) = game_with(Settings::default());
    for (i, x) in [100.0, 200.0, 300.0].into_iter().enumerate() {
        game.create_player(&format!("p{i}"), Vec2::new(x, 100.0)).unwrap();
    }
    game.create_arrow("a1", Vec2::new(400.0, 300.0), 0.0, Vec2::X).unwrap();
    game.create_arrow("a2", Vec2::new(400.0, 400.0), 0.0, Vec2::X).unwrap();
    game.create_obstacle("o1", Vec2::new(600.0, 300.0), 40.0, 40.0)
        .unwrap();
    game.create_powerup("u1", Vec2::new(700.0, 500.0), "health")
        .unwrap();
    game.start();

    game.destroy();
    assert!(!game.is_running());
    assert!(pending.borrow().is_empty());
    assert_eq!(game.player_count(), 0);
    assert_eq!(game.arrow_count(), 0);
    assert_eq!(game.obstacle_count(), 0);
    assert_eq!(game.powerup_count(), 0);
    assert_eq!(game.physics().body_count(), 0);
    assert_eq!(game.renderer().sprite_count(), 0);
    assert_eq!(game.renderer().animation_count(), 0);
    assert_eq!(game.particles().particle_count(), 0);
    assert!(game.state().is_empty());
}

#[test]
fn test_failed_render_setup_leaves_no_body() {
    let mut game = ArcherGame::new(Settings::default(), Box::new(ManualFrameScheduler::new()));
    let walls = game.physics().body_count();

    let err = game.create_player("p1", Vec2::new(100.0, 100.0)).unwrap_err();
    assert!(matches!(err, EntityError::Render { .. }));
    assert_eq!(game.physics().body_count(), walls);
    assert!(game.player("p1").is_none());
    assert!(game.state().player("p1").is_none());
}

#[test]
fn test_degenerate_obstacle_is_rejected() {
    let mut game = game();
    let walls = game.physics().body_count();
    let shape = ObstacleShape::Polygon {
        sides: 2,
        radius: 10.0,
    };
    let err = game
        .create_obstacle_shape("o1", Vec2::new(300.0, 300.0), shape, true)
        .unwrap_err();
    assert!(matches!(err, EntityError::Physics { .. }));
    assert_eq!(game.physics().body_count(), walls);
    assert!(!game.renderer().contains_sprite("obstacle-sprite-o1"));
}

#[test]
fn test_loop_keeps_one_frame_outstanding() {
    let (mut game, pending) = game_with(Settings::default());
    game.start();
    game.start();
    assert_eq!(pending.borrow().len(), 1);

    let mut timestamp = 0.0;
    for _ in 0..3 {
        for _ in fire_pending(&pending) {
            assert!(game.frame(timestamp));
        }
        timestamp += 16.0;
        assert_eq!(pending.borrow().len(), 1);
    }
    assert_eq!(game.diagnostics().counters().frames, 3);

    game.stop();
    assert!(pending.borrow().is_empty());
    assert!(!game.frame(timestamp));
}

#[test]
fn test_scheduled_ticks_move_bodies() {
    let (mut game, pending, tickers) = clocked_game(Settings::default());
    game.create_arrow("a1", Vec2::new(400.0, 300.0), 0.0, Vec2::new(120.0, 0.0))
        .unwrap();
    game.start();
    assert_eq!(tickers.borrow().len(), 1);

    let mut now = 0.0;
    for _ in 0..=60 {
        for tick in due_ticks(&tickers, now) {
            game.physics_tick(tick);
        }
        for _ in fire_pending(&pending) {
            game.frame(now);
        }
        now += 16.0;
    }

    let arrow = game.physics().arrow_state("a1").unwrap();
    assert!(arrow.position.x > 480.0, "arrow at {}", arrow.position.x);
    assert!(game.diagnostics().counters().physics_steps >= 50);
    assert_eq!(
        game.renderer().entity_position("arrow-sprite-a1"),
        Some(arrow.position)
    );

    game.stop();
    assert!(tickers.borrow().is_empty());
    assert_eq!(game.physics_tick(now), 0);
}

#[test]
fn test_held_shoot_fires_on_release() {
    let mut game = game();
    game.create_player("p1", Vec2::new(100.0, 300.0)).unwrap();
    let input = InputHandler::new("p1", game.state());
    game.start();

    assert!(input.mouse_down(input::PRIMARY_BUTTON));
    game.frame(0.0);
    game.frame(500.0);
    assert_eq!(game.arrow_count(), 0);

    input.mouse_up(input::PRIMARY_BUTTON);
    game.frame(600.0);
    assert_eq!(game.arrow_count(), 1);
    assert!(game.arrow("p1-arrow-1").is_some());
    assert_eq!(game.state().player("p1").unwrap().arrows_fired, 1);
    assert_eq!(game.current_animation("p1"), Some(PlayerAnimation::Shoot));

    let speed = game.physics().arrow_state("p1-arrow-1").unwrap().velocity.length();
    let full = game.settings().player.arrow_power;
    assert!(speed > 0.0 && speed < full);
}

#[test]
fn test_charged_special_looses_a_volley() {
    let mut game = game();
    game.create_player("p1", Vec2::new(100.0, 300.0)).unwrap();
    let input = InputHandler::new("p1", game.state());
    game.start();

    input.mouse_down(input::SECONDARY_BUTTON);
    for i in 0..=6 {
        game.frame(f64::from(i) * 100.0);
    }
    assert_eq!(game.arrow_count(), 0);
    input.mouse_up(input::SECONDARY_BUTTON);
    game.frame(700.0);

    assert_eq!(game.arrow_count(), 3);
    let timers = game.state().player("p1").unwrap().timers;
    assert!(timers.special_cooldown > 0.0);
    assert!(timers.charge.is_none());
}

#[test]
fn test_short_special_press_does_nothing() {
    let mut game = game();
    game.create_player("p1", Vec2::new(100.0, 300.0)).unwrap();
    let input = InputHandler::new("p1", game.state());
    game.start();

    input.mouse_down(input::SECONDARY_BUTTON);
    game.frame(0.0);
    game.frame(100.0);
    input.mouse_up(input::SECONDARY_BUTTON);
    game.frame(200.0);
    assert_eq!(game.arrow_count(), 0);
}

#[test]
fn test_dash_boosts_then_expires() {
    let mut game = game();
    game.create_player("p1", Vec2::new(100.0, 300.0)).unwrap();
    let input = InputHandler::new("p1", game.state());
    let tuning = game.settings().player.clone();
    game.start();

    input.key_down("d");
    input.key_down("Shift");
    game.frame(0.0);
    let dashing = game.physics().player_state("p1").unwrap().velocity.x;
    assert!((dashing - tuning.move_speed * tuning.dash_multiplier).abs() < 1e-3);
    assert_eq!(game.current_animation("p1"), Some(PlayerAnimation::Run));

    game.frame(300.0);
    let walking = game.physics().player_state("p1").unwrap().velocity.x;
    assert!((walking - tuning.move_speed).abs() < 1e-3);
}

#[test]
fn test_undriven_players_keep_their_velocity() {
    let mut game = game();
    game.create_player("p1", Vec2::new(100.0, 300.0)).unwrap();
    game.start();
    game.move_player("p1", Vec2::new(40.0, 0.0));
    game.frame(0.0);
    let v = game.physics().player_state("p1").unwrap().velocity;
    assert!((v.x - 40.0).abs() < 1e-3);
}

//! Game integration: entity lifecycle and the physics → render loop
//!
//! [`ArcherGame`] owns every subsystem. Each game entity is one physics body
//! plus its render entities, created atomically and removed together.
//! Physics steps on its own ticker. The frame callback applies player
//! intents, copies body transforms onto their render entities, advances
//! animations and particles, then draws.

pub mod assets;
pub mod entities;
pub mod input;
pub mod state;

#[cfg(test)]
mod tests;

use std::collections::{BTreeMap, HashMap};
use std::f32::consts::FRAC_PI_4;

use glam::Vec2;

use crate::consts::{ARROW_LENGTH, POWERUP_RADIUS, RUN_THRESHOLD};
use crate::diagnostics::Diagnostics;
use crate::error::EntityError;
use crate::particles::{EmitterId, EmitterOptions, ParticleKind, ParticleSystem};
use crate::physics::{ArcherPhysics, ArenaEvent, EntityRef, ObstacleShape, PhysicsState, Role};
use crate::platform::{FrameRequest, FrameScheduler, TickerHandle};
use crate::renderer::{AnimationOptions, Placement, SpriteRenderer, Surface, TextureLoader, layers};
use crate::settings::Settings;

pub use assets::AssetReport;
pub use entities::{ArrowEntity, ObstacleEntity, PlayerAnimation, PlayerEntity, PowerupEntity};
pub use input::InputHandler;
pub use state::{Control, Controls, GameStateHandle, PlayerState};

const BACKGROUND_SPRITE: &str = "background";

/// Z order inside each layer
const OBSTACLE_Z: i32 = 2;
const POWERUP_Z: i32 = 3;
const ARROW_Z: i32 = 5;
const PLAYER_Z: i32 = 10;

/// Gap between a shooter's edge and the tail of a fresh arrow
const MUZZLE_GAP: f32 = 5.0;
const POWERUP_HEAL: f32 = 25.0;
const POWERUP_ANIMATION_SPEED: f32 = 0.1;

/// Bow draw time for a full-power shot (seconds)
const FULL_DRAW: f32 = 1.5;
/// Weakest shot as a fraction of full power
const MIN_DRAW_RATIO: f32 = 0.3;

const DASH_DURATION: f32 = 0.2;
const DASH_COOLDOWN: f32 = 1.0;

/// Volley: three arrows fanned around the aim
const VOLLEY_MIN_CHARGE: f32 = 0.5;
const VOLLEY_SPEED: f32 = 500.0;
const VOLLEY_SPREAD: f32 = 0.1;
const VOLLEY_COOLDOWN: f32 = 5.0;
const VOLLEY_DAMAGE: f32 = 15.0;

/// Seconds between trail puffs at full trail quality
const TRAIL_INTERVAL: f32 = 0.03;
const EFFECT_SEED: u64 = 0x5eed_a4c7;

pub struct ArcherGame {
    settings: Settings,
    width: f32,
    height: f32,
    physics: ArcherPhysics,
    renderer: SpriteRenderer,
    particles: ParticleSystem,
    state: GameStateHandle,
    diagnostics: Diagnostics,
    scheduler: Box<dyn FrameScheduler>,
    frame_request: Option<FrameRequest>,
    ticker: Option<TickerHandle>,
    running: bool,
    last_timestamp: Option<f64>,
    last_tick: Option<f64>,
    players: BTreeMap<String, PlayerEntity>,
    arrows: BTreeMap<String, ArrowEntity>,
    obstacles: BTreeMap<String, ObstacleEntity>,
    powerups: BTreeMap<String, PowerupEntity>,
    next_arrow: u64,
}

impl ArcherGame {
    /// Build every subsystem. Nothing is drawn until [`initialize`](Self::initialize).
    pub fn new(settings: Settings, scheduler: Box<dyn FrameScheduler>) -> Self {
        let (width, height) = (settings.arena.width, settings.arena.height);
        let mut renderer = SpriteRenderer::new(
            width as u32,
            height as u32,
            settings.arena.background_color,
        );
        let physics = ArcherPhysics::new(&settings);
        let particles = ParticleSystem::new(&mut renderer, settings.max_particles(), EFFECT_SEED);
        log::info!(
            "Archer game created ({width}x{height}, {} quality)",
            settings.quality.as_str()
        );

        Self {
            settings,
            width,
            height,
            physics,
            renderer,
            particles,
            state: GameStateHandle::new(),
            diagnostics: Diagnostics::new(),
            scheduler,
            frame_request: None,
            ticker: None,
            running: false,
            last_timestamp: None,
            last_tick: None,
            players: BTreeMap::new(),
            arrows: BTreeMap::new(),
            obstacles: BTreeMap::new(),
            powerups: BTreeMap::new(),
            next_arrow: 0,
        }
    }

    /// Attach the surface, load assets and lay down the background
    pub async fn initialize(
        &mut self,
        surface: Box<dyn Surface>,
        loader: &impl TextureLoader,
    ) -> AssetReport {
        self.renderer.initialize(surface);
        let report = assets::load_assets(&mut self.renderer, loader).await;

        let placement = Placement::in_layer(layers::BACKGROUND)
            .at(self.center())
            .centered()
            .scaled(self.background_scale());
        if self
            .renderer
            .create_sprite(BACKGROUND_SPRITE, assets::BACKGROUND, &placement)
            .is_none()
        {
            log::error!("Background sprite could not be created");
        }
        log::info!("Archer game initialized");
        report
    }

    fn center(&self) -> Vec2 {
        Vec2::new(self.width, self.height) / 2.0
    }

    fn background_scale(&self) -> Vec2 {
        match self.renderer.texture(assets::BACKGROUND) {
            Some(tex) if tex.width > 0 && tex.height > 0 => Vec2::new(
                self.width / tex.width as f32,
                self.height / tex.height as f32,
            ),
            _ => Vec2::ONE,
        }
    }

    // --- Loop ---

    /// Start the physics ticker, effects and the frame loop. No-op while
    /// running.
    pub fn start(&mut self) {
        if self.running {
            return;
        }
        self.running = true;
        self.last_timestamp = None;
        self.last_tick = None;
        self.physics.start();
        self.particles.start();
        self.ticker = Some(self.scheduler.start_ticker(self.settings.physics.fixed_dt));
        self.frame_request = Some(self.scheduler.request_frame());
        log::info!("Game loop started");
    }

    /// Stop everything, cancelling the physics ticker and the outstanding
    /// frame callback
    pub fn stop(&mut self) {
        if !self.running {
            return;
        }
        self.running = false;
        self.physics.stop();
        self.particles.stop();
        if let Some(ticker) = self.ticker.take() {
            self.scheduler.stop_ticker(ticker);
        }
        if let Some(request) = self.frame_request.take() {
            self.scheduler.cancel_frame(request);
        }
        log::info!("Game loop stopped");
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Physics ticker callback. `timestamp` is the wall clock in
    /// milliseconds; the time since the previous tick feeds the runner.
    pub fn physics_tick(&mut self, timestamp: f64) -> u32 {
        if !self.running {
            return 0;
        }
        let elapsed = match self.last_tick {
            Some(last) => ((timestamp - last) / 1000.0).max(0.0) as f32,
            None => 0.0,
        };
        self.last_tick = Some(timestamp);
        self.run_physics(elapsed)
    }

    /// Advance the physics runner by `elapsed` wall-clock seconds and settle
    /// the collisions it produced. Returns the fixed steps taken.
    pub fn run_physics(&mut self, elapsed: f32) -> u32 {
        let steps = self.physics.advance(elapsed);
        let events = self.physics.drain_events();
        let collisions = events.len();
        for event in events {
            self.resolve(event);
        }
        self.diagnostics.record_physics(steps, collisions);
        steps
    }

    /// Frame callback. `timestamp` is in milliseconds, as handed out by the
    /// display refresh. Returns false once the loop has stopped.
    pub fn frame(&mut self, timestamp: f64) -> bool {
        if !self.running {
            return false;
        }
        self.frame_request = None;

        let delta = match self.last_timestamp {
            Some(last) => ((timestamp - last) / 1000.0).max(0.0) as f32,
            None => 0.0,
        };
        self.last_timestamp = Some(timestamp);

        self.apply_intents(delta);
        self.sync_physics_with_rendering();
        self.renderer.tick(delta);
        self.particles.tick(&mut self.renderer, delta);
        self.renderer.render();
        self.diagnostics.record_frame(delta);

        self.frame_request = Some(self.scheduler.request_frame());
        true
    }

    /// Copy every tracked body's transform onto its render entities. Bodies
    /// that no longer answer are skipped. Returns `(synced, skipped)`.
    pub fn sync_physics_with_rendering(&mut self) -> (usize, usize) {
        let mut synced = 0;
        let mut skipped = 0;

        for (id, player) in &self.players {
            let Some(body) = self.physics.player_state(id) else {
                skipped += 1;
                continue;
            };
            self.renderer
                .update_sprite(&player.sprite_id, Some(body.position), Some(body.angle));
            if let Some(anim) = player.animation_ids.get(&player.current_animation) {
                self.renderer
                    .update_animation(anim, Some(body.position), Some(body.angle));
            }
            self.state.update_position(id, body.position, body.velocity);
            synced += 1;
        }

        for (id, arrow) in &self.arrows {
            match self.physics.arrow_state(id) {
                Some(body) => {
                    self.renderer
                        .update_sprite(&arrow.sprite_id, Some(body.position), Some(body.angle));
                    synced += 1;
                }
                None => skipped += 1,
            }
        }

        for (id, obstacle) in &self.obstacles {
            match self.physics.obstacle_state(id) {
                Some(body) => {
                    self.renderer
                        .update_sprite(&obstacle.sprite_id, Some(body.position), Some(body.angle));
                    synced += 1;
                }
                None => skipped += 1,
            }
        }

        if skipped > 0 {
            log::debug!("Sync skipped {skipped} entities without a body");
        }
        self.diagnostics.record_sync(synced, skipped);
        (synced, skipped)
    }

    // --- Entity creation ---

    /// Player body plus a hidden base sprite and one animation per slot;
    /// only the idle animation starts visible and playing. An existing
    /// player with the same id is replaced.
    pub fn create_player(&mut self, id: &str, position: Vec2) -> Result<(), EntityError> {
        if self.players.contains_key(id) {
            log::warn!("Player `{id}` already exists, replacing it");
            self.remove_player(id);
        }

        let radius = self.settings.player.radius;
        let sprite = entities::sprite_id(Role::Player, id);
        let placement = Placement::in_layer(layers::PLAYERS)
            .at(position)
            .centered()
            .z(PLAYER_Z);

        let mut tx = entities::SpawnTransaction::begin(
            &mut self.physics,
            &mut self.renderer,
            EntityRef::new(Role::Player, id),
            |physics| Ok(physics.create_player(id, position, radius)),
        )?;
        tx.sprite(&sprite, assets::PLAYER_IDLE, &placement)?;

        let mut animation_ids = HashMap::new();
        for slot in PlayerAnimation::ALL {
            let anim_id = slot.render_id(id);
            let pose = slot.pose();
            let options = AnimationOptions {
                frames: assets::archer_frames(pose),
                speed: pose.speed(),
                looping: slot.looping(),
                auto_play: slot == PlayerAnimation::Idle,
            };
            tx.animation(&anim_id, &options, &placement)?;
            if slot != PlayerAnimation::Idle {
                tx.renderer().set_visible(&anim_id, false);
            }
            animation_ids.insert(slot, anim_id);
        }
        tx.renderer().set_visible(&sprite, false);
        let body = tx.commit();

        self.players.insert(
            id.to_owned(),
            PlayerEntity {
                body,
                sprite_id: sprite,
                animation_ids,
                current_animation: PlayerAnimation::Idle,
            },
        );
        self.state
            .add_player(id, position, self.settings.player.max_health);
        self.diagnostics.record_created();
        log::info!("Player `{id}` created at ({}, {})", position.x, position.y);
        Ok(())
    }

    /// Free-flying arrow with the default damage and no owner
    pub fn create_arrow(
        &mut self,
        id: &str,
        position: Vec2,
        angle: f32,
        velocity: Vec2,
    ) -> Result<(), EntityError> {
        let damage = self.settings.player.arrow_damage;
        self.spawn_arrow(id, position, angle, velocity, None, damage)
    }

    fn spawn_arrow(
        &mut self,
        id: &str,
        position: Vec2,
        angle: f32,
        velocity: Vec2,
        owner: Option<&str>,
        damage: f32,
    ) -> Result<(), EntityError> {
        if self.arrows.contains_key(id) {
            log::warn!("Arrow `{id}` already exists, replacing it");
            self.remove_arrow(id);
        }

        let sprite = entities::sprite_id(Role::Arrow, id);
        let placement = Placement::in_layer(layers::PROJECTILES)
            .at(position)
            .centered()
            .rotated(angle)
            .z(ARROW_Z);

        let mut tx = entities::SpawnTransaction::begin(
            &mut self.physics,
            &mut self.renderer,
            EntityRef::new(Role::Arrow, id),
            |physics| Ok(physics.create_arrow(id, position, angle, velocity)),
        )?;
        tx.sprite(&sprite, assets::ARROW, &placement)?;
        let body = tx.commit();

        let trail = self.trail_for(&sprite);
        self.arrows.insert(
            id.to_owned(),
            ArrowEntity {
                body,
                sprite_id: sprite,
                owner: owner.map(str::to_owned),
                damage,
                trail,
            },
        );
        self.diagnostics.record_created();
        log::debug!("Arrow `{id}` created");
        Ok(())
    }

    fn trail_for(&mut self, sprite: &str) -> Option<EmitterId> {
        let effects = &self.settings.effects;
        if !effects.particles || !effects.arrow_trails {
            return None;
        }
        let quality = self.settings.quality.trail_quality().max(0.1);
        let options = EmitterOptions::every(TRAIL_INTERVAL / quality, 1).following(sprite);
        Some(
            self.particles
                .create_emitter(ParticleKind::ArrowTrail, Vec2::ZERO, options),
        )
    }

    /// Static rectangular obstacle; the sprite is stretched to its size
    pub fn create_obstacle(
        &mut self,
        id: &str,
        position: Vec2,
        width: f32,
        height: f32,
    ) -> Result<(), EntityError> {
        self.create_obstacle_shape(id, position, ObstacleShape::Rectangle { width, height }, true)
    }

    pub fn create_obstacle_shape(
        &mut self,
        id: &str,
        position: Vec2,
        shape: ObstacleShape,
        is_static: bool,
    ) -> Result<(), EntityError> {
        if self.obstacles.contains_key(id) {
            log::warn!("Obstacle `{id}` already exists, replacing it");
            self.remove_obstacle(id);
        }

        let extent = match shape {
            ObstacleShape::Rectangle { width, height } => Vec2::new(width, height),
            ObstacleShape::Polygon { radius, .. } => Vec2::splat(radius * 2.0),
        };
        let texture_size = self
            .renderer
            .texture(assets::OBSTACLE)
            .map(|tex| Vec2::new(tex.width as f32, tex.height as f32))
            .filter(|size| size.x > 0.0 && size.y > 0.0)
            .unwrap_or(Vec2::ONE);
        let sprite = entities::sprite_id(Role::Obstacle, id);
        let placement = Placement::in_layer(layers::OBSTACLES)
            .at(position)
            .centered()
            .scaled(extent / texture_size)
            .z(OBSTACLE_Z);

        let mut tx = entities::SpawnTransaction::begin(
            &mut self.physics,
            &mut self.renderer,
            EntityRef::new(Role::Obstacle, id),
            |physics| physics.create_obstacle(id, position, shape, is_static),
        )?;
        tx.sprite(&sprite, assets::OBSTACLE, &placement)?;
        let body = tx.commit();

        self.obstacles.insert(
            id.to_owned(),
            ObstacleEntity {
                body,
                sprite_id: sprite,
            },
        );
        self.diagnostics.record_created();
        log::debug!("Obstacle `{id}` created");
        Ok(())
    }

    /// Sensor pickup with a spinning animation over a hidden base sprite
    pub fn create_powerup(&mut self, id: &str, position: Vec2, kind: &str) -> Result<(), EntityError> {
        if self.powerups.contains_key(id) {
            log::warn!("Powerup `{id}` already exists, replacing it");
            self.remove_powerup(id);
        }

        let sprite = entities::sprite_id(Role::Powerup, id);
        let animation_id = format!("powerup-anim-{id}");
        let placement = Placement::in_layer(layers::OBSTACLES)
            .at(position)
            .centered()
            .z(POWERUP_Z);
        let options = AnimationOptions {
            frames: vec![assets::POWERUP.to_owned()],
            speed: POWERUP_ANIMATION_SPEED,
            looping: true,
            auto_play: true,
        };

        let mut tx = entities::SpawnTransaction::begin(
            &mut self.physics,
            &mut self.renderer,
            EntityRef::new(Role::Powerup, id),
            |physics| Ok(physics.create_powerup(id, position, POWERUP_RADIUS)),
        )?;
        tx.sprite(&sprite, assets::POWERUP, &placement)?;
        tx.animation(&animation_id, &options, &placement)?;
        tx.renderer().set_visible(&sprite, false);
        let body = tx.commit();

        self.powerups.insert(
            id.to_owned(),
            PowerupEntity {
                body,
                sprite_id: sprite,
                animation_id,
                kind: kind.to_owned(),
            },
        );
        self.diagnostics.record_created();
        log::debug!("Powerup `{id}` ({kind}) created");
        Ok(())
    }

    // --- Player actions ---

    /// Swap the visible animation. Re-selecting the current one does nothing.
    pub fn set_player_animation(&mut self, id: &str, animation: PlayerAnimation) {
        let Some(player) = self.players.get_mut(id) else {
            return;
        };
        if player.current_animation == animation {
            return;
        }

        if let Some(old) = player.animation_ids.get(&player.current_animation) {
            self.renderer.stop_animation(old);
            self.renderer.set_visible(old, false);
        }
        if let Some(new) = player.animation_ids.get(&animation) {
            self.renderer.play_animation(new, animation.looping());
            self.renderer.set_visible(new, true);
            if let Some(body) = self.physics.player_state(id) {
                self.renderer
                    .update_animation(new, Some(body.position), Some(body.angle));
            }
        }
        player.current_animation = animation;
    }

    /// Set a player's velocity and pick run or idle from its speed
    pub fn move_player(&mut self, id: &str, velocity: Vec2) {
        self.physics.set_player_velocity(id, velocity);
        let animation = if velocity.length() > RUN_THRESHOLD {
            PlayerAnimation::Run
        } else {
            PlayerAnimation::Idle
        };
        self.set_player_animation(id, animation);
    }

    /// Play the shoot animation and loose an arrow along `angle` at `power`
    /// px/s. Returns false when the shooter has no body or the arrow could
    /// not be created.
    pub fn player_shoot(&mut self, player: &str, arrow: &str, angle: f32, power: f32) -> bool {
        self.set_player_animation(player, PlayerAnimation::Shoot);
        let damage = self.settings.player.arrow_damage;
        self.fire_arrow(player, arrow, angle, power, damage)
    }

    fn fire_arrow(&mut self, player: &str, arrow: &str, angle: f32, speed: f32, damage: f32) -> bool {
        let Some(shooter) = self.physics.player_state(player) else {
            log::debug!("Player `{player}` has no body to shoot from");
            return false;
        };
        let dir = crate::direction(angle);
        let offset = self.settings.player.radius + ARROW_LENGTH / 2.0 + MUZZLE_GAP;
        let position = shooter.position + dir * offset;

        match self.spawn_arrow(arrow, position, angle, dir * speed, Some(player), damage) {
            Ok(()) => {
                self.state.with_player(player, |p| p.arrows_fired += 1);
                true
            }
            Err(e) => {
                log::error!("Shot from `{player}` failed: {e}");
                false
            }
        }
    }

    fn next_arrow_id(&mut self, owner: &str) -> String {
        loop {
            self.next_arrow += 1;
            let id = format!("{owner}-arrow-{}", self.next_arrow);
            if !self.arrows.contains_key(&id) {
                return id;
            }
        }
    }

    /// Turn each driven player's control flags into movement and shots
    fn apply_intents(&mut self, delta: f32) {
        let ids: Vec<String> = self.players.keys().cloned().collect();
        for id in ids {
            match self.state.player(&id) {
                Some(player) if player.driven && player.alive => {
                    self.apply_player_intent(&id, &player, delta)
                }
                _ => {}
            }
        }
    }

    fn apply_player_intent(&mut self, id: &str, player: &PlayerState, delta: f32) {
        let controls = player.controls;
        let mut timers = player.timers;
        timers.dash_cooldown = (timers.dash_cooldown - delta).max(0.0);
        timers.dash_remaining = (timers.dash_remaining - delta).max(0.0);
        timers.special_cooldown = (timers.special_cooldown - delta).max(0.0);

        let dash_started = controls.dash && !timers.was_dashing && timers.dash_cooldown <= 0.0;
        if dash_started {
            timers.dash_remaining = DASH_DURATION;
            timers.dash_cooldown = DASH_COOLDOWN;
        }
        timers.was_dashing = controls.dash;

        let mut velocity = controls.movement() * self.settings.player.move_speed;
        if timers.dash_remaining > 0.0 {
            velocity *= self.settings.player.dash_multiplier;
        }

        // bow draws while held and fires on release
        let mut released_draw = None;
        if controls.shoot {
            timers.draw = Some(timers.draw.map_or(0.0, |held| held + delta));
        } else if let Some(held) = timers.draw.take() {
            released_draw = Some(held);
        }

        let mut volley = false;
        if controls.special {
            match timers.charge.as_mut() {
                Some(charge) => *charge += delta,
                None if timers.special_cooldown <= 0.0 => timers.charge = Some(0.0),
                None => {}
            }
        } else if let Some(charge) = timers.charge.take() {
            if charge >= VOLLEY_MIN_CHARGE {
                volley = true;
                timers.special_cooldown = VOLLEY_COOLDOWN;
            }
        }

        self.state.with_player(id, |p| p.timers = timers);
        self.drive_player(id, velocity);

        if dash_started && velocity != Vec2::ZERO {
            self.burst(ParticleKind::PlayerDash, player.position, 12, Some(-velocity));
        }
        if let Some(held) = released_draw {
            let ratio = (held / FULL_DRAW).clamp(MIN_DRAW_RATIO, 1.0);
            let arrow = self.next_arrow_id(id);
            let power = self.settings.player.arrow_power * ratio;
            self.player_shoot(id, &arrow, player.rotation, power);
        }
        if volley {
            self.set_player_animation(id, PlayerAnimation::Shoot);
            for step in [-1.0, 0.0, 1.0] {
                let arrow = self.next_arrow_id(id);
                let angle = player.rotation + step * VOLLEY_SPREAD;
                self.fire_arrow(id, &arrow, angle, VOLLEY_SPEED, VOLLEY_DAMAGE);
            }
            self.diagnostics.log_event(format!("{id} loosed a volley"));
        }
    }

    /// Like [`move_player`](Self::move_player) but lets a running shoot
    /// animation finish first
    fn drive_player(&mut self, id: &str, velocity: Vec2) {
        let shooting = self.players.get(id).is_some_and(|p| {
            p.current_animation == PlayerAnimation::Shoot
                && p.animation_ids
                    .get(&PlayerAnimation::Shoot)
                    .is_some_and(|anim| self.renderer.is_playing(anim))
        });
        if shooting {
            self.physics.set_player_velocity(id, velocity);
        } else {
            self.move_player(id, velocity);
        }
    }

    // --- Collisions ---

    fn resolve(&mut self, event: ArenaEvent) {
        match event {
            ArenaEvent::ArrowHitPlayer { arrow, player } => {
                let Some(record) = self.arrows.get(&arrow) else {
                    return;
                };
                if record.owner.as_deref() == Some(player.as_str()) {
                    return;
                }
                let damage = record.damage;
                self.remove_arrow_with_impact(&arrow);

                let Some(outcome) = self.state.apply_damage(&player, damage) else {
                    return;
                };
                self.diagnostics
                    .log_event(format!("{player} hit by {arrow}, {} health left", outcome.health));
                if outcome.died {
                    self.kill_player(&player);
                }
            }
            ArenaEvent::ArrowHitObstacle { arrow, .. } | ArenaEvent::ArrowHitBoundary { arrow, .. } => {
                if self.arrows.contains_key(&arrow) {
                    self.remove_arrow_with_impact(&arrow);
                }
            }
            ArenaEvent::PowerupCollected { player, powerup } => {
                if !self.players.contains_key(&player) {
                    return;
                }
                let Some(body) = self.physics.powerup_state(&powerup) else {
                    return;
                };
                self.remove_powerup(&powerup);
                self.state.heal(&player, POWERUP_HEAL);
                self.burst(ParticleKind::Powerup, body.position, 15, None);
                self.diagnostics
                    .log_event(format!("{player} collected {powerup}"));
            }
        }
    }

    fn remove_arrow_with_impact(&mut self, arrow: &str) {
        let body = self.physics.arrow_state(arrow);
        self.remove_arrow(arrow);
        if let Some(PhysicsState {
            position, velocity, ..
        }) = body
        {
            self.burst(ParticleKind::ArrowImpact, position, 8, Some(-velocity));
        }
    }

    fn kill_player(&mut self, id: &str) {
        if let Some(body) = self.physics.player_state(id) {
            self.burst(ParticleKind::PlayerDeath, body.position, 30, None);
        }
        self.remove_player(id);
        self.diagnostics.log_event(format!("{id} was eliminated"));
        log::info!("Player `{id}` eliminated");
    }

    fn burst(&mut self, kind: ParticleKind, position: Vec2, count: u32, direction: Option<Vec2>) {
        if self.settings.effects.particles {
            self.particles
                .emit(&mut self.renderer, kind, position, count, direction, FRAC_PI_4);
        }
    }

    // --- Removal ---
    // Each is idempotent: unknown ids are ignored.

    pub fn remove_player(&mut self, id: &str) {
        let Some(player) = self.players.remove(id) else {
            return;
        };
        self.physics.remove_player(id);
        self.renderer.remove_sprite(&player.sprite_id);
        for anim in player.animation_ids.values() {
            self.renderer.remove_animation(anim);
        }
        self.state.remove_player(id);
        self.diagnostics.record_removed();
        log::info!("Player `{id}` removed");
    }

    pub fn remove_arrow(&mut self, id: &str) {
        let Some(arrow) = self.arrows.remove(id) else {
            return;
        };
        self.physics.remove_arrow(id);
        self.renderer.remove_sprite(&arrow.sprite_id);
        if let Some(trail) = arrow.trail {
            self.particles.stop_emitter(trail);
        }
        self.diagnostics.record_removed();
        log::debug!("Arrow `{id}` removed");
    }

    pub fn remove_obstacle(&mut self, id: &str) {
        let Some(obstacle) = self.obstacles.remove(id) else {
            return;
        };
        self.physics.remove_obstacle(id);
        self.renderer.remove_sprite(&obstacle.sprite_id);
        self.diagnostics.record_removed();
        log::debug!("Obstacle `{id}` removed");
    }

    pub fn remove_powerup(&mut self, id: &str) {
        let Some(powerup) = self.powerups.remove(id) else {
            return;
        };
        self.physics.remove_powerup(id);
        self.renderer.remove_sprite(&powerup.sprite_id);
        self.renderer.remove_animation(&powerup.animation_id);
        self.diagnostics.record_removed();
        log::debug!("Powerup `{id}` removed");
    }

    // --- Surface ---

    /// Resize the render surface and refit the background. Physics bounds
    /// and entities are left where they are.
    pub fn resize(&mut self, width: u32, height: u32) {
        self.width = width as f32;
        self.height = height as f32;
        self.renderer.resize(width, height);
        let center = self.center();
        let scale = self.background_scale();
        self.renderer
            .update_sprite(BACKGROUND_SPRITE, Some(center), None);
        self.renderer.set_sprite_scale(BACKGROUND_SPRITE, scale);
        log::info!("Game resized to {width}x{height}");
    }

    /// Stop and release everything: bodies, render entities, particles,
    /// textures and the surface
    pub fn destroy(&mut self) {
        self.stop();
        self.particles.destroy(&mut self.renderer);
        self.players.clear();
        self.arrows.clear();
        self.obstacles.clear();
        self.powerups.clear();
        self.state.clear();
        self.physics.clear();
        self.renderer.destroy();
        log::info!("Archer game destroyed");
    }

    // --- Accessors ---

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn physics(&self) -> &ArcherPhysics {
        &self.physics
    }

    pub fn renderer(&self) -> &SpriteRenderer {
        &self.renderer
    }

    pub fn particles(&self) -> &ParticleSystem {
        &self.particles
    }

    /// Shared handle for input sources
    pub fn state(&self) -> GameStateHandle {
        self.state.clone()
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    pub fn diagnostics_mut(&mut self) -> &mut Diagnostics {
        &mut self.diagnostics
    }

    pub fn player(&self, id: &str) -> Option<&PlayerEntity> {
        self.players.get(id)
    }

    pub fn arrow(&self, id: &str) -> Option<&ArrowEntity> {
        self.arrows.get(id)
    }

    pub fn obstacle(&self, id: &str) -> Option<&ObstacleEntity> {
        self.obstacles.get(id)
    }

    pub fn powerup(&self, id: &str) -> Option<&PowerupEntity> {
        self.powerups.get(id)
    }

    pub fn current_animation(&self, id: &str) -> Option<PlayerAnimation> {
        self.players.get(id).map(|p| p.current_animation)
    }

    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    pub fn arrow_count(&self) -> usize {
        self.arrows.len()
    }

    pub fn obstacle_count(&self) -> usize {
        self.obstacles.len()
    }

    pub fn powerup_count(&self) -> usize {
        self.powerups.len()
    }
}

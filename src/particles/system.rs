//! Particle system
//!
//! Particles are plain sprite nodes inside one particle container. The
//! system does not own the renderer; every call that touches sprites takes
//! it explicitly.

use std::collections::HashMap;

use glam::Vec2;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;

use super::config::{ParticleConfig, ParticleKind, vary_color};
use super::emitter::{Emitter, EmitterId, EmitterOptions, Pulse};
use crate::consts::REFERENCE_FPS;
use crate::renderer::{Node, NodeId, NodeKind, SpriteRenderer};

/// Render id of the particle container
pub const PARTICLE_CONTAINER: &str = "particles";
/// Above every other effect
pub const PARTICLE_Z: i32 = 100;

/// One live particle
#[derive(Debug, Clone)]
pub struct Particle {
    node: NodeId,
    kind: ParticleKind,
    position: Vec2,
    velocity: Vec2,
    rotation: f32,
    rotation_speed: f32,
    lifetime: f32,
    max_lifetime: f32,
    initial_scale: f32,
    initial_alpha: f32,
    gravity: Vec2,
    fade_out: bool,
    shrink: bool,
}

impl Particle {
    pub fn kind(&self) -> ParticleKind {
        self.kind
    }

    /// Seconds left
    pub fn lifetime(&self) -> f32 {
        self.lifetime
    }

    pub fn max_lifetime(&self) -> f32 {
        self.max_lifetime
    }

    pub fn position(&self) -> Vec2 {
        self.position
    }

    pub fn velocity(&self) -> Vec2 {
        self.velocity
    }

    /// Remaining fraction of life, 1 at spawn
    fn life_ratio(&self) -> f32 {
        (self.lifetime / self.max_lifetime).clamp(0.0, 1.0)
    }
}

pub struct ParticleSystem {
    configs: HashMap<ParticleKind, ParticleConfig>,
    particles: Vec<Particle>,
    emitters: Vec<Emitter>,
    next_emitter: u64,
    max_particles: usize,
    active: bool,
    rng: Pcg32,
}

impl ParticleSystem {
    pub fn new(renderer: &mut SpriteRenderer, max_particles: usize, seed: u64) -> Self {
        let system = Self {
            configs: ParticleKind::ALL
                .into_iter()
                .map(|k| (k, ParticleConfig::preset(k)))
                .collect(),
            particles: Vec::new(),
            emitters: Vec::new(),
            next_emitter: 1,
            max_particles,
            active: false,
            rng: Pcg32::seed_from_u64(seed),
        };
        system.container(renderer);
        log::info!("Particle system initialized (max {max_particles} particles)");
        system
    }

    /// The particle container, recreated if the renderer was cleared
    fn container(&self, renderer: &mut SpriteRenderer) -> NodeId {
        match renderer.particle_container(PARTICLE_CONTAINER) {
            Some(id) => id,
            None => renderer.create_particle_container(
                PARTICLE_CONTAINER,
                self.max_particles,
                None,
                PARTICLE_Z,
            ),
        }
    }

    /// Replace the profile used for `kind`
    pub fn configure(&mut self, kind: ParticleKind, config: ParticleConfig) {
        self.configs.insert(kind, config);
    }

    pub fn config(&self, kind: ParticleKind) -> Option<&ParticleConfig> {
        self.configs.get(&kind)
    }

    pub fn set_max_particles(&mut self, max: usize) {
        self.max_particles = max;
    }

    pub fn max_particles(&self) -> usize {
        self.max_particles
    }

    /// Subscribe to frame ticks. Returns false if already running.
    pub fn start(&mut self) -> bool {
        if self.active {
            return false;
        }
        self.active = true;
        log::debug!("Particle system started");
        true
    }

    pub fn stop(&mut self) -> bool {
        if !self.active {
            return false;
        }
        self.active = false;
        log::debug!("Particle system stopped");
        true
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn particle_count(&self) -> usize {
        self.particles.len()
    }

    pub fn particles(&self) -> impl Iterator<Item = &Particle> {
        self.particles.iter()
    }

    fn jitter(&mut self) -> f32 {
        self.rng.random_range(-1.0f32..=1.0)
    }

    /// Spawn up to `count` particles at `position`. With a `direction` the
    /// launch angle stays within `±spread` of it, otherwise it is uniform.
    /// Returns the number spawned after the particle cap.
    pub fn emit(
        &mut self,
        renderer: &mut SpriteRenderer,
        kind: ParticleKind,
        position: Vec2,
        count: u32,
        direction: Option<Vec2>,
        spread: f32,
    ) -> usize {
        let Some(config) = self.configs.get(&kind).cloned() else {
            log::error!("Particle config not found for type: {}", kind.as_str());
            return 0;
        };
        let Some(texture) = renderer.texture(&config.texture) else {
            log::error!("Texture not found for particle: {}", config.texture);
            return 0;
        };

        let room = self.max_particles.saturating_sub(self.particles.len());
        let count = (count as usize).min(room);
        let aim = direction
            .filter(|d| d.length_squared() > 0.0)
            .map(|d| d.y.atan2(d.x));
        let container = self.container(renderer);

        for _ in 0..count {
            let rotation = config.rotation + self.jitter() * config.rotation_variance;
            let scale = config.scale + self.jitter() * config.scale_variance;
            let alpha = (config.alpha + self.jitter() * config.alpha_variance).clamp(0.0, 1.0);
            let offsets = [self.jitter(), self.jitter(), self.jitter()];
            let tint = vary_color(config.color, config.color_variance, offsets);
            let speed = config.speed + self.jitter() * config.speed_variance;
            let angle = match aim {
                Some(a) => a + self.jitter() * spread,
                None => self.rng.random_range(0.0..std::f32::consts::TAU),
            };

            let mut node = Node::new(NodeKind::Sprite {
                texture: texture.clone(),
            });
            node.transform.position = position;
            node.transform.anchor = Vec2::splat(0.5);
            node.transform.rotation = rotation;
            node.transform.scale = Vec2::splat(scale);
            node.alpha = alpha;
            node.tint = tint;
            node.blend = config.blend;
            let node = renderer.add_node(container, node);
            let rotation_speed = self.jitter() * std::f32::consts::FRAC_PI_2;

            self.particles.push(Particle {
                node,
                kind,
                position,
                velocity: crate::direction(angle) * speed,
                rotation,
                rotation_speed,
                lifetime: config.lifetime,
                max_lifetime: config.lifetime,
                initial_scale: scale,
                initial_alpha: alpha,
                gravity: config.gravity,
                fade_out: config.fade_out,
                shrink: config.shrink,
            });
        }
        count
    }

    /// Advance particles then emitters by `delta` seconds. Does nothing
    /// while stopped.
    pub fn tick(&mut self, renderer: &mut SpriteRenderer, delta: f32) {
        if !self.active || delta.is_nan() || delta <= 0.0 {
            return;
        }

        self.particles.retain_mut(|p| {
            p.lifetime -= delta;
            if p.lifetime <= 0.0 {
                renderer.remove_node(p.node);
                return false;
            }
            p.position += p.velocity * delta * REFERENCE_FPS;
            p.velocity += p.gravity * delta;
            p.rotation += p.rotation_speed * delta;

            let ratio = p.life_ratio();
            if let Some(node) = renderer.node_mut(p.node) {
                node.transform.position = p.position;
                node.transform.rotation = p.rotation;
                if p.fade_out {
                    node.alpha = p.initial_alpha * ratio;
                }
                if p.shrink {
                    node.transform.scale = Vec2::splat(p.initial_scale * ratio);
                }
            }
            true
        });

        let mut due = Vec::new();
        self.emitters.retain_mut(|e| {
            if let Some(target) = &e.options.follow {
                match renderer.entity_position(target) {
                    Some(p) => e.origin = p,
                    None => {
                        log::debug!("Emitter {:?} lost `{target}`", e.id);
                        return false;
                    }
                }
            }
            match e.advance(delta) {
                Pulse::Expired => false,
                Pulse::Quiet => true,
                Pulse::Burst(n) => {
                    due.push((
                        e.kind,
                        e.origin,
                        n * e.options.count,
                        e.options.direction,
                        e.options.spread,
                    ));
                    true
                }
            }
        });
        for (kind, origin, count, direction, spread) in due {
            self.emit(renderer, kind, origin, count, direction, spread);
        }
    }

    /// Recurring emission at `position` (or at a followed entity)
    pub fn create_emitter(
        &mut self,
        kind: ParticleKind,
        position: Vec2,
        options: EmitterOptions,
    ) -> EmitterId {
        let id = EmitterId(self.next_emitter);
        self.next_emitter += 1;
        self.emitters.push(Emitter::new(id, kind, position, options));
        log::debug!("Emitter {id:?} created ({})", kind.as_str());
        id
    }

    /// Returns false if the emitter had already finished or never existed
    pub fn stop_emitter(&mut self, id: EmitterId) -> bool {
        let before = self.emitters.len();
        self.emitters.retain(|e| e.id != id);
        let stopped = self.emitters.len() != before;
        if stopped {
            log::debug!("Stopping emitter: {id:?}");
        }
        stopped
    }

    pub fn has_emitter(&self, id: EmitterId) -> bool {
        self.emitters.iter().any(|e| e.id == id)
    }

    pub fn emitter_count(&self) -> usize {
        self.emitters.len()
    }

    /// Drop every particle and emitter. Profiles stay.
    pub fn clear(&mut self, renderer: &mut SpriteRenderer) {
        for p in self.particles.drain(..) {
            renderer.remove_node(p.node);
        }
        self.emitters.clear();
    }

    /// Terminal teardown, including the container and profiles
    pub fn destroy(&mut self, renderer: &mut SpriteRenderer) {
        self.stop();
        self.clear(renderer);
        renderer.remove_particle_system(PARTICLE_CONTAINER);
        self.configs.clear();
        log::info!("Particle system destroyed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::particles::config::PARTICLE_TEXTURE;
    use proptest::prelude::*;

    fn setup(max: usize) -> (SpriteRenderer, ParticleSystem) {
        let mut renderer = SpriteRenderer::new(800, 600, 0);
        renderer.bake_texture(PARTICLE_TEXTURE, 8, 8, |_| {});
        renderer.bake_texture("archer_idle_0", 40, 40, |_| {});
        let mut system = ParticleSystem::new(&mut renderer, max, 7);
        system.start();
        (renderer, system)
    }

    #[test]
    fn test_emit_respects_cap() {
        let (mut r, mut s) = setup(10);
        assert_eq!(s.emit(&mut r, ParticleKind::Explosion, Vec2::ZERO, 8, None, 0.0), 8);
        assert_eq!(s.emit(&mut r, ParticleKind::Explosion, Vec2::ZERO, 8, None, 0.0), 2);
        assert_eq!(s.particle_count(), 10);
    }

    #[test]
    fn test_missing_texture_emits_nothing() {
        let mut r = SpriteRenderer::new(100, 100, 0);
        let mut s = ParticleSystem::new(&mut r, 100, 1);
        assert_eq!(s.emit(&mut r, ParticleKind::ArrowImpact, Vec2::ZERO, 5, None, 0.0), 0);
    }

    #[test]
    fn test_directional_emission_stays_in_spread() {
        let (mut r, mut s) = setup(100);
        let spread = 0.2;
        s.emit(&mut r, ParticleKind::ArrowImpact, Vec2::ZERO, 50, Some(Vec2::X), spread);
        for p in s.particles() {
            let angle = p.velocity().y.atan2(p.velocity().x);
            assert!(angle.abs() <= spread + 1e-4, "{angle}");
        }
    }

    #[test]
    fn test_stopped_system_does_not_age() {
        let (mut r, mut s) = setup(100);
        s.emit(&mut r, ParticleKind::ArrowTrail, Vec2::ZERO, 1, None, 0.0);
        s.stop();
        s.tick(&mut r, 1.0);
        assert_eq!(s.particle_count(), 1);
    }

    #[test]
    fn test_fade_and_shrink_follow_life_ratio() {
        let (mut r, mut s) = setup(100);
        s.emit(&mut r, ParticleKind::ArrowTrail, Vec2::ZERO, 1, None, 0.0);
        let p = s.particles().next().unwrap().clone();
        s.tick(&mut r, 0.25);
        let node = r.node_mut(p.node).unwrap();
        assert!((node.alpha - p.initial_alpha * 0.5).abs() < 1e-4);
        assert!((node.transform.scale.x - p.initial_scale * 0.5).abs() < 1e-4);
    }

    #[test]
    fn test_emitter_runs_and_stops() {
        let (mut r, mut s) = setup(1000);
        let id = s.create_emitter(
            ParticleKind::ArrowTrail,
            Vec2::ZERO,
            EmitterOptions::every(0.05, 2),
        );
        s.tick(&mut r, 1.0 / 60.0);
        assert_eq!(s.particle_count(), 2);
        assert!(s.stop_emitter(id));
        assert!(!s.stop_emitter(id));
        for _ in 0..10 {
            s.tick(&mut r, 1.0 / 60.0);
        }
        assert_eq!(s.particle_count(), 2);
    }

    #[test]
    fn test_follow_emitter_stops_with_its_sprite() {
        let (mut r, mut s) = setup(1000);
        r.create_sprite(
            "arrow-sprite",
            "archer_idle_0",
            &crate::renderer::Placement::default().at(Vec2::new(40.0, 50.0)),
        );
        let id = s.create_emitter(
            ParticleKind::ArrowTrail,
            Vec2::ZERO,
            EmitterOptions::every(0.05, 1).following("arrow-sprite"),
        );
        s.tick(&mut r, 1.0 / 60.0);
        let p = s.particles().next().unwrap();
        assert_eq!(p.position(), Vec2::new(40.0, 50.0));

        r.remove_sprite("arrow-sprite");
        s.tick(&mut r, 1.0 / 60.0);
        assert!(!s.has_emitter(id));
    }

    #[test]
    fn test_clear_and_destroy_release_nodes() {
        let (mut r, mut s) = setup(100);
        let baseline = r.node_count();
        s.emit(&mut r, ParticleKind::Powerup, Vec2::ZERO, 20, None, 0.0);
        assert_eq!(r.node_count(), baseline + 20);
        s.clear(&mut r);
        assert_eq!(r.node_count(), baseline);
        s.destroy(&mut r);
        assert_eq!(r.particle_system_count(), 0);
        assert_eq!(s.emit(&mut r, ParticleKind::Powerup, Vec2::ZERO, 1, None, 0.0), 0);
    }

    proptest! {
        #[test]
        fn test_lifetime_decreases_monotonically(ticks in 1usize..120, dt in 0.005f32..0.05) {
            let (mut r, mut s) = setup(10);
            s.emit(&mut r, ParticleKind::ArrowImpact, Vec2::ZERO, 1, None, 0.0);
            let lifetime = ParticleConfig::preset(ParticleKind::ArrowImpact).lifetime;
            let elapsed = ticks as f32 * dt;
            prop_assume!((elapsed - lifetime).abs() > 1e-3);

            let mut last = lifetime;
            for _ in 0..ticks {
                s.tick(&mut r, dt);
                if let Some(p) = s.particles().next() {
                    prop_assert!(p.lifetime() < last);
                    last = p.lifetime();
                }
            }
            if elapsed < lifetime {
                let p = s.particles().next().unwrap();
                prop_assert!((p.lifetime() - (lifetime - elapsed)).abs() < 1e-3);
            } else {
                prop_assert_eq!(s.particle_count(), 0);
            }
        }
    }
}

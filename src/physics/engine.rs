//! Rigid-body engine wrapper over rapier2d
//!
//! Owns the rapier sets, a label → body index and one collision callback per
//! label. Callbacks run after each step against settled body snapshots, so
//! they never observe a half-stepped world and cannot re-enter the engine.

use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;

use glam::Vec2;
use rapier2d::na::UnitComplex;
use rapier2d::prelude::*;

use super::runner::Runner;
use crate::error::PhysicsError;
use crate::settings::PhysicsSettings;

pub type BodyHandle = RigidBodyHandle;

/// Defaults applied when a body omits its material
pub const DEFAULT_FRICTION: f32 = 0.1;
pub const DEFAULT_RESTITUTION: f32 = 0.6;
pub const DEFAULT_DENSITY: f32 = 0.001;

/// Category/mask filter. Two bodies interact only when each one's mask
/// contains the other's category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CollisionFilter {
    pub category: u32,
    pub mask: u32,
}

impl CollisionFilter {
    pub const ALL: CollisionFilter = CollisionFilter {
        category: 1,
        mask: u32::MAX,
    };

    pub fn interacts_with(&self, other: &CollisionFilter) -> bool {
        self.mask & other.category != 0 && other.mask & self.category != 0
    }

    fn groups(&self) -> InteractionGroups {
        InteractionGroups::new(
            Group::from_bits_truncate(self.category),
            Group::from_bits_truncate(self.mask),
        )
    }
}

/// Everything about a new body except its geometry
#[derive(Debug, Clone)]
pub struct BodyOptions<L> {
    pub position: Vec2,
    pub angle: f32,
    pub velocity: Vec2,
    pub is_static: bool,
    /// Reports contacts without a physical response
    pub is_sensor: bool,
    pub fixed_rotation: bool,
    /// Continuous collision detection for fast movers
    pub ccd: bool,
    pub friction: Option<f32>,
    pub restitution: Option<f32>,
    pub density: Option<f32>,
    pub filter: Option<CollisionFilter>,
    pub label: Option<L>,
}

impl<L> BodyOptions<L> {
    pub fn at(position: Vec2) -> Self {
        Self {
            position,
            angle: 0.0,
            velocity: Vec2::ZERO,
            is_static: false,
            is_sensor: false,
            fixed_rotation: false,
            ccd: false,
            friction: None,
            restitution: None,
            density: None,
            filter: None,
            label: None,
        }
    }

    pub fn label(mut self, label: L) -> Self {
        self.label = Some(label);
        self
    }

    pub fn angle(mut self, angle: f32) -> Self {
        self.angle = angle;
        self
    }

    pub fn velocity(mut self, velocity: Vec2) -> Self {
        self.velocity = velocity;
        self
    }

    pub fn fixed(mut self) -> Self {
        self.is_static = true;
        self
    }

    pub fn sensor(mut self) -> Self {
        self.is_sensor = true;
        self
    }

    pub fn material(mut self, friction: f32, restitution: f32, density: f32) -> Self {
        self.friction = Some(friction);
        self.restitution = Some(restitution);
        self.density = Some(density);
        self
    }

    pub fn filter(mut self, filter: CollisionFilter) -> Self {
        self.filter = Some(filter);
        self
    }
}

/// Settled state of one body, handed to collision callbacks and queries
#[derive(Debug, Clone, PartialEq)]
pub struct BodySnapshot<L> {
    pub handle: BodyHandle,
    pub label: Option<L>,
    pub position: Vec2,
    pub angle: f32,
    pub velocity: Vec2,
    pub is_static: bool,
}

pub type CollisionCallback<L> = Box<dyn FnMut(&BodySnapshot<L>, &BodySnapshot<L>)>;

/// Everything rapier needs to step; rebuilt wholesale on clear
struct World {
    pipeline: PhysicsPipeline,
    islands: IslandManager,
    broad_phase: DefaultBroadPhase,
    narrow_phase: NarrowPhase,
    bodies: RigidBodySet,
    colliders: ColliderSet,
    impulse_joints: ImpulseJointSet,
    multibody_joints: MultibodyJointSet,
    ccd_solver: CCDSolver,
}

impl World {
    fn new() -> Self {
        Self {
            pipeline: PhysicsPipeline::new(),
            islands: IslandManager::new(),
            broad_phase: DefaultBroadPhase::new(),
            narrow_phase: NarrowPhase::new(),
            bodies: RigidBodySet::new(),
            colliders: ColliderSet::new(),
            impulse_joints: ImpulseJointSet::new(),
            multibody_joints: MultibodyJointSet::new(),
            ccd_solver: CCDSolver::new(),
        }
    }
}

pub struct PhysicsEngine<L> {
    world: World,
    gravity: Vector<Real>,
    params: IntegrationParameters,
    runner: Runner,
    labels: HashMap<L, BodyHandle>,
    body_labels: HashMap<BodyHandle, L>,
    callbacks: HashMap<L, CollisionCallback<L>>,
}

impl<L> fmt::Debug for PhysicsEngine<L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PhysicsEngine")
            .field("bodies", &self.world.bodies.len())
            .field("labels", &self.labels.len())
            .field("callbacks", &self.callbacks.len())
            .field("running", &self.runner.is_running())
            .finish()
    }
}

impl<L> PhysicsEngine<L>
where
    L: Clone + Eq + Hash + fmt::Debug,
{
    pub fn new(settings: &PhysicsSettings) -> Self {
        let mut params = IntegrationParameters::default();
        params.dt = settings.fixed_dt;
        // world units are pixels
        params.length_unit = 100.0;

        log::info!(
            "Physics engine initialized (gravity {:?}, dt {:.4})",
            settings.gravity,
            settings.fixed_dt
        );
        Self {
            world: World::new(),
            gravity: vector![settings.gravity.x, settings.gravity.y],
            params,
            runner: Runner::new(settings),
            labels: HashMap::new(),
            body_labels: HashMap::new(),
            callbacks: HashMap::new(),
        }
    }

    // --- Runner ---

    /// Start the automatic fixed-step runner. Idempotent.
    pub fn start(&mut self) {
        if self.runner.start() {
            log::info!("Physics engine started");
        }
    }

    /// Stop the runner. Idempotent.
    pub fn stop(&mut self) {
        if self.runner.stop() {
            log::info!("Physics engine stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        self.runner.is_running()
    }

    /// Feed wall-clock time to the runner; steps only while started.
    /// Returns the number of fixed steps taken.
    pub fn advance(&mut self, elapsed: f32) -> u32 {
        let steps = self.runner.advance(elapsed);
        let dt = self.runner.fixed_dt();
        for _ in 0..steps {
            self.step(dt);
        }
        steps
    }

    /// Manual single step of `delta` seconds, independent of the runner
    pub fn update(&mut self, delta: f32) {
        if delta > 0.0 {
            self.step(delta);
        }
    }

    pub fn total_steps(&self) -> u64 {
        self.runner.total_steps()
    }

    fn step(&mut self, dt: f32) {
        self.params.dt = dt;

        let (collision_send, collision_recv) =
            rapier2d::crossbeam::channel::unbounded::<CollisionEvent>();
        let (force_send, _force_recv) =
            rapier2d::crossbeam::channel::unbounded::<ContactForceEvent>();
        let events = ChannelEventCollector::new(collision_send, force_send);

        let w = &mut self.world;
        w.pipeline.step(
            &self.gravity,
            &self.params,
            &mut w.islands,
            &mut w.broad_phase,
            &mut w.narrow_phase,
            &mut w.bodies,
            &mut w.colliders,
            &mut w.impulse_joints,
            &mut w.multibody_joints,
            &mut w.ccd_solver,
            None,
            &(),
            &events,
        );

        let mut pairs = Vec::new();
        while let Ok(event) = collision_recv.try_recv() {
            if let CollisionEvent::Started(c1, c2, _) = event {
                let parent = |c| self.world.colliders.get(c).and_then(|c: &Collider| c.parent());
                if let (Some(a), Some(b)) = (parent(c1), parent(c2)) {
                    pairs.push((a, b));
                }
            }
        }
        self.dispatch(&pairs);
    }

    /// Each side with a registered callback hears about the pair independently
    fn dispatch(&mut self, pairs: &[(BodyHandle, BodyHandle)]) {
        if self.callbacks.is_empty() {
            return;
        }
        for &(a, b) in pairs {
            let (Some(snap_a), Some(snap_b)) = (self.snapshot(a), self.snapshot(b)) else {
                continue;
            };
            if let Some(cb) = snap_a.label.as_ref().and_then(|l| self.callbacks.get_mut(l)) {
                cb(&snap_a, &snap_b);
            }
            if let Some(cb) = snap_b.label.as_ref().and_then(|l| self.callbacks.get_mut(l)) {
                cb(&snap_b, &snap_a);
            }
        }
    }

    // --- Bodies ---

    pub fn create_rectangle(&mut self, width: f32, height: f32, opts: BodyOptions<L>) -> BodyHandle {
        self.insert(SharedShape::cuboid(width / 2.0, height / 2.0), opts)
    }

    pub fn create_circle(&mut self, radius: f32, opts: BodyOptions<L>) -> BodyHandle {
        self.insert(SharedShape::ball(radius), opts)
    }

    /// Regular polygon with `sides` vertices on a circle of `radius`
    pub fn create_polygon(
        &mut self,
        sides: u32,
        radius: f32,
        opts: BodyOptions<L>,
    ) -> Result<BodyHandle, PhysicsError> {
        let degenerate = PhysicsError::DegeneratePolygon { sides, radius };
        if sides < 3 {
            return Err(degenerate);
        }
        let theta = std::f32::consts::TAU / sides as f32;
        let points: Vec<Point<Real>> = (0..sides)
            .map(|i| {
                let a = theta * 0.5 + theta * i as f32;
                point![a.cos() * radius, a.sin() * radius]
            })
            .collect();
        let shape = SharedShape::convex_hull(&points).ok_or(degenerate)?;
        Ok(self.insert(shape, opts))
    }

    fn insert(&mut self, shape: SharedShape, opts: BodyOptions<L>) -> BodyHandle {
        let builder = if opts.is_static {
            RigidBodyBuilder::fixed()
        } else {
            // slow movers (a weak arrow) must not doze off mid-flight
            RigidBodyBuilder::dynamic()
                .linvel(vector![opts.velocity.x, opts.velocity.y])
                .can_sleep(false)
        };
        let mut builder = builder
            .translation(vector![opts.position.x, opts.position.y])
            .rotation(opts.angle)
            .ccd_enabled(opts.ccd);
        if opts.fixed_rotation {
            builder = builder.lock_rotations();
        }
        let handle = self.world.bodies.insert(builder.build());

        let filter = opts.filter.unwrap_or(CollisionFilter::ALL);
        let collider = ColliderBuilder::new(shape)
            .friction(opts.friction.unwrap_or(DEFAULT_FRICTION))
            .restitution(opts.restitution.unwrap_or(DEFAULT_RESTITUTION))
            .density(opts.density.unwrap_or(DEFAULT_DENSITY))
            .sensor(opts.is_sensor)
            .collision_groups(filter.groups())
            .active_events(ActiveEvents::COLLISION_EVENTS)
            .build();
        self.world
            .colliders
            .insert_with_parent(collider, handle, &mut self.world.bodies);

        if let Some(label) = opts.label {
            if let Some(previous) = self.labels.insert(label.clone(), handle) {
                log::warn!("Label {label:?} re-registered; removing its previous body");
                self.body_labels.remove(&previous);
                self.remove_rapier_body(previous);
            }
            self.body_labels.insert(handle, label);
        }
        handle
    }

    /// Remove a body and its label entry. Unknown handles are ignored.
    /// Collision callbacks are left registered.
    pub fn remove_body(&mut self, handle: BodyHandle) {
        if let Some(label) = self.body_labels.remove(&handle) {
            self.labels.remove(&label);
        }
        self.remove_rapier_body(handle);
    }

    fn remove_rapier_body(&mut self, handle: BodyHandle) {
        let w = &mut self.world;
        w.bodies.remove(
            handle,
            &mut w.islands,
            &mut w.colliders,
            &mut w.impulse_joints,
            &mut w.multibody_joints,
            true,
        );
    }

    pub fn body(&self, label: &L) -> Option<BodyHandle> {
        self.labels.get(label).copied()
    }

    pub fn label_of(&self, handle: BodyHandle) -> Option<&L> {
        self.body_labels.get(&handle)
    }

    pub fn contains(&self, handle: BodyHandle) -> bool {
        self.world.bodies.contains(handle)
    }

    pub fn body_count(&self) -> usize {
        self.world.bodies.len()
    }

    pub fn snapshot(&self, handle: BodyHandle) -> Option<BodySnapshot<L>> {
        let rb = self.world.bodies.get(handle)?;
        let t = rb.translation();
        let v = rb.linvel();
        Some(BodySnapshot {
            handle,
            label: self.body_labels.get(&handle).cloned(),
            position: Vec2::new(t.x, t.y),
            angle: rb.rotation().angle(),
            velocity: Vec2::new(v.x, v.y),
            is_static: rb.is_fixed(),
        })
    }

    // --- Direct mutation ---

    pub fn set_position(&mut self, handle: BodyHandle, position: Vec2) {
        if let Some(rb) = self.world.bodies.get_mut(handle) {
            rb.set_translation(vector![position.x, position.y], true);
        }
    }

    pub fn set_velocity(&mut self, handle: BodyHandle, velocity: Vec2) {
        if let Some(rb) = self.world.bodies.get_mut(handle) {
            rb.set_linvel(vector![velocity.x, velocity.y], true);
        }
    }

    pub fn set_angle(&mut self, handle: BodyHandle, angle: f32) {
        if let Some(rb) = self.world.bodies.get_mut(handle) {
            rb.set_rotation(UnitComplex::new(angle), true);
        }
    }

    /// Instantaneous push through the centre of mass
    pub fn apply_force(&mut self, handle: BodyHandle, force: Vec2) {
        if let Some(rb) = self.world.bodies.get_mut(handle) {
            rb.apply_impulse(vector![force.x, force.y], true);
        }
    }

    // --- Collision routing ---

    /// Register the callback for `label`, replacing any previous one
    pub fn on_collision(
        &mut self,
        label: L,
        callback: impl FnMut(&BodySnapshot<L>, &BodySnapshot<L>) + 'static,
    ) {
        self.callbacks.insert(label, Box::new(callback));
    }

    pub fn off_collision(&mut self, label: &L) {
        self.callbacks.remove(label);
    }

    pub fn callback_count(&self) -> usize {
        self.callbacks.len()
    }

    /// Remove every body and callback. The runner state is kept.
    pub fn clear_world(&mut self) {
        let bodies = self.world.bodies.len();
        self.world = World::new();
        self.labels.clear();
        self.body_labels.clear();
        self.callbacks.clear();
        log::info!("Physics world cleared ({bodies} bodies)");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    type Engine = PhysicsEngine<&'static str>;

    fn engine() -> Engine {
        PhysicsEngine::new(&PhysicsSettings::default())
    }

    const DT: f32 = 1.0 / 60.0;

    #[test]
    fn test_label_lookup_and_removal() {
        let mut e = engine();
        let h = e.create_circle(10.0, BodyOptions::at(Vec2::new(5.0, 5.0)).label("ball"));
        assert_eq!(e.body(&"ball"), Some(h));
        assert_eq!(e.label_of(h), Some(&"ball"));
        assert_eq!(e.body_count(), 1);

        e.remove_body(h);
        e.remove_body(h);
        assert_eq!(e.body(&"ball"), None);
        assert_eq!(e.body_count(), 0);
    }

    #[test]
    fn test_relabel_replaces_previous_body() {
        let mut e = engine();
        let first = e.create_circle(5.0, BodyOptions::at(Vec2::ZERO).label("x"));
        let second = e.create_circle(5.0, BodyOptions::at(Vec2::ZERO).label("x"));
        assert!(!e.contains(first));
        assert_eq!(e.body(&"x"), Some(second));
        assert_eq!(e.body_count(), 1);
    }

    #[test]
    fn test_velocity_moves_body() {
        let mut e = engine();
        let h = e.create_circle(5.0, BodyOptions::at(Vec2::ZERO));
        e.set_velocity(h, Vec2::new(60.0, 0.0));
        for _ in 0..60 {
            e.update(DT);
        }
        let snap = e.snapshot(h).unwrap();
        assert!((snap.position.x - 60.0).abs() < 1.0, "{:?}", snap.position);
        assert!(snap.position.y.abs() < 1e-3);
    }

    #[test]
    fn test_set_position_and_angle_are_immediate() {
        let mut e = engine();
        let h = e.create_rectangle(10.0, 2.0, BodyOptions::at(Vec2::ZERO));
        e.set_position(h, Vec2::new(30.0, 40.0));
        e.set_angle(h, 0.5);
        let snap = e.snapshot(h).unwrap();
        assert_eq!(snap.position, Vec2::new(30.0, 40.0));
        assert!((snap.angle - 0.5).abs() < 1e-5);
    }

    #[test]
    fn test_degenerate_polygon_is_error() {
        let mut e = engine();
        assert!(e.create_polygon(2, 10.0, BodyOptions::at(Vec2::ZERO)).is_err());
        assert!(e.create_polygon(6, 10.0, BodyOptions::at(Vec2::ZERO)).is_ok());
        assert_eq!(e.body_count(), 1);
    }

    #[test]
    fn test_collision_callback_both_sides() {
        let mut e = engine();
        let hits: Rc<RefCell<Vec<(&'static str, &'static str)>>> = Rc::default();

        e.create_circle(
            5.0,
            BodyOptions::at(Vec2::ZERO).label("ball").velocity(Vec2::new(300.0, 0.0)),
        );
        e.create_rectangle(10.0, 200.0, BodyOptions::at(Vec2::new(100.0, 0.0)).label("wall").fixed());

        for label in ["ball", "wall"] {
            let hits = hits.clone();
            e.on_collision(label, move |own, other| {
                hits.borrow_mut()
                    .push((own.label.unwrap(), other.label.unwrap()));
            });
        }

        for _ in 0..120 {
            e.update(DT);
        }
        let hits = hits.borrow();
        assert!(hits.contains(&("ball", "wall")));
        assert!(hits.contains(&("wall", "ball")));
    }

    #[test]
    fn test_filtered_pair_stays_silent() {
        let mut e = engine();
        let hits = Rc::new(RefCell::new(0));
        let solo = CollisionFilter {
            category: 0b01,
            mask: 0b10,
        };
        e.create_circle(
            5.0,
            BodyOptions::at(Vec2::ZERO)
                .label("a")
                .velocity(Vec2::new(300.0, 0.0))
                .filter(solo),
        );
        e.create_circle(5.0, BodyOptions::at(Vec2::new(50.0, 0.0)).label("b").filter(solo));
        let counter = hits.clone();
        e.on_collision("a", move |_, _| *counter.borrow_mut() += 1);

        for _ in 0..60 {
            e.update(DT);
        }
        assert_eq!(*hits.borrow(), 0);
    }

    #[test]
    fn test_advance_requires_start() {
        let mut e = engine();
        assert_eq!(e.advance(0.5), 0);
        e.start();
        e.start();
        assert!(e.advance(0.05) >= 2);
        e.stop();
        assert_eq!(e.advance(0.05), 0);
    }

    #[test]
    fn test_clear_world_drops_everything() {
        let mut e = engine();
        e.create_circle(5.0, BodyOptions::at(Vec2::ZERO).label("a"));
        e.create_rectangle(5.0, 5.0, BodyOptions::at(Vec2::ONE).fixed());
        e.on_collision("a", |_, _| {});
        e.clear_world();
        assert_eq!(e.body_count(), 0);
        assert_eq!(e.callback_count(), 0);
        assert_eq!(e.body(&"a"), None);
    }

    #[test]
    fn test_filter_interaction_is_mutual() {
        let arrow = CollisionFilter {
            category: 2,
            mask: 1 | 4,
        };
        let player = CollisionFilter {
            category: 1,
            mask: 1 | 4,
        };
        assert!(!arrow.interacts_with(&player));
        assert!(!arrow.interacts_with(&arrow));
    }
}

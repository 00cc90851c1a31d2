//! Archer arena physics
//!
//! Encodes the arena's collision topology once: which roles exist, what
//! they are made of and who may hit whom. Gameplay code works with ids and
//! never touches category bits.
//!
//! Collision callbacks only record [`ArenaEvent`]s; the loop driver drains
//! and resolves them after the physics step.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use glam::Vec2;

use super::engine::{BodyHandle, BodyOptions, BodySnapshot, CollisionFilter, PhysicsEngine};
use crate::consts::*;
use crate::error::PhysicsError;
use crate::settings::Settings;

/// Collision category bits
pub mod category {
    pub const PLAYER: u32 = 0x0001;
    pub const ARROW: u32 = 0x0002;
    pub const OBSTACLE: u32 = 0x0004;
    pub const BOUNDARY: u32 = 0x0008;
    pub const POWERUP: u32 = 0x0010;
}

/// Every class of body in the arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BodyClass {
    Player,
    Arrow,
    Obstacle,
    Boundary,
    Powerup,
}

impl BodyClass {
    pub const ALL: [BodyClass; 5] = [
        BodyClass::Player,
        BodyClass::Arrow,
        BodyClass::Obstacle,
        BodyClass::Boundary,
        BodyClass::Powerup,
    ];

    pub fn category(&self) -> u32 {
        match self {
            BodyClass::Player => category::PLAYER,
            BodyClass::Arrow => category::ARROW,
            BodyClass::Obstacle => category::OBSTACLE,
            BodyClass::Boundary => category::BOUNDARY,
            BodyClass::Powerup => category::POWERUP,
        }
    }

    /// Categories this class wants to hit
    pub fn declared_mask(&self) -> u32 {
        use category::*;
        match self {
            // arrow hits on players are reported from the arrow side
            BodyClass::Player => PLAYER | OBSTACLE | BOUNDARY | POWERUP,
            BodyClass::Arrow => PLAYER | OBSTACLE | BOUNDARY,
            BodyClass::Obstacle => PLAYER | ARROW | BOUNDARY,
            BodyClass::Boundary => PLAYER | ARROW | OBSTACLE,
            BodyClass::Powerup => PLAYER,
        }
    }

    /// Filter handed to the engine: the declared mask plus every class that
    /// declared this one. The engine only pairs bodies whose masks accept
    /// each other, so without the closure an arrow would pass through a
    /// player whose declared mask leaves out ARROW.
    pub fn filter(&self) -> CollisionFilter {
        let category = self.category();
        let mask = BodyClass::ALL
            .iter()
            .filter(|other| other.declared_mask() & category != 0)
            .fold(self.declared_mask(), |mask, other| mask | other.category());
        CollisionFilter { category, mask }
    }
}

/// Entity roles that carry an application id
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    Player,
    Arrow,
    Obstacle,
    Powerup,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Player => "player",
            Role::Arrow => "arrow",
            Role::Obstacle => "obstacle",
            Role::Powerup => "powerup",
        }
    }

    pub fn class(&self) -> BodyClass {
        match self {
            Role::Player => BodyClass::Player,
            Role::Arrow => BodyClass::Arrow,
            Role::Obstacle => BodyClass::Obstacle,
            Role::Powerup => BodyClass::Powerup,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Typed `{role, id}` reference; ids may contain any characters
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EntityRef {
    pub role: Role,
    pub id: String,
}

impl EntityRef {
    pub fn new(role: Role, id: impl Into<String>) -> Self {
        Self {
            role,
            id: id.into(),
        }
    }
}

impl fmt::Display for EntityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} `{}`", self.role, self.id)
    }
}

/// Arena wall
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Edge {
    Top,
    Bottom,
    Left,
    Right,
}

/// Body label used for lookup and collision routing
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum BodyTag {
    Entity(EntityRef),
    Boundary(Edge),
}

impl BodyTag {
    pub fn entity(role: Role, id: &str) -> Self {
        BodyTag::Entity(EntityRef::new(role, id))
    }

    pub fn class(&self) -> BodyClass {
        match self {
            BodyTag::Entity(e) => e.role.class(),
            BodyTag::Boundary(_) => BodyClass::Boundary,
        }
    }
}

/// Gameplay-relevant contact, produced during a physics step
#[derive(Debug, Clone, PartialEq)]
pub enum ArenaEvent {
    ArrowHitPlayer { arrow: String, player: String },
    ArrowHitObstacle { arrow: String, obstacle: String },
    ArrowHitBoundary { arrow: String, edge: Edge },
    PowerupCollected { player: String, powerup: String },
}

/// Material per class
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Material {
    pub friction: f32,
    pub restitution: f32,
    pub density: f32,
}

pub const PLAYER_MATERIAL: Material = Material {
    friction: 0.05,
    restitution: 0.2,
    density: 0.002,
};
pub const ARROW_MATERIAL: Material = Material {
    friction: 0.01,
    restitution: 0.1,
    density: 0.0005,
};
pub const OBSTACLE_MATERIAL: Material = Material {
    friction: 0.8,
    restitution: 0.1,
    density: 0.01,
};

/// Obstacle geometry
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ObstacleShape {
    Rectangle { width: f32, height: f32 },
    Polygon { sides: u32, radius: f32 },
}

/// Queried state of one entity body
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PhysicsState {
    pub position: Vec2,
    pub angle: f32,
    pub velocity: Vec2,
}

impl From<BodySnapshot<BodyTag>> for PhysicsState {
    fn from(s: BodySnapshot<BodyTag>) -> Self {
        Self {
            position: s.position,
            angle: s.angle,
            velocity: s.velocity,
        }
    }
}

type EventQueue = Rc<RefCell<Vec<ArenaEvent>>>;

pub struct ArcherPhysics {
    engine: PhysicsEngine<BodyTag>,
    players: HashMap<String, BodyHandle>,
    arrows: HashMap<String, BodyHandle>,
    obstacles: HashMap<String, BodyHandle>,
    powerups: HashMap<String, BodyHandle>,
    events: EventQueue,
}

impl ArcherPhysics {
    /// Physics world with boundary walls around the configured arena
    pub fn new(settings: &Settings) -> Self {
        let mut physics = Self {
            engine: PhysicsEngine::new(&settings.physics),
            players: HashMap::new(),
            arrows: HashMap::new(),
            obstacles: HashMap::new(),
            powerups: HashMap::new(),
            events: EventQueue::default(),
        };
        physics.create_arena_limits(settings.arena.width, settings.arena.height);
        log::info!(
            "Arena physics initialized ({}x{})",
            settings.arena.width,
            settings.arena.height
        );
        physics
    }

    pub fn start(&mut self) {
        self.engine.start();
    }

    pub fn stop(&mut self) {
        self.engine.stop();
    }

    pub fn is_running(&self) -> bool {
        self.engine.is_running()
    }

    /// Feed wall-clock time to the fixed-step runner
    pub fn advance(&mut self, elapsed: f32) -> u32 {
        self.engine.advance(elapsed)
    }

    /// Manual step, independent of the runner
    pub fn update(&mut self, delta: f32) {
        self.engine.update(delta);
    }

    /// Four static walls just outside the play field, inner faces flush with
    /// its edges. Calling again replaces the previous walls.
    pub fn create_arena_limits(&mut self, width: f32, height: f32) {
        let t = BOUNDARY_THICKNESS;
        let walls = [
            (Edge::Top, Vec2::new(width / 2.0, -t / 2.0), Vec2::new(width, t)),
            (Edge::Bottom, Vec2::new(width / 2.0, height + t / 2.0), Vec2::new(width, t)),
            (Edge::Left, Vec2::new(-t / 2.0, height / 2.0), Vec2::new(t, height)),
            (Edge::Right, Vec2::new(width + t / 2.0, height / 2.0), Vec2::new(t, height)),
        ];
        for (edge, center, size) in walls {
            let opts = BodyOptions::at(center)
                .label(BodyTag::Boundary(edge))
                .fixed()
                .filter(BodyClass::Boundary.filter());
            self.engine.create_rectangle(size.x, size.y, opts);
        }
    }

    fn options(role: Role, id: &str, position: Vec2, material: Material) -> BodyOptions<BodyTag> {
        BodyOptions::at(position)
            .label(BodyTag::entity(role, id))
            .material(material.friction, material.restitution, material.density)
            .filter(role.class().filter())
    }

    fn track(map: &mut HashMap<String, BodyHandle>, role: Role, id: &str, handle: BodyHandle) {
        if map.insert(id.to_owned(), handle).is_some() {
            log::warn!("Replaced existing {role} body `{id}`");
        }
    }

    pub fn create_player(&mut self, id: &str, position: Vec2, radius: f32) -> BodyHandle {
        let mut opts = Self::options(Role::Player, id, position, PLAYER_MATERIAL);
        opts.fixed_rotation = true;
        let handle = self.engine.create_circle(radius, opts);
        Self::track(&mut self.players, Role::Player, id, handle);

        let events = self.events.clone();
        let player = id.to_owned();
        self.engine
            .on_collision(BodyTag::entity(Role::Player, id), move |_, other| {
                if let Some(BodyTag::Entity(EntityRef {
                    role: Role::Powerup,
                    id: powerup,
                })) = &other.label
                {
                    log::debug!("Player `{player}` collected powerup `{powerup}`");
                    events.borrow_mut().push(ArenaEvent::PowerupCollected {
                        player: player.clone(),
                        powerup: powerup.clone(),
                    });
                }
            });
        log::debug!("Created player body `{id}` at {position}");
        handle
    }

    /// Arrow box with its long axis along `angle`
    pub fn create_arrow(&mut self, id: &str, position: Vec2, angle: f32, velocity: Vec2) -> BodyHandle {
        let mut opts = Self::options(Role::Arrow, id, position, ARROW_MATERIAL)
            .angle(angle)
            .velocity(velocity);
        opts.ccd = true;
        let handle = self.engine.create_rectangle(ARROW_LENGTH, ARROW_THICKNESS, opts);
        Self::track(&mut self.arrows, Role::Arrow, id, handle);

        let events = self.events.clone();
        let arrow = id.to_owned();
        self.engine
            .on_collision(BodyTag::entity(Role::Arrow, id), move |_, other| {
                let event = match &other.label {
                    Some(BodyTag::Entity(EntityRef {
                        role: Role::Player,
                        id,
                    })) => ArenaEvent::ArrowHitPlayer {
                        arrow: arrow.clone(),
                        player: id.clone(),
                    },
                    Some(BodyTag::Entity(EntityRef {
                        role: Role::Obstacle,
                        id,
                    })) => ArenaEvent::ArrowHitObstacle {
                        arrow: arrow.clone(),
                        obstacle: id.clone(),
                    },
                    Some(BodyTag::Boundary(edge)) => ArenaEvent::ArrowHitBoundary {
                        arrow: arrow.clone(),
                        edge: *edge,
                    },
                    _ => return,
                };
                log::debug!("Arrow contact: {event:?}");
                events.borrow_mut().push(event);
            });
        handle
    }

    pub fn create_obstacle(
        &mut self,
        id: &str,
        position: Vec2,
        shape: ObstacleShape,
        is_static: bool,
    ) -> Result<BodyHandle, PhysicsError> {
        let mut opts = Self::options(Role::Obstacle, id, position, OBSTACLE_MATERIAL);
        opts.is_static = is_static;
        let handle = match shape {
            ObstacleShape::Rectangle { width, height } => {
                self.engine.create_rectangle(width, height, opts)
            }
            ObstacleShape::Polygon { sides, radius } => {
                self.engine.create_polygon(sides, radius, opts)?
            }
        };
        Self::track(&mut self.obstacles, Role::Obstacle, id, handle);
        Ok(handle)
    }

    /// Static sensor: touched, never pushed against
    pub fn create_powerup(&mut self, id: &str, position: Vec2, radius: f32) -> BodyHandle {
        let opts = BodyOptions::at(position)
            .label(BodyTag::entity(Role::Powerup, id))
            .fixed()
            .sensor()
            .filter(BodyClass::Powerup.filter());
        let handle = self.engine.create_circle(radius, opts);
        Self::track(&mut self.powerups, Role::Powerup, id, handle);
        handle
    }

    // --- Movement ---

    /// Teleport a player, optionally turning it
    pub fn update_player(&mut self, id: &str, position: Vec2, angle: Option<f32>) {
        if let Some(&h) = self.players.get(id) {
            self.engine.set_position(h, position);
            if let Some(angle) = angle {
                self.engine.set_angle(h, angle);
            }
        }
    }

    pub fn set_player_velocity(&mut self, id: &str, velocity: Vec2) {
        if let Some(&h) = self.players.get(id) {
            self.engine.set_velocity(h, velocity);
        }
    }

    /// Adds `force` straight onto the player's velocity
    pub fn apply_player_force(&mut self, id: &str, force: Vec2) {
        if let Some(&h) = self.players.get(id) {
            let current = self.engine.snapshot(h).map_or(Vec2::ZERO, |s| s.velocity);
            self.engine.set_velocity(h, current + force);
        }
    }

    // --- Queries ---

    fn state(&self, map: &HashMap<String, BodyHandle>, id: &str) -> Option<PhysicsState> {
        let handle = *map.get(id)?;
        self.engine.snapshot(handle).map(PhysicsState::from)
    }

    pub fn player_state(&self, id: &str) -> Option<PhysicsState> {
        self.state(&self.players, id)
    }

    pub fn arrow_state(&self, id: &str) -> Option<PhysicsState> {
        self.state(&self.arrows, id)
    }

    pub fn obstacle_state(&self, id: &str) -> Option<PhysicsState> {
        self.state(&self.obstacles, id)
    }

    pub fn powerup_state(&self, id: &str) -> Option<PhysicsState> {
        self.state(&self.powerups, id)
    }

    pub fn body_count(&self) -> usize {
        self.engine.body_count()
    }

    pub fn engine(&self) -> &PhysicsEngine<BodyTag> {
        &self.engine
    }

    // --- Teardown ---

    fn remove(&mut self, role: Role, id: &str) {
        let map = match role {
            Role::Player => &mut self.players,
            Role::Arrow => &mut self.arrows,
            Role::Obstacle => &mut self.obstacles,
            Role::Powerup => &mut self.powerups,
        };
        if let Some(handle) = map.remove(id) {
            self.engine.remove_body(handle);
            self.engine.off_collision(&BodyTag::entity(role, id));
            log::debug!("Removed {role} body `{id}`");
        }
    }

    pub fn remove_player(&mut self, id: &str) {
        self.remove(Role::Player, id);
    }

    pub fn remove_arrow(&mut self, id: &str) {
        self.remove(Role::Arrow, id);
    }

    pub fn remove_obstacle(&mut self, id: &str) {
        self.remove(Role::Obstacle, id);
    }

    pub fn remove_powerup(&mut self, id: &str) {
        self.remove(Role::Powerup, id);
    }

    /// Contacts recorded since the last drain, in the order they happened
    pub fn drain_events(&mut self) -> Vec<ArenaEvent> {
        std::mem::take(&mut *self.events.borrow_mut())
    }

    /// Wipe every tracked entity, the walls and the underlying world
    pub fn clear(&mut self) {
        self.players.clear();
        self.arrows.clear();
        self.obstacles.clear();
        self.powerups.clear();
        self.events.borrow_mut().clear();
        self.engine.clear_world();
    }
}

//! Physics: rapier2d wrapper, fixed-step runner and the arena's rules

pub mod arena;
pub mod engine;
pub mod runner;

pub use arena::{
    ArcherPhysics, ArenaEvent, BodyClass, BodyTag, Edge, EntityRef, ObstacleShape, PhysicsState,
    Role, category,
};
pub use engine::{BodyHandle, BodyOptions, BodySnapshot, CollisionFilter, PhysicsEngine};
pub use runner::Runner;

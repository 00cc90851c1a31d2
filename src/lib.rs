//! Archer Arena - physics-synchronized 2D arena runtime
//!
//! Core modules:
//! - `physics`: Rigid-body engine wrapper and the arena's collision topology
//! - `renderer`: Layered scene graph, textures and presentation surface
//! - `particles`: Time-stepped effect emitter driven by the render ticker
//! - `sprites`: Procedural frame generators over a generic drawing context
//! - `game`: Loop driver tying physics state to render state every frame
//! - `platform`: Frame scheduling and browser/native differences

pub mod diagnostics;
pub mod error;
pub mod game;
pub mod particles;
pub mod physics;
pub mod platform;
pub mod renderer;
pub mod settings;
pub mod sprites;

pub use diagnostics::Diagnostics;
pub use error::{AssetError, ConfigError, EntityError, PhysicsError};
pub use game::ArcherGame;
pub use settings::{QualityPreset, Settings};

use glam::Vec2;

/// Game configuration constants
pub mod consts {
    /// Physics runner step (60 Hz)
    pub const PHYSICS_DT: f32 = 1.0 / 60.0;
    /// Maximum fixed steps per runner advance to prevent spiral of death
    pub const MAX_SUBSTEPS: u32 = 8;
    /// Largest wall-clock gap a single advance will account for (seconds)
    pub const MAX_FRAME_DELTA: f32 = 0.1;

    /// Arena defaults
    pub const ARENA_WIDTH: f32 = 800.0;
    pub const ARENA_HEIGHT: f32 = 600.0;
    /// Thickness of the invisible boundary walls
    pub const BOUNDARY_THICKNESS: f32 = 50.0;

    /// Player defaults
    pub const PLAYER_RADIUS: f32 = 20.0;
    /// Speed below which a player counts as standing still
    pub const RUN_THRESHOLD: f32 = 0.1;

    /// Arrow collision box (long axis follows the firing angle)
    pub const ARROW_LENGTH: f32 = 30.0;
    pub const ARROW_THICKNESS: f32 = 5.0;

    /// Powerup collision radius
    pub const POWERUP_RADIUS: f32 = 15.0;

    /// Animation and particle speeds are tuned against a 60 Hz frame
    pub const REFERENCE_FPS: f32 = 60.0;
}

/// Normalized angle to [-π, π)
#[inline]
pub fn normalize_angle(mut angle: f32) -> f32 {
    use std::f32::consts::PI;
    while angle >= PI {
        angle -= 2.0 * PI;
    }
    while angle < -PI {
        angle += 2.0 * PI;
    }
    angle
}

/// Unit vector pointing along `angle` (radians, screen coordinates)
#[inline]
pub fn direction(angle: f32) -> Vec2 {
    Vec2::new(angle.cos(), angle.sin())
}

/// Angle of a vector, or `None` for a zero vector
#[inline]
pub fn heading(v: Vec2) -> Option<f32> {
    if v.length_squared() > 0.0 {
        Some(v.y.atan2(v.x))
    } else {
        None
    }
}

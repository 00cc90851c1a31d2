//! Particle effects
//!
//! Short-lived tinted sprites advanced by the render ticker, independent of
//! the physics step.

pub mod config;
pub mod emitter;
pub mod system;

pub use config::{PARTICLE_TEXTURE, ParticleConfig, ParticleKind};
pub use emitter::{EmitterId, EmitterOptions};
pub use system::{PARTICLE_CONTAINER, Particle, ParticleSystem};

//! Error types
//!
//! Only asset loading and entity creation surface errors to callers; lookup
//! misses are `Option`s and everything else degrades with a log line.

use thiserror::Error;

use crate::physics::EntityRef;

/// Texture/asset loading failures
#[derive(Debug, Error)]
pub enum AssetError {
    #[error("failed to read asset `{url}`: {source}")]
    Io {
        url: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to decode asset `{url}`: {reason}")]
    Decode { url: String, reason: String },
    #[error("no asset registered for `{url}`")]
    NotFound { url: String },
    #[error("{} texture(s) failed to load: {}", failed.len(), failed.join(", "))]
    Batch { failed: Vec<String> },
}

/// The physics library refused a body description
#[derive(Debug, Error)]
pub enum PhysicsError {
    #[error("polygon with {sides} sides and radius {radius} has no convex hull")]
    DegeneratePolygon { sides: u32, radius: f32 },
}

/// Entity creation failed; any physics body created for it was rolled back
#[derive(Debug, Error)]
pub enum EntityError {
    #[error("physics setup failed for {entity}: {source}")]
    Physics {
        entity: EntityRef,
        #[source]
        source: PhysicsError,
    },
    #[error("render setup failed for {entity}: could not create `{resource}`")]
    Render { entity: EntityRef, resource: String },
}

/// Settings could not be loaded
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read settings: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid settings document: {0}")]
    Parse(#[from] serde_json::Error),
}

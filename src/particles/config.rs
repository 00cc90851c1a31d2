//! Built-in particle effect profiles
//!
//! Speeds are pixels per 1/60 s frame; gravity is added to that velocity
//! once per second of simulated time.

use std::f32::consts::PI;

use glam::Vec2;

use crate::renderer::BlendMode;

/// Texture every built-in profile draws with
pub const PARTICLE_TEXTURE: &str = "particle";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParticleKind {
    ArrowTrail,
    ArrowImpact,
    PlayerDash,
    PlayerDeath,
    Explosion,
    Powerup,
    Environmental,
}

impl ParticleKind {
    pub const ALL: [ParticleKind; 7] = [
        ParticleKind::ArrowTrail,
        ParticleKind::ArrowImpact,
        ParticleKind::PlayerDash,
        ParticleKind::PlayerDeath,
        ParticleKind::Explosion,
        ParticleKind::Powerup,
        ParticleKind::Environmental,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ParticleKind::ArrowTrail => "arrow-trail",
            ParticleKind::ArrowImpact => "arrow-impact",
            ParticleKind::PlayerDash => "player-dash",
            ParticleKind::PlayerDeath => "player-death",
            ParticleKind::Explosion => "explosion",
            ParticleKind::Powerup => "powerup",
            ParticleKind::Environmental => "environmental",
        }
    }
}

/// Base values and symmetric variances sampled per particle
#[derive(Debug, Clone, PartialEq)]
pub struct ParticleConfig {
    /// Seconds
    pub lifetime: f32,
    pub speed: f32,
    pub speed_variance: f32,
    pub scale: f32,
    pub scale_variance: f32,
    pub alpha: f32,
    pub alpha_variance: f32,
    /// 0xRRGGBB
    pub color: u32,
    /// Per-channel spread, 0xRRGGBB
    pub color_variance: u32,
    pub rotation: f32,
    pub rotation_variance: f32,
    pub gravity: Vec2,
    pub fade_out: bool,
    pub shrink: bool,
    pub blend: BlendMode,
    pub texture: String,
}

impl ParticleConfig {
    pub fn preset(kind: ParticleKind) -> Self {
        let base = Self {
            lifetime: 1.0,
            speed: 1.0,
            speed_variance: 0.0,
            scale: 1.0,
            scale_variance: 0.0,
            alpha: 1.0,
            alpha_variance: 0.0,
            color: 0xffffff,
            color_variance: 0,
            rotation: 0.0,
            rotation_variance: PI * 2.0,
            gravity: Vec2::ZERO,
            fade_out: true,
            shrink: true,
            blend: BlendMode::Normal,
            texture: PARTICLE_TEXTURE.to_owned(),
        };
        match kind {
            ParticleKind::ArrowTrail => Self {
                lifetime: 0.5,
                speed: 0.5,
                speed_variance: 0.3,
                scale: 0.5,
                scale_variance: 0.2,
                alpha: 0.7,
                alpha_variance: 0.2,
                color: 0xffcc00,
                color_variance: 0x222222,
                blend: BlendMode::Add,
                ..base
            },
            ParticleKind::ArrowImpact => Self {
                lifetime: 0.7,
                speed: 2.0,
                speed_variance: 1.0,
                scale: 0.7,
                scale_variance: 0.3,
                alpha: 0.8,
                alpha_variance: 0.2,
                color: 0xffffff,
                color_variance: 0x333333,
                gravity: Vec2::new(0.0, 0.5),
                ..base
            },
            ParticleKind::PlayerDash => Self {
                lifetime: 0.4,
                speed: 1.0,
                speed_variance: 0.5,
                scale: 0.6,
                scale_variance: 0.2,
                alpha: 0.6,
                alpha_variance: 0.2,
                color: 0x4caf50,
                color_variance: 0x111111,
                rotation_variance: PI / 4.0,
                blend: BlendMode::Add,
                ..base
            },
            ParticleKind::PlayerDeath => Self {
                lifetime: 1.5,
                speed: 3.0,
                speed_variance: 1.5,
                scale: 1.0,
                scale_variance: 0.5,
                alpha: 0.9,
                alpha_variance: 0.1,
                color: 0xff5252,
                color_variance: 0x222222,
                gravity: Vec2::new(0.0, 1.0),
                ..base
            },
            ParticleKind::Explosion => Self {
                lifetime: 1.2,
                speed: 5.0,
                speed_variance: 2.0,
                scale: 1.2,
                scale_variance: 0.6,
                alpha: 0.9,
                alpha_variance: 0.1,
                color: 0xff9500,
                color_variance: 0x333333,
                // upward drift
                gravity: Vec2::new(0.0, -1.0),
                blend: BlendMode::Add,
                ..base
            },
            ParticleKind::Powerup => Self {
                lifetime: 1.0,
                speed: 0.5,
                speed_variance: 0.3,
                scale: 0.5,
                scale_variance: 0.2,
                alpha: 0.8,
                alpha_variance: 0.2,
                color: 0x00bcd4,
                color_variance: 0x111111,
                rotation_variance: PI / 2.0,
                gravity: Vec2::new(0.0, -0.2),
                shrink: false,
                blend: BlendMode::Add,
                ..base
            },
            ParticleKind::Environmental => Self {
                lifetime: 3.0,
                speed: 0.3,
                speed_variance: 0.2,
                scale: 0.4,
                scale_variance: 0.2,
                alpha: 0.5,
                alpha_variance: 0.3,
                color: 0xcccccc,
                color_variance: 0x222222,
                gravity: Vec2::new(0.1, 0.05),
                shrink: false,
                ..base
            },
        }
    }
}

/// `color` with each channel shifted by `offsets[c] ∈ [-1, 1]` times that
/// channel's variance, clamped to 0..=255
pub fn vary_color(color: u32, variance: u32, offsets: [f32; 3]) -> u32 {
    let mut out = 0;
    for (i, shift) in [16u32, 8, 0].into_iter().enumerate() {
        let base = ((color >> shift) & 0xff) as f32;
        let spread = ((variance >> shift) & 0xff) as f32;
        let channel = (base + offsets[i] * spread).round().clamp(0.0, 255.0) as u32;
        out |= channel << shift;
    }
    out
}

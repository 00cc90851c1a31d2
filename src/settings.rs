//! Game settings and tuning
//!
//! Loaded from JSON; every section has defaults so partial documents work.
//! Persisted in LocalStorage on the web build.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::consts::*;
use crate::error::ConfigError;

/// Quality preset levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum QualityPreset {
    Low,
    #[default]
    Medium,
    High,
}

impl QualityPreset {
    pub fn as_str(&self) -> &'static str {
        match self {
            QualityPreset::Low => "Low",
            QualityPreset::Medium => "Medium",
            QualityPreset::High => "High",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "low" => Some(QualityPreset::Low),
            "medium" | "med" => Some(QualityPreset::Medium),
            "high" => Some(QualityPreset::High),
            _ => None,
        }
    }

    /// Maximum live particles for this preset
    pub fn max_particles(&self) -> usize {
        match self {
            QualityPreset::Low => 100,
            QualityPreset::Medium => 500,
            QualityPreset::High => 2000,
        }
    }

    /// Trail density multiplier (1.0 = full)
    pub fn trail_quality(&self) -> f32 {
        match self {
            QualityPreset::Low => 0.25,
            QualityPreset::Medium => 0.6,
            QualityPreset::High => 1.0,
        }
    }
}

/// Play-field dimensions
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ArenaSettings {
    pub width: f32,
    pub height: f32,
    /// Clear colour behind the background sprite (0xRRGGBB)
    pub background_color: u32,
}

impl Default for ArenaSettings {
    fn default() -> Self {
        Self {
            width: ARENA_WIDTH,
            height: ARENA_HEIGHT,
            background_color: 0x1a1a1a,
        }
    }
}

/// Physics runner configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PhysicsSettings {
    /// World gravity (px/s²). Zero for the top-down arena.
    pub gravity: Vec2,
    /// Fixed runner step (seconds)
    pub fixed_dt: f32,
    /// Cap on fixed steps per advance
    pub max_substeps: u32,
    /// Wall-clock gaps longer than this are clamped (seconds)
    pub max_frame_delta: f32,
}

impl Default for PhysicsSettings {
    fn default() -> Self {
        Self {
            gravity: Vec2::ZERO,
            fixed_dt: PHYSICS_DT,
            max_substeps: MAX_SUBSTEPS,
            max_frame_delta: MAX_FRAME_DELTA,
        }
    }
}

/// Player movement and combat tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerTuning {
    pub radius: f32,
    /// Run speed (px/s)
    pub move_speed: f32,
    /// Velocity multiplier while dashing
    pub dash_multiplier: f32,
    /// Arrow launch speed (px/s)
    pub arrow_power: f32,
    pub max_health: f32,
    pub arrow_damage: f32,
}

impl Default for PlayerTuning {
    fn default() -> Self {
        Self {
            radius: PLAYER_RADIUS,
            move_speed: 180.0,
            dash_multiplier: 2.5,
            arrow_power: 600.0,
            max_health: 100.0,
            arrow_damage: 25.0,
        }
    }
}

/// Visual effect toggles
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EffectSettings {
    /// Particle effects (impacts, deaths, dashes)
    pub particles: bool,
    /// Arrow trail emitters
    pub arrow_trails: bool,
}

impl Default for EffectSettings {
    fn default() -> Self {
        Self {
            particles: true,
            arrow_trails: true,
        }
    }
}

/// Game settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub quality: QualityPreset,
    pub arena: ArenaSettings,
    pub physics: PhysicsSettings,
    pub player: PlayerTuning,
    pub effects: EffectSettings,
}

impl Settings {
    /// Create settings from a quality preset (applies preset defaults)
    pub fn from_preset(preset: QualityPreset) -> Self {
        let mut settings = Self::default();
        settings.apply_preset(preset);
        settings
    }

    /// Apply a quality preset (updates quality-dependent settings)
    pub fn apply_preset(&mut self, preset: QualityPreset) {
        self.quality = preset;

        // Low preset drops trails for performance
        if preset == QualityPreset::Low {
            self.effects.arrow_trails = false;
        }
    }

    /// Effective particle cap
    pub fn max_particles(&self) -> usize {
        if !self.effects.particles {
            0
        } else {
            self.quality.max_particles()
        }
    }

    /// Parse a JSON settings document
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// LocalStorage key
    #[allow(dead_code)]
    const STORAGE_KEY: &'static str = "archer_arena_settings";

    /// Load settings from LocalStorage (WASM only)
    #[cfg(target_arch = "wasm32")]
    pub fn load_stored() -> Self {
        let storage = web_sys::window()
            .and_then(|w| w.local_storage().ok())
            .flatten();

        if let Some(storage) = storage {
            if let Ok(Some(json)) = storage.get_item(Self::STORAGE_KEY) {
                match Self::from_json(&json) {
                    Ok(settings) => {
                        log::info!("Loaded settings from LocalStorage");
                        return settings;
                    }
                    Err(e) => log::warn!("Ignoring stored settings: {e}"),
                }
            }
        }

        log::info!("Using default settings");
        Self::default()
    }

    /// Save settings to LocalStorage (WASM only)
    #[cfg(target_arch = "wasm32")]
    pub fn save_stored(&self) {
        let storage = web_sys::window()
            .and_then(|w| w.local_storage().ok())
            .flatten();

        if let Some(storage) = storage {
            if let Ok(json) = self.to_json() {
                let _ = storage.set_item(Self::STORAGE_KEY, &json);
                log::info!("Settings saved");
            }
        }
    }

    /// Load settings from a JSON file
    #[cfg(not(target_arch = "wasm32"))]
    pub fn load(path: impl AsRef<std::path::Path>) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_document_keeps_defaults() {
        let settings = Settings::from_json(r#"{ "arena": { "width": 1024 } }"#).unwrap();
        assert_eq!(settings.arena.width, 1024.0);
        assert_eq!(settings.arena.height, ARENA_HEIGHT);
        assert_eq!(settings.physics.fixed_dt, PHYSICS_DT);
        assert_eq!(settings.quality, QualityPreset::Medium);
    }

    #[test]
    fn test_invalid_document_is_an_error() {
        assert!(matches!(
            Settings::from_json("{ not json"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_particle_cap_respects_toggle() {
        let mut settings = Settings::from_preset(QualityPreset::High);
        assert_eq!(settings.max_particles(), 2000);
        settings.effects.particles = false;
        assert_eq!(settings.max_particles(), 0);
    }

    #[test]
    fn test_low_preset_disables_trails() {
        let settings = Settings::from_preset(QualityPreset::Low);
        assert!(!settings.effects.arrow_trails);
        assert_eq!(QualityPreset::parse("MED"), Some(QualityPreset::Medium));
    }

    #[test]
    fn test_json_round_trip_preserves_tuning() {
        let mut settings = Settings::default();
        settings.player.arrow_power = 750.0;
        let json = settings.to_json().unwrap();
        let parsed = Settings::from_json(&json).unwrap();
        assert_eq!(parsed.player.arrow_power, 750.0);
    }
}

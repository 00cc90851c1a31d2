//! Runtime diagnostics
//!
//! An explicitly owned context; each game carries its own, so tests never
//! share counters.

use std::collections::VecDeque;

use serde::Serialize;

/// Frames averaged for the FPS readout
pub const FPS_WINDOW: usize = 60;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiagnosticsConfig {
    pub enabled: bool,
    /// Event log entries kept before the oldest are dropped
    pub log_capacity: usize,
}

impl Default for DiagnosticsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            log_capacity: 200,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Counters {
    pub frames: u64,
    pub physics_steps: u64,
    pub synced_entities: u64,
    /// Tracked entities whose physics query came back empty
    pub skipped_entities: u64,
    pub collisions: u64,
    pub entities_created: u64,
    pub entities_removed: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogEntry {
    pub frame: u64,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiagnosticsSnapshot {
    pub fps: f32,
    pub min_fps: f32,
    pub max_fps: f32,
    pub counters: Counters,
    pub events: Vec<LogEntry>,
}

#[derive(Debug, Clone, Default)]
pub struct Diagnostics {
    config: DiagnosticsConfig,
    frame_times: VecDeque<f32>,
    counters: Counters,
    events: VecDeque<LogEntry>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn configure(&mut self, config: DiagnosticsConfig) {
        self.config = config;
        while self.events.len() > self.config.log_capacity {
            self.events.pop_front();
        }
    }

    pub fn config(&self) -> &DiagnosticsConfig {
        &self.config
    }

    /// One rendered frame that took `delta` seconds
    pub fn record_frame(&mut self, delta: f32) {
        if !self.config.enabled {
            return;
        }
        self.counters.frames += 1;
        if delta > 0.0 {
            if self.frame_times.len() == FPS_WINDOW {
                self.frame_times.pop_front();
            }
            self.frame_times.push_back(delta);
        }
    }

    pub fn record_physics(&mut self, steps: u32, collisions: usize) {
        if self.config.enabled {
            self.counters.physics_steps += u64::from(steps);
            self.counters.collisions += collisions as u64;
        }
    }

    pub fn record_sync(&mut self, synced: usize, skipped: usize) {
        if self.config.enabled {
            self.counters.synced_entities += synced as u64;
            self.counters.skipped_entities += skipped as u64;
        }
    }

    pub fn record_created(&mut self) {
        if self.config.enabled {
            self.counters.entities_created += 1;
        }
    }

    pub fn record_removed(&mut self) {
        if self.config.enabled {
            self.counters.entities_removed += 1;
        }
    }

    pub fn log_event(&mut self, message: impl Into<String>) {
        if !self.config.enabled || self.config.log_capacity == 0 {
            return;
        }
        if self.events.len() == self.config.log_capacity {
            self.events.pop_front();
        }
        self.events.push_back(LogEntry {
            frame: self.counters.frames,
            message: message.into(),
        });
    }

    pub fn counters(&self) -> Counters {
        self.counters
    }

    /// Average FPS over the window, 0 before the first timed frame
    pub fn fps(&self) -> f32 {
        if self.frame_times.is_empty() {
            return 0.0;
        }
        let total: f32 = self.frame_times.iter().sum();
        self.frame_times.len() as f32 / total
    }

    pub fn snapshot(&self) -> DiagnosticsSnapshot {
        let rates = self.frame_times.iter().map(|dt| 1.0 / dt);
        DiagnosticsSnapshot {
            fps: self.fps(),
            min_fps: rates.clone().fold(f32::INFINITY, f32::min).min(self.fps()),
            max_fps: rates.fold(0.0, f32::max),
            counters: self.counters,
            events: self.events.iter().cloned().collect(),
        }
    }

    pub fn export_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&self.snapshot())
    }

    /// Zero every counter and drop the log; configuration stays
    pub fn reset(&mut self) {
        self.frame_times.clear();
        self.counters = Counters::default();
        self.events.clear();
    }
}

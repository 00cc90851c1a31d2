//! Fixed-step runner
//!
//! Converts wall-clock time into a whole number of fixed simulation steps.
//! Frame callbacks never step physics themselves; whoever owns the clock
//! calls [`Runner::advance`] and runs the returned number of steps.

use crate::settings::PhysicsSettings;

#[derive(Debug, Clone)]
pub struct Runner {
    fixed_dt: f32,
    max_substeps: u32,
    max_frame_delta: f32,
    accumulator: f32,
    running: bool,
    total_steps: u64,
}

impl Runner {
    pub fn new(settings: &PhysicsSettings) -> Self {
        Self {
            fixed_dt: settings.fixed_dt.max(f32::EPSILON),
            max_substeps: settings.max_substeps.max(1),
            max_frame_delta: settings.max_frame_delta,
            accumulator: 0.0,
            running: false,
            total_steps: 0,
        }
    }

    /// Returns `false` if already running
    pub fn start(&mut self) -> bool {
        if self.running {
            return false;
        }
        self.running = true;
        self.accumulator = 0.0;
        true
    }

    /// Returns `false` if already stopped
    pub fn stop(&mut self) -> bool {
        if !self.running {
            return false;
        }
        self.running = false;
        self.accumulator = 0.0;
        true
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn fixed_dt(&self) -> f32 {
        self.fixed_dt
    }

    pub fn total_steps(&self) -> u64 {
        self.total_steps
    }

    /// Account for `elapsed` seconds and return how many fixed steps are due.
    /// A stopped runner never steps. Long gaps are clamped and the substep
    /// cap drops any remaining backlog.
    pub fn advance(&mut self, elapsed: f32) -> u32 {
        if !self.running || !(elapsed > 0.0) {
            return 0;
        }
        self.accumulator += elapsed.min(self.max_frame_delta);

        let mut steps = 0;
        while self.accumulator >= self.fixed_dt && steps < self.max_substeps {
            self.accumulator -= self.fixed_dt;
            steps += 1;
        }
        if steps == self.max_substeps {
            // spiral of death guard
            self.accumulator = self.accumulator.min(self.fixed_dt);
        }
        self.total_steps += u64::from(steps);
        steps
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn runner() -> Runner {
        Runner::new(&PhysicsSettings::default())
    }

    #[test]
    fn test_start_is_idempotent() {
        let mut r = runner();
        assert!(r.start());
        assert!(!r.start());
        assert!(r.is_running());
        assert!(r.stop());
        assert!(!r.stop());
    }

    #[test]
    fn test_stopped_runner_never_steps() {
        let mut r = runner();
        assert_eq!(r.advance(1.0), 0);
        assert_eq!(r.total_steps(), 0);
    }

    #[test]
    fn test_accumulates_partial_frames() {
        let mut r = runner();
        r.start();
        let dt = r.fixed_dt();
        assert_eq!(r.advance(dt * 0.6), 0);
        assert_eq!(r.advance(dt * 0.6), 1);
        assert_eq!(r.advance(dt * 2.0), 2);
    }

    #[test]
    fn test_long_gap_is_clamped() {
        let mut r = runner();
        r.start();
        // 0.1 s at 60 Hz is about 6 steps, well short of 5 s worth
        let steps = r.advance(5.0);
        assert!((5..=6).contains(&steps), "{steps}");
    }

    #[test]
    fn test_substep_cap_drops_backlog() {
        let settings = PhysicsSettings {
            max_frame_delta: 10.0,
            ..PhysicsSettings::default()
        };
        let mut r = Runner::new(&settings);
        r.start();
        assert_eq!(r.advance(5.0), settings.max_substeps);
        // at most one step of backlog survives the cap
        assert!(r.advance(r.fixed_dt() * 0.5) <= 1);
    }

    #[test]
    fn test_negative_and_nan_elapsed_ignored() {
        let mut r = runner();
        r.start();
        assert_eq!(r.advance(-1.0), 0);
        assert_eq!(r.advance(f32::NAN), 0);
    }
}

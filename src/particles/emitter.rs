//! Recurring emitters

use glam::Vec2;

use super::config::ParticleKind;

/// Bursts a single advance may owe after a long frame gap
const MAX_BURSTS_PER_TICK: u32 = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EmitterId(pub u64);

#[derive(Debug, Clone)]
pub struct EmitterOptions {
    /// Seconds between bursts
    pub interval: f32,
    /// Particles per burst
    pub count: u32,
    /// Total lifetime in seconds; `None` runs until stopped
    pub duration: Option<f32>,
    pub direction: Option<Vec2>,
    pub spread: f32,
    /// Render entity whose live position becomes the origin every tick
    pub follow: Option<String>,
}

impl EmitterOptions {
    pub fn every(interval: f32, count: u32) -> Self {
        Self {
            interval,
            count,
            duration: None,
            direction: None,
            spread: std::f32::consts::FRAC_PI_4,
            follow: None,
        }
    }

    pub fn lasting(mut self, seconds: f32) -> Self {
        self.duration = Some(seconds);
        self
    }

    pub fn toward(mut self, direction: Vec2, spread: f32) -> Self {
        self.direction = Some(direction);
        self.spread = spread;
        self
    }

    pub fn following(mut self, entity: impl Into<String>) -> Self {
        self.follow = Some(entity.into());
        self
    }
}

/// Outcome of advancing an emitter's clock
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Pulse {
    Quiet,
    Burst(u32),
    Expired,
}

#[derive(Debug, Clone)]
pub(crate) struct Emitter {
    pub id: EmitterId,
    pub kind: ParticleKind,
    pub origin: Vec2,
    pub options: EmitterOptions,
    elapsed: f32,
    until_next: f32,
}

impl Emitter {
    pub fn new(id: EmitterId, kind: ParticleKind, origin: Vec2, options: EmitterOptions) -> Self {
        Self {
            id,
            kind,
            origin,
            options,
            elapsed: 0.0,
            // first burst on the first tick
            until_next: 0.0,
        }
    }

    pub fn advance(&mut self, delta: f32) -> Pulse {
        self.elapsed += delta;
        if self.options.duration.is_some_and(|d| self.elapsed >= d) {
            return Pulse::Expired;
        }
        if self.options.interval <= 0.0 {
            return Pulse::Burst(1);
        }

        self.until_next -= delta;
        let mut bursts = 0;
        while self.until_next <= 0.0 {
            bursts += 1;
            self.until_next += self.options.interval;
        }
        match bursts.min(MAX_BURSTS_PER_TICK) {
            0 => Pulse::Quiet,
            n => Pulse::Burst(n),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn emitter(options: EmitterOptions) -> Emitter {
        Emitter::new(EmitterId(1), ParticleKind::ArrowTrail, Vec2::ZERO, options)
    }

    #[test]
    fn test_fires_on_first_tick_then_every_interval() {
        let mut e = emitter(EmitterOptions::every(0.1, 2));
        assert_eq!(e.advance(0.05), Pulse::Burst(1));
        assert_eq!(e.advance(0.03), Pulse::Quiet);
        assert_eq!(e.advance(0.03), Pulse::Burst(1));
    }

    #[test]
    fn test_expires_after_duration() {
        let mut e = emitter(EmitterOptions::every(0.1, 1).lasting(0.25));
        let mut bursts = 0;
        loop {
            match e.advance(0.05) {
                Pulse::Burst(n) => bursts += n,
                Pulse::Quiet => {}
                Pulse::Expired => break,
            }
        }
        assert!((2..=4).contains(&bursts), "{bursts}");
    }

    #[test]
    fn test_long_gap_is_capped() {
        let mut e = emitter(EmitterOptions::every(0.01, 1));
        assert_eq!(e.advance(10.0), Pulse::Burst(MAX_BURSTS_PER_TICK));
    }

    #[test]
    fn test_indefinite_emitter_never_expires() {
        let mut e = emitter(EmitterOptions::every(0.5, 1));
        for _ in 0..1000 {
            assert_ne!(e.advance(0.1), Pulse::Expired);
        }
    }
}

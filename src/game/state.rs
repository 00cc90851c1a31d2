//! Shared per-player state
//!
//! Input handlers and the frame loop share one [`GameStateHandle`]. Writers
//! only get named leaf mutations; nothing hands out a reference into the map.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use glam::Vec2;
use serde::Serialize;

/// One control flag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Control {
    Up,
    Down,
    Left,
    Right,
    Dash,
    Shoot,
    Special,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Controls {
    pub up: bool,
    pub down: bool,
    pub left: bool,
    pub right: bool,
    pub dash: bool,
    pub shoot: bool,
    pub special: bool,
}

impl Controls {
    fn flag(&mut self, control: Control) -> &mut bool {
        match control {
            Control::Up => &mut self.up,
            Control::Down => &mut self.down,
            Control::Left => &mut self.left,
            Control::Right => &mut self.right,
            Control::Dash => &mut self.dash,
            Control::Shoot => &mut self.shoot,
            Control::Special => &mut self.special,
        }
    }

    pub fn get(&self, control: Control) -> bool {
        match control {
            Control::Up => self.up,
            Control::Down => self.down,
            Control::Left => self.left,
            Control::Right => self.right,
            Control::Dash => self.dash,
            Control::Shoot => self.shoot,
            Control::Special => self.special,
        }
    }

    /// Unit-length movement intent from the four direction flags
    pub fn movement(&self) -> Vec2 {
        let x = self.right as i32 - self.left as i32;
        let y = self.down as i32 - self.up as i32;
        Vec2::new(x as f32, y as f32).normalize_or_zero()
    }
}

/// Timers the frame loop keeps per player
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct ActionTimers {
    /// Seconds the bow has been drawn, `None` when not drawing
    pub draw: Option<f32>,
    /// Seconds the special has been charging
    pub charge: Option<f32>,
    pub dash_remaining: f32,
    pub dash_cooldown: f32,
    pub special_cooldown: f32,
    pub was_dashing: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlayerState {
    pub position: Vec2,
    pub velocity: Vec2,
    /// Aim angle (radians)
    pub rotation: f32,
    pub controls: Controls,
    pub health: f32,
    pub max_health: f32,
    pub alive: bool,
    /// Set once any control is written; only driven players get intents applied
    pub driven: bool,
    pub arrows_fired: u32,
    pub timers: ActionTimers,
}

impl PlayerState {
    fn new(position: Vec2, max_health: f32) -> Self {
        Self {
            position,
            velocity: Vec2::ZERO,
            rotation: 0.0,
            controls: Controls::default(),
            health: max_health,
            max_health,
            alive: true,
            driven: false,
            arrows_fired: 0,
            timers: ActionTimers::default(),
        }
    }
}

/// Result of one hit
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DamageOutcome {
    pub health: f32,
    pub died: bool,
}

#[derive(Debug, Default)]
struct GameState {
    players: BTreeMap<String, PlayerState>,
}

/// Cloneable handle to the shared game state
#[derive(Debug, Clone, Default)]
pub struct GameStateHandle {
    inner: Rc<RefCell<GameState>>,
}

impl GameStateHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn add_player(&self, id: &str, position: Vec2, max_health: f32) {
        self.inner
            .borrow_mut()
            .players
            .insert(id.to_owned(), PlayerState::new(position, max_health));
    }

    pub(crate) fn remove_player(&self, id: &str) {
        self.inner.borrow_mut().players.remove(id);
    }

    pub(crate) fn clear(&self) {
        self.inner.borrow_mut().players.clear();
    }

    /// Crate-internal mutation of one player's record
    pub(crate) fn with_player<R>(&self, id: &str, f: impl FnOnce(&mut PlayerState) -> R) -> Option<R> {
        self.inner.borrow_mut().players.get_mut(id).map(f)
    }

    /// Flip one control flag. Returns false for unknown players.
    pub fn set_control(&self, id: &str, control: Control, value: bool) -> bool {
        self.with_player(id, |p| {
            *p.controls.flag(control) = value;
            p.driven = true;
        })
        .is_some()
    }

    pub fn control(&self, id: &str, control: Control) -> Option<bool> {
        self.inner
            .borrow()
            .players
            .get(id)
            .map(|p| p.controls.get(control))
    }

    pub fn controls(&self, id: &str) -> Option<Controls> {
        self.inner.borrow().players.get(id).map(|p| p.controls)
    }

    pub fn set_aim(&self, id: &str, rotation: f32) -> bool {
        self.with_player(id, |p| p.rotation = crate::normalize_angle(rotation))
            .is_some()
    }

    /// Aim from the player's last known position toward `target`
    pub fn aim_at(&self, id: &str, target: Vec2) -> bool {
        self.with_player(id, |p| {
            if let Some(angle) = crate::heading(target - p.position) {
                p.rotation = angle;
            }
        })
        .is_some()
    }

    pub fn update_position(&self, id: &str, position: Vec2, velocity: Vec2) {
        self.with_player(id, |p| {
            p.position = position;
            p.velocity = velocity;
        });
    }

    /// Subtract `amount` health; the first hit to reach zero reports `died`
    pub fn apply_damage(&self, id: &str, amount: f32) -> Option<DamageOutcome> {
        self.with_player(id, |p| {
            if !p.alive {
                return DamageOutcome {
                    health: p.health,
                    died: false,
                };
            }
            p.health = (p.health - amount).max(0.0);
            let died = p.health <= 0.0;
            if died {
                p.alive = false;
            }
            DamageOutcome {
                health: p.health,
                died,
            }
        })
    }

    pub fn heal(&self, id: &str, amount: f32) -> Option<f32> {
        self.with_player(id, |p| {
            if p.alive {
                p.health = (p.health + amount).min(p.max_health);
            }
            p.health
        })
    }

    /// Snapshot of one player
    pub fn player(&self, id: &str) -> Option<PlayerState> {
        self.inner.borrow().players.get(id).cloned()
    }

    pub fn player_ids(&self) -> Vec<String> {
        self.inner.borrow().players.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.inner.borrow().players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state() -> GameStateHandle {
        let s = GameStateHandle::new();
        s.add_player("p1", Vec2::new(100.0, 100.0), 100.0);
        s
    }

    #[test]
    fn test_set_control_marks_player_driven() {
        let s = state();
        assert!(!s.player("p1").unwrap().driven);
        assert!(s.set_control("p1", Control::Up, true));
        assert_eq!(s.control("p1", Control::Up), Some(true));
        assert!(s.player("p1").unwrap().driven);
        assert!(!s.set_control("ghost", Control::Up, true));
    }

    #[test]
    fn test_handles_share_state() {
        let a = state();
        let b = a.clone();
        b.set_control("p1", Control::Shoot, true);
        assert_eq!(a.control("p1", Control::Shoot), Some(true));
    }

    #[test]
    fn test_movement_is_normalized() {
        let controls = Controls {
            up: true,
            right: true,
            ..Default::default()
        };
        let m = controls.movement();
        assert!((m.length() - 1.0).abs() < 1e-6);
        assert!(m.x > 0.0 && m.y < 0.0);
        let cancel = Controls {
            left: true,
            right: true,
            ..Default::default()
        };
        assert_eq!(cancel.movement(), Vec2::ZERO);
    }

    #[test]
    fn test_damage_reports_death_once() {
        let s = state();
        assert_eq!(
            s.apply_damage("p1", 60.0),
            Some(DamageOutcome {
                health: 40.0,
                died: false
            })
        );
        assert!(s.apply_damage("p1", 60.0).unwrap().died);
        assert!(!s.apply_damage("p1", 60.0).unwrap().died);
        assert_eq!(s.heal("p1", 10.0), Some(0.0));
        assert_eq!(s.apply_damage("ghost", 1.0), None);
    }

    #[test]
    fn test_aim_at_uses_last_position() {
        let s = state();
        s.aim_at("p1", Vec2::new(100.0, 200.0));
        let rot = s.player("p1").unwrap().rotation;
        assert!((rot - std::f32::consts::FRAC_PI_2).abs() < 1e-6);
    }
}

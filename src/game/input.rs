//! Raw keyboard/mouse input → control flags

use glam::Vec2;

use super::state::{Control, GameStateHandle};

/// Mouse button numbers as reported by the DOM
pub const PRIMARY_BUTTON: i16 = 0;
pub const SECONDARY_BUTTON: i16 = 2;

/// Control bound to a `KeyboardEvent.key` value, case-insensitive
pub fn key_control(key: &str) -> Option<Control> {
    match key.to_ascii_lowercase().as_str() {
        "w" | "arrowup" => Some(Control::Up),
        "s" | "arrowdown" => Some(Control::Down),
        "a" | "arrowleft" => Some(Control::Left),
        "d" | "arrowright" => Some(Control::Right),
        "shift" => Some(Control::Dash),
        _ => None,
    }
}

pub fn button_control(button: i16) -> Option<Control> {
    match button {
        PRIMARY_BUTTON => Some(Control::Shoot),
        SECONDARY_BUTTON => Some(Control::Special),
        _ => None,
    }
}

/// Translates input events for one local player
#[derive(Debug, Clone)]
pub struct InputHandler {
    player: String,
    state: GameStateHandle,
}

impl InputHandler {
    pub fn new(player: impl Into<String>, state: GameStateHandle) -> Self {
        Self {
            player: player.into(),
            state,
        }
    }

    pub fn player(&self) -> &str {
        &self.player
    }

    /// Returns true if the key is bound (the event should not propagate)
    pub fn key_down(&self, key: &str) -> bool {
        self.key(key, true)
    }

    pub fn key_up(&self, key: &str) -> bool {
        self.key(key, false)
    }

    fn key(&self, key: &str, pressed: bool) -> bool {
        match key_control(key) {
            Some(control) => self.state.set_control(&self.player, control, pressed),
            None => false,
        }
    }

    pub fn mouse_down(&self, button: i16) -> bool {
        match button_control(button) {
            Some(control) => self.state.set_control(&self.player, control, true),
            None => false,
        }
    }

    pub fn mouse_up(&self, button: i16) -> bool {
        match button_control(button) {
            Some(control) => self.state.set_control(&self.player, control, false),
            None => false,
        }
    }

    /// Pointer position in arena coordinates
    pub fn mouse_move(&self, pointer: Vec2) {
        self.state.aim_at(&self.player, pointer);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn handler() -> (InputHandler, GameStateHandle) {
        let state = GameStateHandle::new();
        state.add_player("me", Vec2::ZERO, 100.0);
        (InputHandler::new("me", state.clone()), state)
    }

    #[test]
    fn test_key_bindings() {
        assert_eq!(key_control("W"), Some(Control::Up));
        assert_eq!(key_control("ArrowLeft"), Some(Control::Left));
        assert_eq!(key_control("Shift"), Some(Control::Dash));
        assert_eq!(key_control("q"), None);
    }

    #[test]
    fn test_keys_toggle_controls() {
        let (input, state) = handler();
        assert!(input.key_down("ArrowRight"));
        assert_eq!(state.control("me", Control::Right), Some(true));
        input.key_up("d");
        assert_eq!(state.control("me", Control::Right), Some(false));
        assert!(!input.key_down("Escape"));
    }

    #[test]
    fn test_mouse_buttons_and_aim() {
        let (input, state) = handler();
        input.mouse_down(PRIMARY_BUTTON);
        input.mouse_down(SECONDARY_BUTTON);
        assert_eq!(state.control("me", Control::Shoot), Some(true));
        assert_eq!(state.control("me", Control::Special), Some(true));
        assert!(!input.mouse_down(1));
        input.mouse_move(Vec2::new(-10.0, 0.0));
        let rotation = state.player("me").unwrap().rotation;
        assert!((rotation.abs() - std::f32::consts::PI).abs() < 1e-6);
    }

    #[test]
    fn test_unknown_player_is_ignored() {
        let state = GameStateHandle::new();
        let input = InputHandler::new("nobody", state);
        assert!(!input.key_down("w"));
    }
}

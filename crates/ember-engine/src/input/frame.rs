use std::collections::HashSet;

use super::types::{DeviceId, GamepadButton, InputEvent, Key, MouseButton, TextEvent};

/// Transitions observed during one frame. Clear it once the frame is consumed.
#[derive(Debug, Default)]
pub struct InputFrame {
    /// Every event of the frame, in arrival order.
    pub events: Vec<InputEvent>,

    pub keys_pressed: HashSet<Key>,
    pub keys_released: HashSet<Key>,

    pub buttons_pressed: HashSet<MouseButton>,
    pub buttons_released: HashSet<MouseButton>,

    pub gamepad_pressed: HashSet<(DeviceId, GamepadButton)>,
    pub gamepad_released: HashSet<(DeviceId, GamepadButton)>,

    pub connected: Vec<DeviceId>,
    pub disconnected: Vec<DeviceId>,

    /// Committed text (no IME composition).
    pub text: Vec<TextEvent>,
}

impl InputFrame {
    pub fn clear(&mut self) {
        self.events.clear();
        self.keys_pressed.clear();
        self.keys_released.clear();
        self.buttons_pressed.clear();
        self.buttons_released.clear();
        self.gamepad_pressed.clear();
        self.gamepad_released.clear();
        self.connected.clear();
        self.disconnected.clear();
        self.text.clear();
    }

    pub fn push_event(&mut self, ev: InputEvent) {
        self.events.push(ev);
    }
}

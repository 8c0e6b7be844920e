use std::collections::{HashMap, HashSet};

use super::frame::InputFrame;
use super::types::{
    DeviceId, DeviceKind, GamepadButton, InputEvent, Key, KeyState, Modifiers, MouseButton,
    MouseButtonState, PointerButtonEvent, PointerMoveEvent,
};

/// Held state built from the event stream.
///
/// Transitions for the current frame go into an [`InputFrame`].
#[derive(Debug, Default)]
pub struct InputState {
    pub modifiers: Modifiers,
    pub focused: bool,

    /// Pointer position in logical pixels; `None` while outside the window.
    pub pointer_pos: Option<(f32, f32)>,

    pub keys_down: HashSet<Key>,
    pub buttons_down: HashSet<MouseButton>,

    /// Connected devices by id.
    pub devices: HashMap<DeviceId, DeviceKind>,

    /// Last reported value of every gamepad button that is not at rest.
    pub gamepad_values: HashMap<(DeviceId, GamepadButton), f32>,

    /// Gamepad buttons currently past the press threshold.
    pub gamepad_down: HashSet<(DeviceId, GamepadButton)>,
}

impl InputState {
    /// Folds `ev` into the held state and records transitions into `frame`.
    pub fn apply_event(&mut self, frame: &mut InputFrame, ev: InputEvent) {
        match &ev {
            InputEvent::ModifiersChanged(m) => self.modifiers = *m,

            InputEvent::Focused(f) => {
                self.focused = *f;
                if !*f {
                    // Releases are not delivered while unfocused.
                    self.keys_down.clear();
                    self.buttons_down.clear();
                }
            }

            InputEvent::PointerMoved(PointerMoveEvent { x, y }) => {
                self.pointer_pos = Some((*x, *y));
            }

            InputEvent::PointerLeft => self.pointer_pos = None,

            InputEvent::Key {
                key,
                state,
                modifiers,
                ..
            } => {
                self.modifiers = *modifiers;
                match state {
                    KeyState::Pressed => {
                        if self.keys_down.insert(*key) {
                            frame.keys_pressed.insert(*key);
                        }
                    }
                    KeyState::Released => {
                        if self.keys_down.remove(key) {
                            frame.keys_released.insert(*key);
                        }
                    }
                }
            }

            InputEvent::PointerButton(PointerButtonEvent {
                button,
                state,
                x,
                y,
                modifiers,
            }) => {
                self.pointer_pos = Some((*x, *y));
                self.modifiers = *modifiers;
                match state {
                    MouseButtonState::Pressed => {
                        if self.buttons_down.insert(*button) {
                            frame.buttons_pressed.insert(*button);
                        }
                    }
                    MouseButtonState::Released => {
                        if self.buttons_down.remove(button) {
                            frame.buttons_released.insert(*button);
                        }
                    }
                }
            }

            InputEvent::MouseWheel { modifiers, .. } => self.modifiers = *modifiers,

            InputEvent::Text(t) => frame.text.push(t.clone()),

            InputEvent::DeviceConnected { device, kind } => {
                self.devices.insert(*device, *kind);
                frame.connected.push(*device);
            }

            InputEvent::DeviceDisconnected { device, .. } => {
                self.devices.remove(device);
                self.gamepad_values.retain(|(id, _), _| id != device);
                self.gamepad_down.retain(|(id, _)| id != device);
                frame.disconnected.push(*device);
            }

            InputEvent::GamepadButton {
                device,
                button,
                pressed,
                value,
            } => {
                let key = (*device, *button);
                if *value > 0.0 {
                    self.gamepad_values.insert(key, *value);
                } else {
                    self.gamepad_values.remove(&key);
                }

                if *pressed {
                    if self.gamepad_down.insert(key) {
                        frame.gamepad_pressed.insert(key);
                    }
                } else if self.gamepad_down.remove(&key) {
                    frame.gamepad_released.insert(key);
                }
            }
        }

        frame.push_event(ev);
    }

    pub fn key_down(&self, key: Key) -> bool {
        self.keys_down.contains(&key)
    }

    pub fn button_down(&self, btn: MouseButton) -> bool {
        self.buttons_down.contains(&btn)
    }

    pub fn gamepad_button_down(&self, device: DeviceId, button: GamepadButton) -> bool {
        self.gamepad_down.contains(&(device, button))
    }

    /// Analog value of a gamepad button, `0.0` when at rest or unknown.
    pub fn gamepad_value(&self, device: DeviceId, button: GamepadButton) -> f32 {
        self.gamepad_values.get(&(device, button)).copied().unwrap_or(0.0)
    }

    pub fn is_connected(&self, device: DeviceId) -> bool {
        self.devices.contains_key(&device)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pad_button(pressed: bool, value: f32) -> InputEvent {
        InputEvent::GamepadButton {
            device: DeviceId(4),
            button: GamepadButton::FaceBottom,
            pressed,
            value,
        }
    }

    #[test]
    fn gamepad_press_and_release_transitions() {
        let mut state = InputState::default();
        let mut frame = InputFrame::default();
        let key = (DeviceId(4), GamepadButton::FaceBottom);

        state.apply_event(&mut frame, pad_button(true, 1.0));
        assert!(state.gamepad_button_down(key.0, key.1));
        assert!(frame.gamepad_pressed.contains(&key));

        frame.clear();
        state.apply_event(&mut frame, pad_button(true, 0.9));
        assert!(frame.gamepad_pressed.is_empty());
        assert_eq!(state.gamepad_value(key.0, key.1), 0.9);

        state.apply_event(&mut frame, pad_button(false, 0.0));
        assert!(frame.gamepad_released.contains(&key));
        assert_eq!(state.gamepad_value(key.0, key.1), 0.0);
    }

    #[test]
    fn disconnect_forgets_device_buttons() {
        let mut state = InputState::default();
        let mut frame = InputFrame::default();
        state.apply_event(
            &mut frame,
            InputEvent::DeviceConnected {
                device: DeviceId(4),
                kind: DeviceKind::Gamepad,
            },
        );
        state.apply_event(&mut frame, pad_button(true, 1.0));
        state.apply_event(
            &mut frame,
            InputEvent::DeviceDisconnected {
                device: DeviceId(4),
                kind: DeviceKind::Gamepad,
            },
        );

        assert!(!state.is_connected(DeviceId(4)));
        assert!(state.gamepad_down.is_empty());
        assert_eq!(frame.connected, vec![DeviceId(4)]);
        assert_eq!(frame.disconnected, vec![DeviceId(4)]);
    }

    #[test]
    fn focus_loss_clears_held_keys() {
        let mut state = InputState::default();
        let mut frame = InputFrame::default();
        state.apply_event(
            &mut frame,
            InputEvent::Key {
                key: Key::A,
                state: KeyState::Pressed,
                modifiers: Modifiers::default(),
                code: 0,
                repeat: false,
            },
        );
        state.apply_event(&mut frame, InputEvent::Focused(false));
        assert!(!state.key_down(Key::A));
    }
}

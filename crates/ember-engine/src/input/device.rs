use std::fmt;

use crate::coords::Vec2;

use super::cursor::CursorId;
use super::types::{DeviceId, DeviceKind, GamepadButton};

/// Native identity of an attached gamepad, as reported by the provider. Stable across
/// enumerations for as long as the pad stays attached.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct GamepadInstance(pub u64);

impl fmt::Display for GamepadInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

/// Snapshot of a gamepad's controls.
#[derive(Debug, Copy, Clone, PartialEq, Default)]
pub struct GamepadState {
    /// Button values in `[0, 1]`, indexed by [`GamepadButton::index`].
    pub buttons: [f32; GamepadButton::COUNT],
    pub left_stick: Vec2,
    pub right_stick: Vec2,
}

impl GamepadState {
    #[inline]
    pub fn value(&self, button: GamepadButton) -> f32 {
        self.buttons[button.index()]
    }

    #[inline]
    pub fn set(&mut self, button: GamepadButton, value: f32) {
        self.buttons[button.index()] = value.clamp(0.0, 1.0);
    }

    #[inline]
    pub fn with(mut self, button: GamepadButton, value: f32) -> Self {
        self.set(button, value);
        self
    }
}

/// Rumble motor selector.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Motor {
    All,
    Left,
    Right,
}

/// An attached gamepad owned by the input system.
#[derive(Debug, Clone)]
pub struct GamepadDevice {
    pub(crate) id: DeviceId,
    pub(crate) instance: GamepadInstance,
    pub(crate) name: String,
    pub(crate) state: GamepadState,
    pub(crate) player_index: Option<u32>,
    pub(crate) vibration: [f32; 2],
}

impl GamepadDevice {
    pub(crate) fn new(id: DeviceId, instance: GamepadInstance, name: String) -> Self {
        Self {
            id,
            instance,
            name,
            state: GamepadState::default(),
            player_index: None,
            vibration: [0.0; 2],
        }
    }

    #[inline]
    pub fn id(&self) -> DeviceId {
        self.id
    }

    #[inline]
    pub fn instance(&self) -> GamepadInstance {
        self.instance
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn state(&self) -> &GamepadState {
        &self.state
    }

    #[inline]
    pub fn player_index(&self) -> Option<u32> {
        self.player_index
    }

    /// Last requested speed for the left and right motors.
    #[inline]
    pub fn vibration(&self) -> [f32; 2] {
        self.vibration
    }

    pub(crate) fn set_vibration(&mut self, motor: Motor, speed: f32) {
        let speed = speed.clamp(0.0, 1.0);
        match motor {
            Motor::All => self.vibration = [speed; 2],
            Motor::Left => self.vibration[0] = speed,
            Motor::Right => self.vibration[1] = speed,
        }
    }
}

/// The system mouse: position plus the cursor state applied to the platform.
#[derive(Debug, Clone)]
pub struct MouseDevice {
    pub(crate) id: DeviceId,
    pub(crate) position: Vec2,
    pub(crate) cursor: Option<CursorId>,
    pub(crate) cursor_visible: bool,
    pub(crate) cursor_locked: bool,
}

impl MouseDevice {
    pub(crate) fn new(id: DeviceId) -> Self {
        Self {
            id,
            position: Vec2::zero(),
            cursor: None,
            cursor_visible: true,
            cursor_locked: false,
        }
    }

    #[inline]
    pub fn id(&self) -> DeviceId {
        self.id
    }

    #[inline]
    pub fn position(&self) -> Vec2 {
        self.position
    }

    /// Cursor currently shown over the window; `None` is the platform default.
    #[inline]
    pub fn cursor(&self) -> Option<CursorId> {
        self.cursor
    }

    #[inline]
    pub fn is_cursor_visible(&self) -> bool {
        self.cursor_visible
    }

    #[inline]
    pub fn is_cursor_locked(&self) -> bool {
        self.cursor_locked
    }
}

/// Id and kind of a device, as listed by the input system.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct DeviceInfo {
    pub id: DeviceId,
    pub kind: DeviceKind,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn button_values_are_clamped() {
        let state = GamepadState::default()
            .with(GamepadButton::LeftTrigger, 1.7)
            .with(GamepadButton::FaceBottom, -0.2);
        assert_eq!(state.value(GamepadButton::LeftTrigger), 1.0);
        assert_eq!(state.value(GamepadButton::FaceBottom), 0.0);
    }

    #[test]
    fn vibration_per_motor() {
        let mut pad = GamepadDevice::new(DeviceId(4), GamepadInstance(1), "pad".into());
        pad.set_vibration(Motor::All, 0.5);
        pad.set_vibration(Motor::Right, 2.0);
        assert_eq!(pad.vibration(), [0.5, 1.0]);
    }
}

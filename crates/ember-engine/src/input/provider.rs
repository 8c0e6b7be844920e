use std::fmt;

use crate::coords::Vec2;

use super::cursor::{CursorImage, SystemCursor};
use super::device::{GamepadInstance, GamepadState, Motor};

/// Failure reported by a platform provider.
#[derive(Debug, Clone, PartialEq)]
pub enum ProviderError {
    /// Device enumeration failed as a whole.
    Enumerate(String),
    /// The gamepad is no longer attached.
    Disconnected(GamepadInstance),
    /// Reading or driving an attached device failed.
    Device { instance: GamepadInstance, message: String },
    /// A cursor could not be created or applied.
    Cursor(String),
}

impl ProviderError {
    pub fn device(instance: GamepadInstance, message: impl Into<String>) -> Self {
        Self::Device {
            instance,
            message: message.into(),
        }
    }
}

impl fmt::Display for ProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderError::Enumerate(msg) => write!(f, "device enumeration failed: {msg}"),
            ProviderError::Disconnected(instance) => write!(f, "gamepad {instance} disconnected"),
            ProviderError::Device { instance, message } => write!(f, "gamepad {instance}: {message}"),
            ProviderError::Cursor(msg) => write!(f, "cursor error: {msg}"),
        }
    }
}

impl std::error::Error for ProviderError {}

/// An attached gamepad as reported by enumeration.
#[derive(Debug, Clone, PartialEq)]
pub struct GamepadDescriptor {
    pub instance: GamepadInstance,
    pub name: String,
}

impl GamepadDescriptor {
    pub fn new(instance: GamepadInstance, name: impl Into<String>) -> Self {
        Self {
            instance,
            name: name.into(),
        }
    }
}

/// OS-specific gamepad access.
pub trait GamepadProvider {
    /// Lists currently attached pads.
    fn enumerate(&mut self) -> Result<Vec<GamepadDescriptor>, ProviderError>;

    /// Polls one pad. An error removes the pad from the input system.
    fn read_state(&mut self, instance: GamepadInstance) -> Result<GamepadState, ProviderError>;

    fn set_vibration(&mut self, _instance: GamepadInstance, _motor: Motor, _speed: f32) -> Result<(), ProviderError> {
        Ok(())
    }

    fn set_player_index(&mut self, _instance: GamepadInstance, _player_index: u32) -> Result<(), ProviderError> {
        Ok(())
    }
}

/// Provider for platforms without gamepad support.
#[derive(Debug, Default, Copy, Clone)]
pub struct NoGamepads;

impl GamepadProvider for NoGamepads {
    fn enumerate(&mut self) -> Result<Vec<GamepadDescriptor>, ProviderError> {
        Ok(Vec::new())
    }

    fn read_state(&mut self, instance: GamepadInstance) -> Result<GamepadState, ProviderError> {
        Err(ProviderError::Disconnected(instance))
    }
}

/// Platform cursor theme and pointer control.
pub trait CursorProvider {
    /// Native cursor object stored in the input system's cursor table.
    type Cursor;

    fn system_cursor(&mut self, shape: SystemCursor) -> Result<Self::Cursor, ProviderError>;

    fn custom_cursor(&mut self, image: &CursorImage) -> Result<Self::Cursor, ProviderError>;

    /// Shows `cursor` (the platform default for `None`), or hides the pointer.
    fn apply(&mut self, cursor: Option<&Self::Cursor>, visible: bool);

    /// Called when the input system drops a cursor it created through this provider.
    fn release(&mut self, _cursor: Self::Cursor) {}

    /// Warps the pointer, in logical pixels.
    fn set_position(&mut self, position: Vec2) -> Result<(), ProviderError>;

    fn set_locked(&mut self, locked: bool) -> Result<(), ProviderError>;
}

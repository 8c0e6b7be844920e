//! Input subsystem.
//!
//! [`InputSystem`] owns the devices of one platform backend: it executes
//! [`InputCommand`]s (discovery, cursors, pointer control, gamepad output), polls
//! gamepads through a [`GamepadProvider`], and queues [`InputEvent`]s for the engine.
//! [`InputState`] and [`InputFrame`] fold those events into held state and per-frame
//! transitions.
//!
//! Everything outside `platform` is free of winit types.

mod command;
mod cursor;
mod device;
mod frame;
pub mod platform;
mod provider;
mod state;
mod system;
mod types;

pub use command::InputCommand;
pub use cursor::{CursorId, CursorImage, CursorSource, CursorTable, SystemCursor};
pub use device::{DeviceInfo, GamepadDevice, GamepadInstance, GamepadState, Motor, MouseDevice};
pub use frame::InputFrame;
pub use provider::{CursorProvider, GamepadDescriptor, GamepadProvider, NoGamepads, ProviderError};
pub use state::InputState;
pub use system::{InputConfig, InputSystem};
pub use types::{
    DeviceId, DeviceKind, GamepadButton, InputEvent, Key, KeyState, Modifiers, MouseButton,
    MouseButtonState, MouseWheelDelta, PointerButtonEvent, PointerMoveEvent, TextEvent,
};

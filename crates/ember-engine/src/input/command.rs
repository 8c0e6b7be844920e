use crate::coords::Vec2;

use super::cursor::{CursorId, CursorSource};
use super::device::Motor;
use super::types::DeviceId;

/// Command sent from engine logic to the platform input backend.
///
/// Device-addressed commands naming an unknown device, or a device of the wrong kind,
/// are dropped.
#[derive(Debug, Clone, PartialEq)]
pub enum InputCommand {
    StartDeviceDiscovery,
    StopDeviceDiscovery,
    SetPlayerIndex { device: DeviceId, player_index: u32 },
    SetVibration { device: DeviceId, motor: Motor, speed: f32 },
    /// Warps the mouse pointer, in logical pixels.
    SetPosition { device: DeviceId, position: Vec2 },
    /// Creates (or replaces) the cursor stored under `cursor`.
    InitCursor { cursor: CursorId, source: CursorSource },
    DestroyCursor { cursor: CursorId },
    /// `None` restores the platform default cursor.
    SetCursor { device: DeviceId, cursor: Option<CursorId> },
    SetCursorVisible { device: DeviceId, visible: bool },
    SetCursorLocked { device: DeviceId, locked: bool },
}

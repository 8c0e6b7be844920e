use anyhow::{Context, Result};

use crate::coords::Vec2;

use super::command::InputCommand;
use super::cursor::{CursorSource, CursorTable};
use super::device::{DeviceInfo, GamepadDevice, GamepadState, MouseDevice};
use super::provider::{CursorProvider, GamepadDescriptor, GamepadProvider};
use super::types::{DeviceId, DeviceKind, GamepadButton, InputEvent, PointerMoveEvent};

/// Input system configuration.
#[derive(Debug, Clone)]
pub struct InputConfig {
    /// Start in the discovering state (poll for new gamepads every update).
    pub discovery_on_start: bool,
    /// Button value above which a gamepad button counts as pressed.
    pub gamepad_press_threshold: f32,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            discovery_on_start: false,
            gamepad_press_threshold: 0.5,
        }
    }
}

/// Owns the input devices of one platform backend and executes [`InputCommand`]s
/// against them.
///
/// Keyboard, mouse and touchpad exist from construction. Gamepads are found by
/// enumeration at construction and, while discovery is on, on every [`InputSystem::update`].
/// Device ids are handed out in increasing order and never reused.
///
/// Events (device connect/disconnect, gamepad buttons and whatever the platform posts)
/// accumulate until [`InputSystem::drain_events`].
pub struct InputSystem<G, C>
where
    C: CursorProvider,
{
    config: InputConfig,
    gamepad_provider: G,
    cursor_provider: C,

    last_device_id: u32,
    keyboard: DeviceId,
    mouse: MouseDevice,
    touchpad: DeviceId,
    gamepads: Vec<GamepadDevice>,

    cursors: CursorTable<C::Cursor>,
    discovering: bool,
    events: Vec<InputEvent>,
}

impl<G, C> InputSystem<G, C>
where
    G: GamepadProvider,
    C: CursorProvider,
{
    /// Creates the built-in devices and connects every gamepad attached right now.
    ///
    /// Fails if the gamepad provider cannot enumerate.
    pub fn new(config: InputConfig, mut gamepad_provider: G, cursor_provider: C) -> Result<Self> {
        let attached = gamepad_provider
            .enumerate()
            .context("failed to enumerate gamepads")?;

        let mut last_device_id = 0;
        let mut next_id = || {
            last_device_id += 1;
            DeviceId(last_device_id)
        };
        let keyboard = next_id();
        let mouse = next_id();
        let touchpad = next_id();

        let mut system = Self {
            discovering: config.discovery_on_start,
            config,
            gamepad_provider,
            cursor_provider,
            last_device_id,
            keyboard,
            mouse: MouseDevice::new(mouse),
            touchpad,
            gamepads: Vec::new(),
            cursors: CursorTable::new(),
            events: Vec::new(),
        };

        for (device, kind) in [
            (keyboard, DeviceKind::Keyboard),
            (mouse, DeviceKind::Mouse),
            (touchpad, DeviceKind::Touchpad),
        ] {
            system.events.push(InputEvent::DeviceConnected { device, kind });
        }
        for descriptor in attached {
            system.connect_gamepad(descriptor);
        }

        Ok(system)
    }

    // ── queries ───────────────────────────────────────────────────────────

    #[inline]
    pub fn config(&self) -> &InputConfig {
        &self.config
    }

    #[inline]
    pub fn is_discovering(&self) -> bool {
        self.discovering
    }

    #[inline]
    pub fn keyboard(&self) -> DeviceId {
        self.keyboard
    }

    #[inline]
    pub fn mouse(&self) -> &MouseDevice {
        &self.mouse
    }

    #[inline]
    pub fn touchpad(&self) -> DeviceId {
        self.touchpad
    }

    #[inline]
    pub fn gamepads(&self) -> &[GamepadDevice] {
        &self.gamepads
    }

    pub fn gamepad(&self, id: DeviceId) -> Option<&GamepadDevice> {
        self.gamepads.iter().find(|pad| pad.id == id)
    }

    /// Kind of a live device, `None` for unknown or disconnected ids.
    pub fn device_kind(&self, id: DeviceId) -> Option<DeviceKind> {
        if id == self.keyboard {
            Some(DeviceKind::Keyboard)
        } else if id == self.mouse.id {
            Some(DeviceKind::Mouse)
        } else if id == self.touchpad {
            Some(DeviceKind::Touchpad)
        } else {
            self.gamepad(id).map(|_| DeviceKind::Gamepad)
        }
    }

    /// All live devices, built-ins first.
    pub fn devices(&self) -> impl Iterator<Item = DeviceInfo> + '_ {
        [
            DeviceInfo { id: self.keyboard, kind: DeviceKind::Keyboard },
            DeviceInfo { id: self.mouse.id, kind: DeviceKind::Mouse },
            DeviceInfo { id: self.touchpad, kind: DeviceKind::Touchpad },
        ]
        .into_iter()
        .chain(self.gamepads.iter().map(|pad| DeviceInfo {
            id: pad.id,
            kind: DeviceKind::Gamepad,
        }))
    }

    #[inline]
    pub fn cursors(&self) -> &CursorTable<C::Cursor> {
        &self.cursors
    }

    #[inline]
    pub fn gamepad_provider_mut(&mut self) -> &mut G {
        &mut self.gamepad_provider
    }

    #[inline]
    pub fn cursor_provider(&self) -> &C {
        &self.cursor_provider
    }

    #[inline]
    pub fn cursor_provider_mut(&mut self) -> &mut C {
        &mut self.cursor_provider
    }

    // ── events ────────────────────────────────────────────────────────────

    /// Queues an event produced by the platform layer (keyboard, pointer, text).
    pub fn post_event(&mut self, event: InputEvent) {
        if let InputEvent::PointerMoved(PointerMoveEvent { x, y }) = event {
            self.mouse.position = Vec2::new(x, y);
        }
        self.events.push(event);
    }

    /// Hands out all queued events in arrival order.
    pub fn drain_events(&mut self) -> std::vec::Drain<'_, InputEvent> {
        self.events.drain(..)
    }

    // ── commands ──────────────────────────────────────────────────────────

    pub fn execute_command(&mut self, command: &InputCommand) {
        match command {
            InputCommand::StartDeviceDiscovery => {
                if !self.discovering {
                    log::debug!("input: device discovery started");
                }
                self.discovering = true;
            }

            InputCommand::StopDeviceDiscovery => {
                if self.discovering {
                    log::debug!("input: device discovery stopped");
                }
                self.discovering = false;
            }

            InputCommand::SetPlayerIndex { device, player_index } => {
                let Some(pad) = self.gamepads.iter_mut().find(|pad| pad.id == *device) else {
                    log::trace!("input: player index for non-gamepad {device} dropped");
                    return;
                };
                if let Err(err) = self.gamepad_provider.set_player_index(pad.instance, *player_index) {
                    log::warn!("input: failed to set player index on {device}: {err}");
                }
                pad.player_index = Some(*player_index);
            }

            InputCommand::SetVibration { device, motor, speed } => {
                let Some(pad) = self.gamepads.iter_mut().find(|pad| pad.id == *device) else {
                    log::trace!("input: vibration for non-gamepad {device} dropped");
                    return;
                };
                if let Err(err) = self.gamepad_provider.set_vibration(pad.instance, *motor, *speed) {
                    log::warn!("input: failed to set vibration on {device}: {err}");
                }
                pad.set_vibration(*motor, *speed);
            }

            InputCommand::SetPosition { device, position } => {
                if !self.is_mouse(*device) {
                    return;
                }
                match self.cursor_provider.set_position(*position) {
                    Ok(()) => self.mouse.position = *position,
                    Err(err) => log::warn!("input: failed to move pointer: {err}"),
                }
            }

            InputCommand::InitCursor { cursor, source } => {
                let built = match source {
                    CursorSource::System(shape) => self.cursor_provider.system_cursor(*shape),
                    CursorSource::Image(image) => self.cursor_provider.custom_cursor(image),
                };
                let replaced = match built {
                    Ok(native) => self.cursors.insert(*cursor, native),
                    Err(err) => {
                        log::warn!("input: failed to create {cursor}: {err}");
                        self.cursors.reserve_slot(*cursor);
                        self.cursors.remove(*cursor)
                    }
                };
                if let Some(old) = replaced {
                    self.cursor_provider.release(old);
                }
                if self.mouse.cursor == Some(*cursor) {
                    self.update_cursor();
                }
            }

            InputCommand::DestroyCursor { cursor } => {
                // Detach before releasing so the platform never shows a dead cursor.
                if self.mouse.cursor == Some(*cursor) {
                    self.mouse.cursor = None;
                    self.update_cursor();
                }
                if let Some(native) = self.cursors.remove(*cursor) {
                    self.cursor_provider.release(native);
                }
            }

            InputCommand::SetCursor { device, cursor } => {
                if !self.is_mouse(*device) {
                    return;
                }
                self.mouse.cursor = *cursor;
                self.update_cursor();
            }

            InputCommand::SetCursorVisible { device, visible } => {
                if !self.is_mouse(*device) {
                    return;
                }
                self.mouse.cursor_visible = *visible;
                self.update_cursor();
            }

            InputCommand::SetCursorLocked { device, locked } => {
                if !self.is_mouse(*device) {
                    return;
                }
                match self.cursor_provider.set_locked(*locked) {
                    Ok(()) => self.mouse.cursor_locked = *locked,
                    Err(err) => log::warn!("input: failed to change pointer lock: {err}"),
                }
            }
        }
    }

    // ── polling ───────────────────────────────────────────────────────────

    /// Polls every gamepad, then (while discovering) looks for new ones.
    ///
    /// A pad whose read fails is removed and reported as disconnected; the others are
    /// unaffected. Enumeration failures are logged and retried next tick.
    pub fn update(&mut self) {
        let threshold = self.config.gamepad_press_threshold;
        let Self {
            gamepads,
            gamepad_provider,
            events,
            ..
        } = self;

        gamepads.retain_mut(|pad| match gamepad_provider.read_state(pad.instance) {
            Ok(state) => {
                push_button_changes(pad, &state, threshold, events);
                pad.state = state;
                true
            }
            Err(err) => {
                log::warn!("input: removing gamepad {} ({}): {err}", pad.id, pad.name);
                events.push(InputEvent::DeviceDisconnected {
                    device: pad.id,
                    kind: DeviceKind::Gamepad,
                });
                false
            }
        });

        if self.discovering {
            self.discover();
        }
    }

    fn discover(&mut self) {
        let attached = match self.gamepad_provider.enumerate() {
            Ok(attached) => attached,
            Err(err) => {
                log::warn!("input: gamepad discovery failed: {err}");
                return;
            }
        };

        for descriptor in attached {
            let known = self
                .gamepads
                .iter()
                .any(|pad| pad.instance == descriptor.instance);
            if !known {
                self.connect_gamepad(descriptor);
            }
        }
    }

    fn connect_gamepad(&mut self, descriptor: GamepadDescriptor) -> DeviceId {
        self.last_device_id += 1;
        let id = DeviceId(self.last_device_id);

        log::info!("input: gamepad connected: {} as {id}", descriptor.name);
        self.gamepads
            .push(GamepadDevice::new(id, descriptor.instance, descriptor.name));
        self.events.push(InputEvent::DeviceConnected {
            device: id,
            kind: DeviceKind::Gamepad,
        });
        id
    }

    fn is_mouse(&self, device: DeviceId) -> bool {
        let is_mouse = device == self.mouse.id;
        if !is_mouse {
            log::trace!("input: pointer command for {device} dropped");
        }
        is_mouse
    }

    fn update_cursor(&mut self) {
        let cursor = self.mouse.cursor.and_then(|id| self.cursors.get(id));
        self.cursor_provider.apply(cursor, self.mouse.cursor_visible);
    }
}

fn push_button_changes(pad: &GamepadDevice, next: &GamepadState, threshold: f32, events: &mut Vec<InputEvent>) {
    for button in GamepadButton::ALL {
        let value = next.value(button);
        if value != pad.state.value(button) {
            events.push(InputEvent::GamepadButton {
                device: pad.id,
                button,
                pressed: value > threshold,
                value,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::{HashMap, HashSet};

    use super::*;
    use crate::input::cursor::{CursorId, CursorImage, SystemCursor};
    use crate::input::device::GamepadInstance;
    use crate::input::provider::ProviderError;

    #[derive(Default)]
    struct MockPads {
        attached: Vec<GamepadDescriptor>,
        states: HashMap<u64, GamepadState>,
        failing: HashSet<u64>,
        fail_enumerate: bool,
        enumerate_calls: usize,
    }

    impl MockPads {
        fn with_pads(instances: &[u64]) -> Self {
            Self {
                attached: instances
                    .iter()
                    .map(|&i| GamepadDescriptor::new(GamepadInstance(i), format!("pad {i}")))
                    .collect(),
                ..Default::default()
            }
        }
    }

    impl GamepadProvider for MockPads {
        fn enumerate(&mut self) -> Result<Vec<GamepadDescriptor>, ProviderError> {
            self.enumerate_calls += 1;
            if self.fail_enumerate {
                return Err(ProviderError::Enumerate("bus offline".into()));
            }
            Ok(self.attached.clone())
        }

        fn read_state(&mut self, instance: GamepadInstance) -> Result<GamepadState, ProviderError> {
            if self.failing.contains(&instance.0) {
                return Err(ProviderError::device(instance, "read failed"));
            }
            Ok(self.states.get(&instance.0).copied().unwrap_or_default())
        }
    }

    #[derive(Default)]
    struct MockCursors {
        applied: Vec<(Option<String>, bool)>,
        released: Vec<String>,
        locked: bool,
    }

    impl CursorProvider for MockCursors {
        type Cursor = String;

        fn system_cursor(&mut self, shape: SystemCursor) -> Result<String, ProviderError> {
            Ok(format!("{shape:?}"))
        }

        fn custom_cursor(&mut self, image: &CursorImage) -> Result<String, ProviderError> {
            if image.data.is_empty() {
                return Err(ProviderError::Cursor("empty image".into()));
            }
            Ok(format!("image {}x{}", image.size.width, image.size.height))
        }

        fn apply(&mut self, cursor: Option<&String>, visible: bool) {
            self.applied.push((cursor.cloned(), visible));
        }

        fn release(&mut self, cursor: String) {
            self.released.push(cursor);
        }

        fn set_position(&mut self, _position: Vec2) -> Result<(), ProviderError> {
            Ok(())
        }

        fn set_locked(&mut self, locked: bool) -> Result<(), ProviderError> {
            self.locked = locked;
            Ok(())
        }
    }

    type TestSystem = InputSystem<MockPads, MockCursors>;

    fn system(pads: MockPads) -> TestSystem {
        InputSystem::new(InputConfig::default(), pads, MockCursors::default()).unwrap()
    }

    fn cursor(raw: u32) -> CursorId {
        CursorId::from_raw(raw).unwrap()
    }

    fn arrow(raw: u32) -> InputCommand {
        InputCommand::InitCursor {
            cursor: cursor(raw),
            source: CursorSource::System(SystemCursor::Arrow),
        }
    }

    #[test]
    fn builtin_devices_get_first_ids() {
        let mut sys = system(MockPads::with_pads(&[10]));
        assert_eq!(sys.keyboard().get(), 1);
        assert_eq!(sys.mouse().id().get(), 2);
        assert_eq!(sys.touchpad().get(), 3);
        assert_eq!(sys.gamepads()[0].id().get(), 4);

        let connected = sys
            .drain_events()
            .filter(|e| matches!(e, InputEvent::DeviceConnected { .. }))
            .count();
        assert_eq!(connected, 4);
    }

    #[test]
    fn enumeration_failure_at_startup_is_fatal() {
        let pads = MockPads {
            fail_enumerate: true,
            ..Default::default()
        };
        assert!(InputSystem::new(InputConfig::default(), pads, MockCursors::default()).is_err());
    }

    #[test]
    fn start_discovery_is_idempotent() {
        let mut sys = system(MockPads::default());
        sys.execute_command(&InputCommand::StartDeviceDiscovery);
        sys.execute_command(&InputCommand::StartDeviceDiscovery);
        assert!(sys.is_discovering());

        sys.gamepad_provider_mut().attached = MockPads::with_pads(&[7]).attached;
        sys.update();
        assert_eq!(sys.gamepads().len(), 1);
        assert_eq!(sys.gamepad_provider_mut().enumerate_calls, 2);

        sys.execute_command(&InputCommand::StopDeviceDiscovery);
        sys.update();
        assert_eq!(sys.gamepad_provider_mut().enumerate_calls, 2);
    }

    #[test]
    fn discovery_deduplicates_by_instance() {
        let mut sys = system(MockPads::with_pads(&[1]));
        sys.execute_command(&InputCommand::StartDeviceDiscovery);

        let provider = sys.gamepad_provider_mut();
        provider.attached = MockPads::with_pads(&[1, 2, 2]).attached;
        sys.update();
        sys.update();

        let ids: Vec<_> = sys.gamepads().iter().map(|p| (p.instance().0, p.id().get())).collect();
        assert_eq!(ids, vec![(1, 4), (2, 5)]);
    }

    #[test]
    fn one_failing_pad_is_removed_alone() {
        let mut sys = system(MockPads::with_pads(&[1, 2, 3]));
        sys.drain_events().for_each(drop);

        let pressed = GamepadState::default().with(GamepadButton::FaceBottom, 1.0);
        let provider = sys.gamepad_provider_mut();
        provider.failing.insert(2);
        provider.states.insert(1, pressed);
        provider.states.insert(3, pressed);
        sys.update();

        let remaining: Vec<_> = sys.gamepads().iter().map(|p| p.id().get()).collect();
        assert_eq!(remaining, vec![4, 6]);
        for pad in sys.gamepads() {
            assert_eq!(pad.state().value(GamepadButton::FaceBottom), 1.0);
        }

        let events: Vec<_> = sys.drain_events().collect();
        assert!(events.contains(&InputEvent::DeviceDisconnected {
            device: DeviceId(5),
            kind: DeviceKind::Gamepad,
        }));
        assert_eq!(sys.device_kind(DeviceId(5)), None);
    }

    #[test]
    fn reattached_pad_gets_fresh_id() {
        let mut sys = system(MockPads::with_pads(&[1]));
        sys.gamepad_provider_mut().failing.insert(1);
        sys.update();
        assert!(sys.gamepads().is_empty());

        sys.gamepad_provider_mut().failing.clear();
        sys.execute_command(&InputCommand::StartDeviceDiscovery);
        sys.update();
        assert_eq!(sys.gamepads()[0].id().get(), 5);
    }

    #[test]
    fn enumeration_failure_during_update_is_not_fatal() {
        let mut sys = system(MockPads::with_pads(&[1]));
        sys.execute_command(&InputCommand::StartDeviceDiscovery);
        sys.gamepad_provider_mut().fail_enumerate = true;
        sys.update();
        assert_eq!(sys.gamepads().len(), 1);
    }

    #[test]
    fn button_events_apply_threshold() {
        let mut sys = system(MockPads::with_pads(&[1]));
        sys.drain_events().for_each(drop);

        let half = GamepadState::default()
            .with(GamepadButton::LeftTrigger, 0.3)
            .with(GamepadButton::Start, 1.0);
        sys.gamepad_provider_mut().states.insert(1, half);
        sys.update();
        sys.update();

        let events: Vec<_> = sys.drain_events().collect();
        assert_eq!(
            events,
            vec![
                InputEvent::GamepadButton {
                    device: DeviceId(4),
                    button: GamepadButton::LeftTrigger,
                    pressed: false,
                    value: 0.3,
                },
                InputEvent::GamepadButton {
                    device: DeviceId(4),
                    button: GamepadButton::Start,
                    pressed: true,
                    value: 1.0,
                },
            ]
        );
    }

    #[test]
    fn init_cursor_grows_table_to_handle() {
        let mut sys = system(MockPads::default());
        sys.execute_command(&arrow(5));
        assert!(sys.cursors().len() >= 5);
        assert!(sys.cursors().get(cursor(3)).is_none());
        assert_eq!(sys.cursors().get(cursor(5)).map(String::as_str), Some("Arrow"));
    }

    #[test]
    fn failed_custom_cursor_leaves_empty_slot() {
        let mut sys = system(MockPads::default());
        sys.execute_command(&InputCommand::InitCursor {
            cursor: cursor(2),
            source: CursorSource::Image(CursorImage {
                data: Vec::new(),
                size: Default::default(),
                pixel_format: Default::default(),
                hot_spot: Vec2::zero(),
            }),
        });
        assert_eq!(sys.cursors().len(), 2);
        assert!(sys.cursors().get(cursor(2)).is_none());
    }

    #[test]
    fn destroying_active_cursor_detaches_it_first() {
        let mut sys = system(MockPads::default());
        let mouse = sys.mouse().id();
        sys.execute_command(&arrow(1));
        sys.execute_command(&InputCommand::SetCursor {
            device: mouse,
            cursor: Some(cursor(1)),
        });
        assert_eq!(sys.cursor_provider().applied.last(), Some(&(Some("Arrow".to_owned()), true)));

        sys.execute_command(&InputCommand::DestroyCursor { cursor: cursor(1) });
        assert_eq!(sys.mouse().cursor(), None);
        assert_eq!(sys.cursor_provider().applied.last(), Some(&(None, true)));
        assert!(sys.cursors().get(cursor(1)).is_none());
        assert_eq!(sys.cursor_provider().released, ["Arrow"]);
    }

    #[test]
    fn replaced_cursors_are_released() {
        let mut sys = system(MockPads::default());
        sys.execute_command(&arrow(1));
        sys.execute_command(&InputCommand::InitCursor {
            cursor: cursor(1),
            source: CursorSource::System(SystemCursor::Hand),
        });
        assert_eq!(sys.cursor_provider().released, ["Arrow"]);

        // A failed re-init empties the slot and still frees what was there.
        sys.execute_command(&InputCommand::InitCursor {
            cursor: cursor(1),
            source: CursorSource::Image(CursorImage {
                data: Vec::new(),
                size: Default::default(),
                pixel_format: Default::default(),
                hot_spot: Vec2::zero(),
            }),
        });
        assert!(sys.cursors().get(cursor(1)).is_none());
        assert_eq!(sys.cursor_provider().released, ["Arrow", "Hand"]);
    }

    #[test]
    fn destroying_inactive_cursor_does_not_reapply() {
        let mut sys = system(MockPads::default());
        sys.execute_command(&arrow(1));
        sys.execute_command(&InputCommand::DestroyCursor { cursor: cursor(1) });
        assert!(sys.cursor_provider().applied.is_empty());
    }

    #[test]
    fn pointer_commands_only_reach_the_mouse() {
        let mut sys = system(MockPads::default());
        let keyboard = sys.keyboard();
        sys.execute_command(&arrow(1));

        for device in [keyboard, DeviceId(99)] {
            sys.execute_command(&InputCommand::SetCursor {
                device,
                cursor: Some(cursor(1)),
            });
            sys.execute_command(&InputCommand::SetCursorLocked { device, locked: true });
        }
        assert!(sys.cursor_provider().applied.is_empty());
        assert!(!sys.mouse().is_cursor_locked());

        let mouse = sys.mouse().id();
        sys.execute_command(&InputCommand::SetCursorVisible { device: mouse, visible: false });
        sys.execute_command(&InputCommand::SetCursorLocked { device: mouse, locked: true });
        assert_eq!(sys.cursor_provider().applied.last(), Some(&(None, false)));
        assert!(sys.mouse().is_cursor_locked());
        assert!(sys.cursor_provider().locked);
    }

    #[test]
    fn gamepad_commands_update_device() {
        let mut sys = system(MockPads::with_pads(&[1]));
        let pad = sys.gamepads()[0].id();
        sys.execute_command(&InputCommand::SetPlayerIndex { device: pad, player_index: 2 });
        sys.execute_command(&InputCommand::SetVibration {
            device: pad,
            motor: crate::input::device::Motor::Left,
            speed: 0.75,
        });
        // Unknown device: dropped.
        sys.execute_command(&InputCommand::SetPlayerIndex {
            device: DeviceId(42),
            player_index: 1,
        });

        let pad = sys.gamepad(pad).unwrap();
        assert_eq!(pad.player_index(), Some(2));
        assert_eq!(pad.vibration(), [0.75, 0.0]);
    }

    #[test]
    fn posted_pointer_moves_track_mouse() {
        let mut sys = system(MockPads::default());
        sys.drain_events().for_each(drop);
        sys.post_event(InputEvent::PointerMoved(PointerMoveEvent { x: 3.0, y: 4.0 }));
        assert_eq!(sys.mouse().position(), Vec2::new(3.0, 4.0));
        assert_eq!(sys.drain_events().count(), 1);
    }
}

use std::collections::HashMap;
use std::sync::Arc;

use winit::dpi::{LogicalPosition, PhysicalPosition};
use winit::event::{ElementState, MouseButton as WinitMouseButton, MouseScrollDelta, WindowEvent};
use winit::event_loop::ActiveEventLoop;
use winit::keyboard::{KeyCode, ModifiersState, PhysicalKey};
use winit::window::{CursorGrabMode, CursorIcon, CustomCursor, CustomCursorSource, Window};

use crate::coords::Vec2;
use crate::graphics::PixelFormat;
use crate::input::{
    CursorImage, CursorProvider, InputEvent, InputState, Key, KeyState, Modifiers, MouseButton,
    MouseButtonState, MouseWheelDelta, PointerButtonEvent, PointerMoveEvent, ProviderError,
    SystemCursor, TextEvent,
};

/// Translates a winit `WindowEvent` into an engine `InputEvent`.
///
/// `state` supplies the modifiers and pointer position winit does not attach to every
/// event. Returns `None` for events the input layer does not model.
pub fn translate_window_event(window: &Window, state: &InputState, event: &WindowEvent) -> Option<InputEvent> {
    let ev = match event {
        WindowEvent::ModifiersChanged(m) => InputEvent::ModifiersChanged(map_modifiers(m.state())),
        WindowEvent::Focused(f) => InputEvent::Focused(*f),
        WindowEvent::CursorLeft { .. } => InputEvent::PointerLeft,

        WindowEvent::CursorMoved { position, .. } => {
            let (x, y) = to_logical(window, *position);
            InputEvent::PointerMoved(PointerMoveEvent { x, y })
        }

        WindowEvent::MouseInput { state: st, button, .. } => {
            let (x, y) = state.pointer_pos.unwrap_or((0.0, 0.0));
            InputEvent::PointerButton(PointerButtonEvent {
                button: map_mouse_button(*button),
                state: match st {
                    ElementState::Pressed => MouseButtonState::Pressed,
                    ElementState::Released => MouseButtonState::Released,
                },
                x,
                y,
                modifiers: state.modifiers,
            })
        }

        WindowEvent::MouseWheel { delta, .. } => {
            let delta = match delta {
                MouseScrollDelta::LineDelta(x, y) => MouseWheelDelta::Line { x: *x, y: *y },
                MouseScrollDelta::PixelDelta(p) => {
                    let (x, y) = to_logical(window, *p);
                    MouseWheelDelta::Pixel { x, y }
                }
            };
            InputEvent::MouseWheel {
                delta,
                modifiers: state.modifiers,
            }
        }

        WindowEvent::KeyboardInput { event, .. } => {
            let (key, code) = map_key(event.physical_key);
            InputEvent::Key {
                key,
                state: match event.state {
                    ElementState::Pressed => KeyState::Pressed,
                    ElementState::Released => KeyState::Released,
                },
                modifiers: state.modifiers,
                code,
                repeat: event.repeat,
            }
        }

        WindowEvent::Ime(winit::event::Ime::Commit(text)) if !text.is_empty() => {
            InputEvent::Text(TextEvent { text: text.clone() })
        }

        _ => return None,
    };
    Some(ev)
}

fn to_logical(window: &Window, pos: PhysicalPosition<f64>) -> (f32, f32) {
    let logical = pos.to_logical::<f64>(window.scale_factor());
    (logical.x as f32, logical.y as f32)
}

fn map_modifiers(m: ModifiersState) -> Modifiers {
    Modifiers {
        shift: m.shift_key(),
        ctrl: m.control_key(),
        alt: m.alt_key(),
        meta: m.super_key(),
    }
}

fn map_mouse_button(b: WinitMouseButton) -> MouseButton {
    match b {
        WinitMouseButton::Left => MouseButton::Left,
        WinitMouseButton::Right => MouseButton::Right,
        WinitMouseButton::Middle => MouseButton::Middle,
        WinitMouseButton::Back => MouseButton::Back,
        WinitMouseButton::Forward => MouseButton::Forward,
        WinitMouseButton::Other(v) => MouseButton::Other(v),
    }
}

const KEY_MAP: &[(KeyCode, Key)] = &[
    (KeyCode::Escape, Key::Escape),
    (KeyCode::Enter, Key::Enter),
    (KeyCode::Tab, Key::Tab),
    (KeyCode::Backspace, Key::Backspace),
    (KeyCode::Space, Key::Space),
    (KeyCode::Insert, Key::Insert),
    (KeyCode::Delete, Key::Delete),
    (KeyCode::Home, Key::Home),
    (KeyCode::End, Key::End),
    (KeyCode::PageUp, Key::PageUp),
    (KeyCode::PageDown, Key::PageDown),
    (KeyCode::ArrowUp, Key::ArrowUp),
    (KeyCode::ArrowDown, Key::ArrowDown),
    (KeyCode::ArrowLeft, Key::ArrowLeft),
    (KeyCode::ArrowRight, Key::ArrowRight),
    (KeyCode::ShiftLeft, Key::Shift),
    (KeyCode::ShiftRight, Key::Shift),
    (KeyCode::ControlLeft, Key::Control),
    (KeyCode::ControlRight, Key::Control),
    (KeyCode::AltLeft, Key::Alt),
    (KeyCode::AltRight, Key::Alt),
    (KeyCode::SuperLeft, Key::Meta),
    (KeyCode::SuperRight, Key::Meta),
    (KeyCode::KeyA, Key::A),
    (KeyCode::KeyB, Key::B),
    (KeyCode::KeyC, Key::C),
    (KeyCode::KeyD, Key::D),
    (KeyCode::KeyE, Key::E),
    (KeyCode::KeyF, Key::F),
    (KeyCode::KeyG, Key::G),
    (KeyCode::KeyH, Key::H),
    (KeyCode::KeyI, Key::I),
    (KeyCode::KeyJ, Key::J),
    (KeyCode::KeyK, Key::K),
    (KeyCode::KeyL, Key::L),
    (KeyCode::KeyM, Key::M),
    (KeyCode::KeyN, Key::N),
    (KeyCode::KeyO, Key::O),
    (KeyCode::KeyP, Key::P),
    (KeyCode::KeyQ, Key::Q),
    (KeyCode::KeyR, Key::R),
    (KeyCode::KeyS, Key::S),
    (KeyCode::KeyT, Key::T),
    (KeyCode::KeyU, Key::U),
    (KeyCode::KeyV, Key::V),
    (KeyCode::KeyW, Key::W),
    (KeyCode::KeyX, Key::X),
    (KeyCode::KeyY, Key::Y),
    (KeyCode::KeyZ, Key::Z),
    (KeyCode::Digit0, Key::Digit0),
    (KeyCode::Digit1, Key::Digit1),
    (KeyCode::Digit2, Key::Digit2),
    (KeyCode::Digit3, Key::Digit3),
    (KeyCode::Digit4, Key::Digit4),
    (KeyCode::Digit5, Key::Digit5),
    (KeyCode::Digit6, Key::Digit6),
    (KeyCode::Digit7, Key::Digit7),
    (KeyCode::Digit8, Key::Digit8),
    (KeyCode::Digit9, Key::Digit9),
    (KeyCode::F1, Key::F1),
    (KeyCode::F2, Key::F2),
    (KeyCode::F3, Key::F3),
    (KeyCode::F4, Key::F4),
    (KeyCode::F5, Key::F5),
    (KeyCode::F6, Key::F6),
    (KeyCode::F7, Key::F7),
    (KeyCode::F8, Key::F8),
    (KeyCode::F9, Key::F9),
    (KeyCode::F10, Key::F10),
    (KeyCode::F11, Key::F11),
    (KeyCode::F12, Key::F12),
];

fn map_key(pk: PhysicalKey) -> (Key, u32) {
    match pk {
        PhysicalKey::Code(code) => {
            let key = KEY_MAP
                .iter()
                .find(|(c, _)| *c == code)
                .map(|(_, k)| *k)
                .unwrap_or(Key::Unknown(code as u32));
            (key, code as u32)
        }
        PhysicalKey::Unidentified(_) => (Key::Unknown(0), 0),
    }
}

fn map_cursor_icon(shape: SystemCursor) -> CursorIcon {
    match shape {
        SystemCursor::Arrow => CursorIcon::Default,
        SystemCursor::Text => CursorIcon::Text,
        SystemCursor::Crosshair => CursorIcon::Crosshair,
        SystemCursor::Hand => CursorIcon::Pointer,
        SystemCursor::ResizeHorizontal => CursorIcon::EwResize,
        SystemCursor::ResizeVertical => CursorIcon::NsResize,
        SystemCursor::ResizeDiagonalNeSw => CursorIcon::NeswResize,
        SystemCursor::ResizeDiagonalNwSe => CursorIcon::NwseResize,
        SystemCursor::Move => CursorIcon::Move,
        SystemCursor::NotAllowed => CursorIcon::NotAllowed,
        SystemCursor::Wait => CursorIcon::Wait,
    }
}

/// Native cursor as stored by [`WinitCursorProvider`].
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum WinitCursor {
    Icon(CursorIcon),
    /// Image cursor owned by the provider, realized by
    /// [`WinitCursorProvider::realize_pending`].
    Image(u64),
}

/// Image cursors waiting for the event loop, and the ones already realized.
#[derive(Debug)]
struct ImageCursors<S, R> {
    next: u64,
    pending: Vec<(u64, S)>,
    realized: HashMap<u64, R>,
}

impl<S, R> Default for ImageCursors<S, R> {
    fn default() -> Self {
        Self {
            next: 0,
            pending: Vec::new(),
            realized: HashMap::new(),
        }
    }
}

impl<S, R> ImageCursors<S, R> {
    fn queue(&mut self, source: S) -> u64 {
        self.next += 1;
        self.pending.push((self.next, source));
        self.next
    }

    /// Realizes every queued source. Returns the tokens realized by this call.
    fn realize_with(&mut self, mut realize: impl FnMut(S) -> R) -> Vec<u64> {
        let mut done = Vec::with_capacity(self.pending.len());
        for (token, source) in self.pending.drain(..) {
            self.realized.insert(token, realize(source));
            done.push(token);
        }
        done
    }

    fn get(&self, token: u64) -> Option<&R> {
        self.realized.get(&token)
    }

    fn remove(&mut self, token: u64) {
        self.pending.retain(|(t, _)| *t != token);
        self.realized.remove(&token);
    }
}

/// [`CursorProvider`] backed by a winit window.
///
/// winit builds image cursors through the active event loop, which the input system
/// never sees. Image cursors are queued and the app calls
/// [`realize_pending`](Self::realize_pending) from its event handler; until then the
/// window shows the default icon in their place.
#[derive(Debug)]
pub struct WinitCursorProvider {
    window: Arc<Window>,
    images: ImageCursors<CustomCursorSource, CustomCursor>,
    /// Cursor last applied while visible.
    shown: Option<WinitCursor>,
}

impl WinitCursorProvider {
    pub fn new(window: Arc<Window>) -> Self {
        Self {
            window,
            images: ImageCursors::default(),
            shown: None,
        }
    }

    /// Number of image cursors still waiting for [`realize_pending`](Self::realize_pending).
    pub fn pending_images(&self) -> usize {
        self.images.pending.len()
    }

    /// Builds queued image cursors and refreshes the window if one of them is showing.
    pub fn realize_pending(&mut self, event_loop: &ActiveEventLoop) {
        let done = self.images.realize_with(|source| event_loop.create_custom_cursor(source));
        if let Some(WinitCursor::Image(token)) = self.shown {
            if done.contains(&token) {
                self.show();
            }
        }
    }

    fn show(&self) {
        match self.shown {
            Some(WinitCursor::Icon(icon)) => self.window.set_cursor(icon),
            Some(WinitCursor::Image(token)) => match self.images.get(token) {
                Some(cursor) => self.window.set_cursor(cursor.clone()),
                None => {
                    log::debug!("input: image cursor {token} not realized yet");
                    self.window.set_cursor(CursorIcon::Default);
                }
            },
            None => self.window.set_cursor(CursorIcon::Default),
        }
    }
}

impl CursorProvider for WinitCursorProvider {
    type Cursor = WinitCursor;

    fn system_cursor(&mut self, shape: SystemCursor) -> Result<WinitCursor, ProviderError> {
        Ok(WinitCursor::Icon(map_cursor_icon(shape)))
    }

    fn custom_cursor(&mut self, image: &CursorImage) -> Result<WinitCursor, ProviderError> {
        if image.pixel_format != PixelFormat::Rgba8Unorm && image.pixel_format != PixelFormat::Rgba8UnormSrgb {
            return Err(ProviderError::Cursor(format!(
                "unsupported cursor pixel format {:?}",
                image.pixel_format
            )));
        }

        let dim = |v: u32| u16::try_from(v).map_err(|_| ProviderError::Cursor(format!("cursor dimension {v} too large")));
        let width = dim(image.size.width)?;
        let height = dim(image.size.height)?;
        let hot_x = image.hot_spot.x.clamp(0.0, f32::from(width)) as u16;
        let hot_y = image.hot_spot.y.clamp(0.0, f32::from(height)) as u16;

        let source = CustomCursor::from_rgba(image.data.clone(), width, height, hot_x, hot_y)
            .map_err(|e| ProviderError::Cursor(e.to_string()))?;
        Ok(WinitCursor::Image(self.images.queue(source)))
    }

    fn apply(&mut self, cursor: Option<&WinitCursor>, visible: bool) {
        self.window.set_cursor_visible(visible);
        if visible {
            self.shown = cursor.copied();
            self.show();
        }
    }

    fn release(&mut self, cursor: WinitCursor) {
        if let WinitCursor::Image(token) = cursor {
            self.images.remove(token);
            if self.shown == Some(cursor) {
                self.shown = None;
            }
        }
    }

    fn set_position(&mut self, position: Vec2) -> Result<(), ProviderError> {
        self.window
            .set_cursor_position(LogicalPosition::new(position.x as f64, position.y as f64))
            .map_err(|e| ProviderError::Cursor(e.to_string()))
    }

    fn set_locked(&mut self, locked: bool) -> Result<(), ProviderError> {
        if !locked {
            return self
                .window
                .set_cursor_grab(CursorGrabMode::None)
                .map_err(|e| ProviderError::Cursor(e.to_string()));
        }

        // Not every platform supports Locked; Confined is the closest fallback.
        self.window
            .set_cursor_grab(CursorGrabMode::Locked)
            .or_else(|_| self.window.set_cursor_grab(CursorGrabMode::Confined))
            .map_err(|e| ProviderError::Cursor(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn queued_images_wait_for_realization() {
        let mut images: ImageCursors<&str, String> = ImageCursors::default();
        let a = images.queue("a");
        let b = images.queue("b");
        assert_ne!(a, b);
        assert!(images.get(a).is_none());

        let done = images.realize_with(|s| s.to_uppercase());
        assert_eq!(done, vec![a, b]);
        assert_eq!(images.get(b).map(String::as_str), Some("B"));
        assert!(images.realize_with(|s| s.to_owned()).is_empty());
    }

    #[test]
    fn removed_images_are_never_realized() {
        let mut images: ImageCursors<&str, String> = ImageCursors::default();
        let a = images.queue("a");
        let b = images.queue("b");
        images.remove(a);

        assert_eq!(images.realize_with(|s| s.to_owned()), vec![b]);
        assert!(images.get(a).is_none());
        images.remove(b);
        assert!(images.get(b).is_none());
    }

    #[test]
    fn system_shapes_map_to_icons() {
        assert_eq!(map_cursor_icon(SystemCursor::Hand), CursorIcon::Pointer);
        assert_eq!(map_cursor_icon(SystemCursor::Arrow), CursorIcon::Default);
    }
}

//! Ember engine runtime.
//!
//! Scene code records render work as a stream of [`graphics::Command`]s through a
//! [`graphics::Renderer`]; a backend executor (the null [`graphics::empty::EmptyExecutor`]
//! or the wgpu-backed [`render::WgpuExecutor`]) replays it in order. Input devices are
//! driven through [`input::InputSystem`] with pluggable gamepad and cursor providers.

pub mod coords;
pub mod device;
pub mod graphics;
pub mod input;
pub mod logging;
pub mod render;

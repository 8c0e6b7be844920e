//! Plain geometry and color values used by commands and input.
//!
//! Pointer positions are logical pixels with a top-left origin and +Y down. Viewport
//! and scissor rectangles in render commands are pixels of the current target.

mod color;
mod rect;
mod vec2;

pub use color::ColorRgba;
pub use rect::Rect;
pub use vec2::Vec2;

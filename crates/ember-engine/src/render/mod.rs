//! wgpu backend for the rendering command layer.
//!
//! [`WgpuExecutor`] realizes a [`Command`](crate::graphics::Command) stream on a window
//! surface owned by [`Gpu`](crate::device::Gpu).
//!
//! Shader interface:
//! - WGSL source, one module per stage (the same text may serve both).
//! - `@group(0) @binding(0)` vertex constants, `@group(0) @binding(1)` fragment constants,
//!   packed in declaration order with uniform alignment rules.
//! - `@group(1)`: texture layer `i` at binding `2 * i`, its sampler at `2 * i + 1`.
//! - Vertex attributes at consecutive `@location`s in canonical attribute order.
//! - Viewport and scissor rectangles are in target pixels.

mod convert;
mod executor;
mod pipeline;

pub use executor::{WgpuExecutor, WgpuStats};

//! wgpu device and window surface.
//!
//! [`Gpu`] owns the device, queue and surface of one window. The wgpu command
//! executor renders through it; nothing else in the crate touches wgpu objects.

mod context;
mod error;
mod frame;
mod init;
mod surface;

pub use context::Gpu;
pub use error::SurfaceErrorAction;
pub use frame::GpuFrame;
pub use init::GpuInit;

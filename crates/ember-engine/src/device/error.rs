/// What the caller should do after [`Gpu::handle_surface_error`](super::Gpu::handle_surface_error).
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum SurfaceErrorAction {
    /// The surface was configured again; retry next frame.
    Reconfigured,
    /// Drop this frame.
    SkipFrame,
    /// Out of memory. Stop rendering.
    Fatal,
}

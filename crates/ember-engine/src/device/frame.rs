/// Acquired back buffer.
///
/// Present or drop it before acquiring the next one.
pub struct GpuFrame {
    pub surface_texture: wgpu::SurfaceTexture,
    pub view: wgpu::TextureView,
}

impl GpuFrame {
    /// Queues the frame for display. Call after the work drawing into it was submitted.
    pub fn present(self) {
        let GpuFrame { surface_texture, view } = self;
        drop(view);
        surface_texture.present();
    }
}

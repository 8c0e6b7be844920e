use std::collections::BTreeSet;
use std::sync::Arc;

use bytemuck::Pod;

use crate::coords::Rect;

use super::blend::BlendDescriptor;
use super::buffer::{BufferFlags, BufferUsage};
use super::command::*;
use super::queue::{CommandQueue, QueueSwap};
use super::resource::{
    BlendStateId, BufferId, RenderTargetId, ResourceId, ResourceKind, ResourceRegistry, ShaderId,
    TextureId,
};
use super::shader::VertexAttribute;
use super::texture::{ClearParameters, SamplerParameters, TextureFlags, TextureLevel};
use super::types::{CullMode, DrawMode, FillMode, PixelFormat, TEXTURE_LAYERS};

/// Producer-side configuration.
#[derive(Debug, Clone)]
pub struct RendererConfig {
    /// Initial capacity of the recording queue.
    pub queue_capacity: usize,
    /// Record `PushDebugMarker` / `PopDebugMarker`. Off in release builds by default.
    pub debug_markers: bool,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            queue_capacity: 256,
            debug_markers: cfg!(debug_assertions),
        }
    }
}

/// Producer façade over the command stream.
///
/// Resource creation returns a handle immediately and records the init command; the
/// resource becomes usable on the executor once that command runs. Nothing here talks to
/// a GPU. The consumer side pulls batches from [`Renderer::swap`] and executes them.
///
/// Commands referencing a resource must be recorded after its init command and before its
/// [`Renderer::delete_resource`]. The queue does not check this.
#[derive(Debug)]
pub struct Renderer {
    config: RendererConfig,
    registry: Arc<ResourceRegistry>,
    swap: Arc<QueueSwap>,
    queue: CommandQueue,
}

impl Renderer {
    pub fn new(config: RendererConfig) -> Self {
        Self::with_shared(config, Arc::new(ResourceRegistry::new()), Arc::new(QueueSwap::new()))
    }

    /// Builds a renderer on an existing registry and hand-off (e.g. owned by a render
    /// thread that was started first).
    pub fn with_shared(config: RendererConfig, registry: Arc<ResourceRegistry>, swap: Arc<QueueSwap>) -> Self {
        let queue = CommandQueue::with_capacity(config.queue_capacity);
        Self {
            config,
            registry,
            swap,
            queue,
        }
    }

    #[inline]
    pub fn config(&self) -> &RendererConfig {
        &self.config
    }

    #[inline]
    pub fn registry(&self) -> &Arc<ResourceRegistry> {
        &self.registry
    }

    #[inline]
    pub fn swap(&self) -> &Arc<QueueSwap> {
        &self.swap
    }

    /// Commands recorded since the last submit.
    #[inline]
    pub fn recorded(&self) -> &CommandQueue {
        &self.queue
    }

    #[inline]
    pub fn push(&mut self, command: Command) {
        self.queue.push(command);
    }

    /// Hands everything recorded so far to the consumer.
    pub fn flush(&mut self) {
        self.swap.submit(&mut self.queue);
    }

    /// Ends the frame: records `Present` and submits.
    pub fn present(&mut self) {
        self.queue.push(Command::Present);
        self.flush();
    }

    // ── resources ─────────────────────────────────────────────────────────

    pub fn create_buffer(&mut self, usage: BufferUsage, flags: BufferFlags, data: Vec<u8>, size: usize) -> BufferId {
        let id = BufferId::from_resource(self.registry.allocate(ResourceKind::Buffer));
        self.push(Command::InitBuffer(InitBufferCmd::new(id, usage, flags, data, size)));
        id
    }

    /// Creates a buffer from typed elements (vertices, indices, constants).
    pub fn create_buffer_pod<T: Pod>(&mut self, usage: BufferUsage, flags: BufferFlags, items: &[T]) -> BufferId {
        let data = bytemuck::cast_slice::<T, u8>(items).to_vec();
        let size = data.len();
        self.create_buffer(usage, flags, data, size)
    }

    pub fn set_buffer_data(&mut self, buffer: BufferId, data: Vec<u8>) {
        self.push(Command::SetBufferData(SetBufferDataCmd::new(buffer, data)));
    }

    pub fn set_buffer_data_pod<T: Pod>(&mut self, buffer: BufferId, items: &[T]) {
        self.set_buffer_data(buffer, bytemuck::cast_slice::<T, u8>(items).to_vec());
    }

    pub fn create_texture(
        &mut self,
        levels: Vec<TextureLevel>,
        flags: TextureFlags,
        sample_count: u32,
        pixel_format: PixelFormat,
    ) -> TextureId {
        let id = TextureId::from_resource(self.registry.allocate(ResourceKind::Texture));
        self.push(Command::InitTexture(InitTextureCmd::new(
            id,
            levels,
            flags,
            sample_count,
            pixel_format,
        )));
        id
    }

    pub fn set_texture_data(&mut self, texture: TextureId, levels: Vec<TextureLevel>) {
        self.push(Command::SetTextureData(SetTextureDataCmd::new(texture, levels)));
    }

    pub fn set_texture_parameters(&mut self, texture: TextureId, sampler: SamplerParameters, clear: ClearParameters) {
        self.push(Command::SetTextureParameters(SetTextureParametersCmd::new(
            texture, sampler, clear,
        )));
    }

    pub fn create_shader(
        &mut self,
        fragment_shader: Vec<u8>,
        vertex_shader: Vec<u8>,
        vertex_attributes: BTreeSet<VertexAttribute>,
    ) -> ShaderId {
        self.create_shader_with(fragment_shader, vertex_shader, vertex_attributes, |cmd| cmd)
    }

    /// Like [`Renderer::create_shader`], letting `configure` set constants and entry points.
    pub fn create_shader_with(
        &mut self,
        fragment_shader: Vec<u8>,
        vertex_shader: Vec<u8>,
        vertex_attributes: BTreeSet<VertexAttribute>,
        configure: impl FnOnce(InitShaderCmd) -> InitShaderCmd,
    ) -> ShaderId {
        let id = ShaderId::from_resource(self.registry.allocate(ResourceKind::Shader));
        let cmd = configure(InitShaderCmd::new(id, fragment_shader, vertex_shader, vertex_attributes));
        self.push(Command::InitShader(cmd));
        id
    }

    pub fn create_blend_state(&mut self, descriptor: BlendDescriptor) -> BlendStateId {
        let id = BlendStateId::from_resource(self.registry.allocate(ResourceKind::BlendState));
        self.push(Command::InitBlendState(InitBlendStateCmd::from_descriptor(id, descriptor)));
        id
    }

    pub fn create_render_target(
        &mut self,
        width: u32,
        height: u32,
        sample_count: u32,
        pixel_format: PixelFormat,
        clear: ClearParameters,
    ) -> RenderTargetId {
        let id = RenderTargetId::from_resource(self.registry.allocate(ResourceKind::RenderTarget));
        let cmd = RenderTargetParamsCmd::new(id, width, height, sample_count, pixel_format).with_clear(clear);
        self.push(Command::InitRenderTarget(cmd));
        id
    }

    pub fn set_render_target_parameters(
        &mut self,
        render_target: RenderTargetId,
        width: u32,
        height: u32,
        sample_count: u32,
        pixel_format: PixelFormat,
        clear: ClearParameters,
    ) {
        let cmd =
            RenderTargetParamsCmd::new(render_target, width, height, sample_count, pixel_format).with_clear(clear);
        self.push(Command::SetRenderTargetParameters(cmd));
    }

    /// Records destruction of `resource`. The id stays `Uninitialized`/`Initialized` in
    /// the registry until the executor runs this command.
    pub fn delete_resource(&mut self, resource: impl Into<ResourceId>) {
        self.push(Command::DeleteResource(DeleteResourceCmd::new(resource)));
    }

    // ── state + draws ─────────────────────────────────────────────────────

    pub fn set_render_target(&mut self, render_target: Option<TextureId>) {
        self.push(Command::SetRenderTarget(SetRenderTargetCmd::new(render_target)));
    }

    pub fn clear(&mut self, render_target: Option<TextureId>) {
        self.push(Command::Clear(ClearCmd::new(render_target)));
    }

    pub fn blit(&mut self, source: TextureId, target: TextureId) {
        self.push(Command::Blit(BlitCmd::new(source, target)));
    }

    pub fn compute(&mut self, shader: ShaderId) {
        self.push(Command::Compute(ComputeCmd::new(shader)));
    }

    pub fn set_cull_mode(&mut self, cull_mode: CullMode) {
        self.push(Command::SetCullMode(SetCullModeCmd::new(cull_mode)));
    }

    pub fn set_fill_mode(&mut self, fill_mode: FillMode) {
        self.push(Command::SetFillMode(SetFillModeCmd::new(fill_mode)));
    }

    pub fn set_scissor_test(&mut self, enabled: bool, rect: Rect) {
        self.push(Command::SetScissorTest(SetScissorTestCmd::new(enabled, rect)));
    }

    pub fn set_viewport(&mut self, viewport: Rect) {
        self.push(Command::SetViewport(SetViewportCmd::new(viewport)));
    }

    pub fn set_depth_state(&mut self, depth_test: bool, depth_write: bool) {
        self.push(Command::SetDepthState(SetDepthStateCmd::new(depth_test, depth_write)));
    }

    pub fn set_pipeline_state(&mut self, blend_state: BlendStateId, shader: ShaderId) {
        self.push(Command::SetPipelineState(SetPipelineStateCmd::new(blend_state, shader)));
    }

    pub fn set_shader_constants(&mut self, fragment: Vec<Vec<f32>>, vertex: Vec<Vec<f32>>) {
        self.push(Command::SetShaderConstants(SetShaderConstantsCmd::new(fragment, vertex)));
    }

    pub fn set_textures(&mut self, textures: [Option<TextureId>; TEXTURE_LAYERS]) {
        self.push(Command::SetTextures(SetTexturesCmd::new(textures)));
    }

    pub fn draw(
        &mut self,
        index_buffer: BufferId,
        index_count: u32,
        index_size: u32,
        vertex_buffer: BufferId,
        draw_mode: DrawMode,
        start_index: u32,
    ) {
        self.push(Command::Draw(DrawCmd::new(
            index_buffer,
            index_count,
            index_size,
            vertex_buffer,
            draw_mode,
            start_index,
        )));
    }

    pub fn push_debug_marker(&mut self, name: impl Into<String>) {
        if self.config.debug_markers {
            self.push(Command::PushDebugMarker(PushDebugMarkerCmd::new(name)));
        }
    }

    pub fn pop_debug_marker(&mut self) {
        if self.config.debug_markers {
            self.push(Command::PopDebugMarker);
        }
    }
}

impl Default for Renderer {
    fn default() -> Self {
        Self::new(RendererConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graphics::ResourceState;

    #[test]
    fn create_returns_handle_before_execution() {
        let mut r = Renderer::default();
        let buf = r.create_buffer_pod(BufferUsage::Index, BufferFlags::STATIC, &[0u16, 1, 2]);

        assert_eq!(r.registry().state(buf.resource()), Some(ResourceState::Uninitialized));
        match r.recorded().commands() {
            [Command::InitBuffer(cmd)] => {
                assert_eq!(cmd.buffer, buf);
                assert_eq!(cmd.data.len(), 6);
                assert_eq!(cmd.size, 6);
            }
            other => panic!("unexpected queue: {other:?}"),
        }
    }

    #[test]
    fn present_ends_and_submits_frame() {
        let mut r = Renderer::default();
        r.clear(None);
        r.present();

        assert!(r.recorded().is_empty());
        let mut out = CommandQueue::new();
        assert!(r.swap().acquire(&mut out));
        assert_eq!(out.kinds().collect::<Vec<_>>(), vec![CommandKind::Clear, CommandKind::Present]);
    }

    #[test]
    fn debug_markers_respect_config() {
        let mut r = Renderer::new(RendererConfig {
            debug_markers: false,
            ..Default::default()
        });
        r.push_debug_marker("pass");
        r.pop_debug_marker();
        assert!(r.recorded().is_empty());

        let mut r = Renderer::new(RendererConfig {
            debug_markers: true,
            ..Default::default()
        });
        r.push_debug_marker("pass");
        r.pop_debug_marker();
        assert_eq!(r.recorded().len(), 2);
    }

    #[test]
    fn delete_is_recorded_after_uses() {
        let mut r = Renderer::default();
        let vb = r.create_buffer(BufferUsage::Vertex, BufferFlags::empty(), vec![0; 24], 24);
        let ib = r.create_buffer_pod(BufferUsage::Index, BufferFlags::empty(), &[0u16, 1, 2]);
        r.draw(ib, 3, 2, vb, DrawMode::TriangleList, 0);
        r.delete_resource(vb);

        let kinds: Vec<_> = r.recorded().kinds().collect();
        assert_eq!(kinds.last(), Some(&CommandKind::DeleteResource));
        assert!(r.registry().is_alive(vb.resource()));
    }
}

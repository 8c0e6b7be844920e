use std::sync::Arc;

use super::blend::BlendStateResource;
use super::buffer::BufferResource;
use super::command::{Command, CommandKind, DrawCmd};
use super::executor::{Capabilities, CommandExecutor};
use super::render_target::RenderTargetResource;
use super::resource::{
    BlendStateId, BufferId, RenderTargetId, ResourceId, ResourceKind, ResourceRegistry, ResourceTable,
    ShaderId, TextureId,
};
use super::shader::ShaderResource;
use super::state::RenderState;
use super::texture::TextureResource;

/// Fake native handle; unique per realized resource.
pub type EmptyHandle = u64;

/// Counters of what the null backend has seen.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Default)]
pub struct EmptyStats {
    pub frames: u64,
    pub clears: u64,
    pub draws: u64,
    /// Draws dropped because a referenced resource was not live.
    pub skipped_draws: u64,
    pub marker_depth: u32,
}

/// Null backend.
///
/// Keeps the backend-independent state of every resource (buffer mirrors, texture levels,
/// shader metadata, blend and render target descriptions) and the sticky render state,
/// but never touches a GPU. Useful headless and in tests.
#[derive(Debug)]
pub struct EmptyExecutor {
    registry: Arc<ResourceRegistry>,
    next_handle: EmptyHandle,

    buffers: ResourceTable<BufferResource<EmptyHandle>>,
    textures: ResourceTable<TextureResource<EmptyHandle>>,
    shaders: ResourceTable<ShaderResource<EmptyHandle>>,
    blend_states: ResourceTable<BlendStateResource<EmptyHandle>>,
    render_targets: ResourceTable<RenderTargetResource<EmptyHandle>>,

    state: RenderState,
    stats: EmptyStats,
}

impl EmptyExecutor {
    pub fn new(registry: Arc<ResourceRegistry>) -> Self {
        Self {
            registry,
            next_handle: 1,
            buffers: ResourceTable::new(),
            textures: ResourceTable::new(),
            shaders: ResourceTable::new(),
            blend_states: ResourceTable::new(),
            render_targets: ResourceTable::new(),
            state: RenderState::default(),
            stats: EmptyStats::default(),
        }
    }

    #[inline]
    pub fn state(&self) -> &RenderState {
        &self.state
    }

    #[inline]
    pub fn stats(&self) -> EmptyStats {
        self.stats
    }

    pub fn buffer(&self, id: BufferId) -> Option<&BufferResource<EmptyHandle>> {
        self.buffers.get(id.resource())
    }

    pub fn texture(&self, id: TextureId) -> Option<&TextureResource<EmptyHandle>> {
        self.textures.get(id.resource())
    }

    pub fn shader(&self, id: ShaderId) -> Option<&ShaderResource<EmptyHandle>> {
        self.shaders.get(id.resource())
    }

    pub fn blend_state(&self, id: BlendStateId) -> Option<&BlendStateResource<EmptyHandle>> {
        self.blend_states.get(id.resource())
    }

    pub fn render_target(&self, id: RenderTargetId) -> Option<&RenderTargetResource<EmptyHandle>> {
        self.render_targets.get(id.resource())
    }

    fn alloc_handle(&mut self) -> EmptyHandle {
        let handle = self.next_handle;
        self.next_handle += 1;
        handle
    }

    /// Gate for init commands: the id must still be live in the registry.
    fn accepts_init(&self, id: ResourceId) -> bool {
        let alive = self.registry.is_alive(id);
        if !alive {
            log::trace!("empty: init of stale resource {id} ignored");
        }
        alive
    }

    fn draw_is_live(&self, cmd: &DrawCmd) -> bool {
        let buffers_live = self.buffers.contains(cmd.index_buffer.resource())
            && self.buffers.contains(cmd.vertex_buffer.resource());
        let shader_live = self
            .state
            .shader
            .is_none_or(|shader| self.shaders.contains(shader.resource()));
        buffers_live && shader_live
    }

    fn delete(&mut self, id: ResourceId) {
        let Some(kind) = self.registry.kind(id) else {
            log::trace!("empty: delete of stale resource {id} ignored");
            return;
        };

        match kind {
            ResourceKind::Buffer => self.buffers.remove(id).map(|mut r| r.resource_mut().release()),
            ResourceKind::Texture => self.textures.remove(id).map(|mut r| r.resource_mut().release()),
            ResourceKind::Shader => self.shaders.remove(id).map(|mut r| r.resource_mut().release()),
            ResourceKind::BlendState => self.blend_states.remove(id).map(|mut r| r.resource_mut().release()),
            ResourceKind::RenderTarget => {
                self.render_targets.remove(id).map(|mut r| r.resource_mut().release())
            }
        };
        self.registry.release(id);
    }
}

impl CommandExecutor for EmptyExecutor {
    fn capabilities(&self) -> Capabilities {
        Capabilities::all() - Capabilities::BLIT - Capabilities::COMPUTE
    }

    fn execute(&mut self, command: &Command) {
        if self.state.apply(command) {
            return;
        }

        match command {
            Command::Present => self.stats.frames += 1,

            Command::InitRenderTarget(cmd) | Command::SetRenderTargetParameters(cmd) => {
                let id = cmd.render_target.resource();
                if !self.accepts_init(id) {
                    return;
                }
                if !self.render_targets.contains(id) {
                    let mut rt = RenderTargetResource::new(id);
                    let handle = self.alloc_handle();
                    rt.resource_mut().bind(handle);
                    self.render_targets.insert(id, rt);
                    self.registry.mark_initialized(id);
                }
                if let Some(rt) = self.render_targets.get_mut(id) {
                    rt.set_parameters(cmd.descriptor());
                }
            }

            Command::Clear(_) => self.stats.clears += 1,

            Command::Draw(cmd) => {
                if self.draw_is_live(cmd) {
                    self.stats.draws += 1;
                } else {
                    log::trace!("empty: draw references a resource that is not live");
                    self.stats.skipped_draws += 1;
                }
            }

            Command::PushDebugMarker(_) => self.stats.marker_depth += 1,
            Command::PopDebugMarker => {
                self.stats.marker_depth = self.stats.marker_depth.saturating_sub(1);
            }

            Command::InitBlendState(cmd) => {
                let id = cmd.blend_state.resource();
                if !self.accepts_init(id) {
                    return;
                }
                let mut blend = BlendStateResource::new(id);
                blend.init(cmd.descriptor());
                let handle = self.alloc_handle();
                blend.resource_mut().bind(handle);
                self.blend_states.insert(id, blend);
                self.registry.mark_initialized(id);
            }

            Command::InitBuffer(cmd) => {
                let id = cmd.buffer.resource();
                if !self.accepts_init(id) {
                    return;
                }
                let mut buffer = BufferResource::new(id);
                buffer.init(cmd.usage, cmd.flags, &cmd.data, cmd.size);
                let handle = self.alloc_handle();
                buffer.resource_mut().bind(handle);
                self.buffers.insert(id, buffer);
                self.registry.mark_initialized(id);
            }

            Command::SetBufferData(cmd) => match self.buffers.get_mut(cmd.buffer.resource()) {
                Some(buffer) => {
                    buffer.set_data(&cmd.data);
                }
                None => log::trace!("empty: data for unknown buffer {}", cmd.buffer.resource()),
            },

            Command::InitShader(cmd) => {
                let id = cmd.shader.resource();
                if !self.accepts_init(id) {
                    return;
                }
                let mut shader = ShaderResource::new(id);
                shader.init(cmd.vertex_stage(), cmd.fragment_stage(), &cmd.vertex_attributes);
                let handle = self.alloc_handle();
                shader.resource_mut().bind(handle);
                self.shaders.insert(id, shader);
                self.registry.mark_initialized(id);
            }

            Command::InitTexture(cmd) => {
                let id = cmd.texture.resource();
                if !self.accepts_init(id) {
                    return;
                }
                let mut texture = TextureResource::new(id);
                texture.init(&cmd.levels, cmd.flags, cmd.sample_count, cmd.pixel_format);
                let handle = self.alloc_handle();
                texture.resource_mut().bind(handle);
                self.textures.insert(id, texture);
                self.registry.mark_initialized(id);
            }

            Command::SetTextureData(cmd) => match self.textures.get_mut(cmd.texture.resource()) {
                Some(texture) => {
                    texture.set_data(&cmd.levels);
                }
                None => log::trace!("empty: data for unknown texture {}", cmd.texture.resource()),
            },

            Command::SetTextureParameters(cmd) => {
                if let Some(texture) = self.textures.get_mut(cmd.texture.resource()) {
                    texture.set_parameters(cmd.sampler(), cmd.clear());
                }
            }

            Command::DeleteResource(cmd) => self.delete(cmd.resource),

            // Filtered out by capabilities; state commands were handled above.
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graphics::{
        BufferFlags, BufferUsage, CommandQueue, Renderer, RendererConfig, ResourceState, execute_queue,
    };

    fn pair() -> (Renderer, EmptyExecutor) {
        let renderer = Renderer::new(RendererConfig::default());
        let executor = EmptyExecutor::new(Arc::clone(renderer.registry()));
        (renderer, executor)
    }

    fn run(renderer: &mut Renderer, executor: &mut EmptyExecutor) {
        renderer.flush();
        let mut batch = CommandQueue::new();
        renderer.swap().acquire(&mut batch);
        execute_queue(executor, &batch);
    }

    #[test]
    fn init_realizes_and_marks_initialized() {
        let (mut r, mut ex) = pair();
        let buf = r.create_buffer(BufferUsage::Vertex, BufferFlags::DYNAMIC, vec![1, 2, 3], 64);
        run(&mut r, &mut ex);

        assert_eq!(r.registry().state(buf.resource()), Some(ResourceState::Initialized));
        let res = ex.buffer(buf).unwrap();
        assert_eq!(res.size(), 3);
        assert_eq!(res.capacity(), 64);
        assert!(res.resource().native().is_some());
    }

    #[test]
    fn buffer_size_follows_updates() {
        let (mut r, mut ex) = pair();
        let buf = r.create_buffer(BufferUsage::Vertex, BufferFlags::DYNAMIC, vec![0; 4], 4);
        r.set_buffer_data(buf, vec![0; 100]);
        r.set_buffer_data(buf, vec![0; 10]);
        run(&mut r, &mut ex);
        assert_eq!(ex.buffer(buf).map(|b| b.size()), Some(10));
    }

    #[test]
    fn delete_destroys_and_recycles() {
        let (mut r, mut ex) = pair();
        let buf = r.create_buffer(BufferUsage::Index, BufferFlags::empty(), vec![0; 6], 6);
        r.delete_resource(buf);
        run(&mut r, &mut ex);

        assert_eq!(r.registry().state(buf.resource()), Some(ResourceState::Destroyed));
        assert!(ex.buffer(buf).is_none());
        assert_eq!(r.registry().live_count(), 0);
    }

    #[test]
    fn inverted_queue_is_executed_verbatim() {
        let (mut r, mut ex) = pair();
        let vb = r.create_buffer(BufferUsage::Vertex, BufferFlags::empty(), vec![0; 36], 36);
        let ib = r.create_buffer_pod(BufferUsage::Index, BufferFlags::empty(), &[0u16, 1, 2]);
        run(&mut r, &mut ex);

        // Delete recorded before the draw that still uses the buffer.
        r.delete_resource(vb);
        r.draw(ib, 3, 2, vb, crate::graphics::DrawMode::TriangleList, 0);
        r.present();

        let mut batch = CommandQueue::new();
        r.swap().acquire(&mut batch);
        assert_eq!(
            batch.kinds().collect::<Vec<_>>(),
            vec![CommandKind::DeleteResource, CommandKind::Draw, CommandKind::Present]
        );

        execute_queue(&mut ex, &batch);
        let stats = ex.stats();
        assert_eq!(stats.draws, 0);
        assert_eq!(stats.skipped_draws, 1);
        assert_eq!(stats.frames, 1);
    }

    #[test]
    fn draw_before_init_is_not_reordered() {
        let (mut r, mut ex) = pair();
        let vb = r.create_buffer(BufferUsage::Vertex, BufferFlags::empty(), vec![0; 36], 36);
        let ib = r.create_buffer_pod(BufferUsage::Index, BufferFlags::empty(), &[0u16, 1, 2]);
        r.draw(ib, 3, 2, vb, crate::graphics::DrawMode::TriangleList, 0);
        r.flush();

        let mut recorded = CommandQueue::new();
        r.swap().acquire(&mut recorded);
        assert_eq!(
            recorded.kinds().collect::<Vec<_>>(),
            vec![CommandKind::InitBuffer, CommandKind::InitBuffer, CommandKind::Draw]
        );

        // Move the draw ahead of both inits.
        let (draws, inits): (Vec<Command>, Vec<Command>) =
            recorded.iter().cloned().partition(|c| c.kind() == CommandKind::Draw);
        let inverted: CommandQueue = draws.into_iter().chain(inits).collect();
        assert_eq!(
            inverted.kinds().collect::<Vec<_>>(),
            vec![CommandKind::Draw, CommandKind::InitBuffer, CommandKind::InitBuffer]
        );

        execute_queue(&mut ex, &inverted);
        let stats = ex.stats();
        assert_eq!((stats.draws, stats.skipped_draws), (0, 1));
        // The inits still run after the skipped draw.
        assert_eq!(r.registry().state(vb.resource()), Some(ResourceState::Initialized));
        assert_eq!(r.registry().state(ib.resource()), Some(ResourceState::Initialized));
    }

    #[test]
    fn well_ordered_draw_is_counted() {
        let (mut r, mut ex) = pair();
        let vb = r.create_buffer(BufferUsage::Vertex, BufferFlags::empty(), vec![0; 36], 36);
        let ib = r.create_buffer_pod(BufferUsage::Index, BufferFlags::empty(), &[0u16, 1, 2]);
        r.clear(None);
        r.draw(ib, 3, 2, vb, crate::graphics::DrawMode::TriangleList, 0);
        r.delete_resource(vb);
        r.present();
        run(&mut r, &mut ex);

        let stats = ex.stats();
        assert_eq!((stats.clears, stats.draws, stats.skipped_draws), (1, 1, 0));
    }

    #[test]
    fn stale_init_is_ignored() {
        let (mut r, mut ex) = pair();
        let tex = r.create_texture(Vec::new(), Default::default(), 1, Default::default());
        r.delete_resource(tex);
        run(&mut r, &mut ex);

        // Replaying the init after the slot was recycled must not resurrect it.
        let mut replay = CommandQueue::new();
        replay.push(Command::InitTexture(crate::graphics::command::InitTextureCmd::new(
            tex,
            Vec::new(),
            Default::default(),
            1,
            Default::default(),
        )));
        execute_queue(&mut ex, &replay);
        assert!(ex.texture(tex).is_none());
    }

    #[test]
    fn blit_and_compute_are_unsupported() {
        let ex = EmptyExecutor::new(Arc::new(ResourceRegistry::new()));
        assert!(!ex.capabilities().supports(CommandKind::Blit));
        assert!(!ex.capabilities().supports(CommandKind::Compute));
        assert!(ex.capabilities().supports(CommandKind::Draw));
    }
}

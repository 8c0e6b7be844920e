use std::borrow::Cow;
use std::sync::Arc;

use anyhow::{Context, Result};
use winit::window::Window;

use crate::coords::Rect;
use crate::device::{Gpu, GpuFrame, GpuInit};
use crate::graphics::command::{
    ClearCmd, DrawCmd, InitBlendStateCmd, InitBufferCmd, InitShaderCmd, InitTextureCmd, RenderTargetParamsCmd,
    SetBufferDataCmd, SetTextureDataCmd, SetTextureParametersCmd,
};
use crate::graphics::{
    BlendStateResource, BufferResource, BufferUsage, Capabilities, ClearParameters, Command, CommandExecutor,
    Extent, FillMode, RenderState, RenderTargetResource, ResourceId, ResourceKind, ResourceRegistry,
    ResourceTable, ShaderResource, ShaderStage, TextureFlags, TextureId, TextureResource,
};

use super::convert;
use super::pipeline::{BindLayouts, DEPTH_FORMAT, PipelineCache, PipelineKey, PipelineSource};

/// Native texture with its default view and sampler.
#[derive(Debug)]
pub struct GpuTexture {
    texture: wgpu::Texture,
    view: wgpu::TextureView,
    sampler: wgpu::Sampler,
    /// Present on render targets created with `TextureFlags::DEPTH_BUFFER`.
    depth: Option<wgpu::TextureView>,
}

/// Compiled shader stages and their constant blocks (bind group 0).
#[derive(Debug)]
pub struct GpuShader {
    vertex: wgpu::ShaderModule,
    fragment: wgpu::ShaderModule,
    vertex_constants: wgpu::Buffer,
    fragment_constants: wgpu::Buffer,
    constants: wgpu::BindGroup,
    /// Constants version last written to the buffers.
    uploaded: Option<u64>,
}

#[derive(Debug, Copy, Clone)]
pub struct GpuBlend {
    blend: Option<wgpu::BlendState>,
    write_mask: wgpu::ColorWrites,
}

/// Back buffer attachments besides the surface texture.
#[derive(Debug, Default)]
pub struct BackBuffer {
    /// Created when the render target's clear parameters clear depth.
    depth: Option<wgpu::TextureView>,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Default)]
pub struct WgpuStats {
    pub frames: u64,
    pub clears: u64,
    pub draws: u64,
    /// Draws not recorded: stale ids, bad index ranges, empty viewport or scissor.
    pub skipped_draws: u64,
    pub submissions: u64,
    pub pipelines: usize,
}

/// Color and depth views a pass renders into.
struct Target {
    texture: Option<TextureId>,
    color: wgpu::TextureView,
    depth: Option<wgpu::TextureView>,
    format: wgpu::TextureFormat,
    size: Extent,
    clear: ClearParameters,
}

/// Command executor rendering through wgpu into a window surface.
///
/// Work is recorded into one encoder per frame and submitted at `Present`. Queue uploads
/// (buffer data, texels, shader constants) that follow recorded passes submit the pending
/// encoder first, so every draw sees the data that was current when it was recorded.
pub struct WgpuExecutor<'w> {
    gpu: Gpu<'w>,
    registry: Arc<ResourceRegistry>,

    buffers: ResourceTable<BufferResource<wgpu::Buffer>>,
    textures: ResourceTable<TextureResource<GpuTexture>>,
    shaders: ResourceTable<ShaderResource<GpuShader>>,
    blend_states: ResourceTable<BlendStateResource<GpuBlend>>,
    render_targets: ResourceTable<RenderTargetResource<BackBuffer>>,
    back_buffer: Option<ResourceId>,

    layouts: BindLayouts,
    pipelines: PipelineCache,
    default_view: wgpu::TextureView,
    default_sampler: wgpu::Sampler,

    state: RenderState,
    constants_version: u64,

    frame: Option<GpuFrame>,
    encoder: Option<wgpu::CommandEncoder>,
    /// The pending encoder holds at least one pass.
    encoder_dirty: bool,
    markers: Vec<String>,

    warned_wireframe: bool,
    warned_multisample: bool,
    stats: WgpuStats,
}

impl<'w> WgpuExecutor<'w> {
    /// Creates the device for `window` and an executor on top of it.
    pub fn new(window: &'w Window, init: GpuInit, registry: Arc<ResourceRegistry>) -> Result<Self> {
        let gpu = pollster::block_on(Gpu::new(window, init)).context("failed to initialize the wgpu backend")?;
        Ok(Self::with_gpu(gpu, registry))
    }

    pub fn with_gpu(gpu: Gpu<'w>, registry: Arc<ResourceRegistry>) -> Self {
        let device = gpu.device();
        let layouts = BindLayouts::new(device);

        // Bound to texture layers that have nothing valid to sample.
        let white = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("ember default texture"),
            size: wgpu::Extent3d {
                width: 1,
                height: 1,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8Unorm,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        gpu.queue().write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &white,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            &[255; 4],
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(4),
                rows_per_image: Some(1),
            },
            wgpu::Extent3d {
                width: 1,
                height: 1,
                depth_or_array_layers: 1,
            },
        );
        let default_view = white.create_view(&wgpu::TextureViewDescriptor::default());
        let default_sampler = device.create_sampler(&convert::sampler_descriptor(Default::default()));

        Self {
            gpu,
            registry,
            buffers: ResourceTable::new(),
            textures: ResourceTable::new(),
            shaders: ResourceTable::new(),
            blend_states: ResourceTable::new(),
            render_targets: ResourceTable::new(),
            back_buffer: None,
            layouts,
            pipelines: PipelineCache::default(),
            default_view,
            default_sampler,
            state: RenderState::default(),
            constants_version: 0,
            frame: None,
            encoder: None,
            encoder_dirty: false,
            markers: Vec::new(),
            warned_wireframe: false,
            warned_multisample: false,
            stats: WgpuStats::default(),
        }
    }

    #[inline]
    pub fn gpu(&self) -> &Gpu<'w> {
        &self.gpu
    }

    #[inline]
    pub fn state(&self) -> &RenderState {
        &self.state
    }

    pub fn stats(&self) -> WgpuStats {
        WgpuStats {
            pipelines: self.pipelines.len(),
            ..self.stats
        }
    }

    fn accepts_init(&self, id: ResourceId) -> bool {
        let alive = self.registry.is_alive(id);
        if !alive {
            log::trace!("wgpu: init of stale resource {id} ignored");
        }
        alive
    }

    fn warn_multisample(&mut self, sample_count: u32) {
        if sample_count > 1 && !self.warned_multisample {
            log::info!("wgpu: multisampling is not supported; rendering with one sample");
            self.warned_multisample = true;
        }
    }

    fn polygon_mode(&mut self, fill: FillMode) -> wgpu::PolygonMode {
        match fill {
            FillMode::Solid => wgpu::PolygonMode::Fill,
            FillMode::Wireframe if self.gpu.features().contains(wgpu::Features::POLYGON_MODE_LINE) => {
                wgpu::PolygonMode::Line
            }
            FillMode::Wireframe => {
                if !self.warned_wireframe {
                    log::info!("wgpu: device lacks POLYGON_MODE_LINE; wireframe draws are filled");
                    self.warned_wireframe = true;
                }
                wgpu::PolygonMode::Fill
            }
        }
    }

    // ── encoder ────────────────────────────────────────────────────────────

    fn ensure_encoder(&mut self) {
        if self.encoder.is_some() {
            return;
        }
        let mut encoder = self
            .gpu
            .device()
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("ember frame encoder"),
            });
        for name in &self.markers {
            encoder.push_debug_group(name);
        }
        self.encoder = Some(encoder);
    }

    /// Submits the pending encoder. Open debug groups are closed here and reopened on
    /// the next encoder.
    fn submit(&mut self) {
        let Some(mut encoder) = self.encoder.take() else { return };
        for _ in &self.markers {
            encoder.pop_debug_group();
        }
        self.gpu.queue().submit(std::iter::once(encoder.finish()));
        self.encoder_dirty = false;
        self.stats.submissions += 1;
    }

    /// Call before any queue write: writes land ahead of everything already recorded.
    fn upload_barrier(&mut self) {
        if self.encoder_dirty {
            self.submit();
        }
    }

    fn present(&mut self) {
        if !self.markers.is_empty() {
            log::warn!("wgpu: {} debug marker(s) still open at present", self.markers.len());
        }
        self.submit();
        self.markers.clear();
        if let Some(frame) = self.frame.take() {
            frame.present();
        }
        self.stats.frames += 1;
    }

    // ── targets ────────────────────────────────────────────────────────────

    fn resolve_target(&mut self, texture: Option<TextureId>) -> Option<Target> {
        let Some(id) = texture else {
            return self.back_buffer_target();
        };

        let Some(tex) = self.textures.get(id.resource()) else {
            log::trace!("wgpu: render target {} is not live", id.resource());
            return None;
        };
        if !tex.flags().contains(TextureFlags::RENDER_TARGET) {
            log::trace!("wgpu: texture {} is not a render target", id.resource());
            return None;
        }
        let native = tex.resource().native()?;
        Some(Target {
            texture: Some(id),
            color: native.view.clone(),
            depth: native.depth.clone(),
            format: convert::texture_format(tex.pixel_format()),
            size: tex.size(),
            clear: tex.clear(),
        })
    }

    fn back_buffer_target(&mut self) -> Option<Target> {
        if self.frame.is_none() {
            match self.gpu.acquire_frame() {
                Ok(frame) => self.frame = frame,
                Err(err) => log::error!("wgpu: {err:#}"),
            }
        }
        let frame = self.frame.as_ref()?;

        let rt = self.back_buffer.and_then(|id| self.render_targets.get(id));
        let size = self.gpu.size();
        Some(Target {
            texture: None,
            color: frame.view.clone(),
            depth: rt.and_then(|rt| rt.resource().native()).and_then(|bb| bb.depth.clone()),
            format: self.gpu.surface_format(),
            size: Extent::new(size.width, size.height),
            clear: rt.map(|rt| rt.descriptor().clear).unwrap_or_default(),
        })
    }

    fn set_render_target_parameters(&mut self, cmd: &RenderTargetParamsCmd) {
        let id = cmd.render_target.resource();
        if !self.accepts_init(id) {
            return;
        }
        if !self.render_targets.contains(id) {
            self.render_targets.insert(id, RenderTargetResource::new(id));
        }

        let descriptor = cmd.descriptor();
        self.warn_multisample(descriptor.sample_count);
        let format = convert::texture_format(descriptor.pixel_format);
        if format != self.gpu.surface_format() {
            log::debug!(
                "wgpu: back buffer keeps surface format {:?} instead of {format:?}",
                self.gpu.surface_format()
            );
        }

        let Some(rt) = self.render_targets.get_mut(id) else { return };
        let reshaped = rt.set_parameters(descriptor);
        let wants_depth = descriptor.clear.clear_depth_buffer;
        let has_depth = rt.resource().native().is_some_and(|bb| bb.depth.is_some());

        if reshaped || !rt.resource().is_initialized() || wants_depth != has_depth {
            self.gpu.resize(descriptor.size.width, descriptor.size.height);
            let depth = (wants_depth && !descriptor.size.is_empty())
                .then(|| create_depth_view(self.gpu.device(), descriptor.size));
            rt.resource_mut().bind(BackBuffer { depth });
            self.registry.mark_initialized(id);
            log::debug!(
                "wgpu: back buffer {}x{}, depth {}",
                descriptor.size.width,
                descriptor.size.height,
                wants_depth
            );
        }
        self.back_buffer = Some(id);
    }

    // ── resources ──────────────────────────────────────────────────────────

    fn init_buffer(&mut self, cmd: &InitBufferCmd) {
        let id = cmd.buffer.resource();
        if !self.accepts_init(id) {
            return;
        }
        self.upload_barrier();

        let mut buffer = BufferResource::new(id);
        let capacity = buffer.init(cmd.usage, cmd.flags, &cmd.data, cmd.size);
        let native = create_buffer(self.gpu.device(), cmd.usage, capacity);
        write_buffer(self.gpu.queue(), &native, buffer.data());
        buffer.resource_mut().bind(native);

        self.buffers.insert(id, buffer);
        self.registry.mark_initialized(id);
    }

    fn set_buffer_data(&mut self, cmd: &SetBufferDataCmd) {
        let id = cmd.buffer.resource();
        if !self.buffers.contains(id) {
            log::trace!("wgpu: data for unknown buffer {id}");
            return;
        }
        self.upload_barrier();

        let Some(buffer) = self.buffers.get_mut(id) else { return };
        if buffer.set_data(&cmd.data) {
            let native = create_buffer(self.gpu.device(), buffer.usage(), buffer.capacity());
            buffer.resource_mut().bind(native);
        }
        if let Some(native) = buffer.resource().native() {
            write_buffer(self.gpu.queue(), native, buffer.data());
        }
    }

    fn init_texture(&mut self, cmd: &InitTextureCmd) {
        let id = cmd.texture.resource();
        if !self.accepts_init(id) {
            return;
        }
        self.warn_multisample(cmd.sample_count);
        self.upload_barrier();

        let mut texture = TextureResource::new(id);
        texture.init(&cmd.levels, cmd.flags, cmd.sample_count, cmd.pixel_format);
        match create_texture(self.gpu.device(), self.gpu.queue(), &texture) {
            Some(native) => {
                texture.resource_mut().bind(native);
                self.registry.mark_initialized(id);
            }
            None => log::debug!("wgpu: texture {id} has no extent; realized on first data"),
        }
        self.textures.insert(id, texture);
    }

    fn set_texture_data(&mut self, cmd: &SetTextureDataCmd) {
        let id = cmd.texture.resource();
        if !self.textures.contains(id) {
            log::trace!("wgpu: data for unknown texture {id}");
            return;
        }
        self.upload_barrier();

        let Some(texture) = self.textures.get_mut(id) else { return };
        let reshaped = texture.set_data(&cmd.levels);
        if reshaped || !texture.resource().is_initialized() {
            if let Some(native) = create_texture(self.gpu.device(), self.gpu.queue(), texture) {
                texture.resource_mut().bind(native);
                self.registry.mark_initialized(id);
            }
        } else if let Some(native) = texture.resource().native() {
            upload_levels(self.gpu.queue(), &native.texture, texture);
        }
    }

    fn set_texture_parameters(&mut self, cmd: &SetTextureParametersCmd) {
        let Some(texture) = self.textures.get_mut(cmd.texture.resource()) else {
            log::trace!("wgpu: parameters for unknown texture {}", cmd.texture.resource());
            return;
        };
        texture.set_parameters(cmd.sampler(), cmd.clear());
        let descriptor = convert::sampler_descriptor(texture.sampler());
        if let Some(native) = texture.resource_mut().native_mut() {
            native.sampler = self.gpu.device().create_sampler(&descriptor);
        }
    }

    fn init_shader(&mut self, cmd: &InitShaderCmd) {
        let id = cmd.shader.resource();
        if !self.accepts_init(id) {
            return;
        }

        let mut shader = ShaderResource::new(id);
        shader.init(cmd.vertex_stage(), cmd.fragment_stage(), &cmd.vertex_attributes);
        match self.create_shader(shader.vertex(), shader.fragment()) {
            Some(native) => {
                shader.resource_mut().bind(native);
                self.registry.mark_initialized(id);
            }
            None => log::warn!("wgpu: shader {id} was not realized"),
        }
        self.shaders.insert(id, shader);
    }

    fn create_shader(&self, vertex: &ShaderStage, fragment: &ShaderStage) -> Option<GpuShader> {
        let device = self.gpu.device();
        let module = |stage: &ShaderStage, label: &str| {
            let Some(source) = stage.source() else {
                log::warn!("wgpu: {label} is not WGSL text");
                return None;
            };
            validated(device, label, |device| {
                device.create_shader_module(wgpu::ShaderModuleDescriptor {
                    label: Some(label),
                    source: wgpu::ShaderSource::Wgsl(Cow::Borrowed(source)),
                })
            })
        };

        let vertex_module = module(vertex, "ember vertex shader")?;
        let fragment_module = if fragment.code == vertex.code {
            vertex_module.clone()
        } else {
            module(fragment, "ember fragment shader")?
        };

        let uniform = |size: u32, label: &str| {
            device.create_buffer(&wgpu::BufferDescriptor {
                label: Some(label),
                size: u64::from(size),
                usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            })
        };
        let vertex_constants = uniform(vertex.layout.size, "ember vertex constants");
        let fragment_constants = uniform(fragment.layout.size, "ember fragment constants");

        let constants = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("ember constants bind group"),
            layout: &self.layouts.constants,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: vertex_constants.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: fragment_constants.as_entire_binding(),
                },
            ],
        });

        Some(GpuShader {
            vertex: vertex_module,
            fragment: fragment_module,
            vertex_constants,
            fragment_constants,
            constants,
            uploaded: None,
        })
    }

    fn init_blend_state(&mut self, cmd: &InitBlendStateCmd) {
        let id = cmd.blend_state.resource();
        if !self.accepts_init(id) {
            return;
        }
        let descriptor = cmd.descriptor();
        let mut blend = BlendStateResource::new(id);
        blend.init(descriptor);
        blend.resource_mut().bind(GpuBlend {
            blend: convert::blend_state(&descriptor),
            write_mask: convert::color_writes(descriptor.color_mask),
        });
        self.blend_states.insert(id, blend);
        self.registry.mark_initialized(id);
    }

    fn delete(&mut self, id: ResourceId) {
        let Some(kind) = self.registry.kind(id) else {
            log::trace!("wgpu: delete of stale resource {id} ignored");
            return;
        };

        match kind {
            // Natives are dropped, not destroyed: passes already recorded may still use them.
            ResourceKind::Buffer => {
                self.buffers.remove(id);
            }
            ResourceKind::Texture => {
                self.textures.remove(id);
            }
            ResourceKind::Shader => {
                self.shaders.remove(id);
                self.pipelines.evict(id);
            }
            ResourceKind::BlendState => {
                self.blend_states.remove(id);
                self.pipelines.evict(id);
            }
            ResourceKind::RenderTarget => {
                self.render_targets.remove(id);
                if self.back_buffer == Some(id) {
                    self.back_buffer = None;
                }
            }
        }
        self.registry.release(id);
    }

    // ── passes ─────────────────────────────────────────────────────────────

    fn clear(&mut self, cmd: &ClearCmd) {
        let Some(target) = self.resolve_target(cmd.render_target) else { return };
        let clear = target.clear;

        let color_load = if clear.clear_color_buffer {
            wgpu::LoadOp::Clear(convert::clear_color(clear.clear_color))
        } else {
            wgpu::LoadOp::Load
        };
        let depth_load = if clear.clear_depth_buffer {
            wgpu::LoadOp::Clear(clear.clear_depth)
        } else {
            wgpu::LoadOp::Load
        };

        self.ensure_encoder();
        let Some(encoder) = self.encoder.as_mut() else { return };
        {
            let _pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("ember clear pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &target.color,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: color_load,
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: target.depth.as_ref().map(|view| {
                    wgpu::RenderPassDepthStencilAttachment {
                        view,
                        depth_ops: Some(wgpu::Operations {
                            load: depth_load,
                            store: wgpu::StoreOp::Store,
                        }),
                        stencil_ops: None,
                    }
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
                multiview_mask: None,
            });
        }
        self.encoder_dirty = true;
        self.stats.clears += 1;
    }

    fn draw(&mut self, cmd: &DrawCmd) {
        if self.record_draw(cmd) {
            self.stats.draws += 1;
        } else {
            self.stats.skipped_draws += 1;
        }
    }

    fn record_draw(&mut self, cmd: &DrawCmd) -> bool {
        let Some(index_format) = convert::index_format(cmd.index_size) else {
            log::trace!("wgpu: draw with index size {} skipped", cmd.index_size);
            return false;
        };
        let Some(shader_id) = self.state.shader.map(|s| s.resource()) else {
            log::trace!("wgpu: draw before any pipeline state");
            return false;
        };

        let index_ok = self.buffers.get(cmd.index_buffer.resource()).is_some_and(|b| {
            b.usage() == BufferUsage::Index
                && b.resource().native().is_some()
                && (u64::from(cmd.start_index) + u64::from(cmd.index_count)) * u64::from(cmd.index_size)
                    <= b.size() as u64
        });
        let vertex_ok = self
            .buffers
            .get(cmd.vertex_buffer.resource())
            .is_some_and(|b| b.usage() == BufferUsage::Vertex && b.resource().native().is_some());
        let shader_ok = self
            .shaders
            .get(shader_id)
            .is_some_and(|s| s.resource().native().is_some());
        if !(index_ok && vertex_ok && shader_ok) {
            log::trace!("wgpu: draw references a resource that is not live or out of range");
            return false;
        }

        let Some(target) = self.resolve_target(self.state.render_target) else { return false };
        let Some((vx, vy, vw, vh)) = viewport_rect(self.state.viewport, target.size) else { return false };
        let Some((sx, sy, sw, sh)) = scissor_rect(self.state.scissor, target.size) else { return false };

        self.upload_constants(shader_id);

        let key = PipelineKey {
            shader: shader_id,
            blend_state: self
                .state
                .blend_state
                .map(|b| b.resource())
                .filter(|id| self.blend_states.contains(*id)),
            cull_mode: self.state.cull_mode,
            fill_mode: self.state.fill_mode,
            depth: target.depth.as_ref().map(|_| (self.state.depth_test, self.state.depth_write)),
            draw_mode: cmd.draw_mode,
            strip_index_format: convert::is_strip(cmd.draw_mode).then_some(index_format),
            color_format: target.format,
        };
        if !self.ensure_pipeline(&key) {
            return false;
        }

        let textures = self.texture_bind_group(target.texture);
        self.ensure_encoder();

        let (Some(pipeline), Some(shader), Some(index), Some(vertex), Some(encoder)) = (
            self.pipelines.get(&key),
            self.shaders.get(shader_id),
            self.buffers.get(cmd.index_buffer.resource()),
            self.buffers.get(cmd.vertex_buffer.resource()),
            self.encoder.as_mut(),
        ) else {
            return false;
        };
        let (Some(shader_native), Some(index_native), Some(vertex_native)) =
            (shader.resource().native(), index.resource().native(), vertex.resource().native())
        else {
            return false;
        };

        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("ember draw pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &target.color,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Load,
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: target.depth.as_ref().map(|view| {
                    wgpu::RenderPassDepthStencilAttachment {
                        view,
                        depth_ops: Some(wgpu::Operations {
                            load: wgpu::LoadOp::Load,
                            store: wgpu::StoreOp::Store,
                        }),
                        stencil_ops: None,
                    }
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
                multiview_mask: None,
            });

            pass.set_pipeline(pipeline);
            pass.set_bind_group(0, &shader_native.constants, &[]);
            pass.set_bind_group(1, &textures, &[]);
            if shader.vertex_layout().stride > 0 {
                pass.set_vertex_buffer(0, vertex_native.slice(..));
            }
            pass.set_index_buffer(index_native.slice(..), index_format);
            pass.set_viewport(vx, vy, vw, vh, 0.0, 1.0);
            pass.set_scissor_rect(sx, sy, sw, sh);
            pass.draw_indexed(cmd.start_index..cmd.start_index + cmd.index_count, 0, 0..1);
        }
        self.encoder_dirty = true;
        true
    }

    fn upload_constants(&mut self, shader_id: ResourceId) {
        let version = self.constants_version;
        let stale = self
            .shaders
            .get(shader_id)
            .and_then(|s| s.resource().native())
            .is_some_and(|n| n.uploaded != Some(version));
        if !stale {
            return;
        }
        self.upload_barrier();

        let Some(shader) = self.shaders.get_mut(shader_id) else { return };
        let vertex = shader.vertex().pack_constants(&self.state.vertex_constants);
        let fragment = shader.fragment().pack_constants(&self.state.fragment_constants);
        let Some(native) = shader.resource_mut().native_mut() else { return };

        let queue = self.gpu.queue();
        queue.write_buffer(&native.vertex_constants, 0, &vertex);
        queue.write_buffer(&native.fragment_constants, 0, &fragment);
        native.uploaded = Some(version);
    }

    /// Builds the pipeline for `key` unless cached. `false` if the shader is gone.
    fn ensure_pipeline(&mut self, key: &PipelineKey) -> bool {
        if self.pipelines.contains(key) {
            return true;
        }
        if self.pipelines.is_rejected(key) {
            return false;
        }
        let polygon_mode = self.polygon_mode(key.fill_mode);

        let Some(shader) = self.shaders.get(key.shader) else { return false };
        let Some(native) = shader.resource().native() else { return false };
        let blend = key
            .blend_state
            .and_then(|id| self.blend_states.get(id))
            .and_then(|b| b.resource().native().copied())
            .unwrap_or(GpuBlend {
                blend: None,
                write_mask: wgpu::ColorWrites::ALL,
            });

        let source = PipelineSource {
            vertex_module: &native.vertex,
            vertex_entry: &shader.vertex().entry,
            fragment_module: &native.fragment,
            fragment_entry: &shader.fragment().entry,
            vertex_layout: shader.vertex_layout(),
            blend: blend.blend,
            write_mask: blend.write_mask,
            polygon_mode,
        };
        let device = self.gpu.device();
        let built = validated(device, "ember pipeline", |device| {
            PipelineCache::build(device, &self.layouts, key, &source)
        });
        let Some(pipeline) = built else {
            self.pipelines.reject(*key);
            return false;
        };
        self.pipelines.insert(*key, pipeline);
        log::debug!("wgpu: built pipeline for shader {} ({} cached)", key.shader, self.pipelines.len());
        true
    }

    /// Bind group 1 for the current texture layers. Missing, unfilterable, or
    /// currently-rendered-to textures sample the default white texel.
    fn texture_bind_group(&self, target: Option<TextureId>) -> wgpu::BindGroup {
        let layers: Vec<(&wgpu::TextureView, &wgpu::Sampler)> = self
            .state
            .textures
            .iter()
            .map(|slot| {
                slot.filter(|id| Some(*id) != target)
                    .and_then(|id| self.textures.get(id.resource()))
                    .filter(|t| convert::is_filterable(t.pixel_format()))
                    .and_then(|t| t.resource().native())
                    .map(|n| (&n.view, &n.sampler))
                    .unwrap_or((&self.default_view, &self.default_sampler))
            })
            .collect();

        let entries: Vec<wgpu::BindGroupEntry> = layers
            .iter()
            .enumerate()
            .flat_map(|(layer, (view, sampler))| {
                let binding = layer as u32 * 2;
                [
                    wgpu::BindGroupEntry {
                        binding,
                        resource: wgpu::BindingResource::TextureView(view),
                    },
                    wgpu::BindGroupEntry {
                        binding: binding + 1,
                        resource: wgpu::BindingResource::Sampler(sampler),
                    },
                ]
            })
            .collect();

        self.gpu.device().create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("ember textures bind group"),
            layout: &self.layouts.textures,
            entries: &entries,
        })
    }
}

impl CommandExecutor for WgpuExecutor<'_> {
    fn capabilities(&self) -> Capabilities {
        Capabilities::all() - Capabilities::BLIT - Capabilities::COMPUTE
    }

    fn execute(&mut self, command: &Command) {
        if matches!(command, Command::SetShaderConstants(_)) {
            self.constants_version += 1;
        }
        if self.state.apply(command) {
            return;
        }

        match command {
            Command::Present => self.present(),
            Command::InitRenderTarget(cmd) | Command::SetRenderTargetParameters(cmd) => {
                self.set_render_target_parameters(cmd)
            }
            Command::Clear(cmd) => self.clear(cmd),
            Command::Draw(cmd) => self.draw(cmd),

            Command::PushDebugMarker(cmd) => {
                if let Some(encoder) = self.encoder.as_mut() {
                    encoder.push_debug_group(&cmd.name);
                }
                self.markers.push(cmd.name.clone());
            }
            Command::PopDebugMarker => {
                if self.markers.pop().is_none() {
                    log::trace!("wgpu: unbalanced debug marker pop");
                } else if let Some(encoder) = self.encoder.as_mut() {
                    encoder.pop_debug_group();
                }
            }

            Command::InitBlendState(cmd) => self.init_blend_state(cmd),
            Command::InitBuffer(cmd) => self.init_buffer(cmd),
            Command::SetBufferData(cmd) => self.set_buffer_data(cmd),
            Command::InitShader(cmd) => self.init_shader(cmd),
            Command::InitTexture(cmd) => self.init_texture(cmd),
            Command::SetTextureData(cmd) => self.set_texture_data(cmd),
            Command::SetTextureParameters(cmd) => self.set_texture_parameters(cmd),
            Command::DeleteResource(cmd) => self.delete(cmd.resource),

            _ => {}
        }
    }
}

fn create_buffer(device: &wgpu::Device, usage: BufferUsage, capacity: usize) -> wgpu::Buffer {
    device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("ember buffer"),
        size: padded_len(capacity.max(1)) as u64,
        usage: convert::buffer_usages(usage),
        mapped_at_creation: false,
    })
}

/// Queue writes must be a multiple of 4 bytes long.
fn padded_len(len: usize) -> usize {
    len.next_multiple_of(wgpu::COPY_BUFFER_ALIGNMENT as usize)
}

fn write_buffer(queue: &wgpu::Queue, buffer: &wgpu::Buffer, data: &[u8]) {
    if data.is_empty() {
        return;
    }
    let len = padded_len(data.len());
    if len == data.len() {
        queue.write_buffer(buffer, 0, data);
    } else {
        let mut padded = data.to_vec();
        padded.resize(len, 0);
        queue.write_buffer(buffer, 0, &padded);
    }
}

fn create_depth_view(device: &wgpu::Device, size: Extent) -> wgpu::TextureView {
    device
        .create_texture(&wgpu::TextureDescriptor {
            label: Some("ember depth buffer"),
            size: wgpu::Extent3d {
                width: size.width,
                height: size.height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: DEPTH_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        })
        .create_view(&wgpu::TextureViewDescriptor::default())
}

/// Longest mip chain for `size`.
fn max_mip_levels(size: Extent) -> u32 {
    32 - size.width.max(size.height).max(1).leading_zeros()
}

fn create_texture<H>(device: &wgpu::Device, queue: &wgpu::Queue, res: &TextureResource<H>) -> Option<GpuTexture> {
    let size = res.size();
    if size.is_empty() {
        return None;
    }

    let format = convert::texture_format(res.pixel_format());
    let flags = res.flags();
    let mut usage = wgpu::TextureUsages::TEXTURE_BINDING;
    if !res.pixel_format().is_depth() {
        usage |= wgpu::TextureUsages::COPY_DST;
    }
    if flags.contains(TextureFlags::RENDER_TARGET) {
        usage |= wgpu::TextureUsages::RENDER_ATTACHMENT;
    }

    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("ember texture"),
        size: wgpu::Extent3d {
            width: size.width,
            height: size.height,
            depth_or_array_layers: 1,
        },
        mip_level_count: res.mip_level_count().min(max_mip_levels(size)),
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format,
        usage,
        view_formats: &[],
    });
    upload_levels(queue, &texture, res);

    let depth = flags
        .contains(TextureFlags::RENDER_TARGET | TextureFlags::DEPTH_BUFFER)
        .then(|| create_depth_view(device, size));

    Some(GpuTexture {
        view: texture.create_view(&wgpu::TextureViewDescriptor::default()),
        sampler: device.create_sampler(&convert::sampler_descriptor(res.sampler())),
        texture,
        depth,
    })
}

/// Writes every level that carries texels. Short levels are skipped with a warning.
fn upload_levels<H>(queue: &wgpu::Queue, texture: &wgpu::Texture, res: &TextureResource<H>) {
    let format = res.pixel_format();
    if format.is_depth() {
        return;
    }
    let bpp = format.bytes_per_pixel();
    let base = res.size();

    for (mip, level) in res.levels().iter().enumerate().take(texture.mip_level_count() as usize) {
        if level.data.is_empty() || level.size.is_empty() {
            continue;
        }
        let mip = mip as u32;
        let width = level.size.width.min((base.width >> mip).max(1));
        let height = level.size.height.min((base.height >> mip).max(1));
        let pitch = level.pitch.max(width * bpp);
        let needed = pitch as usize * (height as usize - 1) + (width * bpp) as usize;
        if level.data.len() < needed {
            log::warn!(
                "wgpu: texture level {mip} has {} bytes, needs {needed}; skipped",
                level.data.len()
            );
            continue;
        }

        queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture,
                mip_level: mip,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            &level.data,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(pitch),
                rows_per_image: Some(height),
            },
            wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
        );
    }
}

/// Runs `create` inside a validation error scope. `None` if wgpu rejected the object.
fn validated<T>(device: &wgpu::Device, what: &str, create: impl FnOnce(&wgpu::Device) -> T) -> Option<T> {
    let scope = device.push_error_scope(wgpu::ErrorFilter::Validation);
    let value = create(device);
    accept_validated(value, pollster::block_on(scope.pop()), what)
}

fn accept_validated<T>(value: T, error: Option<wgpu::Error>, what: &str) -> Option<T> {
    match error {
        None => Some(value),
        Some(err) => {
            log::warn!("wgpu: {what} rejected: {err}");
            None
        }
    }
}

fn target_rect(size: Extent) -> Rect {
    Rect::new(0.0, 0.0, size.width as f32, size.height as f32)
}

/// Viewport in target pixels, clamped to the target. `None` if nothing is left.
fn viewport_rect(viewport: Option<Rect>, size: Extent) -> Option<(f32, f32, f32, f32)> {
    let full = target_rect(size);
    let r = viewport.unwrap_or(full).intersect(full)?;
    Some((r.origin.x, r.origin.y, r.size.x, r.size.y))
}

/// Scissor in target pixels; the whole target when disabled. `None` if empty.
fn scissor_rect(scissor: Option<Rect>, size: Extent) -> Option<(u32, u32, u32, u32)> {
    let full = target_rect(size);
    let r = scissor.unwrap_or(full).intersect(full)?;
    let (x0, y0) = (r.origin.x as u32, r.origin.y as u32);
    let max = r.max();
    let (x1, y1) = (max.x as u32, max.y as u32);
    (x1 > x0 && y1 > y0).then_some((x0, y0, x1 - x0, y1 - y0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn viewport_defaults_to_target_and_clamps() {
        let size = Extent::new(800, 600);
        assert_eq!(viewport_rect(None, size), Some((0.0, 0.0, 800.0, 600.0)));
        assert_eq!(
            viewport_rect(Some(Rect::new(-10.0, 500.0, 100.0, 200.0)), size),
            Some((0.0, 500.0, 90.0, 100.0))
        );
        assert_eq!(viewport_rect(Some(Rect::new(900.0, 0.0, 10.0, 10.0)), size), None);
    }

    #[test]
    fn scissor_clamps_and_rejects_empty() {
        let size = Extent::new(100, 100);
        assert_eq!(scissor_rect(None, size), Some((0, 0, 100, 100)));
        assert_eq!(scissor_rect(Some(Rect::new(90.0, 90.0, 50.0, 50.0)), size), Some((90, 90, 10, 10)));
        assert_eq!(scissor_rect(Some(Rect::new(10.0, 10.0, 0.0, 5.0)), size), None);
        assert_eq!(scissor_rect(None, Extent::new(0, 10)), None);
    }

    fn validation_error(description: &str) -> wgpu::Error {
        wgpu::Error::Validation {
            source: Box::new(std::fmt::Error),
            description: description.to_owned(),
        }
    }

    #[test]
    fn rejected_objects_are_not_kept() {
        assert_eq!(accept_validated(7, None, "shader"), Some(7));
        assert_eq!(accept_validated(7, Some(validation_error("expected `fn`")), "shader"), None);
    }

    #[test]
    fn mip_chain_length() {
        assert_eq!(max_mip_levels(Extent::new(1, 1)), 1);
        assert_eq!(max_mip_levels(Extent::new(256, 64)), 9);
        assert_eq!(max_mip_levels(Extent::new(300, 2)), 9);
    }

    #[test]
    fn writes_pad_to_copy_alignment() {
        assert_eq!(padded_len(1), 4);
        assert_eq!(padded_len(8), 8);
        assert_eq!(padded_len(10), 12);
    }
}

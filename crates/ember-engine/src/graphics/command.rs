use std::collections::BTreeSet;

use crate::coords::{ColorRgba, Rect};

use super::blend::{BlendComponent, BlendDescriptor, ColorMask};
use super::buffer::{BufferFlags, BufferUsage};
use super::render_target::RenderTargetDescriptor;
use super::resource::{BlendStateId, BufferId, RenderTargetId, ResourceId, ShaderId, TextureId};
use super::shader::{ConstantInfo, ShaderStage, VertexAttribute};
use super::texture::{
    AddressMode, ClearParameters, Filter, SamplerParameters, TextureFlags, TextureLevel,
};
use super::types::{CullMode, DrawMode, Extent, FillMode, PixelFormat, TEXTURE_LAYERS};

/// Renderer-agnostic command stream consumed by a [`CommandExecutor`].
///
/// Commands are immutable once built and carry resource ids, never resources. An executor
/// applies them strictly in queue order.
///
/// Extending the stream:
/// - add a payload struct here
/// - add a variant and a [`CommandKind`]
/// - add a typed constructor to `Renderer`
/// - handle it in every executor
///
/// [`CommandExecutor`]: super::CommandExecutor
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Present,
    InitRenderTarget(RenderTargetParamsCmd),
    SetRenderTargetParameters(RenderTargetParamsCmd),
    SetRenderTarget(SetRenderTargetCmd),
    Clear(ClearCmd),
    Blit(BlitCmd),
    Compute(ComputeCmd),
    SetCullMode(SetCullModeCmd),
    SetFillMode(SetFillModeCmd),
    SetScissorTest(SetScissorTestCmd),
    SetViewport(SetViewportCmd),
    SetDepthState(SetDepthStateCmd),
    SetPipelineState(SetPipelineStateCmd),
    Draw(DrawCmd),
    PushDebugMarker(PushDebugMarkerCmd),
    PopDebugMarker,
    InitBlendState(InitBlendStateCmd),
    InitBuffer(InitBufferCmd),
    SetBufferData(SetBufferDataCmd),
    InitShader(InitShaderCmd),
    SetShaderConstants(SetShaderConstantsCmd),
    InitTexture(InitTextureCmd),
    SetTextureData(SetTextureDataCmd),
    SetTextureParameters(SetTextureParametersCmd),
    SetTextures(SetTexturesCmd),
    DeleteResource(DeleteResourceCmd),
}

/// Discriminant of [`Command`], used for capability checks and logging.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum CommandKind {
    Present,
    InitRenderTarget,
    SetRenderTargetParameters,
    SetRenderTarget,
    Clear,
    Blit,
    Compute,
    SetCullMode,
    SetFillMode,
    SetScissorTest,
    SetViewport,
    SetDepthState,
    SetPipelineState,
    Draw,
    PushDebugMarker,
    PopDebugMarker,
    InitBlendState,
    InitBuffer,
    SetBufferData,
    InitShader,
    SetShaderConstants,
    InitTexture,
    SetTextureData,
    SetTextureParameters,
    SetTextures,
    DeleteResource,
}

impl CommandKind {
    pub const ALL: [CommandKind; 26] = [
        CommandKind::Present,
        CommandKind::InitRenderTarget,
        CommandKind::SetRenderTargetParameters,
        CommandKind::SetRenderTarget,
        CommandKind::Clear,
        CommandKind::Blit,
        CommandKind::Compute,
        CommandKind::SetCullMode,
        CommandKind::SetFillMode,
        CommandKind::SetScissorTest,
        CommandKind::SetViewport,
        CommandKind::SetDepthState,
        CommandKind::SetPipelineState,
        CommandKind::Draw,
        CommandKind::PushDebugMarker,
        CommandKind::PopDebugMarker,
        CommandKind::InitBlendState,
        CommandKind::InitBuffer,
        CommandKind::SetBufferData,
        CommandKind::InitShader,
        CommandKind::SetShaderConstants,
        CommandKind::InitTexture,
        CommandKind::SetTextureData,
        CommandKind::SetTextureParameters,
        CommandKind::SetTextures,
        CommandKind::DeleteResource,
    ];
}

impl Command {
    pub fn kind(&self) -> CommandKind {
        match self {
            Command::Present => CommandKind::Present,
            Command::InitRenderTarget(_) => CommandKind::InitRenderTarget,
            Command::SetRenderTargetParameters(_) => CommandKind::SetRenderTargetParameters,
            Command::SetRenderTarget(_) => CommandKind::SetRenderTarget,
            Command::Clear(_) => CommandKind::Clear,
            Command::Blit(_) => CommandKind::Blit,
            Command::Compute(_) => CommandKind::Compute,
            Command::SetCullMode(_) => CommandKind::SetCullMode,
            Command::SetFillMode(_) => CommandKind::SetFillMode,
            Command::SetScissorTest(_) => CommandKind::SetScissorTest,
            Command::SetViewport(_) => CommandKind::SetViewport,
            Command::SetDepthState(_) => CommandKind::SetDepthState,
            Command::SetPipelineState(_) => CommandKind::SetPipelineState,
            Command::Draw(_) => CommandKind::Draw,
            Command::PushDebugMarker(_) => CommandKind::PushDebugMarker,
            Command::PopDebugMarker => CommandKind::PopDebugMarker,
            Command::InitBlendState(_) => CommandKind::InitBlendState,
            Command::InitBuffer(_) => CommandKind::InitBuffer,
            Command::SetBufferData(_) => CommandKind::SetBufferData,
            Command::InitShader(_) => CommandKind::InitShader,
            Command::SetShaderConstants(_) => CommandKind::SetShaderConstants,
            Command::InitTexture(_) => CommandKind::InitTexture,
            Command::SetTextureData(_) => CommandKind::SetTextureData,
            Command::SetTextureParameters(_) => CommandKind::SetTextureParameters,
            Command::SetTextures(_) => CommandKind::SetTextures,
            Command::DeleteResource(_) => CommandKind::DeleteResource,
        }
    }
}

// ── render targets ────────────────────────────────────────────────────────

/// Payload of `InitRenderTarget` and `SetRenderTargetParameters`.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderTargetParamsCmd {
    pub render_target: RenderTargetId,
    pub width: u32,
    pub height: u32,
    pub sample_count: u32,
    pub pixel_format: PixelFormat,
    pub clear: ClearParameters,
}

impl RenderTargetParamsCmd {
    pub fn new(
        render_target: RenderTargetId,
        width: u32,
        height: u32,
        sample_count: u32,
        pixel_format: PixelFormat,
    ) -> Self {
        Self {
            render_target,
            width,
            height,
            sample_count,
            pixel_format,
            clear: ClearParameters::default(),
        }
    }

    #[inline]
    pub fn with_clear(mut self, clear: ClearParameters) -> Self {
        self.clear = clear;
        self
    }

    pub fn descriptor(&self) -> RenderTargetDescriptor {
        RenderTargetDescriptor {
            size: Extent::new(self.width, self.height),
            sample_count: self.sample_count,
            pixel_format: self.pixel_format,
            clear: self.clear,
        }
    }
}

/// Selects the target of subsequent clears and draws. `None` is the back buffer.
#[derive(Debug, Clone, PartialEq)]
pub struct SetRenderTargetCmd {
    pub render_target: Option<TextureId>,
}

impl SetRenderTargetCmd {
    #[inline]
    pub fn new(render_target: Option<TextureId>) -> Self {
        Self { render_target }
    }
}

/// Clears a target using its clear parameters. `None` is the back buffer.
#[derive(Debug, Clone, PartialEq)]
pub struct ClearCmd {
    pub render_target: Option<TextureId>,
}

impl ClearCmd {
    #[inline]
    pub fn new(render_target: Option<TextureId>) -> Self {
        Self { render_target }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BlitCmd {
    pub source: TextureId,
    pub target: TextureId,
}

impl BlitCmd {
    #[inline]
    pub fn new(source: TextureId, target: TextureId) -> Self {
        Self { source, target }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ComputeCmd {
    pub shader: ShaderId,
}

impl ComputeCmd {
    #[inline]
    pub fn new(shader: ShaderId) -> Self {
        Self { shader }
    }
}

// ── raster state ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct SetCullModeCmd {
    pub cull_mode: CullMode,
}

impl SetCullModeCmd {
    #[inline]
    pub fn new(cull_mode: CullMode) -> Self {
        Self { cull_mode }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SetFillModeCmd {
    pub fill_mode: FillMode,
}

impl SetFillModeCmd {
    #[inline]
    pub fn new(fill_mode: FillMode) -> Self {
        Self { fill_mode }
    }
}

/// Scissor rect in physical pixels of the current target.
#[derive(Debug, Clone, PartialEq)]
pub struct SetScissorTestCmd {
    pub enabled: bool,
    pub rect: Rect,
}

impl SetScissorTestCmd {
    #[inline]
    pub fn new(enabled: bool, rect: Rect) -> Self {
        Self { enabled, rect }
    }
}

/// Viewport in physical pixels of the current target.
#[derive(Debug, Clone, PartialEq)]
pub struct SetViewportCmd {
    pub viewport: Rect,
}

impl SetViewportCmd {
    #[inline]
    pub fn new(viewport: Rect) -> Self {
        Self { viewport }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SetDepthStateCmd {
    pub depth_test: bool,
    pub depth_write: bool,
}

impl SetDepthStateCmd {
    #[inline]
    pub fn new(depth_test: bool, depth_write: bool) -> Self {
        Self { depth_test, depth_write }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SetPipelineStateCmd {
    pub blend_state: BlendStateId,
    pub shader: ShaderId,
}

impl SetPipelineStateCmd {
    #[inline]
    pub fn new(blend_state: BlendStateId, shader: ShaderId) -> Self {
        Self { blend_state, shader }
    }
}

/// Indexed draw using the active pipeline, textures and constants.
#[derive(Debug, Clone, PartialEq)]
pub struct DrawCmd {
    pub index_buffer: BufferId,
    pub index_count: u32,
    /// Bytes per index: 2 or 4.
    pub index_size: u32,
    pub vertex_buffer: BufferId,
    pub draw_mode: DrawMode,
    pub start_index: u32,
}

impl DrawCmd {
    #[inline]
    pub fn new(
        index_buffer: BufferId,
        index_count: u32,
        index_size: u32,
        vertex_buffer: BufferId,
        draw_mode: DrawMode,
        start_index: u32,
    ) -> Self {
        Self {
            index_buffer,
            index_count,
            index_size,
            vertex_buffer,
            draw_mode,
            start_index,
        }
    }
}

// ── debug markers ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct PushDebugMarkerCmd {
    pub name: String,
}

impl PushDebugMarkerCmd {
    #[inline]
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

// ── resources ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct InitBlendStateCmd {
    pub blend_state: BlendStateId,
    pub enable_blending: bool,
    pub color_blend: BlendComponent,
    pub alpha_blend: BlendComponent,
    pub color_mask: ColorMask,
}

impl InitBlendStateCmd {
    #[inline]
    pub fn new(
        blend_state: BlendStateId,
        enable_blending: bool,
        color_blend: BlendComponent,
        alpha_blend: BlendComponent,
        color_mask: ColorMask,
    ) -> Self {
        Self {
            blend_state,
            enable_blending,
            color_blend,
            alpha_blend,
            color_mask,
        }
    }

    pub fn from_descriptor(blend_state: BlendStateId, desc: BlendDescriptor) -> Self {
        Self::new(blend_state, desc.enabled, desc.color, desc.alpha, desc.color_mask)
    }

    pub fn descriptor(&self) -> BlendDescriptor {
        BlendDescriptor {
            enabled: self.enable_blending,
            color: self.color_blend,
            alpha: self.alpha_blend,
            color_mask: self.color_mask,
        }
    }
}

/// Creates a buffer. `size` reserves native capacity; it may exceed `data.len()`.
#[derive(Debug, Clone, PartialEq)]
pub struct InitBufferCmd {
    pub buffer: BufferId,
    pub usage: BufferUsage,
    pub flags: BufferFlags,
    pub data: Vec<u8>,
    pub size: usize,
}

impl InitBufferCmd {
    #[inline]
    pub fn new(buffer: BufferId, usage: BufferUsage, flags: BufferFlags, data: Vec<u8>, size: usize) -> Self {
        Self {
            buffer,
            usage,
            flags,
            data,
            size,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SetBufferDataCmd {
    pub buffer: BufferId,
    pub data: Vec<u8>,
}

impl SetBufferDataCmd {
    #[inline]
    pub fn new(buffer: BufferId, data: Vec<u8>) -> Self {
        Self { buffer, data }
    }
}

/// Creates a shader from vertex + fragment byte code.
///
/// Constant infos and data alignments default to empty/0 and entry functions to
/// `vs_main` / `fs_main`; use the `with_*` helpers to override.
#[derive(Debug, Clone, PartialEq)]
pub struct InitShaderCmd {
    pub shader: ShaderId,
    pub fragment_shader: Vec<u8>,
    pub vertex_shader: Vec<u8>,
    pub vertex_attributes: BTreeSet<VertexAttribute>,
    pub fragment_constant_info: Vec<ConstantInfo>,
    pub vertex_constant_info: Vec<ConstantInfo>,
    pub fragment_data_alignment: u32,
    pub vertex_data_alignment: u32,
    pub fragment_function: String,
    pub vertex_function: String,
}

impl InitShaderCmd {
    pub fn new(
        shader: ShaderId,
        fragment_shader: Vec<u8>,
        vertex_shader: Vec<u8>,
        vertex_attributes: BTreeSet<VertexAttribute>,
    ) -> Self {
        Self {
            shader,
            fragment_shader,
            vertex_shader,
            vertex_attributes,
            fragment_constant_info: Vec::new(),
            vertex_constant_info: Vec::new(),
            fragment_data_alignment: 0,
            vertex_data_alignment: 0,
            fragment_function: "fs_main".to_owned(),
            vertex_function: "vs_main".to_owned(),
        }
    }

    pub fn with_fragment_constants(mut self, infos: Vec<ConstantInfo>, data_alignment: u32) -> Self {
        self.fragment_constant_info = infos;
        self.fragment_data_alignment = data_alignment;
        self
    }

    pub fn with_vertex_constants(mut self, infos: Vec<ConstantInfo>, data_alignment: u32) -> Self {
        self.vertex_constant_info = infos;
        self.vertex_data_alignment = data_alignment;
        self
    }

    pub fn with_functions(mut self, fragment: impl Into<String>, vertex: impl Into<String>) -> Self {
        self.fragment_function = fragment.into();
        self.vertex_function = vertex.into();
        self
    }

    pub fn vertex_stage(&self) -> ShaderStage {
        ShaderStage::new(
            &self.vertex_shader,
            &self.vertex_function,
            &self.vertex_constant_info,
            self.vertex_data_alignment,
        )
    }

    pub fn fragment_stage(&self) -> ShaderStage {
        ShaderStage::new(
            &self.fragment_shader,
            &self.fragment_function,
            &self.fragment_constant_info,
            self.fragment_data_alignment,
        )
    }
}

/// Constant values for the active shader, one float list per declared constant.
#[derive(Debug, Clone, PartialEq)]
pub struct SetShaderConstantsCmd {
    pub fragment_constants: Vec<Vec<f32>>,
    pub vertex_constants: Vec<Vec<f32>>,
}

impl SetShaderConstantsCmd {
    #[inline]
    pub fn new(fragment_constants: Vec<Vec<f32>>, vertex_constants: Vec<Vec<f32>>) -> Self {
        Self {
            fragment_constants,
            vertex_constants,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct InitTextureCmd {
    pub texture: TextureId,
    pub levels: Vec<TextureLevel>,
    pub flags: TextureFlags,
    pub sample_count: u32,
    pub pixel_format: PixelFormat,
}

impl InitTextureCmd {
    #[inline]
    pub fn new(
        texture: TextureId,
        levels: Vec<TextureLevel>,
        flags: TextureFlags,
        sample_count: u32,
        pixel_format: PixelFormat,
    ) -> Self {
        Self {
            texture,
            levels,
            flags,
            sample_count,
            pixel_format,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SetTextureDataCmd {
    pub texture: TextureId,
    pub levels: Vec<TextureLevel>,
}

impl SetTextureDataCmd {
    #[inline]
    pub fn new(texture: TextureId, levels: Vec<TextureLevel>) -> Self {
        Self { texture, levels }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SetTextureParametersCmd {
    pub texture: TextureId,
    pub filter: Filter,
    pub address_x: AddressMode,
    pub address_y: AddressMode,
    pub max_anisotropy: u32,
    pub clear_color_buffer: bool,
    pub clear_depth_buffer: bool,
    pub clear_color: ColorRgba,
    pub clear_depth: f32,
}

impl SetTextureParametersCmd {
    pub fn new(texture: TextureId, sampler: SamplerParameters, clear: ClearParameters) -> Self {
        Self {
            texture,
            filter: sampler.filter,
            address_x: sampler.address_x,
            address_y: sampler.address_y,
            max_anisotropy: sampler.max_anisotropy,
            clear_color_buffer: clear.clear_color_buffer,
            clear_depth_buffer: clear.clear_depth_buffer,
            clear_color: clear.clear_color,
            clear_depth: clear.clear_depth,
        }
    }

    pub fn sampler(&self) -> SamplerParameters {
        SamplerParameters {
            filter: self.filter,
            address_x: self.address_x,
            address_y: self.address_y,
            max_anisotropy: self.max_anisotropy,
        }
    }

    pub fn clear(&self) -> ClearParameters {
        ClearParameters {
            clear_color_buffer: self.clear_color_buffer,
            clear_depth_buffer: self.clear_depth_buffer,
            clear_color: self.clear_color,
            clear_depth: self.clear_depth,
        }
    }
}

/// Binds up to [`TEXTURE_LAYERS`] textures; `None` layers sample a 1x1 white texel.
#[derive(Debug, Clone, PartialEq)]
pub struct SetTexturesCmd {
    pub textures: [Option<TextureId>; TEXTURE_LAYERS],
}

impl SetTexturesCmd {
    #[inline]
    pub fn new(textures: [Option<TextureId>; TEXTURE_LAYERS]) -> Self {
        Self { textures }
    }
}

/// Destroys a resource. Must follow every command that references it.
#[derive(Debug, Clone, PartialEq)]
pub struct DeleteResourceCmd {
    pub resource: ResourceId,
}

impl DeleteResourceCmd {
    #[inline]
    pub fn new(resource: impl Into<ResourceId>) -> Self {
        Self {
            resource: resource.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn texture_parameters_split_back_into_groups() {
        let reg = crate::graphics::ResourceRegistry::new();
        let tex = TextureId::from_resource(reg.allocate(TextureId::KIND));
        let sampler = SamplerParameters {
            filter: Filter::Trilinear,
            address_x: AddressMode::Repeat,
            address_y: AddressMode::MirrorRepeat,
            max_anisotropy: 8,
        };
        let clear = ClearParameters {
            clear_color_buffer: false,
            clear_depth_buffer: true,
            clear_color: ColorRgba::WHITE,
            clear_depth: 0.25,
        };

        let cmd = SetTextureParametersCmd::new(tex, sampler, clear);
        assert_eq!(cmd.sampler(), sampler);
        assert_eq!(cmd.clear(), clear);
    }
}

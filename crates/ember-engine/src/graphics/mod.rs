//! Rendering command layer.
//!
//! Engine logic records [`Command`]s through a [`Renderer`]; a backend implementing
//! [`CommandExecutor`] realizes them later, possibly on another thread, strictly in
//! recording order.
//!
//! - Resources are named by generational ids ([`ResourceId`]) handed out by a shared
//!   [`ResourceRegistry`]. Commands never own resources.
//! - A batch travels from producer to consumer through a [`QueueSwap`].
//! - [`EmptyExecutor`] is the null backend; the wgpu backend lives in `crate::render`.

mod blend;
mod buffer;
pub mod command;
pub mod empty;
mod executor;
mod queue;
mod render_target;
mod renderer;
mod resource;
mod shader;
mod state;
mod texture;
mod types;

pub use blend::{BlendComponent, BlendDescriptor, BlendFactor, BlendOperation, BlendStateResource, ColorMask};
pub use buffer::{BufferFlags, BufferResource, BufferUsage};
pub use command::{Command, CommandKind};
pub use empty::{EmptyExecutor, EmptyHandle, EmptyStats};
pub use executor::{Capabilities, CommandExecutor, execute_queue};
pub use queue::{CommandQueue, QueueSwap};
pub use render_target::{RenderTargetDescriptor, RenderTargetResource};
pub use renderer::{Renderer, RendererConfig};
pub use resource::{
    BlendStateId, BufferId, RenderResource, RenderTargetId, ResourceId, ResourceKind, ResourceRegistry,
    ResourceState, ResourceTable, ShaderId, TextureId,
};
pub use shader::{
    AttributeFormat, AttributeSlot, ConstantInfo, ConstantLayout, ConstantType, ShaderResource, ShaderStage,
    VertexAttribute, VertexLayout,
};
pub use state::RenderState;
pub use texture::{
    AddressMode, ClearParameters, Filter, SamplerParameters, TextureFlags, TextureLevel, TextureResource,
};
pub use types::{CullMode, DrawMode, Extent, FillMode, PixelFormat, TEXTURE_LAYERS};

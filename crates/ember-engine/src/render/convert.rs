//! Engine graphics enums to wgpu.

use crate::graphics::{
    AddressMode, AttributeFormat, BlendComponent, BlendDescriptor, BlendFactor, BlendOperation,
    BufferUsage, ColorMask, CullMode, DrawMode, Filter, PixelFormat, SamplerParameters,
};

pub(super) fn texture_format(format: PixelFormat) -> wgpu::TextureFormat {
    use wgpu::TextureFormat as T;
    match format {
        PixelFormat::R8Unorm => T::R8Unorm,
        PixelFormat::R8Snorm => T::R8Snorm,
        PixelFormat::Rg8Unorm => T::Rg8Unorm,
        PixelFormat::Rg8Snorm => T::Rg8Snorm,
        PixelFormat::Rgba8Unorm => T::Rgba8Unorm,
        PixelFormat::Rgba8UnormSrgb => T::Rgba8UnormSrgb,
        PixelFormat::Rgba8Snorm => T::Rgba8Snorm,
        PixelFormat::Bgra8Unorm => T::Bgra8Unorm,
        PixelFormat::Bgra8UnormSrgb => T::Bgra8UnormSrgb,
        PixelFormat::R16Float => T::R16Float,
        PixelFormat::Rg16Float => T::Rg16Float,
        PixelFormat::Rgba16Float => T::Rgba16Float,
        PixelFormat::R32Float => T::R32Float,
        PixelFormat::Rg32Float => T::Rg32Float,
        PixelFormat::Rgba32Float => T::Rgba32Float,
        PixelFormat::Depth32Float => T::Depth32Float,
    }
}

/// Whether textures of `format` can be bound to the filtering texture slots.
pub(super) fn is_filterable(format: PixelFormat) -> bool {
    !matches!(
        format,
        PixelFormat::R32Float | PixelFormat::Rg32Float | PixelFormat::Rgba32Float | PixelFormat::Depth32Float
    )
}

pub(super) fn buffer_usages(usage: BufferUsage) -> wgpu::BufferUsages {
    let base = match usage {
        BufferUsage::Vertex => wgpu::BufferUsages::VERTEX,
        BufferUsage::Index => wgpu::BufferUsages::INDEX,
        BufferUsage::Constant => wgpu::BufferUsages::UNIFORM,
    };
    base | wgpu::BufferUsages::COPY_DST
}

pub(super) fn index_format(index_size: u32) -> Option<wgpu::IndexFormat> {
    match index_size {
        2 => Some(wgpu::IndexFormat::Uint16),
        4 => Some(wgpu::IndexFormat::Uint32),
        _ => None,
    }
}

pub(super) fn topology(mode: DrawMode) -> wgpu::PrimitiveTopology {
    match mode {
        DrawMode::PointList => wgpu::PrimitiveTopology::PointList,
        DrawMode::LineList => wgpu::PrimitiveTopology::LineList,
        DrawMode::LineStrip => wgpu::PrimitiveTopology::LineStrip,
        DrawMode::TriangleList => wgpu::PrimitiveTopology::TriangleList,
        DrawMode::TriangleStrip => wgpu::PrimitiveTopology::TriangleStrip,
    }
}

pub(super) fn is_strip(mode: DrawMode) -> bool {
    matches!(mode, DrawMode::LineStrip | DrawMode::TriangleStrip)
}

pub(super) fn cull_face(mode: CullMode) -> Option<wgpu::Face> {
    match mode {
        CullMode::None => None,
        CullMode::Front => Some(wgpu::Face::Front),
        CullMode::Back => Some(wgpu::Face::Back),
    }
}

pub(super) fn vertex_format(format: AttributeFormat) -> wgpu::VertexFormat {
    match format {
        AttributeFormat::Float32 => wgpu::VertexFormat::Float32,
        AttributeFormat::Float32x2 => wgpu::VertexFormat::Float32x2,
        AttributeFormat::Float32x3 => wgpu::VertexFormat::Float32x3,
        AttributeFormat::Float32x4 => wgpu::VertexFormat::Float32x4,
        AttributeFormat::Unorm8x4 => wgpu::VertexFormat::Unorm8x4,
        AttributeFormat::Uint8x4 => wgpu::VertexFormat::Uint8x4,
    }
}

fn blend_factor(factor: BlendFactor) -> wgpu::BlendFactor {
    use wgpu::BlendFactor as F;
    match factor {
        BlendFactor::Zero => F::Zero,
        BlendFactor::One => F::One,
        BlendFactor::SrcColor => F::Src,
        BlendFactor::InvSrcColor => F::OneMinusSrc,
        BlendFactor::SrcAlpha => F::SrcAlpha,
        BlendFactor::InvSrcAlpha => F::OneMinusSrcAlpha,
        BlendFactor::DestAlpha => F::DstAlpha,
        BlendFactor::InvDestAlpha => F::OneMinusDstAlpha,
        BlendFactor::DestColor => F::Dst,
        BlendFactor::InvDestColor => F::OneMinusDst,
        BlendFactor::SrcAlphaSat => F::SrcAlphaSaturated,
        BlendFactor::BlendFactor => F::Constant,
        BlendFactor::InvBlendFactor => F::OneMinusConstant,
    }
}

fn blend_operation(op: BlendOperation) -> wgpu::BlendOperation {
    match op {
        BlendOperation::Add => wgpu::BlendOperation::Add,
        BlendOperation::Subtract => wgpu::BlendOperation::Subtract,
        BlendOperation::RevSubtract => wgpu::BlendOperation::ReverseSubtract,
        BlendOperation::Min => wgpu::BlendOperation::Min,
        BlendOperation::Max => wgpu::BlendOperation::Max,
    }
}

fn blend_component(c: BlendComponent) -> wgpu::BlendComponent {
    // wgpu rejects factors other than One for Min/Max.
    let (src, dst) = match c.operation {
        BlendOperation::Min | BlendOperation::Max => (BlendFactor::One, BlendFactor::One),
        _ => (c.src, c.dst),
    };
    wgpu::BlendComponent {
        src_factor: blend_factor(src),
        dst_factor: blend_factor(dst),
        operation: blend_operation(c.operation),
    }
}

/// `None` for a disabled blend state, which wgpu treats as replace.
pub(super) fn blend_state(desc: &BlendDescriptor) -> Option<wgpu::BlendState> {
    desc.enabled.then(|| wgpu::BlendState {
        color: blend_component(desc.color),
        alpha: blend_component(desc.alpha),
    })
}

pub(super) fn color_writes(mask: ColorMask) -> wgpu::ColorWrites {
    let mut writes = wgpu::ColorWrites::empty();
    for (channel, write) in [
        (ColorMask::RED, wgpu::ColorWrites::RED),
        (ColorMask::GREEN, wgpu::ColorWrites::GREEN),
        (ColorMask::BLUE, wgpu::ColorWrites::BLUE),
        (ColorMask::ALPHA, wgpu::ColorWrites::ALPHA),
    ] {
        if mask.contains(channel) {
            writes |= write;
        }
    }
    writes
}

fn address_mode(mode: AddressMode) -> wgpu::AddressMode {
    match mode {
        AddressMode::ClampToEdge => wgpu::AddressMode::ClampToEdge,
        AddressMode::Repeat => wgpu::AddressMode::Repeat,
        AddressMode::MirrorRepeat => wgpu::AddressMode::MirrorRepeat,
    }
}

/// Sampler for `params`. `Filter::Default` samples linearly; anisotropy only applies
/// to trilinear filtering.
pub(super) fn sampler_descriptor(params: SamplerParameters) -> wgpu::SamplerDescriptor<'static> {
    let (filter, mipmap_filter) = match params.filter {
        Filter::Point => (wgpu::FilterMode::Nearest, wgpu::MipmapFilterMode::Nearest),
        Filter::Default | Filter::Linear | Filter::Bilinear => {
            (wgpu::FilterMode::Linear, wgpu::MipmapFilterMode::Nearest)
        }
        Filter::Trilinear => (wgpu::FilterMode::Linear, wgpu::MipmapFilterMode::Linear),
    };
    let anisotropy_clamp = match params.filter {
        Filter::Trilinear => params.max_anisotropy.clamp(1, 16) as u16,
        _ => 1,
    };

    wgpu::SamplerDescriptor {
        label: Some("ember texture sampler"),
        address_mode_u: address_mode(params.address_x),
        address_mode_v: address_mode(params.address_y),
        address_mode_w: wgpu::AddressMode::ClampToEdge,
        mag_filter: filter,
        min_filter: filter,
        mipmap_filter,
        anisotropy_clamp,
        ..Default::default()
    }
}

pub(super) fn clear_color(c: crate::coords::ColorRgba) -> wgpu::Color {
    wgpu::Color {
        r: f64::from(c.r),
        g: f64::from(c.g),
        b: f64::from(c.b),
        a: f64::from(c.a),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disabled_blend_is_replace() {
        assert!(blend_state(&BlendDescriptor::default()).is_none());
        let alpha = blend_state(&BlendDescriptor::ALPHA_BLENDING).unwrap();
        assert_eq!(alpha.color.dst_factor, wgpu::BlendFactor::OneMinusSrcAlpha);
    }

    #[test]
    fn min_max_force_unit_factors() {
        let c = blend_component(BlendComponent::new(
            BlendFactor::SrcAlpha,
            BlendFactor::Zero,
            BlendOperation::Max,
        ));
        assert_eq!((c.src_factor, c.dst_factor), (wgpu::BlendFactor::One, wgpu::BlendFactor::One));
    }

    #[test]
    fn color_mask_maps_channels() {
        assert_eq!(color_writes(ColorMask::ALL), wgpu::ColorWrites::ALL);
        assert_eq!(
            color_writes(ColorMask::RED | ColorMask::ALPHA),
            wgpu::ColorWrites::RED | wgpu::ColorWrites::ALPHA
        );
    }

    #[test]
    fn anisotropy_needs_trilinear() {
        let mut params = SamplerParameters {
            max_anisotropy: 8,
            ..Default::default()
        };
        assert_eq!(sampler_descriptor(params).anisotropy_clamp, 1);
        params.filter = Filter::Trilinear;
        assert_eq!(sampler_descriptor(params).anisotropy_clamp, 8);
        params.filter = Filter::Point;
        assert_eq!(sampler_descriptor(params).mag_filter, wgpu::FilterMode::Nearest);
    }

    #[test]
    fn index_sizes() {
        assert_eq!(index_format(2), Some(wgpu::IndexFormat::Uint16));
        assert_eq!(index_format(4), Some(wgpu::IndexFormat::Uint32));
        assert_eq!(index_format(1), None);
    }

    #[test]
    fn float32_formats_are_not_filterable() {
        assert!(is_filterable(PixelFormat::Rgba8Unorm));
        assert!(!is_filterable(PixelFormat::Rgba32Float));
        assert!(!is_filterable(PixelFormat::Depth32Float));
    }
}

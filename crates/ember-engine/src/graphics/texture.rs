use bitflags::bitflags;

use crate::coords::ColorRgba;

use super::resource::{RenderResource, ResourceId};
use super::types::{Extent, PixelFormat};

bitflags! {
    /// How a texture may be used beyond plain sampling.
    #[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default)]
    pub struct TextureFlags: u32 {
        const DYNAMIC = 1 << 0;
        const RENDER_TARGET = 1 << 1;
        /// Render target also carries a depth attachment.
        const DEPTH_BUFFER = 1 << 2;
        const BINDABLE_COLOR_BUFFER = 1 << 3;
        const BINDABLE_DEPTH_BUFFER = 1 << 4;
    }
}

/// Sampler filtering. `Default` defers to the executor's configured filter.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Default)]
pub enum Filter {
    #[default]
    Default,
    Point,
    Linear,
    Bilinear,
    Trilinear,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Default)]
pub enum AddressMode {
    #[default]
    ClampToEdge,
    Repeat,
    MirrorRepeat,
}

/// One mip level: its extent, row pitch in bytes, and texels.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TextureLevel {
    pub size: Extent,
    pub pitch: u32,
    pub data: Vec<u8>,
}

impl TextureLevel {
    pub fn new(size: Extent, format: PixelFormat, data: Vec<u8>) -> Self {
        Self {
            size,
            pitch: size.width * format.bytes_per_pixel(),
            data,
        }
    }

    /// Builds a full mip chain description for `size` with empty texel payloads
    /// (used for render targets, whose contents the GPU produces).
    pub fn chain(size: Extent, format: PixelFormat, count: u32) -> Vec<TextureLevel> {
        let mut levels = Vec::with_capacity(count as usize);
        let mut level_size = size;
        for _ in 0..count.max(1) {
            levels.push(TextureLevel::new(level_size, format, Vec::new()));
            if level_size.width <= 1 && level_size.height <= 1 {
                break;
            }
            level_size = Extent::new((level_size.width / 2).max(1), (level_size.height / 2).max(1));
        }
        levels
    }
}

/// Sampler state applied by `SetTextureParameters`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct SamplerParameters {
    pub filter: Filter,
    pub address_x: AddressMode,
    pub address_y: AddressMode,
    pub max_anisotropy: u32,
}

impl Default for SamplerParameters {
    fn default() -> Self {
        Self {
            filter: Filter::Default,
            address_x: AddressMode::ClampToEdge,
            address_y: AddressMode::ClampToEdge,
            max_anisotropy: 1,
        }
    }
}

/// What a clear of a render target writes.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct ClearParameters {
    pub clear_color_buffer: bool,
    pub clear_depth_buffer: bool,
    pub clear_color: ColorRgba,
    pub clear_depth: f32,
}

impl Default for ClearParameters {
    fn default() -> Self {
        Self {
            clear_color_buffer: true,
            clear_depth_buffer: false,
            clear_color: ColorRgba::BLACK,
            clear_depth: 1.0,
        }
    }
}

/// Backend-independent texture state kept by every executor.
#[derive(Debug)]
pub struct TextureResource<H = ()> {
    resource: RenderResource<H>,
    levels: Vec<TextureLevel>,
    flags: TextureFlags,
    sample_count: u32,
    pixel_format: PixelFormat,
    sampler: SamplerParameters,
    clear: ClearParameters,
}

impl<H> TextureResource<H> {
    pub fn new(id: ResourceId) -> Self {
        Self {
            resource: RenderResource::new(id),
            levels: Vec::new(),
            flags: TextureFlags::empty(),
            sample_count: 1,
            pixel_format: PixelFormat::default(),
            sampler: SamplerParameters::default(),
            clear: ClearParameters::default(),
        }
    }

    pub fn init(
        &mut self,
        levels: &[TextureLevel],
        flags: TextureFlags,
        sample_count: u32,
        pixel_format: PixelFormat,
    ) {
        self.levels = levels.to_vec();
        self.flags = flags;
        self.sample_count = sample_count.max(1);
        self.pixel_format = pixel_format;
    }

    /// Replaces the mip chain. Returns `true` when the base extent or level count
    /// changed, meaning the native texture has to be recreated.
    pub fn set_data(&mut self, levels: &[TextureLevel]) -> bool {
        let reshaped = self.size() != levels.first().map(|l| l.size).unwrap_or_default()
            || self.levels.len() != levels.len();
        self.levels = levels.to_vec();
        reshaped
    }

    pub fn set_parameters(&mut self, sampler: SamplerParameters, clear: ClearParameters) {
        self.sampler = sampler;
        self.clear = clear;
    }

    /// Extent of the base level (zero when no level was supplied).
    pub fn size(&self) -> Extent {
        self.levels.first().map(|l| l.size).unwrap_or_default()
    }

    #[inline]
    pub fn levels(&self) -> &[TextureLevel] {
        &self.levels
    }

    #[inline]
    pub fn mip_level_count(&self) -> u32 {
        self.levels.len().max(1) as u32
    }

    #[inline]
    pub fn flags(&self) -> TextureFlags {
        self.flags
    }

    #[inline]
    pub fn sample_count(&self) -> u32 {
        self.sample_count
    }

    #[inline]
    pub fn pixel_format(&self) -> PixelFormat {
        self.pixel_format
    }

    #[inline]
    pub fn sampler(&self) -> SamplerParameters {
        self.sampler
    }

    #[inline]
    pub fn clear(&self) -> ClearParameters {
        self.clear
    }

    #[inline]
    pub fn resource(&self) -> &RenderResource<H> {
        &self.resource
    }

    #[inline]
    pub fn resource_mut(&mut self) -> &mut RenderResource<H> {
        &mut self.resource
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graphics::resource::{ResourceKind, ResourceRegistry};

    #[test]
    fn mip_chain_halves_until_one() {
        let chain = TextureLevel::chain(Extent::new(8, 2), PixelFormat::Rgba8Unorm, 16);
        let sizes: Vec<_> = chain.iter().map(|l| (l.size.width, l.size.height)).collect();
        assert_eq!(sizes, vec![(8, 2), (4, 1), (2, 1), (1, 1)]);
        assert_eq!(chain[0].pitch, 32);
    }

    #[test]
    fn set_data_detects_reshape() {
        let reg = ResourceRegistry::new();
        let mut tex: TextureResource = TextureResource::new(reg.allocate(ResourceKind::Texture));
        let fmt = PixelFormat::Rgba8Unorm;
        tex.init(&[TextureLevel::new(Extent::new(2, 2), fmt, vec![0; 16])], TextureFlags::DYNAMIC, 1, fmt);

        assert!(!tex.set_data(&[TextureLevel::new(Extent::new(2, 2), fmt, vec![1; 16])]));
        assert!(tex.set_data(&[TextureLevel::new(Extent::new(4, 4), fmt, vec![1; 64])]));
        assert_eq!(tex.size(), Extent::new(4, 4));
    }

    #[test]
    fn zero_sample_count_is_one() {
        let reg = ResourceRegistry::new();
        let mut tex: TextureResource = TextureResource::new(reg.allocate(ResourceKind::Texture));
        tex.init(&[], TextureFlags::empty(), 0, PixelFormat::R8Unorm);
        assert_eq!(tex.sample_count(), 1);
        assert_eq!(tex.mip_level_count(), 1);
    }
}

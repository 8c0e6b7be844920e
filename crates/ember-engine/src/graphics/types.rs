/// Number of texture layers a pipeline can sample from at once.
pub const TEXTURE_LAYERS: usize = 4;

/// Face culling applied to subsequent draws.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Default)]
pub enum CullMode {
    #[default]
    None,
    Front,
    Back,
}

/// Polygon rasterization mode applied to subsequent draws.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Default)]
pub enum FillMode {
    #[default]
    Solid,
    Wireframe,
}

/// Primitive topology of a draw call.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Default)]
pub enum DrawMode {
    PointList,
    LineList,
    LineStrip,
    #[default]
    TriangleList,
    TriangleStrip,
}

/// Texel layout of textures and render targets.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Default)]
pub enum PixelFormat {
    R8Unorm,
    R8Snorm,
    Rg8Unorm,
    Rg8Snorm,
    #[default]
    Rgba8Unorm,
    Rgba8UnormSrgb,
    Rgba8Snorm,
    Bgra8Unorm,
    Bgra8UnormSrgb,
    R16Float,
    Rg16Float,
    Rgba16Float,
    R32Float,
    Rg32Float,
    Rgba32Float,
    Depth32Float,
}

impl PixelFormat {
    /// Size of one texel in bytes.
    pub const fn bytes_per_pixel(self) -> u32 {
        match self {
            PixelFormat::R8Unorm | PixelFormat::R8Snorm => 1,
            PixelFormat::Rg8Unorm | PixelFormat::Rg8Snorm | PixelFormat::R16Float => 2,
            PixelFormat::Rgba8Unorm
            | PixelFormat::Rgba8UnormSrgb
            | PixelFormat::Rgba8Snorm
            | PixelFormat::Bgra8Unorm
            | PixelFormat::Bgra8UnormSrgb
            | PixelFormat::Rg16Float
            | PixelFormat::R32Float
            | PixelFormat::Depth32Float => 4,
            PixelFormat::Rgba16Float | PixelFormat::Rg32Float => 8,
            PixelFormat::Rgba32Float => 16,
        }
    }

    #[inline]
    pub const fn is_depth(self) -> bool {
        matches!(self, PixelFormat::Depth32Float)
    }
}

/// Width/height pair in physical pixels.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Default)]
pub struct Extent {
    pub width: u32,
    pub height: u32,
}

impl Extent {
    #[inline]
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    #[inline]
    pub const fn is_empty(self) -> bool {
        self.width == 0 || self.height == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pixel_sizes_follow_format() {
        assert_eq!(PixelFormat::R8Unorm.bytes_per_pixel(), 1);
        assert_eq!(PixelFormat::Rgba8Unorm.bytes_per_pixel(), 4);
        assert_eq!(PixelFormat::Rgba32Float.bytes_per_pixel(), 16);
    }

    #[test]
    fn zero_dimension_is_empty() {
        assert!(Extent::new(0, 16).is_empty());
        assert!(Extent::new(16, 0).is_empty());
        assert!(!Extent::new(1, 1).is_empty());
    }
}

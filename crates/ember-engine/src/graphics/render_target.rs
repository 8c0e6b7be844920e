use super::resource::{RenderResource, ResourceId};
use super::texture::ClearParameters;
use super::types::{Extent, PixelFormat};

/// Description of a presentable target (the window back buffer).
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct RenderTargetDescriptor {
    pub size: Extent,
    pub sample_count: u32,
    pub pixel_format: PixelFormat,
    pub clear: ClearParameters,
}

impl Default for RenderTargetDescriptor {
    fn default() -> Self {
        Self {
            size: Extent::default(),
            sample_count: 1,
            pixel_format: PixelFormat::Bgra8UnormSrgb,
            clear: ClearParameters::default(),
        }
    }
}

/// Backend-independent render target state kept by every executor.
#[derive(Debug)]
pub struct RenderTargetResource<H = ()> {
    resource: RenderResource<H>,
    descriptor: RenderTargetDescriptor,
}

impl<H> RenderTargetResource<H> {
    pub fn new(id: ResourceId) -> Self {
        Self {
            resource: RenderResource::new(id),
            descriptor: RenderTargetDescriptor::default(),
        }
    }

    /// Applies new parameters. Returns `true` when size, sample count or format
    /// changed (the backend must reconfigure its attachments).
    pub fn set_parameters(&mut self, mut descriptor: RenderTargetDescriptor) -> bool {
        descriptor.sample_count = descriptor.sample_count.max(1);
        let reshaped = descriptor.size != self.descriptor.size
            || descriptor.sample_count != self.descriptor.sample_count
            || descriptor.pixel_format != self.descriptor.pixel_format;
        self.descriptor = descriptor;
        reshaped
    }

    #[inline]
    pub fn descriptor(&self) -> &RenderTargetDescriptor {
        &self.descriptor
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
    fn only_shape_changes_reshape() {
        let reg = ResourceRegistry::new();
        let mut rt: RenderTargetResource = RenderTargetResource::new(reg.allocate(ResourceKind::RenderTarget));

        let desc = RenderTargetDescriptor {
            size: Extent::new(800, 600),
            ..Default::default()
        };
        assert!(rt.set_parameters(desc));

        let mut recolored = desc;
        recolored.clear.clear_depth = 0.5;
        assert!(!rt.set_parameters(recolored));
        assert_eq!(rt.descriptor().clear.clear_depth, 0.5);

        let mut resized = desc;
        resized.size = Extent::new(1024, 768);
        assert!(rt.set_parameters(resized));
    }
}

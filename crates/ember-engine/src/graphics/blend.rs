use bitflags::bitflags;

use super::resource::{RenderResource, ResourceId};

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum BlendFactor {
    Zero,
    One,
    SrcColor,
    InvSrcColor,
    SrcAlpha,
    InvSrcAlpha,
    DestAlpha,
    InvDestAlpha,
    DestColor,
    InvDestColor,
    SrcAlphaSat,
    BlendFactor,
    InvBlendFactor,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Default)]
pub enum BlendOperation {
    #[default]
    Add,
    Subtract,
    RevSubtract,
    Min,
    Max,
}

bitflags! {
    /// Color channels written by draws.
    #[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
    pub struct ColorMask: u8 {
        const RED = 1 << 0;
        const GREEN = 1 << 1;
        const BLUE = 1 << 2;
        const ALPHA = 1 << 3;
        const ALL = Self::RED.bits() | Self::GREEN.bits() | Self::BLUE.bits() | Self::ALPHA.bits();
    }
}

impl Default for ColorMask {
    fn default() -> Self {
        ColorMask::ALL
    }
}

/// Source/destination factors and operation for one channel group.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct BlendComponent {
    pub src: BlendFactor,
    pub dst: BlendFactor,
    pub operation: BlendOperation,
}

impl BlendComponent {
    pub const REPLACE: Self = Self {
        src: BlendFactor::One,
        dst: BlendFactor::Zero,
        operation: BlendOperation::Add,
    };

    pub const fn new(src: BlendFactor, dst: BlendFactor, operation: BlendOperation) -> Self {
        Self { src, dst, operation }
    }
}

impl Default for BlendComponent {
    fn default() -> Self {
        Self::REPLACE
    }
}

/// Full blend description; `enabled == false` means plain replace.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Default)]
pub struct BlendDescriptor {
    pub enabled: bool,
    pub color: BlendComponent,
    pub alpha: BlendComponent,
    pub color_mask: ColorMask,
}

impl BlendDescriptor {
    /// Straight-alpha "over" compositing.
    pub const ALPHA_BLENDING: Self = Self {
        enabled: true,
        color: BlendComponent::new(BlendFactor::SrcAlpha, BlendFactor::InvSrcAlpha, BlendOperation::Add),
        alpha: BlendComponent::new(BlendFactor::One, BlendFactor::InvSrcAlpha, BlendOperation::Add),
        color_mask: ColorMask::ALL,
    };

    pub const ADDITIVE: Self = Self {
        enabled: true,
        color: BlendComponent::new(BlendFactor::One, BlendFactor::One, BlendOperation::Add),
        alpha: BlendComponent::new(BlendFactor::One, BlendFactor::One, BlendOperation::Add),
        color_mask: ColorMask::ALL,
    };
}

/// Backend-independent blend state kept by every executor.
#[derive(Debug)]
pub struct BlendStateResource<H = ()> {
    resource: RenderResource<H>,
    descriptor: BlendDescriptor,
}

impl<H> BlendStateResource<H> {
    pub fn new(id: ResourceId) -> Self {
        Self {
            resource: RenderResource::new(id),
            descriptor: BlendDescriptor::default(),
        }
    }

    pub fn init(&mut self, descriptor: BlendDescriptor) {
        self.descriptor = descriptor;
    }

    #[inline]
    pub fn descriptor(&self) -> &BlendDescriptor {
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

use bitflags::bitflags;

use super::resource::{RenderResource, ResourceId};

/// What a buffer is bound as.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Default)]
pub enum BufferUsage {
    #[default]
    Vertex,
    Index,
    Constant,
}

bitflags! {
    /// Update-frequency hints for a buffer.
    #[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default)]
    pub struct BufferFlags: u32 {
        /// Contents are rewritten often (typically every frame).
        const DYNAMIC = 1 << 0;
        /// Contents are written once at init.
        const STATIC = 1 << 1;
    }
}

/// Backend-independent buffer state kept by every executor.
///
/// `data` is the authoritative CPU copy. The backend uploads from it, and `size()`
/// reports exactly its length. The native allocation may be larger
/// (see [`BufferResource::capacity`]).
#[derive(Debug)]
pub struct BufferResource<H = ()> {
    resource: RenderResource<H>,
    usage: BufferUsage,
    flags: BufferFlags,
    data: Vec<u8>,
    capacity: usize,
}

impl<H> BufferResource<H> {
    pub fn new(id: ResourceId) -> Self {
        Self {
            resource: RenderResource::new(id),
            usage: BufferUsage::default(),
            flags: BufferFlags::empty(),
            data: Vec::new(),
            capacity: 0,
        }
    }

    /// Applies an init payload. Returns the byte capacity the native buffer needs.
    pub fn init(&mut self, usage: BufferUsage, flags: BufferFlags, data: &[u8], size: usize) -> usize {
        self.usage = usage;
        self.flags = flags;
        self.data = data.to_vec();
        self.capacity = size.max(self.data.len());
        self.capacity
    }

    /// Replaces the CPU copy. Returns `true` when the native buffer must grow.
    pub fn set_data(&mut self, data: &[u8]) -> bool {
        self.data.clear();
        self.data.extend_from_slice(data);

        if self.data.len() > self.capacity {
            self.capacity = self.data.len();
            true
        } else {
            false
        }
    }

    #[inline]
    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// Native allocation size in bytes; at least `size()`.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    #[inline]
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    #[inline]
    pub fn usage(&self) -> BufferUsage {
        self.usage
    }

    #[inline]
    pub fn flags(&self) -> BufferFlags {
        self.flags
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

    fn buffer() -> BufferResource {
        let reg = ResourceRegistry::new();
        BufferResource::new(reg.allocate(ResourceKind::Buffer))
    }

    #[test]
    fn size_tracks_last_payload() {
        let mut buf = buffer();
        buf.init(BufferUsage::Vertex, BufferFlags::DYNAMIC, &[0; 12], 64);
        assert_eq!(buf.size(), 12);

        for len in [0usize, 3, 200, 7, 64] {
            buf.set_data(&vec![0xAB; len]);
            assert_eq!(buf.size(), len);
        }
    }

    #[test]
    fn reserved_size_is_capacity_not_size() {
        let mut buf = buffer();
        let cap = buf.init(BufferUsage::Index, BufferFlags::empty(), &[1, 2], 128);
        assert_eq!(cap, 128);
        assert_eq!(buf.capacity(), 128);
        assert_eq!(buf.size(), 2);
    }

    #[test]
    fn init_capacity_covers_oversized_payload() {
        let mut buf = buffer();
        let cap = buf.init(BufferUsage::Constant, BufferFlags::empty(), &[0; 40], 16);
        assert_eq!(cap, 40);
    }

    #[test]
    fn set_data_reports_growth() {
        let mut buf = buffer();
        buf.init(BufferUsage::Vertex, BufferFlags::DYNAMIC, &[], 8);
        assert!(!buf.set_data(&[0; 8]));
        assert!(buf.set_data(&[0; 9]));
        assert_eq!(buf.capacity(), 9);
        assert!(!buf.set_data(&[0; 2]));
        assert_eq!(buf.capacity(), 9);
    }
}

use std::collections::BTreeSet;

use super::resource::{RenderResource, ResourceId};

/// Per-vertex input a shader consumes.
///
/// The declaration order is the canonical vertex layout order: a shader's attribute set
/// is iterated in this order to build shader locations and buffer offsets.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub enum VertexAttribute {
    Position,
    Color,
    TexCoord0,
    TexCoord1,
    Normal,
    Tangent,
    Binormal,
    BlendWeight,
    BlendIndices,
    PointSize,
}

/// Storage format of one vertex attribute inside the vertex buffer.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum AttributeFormat {
    Float32,
    Float32x2,
    Float32x3,
    Float32x4,
    Unorm8x4,
    Uint8x4,
}

impl AttributeFormat {
    pub const fn byte_size(self) -> u32 {
        match self {
            AttributeFormat::Float32 | AttributeFormat::Unorm8x4 | AttributeFormat::Uint8x4 => 4,
            AttributeFormat::Float32x2 => 8,
            AttributeFormat::Float32x3 => 12,
            AttributeFormat::Float32x4 => 16,
        }
    }
}

impl VertexAttribute {
    pub const fn format(self) -> AttributeFormat {
        match self {
            VertexAttribute::Position
            | VertexAttribute::Normal
            | VertexAttribute::Tangent
            | VertexAttribute::Binormal => AttributeFormat::Float32x3,
            VertexAttribute::Color => AttributeFormat::Unorm8x4,
            VertexAttribute::TexCoord0 | VertexAttribute::TexCoord1 => AttributeFormat::Float32x2,
            VertexAttribute::BlendWeight => AttributeFormat::Float32x4,
            VertexAttribute::BlendIndices => AttributeFormat::Uint8x4,
            VertexAttribute::PointSize => AttributeFormat::Float32,
        }
    }
}

/// Attribute with its resolved byte offset and shader location.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct AttributeSlot {
    pub attribute: VertexAttribute,
    pub offset: u32,
    pub location: u32,
}

/// Interleaved vertex layout derived from an attribute set.
#[derive(Debug, Clone, Eq, PartialEq, Default)]
pub struct VertexLayout {
    pub stride: u32,
    pub slots: Vec<AttributeSlot>,
}

impl VertexLayout {
    pub fn from_attributes(attributes: &BTreeSet<VertexAttribute>) -> Self {
        let mut offset = 0;
        let slots = attributes
            .iter()
            .enumerate()
            .map(|(location, &attribute)| {
                let slot = AttributeSlot {
                    attribute,
                    offset,
                    location: location as u32,
                };
                offset += attribute.format().byte_size();
                slot
            })
            .collect();

        Self { stride: offset, slots }
    }
}

/// Type of a shader constant.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum ConstantType {
    Float,
    Vec2,
    Vec3,
    Vec4,
    Mat3,
    Mat4,
}

impl ConstantType {
    /// Column count and rows per column.
    const fn shape(self) -> (u32, u32) {
        match self {
            ConstantType::Float => (1, 1),
            ConstantType::Vec2 => (1, 2),
            ConstantType::Vec3 => (1, 3),
            ConstantType::Vec4 => (1, 4),
            ConstantType::Mat3 => (3, 3),
            ConstantType::Mat4 => (4, 4),
        }
    }

    /// Number of floats a caller supplies for this constant.
    pub const fn component_count(self) -> usize {
        let (cols, rows) = self.shape();
        (cols * rows) as usize
    }

    /// Uniform-block alignment in bytes.
    pub const fn alignment(self) -> u32 {
        match self {
            ConstantType::Float => 4,
            ConstantType::Vec2 => 8,
            _ => 16,
        }
    }

    /// Bytes between matrix columns (or the vector size for non-matrices).
    const fn column_stride(self) -> u32 {
        match self {
            ConstantType::Mat3 | ConstantType::Mat4 => 16,
            _ => self.shape().1 * 4,
        }
    }

    /// Bytes one constant occupies in the uniform block.
    pub const fn byte_size(self) -> u32 {
        let (cols, _) = self.shape();
        match self {
            ConstantType::Vec3 => 12,
            _ => cols * self.column_stride(),
        }
    }
}

/// Name and type of one shader constant; constants are laid out in declaration order.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct ConstantInfo {
    pub name: String,
    pub ty: ConstantType,
}

impl ConstantInfo {
    pub fn new(name: impl Into<String>, ty: ConstantType) -> Self {
        Self { name: name.into(), ty }
    }
}

#[inline]
fn align_up(value: u32, alignment: u32) -> u32 {
    if alignment <= 1 {
        value
    } else {
        value.div_ceil(alignment) * alignment
    }
}

/// Byte layout of a constant block.
#[derive(Debug, Clone, Eq, PartialEq, Default)]
pub struct ConstantLayout {
    pub offsets: Vec<u32>,
    pub size: u32,
}

impl ConstantLayout {
    /// Lays out `infos` in order. The block size is rounded up to `data_alignment`
    /// and to 16 bytes, the minimum uniform binding size.
    pub fn new(infos: &[ConstantInfo], data_alignment: u32) -> Self {
        let mut offset = 0;
        let mut offsets = Vec::with_capacity(infos.len());
        for info in infos {
            offset = align_up(offset, info.ty.alignment());
            offsets.push(offset);
            offset += info.ty.byte_size();
        }

        let size = align_up(align_up(offset, data_alignment), 16).max(16);
        Self { offsets, size }
    }

    /// Writes `values` (one float list per constant) into a block of `self.size` bytes.
    ///
    /// Missing trailing constants stay zeroed. Extra floats beyond a constant's
    /// component count are ignored.
    pub fn pack(&self, infos: &[ConstantInfo], values: &[Vec<f32>]) -> Vec<u8> {
        let mut block = vec![0u8; self.size as usize];

        for ((info, &offset), value) in infos.iter().zip(&self.offsets).zip(values) {
            let (cols, rows) = info.ty.shape();
            let stride = info.ty.column_stride();
            for col in 0..cols {
                let start = (col * rows) as usize;
                let end = (start + rows as usize).min(value.len());
                if start >= end {
                    break;
                }
                let bytes: &[u8] = bytemuck::cast_slice(&value[start..end]);
                let dst = (offset + col * stride) as usize;
                block[dst..dst + bytes.len()].copy_from_slice(bytes);
            }
        }

        block
    }
}

/// One shader stage: byte code, entry function and constant layout.
#[derive(Debug, Clone, Default)]
pub struct ShaderStage {
    pub code: Vec<u8>,
    pub entry: String,
    pub constants: Vec<ConstantInfo>,
    pub data_alignment: u32,
    pub layout: ConstantLayout,
}

impl ShaderStage {
    pub fn new(code: &[u8], entry: &str, constants: &[ConstantInfo], data_alignment: u32) -> Self {
        Self {
            code: code.to_vec(),
            entry: entry.to_owned(),
            constants: constants.to_vec(),
            data_alignment,
            layout: ConstantLayout::new(constants, data_alignment),
        }
    }

    /// Byte code as UTF-8 source text, if it is text.
    pub fn source(&self) -> Option<&str> {
        std::str::from_utf8(&self.code).ok()
    }

    pub fn pack_constants(&self, values: &[Vec<f32>]) -> Vec<u8> {
        self.layout.pack(&self.constants, values)
    }
}

/// Backend-independent shader state kept by every executor.
#[derive(Debug)]
pub struct ShaderResource<H = ()> {
    resource: RenderResource<H>,
    vertex: ShaderStage,
    fragment: ShaderStage,
    attributes: BTreeSet<VertexAttribute>,
    vertex_layout: VertexLayout,
}

impl<H> ShaderResource<H> {
    pub fn new(id: ResourceId) -> Self {
        Self {
            resource: RenderResource::new(id),
            vertex: ShaderStage::default(),
            fragment: ShaderStage::default(),
            attributes: BTreeSet::new(),
            vertex_layout: VertexLayout::default(),
        }
    }

    pub fn init(
        &mut self,
        vertex: ShaderStage,
        fragment: ShaderStage,
        attributes: &BTreeSet<VertexAttribute>,
    ) {
        self.vertex = vertex;
        self.fragment = fragment;
        self.attributes = attributes.clone();
        self.vertex_layout = VertexLayout::from_attributes(attributes);
    }

    #[inline]
    pub fn vertex(&self) -> &ShaderStage {
        &self.vertex
    }

    #[inline]
    pub fn fragment(&self) -> &ShaderStage {
        &self.fragment
    }

    #[inline]
    pub fn attributes(&self) -> &BTreeSet<VertexAttribute> {
        &self.attributes
    }

    #[inline]
    pub fn vertex_layout(&self) -> &VertexLayout {
        &self.vertex_layout
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

    fn floats(block: &[u8]) -> Vec<f32> {
        block
            .chunks_exact(4)
            .map(|c| f32::from_ne_bytes([c[0], c[1], c[2], c[3]]))
            .collect()
    }

    #[test]
    fn layout_follows_attribute_order() {
        // Insertion order does not matter; the set is ordered.
        let attrs: BTreeSet<_> = [VertexAttribute::TexCoord0, VertexAttribute::Position, VertexAttribute::Color]
            .into_iter()
            .collect();
        let layout = VertexLayout::from_attributes(&attrs);

        let order: Vec<_> = layout.slots.iter().map(|s| (s.attribute, s.offset, s.location)).collect();
        assert_eq!(
            order,
            vec![
                (VertexAttribute::Position, 0, 0),
                (VertexAttribute::Color, 12, 1),
                (VertexAttribute::TexCoord0, 16, 2),
            ]
        );
        assert_eq!(layout.stride, 24);
    }

    #[test]
    fn constant_offsets_respect_alignment() {
        let infos = [
            ConstantInfo::new("alpha", ConstantType::Float),
            ConstantInfo::new("tint", ConstantType::Vec4),
            ConstantInfo::new("uv", ConstantType::Vec2),
        ];
        let layout = ConstantLayout::new(&infos, 0);
        assert_eq!(layout.offsets, vec![0, 16, 32]);
        assert_eq!(layout.size, 48);
    }

    #[test]
    fn empty_block_has_minimum_size() {
        let layout = ConstantLayout::new(&[], 0);
        assert_eq!(layout.size, 16);
    }

    #[test]
    fn mat3_columns_are_padded() {
        let infos = [ConstantInfo::new("m", ConstantType::Mat3)];
        let layout = ConstantLayout::new(&infos, 0);
        assert_eq!(layout.size, 48);

        let values = vec![(1..=9).map(|v| v as f32).collect::<Vec<_>>()];
        let block = layout.pack(&infos, &values);
        let floats = floats(&block);
        assert_eq!(&floats[0..3], &[1.0, 2.0, 3.0]);
        assert_eq!(floats[3], 0.0);
        assert_eq!(&floats[4..7], &[4.0, 5.0, 6.0]);
        assert_eq!(&floats[8..11], &[7.0, 8.0, 9.0]);
    }

    #[test]
    fn pack_tolerates_short_input() {
        let infos = [
            ConstantInfo::new("a", ConstantType::Vec4),
            ConstantInfo::new("b", ConstantType::Vec4),
        ];
        let layout = ConstantLayout::new(&infos, 256);
        assert_eq!(layout.size, 256);

        let block = layout.pack(&infos, &[vec![1.0, 2.0]]);
        let floats = floats(&block);
        assert_eq!(&floats[0..4], &[1.0, 2.0, 0.0, 0.0]);
        assert!(floats[4..].iter().all(|&f| f == 0.0));
    }
}

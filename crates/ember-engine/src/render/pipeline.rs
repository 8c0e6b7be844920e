use std::collections::{HashMap, HashSet};

use crate::graphics::{CullMode, DrawMode, FillMode, ResourceId, TEXTURE_LAYERS, VertexLayout};

use super::convert;

/// Format of the depth attachment of every depth-enabled target.
pub(super) const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

/// Bind group layouts shared by every pipeline.
///
/// Group 0 holds the shader constants: binding 0 is the vertex block, binding 1 the
/// fragment block. Group 1 holds the texture layers: layer `i` is a 2D float texture at
/// binding `2 * i` and its filtering sampler at binding `2 * i + 1`.
pub(super) struct BindLayouts {
    pub constants: wgpu::BindGroupLayout,
    pub textures: wgpu::BindGroupLayout,
    pub pipeline: wgpu::PipelineLayout,
}

impl BindLayouts {
    pub fn new(device: &wgpu::Device) -> Self {
        let uniform = |binding, visibility| wgpu::BindGroupLayoutEntry {
            binding,
            visibility,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        };

        let constants = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("ember constants bgl"),
            entries: &[
                uniform(0, wgpu::ShaderStages::VERTEX),
                uniform(1, wgpu::ShaderStages::FRAGMENT),
            ],
        });

        let texture_entries: Vec<wgpu::BindGroupLayoutEntry> = (0..TEXTURE_LAYERS as u32)
            .flat_map(|layer| {
                [
                    wgpu::BindGroupLayoutEntry {
                        binding: layer * 2,
                        visibility: wgpu::ShaderStages::FRAGMENT,
                        ty: wgpu::BindingType::Texture {
                            sample_type: wgpu::TextureSampleType::Float { filterable: true },
                            view_dimension: wgpu::TextureViewDimension::D2,
                            multisampled: false,
                        },
                        count: None,
                    },
                    wgpu::BindGroupLayoutEntry {
                        binding: layer * 2 + 1,
                        visibility: wgpu::ShaderStages::FRAGMENT,
                        ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                        count: None,
                    },
                ]
            })
            .collect();

        let textures = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("ember textures bgl"),
            entries: &texture_entries,
        });

        let pipeline = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("ember pipeline layout"),
            bind_group_layouts: &[&constants, &textures],
            immediate_size: 0,
        });

        Self {
            constants,
            textures,
            pipeline,
        }
    }
}

/// Everything a render pipeline depends on.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub(super) struct PipelineKey {
    pub shader: ResourceId,
    pub blend_state: Option<ResourceId>,
    pub cull_mode: CullMode,
    pub fill_mode: FillMode,
    /// `(test, write)`; `None` when the target has no depth attachment.
    pub depth: Option<(bool, bool)>,
    pub draw_mode: DrawMode,
    pub strip_index_format: Option<wgpu::IndexFormat>,
    pub color_format: wgpu::TextureFormat,
}

/// Compiled state a pipeline is built from; the executor resolves it from resources.
pub(super) struct PipelineSource<'a> {
    pub vertex_module: &'a wgpu::ShaderModule,
    pub vertex_entry: &'a str,
    pub fragment_module: &'a wgpu::ShaderModule,
    pub fragment_entry: &'a str,
    pub vertex_layout: &'a VertexLayout,
    pub blend: Option<wgpu::BlendState>,
    pub write_mask: wgpu::ColorWrites,
    pub polygon_mode: wgpu::PolygonMode,
}

/// Render pipelines keyed by [`PipelineKey`], plus keys wgpu refused to build.
#[derive(Default)]
pub(super) struct PipelineCache {
    pipelines: HashMap<PipelineKey, wgpu::RenderPipeline>,
    rejected: HashSet<PipelineKey>,
}

impl PipelineCache {
    pub fn get(&self, key: &PipelineKey) -> Option<&wgpu::RenderPipeline> {
        self.pipelines.get(key)
    }

    pub fn contains(&self, key: &PipelineKey) -> bool {
        self.pipelines.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.pipelines.len()
    }

    pub fn insert(&mut self, key: PipelineKey, pipeline: wgpu::RenderPipeline) {
        self.pipelines.insert(key, pipeline);
    }

    /// Remembers a key whose pipeline failed validation so it is not rebuilt every draw.
    pub fn reject(&mut self, key: PipelineKey) {
        self.rejected.insert(key);
    }

    pub fn is_rejected(&self, key: &PipelineKey) -> bool {
        self.rejected.contains(key)
    }

    /// Drops every pipeline built from `id` (a shader or a blend state).
    pub fn evict(&mut self, id: ResourceId) {
        let uses = |key: &PipelineKey| key.shader == id || key.blend_state == Some(id);
        self.pipelines.retain(|key, _| !uses(key));
        self.rejected.retain(|key| !uses(key));
    }

    pub fn build(
        device: &wgpu::Device,
        layouts: &BindLayouts,
        key: &PipelineKey,
        source: &PipelineSource<'_>,
    ) -> wgpu::RenderPipeline {
        let attributes: Vec<wgpu::VertexAttribute> = source
            .vertex_layout
            .slots
            .iter()
            .map(|slot| wgpu::VertexAttribute {
                format: convert::vertex_format(slot.attribute.format()),
                offset: u64::from(slot.offset),
                shader_location: slot.location,
            })
            .collect();

        let buffers = [wgpu::VertexBufferLayout {
            array_stride: u64::from(source.vertex_layout.stride),
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &attributes,
        }];
        let buffers: &[wgpu::VertexBufferLayout] = if attributes.is_empty() { &[] } else { &buffers };

        let depth_stencil = key.depth.map(|(test, write)| wgpu::DepthStencilState {
            format: DEPTH_FORMAT,
            depth_write_enabled: write,
            depth_compare: if test {
                wgpu::CompareFunction::LessEqual
            } else {
                wgpu::CompareFunction::Always
            },
            stencil: wgpu::StencilState::default(),
            bias: wgpu::DepthBiasState::default(),
        });

        device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("ember pipeline"),
            layout: Some(&layouts.pipeline),
            vertex: wgpu::VertexState {
                module: source.vertex_module,
                entry_point: Some(source.vertex_entry),
                compilation_options: Default::default(),
                buffers,
            },
            fragment: Some(wgpu::FragmentState {
                module: source.fragment_module,
                entry_point: Some(source.fragment_entry),
                compilation_options: Default::default(),
                targets: &[Some(wgpu::ColorTargetState {
                    format: key.color_format,
                    blend: source.blend,
                    write_mask: source.write_mask,
                })],
            }),
            primitive: wgpu::PrimitiveState {
                topology: convert::topology(key.draw_mode),
                strip_index_format: key.strip_index_format,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: convert::cull_face(key.cull_mode),
                polygon_mode: source.polygon_mode,
                unclipped_depth: false,
                conservative: false,
            },
            depth_stencil,
            multisample: wgpu::MultisampleState::default(),
            multiview_mask: None,
            cache: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graphics::{ResourceKind, ResourceRegistry};

    fn key(shader: ResourceId, blend_state: Option<ResourceId>) -> PipelineKey {
        PipelineKey {
            shader,
            blend_state,
            cull_mode: CullMode::None,
            fill_mode: FillMode::Solid,
            depth: None,
            draw_mode: DrawMode::TriangleList,
            strip_index_format: None,
            color_format: wgpu::TextureFormat::Bgra8UnormSrgb,
        }
    }

    #[test]
    fn rejected_keys_stay_rejected_until_evicted() {
        let registry = ResourceRegistry::new();
        let shader = registry.allocate(ResourceKind::Shader);
        let other = registry.allocate(ResourceKind::Shader);
        let blend = registry.allocate(ResourceKind::BlendState);

        let mut cache = PipelineCache::default();
        cache.reject(key(shader, None));
        cache.reject(key(other, Some(blend)));
        assert!(cache.is_rejected(&key(shader, None)));
        assert!(!cache.is_rejected(&key(shader, Some(blend))));

        cache.evict(shader);
        assert!(!cache.is_rejected(&key(shader, None)));
        assert!(cache.is_rejected(&key(other, Some(blend))));

        cache.evict(blend);
        assert!(!cache.is_rejected(&key(other, Some(blend))));
        assert_eq!(cache.len(), 0);
    }
}

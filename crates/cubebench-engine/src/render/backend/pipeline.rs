use cubebench_core::geometry::{VertexFormat, VertexLayout};
use cubebench_core::handle::ProgramHandle;

use super::resources::ProgramEntry;
use super::shader::{FRAGMENT_ENTRY, VERTEX_ENTRY};
use super::DEPTH_FORMAT;

fn vertex_format(format: VertexFormat) -> wgpu::VertexFormat {
    match format {
        VertexFormat::Float32x2 => wgpu::VertexFormat::Float32x2,
        VertexFormat::Float32x3 => wgpu::VertexFormat::Float32x3,
        VertexFormat::Float32x4 => wgpu::VertexFormat::Float32x4,
    }
}

pub(crate) fn vertex_attributes(layout: &VertexLayout) -> Vec<wgpu::VertexAttribute> {
    layout
        .attributes
        .iter()
        .map(|a| wgpu::VertexAttribute {
            format: vertex_format(a.format),
            offset: a.offset,
            shader_location: a.location,
        })
        .collect()
}

struct CachedPipeline {
    program: ProgramHandle,
    vertices: VertexLayout,
    instances: Option<VertexLayout>,
    pipeline: wgpu::RenderPipeline,
}

/// Render pipelines keyed by program and stream layouts.
///
/// A handful of entries at most, so lookup is a linear scan. Slots are never
/// reordered: an index stays valid until its program is destroyed.
#[derive(Default)]
pub(crate) struct PipelineCache {
    slots: Vec<Option<CachedPipeline>>,
}

impl PipelineCache {
    pub fn find(
        &self,
        program: ProgramHandle,
        vertices: &VertexLayout,
        instances: Option<&VertexLayout>,
    ) -> Option<usize> {
        self.slots.iter().position(|slot| {
            slot.as_ref().is_some_and(|c| {
                c.program == program && &c.vertices == vertices && c.instances.as_ref() == instances
            })
        })
    }

    pub fn get(&self, index: usize) -> Option<&wgpu::RenderPipeline> {
        self.slots.get(index)?.as_ref().map(|c| &c.pipeline)
    }

    /// Returns the cached pipeline index, building the pipeline on a miss.
    pub fn get_or_create(
        &mut self,
        device: &wgpu::Device,
        surface_format: wgpu::TextureFormat,
        program: ProgramHandle,
        entry: &ProgramEntry,
        vertices: &VertexLayout,
        instances: Option<&VertexLayout>,
    ) -> usize {
        if let Some(index) = self.find(program, vertices, instances) {
            return index;
        }

        let pipeline = create_pipeline(device, surface_format, entry, vertices, instances);
        log::debug!(
            "pipeline for {program} ({}, instanced: {})",
            entry.label,
            instances.is_some()
        );
        let cached = CachedPipeline {
            program,
            vertices: vertices.clone(),
            instances: instances.cloned(),
            pipeline,
        };
        match self.slots.iter().position(Option::is_none) {
            Some(free) => {
                self.slots[free] = Some(cached);
                free
            }
            None => {
                self.slots.push(Some(cached));
                self.slots.len() - 1
            }
        }
    }

    /// Drops every pipeline built for `program`.
    pub fn evict(&mut self, program: ProgramHandle) {
        for slot in &mut self.slots {
            if slot.as_ref().is_some_and(|c| c.program == program) {
                *slot = None;
            }
        }
    }

    pub fn len(&self) -> usize {
        self.slots.iter().flatten().count()
    }
}

fn create_pipeline(
    device: &wgpu::Device,
    surface_format: wgpu::TextureFormat,
    entry: &ProgramEntry,
    vertices: &VertexLayout,
    instances: Option<&VertexLayout>,
) -> wgpu::RenderPipeline {
    let vertex_attrs = vertex_attributes(vertices);
    let instance_attrs = instances.map(vertex_attributes).unwrap_or_default();

    let mut buffers = vec![wgpu::VertexBufferLayout {
        array_stride: vertices.stride,
        step_mode: wgpu::VertexStepMode::Vertex,
        attributes: &vertex_attrs,
    }];
    if let Some(instances) = instances {
        buffers.push(wgpu::VertexBufferLayout {
            array_stride: instances.stride,
            step_mode: wgpu::VertexStepMode::Instance,
            attributes: &instance_attrs,
        });
    }

    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(&entry.label),
        layout: Some(&entry.layout),

        vertex: wgpu::VertexState {
            module: &entry.vertex,
            entry_point: Some(VERTEX_ENTRY),
            compilation_options: Default::default(),
            buffers: &buffers,
        },

        fragment: Some(wgpu::FragmentState {
            module: &entry.fragment,
            entry_point: Some(FRAGMENT_ENTRY),
            compilation_options: Default::default(),
            targets: &[Some(wgpu::ColorTargetState {
                format: surface_format,
                blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                write_mask: wgpu::ColorWrites::ALL,
            })],
        }),

        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            strip_index_format: None,
            front_face: wgpu::FrontFace::Ccw,
            cull_mode: Some(wgpu::Face::Back),
            polygon_mode: wgpu::PolygonMode::Fill,
            unclipped_depth: false,
            conservative: false,
        },

        depth_stencil: Some(wgpu::DepthStencilState {
            format: DEPTH_FORMAT,
            depth_write_enabled: true,
            depth_compare: wgpu::CompareFunction::Less,
            stencil: wgpu::StencilState::default(),
            bias: wgpu::DepthBiasState::default(),
        }),
        multisample: wgpu::MultisampleState::default(),

        multiview_mask: None,
        cache: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mesh_layout_maps_to_wgpu_attributes() {
        let attrs = vertex_attributes(&VertexLayout::mesh());
        let summary: Vec<_> = attrs
            .iter()
            .map(|a| (a.shader_location, a.offset, a.format))
            .collect();
        assert_eq!(
            summary,
            vec![
                (0, 0, wgpu::VertexFormat::Float32x3),
                (1, 12, wgpu::VertexFormat::Float32x3),
                (2, 24, wgpu::VertexFormat::Float32x2),
            ]
        );
    }

    #[test]
    fn instance_offset_uses_its_location() {
        let attrs = vertex_attributes(&VertexLayout::instance_offset(3));
        assert_eq!(attrs.len(), 1);
        assert_eq!(attrs[0].shader_location, 3);
        assert_eq!(attrs[0].format, wgpu::VertexFormat::Float32x3);
    }

    #[test]
    fn empty_cache_finds_nothing() {
        let cache = PipelineCache::default();
        assert_eq!(cache.find(ProgramHandle(1), &VertexLayout::mesh(), None), None);
        assert!(cache.get(0).is_none());
        assert_eq!(cache.len(), 0);
    }
}

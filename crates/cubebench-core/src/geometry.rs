//! Vertex layouts, CPU mesh data and the uploaded [`GeometryResource`].

use std::ops::Range;

use bytemuck::{Pod, Zeroable};
use glam::Vec3;

use crate::device::{
    BufferDesc, BufferUsage, DrawCall, IndexFormat, IndexStream, RenderDevice, VertexStream,
};
use crate::error::ResourceError;
use crate::handle::BufferHandle;

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum VertexFormat {
    Float32x2,
    Float32x3,
    Float32x4,
}

impl VertexFormat {
    pub const fn size(self) -> u64 {
        match self {
            VertexFormat::Float32x2 => 8,
            VertexFormat::Float32x3 => 12,
            VertexFormat::Float32x4 => 16,
        }
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum VertexSemantic {
    Position,
    Normal,
    TexCoord,
    InstanceOffset,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct VertexAttribute {
    pub semantic: VertexSemantic,
    pub format: VertexFormat,
    pub offset: u64,
    /// Shader input location.
    pub location: u32,
}

/// Byte layout of one vertex (or one instance) in a stream.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct VertexLayout {
    pub stride: u64,
    pub attributes: Vec<VertexAttribute>,
}

impl VertexLayout {
    /// Layout of [`Vertex`]: position, normal and uv at locations 0, 1, 2.
    pub fn mesh() -> Self {
        Self {
            stride: std::mem::size_of::<Vertex>() as u64,
            attributes: vec![
                VertexAttribute {
                    semantic: VertexSemantic::Position,
                    format: VertexFormat::Float32x3,
                    offset: 0,
                    location: 0,
                },
                VertexAttribute {
                    semantic: VertexSemantic::Normal,
                    format: VertexFormat::Float32x3,
                    offset: 12,
                    location: 1,
                },
                VertexAttribute {
                    semantic: VertexSemantic::TexCoord,
                    format: VertexFormat::Float32x2,
                    offset: 24,
                    location: 2,
                },
            ],
        }
    }

    pub fn position_only() -> Self {
        Self {
            stride: 12,
            attributes: vec![VertexAttribute {
                semantic: VertexSemantic::Position,
                format: VertexFormat::Float32x3,
                offset: 0,
                location: 0,
            }],
        }
    }

    /// One tightly packed `vec3` world offset per instance.
    pub fn instance_offset(location: u32) -> Self {
        Self {
            stride: 12,
            attributes: vec![VertexAttribute {
                semantic: VertexSemantic::InstanceOffset,
                format: VertexFormat::Float32x3,
                offset: 0,
                location,
            }],
        }
    }

    pub fn attribute(&self, semantic: VertexSemantic) -> Option<&VertexAttribute> {
        self.attributes.iter().find(|a| a.semantic == semantic)
    }
}

#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub uv: [f32; 2],
}

/// Indexed triangle list on the CPU.
#[derive(Debug, Clone, PartialEq)]
pub struct MeshData {
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u16>,
}

impl MeshData {
    /// Cube of edge 1 centred on the origin: 4 vertices per face, counter-clockwise
    /// when seen from outside.
    pub fn unit_cube() -> Self {
        // (normal, u axis, v axis) with u x v = normal.
        let faces = [
            (Vec3::X, Vec3::NEG_Z, Vec3::Y),
            (Vec3::NEG_X, Vec3::Z, Vec3::Y),
            (Vec3::Y, Vec3::X, Vec3::NEG_Z),
            (Vec3::NEG_Y, Vec3::X, Vec3::Z),
            (Vec3::Z, Vec3::X, Vec3::Y),
            (Vec3::NEG_Z, Vec3::NEG_X, Vec3::Y),
        ];
        let corners = [(-0.5, -0.5), (0.5, -0.5), (0.5, 0.5), (-0.5, 0.5)];

        let mut vertices = Vec::with_capacity(24);
        let mut indices = Vec::with_capacity(36);
        for (normal, u, v) in faces {
            let base = vertices.len() as u16;
            for (cu, cv) in corners {
                let position = normal * 0.5 + u * cu + v * cv;
                vertices.push(Vertex {
                    position: position.to_array(),
                    normal: normal.to_array(),
                    uv: [cu + 0.5, cv + 0.5],
                });
            }
            indices.extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
        }

        Self { vertices, indices }
    }

    pub fn vertex_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.vertices)
    }

    pub fn index_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.indices)
    }
}

/// A mesh uploaded once and shared read-only by every draw that uses it.
#[derive(Debug)]
pub struct GeometryResource {
    vertex_buffer: BufferHandle,
    index_buffer: BufferHandle,
    layout: VertexLayout,
    vertex_count: u32,
    index_count: u32,
}

impl GeometryResource {
    pub fn upload(
        device: &mut dyn RenderDevice,
        label: &str,
        mesh: &MeshData,
    ) -> Result<Self, ResourceError> {
        let vertex_bytes = mesh.vertex_bytes();
        let vertex_buffer = device.create_buffer(
            &BufferDesc {
                label,
                size: vertex_bytes.len() as u64,
                usage: BufferUsage::Vertex,
            },
            Some(vertex_bytes),
        )?;

        let index_bytes = mesh.index_bytes();
        let index_buffer = match device.create_buffer(
            &BufferDesc {
                label,
                size: index_bytes.len() as u64,
                usage: BufferUsage::Index,
            },
            Some(index_bytes),
        ) {
            Ok(buffer) => buffer,
            Err(err) => {
                device.destroy_buffer(vertex_buffer);
                return Err(err);
            }
        };

        Ok(Self {
            vertex_buffer,
            index_buffer,
            layout: VertexLayout::mesh(),
            vertex_count: mesh.vertices.len() as u32,
            index_count: mesh.indices.len() as u32,
        })
    }

    pub fn layout(&self) -> &VertexLayout {
        &self.layout
    }

    pub fn vertex_count(&self) -> u32 {
        self.vertex_count
    }

    pub fn index_count(&self) -> u32 {
        self.index_count
    }

    pub fn is_uploaded(&self) -> bool {
        !self.vertex_buffer.is_null()
    }

    /// A single indexed draw of the whole mesh.
    pub fn draw_call(&self) -> DrawCall<'_> {
        self.instanced_draw_call(None, 0..1)
    }

    pub fn instanced_draw_call<'a>(
        &'a self,
        instance_stream: Option<VertexStream<'a>>,
        instances: Range<u32>,
    ) -> DrawCall<'a> {
        DrawCall {
            vertices: VertexStream {
                buffer: self.vertex_buffer,
                layout: &self.layout,
            },
            indices: Some(IndexStream {
                buffer: self.index_buffer,
                format: IndexFormat::Uint16,
            }),
            instance_stream,
            elements: 0..self.index_count,
            base_vertex: 0,
            instances,
        }
    }

    /// Releases both buffers. Safe to call repeatedly.
    pub fn destroy(&mut self, device: &mut dyn RenderDevice) {
        for buffer in [&mut self.vertex_buffer, &mut self.index_buffer] {
            if !buffer.is_null() {
                device.destroy_buffer(*buffer);
                *buffer = BufferHandle::NULL;
            }
        }
    }
}

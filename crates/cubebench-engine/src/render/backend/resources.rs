use std::ops::Range;

use cubebench_core::device::{BufferUsage, IndexFormat};
use cubebench_core::handle::{BufferHandle, ProgramHandle, TextureHandle};

use super::MAX_TEXTURE_UNITS;

/// Compiled stages plus the uniform block state of one program.
pub(crate) struct ProgramEntry {
    pub label: String,
    pub vertex: wgpu::ShaderModule,
    pub fragment: wgpu::ShaderModule,
    pub layout: wgpu::PipelineLayout,
    pub texture_units: u32,

    /// Latest uniform block contents, `uniform_size` bytes.
    pub uniforms: Vec<u8>,
    pub uniform_size: u64,
    /// Arena offset of `uniforms` if already pushed this frame.
    pub pushed: Option<u32>,
    /// Bind group over the uniform arena, tagged with the arena generation.
    pub bind_group: Option<(u64, wgpu::BindGroup)>,
}

pub(crate) struct BufferEntry {
    pub label: String,
    pub buffer: wgpu::Buffer,
    pub size: u64,
    pub usage: BufferUsage,
}

pub(crate) fn index_format(format: IndexFormat) -> wgpu::IndexFormat {
    match format {
        IndexFormat::Uint16 => wgpu::IndexFormat::Uint16,
        IndexFormat::Uint32 => wgpu::IndexFormat::Uint32,
    }
}

/// A draw captured during the frame and replayed into the render pass at encode.
#[derive(Debug, Clone)]
pub(crate) struct PendingDraw {
    pub program: ProgramHandle,
    pub pipeline: usize,
    pub uniform_offset: u32,
    pub textures: [TextureHandle; MAX_TEXTURE_UNITS],
    pub vertex_buffer: BufferHandle,
    pub instance_buffer: Option<BufferHandle>,
    pub index: Option<(BufferHandle, IndexFormat)>,
    pub elements: Range<u32>,
    pub base_vertex: i32,
    pub instances: Range<u32>,
}

/// Last state set on the render pass, to skip redundant calls.
#[derive(Debug, Default)]
pub(crate) struct PassState {
    pipeline: Option<usize>,
    textures: [Option<TextureHandle>; MAX_TEXTURE_UNITS],
    vertex_buffer: Option<BufferHandle>,
    instance_buffer: Option<BufferHandle>,
    index_buffer: Option<BufferHandle>,
}

impl PassState {
    /// Records `value` in `slot` and reports whether it changed.
    fn update<T: PartialEq>(slot: &mut Option<T>, value: T) -> bool {
        if slot.as_ref() == Some(&value) {
            return false;
        }
        *slot = Some(value);
        true
    }

    /// A new pipeline may have a different layout, so texture groups are rebound.
    pub fn pipeline(&mut self, index: usize) -> bool {
        let changed = Self::update(&mut self.pipeline, index);
        if changed {
            self.textures = [None; MAX_TEXTURE_UNITS];
        }
        changed
    }

    pub fn texture(&mut self, unit: usize, texture: TextureHandle) -> bool {
        Self::update(&mut self.textures[unit], texture)
    }

    pub fn vertex_buffer(&mut self, buffer: BufferHandle) -> bool {
        Self::update(&mut self.vertex_buffer, buffer)
    }

    pub fn instance_buffer(&mut self, buffer: BufferHandle) -> bool {
        Self::update(&mut self.instance_buffer, buffer)
    }

    pub fn index_buffer(&mut self, buffer: BufferHandle) -> bool {
        Self::update(&mut self.index_buffer, buffer)
    }
}

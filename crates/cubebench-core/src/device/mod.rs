//! The seam between the core and a graphics API.
//!
//! Strategies, shader programs and geometry never touch a GPU directly; they go through
//! [`RenderDevice`]. The engine implements it on wgpu, [`RecordingDevice`] implements it
//! in memory.

use std::ops::Range;
use std::path::Path;

use crate::error::ResourceError;
use crate::geometry::VertexLayout;
use crate::handle::{BufferHandle, ProgramHandle, TextureHandle};
use crate::shader::UniformLayout;

pub mod recording;

pub use recording::{RecordedDraw, RecordingDevice};

/// Source text of one shader stage together with the file it came from.
#[derive(Debug, Copy, Clone)]
pub struct StageSource<'a> {
    pub path: &'a Path,
    pub code: &'a str,
}

/// Everything a device needs to build a program.
///
/// `uniforms` describes the single uniform block every program exposes;
/// `texture_units` is the number of sampled textures the fragment stage reads.
#[derive(Debug, Copy, Clone)]
pub struct ProgramDesc<'a> {
    pub label: &'a str,
    pub vertex: StageSource<'a>,
    pub fragment: StageSource<'a>,
    pub geometry: Option<StageSource<'a>>,
    pub uniforms: &'a UniformLayout,
    pub texture_units: u32,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum BufferUsage {
    Vertex,
    Index,
}

#[derive(Debug, Copy, Clone)]
pub struct BufferDesc<'a> {
    pub label: &'a str,
    pub size: u64,
    pub usage: BufferUsage,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum AddressMode {
    Repeat,
    MirrorRepeat,
    ClampToEdge,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum FilterMode {
    Nearest,
    Linear,
}

/// Sampling and decode options for [`RenderDevice::load_texture`].
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct TextureConfig {
    pub wrap_s: AddressMode,
    pub wrap_t: AddressMode,
    pub min_filter: FilterMode,
    pub mag_filter: FilterMode,
    pub mipmap_filter: FilterMode,
    /// Flip rows so that uv (0, 0) is the bottom-left texel.
    pub flip: bool,
}

impl Default for TextureConfig {
    fn default() -> Self {
        Self {
            wrap_s: AddressMode::Repeat,
            wrap_t: AddressMode::Repeat,
            min_filter: FilterMode::Linear,
            mag_filter: FilterMode::Linear,
            mipmap_filter: FilterMode::Linear,
            flip: true,
        }
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum IndexFormat {
    Uint16,
    Uint32,
}

impl IndexFormat {
    pub const fn size(self) -> u64 {
        match self {
            IndexFormat::Uint16 => 2,
            IndexFormat::Uint32 => 4,
        }
    }
}

/// A vertex buffer plus the layout its bytes follow.
#[derive(Debug, Copy, Clone)]
pub struct VertexStream<'a> {
    pub buffer: BufferHandle,
    pub layout: &'a VertexLayout,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct IndexStream {
    pub buffer: BufferHandle,
    pub format: IndexFormat,
}

/// One draw submission.
///
/// With `indices` set, `elements` is an index range and `base_vertex` is added to each
/// index; without it, `elements` is a vertex range.
#[derive(Debug, Clone)]
pub struct DrawCall<'a> {
    pub vertices: VertexStream<'a>,
    pub indices: Option<IndexStream>,
    pub instance_stream: Option<VertexStream<'a>>,
    pub elements: Range<u32>,
    pub base_vertex: i32,
    pub instances: Range<u32>,
}

/// GPU operations the core depends on.
///
/// Creation returns a handle or a [`ResourceError`]; callers log the error and keep a
/// null handle. Destroying a null or unknown handle is a no-op. State setters
/// (`use_program`, `bind_texture`) affect every later `draw` until changed.
pub trait RenderDevice {
    fn create_program(&mut self, desc: &ProgramDesc<'_>) -> Result<ProgramHandle, ResourceError>;
    fn destroy_program(&mut self, program: ProgramHandle);

    fn create_buffer(
        &mut self,
        desc: &BufferDesc<'_>,
        contents: Option<&[u8]>,
    ) -> Result<BufferHandle, ResourceError>;
    fn write_buffer(
        &mut self,
        buffer: BufferHandle,
        offset: u64,
        data: &[u8],
    ) -> Result<(), ResourceError>;
    fn destroy_buffer(&mut self, buffer: BufferHandle);

    fn load_texture(
        &mut self,
        path: &Path,
        config: &TextureConfig,
    ) -> Result<TextureHandle, ResourceError>;
    fn destroy_texture(&mut self, texture: TextureHandle);

    /// Makes `program` current. A null handle unbinds.
    fn use_program(&mut self, program: ProgramHandle);
    /// Replaces the uniform block contents of `program` for subsequent draws.
    fn upload_uniforms(&mut self, program: ProgramHandle, bytes: &[u8]);
    /// Binds `texture` to `unit`. A null handle clears the unit.
    fn bind_texture(&mut self, unit: u32, texture: TextureHandle);
    fn draw(&mut self, call: &DrawCall<'_>);
}

/// Validates a buffer write against the buffer size.
pub fn check_range(offset: u64, len: usize, size: u64) -> Result<(), ResourceError> {
    let len = len as u64;
    match offset.checked_add(len) {
        Some(end) if end <= size => Ok(()),
        _ => Err(ResourceError::InvalidRange { offset, len, size }),
    }
}

use std::collections::{BTreeMap, HashMap, HashSet};
use std::ops::Range;
use std::path::Path;

use crate::device::{
    BufferDesc, BufferUsage, DrawCall, ProgramDesc, RenderDevice, StageSource, TextureConfig,
    check_range,
};
use crate::error::{ResourceError, ShaderStage};
use crate::handle::{BufferHandle, HandleAllocator, ProgramHandle, TextureHandle};

/// A draw as seen by [`RecordingDevice`], with the state that was in effect.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedDraw {
    pub program: ProgramHandle,
    pub uniforms: Vec<u8>,
    pub textures: Vec<(u32, TextureHandle)>,
    pub vertex_buffer: BufferHandle,
    pub index_buffer: Option<BufferHandle>,
    pub instance_buffer: Option<BufferHandle>,
    pub elements: Range<u32>,
    pub base_vertex: i32,
    pub instances: Range<u32>,
}

#[derive(Debug)]
struct ProgramEntry {
    label: String,
    uniforms: Vec<u8>,
    has_geometry: bool,
}

#[derive(Debug)]
struct BufferEntry {
    usage: BufferUsage,
    data: Vec<u8>,
}

/// In-memory [`RenderDevice`].
///
/// Accepts any non-empty shader source and any existing texture file. Keeps buffer
/// contents and logs every draw, which makes it usable as a headless device and as a
/// test double for strategies.
#[derive(Debug, Default)]
pub struct RecordingDevice {
    ids: HandleAllocator,
    programs: HashMap<ProgramHandle, ProgramEntry>,
    buffers: HashMap<BufferHandle, BufferEntry>,
    textures: HashSet<TextureHandle>,

    current_program: ProgramHandle,
    bound_textures: BTreeMap<u32, TextureHandle>,

    draws: Vec<RecordedDraw>,
    allocations: usize,
    releases: usize,
    buffer_writes: usize,
    uniform_uploads: usize,
}

impl RecordingDevice {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn draws(&self) -> &[RecordedDraw] {
        &self.draws
    }

    /// Drains the draw log, e.g. at the end of a frame.
    pub fn take_draws(&mut self) -> Vec<RecordedDraw> {
        std::mem::take(&mut self.draws)
    }

    /// Number of resources ever created.
    pub fn allocations(&self) -> usize {
        self.allocations
    }

    /// Number of resources ever destroyed.
    pub fn releases(&self) -> usize {
        self.releases
    }

    /// Resources currently alive.
    pub fn live_resources(&self) -> usize {
        self.programs.len() + self.buffers.len() + self.textures.len()
    }

    pub fn live_programs(&self) -> usize {
        self.programs.len()
    }

    /// Number of `write_buffer` calls that succeeded.
    pub fn buffer_writes(&self) -> usize {
        self.buffer_writes
    }

    /// Number of `upload_uniforms` calls that reached a live program.
    pub fn uniform_uploads(&self) -> usize {
        self.uniform_uploads
    }

    pub fn buffer_data(&self, buffer: BufferHandle) -> Option<&[u8]> {
        self.buffers.get(&buffer).map(|b| b.data.as_slice())
    }

    pub fn program_label(&self, program: ProgramHandle) -> Option<&str> {
        self.programs.get(&program).map(|p| p.label.as_str())
    }

    /// Whether `program` was linked with a geometry stage.
    pub fn program_has_geometry(&self, program: ProgramHandle) -> bool {
        self.programs.get(&program).is_some_and(|p| p.has_geometry)
    }

    fn check_stage(stage: ShaderStage, src: &StageSource<'_>) -> Result<(), ResourceError> {
        if src.code.trim().is_empty() {
            return Err(ResourceError::ShaderCompile {
                stage,
                path: src.path.to_path_buf(),
                message: "empty shader source".to_string(),
            });
        }
        Ok(())
    }
}

impl RenderDevice for RecordingDevice {
    fn create_program(&mut self, desc: &ProgramDesc<'_>) -> Result<ProgramHandle, ResourceError> {
        Self::check_stage(ShaderStage::Vertex, &desc.vertex)?;
        Self::check_stage(ShaderStage::Fragment, &desc.fragment)?;
        if let Some(geometry) = &desc.geometry {
            Self::check_stage(ShaderStage::Geometry, geometry)?;
        }

        let handle = ProgramHandle(self.ids.next());
        self.programs.insert(
            handle,
            ProgramEntry {
                label: desc.label.to_string(),
                uniforms: vec![0; desc.uniforms.size()],
                has_geometry: desc.geometry.is_some(),
            },
        );
        self.allocations += 1;
        Ok(handle)
    }

    fn destroy_program(&mut self, program: ProgramHandle) {
        if self.programs.remove(&program).is_some() {
            self.releases += 1;
            if self.current_program == program {
                self.current_program = ProgramHandle::NULL;
            }
        }
    }

    fn create_buffer(
        &mut self,
        desc: &BufferDesc<'_>,
        contents: Option<&[u8]>,
    ) -> Result<BufferHandle, ResourceError> {
        if desc.size == 0 {
            return Err(ResourceError::InvalidBuffer {
                label: desc.label.to_string(),
                reason: "zero-sized buffer".to_string(),
            });
        }
        let mut data = vec![0u8; desc.size as usize];
        if let Some(contents) = contents {
            check_range(0, contents.len(), desc.size)?;
            data[..contents.len()].copy_from_slice(contents);
        }

        let handle = BufferHandle(self.ids.next());
        self.buffers.insert(
            handle,
            BufferEntry {
                usage: desc.usage,
                data,
            },
        );
        self.allocations += 1;
        Ok(handle)
    }

    fn write_buffer(
        &mut self,
        buffer: BufferHandle,
        offset: u64,
        data: &[u8],
    ) -> Result<(), ResourceError> {
        let entry = self
            .buffers
            .get_mut(&buffer)
            .ok_or_else(|| ResourceError::InvalidBuffer {
                label: buffer.to_string(),
                reason: "unknown buffer".to_string(),
            })?;
        check_range(offset, data.len(), entry.data.len() as u64)?;

        let start = offset as usize;
        entry.data[start..start + data.len()].copy_from_slice(data);
        self.buffer_writes += 1;
        Ok(())
    }

    fn destroy_buffer(&mut self, buffer: BufferHandle) {
        if self.buffers.remove(&buffer).is_some() {
            self.releases += 1;
        }
    }

    fn load_texture(
        &mut self,
        path: &Path,
        _config: &TextureConfig,
    ) -> Result<TextureHandle, ResourceError> {
        if !path.is_file() {
            return Err(ResourceError::TextureLoad {
                path: path.to_path_buf(),
                reason: "file not found".to_string(),
            });
        }
        let handle = TextureHandle(self.ids.next());
        self.textures.insert(handle);
        self.allocations += 1;
        Ok(handle)
    }

    fn destroy_texture(&mut self, texture: TextureHandle) {
        if self.textures.remove(&texture) {
            self.releases += 1;
            self.bound_textures.retain(|_, t| *t != texture);
        }
    }

    fn use_program(&mut self, program: ProgramHandle) {
        self.current_program = if self.programs.contains_key(&program) {
            program
        } else {
            ProgramHandle::NULL
        };
    }

    fn upload_uniforms(&mut self, program: ProgramHandle, bytes: &[u8]) {
        if let Some(entry) = self.programs.get_mut(&program) {
            entry.uniforms.clear();
            entry.uniforms.extend_from_slice(bytes);
            self.uniform_uploads += 1;
        }
    }

    fn bind_texture(&mut self, unit: u32, texture: TextureHandle) {
        if texture.is_null() {
            self.bound_textures.remove(&unit);
        } else {
            self.bound_textures.insert(unit, texture);
        }
    }

    fn draw(&mut self, call: &DrawCall<'_>) {
        let Some(program) = self.programs.get(&self.current_program) else {
            log::trace!("draw without a current program ignored");
            return;
        };

        let is_usage = |buffer: BufferHandle, usage: BufferUsage| {
            self.buffers.get(&buffer).is_some_and(|b| b.usage == usage)
        };
        let streams_ok = is_usage(call.vertices.buffer, BufferUsage::Vertex)
            && call
                .instance_stream
                .is_none_or(|s| is_usage(s.buffer, BufferUsage::Vertex))
            && call
                .indices
                .is_none_or(|i| is_usage(i.buffer, BufferUsage::Index));
        if !streams_ok {
            log::trace!("draw with a missing or mismatched buffer ignored");
            return;
        }

        self.draws.push(RecordedDraw {
            program: self.current_program,
            uniforms: program.uniforms.clone(),
            textures: self.bound_textures.iter().map(|(u, t)| (*u, *t)).collect(),
            vertex_buffer: call.vertices.buffer,
            index_buffer: call.indices.map(|i| i.buffer),
            instance_buffer: call.instance_stream.map(|s| s.buffer),
            elements: call.elements.clone(),
            base_vertex: call.base_vertex,
            instances: call.instances.clone(),
        });
    }
}

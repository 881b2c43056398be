//! `RenderDevice` on wgpu.
//!
//! [`WgpuBackend`] owns every GPU object the core creates. Each frame the app borrows
//! it as a [`WgpuDevice`], which creates resources immediately and records draws; the
//! recorded draws are replayed into a single depth-tested render pass by
//! [`WgpuBackend::encode`].
//!
//! Bind group convention shared with the WGSL sources:
//! - group 0, binding 0: the program's uniform block (dynamic offset into the arena)
//! - group 1 + k: texture unit k (texture at binding 0, sampler at binding 1)
//! - vertex buffer slot 0: per-vertex stream, slot 1: per-instance stream

use std::borrow::Cow;
use std::collections::HashMap;
use std::path::Path;

use wgpu::util::DeviceExt;

use cubebench_core::device::{
    BufferDesc, BufferUsage, DrawCall, ProgramDesc, RenderDevice, TextureConfig, check_range,
};
use cubebench_core::error::{ResourceError, ShaderStage};
use cubebench_core::handle::{BufferHandle, HandleAllocator, ProgramHandle, TextureHandle};

use crate::render::{RenderCtx, RenderTarget};

mod pipeline;
mod resources;
mod shader;
mod texture;
mod uniforms;

use pipeline::PipelineCache;
use resources::{BufferEntry, PassState, PendingDraw, ProgramEntry, index_format};
use texture::{GpuTexture, decode_texture, texture_unit_layout};
use uniforms::{UniformArena, align_up};

pub const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

/// Texture units a program may declare.
pub const MAX_TEXTURE_UNITS: usize = 4;

struct DepthTarget {
    size: (u32, u32),
    _texture: wgpu::Texture,
    view: wgpu::TextureView,
}

impl DepthTarget {
    fn new(device: &wgpu::Device, size: (u32, u32)) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("cubebench depth"),
            size: wgpu::Extent3d {
                width: size.0,
                height: size.1,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: DEPTH_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Self {
            size,
            _texture: texture,
            view,
        }
    }
}

/// Persistent GPU state behind [`WgpuDevice`].
pub struct WgpuBackend {
    surface_format: wgpu::TextureFormat,
    ids: HandleAllocator,

    programs: HashMap<ProgramHandle, ProgramEntry>,
    buffers: HashMap<BufferHandle, BufferEntry>,
    textures: HashMap<TextureHandle, GpuTexture>,

    uniform_layout: wgpu::BindGroupLayout,
    texture_layout: wgpu::BindGroupLayout,
    fallback: GpuTexture,
    pipelines: PipelineCache,
    uniforms: UniformArena,
    depth: Option<DepthTarget>,

    bound_program: ProgramHandle,
    bound_textures: [TextureHandle; MAX_TEXTURE_UNITS],
    draws: Vec<PendingDraw>,
}

impl WgpuBackend {
    pub fn new(ctx: &RenderCtx<'_>) -> Self {
        let uniform_layout = ctx
            .device
            .create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("cubebench uniforms"),
                entries: &[wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: true,
                        min_binding_size: None,
                    },
                    count: None,
                }],
            });
        let texture_layout = texture_unit_layout(ctx.device);
        let fallback = GpuTexture::white(ctx.device, ctx.queue, &texture_layout);
        let alignment = ctx.device.limits().min_uniform_buffer_offset_alignment;

        Self {
            surface_format: ctx.surface_format,
            ids: HandleAllocator::default(),
            programs: HashMap::new(),
            buffers: HashMap::new(),
            textures: HashMap::new(),
            uniform_layout,
            texture_layout,
            fallback,
            pipelines: PipelineCache::default(),
            uniforms: UniformArena::new(alignment),
            depth: None,
            bound_program: ProgramHandle::NULL,
            bound_textures: [TextureHandle::NULL; MAX_TEXTURE_UNITS],
            draws: Vec::new(),
        }
    }

    /// Lends the backend as a [`RenderDevice`] for the duration of `ctx`.
    pub fn device<'a>(&'a mut self, ctx: &RenderCtx<'a>) -> WgpuDevice<'a> {
        WgpuDevice {
            backend: self,
            device: ctx.device,
            queue: ctx.queue,
        }
    }

    /// Programs, buffers and textures currently alive.
    pub fn live_resources(&self) -> usize {
        self.programs.len() + self.buffers.len() + self.textures.len()
    }

    fn ensure_depth(&mut self, device: &wgpu::Device, size: (u32, u32)) {
        if self.depth.as_ref().is_some_and(|d| d.size == size) {
            return;
        }
        self.depth = Some(DepthTarget::new(device, size));
        log::debug!("depth target {}x{}", size.0, size.1);
    }

    /// Replays recorded draws into one render pass over `target`.
    ///
    /// Colour is loaded, depth is cleared to 1.0. Draws whose resources were
    /// destroyed after recording are skipped. Returns the number of draws encoded.
    pub fn encode(&mut self, ctx: &RenderCtx<'_>, target: &mut RenderTarget<'_>) -> usize {
        let encoded = self.encode_pass(ctx, target);
        let skipped = self.draws.len() - encoded;
        if skipped > 0 {
            log::debug!("skipped {skipped} draws with released resources");
        }
        self.end_frame();
        encoded
    }

    fn encode_pass(&mut self, ctx: &RenderCtx<'_>, target: &mut RenderTarget<'_>) -> usize {
        let (width, height) = ctx.surface_size;
        if self.draws.is_empty() || width == 0 || height == 0 {
            return 0;
        }
        self.ensure_depth(ctx.device, ctx.surface_size);
        if !self.uniforms.flush(ctx.device, ctx.queue) {
            return 0;
        }

        let generation = self.uniforms.generation();
        let Some(arena) = self.uniforms.buffer() else {
            return 0;
        };
        for (handle, program) in &mut self.programs {
            if program.bind_group.as_ref().is_some_and(|(g, _)| *g == generation) {
                continue;
            }
            let group = ctx.device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some(&program.label),
                layout: &self.uniform_layout,
                entries: &[wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                        buffer: arena,
                        offset: 0,
                        size: wgpu::BufferSize::new(program.uniform_size),
                    }),
                }],
            });
            program.bind_group = Some((generation, group));
            log::trace!("uniform bind group for {handle} (generation {generation})");
        }

        let Some(depth) = self.depth.as_ref() else {
            return 0;
        };

        let mut encoded = 0;
        {
            let mut pass = target.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("cubebench scene"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: target.color_view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Load,
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &depth.view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
                multiview_mask: None,
            });

            let mut state = PassState::default();
            for draw in &self.draws {
                let Some(program) = self.programs.get(&draw.program) else {
                    continue;
                };
                let (Some(pipeline), Some((_, uniforms))) =
                    (self.pipelines.get(draw.pipeline), program.bind_group.as_ref())
                else {
                    continue;
                };
                let Some(vertices) = self.buffers.get(&draw.vertex_buffer) else {
                    continue;
                };
                let instances = match draw.instance_buffer {
                    Some(handle) => match self.buffers.get(&handle) {
                        Some(entry) => Some((handle, entry)),
                        None => continue,
                    },
                    None => None,
                };
                let index = match draw.index {
                    Some((handle, format)) => match self.buffers.get(&handle) {
                        Some(entry) => Some((handle, entry, format)),
                        None => continue,
                    },
                    None => None,
                };

                if state.pipeline(draw.pipeline) {
                    pass.set_pipeline(pipeline);
                }
                pass.set_bind_group(0, uniforms, &[draw.uniform_offset]);
                for unit in 0..program.texture_units as usize {
                    let handle = draw.textures[unit];
                    if state.texture(unit, handle) {
                        let texture = self.textures.get(&handle).unwrap_or(&self.fallback);
                        pass.set_bind_group(1 + unit as u32, &texture.bind_group, &[]);
                    }
                }
                if state.vertex_buffer(draw.vertex_buffer) {
                    pass.set_vertex_buffer(0, vertices.buffer.slice(..));
                }
                if let Some((handle, entry)) = instances {
                    if state.instance_buffer(handle) {
                        pass.set_vertex_buffer(1, entry.buffer.slice(..));
                    }
                }

                match index {
                    Some((handle, entry, format)) => {
                        if state.index_buffer(handle) {
                            pass.set_index_buffer(entry.buffer.slice(..), index_format(format));
                        }
                        pass.draw_indexed(
                            draw.elements.clone(),
                            draw.base_vertex,
                            draw.instances.clone(),
                        );
                    }
                    None => pass.draw(draw.elements.clone(), draw.instances.clone()),
                }
                encoded += 1;
            }
        }
        encoded
    }

    fn end_frame(&mut self) {
        self.draws.clear();
        self.uniforms.reset();
        for program in self.programs.values_mut() {
            program.pushed = None;
        }
    }
}

/// A [`WgpuBackend`] borrowed together with the device and queue for one frame.
pub struct WgpuDevice<'a> {
    backend: &'a mut WgpuBackend,
    device: &'a wgpu::Device,
    queue: &'a wgpu::Queue,
}

impl WgpuDevice<'_> {
    fn create_module(&self, label: &str, code: &str) -> wgpu::ShaderModule {
        self.device
            .create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some(label),
                source: wgpu::ShaderSource::Wgsl(Cow::Borrowed(code)),
            })
    }

    fn unknown_buffer(buffer: BufferHandle) -> ResourceError {
        ResourceError::InvalidBuffer {
            label: buffer.to_string(),
            reason: "unknown handle".to_string(),
        }
    }
}

impl RenderDevice for WgpuDevice<'_> {
    fn create_program(&mut self, desc: &ProgramDesc<'_>) -> Result<ProgramHandle, ResourceError> {
        if desc.geometry.is_some() {
            return Err(ResourceError::UnsupportedStage {
                stage: ShaderStage::Geometry,
            });
        }
        shader::validate_stage(ShaderStage::Vertex, &desc.vertex)?;
        shader::validate_stage(ShaderStage::Fragment, &desc.fragment)?;
        if desc.texture_units as usize > MAX_TEXTURE_UNITS {
            return Err(ResourceError::ProgramLink {
                label: desc.label.to_string(),
                message: format!(
                    "{} texture units requested, at most {MAX_TEXTURE_UNITS} supported",
                    desc.texture_units
                ),
            });
        }

        let vertex = self.create_module(desc.label, desc.vertex.code);
        let fragment = self.create_module(desc.label, desc.fragment.code);

        let backend = &mut *self.backend;
        let mut groups = vec![&backend.uniform_layout];
        groups.extend((0..desc.texture_units).map(|_| &backend.texture_layout));
        let layout = self
            .device
            .create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some(desc.label),
                bind_group_layouts: &groups,
                immediate_size: 0,
            });

        let uniform_size = (desc.uniforms.size() as u64).max(16);
        let handle = ProgramHandle(backend.ids.next());
        backend.programs.insert(
            handle,
            ProgramEntry {
                label: desc.label.to_string(),
                vertex,
                fragment,
                layout,
                texture_units: desc.texture_units,
                uniforms: vec![0; uniform_size as usize],
                uniform_size,
                pushed: None,
                bind_group: None,
            },
        );
        log::debug!("program '{}' created as {handle}", desc.label);
        Ok(handle)
    }

    fn destroy_program(&mut self, program: ProgramHandle) {
        let backend = &mut *self.backend;
        if backend.programs.remove(&program).is_some() {
            backend.pipelines.evict(program);
            if backend.bound_program == program {
                backend.bound_program = ProgramHandle::NULL;
            }
            log::debug!("program {program} destroyed");
        }
    }

    fn create_buffer(
        &mut self,
        desc: &BufferDesc<'_>,
        contents: Option<&[u8]>,
    ) -> Result<BufferHandle, ResourceError> {
        let invalid = |reason: &str| ResourceError::InvalidBuffer {
            label: desc.label.to_string(),
            reason: reason.to_string(),
        };
        if desc.size == 0 {
            return Err(invalid("zero size"));
        }
        if contents.is_some_and(|c| c.len() as u64 > desc.size) {
            return Err(invalid("contents larger than buffer"));
        }

        let usage = match desc.usage {
            BufferUsage::Vertex => wgpu::BufferUsages::VERTEX,
            BufferUsage::Index => wgpu::BufferUsages::INDEX,
        } | wgpu::BufferUsages::COPY_DST;

        let buffer = match contents {
            Some(contents) if contents.len() as u64 == desc.size => {
                self.device
                    .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                        label: Some(desc.label),
                        contents,
                        usage,
                    })
            }
            _ => {
                let buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
                    label: Some(desc.label),
                    size: align_up(desc.size, wgpu::COPY_BUFFER_ALIGNMENT),
                    usage,
                    mapped_at_creation: false,
                });
                if let Some(contents) = contents.filter(|c| !c.is_empty()) {
                    write_padded(self.queue, &buffer, 0, contents);
                }
                buffer
            }
        };

        let backend = &mut *self.backend;
        let handle = BufferHandle(backend.ids.next());
        backend.buffers.insert(
            handle,
            BufferEntry {
                label: desc.label.to_string(),
                buffer,
                size: desc.size,
                usage: desc.usage,
            },
        );
        log::debug!("buffer '{}' ({} bytes) created as {handle}", desc.label, desc.size);
        Ok(handle)
    }

    fn write_buffer(
        &mut self,
        buffer: BufferHandle,
        offset: u64,
        data: &[u8],
    ) -> Result<(), ResourceError> {
        let entry = self
            .backend
            .buffers
            .get(&buffer)
            .ok_or_else(|| Self::unknown_buffer(buffer))?;
        check_range(offset, data.len(), entry.size)?;
        if offset % wgpu::COPY_BUFFER_ALIGNMENT != 0 {
            return Err(ResourceError::InvalidBuffer {
                label: entry.label.clone(),
                reason: format!("write offset {offset} is not 4-byte aligned"),
            });
        }
        if !data.is_empty() {
            write_padded(self.queue, &entry.buffer, offset, data);
        }
        Ok(())
    }

    fn destroy_buffer(&mut self, buffer: BufferHandle) {
        if let Some(entry) = self.backend.buffers.remove(&buffer) {
            entry.buffer.destroy();
            log::debug!("buffer '{}' destroyed", entry.label);
        }
    }

    fn load_texture(
        &mut self,
        path: &Path,
        config: &TextureConfig,
    ) -> Result<TextureHandle, ResourceError> {
        let image = decode_texture(path, config.flip)?;
        let label = path.display().to_string();
        let backend = &mut *self.backend;
        let texture = GpuTexture::upload(
            self.device,
            self.queue,
            &backend.texture_layout,
            &label,
            &image,
            config,
        );
        let handle = TextureHandle(backend.ids.next());
        backend.textures.insert(handle, texture);
        log::info!("texture '{label}' loaded ({}x{})", image.width, image.height);
        Ok(handle)
    }

    fn destroy_texture(&mut self, texture: TextureHandle) {
        let backend = &mut *self.backend;
        if let Some(entry) = backend.textures.remove(&texture) {
            for bound in &mut backend.bound_textures {
                if *bound == texture {
                    *bound = TextureHandle::NULL;
                }
            }
            log::debug!("texture '{}' destroyed", entry.label);
        }
    }

    fn use_program(&mut self, program: ProgramHandle) {
        let backend = &mut *self.backend;
        backend.bound_program = if backend.programs.contains_key(&program) {
            program
        } else {
            ProgramHandle::NULL
        };
    }

    fn upload_uniforms(&mut self, program: ProgramHandle, bytes: &[u8]) {
        let Some(entry) = self.backend.programs.get_mut(&program) else {
            return;
        };
        let len = bytes.len().min(entry.uniforms.len());
        entry.uniforms[..len].copy_from_slice(&bytes[..len]);
        entry.pushed = None;
    }

    fn bind_texture(&mut self, unit: u32, texture: TextureHandle) {
        match self.backend.bound_textures.get_mut(unit as usize) {
            Some(slot) => *slot = texture,
            None => log::warn!("texture unit {unit} out of range"),
        }
    }

    fn draw(&mut self, call: &DrawCall<'_>) {
        let backend = &mut *self.backend;
        let handle = backend.bound_program;
        let Some(program) = backend.programs.get_mut(&handle) else {
            log::trace!("draw without a program ignored");
            return;
        };

        let is_usage = |buffer: BufferHandle, usage: BufferUsage| {
            backend.buffers.get(&buffer).is_some_and(|b| b.usage == usage)
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

        let pipeline = backend.pipelines.get_or_create(
            self.device,
            backend.surface_format,
            handle,
            program,
            call.vertices.layout,
            call.instance_stream.as_ref().map(|s| s.layout),
        );
        let uniform_offset = match program.pushed {
            Some(offset) => offset,
            None => {
                let offset = backend.uniforms.push(&program.uniforms);
                program.pushed = Some(offset);
                offset
            }
        };

        let mut textures = [TextureHandle::NULL; MAX_TEXTURE_UNITS];
        let units = (program.texture_units as usize).min(MAX_TEXTURE_UNITS);
        textures[..units].copy_from_slice(&backend.bound_textures[..units]);

        backend.draws.push(PendingDraw {
            program: handle,
            pipeline,
            uniform_offset,
            textures,
            vertex_buffer: call.vertices.buffer,
            instance_buffer: call.instance_stream.as_ref().map(|s| s.buffer),
            index: call.indices.map(|i| (i.buffer, i.format)),
            elements: call.elements.clone(),
            base_vertex: call.base_vertex,
            instances: call.instances.clone(),
        });
    }
}

/// `Queue::write_buffer` needs a 4-byte multiple; pads the tail with zeros.
fn write_padded(queue: &wgpu::Queue, buffer: &wgpu::Buffer, offset: u64, data: &[u8]) {
    let padded_len = align_up(data.len() as u64, wgpu::COPY_BUFFER_ALIGNMENT) as usize;
    if padded_len == data.len() {
        queue.write_buffer(buffer, offset, data);
    } else {
        let mut padded = data.to_vec();
        padded.resize(padded_len, 0);
        queue.write_buffer(buffer, offset, &padded);
    }
}

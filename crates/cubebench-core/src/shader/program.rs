use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::device::{DrawCall, ProgramDesc, RenderDevice, StageSource};
use crate::error::{ResourceError, ShaderStage};
use crate::handle::{ProgramHandle, TextureHandle};
use crate::shader::{UniformLayout, UniformValue};

/// Stage file paths of a program. The geometry stage is optional.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShaderSource {
    pub vertex: PathBuf,
    pub fragment: PathBuf,
    pub geometry: Option<PathBuf>,
}

impl ShaderSource {
    pub fn new(vertex: impl Into<PathBuf>, fragment: impl Into<PathBuf>) -> Self {
        Self {
            vertex: vertex.into(),
            fragment: fragment.into(),
            geometry: None,
        }
    }

    pub fn with_geometry(mut self, geometry: impl Into<PathBuf>) -> Self {
        self.geometry = Some(geometry.into());
        self
    }
}

/// A linked program plus a CPU copy of its uniform block.
///
/// A program whose handle is null (creation failed or already destroyed) never binds,
/// so nothing can be uploaded or drawn through it.
#[derive(Debug)]
pub struct ShaderProgram {
    label: String,
    handle: ProgramHandle,
    layout: UniformLayout,
    block: Vec<u8>,
    dirty: bool,
    ignored: HashSet<String>,
}

impl ShaderProgram {
    /// Builds a program, logging any failure and falling back to a null handle.
    pub fn load(
        device: &mut dyn RenderDevice,
        label: &str,
        source: &ShaderSource,
        uniforms: UniformLayout,
        texture_units: u32,
    ) -> Self {
        let handle = match create(device, label, source, &uniforms, texture_units) {
            Ok(handle) => {
                log::debug!("program '{label}' created as {handle}");
                handle
            }
            Err(err) => {
                log::error!("program '{label}': {err}");
                ProgramHandle::NULL
            }
        };
        Self::from_parts(label, handle, uniforms)
    }

    /// Like [`ShaderProgram::load`], but hands the error back to the caller.
    pub fn try_load(
        device: &mut dyn RenderDevice,
        label: &str,
        source: &ShaderSource,
        uniforms: UniformLayout,
        texture_units: u32,
    ) -> Result<Self, ResourceError> {
        let handle = create(device, label, source, &uniforms, texture_units)?;
        Ok(Self::from_parts(label, handle, uniforms))
    }

    fn from_parts(label: &str, handle: ProgramHandle, layout: UniformLayout) -> Self {
        Self {
            label: label.to_string(),
            handle,
            block: vec![0; layout.size()],
            layout,
            dirty: true,
            ignored: HashSet::new(),
        }
    }

    #[inline]
    pub fn handle(&self) -> ProgramHandle {
        self.handle
    }

    #[inline]
    pub fn is_valid(&self) -> bool {
        !self.handle.is_null()
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn layout(&self) -> &UniformLayout {
        &self.layout
    }

    /// Makes this program current. Returns `None` for a null program.
    pub fn bind<'a>(&'a mut self, device: &'a mut dyn RenderDevice) -> Option<BoundProgram<'a>> {
        if !self.is_valid() {
            return None;
        }
        device.use_program(self.handle);
        Some(BoundProgram {
            program: self,
            device,
        })
    }

    /// Releases the program. Safe to call repeatedly.
    pub fn destroy(&mut self, device: &mut dyn RenderDevice) {
        if self.handle.is_null() {
            return;
        }
        device.destroy_program(self.handle);
        log::debug!("program '{}' destroyed", self.label);
        self.handle = ProgramHandle::NULL;
    }

    fn write(&mut self, name: &str, value: UniformValue) -> bool {
        let Some(slot) = self.layout.slot(name) else {
            self.ignore(name, "no such uniform");
            return false;
        };
        if slot.kind != value.kind() {
            self.ignore(name, "type mismatch");
            return false;
        }

        let mut packed = [0u8; 64];
        let size = slot.kind.size();
        value.write_to(&mut packed[..size]);

        let dst = &mut self.block[slot.offset..slot.offset + size];
        if dst != &packed[..size] {
            dst.copy_from_slice(&packed[..size]);
            self.dirty = true;
        }
        true
    }

    fn ignore(&mut self, name: &str, why: &str) {
        if self.ignored.insert(name.to_string()) {
            log::debug!("program '{}': uniform '{name}' ignored ({why})", self.label);
        }
    }
}

fn read_stage(stage: ShaderStage, path: &Path) -> Result<String, ResourceError> {
    std::fs::read_to_string(path).map_err(|source| ResourceError::ShaderSource {
        stage,
        path: path.to_path_buf(),
        source,
    })
}

fn create(
    device: &mut dyn RenderDevice,
    label: &str,
    source: &ShaderSource,
    uniforms: &UniformLayout,
    texture_units: u32,
) -> Result<ProgramHandle, ResourceError> {
    let vertex = read_stage(ShaderStage::Vertex, &source.vertex)?;
    let fragment = read_stage(ShaderStage::Fragment, &source.fragment)?;
    let geometry = source
        .geometry
        .as_deref()
        .map(|path| read_stage(ShaderStage::Geometry, path).map(|code| (path, code)))
        .transpose()?;

    device.create_program(&ProgramDesc {
        label,
        vertex: StageSource {
            path: &source.vertex,
            code: &vertex,
        },
        fragment: StageSource {
            path: &source.fragment,
            code: &fragment,
        },
        geometry: geometry
            .as_ref()
            .map(|(path, code)| StageSource { path, code }),
        uniforms,
        texture_units,
    })
}

/// A program that is current on a device.
///
/// Only a bound program accepts uniform writes, texture bindings and draws.
pub struct BoundProgram<'a> {
    program: &'a mut ShaderProgram,
    device: &'a mut dyn RenderDevice,
}

impl BoundProgram<'_> {
    /// Stores `value` under `name`. Unknown names and type mismatches are ignored.
    ///
    /// Returns whether the value was accepted.
    pub fn set_uniform(&mut self, name: &str, value: impl Into<UniformValue>) -> bool {
        self.program.write(name, value.into())
    }

    pub fn bind_texture(&mut self, unit: u32, texture: TextureHandle) {
        self.device.bind_texture(unit, texture);
    }

    /// Uploads pending uniform changes, then submits `call`.
    pub fn draw(&mut self, call: &DrawCall<'_>) {
        self.flush();
        self.device.draw(call);
    }

    pub fn program(&self) -> &ShaderProgram {
        &*self.program
    }

    pub fn device(&mut self) -> &mut dyn RenderDevice {
        &mut *self.device
    }

    fn flush(&mut self) {
        if self.program.dirty {
            self.device
                .upload_uniforms(self.program.handle, &self.program.block);
            self.program.dirty = false;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::{BufferDesc, BufferUsage, RecordingDevice, VertexStream};
    use crate::geometry::VertexLayout;
    use crate::shader::UniformKind;
    use crate::testing::{read_f32s, shader_dir};
    use glam::Vec3;

    fn cube_source() -> ShaderSource {
        let dir = shader_dir();
        ShaderSource::new(dir.join("cube.vert.wgsl"), dir.join("cube.frag.wgsl"))
    }

    fn layout() -> UniformLayout {
        UniformLayout::new(&[("tint", UniformKind::Vec3), ("alpha", UniformKind::Float)])
    }

    fn triangle(dev: &mut RecordingDevice) -> (crate::handle::BufferHandle, VertexLayout) {
        let vb = dev
            .create_buffer(
                &BufferDesc {
                    label: "tri",
                    size: 36,
                    usage: BufferUsage::Vertex,
                },
                None,
            )
            .unwrap();
        (vb, VertexLayout::position_only())
    }

    #[test]
    fn missing_vertex_file_yields_null_program() {
        let mut dev = RecordingDevice::new();
        let source = ShaderSource::new(
            shader_dir().join("does_not_exist.vert.wgsl"),
            shader_dir().join("cube.frag.wgsl"),
        );

        let err = ShaderProgram::try_load(&mut dev, "cube", &source, layout(), 1).unwrap_err();
        assert!(matches!(
            err,
            ResourceError::ShaderSource {
                stage: ShaderStage::Vertex,
                ..
            }
        ));

        let mut program = ShaderProgram::load(&mut dev, "cube", &source, layout(), 1);
        assert!(!program.is_valid());
        assert!(program.bind(&mut dev).is_none());
        assert_eq!(dev.allocations(), 0);
    }

    #[test]
    fn geometry_stage_is_linked_when_given() {
        let mut dev = RecordingDevice::new();
        let plain = ShaderProgram::load(&mut dev, "plain", &cube_source(), layout(), 1);
        let source = cube_source().with_geometry(shader_dir().join("cube.vert.wgsl"));
        let program = ShaderProgram::load(&mut dev, "geom", &source, layout(), 1);

        assert!(program.is_valid());
        assert!(dev.program_has_geometry(program.handle()));
        assert!(!dev.program_has_geometry(plain.handle()));
    }

    #[test]
    fn missing_geometry_file_yields_null_program() {
        let mut dev = RecordingDevice::new();
        let source = cube_source().with_geometry(shader_dir().join("does_not_exist.geom.wgsl"));

        let err = ShaderProgram::try_load(&mut dev, "cube", &source, layout(), 1).unwrap_err();
        assert!(matches!(
            err,
            ResourceError::ShaderSource {
                stage: ShaderStage::Geometry,
                ..
            }
        ));

        let mut program = ShaderProgram::load(&mut dev, "cube", &source, layout(), 1);
        assert!(!program.is_valid());
        assert!(program.bind(&mut dev).is_none());
        assert_eq!(dev.allocations(), 0);
    }

    #[test]
    fn shipped_cube_program_loads() {
        let mut dev = RecordingDevice::new();
        let program = ShaderProgram::load(&mut dev, "cube", &cube_source(), layout(), 1);
        assert!(program.is_valid());
        assert_eq!(dev.program_label(program.handle()), Some("cube"));
    }

    #[test]
    fn unknown_and_mismatched_uniforms_are_ignored() {
        let mut dev = RecordingDevice::new();
        let mut program = ShaderProgram::load(&mut dev, "cube", &cube_source(), layout(), 1);
        let mut bound = program.bind(&mut dev).unwrap();

        assert!(!bound.set_uniform("nope", 1.0f32));
        assert!(!bound.set_uniform("alpha", Vec3::ONE));
        assert!(bound.set_uniform("alpha", 0.5f32));
    }

    #[test]
    fn unchanged_uniforms_are_not_reuploaded() {
        let mut dev = RecordingDevice::new();
        let (vb, vl) = triangle(&mut dev);
        let mut program = ShaderProgram::load(&mut dev, "cube", &cube_source(), layout(), 1);
        let call = DrawCall {
            vertices: VertexStream {
                buffer: vb,
                layout: &vl,
            },
            indices: None,
            instance_stream: None,
            elements: 0..3,
            base_vertex: 0,
            instances: 0..1,
        };

        {
            let mut bound = program.bind(&mut dev).unwrap();
            bound.set_uniform("tint", Vec3::new(1.0, 0.5, 0.25));
            bound.draw(&call);
            bound.set_uniform("tint", Vec3::new(1.0, 0.5, 0.25));
            bound.draw(&call);
        }
        assert_eq!(dev.uniform_uploads(), 1);

        let draws = dev.draws();
        assert_eq!(draws.len(), 2);
        assert_eq!(read_f32s(&draws[1].uniforms[0..12]), [1.0, 0.5, 0.25]);
    }

    #[test]
    fn destroy_twice_releases_once() {
        let mut dev = RecordingDevice::new();
        let mut program = ShaderProgram::load(&mut dev, "cube", &cube_source(), layout(), 1);
        program.destroy(&mut dev);
        program.destroy(&mut dev);
        assert_eq!(dev.releases(), 1);
        assert!(!program.is_valid());
    }
}

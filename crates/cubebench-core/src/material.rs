use std::collections::BTreeMap;

use crate::device::RenderDevice;
use crate::handle::TextureHandle;
use crate::shader::{BoundProgram, UniformValue};

/// Semantic tag of a texture binding.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum TextureKind {
    Diffuse,
}

impl TextureKind {
    /// Name of the `i32` uniform that receives the texture unit.
    pub const fn uniform_name(self) -> &'static str {
        match self {
            TextureKind::Diffuse => "texture_diffuse",
        }
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct TextureBinding {
    pub handle: TextureHandle,
    pub kind: TextureKind,
    pub unit: u32,
}

/// Textures plus named uniform values applied to a bound program.
///
/// The material owns its textures and releases them in [`Material::release`].
#[derive(Debug, Clone, Default)]
pub struct Material {
    textures: Vec<TextureBinding>,
    uniforms: BTreeMap<String, UniformValue>,
}

impl Material {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a texture on the next free unit. Null handles are kept but never bound.
    pub fn with_texture(mut self, handle: TextureHandle, kind: TextureKind) -> Self {
        let unit = self.textures.len() as u32;
        self.textures.push(TextureBinding { handle, kind, unit });
        self
    }

    pub fn with_uniform(mut self, name: &str, value: impl Into<UniformValue>) -> Self {
        self.set(name, value);
        self
    }

    pub fn set(&mut self, name: &str, value: impl Into<UniformValue>) {
        self.uniforms.insert(name.to_string(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<UniformValue> {
        self.uniforms.get(name).copied()
    }

    pub fn textures(&self) -> &[TextureBinding] {
        &self.textures
    }

    /// Binds every live texture, then writes every uniform.
    pub fn apply(&self, bound: &mut BoundProgram<'_>) {
        for binding in &self.textures {
            if binding.handle.is_null() {
                continue;
            }
            bound.bind_texture(binding.unit, binding.handle);
            bound.set_uniform(binding.kind.uniform_name(), binding.unit as i32);
        }
        for (name, value) in &self.uniforms {
            bound.set_uniform(name, *value);
        }
    }

    /// Destroys owned textures. Safe to call repeatedly.
    pub fn release(&mut self, device: &mut dyn RenderDevice) {
        for binding in self.textures.drain(..) {
            if !binding.handle.is_null() {
                device.destroy_texture(binding.handle);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::RecordingDevice;
    use crate::geometry::{GeometryResource, MeshData};
    use crate::shader::{ShaderProgram, ShaderSource, UniformKind, UniformLayout};
    use crate::testing::{asset_dir, read_f32s, shader_dir};
    use glam::Vec3;

    fn program(dev: &mut RecordingDevice) -> ShaderProgram {
        let layout = UniformLayout::new(&[
            ("tint", UniformKind::Vec3),
            ("texture_diffuse", UniformKind::Int),
        ]);
        let src = ShaderSource::new(
            shader_dir().join("cube.vert.wgsl"),
            shader_dir().join("cube.frag.wgsl"),
        );
        ShaderProgram::load(dev, "cube", &src, layout, 1)
    }

    #[test]
    fn null_texture_is_skipped() {
        let mut dev = RecordingDevice::new();
        let mut prog = program(&mut dev);
        let cube = GeometryResource::upload(&mut dev, "cube", &MeshData::unit_cube()).unwrap();
        let material = Material::new().with_texture(TextureHandle::NULL, TextureKind::Diffuse);

        let mut bound = prog.bind(&mut dev).unwrap();
        material.apply(&mut bound);
        bound.draw(&cube.draw_call());
        drop(bound);

        assert!(dev.draws()[0].textures.is_empty());
    }

    #[test]
    fn apply_binds_texture_and_uniforms() {
        let mut dev = RecordingDevice::new();
        let texture = dev
            .load_texture(
                &asset_dir().join("textures/crate.png"),
                &Default::default(),
            )
            .unwrap();
        let mut prog = program(&mut dev);
        let cube = GeometryResource::upload(&mut dev, "cube", &MeshData::unit_cube()).unwrap();
        let material = Material::new()
            .with_texture(texture, TextureKind::Diffuse)
            .with_uniform("tint", Vec3::new(0.2, 0.4, 0.6))
            .with_uniform("missing", 1.0f32);

        let mut bound = prog.bind(&mut dev).unwrap();
        material.apply(&mut bound);
        bound.draw(&cube.draw_call());
        material.apply(&mut bound);
        bound.draw(&cube.draw_call());
        drop(bound);

        let draws = dev.draws();
        assert_eq!(draws[0], draws[1]);
        assert_eq!(draws[0].textures, vec![(0, texture)]);
        assert_eq!(read_f32s(&draws[0].uniforms[0..12]), [0.2, 0.4, 0.6]);
        assert_eq!(dev.uniform_uploads(), 1);
    }

    #[test]
    fn release_twice_destroys_once() {
        let mut dev = RecordingDevice::new();
        let texture = dev
            .load_texture(&asset_dir().join("textures/crate.png"), &Default::default())
            .unwrap();
        let mut material = Material::new().with_texture(texture, TextureKind::Diffuse);
        material.release(&mut dev);
        material.release(&mut dev);
        assert_eq!(dev.releases(), 1);
        assert!(material.textures().is_empty());
    }
}

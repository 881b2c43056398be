use crate::camera::{CameraState, WindowContext};
use crate::device::RenderDevice;
use crate::drawable::Drawable;
use crate::error::ResourceError;
use crate::geometry::{GeometryResource, MeshData};
use crate::handle::TextureHandle;
use crate::material::{Material, TextureKind};
use crate::positions::InstancePositionSet;
use crate::shader::{BoundProgram, ShaderProgram, ShaderSource, UniformKind, UniformLayout};
use crate::strategy::StrategyContext;

/// Shader location of the per-instance offset in the instanced vertex stage.
pub const INSTANCE_OFFSET_LOCATION: u32 = 3;

const TEXTURE_UNITS: u32 = 1;

/// Uniform block shared by the cube shaders.
pub fn cube_uniforms() -> UniformLayout {
    UniformLayout::new(&[
        ("model", UniformKind::Mat4),
        ("view", UniformKind::Mat4),
        ("projection", UniformKind::Mat4),
        ("tint", UniformKind::Vec3),
        ("alpha", UniformKind::Float),
        ("time", UniformKind::Float),
        ("texture_diffuse", UniformKind::Int),
    ])
}

/// Program, cube mesh, material and positions; the part every strategy shares.
///
/// Each field is filled in as `init` progresses so `release` can undo a partial init.
#[derive(Debug, Default)]
pub(crate) struct CubeResources {
    pub program: Option<ShaderProgram>,
    pub geometry: Option<GeometryResource>,
    pub drawable: Drawable,
    pub positions: Option<InstancePositionSet>,
}

impl CubeResources {
    /// Generates positions, loads the texture and builds the program.
    ///
    /// A texture failure is logged and leaves a null binding; a program failure is returned.
    pub fn init(
        &mut self,
        ctx: &mut StrategyContext<'_>,
        label: &str,
        shader: &ShaderSource,
    ) -> Result<(), ResourceError> {
        let assets = ctx.assets;
        self.positions = Some(InstancePositionSet::generate(assets.positions));

        let texture = match ctx
            .device
            .load_texture(&assets.texture, &assets.texture_config)
        {
            Ok(texture) => texture,
            Err(err) => {
                log::error!("{label}: {err}");
                TextureHandle::NULL
            }
        };
        self.drawable = Drawable::new(
            Material::new()
                .with_texture(texture, TextureKind::Diffuse)
                .with_uniform("tint", assets.tint)
                .with_uniform("alpha", assets.alpha),
        );

        let program = ShaderProgram::try_load(
            &mut *ctx.device,
            label,
            shader,
            cube_uniforms(),
            TEXTURE_UNITS,
        )?;
        self.program = Some(program);
        Ok(())
    }

    pub fn upload_cube(
        &mut self,
        device: &mut dyn RenderDevice,
        label: &str,
    ) -> Result<(), ResourceError> {
        let cube = GeometryResource::upload(device, label, &MeshData::unit_cube())?;
        self.geometry = Some(cube);
        Ok(())
    }

    /// Clamped object count; `0` before `init`.
    pub fn clamp(&self, count: usize) -> usize {
        self.positions.as_ref().map_or(0, |p| p.clamp(count))
    }

    pub fn release(&mut self, device: &mut dyn RenderDevice) {
        if let Some(mut program) = self.program.take() {
            program.destroy(device);
        }
        if let Some(mut geometry) = self.geometry.take() {
            geometry.destroy(device);
        }
        self.drawable.material.release(device);
        self.positions = None;
    }
}

/// Camera and clock uniforms, written once per frame.
pub(crate) fn set_frame_uniforms(
    bound: &mut BoundProgram<'_>,
    camera: &CameraState,
    window: &WindowContext,
) {
    bound.set_uniform("view", camera.view);
    bound.set_uniform("projection", camera.projection);
    bound.set_uniform("time", window.elapsed);
}

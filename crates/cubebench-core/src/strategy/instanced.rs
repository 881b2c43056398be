use glam::{Mat4, Vec3};

use crate::camera::{CameraState, WindowContext};
use crate::device::{BufferDesc, BufferUsage, VertexStream};
use crate::error::ResourceError;
use crate::geometry::VertexLayout;
use crate::handle::BufferHandle;
use crate::strategy::common::{CubeResources, INSTANCE_OFFSET_LOCATION, set_frame_uniforms};
use crate::strategy::{RenderStats, RenderStrategy, StrategyContext};

/// One instanced draw carrying every visible object.
///
/// All positions are uploaded once at init as a per-instance offset stream; a frame
/// only picks how many instances to draw.
#[derive(Debug)]
pub struct InstancedRenderer {
    res: CubeResources,
    instance_buffer: BufferHandle,
    instance_layout: VertexLayout,
}

impl Default for InstancedRenderer {
    fn default() -> Self {
        Self {
            res: CubeResources::default(),
            instance_buffer: BufferHandle::NULL,
            instance_layout: VertexLayout::instance_offset(INSTANCE_OFFSET_LOCATION),
        }
    }
}

impl InstancedRenderer {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RenderStrategy for InstancedRenderer {
    fn init(&mut self, ctx: &mut StrategyContext<'_>) -> Result<(), ResourceError> {
        let assets = ctx.assets;
        self.res.init(ctx, "instanced", &assets.instanced_shader)?;
        self.res.upload_cube(&mut *ctx.device, "instanced")?;

        let Some(positions) = self.res.positions.as_ref() else {
            return Ok(());
        };
        let bytes = positions.as_bytes();
        self.instance_buffer = ctx.device.create_buffer(
            &BufferDesc {
                label: "instance offsets",
                size: bytes.len().max(size_of::<Vec3>()) as u64,
                usage: BufferUsage::Vertex,
            },
            Some(bytes),
        )?;
        log::debug!("instanced: uploaded {} offsets", positions.cap());
        Ok(())
    }

    fn render(
        &mut self,
        ctx: &mut StrategyContext<'_>,
        count: usize,
        camera: &CameraState,
        window: &WindowContext,
    ) -> RenderStats {
        let count = self.res.clamp(count);
        if count == 0 || self.instance_buffer.is_null() {
            return RenderStats::default();
        }

        let res = &mut self.res;
        let (Some(program), Some(geometry)) = (res.program.as_mut(), res.geometry.as_ref()) else {
            return RenderStats::default();
        };
        let Some(mut bound) = program.bind(&mut *ctx.device) else {
            return RenderStats::default();
        };

        set_frame_uniforms(&mut bound, camera, window);
        res.drawable.material.apply(&mut bound);
        bound.set_uniform("model", Mat4::IDENTITY);

        let instances = VertexStream {
            buffer: self.instance_buffer,
            layout: &self.instance_layout,
        };
        bound.draw(&geometry.instanced_draw_call(Some(instances), 0..count as u32));

        RenderStats {
            objects: count,
            draw_calls: 1,
        }
    }

    fn cleanup(&mut self, ctx: &mut StrategyContext<'_>) {
        if !self.instance_buffer.is_null() {
            ctx.device.destroy_buffer(self.instance_buffer);
            self.instance_buffer = BufferHandle::NULL;
        }
        self.res.release(&mut *ctx.device);
    }

    fn name(&self) -> &'static str {
        "Instanced"
    }
}

use crate::camera::{CameraState, WindowContext};
use crate::error::ResourceError;
use crate::strategy::common::{CubeResources, set_frame_uniforms};
use crate::strategy::{RenderStats, RenderStrategy, StrategyContext};

/// One draw per object.
///
/// The shared drawable is moved to each position in turn and its material is
/// re-applied before every draw, so submission cost grows linearly with the count.
#[derive(Debug, Default)]
pub struct NaiveRenderer {
    res: CubeResources,
}

impl NaiveRenderer {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RenderStrategy for NaiveRenderer {
    fn init(&mut self, ctx: &mut StrategyContext<'_>) -> Result<(), ResourceError> {
        let assets = ctx.assets;
        self.res.init(ctx, "naive", &assets.cube_shader)?;
        self.res.upload_cube(&mut *ctx.device, "naive")
    }

    fn render(
        &mut self,
        ctx: &mut StrategyContext<'_>,
        count: usize,
        camera: &CameraState,
        window: &WindowContext,
    ) -> RenderStats {
        let count = self.res.clamp(count);
        if count == 0 {
            return RenderStats::default();
        }

        let res = &mut self.res;
        let (Some(program), Some(geometry), Some(positions)) =
            (res.program.as_mut(), res.geometry.as_ref(), res.positions.as_ref())
        else {
            return RenderStats::default();
        };
        let Some(mut bound) = program.bind(&mut *ctx.device) else {
            return RenderStats::default();
        };

        set_frame_uniforms(&mut bound, camera, window);
        for position in positions.visible(count) {
            res.drawable.transform.position = *position;
            res.drawable.draw(&mut bound, geometry);
        }

        RenderStats {
            objects: count,
            draw_calls: count,
        }
    }

    fn cleanup(&mut self, ctx: &mut StrategyContext<'_>) {
        self.res.release(&mut *ctx.device);
    }

    fn name(&self) -> &'static str {
        "Naive"
    }
}

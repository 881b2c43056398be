use std::ops::Range;

use glam::{Mat4, Vec3};

use crate::camera::{CameraState, WindowContext};
use crate::device::{
    BufferDesc, BufferUsage, DrawCall, IndexFormat, IndexStream, RenderDevice, VertexStream,
};
use crate::error::ResourceError;
use crate::geometry::{MeshData, Vertex, VertexLayout};
use crate::handle::BufferHandle;
use crate::strategy::common::{CubeResources, set_frame_uniforms};
use crate::strategy::{RenderStats, RenderStrategy, StrategyContext};
use crate::transform::Transform;

/// Objects per batched draw.
pub const BATCH_OBJECTS: usize = 4096;

/// Pre-transformed cubes in one shared vertex stream.
///
/// Cubes are transformed into world space on the CPU the first time they become
/// visible and written once into a stream sized for the whole cap. A frame binds the
/// program and material once and covers `count` cubes with `ceil(count / BATCH_OBJECTS)`
/// indexed draws; every draw reuses one static index block via `base_vertex`.
#[derive(Debug)]
pub struct BatchRenderer {
    res: CubeResources,
    mesh: MeshData,
    layout: VertexLayout,
    vertex_buffer: BufferHandle,
    index_buffer: BufferHandle,
    /// Cubes already written to `vertex_buffer`.
    uploaded: usize,
    scratch: Vec<Vertex>,
}

impl Default for BatchRenderer {
    fn default() -> Self {
        Self {
            res: CubeResources::default(),
            mesh: MeshData::unit_cube(),
            layout: VertexLayout::mesh(),
            vertex_buffer: BufferHandle::NULL,
            index_buffer: BufferHandle::NULL,
            uploaded: 0,
            scratch: Vec::new(),
        }
    }
}

impl BatchRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    fn vertices_per_cube(&self) -> usize {
        self.mesh.vertices.len()
    }

    fn indices_per_cube(&self) -> usize {
        self.mesh.indices.len()
    }

    /// Index block for `cubes` consecutive cubes, relative to the block's first vertex.
    fn index_block(&self, cubes: usize) -> Vec<u32> {
        let stride = self.vertices_per_cube() as u32;
        (0..cubes as u32)
            .flat_map(|cube| {
                self.mesh
                    .indices
                    .iter()
                    .map(move |&i| cube * stride + u32::from(i))
            })
            .collect()
    }

    /// Transforms and writes cubes `range` into the vertex stream.
    fn upload(
        &mut self,
        device: &mut dyn RenderDevice,
        range: Range<usize>,
    ) -> Result<(), ResourceError> {
        let Some(positions) = self.res.positions.as_ref() else {
            return Ok(());
        };

        self.scratch.clear();
        for position in &positions.all()[range.clone()] {
            let transform = Transform::from_position(*position);
            let model = transform.matrix();
            let rotation = transform.rotation_quat();
            self.scratch.extend(self.mesh.vertices.iter().map(|v| Vertex {
                position: model
                    .transform_point3(Vec3::from_array(v.position))
                    .to_array(),
                normal: (rotation * Vec3::from_array(v.normal)).to_array(),
                uv: v.uv,
            }));
        }

        let offset = (range.start * self.vertices_per_cube() * size_of::<Vertex>()) as u64;
        device.write_buffer(
            self.vertex_buffer,
            offset,
            bytemuck::cast_slice(&self.scratch),
        )?;
        self.uploaded = range.end;
        log::trace!("batch: uploaded cubes {range:?}");
        Ok(())
    }
}

impl RenderStrategy for BatchRenderer {
    fn init(&mut self, ctx: &mut StrategyContext<'_>) -> Result<(), ResourceError> {
        let assets = ctx.assets;
        self.res.init(ctx, "batch", &assets.cube_shader)?;
        // Buffers hold at least one cube so an empty position set still initialises.
        let cap = self.res.positions.as_ref().map_or(0, |p| p.cap()).max(1);

        let indices = self.index_block(cap.min(BATCH_OBJECTS));
        let index_bytes: &[u8] = bytemuck::cast_slice(&indices);
        self.index_buffer = ctx.device.create_buffer(
            &BufferDesc {
                label: "batch indices",
                size: index_bytes.len() as u64,
                usage: BufferUsage::Index,
            },
            Some(index_bytes),
        )?;

        self.vertex_buffer = ctx.device.create_buffer(
            &BufferDesc {
                label: "batch vertices",
                size: (cap * self.vertices_per_cube() * size_of::<Vertex>()) as u64,
                usage: BufferUsage::Vertex,
            },
            None,
        )?;
        self.uploaded = 0;
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
        if count == 0 || self.vertex_buffer.is_null() || self.index_buffer.is_null() {
            return RenderStats::default();
        }
        if !self.res.program.as_ref().is_some_and(|p| p.is_valid()) {
            return RenderStats::default();
        }

        if count > self.uploaded {
            if let Err(err) = self.upload(&mut *ctx.device, self.uploaded..count) {
                log::error!("batch: {err}");
                return RenderStats::default();
            }
        }

        let vertices_per_cube = self.vertices_per_cube();
        let indices_per_cube = self.indices_per_cube() as u32;
        let res = &mut self.res;
        let Some(program) = res.program.as_mut() else {
            return RenderStats::default();
        };
        let Some(mut bound) = program.bind(&mut *ctx.device) else {
            return RenderStats::default();
        };

        set_frame_uniforms(&mut bound, camera, window);
        res.drawable.material.apply(&mut bound);
        bound.set_uniform("model", Mat4::IDENTITY);

        let mut draw_calls = 0;
        for start in (0..count).step_by(BATCH_OBJECTS) {
            let cubes = (count - start).min(BATCH_OBJECTS) as u32;
            bound.draw(&DrawCall {
                vertices: VertexStream {
                    buffer: self.vertex_buffer,
                    layout: &self.layout,
                },
                indices: Some(IndexStream {
                    buffer: self.index_buffer,
                    format: IndexFormat::Uint32,
                }),
                instance_stream: None,
                elements: 0..cubes * indices_per_cube,
                base_vertex: (start * vertices_per_cube) as i32,
                instances: 0..1,
            });
            draw_calls += 1;
        }

        RenderStats {
            objects: count,
            draw_calls,
        }
    }

    fn cleanup(&mut self, ctx: &mut StrategyContext<'_>) {
        for buffer in [&mut self.vertex_buffer, &mut self.index_buffer] {
            if !buffer.is_null() {
                ctx.device.destroy_buffer(*buffer);
                *buffer = BufferHandle::NULL;
            }
        }
        self.uploaded = 0;
        self.scratch = Vec::new();
        self.res.release(&mut *ctx.device);
    }

    fn name(&self) -> &'static str {
        "Batch"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::RecordingDevice;
    use crate::positions::InstancePositionSet;
    use crate::testing::{read_f32s, scene_assets};

    fn frame(
        strategy: &mut BatchRenderer,
        device: &mut RecordingDevice,
        assets: &crate::assets::SceneAssets,
        count: usize,
    ) -> RenderStats {
        let mut ctx = StrategyContext { device, assets };
        strategy.render(
            &mut ctx,
            count,
            &CameraState::default(),
            &WindowContext::default(),
        )
    }

    #[test]
    fn draw_count_is_ceil_of_batches() {
        let assets = scene_assets(10_000);
        let mut device = RecordingDevice::new();
        let mut batch = BatchRenderer::new();
        batch
            .init(&mut StrategyContext {
                device: &mut device,
                assets: &assets,
            })
            .unwrap();

        assert_eq!(frame(&mut batch, &mut device, &assets, 1).draw_calls, 1);
        assert_eq!(frame(&mut batch, &mut device, &assets, 4096).draw_calls, 1);
        assert_eq!(frame(&mut batch, &mut device, &assets, 4097).draw_calls, 2);
        assert_eq!(frame(&mut batch, &mut device, &assets, 10_000).draw_calls, 3);

        let draws = device.take_draws();
        let last = &draws[draws.len() - 1];
        assert_eq!(last.base_vertex, (2 * BATCH_OBJECTS * 24) as i32);
        assert_eq!(last.elements, 0..(10_000 - 2 * BATCH_OBJECTS as u32) * 36);
    }

    #[test]
    fn vertices_are_uploaded_once_in_world_space() {
        let assets = scene_assets(64);
        let positions = InstancePositionSet::generate(assets.positions);
        let mut device = RecordingDevice::new();
        let mut batch = BatchRenderer::new();
        batch
            .init(&mut StrategyContext {
                device: &mut device,
                assets: &assets,
            })
            .unwrap();

        frame(&mut batch, &mut device, &assets, 10);
        frame(&mut batch, &mut device, &assets, 5);
        assert_eq!(device.buffer_writes(), 1);
        frame(&mut batch, &mut device, &assets, 64);
        assert_eq!(device.buffer_writes(), 2);

        let data = device.buffer_data(batch.vertex_buffer).unwrap();
        let floats = read_f32s(data);
        let floats_per_cube = 24 * 8;
        for (cube, expected) in positions.all().iter().enumerate() {
            let mut centre = Vec3::ZERO;
            for v in 0..24 {
                let at = cube * floats_per_cube + v * 8;
                centre += Vec3::from_slice(&floats[at..at + 3]);
            }
            assert!((centre / 24.0).abs_diff_eq(*expected, 1e-4), "cube {cube}");
        }
    }

    #[test]
    fn batched_frame_uses_identity_model() {
        let assets = scene_assets(16);
        let mut device = RecordingDevice::new();
        let mut batch = BatchRenderer::new();
        batch
            .init(&mut StrategyContext {
                device: &mut device,
                assets: &assets,
            })
            .unwrap();
        frame(&mut batch, &mut device, &assets, 16);

        let draw = &device.draws()[0];
        let model = read_f32s(&draw.uniforms[0..64]);
        assert_eq!(model, Mat4::IDENTITY.to_cols_array());
    }
}

//! Interchangeable draw-submission strategies.
//!
//! Every strategy draws the same textured cubes at the same deterministic positions;
//! they differ only in how the draws reach the device:
//!
//! - [`NaiveRenderer`]: one draw per object, material re-applied each time.
//! - [`BatchRenderer`]: cubes pre-transformed into one shared vertex stream, drawn in
//!   a handful of large indexed draws.
//! - [`InstancedRenderer`]: one instanced draw with a per-instance offset stream.

use crate::assets::SceneAssets;
use crate::camera::{CameraState, WindowContext};
use crate::device::RenderDevice;
use crate::error::ResourceError;

mod batched;
mod common;
mod instanced;
mod naive;

pub use batched::{BATCH_OBJECTS, BatchRenderer};
pub use common::{INSTANCE_OFFSET_LOCATION, cube_uniforms};
pub use instanced::InstancedRenderer;
pub use naive::NaiveRenderer;

/// Everything a strategy hook may touch, lent by the selector for one call.
pub struct StrategyContext<'a> {
    pub device: &'a mut dyn RenderDevice,
    pub assets: &'a SceneAssets,
}

/// What one `render` call submitted.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct RenderStats {
    /// Objects drawn after clamping.
    pub objects: usize,
    pub draw_calls: usize,
}

/// One draw-submission technique.
///
/// Lifecycle: `init` once, then any number of `render` calls, then `cleanup`.
pub trait RenderStrategy {
    /// Creates GPU resources. On error, whatever was already created stays owned by
    /// the strategy until `cleanup`.
    fn init(&mut self, ctx: &mut StrategyContext<'_>) -> Result<(), ResourceError>;

    /// Draws the first `count` objects; `count` is clamped to the position cap.
    /// A strategy missing any resource draws nothing.
    fn render(
        &mut self,
        ctx: &mut StrategyContext<'_>,
        count: usize,
        camera: &CameraState,
        window: &WindowContext,
    ) -> RenderStats;

    /// Releases every resource. Never fails and may be called repeatedly.
    fn cleanup(&mut self, ctx: &mut StrategyContext<'_>);

    fn name(&self) -> &'static str;
}

/// The closed set of strategies.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum StrategyKind {
    Naive,
    Batched,
    Instanced,
}

impl StrategyKind {
    pub const ALL: [StrategyKind; 3] = [
        StrategyKind::Naive,
        StrategyKind::Batched,
        StrategyKind::Instanced,
    ];

    pub const fn name(self) -> &'static str {
        match self {
            StrategyKind::Naive => "Naive",
            StrategyKind::Batched => "Batch",
            StrategyKind::Instanced => "Instanced",
        }
    }

    /// Case-insensitive lookup by display name.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "naive" => Some(StrategyKind::Naive),
            "batch" | "batched" => Some(StrategyKind::Batched),
            "instanced" | "instance" => Some(StrategyKind::Instanced),
            _ => None,
        }
    }

    pub fn create(self) -> Box<dyn RenderStrategy> {
        match self {
            StrategyKind::Naive => Box::new(NaiveRenderer::new()),
            StrategyKind::Batched => Box::new(BatchRenderer::new()),
            StrategyKind::Instanced => Box::new(InstancedRenderer::new()),
        }
    }
}

impl std::fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::{RecordedDraw, RecordingDevice};
    use crate::testing::{read_f32s, scene_assets};
    use glam::Vec3;

    fn render_frames(
        strategy: &mut dyn RenderStrategy,
        device: &mut RecordingDevice,
        assets: &crate::assets::SceneAssets,
        counts: &[usize],
    ) -> Vec<(RenderStats, Vec<RecordedDraw>)> {
        let mut frames = Vec::new();
        for &count in counts {
            let mut ctx = StrategyContext {
                device: &mut *device,
                assets,
            };
            let stats = strategy.render(
                &mut ctx,
                count,
                &CameraState::default(),
                &WindowContext::default(),
            );
            frames.push((stats, device.take_draws()));
        }
        frames
    }

    /// Initialises `kind`, renders `counts` and leaves its buffers alive.
    fn open(
        kind: StrategyKind,
        cap: usize,
        counts: &[usize],
    ) -> (RecordingDevice, Vec<(RenderStats, Vec<RecordedDraw>)>) {
        let assets = scene_assets(cap);
        let mut device = RecordingDevice::new();
        let mut strategy = kind.create();
        strategy
            .init(&mut StrategyContext {
                device: &mut device,
                assets: &assets,
            })
            .unwrap();
        let frames = render_frames(strategy.as_mut(), &mut device, &assets, counts);
        (device, frames)
    }

    fn run(
        kind: StrategyKind,
        cap: usize,
        counts: &[usize],
    ) -> (RecordingDevice, Vec<(RenderStats, Vec<RecordedDraw>)>) {
        let assets = scene_assets(cap);
        let mut device = RecordingDevice::new();
        let mut strategy = kind.create();
        strategy
            .init(&mut StrategyContext {
                device: &mut device,
                assets: &assets,
            })
            .unwrap();
        let frames = render_frames(strategy.as_mut(), &mut device, &assets, counts);
        strategy.cleanup(&mut StrategyContext {
            device: &mut device,
            assets: &assets,
        });
        (device, frames)
    }

    /// World positions visited by a naive frame: the translation column of `model`.
    fn naive_positions(draws: &[RecordedDraw]) -> Vec<Vec3> {
        draws
            .iter()
            .map(|d| Vec3::from_slice(&read_f32s(&d.uniforms[48..60])))
            .collect()
    }

    #[test]
    fn names_round_trip() {
        for kind in StrategyKind::ALL {
            assert_eq!(StrategyKind::from_name(kind.name()), Some(kind));
            assert_eq!(kind.create().name(), kind.name());
        }
        assert_eq!(StrategyKind::from_name(" BATCHED "), Some(StrategyKind::Batched));
        assert_eq!(StrategyKind::from_name("deferred"), None);
    }

    /// Cube centres covered by a batched frame, read back from the vertex stream.
    fn batched_positions(device: &RecordingDevice, draws: &[RecordedDraw]) -> Vec<Vec3> {
        const VERTS: usize = 24;
        const FLOATS: usize = 8;
        let mut centres = Vec::new();
        for draw in draws {
            let floats = read_f32s(device.buffer_data(draw.vertex_buffer).unwrap());
            let first = draw.base_vertex as usize / VERTS;
            let cubes = draw.elements.len() / 36;
            for cube in first..first + cubes {
                let centre: Vec3 = (0..VERTS)
                    .map(|v| {
                        let at = (cube * VERTS + v) * FLOATS;
                        Vec3::from_slice(&floats[at..at + 3])
                    })
                    .sum();
                centres.push(centre / VERTS as f32);
            }
        }
        centres
    }

    #[test]
    fn all_strategies_visit_the_same_positions() {
        let cap = 4097;
        let counts = [0, 1, 2, 57, 4096, 4097];
        let assets = scene_assets(cap);
        let positions = crate::positions::InstancePositionSet::generate(assets.positions);

        let (_, naive) = open(StrategyKind::Naive, cap, &counts);
        let (inst_device, instanced) = open(StrategyKind::Instanced, cap, &counts);
        let (batch_device, batched) = open(StrategyKind::Batched, cap, &counts);

        for (i, &count) in counts.iter().enumerate() {
            let (naive_stats, naive_draws) = &naive[i];
            let (inst_stats, inst_draws) = &instanced[i];
            let (batch_stats, batch_draws) = &batched[i];
            assert_eq!(naive_stats.objects, count);
            assert_eq!(inst_stats.objects, count);
            assert_eq!(batch_stats.objects, count);
            assert_eq!(naive_stats.draw_calls, count);
            assert_eq!(inst_stats.draw_calls, usize::from(count > 0));
            assert_eq!(batch_stats.draw_calls, count.div_ceil(BATCH_OBJECTS));

            let visited = naive_positions(naive_draws);
            assert_eq!(visited, positions.visible(count));

            let from_batches = batched_positions(&batch_device, batch_draws);
            assert_eq!(from_batches.len(), count);
            for (k, (got, want)) in from_batches.iter().zip(&visited).enumerate() {
                assert!(got.abs_diff_eq(*want, 1e-3), "count {count}, cube {k}");
            }

            if count > 0 {
                let draw = &inst_draws[0];
                let data = inst_device.buffer_data(draw.instance_buffer.unwrap()).unwrap();
                let instances = read_f32s(data);
                let from_instances: Vec<Vec3> = (draw.instances.start..draw.instances.end)
                    .map(|k| Vec3::from_slice(&instances[k as usize * 3..k as usize * 3 + 3]))
                    .collect();
                assert_eq!(from_instances, visited);
            }
        }
    }

    #[test]
    fn empty_position_set_initialises_every_strategy() {
        for kind in StrategyKind::ALL {
            let (device, frames) = open(kind, 0, &[0, 10]);
            for (stats, draws) in &frames {
                assert_eq!(*stats, RenderStats::default(), "{kind}");
                assert!(draws.is_empty(), "{kind}");
            }
            assert!(device.allocations() > 0, "{kind}");
        }
    }

    #[test]
    fn zero_count_draws_nothing() {
        for kind in StrategyKind::ALL {
            let (_, frames) = run(kind, 50, &[0]);
            assert_eq!(frames[0].0, RenderStats::default(), "{kind}");
            assert!(frames[0].1.is_empty(), "{kind}");
        }
    }

    #[test]
    fn oversized_count_is_clamped() {
        let cap = 120;
        for kind in StrategyKind::ALL {
            let (_, frames) = run(kind, cap, &[cap, cap + 1000]);
            assert_eq!(frames[0].0, frames[1].0, "{kind}");
            assert_eq!(frames[0].1, frames[1].1, "{kind}");
            assert_eq!(frames[1].0.objects, cap);
        }
    }

    #[test]
    fn cleanup_releases_everything_and_is_repeatable() {
        for kind in StrategyKind::ALL {
            let assets = scene_assets(10);
            let mut device = RecordingDevice::new();
            let mut strategy = kind.create();
            let mut ctx = StrategyContext {
                device: &mut device,
                assets: &assets,
            };
            strategy.cleanup(&mut ctx);
            strategy.init(&mut ctx).unwrap();
            strategy.cleanup(&mut ctx);
            strategy.cleanup(&mut ctx);
            assert_eq!(device.live_resources(), 0, "{kind}");
            assert_eq!(device.allocations(), device.releases(), "{kind}");
        }
    }

    #[test]
    fn render_after_cleanup_is_a_no_op() {
        for kind in StrategyKind::ALL {
            let assets = scene_assets(10);
            let mut device = RecordingDevice::new();
            let mut strategy = kind.create();
            let mut ctx = StrategyContext {
                device: &mut device,
                assets: &assets,
            };
            strategy.init(&mut ctx).unwrap();
            strategy.cleanup(&mut ctx);
            let stats = strategy.render(
                &mut ctx,
                10,
                &CameraState::default(),
                &WindowContext::default(),
            );
            assert_eq!(stats, RenderStats::default());
            assert!(device.draws().is_empty());
        }
    }
}

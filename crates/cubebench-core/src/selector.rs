//! The single active-strategy slot.
//!
//! ```text
//!   request(kind) ──► pending ──apply_pending──► cleanup old ─► create + init new
//!                                                               │ ok        │ err
//!                                                               ▼           ▼
//!                                                             Ready      Unloaded
//! ```
//!
//! Swaps only happen in [`StrategySelector::apply_pending`], which the render loop calls
//! between frames, so a swap never interrupts a frame in flight.

use crate::assets::SceneAssets;
use crate::camera::{CameraState, WindowContext};
use crate::device::RenderDevice;
use crate::strategy::{RenderStats, RenderStrategy, StrategyContext, StrategyKind};

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum SlotState {
    Unloaded,
    Ready,
}

enum Slot {
    Unloaded {
        kind: StrategyKind,
    },
    Ready {
        kind: StrategyKind,
        strategy: Box<dyn RenderStrategy>,
    },
}

/// Owns the scene inputs and at most one initialised strategy.
pub struct StrategySelector {
    assets: SceneAssets,
    slot: Slot,
    pending: Option<StrategyKind>,
}

impl StrategySelector {
    /// Starts `Unloaded` with `initial` queued; nothing touches the device until
    /// [`StrategySelector::apply_pending`].
    pub fn new(assets: SceneAssets, initial: StrategyKind) -> Self {
        Self {
            assets,
            slot: Slot::Unloaded { kind: initial },
            pending: Some(initial),
        }
    }

    pub fn assets(&self) -> &SceneAssets {
        &self.assets
    }

    /// Maximum object count the strategies are generated for.
    pub fn cap(&self) -> usize {
        self.assets.positions.cap
    }

    pub fn state(&self) -> SlotState {
        match self.slot {
            Slot::Unloaded { .. } => SlotState::Unloaded,
            Slot::Ready { .. } => SlotState::Ready,
        }
    }

    /// The selected kind, whether or not it initialised.
    pub fn kind(&self) -> StrategyKind {
        match self.slot {
            Slot::Unloaded { kind } | Slot::Ready { kind, .. } => kind,
        }
    }

    pub fn active_name(&self) -> Option<&'static str> {
        match &self.slot {
            Slot::Ready { strategy, .. } => Some(strategy.name()),
            Slot::Unloaded { .. } => None,
        }
    }

    /// Queues a swap to `kind`. The latest request wins.
    pub fn request(&mut self, kind: StrategyKind) {
        self.pending = Some(kind);
    }

    /// Performs a queued swap. Returns `true` when the slot changed.
    ///
    /// Requesting the kind that is already `Ready` is dropped; requesting a kind
    /// that failed to initialise retries it.
    pub fn apply_pending(&mut self, device: &mut dyn RenderDevice) -> bool {
        let Some(next) = self.pending.take() else {
            return false;
        };
        if let Slot::Ready { kind, .. } = &self.slot {
            if *kind == next {
                return false;
            }
        }

        self.unload(device);

        let mut strategy = next.create();
        let mut ctx = StrategyContext {
            device,
            assets: &self.assets,
        };
        match strategy.init(&mut ctx) {
            Ok(()) => {
                log::info!("strategy '{}' ready", strategy.name());
                self.slot = Slot::Ready {
                    kind: next,
                    strategy,
                };
            }
            Err(err) => {
                log::error!("strategy '{}' failed to initialise: {err}", strategy.name());
                strategy.cleanup(&mut ctx);
                self.slot = Slot::Unloaded { kind: next };
            }
        }
        true
    }

    /// Forwards to the active strategy. Draws nothing while `Unloaded`.
    pub fn render(
        &mut self,
        device: &mut dyn RenderDevice,
        count: usize,
        camera: &CameraState,
        window: &WindowContext,
    ) -> RenderStats {
        let Slot::Ready { strategy, .. } = &mut self.slot else {
            return RenderStats::default();
        };
        let mut ctx = StrategyContext {
            device,
            assets: &self.assets,
        };
        strategy.render(&mut ctx, count, camera, window)
    }

    /// Cleans up the active strategy and drops any queued swap. Idempotent.
    pub fn shutdown(&mut self, device: &mut dyn RenderDevice) {
        self.pending = None;
        self.unload(device);
    }

    fn unload(&mut self, device: &mut dyn RenderDevice) {
        let kind = self.kind();
        if let Slot::Ready { mut strategy, .. } =
            std::mem::replace(&mut self.slot, Slot::Unloaded { kind })
        {
            let mut ctx = StrategyContext {
                device,
                assets: &self.assets,
            };
            strategy.cleanup(&mut ctx);
            log::info!("strategy '{}' unloaded", strategy.name());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::RecordingDevice;
    use crate::testing::scene_assets;

    fn frame(
        selector: &mut StrategySelector,
        device: &mut RecordingDevice,
        count: usize,
    ) -> RenderStats {
        selector.render(
            device,
            count,
            &CameraState::default(),
            &WindowContext::default(),
        )
    }

    #[test]
    fn nothing_is_created_before_apply() {
        let mut device = RecordingDevice::new();
        let mut selector = StrategySelector::new(scene_assets(10), StrategyKind::Naive);
        assert_eq!(selector.state(), SlotState::Unloaded);
        assert_eq!(frame(&mut selector, &mut device, 10), RenderStats::default());
        assert_eq!(device.allocations(), 0);

        assert!(selector.apply_pending(&mut device));
        assert_eq!(selector.state(), SlotState::Ready);
        assert_eq!(selector.active_name(), Some("Naive"));
        assert_eq!(frame(&mut selector, &mut device, 10).draw_calls, 10);
    }

    #[test]
    fn repeated_swaps_do_not_leak() {
        let mut device = RecordingDevice::new();
        let mut selector = StrategySelector::new(scene_assets(50), StrategyKind::Naive);
        selector.apply_pending(&mut device);

        let order = [
            StrategyKind::Instanced,
            StrategyKind::Batched,
            StrategyKind::Naive,
            StrategyKind::Batched,
        ];
        for kind in order.into_iter().cycle().take(12) {
            selector.request(kind);
            assert!(selector.apply_pending(&mut device));
            assert_eq!(selector.kind(), kind);
            assert!(frame(&mut selector, &mut device, 50).draw_calls > 0);
            // One strategy's worth of resources at a time.
            assert!(device.live_programs() <= 1);
        }

        selector.shutdown(&mut device);
        selector.shutdown(&mut device);
        assert_eq!(device.live_resources(), 0);
        assert_eq!(device.allocations(), device.releases());
    }

    #[test]
    fn same_kind_request_is_ignored() {
        let mut device = RecordingDevice::new();
        let mut selector = StrategySelector::new(scene_assets(10), StrategyKind::Batched);
        selector.apply_pending(&mut device);
        let allocated = device.allocations();

        selector.request(StrategyKind::Batched);
        assert!(!selector.apply_pending(&mut device));
        assert_eq!(device.allocations(), allocated);
    }

    #[test]
    fn missing_vertex_shader_leaves_slot_unloaded() {
        let mut device = RecordingDevice::new();
        let mut assets = scene_assets(10);
        assets.cube_shader.vertex = assets.cube_shader.vertex.with_file_name("missing.vert.wgsl");

        let mut selector = StrategySelector::new(assets, StrategyKind::Naive);
        assert!(selector.apply_pending(&mut device));
        assert_eq!(selector.state(), SlotState::Unloaded);
        assert_eq!(selector.kind(), StrategyKind::Naive);
        assert_eq!(frame(&mut selector, &mut device, 10), RenderStats::default());
        assert!(device.draws().is_empty());
        // The texture loaded before the failure was released again.
        assert_eq!(device.live_resources(), 0);

        // Other strategies with intact shaders still load.
        selector.request(StrategyKind::Instanced);
        selector.apply_pending(&mut device);
        assert_eq!(selector.state(), SlotState::Ready);
    }
}

use cubebench_core::{RenderStats, SceneAssets, StrategySelector, WindowContext};
use cubebench_engine::core::{App, AppControl, FrameCtx};
use cubebench_engine::device::Gpu;
use cubebench_engine::input::{InputEvent, Key};
use cubebench_engine::render::{OverlayRenderer, WgpuBackend};
use cubebench_engine::scene::DrawList;
use cubebench_engine::text::{FontId, FontSystem};
use winit::window::WindowId;

use crate::camera::{CameraInput, FlyCamera};
use crate::config::{BenchConfig, ENV_FONT};
use crate::overlay::{self, Action, FrameStats};
use crate::panel::{BenchPanel, PanelState, PointerInput};

const CLEAR: wgpu::Color = wgpu::Color {
    r: 0.1,
    g: 0.1,
    b: 0.1,
    a: 1.0,
};

/// The benchmark: one strategy slot drawing `objects` cubes per frame, with the
/// control panel drawn on top.
///
/// The wgpu backend and the overlay renderer are created on the first frame, once
/// a surface exists.
pub struct BenchApp {
    title: String,
    selector: StrategySelector,
    backend: Option<WgpuBackend>,
    camera: FlyCamera,
    stats: FrameStats,
    last_stats: RenderStats,

    panel: BenchPanel,
    fonts: FontSystem,
    font: Option<FontId>,
    draw_list: DrawList,
    overlay: Option<OverlayRenderer>,

    objects: usize,
    max_objects: usize,

    captured: bool,
    started: bool,
}

impl BenchApp {
    pub fn new(config: &BenchConfig, assets: SceneAssets) -> Self {
        let mut fonts = FontSystem::new();
        let font = match config.load_font().map(|bytes| fonts.load_font(&bytes)) {
            Some(Ok(id)) => Some(id),
            Some(Err(err)) => {
                log::warn!("panel font: {err}");
                None
            }
            None => {
                log::warn!("no panel font found; set {ENV_FONT} to a .ttf file");
                None
            }
        };

        Self {
            title: config.title.clone(),
            selector: StrategySelector::new(assets, config.strategy),
            backend: None,
            camera: FlyCamera::default(),
            stats: FrameStats::default(),
            last_stats: RenderStats::default(),
            panel: BenchPanel::new(config.max_objects()),
            fonts,
            font,
            draw_list: DrawList::new(),
            overlay: None,
            objects: config.objects,
            max_objects: config.max_objects(),
            captured: false,
            started: false,
        }
    }

    fn handle_controls(&mut self, ctx: &mut FrameCtx<'_, '_>) -> AppControl {
        if !self.started {
            self.started = true;
            self.captured = ctx.window.set_cursor_captured(true);
        }

        let focus_lost = ctx
            .input_frame
            .events
            .iter()
            .any(|ev| *ev == InputEvent::Focused(false));
        if focus_lost && self.captured {
            self.captured = ctx.window.set_cursor_captured(false);
        }

        let mut actions = overlay::actions(ctx.input_frame);
        let pointer =
            (!self.captured).then(|| PointerInput::from_input(ctx.input, ctx.input_frame));
        let state = self.panel_state(ctx);
        actions.extend(self.panel.update(pointer, &state));

        for action in actions {
            match action {
                Action::Exit => return AppControl::Exit,
                Action::StepObjects(delta) => {
                    self.objects = overlay::step_objects(self.objects, delta, self.max_objects);
                    log::debug!("objects: {}", self.objects);
                }
                Action::Select(kind) => {
                    log::info!("switching to {kind}");
                    self.selector.request(kind);
                }
                Action::ToggleVsync => {
                    let vsync = !ctx.vsync();
                    ctx.set_vsync(vsync);
                }
                Action::ToggleCapture => {
                    self.captured = ctx.window.set_cursor_captured(!self.captured);
                }
            }
        }

        AppControl::Continue
    }

    fn panel_state(&self, ctx: &FrameCtx<'_, '_>) -> PanelState {
        PanelState {
            objects: self.objects,
            strategy: self.selector.kind(),
            vsync: ctx.vsync(),
            frame_seconds: ctx.time.raw_dt,
            draw_calls: self.last_stats.draw_calls,
        }
    }

    /// The pointer position the panel reacts to; none while the cursor is captured.
    fn panel_pointer(&self, ctx: &FrameCtx<'_, '_>) -> Option<(f32, f32)> {
        if self.captured {
            None
        } else {
            ctx.input.pointer_pos
        }
    }

    fn update_camera(&mut self, ctx: &FrameCtx<'_, '_>) {
        let over_panel = self
            .panel_pointer(ctx)
            .is_some_and(|p| self.panel.bounds().contains(p));
        let input = CameraInput {
            forward: ctx.input.key_down(Key::W),
            back: ctx.input.key_down(Key::S),
            left: ctx.input.key_down(Key::A),
            right: ctx.input.key_down(Key::D),
            look: if self.captured {
                ctx.input_frame.motion
            } else {
                (0.0, 0.0)
            },
            zoom: if over_panel {
                0.0
            } else {
                ctx.input_frame.scroll_lines
            },
        };
        self.camera.update(&input, ctx.time.dt);
    }

    fn strategy_label(&self) -> String {
        match self.selector.active_name() {
            Some(name) => name.to_string(),
            None => format!("{} (not loaded)", self.selector.kind()),
        }
    }
}

impl App for BenchApp {
    fn on_frame(&mut self, ctx: &mut FrameCtx<'_, '_>) -> AppControl {
        if self.handle_controls(ctx) == AppControl::Exit {
            return AppControl::Exit;
        }
        self.update_camera(ctx);

        let (width, height) = ctx.window.physical_size();
        if width == 0 || height == 0 {
            return AppControl::Continue;
        }

        let window = WindowContext {
            width,
            height,
            frame_index: ctx.time.frame_index,
            elapsed: ctx.time.elapsed,
        };
        let camera = self.camera.state(window.aspect());
        let objects = self.objects;

        self.draw_list.clear();
        let state = self.panel_state(ctx);
        let pointer = self.panel_pointer(ctx);
        self.panel
            .paint(&mut self.draw_list, &self.fonts, self.font, pointer, &state);

        let (selector, backend_slot, overlay_slot) =
            (&mut self.selector, &mut self.backend, &mut self.overlay);
        let (draw_list, fonts) = (&self.draw_list, &self.fonts);
        let mut frame_stats = RenderStats::default();

        let control = ctx.render(CLEAR, |rctx, target| {
            let backend = backend_slot.get_or_insert_with(|| WgpuBackend::new(rctx));
            {
                let mut device = backend.device(rctx);
                selector.apply_pending(&mut device);
                frame_stats = selector.render(&mut device, objects, &camera, &window);
            }
            backend.encode(rctx, target);

            overlay_slot
                .get_or_insert_with(|| OverlayRenderer::new(rctx))
                .render(rctx, target, draw_list, fonts);
        });
        self.last_stats = frame_stats;

        let label = self.strategy_label();
        if let Some(report) = self
            .stats
            .record(ctx.time.raw_dt, frame_stats, &label, ctx.vsync())
        {
            let title = report.title(&self.title);
            ctx.window.set_title(&title);
            log::info!("{title}");
        }

        control
    }

    fn on_window_destroyed(&mut self, _window_id: WindowId, gpu: &Gpu<'_>) {
        self.overlay = None;
        let Some(backend) = self.backend.as_mut() else {
            return;
        };

        let rctx = gpu.render_ctx(1.0);
        {
            let mut device = backend.device(&rctx);
            self.selector.shutdown(&mut device);
        }
        log::info!(
            "strategy shut down; {} GPU resources still alive",
            backend.live_resources()
        );
        self.backend = None;
    }
}

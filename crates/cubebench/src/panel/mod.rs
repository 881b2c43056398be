//! On-screen "Benchmark" panel: object count, renderer choice, vsync and live timings.
//!
//! Widgets keep no state the app does not own; values are synced from
//! [`PanelState`] before events are routed, and every change comes back as an
//! [`Action`] that the app applies like a key binding.

mod event;
mod widgets;

use cubebench_core::StrategyKind;
use cubebench_engine::scene::{Color, DrawList, Rect};
use cubebench_engine::text::{FontId, FontSystem};

use crate::config::MIN_OBJECTS;
use crate::overlay::Action;

pub use event::PointerInput;
use event::PointerTracker;
use widgets::{Checkbox, DIM, Painter, RadioGroup, Slider, TEXT};

const BACKGROUND: Color = Color::rgba(0.06, 0.07, 0.1, 0.85);
const SEPARATOR: Color = Color::rgba(0.35, 0.45, 0.6, 0.6);

const ORIGIN: (f32, f32) = (10.0, 10.0);
const WIDTH: f32 = 300.0;
const PAD: f32 = 8.0;
const ROW: f32 = 22.0;
const GAP: f32 = 4.0;

/// What the panel shows this frame.
#[derive(Debug, Clone, PartialEq)]
pub struct PanelState {
    pub objects: usize,
    pub strategy: StrategyKind,
    pub vsync: bool,
    /// Seconds the previous frame took.
    pub frame_seconds: f32,
    pub draw_calls: usize,
}

/// Widget rectangles, top to bottom.
#[derive(Debug, Clone, PartialEq)]
struct Layout {
    panel: Rect,
    title: Rect,
    count_label: Rect,
    slider: Rect,
    renderer_label: Rect,
    renderer: Rect,
    vsync: Rect,
    separator: Rect,
    stats: [Rect; 3],
}

impl Layout {
    fn new() -> Self {
        let x = ORIGIN.0 + PAD;
        let w = WIDTH - 2.0 * PAD;
        let mut y = ORIGIN.1 + PAD;
        let mut take = |h: f32| {
            let r = Rect::new(x, y, w, h);
            y += h + GAP;
            r
        };

        let title = take(ROW);
        let count_label = take(ROW);
        let slider = take(ROW);
        let renderer_label = take(ROW);
        let renderer = take(ROW * StrategyKind::ALL.len() as f32);
        let vsync = take(ROW);
        let separator = take(1.0);
        let stats = [take(ROW), take(ROW), take(ROW)];

        let bottom = stats[2].bottom() + PAD;
        Self {
            panel: Rect::new(ORIGIN.0, ORIGIN.1, WIDTH, bottom - ORIGIN.1),
            title,
            count_label,
            slider,
            renderer_label,
            renderer,
            vsync,
            separator,
            stats,
        }
    }
}

/// The benchmark control panel.
#[derive(Debug)]
pub struct BenchPanel {
    layout: Layout,
    tracker: PointerTracker,
    objects: Slider,
    renderer: RadioGroup,
    vsync: Checkbox,
}

impl BenchPanel {
    pub fn new(max_objects: usize) -> Self {
        Self {
            layout: Layout::new(),
            tracker: PointerTracker::default(),
            objects: Slider::new(MIN_OBJECTS, MIN_OBJECTS, max_objects),
            renderer: RadioGroup::new(StrategyKind::ALL.iter().map(|k| k.name()).collect(), 0),
            vsync: Checkbox::new("VSync", false),
        }
    }

    /// The panel's screen area in logical pixels.
    pub fn bounds(&self) -> Rect {
        self.layout.panel
    }

    fn sync(&mut self, state: &PanelState) {
        self.objects.value = state.objects.clamp(self.objects.min, self.objects.max);
        self.renderer.selected = strategy_index(state.strategy);
        self.vsync.checked = state.vsync;
    }

    /// Routes this frame's pointer input through the widgets.
    ///
    /// Pass `None` while the cursor is captured for camera look.
    pub fn update(&mut self, pointer: Option<PointerInput>, state: &PanelState) -> Vec<Action> {
        self.sync(state);
        let Some(pointer) = pointer else {
            self.tracker.reset();
            return Vec::new();
        };

        let mut actions = Vec::new();
        for event in self.tracker.events(pointer) {
            let before = self.objects.value;
            if let Some(next) = self.objects.on_event(&event, self.layout.slider) {
                actions.push(Action::StepObjects(next as i64 - before as i64));
            }
            if let Some(i) = self.renderer.on_event(&event, self.layout.renderer) {
                actions.push(Action::Select(StrategyKind::ALL[i]));
            }
            if self.vsync.on_event(&event, self.layout.vsync).is_some() {
                actions.push(Action::ToggleVsync);
            }
        }
        actions
    }

    /// Paints the panel into `list`. Text needs `font`; without it only the
    /// shapes are drawn.
    pub fn paint(
        &self,
        list: &mut DrawList,
        fonts: &FontSystem,
        font: Option<FontId>,
        pointer: Option<(f32, f32)>,
        state: &PanelState,
    ) {
        let l = &self.layout;
        let mut painter = Painter::new(list, fonts, font, pointer);

        painter.fill(l.panel, BACKGROUND);
        painter.text("Benchmark", TEXT, l.title.x, l.title);
        painter.text("Object Count", DIM, l.count_label.x, l.count_label);
        self.objects.paint(&mut painter, l.slider);
        painter.text("Renderer", DIM, l.renderer_label.x, l.renderer_label);
        self.renderer.paint(&mut painter, l.renderer);
        self.vsync.paint(&mut painter, l.vsync);
        painter.fill(l.separator, SEPARATOR);

        for (row, line) in l.stats.iter().zip(stat_lines(state)) {
            painter.text(&line, TEXT, row.x, *row);
        }
    }
}

fn strategy_index(kind: StrategyKind) -> usize {
    StrategyKind::ALL
        .iter()
        .position(|k| *k == kind)
        .unwrap_or_default()
}

/// FPS, frame time and draw calls of the previous frame.
fn stat_lines(state: &PanelState) -> [String; 3] {
    let dt = state.frame_seconds.max(0.0);
    let fps = if dt > 0.0 { 1.0 / dt } else { 0.0 };
    [
        format!("FPS: {fps:.1}"),
        format!("Frame Time: {:.3} ms", dt * 1000.0),
        format!("Draw Calls: {}", state.draw_calls),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state() -> PanelState {
        PanelState {
            objects: 100,
            strategy: StrategyKind::Naive,
            vsync: false,
            frame_seconds: 0.004,
            draw_calls: 100,
        }
    }

    fn centre(r: Rect) -> (f32, f32) {
        (r.x + r.w * 0.5, r.y + r.h * 0.5)
    }

    fn click(pos: (f32, f32)) -> PointerInput {
        PointerInput {
            pos: Some(pos),
            down: false,
            pressed: true,
            released: true,
        }
    }

    #[test]
    fn layout_rows_stack_inside_the_panel() {
        let l = Layout::new();
        let rows = [l.title, l.count_label, l.slider, l.renderer_label, l.renderer, l.vsync];
        for pair in rows.windows(2) {
            assert!(pair[0].bottom() <= pair[1].y);
        }
        assert!(l.stats[2].bottom() < l.panel.bottom());
        assert_eq!(l.renderer.h, ROW * 3.0);
    }

    #[test]
    fn clicking_a_renderer_row_selects_it() {
        let mut panel = BenchPanel::new(50_000);
        let row = panel.renderer.row(panel.layout.renderer, 2);
        let actions = panel.update(Some(click(centre(row))), &state());
        assert_eq!(actions, vec![Action::Select(StrategyKind::Instanced)]);

        // The app has not applied the swap yet; the panel follows app state.
        panel.update(None, &state());
        assert_eq!(panel.renderer.selected, 0);
    }

    #[test]
    fn clicking_vsync_toggles_it() {
        let mut panel = BenchPanel::new(50_000);
        let actions = panel.update(Some(click(centre(panel.layout.vsync))), &state());
        assert_eq!(actions, vec![Action::ToggleVsync]);
    }

    #[test]
    fn dragging_the_slider_steps_the_object_count() {
        let mut panel = BenchPanel::new(50_000);
        let track = panel.layout.slider;
        let y = track.y + 5.0;

        let press = PointerInput {
            pos: Some((track.x + 1.0, y)),
            down: true,
            pressed: true,
            released: false,
        };
        panel.update(Some(press), &state());

        let to_end = PointerInput {
            pos: Some((track.right() + 50.0, y)),
            down: true,
            pressed: false,
            released: false,
        };
        let actions = panel.update(Some(to_end), &state());
        assert_eq!(actions, vec![Action::StepObjects(50_000 - 100)]);
    }

    #[test]
    fn captured_cursor_routes_nothing() {
        let mut panel = BenchPanel::new(50_000);
        assert!(panel.update(None, &state()).is_empty());
    }

    #[test]
    fn stat_lines_use_the_previous_frame() {
        let lines = stat_lines(&state());
        assert_eq!(lines[0], "FPS: 250.0");
        assert_eq!(lines[1], "Frame Time: 4.000 ms");
        assert_eq!(lines[2], "Draw Calls: 100");

        let idle = PanelState {
            frame_seconds: 0.0,
            ..state()
        };
        assert_eq!(stat_lines(&idle)[0], "FPS: 0.0");
    }

    #[test]
    fn painting_fills_the_background_first() {
        let panel = BenchPanel::new(50_000);
        let fonts = FontSystem::new();
        let mut list = DrawList::new();
        panel.paint(&mut list, &fonts, None, None, &state());
        let first = list.iter().next();
        assert!(matches!(
            first,
            Some(cubebench_engine::scene::DrawCmd::Rect { rect, .. }) if *rect == panel.bounds()
        ));
    }
}

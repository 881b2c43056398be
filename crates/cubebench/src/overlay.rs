//! Keyboard controls and frame statistics.
//!
//! Statistics go to the window title and the log once per second.

use std::time::Duration;

use cubebench_core::{RenderStats, StrategyKind};
use cubebench_engine::input::{InputFrame, Key};

use crate::config::MIN_OBJECTS;

const SMALL_STEP: i64 = 10;
const LARGE_STEP: i64 = 1000;

/// A control triggered by a key press this frame.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Action {
    StepObjects(i64),
    Select(StrategyKind),
    ToggleVsync,
    ToggleCapture,
    Exit,
}

const BINDINGS: [(Key, Action); 10] = [
    (Key::Escape, Action::Exit),
    (Key::ArrowUp, Action::StepObjects(SMALL_STEP)),
    (Key::ArrowDown, Action::StepObjects(-SMALL_STEP)),
    (Key::PageUp, Action::StepObjects(LARGE_STEP)),
    (Key::PageDown, Action::StepObjects(-LARGE_STEP)),
    (Key::Digit1, Action::Select(StrategyKind::Naive)),
    (Key::Digit2, Action::Select(StrategyKind::Batched)),
    (Key::Digit3, Action::Select(StrategyKind::Instanced)),
    (Key::V, Action::ToggleVsync),
    (Key::F, Action::ToggleCapture),
];

/// Actions for this frame's key presses, in binding order.
pub fn actions(frame: &InputFrame) -> Vec<Action> {
    let mut out: Vec<Action> = BINDINGS
        .iter()
        .filter(|(key, _)| frame.key_pressed(*key))
        .map(|(_, action)| *action)
        .collect();

    // F and G both toggle capture; pressing both in one frame toggles once.
    if frame.key_pressed(Key::G) && !frame.key_pressed(Key::F) {
        out.push(Action::ToggleCapture);
    }
    out
}

/// Applies a signed step to `current`, keeping the result in `[MIN_OBJECTS, max]`.
pub fn step_objects(current: usize, delta: i64, max: usize) -> usize {
    let max = max.max(MIN_OBJECTS);
    let next = if delta >= 0 {
        current.saturating_add(delta.unsigned_abs() as usize)
    } else {
        current.saturating_sub(delta.unsigned_abs() as usize)
    };
    next.clamp(MIN_OBJECTS, max)
}

/// One second's worth of frame statistics.
#[derive(Debug, Clone, PartialEq)]
pub struct StatsReport {
    pub fps: f32,
    pub frame_ms: f32,
    pub draw_calls: usize,
    pub objects: usize,
    pub strategy: String,
    pub vsync: bool,
}

impl StatsReport {
    pub fn title(&self, base: &str) -> String {
        format!(
            "{base} | {} | {} objects | {} draws | {:.0} FPS ({:.2} ms) | vsync {}",
            self.strategy,
            self.objects,
            self.draw_calls,
            self.fps,
            self.frame_ms,
            if self.vsync { "on" } else { "off" },
        )
    }
}

/// Accumulates frame times and reports averages once per `interval`.
#[derive(Debug, Clone)]
pub struct FrameStats {
    interval: Duration,
    accumulated: f32,
    frames: u32,
}

impl Default for FrameStats {
    fn default() -> Self {
        Self::new(Duration::from_secs(1))
    }
}

impl FrameStats {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            accumulated: 0.0,
            frames: 0,
        }
    }

    /// Records one frame. Returns a report when the interval has elapsed; the
    /// draw counts come from the latest frame.
    pub fn record(
        &mut self,
        frame_seconds: f32,
        stats: RenderStats,
        strategy: &str,
        vsync: bool,
    ) -> Option<StatsReport> {
        self.accumulated += frame_seconds.max(0.0);
        self.frames += 1;

        if self.accumulated < self.interval.as_secs_f32() {
            return None;
        }

        let avg = self.accumulated / self.frames as f32;
        let report = StatsReport {
            fps: if avg > 0.0 { 1.0 / avg } else { 0.0 },
            frame_ms: avg * 1000.0,
            draw_calls: stats.draw_calls,
            objects: stats.objects,
            strategy: strategy.to_string(),
            vsync,
        };
        self.accumulated = 0.0;
        self.frames = 0;
        Some(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pressed(keys: &[Key]) -> InputFrame {
        let mut frame = InputFrame::default();
        frame.keys_pressed.extend(keys.iter().copied());
        frame
    }

    #[test]
    fn keys_map_to_actions() {
        let frame = pressed(&[Key::Digit2, Key::ArrowUp, Key::V]);
        assert_eq!(
            actions(&frame),
            vec![
                Action::StepObjects(10),
                Action::Select(StrategyKind::Batched),
                Action::ToggleVsync,
            ]
        );
        assert!(actions(&InputFrame::default()).is_empty());
    }

    #[test]
    fn f_and_g_toggle_capture_once() {
        assert_eq!(actions(&pressed(&[Key::G])), vec![Action::ToggleCapture]);
        assert_eq!(
            actions(&pressed(&[Key::F, Key::G])),
            vec![Action::ToggleCapture]
        );
    }

    #[test]
    fn steps_stay_in_bounds() {
        assert_eq!(step_objects(100, 10, 50_000), 110);
        assert_eq!(step_objects(5, -10, 50_000), MIN_OBJECTS);
        assert_eq!(step_objects(49_500, 1000, 50_000), 50_000);
        assert_eq!(step_objects(1, -1000, 50_000), MIN_OBJECTS);
    }

    #[test]
    fn reports_once_per_interval() {
        let mut stats = FrameStats::new(Duration::from_secs(1));
        let frame = RenderStats {
            objects: 100,
            draw_calls: 100,
        };

        for _ in 0..3 {
            assert!(stats.record(0.25, frame, "Naive", false).is_none());
        }
        let report = stats
            .record(0.25, frame, "Naive", false)
            .expect("fourth quarter-second completes the interval");
        assert!((report.fps - 4.0).abs() < 1e-4);
        assert!((report.frame_ms - 250.0).abs() < 1e-3);
        assert_eq!(report.draw_calls, 100);

        assert!(stats.record(0.25, frame, "Naive", false).is_none());
    }

    #[test]
    fn title_lists_every_statistic() {
        let report = StatsReport {
            fps: 59.6,
            frame_ms: 16.78,
            draw_calls: 2,
            objects: 5000,
            strategy: "Batch".to_string(),
            vsync: true,
        };
        assert_eq!(
            report.title("cubebench"),
            "cubebench | Batch | 5000 objects | 2 draws | 60 FPS (16.78 ms) | vsync on"
        );
    }
}

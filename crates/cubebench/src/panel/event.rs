use cubebench_engine::input::{InputFrame, InputState, MouseButton};

/// A release this close to its press counts as a click.
const CLICK_SLOP: f32 = 4.0;

/// Pointer events routed to the panel widgets, in logical pixels.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum UiEvent {
    /// Primary button pressed and released at about the same spot.
    Click { pos: (f32, f32) },
    /// Pointer moved while the primary button is held; `start` is where the press began.
    Drag { pos: (f32, f32), start: (f32, f32) },
    /// Primary button released after a press. Fires even outside the widget, so
    /// widgets check `start` to claim it.
    DragEnd { pos: (f32, f32), start: (f32, f32) },
}

/// Primary-button state for one frame.
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct PointerInput {
    pub pos: Option<(f32, f32)>,
    pub down: bool,
    pub pressed: bool,
    pub released: bool,
}

impl PointerInput {
    pub fn from_input(state: &InputState, frame: &InputFrame) -> Self {
        Self {
            pos: state.pointer_pos,
            down: state.button_down(MouseButton::Left),
            pressed: frame.buttons_pressed.contains(&MouseButton::Left),
            released: frame.buttons_released.contains(&MouseButton::Left),
        }
    }
}

/// Turns per-frame button state into click and drag events.
#[derive(Debug, Default)]
pub struct PointerTracker {
    press: Option<(f32, f32)>,
}

impl PointerTracker {
    pub fn events(&mut self, input: PointerInput) -> Vec<UiEvent> {
        let mut out = Vec::new();
        if input.pressed {
            self.press = input.pos;
        }

        let (Some(start), Some(pos)) = (self.press, input.pos) else {
            if input.released {
                self.press = None;
            }
            return out;
        };

        if input.down {
            out.push(UiEvent::Drag { pos, start });
        }
        if input.released {
            self.press = None;
            out.push(UiEvent::DragEnd { pos, start });
            let (dx, dy) = (pos.0 - start.0, pos.1 - start.1);
            if dx.abs() <= CLICK_SLOP && dy.abs() <= CLICK_SLOP {
                out.push(UiEvent::Click { pos });
            }
        }
        out
    }

    /// Forgets a press in progress, e.g. when the cursor is captured mid-drag.
    pub fn reset(&mut self) {
        self.press = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(x: f32, y: f32) -> PointerInput {
        PointerInput {
            pos: Some((x, y)),
            ..Default::default()
        }
    }

    #[test]
    fn press_drag_release_emits_drags_then_drag_end() {
        let mut tracker = PointerTracker::default();
        let press = PointerInput {
            pressed: true,
            down: true,
            ..at(10.0, 10.0)
        };
        assert_eq!(
            tracker.events(press),
            vec![UiEvent::Drag {
                pos: (10.0, 10.0),
                start: (10.0, 10.0)
            }]
        );

        let held = PointerInput {
            down: true,
            ..at(40.0, 12.0)
        };
        assert_eq!(
            tracker.events(held),
            vec![UiEvent::Drag {
                pos: (40.0, 12.0),
                start: (10.0, 10.0)
            }]
        );

        let release = PointerInput {
            released: true,
            ..at(50.0, 12.0)
        };
        assert_eq!(
            tracker.events(release),
            vec![UiEvent::DragEnd {
                pos: (50.0, 12.0),
                start: (10.0, 10.0)
            }]
        );
        assert!(tracker.events(at(50.0, 12.0)).is_empty());
    }

    #[test]
    fn press_and_release_in_one_frame_is_a_click() {
        let mut tracker = PointerTracker::default();
        let tap = PointerInput {
            pressed: true,
            released: true,
            ..at(5.0, 5.0)
        };
        let events = tracker.events(tap);
        assert_eq!(events.last(), Some(&UiEvent::Click { pos: (5.0, 5.0) }));
    }

    #[test]
    fn release_without_press_or_position_is_silent() {
        let mut tracker = PointerTracker::default();
        let release = PointerInput {
            released: true,
            ..at(5.0, 5.0)
        };
        assert!(tracker.events(release).is_empty());

        let press = PointerInput {
            pressed: true,
            down: true,
            ..at(5.0, 5.0)
        };
        tracker.events(press);
        let lost = PointerInput {
            released: true,
            ..Default::default()
        };
        assert!(tracker.events(lost).is_empty());
        assert!(tracker.events(release).is_empty());
    }
}

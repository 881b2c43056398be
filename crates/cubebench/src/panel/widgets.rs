use cubebench_engine::scene::{Color, DrawList, Rect};
use cubebench_engine::text::{FontId, FontSystem};

use super::event::UiEvent;

pub const TEXT: Color = Color::rgba(0.85, 0.85, 0.9, 1.0);
pub const DIM: Color = Color::rgba(0.55, 0.6, 0.7, 1.0);
const TRACK: Color = Color::rgba(0.15, 0.2, 0.3, 1.0);
const FILL: Color = Color::rgba(0.2, 0.6, 1.0, 1.0);
const HOVER_FILL: Color = Color::rgba(0.3, 0.7, 1.0, 1.0);
const BOX_BG: Color = Color::rgba(0.1, 0.12, 0.18, 1.0);
const BORDER: Color = Color::rgba(0.35, 0.45, 0.6, 1.0);

const FONT_SIZE: f32 = 14.0;

/// Drawing surface handed to widget `paint` calls.
///
/// Text is skipped when no font is loaded; rectangles are always drawn.
pub struct Painter<'a> {
    list: &'a mut DrawList,
    fonts: &'a FontSystem,
    font: Option<FontId>,
    /// Pointer position in logical pixels.
    pub pointer: Option<(f32, f32)>,
}

impl<'a> Painter<'a> {
    pub fn new(
        list: &'a mut DrawList,
        fonts: &'a FontSystem,
        font: Option<FontId>,
        pointer: Option<(f32, f32)>,
    ) -> Self {
        Self {
            list,
            fonts,
            font,
            pointer,
        }
    }

    #[inline]
    pub fn is_hovered(&self, rect: Rect) -> bool {
        self.pointer.is_some_and(|p| rect.contains(p))
    }

    pub fn fill(&mut self, rect: Rect, color: Color) {
        self.list.push_rect(rect, color);
    }

    /// A filled rectangle with a 1px border drawn underneath it.
    pub fn framed(&mut self, rect: Rect, fill: Color, border: Color) {
        self.list.push_rect(rect, border);
        self.list.push_rect(rect.inset(1.0), fill);
    }

    /// Draws one line of text vertically centred in `row`, starting at `x`.
    pub fn text(&mut self, text: &str, color: Color, x: f32, row: Rect) {
        let Some(font) = self.font else {
            return;
        };
        let (_, h) = self.fonts.measure_text(text, font, FONT_SIZE);
        let y = row.y + (row.h - h) * 0.5;
        self.list.push_text(text, font, FONT_SIZE, color, (x, y));
    }

    /// Width of `text` at the panel font size; zero without a font.
    pub fn text_width(&self, text: &str) -> f32 {
        self.font
            .map_or(0.0, |f| self.fonts.measure_text(text, f, FONT_SIZE).0)
    }
}

/// Integer slider over `min..=max`. Dragging moves the value continuously.
#[derive(Debug, Clone, PartialEq)]
pub struct Slider {
    pub value: usize,
    pub min: usize,
    pub max: usize,
}

impl Slider {
    pub fn new(value: usize, min: usize, max: usize) -> Self {
        let max = max.max(min);
        Self {
            value: value.clamp(min, max),
            min,
            max,
        }
    }

    fn normalized(&self) -> f32 {
        if self.max == self.min {
            0.0
        } else {
            (self.value - self.min) as f32 / (self.max - self.min) as f32
        }
    }

    fn value_at(&self, x: f32, rect: Rect) -> usize {
        let t = ((x - rect.x) / rect.w).clamp(0.0, 1.0);
        let span = (self.max - self.min) as f32;
        self.min + (t * span).round() as usize
    }

    /// Returns the new value when the event moved it.
    pub fn on_event(&mut self, event: &UiEvent, rect: Rect) -> Option<usize> {
        let pos = match event {
            UiEvent::Drag { pos, start } | UiEvent::DragEnd { pos, start }
                if rect.contains(*start) =>
            {
                *pos
            }
            _ => return None,
        };
        let next = self.value_at(pos.0, rect);
        if next == self.value {
            return None;
        }
        self.value = next;
        Some(next)
    }

    pub fn paint(&self, painter: &mut Painter<'_>, rect: Rect) {
        painter.framed(rect, TRACK, BORDER);

        let inner = rect.inset(1.0);
        let fill = Rect::new(inner.x, inner.y, inner.w * self.normalized(), inner.h);
        let color = if painter.is_hovered(rect) {
            HOVER_FILL
        } else {
            FILL
        };
        painter.fill(fill, color);

        let label = self.value.to_string();
        let x = rect.x + (rect.w - painter.text_width(&label)) * 0.5;
        painter.text(&label, Color::WHITE, x, rect);
    }
}

/// Exclusive choice among labelled rows stacked top to bottom.
#[derive(Debug, Clone, PartialEq)]
pub struct RadioGroup {
    pub labels: Vec<&'static str>,
    pub selected: usize,
}

impl RadioGroup {
    pub fn new(labels: Vec<&'static str>, selected: usize) -> Self {
        Self { labels, selected }
    }

    /// Row `i` of a group laid out in `rect`.
    pub fn row(&self, rect: Rect, i: usize) -> Rect {
        let h = rect.h / self.labels.len().max(1) as f32;
        Rect::new(rect.x, rect.y + h * i as f32, rect.w, h)
    }

    /// Returns the newly selected row; clicking the current row changes nothing.
    pub fn on_event(&mut self, event: &UiEvent, rect: Rect) -> Option<usize> {
        let UiEvent::Click { pos } = event else {
            return None;
        };
        let hit = (0..self.labels.len()).find(|&i| self.row(rect, i).contains(*pos))?;
        if hit == self.selected {
            return None;
        }
        self.selected = hit;
        Some(hit)
    }

    pub fn paint(&self, painter: &mut Painter<'_>, rect: Rect) {
        for (i, label) in self.labels.iter().enumerate() {
            let row = self.row(rect, i);
            let dot = mark_box(row);
            painter.framed(dot, BOX_BG, BORDER);
            if i == self.selected {
                painter.fill(dot.inset(4.0), FILL);
            } else if painter.is_hovered(row) {
                painter.fill(dot.inset(4.0), DIM);
            }
            painter.text(label, TEXT, dot.right() + 8.0, row);
        }
    }
}

/// Labelled on/off box.
#[derive(Debug, Clone, PartialEq)]
pub struct Checkbox {
    pub label: &'static str,
    pub checked: bool,
}

impl Checkbox {
    pub fn new(label: &'static str, checked: bool) -> Self {
        Self { label, checked }
    }

    /// Returns the new state when a click toggled the box.
    pub fn on_event(&mut self, event: &UiEvent, rect: Rect) -> Option<bool> {
        match event {
            UiEvent::Click { pos } if rect.contains(*pos) => {
                self.checked = !self.checked;
                Some(self.checked)
            }
            _ => None,
        }
    }

    pub fn paint(&self, painter: &mut Painter<'_>, rect: Rect) {
        let mark = mark_box(rect);
        let border = if painter.is_hovered(rect) { DIM } else { BORDER };
        painter.framed(mark, BOX_BG, border);
        if self.checked {
            painter.fill(mark.inset(3.0), FILL);
        }
        painter.text(self.label, TEXT, mark.right() + 8.0, rect);
    }
}

/// The 14px square at the left edge of a row.
fn mark_box(row: Rect) -> Rect {
    let size = 14.0_f32.min(row.h);
    Rect::new(row.x, row.y + (row.h - size) * 0.5, size, size)
}

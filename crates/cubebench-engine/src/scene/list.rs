use crate::text::FontId;

use super::rect::{Color, Rect};

/// One overlay primitive.
#[derive(Debug, Clone, PartialEq)]
pub enum DrawCmd {
    Rect {
        rect: Rect,
        color: Color,
    },
    /// `origin` is the top-left of the line box.
    Text {
        text: String,
        font: FontId,
        size: f32,
        color: Color,
        origin: (f32, f32),
    },
}

/// Overlay primitives in paint order; later commands draw on top.
#[derive(Debug, Default)]
pub struct DrawList {
    cmds: Vec<DrawCmd>,
}

impl DrawList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.cmds.clear();
    }

    /// Empty and zero-alpha rectangles are dropped.
    pub fn push_rect(&mut self, rect: Rect, color: Color) {
        if rect.is_empty() || color.a <= 0.0 {
            return;
        }
        self.cmds.push(DrawCmd::Rect { rect, color });
    }

    pub fn push_text(
        &mut self,
        text: impl Into<String>,
        font: FontId,
        size: f32,
        color: Color,
        origin: (f32, f32),
    ) {
        let text = text.into();
        if text.is_empty() || size <= 0.0 {
            return;
        }
        self.cmds.push(DrawCmd::Text {
            text,
            font,
            size,
            color,
            origin,
        });
    }

    pub fn iter(&self) -> impl Iterator<Item = &DrawCmd> {
        self.cmds.iter()
    }

    pub fn len(&self) -> usize {
        self.cmds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cmds.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn degenerate_commands_are_dropped() {
        let mut list = DrawList::new();
        list.push_rect(Rect::new(0.0, 0.0, 0.0, 10.0), Color::WHITE);
        list.push_rect(Rect::new(0.0, 0.0, 10.0, 10.0), Color::rgba(1.0, 0.0, 0.0, 0.0));
        list.push_text("", FontId(0), 12.0, Color::WHITE, (0.0, 0.0));
        assert!(list.is_empty());
    }

    #[test]
    fn paint_order_is_insertion_order() {
        let mut list = DrawList::new();
        let back = Rect::new(0.0, 0.0, 100.0, 50.0);
        list.push_rect(back, Color::WHITE);
        list.push_text("FPS", FontId(0), 14.0, Color::WHITE, (4.0, 4.0));

        let cmds: Vec<_> = list.iter().collect();
        assert!(matches!(cmds[0], DrawCmd::Rect { rect, .. } if *rect == back));
        assert!(matches!(cmds[1], DrawCmd::Text { text, .. } if text == "FPS"));

        list.clear();
        assert_eq!(list.len(), 0);
    }

    #[test]
    fn rect_contains_is_half_open() {
        let r = Rect::new(10.0, 10.0, 20.0, 5.0);
        assert!(r.contains((10.0, 10.0)));
        assert!(r.contains((29.9, 14.9)));
        assert!(!r.contains((30.0, 12.0)));
        assert!(!r.contains((15.0, 15.0)));
        assert_eq!(r.inset(2.0), Rect::new(12.0, 12.0, 16.0, 1.0));
        assert_eq!(r.inset(10.0).h, 0.0);
    }
}

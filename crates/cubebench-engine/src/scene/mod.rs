//! Overlay draw list: solid rectangles and text in logical pixels.

mod list;
mod rect;

pub use list::{DrawCmd, DrawList};
pub use rect::{Color, Rect};

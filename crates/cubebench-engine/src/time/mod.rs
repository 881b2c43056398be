//! Frame timing.
//!
//! One `FrameClock` per window; `tick()` once per presented frame yields a
//! `FrameTime` with the clamped delta, the frame index and the time since start.

mod frame_clock;

pub use frame_clock::{FrameClock, FrameTime};

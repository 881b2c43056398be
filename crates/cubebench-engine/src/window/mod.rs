//! Window and event loop.
//!
//! Owns the `winit` EventLoop and one window per GPU surface, and drives
//! [`crate::core::App`] once per redraw.

mod runtime;

pub use runtime::{Runtime, RuntimeConfig, RuntimeCtx};

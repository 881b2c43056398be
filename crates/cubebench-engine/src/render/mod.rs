//! GPU rendering subsystem.
//!
//! [`WgpuBackend`] implements the core's `RenderDevice` on wgpu; [`OverlayRenderer`]
//! draws the screen-space panel on top. [`RenderCtx`] and [`RenderTarget`] are what a
//! frame hands to both.

mod backend;
mod ctx;
mod overlay;

pub use backend::{DEPTH_FORMAT, MAX_TEXTURE_UNITS, WgpuBackend, WgpuDevice};
pub use ctx::{RenderCtx, RenderTarget};
pub use overlay::OverlayRenderer;

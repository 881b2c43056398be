//! Platform and GPU runtime for cubebench.
//!
//! Opens the window, owns the wgpu device, translates input, and provides
//! [`render::WgpuBackend`], the wgpu implementation of the core crate's
//! `RenderDevice`, plus a small screen-space overlay ([`scene`], [`text`],
//! [`render::OverlayRenderer`]).

pub mod core;
pub mod device;
pub mod input;
pub mod logging;
pub mod render;
pub mod scene;
pub mod text;
pub mod time;
pub mod window;

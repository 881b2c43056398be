//! wgpu device and surface management.
//!
//! - `Gpu` owns the Instance/Adapter/Device/Queue and the configured surface
//! - `GpuFrame` is one acquired swapchain image plus its encoder
//! - present mode can be switched at runtime for vsync toggling

mod error;
mod frame;
mod gpu;
mod init;
mod surface;

pub use error::SurfaceErrorAction;
pub use frame::GpuFrame;
pub use gpu::Gpu;
pub use init::GpuInit;

//! Core of the cube benchmark: interchangeable draw-submission strategies and the
//! shared resources they draw from.
//!
//! This crate never talks to a graphics API directly. Every GPU operation goes
//! through [`device::RenderDevice`], implemented by the engine's wgpu backend and by
//! [`device::RecordingDevice`] for headless runs.
//!
//! # Structure
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`device`] | `RenderDevice` seam, draw/buffer/program descriptors, `RecordingDevice` |
//! | [`shader`] | `ShaderProgram`, `BoundProgram`, uniform values and layout |
//! | [`geometry`] | vertex layouts, `MeshData`, `GeometryResource` |
//! | [`material`] | texture bindings + named uniform values |
//! | [`drawable`] | transform + material submitted as one draw |
//! | [`positions`] | deterministic `InstancePositionSet` |
//! | [`strategy`] | `RenderStrategy` and the naive / batched / instanced strategies |
//! | [`selector`] | `StrategySelector`, the single active-strategy slot |

pub mod assets;
pub mod camera;
pub mod device;
pub mod drawable;
pub mod error;
pub mod geometry;
pub mod handle;
pub mod material;
pub mod positions;
pub mod selector;
pub mod shader;
pub mod strategy;
pub mod transform;

#[cfg(test)]
mod testing;

pub use assets::{AssetRoot, SceneAssets};
pub use camera::{CameraState, WindowContext};
pub use device::{RecordingDevice, RenderDevice};
pub use error::{AssetError, ResourceError};
pub use handle::{BufferHandle, ProgramHandle, TextureHandle};
pub use positions::{InstancePositionSet, PositionParams};
pub use selector::{SlotState, StrategySelector};
pub use shader::{ShaderProgram, ShaderSource};
pub use strategy::{RenderStats, RenderStrategy, StrategyContext, StrategyKind};
pub use transform::Transform;

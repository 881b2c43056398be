//! Shader programs and their typed uniform block.

mod program;
mod uniform;

pub use program::{BoundProgram, ShaderProgram, ShaderSource};
pub use uniform::{UniformKind, UniformLayout, UniformSlot, UniformValue};

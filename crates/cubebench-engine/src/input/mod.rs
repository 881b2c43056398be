//! Input subsystem.
//!
//! The public API does not expose winit types; [`translate`] maps platform events
//! into [`InputEvent`]s for the runtime.

mod frame;
mod state;
pub(crate) mod translate;
mod types;

pub use frame::InputFrame;
pub use state::InputState;
pub use types::{
    InputEvent, Key, KeyState, Modifiers, MouseButton, MouseButtonState, MouseWheelDelta,
    PointerButtonEvent,
};

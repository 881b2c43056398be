//! Opaque GPU resource handles.
//!
//! Handles are plain `u32` ids minted by a [`RenderDevice`](crate::device::RenderDevice).
//! The value `0` is reserved as the null handle: a resource that failed to be created
//! or has already been released. Devices ignore null handles.

macro_rules! gpu_handle {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Hash, PartialOrd, Ord)]
        pub struct $name(pub u32);

        impl $name {
            pub const NULL: Self = Self(0);

            #[inline]
            pub const fn is_null(self) -> bool {
                self.0 == 0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}#{}", stringify!($name), self.0)
            }
        }
    };
}

gpu_handle!(
    /// Linked shader program.
    ProgramHandle
);
gpu_handle!(
    /// Vertex, index or instance buffer.
    BufferHandle
);
gpu_handle!(
    /// Sampled 2D texture.
    TextureHandle
);

/// Monotonic id source shared by device implementations.
///
/// Never yields `0`.
#[derive(Debug)]
pub struct HandleAllocator {
    next: u32,
}

impl Default for HandleAllocator {
    fn default() -> Self {
        Self { next: 1 }
    }
}

impl HandleAllocator {
    pub fn next(&mut self) -> u32 {
        let id = self.next;
        self.next = self.next.wrapping_add(1).max(1);
        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_handle_is_null() {
        assert!(ProgramHandle::default().is_null());
        assert!(BufferHandle::NULL.is_null());
        assert!(!TextureHandle(3).is_null());
    }

    #[test]
    fn allocator_never_yields_zero() {
        let mut ids = HandleAllocator { next: u32::MAX };
        assert_eq!(ids.next(), u32::MAX);
        assert_eq!(ids.next(), 1);
    }
}

use glam::{Mat4, Vec3};

/// View and projection for one frame. Read-only to strategies.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct CameraState {
    pub view: Mat4,
    pub projection: Mat4,
    pub position: Vec3,
}

impl Default for CameraState {
    fn default() -> Self {
        Self {
            view: Mat4::IDENTITY,
            projection: Mat4::IDENTITY,
            position: Vec3::ZERO,
        }
    }
}

impl CameraState {
    /// Right-handed perspective camera looking from `position` towards `target`.
    ///
    /// Depth maps to `0..1`.
    pub fn perspective(position: Vec3, target: Vec3, fov_y_degrees: f32, aspect: f32) -> Self {
        Self {
            view: Mat4::look_at_rh(position, target, Vec3::Y),
            projection: Mat4::perspective_rh(fov_y_degrees.to_radians(), aspect, 0.1, 100.0),
            position,
        }
    }
}

/// Per-frame window token handed to `render`.
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct WindowContext {
    pub width: u32,
    pub height: u32,
    pub frame_index: u64,
    /// Seconds since the render loop started.
    pub elapsed: f32,
}

impl WindowContext {
    pub fn aspect(&self) -> f32 {
        if self.height == 0 {
            1.0
        } else {
            self.width as f32 / self.height as f32
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_height_aspect_is_one() {
        let w = WindowContext {
            width: 640,
            height: 0,
            ..WindowContext::default()
        };
        assert_eq!(w.aspect(), 1.0);
    }

    #[test]
    fn target_lands_in_front_of_camera() {
        let cam = CameraState::perspective(Vec3::new(0.0, 0.0, 5.0), Vec3::ZERO, 45.0, 1.0);
        let clip = cam.projection * cam.view * Vec3::ZERO.extend(1.0);
        let ndc = clip.truncate() / clip.w;
        assert!(ndc.x.abs() < 1e-6 && ndc.y.abs() < 1e-6);
        assert!(ndc.z > 0.0 && ndc.z < 1.0);
    }
}

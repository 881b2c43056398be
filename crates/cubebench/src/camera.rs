use cubebench_core::CameraState;
use glam::Vec3;

pub const START_POSITION: Vec3 = Vec3::new(0.0, 0.0, 5.0);

const START_YAW: f32 = -90.0;
const MAX_PITCH: f32 = 89.0;
const MIN_FOV: f32 = 1.0;
const MAX_FOV: f32 = 45.0;

/// Movement requested for one frame.
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct CameraInput {
    pub forward: bool,
    pub back: bool,
    pub left: bool,
    pub right: bool,

    /// Mouse motion in raw device units. Ignored unless the cursor is captured.
    pub look: (f32, f32),

    /// Wheel lines; positive zooms in.
    pub zoom: f32,
}

/// First-person camera: yaw/pitch in degrees, movement in the view plane.
#[derive(Debug, Clone, PartialEq)]
pub struct FlyCamera {
    pub position: Vec3,
    pub yaw: f32,
    pub pitch: f32,
    pub fov: f32,

    /// World units per second.
    pub speed: f32,

    /// Degrees per unit of mouse motion.
    pub sensitivity: f32,
}

impl Default for FlyCamera {
    fn default() -> Self {
        Self {
            position: START_POSITION,
            yaw: START_YAW,
            pitch: 0.0,
            fov: MAX_FOV,
            speed: 2.5,
            sensitivity: 0.1,
        }
    }
}

impl FlyCamera {
    pub fn front(&self) -> Vec3 {
        let (yaw, pitch) = (self.yaw.to_radians(), self.pitch.to_radians());
        Vec3::new(yaw.cos() * pitch.cos(), pitch.sin(), yaw.sin() * pitch.cos()).normalize()
    }

    pub fn update(&mut self, input: &CameraInput, dt: f32) {
        let (dx, dy) = input.look;
        self.yaw += dx * self.sensitivity;
        self.pitch = (self.pitch - dy * self.sensitivity).clamp(-MAX_PITCH, MAX_PITCH);

        self.fov = (self.fov - input.zoom).clamp(MIN_FOV, MAX_FOV);

        let front = self.front();
        let right = front.cross(Vec3::Y).normalize();
        let step = self.speed * dt;

        let mut delta = Vec3::ZERO;
        if input.forward {
            delta += front;
        }
        if input.back {
            delta -= front;
        }
        if input.right {
            delta += right;
        }
        if input.left {
            delta -= right;
        }
        self.position += delta * step;
    }

    pub fn state(&self, aspect: f32) -> CameraState {
        CameraState::perspective(self.position, self.position + self.front(), self.fov, aspect)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: Vec3, b: Vec3) -> bool {
        (a - b).length() < 1e-5
    }

    #[test]
    fn starts_looking_down_negative_z() {
        let cam = FlyCamera::default();
        assert_eq!(cam.position, START_POSITION);
        assert!(close(cam.front(), Vec3::NEG_Z));
    }

    #[test]
    fn forward_and_strafe_move_in_view_plane() {
        let mut cam = FlyCamera::default();
        cam.update(
            &CameraInput {
                forward: true,
                ..CameraInput::default()
            },
            1.0,
        );
        assert!(close(cam.position, Vec3::new(0.0, 0.0, 2.5)));

        cam.update(
            &CameraInput {
                right: true,
                ..CameraInput::default()
            },
            2.0,
        );
        assert!(close(cam.position, Vec3::new(5.0, 0.0, 2.5)));
    }

    #[test]
    fn pitch_and_fov_are_clamped() {
        let mut cam = FlyCamera::default();
        cam.update(
            &CameraInput {
                look: (0.0, -10_000.0),
                zoom: 100.0,
                ..CameraInput::default()
            },
            0.0,
        );
        assert_eq!(cam.pitch, MAX_PITCH);
        assert_eq!(cam.fov, MIN_FOV);

        cam.update(
            &CameraInput {
                zoom: -100.0,
                ..CameraInput::default()
            },
            0.0,
        );
        assert_eq!(cam.fov, MAX_FOV);
    }

    #[test]
    fn state_looks_along_front() {
        let cam = FlyCamera::default();
        let state = cam.state(16.0 / 9.0);
        assert_eq!(state.position, START_POSITION);
        let ahead = state.view.transform_point3(START_POSITION + cam.front());
        assert!(close(ahead, Vec3::new(0.0, 0.0, -1.0)));
    }
}

use glam::{Mat4, Quat, Vec3};

/// Position, rotation and scale of one object.
///
/// `rotation` holds Euler angles in radians. They are applied about the world axes in
/// the order X, then Y, then Z.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Transform {
    pub position: Vec3,
    pub rotation: Vec3,
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Vec3::ZERO,
            scale: Vec3::ONE,
        }
    }
}

impl Transform {
    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            ..Self::default()
        }
    }

    pub fn rotation_quat(&self) -> Quat {
        let r = self.rotation;
        Quat::from_rotation_z(r.z) * Quat::from_rotation_y(r.y) * Quat::from_rotation_x(r.x)
    }

    /// Model matrix: translate * rotate * scale.
    pub fn matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation_quat(), self.position)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::FRAC_PI_2;

    #[test]
    fn default_is_identity() {
        assert_eq!(Transform::default().matrix(), Mat4::IDENTITY);
    }

    #[test]
    fn x_rotation_is_applied_before_y() {
        let t = Transform {
            rotation: Vec3::new(FRAC_PI_2, FRAC_PI_2, 0.0),
            ..Transform::default()
        };
        let v = t.matrix().transform_vector3(Vec3::Y);
        assert!(v.abs_diff_eq(Vec3::X, 1e-6), "{v}");
    }

    #[test]
    fn scale_happens_before_translation() {
        let t = Transform {
            position: Vec3::new(1.0, 2.0, 3.0),
            scale: Vec3::splat(2.0),
            ..Transform::default()
        };
        let p = t.matrix().transform_point3(Vec3::ONE);
        assert_eq!(p, Vec3::new(3.0, 4.0, 5.0));
    }
}

use glam::{EulerRot, Quat, Vec3};
use serde::{Deserialize, Serialize};

/// Camera position and orientation.
///
/// Orientation is yaw about world up followed by pitch about the camera's
/// local right axis (Euler order YXZ), so the camera never rolls. At zero yaw
/// and pitch the camera looks down -Z.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CameraPose {
    pub position: Vec3,
    pub yaw: f32,
    pub pitch: f32,
}

impl Default for CameraPose {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            yaw: 0.0,
            pitch: 0.0,
        }
    }
}

impl CameraPose {
    pub fn rotation(&self) -> Quat {
        Quat::from_euler(EulerRot::YXZ, self.yaw, self.pitch, 0.0)
    }

    pub fn look_direction(&self) -> Vec3 {
        self.rotation() * Vec3::NEG_Z
    }

    /// Look direction projected onto the ground plane and renormalised.
    ///
    /// Taken from yaw alone: for any pitch strictly inside `(-pi/2, pi/2)`
    /// this equals the projected look direction, and it stays well defined
    /// when the camera looks straight up or down.
    pub fn horizontal_forward(&self) -> Vec3 {
        Vec3::new(-self.yaw.sin(), 0.0, -self.yaw.cos())
    }

    /// Perpendicular of the horizontal forward vector, pointing right.
    pub fn horizontal_right(&self) -> Vec3 {
        let f = self.horizontal_forward();
        Vec3::new(-f.z, 0.0, f.x)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::{FRAC_PI_2, FRAC_PI_4};

    fn close(a: Vec3, b: Vec3) -> bool {
        (a - b).length() < 1e-5
    }

    #[test]
    fn identity_looks_down_negative_z() {
        let pose = CameraPose::default();
        assert!(close(pose.look_direction(), Vec3::NEG_Z));
        assert!(close(pose.horizontal_forward(), Vec3::NEG_Z));
        assert!(close(pose.horizontal_right(), Vec3::X));
    }

    #[test]
    fn horizontal_forward_matches_projected_look() {
        for (yaw, pitch) in [(0.3, 0.2), (-2.0, -1.0), (4.0, 1.2), (FRAC_PI_4, -0.01)] {
            let pose = CameraPose {
                yaw,
                pitch,
                ..CameraPose::default()
            };
            let look = pose.look_direction();
            let projected = Vec3::new(look.x, 0.0, look.z).normalize();
            assert!(close(projected, pose.horizontal_forward()));
        }
    }

    #[test]
    fn no_roll_right_axis_stays_horizontal() {
        let pose = CameraPose {
            yaw: 1.1,
            pitch: 0.9,
            ..CameraPose::default()
        };
        let right = pose.rotation() * Vec3::X;
        assert!(right.y.abs() < 1e-6);
    }

    #[test]
    fn looking_straight_up_keeps_a_forward() {
        let pose = CameraPose {
            yaw: 0.0,
            pitch: FRAC_PI_2,
            ..CameraPose::default()
        };
        assert!(close(pose.look_direction(), Vec3::Y));
        assert!(close(pose.horizontal_forward(), Vec3::NEG_Z));
    }

    #[test]
    fn basis_is_orthonormal() {
        let pose = CameraPose {
            yaw: 2.5,
            ..CameraPose::default()
        };
        let f = pose.horizontal_forward();
        let r = pose.horizontal_right();
        assert!((f.length() - 1.0).abs() < 1e-6);
        assert!((r.length() - 1.0).abs() < 1e-6);
        assert!(f.dot(r).abs() < 1e-6);
    }
}

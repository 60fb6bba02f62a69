use glam::{Mat4, Vec3, Vec4};
use pitchwalk_render::RenderView;

/// View and projection for one render pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraMatrices {
    pub view: Mat4,
    pub projection: Mat4,
    /// Eye position in world space.
    pub eye: Vec3,
}

impl CameraMatrices {
    /// Perspective camera placed at the view's pose.
    pub fn from_view(view: &RenderView, aspect: f32) -> Self {
        let pose = view.pose();
        let world = Mat4::from_rotation_translation(pose.rotation(), pose.position);
        let aspect = if aspect.is_finite() && aspect > 0.0 {
            aspect
        } else {
            1.0
        };
        Self {
            view: world.inverse(),
            projection: Mat4::perspective_rh(
                view.fov_degrees.to_radians(),
                aspect,
                view.near,
                view.far,
            ),
            eye: pose.position,
        }
    }

    pub fn view_projection(&self) -> Mat4 {
        self.projection * self.view
    }

    /// The same camera looking at the scene mirrored about the horizontal
    /// plane `y = height`. Geometry drawn with this view appears as its
    /// reflection in that plane, with triangle winding reversed.
    pub fn mirrored(&self, height: f32) -> Self {
        Self {
            view: self.view * reflection_matrix(height),
            projection: self.projection,
            eye: Vec3::new(self.eye.x, 2.0 * height - self.eye.y, self.eye.z),
        }
    }
}

/// Reflection about the horizontal plane `y = height`.
pub fn reflection_matrix(height: f32) -> Mat4 {
    Mat4::from_translation(Vec3::new(0.0, height, 0.0))
        * Mat4::from_scale(Vec3::new(1.0, -1.0, 1.0))
        * Mat4::from_translation(Vec3::new(0.0, -height, 0.0))
}

/// Plane equation keeping the half-space above `y = height`:
/// a point `p` is kept when `dot(plane.xyz, p) + plane.w >= 0`.
pub fn clip_plane_above(height: f32) -> Vec4 {
    Vec4::new(0.0, 1.0, 0.0, -height)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pitchwalk_kernel::CameraPose;

    fn close(a: Vec3, b: Vec3) -> bool {
        (a - b).length() < 1e-4
    }

    #[test]
    fn identity_pose_gives_identity_view() {
        let cam = CameraMatrices::from_view(&RenderView::default(), 16.0 / 9.0);
        assert!(cam.view.abs_diff_eq(Mat4::IDENTITY, 1e-6));
    }

    #[test]
    fn point_ahead_lands_in_clip_volume() {
        let pose = CameraPose {
            position: Vec3::new(1.0, 1.0, 3.0),
            yaw: 0.4,
            pitch: -0.3,
        };
        let view = RenderView::from_pose(&pose, 75.0, 0.1, 100.0);
        let cam = CameraMatrices::from_view(&view, 1.5);
        let ahead = pose.position + pose.look_direction() * 5.0;
        let ndc = cam.view_projection().project_point3(ahead);
        assert!(ndc.x.abs() < 1e-4 && ndc.y.abs() < 1e-4);
        assert!(ndc.z > 0.0 && ndc.z < 1.0);
    }

    #[test]
    fn reflection_is_an_involution_fixing_the_plane() {
        let m = reflection_matrix(0.32);
        assert!(close(m.transform_point3(Vec3::new(1.0, 1.32, 2.0)), Vec3::new(1.0, -0.68, 2.0)));
        assert!(close(m.transform_point3(Vec3::new(4.0, 0.32, -1.0)), Vec3::new(4.0, 0.32, -1.0)));
        assert!((m * m).abs_diff_eq(Mat4::IDENTITY, 1e-6));
    }

    #[test]
    fn mirrored_camera_sees_reflected_points() {
        let view = RenderView::from_pose(
            &CameraPose {
                position: Vec3::new(0.0, 2.0, 5.0),
                yaw: 0.0,
                pitch: -0.4,
            },
            75.0,
            0.1,
            100.0,
        );
        let cam = CameraMatrices::from_view(&view, 1.0);
        let mirror = cam.mirrored(0.5);
        assert!(close(mirror.eye, Vec3::new(0.0, -1.0, 5.0)));

        let p = Vec3::new(0.3, 1.2, -2.0);
        let reflected = reflection_matrix(0.5).transform_point3(p);
        let a = mirror.view_projection().project_point3(p);
        let b = cam.view_projection().project_point3(reflected);
        assert!(close(a, b));
    }

    #[test]
    fn clip_plane_keeps_points_above() {
        let plane = clip_plane_above(0.32);
        let side = |p: Vec3| plane.truncate().dot(p) + plane.w;
        assert!(side(Vec3::new(0.0, 1.0, 0.0)) > 0.0);
        assert!(side(Vec3::new(0.0, 0.0, 0.0)) < 0.0);
    }

    #[test]
    fn degenerate_aspect_is_replaced() {
        let cam = CameraMatrices::from_view(&RenderView::default(), 0.0);
        assert!(cam.projection.is_finite());
    }
}

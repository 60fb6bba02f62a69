use glam::{Mat4, Vec3};
use pitchwalk_common::NodeId;

use crate::mesh::MeshData;

const EPSILON: f32 = 1e-7;

/// A half-line in world space. The direction is normalised on construction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    pub direction: Vec3,
}

impl Ray {
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        Self {
            origin,
            direction: direction.normalize_or_zero(),
        }
    }

    /// Straight down from `origin`.
    pub fn down(origin: Vec3) -> Self {
        Self::new(origin, Vec3::NEG_Y)
    }

    pub fn at(&self, t: f32) -> Vec3 {
        self.origin + self.direction * t
    }
}

/// What a ray cast hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HitTarget {
    Node(NodeId),
    Water,
}

/// Nearest intersection along a ray.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayHit {
    /// World-space distance from the ray origin.
    pub distance: f32,
    /// World-space hit point.
    pub point: Vec3,
    pub target: HitTarget,
}

/// Moller-Trumbore intersection. Returns the ray parameter `t >= 0`.
///
/// With `cull_back_faces` set, triangles whose counter-clockwise normal faces
/// along the ray are skipped.
pub(crate) fn intersect_triangle(
    origin: Vec3,
    direction: Vec3,
    [a, b, c]: [Vec3; 3],
    cull_back_faces: bool,
) -> Option<f32> {
    let edge1 = b - a;
    let edge2 = c - a;
    let h = direction.cross(edge2);
    let det = edge1.dot(h);

    if cull_back_faces {
        if det < EPSILON {
            return None;
        }
    } else if det.abs() < EPSILON {
        return None;
    }

    let inv_det = 1.0 / det;
    let s = origin - a;
    let u = inv_det * s.dot(h);
    if !(0.0..=1.0).contains(&u) {
        return None;
    }

    let q = s.cross(edge1);
    let v = inv_det * direction.dot(q);
    if v < 0.0 || u + v > 1.0 {
        return None;
    }

    let t = inv_det * edge2.dot(q);
    (t >= 0.0).then_some(t)
}

/// Intersect a world-space ray with a mesh placed by `world`.
///
/// The test runs in the mesh's local space; the returned distance and point
/// are in world space.
pub(crate) fn intersect_mesh(
    ray: &Ray,
    mesh: &MeshData,
    world: &Mat4,
    cull_back_faces: bool,
) -> Option<(f32, Vec3)> {
    let inverse = world.inverse();
    if !inverse.is_finite() {
        return None;
    }
    let local_origin = inverse.transform_point3(ray.origin);
    let local_dir = inverse.transform_vector3(ray.direction);

    if !mesh.bounds().hit_by(local_origin, local_dir) {
        return None;
    }

    let mut nearest: Option<(f32, Vec3)> = None;
    for i in 0..mesh.triangle_count() {
        let Some(tri) = mesh.triangle(i) else {
            continue;
        };
        let Some(t) = intersect_triangle(local_origin, local_dir, tri, cull_back_faces) else {
            continue;
        };
        let point = world.transform_point3(local_origin + local_dir * t);
        let distance = point.distance(ray.origin);
        if nearest.is_none_or(|(d, _)| distance < d) {
            nearest = Some((distance, point));
        }
    }
    nearest
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Quat;

    fn floor_triangle() -> [Vec3; 3] {
        // Counter-clockwise seen from above, so the normal points up.
        [
            Vec3::new(-1.0, 0.0, 1.0),
            Vec3::new(1.0, 0.0, 1.0),
            Vec3::new(0.0, 0.0, -1.0),
        ]
    }

    #[test]
    fn downward_ray_hits_upward_face() {
        let t = intersect_triangle(Vec3::new(0.0, 2.0, 0.0), Vec3::NEG_Y, floor_triangle(), true);
        assert_eq!(t, Some(2.0));
    }

    #[test]
    fn back_face_is_culled_only_when_asked() {
        let origin = Vec3::new(0.0, -2.0, 0.0);
        assert_eq!(intersect_triangle(origin, Vec3::Y, floor_triangle(), true), None);
        assert_eq!(
            intersect_triangle(origin, Vec3::Y, floor_triangle(), false),
            Some(2.0)
        );
    }

    #[test]
    fn miss_outside_triangle() {
        let t = intersect_triangle(Vec3::new(5.0, 2.0, 0.0), Vec3::NEG_Y, floor_triangle(), false);
        assert_eq!(t, None);
    }

    #[test]
    fn hit_behind_origin_is_ignored() {
        let t = intersect_triangle(Vec3::new(0.0, -1.0, 0.0), Vec3::NEG_Y, floor_triangle(), false);
        assert_eq!(t, None);
    }

    #[test]
    fn mesh_hit_distance_is_world_space() {
        // Plane in XY facing +Z, scaled 4x and laid flat facing up at y = 1.
        let mesh = MeshData::plane(1.0, 1.0);
        let world = Mat4::from_scale_rotation_translation(
            Vec3::splat(4.0),
            Quat::from_rotation_x(-std::f32::consts::FRAC_PI_2),
            Vec3::new(0.0, 1.0, 0.0),
        );
        let ray = Ray::down(Vec3::new(1.5, 5.0, -1.5));
        let (distance, point) = intersect_mesh(&ray, &mesh, &world, true).unwrap();
        assert!((distance - 4.0).abs() < 1e-5);
        assert!((point - Vec3::new(1.5, 1.0, -1.5)).length() < 1e-5);
    }

    #[test]
    fn degenerate_world_matrix_never_hits() {
        let mesh = MeshData::plane(1.0, 1.0);
        let world = Mat4::from_scale(Vec3::ZERO);
        assert!(intersect_mesh(&Ray::down(Vec3::Y), &mesh, &world, false).is_none());
    }
}

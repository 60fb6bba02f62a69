use glam::{Vec2, Vec3};
use std::sync::Arc;

use crate::image::ImageRgba8;

/// Axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    pub fn empty() -> Self {
        Self {
            min: Vec3::splat(f32::INFINITY),
            max: Vec3::splat(f32::NEG_INFINITY),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.min.cmpgt(self.max).any()
    }

    pub fn extend(&mut self, p: Vec3) {
        self.min = self.min.min(p);
        self.max = self.max.max(p);
    }

    /// Slab test against a ray given by origin and (not necessarily unit)
    /// direction. Only hits at `t >= 0` count.
    pub fn hit_by(&self, origin: Vec3, direction: Vec3) -> bool {
        if self.is_empty() {
            return false;
        }
        let inv = direction.recip();
        let t0 = (self.min - origin) * inv;
        let t1 = (self.max - origin) * inv;
        let mut t_near = 0.0_f32;
        let mut t_far = f32::INFINITY;
        for axis in 0..3 {
            let (a, b) = (t0[axis], t1[axis]);
            // 0 * inf gives NaN when the origin sits on a slab boundary;
            // treat that axis as unconstrained.
            if a.is_nan() || b.is_nan() {
                continue;
            }
            t_near = t_near.max(a.min(b));
            t_far = t_far.min(a.max(b));
        }
        t_near <= t_far
    }
}

/// Indexed triangle list in local space.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeshData {
    pub positions: Vec<Vec3>,
    pub normals: Vec<Vec3>,
    /// Texture coordinates, one per position; top-left origin.
    pub uvs: Vec<Vec2>,
    pub indices: Vec<u32>,
}

impl MeshData {
    /// A `width x height` rectangle in the XY plane facing +Z, centred on the
    /// origin, split into two triangles.
    pub fn plane(width: f32, height: f32) -> Self {
        let (hw, hh) = (width * 0.5, height * 0.5);
        Self {
            positions: vec![
                Vec3::new(-hw, hh, 0.0),
                Vec3::new(hw, hh, 0.0),
                Vec3::new(-hw, -hh, 0.0),
                Vec3::new(hw, -hh, 0.0),
            ],
            normals: vec![Vec3::Z; 4],
            uvs: vec![
                Vec2::new(0.0, 0.0),
                Vec2::new(1.0, 0.0),
                Vec2::new(0.0, 1.0),
                Vec2::new(1.0, 1.0),
            ],
            indices: vec![0, 2, 1, 2, 3, 1],
        }
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty() || self.indices.len() < 3
    }

    pub fn bounds(&self) -> Aabb {
        let mut aabb = Aabb::empty();
        for p in &self.positions {
            aabb.extend(*p);
        }
        aabb
    }

    /// Corner positions of triangle `i`, or `None` if an index is out of range.
    pub fn triangle(&self, i: usize) -> Option<[Vec3; 3]> {
        let idx = self.indices.get(i * 3..i * 3 + 3)?;
        Some([
            *self.positions.get(idx[0] as usize)?,
            *self.positions.get(idx[1] as usize)?,
            *self.positions.get(idx[2] as usize)?,
        ])
    }
}

/// Surface description for a mesh node.
#[derive(Debug, Clone, PartialEq)]
pub struct Material {
    pub name: String,
    /// Linear RGBA base colour factor.
    pub base_color: [f32; 4],
    /// sRGB base colour texture, multiplied by `base_color`. Shared between
    /// materials that reference the same image.
    pub base_color_texture: Option<Arc<ImageRgba8>>,
    /// When false only front faces are drawn and hit by ray casts.
    pub double_sided: bool,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            name: "default".into(),
            base_color: [1.0, 1.0, 1.0, 1.0],
            base_color_texture: None,
            double_sided: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plane_faces_positive_z() {
        let plane = MeshData::plane(2.0, 3.0);
        assert_eq!(plane.triangle_count(), 2);
        for i in 0..plane.triangle_count() {
            let [a, b, c] = plane.triangle(i).unwrap();
            let n = (b - a).cross(c - a).normalize();
            assert!((n - Vec3::Z).length() < 1e-6);
        }
    }

    #[test]
    fn plane_uvs_span_unit_square() {
        let plane = MeshData::plane(2.0, 3.0);
        assert_eq!(plane.uvs.len(), plane.positions.len());
        // Top-left corner maps to the texture origin.
        assert_eq!(plane.uvs[0], Vec2::ZERO);
        assert_eq!(plane.uvs[3], Vec2::ONE);
    }

    #[test]
    fn plane_bounds() {
        let b = MeshData::plane(2.0, 3.0).bounds();
        assert_eq!(b.min, Vec3::new(-1.0, -1.5, 0.0));
        assert_eq!(b.max, Vec3::new(1.0, 1.5, 0.0));
    }

    #[test]
    fn out_of_range_index_yields_none() {
        let mesh = MeshData {
            positions: vec![Vec3::ZERO, Vec3::X],
            normals: vec![Vec3::Y; 2],
            uvs: Vec::new(),
            indices: vec![0, 1, 5],
        };
        assert!(mesh.triangle(0).is_none());
    }

    #[test]
    fn aabb_slab_test() {
        let b = MeshData::plane(2.0, 2.0).bounds();
        assert!(b.hit_by(Vec3::new(0.0, 0.0, 5.0), Vec3::NEG_Z));
        assert!(!b.hit_by(Vec3::new(0.0, 0.0, 5.0), Vec3::Z));
        assert!(!b.hit_by(Vec3::new(3.0, 0.0, 5.0), Vec3::NEG_Z));
        assert!(!Aabb::empty().hit_by(Vec3::ZERO, Vec3::X));
    }
}

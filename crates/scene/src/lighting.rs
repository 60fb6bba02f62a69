use glam::{Mat4, Vec3};
use pitchwalk_common::Color;
use serde::{Deserialize, Serialize};

/// Uniform light applied to every surface.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AmbientLight {
    pub color: Color,
    pub intensity: f32,
}

impl Default for AmbientLight {
    fn default() -> Self {
        Self {
            color: Color::WHITE,
            intensity: 2.4,
        }
    }
}

/// Orthographic shadow camera parameters for a directional light.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShadowConfig {
    /// Shadow map resolution (square).
    pub map_size: u32,
    pub left: f32,
    pub right: f32,
    pub top: f32,
    pub bottom: f32,
    pub near: f32,
    pub far: f32,
    /// Depth bias subtracted before comparison.
    pub bias: f32,
}

impl Default for ShadowConfig {
    fn default() -> Self {
        Self {
            map_size: 1024,
            left: -7.0,
            right: 7.0,
            top: 7.0,
            bottom: -7.0,
            near: 0.5,
            far: 15.0,
            bias: 0.002,
        }
    }
}

/// Parallel light shining from `position` toward `target`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DirectionalLight {
    pub color: Color,
    pub intensity: f32,
    pub position: Vec3,
    pub target: Vec3,
    pub cast_shadow: bool,
    pub shadow: ShadowConfig,
}

impl Default for DirectionalLight {
    fn default() -> Self {
        Self {
            color: Color::WHITE,
            intensity: 1.8,
            position: Vec3::Y,
            target: Vec3::ZERO,
            cast_shadow: true,
            shadow: ShadowConfig::default(),
        }
    }
}

impl DirectionalLight {
    /// Unit vector the light travels along.
    pub fn direction(&self) -> Vec3 {
        (self.target - self.position)
            .try_normalize()
            .unwrap_or(Vec3::NEG_Y)
    }

    /// View-projection of the orthographic shadow camera.
    pub fn shadow_view_projection(&self) -> Mat4 {
        let dir = self.direction();
        // look_at degenerates when the light points straight along the up axis.
        let up = if dir.cross(Vec3::Y).length_squared() < 1e-6 {
            Vec3::Z
        } else {
            Vec3::Y
        };
        let view = Mat4::look_to_rh(self.position, dir, up);
        let s = &self.shadow;
        let proj = Mat4::orthographic_rh(s.left, s.right, s.bottom, s.top, s.near, s.far);
        proj * view
    }
}

/// Linear distance fog.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Fog {
    pub color: Color,
    pub near: f32,
    pub far: f32,
}

impl Fog {
    /// Fog blend factor at `distance` from the eye, in `0..=1`.
    pub fn factor(&self, distance: f32) -> f32 {
        if self.far <= self.near {
            return if distance >= self.far { 1.0 } else { 0.0 };
        }
        ((distance - self.near) / (self.far - self.near)).clamp(0.0, 1.0)
    }
}

/// The scene's light rig.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Lighting {
    pub ambient: AmbientLight,
    pub directional: DirectionalLight,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_light_points_down() {
        let light = DirectionalLight::default();
        assert_eq!(light.direction(), Vec3::NEG_Y);
    }

    #[test]
    fn coincident_position_and_target_fall_back_to_down() {
        let light = DirectionalLight {
            position: Vec3::ONE,
            target: Vec3::ONE,
            ..DirectionalLight::default()
        };
        assert_eq!(light.direction(), Vec3::NEG_Y);
    }

    #[test]
    fn shadow_camera_covers_origin() {
        let light = DirectionalLight::default();
        let clip = light.shadow_view_projection().project_point3(Vec3::ZERO);
        assert!(clip.x.abs() <= 1.0 && clip.y.abs() <= 1.0);
        assert!((0.0..=1.0).contains(&clip.z));
        assert!(clip.is_finite());
    }

    #[test]
    fn shadow_camera_clips_beyond_far() {
        let light = DirectionalLight::default();
        let clip = light
            .shadow_view_projection()
            .project_point3(Vec3::new(0.0, -20.0, 0.0));
        assert!(clip.z > 1.0);
    }

    #[test]
    fn fog_factor_ramps_linearly() {
        let fog = Fog {
            color: Color::WHITE,
            near: 1.0,
            far: 11.0,
        };
        assert_eq!(fog.factor(0.0), 0.0);
        assert!((fog.factor(6.0) - 0.5).abs() < 1e-6);
        assert_eq!(fog.factor(50.0), 1.0);
    }
}

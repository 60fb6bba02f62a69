use glam::{Mat4, Quat, Vec3};
use pitchwalk_common::Color;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;

use crate::graph::Scene;
use crate::mesh::MeshData;

/// Parameters of the animated water quad.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WaterConfig {
    /// Reflection render-target width in pixels.
    pub texture_width: u32,
    /// Reflection render-target height in pixels.
    pub texture_height: u32,
    /// Tiling normal map image.
    pub normal_map: PathBuf,
    /// Direction toward the sun. A zero vector disables sun highlights.
    pub sun_direction: Vec3,
    pub sun_color: Color,
    pub water_color: Color,
    pub distortion_scale: f32,
    pub alpha: f32,
    /// World-space scale applied to the normal-map lookup.
    pub noise_scale: f32,
    /// Quad width and height before rotation.
    pub size: [f32; 2],
    pub position: Vec3,
    /// Rotation about X in radians; `-pi/2` lays the quad flat facing up.
    pub rotation_x: f32,
}

impl Default for WaterConfig {
    fn default() -> Self {
        Self {
            texture_width: 512,
            texture_height: 512,
            normal_map: PathBuf::from("textures/waternormals.jpg"),
            sun_direction: Vec3::ZERO,
            sun_color: Color::from_hex(0x001e0f),
            water_color: Color::from_hex(0x11c8ea),
            distortion_scale: 3.7,
            alpha: 1.0,
            noise_scale: 1.0,
            size: [2.0, 3.0],
            position: Vec3::new(1.0, 0.32, 3.0),
            rotation_x: -std::f32::consts::FRAC_PI_2,
        }
    }
}

/// The water mesh plus its animation clock.
#[derive(Debug, Clone)]
pub struct WaterSurface {
    pub config: WaterConfig,
    /// Mirrors whether the scene had fog when the surface was built.
    pub fog: bool,
    time: f32,
    mesh: Arc<MeshData>,
    world: Mat4,
}

impl WaterSurface {
    pub fn new(config: WaterConfig, scene: &Scene) -> Self {
        let mesh = Arc::new(MeshData::plane(config.size[0], config.size[1]));
        let world = Mat4::from_rotation_translation(
            Quat::from_rotation_x(config.rotation_x),
            config.position,
        );
        Self {
            fog: scene.fog().is_some(),
            config,
            time: 0.0,
            mesh,
            world,
        }
    }

    /// Current value of the animation-time uniform.
    pub fn time(&self) -> f32 {
        self.time
    }

    /// Advance the animation clock. Negative steps are ignored so the
    /// uniform never runs backwards.
    pub fn advance(&mut self, step: f32) {
        if step > 0.0 {
            self.time += step;
        }
    }

    pub fn mesh(&self) -> &Arc<MeshData> {
        &self.mesh
    }

    pub fn world_matrix(&self) -> Mat4 {
        self.world
    }

    /// World-space height of the surface plane.
    pub fn plane_height(&self) -> f32 {
        self.world.transform_point3(Vec3::ZERO).y
    }

    /// World-space surface normal (front face).
    pub fn normal(&self) -> Vec3 {
        self.world.transform_vector3(Vec3::Z).normalize_or_zero()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lighting::{Fog, Lighting};

    #[test]
    fn defaults_lie_flat_at_observed_height() {
        let scene = Scene::new(Lighting::default());
        let water = WaterSurface::new(WaterConfig::default(), &scene);
        assert!((water.plane_height() - 0.32).abs() < 1e-6);
        assert!((water.normal() - Vec3::Y).length() < 1e-6);
        assert!(!water.fog);
    }

    #[test]
    fn fog_flag_mirrors_scene() {
        let mut scene = Scene::new(Lighting::default());
        scene.set_fog(Some(Fog {
            color: Color::WHITE,
            near: 1.0,
            far: 50.0,
        }));
        let water = WaterSurface::new(WaterConfig::default(), &scene);
        assert!(water.fog);
    }

    #[test]
    fn clock_advances_by_fixed_step() {
        let scene = Scene::new(Lighting::default());
        let mut water = WaterSurface::new(WaterConfig::default(), &scene);
        let mut previous = water.time();
        for _ in 0..100 {
            water.advance(0.001);
            assert!(water.time() > previous);
            previous = water.time();
        }
        assert!((water.time() - 0.1).abs() < 1e-4);
    }

    #[test]
    fn negative_step_does_not_rewind() {
        let scene = Scene::new(Lighting::default());
        let mut water = WaterSurface::new(WaterConfig::default(), &scene);
        water.advance(0.5);
        water.advance(-1.0);
        assert_eq!(water.time(), 0.5);
    }
}

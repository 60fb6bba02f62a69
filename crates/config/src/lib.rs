//! Demo configuration.
//!
//! Every field defaults to the value the demo ships with, so a missing or
//! empty file reproduces the stock scene. Files are YAML; any subset of
//! sections and fields may be given.
//!
//! ```yaml
//! walk:
//!   move_speed: 0.08
//! water:
//!   water_color: "#1188cc"
//! fog:
//!   color: "#cccccc"
//!   near: 5.0
//!   far: 40.0
//! ```

use glam::Vec3;
use pitchwalk_common::Color;
use pitchwalk_kernel::WalkConfig;
use pitchwalk_scene::{Fog, Lighting, Scene, SubScene, WaterConfig, WaterSurface};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable that overrides [`AssetsConfig::model`].
pub const MODEL_ENV: &str = "PITCHWALK_MODEL";

/// Errors from loading or validating configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("invalid value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

fn positive(v: f32) -> bool {
    v > 0.0
}

fn invalid(field: &'static str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        field,
        reason: reason.into(),
    }
}

/// Files the demo loads at startup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssetsConfig {
    /// glTF/GLB scene file.
    pub model: PathBuf,
    /// Side length of the flat ground used when the model cannot be loaded.
    pub fallback_ground_size: f32,
}

impl Default for AssetsConfig {
    fn default() -> Self {
        Self {
            model: PathBuf::from("models/pitch/compressed.glb"),
            fallback_ground_size: 100.0,
        }
    }
}

/// Perspective camera and mouse-look settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraSettings {
    /// Vertical field of view in degrees.
    pub fov_degrees: f32,
    pub near: f32,
    pub far: f32,
    pub start_position: Vec3,
    /// Upper bound on the device pixel ratio used for the drawing buffer.
    pub max_pixel_ratio: f32,
    /// Radians of look rotation per pixel of mouse motion.
    pub mouse_sensitivity: f32,
}

impl Default for CameraSettings {
    fn default() -> Self {
        Self {
            fov_degrees: 75.0,
            near: 0.1,
            far: 100.0,
            start_position: Vec3::ZERO,
            max_pixel_ratio: 2.0,
            mouse_sensitivity: 0.002,
        }
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DemoConfig {
    pub assets: AssetsConfig,
    pub walk: WalkConfig,
    pub water: WaterConfig,
    pub lighting: Lighting,
    pub camera: CameraSettings,
    /// Linear scene fog. Absent by default.
    pub fog: Option<Fog>,
    pub background: Color,
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            assets: AssetsConfig::default(),
            walk: WalkConfig::default(),
            water: WaterConfig::default(),
            lighting: Lighting::default(),
            camera: CameraSettings::default(),
            fog: None,
            background: Color::rgb(0.0, 0.0, 0.0),
        }
    }
}

impl DemoConfig {
    /// Read and validate a YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_yaml_str(&text)?;
        tracing::info!(path = %path.display(), "configuration loaded");
        Ok(config)
    }

    /// Load `path` if given, otherwise use the defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    /// Parse and validate YAML text. Empty or comment-only text yields the defaults.
    pub fn from_yaml_str(text: &str) -> Result<Self, ConfigError> {
        let value: serde_yaml::Value = serde_yaml::from_str(text)?;
        let config: Self = if value.is_null() {
            Self::default()
        } else {
            serde_yaml::from_value(value)?
        };
        config.validate()?;
        Ok(config)
    }

    pub fn to_yaml_string(&self) -> Result<String, ConfigError> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Apply overrides from the process environment.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|key| std::env::var(key).ok());
    }

    fn apply_overrides_from(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(model) = lookup(MODEL_ENV).filter(|s| !s.is_empty()) {
            tracing::debug!(%model, "model path overridden from environment");
            self.assets.model = PathBuf::from(model);
        }
    }

    /// Reject values the frame loop or renderer cannot work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let walk = &self.walk;
        if !positive(walk.move_speed) {
            return Err(invalid("walk.move_speed", "must be positive"));
        }
        if walk.max_step_height.is_nan() || walk.max_step_height < 0.0 {
            return Err(invalid("walk.max_step_height", "must not be negative"));
        }
        if !walk.fallback_position.is_finite() {
            return Err(invalid("walk.fallback_position", "must be finite"));
        }

        if !positive(self.assets.fallback_ground_size) {
            return Err(invalid("assets.fallback_ground_size", "must be positive"));
        }

        let cam = &self.camera;
        if !positive(cam.mouse_sensitivity) {
            return Err(invalid("camera.mouse_sensitivity", "must be positive"));
        }
        if !positive(cam.fov_degrees) || cam.fov_degrees >= 180.0 {
            return Err(invalid("camera.fov_degrees", "must lie in (0, 180)"));
        }
        if !positive(cam.near) {
            return Err(invalid("camera.near", "must be positive"));
        }
        if cam.far.is_nan() || cam.far <= cam.near {
            return Err(invalid("camera.far", "must exceed camera.near"));
        }
        if !positive(cam.max_pixel_ratio) {
            return Err(invalid("camera.max_pixel_ratio", "must be positive"));
        }

        if self.water.texture_width == 0 || self.water.texture_height == 0 {
            return Err(invalid("water.texture_width/height", "must be non-zero"));
        }

        let shadow = &self.lighting.directional.shadow;
        if shadow.map_size == 0 {
            return Err(invalid("lighting.directional.shadow.map_size", "must be non-zero"));
        }
        if !(shadow.near.is_finite() && shadow.far > shadow.near) {
            return Err(invalid("lighting.directional.shadow.far", "must exceed near"));
        }

        if let Some(fog) = &self.fog {
            if !(fog.near.is_finite() && fog.far > fog.near) {
                return Err(invalid("fog.far", "must exceed fog.near"));
            }
        }
        Ok(())
    }

    pub fn walk_config(&self) -> WalkConfig {
        self.walk
    }

    pub fn water_config(&self) -> WaterConfig {
        self.water.clone()
    }

    pub fn lighting(&self) -> Lighting {
        self.lighting
    }

    pub fn fog(&self) -> Option<Fog> {
        self.fog
    }

    pub fn mouse_sensitivity(&self) -> f32 {
        self.camera.mouse_sensitivity
    }

    pub fn camera(&self) -> CameraSettings {
        self.camera
    }

    /// Flat ground inserted in place of a model that failed to load.
    pub fn fallback_ground(&self) -> SubScene {
        SubScene::ground_plane(self.assets.fallback_ground_size)
    }

    /// Empty scene with this configuration's lighting, fog, background and
    /// water surface. Model nodes are inserted once they load.
    pub fn build_scene(&self) -> Scene {
        let mut scene = Scene::new(self.lighting);
        scene.set_fog(self.fog);
        scene.set_background(self.background);
        let water = WaterSurface::new(self.water_config(), &scene);
        scene.set_water(water);
        scene
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_scene_carries_environment() {
        let mut cfg = DemoConfig::default();
        cfg.fog = Some(Fog {
            color: Color::from_hex(0xcccccc),
            near: 5.0,
            far: 40.0,
        });
        let scene = cfg.build_scene();
        assert_eq!(scene.node_count(), 0);
        assert!(scene.fog().is_some());
        let water = scene.water().unwrap();
        assert!(water.fog);
        assert_eq!(water.time(), 0.0);
    }

    #[test]
    fn defaults_match_shipped_constants() {
        let cfg = DemoConfig::default();
        assert_eq!(cfg.walk.move_speed, 0.05);
        assert_eq!(cfg.walk.eye_height, 1.0);
        assert_eq!(cfg.walk.fallback_position, Vec3::new(2.0, 2.0, 2.0));
        assert_eq!(cfg.camera.fov_degrees, 75.0);
        assert_eq!(cfg.camera.max_pixel_ratio, 2.0);
        assert_eq!(cfg.mouse_sensitivity(), 0.002);
        assert_eq!(cfg.lighting.ambient.intensity, 2.4);
        assert_eq!(cfg.lighting.directional.intensity, 1.8);
        assert_eq!(cfg.water.water_color, Color::from_hex(0x11c8ea));
        assert_eq!(cfg.assets.model, PathBuf::from("models/pitch/compressed.glb"));
        assert!(cfg.fog.is_none());
        cfg.validate().unwrap();
    }

    #[test]
    fn empty_and_comment_only_files_give_defaults() {
        assert_eq!(DemoConfig::from_yaml_str("").unwrap(), DemoConfig::default());
        assert_eq!(
            DemoConfig::from_yaml_str("# nothing here\n").unwrap(),
            DemoConfig::default()
        );
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let cfg = DemoConfig::from_yaml_str(
            "walk:\n  move_speed: 0.1\nwater:\n  water_color: \"#102030\"\n  distortion_scale: 2.0\n",
        )
        .unwrap();
        assert_eq!(cfg.walk.move_speed, 0.1);
        assert_eq!(cfg.walk.eye_height, 1.0);
        assert_eq!(cfg.water.water_color, Color::from_hex(0x102030));
        assert_eq!(cfg.water.distortion_scale, 2.0);
        assert_eq!(cfg.water.texture_width, 512);
        assert_eq!(cfg.camera, CameraSettings::default());
    }

    #[test]
    fn fog_section_enables_fog() {
        let cfg = DemoConfig::from_yaml_str(
            "fog:\n  color: \"#cccccc\"\n  near: 5.0\n  far: 40.0\n",
        )
        .unwrap();
        let fog = cfg.fog().unwrap();
        assert_eq!(fog.near, 5.0);
        assert_eq!(fog.far, 40.0);
    }

    #[test]
    fn invalid_values_are_rejected() {
        for yaml in [
            "walk:\n  move_speed: 0.0\n",
            "walk:\n  max_step_height: -1.0\n",
            "camera:\n  mouse_sensitivity: -0.1\n",
            "camera:\n  near: 10.0\n  far: 5.0\n",
            "water:\n  texture_width: 0\n",
            "fog:\n  color: \"#000000\"\n  near: 3.0\n  far: 3.0\n",
            "camera:\n  far: .nan\n",
            "lighting:\n  directional:\n    shadow:\n      near: .nan\n",
            "fog:\n  color: \"#000000\"\n  near: 1.0\n  far: .nan\n",
        ] {
            let err = DemoConfig::from_yaml_str(yaml).unwrap_err();
            assert!(matches!(err, ConfigError::Invalid { .. }), "{yaml}: {err}");
        }
    }

    #[test]
    fn malformed_yaml_is_a_parse_error() {
        let err = DemoConfig::from_yaml_str("walk: [unclosed").unwrap_err();
        assert!(matches!(err, ConfigError::Yaml(_)));
        let err = DemoConfig::from_yaml_str("walk:\n  move_speed: fast\n").unwrap_err();
        assert!(matches!(err, ConfigError::Yaml(_)));
    }

    #[test]
    fn load_from_file_and_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("demo.yaml");
        std::fs::write(&path, "camera:\n  fov_degrees: 60.0\n").unwrap();
        let cfg = DemoConfig::load(&path).unwrap();
        assert_eq!(cfg.camera.fov_degrees, 60.0);

        let err = DemoConfig::load(dir.path().join("absent.yaml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
        assert_eq!(DemoConfig::load_or_default(None).unwrap(), DemoConfig::default());
    }

    #[test]
    fn serialized_defaults_load_back_unchanged() {
        let cfg = DemoConfig::default();
        let yaml = cfg.to_yaml_string().unwrap();
        assert_eq!(DemoConfig::from_yaml_str(&yaml).unwrap(), cfg);
    }

    #[test]
    fn model_override_from_environment() {
        let mut cfg = DemoConfig::default();
        cfg.apply_overrides_from(|key| (key == MODEL_ENV).then(|| "other/scene.glb".to_owned()));
        assert_eq!(cfg.assets.model, PathBuf::from("other/scene.glb"));

        let mut cfg = DemoConfig::default();
        cfg.apply_overrides_from(|_| Some(String::new()));
        assert_eq!(cfg.assets.model, DemoConfig::default().assets.model);
    }
}

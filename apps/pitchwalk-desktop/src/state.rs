use egui::Context as EguiContext;
use pitchwalk_assets::{AssetLoader, PendingLoad};
use pitchwalk_config::DemoConfig;
use pitchwalk_input::InputState;
use pitchwalk_kernel::{CameraPose, FrameContext, FrameReport, GroundOutcome, Walker};
use pitchwalk_render::RenderView;
use pitchwalk_scene::Scene;
use pitchwalk_tools::{FrameTimer, SceneInspector};
use std::path::PathBuf;
use std::time::Duration;

/// Frames averaged for the FPS readout.
const TIMER_CAPACITY: usize = 120;

/// Progress of the startup scene load.
#[derive(Debug, Clone, PartialEq)]
pub enum LoadStatus {
    Loading(PathBuf),
    Loaded { name: String, triangles: usize },
    /// The model failed to load and the flat ground stands in for it.
    Fallback(String),
}

/// Everything the demo owns apart from the window and GPU.
pub struct DemoState {
    pub config: DemoConfig,
    pub scene: Scene,
    pub walker: Walker,
    pub input: InputState,
    pub show_overlay: bool,
    pending: Option<PendingLoad>,
    status: LoadStatus,
    timer: FrameTimer,
    last_report: Option<FrameReport>,
}

impl DemoState {
    /// Build the environment and start loading the model in the background.
    pub fn new(config: DemoConfig) -> Self {
        let pending = AssetLoader::spawn(config.assets.model.clone());
        let start = CameraPose {
            position: config.camera.start_position,
            ..CameraPose::default()
        };
        Self {
            scene: config.build_scene(),
            walker: Walker::new(config.walk_config(), start),
            input: InputState::new(config.mouse_sensitivity()),
            show_overlay: true,
            status: LoadStatus::Loading(pending.path().to_path_buf()),
            pending: Some(pending),
            timer: FrameTimer::new(TIMER_CAPACITY),
            last_report: None,
            config,
        }
    }

    pub fn status(&self) -> &LoadStatus {
        &self.status
    }

    /// Insert the loaded model, or the fallback ground if loading failed.
    /// Returns `true` on the frame the load completes.
    pub fn poll_load(&mut self) -> bool {
        let Some(pending) = self.pending.as_mut() else {
            return false;
        };
        let Some(result) = pending.poll() else {
            return false;
        };
        let path = pending.path().display().to_string();
        self.pending = None;

        match result {
            Ok(sub) => {
                self.status = LoadStatus::Loaded {
                    name: sub.name.clone(),
                    triangles: sub.triangle_count(),
                };
                self.scene.insert_subscene(sub);
            }
            Err(e) => {
                tracing::warn!(%path, "scene load failed, using flat ground: {e}");
                self.status = LoadStatus::Fallback(e.to_string());
                self.scene.insert_subscene(self.config.fallback_ground());
            }
        }
        true
    }

    /// One pass of the frame loop body.
    pub fn update(&mut self, elapsed: f32) -> FrameReport {
        self.poll_load();
        let report = self.walker.step(FrameContext {
            elapsed,
            input: &self.input,
            world: &mut self.scene,
        });
        self.timer
            .record(Duration::from_secs_f32(report.time.delta.max(0.0)));
        self.last_report = Some(report);
        report
    }

    pub fn render_view(&self) -> RenderView {
        let cam = self.config.camera();
        RenderView::from_pose(self.walker.pose(), cam.fov_degrees, cam.near, cam.far)
    }

    pub fn draw_ui(&self, ctx: &EguiContext) {
        if !self.show_overlay {
            return;
        }

        let summary = SceneInspector::summary(&self.scene);
        let pose = self.walker.pose();

        egui::Window::new("Pitch Walk")
            .default_pos([12.0, 12.0])
            .resizable(false)
            .show(ctx, |ui| {
                ui.label(format!(
                    "FPS: {:.0}  ({:.1} ms avg, {:.1} max)",
                    self.timer.fps(),
                    self.timer.average().as_secs_f32() * 1000.0,
                    self.timer.max().as_secs_f32() * 1000.0
                ));
                ui.separator();

                match &self.status {
                    LoadStatus::Loading(path) => {
                        ui.label(format!("Loading {}...", path.display()));
                    }
                    LoadStatus::Loaded { name, triangles } => {
                        ui.label(format!("Model: {name} ({triangles} triangles)"));
                    }
                    LoadStatus::Fallback(reason) => {
                        ui.colored_label(egui::Color32::YELLOW, "Model unavailable, flat ground");
                        ui.small(reason);
                    }
                }
                ui.label(format!(
                    "Nodes: {}  Triangles: {}",
                    summary.node_count, summary.triangle_count
                ));
                if let Some(t) = summary.water_time {
                    ui.label(format!("Water time: {t:.3}"));
                }
                ui.separator();

                ui.label(format!(
                    "Camera: ({:.2}, {:.2}, {:.2})",
                    pose.position.x, pose.position.y, pose.position.z
                ));
                ui.label(format!(
                    "Yaw: {:.1}°  Pitch: {:.1}°",
                    pose.yaw.to_degrees(),
                    pose.pitch.to_degrees()
                ));
                if let Some(report) = &self.last_report {
                    match report.ground {
                        GroundOutcome::Followed { hit_distance, .. } => {
                            ui.label(format!("Ground: {hit_distance:.2} below"));
                        }
                        GroundOutcome::Fallback => {
                            ui.label("Ground: none, reset to start");
                        }
                    }
                }

                ui.separator();
                if self.input.pointer.is_active() {
                    ui.small("WASD/Arrows: Move | Esc: Release mouse | F1: Overlay");
                } else {
                    ui.small("Click to look around | F1: Overlay");
                }
            });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;
    use pitchwalk_input::Key;
    use std::time::Instant;

    fn wait_for_load(state: &mut DemoState) {
        let deadline = Instant::now() + Duration::from_secs(10);
        while !state.poll_load() {
            assert!(Instant::now() < deadline, "load never completed");
            std::thread::sleep(Duration::from_millis(5));
        }
    }

    fn state_without_model() -> DemoState {
        let mut config = DemoConfig::default();
        config.assets.model = PathBuf::from("does/not/exist.glb");
        DemoState::new(config)
    }

    #[test]
    fn missing_model_falls_back_to_ground() {
        let mut state = state_without_model();
        assert!(matches!(state.status(), LoadStatus::Loading(_)));
        wait_for_load(&mut state);

        assert!(matches!(state.status(), LoadStatus::Fallback(_)));
        assert_eq!(state.scene.node_count(), 1);
        assert!(!state.poll_load());
    }

    #[test]
    fn update_walks_over_fallback_ground() {
        let mut state = state_without_model();
        wait_for_load(&mut state);
        state.walker.set_position(Vec3::new(0.0, 1.0, 0.0));

        state.input.key_event(Some(Key::KeyW), true);
        let report = state.update(0.016);
        assert!(matches!(report.ground, GroundOutcome::Followed { .. }));
        assert!(report.pose.position.z < 0.0);
        assert_eq!(report.water_time, Some(0.001));
        assert_eq!(state.timer.count(), 1);
    }

    #[test]
    fn render_view_follows_walker() {
        let state = state_without_model();
        let view = state.render_view();
        assert_eq!(view.eye, state.walker.pose().position);
        assert_eq!(view.fov_degrees, 75.0);
    }
}

use glam::Vec3;
use pitchwalk_kernel::CameraPose;
use pitchwalk_scene::Scene;
use std::fmt::Write as _;

/// Camera/view configuration for rendering.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderView {
    /// Camera position in world space.
    pub eye: Vec3,
    pub yaw: f32,
    pub pitch: f32,
    /// Vertical field of view in degrees.
    pub fov_degrees: f32,
    pub near: f32,
    pub far: f32,
}

impl Default for RenderView {
    fn default() -> Self {
        Self {
            eye: Vec3::ZERO,
            yaw: 0.0,
            pitch: 0.0,
            fov_degrees: 75.0,
            near: 0.1,
            far: 100.0,
        }
    }
}

impl RenderView {
    pub fn from_pose(pose: &CameraPose, fov_degrees: f32, near: f32, far: f32) -> Self {
        Self {
            eye: pose.position,
            yaw: pose.yaw,
            pitch: pose.pitch,
            fov_degrees,
            near,
            far,
        }
    }

    pub fn pose(&self) -> CameraPose {
        CameraPose {
            position: self.eye,
            yaw: self.yaw,
            pitch: self.pitch,
        }
    }

    pub fn look_direction(&self) -> Vec3 {
        self.pose().look_direction()
    }
}

/// Renderer-agnostic interface.
///
/// A renderer reads the scene and a view, then produces output. It never
/// mutates the scene.
pub trait Renderer {
    /// The output type produced by this renderer.
    type Output;

    /// Render one frame of `scene` as seen from `view`.
    fn render(&self, scene: &Scene, view: &RenderView) -> Self::Output;
}

/// Produces a human-readable description of a frame.
///
/// Used by the CLI and by tests of the render interface.
#[derive(Debug, Default)]
pub struct DebugTextRenderer;

impl DebugTextRenderer {
    pub fn new() -> Self {
        Self
    }
}

impl Renderer for DebugTextRenderer {
    type Output = String;

    fn render(&self, scene: &Scene, view: &RenderView) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "=== Scene (revision={}) ===", scene.revision());
        let _ = writeln!(
            out,
            "Nodes: {}  Triangles: {}",
            scene.node_count(),
            scene.triangle_count()
        );
        match scene.water() {
            Some(water) => {
                let _ = writeln!(
                    out,
                    "Water: time={:.3} height={:.2} fog={}",
                    water.time(),
                    water.plane_height(),
                    water.fog
                );
            }
            None => out.push_str("Water: none\n"),
        }
        match scene.fog() {
            Some(fog) => {
                let _ = writeln!(out, "Fog: {} near={:.1} far={:.1}", fog.color, fog.near, fog.far);
            }
            None => out.push_str("Fog: off\n"),
        }
        let dir = view.look_direction();
        let _ = writeln!(
            out,
            "Camera: eye=({:.2}, {:.2}, {:.2}) look=({:.2}, {:.2}, {:.2}) fov={:.0}",
            view.eye.x, view.eye.y, view.eye.z, dir.x, dir.y, dir.z, view.fov_degrees
        );

        for node in scene.nodes() {
            let p = node.world.w_axis;
            let _ = writeln!(
                out,
                "  [{}] {} tris={} pos=({:.2}, {:.2}, {:.2})",
                node.id.short(),
                node.name,
                node.mesh.triangle_count(),
                p.x,
                p.y,
                p.z
            );
        }

        out
    }
}

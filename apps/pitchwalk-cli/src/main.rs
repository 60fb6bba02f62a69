use anyhow::Result;
use clap::{Parser, Subcommand};
use glam::Vec3;
use pitchwalk_config::DemoConfig;
use pitchwalk_input::{InputState, Key};
use pitchwalk_kernel::{CameraPose, FrameContext, FrameReport, GroundOutcome, Walker};
use pitchwalk_render::{DebugTextRenderer, RenderView, Renderer};
use pitchwalk_scene::Scene;
use pitchwalk_tools::SceneInspector;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// Seconds per simulated frame in headless runs.
const FRAME_SECONDS: f32 = 1.0 / 60.0;

#[derive(Parser)]
#[command(name = "pitchwalk-cli", about = "Headless tools for the pitch walk demo")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// YAML configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the version and the default configuration
    Info,
    /// Load a model and describe the resulting scene
    Inspect {
        /// glTF/GLB file
        model: PathBuf,
    },
    /// Run the frame loop without a window
    Walk {
        /// Number of frames to simulate
        #[arg(short, long, default_value = "60")]
        frames: u32,
        /// Keys held for the whole run, e.g. `W,D` or `ArrowUp`
        #[arg(short, long, value_delimiter = ',', value_parser = parse_key)]
        keys: Vec<Key>,
        /// Mouse motion applied before the first frame, as `dx,dy` pixels
        #[arg(short, long, value_parser = parse_motion, allow_hyphen_values = true)]
        mouse: Option<MouseMotion>,
        /// Model to walk on instead of the configured one
        #[arg(long)]
        model: Option<PathBuf>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct MouseMotion {
    dx: f32,
    dy: f32,
}

/// Accepts DOM-style codes (`KeyW`, `ArrowUp`) and the short forms
/// `W`, `Up`.
fn parse_key(s: &str) -> Result<Key, String> {
    let s = s.trim();
    let code = match s.to_ascii_lowercase().as_str() {
        "w" => "KeyW",
        "a" => "KeyA",
        "s" => "KeyS",
        "d" => "KeyD",
        "space" => "Space",
        "up" => "ArrowUp",
        "down" => "ArrowDown",
        "left" => "ArrowLeft",
        "right" => "ArrowRight",
        _ => s,
    };
    Key::from_code(code).ok_or_else(|| format!("unknown key `{s}`"))
}

fn parse_motion(s: &str) -> Result<MouseMotion, String> {
    let (dx, dy) = s
        .split_once(',')
        .ok_or_else(|| format!("expected `dx,dy`, got `{s}`"))?;
    let num = |v: &str| {
        v.trim()
            .parse::<f32>()
            .ok()
            .filter(|n| n.is_finite())
            .ok_or_else(|| format!("`{v}` is not a number"))
    };
    Ok(MouseMotion {
        dx: num(dx)?,
        dy: num(dy)?,
    })
}

/// Scene from `config` with `model` inserted, or the flat ground if the
/// model cannot be loaded.
fn scene_with_model(config: &DemoConfig, model: &Path) -> Scene {
    let mut scene = config.build_scene();
    match pitchwalk_assets::load_scene(model) {
        Ok(sub) => {
            scene.insert_subscene(sub);
        }
        Err(e) => {
            tracing::warn!(path = %model.display(), "scene load failed, using flat ground: {e}");
            scene.insert_subscene(config.fallback_ground());
        }
    }
    scene
}

fn walk(
    config: &DemoConfig,
    scene: &mut Scene,
    frames: u32,
    keys: &[Key],
    mouse: Option<MouseMotion>,
) -> Option<FrameReport> {
    let start = CameraPose {
        position: config.camera.start_position,
        ..CameraPose::default()
    };
    let mut walker = Walker::new(config.walk_config(), start);
    let mut input = InputState::new(config.mouse_sensitivity());
    for key in keys {
        input.key_event(Some(*key), true);
    }
    if let Some(m) = mouse {
        input.surface_clicked();
        input.mouse_motion(m.dx, m.dy);
    }

    let mut last = None;
    for frame in 0..frames {
        last = Some(walker.step(FrameContext {
            elapsed: (frame + 1) as f32 * FRAME_SECONDS,
            input: &input,
            world: &mut *scene,
        }));
    }
    last
}

fn format_vec(v: Vec3) -> String {
    format!("({:.3}, {:.3}, {:.3})", v.x, v.y, v.z)
}

fn print_report(report: &FrameReport) {
    let pose = &report.pose;
    println!("Frames: {}", report.time.frame);
    println!("Position: {}", format_vec(pose.position));
    println!("Yaw: {:.4} rad  Pitch: {:.4} rad", pose.yaw, pose.pitch);
    println!("Look: {}", format_vec(pose.look_direction()));
    match report.ground {
        GroundOutcome::Followed {
            hit_distance,
            desired_height,
            applied_height,
        } => println!(
            "Ground: followed (hit {hit_distance:.3} below, desired y={desired_height:.3}, applied y={applied_height:.3})"
        ),
        GroundOutcome::Fallback => println!("Ground: none, reset to fallback"),
    }
    match report.water_time {
        Some(t) => println!("Water time: {t:.3}"),
        None => println!("Water time: none"),
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    let mut config = DemoConfig::load_or_default(cli.config.as_deref())?;
    config.apply_env_overrides();

    match cli.command {
        Commands::Info => {
            println!("pitchwalk-cli v{}", env!("CARGO_PKG_VERSION"));
            println!("---");
            print!("{}", DemoConfig::default().to_yaml_string()?);
        }
        Commands::Inspect { model } => {
            let mut scene = config.build_scene();
            scene.insert_subscene(pitchwalk_assets::load_scene(&model)?);
            println!("{}", SceneInspector::summary(&scene));
            for id in SceneInspector::list_nodes(&scene) {
                if let Some(info) = SceneInspector::inspect_node(&scene, id) {
                    println!("  {info}");
                }
            }
            let cam = config.camera();
            let pose = CameraPose {
                position: cam.start_position,
                ..CameraPose::default()
            };
            let view = RenderView::from_pose(&pose, cam.fov_degrees, cam.near, cam.far);
            print!("{}", DebugTextRenderer::new().render(&scene, &view));
        }
        Commands::Walk {
            frames,
            keys,
            mouse,
            model,
        } => {
            let model = model.unwrap_or_else(|| config.assets.model.clone());
            let mut scene = scene_with_model(&config, &model);
            match walk(&config, &mut scene, frames, &keys, mouse) {
                Some(report) => print_report(&report),
                None => println!("No frames run"),
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn walk_arguments_parse() {
        let cli = Cli::try_parse_from([
            "pitchwalk-cli",
            "walk",
            "--frames",
            "10",
            "--keys",
            "W,d,ArrowLeft",
            "--mouse",
            "-25,10",
        ])
        .unwrap();
        let Commands::Walk {
            frames,
            keys,
            mouse,
            model,
        } = cli.command
        else {
            panic!("expected walk");
        };
        assert_eq!(frames, 10);
        assert_eq!(keys, vec![Key::KeyW, Key::KeyD, Key::ArrowLeft]);
        assert_eq!(mouse, Some(MouseMotion { dx: -25.0, dy: 10.0 }));
        assert!(model.is_none());
    }

    #[test]
    fn bad_key_and_motion_are_rejected() {
        assert!(parse_key("Q").is_err());
        assert!(parse_motion("12").is_err());
        assert!(parse_motion("a,b").is_err());
        assert!(parse_motion("1,inf").is_err());
    }

    #[test]
    fn missing_model_walks_on_fallback_ground() {
        let mut config = DemoConfig::default();
        config.camera.start_position = Vec3::new(0.0, 1.0, 0.0);
        let mut scene = scene_with_model(&config, Path::new("does/not/exist.glb"));
        assert_eq!(scene.node_count(), 1);

        let report = walk(&config, &mut scene, 5, &[Key::KeyW], None).unwrap();
        assert_eq!(report.time.frame, 5);
        assert!(matches!(report.ground, GroundOutcome::Followed { .. }));
        assert!(report.pose.position.z < 0.0);
    }

    #[test]
    fn mouse_motion_turns_camera() {
        let config = DemoConfig::default();
        let mut scene = scene_with_model(&config, Path::new("does/not/exist.glb"));
        let report = walk(
            &config,
            &mut scene,
            1,
            &[],
            Some(MouseMotion { dx: 100.0, dy: 0.0 }),
        )
        .unwrap();
        assert!((report.pose.yaw - -0.2).abs() < 1e-6);
    }

    #[test]
    fn zero_frames_produce_no_report() {
        let config = DemoConfig::default();
        let mut scene = config.build_scene();
        assert!(walk(&config, &mut scene, 0, &[], None).is_none());
    }
}

//! Developer Tooling: scene inspector and frame timing for the overlay and CLI.
//!
//! # Invariants
//! - Tools only read the scene.

mod frame_timer;
mod inspector;

pub use frame_timer::FrameTimer;
pub use inspector::{NodeInfo, SceneInspector, SceneSummary};

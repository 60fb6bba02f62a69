//! Rendering Adapter: renderer-agnostic interface.
//!
//! # Invariants
//! - Renderers read the scene and a view; they never mutate the scene.
//! - The drawing buffer is the logical viewport size times a pixel ratio
//!   capped at the configured maximum, and never smaller than 1x1.
//!
//! The GPU backend lives in `pitchwalk-render-wgpu`; [`DebugTextRenderer`]
//! renders the same inputs as text for the CLI and tests.

mod renderer;
mod viewport;

pub use renderer::{DebugTextRenderer, RenderView, Renderer};
pub use viewport::{DEFAULT_MAX_PIXEL_RATIO, Viewport};

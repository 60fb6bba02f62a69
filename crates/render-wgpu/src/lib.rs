//! wgpu render backend for the walk-through demo.
//!
//! Each frame runs up to four passes: a depth-only shadow map from the
//! directional light, a planar reflection of the scene into an offscreen
//! target, the lit scene itself and finally the animated water surface.
//!
//! # Invariants
//! - The renderer never mutates the scene.
//! - GPU meshes are rebuilt only when [`Scene::revision`] changes.
//! - The reflection pass discards geometry below the water plane.
//!
//! [`Scene::revision`]: pitchwalk_scene::Scene::revision

mod camera;
mod context;
mod gpu;
mod shaders;

pub use camera::{CameraMatrices, clip_plane_above, reflection_matrix};
pub use context::{GpuContext, RenderInitError};
pub use gpu::WgpuRenderer;

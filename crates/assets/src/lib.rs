//! Asset Loader: decodes the scene file and the water normal map.
//!
//! Scene files are glTF 2.0 (`.gltf` or binary `.glb`). The loader flattens
//! the node hierarchy into world-space [`SceneNode`]s ready for
//! [`Scene::insert_subscene`].
//!
//! Loads report success or failure explicitly; callers pick the fallback.
//! Primitives compressed with `KHR_draco_mesh_compression` are decoded
//! natively. Only the buffers are read up front; each base colour texture is
//! decoded on its own, so a bad image costs the texture and never the
//! geometry.
//!
//! [`SceneNode`]: pitchwalk_scene::SceneNode
//! [`Scene::insert_subscene`]: pitchwalk_scene::Scene::insert_subscene

mod draco;
mod gltf_import;
mod image_data;
mod loader;

pub use gltf_import::{load_scene, load_scene_from_slice};
pub use image_data::{decode_image, load_normal_map};
pub use loader::{AssetLoader, PendingLoad};
pub use pitchwalk_scene::ImageRgba8;

use std::path::PathBuf;

/// Errors from asset operations.
#[derive(Debug, thiserror::Error)]
pub enum AssetError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("glTF parse error: {0}")]
    GltfParse(String),
    #[error("image {index} has no readable source: {reason}")]
    ImageSource { index: usize, reason: String },
    #[error("no triangle geometry found in {0}")]
    EmptyScene(String),
    #[error("image decode error: {0}")]
    Image(#[from] image::ImageError),
    #[error("loader thread for {0} exited without a result")]
    LoaderVanished(PathBuf),
}

//! Render graph for the demo scene.
//!
//! The scene owns everything the frame loop and the renderer read: static mesh
//! nodes (usually inserted by the asset loader), the light rig, optional fog
//! and the animated water surface.
//!
//! # Invariants
//! - Node geometry never changes after insertion; only the water clock and
//!   the set of nodes do.
//! - [`Scene::revision`] increases whenever the node set changes, so GPU
//!   caches know when to re-upload.
//! - Ray casts cover every mesh node and the water quad, and respect
//!   single-sided materials.

mod graph;
mod image;
mod lighting;
mod mesh;
mod ray;
mod water;

pub use graph::{Scene, SceneNode, SubScene};
pub use image::ImageRgba8;
pub use lighting::{AmbientLight, DirectionalLight, Fog, Lighting, ShadowConfig};
pub use mesh::{Aabb, Material, MeshData};
pub use ray::{HitTarget, Ray, RayHit};
pub use water::{WaterConfig, WaterSurface};

use glam::{Mat4, Quat};
use pitchwalk_common::{Color, NodeId};
use std::f32::consts::FRAC_PI_2;
use std::sync::Arc;

use crate::lighting::{Fog, Lighting};
use crate::mesh::{Material, MeshData};
use crate::ray::{HitTarget, Ray, RayHit, intersect_mesh};
use crate::water::WaterSurface;

/// A mesh placed in the world.
#[derive(Debug, Clone)]
pub struct SceneNode {
    pub id: NodeId,
    pub name: String,
    /// Local-to-world matrix, with any parent transforms already applied.
    pub world: Mat4,
    pub mesh: Arc<MeshData>,
    pub material: Material,
}

impl SceneNode {
    pub fn new(name: impl Into<String>, world: Mat4, mesh: MeshData, material: Material) -> Self {
        Self {
            id: NodeId::new(),
            name: name.into(),
            world,
            mesh: Arc::new(mesh),
            material,
        }
    }
}

/// A decoded group of nodes ready to be inserted into a [`Scene`].
#[derive(Debug, Clone, Default)]
pub struct SubScene {
    pub name: String,
    pub nodes: Vec<SceneNode>,
}

impl SubScene {
    /// Flat, upward-facing square of side `size` centred on the origin.
    /// Stands in for a model that failed to load.
    pub fn ground_plane(size: f32) -> Self {
        let world = Mat4::from_quat(Quat::from_rotation_x(-FRAC_PI_2));
        Self {
            name: "ground".into(),
            nodes: vec![SceneNode::new(
                "ground",
                world,
                MeshData::plane(size, size),
                Material::default(),
            )],
        }
    }

    pub fn triangle_count(&self) -> usize {
        self.nodes.iter().map(|n| n.mesh.triangle_count()).sum()
    }
}

/// Root of the render graph.
#[derive(Debug, Clone)]
pub struct Scene {
    nodes: Vec<SceneNode>,
    lighting: Lighting,
    fog: Option<Fog>,
    water: Option<WaterSurface>,
    background: Color,
    revision: u64,
}

impl Scene {
    pub fn new(lighting: Lighting) -> Self {
        Self {
            nodes: Vec::new(),
            lighting,
            fog: None,
            water: None,
            background: Color::rgb(0.0, 0.0, 0.0),
            revision: 0,
        }
    }

    pub fn add_node(&mut self, node: SceneNode) -> NodeId {
        let id = node.id;
        self.nodes.push(node);
        self.revision += 1;
        id
    }

    /// Insert every node of a decoded sub-scene. Returns the inserted ids.
    pub fn insert_subscene(&mut self, sub: SubScene) -> Vec<NodeId> {
        tracing::info!(
            name = %sub.name,
            nodes = sub.nodes.len(),
            triangles = sub.triangle_count(),
            "inserting sub-scene"
        );
        let ids = sub.nodes.iter().map(|n| n.id).collect();
        self.nodes.extend(sub.nodes);
        self.revision += 1;
        ids
    }

    pub fn remove_node(&mut self, id: NodeId) -> Option<SceneNode> {
        let idx = self.nodes.iter().position(|n| n.id == id)?;
        self.revision += 1;
        Some(self.nodes.remove(idx))
    }

    pub fn nodes(&self) -> &[SceneNode] {
        &self.nodes
    }

    pub fn node(&self, id: NodeId) -> Option<&SceneNode> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.nodes.iter().map(|n| n.mesh.triangle_count()).sum()
    }

    /// Changes whenever nodes are added or removed.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn lighting(&self) -> &Lighting {
        &self.lighting
    }

    pub fn fog(&self) -> Option<&Fog> {
        self.fog.as_ref()
    }

    pub fn set_fog(&mut self, fog: Option<Fog>) {
        self.fog = fog;
    }

    pub fn background(&self) -> Color {
        self.background
    }

    pub fn set_background(&mut self, color: Color) {
        self.background = color;
    }

    pub fn water(&self) -> Option<&WaterSurface> {
        self.water.as_ref()
    }

    pub fn water_mut(&mut self) -> Option<&mut WaterSurface> {
        self.water.as_mut()
    }

    pub fn set_water(&mut self, water: WaterSurface) {
        self.water = Some(water);
    }

    /// Nearest intersection of `ray` with any node or the water quad.
    pub fn raycast(&self, ray: &Ray) -> Option<RayHit> {
        let mut nearest: Option<RayHit> = None;
        let mut consider = |distance: f32, point, target| {
            if nearest.is_none_or(|h| distance < h.distance) {
                nearest = Some(RayHit {
                    distance,
                    point,
                    target,
                });
            }
        };

        for node in &self.nodes {
            let cull = !node.material.double_sided;
            if let Some((d, p)) = intersect_mesh(ray, &node.mesh, &node.world, cull) {
                consider(d, p, HitTarget::Node(node.id));
            }
        }
        if let Some(water) = &self.water {
            if let Some((d, p)) = intersect_mesh(ray, water.mesh(), &water.world_matrix(), true) {
                consider(d, p, HitTarget::Water);
            }
        }
        nearest
    }
}

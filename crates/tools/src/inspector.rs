use glam::Vec3;
use pitchwalk_common::NodeId;
use pitchwalk_scene::{Aabb, Scene};

/// Read-only queries against the scene for the overlay and the CLI.
pub struct SceneInspector;

impl SceneInspector {
    pub fn summary(scene: &Scene) -> SceneSummary {
        let mut bounds = Aabb::empty();
        for node in scene.nodes() {
            let b = node.mesh.bounds();
            if b.is_empty() {
                continue;
            }
            for corner in corners(&b) {
                bounds.extend(node.world.transform_point3(corner));
            }
        }
        SceneSummary {
            revision: scene.revision(),
            node_count: scene.node_count(),
            triangle_count: scene.triangle_count(),
            water_time: scene.water().map(|w| w.time()),
            fog: scene.fog().is_some(),
            bounds: (!bounds.is_empty()).then_some(bounds),
        }
    }

    pub fn inspect_node(scene: &Scene, id: NodeId) -> Option<NodeInfo> {
        scene.node(id).map(|node| NodeInfo {
            id,
            name: node.name.clone(),
            position: node.world.transform_point3(Vec3::ZERO),
            triangles: node.mesh.triangle_count(),
            double_sided: node.material.double_sided,
        })
    }

    pub fn list_nodes(scene: &Scene) -> Vec<NodeId> {
        scene.nodes().iter().map(|n| n.id).collect()
    }
}

fn corners(b: &Aabb) -> [Vec3; 8] {
    let (lo, hi) = (b.min, b.max);
    [
        Vec3::new(lo.x, lo.y, lo.z),
        Vec3::new(hi.x, lo.y, lo.z),
        Vec3::new(lo.x, hi.y, lo.z),
        Vec3::new(hi.x, hi.y, lo.z),
        Vec3::new(lo.x, lo.y, hi.z),
        Vec3::new(hi.x, lo.y, hi.z),
        Vec3::new(lo.x, hi.y, hi.z),
        Vec3::new(hi.x, hi.y, hi.z),
    ]
}

/// Summary of the scene state.
#[derive(Debug, Clone)]
pub struct SceneSummary {
    pub revision: u64,
    pub node_count: usize,
    pub triangle_count: usize,
    /// Animation time of the water surface, if any.
    pub water_time: Option<f32>,
    pub fog: bool,
    /// World-space bounds of all node geometry.
    pub bounds: Option<Aabb>,
}

impl std::fmt::Display for SceneSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Scene: revision={} nodes={} triangles={} fog={}",
            self.revision,
            self.node_count,
            self.triangle_count,
            if self.fog { "on" } else { "off" }
        )?;
        match self.water_time {
            Some(t) => write!(f, " water_time={t:.3}")?,
            None => write!(f, " water=none")?,
        }
        if let Some(b) = &self.bounds {
            write!(
                f,
                " bounds=({:.2}, {:.2}, {:.2})..({:.2}, {:.2}, {:.2})",
                b.min.x, b.min.y, b.min.z, b.max.x, b.max.y, b.max.z
            )?;
        }
        Ok(())
    }
}

/// Details of a single node.
#[derive(Debug, Clone)]
pub struct NodeInfo {
    pub id: NodeId,
    pub name: String,
    /// World-space origin of the node.
    pub position: Vec3,
    pub triangles: usize,
    pub double_sided: bool,
}

impl std::fmt::Display for NodeInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Node [{}] {} pos=({:.2}, {:.2}, {:.2}) triangles={}{}",
            self.id.short(),
            self.name,
            self.position.x,
            self.position.y,
            self.position.z,
            self.triangles,
            if self.double_sided { " double-sided" } else { "" }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Mat4;
    use pitchwalk_scene::{Lighting, Material, MeshData, SceneNode, WaterConfig, WaterSurface};

    fn scene_with_plane() -> (Scene, NodeId) {
        let mut scene = Scene::new(Lighting::default());
        let id = scene.add_node(SceneNode::new(
            "ground",
            Mat4::from_translation(Vec3::new(0.0, 1.0, 0.0)),
            MeshData::plane(4.0, 2.0),
            Material::default(),
        ));
        (scene, id)
    }

    #[test]
    fn summary_empty_scene() {
        let scene = Scene::new(Lighting::default());
        let summary = SceneInspector::summary(&scene);
        assert_eq!(summary.node_count, 0);
        assert_eq!(summary.triangle_count, 0);
        assert!(summary.water_time.is_none());
        assert!(summary.bounds.is_none());
        assert!(summary.to_string().contains("water=none"));
    }

    #[test]
    fn summary_reports_geometry_and_water() {
        let (mut scene, _) = scene_with_plane();
        let mut water = WaterSurface::new(WaterConfig::default(), &scene);
        water.advance(0.002);
        scene.set_water(water);

        let summary = SceneInspector::summary(&scene);
        assert_eq!(summary.node_count, 1);
        assert_eq!(summary.triangle_count, 2);
        assert_eq!(summary.water_time, Some(0.002));
        let b = summary.bounds.unwrap();
        assert_eq!(b.min, Vec3::new(-2.0, 0.0, 0.0));
        assert_eq!(b.max, Vec3::new(2.0, 2.0, 0.0));

        let s = summary.to_string();
        assert!(s.contains("nodes=1"));
        assert!(s.contains("water_time=0.002"));
    }

    #[test]
    fn inspect_node_found_and_missing() {
        let (scene, id) = scene_with_plane();
        let info = SceneInspector::inspect_node(&scene, id).unwrap();
        assert_eq!(info.name, "ground");
        assert_eq!(info.position, Vec3::new(0.0, 1.0, 0.0));
        assert_eq!(info.triangles, 2);
        assert!(info.to_string().contains("ground"));

        assert!(SceneInspector::inspect_node(&scene, NodeId::new()).is_none());
    }

    #[test]
    fn list_nodes_returns_ids() {
        let (scene, id) = scene_with_plane();
        assert_eq!(SceneInspector::list_nodes(&scene), vec![id]);
    }
}

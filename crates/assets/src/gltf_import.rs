use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use glam::{Mat4, Vec2, Vec3};
use gltf::image::Source;
use gltf::mesh::Mode;
use pitchwalk_scene::{ImageRgba8, Material, MeshData, SceneNode, SubScene};
use std::borrow::Cow;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use crate::draco::{self, DRACO_EXTENSION};
use crate::{AssetError, decode_image};

/// Load a `.glb` or `.gltf` file from disk. External buffers and images
/// resolve relative to the file.
pub fn load_scene(path: impl AsRef<Path>) -> Result<SubScene, AssetError> {
    let path = path.as_ref();
    let _span = tracing::info_span!("import_gltf", path = %path.display()).entered();

    let bytes = std::fs::read(path)?;
    let name = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "scene".into());
    import(name, &bytes, path.parent())
}

/// Load a self-contained scene (GLB, or glTF with embedded buffers) from memory.
pub fn load_scene_from_slice(bytes: &[u8]) -> Result<SubScene, AssetError> {
    import("scene".into(), bytes, None)
}

fn import(name: String, bytes: &[u8], base: Option<&Path>) -> Result<SubScene, AssetError> {
    let gltf::Gltf { document, blob } = parse(bytes)?;
    // Buffers only; images are decoded per texture.
    let buffers = gltf::import_buffers(&document, base, blob).map_err(parse_error)?;
    Importer {
        doc: &document,
        buffers: &buffers,
        base,
        images: HashMap::new(),
    }
    .build(name)
}

/// Parse and validate. Draco is accepted as a required extension, and the
/// accessors its primitives leave without a bufferView pass validation.
fn parse(bytes: &[u8]) -> Result<gltf::Gltf, AssetError> {
    use gltf::json::validation::{Error, Validate};

    let gltf::Gltf { document, blob } =
        gltf::Gltf::from_slice_without_validation(bytes).map_err(parse_error)?;
    let mut root = document.into_json();
    let uses_draco = root.extensions_used.iter().any(|ext| ext == DRACO_EXTENSION);
    root.extensions_required.retain(|ext| ext != DRACO_EXTENSION);

    let mut errors = Vec::new();
    root.validate(&root, gltf::json::Path::new, &mut |path, error| {
        errors.push((path(), error))
    });
    errors.retain(|(path, error)| {
        let compressed_accessor = matches!(error, Error::Missing)
            && path.as_str().starts_with("accessors[")
            && path.as_str().ends_with(".bufferView");
        !(uses_draco && compressed_accessor)
    });
    if !errors.is_empty() {
        return Err(parse_error(gltf::Error::Validation(errors)));
    }

    Ok(gltf::Gltf {
        document: gltf::Document::from_json_without_validation(root),
        blob,
    })
}

fn parse_error(e: gltf::Error) -> AssetError {
    AssetError::GltfParse(e.to_string())
}

struct Importer<'a> {
    doc: &'a gltf::Document,
    buffers: &'a [gltf::buffer::Data],
    base: Option<&'a Path>,
    /// Decoded base colour images by index; `None` marks one that failed.
    images: HashMap<usize, Option<Arc<ImageRgba8>>>,
}

impl<'a> Importer<'a> {
    fn build(mut self, name: String) -> Result<SubScene, AssetError> {
        let doc = self.doc;
        let scene = doc
            .default_scene()
            .or_else(|| doc.scenes().next())
            .ok_or_else(|| AssetError::EmptyScene(name.clone()))?;

        let mut nodes = Vec::new();
        for root in scene.nodes() {
            self.collect_node(&root, Mat4::IDENTITY, &mut nodes);
        }

        if nodes.is_empty() {
            return Err(AssetError::EmptyScene(name));
        }

        let sub = SubScene { name, nodes };
        tracing::info!(
            name = %sub.name,
            nodes = sub.nodes.len(),
            triangles = sub.triangle_count(),
            textures = self.images.values().flatten().count(),
            "glTF scene decoded"
        );
        Ok(sub)
    }

    fn collect_node(&mut self, node: &gltf::Node<'_>, parent: Mat4, out: &mut Vec<SceneNode>) {
        let local = Mat4::from_cols_array_2d(&node.transform().matrix());
        let world = parent * local;

        if let Some(mesh) = node.mesh() {
            let base_name = node
                .name()
                .or_else(|| mesh.name())
                .map(str::to_owned)
                .unwrap_or_else(|| format!("node{}", node.index()));

            for (i, prim) in mesh.primitives().enumerate() {
                if prim.mode() != Mode::Triangles {
                    tracing::debug!(node = %base_name, mode = ?prim.mode(), "skipping non-triangle primitive");
                    continue;
                }
                let material = prim.material();
                let uv_set = material
                    .pbr_metallic_roughness()
                    .base_color_texture()
                    .map_or(0, |info| info.tex_coord());
                let Some(data) = self.read_primitive(&prim, uv_set) else {
                    tracing::warn!(node = %base_name, primitive = i, "skipping unreadable primitive");
                    continue;
                };
                let material = self.read_material(&material);
                let name = if mesh.primitives().len() > 1 {
                    format!("{base_name}#{i}")
                } else {
                    base_name.clone()
                };
                out.push(SceneNode::new(name, world, data, material));
            }
        }

        for child in node.children() {
            self.collect_node(&child, world, out);
        }
    }

    fn read_primitive(&self, prim: &gltf::Primitive<'_>, uv_set: u32) -> Option<MeshData> {
        if let Some(ext) = prim.extension_value(DRACO_EXTENSION) {
            return match draco::decode_primitive(self.doc, prim, ext, self.buffers, uv_set) {
                Ok(d) => assemble(d.positions, d.normals, d.uvs, d.indices),
                Err(e) => {
                    tracing::warn!("Draco decode failed: {e:#}");
                    None
                }
            };
        }

        let reader = prim.reader(|b| self.buffers.get(b.index()).map(|d| d.0.as_slice()));
        let positions = reader.read_positions()?.map(Vec3::from).collect();
        assemble(
            positions,
            reader.read_normals().map(|it| it.map(Vec3::from).collect()),
            reader
                .read_tex_coords(uv_set)
                .map(|it| it.into_f32().map(Vec2::from).collect()),
            reader.read_indices().map(|it| it.into_u32().collect()),
        )
    }

    fn read_material(&mut self, material: &gltf::Material<'_>) -> Material {
        let pbr = material.pbr_metallic_roughness();
        Material {
            name: material.name().unwrap_or("default").to_owned(),
            base_color: pbr.base_color_factor(),
            base_color_texture: pbr
                .base_color_texture()
                .and_then(|info| self.texture_image(info.texture().source())),
            double_sided: material.double_sided(),
        }
    }

    fn texture_image(&mut self, image: gltf::Image<'_>) -> Option<Arc<ImageRgba8>> {
        let index = image.index();
        if let Some(cached) = self.images.get(&index) {
            return cached.clone();
        }
        let decoded = self
            .image_bytes(&image)
            .and_then(|bytes| decode_image(&bytes));
        let entry = match decoded {
            Ok(img) => Some(Arc::new(img)),
            Err(e) => {
                tracing::warn!(image = index, "base colour texture skipped: {e}");
                None
            }
        };
        self.images.insert(index, entry.clone());
        entry
    }

    fn image_bytes(&self, image: &gltf::Image<'_>) -> Result<Cow<'a, [u8]>, AssetError> {
        let index = image.index();
        let invalid = |reason: String| AssetError::ImageSource { index, reason };
        match image.source() {
            Source::View { view, .. } => {
                let start = view.offset();
                self.buffers
                    .get(view.buffer().index())
                    .and_then(|b| b.0.get(start..start + view.length()))
                    .map(Cow::Borrowed)
                    .ok_or_else(|| invalid("bufferView lies outside its buffer".into()))
            }
            Source::Uri { uri, .. } => {
                if let Some(data) = uri.strip_prefix("data:") {
                    let (_, encoded) = data
                        .split_once(";base64,")
                        .ok_or_else(|| invalid("data URI is not base64".into()))?;
                    BASE64
                        .decode(encoded)
                        .map(Cow::Owned)
                        .map_err(|e| invalid(e.to_string()))
                } else {
                    let base = self
                        .base
                        .ok_or_else(|| invalid(format!("external `{uri}` in an in-memory scene")))?;
                    Ok(Cow::Owned(std::fs::read(base.join(uri))?))
                }
            }
        }
    }
}

/// Fill in missing streams and reject inconsistent ones. Normals default to
/// up, UVs to zero and indices to the vertex order.
fn assemble(
    positions: Vec<Vec3>,
    normals: Option<Vec<Vec3>>,
    uvs: Option<Vec<Vec2>>,
    indices: Option<Vec<u32>>,
) -> Option<MeshData> {
    let count = positions.len();
    let normals = normals.unwrap_or_else(|| vec![Vec3::Y; count]);
    let uvs = uvs
        .filter(|uvs| uvs.len() == count)
        .unwrap_or_else(|| vec![Vec2::ZERO; count]);
    let indices = indices.unwrap_or_else(|| (0..count as u32).collect());

    if normals.len() != count {
        return None;
    }
    if indices.iter().any(|&i| i as usize >= count) {
        return None;
    }

    let mesh = MeshData {
        positions,
        normals,
        uvs,
        indices,
    };
    (!mesh.is_empty()).then_some(mesh)
}

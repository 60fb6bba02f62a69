//! Native decode of `KHR_draco_mesh_compression` primitives.

use anyhow::{Context, Result, bail};
use draco_decoder::{AttributeDataType, MeshDecodeConfig, decode_mesh};
use glam::{Vec2, Vec3};
use gltf::accessor::DataType;
use gltf::mesh::Semantic;
use serde::Deserialize;
use std::collections::BTreeMap;

pub(crate) const DRACO_EXTENSION: &str = "KHR_draco_mesh_compression";

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct DracoExtension {
    buffer_view: usize,
    /// glTF attribute name to Draco attribute id.
    attributes: BTreeMap<String, u32>,
}

/// Layout of one attribute in the decoded stream.
struct StreamAttribute {
    semantic: Semantic,
    components: usize,
    data_type: DataType,
    normalized: bool,
}

/// Vertex streams recovered from one compressed primitive.
#[derive(Debug)]
pub(crate) struct DracoPrimitive {
    pub positions: Vec<Vec3>,
    pub normals: Option<Vec<Vec3>>,
    pub uvs: Option<Vec<Vec2>>,
    pub indices: Option<Vec<u32>>,
}

/// Decode the compressed payload `extension` describes. `uv_set` picks the
/// `TEXCOORD_n` stream to keep.
pub(crate) fn decode_primitive(
    doc: &gltf::Document,
    prim: &gltf::Primitive<'_>,
    extension: &serde_json::Value,
    buffers: &[gltf::buffer::Data],
    uv_set: u32,
) -> Result<DracoPrimitive> {
    let ext: DracoExtension =
        serde_json::from_value(extension.clone()).context("malformed Draco extension")?;

    let view = doc
        .views()
        .nth(ext.buffer_view)
        .with_context(|| format!("bufferView {} out of range", ext.buffer_view))?;
    let start = view.offset();
    let compressed = buffers
        .get(view.buffer().index())
        .and_then(|b| b.0.get(start..start + view.length()))
        .context("compressed bytes lie outside their buffer")?;

    let vertex_count = prim
        .get(&Semantic::Positions)
        .context("POSITION accessor missing")?
        .count();
    let index_count = prim.indices().map_or(0, |a| a.count());

    // The decoder emits attributes in ascending Draco id order.
    let mut ordered: Vec<(u32, &str)> = ext
        .attributes
        .iter()
        .map(|(name, id)| (*id, name.as_str()))
        .collect();
    ordered.sort_unstable_by_key(|(id, _)| *id);

    let mut config = MeshDecodeConfig::new(vertex_count as u32, index_count as u32);
    let mut stream = Vec::with_capacity(ordered.len());
    for (_, name) in ordered {
        let (semantic, accessor) = prim
            .attributes()
            .find(|(semantic, _)| semantic.to_string() == name)
            .with_context(|| format!("no accessor for Draco attribute {name}"))?;
        let components = accessor.dimensions().multiplicity();
        config.add_attribute(components as u32, attribute_type(accessor.data_type()));
        stream.push(StreamAttribute {
            semantic,
            components,
            data_type: accessor.data_type(),
            normalized: accessor.normalized(),
        });
    }

    let decoded = pollster::block_on(decode_mesh(compressed, &config))
        .context("Draco decoder rejected the primitive")?;
    let mut cursor = decoded.as_slice();

    let indices = if index_count > 0 {
        let wide = index_count > u16::MAX as usize;
        let bytes = take(&mut cursor, index_count * if wide { 4 } else { 2 })?;
        let indices = if wide {
            bytes
                .chunks_exact(4)
                .map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]]))
                .collect()
        } else {
            bytes
                .chunks_exact(2)
                .map(|c| u16::from_le_bytes([c[0], c[1]]) as u32)
                .collect()
        };
        Some(indices)
    } else {
        None
    };

    let mut positions = None;
    let mut normals = None;
    let mut uvs = None;
    for attr in &stream {
        let len = attr.components * vertex_count * attr.data_type.size();
        let bytes = take(&mut cursor, len)?;
        match attr.semantic {
            Semantic::Positions => positions = Some(vec3s(bytes, attr)?),
            Semantic::Normals => normals = Some(vec3s(bytes, attr)?),
            Semantic::TexCoords(set) if set == uv_set => uvs = Some(vec2s(bytes, attr)?),
            _ => {}
        }
    }

    Ok(DracoPrimitive {
        positions: positions.context("decoded stream has no POSITION")?,
        normals,
        uvs,
        indices,
    })
}

fn attribute_type(data_type: DataType) -> AttributeDataType {
    match data_type {
        DataType::I8 => AttributeDataType::Int8,
        DataType::U8 => AttributeDataType::UInt8,
        DataType::I16 => AttributeDataType::Int16,
        DataType::U16 => AttributeDataType::UInt16,
        DataType::U32 => AttributeDataType::UInt32,
        DataType::F32 => AttributeDataType::Float32,
    }
}

fn take<'a>(cursor: &mut &'a [u8], len: usize) -> Result<&'a [u8]> {
    if cursor.len() < len {
        bail!(
            "decoded stream ends early: wanted {len} bytes, {} left",
            cursor.len()
        );
    }
    let (head, tail) = cursor.split_at(len);
    *cursor = tail;
    Ok(head)
}

/// Components as floats, applying glTF normalisation rules.
fn floats(bytes: &[u8], attr: &StreamAttribute) -> Vec<f32> {
    let norm = attr.normalized;
    match attr.data_type {
        DataType::F32 => bytes
            .chunks_exact(4)
            .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect(),
        DataType::U32 => bytes
            .chunks_exact(4)
            .map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]]) as f32)
            .collect(),
        DataType::U16 => bytes
            .chunks_exact(2)
            .map(|c| {
                let v = u16::from_le_bytes([c[0], c[1]]) as f32;
                if norm { v / 65535.0 } else { v }
            })
            .collect(),
        DataType::I16 => bytes
            .chunks_exact(2)
            .map(|c| {
                let v = i16::from_le_bytes([c[0], c[1]]) as f32;
                if norm { (v / 32767.0).max(-1.0) } else { v }
            })
            .collect(),
        DataType::U8 => bytes
            .iter()
            .map(|&b| if norm { b as f32 / 255.0 } else { b as f32 })
            .collect(),
        DataType::I8 => bytes
            .iter()
            .map(|&b| {
                let v = b as i8 as f32;
                if norm { (v / 127.0).max(-1.0) } else { v }
            })
            .collect(),
    }
}

fn vec3s(bytes: &[u8], attr: &StreamAttribute) -> Result<Vec<Vec3>> {
    if attr.components != 3 {
        bail!("{} has {} components, expected 3", attr.semantic.to_string(), attr.components);
    }
    Ok(floats(bytes, attr)
        .chunks_exact(3)
        .map(Vec3::from_slice)
        .collect())
}

fn vec2s(bytes: &[u8], attr: &StreamAttribute) -> Result<Vec<Vec2>> {
    if attr.components != 2 {
        bail!("{} has {} components, expected 2", attr.semantic.to_string(), attr.components);
    }
    Ok(floats(bytes, attr)
        .chunks_exact(2)
        .map(Vec2::from_slice)
        .collect())
}

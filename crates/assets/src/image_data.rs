use pitchwalk_scene::ImageRgba8;
use std::path::Path;

use crate::AssetError;

fn from_rgba(img: image::RgbaImage) -> ImageRgba8 {
    ImageRgba8 {
        width: img.width(),
        height: img.height(),
        pixels: img.into_raw(),
    }
}

/// Decode an encoded image (PNG or JPEG) from memory.
pub fn decode_image(bytes: &[u8]) -> Result<ImageRgba8, AssetError> {
    Ok(from_rgba(image::load_from_memory(bytes)?.to_rgba8()))
}

/// Load the tiling water normal map.
pub fn load_normal_map(path: impl AsRef<Path>) -> Result<ImageRgba8, AssetError> {
    let path = path.as_ref();
    let bytes = std::fs::read(path)?;
    let img = decode_image(&bytes)?;
    tracing::info!(
        path = %path.display(),
        width = img.width,
        height = img.height,
        "normal map loaded"
    );
    Ok(img)
}

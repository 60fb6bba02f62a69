/// Decoded 8-bit RGBA pixels, row-major, top row first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRgba8 {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

impl ImageRgba8 {
    /// A 1x1 image of a single colour.
    pub fn solid(rgba: [u8; 4]) -> Self {
        Self {
            width: 1,
            height: 1,
            pixels: rgba.to_vec(),
        }
    }

    /// A 1x1 normal map pointing straight out of the surface.
    pub fn flat_normal() -> Self {
        Self::solid([128, 128, 255, 255])
    }

    /// Bytes per row, as needed for a texture upload.
    pub fn bytes_per_row(&self) -> u32 {
        self.width * 4
    }

    /// Non-zero size with exactly `width * height` texels.
    pub fn is_consistent(&self) -> bool {
        self.width > 0
            && self.height > 0
            && self.pixels.len() == self.width as usize * self.height as usize * 4
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flat_normal_is_single_up_texel() {
        let img = ImageRgba8::flat_normal();
        assert_eq!(img.pixels, vec![128, 128, 255, 255]);
        assert_eq!(img.bytes_per_row(), 4);
        assert!(img.is_consistent());
    }

    #[test]
    fn truncated_pixels_are_inconsistent() {
        let img = ImageRgba8 {
            width: 2,
            height: 2,
            pixels: vec![0; 12],
        };
        assert!(!img.is_consistent());

        let empty = ImageRgba8 {
            width: 0,
            height: 0,
            pixels: Vec::new(),
        };
        assert!(!empty.is_consistent());
    }
}

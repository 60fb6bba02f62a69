/// Pixel ratio cap used when none is configured.
pub const DEFAULT_MAX_PIXEL_RATIO: f32 = 2.0;

/// Logical size of the render surface plus the pixel ratio in use.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
    pub pixel_ratio: f32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 1,
            height: 1,
            pixel_ratio: 1.0,
        }
    }
}

impl Viewport {
    pub fn new(width: u32, height: u32, device_ratio: f32, max_ratio: f32) -> Self {
        let mut vp = Self::default();
        vp.resize(width, height, device_ratio, max_ratio);
        vp
    }

    /// Track a surface resize. The pixel ratio becomes
    /// `min(device_ratio, max_ratio)`; non-finite or non-positive ratios
    /// fall back to 1.
    pub fn resize(&mut self, width: u32, height: u32, device_ratio: f32, max_ratio: f32) {
        let usable = |r: f32| r.is_finite() && r > 0.0;
        self.width = width;
        self.height = height;
        self.pixel_ratio = if usable(device_ratio) && usable(max_ratio) {
            device_ratio.min(max_ratio)
        } else {
            1.0
        };
        tracing::debug!(
            width,
            height,
            pixel_ratio = self.pixel_ratio,
            "viewport resized"
        );
    }

    /// Width over height, or 1 for a degenerate surface.
    pub fn aspect(&self) -> f32 {
        if self.height == 0 {
            1.0
        } else {
            self.width as f32 / self.height as f32
        }
    }

    /// Size of the drawing buffer in physical pixels.
    pub fn drawing_buffer_size(&self) -> (u32, u32) {
        let scale = |v: u32| ((v as f32 * self.pixel_ratio).round() as u32).max(1);
        (scale(self.width), scale(self.height))
    }

    /// Logical size of a surface whose physical size and scale factor are known.
    pub fn logical_from_physical(width: u32, height: u32, scale_factor: f64) -> (u32, u32) {
        if !(scale_factor.is_finite() && scale_factor > 0.0) {
            return (width, height);
        }
        let scale = |v: u32| (v as f64 / scale_factor).round() as u32;
        (scale(width), scale(height))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resize_sets_size_and_aspect() {
        let mut vp = Viewport::default();
        vp.resize(1280, 720, 1.0, DEFAULT_MAX_PIXEL_RATIO);
        assert_eq!((vp.width, vp.height), (1280, 720));
        assert!((vp.aspect() - 1280.0 / 720.0).abs() < 1e-6);
        assert_eq!(vp.drawing_buffer_size(), (1280, 720));
    }

    #[test]
    fn pixel_ratio_is_capped() {
        let vp = Viewport::new(800, 600, 3.0, DEFAULT_MAX_PIXEL_RATIO);
        assert_eq!(vp.pixel_ratio, 2.0);
        assert_eq!(vp.drawing_buffer_size(), (1600, 1200));

        let vp = Viewport::new(800, 600, 1.5, DEFAULT_MAX_PIXEL_RATIO);
        assert_eq!(vp.pixel_ratio, 1.5);
        assert_eq!(vp.drawing_buffer_size(), (1200, 900));
    }

    #[test]
    fn degenerate_sizes_stay_drawable() {
        let vp = Viewport::new(0, 0, 1.0, DEFAULT_MAX_PIXEL_RATIO);
        assert_eq!(vp.aspect(), 1.0);
        assert_eq!(vp.drawing_buffer_size(), (1, 1));
    }

    #[test]
    fn bad_ratio_falls_back_to_one() {
        let vp = Viewport::new(640, 480, f32::NAN, DEFAULT_MAX_PIXEL_RATIO);
        assert_eq!(vp.pixel_ratio, 1.0);
        let vp = Viewport::new(640, 480, 0.0, DEFAULT_MAX_PIXEL_RATIO);
        assert_eq!(vp.pixel_ratio, 1.0);
    }

    #[test]
    fn logical_size_undoes_scale_factor() {
        assert_eq!(Viewport::logical_from_physical(2560, 1440, 2.0), (1280, 720));
        assert_eq!(Viewport::logical_from_physical(300, 200, 0.0), (300, 200));
    }
}

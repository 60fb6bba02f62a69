use std::f32::consts::FRAC_PI_2;

/// Accumulated mouse-look angles in radians.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MouseLook {
    pub yaw: f32,
    pub pitch: f32,
    /// Radians per pixel of relative motion.
    pub sensitivity: f32,
}

impl Default for MouseLook {
    fn default() -> Self {
        Self::new(0.002)
    }
}

impl MouseLook {
    pub fn new(sensitivity: f32) -> Self {
        Self {
            yaw: 0.0,
            pitch: 0.0,
            sensitivity,
        }
    }

    /// Apply one relative motion event. Moving right turns left-handed
    /// (yaw decreases), moving down looks down (pitch decreases).
    pub fn apply_motion(&mut self, dx: f32, dy: f32) {
        self.yaw -= dx * self.sensitivity;
        self.pitch -= dy * self.sensitivity;
        self.pitch = self.pitch.clamp(-FRAC_PI_2, FRAC_PI_2);
    }
}

/// Whether the pointer is captured by the render surface.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PointerCapture {
    active: bool,
}

impl PointerCapture {
    pub fn request(&mut self) {
        if !self.active {
            tracing::debug!("pointer capture requested");
        }
        self.active = true;
    }

    pub fn release(&mut self) {
        if self.active {
            tracing::debug!("pointer capture released");
        }
        self.active = false;
    }

    pub fn is_active(&self) -> bool {
        self.active
    }
}

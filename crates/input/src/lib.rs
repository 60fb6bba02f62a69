//! Input Tracker: maps raw keyboard and mouse events to a key-state table and
//! accumulated mouse-look angles.
//!
//! # Invariants
//! - Unrecognised key codes are ignored, never an error.
//! - Pitch stays within `[-pi/2, pi/2]` regardless of input magnitude.
//! - Mouse motion only counts while the pointer is captured.
//!
//! Nothing here knows about the windowing layer; the application translates
//! its native key codes into [`Key`] values.

pub mod action;
mod keys;
mod mouse;

pub use action::MoveIntent;
pub use keys::{Key, KeyState};
pub use mouse::{MouseLook, PointerCapture};

/// All input the frame loop reads, bundled so it can be passed explicitly.
#[derive(Debug, Clone, Default)]
pub struct InputState {
    pub keys: KeyState,
    pub look: MouseLook,
    pub pointer: PointerCapture,
}

impl InputState {
    pub fn new(sensitivity: f32) -> Self {
        Self {
            look: MouseLook::new(sensitivity),
            ..Self::default()
        }
    }

    /// Record a key transition. Returns `false` when the key is not tracked.
    pub fn key_event(&mut self, key: Option<Key>, pressed: bool) -> bool {
        let Some(key) = key else {
            return false;
        };
        if pressed {
            self.keys.press(key);
        } else {
            self.keys.release(key);
        }
        true
    }

    /// Same as [`InputState::key_event`] but from a DOM-style code name.
    pub fn key_code_event(&mut self, code: &str, pressed: bool) -> bool {
        self.key_event(Key::from_code(code), pressed)
    }

    /// Apply relative mouse movement if the pointer is captured.
    pub fn mouse_motion(&mut self, dx: f32, dy: f32) {
        if self.pointer.is_active() {
            self.look.apply_motion(dx, dy);
        }
    }

    /// The render surface was clicked.
    pub fn surface_clicked(&mut self) {
        self.pointer.request();
    }

    /// Focus was lost or capture was cancelled; held keys are dropped too so
    /// the camera does not keep walking.
    pub fn focus_lost(&mut self) {
        self.pointer.release();
        self.keys.clear();
    }

    pub fn move_intent(&self) -> MoveIntent {
        MoveIntent::from_keys(&self.keys)
    }
}

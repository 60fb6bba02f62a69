use serde::{Deserialize, Serialize};

const KEY_COUNT: usize = 9;

/// The fixed set of keys the demo tracks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Key {
    KeyW,
    KeyS,
    KeyA,
    KeyD,
    Space,
    ArrowUp,
    ArrowDown,
    ArrowLeft,
    ArrowRight,
}

impl Key {
    pub const ALL: [Key; KEY_COUNT] = [
        Key::KeyW,
        Key::KeyS,
        Key::KeyA,
        Key::KeyD,
        Key::Space,
        Key::ArrowUp,
        Key::ArrowDown,
        Key::ArrowLeft,
        Key::ArrowRight,
    ];

    /// Map a DOM-style physical key code (`"KeyW"`, `"ArrowUp"`, ...).
    pub fn from_code(code: &str) -> Option<Key> {
        let key = match code {
            "KeyW" => Key::KeyW,
            "KeyS" => Key::KeyS,
            "KeyA" => Key::KeyA,
            "KeyD" => Key::KeyD,
            "Space" => Key::Space,
            "ArrowUp" => Key::ArrowUp,
            "ArrowDown" => Key::ArrowDown,
            "ArrowLeft" => Key::ArrowLeft,
            "ArrowRight" => Key::ArrowRight,
            _ => return None,
        };
        Some(key)
    }

    fn index(self) -> usize {
        self as usize
    }
}

/// Held/released flag per tracked key.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct KeyState {
    held: [bool; KEY_COUNT],
}

impl KeyState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn press(&mut self, key: Key) {
        self.held[key.index()] = true;
    }

    pub fn release(&mut self, key: Key) {
        self.held[key.index()] = false;
    }

    pub fn is_held(&self, key: Key) -> bool {
        self.held[key.index()]
    }

    pub fn clear(&mut self) {
        self.held = [false; Key::ALL.len()];
    }

    pub fn forward(&self) -> bool {
        self.is_held(Key::KeyW) || self.is_held(Key::ArrowUp)
    }

    pub fn back(&self) -> bool {
        self.is_held(Key::KeyS) || self.is_held(Key::ArrowDown)
    }

    pub fn strafe_left(&self) -> bool {
        self.is_held(Key::KeyA) || self.is_held(Key::ArrowLeft)
    }

    pub fn strafe_right(&self) -> bool {
        self.is_held(Key::KeyD) || self.is_held(Key::ArrowRight)
    }
}

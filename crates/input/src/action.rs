use crate::keys::KeyState;

/// Movement intent for a single frame, derived from the key table.
///
/// The frame loop consumes intents, never raw key codes, so alternate key
/// bindings (WASD or arrows) collapse into the same four flags.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MoveIntent {
    pub forward: bool,
    pub back: bool,
    pub left: bool,
    pub right: bool,
}

impl MoveIntent {
    pub fn from_keys(keys: &KeyState) -> Self {
        Self {
            forward: keys.forward(),
            back: keys.back(),
            left: keys.strafe_left(),
            right: keys.strafe_right(),
        }
    }

    pub fn is_idle(&self) -> bool {
        !(self.forward || self.back || self.left || self.right)
    }
}

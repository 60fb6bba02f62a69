use pitchwalk_input::Key;
use winit::keyboard::KeyCode;

/// Translate a winit physical key into a tracked key, if it is one.
pub fn tracked_key(code: KeyCode) -> Option<Key> {
    let key = match code {
        KeyCode::KeyW => Key::KeyW,
        KeyCode::KeyS => Key::KeyS,
        KeyCode::KeyA => Key::KeyA,
        KeyCode::KeyD => Key::KeyD,
        KeyCode::Space => Key::Space,
        KeyCode::ArrowUp => Key::ArrowUp,
        KeyCode::ArrowDown => Key::ArrowDown,
        KeyCode::ArrowLeft => Key::ArrowLeft,
        KeyCode::ArrowRight => Key::ArrowRight,
        _ => return None,
    };
    Some(key)
}

//! Host input model and the interaction state shared by all layers.

use glam::{IVec2, Vec3};
use num_derive::FromPrimitive;
use num_traits::FromPrimitive;

use crate::gizmo::PickPayload;

/// Non-printable keys, with their raw host codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, FromPrimitive)]
#[repr(u32)]
pub enum SpecialKey {
    Tab = 1,
    Left,
    Right,
    Up,
    Down,
    PageUp,
    PageDown,
    Home,
    End,
    Insert,
    Delete,
    Backspace,
    Enter,
    Escape,
}

/// A decoded key. Letters are normalised to upper case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    Special(SpecialKey),
    Char(u8),
}

const ASCII_BEGIN: u32 = 0x20;
const ASCII_END: u32 = 0x7f;

impl Key {
    /// Decode a raw host key code: 1..=14 for special keys, printable ASCII
    /// otherwise.
    pub fn from_code(code: u32) -> Option<Key> {
        if (ASCII_BEGIN..ASCII_END).contains(&code) {
            return Some(Key::Char((code as u8).to_ascii_uppercase()));
        }
        SpecialKey::from_u32(code).map(Key::Special)
    }

    pub fn code(self) -> u32 {
        match self {
            Key::Special(key) => key as u32,
            Key::Char(c) => c as u32,
        }
    }
}

bitflags::bitflags! {
    /// Held modifier keys. Raw host values are decoded with
    /// `from_bits_truncate`, dropping unknown bits.
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
    pub struct KeyMods: u32 {
        const CTRL = 1 << 0;
        const SHIFT = 1 << 1;
        const ALT = 1 << 2;
    }
}

/// Everything the layers need to know about the user, updated from host
/// events and read by the overlay's debug view.
#[derive(Debug, Clone)]
pub struct InteractionState {
    pub screen_size: [u32; 2],
    pub mouse_down: bool,
    /// GL convention, origin bottom-left. `(-1, -1)` until the first move.
    pub mouse_position: IVec2,
    /// Mouse motion accumulated since the last frame.
    pub mouse_delta: IVec2,
    pub modifiers: KeyMods,
    key_down: [bool; 256],

    pub enable_gizmos: bool,
    pub hover: PickPayload,
    pub selected: PickPayload,

    pub camera_position: Vec3,
    /// Pitch and yaw in degrees.
    pub camera_rotation: [f32; 2],
}

impl InteractionState {
    pub fn new(screen_size: [u32; 2], enable_gizmos: bool) -> Self {
        Self {
            screen_size,
            enable_gizmos,
            ..Self::default()
        }
    }
}

impl Default for InteractionState {
    fn default() -> Self {
        Self {
            screen_size: [0, 0],
            mouse_down: false,
            mouse_position: IVec2::splat(-1),
            mouse_delta: IVec2::ZERO,
            modifiers: KeyMods::empty(),
            key_down: [false; 256],
            enable_gizmos: true,
            hover: PickPayload::NONE,
            selected: PickPayload::NONE,
            camera_position: Vec3::ZERO,
            camera_rotation: [0.0, 0.0],
        }
    }
}

impl InteractionState {
    pub fn is_down(&self, key: Key) -> bool {
        self.key_down[key.code() as usize & 0xff]
    }

    pub fn set_down(&mut self, key: Key, down: bool) {
        self.key_down[key.code() as usize & 0xff] = down;
    }

    /// Release every key, e.g. when the window loses focus.
    pub fn release_keys(&mut self) {
        self.key_down = [false; 256];
        self.modifiers = KeyMods::empty();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_special_keys() {
        assert_eq!(Key::from_code(1), Some(Key::Special(SpecialKey::Tab)));
        assert_eq!(Key::from_code(14), Some(Key::Special(SpecialKey::Escape)));
        assert_eq!(Key::from_code(15), None);
        assert_eq!(Key::from_code(0), None);
    }

    #[test]
    fn decodes_printable_ascii_as_upper_case() {
        assert_eq!(Key::from_code('w' as u32), Some(Key::Char(b'W')));
        assert_eq!(Key::from_code(' ' as u32), Some(Key::Char(b' ')));
        assert_eq!(Key::from_code(0x7f), None);
    }

    #[test]
    fn modifiers_combine() {
        let mods = KeyMods::from_bits_truncate(0b1010);
        assert!(mods.contains(KeyMods::SHIFT));
        assert!(!mods.contains(KeyMods::CTRL));
        assert_eq!((KeyMods::CTRL | KeyMods::ALT).bits(), 5);
    }

    #[test]
    fn new_state_starts_with_no_keys_down() {
        let state = InteractionState::new([800, 600], false);
        assert_eq!(state.screen_size, [800, 600]);
        assert!(!state.enable_gizmos);
        assert_eq!(state.mouse_position, IVec2::splat(-1));
        assert!(!state.is_down(Key::Char(b'W')));
    }

    #[test]
    fn key_table_tracks_presses() {
        let mut state = InteractionState::default();
        let w = Key::Char(b'W');
        state.set_down(w, true);
        assert!(state.is_down(w));
        assert!(!state.is_down(Key::Special(SpecialKey::Up)));
        state.release_keys();
        assert!(!state.is_down(w));
    }
}

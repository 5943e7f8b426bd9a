use crate::model::pitch::Pitch;

/// A computer key bound to a piano key.
#[derive(Debug, Clone, Copy)]
pub struct KeyBinding {
    pub key: char,
    /// Pitch name, also the id of the matching on-screen button.
    pub note_label: &'static str,
    pub black: bool,
}

const fn white(key: char, note_label: &'static str) -> KeyBinding {
    KeyBinding {
        key,
        note_label,
        black: false,
    }
}

const fn black(key: char, note_label: &'static str) -> KeyBinding {
    KeyBinding {
        key,
        note_label,
        black: true,
    }
}

// Home row carries the white keys, the row above carries the black keys.
pub const MAPPINGS: &[KeyBinding] = &[
    white('a', "C4"),
    black('w', "C#4"),
    white('s', "D4"),
    black('e', "D#4"),
    white('d', "E4"),
    white('f', "F4"),
    black('t', "F#4"),
    white('g', "G4"),
    black('y', "G#4"),
    white('h', "A4"),
    black('u', "Bb4"),
    white('j', "B4"),
    white('k', "C5"),
    black('o', "C#5"),
    white('l', "D5"),
    black('p', "D#5"),
    white(';', "E5"),
];

/// Case-insensitive lookup of the binding for a typed character.
pub fn binding_for_key(key: char) -> Option<&'static KeyBinding> {
    let key = key.to_ascii_lowercase();
    MAPPINGS.iter().find(|b| b.key == key)
}

pub fn pitch_for_key(key: char) -> Option<Pitch> {
    binding_for_key(key).and_then(|b| b.note_label.parse().ok())
}

/// One line per key, e.g. `a:C4  w:C#4  ...`, for help output.
pub fn keymap_legend() -> String {
    MAPPINGS
        .iter()
        .map(|b| format!("{}:{}", b.key, b.note_label))
        .collect::<Vec<_>>()
        .join("  ")
}

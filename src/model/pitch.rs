use anyhow::{Result, anyhow, bail};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Accidental {
    Natural,
    Sharp,
    Flat,
}

/// A scientific pitch name such as `C4`, `C#4` or `Bb4`.
///
/// The spelling is preserved, so `Bb4` and `A#4` are different values that share a MIDI number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Pitch {
    letter: char,
    accidental: Accidental,
    octave: i8,
}

impl Pitch {
    pub fn new(letter: char, accidental: Accidental, octave: i8) -> Result<Self> {
        let letter = letter.to_ascii_uppercase();
        if !('A'..='G').contains(&letter) {
            bail!("'{}' is not a note letter..!", letter);
        }

        let pitch = Self {
            letter,
            accidental,
            octave,
        };

        let midi = pitch.midi_i32();
        if !(0..=127).contains(&midi) {
            bail!("{} is outside the MIDI range..!", pitch);
        }

        Ok(pitch)
    }

    pub fn letter(&self) -> char {
        self.letter
    }

    pub fn accidental(&self) -> Accidental {
        self.accidental
    }

    pub fn octave(&self) -> i8 {
        self.octave
    }

    fn midi_i32(&self) -> i32 {
        let base = match self.letter {
            'C' => 0,
            'D' => 2,
            'E' => 4,
            'F' => 5,
            'G' => 7,
            'A' => 9,
            _ => 11,
        };
        let shift = match self.accidental {
            Accidental::Natural => 0,
            Accidental::Sharp => 1,
            Accidental::Flat => -1,
        };

        12 * (self.octave as i32 + 1) + base + shift
    }

    pub fn midi(&self) -> u8 {
        self.midi_i32() as u8
    }

    /// Equal temperament, A4 = 440 Hz.
    pub fn frequency(&self) -> f64 {
        440.0 * 2f64.powf((self.midi() as f64 - 69.0) / 12.0)
    }
}

impl FromStr for Pitch {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        let mut chars = s.chars();
        let letter = chars
            .next()
            .ok_or_else(|| anyhow!("Empty pitch name..!"))?;

        let rest = chars.as_str();
        let (accidental, octave) = if let Some(oct) = rest.strip_prefix('#') {
            (Accidental::Sharp, oct)
        } else if let Some(oct) = rest.strip_prefix('b') {
            (Accidental::Flat, oct)
        } else {
            (Accidental::Natural, rest)
        };

        let octave = octave
            .parse::<i8>()
            .map_err(|_| anyhow!("Invalid octave in pitch '{}'..!", s))?;

        Pitch::new(letter, accidental, octave)
    }
}

impl fmt::Display for Pitch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let accidental = match self.accidental {
            Accidental::Natural => "",
            Accidental::Sharp => "#",
            Accidental::Flat => "b",
        };
        write!(f, "{}{}{}", self.letter, accidental, self.octave)
    }
}

impl TryFrom<String> for Pitch {
    type Error = anyhow::Error;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<Pitch> for String {
    fn from(value: Pitch) -> Self {
        value.to_string()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn parses_naturals_and_accidentals() {
        let c4: Pitch = "C4".parse().unwrap();
        let cs4: Pitch = "C#4".parse().unwrap();
        let bb4: Pitch = "Bb4".parse().unwrap();

        assert_eq!(c4.midi(), 60);
        assert_eq!(cs4.midi(), 61);
        assert_eq!(bb4.midi(), 70);
        assert_eq!(bb4.accidental(), Accidental::Flat);
    }

    #[test]
    fn keeps_flat_spelling() {
        let bb4: Pitch = "Bb4".parse().unwrap();
        assert_eq!(bb4.to_string(), "Bb4");

        let json = serde_json::to_string(&bb4).unwrap();
        assert_eq!(json, "\"Bb4\"");
    }

    #[test]
    fn a4_is_concert_pitch() {
        let a4: Pitch = "A4".parse().unwrap();
        assert!((a4.frequency() - 440.0).abs() < 1e-9);

        let a5: Pitch = "A5".parse().unwrap();
        assert!((a5.frequency() - 880.0).abs() < 1e-9);
    }

    #[test]
    fn rejects_garbage() {
        assert!("".parse::<Pitch>().is_err());
        assert!("H4".parse::<Pitch>().is_err());
        assert!("C".parse::<Pitch>().is_err());
        assert!("C#x".parse::<Pitch>().is_err());
        assert!("G9".parse::<Pitch>().is_ok());
        assert!("G#9".parse::<Pitch>().is_err());
        assert!(serde_json::from_str::<Pitch>("\"Q1\"").is_err());
    }
}

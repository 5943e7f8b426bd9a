use anyhow::{Result, anyhow, bail};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Modifier {
    Plain,
    Dotted,
    Triplet,
}

/// Symbolic note length in transport notation.
///
/// `4n` is a quarter note, `8n.` a dotted eighth and `8t` an eighth triplet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct NoteValue {
    subdivision: u32,
    modifier: Modifier,
}

const SUBDIVISIONS: &[u32] = &[1, 2, 4, 8, 16, 32, 64];

impl NoteValue {
    pub const WHOLE: NoteValue = NoteValue::plain(1);
    pub const HALF: NoteValue = NoteValue::plain(2);
    pub const QUARTER: NoteValue = NoteValue::plain(4);
    pub const EIGHTH: NoteValue = NoteValue::plain(8);
    pub const SIXTEENTH: NoteValue = NoteValue::plain(16);

    const fn plain(subdivision: u32) -> Self {
        Self {
            subdivision,
            modifier: Modifier::Plain,
        }
    }

    pub fn new(subdivision: u32, modifier: Modifier) -> Result<Self> {
        if !SUBDIVISIONS.contains(&subdivision) {
            bail!("Unsupported subdivision '{}'..!", subdivision);
        }

        Ok(Self {
            subdivision,
            modifier,
        })
    }

    pub fn subdivision(&self) -> u32 {
        self.subdivision
    }

    pub fn modifier(&self) -> Modifier {
        self.modifier
    }

    /// Length in seconds at the given tempo, where one beat is a quarter note.
    pub fn seconds(&self, bpm: f64) -> f64 {
        let quarter = 60.0 / bpm;
        let base = quarter * 4.0 / self.subdivision as f64;

        match self.modifier {
            Modifier::Plain => base,
            Modifier::Dotted => base * 1.5,
            Modifier::Triplet => base * 2.0 / 3.0,
        }
    }
}

impl Default for NoteValue {
    fn default() -> Self {
        NoteValue::EIGHTH
    }
}

impl FromStr for NoteValue {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        let (body, modifier) = if let Some(body) = s.strip_suffix("n.") {
            (body, Modifier::Dotted)
        } else if let Some(body) = s.strip_suffix('n') {
            (body, Modifier::Plain)
        } else if let Some(body) = s.strip_suffix('t') {
            (body, Modifier::Triplet)
        } else {
            bail!("Unknown note value '{}'..!", s);
        };

        let subdivision = body
            .parse::<u32>()
            .map_err(|_| anyhow!("Unknown note value '{}'..!", s))?;

        NoteValue::new(subdivision, modifier)
    }
}

impl fmt::Display for NoteValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.modifier {
            Modifier::Plain => write!(f, "{}n", self.subdivision),
            Modifier::Dotted => write!(f, "{}n.", self.subdivision),
            Modifier::Triplet => write!(f, "{}t", self.subdivision),
        }
    }
}

impl TryFrom<String> for NoteValue {
    type Error = anyhow::Error;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<NoteValue> for String {
    fn from(value: NoteValue) -> Self {
        value.to_string()
    }
}

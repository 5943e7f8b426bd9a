use crate::model::duration::NoteValue;
use crate::model::pitch::Pitch;
use serde::{Deserialize, Serialize};

pub const DEFAULT_TUNE_NAME: &str = "New Tune";

/// A single recorded key press.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct NoteEvent {
    pub note: Pitch,
    pub duration: NoteValue,
    /// Seconds from the start of the recording.
    pub timing: f64,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Tune {
    #[serde(alias = "_id")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub tune: Vec<NoteEvent>,
}

/// Request body for creating a tune on the server.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct NewTune {
    pub name: String,
    pub tune: Vec<NoteEvent>,
}

impl NewTune {
    /// Blank names fall back to [`DEFAULT_TUNE_NAME`].
    pub fn new(name: Option<&str>, tune: Vec<NoteEvent>) -> Self {
        let name = match name.map(str::trim) {
            Some(n) if !n.is_empty() => n.to_owned(),
            _ => DEFAULT_TUNE_NAME.to_owned(),
        };

        Self { name, tune }
    }
}

impl Tune {
    pub fn sorted_events(&self) -> Vec<NoteEvent> {
        let mut events = self.tune.clone();
        events.sort_by(|a, b| {
            a.timing
                .partial_cmp(&b.timing)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        events
    }

    /// Time at which the last note stops sounding.
    pub fn length_secs(&self, bpm: f64) -> f64 {
        self.tune
            .iter()
            .map(|e| e.timing.max(0.0) + e.duration.seconds(bpm))
            .fold(0.0, f64::max)
    }
}

use crate::engine::Synth;
use crate::model::duration::NoteValue;
use crate::model::mappings::{MAPPINGS, pitch_for_key};
use crate::model::pitch::Pitch;
use crate::model::tune::{NewTune, NoteEvent, Tune};
use crate::player::Player;
use crate::store::{StoreError, TuneStore};
use log::{debug, error, info, warn};
use std::sync::Arc;

/// State of an in-progress capture. Events are only appended while recording.
#[derive(Debug, Default)]
pub struct RecordingSession {
    recording: bool,
    started_at: f64,
    events: Vec<NoteEvent>,
}

impl RecordingSession {
    pub fn start(&mut self, now: f64) {
        self.recording = true;
        self.started_at = now;
        self.events.clear();
    }

    pub fn stop(&mut self) {
        self.recording = false;
    }

    pub fn is_recording(&self) -> bool {
        self.recording
    }

    pub fn started_at(&self) -> f64 {
        self.started_at
    }

    pub fn events(&self) -> &[NoteEvent] {
        &self.events
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }

    /// Appends a note played at engine time `now`, returning it if the session is recording.
    pub fn record(&mut self, note: Pitch, duration: NoteValue, now: f64) -> Option<NoteEvent> {
        if !self.recording {
            return None;
        }

        let floor = self.events.last().map_or(0.0, |e| e.timing);
        let event = NoteEvent {
            note,
            duration,
            timing: (now - self.started_at).max(floor),
        };
        self.events.push(event);

        Some(event)
    }
}

/// What the tune picker shows: `(id, name)` pairs and the current selection.
#[derive(Debug, Default, Clone)]
pub struct TuneList {
    options: Vec<(String, String)>,
    selected: Option<usize>,
}

impl TuneList {
    /// Replaces every option, keeping the selection on the same id when it is still listed.
    pub fn replace(&mut self, tunes: &[Tune]) {
        let previous = self.selected_id().map(str::to_owned);

        self.options = tunes
            .iter()
            .map(|t| (t.id.clone(), t.name.clone()))
            .collect();

        self.selected = previous
            .and_then(|id| self.options.iter().position(|(i, _)| *i == id))
            .or(if self.options.is_empty() { None } else { Some(0) });
    }

    pub fn options(&self) -> &[(String, String)] {
        &self.options
    }

    pub fn len(&self) -> usize {
        self.options.len()
    }

    pub fn is_empty(&self) -> bool {
        self.options.is_empty()
    }

    pub fn selected_id(&self) -> Option<&str> {
        self.selected
            .and_then(|i| self.options.get(i))
            .map(|(id, _)| id.as_str())
    }

    pub fn selected_name(&self) -> Option<&str> {
        self.selected
            .and_then(|i| self.options.get(i))
            .map(|(_, name)| name.as_str())
    }

    pub fn select_next(&mut self) {
        if self.options.is_empty() {
            return;
        }
        self.selected = Some(self.selected.map_or(0, |i| (i + 1) % self.options.len()));
    }

    pub fn select_prev(&mut self) {
        if self.options.is_empty() {
            return;
        }
        let len = self.options.len();
        self.selected = Some(self.selected.map_or(0, |i| (i + len - 1) % len));
    }
}

/// Turns key presses into notes, records them, and moves tunes to and from the store.
pub struct Piano<S: Synth, T: TuneStore> {
    synth: Arc<S>,
    player: Player<S>,
    store: T,
    session: RecordingSession,
    tunes: TuneList,
    note_value: NoteValue,
    bpm: f64,
}

impl<S: Synth + 'static, T: TuneStore> Piano<S, T> {
    pub fn new(synth: Arc<S>, store: T, bpm: f64, verbose: bool) -> Self {
        Self {
            player: Player::new(Arc::clone(&synth), verbose),
            synth,
            store,
            session: RecordingSession::default(),
            tunes: TuneList::default(),
            note_value: NoteValue::EIGHTH,
            bpm,
        }
    }

    pub fn synth(&self) -> &S {
        &self.synth
    }

    pub fn session(&self) -> &RecordingSession {
        &self.session
    }

    pub fn tunes(&self) -> &TuneList {
        &self.tunes
    }

    pub fn tunes_mut(&mut self) -> &mut TuneList {
        &mut self.tunes
    }

    pub fn is_recording(&self) -> bool {
        self.session.is_recording()
    }

    pub fn is_playing(&self) -> bool {
        self.player.is_playing()
    }

    /// Plays a short live note and records it when a session is active.
    pub fn play_note(&mut self, pitch: Pitch) {
        if !self.synth.is_running() {
            if let Err(why) = self.synth.resume() {
                warn!("Failed to resume the audio context: {:?}", why);
            }
        }

        let seconds = self.note_value.seconds(self.bpm);
        if let Err(why) = self.synth.trigger_attack_release(&pitch, seconds) {
            warn!("Synth error for {}: {:?}", pitch, why);
        }

        if let Some(event) = self
            .session
            .record(pitch, self.note_value, self.synth.now())
        {
            debug!("Recorded {} at {:.3}s", event.note, event.timing);
        }
    }

    /// Keyboard input. Auto-repeats and unmapped keys are ignored.
    pub fn press_key(&mut self, key: char, repeat: bool) -> Option<Pitch> {
        if repeat {
            return None;
        }

        let pitch = pitch_for_key(key)?;
        self.play_note(pitch);
        Some(pitch)
    }

    /// Pointer input: `id` is the pitch name of one of the piano's buttons.
    pub fn press_button(&mut self, id: &str) -> Option<Pitch> {
        let Some(binding) = MAPPINGS.iter().find(|b| b.note_label == id) else {
            warn!("No piano button with id '{}'..!", id);
            return None;
        };

        let pitch = binding.note_label.parse().ok()?;
        self.play_note(pitch);
        Some(pitch)
    }

    pub fn start_recording(&mut self) {
        self.session.start(self.synth.now());
        info!("Recording started..!");
    }

    /// Ends the session and saves what it captured.
    pub fn stop_recording(&mut self, name: Option<&str>) -> Result<(), StoreError> {
        if !self.session.is_recording() {
            warn!("Not recording, nothing to stop..!");
            return Ok(());
        }

        self.session.stop();
        info!(
            "Recording stopped with {} notes..!",
            self.session.events().len()
        );

        self.save_tune(name)
    }

    /// Posts the buffered notes and refreshes the tune list. The buffer is kept if the post fails.
    pub fn save_tune(&mut self, name: Option<&str>) -> Result<(), StoreError> {
        let tune = NewTune::new(name, self.session.events().to_vec());

        if let Err(why) = self.store.save_tune(&tune) {
            error!("Error saving the tune '{}': {}", tune.name, why);
            return Err(why);
        }

        info!("Saved tune '{}' ({} notes)..!", tune.name, tune.tune.len());
        self.session.clear();

        self.refresh_tunes()
    }

    /// Reloads the tune list. On failure the current list stays as it was.
    pub fn refresh_tunes(&mut self) -> Result<(), StoreError> {
        match self.store.fetch_tunes() {
            Ok(tunes) => {
                self.tunes.replace(&tunes);
                debug!("Tune list refreshed with {} tunes", tunes.len());
                Ok(())
            }
            Err(why) => {
                error!("Fetch operation error: {}", why);
                Err(why)
            }
        }
    }

    pub fn play_tune(&mut self, tune: &Tune) -> anyhow::Result<()> {
        self.player.load_tune(tune, self.bpm)?;
        self.player.play(false)
    }

    /// Fetches the current list and plays the tune with the given id.
    pub fn play_selected(&mut self, id: &str) -> anyhow::Result<()> {
        match self.store.find_tune(id) {
            Ok(tune) => self.play_tune(&tune).inspect_err(|why| {
                error!("Error playing tune '{}': {}", tune.name, why);
            }),
            Err(why) => {
                error!("Error fetching tune: {}", why);
                Err(why.into())
            }
        }
    }

    pub fn stop_playback(&self) -> anyhow::Result<()> {
        self.player.stop()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::testing::{FakeSynth, MemoryStore};
    use std::thread;
    use std::time::Duration;

    fn piano(store: MemoryStore) -> Piano<FakeSynth, MemoryStore> {
        Piano::new(Arc::new(FakeSynth::default()), store, 120.0, false)
    }

    fn stored(id: &str, name: &str, notes: &[(&str, f64)]) -> Tune {
        Tune {
            id: id.into(),
            name: name.into(),
            tune: notes
                .iter()
                .map(|&(note, timing)| NoteEvent {
                    note: note.parse().unwrap(),
                    duration: NoteValue::EIGHTH,
                    timing,
                })
                .collect(),
        }
    }

    fn wait_for_playback<S: Synth + 'static, T: TuneStore>(piano: &Piano<S, T>) {
        for _ in 0..200 {
            if !piano.is_playing() {
                return;
            }
            thread::sleep(Duration::from_millis(5));
        }
        panic!("playback never finished");
    }

    #[test]
    fn key_press_without_recording_only_plays() {
        let mut piano = piano(MemoryStore::default());

        assert_eq!(piano.press_key('a', false).map(|p| p.to_string()).as_deref(), Some("C4"));

        assert_eq!(piano.synth().notes(), vec!["C4"]);
        assert!(piano.session().events().is_empty());
        assert_eq!(*piano.synth().resumes.lock().unwrap(), 1);
    }

    #[test]
    fn audio_context_is_resumed_once() {
        let mut piano = piano(MemoryStore::default());

        piano.press_key('a', false);
        piano.press_key('s', false);

        assert_eq!(*piano.synth().resumes.lock().unwrap(), 1);
        assert!((piano.synth().triggered.lock().unwrap()[0].1 - 0.25).abs() < 1e-9);
    }

    #[test]
    fn repeats_and_unmapped_keys_are_ignored() {
        let mut piano = piano(MemoryStore::default());
        piano.start_recording();

        assert!(piano.press_key('a', true).is_none());
        assert!(piano.press_key('z', false).is_none());
        assert!(piano.press_button("C9").is_none());

        assert!(piano.synth().notes().is_empty());
        assert!(piano.session().events().is_empty());
    }

    #[test]
    fn recording_appends_one_event_per_press() {
        let mut piano = piano(MemoryStore::default());
        piano.synth().advance(10.0);
        piano.start_recording();

        piano.synth().advance(0.5);
        piano.press_key('A', false);
        piano.press_button("Bb4");
        piano.synth().advance(0.25);
        piano.press_key(';', false);

        let events = piano.session().events();
        assert_eq!(events.len(), 3);
        assert_eq!(piano.synth().notes(), vec!["C4", "Bb4", "E5"]);

        let timings: Vec<f64> = events.iter().map(|e| e.timing).collect();
        assert!((timings[0] - 0.5).abs() < 1e-9);
        assert!(timings.windows(2).all(|w| w[0] <= w[1]));
        assert!(timings.iter().all(|&t| t >= 0.0));
        assert!(events.iter().all(|e| e.duration == NoteValue::EIGHTH));
    }

    #[test]
    fn session_timings_never_go_backwards() {
        let mut session = RecordingSession::default();
        session.start(5.0);

        let first = session.record("C4".parse().unwrap(), NoteValue::EIGHTH, 6.0).unwrap();
        let second = session.record("D4".parse().unwrap(), NoteValue::EIGHTH, 5.5).unwrap();
        let before_start = {
            let mut s = RecordingSession::default();
            s.start(5.0);
            s.record("E4".parse().unwrap(), NoteValue::EIGHTH, 4.0).unwrap()
        };

        assert_eq!(first.timing, 1.0);
        assert_eq!(second.timing, 1.0);
        assert_eq!(before_start.timing, 0.0);
    }

    #[test]
    fn new_recording_clears_previous_buffer() {
        let mut piano = piano(MemoryStore::default());

        piano.start_recording();
        piano.press_key('a', false);
        piano.start_recording();

        assert!(piano.session().events().is_empty());
        assert!(piano.is_recording());
    }

    #[test]
    fn stop_posts_once_then_refreshes_once() {
        let mut piano = piano(MemoryStore::default());

        piano.start_recording();
        piano.press_key('a', false);
        piano.synth().advance(0.3);
        piano.press_key('d', false);
        piano.stop_recording(Some("Two notes")).unwrap();

        let store = &piano.store;
        assert_eq!(store.posted.borrow().len(), 1);
        assert_eq!(store.gets.get(), 1);

        let posted = &store.posted.borrow()[0];
        assert_eq!(posted.name, "Two notes");
        assert_eq!(posted.tune.len(), 2);

        assert!(!piano.is_recording());
        assert!(piano.session().events().is_empty());
        assert_eq!(piano.tunes().selected_name(), Some("Two notes"));
    }

    #[test]
    fn stop_without_recording_saves_nothing() {
        let mut piano = piano(MemoryStore::default());

        piano.stop_recording(None).unwrap();

        assert!(piano.store.posted.borrow().is_empty());
        assert_eq!(piano.store.gets.get(), 0);
    }

    #[test]
    fn failed_save_keeps_buffer_and_skips_refresh() {
        let store = MemoryStore::default();
        store.fail_save.set(true);
        let mut piano = piano(store);

        piano.start_recording();
        piano.press_key('h', false);

        assert!(piano.stop_recording(None).is_err());
        assert_eq!(piano.store.posted.borrow()[0].name, "New Tune");
        assert_eq!(piano.store.gets.get(), 0);
        assert_eq!(piano.session().events().len(), 1);
    }

    #[test]
    fn fetch_failure_leaves_list_untouched() {
        let mut piano = piano(MemoryStore::with_tunes(vec![
            stored("1", "First", &[]),
            stored("2", "Second", &[]),
        ]));

        piano.refresh_tunes().unwrap();
        piano.tunes_mut().select_next();
        let before = piano.tunes().clone();

        piano.store.fail_fetch.set(true);
        assert!(piano.refresh_tunes().is_err());

        assert_eq!(piano.tunes().options(), before.options());
        assert_eq!(piano.tunes().selected_id(), Some("2"));
    }

    #[test]
    fn unknown_tune_is_a_handled_error() {
        let mut piano = piano(MemoryStore::with_tunes(vec![stored("1", "Only", &[("C4", 0.0)])]));

        let err = piano.play_selected("404").unwrap_err();

        assert!(matches!(
            err.downcast_ref::<StoreError>(),
            Some(StoreError::TuneNotFound(id)) if id == "404"
        ));
        assert!(!piano.is_playing());
        assert!(piano.synth().notes().is_empty());
    }

    #[test]
    fn plays_selected_tune() {
        let mut piano = piano(MemoryStore::with_tunes(vec![
            stored("1", "Other", &[("A4", 0.0)]),
            stored("2", "Mine", &[("E4", 0.01), ("C4", 0.0)]),
        ]));

        piano.play_selected("2").unwrap();
        wait_for_playback(&piano);

        assert_eq!(piano.synth().notes(), vec!["C4", "E4"]);
    }

    #[test]
    fn selecting_empty_tune_stops_current_playback() {
        let mut piano = piano(MemoryStore::with_tunes(vec![
            stored("long", "Long", &[("C4", 5.0)]),
            stored("e", "Empty", &[]),
        ]));

        piano.play_selected("long").unwrap();
        assert!(piano.is_playing());

        piano.play_selected("e").unwrap();

        assert!(!piano.is_playing());
        assert!(piano.synth().notes().is_empty());
        assert_eq!(*piano.synth().releases.lock().unwrap(), 1);
    }

    #[test]
    fn tune_list_selection_follows_id() {
        let mut list = TuneList::default();
        assert_eq!(list.selected_id(), None);

        list.replace(&[stored("a", "A", &[]), stored("b", "B", &[])]);
        assert_eq!(list.selected_id(), Some("a"));

        list.select_prev();
        assert_eq!(list.selected_id(), Some("b"));

        list.replace(&[stored("c", "C", &[]), stored("b", "B", &[])]);
        assert_eq!(list.selected_id(), Some("b"));

        list.select_next();
        assert_eq!(list.selected_id(), Some("c"));

        list.replace(&[]);
        assert!(list.is_empty());
        assert_eq!(list.selected_id(), None);
    }
}

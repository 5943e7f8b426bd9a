use crate::engine::Synth;
use crate::model::pitch::Pitch;
use crate::model::tune::{NewTune, Tune};
use crate::store::{StoreError, TuneStore};
use std::cell::{Cell, RefCell};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

/// Synth with a hand-driven clock that remembers every note it was asked to play.
#[derive(Debug, Default)]
pub struct FakeSynth {
    clock: Mutex<f64>,
    running: AtomicBool,
    pub resumes: Mutex<usize>,
    pub triggered: Mutex<Vec<(String, f64)>>,
    pub releases: Mutex<usize>,
}

impl FakeSynth {
    pub fn advance(&self, seconds: f64) {
        *self.clock.lock().unwrap() += seconds;
    }

    pub fn notes(&self) -> Vec<String> {
        self.triggered
            .lock()
            .unwrap()
            .iter()
            .map(|(n, _)| n.clone())
            .collect()
    }
}

impl Synth for FakeSynth {
    fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    fn resume(&self) -> anyhow::Result<()> {
        *self.resumes.lock().unwrap() += 1;
        self.running.store(true, Ordering::Release);
        Ok(())
    }

    fn now(&self) -> f64 {
        *self.clock.lock().unwrap()
    }

    fn trigger_attack_release(&self, pitch: &Pitch, seconds: f64) -> anyhow::Result<()> {
        self.triggered
            .lock()
            .unwrap()
            .push((pitch.to_string(), seconds));
        Ok(())
    }

    fn release_all(&self) -> anyhow::Result<()> {
        *self.releases.lock().unwrap() += 1;
        Ok(())
    }
}

/// In-memory tune server that counts requests and can be told to fail.
#[derive(Debug, Default)]
pub struct MemoryStore {
    pub tunes: RefCell<Vec<Tune>>,
    pub posted: RefCell<Vec<NewTune>>,
    pub gets: Cell<usize>,
    pub fail_fetch: Cell<bool>,
    pub fail_save: Cell<bool>,
}

impl MemoryStore {
    pub fn with_tunes(tunes: Vec<Tune>) -> Self {
        Self {
            tunes: RefCell::new(tunes),
            ..Default::default()
        }
    }

    fn offline(&self) -> StoreError {
        StoreError::Transport {
            url: "memory://tunes".into(),
            reason: "offline".into(),
        }
    }
}

impl TuneStore for MemoryStore {
    fn fetch_tunes(&self) -> Result<Vec<Tune>, StoreError> {
        self.gets.set(self.gets.get() + 1);
        if self.fail_fetch.get() {
            return Err(self.offline());
        }
        Ok(self.tunes.borrow().clone())
    }

    fn save_tune(&self, tune: &NewTune) -> Result<(), StoreError> {
        self.posted.borrow_mut().push(tune.clone());
        if self.fail_save.get() {
            return Err(self.offline());
        }

        let id = format!("id-{}", self.tunes.borrow().len() + 1);
        self.tunes.borrow_mut().push(Tune {
            id,
            name: tune.name.clone(),
            tune: tune.tune.clone(),
        });
        Ok(())
    }
}

use crate::model::pitch::Pitch;
use log::{debug, info};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

pub mod render;

pub trait Synth: Send + Sync {
    /// Whether the audio context is currently producing sound.
    fn is_running(&self) -> bool;

    /// Wake the audio context up. Called before a live note if it isn't running.
    fn resume(&self) -> anyhow::Result<()>;

    /// Engine clock in seconds.
    fn now(&self) -> f64;

    /// Start a note and release it after `seconds`.
    fn trigger_attack_release(&self, pitch: &Pitch, seconds: f64) -> anyhow::Result<()>;

    /// Silence every sounding note.
    fn release_all(&self) -> anyhow::Result<()> {
        Ok(())
    }
}

/// Live engine for the terminal: every note is written to the log.
#[derive(Debug)]
pub struct ConsoleSynth {
    epoch: Instant,
    running: AtomicBool,
    verbose: bool,
}

impl ConsoleSynth {
    pub fn new(verbose: bool) -> Self {
        Self {
            epoch: Instant::now(),
            running: AtomicBool::new(false),
            verbose,
        }
    }
}

impl Default for ConsoleSynth {
    fn default() -> Self {
        Self::new(false)
    }
}

impl Synth for ConsoleSynth {
    fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    fn resume(&self) -> anyhow::Result<()> {
        if !self.running.swap(true, Ordering::AcqRel) {
            debug!("Audio context resumed..!");
        }
        Ok(())
    }

    fn now(&self) -> f64 {
        self.epoch.elapsed().as_secs_f64()
    }

    fn trigger_attack_release(&self, pitch: &Pitch, seconds: f64) -> anyhow::Result<()> {
        if self.verbose {
            info!(
                "{:<4} | {:>8.2}Hz | {:>6.3}s | at {:>9.3}s",
                pitch.to_string(),
                pitch.frequency(),
                seconds,
                self.now()
            );
        } else {
            info!("{}", pitch);
        }
        Ok(())
    }

    fn release_all(&self) -> anyhow::Result<()> {
        debug!("Released all notes..!");
        Ok(())
    }
}

use crate::model::tune::Tune;
use anyhow::{Result, anyhow};
use hound::{SampleFormat, WavSpec, WavWriter};
use log::{debug, info};
use std::path::Path;

/// ADSR and level of the voice used for offline rendering.
///
/// The defaults mirror a plain browser synth: a triangle wave with a short attack,
/// a quick decay to 30% and a one second release.
#[derive(Debug, Clone, Copy)]
pub struct Voice {
    pub attack: f64,
    pub decay: f64,
    pub sustain: f64,
    pub release: f64,
    pub gain: f64,
}

impl Default for Voice {
    fn default() -> Self {
        Self {
            attack: 0.005,
            decay: 0.1,
            sustain: 0.3,
            release: 1.0,
            gain: 0.5,
        }
    }
}

impl Voice {
    fn held_level(&self, t: f64) -> f64 {
        if t < self.attack {
            t / self.attack
        } else if t < self.attack + self.decay {
            1.0 - (1.0 - self.sustain) * (t - self.attack) / self.decay
        } else {
            self.sustain
        }
    }

    /// Envelope level `t` seconds after note-on for a note released at `hold`.
    pub fn level(&self, t: f64, hold: f64) -> f64 {
        if t < 0.0 {
            return 0.0;
        }
        if t < hold {
            return self.held_level(t);
        }

        let released = (t - hold) / self.release;
        if released >= 1.0 {
            0.0
        } else {
            self.held_level(hold) * (1.0 - released)
        }
    }
}

fn triangle(phase: f64) -> f64 {
    4.0 * (phase.fract() - 0.5).abs() - 1.0
}

/// Mix every note of the tune into a mono buffer.
pub fn render_tune(tune: &Tune, bpm: f64, sample_rate: u32, voice: &Voice) -> Vec<f32> {
    let sr = sample_rate as f64;
    let total_secs = tune.length_secs(bpm) + voice.release;
    let total_samples = (total_secs * sr).ceil() as usize;
    let mut mix = vec![0.0f64; total_samples];

    for event in tune.tune.iter() {
        let start = event.timing.max(0.0);
        let hold = event.duration.seconds(bpm);
        let freq = event.note.frequency();

        let first = (start * sr).round() as usize;
        let len = ((hold + voice.release) * sr).ceil() as usize;
        let last = (first + len).min(total_samples);

        for (i, slot) in mix[first.min(last)..last].iter_mut().enumerate() {
            let t = i as f64 / sr;
            *slot += triangle(t * freq) * voice.level(t, hold) * voice.gain;
        }
    }

    debug!(
        "Rendered '{}': {} notes into {} samples..!",
        tune.name,
        tune.tune.len(),
        total_samples
    );

    // Overlapping notes can exceed full scale, tanh keeps them in range.
    mix.into_iter().map(|s| s.tanh() as f32).collect()
}

pub fn write_wav<P: AsRef<Path>>(path: P, samples: &[f32], sample_rate: u32) -> Result<()> {
    let spec = WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };

    let mut writer = WavWriter::create(path.as_ref(), spec).map_err(|e| {
        anyhow!(
            "Failed to create WAV file {}: {}",
            path.as_ref().display(),
            e
        )
    })?;

    for &sample in samples {
        let value = (sample.clamp(-1.0, 1.0) * i16::MAX as f32) as i16;
        writer.write_sample(value)?;
    }
    writer.finalize()?;

    info!(
        "Wrote {:.2}s of audio to {}..!",
        samples.len() as f64 / sample_rate as f64,
        path.as_ref().display()
    );

    Ok(())
}

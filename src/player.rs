use crate::engine::Synth;
use crate::model::pitch::Pitch;
use crate::model::tune::Tune;
use anyhow::{anyhow, bail};
use log::{debug, info, warn};
use spin_sleep::{SpinSleeper, SpinStrategy};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{Receiver, Sender};
use std::sync::{Arc, Mutex, mpsc};
use std::thread;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

const MAX_SLEEP_CHUNK_S: f64 = 0.050;

enum ControlMsg {
    Stop,
}

#[derive(Debug, Clone)]
pub struct ScheduledEvent {
    time_s: f64,
    duration_s: f64,
    pitch: Pitch,
}

/// Transport for recorded tunes: every note fires at its offset from the moment playback starts.
#[derive(Debug)]
pub struct Player<S: Synth> {
    verbose: bool,
    engine: Arc<S>,
    schedule: Mutex<Vec<ScheduledEvent>>,
    control_tx: Mutex<Option<Sender<ControlMsg>>>,
    worker_handle: Mutex<Option<JoinHandle<()>>>,
    /// Cleared by the worker on every exit path.
    running: Arc<AtomicBool>,
}

impl<S: Synth + 'static> Player<S> {
    pub fn new(engine: Arc<S>, verbose: bool) -> Self {
        Self {
            verbose,
            engine,
            schedule: Mutex::new(Vec::new()),
            control_tx: Mutex::new(None),
            worker_handle: Mutex::new(None),
            running: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn load_tune(&self, tune: &Tune, bpm: f64) -> anyhow::Result<()> {
        let events: Vec<ScheduledEvent> = tune
            .sorted_events()
            .into_iter()
            .map(|e| ScheduledEvent {
                time_s: e.timing,
                duration_s: e.duration.seconds(bpm),
                pitch: e.note,
            })
            .collect();

        let Ok(mut schedule_lock) = self.schedule.lock() else {
            bail!("Failed to lock the schedule..!");
        };
        *schedule_lock = events;

        info!(
            "Loaded tune: '{}' with {} scheduled notes..!",
            tune.name,
            schedule_lock.len()
        );

        Ok(())
    }

    pub fn is_playing(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Starts the loaded schedule, cancelling whatever was still playing.
    ///
    /// An empty schedule only cancels: there is nothing to start.
    pub fn play(&self, join: bool) -> anyhow::Result<()> {
        self.cancel()?;

        let schedule = {
            let Ok(schedule) = self.schedule.lock() else {
                bail!("Failed to lock schedule..!")
            };
            schedule.clone()
        };

        if schedule.is_empty() {
            warn!("Nothing to play, the loaded tune has no notes..!");
            return Ok(());
        }

        let engine = Arc::clone(&self.engine);
        let (tx, rx) = mpsc::channel::<ControlMsg>();

        {
            let Ok(mut ctl) = self.control_tx.lock() else {
                bail!("Failed to lock control_tx..!")
            };

            *ctl = Some(tx);
        }

        let verbose = self.verbose;
        let running = Arc::clone(&self.running);
        running.store(true, Ordering::Release);

        let handle = thread::spawn(move || {
            run_schedule(engine, schedule, rx, verbose);
            running.store(false, Ordering::Release);
        });

        if join {
            handle
                .join()
                .map_err(|_| anyhow!("Playback thread panicked..!"))?;
        } else {
            let Ok(mut wh) = self.worker_handle.lock() else {
                bail!("Failed to lock worker handle..!")
            };

            *wh = Some(handle);
        }

        Ok(())
    }

    pub fn stop(&self) -> anyhow::Result<()> {
        if !self.cancel()? {
            bail!("No worker is running playback..!")
        }
        info!("Stopped playback thread..!");

        Ok(())
    }

    /// Returns whether a playback was still running when it got cancelled.
    fn cancel(&self) -> anyhow::Result<bool> {
        let tx = {
            let Ok(mut lock) = self.control_tx.lock() else {
                bail!("Failed to lock control_tx..!")
            };
            lock.take()
        };

        let was_running = self.running.load(Ordering::Acquire);
        if let Some(tx) = tx {
            let _ = tx.send(ControlMsg::Stop);
        }

        let Ok(mut lock) = self.worker_handle.lock() else {
            bail!("Failed to lock worker_handle..!")
        };

        if let Some(handle) = lock.take() {
            let _ = handle.join();
            debug!("Playback thread joined..!");
        }

        Ok(was_running)
    }
}

impl<S: Synth> Drop for Player<S> {
    fn drop(&mut self) {
        if let Ok(mut ctl) = self.control_tx.lock() {
            if let Some(tx) = ctl.take() {
                let _ = tx.send(ControlMsg::Stop);
            }
        }
    }
}

fn run_schedule<S: Synth>(
    engine: Arc<S>,
    schedule: Vec<ScheduledEvent>,
    ctrl_rx: Receiver<ControlMsg>,
    verbose: bool,
) {
    let stopped = |why: &str| {
        if let Err(e) = engine.release_all() {
            warn!("Failed to release notes: {:?}", e);
        }
        warn!("Playback stopped {}..!", why);
    };

    let sleeper = SpinSleeper::new(100_000).with_spin_strategy(SpinStrategy::YieldThread);
    let start = Instant::now();

    for event in schedule.into_iter() {
        let target = if event.time_s < 0.0 {
            start
        } else {
            start + Duration::from_secs_f64(event.time_s)
        };

        loop {
            if ctrl_rx.try_recv().is_ok() {
                stopped("during wait");
                return;
            }

            let now = Instant::now();
            if now >= target {
                break;
            }
            let remaining = (target - now).as_secs_f64();

            sleeper.sleep(Duration::from_secs_f64(remaining.min(MAX_SLEEP_CHUNK_S)));
        }

        let emitted_at = start.elapsed().as_secs_f64();

        if verbose {
            debug!(
                "{:<4} | at {:>9.3}s | scheduled for: {:>9.3}s | duration: {:>6.3}s",
                event.pitch.to_string(),
                emitted_at,
                event.time_s,
                event.duration_s
            );
        }

        if let Err(why) = engine.trigger_attack_release(&event.pitch, event.duration_s) {
            warn!(
                "Synth error for {} at {:.3}s | why: {:?}",
                event.pitch, emitted_at, why
            );
        }
    }

    info!("Playback thread finished all notes..!");
}

use anyhow::Result;
use clap::Parser;
use log::{debug, info, warn};
use piano_tunes::{
    Args, Command, ConsoleSynth, HttpTuneStore, KeysApp, Piano, Player, TuneStore, Voice,
    describe_tune, init_logging, render_tune, write_wav,
};
use std::sync::Arc;
use std::time::Duration;

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose, matches!(args.command, None | Some(Command::Keys)));

    let store = HttpTuneStore::new(&args.server, Duration::from_secs(args.timeout_secs));
    debug!("Using tune server at {}", store.url());

    match args.command.unwrap_or(Command::Keys) {
        Command::Keys => {
            let synth = Arc::new(ConsoleSynth::new(args.verbose));
            let mut piano = Piano::new(synth, store, args.bpm, args.verbose);
            KeysApp::new().run(&mut piano)?;
        }

        Command::List => {
            let tunes = store.fetch_tunes()?;
            info!("{} tunes on {}..!", tunes.len(), args.server);
            for tune in tunes.iter() {
                info!("{}", describe_tune(tune, args.bpm));
            }
        }

        Command::Play {
            id,
            dry_run,
            dry_run_max,
        } => {
            let tune = store.find_tune(&id)?;

            if dry_run {
                info!("Previewing at most {} notes..!", dry_run_max);
                for (i, ev) in tune.sorted_events().iter().take(dry_run_max).enumerate() {
                    info!(
                        "Note {}: {} time_s={:.3} dur={} ({:.3}s)",
                        i,
                        ev.note,
                        ev.timing,
                        ev.duration,
                        ev.duration.seconds(args.bpm)
                    );
                }
                return Ok(());
            }

            let player = Player::new(Arc::new(ConsoleSynth::new(args.verbose)), args.verbose);
            player.load_tune(&tune, args.bpm)?;

            let player = Arc::new(player);
            let player_for_handler = Arc::clone(&player);

            ctrlc::set_handler(move || {
                warn!("Ctrl-C received, stopping playback..!");
                let _ = player_for_handler.stop();
            })?;

            player.play(true)?;
            info!("Playback finished, exiting..!");
        }

        Command::Render {
            id,
            out,
            sample_rate,
        } => {
            let tune = store.find_tune(&id)?;
            info!("Rendering '{}'..!", tune.name);

            let samples = render_tune(&tune, args.bpm, sample_rate, &Voice::default());
            write_wav(&out, &samples, sample_rate)?;
        }

        Command::Press {
            notes,
            gap,
            record,
            name,
        } => {
            let synth = Arc::new(ConsoleSynth::new(args.verbose));
            let mut piano = Piano::new(synth, store, args.bpm, args.verbose);

            if record {
                piano.start_recording();
            }

            for (i, note) in notes.iter().enumerate() {
                if i > 0 && gap > 0.0 {
                    spin_sleep::sleep(Duration::from_secs_f64(gap));
                }
                piano.press_button(note);
            }

            if record {
                piano.stop_recording(name.as_deref())?;
            }
        }
    }

    Ok(())
}

use clap::{Parser, Subcommand};
use std::path::PathBuf;

pub const DEFAULT_SERVER: &str = "http://localhost:3000";

#[derive(Parser, Debug)]
#[command(
    name = "piano_tunes",
    about = "Play a virtual piano from your keyboard and share the tunes you record!"
)]
pub struct Args {
    /// Base URL of the tune server.
    #[arg(long, env = "PIANO_SERVER", default_value = DEFAULT_SERVER, global = true)]
    pub server: String,

    /// Tempo used to turn note values like `8n` into seconds.
    #[arg(long, default_value_t = 120.0, value_parser = parse_bpm, global = true)]
    pub bpm: f64,

    /// Seconds to wait for the tune server before giving up.
    #[arg(long = "timeout-secs", default_value_t = 10, global = true)]
    pub timeout_secs: u64,

    /// Prints extra information to the terminal.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Play the piano interactively with the computer keyboard (default).
    Keys,

    /// List the tunes stored on the server.
    List,

    /// Play a stored tune in real time.
    Play {
        /// Id of the tune to play.
        id: String,

        /// Dry run (print first dry_run_max events and exit).
        #[arg(short, long, default_value_t = false)]
        dry_run: bool,

        /// Maximum events to print in dry run.
        #[arg(long, default_value_t = 80)]
        dry_run_max: usize,
    },

    /// Render a stored tune to a WAV file.
    Render {
        /// Id of the tune to render.
        id: String,

        /// Output WAV path.
        #[arg(short, long)]
        out: PathBuf,

        #[arg(
            long = "sample-rate",
            default_value_t = 44_100,
            value_parser = clap::value_parser!(u32).range(1..)
        )]
        sample_rate: u32,
    },

    /// Press piano buttons by name, e.g. `press C4 E4 G4`.
    Press {
        /// Pitch names of the buttons to press, in order.
        #[arg(required = true)]
        notes: Vec<String>,

        /// Seconds to wait between presses.
        #[arg(long, default_value_t = 0.25)]
        gap: f64,

        /// Record the presses and save them as a new tune.
        #[arg(long, default_value_t = false)]
        record: bool,

        /// Name of the recorded tune.
        #[arg(short, long)]
        name: Option<String>,
    },
}

/// Tempo must be a positive, finite number of beats per minute.
fn parse_bpm(s: &str) -> Result<f64, String> {
    let bpm: f64 = s.parse().map_err(|e| format!("`{}` is not a number: {}", s, e))?;

    if !bpm.is_finite() || bpm <= 0.0 {
        return Err(format!("bpm must be greater than 0, got {}", s));
    }

    Ok(bpm)
}

use crate::model::tune::Tune;
use env_logger::Env;
use std::io::Write;

/// Sets up `env_logger` with `info` as the default level (`debug` when verbose).
///
/// Pass `raw_terminal` when the terminal will be in raw mode, which does not turn `\n` into a
/// carriage return.
pub fn init_logging(verbose: bool, raw_terminal: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let end = line_end(raw_terminal);

    env_logger::Builder::from_env(Env::default().default_filter_or(default_level))
        .format(move |buf, record| write!(buf, "[{:<5}] {}{}", record.level(), record.args(), end))
        .init();
}

pub fn line_end(raw_terminal: bool) -> &'static str {
    if raw_terminal { "\r\n" } else { "\n" }
}

/// One listing line: id, name, note count and length.
pub fn describe_tune(tune: &Tune, bpm: f64) -> String {
    format!(
        "{:<26} {:<24} {:>4} notes {:>7.2}s",
        tune.id,
        tune.name,
        tune.tune.len(),
        tune.length_secs(bpm)
    )
}

//! Interactive piano on the computer keyboard.
//!
//! The terminal runs in raw mode so single key presses arrive immediately. Keys bound in
//! [`MAPPINGS`] play notes; the remaining letters drive recording and the tune picker.
//!
//! Held keys must not retrigger notes. Terminals speaking the kitty keyboard protocol report
//! repeats and releases directly. Elsewhere a held key shows up as a stream of presses, so a
//! press of the key that was just played counts as a repeat when it follows within
//! [`AUTO_REPEAT_WINDOW`].

use crate::engine::Synth;
use crate::model::mappings::{MAPPINGS, keymap_legend};
use crate::piano::Piano;
use crate::store::TuneStore;
use anyhow::Result;
use crossterm::event::{
    self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers, KeyboardEnhancementFlags,
    PopKeyboardEnhancementFlags, PushKeyboardEnhancementFlags,
};
use crossterm::execute;
use crossterm::terminal::{disable_raw_mode, enable_raw_mode, supports_keyboard_enhancement};
use log::{debug, info, warn};
use std::io::Write;
use std::time::{Duration, Instant};

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Longest gap between two presses of the same key that still reads as auto-repeat when the
/// terminal cannot report releases.
pub const AUTO_REPEAT_WINDOW: Duration = Duration::from_millis(150);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    Keys,
    /// The tune-name field has focus: keystrokes edit the name and never play notes.
    Name,
}

struct RawModeGuard {
    enhanced: bool,
}

impl RawModeGuard {
    /// Enters raw mode and asks for release/repeat reporting where the terminal supports it.
    fn enable() -> Result<Self> {
        enable_raw_mode()?;
        let mut guard = Self { enhanced: false };

        if supports_keyboard_enhancement().unwrap_or(false) {
            execute!(
                std::io::stdout(),
                PushKeyboardEnhancementFlags(
                    KeyboardEnhancementFlags::DISAMBIGUATE_ESCAPE_CODES
                        | KeyboardEnhancementFlags::REPORT_EVENT_TYPES
                        | KeyboardEnhancementFlags::REPORT_ALL_KEYS_AS_ESCAPE_CODES
                        | KeyboardEnhancementFlags::REPORT_ALTERNATE_KEYS
                )
            )?;
            guard.enhanced = true;
            debug!("Keyboard enhancement enabled, key releases are reported");
        } else {
            debug!("No keyboard enhancement, auto-repeat is detected by timing");
        }

        Ok(guard)
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        if self.enhanced {
            if let Err(why) = execute!(std::io::stdout(), PopKeyboardEnhancementFlags) {
                warn!("Failed to reset keyboard reporting: {:?}", why);
            }
        }
        if let Err(why) = disable_raw_mode() {
            warn!("Failed to restore the terminal: {:?}", why);
        }
    }
}

#[derive(Debug)]
pub struct KeysApp {
    focus: Focus,
    name: String,
    should_quit: bool,
    /// Set once the terminal has delivered a release event.
    release_events: bool,
    /// Last mapped key played and when it last arrived, until it is released.
    held: Option<(char, Instant)>,
}

impl Default for KeysApp {
    fn default() -> Self {
        Self::new()
    }
}

impl KeysApp {
    pub fn new() -> Self {
        Self {
            focus: Focus::Keys,
            name: String::new(),
            should_quit: false,
            release_events: false,
            held: None,
        }
    }

    pub fn focus(&self) -> Focus {
        self.focus
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn should_quit(&self) -> bool {
        self.should_quit
    }

    pub fn run<S: Synth + 'static, T: TuneStore>(
        &mut self,
        piano: &mut Piano<S, T>,
    ) -> Result<()> {
        let raw = RawModeGuard::enable()?;
        self.release_events = raw.enhanced;
        print_help()?;

        if piano.refresh_tunes().is_ok() {
            log_tunes(piano);
        }

        while !self.should_quit {
            if event::poll(POLL_INTERVAL)? {
                if let Event::Key(key) = event::read()? {
                    self.handle_key(piano, key);
                }
            }
        }

        if piano.is_playing() {
            let _ = piano.stop_playback();
        }
        info!("Bye..!");

        Ok(())
    }

    pub fn handle_key<S: Synth + 'static, T: TuneStore>(
        &mut self,
        piano: &mut Piano<S, T>,
        key: KeyEvent,
    ) {
        self.handle_key_at(piano, key, Instant::now());
    }

    /// Handles one key event that arrived at `now`.
    pub fn handle_key_at<S: Synth + 'static, T: TuneStore>(
        &mut self,
        piano: &mut Piano<S, T>,
        key: KeyEvent,
        now: Instant,
    ) {
        if key.kind == KeyEventKind::Release {
            self.release_events = true;
            if let KeyCode::Char(c) = key.code {
                if self.held.is_some_and(|(k, _)| k == c.to_ascii_lowercase()) {
                    self.held = None;
                }
            }
            return;
        }

        let held = self.held.take();
        match self.focus {
            Focus::Name => self.edit_name(key),
            Focus::Keys => self.play_key(piano, key, held, now),
        }
    }

    fn is_auto_repeat(&self, key: char, held: Option<(char, Instant)>, now: Instant) -> bool {
        match held {
            Some((k, _)) if k == key && self.release_events => true,
            Some((k, last)) if k == key => now.saturating_duration_since(last) < AUTO_REPEAT_WINDOW,
            _ => false,
        }
    }

    fn edit_name(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Enter | KeyCode::Tab | KeyCode::Esc => {
                self.focus = Focus::Keys;
                info!("Tune name set to '{}'", self.name);
            }
            KeyCode::Backspace => {
                self.name.pop();
            }
            KeyCode::Char(c) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
                if key.modifiers.contains(KeyModifiers::SHIFT) {
                    self.name.push(c.to_ascii_uppercase());
                } else {
                    self.name.push(c);
                }
            }
            _ => {}
        }
    }

    fn play_key<S: Synth + 'static, T: TuneStore>(
        &mut self,
        piano: &mut Piano<S, T>,
        key: KeyEvent,
        held: Option<(char, Instant)>,
        now: Instant,
    ) {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        let chord = key
            .modifiers
            .intersects(KeyModifiers::CONTROL | KeyModifiers::ALT | KeyModifiers::SUPER);

        match key.code {
            KeyCode::Char('c') if ctrl => self.should_quit = true,
            KeyCode::Char('r') if ctrl => {
                if piano.refresh_tunes().is_ok() {
                    log_tunes(piano);
                }
            }
            KeyCode::Char(c) if !chord && is_mapped(c) => {
                let c = c.to_ascii_lowercase();
                let repeat = key.kind == KeyEventKind::Repeat || self.is_auto_repeat(c, held, now);

                self.held = Some((c, now));
                piano.press_key(c, repeat);
            }
            KeyCode::Char(c) if !chord => match c.to_ascii_lowercase() {
                'r' => piano.start_recording(),
                'x' => {
                    // errors are already logged by the piano
                    let _ = piano.stop_recording(Some(&self.name));
                }
                'n' => {
                    piano.tunes_mut().select_next();
                    log_selection(piano);
                }
                'b' => {
                    piano.tunes_mut().select_prev();
                    log_selection(piano);
                }
                'c' => {
                    if let Err(why) = piano.stop_playback() {
                        warn!("{}", why);
                    }
                }
                'q' => self.should_quit = true,
                _ => {}
            },
            KeyCode::Enter => {
                let Some(id) = piano.tunes().selected_id().map(str::to_owned) else {
                    warn!("No tune selected..!");
                    return;
                };
                // failures are logged by the piano, playback just stays stopped
                let _ = piano.play_selected(&id);
            }
            KeyCode::Tab => {
                self.focus = Focus::Name;
                info!("Type a tune name, Enter when done");
            }
            KeyCode::Esc => self.should_quit = true,
            _ => {}
        }
    }
}

fn is_mapped(c: char) -> bool {
    MAPPINGS.iter().any(|b| b.key == c.to_ascii_lowercase())
}

fn print_help() -> Result<()> {
    let mut out = std::io::stdout();
    write!(
        out,
        "Keys: {}\r\n\
         r record | x stop & save | Tab name the tune | n/b pick tune\r\n\
         Enter play | c cancel | Ctrl-R reload | q quit\r\n",
        keymap_legend()
    )?;
    out.flush()?;
    Ok(())
}

fn log_tunes<S: Synth + 'static, T: TuneStore>(piano: &Piano<S, T>) {
    info!("{} tunes on the server", piano.tunes().len());
    log_selection(piano);
}

fn log_selection<S: Synth + 'static, T: TuneStore>(piano: &Piano<S, T>) {
    match (piano.tunes().selected_id(), piano.tunes().selected_name()) {
        (Some(id), Some(name)) => info!("Selected '{}' ({})", name, id),
        _ => info!("No tunes to select"),
    }
}

use crossbeam_channel as cb;
use log::{debug, warn};
use pacemu_core::input::Key;
use std::io::BufRead;
use std::thread::{self, JoinHandle};

/// One line of keyboard input from stdin.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KeyInput {
    Press(Key),
    Release(Key),
    /// Press immediately followed by release.
    Tap(Key),
    Quit,
}

/// Parse `+key`, `-key`, `key` or `quit`. Blank and unknown lines yield
/// `None`.
pub fn parse_line(line: &str) -> Option<KeyInput> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    if line.eq_ignore_ascii_case("quit") {
        return Some(KeyInput::Quit);
    }

    if let Some(rest) = line.strip_prefix('+') {
        Key::parse(rest.trim()).map(KeyInput::Press)
    } else if let Some(rest) = line.strip_prefix('-') {
        Key::parse(rest.trim()).map(KeyInput::Release)
    } else {
        Key::parse(line).map(KeyInput::Tap)
    }
}

/// Read key lines from stdin on a background thread. The thread sends
/// [`KeyInput::Quit`] at end of input and exits once the receiver is gone.
pub fn spawn_stdin_reader(tx: cb::Sender<KeyInput>) -> std::io::Result<JoinHandle<()>> {
    thread::Builder::new().name("stdin-keys".into()).spawn(move || {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            let line = match line {
                Ok(l) => l,
                Err(e) => {
                    warn!("Failed to read stdin: {e}");
                    break;
                }
            };
            match parse_line(&line) {
                Some(input) => {
                    if tx.send(input).is_err() {
                        return;
                    }
                    if input == KeyInput::Quit {
                        return;
                    }
                }
                None if line.trim().is_empty() => {}
                None => warn!("Unrecognised key line '{}'", line.trim()),
            }
        }
        debug!("stdin closed");
        let _ = tx.send(KeyInput::Quit);
    })
}

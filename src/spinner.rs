//! A terminal spinner with an elapsed-time readout for long container runs.

use std::io::{IsTerminal, Write};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::consts::format_elapsed;

/// Braille spinner frames.
const FRAMES: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];

/// Frame interval.
const INTERVAL: Duration = Duration::from_millis(100);

/// A spinner drawn on stderr from a background task.
///
/// When stderr is not a terminal nothing is drawn, so redirected logs stay
/// clean. [`Spinner::stop`] returns the elapsed time either way.
pub struct Spinner {
    started: Instant,
    task: Option<(JoinHandle<()>, tokio::sync::watch::Sender<bool>)>,
}

impl Spinner {
    /// Start a spinner with the given message (e.g. `"upscaling clip.mp4"`).
    pub fn start(message: &str) -> Self {
        Self::start_with(message, std::io::stderr().is_terminal())
    }

    fn start_with(message: &str, draw: bool) -> Self {
        let started = Instant::now();
        if !draw {
            return Self {
                started,
                task: None,
            };
        }

        let (cancel_tx, mut cancel_rx) = tokio::sync::watch::channel(false);
        let message = message.to_string();

        let handle = tokio::spawn(async move {
            let mut i = 0;
            loop {
                let frame = FRAMES[i % FRAMES.len()];
                let elapsed = format_elapsed(started.elapsed());
                eprint!("\x1b[2K\r{frame} {message} ({elapsed})");
                let _ = std::io::stderr().flush();

                tokio::select! {
                    _ = tokio::time::sleep(INTERVAL) => {}
                    _ = cancel_rx.changed() => break,
                }
                i += 1;
            }
            eprint!("\x1b[2K\r");
            let _ = std::io::stderr().flush();
        });

        Self {
            started,
            task: Some((handle, cancel_tx)),
        }
    }

    /// Stop the spinner, clear its line, and return how long it ran.
    pub async fn stop(self) -> Duration {
        if let Some((handle, cancel)) = self.task {
            let _ = cancel.send(true);
            let _ = handle.await;
        }
        self.started.elapsed()
    }
}

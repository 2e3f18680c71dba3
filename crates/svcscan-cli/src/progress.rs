//! Keystroke-triggered progress display
//!
//! A background thread polls the terminal for pending keystrokes while a
//! scan runs. Each keystroke prints one status line computed from the
//! engine's shared progress counters; the input itself is discarded.

use crossterm::event::{self, Event};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;
use svcscan_core::ScanProgress;
use tracing::trace;

const POLL_INTERVAL: Duration = Duration::from_millis(200);

/// Handle for the watcher thread; stops on drop or `stop()`
pub struct KeystrokeWatcher {
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl KeystrokeWatcher {
    /// Spawn the watcher over the given progress counters
    pub fn spawn(progress: Arc<ScanProgress>) -> Self {
        let stop = Arc::new(AtomicBool::new(false));
        let stop_flag = Arc::clone(&stop);

        let handle = std::thread::spawn(move || {
            while !stop_flag.load(Ordering::Relaxed) {
                match event::poll(POLL_INTERVAL) {
                    Ok(true) => {
                        // Drain every pending event so one keypress yields
                        // one status line
                        let mut key_seen = false;
                        while let Ok(true) = event::poll(Duration::ZERO) {
                            if let Ok(Event::Key(_)) = event::read() {
                                key_seen = true;
                            }
                        }

                        if key_seen && progress.completed() > 0 {
                            println!("{}", progress.status_line());
                        }
                    }
                    Ok(false) => {}
                    Err(err) => {
                        // No usable terminal; stop watching quietly
                        trace!("Keystroke polling unavailable: {}", err);
                        break;
                    }
                }
            }
        });

        Self {
            stop,
            handle: Some(handle),
        }
    }

    /// Stop the watcher and wait for the thread to exit
    pub fn stop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for KeystrokeWatcher {
    fn drop(&mut self) {
        self.stop();
    }
}

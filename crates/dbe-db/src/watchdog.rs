//! Per-command timeout enforcement.
//!
//! A [`Watchdog`] is armed around one SQL execution. If the execution is still
//! running when the timeout elapses, the watchdog thread fires the interrupt
//! callback. Dropping the watchdog disarms it and joins the thread, so an
//! interrupt can never land on a later statement.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

pub(crate) struct Watchdog {
    disarm: Option<mpsc::Sender<()>>,
    thread: Option<JoinHandle<()>>,
    fired: Arc<AtomicBool>,
}

impl Watchdog {
    /// Arm a watchdog that calls `on_expire` after `timeout`.
    pub(crate) fn arm<F>(timeout: Duration, on_expire: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        let (tx, rx) = mpsc::channel::<()>();
        let fired = Arc::new(AtomicBool::new(false));
        let fired_flag = Arc::clone(&fired);

        let thread = thread::spawn(move || {
            if let Err(RecvTimeoutError::Timeout) = rx.recv_timeout(timeout) {
                fired_flag.store(true, Ordering::SeqCst);
                on_expire();
            }
        });

        Self {
            disarm: Some(tx),
            thread: Some(thread),
            fired,
        }
    }

    /// Whether the timeout elapsed and the interrupt was sent.
    pub(crate) fn fired(&self) -> bool {
        self.fired.load(Ordering::SeqCst)
    }
}

impl Drop for Watchdog {
    fn drop(&mut self) {
        // Closing the channel wakes the thread with `Disconnected`.
        drop(self.disarm.take());
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

//! Background worker driven by a coalescing trigger.
//!
//! The trigger is a channel with capacity one. While a run is in progress at
//! most one more run can be pending; further triggers are dropped.

use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc::{self, SyncSender, TrySendError};
use std::thread::{self, JoinHandle};

use tracing::{debug, error};

use crate::error::{Result, RotatorError};

/// Handle to a worker thread that runs a job once per (coalesced) trigger.
pub struct SweepWorker {
    trigger: Option<SyncSender<()>>,
    thread: Option<JoinHandle<()>>,
}

impl SweepWorker {
    /// Spawn a named worker thread running `job` for every trigger.
    ///
    /// A panicking job is logged and the worker keeps waiting for triggers.
    pub fn spawn<F>(name: &str, mut job: F) -> Result<Self>
    where
        F: FnMut() + Send + 'static,
    {
        let (tx, rx) = mpsc::sync_channel::<()>(1);

        let thread = thread::Builder::new()
            .name(name.to_string())
            .spawn(move || {
                debug!("Log retention worker started");
                for () in rx.iter() {
                    if panic::catch_unwind(AssertUnwindSafe(&mut job)).is_err() {
                        error!("Log retention run panicked");
                    }
                }
                debug!("Log retention worker stopping");
            })
            .map_err(RotatorError::Worker)?;

        Ok(Self {
            trigger: Some(tx),
            thread: Some(thread),
        })
    }

    /// Request a run without blocking. Never logs, so it is safe to call
    /// while holding the writer lock.
    ///
    /// Returns `false` when a run is already pending (the trigger coalesces)
    /// or the worker has shut down.
    pub fn trigger(&self) -> bool {
        let Some(tx) = &self.trigger else {
            return false;
        };
        match tx.try_send(()) {
            Ok(()) => true,
            Err(TrySendError::Full(()) | TrySendError::Disconnected(())) => false,
        }
    }

    /// Stop accepting triggers and wait for the thread to exit.
    ///
    /// A pending run is still executed before the thread exits.
    pub fn shutdown(&mut self) {
        self.trigger.take();
        if let Some(handle) = self.thread.take() {
            if handle.join().is_err() {
                error!("Log retention worker panicked");
            }
        }
    }

    /// Check if the worker thread is still alive.
    pub fn is_running(&self) -> bool {
        self.thread.as_ref().is_some_and(|h| !h.is_finished())
    }
}

impl Drop for SweepWorker {
    fn drop(&mut self) {
        self.shutdown();
    }
}

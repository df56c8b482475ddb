//! Background worker enforcing the byte-size budget.
//!
//! A single dedicated OS thread drains a depth-1 channel. Scheduling a trim
//! is a `try_send` from [`Shared::maybe_schedule_trim`]: if a task is
//! already queued, the send is dropped rather than blocking or erroring —
//! the queued task re-checks `size` and `redundant_op_count` itself when it
//! runs, so nothing is lost by coalescing two triggers into one pass.

use crate::Shared;
use std::sync::mpsc::Receiver;
use std::sync::Weak;
use std::thread::JoinHandle;
use tracing::warn;

impl Shared {
    /// Wakes the trimmer thread if it isn't already scheduled to run.
    /// A closed cache (whose sender has been dropped) silently does
    /// nothing.
    pub(crate) fn maybe_schedule_trim(&self) {
        if let Some(tx) = self.trimmer_tx.lock().unwrap().as_ref() {
            let _ = tx.try_send(());
        }
    }
}

/// Spawns the trimmer thread. Returns immediately; the thread runs until
/// `rx` disconnects (the cache dropped its sender on close) or the
/// `Shared` it holds only a [`Weak`] reference to is gone.
pub(crate) fn spawn(shared: Weak<Shared>, rx: Receiver<()>) -> JoinHandle<()> {
    std::thread::Builder::new()
        .name("cache-trimmer".to_string())
        .spawn(move || run(shared, rx))
        .expect("failed to spawn cache trimmer thread")
}

fn run(shared: Weak<Shared>, rx: Receiver<()>) {
    while rx.recv().is_ok() {
        let Some(shared) = shared.upgrade() else {
            return;
        };

        if shared.state.lock().unwrap().closed {
            continue;
        }

        if let Err(e) = shared.trim_to_size() {
            warn!(error = %e, "trimmer: eviction pass failed, will re-check on next trigger");
            continue;
        }

        if shared.is_rebuild_required() {
            if let Err(e) = shared.rebuild_journal() {
                warn!(error = %e, "trimmer: journal rebuild failed, will re-check on next trigger");
            }
        }
    }
}

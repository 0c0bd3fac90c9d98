//! Deferred session teardown.
//!
//! Stopping the engine and destroying the window can take a while, so the
//! session thread hands them to a blocking worker and returns. The lease
//! permit travels with the job and is released only after the job ran;
//! completion is signalled through a oneshot.

use tokio::runtime::Handle;
use tokio::sync::oneshot;
use tracing::debug;

use crate::stream::lease::LeasePermit;

#[derive(Debug, Clone)]
pub struct TeardownWorker {
    handle: Handle,
}

impl TeardownWorker {
    pub fn new(handle: Handle) -> Self {
        Self { handle }
    }

    /// Run `job` on the blocking pool, then release `permit`.
    pub fn dispatch<F>(&self, permit: Option<LeasePermit>, job: F) -> CleanupHandle
    where
        F: FnOnce() + Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        self.handle.spawn_blocking(move || {
            job();
            drop(permit);
            debug!("deferred cleanup complete");
            let _ = tx.send(());
        });
        CleanupHandle { rx, finished: false }
    }
}

/// Completion signal of a dispatched teardown.
#[derive(Debug)]
pub struct CleanupHandle {
    rx: oneshot::Receiver<()>,
    finished: bool,
}

impl CleanupHandle {
    /// A handle for work that already finished synchronously.
    pub fn completed() -> Self {
        let (tx, rx) = oneshot::channel();
        let _ = tx.send(());
        Self { rx, finished: false }
    }

    /// Block until the teardown ran. False if it never completed (the job
    /// panicked or the runtime shut down). Not for use inside the runtime.
    pub fn wait(self) -> bool {
        self.finished || self.rx.blocking_recv().is_ok()
    }

    pub async fn done(self) -> bool {
        self.finished || self.rx.await.is_ok()
    }

    /// Non-blocking check.
    pub fn is_finished(&mut self) -> bool {
        if !self.finished && self.rx.try_recv().is_ok() {
            self.finished = true;
        }
        self.finished
    }
}

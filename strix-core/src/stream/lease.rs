//! Process-wide single-session lease.
//!
//! A one-permit semaphore. A session holds the permit from the launch call
//! until its deferred teardown has finished, so a new session can never
//! touch decode or display state while an old one is still releasing it.

use std::sync::Arc;

use tokio::runtime::Handle;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::debug;

use crate::error::SessionError;

#[derive(Debug, Clone)]
pub struct SessionLease {
    permits: Arc<Semaphore>,
}

impl Default for SessionLease {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionLease {
    pub fn new() -> Self {
        Self {
            permits: Arc::new(Semaphore::new(1)),
        }
    }

    /// Wait, without a timeout, for the lease.
    pub async fn acquire(&self) -> Result<LeasePermit, SessionError> {
        let permit = Arc::clone(&self.permits)
            .acquire_owned()
            .await
            .map_err(|_| SessionError::Abort("session lease closed".into()))?;
        debug!("session lease acquired");
        Ok(LeasePermit { _permit: permit })
    }

    /// Blocking variant for the session thread. Must not be called from
    /// inside the runtime.
    pub fn acquire_blocking(&self, handle: &Handle) -> Result<LeasePermit, SessionError> {
        handle.block_on(self.acquire())
    }

    pub fn try_acquire(&self) -> Option<LeasePermit> {
        Arc::clone(&self.permits)
            .try_acquire_owned()
            .ok()
            .map(|permit| LeasePermit { _permit: permit })
    }

    /// No session currently holds the lease.
    pub fn is_available(&self) -> bool {
        self.permits.available_permits() > 0
    }
}

/// Proof of holding the lease. Dropping it releases the lease.
#[derive(Debug)]
pub struct LeasePermit {
    _permit: OwnedSemaphorePermit,
}

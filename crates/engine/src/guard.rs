//! Per-drive run exclusion.
//!
//! The engine owns this invariant itself instead of trusting callers to
//! check for an active run first: at most one benchmark run per drive, with
//! a racing second start rejected rather than queued.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use drivewatch_core::types::DbId;
use drivewatch_core::CoreError;

/// Hands out at most one [`RunToken`] per drive at a time.
#[derive(Clone, Default)]
pub struct ActiveRuns {
    inner: Arc<Mutex<HashSet<DbId>>>,
}

impl ActiveRuns {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim the drive for a new run. Fails with [`CoreError::Conflict`]
    /// while another token for the same drive is live.
    pub fn acquire(&self, drive_id: DbId) -> Result<RunToken, CoreError> {
        let mut active = self.inner.lock().expect("active-run set poisoned");
        if !active.insert(drive_id) {
            return Err(CoreError::Conflict(format!(
                "a benchmark run is already active for drive {drive_id}"
            )));
        }
        Ok(RunToken {
            drive_id,
            set: Arc::clone(&self.inner),
        })
    }

    /// Whether a token is currently held for the drive.
    pub fn is_active(&self, drive_id: DbId) -> bool {
        self.inner
            .lock()
            .expect("active-run set poisoned")
            .contains(&drive_id)
    }
}

/// RAII claim on a drive. Dropping it releases the drive, whether the run
/// completed, failed, or the executing task panicked.
#[derive(Debug)]
pub struct RunToken {
    drive_id: DbId,
    set: Arc<Mutex<HashSet<DbId>>>,
}

impl Drop for RunToken {
    fn drop(&mut self) {
        if let Ok(mut set) = self.set.lock() {
            set.remove(&self.drive_id);
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

//! Process-wide exclusion between tree scans.

use std::sync::Arc;

use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::debug;

use romdex_core::{ScanError, ScanKind};

/// Gate shared by every operation that walks a tree.
///
/// At most one [`ScanPermit`] exists at a time across all clones of a
/// coordinator. Waiters are served in FIFO order.
#[derive(Debug, Clone, Default)]
pub struct ScanCoordinator {
    gate: Arc<Mutex<()>>,
}

/// Proof of holding the gate. Dropping it releases the gate.
#[derive(Debug)]
pub struct ScanPermit {
    kind: ScanKind,
    _guard: OwnedMutexGuard<()>,
}

impl ScanPermit {
    pub fn kind(&self) -> ScanKind {
        self.kind
    }
}

impl Drop for ScanPermit {
    fn drop(&mut self) {
        debug!(kind = %self.kind, "scan gate released");
    }
}

impl ScanCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for the gate.
    pub async fn acquire(&self, kind: ScanKind) -> ScanPermit {
        debug!(%kind, "waiting for scan gate");
        let guard = Arc::clone(&self.gate).lock_owned().await;
        debug!(%kind, "scan gate acquired");
        ScanPermit {
            kind,
            _guard: guard,
        }
    }

    /// Wait for the gate from synchronous code.
    ///
    /// Panics if called from within an async execution context.
    pub fn blocking_acquire(&self, kind: ScanKind) -> ScanPermit {
        debug!(%kind, "waiting for scan gate");
        let guard = Arc::clone(&self.gate).blocking_lock_owned();
        debug!(%kind, "scan gate acquired");
        ScanPermit {
            kind,
            _guard: guard,
        }
    }

    /// Take the gate only if it is free.
    pub fn try_acquire(&self, kind: ScanKind) -> Option<ScanPermit> {
        let guard = Arc::clone(&self.gate).try_lock_owned().ok()?;
        debug!(%kind, "scan gate acquired");
        Some(ScanPermit {
            kind,
            _guard: guard,
        })
    }

    /// Whether a scan currently holds the gate.
    pub fn is_busy(&self) -> bool {
        self.gate.try_lock().is_err()
    }

    /// Run blocking `scan` on the blocking pool with the gate held.
    ///
    /// The permit travels with the closure, so the gate stays held until
    /// `scan` returns even if the returned future is dropped first.
    pub async fn with_exclusive_scan<T, F>(&self, kind: ScanKind, scan: F) -> Result<T, ScanError>
    where
        F: FnOnce() -> Result<T, ScanError> + Send + 'static,
        T: Send + 'static,
    {
        let permit = self.acquire(kind).await;
        tokio::task::spawn_blocking(move || {
            let _permit = permit;
            scan()
        })
        .await
        .map_err(|e| ScanError::Interrupted {
            reason: e.to_string(),
        })?
    }
}

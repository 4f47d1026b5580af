//! Session shared between threads.
//!
//! The accumulators are the only mutable state of a connection. A worker
//! holds the lock across its transactions and the check that covers them, so
//! no other worker's reset can land in between.

use parking_lot::Mutex;
use smconsole_simplemotion_v2::SmBus;
use std::sync::Arc;

use crate::mode::CheckMode;
use crate::session::{BusSession, CheckOutcome};

/// Cloneable handle to a [`BusSession`] guarded by a mutex.
#[derive(Debug)]
pub struct SharedBusSession<B: SmBus> {
    inner: Arc<Mutex<BusSession<B>>>,
}

impl<B: SmBus> Clone for SharedBusSession<B> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<B: SmBus> SharedBusSession<B> {
    /// Share `session`.
    pub fn new(session: BusSession<B>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(session)),
        }
    }

    /// Run `f` and then a check in `mode`, all under one lock.
    pub fn transact<R>(
        &self,
        mode: CheckMode,
        f: impl FnOnce(&mut BusSession<B>) -> R,
    ) -> (R, CheckOutcome) {
        let mut session = self.inner.lock();
        let result = f(&mut session);
        let outcome = session.check(mode);
        (result, outcome)
    }

    /// Run a check on its own.
    pub fn check(&self, mode: CheckMode) -> CheckOutcome {
        self.inner.lock().check(mode)
    }

    /// Access the session without running a check.
    pub fn with<R>(&self, f: impl FnOnce(&mut BusSession<B>) -> R) -> R {
        f(&mut self.inner.lock())
    }

    /// Recover the session once every other handle is gone.
    ///
    /// # Errors
    ///
    /// Returns the handle back while other clones are alive.
    pub fn try_unwrap(self) -> Result<BusSession<B>, Self> {
        Arc::try_unwrap(self.inner)
            .map(Mutex::into_inner)
            .map_err(|inner| Self { inner })
    }
}

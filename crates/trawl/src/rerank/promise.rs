use parking_lot::{Condvar, Mutex};
use std::sync::Arc;

use crate::error::SearchError;

struct Core<T> {
    slot: Mutex<Option<Result<T, SearchError>>>,
    cond: Condvar,
}

/// Fulfilling half of a one-shot result channel. Dropping an unfulfilled
/// promise resolves the paired future with `Cancelled`, so no waiter can
/// hang on a worker that died or shut down.
pub struct Promise<T> {
    core: Arc<Core<T>>,
    fulfilled: bool,
}

/// Waiting half; `wait()` blocks until the worker fulfills the promise.
pub struct Future<T> {
    core: Arc<Core<T>>,
}

pub fn pair<T>() -> (Promise<T>, Future<T>) {
    let core = Arc::new(Core {
        slot: Mutex::new(None),
        cond: Condvar::new(),
    });
    (
        Promise {
            core: Arc::clone(&core),
            fulfilled: false,
        },
        Future { core },
    )
}

impl<T> Promise<T> {
    /// Fulfill exactly once; consumed by value so a second fulfillment is a
    /// compile error rather than a runtime race.
    pub fn set(mut self, result: Result<T, SearchError>) {
        self.fill(result);
        self.fulfilled = true;
    }

    fn fill(&self, result: Result<T, SearchError>) {
        let mut slot = self.core.slot.lock();
        if slot.is_none() {
            *slot = Some(result);
            self.core.cond.notify_all();
        }
    }
}

impl<T> Drop for Promise<T> {
    fn drop(&mut self) {
        if !self.fulfilled {
            self.fill(Err(SearchError::Cancelled));
        }
    }
}

impl<T> Future<T> {
    /// Block until fulfilled.
    pub fn wait(self) -> Result<T, SearchError> {
        let mut slot = self.core.slot.lock();
        while slot.is_none() {
            self.core.cond.wait(&mut slot);
        }
        slot.take().unwrap()
    }

    /// Non-blocking check, mainly for tests.
    pub fn try_take(&self) -> Option<Result<T, SearchError>> {
        self.core.slot.lock().take()
    }
}

//! Live-subscription handle.

use std::fmt;
use std::sync::Mutex;

type CancelFn = Box<dyn FnOnce() + Send>;

/// A registration of a snapshot callback with a `RemoteSource`.
///
/// Cancelling unregisters the callback exactly once; further calls are
/// no-ops. Once `cancel` returns the callback will not be invoked again.
/// Dropping the handle cancels it.
///
/// ## Usage Pattern
///
/// ```ignore
/// let sub = remote.subscribe(Arc::new(|snapshot| render(snapshot))).await?;
/// // ... view is live ...
/// sub.cancel();
/// sub.cancel(); // idempotent
/// ```
pub struct Subscription {
    cancel_fn: Mutex<Option<CancelFn>>,
}

impl Subscription {
    /// Wrap the source-specific unregistration logic.
    pub fn new(cancel_fn: impl FnOnce() + Send + 'static) -> Self {
        Self {
            cancel_fn: Mutex::new(Some(Box::new(cancel_fn))),
        }
    }

    /// A handle with nothing to unregister (e.g. for sources that never push).
    pub fn detached() -> Self {
        Self {
            cancel_fn: Mutex::new(None),
        }
    }

    pub fn cancel(&self) {
        let cancel_fn = match self.cancel_fn.lock() {
            Ok(mut guard) => guard.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };

        if let Some(f) = cancel_fn {
            f();
        }
    }

    pub fn is_cancelled(&self) -> bool {
        match self.cancel_fn.lock() {
            Ok(guard) => guard.is_none(),
            Err(poisoned) => poisoned.into_inner().is_none(),
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.cancel();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

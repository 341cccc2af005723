//! Subscription - 1 回の dispatch に対するキャンセルハンドル

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use tokio::task::AbortHandle;

use crate::domain::DispatchId;

/// Cancellation handle returned by every dispatch.
///
/// `unsubscribe()` is advisory: it keeps a background step from starting and
/// suppresses any delivery that has not run yet, but does not interrupt a
/// background step already in progress. Timer tasks are aborted.
///
/// A subscription also reads as unsubscribed once its dispatch has reached a
/// terminal outcome. Clones refer to the same dispatch.
#[derive(Clone)]
pub struct Subscription {
    inner: Arc<Inner>,
}

struct Inner {
    dispatch_id: DispatchId,
    closed: AtomicBool,
    timer: Mutex<Option<AbortHandle>>,
}

impl Subscription {
    pub(crate) fn new(dispatch_id: DispatchId) -> Self {
        Self {
            inner: Arc::new(Inner {
                dispatch_id,
                closed: AtomicBool::new(false),
                timer: Mutex::new(None),
            }),
        }
    }

    /// A subscription that is already closed (synchronous operations).
    pub(crate) fn closed(dispatch_id: DispatchId) -> Self {
        let subscription = Self::new(dispatch_id);
        subscription.inner.closed.store(true, Ordering::Release);
        subscription
    }

    pub fn dispatch_id(&self) -> DispatchId {
        self.inner.dispatch_id
    }

    pub fn unsubscribe(&self) {
        self.inner.closed.store(true, Ordering::Release);
        let timer = self
            .inner
            .timer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(timer) = timer {
            timer.abort();
        }
    }

    pub fn is_unsubscribed(&self) -> bool {
        self.inner.closed.load(Ordering::Acquire)
    }

    /// Ties a timer task to this subscription.
    pub(crate) fn attach_timer(&self, handle: AbortHandle) {
        let mut timer = self
            .inner
            .timer
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if self.is_unsubscribed() {
            // 既に閉じている: タイマーも即停止
            handle.abort();
        } else {
            *timer = Some(handle);
        }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("dispatch_id", &self.inner.dispatch_id)
            .field("unsubscribed", &self.is_unsubscribed())
            .finish()
    }
}

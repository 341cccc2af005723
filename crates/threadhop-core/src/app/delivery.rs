//! Delivery - UI コンテキストへの配送
//!
//! dispatcher / timer / iteration が共通で使う内部部品です。
//! UI で実行する直前に Subscription を確認し、キャンセル済みなら何もしません。

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use tracing::{debug, warn};

use super::subscription::Subscription;
use crate::domain::{BoxError, DispatchId, ExecutorError, TaskError};
use crate::ports::{ErrorHandler, UiExecutor};

/// What a failed UI step does to the subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum OnFailure {
    Close,
    KeepOpen,
}

/// UI 側の配送先（1 dispatch 分）
#[derive(Clone)]
pub(crate) struct Delivery {
    pub(crate) dispatch_id: DispatchId,
    pub(crate) subscription: Subscription,
    ui: Arc<dyn UiExecutor>,
    on_error: ErrorHandler,
}

impl Delivery {
    pub(crate) fn new(
        subscription: Subscription,
        ui: Arc<dyn UiExecutor>,
        on_error: ErrorHandler,
    ) -> Self {
        Self {
            dispatch_id: subscription.dispatch_id(),
            subscription,
            ui,
            on_error,
        }
    }

    /// Posts `step` to the UI context.
    ///
    /// - `last`: the subscription is closed after the step, whatever its result
    /// - a failing step goes to the error handler; `on_failure` decides whether
    ///   that also closes the subscription
    pub(crate) fn post_step<F>(&self, step: F, last: bool, on_failure: OnFailure) -> bool
    where
        F: FnOnce() -> Result<(), BoxError> + Send + 'static,
    {
        let dispatch_id = self.dispatch_id;
        let subscription = self.subscription.clone();
        let on_error = self.on_error.clone();
        let posted = self.ui.post(Box::new(move || {
            if subscription.is_unsubscribed() {
                debug!(%dispatch_id, "delivery suppressed");
                return;
            }
            match run_guarded(dispatch_id, step) {
                Ok(()) => {
                    if last {
                        subscription.unsubscribe();
                        debug!(%dispatch_id, "dispatch completed");
                    }
                }
                Err(err) => {
                    if last || on_failure == OnFailure::Close {
                        subscription.unsubscribe();
                    }
                    on_error.handle(err);
                }
            }
        }));
        self.report(posted)
    }

    /// Posts a background failure to the error handler on the UI context.
    pub(crate) fn post_error(&self, err: TaskError, close: bool) -> bool {
        let dispatch_id = self.dispatch_id;
        let subscription = self.subscription.clone();
        let on_error = self.on_error.clone();
        let posted = self.ui.post(Box::new(move || {
            if subscription.is_unsubscribed() {
                debug!(%dispatch_id, "error delivery suppressed");
                return;
            }
            if close {
                subscription.unsubscribe();
            }
            on_error.handle(err);
        }));
        self.report(posted)
    }

    fn report(&self, posted: Result<(), ExecutorError>) -> bool {
        match posted {
            Ok(()) => true,
            Err(err) => {
                // 配送できない dispatch は終端扱い
                self.subscription.unsubscribe();
                warn!(dispatch_id = %self.dispatch_id, error = %err, "ui executor refused delivery");
                false
            }
        }
    }
}

/// Runs `f`, turning both `Err` and panics into `TaskError`.
pub(crate) fn run_guarded<T, F>(dispatch_id: DispatchId, f: F) -> Result<T, TaskError>
where
    F: FnOnce() -> Result<T, BoxError>,
{
    match catch_unwind(AssertUnwindSafe(f)) {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(source)) => Err(TaskError::failed(dispatch_id, source)),
        Err(payload) => Err(TaskError::panicked(dispatch_id, &*payload)),
    }
}

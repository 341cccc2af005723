//! Dispatcher - background で実行して UI で受け取る
//!
//! # フロー
//! 1. background step を BackgroundExecutor に submit（開始前にキャンセル確認）
//! 2. 成功したら出力を UiExecutor に post → UI step / subscriber を実行
//! 3. 失敗（Err / panic）したら UI 側で ErrorHandler を 1 回だけ呼ぶ
//!
//! どの操作もブロックせず、すぐに `Subscription` を返します。

use std::sync::Arc;

use tokio::runtime::Handle;
use tracing::{debug, warn};

use super::config::DispatcherConfig;
use super::delivery::{Delivery, OnFailure, run_guarded};
use super::subscription::Subscription;
use crate::domain::{BackgroundTask, BoxError, CombinedTask, DispatchId, TaskEnvelope, UiTask};
use crate::ports::{BackgroundExecutor, ErrorHandler, UiExecutor};

/// Schedules tasks on the background pool and delivers results on the UI context.
///
/// Cheap to clone.
#[derive(Clone)]
pub struct Dispatcher {
    pub(crate) background: Arc<dyn BackgroundExecutor>,
    pub(crate) ui: Arc<dyn UiExecutor>,
    pub(crate) runtime: Handle,
    pub(crate) default_error_handler: ErrorHandler,
    pub(crate) config: DispatcherConfig,
}

impl Dispatcher {
    pub fn config(&self) -> &DispatcherConfig {
        &self.config
    }

    pub fn default_error_handler(&self) -> &ErrorHandler {
        &self.default_error_handler
    }

    // ========================================
    // UI only
    // ========================================

    /// Runs a [`UiTask`] on the UI context.
    pub fn do_in_ui<T: UiTask>(&self, envelope: TaskEnvelope<T, T::Input>) -> Subscription {
        self.do_in_ui_with(envelope, self.default_error_handler.clone())
    }

    /// [`Dispatcher::do_in_ui`] with an explicit error handler.
    pub fn do_in_ui_with<T: UiTask>(
        &self,
        envelope: TaskEnvelope<T, T::Input>,
        on_error: ErrorHandler,
    ) -> Subscription {
        let (dispatch_id, task, input) = envelope.into_parts();
        let delivery = self.delivery(dispatch_id, on_error);
        debug!(%dispatch_id, "dispatching ui task");
        delivery.post_step(move || task.run_on_ui(input), true, OnFailure::Close);
        delivery.subscription
    }

    // ========================================
    // Background only
    // ========================================

    /// Runs a [`BackgroundTask`] on the background pool, discarding its output.
    ///
    /// A failure is still reported on the UI context.
    pub fn do_in_background<T: BackgroundTask>(
        &self,
        envelope: TaskEnvelope<T, T::Input>,
    ) -> Subscription {
        self.do_in_background_with(envelope, self.default_error_handler.clone())
    }

    /// [`Dispatcher::do_in_background`] with an explicit error handler.
    pub fn do_in_background_with<T: BackgroundTask>(
        &self,
        envelope: TaskEnvelope<T, T::Input>,
        on_error: ErrorHandler,
    ) -> Subscription {
        let (dispatch_id, mut task, input) = envelope.into_parts();
        self.hop(
            dispatch_id,
            input,
            move |input| task.run_in_background(input).map(drop),
            |()| Ok(()),
            on_error,
        )
    }

    // ========================================
    // Background → UI
    // ========================================

    /// Runs a [`CombinedTask`]: background step, then its UI step with the output.
    pub fn execute<T: CombinedTask>(&self, envelope: TaskEnvelope<T, T::Input>) -> Subscription {
        self.execute_with(envelope, self.default_error_handler.clone())
    }

    /// [`Dispatcher::execute`] with an explicit error handler.
    pub fn execute_with<T: CombinedTask>(
        &self,
        envelope: TaskEnvelope<T, T::Input>,
        on_error: ErrorHandler,
    ) -> Subscription {
        let (dispatch_id, mut task, input) = envelope.into_parts();
        self.hop(
            dispatch_id,
            input,
            move |input| {
                let output = task.run_in_background(input)?;
                Ok((task, output))
            },
            |(task, output): (T, T::Output)| task.run_on_ui(output),
            on_error,
        )
    }

    /// Applies `transform` to `input` in the background and hands the result
    /// to `on_result` on the UI context.
    pub fn map<In, Out, E, F, R>(&self, input: In, transform: F, on_result: R) -> Subscription
    where
        In: Send + 'static,
        Out: Send + 'static,
        E: Into<BoxError>,
        F: FnOnce(In) -> Result<Out, E> + Send + 'static,
        R: FnOnce(Out) + Send + 'static,
    {
        self.map_with(input, transform, on_result, self.default_error_handler.clone())
    }

    /// [`Dispatcher::map`] with an explicit error handler.
    pub fn map_with<In, Out, E, F, R>(
        &self,
        input: In,
        transform: F,
        on_result: R,
        on_error: ErrorHandler,
    ) -> Subscription
    where
        In: Send + 'static,
        Out: Send + 'static,
        E: Into<BoxError>,
        F: FnOnce(In) -> Result<Out, E> + Send + 'static,
        R: FnOnce(Out) + Send + 'static,
    {
        self.hop(
            DispatchId::generate(),
            input,
            move |input| transform(input).map_err(Into::into),
            move |output| {
                on_result(output);
                Ok(())
            },
            on_error,
        )
    }

    // ========================================
    // 内部
    // ========================================

    pub(crate) fn delivery(&self, dispatch_id: DispatchId, on_error: ErrorHandler) -> Delivery {
        Delivery::new(
            Subscription::new(dispatch_id),
            Arc::clone(&self.ui),
            on_error,
        )
    }

    /// background step → UI step の共通実装
    fn hop<In, Mid, B, U>(
        &self,
        dispatch_id: DispatchId,
        input: In,
        background_step: B,
        ui_step: U,
        on_error: ErrorHandler,
    ) -> Subscription
    where
        In: Send + 'static,
        Mid: Send + 'static,
        B: FnOnce(In) -> Result<Mid, BoxError> + Send + 'static,
        U: FnOnce(Mid) -> Result<(), BoxError> + Send + 'static,
    {
        let delivery = self.delivery(dispatch_id, on_error);
        let subscription = delivery.subscription.clone();

        let submitted = self.background.execute(Box::new(move || {
            if delivery.subscription.is_unsubscribed() {
                debug!(%dispatch_id, "cancelled before background step");
                return;
            }
            match run_guarded(dispatch_id, move || background_step(input)) {
                Ok(mid) => {
                    delivery.post_step(move || ui_step(mid), true, OnFailure::Close);
                }
                Err(err) => {
                    debug!(%dispatch_id, error = %err, "background step failed");
                    delivery.post_error(err, true);
                }
            }
        }));

        match submitted {
            Ok(()) => debug!(%dispatch_id, "dispatched to background"),
            Err(err) => {
                // 何も実行されないので、ここで終端とする
                subscription.unsubscribe();
                warn!(%dispatch_id, error = %err, "background executor refused dispatch");
            }
        }
        subscription
    }
}

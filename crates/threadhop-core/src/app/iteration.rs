//! Iteration - コレクションの要素ごとに background 変換 → UI で受け取る
//!
//! # 順序
//! 要素は 1 つの background ジョブの中で入力順に変換され、結果も入力順に UI へ post されます。
//! 並列化はしません（UI 側の配送順 = 入力順を保証するため）。
//!
//! # 失敗時
//! `ItemErrorPolicy` で決めます。
//! - `Abort`: 最初の失敗を ErrorHandler に渡し、以降の要素は処理しない
//! - `Continue`: 失敗した要素ごとに ErrorHandler を呼び、残りの要素を続ける

use std::sync::{Arc, Mutex, PoisonError};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::delivery::{OnFailure, run_guarded};
use super::dispatcher::Dispatcher;
use super::subscription::Subscription;
use crate::domain::{BoxError, DispatchId};
use crate::ports::ErrorHandler;

/// What `for_each` does after one item fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemErrorPolicy {
    #[default]
    Abort,
    Continue,
}

impl ItemErrorPolicy {
    fn on_failure(self) -> OnFailure {
        match self {
            ItemErrorPolicy::Abort => OnFailure::Close,
            ItemErrorPolicy::Continue => OnFailure::KeepOpen,
        }
    }
}

impl Dispatcher {
    /// Transforms each item in the background and hands each result to
    /// `on_result` on the UI context, in input order.
    ///
    /// Uses the configured `item_error_policy` and the default error handler.
    pub fn for_each<I, T, U, E, F, R>(&self, items: I, transform: F, on_result: R) -> Subscription
    where
        I: IntoIterator<Item = T>,
        I::IntoIter: Send + 'static,
        T: Send + 'static,
        U: Send + 'static,
        E: Into<BoxError>,
        F: FnMut(T) -> Result<U, E> + Send + 'static,
        R: FnMut(U) + Send + 'static,
    {
        self.for_each_with(
            items,
            transform,
            on_result,
            self.default_error_handler.clone(),
            self.config.item_error_policy,
        )
    }

    /// [`Dispatcher::for_each`] with an explicit error handler and policy.
    pub fn for_each_with<I, T, U, E, F, R>(
        &self,
        items: I,
        mut transform: F,
        on_result: R,
        on_error: ErrorHandler,
        policy: ItemErrorPolicy,
    ) -> Subscription
    where
        I: IntoIterator<Item = T>,
        I::IntoIter: Send + 'static,
        T: Send + 'static,
        U: Send + 'static,
        E: Into<BoxError>,
        F: FnMut(T) -> Result<U, E> + Send + 'static,
        R: FnMut(U) + Send + 'static,
    {
        let delivery = self.delivery(DispatchId::generate(), on_error);
        let subscription = delivery.subscription.clone();
        let dispatch_id = delivery.dispatch_id;
        let iter = items.into_iter();
        let on_result = Arc::new(Mutex::new(on_result));

        let submitted = self.background.execute(Box::new(move || {
            for (position, item) in iter.enumerate() {
                if delivery.subscription.is_unsubscribed() {
                    debug!(%dispatch_id, position, "iteration cancelled");
                    return;
                }
                match run_guarded(dispatch_id, || transform(item).map_err(Into::into)) {
                    Ok(value) => {
                        let on_result = Arc::clone(&on_result);
                        let posted = delivery.post_step(
                            move || {
                                let mut on_result =
                                    on_result.lock().unwrap_or_else(PoisonError::into_inner);
                                (*on_result)(value);
                                Ok(())
                            },
                            false,
                            policy.on_failure(),
                        );
                        if !posted {
                            return;
                        }
                    }
                    Err(err) => {
                        debug!(%dispatch_id, position, error = %err, "item transform failed");
                        let abort = policy == ItemErrorPolicy::Abort;
                        if !delivery.post_error(err, abort) || abort {
                            return;
                        }
                    }
                }
            }
            // 全要素を配送し終えたら完了
            delivery.post_step(|| Ok(()), true, OnFailure::Close);
        }));

        if let Err(err) = submitted {
            subscription.unsubscribe();
            warn!(%dispatch_id, error = %err, "background executor refused iteration");
        }
        subscription
    }

    /// Runs `action` for each item synchronously on the calling thread.
    ///
    /// Stops at the first failure, which goes to the default error handler.
    /// The returned subscription is already closed.
    pub fn for_each_sync<I, T, E, F>(&self, items: I, mut action: F) -> Subscription
    where
        I: IntoIterator<Item = T>,
        E: Into<BoxError>,
        F: FnMut(T) -> Result<(), E>,
    {
        let dispatch_id = DispatchId::generate();
        for item in items {
            if let Err(err) = run_guarded(dispatch_id, || action(item).map_err(Into::into)) {
                self.default_error_handler.handle(err);
                break;
            }
        }
        Subscription::closed(dispatch_id)
    }
}

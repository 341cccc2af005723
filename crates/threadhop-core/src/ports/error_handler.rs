//! ErrorHandler - 失敗した dispatch の通知先
//!
//! グローバルなデフォルトは持ちません。`DispatcherBuilder::error_handler()` で注入するか、
//! `DispatcherConfig::error_tag` から作られる `ErrorHandler::logging()` が使われます。

use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use tracing::error;

use crate::domain::{TaskError, panic_message};

/// Receives the terminal error of a dispatch, on the UI context.
///
/// Cheap to clone; clones share the same callback.
#[derive(Clone)]
pub struct ErrorHandler {
    callback: Arc<dyn Fn(TaskError) + Send + Sync>,
    name: Arc<str>,
}

impl ErrorHandler {
    pub fn new(callback: impl Fn(TaskError) + Send + Sync + 'static) -> Self {
        Self {
            callback: Arc::new(callback),
            name: Arc::from("custom"),
        }
    }

    /// Logs the error under `tag` and swallows it.
    pub fn logging(tag: impl Into<String>) -> Self {
        let tag: Arc<str> = Arc::from(tag.into());
        let log_tag = Arc::clone(&tag);
        Self {
            callback: Arc::new(move |err: TaskError| {
                error!(
                    tag = %log_tag,
                    dispatch_id = %err.dispatch_id(),
                    panicked = err.is_panic(),
                    error = %err,
                    "task execution failed"
                );
            }),
            name: tag,
        }
    }

    /// Drops every error.
    pub fn ignore() -> Self {
        Self {
            callback: Arc::new(|_| {}),
            name: Arc::from("ignore"),
        }
    }

    /// Invokes the callback. A panicking handler is logged and swallowed.
    pub fn handle(&self, err: TaskError) {
        let dispatch_id = err.dispatch_id();
        if let Err(payload) = catch_unwind(AssertUnwindSafe(|| (self.callback)(err))) {
            error!(
                handler = %self.name,
                %dispatch_id,
                panic = %panic_message(&*payload),
                "error handler panicked"
            );
        }
    }
}

impl fmt::Debug for ErrorHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ErrorHandler")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

//! Errors - タスク実行エラー
//!
//! エラーの分類は 1 つだけ（task execution failure）です。
//! バリアントは「どう失敗したか」（Err を返した / panic した）だけを区別し、
//! background / UI のどちらで起きたかは区別しません。リトライはしません。

use std::any::Any;

use thiserror::Error;

use super::ids::DispatchId;

/// Error type returned by background steps, UI steps and callbacks.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// TaskError is the terminal failure of one dispatch.
#[derive(Debug, Error)]
pub enum TaskError {
    #[error("{dispatch_id} failed: {source}")]
    Failed {
        dispatch_id: DispatchId,
        source: BoxError,
    },

    #[error("{dispatch_id} panicked: {message}")]
    Panicked {
        dispatch_id: DispatchId,
        message: String,
    },
}

impl TaskError {
    pub fn failed(dispatch_id: DispatchId, source: impl Into<BoxError>) -> Self {
        Self::Failed {
            dispatch_id,
            source: source.into(),
        }
    }

    pub fn panicked(dispatch_id: DispatchId, payload: &(dyn Any + Send)) -> Self {
        Self::Panicked {
            dispatch_id,
            message: panic_message(payload),
        }
    }

    pub fn dispatch_id(&self) -> DispatchId {
        match self {
            Self::Failed { dispatch_id, .. } | Self::Panicked { dispatch_id, .. } => *dispatch_id,
        }
    }

    pub fn is_panic(&self) -> bool {
        matches!(self, Self::Panicked { .. })
    }
}

/// ExecutorError is returned when an executor refuses a job.
#[derive(Debug, Error)]
pub enum ExecutorError {
    #[error("ui loop has shut down")]
    UiClosed,

    #[error("background executor rejected the job: {0}")]
    Rejected(String),
}

/// Extracts the message of a panic payload (`&str` or `String`).
pub fn panic_message(payload: &(dyn Any + Send)) -> String {
    match payload.downcast_ref::<&str>() {
        Some(p) => (*p).to_string(),
        None => match payload.downcast_ref::<String>() {
            Some(p) => p.clone(),
            None => String::from("unknown panic"),
        },
    }
}

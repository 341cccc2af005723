//! TokioBackground - tokio の blocking pool を background executor として使う
//!
//! タスクの background step は同期関数（I/O や重い計算）なので、
//! async worker ではなく `spawn_blocking` の専用スレッド群で実行します。

use tokio::runtime::Handle;

use crate::domain::ExecutorError;
use crate::ports::{BackgroundExecutor, Job};

/// Background executor backed by a tokio runtime's blocking pool.
#[derive(Debug, Clone)]
pub struct TokioBackground {
    handle: Handle,
}

impl TokioBackground {
    pub fn new(handle: Handle) -> Self {
        Self { handle }
    }

    /// Uses the runtime of the calling context, if any.
    pub fn try_current() -> Option<Self> {
        Handle::try_current().ok().map(Self::new)
    }

    pub fn handle(&self) -> &Handle {
        &self.handle
    }
}

impl BackgroundExecutor for TokioBackground {
    fn execute(&self, job: Job) -> Result<(), ExecutorError> {
        // JoinHandle は捨てる（detach）。結果は job 自身が UI へ post する
        drop(self.handle.spawn_blocking(job));
        Ok(())
    }
}

//! Executor ports - ホスト環境が提供する 2 つの実行コンテキスト
//!
//! # 実装
//! - **TokioBackground**: tokio の blocking pool（`impls::tokio_background`）
//! - **UiHandle**: 単一スレッドの UI run loop（`impls::ui_loop`）

use crate::domain::ExecutorError;

/// A boxed unit of work handed to an executor.
pub type Job = Box<dyn FnOnce() + Send + 'static>;

/// BackgroundExecutor は UI スレッド以外（worker pool）でジョブを実行
///
/// # 契約
/// - `execute()` はブロックしない（ジョブを受け付けたらすぐ戻る）
/// - ジョブ同士の実行順序は保証しない
pub trait BackgroundExecutor: Send + Sync {
    fn execute(&self, job: Job) -> Result<(), ExecutorError>;
}

/// UiExecutor は UI/main コンテキストでジョブを実行
///
/// # 契約
/// - すべてのジョブは同じ論理スレッドで実行される
/// - `post()` された順（FIFO）に 1 つずつ実行される
/// - `post()` はブロックしない
pub trait UiExecutor: Send + Sync {
    fn post(&self, job: Job) -> Result<(), ExecutorError>;
}

//! Ports - 抽象化レイヤー
//!
//! このモジュールはホスト環境が提供する外部コラボレータへのインターフェースを定義します。
//!
//! - **BackgroundExecutor**: UI スレッド外でジョブを実行する worker pool
//! - **UiExecutor**: UI/main スレッドで FIFO にジョブを実行する run loop
//! - **ErrorHandler**: 失敗した dispatch の通知先

pub mod error_handler;
pub mod executor;

pub use self::error_handler::ErrorHandler;
pub use self::executor::{BackgroundExecutor, Job, UiExecutor};

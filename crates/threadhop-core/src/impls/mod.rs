//! Impls - ports の実装
//!
//! # 含まれる実装
//! - **TokioBackground**: tokio blocking pool による BackgroundExecutor
//! - **UiLoop / UiHandle**: mpsc チャネルによる単一スレッドの UiExecutor

pub mod tokio_background;
pub mod ui_loop;

pub use self::tokio_background::TokioBackground;
pub use self::ui_loop::{DEFAULT_UI_BULK_SIZE, UiHandle, UiLoop, UiThread, ui_loop};

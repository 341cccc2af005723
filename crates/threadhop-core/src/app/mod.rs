//! App - アプリケーション層
//!
//! ports を組み合わせて dispatcher の操作を実装します。
//!
//! # 主要コンポーネント
//! - **DispatcherBuilder**: Dispatcher の構築とワイヤリング
//! - **Dispatcher**: background → UI のホップ（do_in_ui / do_in_background / execute / map）
//! - **Timer**: polling / delay（`timer.rs`）
//! - **Iteration**: for_each / for_each_sync（`iteration.rs`）
//! - **Subscription**: キャンセル用ハンドル

pub mod builder;
pub mod config;
mod delivery;
pub mod dispatcher;
pub mod iteration;
pub mod subscription;
mod timer;

#[cfg(test)]
pub(crate) mod testutil;

// 主要な型を再エクスポート
pub use self::builder::{BuildError, DispatcherBuilder};
pub use self::config::{ConfigError, DEFAULT_ERROR_TAG, DispatcherConfig};
pub use self::dispatcher::Dispatcher;
pub use self::iteration::ItemErrorPolicy;
pub use self::subscription::Subscription;

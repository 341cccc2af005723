//! threadhop-core
//!
//! Background → UI のスレッドホップを行う dispatcher。
//!
//! # モジュール構成
//! - **domain**: ドメインモデル（ids, task, time_unit, errors）
//! - **ports**: 抽象化レイヤー（BackgroundExecutor, UiExecutor, ErrorHandler）
//! - **impls**: 実装（TokioBackground, UiLoop）
//! - **app**: アプリケーションロジック（builder, dispatcher, timer, iteration, subscription）
//!
//! # 例
//! ```no_run
//! use threadhop_core::{DispatcherBuilder, DEFAULT_UI_BULK_SIZE, ui_loop};
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let (ui, ui_loop) = ui_loop(DEFAULT_UI_BULK_SIZE);
//! let _ui_thread = ui_loop.spawn_thread()?;
//! let dispatcher = DispatcherBuilder::new(ui).build()?;
//!
//! dispatcher.map(
//!     21,
//!     |x: i32| Ok::<_, std::io::Error>(x * 2),
//!     |answer| println!("answer = {answer}"),
//! );
//! # Ok(())
//! # }
//! ```

pub mod app;
pub mod domain;
pub mod impls;
pub mod ports;

pub use crate::app::{
    BuildError, ConfigError, Dispatcher, DispatcherBuilder, DispatcherConfig, ItemErrorPolicy,
    Subscription,
};
pub use crate::domain::{
    BackgroundTask, BoxError, CombinedTask, DispatchId, TaskEnvelope, TaskError, TimeUnit, UiTask,
};
pub use crate::impls::{DEFAULT_UI_BULK_SIZE, TokioBackground, UiHandle, UiLoop, ui_loop};
pub use crate::ports::ErrorHandler;

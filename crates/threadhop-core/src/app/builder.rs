//! DispatcherBuilder - Dispatcher の構築とワイヤリング
//!
//! UI executor だけが必須です。それ以外は省略するとデフォルトになります。
//! - background: 現在の tokio runtime の blocking pool（`TokioBackground`）
//! - error handler: `config.error_tag` でタグ付けしてログに出す
//!
//! # 使用例
//! ```ignore
//! let (ui, ui_loop) = ui_loop(DEFAULT_UI_BULK_SIZE);
//! let dispatcher = DispatcherBuilder::new(ui)
//!     .config(DispatcherConfig::load("threadhop.toml")?)
//!     .build()?;
//! ```

use std::sync::Arc;

use tokio::runtime::Handle;
use tracing::debug;

use super::config::DispatcherConfig;
use super::dispatcher::Dispatcher;
use crate::impls::TokioBackground;
use crate::ports::{BackgroundExecutor, ErrorHandler, UiExecutor};

/// BuildError は Dispatcher 構築時のエラー
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("no tokio runtime: call build() inside a runtime or pass one with runtime()")]
    NoRuntime,
}

pub struct DispatcherBuilder {
    ui: Arc<dyn UiExecutor>,
    background: Option<Arc<dyn BackgroundExecutor>>,
    runtime: Option<Handle>,
    error_handler: Option<ErrorHandler>,
    config: DispatcherConfig,
}

impl DispatcherBuilder {
    pub fn new(ui: impl UiExecutor + 'static) -> Self {
        Self {
            ui: Arc::new(ui),
            background: None,
            runtime: None,
            error_handler: None,
            config: DispatcherConfig::default(),
        }
    }

    /// Replaces the background pool.
    pub fn background(mut self, background: impl BackgroundExecutor + 'static) -> Self {
        self.background = Some(Arc::new(background));
        self
    }

    /// Runtime used for timers (and for the default background pool).
    pub fn runtime(mut self, runtime: Handle) -> Self {
        self.runtime = Some(runtime);
        self
    }

    /// Handler used when an operation is not given one explicitly.
    pub fn error_handler(mut self, handler: ErrorHandler) -> Self {
        self.error_handler = Some(handler);
        self
    }

    pub fn config(mut self, config: DispatcherConfig) -> Self {
        self.config = config;
        self
    }

    /// Fails fast when no runtime was given and none is current.
    pub fn build(self) -> Result<Dispatcher, BuildError> {
        let runtime = match self.runtime {
            Some(runtime) => runtime,
            None => Handle::try_current().map_err(|_| BuildError::NoRuntime)?,
        };
        let background = self
            .background
            .unwrap_or_else(|| Arc::new(TokioBackground::new(runtime.clone())));
        let default_error_handler = self
            .error_handler
            .unwrap_or_else(|| ErrorHandler::logging(self.config.error_tag.clone()));

        debug!(
            error_tag = %self.config.error_tag,
            default_time_unit = ?self.config.default_time_unit,
            item_error_policy = ?self.config.item_error_policy,
            "dispatcher built"
        );
        Ok(Dispatcher {
            background,
            ui: self.ui,
            runtime,
            default_error_handler,
            config: self.config,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::ItemErrorPolicy;
    use crate::app::testutil::ManualBackground;
    use crate::domain::TimeUnit;
    use crate::impls::{DEFAULT_UI_BULK_SIZE, ui_loop};

    #[test]
    fn build_outside_runtime_fails_fast() {
        let (ui, _loop) = ui_loop(DEFAULT_UI_BULK_SIZE);
        let err = DispatcherBuilder::new(ui).build().err().unwrap();
        assert!(matches!(err, BuildError::NoRuntime));
    }

    #[test]
    fn explicit_runtime_allows_build_outside_it() {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()
            .unwrap();
        let (ui, _loop) = ui_loop(DEFAULT_UI_BULK_SIZE);

        let dispatcher = DispatcherBuilder::new(ui)
            .runtime(rt.handle().clone())
            .build()
            .unwrap();
        assert_eq!(dispatcher.config(), &DispatcherConfig::default());
    }

    #[tokio::test]
    async fn defaults_come_from_config() {
        let (ui, _loop) = ui_loop(DEFAULT_UI_BULK_SIZE);
        let config = DispatcherConfig {
            error_tag: "Gallery".to_string(),
            default_time_unit: TimeUnit::Milliseconds,
            item_error_policy: ItemErrorPolicy::Continue,
            ..Default::default()
        };

        let dispatcher = DispatcherBuilder::new(ui)
            .background(ManualBackground::default())
            .config(config.clone())
            .build()
            .unwrap();

        assert_eq!(dispatcher.config(), &config);
        assert!(format!("{:?}", dispatcher.default_error_handler()).contains("Gallery"));
    }
}

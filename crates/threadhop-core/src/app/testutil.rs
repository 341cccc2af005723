//! テスト用の部品
//!
//! - `manual()`: background も UI も手で回す（決定的）
//! - `harness()`: tokio の blocking pool + 専用 UI スレッド（実スレッド）

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::ThreadId;
use std::time::Duration;

use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use super::builder::DispatcherBuilder;
use super::config::DispatcherConfig;
use super::dispatcher::Dispatcher;
use crate::domain::{DispatchId, ExecutorError};
use crate::impls::{UiLoop, UiThread, ui_loop};
use crate::ports::{BackgroundExecutor, ErrorHandler, Job};

#[derive(Debug, PartialEq)]
pub(crate) enum Event {
    Value(i64),
    Text(String),
    Tick(u64),
    At(tokio::time::Instant),
    Error {
        dispatch_id: DispatchId,
        panicked: bool,
        message: String,
    },
}

/// Event channel plus an error handler that records into it.
pub(crate) fn recorder() -> (UnboundedSender<Event>, UnboundedReceiver<Event>, ErrorHandler) {
    let (tx, rx) = mpsc::unbounded_channel();
    let errors = tx.clone();
    let handler = ErrorHandler::new(move |err| {
        let _ = errors.send(Event::Error {
            dispatch_id: err.dispatch_id(),
            panicked: err.is_panic(),
            message: err.to_string(),
        });
    });
    (tx, rx, handler)
}

/// Background executor that only queues jobs until `run_all()`.
#[derive(Clone, Default)]
pub(crate) struct ManualBackground {
    jobs: Arc<Mutex<VecDeque<Job>>>,
    refusing: Arc<AtomicBool>,
}

impl ManualBackground {
    /// Runs queued jobs (including ones queued while running). Returns the count.
    pub(crate) fn run_all(&self) -> usize {
        let mut count = 0;
        loop {
            let job = self.jobs.lock().unwrap().pop_front();
            match job {
                Some(job) => {
                    job();
                    count += 1;
                }
                None => return count,
            }
        }
    }

    pub(crate) fn refuse(&self) {
        self.refusing.store(true, Ordering::SeqCst);
    }
}

impl BackgroundExecutor for ManualBackground {
    fn execute(&self, job: Job) -> Result<(), ExecutorError> {
        if self.refusing.load(Ordering::SeqCst) {
            return Err(ExecutorError::Rejected("manual background refusing".into()));
        }
        self.jobs.lock().unwrap().push_back(job);
        Ok(())
    }
}

pub(crate) struct Manual {
    pub(crate) dispatcher: Dispatcher,
    pub(crate) background: ManualBackground,
    pub(crate) ui: UiLoop,
}

/// Must be called inside a tokio runtime.
pub(crate) fn manual(on_error: ErrorHandler) -> Manual {
    manual_with_config(on_error, DispatcherConfig::default())
}

pub(crate) fn manual_with_config(on_error: ErrorHandler, config: DispatcherConfig) -> Manual {
    let (handle, ui) = ui_loop(config.ui_bulk_size);
    let background = ManualBackground::default();
    let dispatcher = DispatcherBuilder::new(handle)
        .background(background.clone())
        .error_handler(on_error)
        .config(config)
        .build()
        .unwrap();
    Manual {
        dispatcher,
        background,
        ui,
    }
}

pub(crate) struct Harness {
    pub(crate) dispatcher: Dispatcher,
    pub(crate) ui_thread_id: ThreadId,
    _ui: UiThread,
}

/// Real threads: tokio blocking pool + a `ui-main` thread.
pub(crate) fn harness(on_error: ErrorHandler) -> Harness {
    let (handle, ui) = ui_loop(DispatcherConfig::default().ui_bulk_size);
    let dispatcher = DispatcherBuilder::new(handle)
        .error_handler(on_error)
        .build()
        .unwrap();
    let ui = ui.spawn_thread().unwrap();
    Harness {
        dispatcher,
        ui_thread_id: ui.thread_id(),
        _ui: ui,
    }
}

pub(crate) async fn next<T>(rx: &mut UnboundedReceiver<T>) -> T {
    tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("timed out waiting for delivery")
        .expect("channel closed")
}

//! UiLoop - 単一スレッドの UI run loop
//!
//! `UiHandle`（送信側, Send + Clone）がジョブをチャネルに積み、
//! `UiLoop`（受信側）が 1 つのスレッドで FIFO に実行します。
//!
//! # 駆動方法（ホストが選ぶ）
//! - `run_pending()`: ホスト自身のイベントループから毎フレーム呼ぶ（最大 bulk_size 件）
//! - `run().await`: LocalSet などの上で、全 UiHandle が drop されるまで回す
//! - `spawn_thread()`: 専用の `ui-main` スレッドを起動する

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::thread::{self, JoinHandle, ThreadId};

use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::sync::mpsc::error::TryRecvError;
use tracing::{debug, error, warn};

use crate::domain::{ExecutorError, panic_message};
use crate::ports::{Job, UiExecutor};

pub const DEFAULT_UI_BULK_SIZE: usize = 100;

/// Creates a connected handle/loop pair.
pub fn ui_loop(bulk_size: usize) -> (UiHandle, UiLoop) {
    let (sender, receiver) = mpsc::unbounded_channel();
    (
        UiHandle { sender },
        UiLoop {
            receiver,
            bulk_size: bulk_size.max(1),
        },
    )
}

/// Thread-safe sender side of the UI loop.
#[derive(Debug, Clone)]
pub struct UiHandle {
    sender: UnboundedSender<Job>,
}

impl UiHandle {
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }
}

impl UiExecutor for UiHandle {
    fn post(&self, job: Job) -> Result<(), ExecutorError> {
        self.sender.send(job).map_err(|_| ExecutorError::UiClosed)
    }
}

/// Receiver side; whoever drives it *is* the UI context.
#[derive(Debug)]
pub struct UiLoop {
    receiver: UnboundedReceiver<Job>,
    bulk_size: usize,
}

impl UiLoop {
    /// Runs queued jobs without waiting, at most `bulk_size` of them.
    /// Returns the number of jobs run.
    pub fn run_pending(&mut self) -> usize {
        let mut count = 0;
        while count < self.bulk_size {
            match self.receiver.try_recv() {
                Ok(job) => {
                    run_job(job);
                    count += 1;
                }
                Err(TryRecvError::Empty | TryRecvError::Disconnected) => break,
            }
        }
        count
    }

    /// Runs jobs until every `UiHandle` has been dropped.
    pub async fn run(mut self) {
        while let Some(job) = self.receiver.recv().await {
            run_job(job);
        }
        debug!("ui loop finished");
    }

    /// Drops queued jobs without running them. Returns the number discarded.
    pub fn discard_pending(&mut self) -> usize {
        let mut count = 0;
        while self.receiver.try_recv().is_ok() {
            count += 1;
        }
        if count > 0 {
            warn!(task_count = count, "discarded pending ui jobs");
        }
        count
    }

    /// Moves the loop onto a dedicated `ui-main` thread.
    pub fn spawn_thread(mut self) -> std::io::Result<UiThread> {
        let join = thread::Builder::new()
            .name("ui-main".to_string())
            .spawn(move || {
                while let Some(job) = self.receiver.blocking_recv() {
                    run_job(job);
                }
                debug!("ui thread finished");
            })?;
        let thread_id = join.thread().id();
        Ok(UiThread { join, thread_id })
    }
}

/// Handle of a UI loop running on its own thread.
#[derive(Debug)]
pub struct UiThread {
    join: JoinHandle<()>,
    thread_id: ThreadId,
}

impl UiThread {
    pub fn thread_id(&self) -> ThreadId {
        self.thread_id
    }

    /// Waits for the thread; it exits once every `UiHandle` has been dropped.
    pub fn join(self) -> thread::Result<()> {
        self.join.join()
    }
}

fn run_job(job: Job) {
    // 1 つのジョブの panic でループを止めない
    if let Err(payload) = catch_unwind(AssertUnwindSafe(job)) {
        error!(panic = %panic_message(&*payload), "ui job panicked");
    }
}

//! threadhop - dispatcher のデモ CLI
//!
//! UI ループを専用の `ui-main` スレッドで回し、各サブコマンドで
//! background → UI のホップを 1 種類ずつ試します。
//!
//! ```text
//! RUST_LOG=debug threadhop execute 7
//! threadhop --config threadhop.toml for-each 1 2 -3 4 --keep-going
//! ```

use std::error::Error;
use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tokio::sync::mpsc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use threadhop_core::domain::{combined_task, ui_task};
use threadhop_core::{
    BoxError, Dispatcher, DispatcherBuilder, DispatcherConfig, ErrorHandler, ItemErrorPolicy,
    Subscription, TaskEnvelope, TimeUnit, ui_loop,
};

#[derive(Parser)]
#[command(name = "threadhop", version, about = "Background to UI thread hop demo")]
struct Cli {
    /// Dispatcher config (TOML)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Square a number in the background and print it on the UI thread
    Execute { value: i64 },
    /// Fail in the background and let the error handler report it
    Fail {
        #[arg(default_value = "intentional failure")]
        message: String,
    },
    /// Print a tick on the UI thread every interval
    Poll {
        #[arg(long, default_value_t = 3)]
        ticks: u64,
        #[arg(long, default_value_t = 200)]
        interval_ms: u64,
    },
    /// Print once on the UI thread after a delay
    Delay {
        #[arg(long, default_value_t = 500)]
        ms: u64,
    },
    /// Square each item in order; negative items fail
    ForEach {
        #[arg(allow_negative_numbers = true)]
        items: Vec<i64>,
        /// Keep going after a failing item
        #[arg(long)]
        keep_going: bool,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => DispatcherConfig::load(path)?,
        None => DispatcherConfig::default(),
    };

    // (A) UI ループを専用スレッドで起動
    let (ui, ui_loop) = ui_loop(config.ui_bulk_size);
    let ui_thread = ui_loop.spawn_thread()?;

    // (B) Dispatcher を組み立てる（エラーはログに出す）
    let dispatcher = DispatcherBuilder::new(ui)
        .error_handler(ErrorHandler::logging(config.error_tag.clone()))
        .config(config)
        .build()?;

    // (C) サブコマンドを実行し、Subscription が閉じるまで待つ
    let subscription = run(&dispatcher, cli.command).await;
    wait_closed(&subscription).await;

    // (D) 全 UiHandle を drop すると UI スレッドが終了する
    drop(dispatcher);
    tokio::task::spawn_blocking(move || ui_thread.join())
        .await?
        .map_err(|_| "ui thread panicked")?;
    info!("done");
    Ok(())
}

async fn run(dispatcher: &Dispatcher, command: Command) -> Subscription {
    match command {
        Command::Execute { value } => {
            let task = combined_task(
                |x: i64| Ok(x.saturating_mul(x)),
                move |squared: i64| {
                    println!("{value}^2 = {squared} (on {})", thread_name());
                    Ok(())
                },
            );
            dispatcher.execute(TaskEnvelope::new(task, value))
        }
        Command::Fail { message } => {
            let task = combined_task(
                move |()| -> Result<(), BoxError> { Err(message.clone().into()) },
                |()| Ok(()),
            );
            dispatcher.execute(TaskEnvelope::new(task, ()))
        }
        Command::Poll { ticks, interval_ms } => {
            let (done, mut done_rx) = mpsc::unbounded_channel();
            let subscription = dispatcher.polling_with(
                0,
                interval_ms,
                TimeUnit::Milliseconds,
                move |n| {
                    println!("tick {n} (on {})", thread_name());
                    if n + 1 >= ticks {
                        let _ = done.send(());
                    }
                    Ok::<_, BoxError>(())
                },
                dispatcher.default_error_handler().clone(),
            );
            let _ = done_rx.recv().await;
            subscription.unsubscribe();
            subscription
        }
        Command::Delay { ms } => dispatcher.delay_with(
            ms,
            TimeUnit::Milliseconds,
            move |_| {
                println!("fired after {ms}ms (on {})", thread_name());
                Ok::<_, BoxError>(())
            },
            dispatcher.default_error_handler().clone(),
        ),
        Command::ForEach { items, keep_going } => {
            let policy = if keep_going {
                ItemErrorPolicy::Continue
            } else {
                dispatcher.config().item_error_policy
            };
            let hello = ui_task(move |count: usize| {
                println!("processing {count} items");
                Ok(())
            });
            dispatcher.do_in_ui(TaskEnvelope::new(hello, items.len()));
            dispatcher.for_each_with(
                items,
                |x: i64| {
                    if x < 0 {
                        return Err(format!("negative item {x}"));
                    }
                    Ok(x.saturating_mul(x))
                },
                |squared| println!("{squared} (on {})", thread_name()),
                dispatcher.default_error_handler().clone(),
                policy,
            )
        }
    }
}

async fn wait_closed(subscription: &Subscription) {
    while !subscription.is_unsubscribed() {
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

fn thread_name() -> String {
    std::thread::current()
        .name()
        .unwrap_or("unnamed")
        .to_string()
}

//! Timer - ポーリングと遅延実行
//!
//! タイマー自体は tokio runtime 上の async task で回し、
//! tick のたびにコールバックを UI コンテキストへ post します。
//! `on_tick` にはリアクティブ版と同じく 0 始まりの tick 番号が渡ります。

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::time::{Instant, MissedTickBehavior};
use tracing::debug;

use super::delivery::OnFailure;
use super::dispatcher::Dispatcher;
use super::subscription::Subscription;
use crate::domain::{BoxError, DispatchId, TimeUnit};
use crate::ports::ErrorHandler;

/// tokio の interval は周期 0 を受け付けない
const MIN_PERIOD: Duration = Duration::from_millis(1);

/// 飽和した Duration の代わりに使う「十分先」（tokio の sleep と同じ 30 年）
const FAR_FUTURE: Duration = Duration::from_secs(86400 * 365 * 30);

/// `now + delay`, capped at `FAR_FUTURE` so huge delays never overflow `Instant`.
fn deadline_after(delay: Duration) -> Instant {
    Instant::now() + delay.min(FAR_FUTURE)
}

impl Dispatcher {
    /// Polls every `interval` (default time unit), starting immediately.
    pub fn polling<E, F>(&self, interval: u64, on_tick: F) -> Subscription
    where
        E: Into<BoxError>,
        F: FnMut(u64) -> Result<(), E> + Send + 'static,
    {
        self.polling_after(0, interval, on_tick)
    }

    /// Polls every `interval`, first after `initial_delay` (default time unit).
    pub fn polling_after<E, F>(&self, initial_delay: u64, interval: u64, on_tick: F) -> Subscription
    where
        E: Into<BoxError>,
        F: FnMut(u64) -> Result<(), E> + Send + 'static,
    {
        self.polling_with(
            initial_delay,
            interval,
            self.config.default_time_unit,
            on_tick,
            self.default_error_handler.clone(),
        )
    }

    /// Invokes `on_tick` on the UI context after `initial_delay`, then every
    /// `interval`, until unsubscribed.
    ///
    /// A failing tick is terminal: the error handler runs once and polling stops.
    /// While a tick is still waiting for the UI, later ticks are skipped, so a
    /// stalled UI never holds more than one pending tick.
    pub fn polling_with<E, F>(
        &self,
        initial_delay: u64,
        interval: u64,
        unit: TimeUnit,
        on_tick: F,
        on_error: ErrorHandler,
    ) -> Subscription
    where
        E: Into<BoxError>,
        F: FnMut(u64) -> Result<(), E> + Send + 'static,
    {
        let delivery = self.delivery(DispatchId::generate(), on_error);
        let subscription = delivery.subscription.clone();
        let dispatch_id = delivery.dispatch_id;

        let mut period = unit.to_duration(interval).min(FAR_FUTURE);
        if period.is_zero() {
            debug!(%dispatch_id, "zero polling interval clamped to 1ms");
            period = MIN_PERIOD;
        }
        let start = deadline_after(unit.to_duration(initial_delay));
        let on_tick = Arc::new(Mutex::new(on_tick));
        let pending = Arc::new(AtomicBool::new(false));

        let timer = self.runtime.spawn(async move {
            let mut ticker = tokio::time::interval_at(start, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            let mut index = 0_u64;
            loop {
                ticker.tick().await;
                if delivery.subscription.is_unsubscribed() {
                    break;
                }
                if pending.swap(true, Ordering::AcqRel) {
                    debug!(%dispatch_id, index, "previous tick not yet run on ui, skipped");
                    continue;
                }
                let on_tick = Arc::clone(&on_tick);
                let pending = Arc::clone(&pending);
                let posted = delivery.post_step(
                    move || {
                        pending.store(false, Ordering::Release);
                        let mut on_tick = on_tick.lock().unwrap_or_else(PoisonError::into_inner);
                        (*on_tick)(index).map_err(Into::into)
                    },
                    false,
                    OnFailure::Close,
                );
                if !posted {
                    break;
                }
                index += 1;
            }
            debug!(%dispatch_id, "polling stopped");
        });
        subscription.attach_timer(timer.abort_handle());
        debug!(%dispatch_id, ?period, "polling started");
        subscription
    }

    /// Invokes `on_tick(0)` once on the UI context after `delay_time`
    /// (default time unit).
    pub fn delay<E, F>(&self, delay_time: u64, on_tick: F) -> Subscription
    where
        E: Into<BoxError>,
        F: FnOnce(u64) -> Result<(), E> + Send + 'static,
    {
        self.delay_with(
            delay_time,
            self.config.default_time_unit,
            on_tick,
            self.default_error_handler.clone(),
        )
    }

    /// [`Dispatcher::delay`] with an explicit unit and error handler.
    pub fn delay_with<E, F>(
        &self,
        delay_time: u64,
        unit: TimeUnit,
        on_tick: F,
        on_error: ErrorHandler,
    ) -> Subscription
    where
        E: Into<BoxError>,
        F: FnOnce(u64) -> Result<(), E> + Send + 'static,
    {
        let delivery = self.delivery(DispatchId::generate(), on_error);
        let subscription = delivery.subscription.clone();
        let dispatch_id = delivery.dispatch_id;
        let deadline = deadline_after(unit.to_duration(delay_time));

        let timer = self.runtime.spawn(async move {
            tokio::time::sleep_until(deadline).await;
            if delivery.subscription.is_unsubscribed() {
                return;
            }
            delivery.post_step(move || on_tick(0).map_err(Into::into), true, OnFailure::Close);
        });
        subscription.attach_timer(timer.abort_handle());
        debug!(%dispatch_id, delay_time, ?unit, "delay scheduled");
        subscription
    }
}

#[cfg(test)]
mod tests {
    use crate::app::testutil::{Event, manual, recorder};
    use crate::domain::{BoxError, TimeUnit};
    use crate::ports::ErrorHandler;
    use std::time::Duration;
    use tokio::time::{Instant, sleep};

    fn ticks(rx: &mut tokio::sync::mpsc::UnboundedReceiver<Event>) -> Vec<u64> {
        let mut out = Vec::new();
        while let Ok(Event::Tick(n)) = rx.try_recv() {
            out.push(n);
        }
        out
    }

    #[tokio::test(start_paused = true)]
    async fn delay_fires_once_after_deadline() {
        let (events, mut rx, on_error) = recorder();
        let mut m = manual(on_error);
        let start = Instant::now();

        let sub = m.dispatcher.delay(2, move |n| {
            let _ = events.send(Event::Tick(n));
            let _ = events.send(Event::At(Instant::now()));
            Ok::<_, BoxError>(())
        });

        sleep(Duration::from_millis(1999)).await;
        m.ui.run_pending();
        assert!(rx.try_recv().is_err());

        sleep(Duration::from_millis(2)).await;
        m.ui.run_pending();
        assert_eq!(rx.try_recv().unwrap(), Event::Tick(0));
        match rx.try_recv().unwrap() {
            Event::At(at) => assert!(at - start >= Duration::from_secs(2)),
            other => panic!("unexpected event {other:?}"),
        }
        assert!(sub.is_unsubscribed());

        sleep(Duration::from_secs(10)).await;
        assert_eq!(m.ui.run_pending(), 0);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn delay_cancelled_before_deadline_never_fires() {
        let (events, mut rx, on_error) = recorder();
        let mut m = manual(on_error);

        let sub = m.dispatcher.delay_with(
            500,
            TimeUnit::Milliseconds,
            move |n| events.send(Event::Tick(n)).map_err(|e| e.to_string()),
            ErrorHandler::ignore(),
        );
        sleep(Duration::from_millis(100)).await;
        sub.unsubscribe();

        sleep(Duration::from_secs(1)).await;
        assert_eq!(m.ui.run_pending(), 0);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn polling_ticks_until_unsubscribed() {
        let (events, mut rx, on_error) = recorder();
        let mut m = manual(on_error);

        let sub = m.dispatcher.polling(1, move |n| {
            events.send(Event::Tick(n)).map_err(|e| e.to_string())
        });

        sleep(Duration::from_millis(10)).await;
        m.ui.run_pending();
        assert_eq!(ticks(&mut rx), vec![0]);

        sleep(Duration::from_secs(1)).await;
        m.ui.run_pending();
        sleep(Duration::from_secs(1)).await;
        m.ui.run_pending();
        assert_eq!(ticks(&mut rx), vec![1, 2]);

        sub.unsubscribe();
        sleep(Duration::from_secs(5)).await;
        m.ui.run_pending();
        assert!(ticks(&mut rx).is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn polling_respects_initial_delay_and_unit() {
        let (events, mut rx, on_error) = recorder();
        let mut m = manual(on_error);

        let sub = m.dispatcher.polling_with(
            300,
            100,
            TimeUnit::Milliseconds,
            move |n| events.send(Event::Tick(n)).map_err(|e| e.to_string()),
            ErrorHandler::ignore(),
        );

        sleep(Duration::from_millis(299)).await;
        m.ui.run_pending();
        assert!(ticks(&mut rx).is_empty());

        sleep(Duration::from_millis(2)).await;
        m.ui.run_pending();
        assert_eq!(ticks(&mut rx), vec![0]);

        for expected in 1..=2 {
            sleep(Duration::from_millis(100)).await;
            m.ui.run_pending();
            assert_eq!(ticks(&mut rx), vec![expected]);
        }
        sub.unsubscribe();
    }

    #[tokio::test(start_paused = true)]
    async fn tick_posted_but_not_run_is_suppressed_by_unsubscribe() {
        let (events, mut rx, on_error) = recorder();
        let mut m = manual(on_error);

        let sub = m.dispatcher.polling(1, move |n| {
            events.send(Event::Tick(n)).map_err(|e| e.to_string())
        });
        sleep(Duration::from_millis(10)).await;
        sub.unsubscribe();

        assert_eq!(m.ui.run_pending(), 1);
        assert!(ticks(&mut rx).is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn failing_tick_reports_once_and_stops_polling() {
        let (events, mut rx, on_error) = recorder();
        let mut m = manual(on_error);

        let sub = m.dispatcher.polling(1, move |n| {
            let _ = events.send(Event::Tick(n));
            if n == 1 { Err("tick failed") } else { Ok(()) }
        });

        for _ in 0..4 {
            sleep(Duration::from_secs(1)).await;
            m.ui.run_pending();
        }

        assert_eq!(rx.try_recv().unwrap(), Event::Tick(0));
        assert_eq!(rx.try_recv().unwrap(), Event::Tick(1));
        assert!(matches!(rx.try_recv().unwrap(), Event::Error { .. }));
        assert!(rx.try_recv().is_err());
        assert!(sub.is_unsubscribed());
    }

    #[tokio::test(start_paused = true)]
    async fn zero_interval_does_not_panic() {
        let (_events, _rx, on_error) = recorder();
        let mut m = manual(on_error);

        let sub = m.dispatcher.polling_with(
            0,
            0,
            TimeUnit::Seconds,
            |_| Ok::<_, BoxError>(()),
            ErrorHandler::ignore(),
        );
        let mut ran = 0;
        for _ in 0..10 {
            sleep(Duration::from_millis(1)).await;
            ran += m.ui.run_pending();
        }
        assert!(ran >= 3);
        sub.unsubscribe();
    }

    #[tokio::test(start_paused = true)]
    async fn stalled_ui_holds_at_most_one_pending_tick() {
        let (events, mut rx, on_error) = recorder();
        let mut m = manual(on_error);

        let sub = m.dispatcher.polling_with(
            0,
            1,
            TimeUnit::Milliseconds,
            move |n| events.send(Event::Tick(n)).map_err(|e| e.to_string()),
            ErrorHandler::ignore(),
        );

        sleep(Duration::from_secs(10)).await;
        assert_eq!(m.ui.run_pending(), 1);
        assert_eq!(ticks(&mut rx), vec![0]);

        // 実行済みになれば次の tick が積まれる（番号は連番のまま）
        sleep(Duration::from_secs(1)).await;
        assert_eq!(m.ui.run_pending(), 1);
        assert_eq!(ticks(&mut rx), vec![1]);
        sub.unsubscribe();
    }

    #[tokio::test(start_paused = true)]
    async fn huge_delay_is_accepted_and_never_fires() {
        let (events, mut rx, on_error) = recorder();
        let mut m = manual(on_error);

        let sub = m.dispatcher.delay_with(
            u64::MAX,
            TimeUnit::Seconds,
            move |n| events.send(Event::Tick(n)).map_err(|e| e.to_string()),
            ErrorHandler::ignore(),
        );
        assert!(!sub.is_unsubscribed());

        sleep(Duration::from_secs(86400 * 365)).await;
        assert_eq!(m.ui.run_pending(), 0);
        assert!(ticks(&mut rx).is_empty());
        sub.unsubscribe();
    }

    #[tokio::test(start_paused = true)]
    async fn huge_polling_arguments_are_accepted() {
        let (events, mut rx, on_error) = recorder();
        let mut m = manual(on_error);

        let late_events = events.clone();
        let late = m.dispatcher.polling_with(
            u64::MAX,
            1,
            TimeUnit::Days,
            move |n| late_events.send(Event::Tick(n)).map_err(|e| e.to_string()),
            ErrorHandler::ignore(),
        );
        let once = m.dispatcher.polling_with(
            0,
            u64::MAX,
            TimeUnit::Days,
            move |n| events.send(Event::Tick(n)).map_err(|e| e.to_string()),
            ErrorHandler::ignore(),
        );

        sleep(Duration::from_millis(10)).await;
        m.ui.run_pending();
        assert_eq!(ticks(&mut rx), vec![0]);

        sleep(Duration::from_secs(86400 * 365)).await;
        assert_eq!(m.ui.run_pending(), 0);
        assert!(ticks(&mut rx).is_empty());
        late.unsubscribe();
        once.unsubscribe();
    }
}

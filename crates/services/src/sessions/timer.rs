use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

/// Drives a countdown from a background tokio task.
pub struct SessionTimer;

impl SessionTimer {
    /// Calls `on_tick` once per `period` until it returns `false` or the
    /// returned handle is cancelled or dropped.
    ///
    /// The first call happens one full `period` after spawning. Late ticks
    /// are delivered in a burst so every elapsed period is counted.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn<F>(period: Duration, mut on_tick: F) -> TimerHandle
    where
        F: FnMut() -> bool + Send + 'static,
    {
        let task = tokio::spawn(async move {
            let mut interval = tokio::time::interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Burst);
            loop {
                interval.tick().await;
                if !on_tick() {
                    break;
                }
            }
            tracing::debug!("session timer stopped");
        });
        TimerHandle { task }
    }
}

/// Owner of a running timer task. Dropping it stops the timer.
#[derive(Debug)]
pub struct TimerHandle {
    task: JoinHandle<()>,
}

impl TimerHandle {
    pub fn cancel(&self) {
        self.task.abort();
    }

    /// Cancels the timer and waits until its task has exited, so no tick is
    /// still running once this returns.
    pub async fn stop(mut self) {
        self.task.abort();
        let _ = (&mut self.task).await;
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl Drop for TimerHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test(start_paused = true)]
    async fn ticks_once_per_period_until_callback_stops() {
        let count = Arc::new(AtomicU32::new(0));
        let seen = Arc::clone(&count);
        let handle = SessionTimer::spawn(Duration::from_secs(1), move || {
            seen.fetch_add(1, Ordering::SeqCst) + 1 < 3
        });

        tokio::time::sleep(Duration::from_millis(2_500)).await;
        assert_eq!(count.load(Ordering::SeqCst), 2);

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(count.load(Ordering::SeqCst), 3);
        assert!(handle.is_finished());
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_the_handle_stops_ticking() {
        let count = Arc::new(AtomicU32::new(0));
        let seen = Arc::clone(&count);
        let handle = SessionTimer::spawn(Duration::from_secs(1), move || {
            seen.fetch_add(1, Ordering::SeqCst);
            true
        });

        tokio::time::sleep(Duration::from_millis(1_500)).await;
        drop(handle);
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn stop_waits_for_the_task_to_exit() {
        let count = Arc::new(AtomicU32::new(0));
        let seen = Arc::clone(&count);
        let handle = SessionTimer::spawn(Duration::from_secs(1), move || {
            seen.fetch_add(1, Ordering::SeqCst);
            true
        });

        tokio::time::sleep(Duration::from_millis(1_500)).await;
        handle.stop().await;
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }
}

// SPDX-License-Identifier: AGPL-3.0
// Festival POS Core - Periodic background trigger
//
// Hosts provide some facility that wakes the app every so often. The
// retry pass only sees the PeriodicTrigger capability, never the facility.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};

/// Work invoked on every tick. Must handle its own errors.
pub type TriggerTask = Arc<dyn Fn() -> Pin<Box<dyn Future<Output = ()> + Send>> + Send + Sync>;

/// Capability to run a task periodically in the background
pub trait PeriodicTrigger: Send + Sync {
    fn start(&self, task: TriggerTask) -> TriggerHandle;
}

/// Running registration, stopped explicitly or when the process exits
pub struct TriggerHandle {
    handle: JoinHandle<()>,
}

impl TriggerHandle {
    pub fn stop(self) {
        self.handle.abort();
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

/// Trigger driven by a tokio interval on the current runtime
#[derive(Debug, Clone)]
pub struct IntervalTrigger {
    period: Duration,
    run_immediately: bool,
}

impl IntervalTrigger {
    pub fn new(period: Duration) -> Self {
        Self {
            period,
            run_immediately: false,
        }
    }

    /// Fire once right away instead of waiting a full period
    pub fn run_immediately(mut self, run_immediately: bool) -> Self {
        self.run_immediately = run_immediately;
        self
    }

    pub fn period(&self) -> Duration {
        self.period
    }
}

impl PeriodicTrigger for IntervalTrigger {
    fn start(&self, task: TriggerTask) -> TriggerHandle {
        let period = self.period;
        let first = if self.run_immediately {
            Instant::now()
        } else {
            Instant::now() + period
        };

        tracing::info!("Background trigger every {:?}", period);
        let handle = tokio::spawn(async move {
            let mut ticker = time::interval_at(first, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                ticker.tick().await;
                tracing::debug!("Background trigger fired");
                task().await;
            }
        });

        TriggerHandle { handle }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counting_task(counter: Arc<AtomicUsize>) -> TriggerTask {
        Arc::new(move || {
            let counter = counter.clone();
            Box::pin(async move {
                counter.fetch_add(1, Ordering::SeqCst);
            }) as Pin<Box<dyn Future<Output = ()> + Send>>
        })
    }

    #[tokio::test(start_paused = true)]
    async fn test_fires_every_period_until_stopped() {
        let counter = Arc::new(AtomicUsize::new(0));
        let trigger = IntervalTrigger::new(Duration::from_secs(60));
        let handle = trigger.start(counting_task(counter.clone()));

        time::sleep(Duration::from_secs(30)).await;
        assert_eq!(counter.load(Ordering::SeqCst), 0);

        time::sleep(Duration::from_secs(155)).await;
        assert_eq!(counter.load(Ordering::SeqCst), 3);

        handle.stop();
        time::sleep(Duration::from_secs(600)).await;
        assert_eq!(counter.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_immediately() {
        let counter = Arc::new(AtomicUsize::new(0));
        let trigger = IntervalTrigger::new(Duration::from_secs(60)).run_immediately(true);
        let handle = trigger.start(counting_task(counter.clone()));

        time::sleep(Duration::from_secs(1)).await;
        assert_eq!(counter.load(Ordering::SeqCst), 1);
        assert!(!handle.is_finished());
        handle.stop();
    }
}

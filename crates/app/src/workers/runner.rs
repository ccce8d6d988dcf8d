//! Periodic task runner shared by the background workers.

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use jiff::{SignedDuration, Timestamp};
use tokio::{
    sync::{Mutex, watch},
    task::JoinHandle,
    time::{MissedTickBehavior, interval, sleep},
};
use tracing::{debug, info, warn};

use crate::workers::errors::WorkerError;

/// Shortest accepted interval between passes.
const MIN_INTERVAL: Duration = Duration::from_secs(1);

/// One unit of periodic work.
#[async_trait]
pub(crate) trait Pass: Send + Sync + 'static {
    type Output: Send;

    async fn run(&self) -> Result<Self::Output, WorkerError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Schedule {
    pub interval: Duration,

    /// Wait before the first pass.
    pub initial_delay: Duration,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkerStatus {
    pub running: bool,
    pub last_run_at: Option<Timestamp>,
    pub last_error: Option<String>,
}

/// The instant `age` before `now`, clamped to the earliest timestamp.
pub(crate) fn cutoff(now: Timestamp, age: Duration) -> Timestamp {
    SignedDuration::try_from(age)
        .ok()
        .and_then(|age| now.checked_sub(age).ok())
        .unwrap_or(Timestamp::MIN)
}

type Task = (watch::Sender<bool>, JoinHandle<()>);

pub(crate) struct Runner {
    name: &'static str,
    schedule: Schedule,
    status: Arc<Mutex<WorkerStatus>>,
    task: Mutex<Option<Task>>,
}

impl Runner {
    pub(crate) fn new(name: &'static str, schedule: Schedule) -> Self {
        Self {
            name,
            schedule,
            status: Arc::new(Mutex::new(WorkerStatus::default())),
            task: Mutex::new(None),
        }
    }

    /// Spawn the periodic loop.
    pub(crate) async fn start<P: Pass>(&self, pass: Arc<P>) -> Result<(), WorkerError> {
        let mut task = self.task.lock().await;

        if task.is_some() {
            return Err(WorkerError::AlreadyRunning);
        }

        let (stop, stopped) = watch::channel(false);

        let handle = tokio::spawn(run_loop(
            self.name,
            self.schedule,
            pass,
            Arc::clone(&self.status),
            stopped,
        ));

        self.status.lock().await.running = true;

        *task = Some((stop, handle));

        info!(
            worker = self.name,
            interval = ?self.schedule.interval,
            initial_delay = ?self.schedule.initial_delay,
            "worker started"
        );

        Ok(())
    }

    /// Signal the loop and wait for the pass in flight, if any, to finish.
    pub(crate) async fn stop(&self) {
        let Some((stop, handle)) = self.task.lock().await.take() else {
            return;
        };

        stop.send_replace(true);

        if let Err(error) = handle.await {
            warn!(worker = self.name, %error, "worker task ended abnormally");
        }

        self.status.lock().await.running = false;

        info!(worker = self.name, "worker stopped");
    }

    /// Run one pass now, outside the schedule.
    pub(crate) async fn run_now<P: Pass>(&self, pass: &P) -> Result<P::Output, WorkerError> {
        let result = pass.run().await;

        record(self.name, &self.status, result.as_ref().err()).await;

        result
    }

    pub(crate) async fn status(&self) -> WorkerStatus {
        self.status.lock().await.clone()
    }
}

async fn record(name: &'static str, status: &Mutex<WorkerStatus>, error: Option<&WorkerError>) {
    let mut status = status.lock().await;

    status.last_run_at = Some(Timestamp::now());
    status.last_error = error.map(ToString::to_string);

    if let Some(error) = error {
        warn!(worker = name, %error, "worker pass failed");
    }
}

async fn run_loop<P: Pass>(
    name: &'static str,
    schedule: Schedule,
    pass: Arc<P>,
    status: Arc<Mutex<WorkerStatus>>,
    mut stopped: watch::Receiver<bool>,
) {
    tokio::select! {
        () = sleep(schedule.initial_delay) => {}
        _ = stopped.changed() => return,
    }

    let mut ticker = interval(schedule.interval.max(MIN_INTERVAL));

    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                debug!(worker = name, "worker pass starting");

                let result = pass.run().await;

                record(name, &status, result.as_ref().err()).await;
            }
            _ = stopped.changed() => break,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use testresult::TestResult;

    use crate::domain::carts::CartsServiceError;

    use super::*;

    #[derive(Default)]
    struct CountingPass {
        runs: AtomicU32,
        fail: bool,
    }

    #[async_trait]
    impl Pass for CountingPass {
        type Output = u32;

        async fn run(&self) -> Result<u32, WorkerError> {
            let runs = self.runs.fetch_add(1, Ordering::SeqCst) + 1;

            if self.fail {
                return Err(CartsServiceError::Conflict.into());
            }

            Ok(runs)
        }
    }

    fn schedule() -> Schedule {
        Schedule {
            interval: Duration::from_secs(60),
            initial_delay: Duration::from_secs(30),
        }
    }

    #[test]
    fn cutoff_clamps_huge_ages() {
        let now = Timestamp::now();

        assert_eq!(cutoff(now, Duration::from_secs(60)), now - SignedDuration::from_secs(60));
        assert_eq!(cutoff(now, Duration::MAX), Timestamp::MIN);
    }

    #[tokio::test(start_paused = true)]
    async fn first_pass_waits_for_initial_delay() -> TestResult {
        let runner = Runner::new("test", schedule());
        let pass = Arc::new(CountingPass::default());

        runner.start(Arc::clone(&pass)).await?;

        sleep(Duration::from_secs(29)).await;
        assert_eq!(pass.runs.load(Ordering::SeqCst), 0);

        sleep(Duration::from_secs(2)).await;
        assert_eq!(pass.runs.load(Ordering::SeqCst), 1);

        sleep(Duration::from_secs(60)).await;
        assert_eq!(pass.runs.load(Ordering::SeqCst), 2);

        runner.stop().await;

        assert!(!runner.status().await.running, "stopped runner is idle");

        Ok(())
    }

    #[tokio::test]
    async fn cannot_start_twice() -> TestResult {
        let runner = Runner::new("test", schedule());
        let pass = Arc::new(CountingPass::default());

        runner.start(Arc::clone(&pass)).await?;

        let result = runner.start(pass).await;

        assert!(
            matches!(result, Err(WorkerError::AlreadyRunning)),
            "expected AlreadyRunning, got {result:?}"
        );

        runner.stop().await;

        Ok(())
    }

    #[tokio::test]
    async fn run_now_records_failures() {
        let runner = Runner::new("test", schedule());
        let pass = CountingPass {
            fail: true,
            ..CountingPass::default()
        };

        let result = runner.run_now(&pass).await;
        let status = runner.status().await;

        assert!(result.is_err(), "failure is returned to the caller");
        assert!(status.last_run_at.is_some(), "failed runs are still runs");
        assert_eq!(status.last_error.as_deref(), Some("cart store failed"));
    }
}

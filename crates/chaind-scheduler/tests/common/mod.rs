#![allow(dead_code)]

use std::{
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
    time::Duration,
};

use chaind_scheduler::{job_fn, JobFn, Monitor, Service};

/// Monitor double that counts every call.
#[derive(Default)]
pub struct CountingMonitor {
    pub scheduled: AtomicUsize,
    pub cancelled: AtomicUsize,
    pub started_on_signal: AtomicUsize,
    pub started_on_timer: AtomicUsize,
}

impl CountingMonitor {
    pub fn scheduled(&self) -> usize {
        self.scheduled.load(Ordering::SeqCst)
    }

    pub fn cancelled(&self) -> usize {
        self.cancelled.load(Ordering::SeqCst)
    }

    pub fn started_on_signal(&self) -> usize {
        self.started_on_signal.load(Ordering::SeqCst)
    }

    pub fn started_on_timer(&self) -> usize {
        self.started_on_timer.load(Ordering::SeqCst)
    }
}

impl Monitor for CountingMonitor {
    fn job_scheduled(&self, _class: &str) {
        self.scheduled.fetch_add(1, Ordering::SeqCst);
    }

    fn job_cancelled(&self, _class: &str) {
        self.cancelled.fetch_add(1, Ordering::SeqCst);
    }

    fn job_started_on_signal(&self, _class: &str) {
        self.started_on_signal.fetch_add(1, Ordering::SeqCst);
    }

    fn job_started_on_timer(&self, _class: &str) {
        self.started_on_timer.fetch_add(1, Ordering::SeqCst);
    }
}

pub fn service() -> (Service, Arc<CountingMonitor>) {
    let monitor = Arc::new(CountingMonitor::default());
    (Service::new(monitor.clone()), monitor)
}

/// Job that bumps the counter it is handed.
pub fn counting_job() -> Option<JobFn<AtomicUsize>> {
    Some(job_fn(|_ctx, runs: Arc<AtomicUsize>| async move {
        runs.fetch_add(1, Ordering::SeqCst);
    }))
}

/// Job that bumps the counter, then holds on for `hold`.
pub fn slow_job(hold: Duration) -> Option<JobFn<AtomicUsize>> {
    Some(job_fn(move |_ctx, runs: Arc<AtomicUsize>| async move {
        runs.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(hold).await;
    }))
}

pub fn count(runs: &AtomicUsize) -> usize {
    runs.load(Ordering::SeqCst)
}

/// Poll `cond` every 10ms until it holds or `limit` passes.
pub async fn wait_until(limit: Duration, cond: impl Fn() -> bool) -> bool {
    let deadline = tokio::time::Instant::now() + limit;
    while tokio::time::Instant::now() < deadline {
        if cond() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    cond()
}

/// `wait_until` with a one second limit.
pub async fn eventually(cond: impl Fn() -> bool) -> bool {
    wait_until(Duration::from_secs(1), cond).await
}

pub fn millis(ms: i64) -> chrono::Duration {
    chrono::Duration::milliseconds(ms)
}

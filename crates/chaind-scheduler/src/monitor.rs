use metrics::{counter, describe_counter};

/// Counter of jobs registered, labelled by `class`.
pub const JOBS_SCHEDULED: &str = "chaind_scheduler_jobs_scheduled_total";
/// Counter of jobs cancelled or retired without running, labelled by `class`.
pub const JOBS_CANCELLED: &str = "chaind_scheduler_jobs_cancelled_total";
/// Counter of job executions, labelled by `class` and `trigger` (`signal` or `timer`).
pub const JOBS_STARTED: &str = "chaind_scheduler_jobs_started_total";

/// Receives job lifecycle counts, keyed by job class.
///
/// Calls are made from runner tasks and from control operations alike, so
/// implementations must not block.
pub trait Monitor: Send + Sync {
    fn job_scheduled(&self, class: &str);
    fn job_cancelled(&self, class: &str);
    fn job_started_on_signal(&self, class: &str);
    fn job_started_on_timer(&self, class: &str);
}

/// Discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullMonitor;

impl Monitor for NullMonitor {
    fn job_scheduled(&self, _class: &str) {}
    fn job_cancelled(&self, _class: &str) {}
    fn job_started_on_signal(&self, _class: &str) {}
    fn job_started_on_timer(&self, _class: &str) {}
}

/// Reports through the `metrics` facade to whatever recorder the host installed.
#[derive(Debug, Clone, Copy)]
pub struct MetricsMonitor;

impl MetricsMonitor {
    /// Describe the counters to the installed recorder.
    pub fn new() -> Self {
        describe_counter!(JOBS_SCHEDULED, "Number of jobs scheduled");
        describe_counter!(
            JOBS_CANCELLED,
            "Number of jobs cancelled or retired without running"
        );
        describe_counter!(JOBS_STARTED, "Number of job executions started");
        Self
    }
}

impl Default for MetricsMonitor {
    fn default() -> Self {
        Self::new()
    }
}

impl Monitor for MetricsMonitor {
    fn job_scheduled(&self, class: &str) {
        counter!(JOBS_SCHEDULED, "class" => class.to_owned()).increment(1);
    }

    fn job_cancelled(&self, class: &str) {
        counter!(JOBS_CANCELLED, "class" => class.to_owned()).increment(1);
    }

    fn job_started_on_signal(&self, class: &str) {
        counter!(JOBS_STARTED, "class" => class.to_owned(), "trigger" => "signal").increment(1);
    }

    fn job_started_on_timer(&self, class: &str) {
        counter!(JOBS_STARTED, "class" => class.to_owned(), "trigger" => "timer").increment(1);
    }
}

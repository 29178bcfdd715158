use std::{
    collections::{hash_map::Entry, HashMap},
    fmt,
    sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard},
};

use chaind_core::config::SchedulerConfig;
use chrono::{DateTime, Utc};
use tokio_util::sync::CancellationToken;
use tracing::{debug, debug_span, info_span, trace, Instrument, Span};

use crate::{
    error::{Result, SchedulerError},
    job::{JobRecord, SignalReceivers},
    monitor::{MetricsMonitor, Monitor, NullMonitor},
    runner::{run_one_off, run_periodic, JobTask},
    types::{JobFn, RuntimeFn},
};

/// Named-job scheduler.
///
/// Cheap to clone; all clones share one registry. Scheduling spawns a Tokio
/// task per job, so `schedule_job` and `schedule_periodic_job` must be
/// called from within a runtime.
#[derive(Clone)]
pub struct Service {
    shared: Arc<Shared>,
}

/// State shared between the service handles and the runner tasks.
pub(crate) struct Shared {
    jobs: RwLock<HashMap<String, Arc<JobRecord>>>,
    monitor: Arc<dyn Monitor>,
    span: Span,
}

impl Shared {
    pub fn monitor(&self) -> &dyn Monitor {
        self.monitor.as_ref()
    }

    /// Remove `record` from the registry if the entry under its name is
    /// still this record. A job re-registered under the same name after a
    /// cancel is left alone.
    pub fn remove(&self, record: &Arc<JobRecord>) {
        let mut jobs = self.write_jobs();
        let current = jobs
            .get(record.name())
            .is_some_and(|entry| Arc::ptr_eq(entry, record));
        if current {
            jobs.remove(record.name());
            debug!(job = %record.name(), "job removed from registry");
        }
    }

    /// Tear down a job that ends without an explicit cancel signal.
    pub fn retire(&self, record: &Arc<JobRecord>) {
        self.remove(record);
        record.finalise();
        self.monitor.job_cancelled(record.class());
    }

    fn read_jobs(&self) -> RwLockReadGuard<'_, HashMap<String, Arc<JobRecord>>> {
        self.jobs.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_jobs(&self) -> RwLockWriteGuard<'_, HashMap<String, Arc<JobRecord>>> {
        self.jobs.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Service {
    pub fn new(monitor: Arc<dyn Monitor>) -> Self {
        Self {
            shared: Arc::new(Shared {
                jobs: RwLock::new(HashMap::new()),
                monitor,
                span: info_span!("scheduler", service = "scheduler"),
            }),
        }
    }

    /// Build a service with the monitor selected by `config.metrics`.
    pub fn from_config(config: &SchedulerConfig) -> Self {
        let monitor: Arc<dyn Monitor> = if config.metrics {
            Arc::new(MetricsMonitor::new())
        } else {
            Arc::new(NullMonitor)
        };
        Self::new(monitor)
    }

    /// Schedule a one-off job to run at `runtime`.
    ///
    /// A runtime in the past fires immediately. If `parent` is cancelled
    /// before the job starts, the job does not run.
    pub fn schedule_job<D>(
        &self,
        parent: &CancellationToken,
        class: &str,
        name: &str,
        runtime: DateTime<Utc>,
        job_fn: Option<JobFn<D>>,
        data: Arc<D>,
    ) -> Result<()>
    where
        D: Send + Sync + 'static,
    {
        if name.is_empty() {
            return Err(SchedulerError::NoJobName);
        }
        let job_fn = job_fn.ok_or(SchedulerError::NoJobFunc)?;

        let (record, signals) = self.register(class, name, false)?;
        trace!(job = %name, scheduled = %runtime, "scheduled job");

        let span = self.job_span(&record);
        let task = JobTask {
            record,
            parent: parent.clone(),
            job_fn,
            data,
        };
        tokio::spawn(
            run_one_off(Arc::clone(&self.shared), task, signals, runtime)
                .instrument(span),
        );
        Ok(())
    }

    /// Schedule a job that runs in a loop.
    ///
    /// Each iteration starts by calling `runtime_fn` for the next instant;
    /// once it is reached `job_fn` runs, then the loop starts again. The loop
    /// ends when `runtime_fn` returns an error (`NoMoreInstances` being the
    /// clean case), on cancellation, or when `parent` is cancelled.
    #[allow(clippy::too_many_arguments)]
    pub fn schedule_periodic_job<R, D>(
        &self,
        parent: &CancellationToken,
        class: &str,
        name: &str,
        runtime_fn: Option<RuntimeFn<R>>,
        runtime_data: Arc<R>,
        job_fn: Option<JobFn<D>>,
        job_data: Arc<D>,
    ) -> Result<()>
    where
        R: Send + Sync + 'static,
        D: Send + Sync + 'static,
    {
        if name.is_empty() {
            return Err(SchedulerError::NoJobName);
        }
        let runtime_fn = runtime_fn.ok_or(SchedulerError::NoRuntimeFunc)?;
        let job_fn = job_fn.ok_or(SchedulerError::NoJobFunc)?;

        let (record, signals) = self.register(class, name, true)?;

        let span = self.job_span(&record);
        let task = JobTask {
            record,
            parent: parent.clone(),
            job_fn,
            data: job_data,
        };
        tokio::spawn(
            run_periodic(
                Arc::clone(&self.shared),
                task,
                signals,
                runtime_fn,
                runtime_data,
            )
            .instrument(span),
        );
        Ok(())
    }

    /// Run a named job immediately.
    ///
    /// One-off jobs leave the registry before the run is signalled, so their
    /// timer can no longer fire them.
    pub fn run_job(&self, name: &str) -> Result<()> {
        let record = {
            let mut jobs = self.shared.write_jobs();
            let record = jobs
                .get(name)
                .cloned()
                .ok_or_else(|| SchedulerError::NoSuchJob {
                    name: name.to_string(),
                })?;
            if !record.is_periodic() {
                jobs.remove(name);
            }
            record
        };

        record.trigger_run()?;
        debug!(job = %name, "run signalled");
        Ok(())
    }

    /// Run a job if it exists, ignoring every reason it cannot run.
    pub fn run_job_if_exists(&self, name: &str) {
        if let Err(e) = self.run_job(name) {
            trace!(job = %name, error = %e, "run skipped");
        }
    }

    pub fn job_exists(&self, name: &str) -> bool {
        self.shared.read_jobs().contains_key(name)
    }

    /// Whether a registered job is executing right now; `None` if no job
    /// with that name is registered.
    pub fn is_job_active(&self, name: &str) -> Option<bool> {
        self.shared
            .read_jobs()
            .get(name)
            .map(|record| record.is_active())
    }

    /// Names of all registered jobs, in no particular order.
    pub fn list_jobs(&self) -> Vec<String> {
        self.shared.read_jobs().keys().cloned().collect()
    }

    /// Cancel a named job. For a periodic job all future instances are
    /// cancelled. Cancelling a job that is already winding down is not an
    /// error.
    pub fn cancel_job(&self, name: &str) -> Result<()> {
        let record = self
            .shared
            .write_jobs()
            .remove(name)
            .ok_or_else(|| SchedulerError::NoSuchJob {
                name: name.to_string(),
            })?;

        if record.cancel() {
            debug!(job = %name, "cancel signalled");
        } else {
            trace!(job = %name, "job already finalised");
        }
        Ok(())
    }

    pub fn cancel_job_if_exists(&self, name: &str) {
        let _ = self.cancel_job(name);
    }

    /// Cancel every job whose name starts with `prefix`.
    pub fn cancel_jobs(&self, prefix: &str) {
        let names: Vec<String> = self
            .shared
            .read_jobs()
            .keys()
            .filter(|name| name.starts_with(prefix))
            .cloned()
            .collect();

        // Jobs may finish between the snapshot and here.
        for name in names {
            self.cancel_job_if_exists(&name);
        }
    }

    fn register(
        &self,
        class: &str,
        name: &str,
        periodic: bool,
    ) -> Result<(Arc<JobRecord>, SignalReceivers)> {
        let (record, signals) = match self.shared.write_jobs().entry(name.to_string()) {
            Entry::Occupied(_) => {
                return Err(SchedulerError::JobAlreadyExists {
                    name: name.to_string(),
                })
            }
            Entry::Vacant(slot) => {
                let (record, signals) = JobRecord::new(name, class, periodic);
                slot.insert(Arc::clone(&record));
                (record, signals)
            }
        };

        self.shared.monitor.job_scheduled(class);
        debug!(job = %name, %class, periodic, "job registered");
        Ok((record, signals))
    }

    fn job_span(&self, record: &JobRecord) -> Span {
        debug_span!(
            parent: &self.shared.span,
            "scheduler_job",
            job = %record.name(),
            class = %record.class(),
            periodic = record.is_periodic()
        )
    }
}

impl Default for Service {
    fn default() -> Self {
        Self::new(Arc::new(NullMonitor))
    }
}

impl fmt::Debug for Service {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Service")
            .field("jobs", &self.shared.read_jobs().len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn config_selects_monitor_and_debug_counts_jobs() {
        let parent = CancellationToken::new();
        for metrics in [true, false] {
            let scheduler = Service::from_config(&SchedulerConfig { metrics });
            assert_eq!(format!("{scheduler:?}"), "Service { jobs: 0 }");

            let job = crate::types::job_fn(|_ctx, _data: Arc<()>| async {});
            scheduler
                .schedule_job(
                    &parent,
                    "test",
                    "deposits",
                    Utc::now() + chrono::Duration::seconds(60),
                    Some(job),
                    Arc::new(()),
                )
                .expect("schedule");
            assert_eq!(format!("{scheduler:?}"), "Service { jobs: 1 }");
            scheduler.cancel_job("deposits").expect("cancel");
        }
    }

    #[tokio::test]
    async fn runner_does_not_evict_a_newer_registration() {
        let scheduler = Service::default();
        let (stale, _signals) = JobRecord::new("blocks", "test", false);
        let (current, _current_signals) = scheduler
            .register("test", "blocks", false)
            .expect("register");

        scheduler.shared.remove(&stale);
        assert!(scheduler.job_exists("blocks"));

        scheduler.shared.remove(&current);
        assert!(!scheduler.job_exists("blocks"));
    }
}

use std::{any::Any, panic::AssertUnwindSafe, sync::Arc, time::Duration};

use chrono::{DateTime, Utc};
use futures_util::FutureExt;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{error, trace};

use crate::{
    error::RuntimeError,
    job::{JobRecord, SignalReceivers},
    service::Shared,
    types::{JobFn, RuntimeFn},
};

/// Everything a runner task owns for the lifetime of its job, apart from
/// the signal receivers.
pub(crate) struct JobTask<D> {
    pub record: Arc<JobRecord>,
    pub parent: CancellationToken,
    pub job_fn: JobFn<D>,
    pub data: Arc<D>,
}

impl<D> JobTask<D> {
    async fn execute(&self) {
        let work = async { (self.job_fn)(self.parent.clone(), Arc::clone(&self.data)).await };
        if let Err(panic) = AssertUnwindSafe(work).catch_unwind().await {
            error!(panic = %panic_message(&*panic), "job panicked");
        }
    }
}

/// Drive a one-off job: wait for the first of parent cancellation, cancel
/// signal, run signal or timer, then retire the record.
pub(crate) async fn run_one_off<D>(
    shared: Arc<Shared>,
    task: JobTask<D>,
    signals: SignalReceivers,
    runtime: DateTime<Utc>,
) {
    let SignalReceivers {
        mut cancel,
        mut run,
    } = signals;
    let record = &task.record;
    let class = record.class();

    let timer = sleep(until(runtime));
    tokio::pin!(timer);
    let mut timer_armed = true;

    loop {
        tokio::select! {
            biased;

            _ = task.parent.cancelled() => {
                trace!(scheduled = %runtime, "parent context done; job not running");
                shared.retire(record);
                return;
            }
            Some(()) = cancel.recv() => {
                // The canceller already removed the registry entry.
                trace!(scheduled = %runtime, "cancel triggered; job not running");
                record.finalise();
                shared.monitor().job_cancelled(class);
                return;
            }
            Some(()) = run.recv() => {
                // `run_job` removed the registry entry and set `active`.
                trace!(scheduled = %runtime, "run triggered; job running");
                shared.monitor().job_started_on_signal(class);
                task.execute().await;
                trace!(scheduled = %runtime, "job complete");
                record.finalise();
                return;
            }
            () = &mut timer, if timer_armed => {
                timer_armed = false;
                if !record.try_activate() {
                    // A run signal is pending and will be picked up next.
                    trace!(scheduled = %runtime, "already running; job not running");
                    continue;
                }
                shared.remove(record);
                trace!(scheduled = %runtime, "timer triggered; job running");
                shared.monitor().job_started_on_timer(class);
                task.execute().await;
                trace!(scheduled = %runtime, "job complete");
                record.deactivate();
                record.finalise();
                return;
            }
        }
    }
}

/// Drive a periodic job until its runtime function runs out, fails, or the
/// job is cancelled. The record stays registered between iterations.
pub(crate) async fn run_periodic<R, D>(
    shared: Arc<Shared>,
    task: JobTask<D>,
    signals: SignalReceivers,
    runtime_fn: RuntimeFn<R>,
    runtime_data: Arc<R>,
) {
    let SignalReceivers {
        mut cancel,
        mut run,
    } = signals;
    let record = &task.record;
    let class = record.class();

    loop {
        let next = async { runtime_fn(task.parent.clone(), Arc::clone(&runtime_data)).await };
        let runtime = match AssertUnwindSafe(next).catch_unwind().await {
            Ok(Ok(runtime)) => runtime,
            Ok(Err(RuntimeError::NoMoreInstances)) => {
                trace!("no more instances; periodic job stopping");
                shared.retire(record);
                return;
            }
            Ok(Err(e)) => {
                error!(error = %e, "failed to obtain runtime; periodic job stopping");
                shared.retire(record);
                return;
            }
            Err(panic) => {
                error!(
                    panic = %panic_message(&*panic),
                    "runtime function panicked; periodic job stopping"
                );
                shared.retire(record);
                return;
            }
        };
        trace!(scheduled = %runtime, "scheduled job");

        tokio::select! {
            biased;

            _ = task.parent.cancelled() => {
                trace!(scheduled = %runtime, "parent context done; job not running");
                shared.retire(record);
                return;
            }
            Some(()) = cancel.recv() => {
                trace!(scheduled = %runtime, "cancel triggered; job not running");
                record.finalise();
                shared.monitor().job_cancelled(class);
                return;
            }
            Some(()) = run.recv() => {
                trace!(scheduled = %runtime, "run triggered; job running");
                shared.monitor().job_started_on_signal(class);
                task.execute().await;
                trace!(scheduled = %runtime, "job complete");
                record.deactivate();
            }
            () = sleep(until(runtime)) => {
                if !record.try_activate() {
                    trace!(scheduled = %runtime, "already running; job not running");
                    continue;
                }
                trace!(scheduled = %runtime, "timer triggered; job running");
                shared.monitor().job_started_on_timer(class);
                task.execute().await;
                trace!(scheduled = %runtime, "job complete");
                record.deactivate();
            }
        }
    }
}

/// Time left until `runtime`; zero if it has already passed.
fn until(runtime: DateTime<Utc>) -> Duration {
    (runtime - Utc::now()).to_std().unwrap_or(Duration::ZERO)
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(msg) = panic.downcast_ref::<&str>() {
        msg
    } else if let Some(msg) = panic.downcast_ref::<String>() {
        msg
    } else {
        "non-string panic payload"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn past_runtime_waits_for_nothing() {
        let past = Utc::now() - chrono::Duration::seconds(30);
        assert_eq!(until(past), Duration::ZERO);
    }

    #[test]
    fn future_runtime_is_bounded_by_the_gap() {
        let future = Utc::now() + chrono::Duration::seconds(5);
        let wait = until(future);
        assert!(wait > Duration::from_secs(4));
        assert!(wait <= Duration::from_secs(5));
    }

    #[test]
    fn panic_payloads_are_rendered() {
        let boxed: Box<dyn Any + Send> = Box::new("rpc down");
        assert_eq!(panic_message(&*boxed), "rpc down");
        let boxed: Box<dyn Any + Send> = Box::new(String::from("bad slot"));
        assert_eq!(panic_message(&*boxed), "bad slot");
        let boxed: Box<dyn Any + Send> = Box::new(7_u8);
        assert_eq!(panic_message(&*boxed), "non-string panic payload");
    }
}

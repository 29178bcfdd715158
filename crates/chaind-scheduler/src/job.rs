use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc, Mutex, MutexGuard, PoisonError,
};

use tokio::sync::mpsc;

use crate::error::{Result, SchedulerError};

/// Control points for a single scheduled job.
///
/// `active` and `finalised` are atomics so they can be read without the
/// state lock; every transition that also sends on or closes a signal
/// channel happens with the lock held.
pub(crate) struct JobRecord {
    name: String,
    class: String,
    periodic: bool,
    active: AtomicBool,
    finalised: AtomicBool,
    signals: Mutex<Signals>,
}

/// Sending halves of the cancel and run channels. `None` once closed.
struct Signals {
    cancel: Option<mpsc::Sender<()>>,
    run: Option<mpsc::Sender<()>>,
}

/// Receiving halves, owned by the job's runner task.
pub(crate) struct SignalReceivers {
    pub cancel: mpsc::Receiver<()>,
    pub run: mpsc::Receiver<()>,
}

impl JobRecord {
    pub fn new(name: &str, class: &str, periodic: bool) -> (Arc<Self>, SignalReceivers) {
        let (cancel_tx, cancel_rx) = mpsc::channel(1);
        let (run_tx, run_rx) = mpsc::channel(1);
        let record = Arc::new(Self {
            name: name.to_string(),
            class: class.to_string(),
            periodic,
            active: AtomicBool::new(false),
            finalised: AtomicBool::new(false),
            signals: Mutex::new(Signals {
                cancel: Some(cancel_tx),
                run: Some(run_tx),
            }),
        });
        let receivers = SignalReceivers {
            cancel: cancel_rx,
            run: run_rx,
        };
        (record, receivers)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn class(&self) -> &str {
        &self.class
    }

    pub fn is_periodic(&self) -> bool {
        self.periodic
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    pub fn is_finalised(&self) -> bool {
        self.finalised.load(Ordering::Acquire)
    }

    /// Claim the record for a timer-triggered execution.
    ///
    /// Returns `false` when a run signal already marked the job active.
    pub fn try_activate(&self) -> bool {
        self.active
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    pub fn deactivate(&self) {
        self.active.store(false, Ordering::Release);
    }

    /// Mark the job active and send it a run signal.
    pub fn trigger_run(&self) -> Result<()> {
        let signals = self.lock();
        if self.is_active() {
            return Err(SchedulerError::JobRunning {
                name: self.name.clone(),
            });
        }
        if self.is_finalised() {
            return Err(SchedulerError::JobFinalised {
                name: self.name.clone(),
            });
        }
        if !self.try_activate() {
            return Err(SchedulerError::JobRunning {
                name: self.name.clone(),
            });
        }

        // The slot is empty whenever the job is inactive, so this only fails
        // if the runner has already gone away.
        let sent = signals
            .run
            .as_ref()
            .is_some_and(|tx| tx.try_send(()).is_ok());
        if !sent {
            self.deactivate();
            return Err(SchedulerError::JobFinalised {
                name: self.name.clone(),
            });
        }
        Ok(())
    }

    /// Dispatch cancellation to the runner.
    ///
    /// Returns `false` if the job was already finalised or cancelled, in
    /// which case nothing is sent.
    pub fn cancel(&self) -> bool {
        let signals = self.lock();
        if self.is_finalised() {
            return false;
        }
        self.finalised.store(true, Ordering::Release);
        if let Some(tx) = signals.cancel.as_ref() {
            // Capacity 1 and at most one cancel per record: never full.
            let _ = tx.try_send(());
        }
        true
    }

    /// Retire the record: close both channels and clear `active`.
    ///
    /// Idempotent; each channel is closed at most once.
    pub fn finalise(&self) {
        let mut signals = self.lock();
        self.finalised.store(true, Ordering::Release);
        signals.cancel.take();
        signals.run.take();
        self.deactivate();
    }

    fn lock(&self) -> MutexGuard<'_, Signals> {
        // Every critical section leaves `Signals` consistent, so a poisoned
        // lock carries no torn state.
        self.signals.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

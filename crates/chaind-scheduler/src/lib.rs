//! `chaind-scheduler` — named-job scheduler running on Tokio.
//!
//! # Overview
//!
//! A [`Service`] keeps a registry of jobs keyed by name. Each scheduled job
//! gets its own task which waits for the first of four events:
//!
//! | Event               | Effect                                            |
//! |---------------------|---------------------------------------------------|
//! | Parent cancellation | Job leaves the registry without running           |
//! | `cancel_job`        | Job is retired without running                    |
//! | `run_job`           | Job runs now, bypassing its timer                 |
//! | Timer               | Job runs at its scheduled instant                 |
//!
//! One-off jobs run at most once. Periodic jobs ask a runtime function for
//! their next instant after every run and stay registered until it returns
//! [`RuntimeError::NoMoreInstances`] or fails, or until they are cancelled.
//!
//! Job counts are reported through a [`Monitor`]; [`MetricsMonitor`] feeds
//! the `metrics` facade.

pub mod error;
mod job;
pub mod monitor;
mod runner;
pub mod service;
pub mod types;

pub use error::{Result, RuntimeError, SchedulerError};
pub use monitor::{MetricsMonitor, Monitor, NullMonitor};
pub use service::Service;
pub use types::{job_fn, runtime_fn, JobFn, RuntimeFn};

//! `chaind-core` — configuration, logging setup and the shared error type
//! used by the chaind services.

pub mod config;
pub mod error;
pub mod telemetry;

pub use config::{ChaindConfig, LogFormat, LoggingConfig, SchedulerConfig};
pub use error::{ChaindError, Result};
pub use telemetry::init_tracing;

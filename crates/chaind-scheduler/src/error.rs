use thiserror::Error;

/// Errors returned synchronously by the scheduler's control operations.
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// The job name was empty.
    #[error("No job name supplied")]
    NoJobName,

    /// No job function was supplied.
    #[error("No job function supplied")]
    NoJobFunc,

    /// A periodic job was scheduled without a runtime function.
    #[error("No runtime function supplied")]
    NoRuntimeFunc,

    /// Another job is currently registered under the same name.
    #[error("Job already exists: {name}")]
    JobAlreadyExists { name: String },

    /// No job with the given name is registered.
    #[error("Job not found: {name}")]
    NoSuchJob { name: String },

    /// A run was requested while the job function is executing.
    #[error("Job already running: {name}")]
    JobRunning { name: String },

    /// A run was requested after the job was retired or cancelled.
    #[error("Job already finalised: {name}")]
    JobFinalised { name: String },
}

impl SchedulerError {
    /// Short error code string, stable across releases.
    pub fn code(&self) -> &'static str {
        match self {
            SchedulerError::NoJobName => "NO_JOB_NAME",
            SchedulerError::NoJobFunc => "NO_JOB_FUNC",
            SchedulerError::NoRuntimeFunc => "NO_RUNTIME_FUNC",
            SchedulerError::JobAlreadyExists { .. } => "JOB_ALREADY_EXISTS",
            SchedulerError::NoSuchJob { .. } => "NO_SUCH_JOB",
            SchedulerError::JobRunning { .. } => "JOB_RUNNING",
            SchedulerError::JobFinalised { .. } => "JOB_FINALISED",
        }
    }
}

/// Outcome of a periodic job's runtime function other than a next instant.
#[derive(Debug, Error)]
pub enum RuntimeError {
    /// Clean end of the schedule; not reported as a failure.
    #[error("No more instances")]
    NoMoreInstances,

    #[error("Runtime computation failed: {0}")]
    Failed(String),
}

impl From<anyhow::Error> for RuntimeError {
    fn from(err: anyhow::Error) -> Self {
        RuntimeError::Failed(format!("{err:#}"))
    }
}

pub type Result<T> = std::result::Result<T, SchedulerError>;

use std::{future::Future, sync::Arc};

use chrono::{DateTime, Utc};
use futures_util::future::{BoxFuture, FutureExt};
use tokio_util::sync::CancellationToken;

use crate::error::RuntimeError;

/// The unit of work a job runs.
///
/// Receives the parent token the job was scheduled under and the caller's
/// data. Failures are the job's own business; the scheduler only awaits it.
pub type JobFn<D> = Arc<dyn Fn(CancellationToken, Arc<D>) -> BoxFuture<'static, ()> + Send + Sync>;

/// Computes the next execution instant of a periodic job.
///
/// Returning [`RuntimeError::NoMoreInstances`] ends the schedule cleanly.
pub type RuntimeFn<R> = Arc<
    dyn Fn(CancellationToken, Arc<R>) -> BoxFuture<'static, Result<DateTime<Utc>, RuntimeError>>
        + Send
        + Sync,
>;

/// Box an async closure into a [`JobFn`].
pub fn job_fn<D, F, Fut>(f: F) -> JobFn<D>
where
    F: Fn(CancellationToken, Arc<D>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    Arc::new(move |ctx: CancellationToken, data: Arc<D>| f(ctx, data).boxed())
}

/// Box an async closure into a [`RuntimeFn`].
pub fn runtime_fn<R, F, Fut>(f: F) -> RuntimeFn<R>
where
    F: Fn(CancellationToken, Arc<R>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<DateTime<Utc>, RuntimeError>> + Send + 'static,
{
    Arc::new(move |ctx: CancellationToken, data: Arc<R>| f(ctx, data).boxed())
}

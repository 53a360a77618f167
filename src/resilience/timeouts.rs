//! Caller deadline enforcement.

use std::future::Future;
use std::time::Duration;
use tokio::time;

use crate::error::{RouterError, RouterResult};

/// Race `fut` against `deadline`. Dropping the losing future cancels any
/// database round trip it was awaiting.
pub async fn with_deadline<F, T>(deadline: Option<Duration>, fut: F) -> RouterResult<T>
where
    F: Future<Output = RouterResult<T>>,
{
    match deadline {
        Some(limit) => time::timeout(limit, fut)
            .await
            .map_err(|_| RouterError::Timeout(limit))?,
        None => fut.await,
    }
}

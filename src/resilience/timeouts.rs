//! Timeout enforcement.
//!
//! # Responsibilities
//! - Bound the user-facing waits (wallet connect, signature approval)
//! - Report a timeout distinctly from other failures
//!
//! HTTP calls are bounded by the client's own request timeout instead.

use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use tokio::time::timeout;

/// The bounded wait elapsed before the future resolved.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("timed out after {}s", .limit.as_secs())]
pub struct DeadlineElapsed {
    pub limit: Duration,
}

/// Await `fut`, giving up after `limit`. `None` waits indefinitely.
///
/// On timeout the future is dropped, so a completion arriving later is
/// never observed.
pub async fn with_deadline<F: Future>(
    limit: Option<Duration>,
    fut: F,
) -> Result<F::Output, DeadlineElapsed> {
    match limit {
        Some(limit) => timeout(limit, fut).await.map_err(|_| DeadlineElapsed { limit }),
        None => Ok(fut.await),
    }
}

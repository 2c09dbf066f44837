//! Cancellation-aware awaiting.

use std::future::Future;
use tokio_util::sync::CancellationToken;

/// Race `fut` against `token`. Returns `None` if the token fired first.
///
/// Cancellation is checked first on every poll, so an already-cancelled
/// token wins even against a ready future. The losing future is dropped.
pub async fn or_cancel<F: Future>(token: &CancellationToken, fut: F) -> Option<F::Output> {
    tokio::select! {
        biased;
        _ = token.cancelled() => None,
        out = fut => Some(out),
    }
}

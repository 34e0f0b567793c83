// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::error::BridgeError;

/// Run `fut` until it finishes, `limit` elapses, or `cancel` fires
///
/// Dropping the inner future only stops local waiting. A transaction that was
/// already broadcast stays broadcast.
pub async fn bounded<T, F>(
    operation: &str,
    limit: Duration,
    cancel: &CancellationToken,
    fut: F,
) -> Result<T, BridgeError>
where
    F: Future<Output = Result<T, BridgeError>>,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => {
            warn!("⏹️  {} abandoned", operation);
            Err(BridgeError::Abandoned(operation.to_string()))
        }
        res = tokio::time::timeout(limit, fut) => match res {
            Ok(inner) => inner,
            Err(_) => {
                warn!("⏱️  {} timed out after {:?}", operation, limit);
                Err(BridgeError::Timeout {
                    operation: operation.to_string(),
                    after: limit,
                })
            }
        },
    }
}

use std::future::Future;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use kc_core::core::{
    ArtifactKind, ArtifactStatus, AudioId, ConsoleBackend, ConsoleError, PollError, TransportError,
};

// ---------------------------------------------------------------------------
// PollConfig — fixed-interval retry budget
// ---------------------------------------------------------------------------

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PollConfig {
    pub interval: Duration,
    pub max_attempts: u32,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(2),
            max_attempts: 30,
        }
    }
}

// ---------------------------------------------------------------------------
// poll_until — generic fixed-interval poller
// ---------------------------------------------------------------------------

/// Calls `attempt` until it yields `Some`, the budget runs out, or `cancel`
/// fires.
///
/// Connection failures count as a pending attempt. Any other transport error
/// ends polling immediately.
pub async fn poll_until<T, F, Fut>(
    config: &PollConfig,
    cancel: &CancellationToken,
    mut attempt: F,
) -> Result<T, ConsoleError>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<Option<T>, TransportError>>,
{
    for n in 1..=config.max_attempts {
        if cancel.is_cancelled() {
            return Err(PollError::Cancelled.into());
        }

        match attempt(n).await {
            Ok(Some(value)) => return Ok(value),
            Ok(None) => tracing::debug!(attempt = n, "not ready yet"),
            Err(TransportError::Connection { url, message }) => {
                tracing::warn!(attempt = n, %url, %message, "poll attempt could not connect");
            }
            Err(e) => return Err(e.into()),
        }

        if n == config.max_attempts {
            break;
        }

        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::warn!(attempt = n, "polling cancelled");
                return Err(PollError::Cancelled.into());
            }
            _ = tokio::time::sleep(config.interval) => {}
        }
    }

    tracing::warn!(attempts = config.max_attempts, "polling gave up");
    Err(PollError::TimedOut {
        attempts: config.max_attempts,
    }
    .into())
}

/// Waits for a transcript or translation to become available.
pub async fn poll_artifact(
    backend: &dyn ConsoleBackend,
    audio: &AudioId,
    kind: ArtifactKind,
    config: &PollConfig,
    cancel: &CancellationToken,
) -> Result<String, ConsoleError> {
    tracing::info!(audio_id = %audio, %kind, "waiting for artifact");
    let text = poll_until(config, cancel, |_| async move {
        Ok(match backend.fetch_artifact(audio, kind).await? {
            ArtifactStatus::Ready(text) => Some(text),
            ArtifactStatus::Pending => None,
        })
    })
    .await?;
    tracing::info!(audio_id = %audio, %kind, chars = text.len(), "artifact ready");
    Ok(text)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

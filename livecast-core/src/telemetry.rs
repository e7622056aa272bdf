use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
#[error("Telemetry call failed: {0}")]
pub struct TelemetryError(pub String);

/// Join/leave tracking for a broadcast.
///
/// Calls are fire-and-forget from the session's point of view. Failures are
/// logged and swallowed, never surfaced to the viewer.
#[async_trait]
pub trait Telemetry: Send + Sync + 'static {
    async fn track_joined(
        &self,
        broadcaster_id: &str,
        user_id: &str,
    ) -> Result<(), TelemetryError>;

    async fn track_left(&self, broadcaster_id: &str, user_id: &str) -> Result<(), TelemetryError>;
}

use async_trait::async_trait;
use crossbeam::atomic::AtomicCell;

use livecast_core::{Telemetry, TelemetryError};

/// Telemetry that records calls and always succeeds.
#[derive(Default)]
pub struct NullTelemetry {
    joins: AtomicCell<u32>,
    leaves: AtomicCell<u32>,
}

impl NullTelemetry {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn joins(&self) -> u32 {
        self.joins.load()
    }

    pub fn leaves(&self) -> u32 {
        self.leaves.load()
    }
}

#[async_trait]
impl Telemetry for NullTelemetry {
    async fn track_joined(
        &self,
        _broadcaster_id: &str,
        _user_id: &str,
    ) -> Result<(), TelemetryError> {
        self.joins.fetch_add(1);
        Ok(())
    }

    async fn track_left(
        &self,
        _broadcaster_id: &str,
        _user_id: &str,
    ) -> Result<(), TelemetryError> {
        self.leaves.fetch_add(1);
        Ok(())
    }
}

/// Telemetry that always fails, for verifying failures stay swallowed.
#[derive(Default)]
pub struct FailingTelemetry {
    attempts: AtomicCell<u32>,
}

impl FailingTelemetry {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn attempts(&self) -> u32 {
        self.attempts.load()
    }
}

#[async_trait]
impl Telemetry for FailingTelemetry {
    async fn track_joined(
        &self,
        _broadcaster_id: &str,
        _user_id: &str,
    ) -> Result<(), TelemetryError> {
        self.attempts.fetch_add(1);
        Err(TelemetryError("unreachable collector".to_string()))
    }

    async fn track_left(
        &self,
        _broadcaster_id: &str,
        _user_id: &str,
    ) -> Result<(), TelemetryError> {
        self.attempts.fetch_add(1);
        Err(TelemetryError("unreachable collector".to_string()))
    }
}

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::{AcquireError, OwnedSemaphorePermit, Semaphore};

/// Admission gate bounding in-flight calls against one upstream source.
///
/// Waiters are admitted in FIFO order as permits free up. Each adapter gets
/// its own limiter, so total in-flight work is the sum of the caps.
pub struct ConcurrencyLimiter {
    name: &'static str,
    semaphore: Arc<Semaphore>,
    max_in_flight: usize,
}

impl ConcurrencyLimiter {
    /// # Arguments
    /// * `name` - Label used in logs (e.g. "quotes")
    /// * `max_in_flight` - Maximum concurrent calls; zero is treated as one
    pub fn new(name: &'static str, max_in_flight: usize) -> Self {
        let max_in_flight = max_in_flight.max(1);
        Self {
            name,
            semaphore: Arc::new(Semaphore::new(max_in_flight)),
            max_in_flight,
        }
    }

    /// Wait for a slot. The slot is released when the guard is dropped.
    pub async fn acquire(&self) -> Result<LimiterGuard, AcquireError> {
        let permit = self.semaphore.clone().acquire_owned().await?;
        Ok(LimiterGuard { _permit: permit })
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight
    }

    /// Get the current utilization (for monitoring)
    pub fn available_permits(&self) -> usize {
        self.semaphore.available_permits()
    }

    pub fn status(&self) -> LimiterStatus {
        LimiterStatus {
            name: self.name,
            max_in_flight: self.max_in_flight,
            available: self.available_permits(),
        }
    }
}

/// Point-in-time view of a limiter, reported by the health check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LimiterStatus {
    pub name: &'static str,
    pub max_in_flight: usize,
    pub available: usize,
}

/// Holds one admission slot until dropped.
pub struct LimiterGuard {
    _permit: OwnedSemaphorePermit,
}

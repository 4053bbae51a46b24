//! Fixed-interval statistics poller feeding the dashboard view
//!
//! Overlapping polls are not coordinated with locks; instead each poll draws
//! a generation number and a completed poll publishes its snapshot only if
//! no newer generation published first. Newest-generation-wins is the
//! documented policy for slow responses arriving after a later poll started.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::time::{sleep, Duration};
use tracing::{debug, error, info};

use crate::models::AuditLogEntry;
use crate::registry::RegistryClient;

/// Point-in-time statistics rendered by the dashboard
#[derive(Debug, Clone, Serialize)]
pub struct DashboardSnapshot {
    pub total_certificates: u64,
    pub total_users: u64,
    pub total_courses: u64,
    pub total_audit_logs: u64,
    pub recent_audit_logs: Vec<AuditLogEntry>,
    pub refreshed_at: DateTime<Utc>,
}

/// Generation-guarded snapshot slot
pub struct StalenessGate<T> {
    counter: AtomicU64,
    slot: Mutex<(u64, Option<T>)>,
}

impl<T> Default for StalenessGate<T> {
    fn default() -> Self {
        Self {
            counter: AtomicU64::new(0),
            slot: Mutex::new((0, None)),
        }
    }
}

impl<T: Clone> StalenessGate<T> {
    /// Draw a generation token at the start of a request.
    pub fn begin(&self) -> u64 {
        self.counter.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Publish a result; returns false when a newer generation already
    /// published and this one must be discarded.
    pub fn publish(&self, generation: u64, value: T) -> bool {
        let mut slot = self.slot.lock().expect("snapshot lock poisoned");
        if generation < slot.0 {
            return false;
        }
        *slot = (generation, Some(value));
        true
    }

    pub fn get(&self) -> Option<T> {
        self.slot.lock().expect("snapshot lock poisoned").1.clone()
    }
}

pub struct DashboardService {
    registry: Arc<RegistryClient>,
    poll_interval: Duration,
    gate: StalenessGate<DashboardSnapshot>,
}

impl DashboardService {
    pub fn new(registry: Arc<RegistryClient>, poll_interval_seconds: u64) -> Self {
        Self {
            registry,
            poll_interval: Duration::from_secs(poll_interval_seconds.max(1)),
            gate: StalenessGate::default(),
        }
    }

    pub fn snapshot(&self) -> Option<DashboardSnapshot> {
        self.gate.get()
    }

    /// Poll loop; a failed cycle is logged and the next interval proceeds.
    pub async fn start(self: Arc<Self>) -> anyhow::Result<()> {
        info!(
            interval_seconds = self.poll_interval.as_secs(),
            "dashboard poller started"
        );

        loop {
            if let Err(err) = self.poll_once().await {
                error!(error = %err, "dashboard poll cycle failed");
            }

            sleep(self.poll_interval).await;
        }
    }

    pub async fn poll_once(&self) -> anyhow::Result<()> {
        if !self.registry.is_initialized() {
            debug!("dashboard poll skipped, wallet never connected");
            return Ok(());
        }

        let generation = self.gate.begin();
        let snapshot = DashboardSnapshot {
            total_certificates: self.registry.total_certificates().await?,
            total_users: self.registry.total_users().await?,
            total_courses: self.registry.total_courses().await?,
            total_audit_logs: self.registry.total_audit_logs().await?,
            recent_audit_logs: self
                .registry
                .recent_audit_logs(self.registry.audit_window())
                .await?,
            refreshed_at: Utc::now(),
        };

        if !self.gate.publish(generation, snapshot) {
            debug!(generation, "discarding stale dashboard snapshot");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stale_generation_does_not_overwrite_newer_snapshot() {
        let gate = StalenessGate::default();
        let slow = gate.begin();
        let fast = gate.begin();

        assert!(gate.publish(fast, "fresh"));
        // the slow poll finishes late and must be discarded
        assert!(!gate.publish(slow, "stale"));
        assert_eq!(gate.get(), Some("fresh"));
    }

    #[test]
    fn in_order_publishes_win_normally() {
        let gate = StalenessGate::default();
        let first = gate.begin();
        assert!(gate.publish(first, 1));
        let second = gate.begin();
        assert!(gate.publish(second, 2));
        assert_eq!(gate.get(), Some(2));
    }

    #[test]
    fn empty_gate_has_no_snapshot() {
        let gate: StalenessGate<u32> = StalenessGate::default();
        assert_eq!(gate.get(), None);
    }
}

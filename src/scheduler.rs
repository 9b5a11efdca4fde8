//! Periodic scheduling of consistency cycles.
//!
//! One supervisory task owns the checker lifecycle and walks the explicit
//! state machine `Uninitialized -> WaitingForSync -> Running -> Stopped`.
//! Cycles never overlap: the period timer is armed only after the previous
//! cycle has fully completed, and the shutdown signal is honored between
//! cycles, never mid-cycle.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;

use crate::error::CheckerError;
use crate::scanner::ConsistencyChecker;
use crate::stores::ReadinessGate;

/// Lifecycle state of the periodic checker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckerState {
    Uninitialized,
    WaitingForSync,
    Running,
    Stopped,
}

/// Drives [`ConsistencyChecker::run_cycle`] on a fixed period, gated by an
/// initial readiness barrier.
pub struct PeriodChecker {
    checker: Arc<ConsistencyChecker>,
    gate: Arc<dyn ReadinessGate>,
    period: Duration,
    state: CheckerState,
}

impl PeriodChecker {
    pub fn new(
        checker: Arc<ConsistencyChecker>,
        gate: Arc<dyn ReadinessGate>,
        period: Duration,
    ) -> Self {
        Self {
            checker,
            gate,
            period,
            state: CheckerState::Uninitialized,
        }
    }

    pub fn state(&self) -> CheckerState {
        self.state
    }

    /// Run the checker loop until `shutdown` is signalled.
    ///
    /// Blocks first until the backing caches report initial sync. If the
    /// shutdown signal fires before that (or the gate reports failure),
    /// this returns [`CheckerError::SyncFailed`] without ever running a
    /// cycle; it is the only error the host process ever sees from the
    /// checker.
    pub async fn run(&mut self, mut shutdown: watch::Receiver<bool>) -> Result<(), CheckerError> {
        self.state = CheckerState::WaitingForSync;

        let synced = tokio::select! {
            synced = self.gate.wait_for_sync() => synced,
            _ = shutdown_signalled(&mut shutdown) => false,
        };
        if !synced {
            self.state = CheckerState::Stopped;
            return Err(CheckerError::SyncFailed);
        }

        self.state = CheckerState::Running;
        tracing::info!(period = ?self.period, "consistency checker started");

        loop {
            self.run_cycle_guarded().await;

            tokio::select! {
                _ = tokio::time::sleep(self.period) => {}
                _ = shutdown_signalled(&mut shutdown) => break,
            }
        }

        self.state = CheckerState::Stopped;
        tracing::info!("consistency checker stopped");
        Ok(())
    }

    /// Run one cycle on its own task so a panic inside the cycle is
    /// contained and the loop survives to the next tick.
    async fn run_cycle_guarded(&self) {
        let checker = Arc::clone(&self.checker);
        let cycle = tokio::spawn(async move { checker.run_cycle().await });
        match cycle.await {
            Ok(()) => {}
            Err(e) if e.is_panic() => {
                tracing::error!(error = %e, "consistency cycle panicked, continuing at next tick");
            }
            Err(e) => {
                tracing::error!(error = %e, "consistency cycle was cancelled");
            }
        }
    }
}

/// Resolves once the shutdown flag becomes `true`. A dropped sender counts
/// as a shutdown request.
async fn shutdown_signalled(shutdown: &mut watch::Receiver<bool>) {
    while !*shutdown.borrow() {
        if shutdown.changed().await.is_err() {
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::RemediationExecutor;
    use crate::metrics::CheckerMetrics;
    use crate::model::VirtualObject;
    use crate::stores::{
        InMemoryPhysicalStore, InMemoryTenantRegistry, InMemoryTenantStore, ManualReadinessGate,
    };

    struct Harness {
        registry: Arc<InMemoryTenantRegistry>,
        tenants: Arc<InMemoryTenantStore>,
        metrics: CheckerMetrics,
        checker: Arc<ConsistencyChecker>,
    }

    fn harness(tenant_names: &[&str]) -> Harness {
        let registry = Arc::new(InMemoryTenantRegistry::new(
            tenant_names.iter().map(|t| t.to_string()).collect(),
        ));
        let tenants = Arc::new(InMemoryTenantStore::new());
        let physical = Arc::new(InMemoryPhysicalStore::new());
        let metrics = CheckerMetrics::new();
        let executor =
            RemediationExecutor::new(physical.clone(), tenants.clone(), metrics.clone());
        let checker = Arc::new(ConsistencyChecker::new(
            registry.clone(),
            tenants.clone(),
            physical,
            executor,
            metrics.clone(),
        ));
        Harness {
            registry,
            tenants,
            metrics,
            checker,
        }
    }

    #[tokio::test]
    async fn test_shutdown_before_sync_is_a_startup_error() {
        let h = harness(&["t1"]);
        let gate = Arc::new(ManualReadinessGate::pending());
        let mut period_checker = PeriodChecker::new(h.checker, gate, Duration::from_secs(60));

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        shutdown_tx.send(true).unwrap();

        let result = period_checker.run(shutdown_rx).await;
        assert!(matches!(result, Err(CheckerError::SyncFailed)));
        assert_eq!(period_checker.state(), CheckerState::Stopped);
        // No cycle ever ran.
        assert_eq!(h.metrics.cycles_completed(), 0);
    }

    #[tokio::test]
    async fn test_runs_cycles_until_shutdown() {
        let h = harness(&["t1"]);
        h.tenants.insert(VirtualObject::new("t1", "ns1", "u1")).await;

        let gate = Arc::new(ManualReadinessGate::synced());
        let mut period_checker =
            PeriodChecker::new(h.checker, gate, Duration::from_millis(10));

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let loop_task = tokio::spawn(async move { period_checker.run(shutdown_rx).await });

        // Give the loop time for a few cycles, then stop it.
        tokio::time::sleep(Duration::from_millis(100)).await;
        shutdown_tx.send(true).unwrap();

        loop_task.await.unwrap().unwrap();
        assert!(h.metrics.cycles_completed() >= 2);
        // Each cycle requeued the perpetually missing object.
        assert_eq!(
            h.tenants.requeued().await.len(),
            h.metrics.virtual_objects_requeued()
        );
    }

    #[tokio::test]
    async fn test_gate_released_later_lets_loop_start() {
        let h = harness(&[]);
        let gate = Arc::new(ManualReadinessGate::pending());
        let mut period_checker =
            PeriodChecker::new(h.checker, gate.clone(), Duration::from_millis(10));

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let loop_task = tokio::spawn(async move { period_checker.run(shutdown_rx).await });

        // Not synced yet: the loop must still be parked at the barrier.
        tokio::time::sleep(Duration::from_millis(20)).await;
        gate.mark_synced();
        tokio::time::sleep(Duration::from_millis(20)).await;
        shutdown_tx.send(true).unwrap();

        assert!(loop_task.await.unwrap().is_ok());
    }

    #[tokio::test]
    async fn test_panicking_cycle_does_not_kill_loop() {
        let h = harness(&["t1"]);
        h.tenants.insert(VirtualObject::new("t1", "ns1", "u1")).await;
        // The first cycle dies mid-scan; the supervisor must contain it.
        h.registry.panic_on_next_list();

        let gate = Arc::new(ManualReadinessGate::synced());
        let mut period_checker =
            PeriodChecker::new(h.checker, gate, Duration::from_millis(10));

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let loop_task = tokio::spawn(async move { period_checker.run(shutdown_rx).await });

        tokio::time::sleep(Duration::from_millis(100)).await;
        shutdown_tx.send(true).unwrap();
        loop_task.await.unwrap().unwrap();

        // The panicked cycle recorded nothing, but later ticks ran and
        // remediated as usual.
        assert!(h.metrics.cycles_completed() >= 1);
        assert!(!h.tenants.requeued().await.is_empty());
    }

    #[tokio::test]
    async fn test_dropped_shutdown_sender_stops_loop() {
        let h = harness(&[]);
        let gate = Arc::new(ManualReadinessGate::synced());
        let mut period_checker = PeriodChecker::new(h.checker, gate, Duration::from_millis(5));

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let loop_task = tokio::spawn(async move { period_checker.run(shutdown_rx).await });

        // Let the loop pass the readiness barrier before the sender goes
        // away, so the drop is seen as a between-cycles stop request.
        tokio::time::sleep(Duration::from_millis(20)).await;
        drop(shutdown_tx);
        assert!(loop_task.await.unwrap().is_ok());
    }
}

//! Recovery decision engine.
//!
//! Classifies each observed container into exactly one action per poll
//! cycle: emit a recovery notice, attempt a restart, or leave it alone. The
//! [`RecoveryTracker`] is the only state the engine keeps between cycles —
//! the set of containers it restarted and has not yet seen healthy again.

use std::collections::HashSet;

use crate::docker::ContainerRuntime;
use crate::health::{ContainerObservation, HealthStatus, RuntimeStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Restarted,
    Recovered,
    RestartFailed,
}

/// One-shot notification payload, produced once per action and handed to
/// the notifier. Never persisted.
#[derive(Debug, Clone)]
pub struct ContainerEvent {
    pub kind: EventKind,
    pub container: String,
    pub runtime_status: RuntimeStatus,
    pub health_status: HealthStatus,
    pub health_log: Option<String>,
    pub error: Option<String>,
}

impl ContainerEvent {
    /// Restart attempts, successful or not, count towards the scheduler's
    /// post-restart backoff. A recovery notice does not.
    pub fn is_restart_attempt(&self) -> bool {
        matches!(self.kind, EventKind::Restarted | EventKind::RestartFailed)
    }
}

/// Containers restarted by this process that have not yet reported healthy.
/// In-memory only; a daemon restart forgets pending recoveries.
#[derive(Debug, Default)]
pub struct RecoveryTracker {
    inner: HashSet<String>,
}

impl RecoveryTracker {
    pub fn insert(&mut self, id: &str) {
        self.inner.insert(id.to_string());
    }

    pub fn remove(&mut self, id: &str) {
        self.inner.remove(id);
    }

    pub fn contains(&self, id: &str) -> bool {
        self.inner.contains(id)
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

#[derive(Debug, Default)]
pub struct DecisionEngine {
    tracker: RecoveryTracker,
}

impl DecisionEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tracker(&self) -> &RecoveryTracker {
        &self.tracker
    }

    /// Evaluate one container against the fixed priority order. First match
    /// wins: a container cannot both recover and restart in the same cycle.
    pub async fn evaluate<R: ContainerRuntime>(
        &mut self,
        runtime: &R,
        observation: &ContainerObservation,
    ) -> Option<ContainerEvent> {
        if self.tracker.contains(&observation.id)
            && observation.health_status == HealthStatus::Healthy
        {
            log::info!(
                "Container {} has recovered and is now healthy!",
                observation.name
            );
            self.tracker.remove(&observation.id);
            return Some(ContainerEvent {
                kind: EventKind::Recovered,
                container: observation.name.clone(),
                runtime_status: observation.runtime_status,
                health_status: observation.health_status,
                health_log: None,
                error: None,
            });
        }

        // Exited is sufficient on its own: containers without a healthcheck
        // still get restarted when they stop. A tracked container that is
        // still unhealthy lands here again and is retried — there is no
        // restart cap and no backoff beyond the scheduler's post-restart
        // interval.
        if observation.health_status == HealthStatus::Unhealthy
            || observation.runtime_status == RuntimeStatus::Exited
        {
            log::error!(
                "Found container in unhealthy state! Container: '{}' has health status: '{}' and container status: '{}' with output log: {}",
                observation.name,
                observation.health_status,
                observation.runtime_status,
                observation.health_log
            );
            return Some(self.restart(runtime, observation).await);
        }

        log::debug!(
            "{} - {} - {}",
            observation.name,
            observation.health_status,
            observation.runtime_status
        );
        None
    }

    async fn restart<R: ContainerRuntime>(
        &mut self,
        runtime: &R,
        observation: &ContainerObservation,
    ) -> ContainerEvent {
        match runtime.restart_container(&observation.id).await {
            Ok(()) => {
                log::info!("Restarted container: {}", observation.name);
                self.tracker.insert(&observation.id);
                ContainerEvent {
                    kind: EventKind::Restarted,
                    container: observation.name.clone(),
                    runtime_status: observation.runtime_status,
                    health_status: observation.health_status,
                    health_log: Some(observation.health_log.clone()),
                    error: None,
                }
            }
            Err(err) => {
                // A failed restart leaves no recovery to watch for, so the
                // tracker stays untouched.
                log::error!(
                    "Docker daemon failed to restart container {}: {}",
                    observation.name,
                    err
                );
                ContainerEvent {
                    kind: EventKind::RestartFailed,
                    container: observation.name.clone(),
                    runtime_status: observation.runtime_status,
                    health_status: observation.health_status,
                    health_log: None,
                    error: Some(err.to_string()),
                }
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::docker::RuntimeError;
    use async_trait::async_trait;
    use quickcheck_macros::quickcheck;
    use std::sync::Mutex;

    /// Scripted runtime: restarts succeed unless the id is marked failing,
    /// every restart call is recorded.
    #[derive(Default)]
    pub(crate) struct MockRuntime {
        pub observations: Mutex<Vec<ContainerObservation>>,
        pub failing_ids: HashSet<String>,
        pub restarts: Mutex<Vec<String>>,
        pub list_fails: bool,
    }

    #[async_trait]
    impl ContainerRuntime for MockRuntime {
        async fn list_containers(&self) -> Result<Vec<ContainerObservation>, RuntimeError> {
            if self.list_fails {
                return Err(RuntimeError::Unreachable(
                    bollard::errors::Error::DockerResponseServerError {
                        status_code: 500,
                        message: "socket dropped".to_string(),
                    },
                ));
            }
            Ok(self.observations.lock().unwrap().clone())
        }

        async fn restart_container(&self, id: &str) -> Result<(), RuntimeError> {
            self.restarts.lock().unwrap().push(id.to_string());
            if self.failing_ids.contains(id) {
                return Err(RuntimeError::Api(
                    bollard::errors::Error::DockerResponseServerError {
                        status_code: 500,
                        message: "cannot restart".to_string(),
                    },
                ));
            }
            Ok(())
        }
    }

    pub(crate) fn observation(
        id: &str,
        health: HealthStatus,
        status: RuntimeStatus,
    ) -> ContainerObservation {
        ContainerObservation {
            id: id.to_string(),
            name: format!("svc-{id}"),
            runtime_status: status,
            health_status: health,
            health_log: "none".to_string(),
        }
    }

    #[tokio::test]
    async fn test_healthy_untracked_container_is_left_alone() {
        let runtime = MockRuntime::default();
        let mut engine = DecisionEngine::new();
        let obs = observation("c1", HealthStatus::Healthy, RuntimeStatus::Running);

        for _ in 0..5 {
            assert!(engine.evaluate(&runtime, &obs).await.is_none());
        }
        assert!(runtime.restarts.lock().unwrap().is_empty());
        assert!(engine.tracker().is_empty());
    }

    #[tokio::test]
    async fn test_no_healthcheck_running_container_is_left_alone() {
        let runtime = MockRuntime::default();
        let mut engine = DecisionEngine::new();
        let obs = observation("c1", HealthStatus::NoHealthcheck, RuntimeStatus::Running);

        assert!(engine.evaluate(&runtime, &obs).await.is_none());
        assert!(runtime.restarts.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unhealthy_container_restarts_then_recovers() {
        let runtime = MockRuntime::default();
        let mut engine = DecisionEngine::new();

        let mut obs = observation("c1", HealthStatus::Unhealthy, RuntimeStatus::Running);
        obs.health_log = "ping failed".to_string();

        let event = engine.evaluate(&runtime, &obs).await.expect("restart event");
        assert_eq!(event.kind, EventKind::Restarted);
        assert!(event.is_restart_attempt());
        assert_eq!(event.health_log.as_deref(), Some("ping failed"));
        assert!(engine.tracker().contains("c1"));
        assert_eq!(runtime.restarts.lock().unwrap().as_slice(), ["c1"]);

        let obs = observation("c1", HealthStatus::Healthy, RuntimeStatus::Running);
        let event = engine.evaluate(&runtime, &obs).await.expect("recovery event");
        assert_eq!(event.kind, EventKind::Recovered);
        assert!(!event.is_restart_attempt());
        assert!(engine.tracker().is_empty());
        // Recovery issues no second restart call
        assert_eq!(runtime.restarts.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_exited_without_healthcheck_still_restarts() {
        let runtime = MockRuntime::default();
        let mut engine = DecisionEngine::new();
        let obs = observation("c2", HealthStatus::NoHealthcheck, RuntimeStatus::Exited);

        let event = engine.evaluate(&runtime, &obs).await.expect("restart event");
        assert_eq!(event.kind, EventKind::Restarted);
        assert!(engine.tracker().contains("c2"));
    }

    #[tokio::test]
    async fn test_still_unhealthy_container_is_retried_every_cycle() {
        let runtime = MockRuntime::default();
        let mut engine = DecisionEngine::new();
        let obs = observation("c1", HealthStatus::Unhealthy, RuntimeStatus::Running);

        for _ in 0..4 {
            let event = engine.evaluate(&runtime, &obs).await.expect("restart event");
            assert_eq!(event.kind, EventKind::Restarted);
        }
        // Retried every cycle, but tracked exactly once
        assert_eq!(runtime.restarts.lock().unwrap().len(), 4);
        assert_eq!(engine.tracker().len(), 1);
    }

    #[tokio::test]
    async fn test_failed_restart_is_not_tracked() {
        let mut runtime = MockRuntime::default();
        runtime.failing_ids.insert("c1".to_string());
        let mut engine = DecisionEngine::new();
        let obs = observation("c1", HealthStatus::Unhealthy, RuntimeStatus::Running);

        let event = engine.evaluate(&runtime, &obs).await.expect("failure event");
        assert_eq!(event.kind, EventKind::RestartFailed);
        assert!(event.is_restart_attempt());
        assert!(event.error.is_some());
        assert!(!engine.tracker().contains("c1"));
    }

    #[tokio::test]
    async fn test_tracked_but_starting_container_is_not_recovered() {
        let runtime = MockRuntime::default();
        let mut engine = DecisionEngine::new();

        let obs = observation("c1", HealthStatus::Unhealthy, RuntimeStatus::Running);
        engine.evaluate(&runtime, &obs).await;

        // Starting is neither healthy nor a failure condition
        let obs = observation("c1", HealthStatus::Starting, RuntimeStatus::Running);
        assert!(engine.evaluate(&runtime, &obs).await.is_none());
        assert!(engine.tracker().contains("c1"));
    }

    #[quickcheck]
    fn tracker_insert_is_idempotent(id: String, repeats: u8) -> bool {
        let mut tracker = RecoveryTracker::default();
        for _ in 0..=repeats {
            tracker.insert(&id);
        }
        tracker.len() == 1 && tracker.contains(&id)
    }

    #[quickcheck]
    fn tracker_remove_undoes_insert(ids: Vec<String>) -> bool {
        let mut tracker = RecoveryTracker::default();
        for id in &ids {
            tracker.insert(id);
        }
        for id in &ids {
            tracker.remove(id);
        }
        tracker.is_empty()
    }
}

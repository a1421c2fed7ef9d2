//! Health classification for observed containers.
//!
//! Derives a normalized status reading from the raw state structure the
//! Docker API returns for a container. Absence of data (no healthcheck
//! configured, no log entries yet) is a valid classification, never an
//! error.

use bollard::models::{ContainerState, ContainerStateStatusEnum, HealthStatusEnum};

/// Sentinel for a health log that exists but has no entries yet.
pub const LOG_EMPTY: &str = "empty";
/// Sentinel for a container without health reporting.
pub const LOG_UNAVAILABLE: &str = "none";

/// Healthcheck verdict as reported by the runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthStatus {
    Healthy,
    Unhealthy,
    Starting,
    /// No healthcheck configured for the container. Never a decision basis.
    NoHealthcheck,
}

impl std::fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HealthStatus::Healthy => write!(f, "healthy"),
            HealthStatus::Unhealthy => write!(f, "unhealthy"),
            HealthStatus::Starting => write!(f, "starting"),
            HealthStatus::NoHealthcheck => write!(f, "none"),
        }
    }
}

/// Coarse container lifecycle state. Only `Exited` participates in restart
/// decisions; the rest are carried for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuntimeStatus {
    Created,
    Running,
    Paused,
    Restarting,
    Removing,
    Exited,
    Dead,
    Unknown,
}

impl std::fmt::Display for RuntimeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RuntimeStatus::Created => write!(f, "created"),
            RuntimeStatus::Running => write!(f, "running"),
            RuntimeStatus::Paused => write!(f, "paused"),
            RuntimeStatus::Restarting => write!(f, "restarting"),
            RuntimeStatus::Removing => write!(f, "removing"),
            RuntimeStatus::Exited => write!(f, "exited"),
            RuntimeStatus::Dead => write!(f, "dead"),
            RuntimeStatus::Unknown => write!(f, "unknown"),
        }
    }
}

/// Snapshot of one container, rebuilt from the runtime every poll cycle.
#[derive(Debug, Clone)]
pub struct ContainerObservation {
    /// Short container id, stable for the container's lifetime.
    pub id: String,
    pub name: String,
    pub runtime_status: RuntimeStatus,
    pub health_status: HealthStatus,
    /// Most recent healthcheck output, or a sentinel. Display only.
    pub health_log: String,
}

pub fn runtime_status(state: Option<&ContainerState>) -> RuntimeStatus {
    match state.and_then(|s| s.status) {
        Some(ContainerStateStatusEnum::CREATED) => RuntimeStatus::Created,
        Some(ContainerStateStatusEnum::RUNNING) => RuntimeStatus::Running,
        Some(ContainerStateStatusEnum::PAUSED) => RuntimeStatus::Paused,
        Some(ContainerStateStatusEnum::RESTARTING) => RuntimeStatus::Restarting,
        Some(ContainerStateStatusEnum::REMOVING) => RuntimeStatus::Removing,
        Some(ContainerStateStatusEnum::EXITED) => RuntimeStatus::Exited,
        Some(ContainerStateStatusEnum::DEAD) => RuntimeStatus::Dead,
        Some(ContainerStateStatusEnum::EMPTY) | None => RuntimeStatus::Unknown,
    }
}

pub fn health_status(state: Option<&ContainerState>) -> HealthStatus {
    match state.and_then(|s| s.health.as_ref()).and_then(|h| h.status) {
        Some(HealthStatusEnum::HEALTHY) => HealthStatus::Healthy,
        Some(HealthStatusEnum::UNHEALTHY) => HealthStatus::Unhealthy,
        Some(HealthStatusEnum::STARTING) => HealthStatus::Starting,
        Some(HealthStatusEnum::NONE | HealthStatusEnum::EMPTY) | None => {
            HealthStatus::NoHealthcheck
        }
    }
}

/// Output of the most recent healthcheck run. The log array holds entries
/// oldest first, so the tail is the latest probe.
pub fn health_log_tail(state: Option<&ContainerState>) -> String {
    let Some(health) = state.and_then(|s| s.health.as_ref()) else {
        return LOG_UNAVAILABLE.to_string();
    };
    match health.log.as_deref() {
        None => LOG_UNAVAILABLE.to_string(),
        Some([]) => LOG_EMPTY.to_string(),
        Some(entries) => entries
            .last()
            .and_then(|entry| entry.output.clone())
            .unwrap_or_else(|| LOG_UNAVAILABLE.to_string()),
    }
}

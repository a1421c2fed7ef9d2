//! Docker runtime collaborator built on bollard.
//!
//! The decision engine only sees the [`ContainerRuntime`] trait, so the
//! engine and scheduler can be exercised in tests without a Docker socket.

use async_trait::async_trait;
use bollard::Docker;
use bollard::query_parameters::{
    InspectContainerOptions, InspectContainerOptionsBuilder, ListContainersOptions,
    ListContainersOptionsBuilder, RestartContainerOptions, RestartContainerOptionsBuilder,
};

use crate::health::{self, ContainerObservation};

const SHORT_ID_LEN: usize = 12;

#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    #[error("container runtime unreachable: {0}")]
    Unreachable(bollard::errors::Error),
    #[error("docker api error: {0}")]
    Api(#[from] bollard::errors::Error),
}

#[async_trait]
pub trait ContainerRuntime {
    /// Enumerate every container visible to the runtime, stopped ones
    /// included. Exited containers must stay visible to be restartable.
    async fn list_containers(&self) -> Result<Vec<ContainerObservation>, RuntimeError>;

    async fn restart_container(&self, id: &str) -> Result<(), RuntimeError>;
}

pub struct DockerRuntime {
    docker: Docker,
}

impl DockerRuntime {
    /// Connect to the local Docker socket and verify it answers. A failure
    /// here is fatal at startup; the caller decides how to exit.
    pub async fn connect() -> Result<Self, RuntimeError> {
        let docker = Docker::connect_with_local_defaults().map_err(RuntimeError::Unreachable)?;
        docker.version().await.map_err(RuntimeError::Unreachable)?;
        Ok(Self { docker })
    }
}

#[async_trait]
impl ContainerRuntime for DockerRuntime {
    async fn list_containers(&self) -> Result<Vec<ContainerObservation>, RuntimeError> {
        let options: ListContainersOptions = ListContainersOptionsBuilder::new().all(true).build();
        let summaries = self.docker.list_containers(Some(options)).await?;

        let mut observations = Vec::with_capacity(summaries.len());
        for summary in summaries {
            let Some(id) = summary.id else { continue };
            let name = summary
                .names
                .as_ref()
                .and_then(|names| names.first())
                .map(|name| name.trim_start_matches('/').to_string())
                .unwrap_or_else(|| short_id(&id).to_string());

            // Health reporting only shows up in the inspect view, not the
            // list summary. An inspect failure skips this container for the
            // cycle rather than failing the whole enumeration.
            let options: InspectContainerOptions = InspectContainerOptionsBuilder::new().build();
            let info = match self.docker.inspect_container(&id, Some(options)).await {
                Ok(info) => info,
                Err(err) => {
                    log::warn!("Failed to inspect container {name}: {err}");
                    continue;
                }
            };

            let state = info.state.as_ref();
            observations.push(ContainerObservation {
                id: short_id(&id).to_string(),
                name,
                runtime_status: health::runtime_status(state),
                health_status: health::health_status(state),
                health_log: health::health_log_tail(state),
            });
        }
        Ok(observations)
    }

    async fn restart_container(&self, id: &str) -> Result<(), RuntimeError> {
        let options: RestartContainerOptions = RestartContainerOptionsBuilder::new().build();
        self.docker.restart_container(id, Some(options)).await?;
        Ok(())
    }
}

fn short_id(id: &str) -> &str {
    &id[..id.len().min(SHORT_ID_LEN)]
}

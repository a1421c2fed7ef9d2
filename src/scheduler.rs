//! Poll loop driving the decision engine.
//!
//! One cycle enumerates every container, evaluates each one, dispatches the
//! resulting notifications, then sleeps. A cycle that attempted at least one
//! restart sleeps the longer post-restart interval so restarted containers
//! get time to stabilize instead of feeding a restart storm.

use std::time::Duration;

use crate::config::WatchdogConfig;
use crate::docker::ContainerRuntime;
use crate::engine::DecisionEngine;
use crate::notify::Notifier;

pub struct PollScheduler<R> {
    runtime: R,
    engine: DecisionEngine,
    notifier: Notifier,
    steady_interval: Duration,
    post_restart_interval: Duration,
}

impl<R: ContainerRuntime> PollScheduler<R> {
    pub fn new(config: &WatchdogConfig, runtime: R, notifier: Notifier) -> Self {
        Self {
            runtime,
            engine: DecisionEngine::new(),
            notifier,
            steady_interval: config.polling_interval,
            post_restart_interval: config.post_restart_interval,
        }
    }

    /// Runs until the process is terminated externally; there is no
    /// shutdown command.
    pub async fn run(mut self) {
        loop {
            let had_action = self.run_cycle().await;
            if !self.engine.tracker().is_empty() {
                log::debug!(
                    "{} containers awaiting recovery",
                    self.engine.tracker().len()
                );
            }
            let interval = self.interval_after(had_action);
            if had_action {
                log::info!(
                    "Waiting {} seconds until next polling, because a container was restarted",
                    interval.as_secs()
                );
            } else {
                log::info!("All containers are in healthy state!");
            }
            tokio::time::sleep(interval).await;
        }
    }

    /// One pass over all containers. Returns whether any restart was
    /// attempted. An enumeration failure mid-run is logged and treated as a
    /// cycle with no observations; only the startup connectivity check is
    /// fatal.
    async fn run_cycle(&mut self) -> bool {
        let observations = match self.runtime.list_containers().await {
            Ok(observations) => observations,
            Err(err) => {
                log::error!("Failed to enumerate containers, skipping cycle: {err}");
                return false;
            }
        };

        let mut had_action = false;
        for observation in &observations {
            if let Some(event) = self.engine.evaluate(&self.runtime, observation).await {
                had_action |= event.is_restart_attempt();
                self.notifier.dispatch(&event).await;
            }
        }
        had_action
    }

    fn interval_after(&self, had_action: bool) -> Duration {
        if had_action {
            self.post_restart_interval
        } else {
            self.steady_interval
        }
    }
}

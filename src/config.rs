//! Environment-based configuration.
//!
//! Every key is optional with a default; there are no CLI flags and no
//! config file. Empty values are treated as unset.

use std::time::Duration;

const DEFAULT_POLLING_INTERVAL_SECS: u64 = 20;
const DEFAULT_POST_RESTART_INTERVAL_SECS: u64 = 600;
const DEFAULT_DOCKER_HOST: &str = "UNKNOWN";

#[derive(Debug, Clone)]
pub struct WatchdogConfig {
    /// Sleep between cycles when nothing happened.
    pub polling_interval: Duration,
    /// Longer sleep after a cycle that attempted a restart, to give
    /// restarted containers time to stabilize.
    pub post_restart_interval: Duration,
    /// Host label used in notification text.
    pub docker_host: String,
    pub slack_webhook_url: Option<String>,
    pub email_sender: String,
    pub email_receiver: Option<String>,
    pub smtp_server: Option<String>,
}

impl Default for WatchdogConfig {
    fn default() -> Self {
        Self {
            polling_interval: Duration::from_secs(DEFAULT_POLLING_INTERVAL_SECS),
            post_restart_interval: Duration::from_secs(DEFAULT_POST_RESTART_INTERVAL_SECS),
            docker_host: DEFAULT_DOCKER_HOST.to_string(),
            slack_webhook_url: None,
            email_sender: String::new(),
            email_receiver: None,
            smtp_server: None,
        }
    }
}

impl WatchdogConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            polling_interval: Duration::from_secs(parse_seconds(
                &lookup,
                "POLLING_INTERVAL",
                DEFAULT_POLLING_INTERVAL_SECS,
            )),
            post_restart_interval: Duration::from_secs(parse_seconds(
                &lookup,
                "POLLING_INTERVAL_AFTER_RESTART",
                DEFAULT_POST_RESTART_INTERVAL_SECS,
            )),
            docker_host: non_empty(lookup("DOCKER_HOSTMACHINE"))
                .unwrap_or_else(|| DEFAULT_DOCKER_HOST.to_string()),
            slack_webhook_url: non_empty(lookup("SLACK_WEBHOOK_URL")),
            email_sender: non_empty(lookup("EMAIL_SENDER")).unwrap_or_default(),
            email_receiver: non_empty(lookup("EMAIL_RECEIVER")),
            smtp_server: non_empty(lookup("SMTP_SERVER")),
        }
    }
}

fn parse_seconds(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: u64) -> u64 {
    match lookup(key) {
        Some(raw) => match raw.trim().parse() {
            Ok(secs) => secs,
            Err(_) => {
                log::warn!("Invalid value '{raw}' for {key}, using default of {default} seconds");
                default
            }
        },
        None => default,
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

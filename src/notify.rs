//! Notification formatting and delivery.
//!
//! One text is rendered per container event and fanned out to the webhook
//! and email transports independently. A failure on one transport never
//! blocks the other and never aborts the poll cycle; an unconfigured
//! transport is a silent no-op.

use std::time::Duration;

use lettre::message::Mailbox;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use serde::Serialize;

use crate::config::WatchdogConfig;
use crate::engine::{ContainerEvent, EventKind};
use crate::health::LOG_UNAVAILABLE;

const EMAIL_SUBJECT: &str = "Container Watchdog Alert notification";
const SMTP_PORT: u16 = 25;
const SMTP_TIMEOUT: Duration = Duration::from_secs(40);

#[derive(Serialize)]
struct WebhookPayload<'a> {
    text: &'a str,
}

struct Webhook {
    url: String,
    client: reqwest::Client,
}

impl Webhook {
    async fn post(&self, text: &str) {
        let payload = WebhookPayload { text };
        let result = self
            .client
            .post(&self.url)
            .json(&payload)
            .send()
            .await
            .and_then(|response| response.error_for_status());
        match result {
            Ok(_) => log::info!("Message sent to webhook: {text}"),
            Err(err) => log::error!("Failed to post notification to webhook: {err}"),
        }
    }
}

struct Email {
    sender: Mailbox,
    receiver: Mailbox,
    transport: AsyncSmtpTransport<Tokio1Executor>,
}

impl Email {
    async fn send(&self, text: &str) {
        let body = sanitize_for_email(text);
        let message = Message::builder()
            .from(self.sender.clone())
            .to(self.receiver.clone())
            .subject(EMAIL_SUBJECT)
            .body(body.clone());
        let message = match message {
            Ok(message) => message,
            Err(err) => {
                log::error!("Failed to build alert email: {err}");
                return;
            }
        };
        match self.transport.send(message).await {
            Ok(_) => log::info!("Email sent to {} with content: {body}", self.receiver),
            Err(err) => log::error!("Failed to send alert email: {err}"),
        }
    }
}

/// Mail relays on the alert path choke on markdown, so the body keeps only
/// alphanumerics, spaces and colons.
fn sanitize_for_email(text: &str) -> String {
    text.chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == ' ' || *c == ':')
        .collect()
}

pub struct Notifier {
    host: String,
    webhook: Option<Webhook>,
    email: Option<Email>,
}

impl Notifier {
    pub fn from_config(config: &WatchdogConfig) -> Self {
        let webhook = config.slack_webhook_url.as_ref().map(|url| Webhook {
            url: url.clone(),
            client: reqwest::Client::new(),
        });
        let email = match (&config.email_receiver, &config.smtp_server) {
            (Some(receiver), Some(server)) => {
                build_email(&config.email_sender, receiver, server)
            }
            _ => None,
        };
        Self {
            host: config.docker_host.clone(),
            webhook,
            email,
        }
    }

    /// Deliver to every configured transport. Each transport logs its own
    /// outcome; errors are swallowed here.
    pub async fn dispatch(&self, event: &ContainerEvent) {
        let text = self.render(event);
        if let Some(webhook) = &self.webhook {
            webhook.post(&text).await;
        }
        if let Some(email) = &self.email {
            email.send(&text).await;
        }
    }

    fn render(&self, event: &ContainerEvent) -> String {
        match event.kind {
            EventKind::Restarted => format!(
                "[Container watchdog]: Container restarted\n\
                 \tHost: [ *_{host}_* ]\n\
                 \tContainer: [ *_{container}_* ]\n\
                 \tState: [ *_{state}_* ]\n\
                 \tHealthstatus: [ *_{health}_* ]\n\
                 \tOutput: [ _{output}_ ]",
                host = self.host,
                container = event.container,
                state = event.runtime_status,
                health = event.health_status,
                output = event.health_log.as_deref().unwrap_or(LOG_UNAVAILABLE),
            ),
            EventKind::Recovered => format!(
                "[Container watchdog]: Container has recovered\n\
                 \tHost: [ *_{host}_* ]\n\
                 \tContainer: [ *_{container}_* ]\n\
                 \tState: [ *_{state}_* ]\n\
                 \tHealthstatus: [ *_{health}_* ]",
                host = self.host,
                container = event.container,
                state = event.runtime_status,
                health = event.health_status,
            ),
            EventKind::RestartFailed => format!(
                "[Container watchdog]: Docker daemon failed to restart container \
                 *{container}* on hostmachine *{host}* with error message: _{error}_",
                container = event.container,
                host = self.host,
                error = event.error.as_deref().unwrap_or("unknown error"),
            ),
        }
    }
}

fn build_email(sender: &str, receiver: &str, server: &str) -> Option<Email> {
    let sender: Mailbox = match sender.parse() {
        Ok(sender) => sender,
        Err(err) => {
            log::warn!("Invalid sender address '{sender}', email notifications disabled: {err}");
            return None;
        }
    };
    let receiver: Mailbox = match receiver.parse() {
        Ok(receiver) => receiver,
        Err(err) => {
            log::warn!(
                "Invalid receiver address '{receiver}', email notifications disabled: {err}"
            );
            return None;
        }
    };
    let transport = AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(server)
        .port(SMTP_PORT)
        .timeout(Some(SMTP_TIMEOUT))
        .build();
    Some(Email {
        sender,
        receiver,
        transport,
    })
}

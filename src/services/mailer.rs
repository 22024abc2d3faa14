// src/services/mailer.rs

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

use crate::config::Config;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MailMessage {
    pub to: String,
    pub subject: String,
    pub body: String,
}

#[derive(Debug, Error)]
pub enum MailError {
    #[error("mail transport error: {0}")]
    Transport(String),

    #[error("mail provider rejected the message with status {status}: {body}")]
    Rejected { status: u16, body: String },
}

/// Outgoing mail. Failures must be reported synchronously: registration
/// rolls back when `send` returns an error.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, message: &MailMessage) -> Result<(), MailError>;
}

/// Writes every message to the log. Used when no mail provider is configured.
#[derive(Debug, Default)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, message: &MailMessage) -> Result<(), MailError> {
        tracing::info!(
            to = %message.to,
            subject = %message.subject,
            "outgoing mail (log transport):\n{}",
            message.body
        );
        Ok(())
    }
}

/// Keeps sent messages in memory for later inspection.
#[derive(Debug, Default)]
pub struct MemoryMailer {
    sent: Mutex<Vec<MailMessage>>,
}

impl MemoryMailer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<MailMessage> {
        self.sent
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Last message addressed to `to`, if any.
    pub fn last_to(&self, to: &str) -> Option<MailMessage> {
        self.sent().into_iter().rev().find(|m| m.to == to)
    }
}

#[async_trait]
impl Mailer for MemoryMailer {
    async fn send(&self, message: &MailMessage) -> Result<(), MailError> {
        self.sent
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(message.clone());
        Ok(())
    }
}

/// Posts messages as JSON to a transactional mail API.
///
/// Body: `{"from", "to", "subject", "text"}`, with an optional bearer token.
/// Any non-2xx answer is a failure.
pub struct HttpMailer {
    client: reqwest::Client,
    endpoint: String,
    token: Option<String>,
    from: String,
}

#[derive(Serialize)]
struct OutgoingMail<'a> {
    from: &'a str,
    to: &'a str,
    subject: &'a str,
    text: &'a str,
}

impl HttpMailer {
    pub fn new(endpoint: String, token: Option<String>, from: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint,
            token,
            from,
        }
    }
}

#[async_trait]
impl Mailer for HttpMailer {
    async fn send(&self, message: &MailMessage) -> Result<(), MailError> {
        let mut request = self.client.post(&self.endpoint).json(&OutgoingMail {
            from: &self.from,
            to: &message.to,
            subject: &message.subject,
            text: &message.body,
        });
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| MailError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(MailError::Rejected {
                status: status.as_u16(),
                body,
            });
        }
        Ok(())
    }
}

/// Chooses the transport from configuration.
pub fn from_config(config: &Config) -> Arc<dyn Mailer> {
    match &config.mail_api_url {
        Some(endpoint) => {
            tracing::info!("Mail delivery via HTTP API at {}", endpoint);
            Arc::new(HttpMailer::new(
                endpoint.clone(),
                config.mail_api_token.clone(),
                config.mail_from.clone(),
            ))
        }
        None => {
            tracing::warn!("MAIL_API_URL not set; outgoing mail will only be logged");
            Arc::new(LogMailer)
        }
    }
}

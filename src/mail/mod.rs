use anyhow::Context;
use async_trait::async_trait;
use serde_json::json;
use tracing::{debug, info};

use crate::config::MailConfig;

pub mod templates;

/// A rendered email ready to hand to a transport.
#[derive(Debug, Clone)]
pub struct OutgoingMail {
    pub to: String,
    pub subject: String,
    pub html: String,
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, mail: OutgoingMail) -> anyhow::Result<()>;
}

const SENDGRID_URL: &str = "https://api.sendgrid.com/v3/mail/send";

#[derive(Clone)]
pub struct SendGridMailer {
    client: reqwest::Client,
    api_key: String,
    from_email: String,
    from_name: String,
}

impl SendGridMailer {
    pub fn new(api_key: &str, from_email: &str, from_name: &str) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .context("build http client")?;
        Ok(Self {
            client,
            api_key: api_key.to_string(),
            from_email: from_email.to_string(),
            from_name: from_name.to_string(),
        })
    }
}

#[async_trait]
impl Mailer for SendGridMailer {
    async fn send(&self, mail: OutgoingMail) -> anyhow::Result<()> {
        let body = json!({
            "personalizations": [{ "to": [{ "email": mail.to }] }],
            "from": { "email": self.from_email, "name": self.from_name },
            "subject": mail.subject,
            "content": [{ "type": "text/html", "value": mail.html }],
        });

        let res = self
            .client
            .post(SENDGRID_URL)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .context("sendgrid request")?;

        let status = res.status();
        if !status.is_success() {
            let detail = res.text().await.unwrap_or_default();
            anyhow::bail!("sendgrid returned {}: {}", status, detail);
        }
        debug!(to = %mail.to, subject = %mail.subject, "mail sent");
        Ok(())
    }
}

/// Writes mail to the log instead of delivering it.
#[derive(Clone, Default)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, mail: OutgoingMail) -> anyhow::Result<()> {
        info!(to = %mail.to, subject = %mail.subject, html_len = mail.html.len(), "mail not delivered (no transport configured)");
        Ok(())
    }
}

pub fn from_config(cfg: &MailConfig) -> anyhow::Result<std::sync::Arc<dyn Mailer>> {
    match cfg.sendgrid_api_key.as_deref() {
        Some(key) => Ok(std::sync::Arc::new(SendGridMailer::new(
            key,
            &cfg.from_email,
            &cfg.from_name,
        )?)),
        None => {
            tracing::warn!("SENDGRID_API_KEY not set; outgoing mail will only be logged");
            Ok(std::sync::Arc::new(LogMailer))
        }
    }
}

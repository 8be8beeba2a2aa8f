use anyhow::Context;
use axum::async_trait;
use serde_json::json;
use tracing::debug;

use crate::config::MailerConfig;

/// Outbound mail collaborator. The only consumer is the password-reset flow,
/// which needs to know whether delivery actually happened.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, to: &str, subject: &str, body: &str) -> anyhow::Result<()>;
}

/// Delivers mail through an HTTP relay (Mailgun-style JSON endpoint).
#[derive(Clone)]
pub struct HttpMailer {
    client: reqwest::Client,
    relay_url: String,
    api_token: Option<String>,
    sender: String,
}

impl HttpMailer {
    pub fn new(config: &MailerConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            relay_url: config.relay_url.clone(),
            api_token: config.api_token.clone(),
            sender: config.sender.clone(),
        }
    }
}

#[async_trait]
impl Mailer for HttpMailer {
    async fn send(&self, to: &str, subject: &str, body: &str) -> anyhow::Result<()> {
        let payload = json!({
            "from": self.sender,
            "to": to,
            "subject": subject,
            "text": body,
        });

        let mut req = self.client.post(&self.relay_url).json(&payload);
        if let Some(token) = &self.api_token {
            req = req.bearer_auth(token);
        }

        let res = req.send().await.context("mail relay request")?;
        if !res.status().is_success() {
            anyhow::bail!("mail relay returned {}", res.status());
        }
        debug!(%to, %subject, "mail accepted by relay");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    struct RecordingMailer {
        sent: Mutex<Vec<(String, String, String)>>,
    }

    #[async_trait]
    impl Mailer for RecordingMailer {
        async fn send(&self, to: &str, subject: &str, body: &str) -> anyhow::Result<()> {
            self.sent
                .lock()
                .unwrap()
                .push((to.into(), subject.into(), body.into()));
            Ok(())
        }
    }

    #[tokio::test]
    async fn recording_mailer_captures_fields() {
        let mailer = Arc::new(RecordingMailer {
            sent: Mutex::new(Vec::new()),
        });
        let as_trait: Arc<dyn Mailer> = mailer.clone();
        as_trait
            .send("staff@example.edu", "Reset Password Link", "http://x/y")
            .await
            .expect("fake send");
        let sent = mailer.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, "staff@example.edu");
        assert_eq!(sent[0].1, "Reset Password Link");
    }
}

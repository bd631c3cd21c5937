use crate::config::SmtpConfig;
use crate::error::{CmsError, Result};
use async_trait::async_trait;
use lettre::{
    message::header::ContentType, transport::smtp::authentication::Credentials, AsyncSmtpTransport,
    AsyncTransport, Message, Tokio1Executor,
};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use tracing::info;

#[async_trait]
pub trait Mailer: Send + Sync {
    /// Sends a plain-text message to the configured staff inbox.
    async fn notify(&self, subject: &str, body: &str) -> Result<()>;
}

pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: String,
    to: String,
}

impl SmtpMailer {
    pub fn new(config: &SmtpConfig) -> Result<Self> {
        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)
            .map_err(|e| CmsError::Mail(e.to_string()))?
            .port(config.port);
        if let (Some(user), Some(pass)) = (&config.username, &config.password) {
            builder = builder.credentials(Credentials::new(user.clone(), pass.clone()));
        }
        Ok(Self {
            transport: builder.build(),
            from: config.from.clone(),
            to: config.to.clone(),
        })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn notify(&self, subject: &str, body: &str) -> Result<()> {
        let message = Message::builder()
            .from(self.from.parse().map_err(|e| CmsError::Mail(format!("bad from address: {e}")))?)
            .to(self.to.parse().map_err(|e| CmsError::Mail(format!("bad to address: {e}")))?)
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(body.to_string())
            .map_err(|e| CmsError::Mail(e.to_string()))?;
        self.transport
            .send(message)
            .await
            .map_err(|e| CmsError::Mail(e.to_string()))?;
        info!("Sent notification '{}' to {}", subject, self.to);
        Ok(())
    }
}

/// How many recent messages `LogMailer` keeps.
const LOG_MAILER_HISTORY: usize = 20;

/// Logs instead of sending. Keeps the most recent messages for inspection.
#[derive(Default)]
pub struct LogMailer {
    sent: Mutex<VecDeque<(String, String)>>,
}

impl LogMailer {
    pub fn sent(&self) -> Vec<(String, String)> {
        self.sent
            .lock()
            .map(|s| s.iter().cloned().collect())
            .unwrap_or_default()
    }
}

#[async_trait]
impl Mailer for LogMailer {
    async fn notify(&self, subject: &str, body: &str) -> Result<()> {
        info!(subject, "SMTP not configured, notification logged only");
        if let Ok(mut sent) = self.sent.lock() {
            if sent.len() == LOG_MAILER_HISTORY {
                sent.pop_front();
            }
            sent.push_back((subject.to_string(), body.to_string()));
        }
        Ok(())
    }
}

pub fn mailer_from_config(config: Option<&SmtpConfig>) -> Result<Arc<dyn Mailer>> {
    match config {
        Some(smtp) => Ok(Arc::new(SmtpMailer::new(smtp)?)),
        None => Ok(Arc::new(LogMailer::default())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn log_mailer_records_messages() {
        let mailer = LogMailer::default();
        mailer.notify("Hello", "Body").await.unwrap();
        assert_eq!(mailer.sent(), vec![("Hello".to_string(), "Body".to_string())]);
    }

    #[tokio::test]
    async fn log_mailer_keeps_only_recent_messages() {
        let mailer = LogMailer::default();
        for i in 0..LOG_MAILER_HISTORY + 5 {
            mailer.notify(&format!("Message {i}"), "Body").await.unwrap();
        }
        let sent = mailer.sent();
        assert_eq!(sent.len(), LOG_MAILER_HISTORY);
        assert_eq!(sent[0].0, "Message 5");
        assert_eq!(sent[LOG_MAILER_HISTORY - 1].0, format!("Message {}", LOG_MAILER_HISTORY + 4));
    }

    #[tokio::test]
    async fn smtp_mailer_builds_from_config() {
        let config = SmtpConfig {
            host: "smtp.example.com".into(),
            port: 2525,
            username: Some("user".into()),
            password: Some("pass".into()),
            from: "site@example.com".into(),
            to: "team@example.com".into(),
        };
        assert!(SmtpMailer::new(&config).is_ok());
    }
}

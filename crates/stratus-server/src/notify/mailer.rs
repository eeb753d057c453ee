use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use super::NotifyError;

/// Outbound email transport.
#[async_trait]
pub trait Mailer: Send + Sync + std::fmt::Debug {
    async fn send_email(&self, to: &str, subject: &str, html: &str) -> Result<(), NotifyError>;
}

pub type SharedMailer = Arc<dyn Mailer>;

/// Logs messages instead of delivering them.
#[derive(Debug, Default, Clone)]
pub struct TracingMailer;

#[async_trait]
impl Mailer for TracingMailer {
    async fn send_email(&self, to: &str, subject: &str, html: &str) -> Result<(), NotifyError> {
        info!(to, subject, bytes = html.len(), "Email sent");
        Ok(())
    }
}

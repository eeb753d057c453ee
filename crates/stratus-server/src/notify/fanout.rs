//! Concurrent render-and-send to every recipient.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::templates::{AssociationTemplates, OrgAssociation, RenderedEmail, SpaceAssociation};
use super::{NotifyError, SharedMailer};

/// One message for one recipient.
pub trait Notification: Send + Sync + 'static {
    fn recipient(&self) -> &str;
    fn render(&self, templates: &AssociationTemplates) -> RenderedEmail;
}

impl Notification for OrgAssociation {
    fn recipient(&self) -> &str {
        &self.email
    }

    fn render(&self, templates: &AssociationTemplates) -> RenderedEmail {
        templates.render_org(self)
    }
}

impl Notification for SpaceAssociation {
    fn recipient(&self) -> &str {
        &self.email
    }

    fn render(&self, templates: &AssociationTemplates) -> RenderedEmail {
        templates.render_space(self)
    }
}

/// Send every notification concurrently.
///
/// Returns once all sends succeed, or at the first failure. After a failure
/// units that have not started sending are skipped; sends already in flight
/// run to completion and their results are only logged.
pub async fn dispatch_all<N: Notification>(
    mailer: SharedMailer,
    templates: Arc<AssociationTemplates>,
    notifications: Vec<N>,
) -> Result<(), NotifyError> {
    let total = notifications.len();
    let cancel = CancellationToken::new();
    let (tx, mut rx) = mpsc::channel(total.max(1));

    for notification in notifications {
        let mailer = mailer.clone();
        let templates = templates.clone();
        let cancel = cancel.clone();
        let tx = tx.clone();
        tokio::spawn(async move {
            let to = notification.recipient().to_string();
            let email = notification.render(&templates);
            if cancel.is_cancelled() {
                debug!(to = %to, "Skipping notification after earlier failure");
                return;
            }
            let result = mailer.send_email(&to, &email.subject, &email.html).await;
            if let Err(e) = &result {
                warn!(to = %to, error = %e, "Notification failed");
            }
            // The receiver is gone once the caller has returned.
            let _ = tx.send(result).await;
        });
    }
    drop(tx);

    let mut succeeded = 0;
    while let Some(result) = rx.recv().await {
        match result {
            Ok(()) => succeeded += 1,
            Err(e) => {
                cancel.cancel();
                return Err(e);
            }
        }
    }

    if succeeded < total {
        return Err(NotifyError::Task(format!(
            "{} of {} notifications did not report",
            total - succeeded,
            total
        )));
    }
    Ok(())
}

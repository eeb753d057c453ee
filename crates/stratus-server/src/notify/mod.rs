//! Notifications sent when a user is associated with an organization or space.

mod fanout;
mod mailer;
mod notifier;
mod templates;

pub use fanout::{Notification, dispatch_all};
pub use mailer::{Mailer, SharedMailer, TracingMailer};
pub use notifier::AssociationNotifier;
pub use templates::{
    AssociationTemplates, OrgAssociation, RenderedEmail, SpaceAssociation, UserInvitation,
};

/// Notification failures.
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    /// Looking up the grantee, organization, space or managers failed.
    #[error("lookup failed: {0}")]
    Lookup(#[from] stratus_oauth::OAuthError),

    /// The mail transport rejected a message.
    #[error("failed to send to {to}: {reason}")]
    Send { to: String, reason: String },

    /// A notification task died before reporting.
    #[error("notification task failed: {0}")]
    Task(String),
}

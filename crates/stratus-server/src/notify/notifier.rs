//! Association notifications: resolve everyone involved, then fan out.

use std::sync::Arc;

use stratus_oauth::{PrivilegedClientFactory, UserClient};
use tracing::info;

use super::fanout::dispatch_all;
use super::templates::{AssociationTemplates, OrgAssociation, SpaceAssociation};
use super::{NotifyError, SharedMailer};
use crate::controlplane::ControlPlane;

/// Tells the grantee and every manager about a new association.
///
/// The grantee is looked up with application credentials since the acting
/// user may not be allowed to read other users. Everything else is read as
/// the acting user.
#[derive(Debug)]
pub struct AssociationNotifier {
    api: ControlPlane,
    app_url: String,
    privileged: PrivilegedClientFactory,
    mailer: SharedMailer,
    templates: Arc<AssociationTemplates>,
}

impl AssociationNotifier {
    pub fn new(
        api_url: String,
        app_url: String,
        privileged: PrivilegedClientFactory,
        mailer: SharedMailer,
        templates: AssociationTemplates,
    ) -> Self {
        Self {
            api: ControlPlane::new(api_url),
            app_url: app_url.trim_end_matches('/').to_string(),
            privileged,
            mailer,
            templates: Arc::new(templates),
        }
    }

    async fn grantee_username(&self, user_id: &str) -> Result<String, NotifyError> {
        let client = self.privileged.privileged_client().await?;
        Ok(self.api.user(&client, user_id).await?.entity.username)
    }

    /// `user_id` was added to organization `org_id` by `granter_email`.
    pub async fn user_associated_with_org(
        &self,
        user: &UserClient,
        granter_email: &str,
        org_id: &str,
        user_id: &str,
    ) -> Result<(), NotifyError> {
        let grantee = self.grantee_username(user_id).await?;
        let org = self.api.organization(user, org_id).await?;
        let managers = self.api.organization_managers(user, org_id).await?;
        let link = format!("{}/#/org/{}", self.app_url, org_id);

        let base = OrgAssociation {
            email: grantee.clone(),
            grantee_email: grantee,
            granter_email: granter_email.to_string(),
            org_name: org.entity.name,
            org_manager: false,
            link,
        };
        let mut recipients = vec![base.clone()];
        recipients.extend(
            managers
                .into_iter()
                .filter(|m| !m.entity.username.is_empty())
                .map(|m| OrgAssociation {
                    email: m.entity.username,
                    org_manager: true,
                    ..base.clone()
                }),
        );

        info!(org_id, user_id, recipients = recipients.len(), "Notifying organization association");
        dispatch_all(self.mailer.clone(), self.templates.clone(), recipients).await
    }

    /// `user_id` was added to space `space_id` by `granter_email`.
    pub async fn user_associated_with_space(
        &self,
        user: &UserClient,
        granter_email: &str,
        space_id: &str,
        user_id: &str,
    ) -> Result<(), NotifyError> {
        let grantee = self.grantee_username(user_id).await?;
        let space = self.api.space(user, space_id).await?;
        let org = self
            .api
            .organization(user, &space.entity.organization_guid)
            .await?;
        let managers = self.api.space_managers(user, space_id).await?;
        let link = format!(
            "{}/#/org/{}/spaces/{}",
            self.app_url, org.metadata.guid, space_id
        );

        let base = SpaceAssociation {
            email: grantee.clone(),
            grantee_email: grantee,
            granter_email: granter_email.to_string(),
            org_name: org.entity.name,
            space_name: space.entity.name,
            space_manager: false,
            link,
        };
        let mut recipients = vec![base.clone()];
        recipients.extend(
            managers
                .into_iter()
                .filter(|m| !m.entity.username.is_empty())
                .map(|m| SpaceAssociation {
                    email: m.entity.username,
                    space_manager: true,
                    ..base.clone()
                }),
        );

        info!(space_id, user_id, recipients = recipients.len(), "Notifying space association");
        dispatch_all(self.mailer.clone(), self.templates.clone(), recipients).await
    }
}

//! Subject and HTML bodies for association notifications.

use html_escape::{encode_double_quoted_attribute, encode_text};

/// Data for "you were added to an organization".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrgAssociation {
    /// Recipient address.
    pub email: String,
    pub grantee_email: String,
    pub granter_email: String,
    pub org_name: String,
    /// Recipient manages the organization (and is not the grantee).
    pub org_manager: bool,
    pub link: String,
}

/// Data for "you were added to a space".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpaceAssociation {
    pub email: String,
    pub grantee_email: String,
    pub granter_email: String,
    pub org_name: String,
    pub space_name: String,
    pub space_manager: bool,
    pub link: String,
}

/// Data for "you were invited to the platform".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserInvitation {
    pub email: String,
    /// One-time link that completes the account.
    pub invite_link: String,
}

/// A rendered message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedEmail {
    pub subject: String,
    pub html: String,
}

/// Renders association messages.
#[derive(Debug, Clone)]
pub struct AssociationTemplates {
    product_name: String,
}

impl Default for AssociationTemplates {
    fn default() -> Self {
        Self::new("Stratus")
    }
}

impl AssociationTemplates {
    pub fn new(product_name: impl Into<String>) -> Self {
        Self {
            product_name: product_name.into(),
        }
    }

    pub fn render_org(&self, data: &OrgAssociation) -> RenderedEmail {
        let org = encode_text(&data.org_name);
        let intro = if data.org_manager {
            format!(
                "{} added {} to the organization <strong>{}</strong>, which you manage.",
                encode_text(&data.granter_email),
                encode_text(&data.grantee_email),
                org
            )
        } else {
            format!(
                "{} added you to the organization <strong>{}</strong>.",
                encode_text(&data.granter_email),
                org
            )
        };

        RenderedEmail {
            subject: format!(
                "[{}] {} was added to organization {}",
                self.product_name, data.grantee_email, data.org_name
            ),
            html: self.page(&intro, &data.link, "View organization"),
        }
    }

    pub fn render_space(&self, data: &SpaceAssociation) -> RenderedEmail {
        let place = format!(
            "<strong>{}</strong> in organization <strong>{}</strong>",
            encode_text(&data.space_name),
            encode_text(&data.org_name)
        );
        let intro = if data.space_manager {
            format!(
                "{} added {} to the space {}, which you manage.",
                encode_text(&data.granter_email),
                encode_text(&data.grantee_email),
                place
            )
        } else {
            format!("{} added you to the space {}.", encode_text(&data.granter_email), place)
        };

        RenderedEmail {
            subject: format!(
                "[{}] {} was added to space {}",
                self.product_name, data.grantee_email, data.space_name
            ),
            html: self.page(&intro, &data.link, "View space"),
        }
    }

    pub fn render_invite(&self, data: &UserInvitation) -> RenderedEmail {
        let intro = format!(
            "You have been invited to {}. Follow the link below to set up your account.",
            encode_text(&self.product_name)
        );
        RenderedEmail {
            subject: format!("[{}] You have been invited", self.product_name),
            html: self.page(&intro, &data.invite_link, "Accept invitation"),
        }
    }

    fn page(&self, intro: &str, link: &str, action: &str) -> String {
        format!(
            "<html><body><p>{}</p><p><a href=\"{}\">{}</a></p><p>{}</p></body></html>",
            intro,
            encode_double_quoted_attribute(link),
            action,
            encode_text(&self.product_name)
        )
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    fn org(manager: bool) -> OrgAssociation {
        OrgAssociation {
            email: "m@example.gov".into(),
            grantee_email: "new@example.gov".into(),
            granter_email: "boss@example.gov".into(),
            org_name: "<script>".into(),
            org_manager: manager,
            link: "https://console.example.com/#/org/o-1".into(),
        }
    }

    #[test]
    fn test_org_variants() {
        let templates = AssociationTemplates::default();
        let grantee = templates.render_org(&org(false));
        let manager = templates.render_org(&org(true));

        assert!(grantee.html.contains("added you"));
        assert!(manager.html.contains("which you manage"));
        assert!(manager.html.contains("new@example.gov"));
        assert!(grantee.subject.starts_with("[Stratus]"));
        assert!(grantee.html.contains("https://console.example.com/#/org/o-1"));
    }

    #[test]
    fn test_values_are_escaped() {
        let rendered = AssociationTemplates::default().render_org(&org(false));
        assert!(!rendered.html.contains("<script>"));
        assert!(rendered.html.contains("&lt;script&gt;"));
    }

    #[test]
    fn test_invite_carries_link() {
        let rendered = AssociationTemplates::default().render_invite(&UserInvitation {
            email: "new@example.gov".into(),
            invite_link: "https://login.example.com/invitations/accept?code=a&b".into(),
        });
        assert_eq!(rendered.subject, "[Stratus] You have been invited");
        assert!(rendered.html.contains("invitations/accept?code=a&amp;b"));
    }

    #[test]
    fn test_link_attribute_is_quoted_safely() {
        let mut association = org(false);
        association.link = "https://console.example.com/\"><img src=x>".into();
        let rendered = AssociationTemplates::default().render_org(&association);
        assert!(!rendered.html.contains("\"><img"));
        assert!(rendered.html.contains("&quot;"));
    }

    #[test]
    fn test_space_mentions_org_and_space() {
        let rendered = AssociationTemplates::new("Console").render_space(&SpaceAssociation {
            email: "a@example.gov".into(),
            grantee_email: "a@example.gov".into(),
            granter_email: "b@example.gov".into(),
            org_name: "acme".into(),
            space_name: "dev".into(),
            space_manager: false,
            link: "https://console.example.com/#/org/o-1/spaces/s-1".into(),
        });
        assert_eq!(rendered.subject, "[Console] a@example.gov was added to space dev");
        assert!(rendered.html.contains("<strong>dev</strong>"));
        assert!(rendered.html.contains("<strong>acme</strong>"));
    }
}

//! HTTP routes.

pub mod api;
pub mod associations;
pub mod health;
pub mod login;
pub mod logs;
pub mod uaa;

pub use api::{api_proxy, auth_status, profile};
pub use associations::{put_org_user, put_space_auditor};
pub use health::{PingResponse, StoreHealth, health_routes};
pub use login::{OAUTH_STATE_KEY, handshake, logout, oauth_callback};
pub use logs::recent_logs;
pub use uaa::{invite_users, uaa_info, user_info};

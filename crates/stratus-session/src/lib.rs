//! Per-visitor session storage for the Stratus console backend.
//!
//! A [`Session`] is a small map of JSON values keyed by string. Where it
//! lives depends on the [`SessionStore`] backend:
//!
//! - [`CookieStore`] keeps the whole session in an encrypted, signed cookie
//! - [`FileStore`] writes one file per session and hands out a signed id
//! - [`RedisStore`] keeps records in Redis with a server-side expiry
//!
//! # Example
//!
//! ```rust,ignore
//! use stratus_session::{CookieStore, SessionConfig, SessionStore};
//!
//! let store = CookieStore::new(SessionConfig::default().with_secure(false));
//! let mut session = store.get(request.headers()).await?.unwrap_or_default();
//! session.insert("oauth_state", &state)?;
//! let cookie = store.put(&mut session).await?;
//! ```

mod backend;
mod config;
mod error;
mod keys;
mod pool;
mod session;
mod store;

pub use backend::{CookieStore, FileStore, RedisStore};
pub use config::{DEFAULT_COOKIE_NAME, DEFAULT_MAX_AGE, DEFAULT_MAX_LENGTH, SessionConfig};
pub use error::{Result, SessionError};
pub use keys::CookieKey;
pub use pool::{RedisPool, RedisPoolConfig};
pub use session::Session;
pub use store::{SessionStore, SharedSessionStore};

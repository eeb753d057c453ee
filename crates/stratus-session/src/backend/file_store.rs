//! Server-side sessions stored as one file per session id.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use axum_extra::extract::cookie::Cookie;
use chrono::Utc;
use http::HeaderMap;
use tracing::{debug, info, warn};

use crate::config::SessionConfig;
use crate::error::Result;
use crate::keys::CookieKey;
use crate::session::Session;
use crate::store::{SessionStore, expired_cookie, session_cookie, signed_session_id};

/// Prefix for session file names.
const FILE_PREFIX: &str = "session_";

/// Filesystem backend; the cookie only carries a signed session id.
#[derive(Debug)]
pub struct FileStore {
    dir: PathBuf,
    key: CookieKey,
    config: SessionConfig,
}

impl FileStore {
    /// Create a store writing into `dir` (created on first write).
    pub fn new(dir: impl Into<PathBuf>, session_key: &[u8], config: SessionConfig) -> Result<Self> {
        Ok(Self {
            dir: dir.into(),
            key: CookieKey::from_session_key(session_key)?,
            config,
        })
    }

    /// Create a store in the system temporary directory.
    pub fn in_temp_dir(session_key: &[u8], config: SessionConfig) -> Result<Self> {
        Self::new(std::env::temp_dir(), session_key, config)
    }

    /// Directory holding session files.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, id: &str) -> PathBuf {
        self.dir.join(format!("{}{}", FILE_PREFIX, id))
    }

    /// Scratch path unique to one write. The leading dot keeps it out of sweeps.
    fn scratch_path_for(&self, id: &str) -> PathBuf {
        self.dir.join(format!(
            ".{}{}.{:016x}.tmp",
            FILE_PREFIX,
            id,
            rand::random::<u64>()
        ))
    }

    async fn delete_file(&self, id: &str) -> Result<()> {
        remove_if_present(&self.path_for(id)).await
    }

    async fn sweep_dir(&self) -> Result<usize> {
        let mut entries = match tokio::fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(e.into()),
        };

        let now = Utc::now();
        let mut removed = 0;
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name();
            let Some(id) = name.to_str().and_then(|n| n.strip_prefix(FILE_PREFIX)) else {
                continue;
            };
            if !crate::session::is_well_formed_id(id) {
                continue;
            }

            let live = match tokio::fs::read(entry.path()).await {
                Ok(bytes) => Session::from_bytes(&bytes)
                    .map(|s| !s.is_expired(self.config.max_age, now))
                    .unwrap_or(false),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
                Err(e) => return Err(e.into()),
            };
            if !live {
                remove_if_present(&entry.path()).await?;
                removed += 1;
            }
        }

        if removed > 0 {
            info!(removed, dir = %self.dir.display(), "Swept expired session files");
        }
        Ok(removed)
    }
}

async fn remove_if_present(path: &Path) -> Result<()> {
    match tokio::fs::remove_file(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

#[async_trait]
impl SessionStore for FileStore {
    fn kind(&self) -> &'static str {
        "file"
    }

    fn config(&self) -> &SessionConfig {
        &self.config
    }

    async fn get(&self, headers: &HeaderMap) -> Result<Option<Session>> {
        let Some(id) = signed_session_id(&self.key, headers, &self.config) else {
            return Ok(None);
        };

        let bytes = match tokio::fs::read(self.path_for(&id)).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let session = match Session::from_bytes(&bytes) {
            Ok(session) if session.id() == id => session,
            Ok(_) | Err(_) => {
                warn!(session_id = %id, "Discarding corrupt session file");
                self.delete_file(&id).await?;
                return Ok(None);
            }
        };

        if session.is_expired(self.config.max_age, Utc::now()) {
            debug!(session_id = %id, "Session file expired");
            self.delete_file(&id).await?;
            return Ok(None);
        }

        Ok(Some(session))
    }

    async fn put(&self, session: &mut Session) -> Result<Cookie<'static>> {
        session.touch();
        let bytes = session.to_bytes()?;
        self.config.check_length(bytes.len())?;

        tokio::fs::create_dir_all(&self.dir).await?;

        // Each write gets its own scratch file; rename replaces the record atomically.
        let path = self.path_for(session.id());
        let scratch = self.scratch_path_for(session.id());
        tokio::fs::write(&scratch, &bytes).await?;
        if let Err(e) = tokio::fs::rename(&scratch, &path).await {
            let _ = tokio::fs::remove_file(&scratch).await;
            return Err(e.into());
        }

        self.key
            .sign(session_cookie(&self.config, session.id().to_string()))
    }

    async fn remove(&self, session: &Session) -> Result<Cookie<'static>> {
        self.delete_file(session.id()).await?;
        Ok(expired_cookie(&self.config))
    }

    /// Deletes expired and unreadable files. A missing directory sweeps nothing.
    async fn sweep_expired(&self) -> Result<usize> {
        self.sweep_dir().await
    }
}

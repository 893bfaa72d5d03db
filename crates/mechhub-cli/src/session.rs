//! Session persistence.
//!
//! Persists the auth token and current user to `~/.mechhub/session.json`.
//! The file is read once at startup into a [`SessionContext`], which is then
//! passed explicitly to every command.

use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use mechhub_core::model::User;

/// Persisted session state under fixed keys.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_user: Option<User>,
}

impl Session {
    pub const fn is_logged_in(&self) -> bool {
        self.token.is_some() && self.current_user.is_some()
    }
}

/// Reads and writes the session file.
#[derive(Debug, Clone)]
pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store at `~/.mechhub/session.json`.
    pub fn default_location() -> anyhow::Result<Self> {
        let dir = mechhub_core::config::data_dir()
            .ok_or_else(|| anyhow::anyhow!("Cannot determine home directory"))?;
        Ok(Self::new(dir.join("session.json")))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the session. A missing or unreadable file yields an empty session.
    pub fn load(&self) -> Session {
        let Ok(content) = std::fs::read_to_string(&self.path) else {
            debug!(path = %self.path.display(), "No stored session");
            return Session::default();
        };
        serde_json::from_str(&content).unwrap_or_else(|e| {
            warn!(path = %self.path.display(), error = %e, "Ignoring corrupt session file");
            Session::default()
        })
    }

    pub fn save(&self, session: &Session) -> anyhow::Result<()> {
        if let Some(dir) = self.path.parent() {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create {}", dir.display()))?;
        }
        let json = serde_json::to_string_pretty(session)?;
        std::fs::write(&self.path, json)
            .with_context(|| format!("Failed to write {}", self.path.display()))?;
        Ok(())
    }
}

/// Session state shared by all commands of one process.
#[derive(Debug)]
pub struct SessionContext {
    store: SessionStore,
    session: Session,
}

impl SessionContext {
    /// Restore the persisted session.
    pub fn open(store: SessionStore) -> Self {
        let session = store.load();
        Self { store, session }
    }

    pub const fn session(&self) -> &Session {
        &self.session
    }

    pub const fn current_user(&self) -> Option<&User> {
        self.session.current_user.as_ref()
    }

    pub fn token(&self) -> Option<&str> {
        self.session.token.as_deref()
    }

    /// The logged-in user, or an error telling the caller to log in.
    pub fn require_user(&self) -> anyhow::Result<&User> {
        match (&self.session.token, &self.session.current_user) {
            (Some(_), Some(user)) => Ok(user),
            _ => anyhow::bail!("Not logged in. Run `mechhub auth login` first"),
        }
    }

    pub fn login(&mut self, token: String, user: User) -> anyhow::Result<()> {
        self.session = Session {
            token: Some(token),
            current_user: Some(user),
        };
        self.store.save(&self.session)
    }

    pub fn logout(&mut self) -> anyhow::Result<()> {
        self.session = Session::default();
        self.store.save(&self.session)
    }
}

#[cfg(test)]
#[allow(clippy::panic, clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use mechhub_core::model::UserRole;

    use super::*;

    fn user() -> User {
        serde_json::from_value(serde_json::json!({
            "id": "u1",
            "name": "Ayesha",
            "type": "customer"
        }))
        .unwrap()
    }

    #[test]
    fn missing_file_is_logged_out() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = SessionContext::open(SessionStore::new(dir.path().join("session.json")));
        assert!(ctx.current_user().is_none());
        assert!(ctx.token().is_none());
        assert!(ctx.require_user().is_err());
    }

    #[test]
    fn login_persists_under_fixed_keys() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("session.json");
        let mut ctx = SessionContext::open(SessionStore::new(&path));
        ctx.login("tok-123".into(), user()).unwrap();

        let raw: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw["token"], "tok-123");
        assert_eq!(raw["currentUser"]["id"], "u1");

        let restored = SessionContext::open(SessionStore::new(&path));
        assert_eq!(restored.token(), Some("tok-123"));
        assert_eq!(restored.require_user().unwrap().role, UserRole::Customer);
    }

    #[test]
    fn logout_clears_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        let mut ctx = SessionContext::open(SessionStore::new(&path));
        ctx.login("tok".into(), user()).unwrap();
        ctx.logout().unwrap();

        assert!(!ctx.session().is_logged_in());
        let restored = SessionStore::new(&path).load();
        assert_eq!(restored, Session::default());
    }

    #[test]
    fn corrupt_file_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        std::fs::write(&path, "{ nope").unwrap();
        assert_eq!(SessionStore::new(&path).load(), Session::default());
    }
}

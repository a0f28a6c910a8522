//! Identity and privilege context.
//!
//! A [`Session`] is created explicitly and handed to whatever needs to know
//! who is acting: the API facade and the view model. There is no process-wide
//! current user. Sessions can be persisted with [`SessionStore`]; the password
//! used to sign up is checked for presence and then dropped, never stored.

use crate::error::{Result, RosterError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::PathBuf;
use uuid::Uuid;

const SESSION_FILENAME: &str = "session.json";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Privileges {
    None,
    User,
    Admin,
}

impl Privileges {
    pub fn can_write(&self) -> bool {
        matches!(self, Privileges::User | Privileges::Admin)
    }
}

impl fmt::Display for Privileges {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Privileges::None => "NONE",
            Privileges::User => "USER",
            Privileges::Admin => "ADMIN",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub id: Uuid,
    pub user_name: String,
    pub privileges: Privileges,
    pub signed_in_at: DateTime<Utc>,
}

impl Session {
    pub fn new(user_name: impl Into<String>, privileges: Privileges) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_name: user_name.into(),
            privileges,
            signed_in_at: Utc::now(),
        }
    }

    /// Registers a new account with `User` privileges.
    pub fn sign_up(user_name: &str, password: &str) -> Result<Self> {
        if user_name.trim().is_empty() || password.trim().is_empty() {
            return Err(RosterError::Session(
                "Username and password cannot be blank".to_string(),
            ));
        }
        Ok(Self::new(user_name.trim(), Privileges::User))
    }

    /// A read-only session for callers that have not signed in.
    pub fn anonymous() -> Self {
        Self::new("anonymous", Privileges::None)
    }

    pub fn require_write(&self, action: &str) -> Result<()> {
        if self.privileges.can_write() {
            Ok(())
        } else {
            Err(RosterError::PermissionDenied(format!(
                "{} ({}) may not {}",
                self.user_name, self.privileges, action
            )))
        }
    }
}

/// Persists the current session as `session.json` in a directory.
#[derive(Debug, Clone)]
pub struct SessionStore {
    dir: PathBuf,
}

impl SessionStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path(&self) -> PathBuf {
        self.dir.join(SESSION_FILENAME)
    }

    pub fn load(&self) -> Result<Option<Session>> {
        let path = self.path();
        if !path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(&path)?;
        Ok(Some(serde_json::from_str(&content)?))
    }

    pub fn save(&self, session: &Session) -> Result<()> {
        fs::create_dir_all(&self.dir)?;
        fs::write(self.path(), serde_json::to_string_pretty(session)?)?;
        Ok(())
    }

    /// Removes the saved session. Clearing when nothing is saved is fine.
    pub fn clear(&self) -> Result<()> {
        match fs::remove_file(self.path()) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

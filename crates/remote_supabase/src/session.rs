use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use journal_types::{Account, AccountId};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AuthSession {
    pub access_token: String,
    pub refresh_token: String,
    /// Unix seconds.
    pub expires_at: i64,
    pub account: Account,
}

impl AuthSession {
    // Treat tokens this close to expiry as already expired.
    const EXPIRY_SKEW_SECS: i64 = 30;

    pub fn is_expired(&self, now_secs: i64) -> bool {
        now_secs + Self::EXPIRY_SKEW_SECS >= self.expires_at
    }
}

#[derive(Debug, Deserialize)]
struct AuthResponse {
    access_token: String,
    refresh_token: String,
    expires_in: Option<i64>,
    expires_at: Option<i64>,
    user: AuthUser,
}

#[derive(Debug, Deserialize)]
struct AuthUser {
    id: AccountId,
    #[serde(default)]
    email: Option<String>,
}

/// Parses a `/verify` or `/token` response body.
pub(crate) fn parse_auth_response(body: &str, now_secs: i64) -> Result<AuthSession> {
    let response: AuthResponse =
        serde_json::from_str(body).context("invalid auth response body")?;
    let expires_at = response
        .expires_at
        .or_else(|| response.expires_in.map(|secs| now_secs + secs))
        .unwrap_or(now_secs + 3600);
    Ok(AuthSession {
        access_token: response.access_token,
        refresh_token: response.refresh_token,
        expires_at,
        account: Account {
            id: response.user.id,
            email: response.user.email.unwrap_or_default(),
        },
    })
}

/// Persists the auth session between runs.
#[derive(Debug, Clone)]
pub struct SessionFile {
    path: PathBuf,
}

impl SessionFile {
    pub fn from_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            path: dir.into().join("session.json"),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Missing or unreadable files read as no session.
    pub fn load(&self) -> Option<AuthSession> {
        let raw = fs::read_to_string(&self.path).ok()?;
        match serde_json::from_str(&raw) {
            Ok(session) => Some(session),
            Err(err) => {
                warn!(path = %self.path.display(), error = %err, "ignoring unreadable session file");
                None
            }
        }
    }

    pub fn save(&self, session: &AuthSession) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        let text = serde_json::to_string_pretty(session).context("failed to serialize session")?;
        fs::write(&self.path, text)
            .with_context(|| format!("failed to write {}", self.path.display()))?;
        info!(account = %session.account.id, "session persisted");
        Ok(())
    }

    pub fn clear(&self) -> Result<()> {
        if self.path.exists() {
            fs::remove_file(&self.path)
                .with_context(|| format!("failed to remove {}", self.path.display()))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;
    use uuid::Uuid;

    use super::*;

    fn sample(expires_at: i64) -> AuthSession {
        AuthSession {
            access_token: "at".to_string(),
            refresh_token: "rt".to_string(),
            expires_at,
            account: Account {
                id: Uuid::nil(),
                email: "me@example.com".to_string(),
            },
        }
    }

    #[test]
    fn parses_verify_response_with_relative_expiry() {
        let body = r#"{
            "access_token": "at",
            "token_type": "bearer",
            "expires_in": 3600,
            "refresh_token": "rt",
            "user": {"id": "7f6c0d9e-4a51-4a59-9f5e-0d1e0c3c9b1a", "email": "me@example.com"}
        }"#;
        let session = parse_auth_response(body, 1_000).expect("session");
        assert_eq!(session.expires_at, 4_600);
        assert_eq!(session.account.email, "me@example.com");
        assert!(!session.is_expired(1_000));
        assert!(session.is_expired(4_580));
    }

    #[test]
    fn rejects_response_without_user() {
        let err = parse_auth_response(r#"{"access_token":"a","refresh_token":"r"}"#, 0)
            .expect_err("must fail");
        assert!(err.to_string().contains("invalid auth response"));
    }

    #[test]
    fn session_file_roundtrip_and_clear() {
        let dir = tempdir().expect("tempdir");
        let file = SessionFile::from_dir(dir.path());
        assert_eq!(file.load(), None);

        file.save(&sample(99)).expect("save");
        assert_eq!(file.load(), Some(sample(99)));

        file.clear().expect("clear");
        assert_eq!(file.load(), None);
        file.clear().expect("clear twice");
    }

    #[test]
    fn corrupt_session_file_reads_as_absent() {
        let dir = tempdir().expect("tempdir");
        let file = SessionFile::from_dir(dir.path());
        fs::write(file.path(), "{").expect("seed");
        assert_eq!(file.load(), None);
    }
}

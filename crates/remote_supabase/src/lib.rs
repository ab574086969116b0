mod session;

use std::time::Duration;

use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use chrono::Utc;
use config::RemoteConfig;
use journal_types::{Account, AccountId, Entry, EntryDate, RemoteMirror, SessionGate, Snapshot};
use parking_lot::RwLock;
use reqwest::RequestBuilder;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderName, HeaderValue};
use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;
use tracing::{debug, info, warn};

pub use session::{AuthSession, SessionFile};
use session::parse_auth_response;

#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("no active session")]
    NotSignedIn,
    #[error("session belongs to a different account")]
    AccountMismatch,
}

pub struct SupabaseClient {
    client: reqwest::Client,
    base_url: String,
    anon_key: String,
    table: String,
    session: RwLock<Option<AuthSession>>,
    session_file: Option<SessionFile>,
}

impl SupabaseClient {
    pub fn new(config: &RemoteConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .context("failed to build http client")?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            anon_key: config.anon_key.trim().to_string(),
            table: config.table.clone(),
            session: RwLock::new(None),
            session_file: None,
        })
    }

    /// Restores a persisted session and keeps the file in sync from now on.
    pub fn with_session_file(mut self, file: SessionFile) -> Self {
        *self.session.write() = file.load();
        self.session_file = Some(file);
        self
    }

    fn cached_session(&self) -> Option<AuthSession> {
        self.session.read().clone()
    }

    fn store_session(&self, session: Option<AuthSession>) {
        if let Some(file) = &self.session_file {
            let persisted = match &session {
                Some(session) => file.save(session),
                None => file.clear(),
            };
            if let Err(err) = persisted {
                warn!(error = %err, "failed to persist session state");
            }
        }
        *self.session.write() = session;
    }

    fn auth_url(&self, path: &str) -> String {
        format!("{}/auth/v1/{path}", self.base_url)
    }

    fn headers(&self, bearer: Option<&str>) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(
            HeaderName::from_static("apikey"),
            HeaderValue::from_str(&self.anon_key).context("invalid apikey header")?,
        );
        let token = bearer.unwrap_or(&self.anon_key);
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {token}"))
                .context("invalid authorization header")?,
        );
        Ok(headers)
    }

    async fn send(&self, request: RequestBuilder) -> Result<String> {
        let response = request.send().await?;
        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            bail!("remote request failed: {status} {text}");
        }
        Ok(text)
    }

    async fn refresh(&self, session: &AuthSession) -> Result<AuthSession> {
        let request = self
            .client
            .post(self.auth_url("token"))
            .query(&[("grant_type", "refresh_token")])
            .headers(self.headers(None)?)
            .json(&json!({ "refresh_token": session.refresh_token }));
        let body = self.send(request).await?;
        parse_auth_response(&body, Utc::now().timestamp())
    }

    /// Access token for `account`, refreshing it when close to expiry.
    async fn access_token_for(&self, account: &Account) -> Result<String> {
        let session = self
            .current_session()
            .await?
            .ok_or(RemoteError::NotSignedIn)?;
        if session.account.id != account.id {
            return Err(RemoteError::AccountMismatch.into());
        }
        Ok(session.access_token)
    }

    async fn current_session(&self) -> Result<Option<AuthSession>> {
        let Some(session) = self.cached_session() else {
            return Ok(None);
        };
        if !session.is_expired(Utc::now().timestamp()) {
            return Ok(Some(session));
        }

        debug!(account = %session.account.id, "session expired, refreshing");
        match self.refresh(&session).await {
            Ok(fresh) => {
                self.store_session(Some(fresh.clone()));
                Ok(Some(fresh))
            }
            Err(err) => {
                warn!(error = %err, "session refresh failed, signing out locally");
                self.store_session(None);
                Ok(None)
            }
        }
    }
}

#[async_trait]
impl SessionGate for SupabaseClient {
    async fn current_account(&self) -> Result<Option<Account>> {
        Ok(self.current_session().await?.map(|session| session.account))
    }

    async fn request_code(&self, email: &str) -> Result<()> {
        let email = email.trim();
        if email.is_empty() {
            bail!("email is required");
        }
        let request = self
            .client
            .post(self.auth_url("otp"))
            .headers(self.headers(None)?)
            .json(&json!({ "email": email, "create_user": true }));
        self.send(request).await?;
        info!("one-time code requested");
        Ok(())
    }

    async fn verify_code(&self, email: &str, code: &str) -> Result<Account> {
        let code = code.trim();
        if code.is_empty() {
            bail!("code is required");
        }
        let request = self
            .client
            .post(self.auth_url("verify"))
            .headers(self.headers(None)?)
            .json(&json!({ "type": "email", "email": email.trim(), "token": code }));
        let body = self.send(request).await?;
        let session = parse_auth_response(&body, Utc::now().timestamp())?;
        let account = session.account.clone();
        self.store_session(Some(session));
        info!(account = %account.id, "signed in");
        Ok(account)
    }

    async fn sign_out(&self) -> Result<()> {
        if let Some(session) = self.cached_session() {
            let request = self
                .client
                .post(self.auth_url("logout"))
                .headers(self.headers(Some(&session.access_token))?);
            if let Err(err) = self.send(request).await {
                warn!(error = %err, "remote logout failed, clearing local session anyway");
            }
        }
        self.store_session(None);
        Ok(())
    }
}

#[derive(Debug, Serialize)]
struct EntryRow<'a> {
    user_id: AccountId,
    date: &'a str,
    title: &'a str,
    day: &'a str,
    mood: &'a str,
    era: &'a str,
    relationship_status: &'a str,
    data: &'a Snapshot,
}

impl<'a> EntryRow<'a> {
    fn new(account: &Account, entry: &'a Entry) -> Self {
        Self {
            user_id: account.id,
            date: entry.date.as_str(),
            title: &entry.title,
            day: &entry.day,
            mood: &entry.mood,
            era: &entry.era,
            relationship_status: &entry.relationship_status,
            data: &entry.data,
        }
    }
}

#[derive(Debug, Deserialize)]
struct DataRow {
    #[serde(default)]
    data: Option<Snapshot>,
}

fn parse_data_rows(body: &str) -> Result<Option<Snapshot>> {
    let rows: Vec<DataRow> = serde_json::from_str(body).context("invalid rows response")?;
    Ok(rows.into_iter().next().and_then(|row| row.data))
}

#[async_trait]
impl RemoteMirror for SupabaseClient {
    async fn upsert(&self, account: &Account, entry: &Entry) -> Result<()> {
        let token = self.access_token_for(account).await?;
        let request = self
            .client
            .post(format!("{}/rest/v1/{}", self.base_url, self.table))
            .query(&[("on_conflict", "user_id,date")])
            .headers(self.headers(Some(&token))?)
            .header("Prefer", "resolution=merge-duplicates,return=minimal")
            .json(&EntryRow::new(account, entry));
        self.send(request).await?;
        debug!(date = %entry.date, "remote entry upserted");
        Ok(())
    }

    async fn get_by_date(&self, account: &Account, date: &EntryDate) -> Result<Option<Snapshot>> {
        let token = self.access_token_for(account).await?;
        let user_filter = format!("eq.{}", account.id);
        let date_filter = format!("eq.{date}");
        let request = self
            .client
            .get(format!("{}/rest/v1/{}", self.base_url, self.table))
            .query(&[
                ("select", "data"),
                ("user_id", user_filter.as_str()),
                ("date", date_filter.as_str()),
                ("limit", "1"),
            ])
            .headers(self.headers(Some(&token))?);
        let body = self.send(request).await?;
        parse_data_rows(&body)
    }
}

#[cfg(test)]
mod tests {
    use journal_types::FieldValue;
    use serde_json::Value;
    use uuid::Uuid;

    use super::*;

    fn account() -> Account {
        Account {
            id: Uuid::parse_str("7f6c0d9e-4a51-4a59-9f5e-0d1e0c3c9b1a").expect("uuid"),
            email: "me@example.com".to_string(),
        }
    }

    fn client() -> SupabaseClient {
        SupabaseClient::new(&RemoteConfig {
            enabled: true,
            base_url: "https://demo.supabase.co/".to_string(),
            anon_key: "anon".to_string(),
            ..RemoteConfig::default()
        })
        .expect("client")
    }

    #[test]
    fn builds_row_keyed_by_account_and_date() {
        let mut data = Snapshot::new();
        data.insert("mood".into(), FieldValue::text("Still Standing"));
        data.insert("progressPhotos".into(), FieldValue::Files { file_count: 1 });
        let entry = Entry::from_snapshot(EntryDate::parse("2024-03-01").expect("date"), data, 9);

        let row = serde_json::to_value(EntryRow::new(&account(), &entry)).expect("row");
        assert_eq!(row["user_id"], "7f6c0d9e-4a51-4a59-9f5e-0d1e0c3c9b1a");
        assert_eq!(row["date"], "2024-03-01");
        assert_eq!(row["mood"], "Still Standing");
        assert_eq!(row["relationship_status"], "");
        assert_eq!(row["data"]["progressPhotos"]["fileCount"], 1);
        assert_eq!(row.get("updated_at"), None::<&Value>);
    }

    #[test]
    fn parses_first_row_or_absent() {
        let found = parse_data_rows(r#"[{"data":{"title":"A"}}]"#).expect("rows");
        assert_eq!(
            found.expect("snapshot")["title"],
            FieldValue::text("A")
        );
        assert_eq!(parse_data_rows("[]").expect("rows"), None);
        assert_eq!(parse_data_rows(r#"[{"data":null}]"#).expect("rows"), None);
        assert!(parse_data_rows("{}").is_err());
    }

    #[test]
    fn trims_base_url_and_sets_auth_headers() {
        let client = client();
        assert_eq!(client.auth_url("otp"), "https://demo.supabase.co/auth/v1/otp");

        let headers = client.headers(Some("token")).expect("headers");
        assert_eq!(headers["apikey"], "anon");
        assert_eq!(headers[AUTHORIZATION], "Bearer token");
        let anon = client.headers(None).expect("headers");
        assert_eq!(anon[AUTHORIZATION], "Bearer anon");
    }

    #[tokio::test]
    async fn without_session_mirror_calls_fail_fast() {
        let client = client();
        assert_eq!(client.current_account().await.expect("account"), None);

        let err = client
            .get_by_date(&account(), &EntryDate::parse("2024-03-01").expect("date"))
            .await
            .expect_err("no session");
        assert!(matches!(
            err.downcast_ref::<RemoteError>(),
            Some(RemoteError::NotSignedIn)
        ));
    }

    #[tokio::test]
    async fn restores_persisted_session() {
        let dir = tempfile::tempdir().expect("tempdir");
        let file = SessionFile::from_dir(dir.path());
        let session = AuthSession {
            access_token: "at".to_string(),
            refresh_token: "rt".to_string(),
            expires_at: Utc::now().timestamp() + 3600,
            account: account(),
        };
        file.save(&session).expect("save");

        let client = client().with_session_file(file);
        assert_eq!(
            client.current_account().await.expect("account"),
            Some(account())
        );
        assert_eq!(client.access_token_for(&account()).await.expect("token"), "at");
    }
}

//! Hosted relational data service.
//!
//! Talks to a PostgREST-style endpoint (`/rest/v1/<table>`). Only inserts
//! and updates are issued; the single read is the generated id returned by
//! an insert.

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::Serialize;
use serde_json::Value;
use url::Url;

use crate::error::PersistenceError;
use crate::session::{NewSession, SessionId, SessionStore, SessionUpdate, TaskId};

const SESSIONS_TABLE: &str = "focus_sessions";
const SESSION_TASKS_TABLE: &str = "focus_session_tasks";

#[derive(Debug, Serialize)]
struct LinkRow<'a> {
    session_id: &'a str,
    task_id: &'a str,
}

pub struct RemoteStore {
    client: Client,
    base_url: Url,
    api_key: String,
    access_token: Option<String>,
}

impl RemoteStore {
    /// # Errors
    /// Returns an error if `base_url` is not an absolute URL.
    pub fn new(base_url: &str, api_key: impl Into<String>) -> Result<Self, PersistenceError> {
        let mut base = base_url.trim().to_string();
        if !base.ends_with('/') {
            base.push('/');
        }
        Ok(Self {
            client: Client::new(),
            base_url: Url::parse(&base)?,
            api_key: api_key.into(),
            access_token: None,
        })
    }

    /// Use a signed-in user's token instead of the anonymous key.
    pub fn with_access_token(mut self, token: impl Into<String>) -> Self {
        let token = token.into();
        self.access_token = (!token.is_empty()).then_some(token);
        self
    }

    fn endpoint(&self, table: &str) -> Result<Url, PersistenceError> {
        Ok(self.base_url.join(&format!("rest/v1/{table}"))?)
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        let bearer = self.access_token.as_deref().unwrap_or(&self.api_key);
        self.client
            .request(method, url)
            .header("apikey", &self.api_key)
            .bearer_auth(bearer)
    }
}

async fn check(response: Response) -> Result<Response, PersistenceError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(PersistenceError::Http {
        status: status.as_u16(),
        body,
    })
}

/// Pull the generated id out of a `return=representation` payload.
fn extract_id(payload: &Value) -> Result<SessionId, PersistenceError> {
    let row = match payload {
        Value::Array(rows) => rows.first(),
        Value::Object(_) => Some(payload),
        _ => None,
    }
    .ok_or_else(|| PersistenceError::MalformedResponse("empty insert response".into()))?;

    match row.get("id") {
        Some(Value::String(id)) => Ok(SessionId(id.clone())),
        Some(Value::Number(id)) => Ok(SessionId(id.to_string())),
        _ => Err(PersistenceError::MalformedResponse(format!(
            "insert response has no id: {row}"
        ))),
    }
}

#[async_trait]
impl SessionStore for RemoteStore {
    async fn create_session(&self, session: &NewSession) -> Result<SessionId, PersistenceError> {
        let url = self.endpoint(SESSIONS_TABLE)?;
        let response = self
            .request(Method::POST, url)
            .header("Prefer", "return=representation")
            .json(&[session])
            .send()
            .await?;
        let payload: Value = check(response).await?.json().await?;
        extract_id(&payload)
    }

    async fn update_session(
        &self,
        id: &SessionId,
        update: &SessionUpdate,
    ) -> Result<(), PersistenceError> {
        let mut url = self.endpoint(SESSIONS_TABLE)?;
        url.query_pairs_mut()
            .append_pair("id", &format!("eq.{id}"));
        let response = self
            .request(Method::PATCH, url)
            .header("Prefer", "return=minimal")
            .json(update)
            .send()
            .await?;
        check(response).await?;
        Ok(())
    }

    async fn link_tasks(
        &self,
        session_id: &SessionId,
        task_ids: &[TaskId],
    ) -> Result<(), PersistenceError> {
        let rows: Vec<LinkRow<'_>> = task_ids
            .iter()
            .map(|task_id| LinkRow {
                session_id: session_id.as_str(),
                task_id: task_id.as_str(),
            })
            .collect();
        let url = self.endpoint(SESSION_TASKS_TABLE)?;
        let response = self
            .request(Method::POST, url)
            .header("Prefer", "return=minimal")
            .json(&rows)
            .send()
            .await?;
        check(response).await?;
        Ok(())
    }
}

//! REST client for the `PagerDuty` API v2.
//!
//! [`IncidentApi`] is the seam between the workflow logic and the network;
//! [`PagerDutyClient`] is the reqwest implementation used by the binaries.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Method, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, instrument, warn};

use crate::config::Config;
use crate::error::{PagerDutyError, Result};
use crate::models::{CurrentUser, Incident, IncidentStatus, LogEntry, Note, Page};
use crate::pagination::PageRequest;
use crate::query::{IncidentQuery, LogEntryQuery};
use crate::retry::{self, RetryPolicy};

/// Media type selecting REST API v2.
const ACCEPT_V2: &str = "application/vnd.pagerduty+json;version=2";

/// Error bodies are truncated to this many characters.
const MAX_ERROR_BODY: usize = 800;

/// Operations the workflows need from `PagerDuty`.
#[async_trait]
pub trait IncidentApi: Send + Sync {
    /// Profile of the token's owner (`GET /users/me`).
    async fn current_user(&self) -> Result<CurrentUser>;

    /// One page of `GET /incidents`.
    async fn incidents_page(&self, query: &IncidentQuery, page: PageRequest)
        -> Result<Page<Incident>>;

    /// One page of `GET /log_entries`.
    async fn log_entries_page(
        &self,
        query: &LogEntryQuery,
        page: PageRequest,
    ) -> Result<Page<LogEntry>>;

    /// Move an incident to `status` (`PUT /incidents/{id}`), acting as `from`.
    async fn update_status(&self, incident_id: &str, status: IncidentStatus, from: &str)
        -> Result<()>;

    /// Notes attached to an incident.
    async fn list_notes(&self, incident_id: &str) -> Result<Vec<Note>>;

    /// Attach a note to an incident, acting as `from`.
    async fn create_note(&self, incident_id: &str, content: &str, from: &str) -> Result<Note>;
}

/// `PagerDuty` REST API client
#[derive(Debug, Clone)]
pub struct PagerDutyClient {
    client: reqwest::Client,
    api_url: String,
    retry: RetryPolicy,
}

#[derive(Deserialize)]
struct UserEnvelope {
    user: CurrentUser,
}

#[derive(Deserialize)]
struct IncidentsEnvelope {
    incidents: Vec<Incident>,
    #[serde(default)]
    more: bool,
    #[serde(default)]
    total: Option<u64>,
}

#[derive(Deserialize)]
struct LogEntriesEnvelope {
    log_entries: Vec<LogEntry>,
    #[serde(default)]
    more: bool,
    #[serde(default)]
    total: Option<u64>,
}

#[derive(Deserialize)]
struct NotesEnvelope {
    notes: Vec<Note>,
}

#[derive(Deserialize)]
struct NoteEnvelope {
    note: Note,
}

impl PagerDutyClient {
    /// Create a client from loaded configuration.
    ///
    /// # Errors
    /// Returns error if the token is not a valid header value or the HTTP
    /// client cannot be built.
    pub fn new(config: &Config) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static(ACCEPT_V2));
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let mut auth = HeaderValue::from_str(&format!("Token token={}", config.api_key))
            .map_err(|_| PagerDutyError::Config("PD_API_KEY contains invalid characters".into()))?;
        auth.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth);

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(config.request_timeout)
            .build()?;

        debug!(api_url = %config.api_url, "PagerDuty client initialized");

        Ok(Self {
            client,
            api_url: config.api_url.trim_end_matches('/').to_string(),
            retry: config.retry,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.api_url, path.trim_start_matches('/'))
    }

    /// GET with the read retry policy applied.
    async fn get_json<T: DeserializeOwned>(
        &self,
        operation: &str,
        path: &str,
        params: &[(&str, String)],
    ) -> Result<T> {
        let url = self.url(path);
        let mut attempt = 0_u32;

        loop {
            attempt += 1;
            let result = self.client.get(&url).query(params).send().await;

            match result {
                Ok(response) if response.status().is_success() => {
                    return Ok(response.json::<T>().await?);
                }
                Ok(response) => {
                    let status = response.status().as_u16();
                    let retry_after = retry::parse_retry_after(response.headers());
                    let body = response.text().await.unwrap_or_default();

                    if retry::is_retryable_status(status) && self.retry.should_retry(attempt) {
                        let delay = self.retry.delay(attempt, retry_after);
                        warn!(
                            operation,
                            status,
                            attempt,
                            delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                            "PagerDuty read failed, retrying"
                        );
                        tokio::time::sleep(delay).await;
                        continue;
                    }

                    return Err(api_error(operation, status, &body));
                }
                Err(e) => {
                    if retry::is_retryable_transport(&e) && self.retry.should_retry(attempt) {
                        let delay = self.retry.delay(attempt, None);
                        warn!(operation, attempt, error = %e, "PagerDuty read failed, retrying");
                        tokio::time::sleep(delay).await;
                        continue;
                    }
                    return Err(e.into());
                }
            }
        }
    }

    /// Single-attempt write carrying the `From` header.
    async fn send_write(
        &self,
        operation: &str,
        request: RequestBuilder,
        from: &str,
        body: &serde_json::Value,
    ) -> Result<reqwest::Response> {
        let response = request.header("From", from).json(body).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(operation, status = status.as_u16(), "PagerDuty write failed");
            return Err(api_error(operation, status.as_u16(), &body));
        }

        Ok(response)
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.client.request(method, self.url(path))
    }
}

#[async_trait]
impl IncidentApi for PagerDutyClient {
    #[instrument(skip(self))]
    async fn current_user(&self) -> Result<CurrentUser> {
        let envelope: UserEnvelope = self
            .get_json("get current user", "users/me", &[])
            .await?;
        Ok(envelope.user)
    }

    #[instrument(skip(self, query), fields(offset = page.offset))]
    async fn incidents_page(
        &self,
        query: &IncidentQuery,
        page: PageRequest,
    ) -> Result<Page<Incident>> {
        let mut params = query.to_params();
        params.extend(page.to_params());

        let envelope: IncidentsEnvelope = self.get_json("list incidents", "incidents", &params).await?;
        Ok(Page::new(envelope.incidents, envelope.more, envelope.total))
    }

    #[instrument(skip(self, query), fields(offset = page.offset))]
    async fn log_entries_page(
        &self,
        query: &LogEntryQuery,
        page: PageRequest,
    ) -> Result<Page<LogEntry>> {
        let mut params = query.to_params();
        params.extend(page.to_params());

        let envelope: LogEntriesEnvelope = self
            .get_json("list log entries", "log_entries", &params)
            .await?;
        Ok(Page::new(envelope.log_entries, envelope.more, envelope.total))
    }

    #[instrument(skip(self, from))]
    async fn update_status(
        &self,
        incident_id: &str,
        status: IncidentStatus,
        from: &str,
    ) -> Result<()> {
        let body = json!({
            "incident": {
                "type": "incident_reference",
                "status": status,
            }
        });
        let request = self.request(Method::PUT, &format!("incidents/{incident_id}"));
        self.send_write("update incident", request, from, &body).await?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn list_notes(&self, incident_id: &str) -> Result<Vec<Note>> {
        let envelope: NotesEnvelope = self
            .get_json("list notes", &format!("incidents/{incident_id}/notes"), &[])
            .await?;
        Ok(envelope.notes)
    }

    #[instrument(skip(self, content, from))]
    async fn create_note(&self, incident_id: &str, content: &str, from: &str) -> Result<Note> {
        let body = json!({ "note": { "content": content } });
        let request = self.request(Method::POST, &format!("incidents/{incident_id}/notes"));
        let response = self.send_write("create note", request, from, &body).await?;
        let envelope: NoteEnvelope = response.json().await?;
        Ok(envelope.note)
    }
}

fn api_error(operation: &str, status: u16, body: &str) -> PagerDutyError {
    PagerDutyError::Api {
        operation: operation.to_string(),
        status,
        body: truncate(body.trim(), MAX_ERROR_BODY),
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.replace('\n', " ");
    }
    let mut truncated: String = text.chars().take(max_chars).collect();
    truncated.push_str("...");
    truncated.replace('\n', " ")
}

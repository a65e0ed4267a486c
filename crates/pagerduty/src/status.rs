//! Public status page check with Nagios-style results.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use crate::error::{PagerDutyError, Result};

/// Description reported when nothing is degraded.
pub const OPERATIONAL: &str = "All Systems Operational";

/// Nagios plugin return code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CheckCode {
    Ok,
    Warning,
    Unknown,
}

impl CheckCode {
    #[must_use]
    pub const fn exit_code(self) -> i32 {
        match self {
            Self::Ok => 0,
            Self::Warning => 1,
            Self::Unknown => 3,
        }
    }
}

impl fmt::Display for CheckCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Ok => "OK",
            Self::Warning => "WARNING",
            Self::Unknown => "UNKNOWN",
        })
    }
}

/// Result of a status check
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckResult {
    pub code: CheckCode,
    pub message: String,
}

/// `status.json` document
#[derive(Debug, Clone, Deserialize)]
pub struct StatusDocument {
    pub status: PageStatus,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PageStatus {
    #[serde(default)]
    pub indicator: String,
    pub description: String,
}

/// Map a fetched document to a check result.
#[must_use]
pub fn evaluate(document: &StatusDocument) -> CheckResult {
    let PageStatus {
        indicator,
        description,
    } = &document.status;

    if description == OPERATIONAL {
        CheckResult {
            code: CheckCode::Ok,
            message: format!("Status OK: {description}"),
        }
    } else {
        CheckResult {
            code: CheckCode::Warning,
            message: format!("Indicator: {indicator}\nStatus: {description}"),
        }
    }
}

/// Result used when the status page cannot be read.
#[must_use]
pub fn unknown(host: &str) -> CheckResult {
    CheckResult {
        code: CheckCode::Unknown,
        message: format!("{host} is down"),
    }
}

/// Host named in `url`, for [`unknown`] messages.
///
/// Falls back to the text between the scheme and the first `/` when `url`
/// does not parse.
#[must_use]
pub fn host_of(url: &str) -> String {
    if let Some(host) = reqwest::Url::parse(url).ok().as_ref().and_then(reqwest::Url::host_str) {
        return host.to_string();
    }
    let rest = url.split_once("://").map_or(url, |(_, rest)| rest);
    let host = rest.split(['/', '?', '#']).next().unwrap_or(rest).trim();
    if host.is_empty() {
        "status page".to_string()
    } else {
        host.to_string()
    }
}

/// Unauthenticated client for the status page
#[derive(Debug, Clone)]
pub struct StatusClient {
    client: reqwest::Client,
    url: reqwest::Url,
}

impl StatusClient {
    /// # Errors
    /// Returns error if `url` is not an absolute URL with a host.
    pub fn new(url: &str, timeout: Duration) -> Result<Self> {
        let url = reqwest::Url::parse(url)
            .map_err(|e| PagerDutyError::Config(format!("invalid status URL '{url}': {e}")))?;
        if url.host_str().is_none() {
            return Err(PagerDutyError::Config(format!("status URL '{url}' has no host")));
        }

        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client, url })
    }

    fn host(&self) -> &str {
        self.url.host_str().unwrap_or("status page")
    }

    /// Fetch the status page once. Never fails: unreachable, non-2xx or
    /// undecodable responses all map to [`CheckCode::Unknown`].
    #[instrument(skip(self), fields(url = %self.url))]
    pub async fn check(&self) -> CheckResult {
        match self.fetch().await {
            Ok(document) => {
                let result = evaluate(&document);
                debug!(code = %result.code, "Status page evaluated");
                result
            }
            Err(e) => {
                warn!(error = %e, "Status page unavailable");
                unknown(self.host())
            }
        }
    }

    async fn fetch(&self) -> Result<StatusDocument> {
        let response = self.client.get(self.url.clone()).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(PagerDutyError::Api {
                operation: "status".into(),
                status: status.as_u16(),
                body: String::new(),
            });
        }
        Ok(response.json().await?)
    }
}

//! `PagerDuty` REST API entity definitions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Log entry type recording an assignment to a user.
pub const ASSIGN_LOG_ENTRY: &str = "assign_log_entry";

/// Incident lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IncidentStatus {
    Triggered,
    Acknowledged,
    Resolved,
}

impl IncidentStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Triggered => "triggered",
            Self::Acknowledged => "acknowledged",
            Self::Resolved => "resolved",
        }
    }

    /// Past-tense verb used in progress output.
    #[must_use]
    pub const fn verb(self) -> &'static str {
        match self {
            Self::Triggered => "Triggered",
            Self::Acknowledged => "Acknowledged",
            Self::Resolved => "Resolved",
        }
    }
}

impl fmt::Display for IncidentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reference to another `PagerDuty` object (user, team, incident, service)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reference {
    /// Object ID
    pub id: String,
    /// Object type, e.g. `user_reference`
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub ref_type: Option<String>,
    /// Human-readable label
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
}

impl Reference {
    /// Whether this references a user, as opposed to a service or integration.
    #[must_use]
    pub fn is_user(&self) -> bool {
        matches!(self.ref_type.as_deref(), Some("user_reference" | "user"))
    }
}

/// `PagerDuty` incident
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Incident {
    /// Unique identifier
    pub id: String,
    /// Account-wide incident number
    pub incident_number: u64,
    /// Incident title
    #[serde(default)]
    pub title: String,
    /// Summary (usually `[#number] title`)
    #[serde(default)]
    pub summary: Option<String>,
    /// Current status
    pub status: IncidentStatus,
    /// Log entry that triggered the incident.
    ///
    /// Only carries `agent` when requested with
    /// `include[]=first_trigger_log_entries`; otherwise a bare reference.
    #[serde(default)]
    pub first_trigger_log_entry: Option<LogEntry>,
}

impl Incident {
    /// Summary if present, title otherwise.
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.summary
            .as_deref()
            .filter(|s| !s.is_empty())
            .unwrap_or(&self.title)
    }

    /// ID of the user that triggered this incident, when embedded.
    ///
    /// `None` when the trigger entry is a bare reference or its agent is a
    /// service or integration.
    #[must_use]
    pub fn trigger_user_id(&self) -> Option<&str> {
        self.first_trigger_log_entry
            .as_ref()
            .and_then(|entry| entry.agent.as_ref())
            .filter(|agent| agent.is_user())
            .map(|agent| agent.id.as_str())
    }
}

/// Audit record describing a change on an incident
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    /// Unique identifier
    pub id: String,
    /// Entry type, e.g. `assign_log_entry` or `trigger_log_entry`
    #[serde(rename = "type")]
    pub entry_type: String,
    /// Agent responsible for the change
    #[serde(default)]
    pub agent: Option<Reference>,
    /// Incident the entry belongs to
    #[serde(default)]
    pub incident: Option<Reference>,
    /// When the entry was created
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl LogEntry {
    /// Incident this entry assigned to `user_id`, if it is such an entry.
    #[must_use]
    pub fn assigned_incident(&self, user_id: &str) -> Option<&str> {
        if self.entry_type != ASSIGN_LOG_ENTRY {
            return None;
        }
        if !self.agent.as_ref().is_some_and(|a| a.id == user_id) {
            return None;
        }
        self.incident.as_ref().map(|i| i.id.as_str())
    }
}

/// Note attached to an incident
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Note {
    #[serde(default)]
    pub id: Option<String>,
    pub content: String,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// Authenticated user as returned by `users/me`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrentUser {
    pub id: String,
    pub email: String,
    #[serde(default)]
    pub name: Option<String>,
    pub time_zone: String,
    #[serde(default)]
    pub teams: Vec<Reference>,
}

/// One page of a list endpoint
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// Whether the server has further pages
    pub more: bool,
    /// Total matching records, when requested with `total=true`
    pub total: Option<u64>,
}

impl<T> Page<T> {
    #[must_use]
    pub const fn new(items: Vec<T>, more: bool, total: Option<u64>) -> Self {
        Self { items, more, total }
    }
}

/// Short form of an incident used in reports
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IncidentSummary {
    pub id: String,
    pub incident_number: u64,
    pub title: String,
}

impl From<&Incident> for IncidentSummary {
    fn from(incident: &Incident) -> Self {
        Self {
            id: incident.id.clone(),
            incident_number: incident.incident_number,
            title: incident.display_name().to_string(),
        }
    }
}

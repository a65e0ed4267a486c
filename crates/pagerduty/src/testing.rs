//! In-memory [`IncidentApi`] used by unit tests.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;

use crate::client::IncidentApi;
use crate::error::{PagerDutyError, Result};
use crate::models::{CurrentUser, Incident, IncidentStatus, LogEntry, Note, Page, Reference};
use crate::pagination::PageRequest;
use crate::query::{IncidentQuery, LogEntryQuery};

pub fn reference(id: &str) -> Reference {
    Reference {
        id: id.to_string(),
        ref_type: None,
        summary: None,
    }
}

pub fn typed_reference(id: &str, ref_type: &str) -> Reference {
    Reference {
        ref_type: Some(ref_type.to_string()),
        ..reference(id)
    }
}

pub fn user(id: &str, teams: &[&str]) -> CurrentUser {
    CurrentUser {
        id: id.to_string(),
        email: format!("{id}@example.com"),
        name: None,
        time_zone: "Pacific/Auckland".to_string(),
        teams: teams.iter().map(|t| reference(t)).collect(),
    }
}

pub fn incident(id: &str, number: u64, status: IncidentStatus) -> Incident {
    Incident {
        id: id.to_string(),
        incident_number: number,
        title: format!("Incident {number}"),
        summary: None,
        status,
        first_trigger_log_entry: None,
    }
}

/// Resolved incident whose embedded trigger entry names user `agent_id`.
pub fn triggered_by(id: &str, number: u64, agent_id: &str) -> Incident {
    triggered_by_agent(id, number, typed_reference(agent_id, "user_reference"))
}

/// Resolved incident whose embedded trigger entry names `agent`.
pub fn triggered_by_agent(id: &str, number: u64, agent: Reference) -> Incident {
    Incident {
        first_trigger_log_entry: Some(LogEntry {
            id: format!("TRIG-{id}"),
            entry_type: "trigger_log_entry".to_string(),
            agent: Some(agent),
            incident: Some(reference(id)),
            created_at: None,
        }),
        ..incident(id, number, IncidentStatus::Resolved)
    }
}

pub fn log_entry(entry_type: &str, user_id: &str, incident_id: &str) -> LogEntry {
    LogEntry {
        id: format!("LOG-{entry_type}-{incident_id}"),
        entry_type: entry_type.to_string(),
        agent: Some(reference(user_id)),
        incident: Some(reference(incident_id)),
        created_at: None,
    }
}

pub fn note(content: &str) -> Note {
    Note {
        id: None,
        content: content.to_string(),
        created_at: None,
    }
}

/// Everything the fake has been asked to do.
#[derive(Debug, Default, Clone)]
pub struct Calls {
    pub current_user: usize,
    pub incident_pages: Vec<PageRequest>,
    pub incident_queries: Vec<IncidentQuery>,
    pub log_entry_pages: usize,
    pub updates: Vec<(String, IncidentStatus, String)>,
    pub list_notes: Vec<String>,
    pub created_notes: Vec<(String, String, String)>,
}

#[derive(Default)]
struct State {
    incidents: Vec<Incident>,
    log_entries: Vec<LogEntry>,
    notes: HashMap<String, Vec<Note>>,
    calls: Calls,
}

pub struct FakeApi {
    user: CurrentUser,
    current_user_error: Option<u16>,
    failing_update: Option<String>,
    ignore_status_filter: bool,
    state: Mutex<State>,
}

impl FakeApi {
    pub fn new(user: CurrentUser) -> Self {
        Self {
            user,
            current_user_error: None,
            failing_update: None,
            ignore_status_filter: false,
            state: Mutex::new(State::default()),
        }
    }

    pub fn with_incidents(self, incidents: Vec<Incident>) -> Self {
        self.lock().incidents = incidents;
        self
    }

    pub fn with_log_entries(self, entries: Vec<LogEntry>) -> Self {
        self.lock().log_entries = entries;
        self
    }

    pub fn with_notes(self, incident_id: &str, notes: Vec<Note>) -> Self {
        self.lock().notes.insert(incident_id.to_string(), notes);
        self
    }

    pub fn fail_current_user(mut self, status: u16) -> Self {
        self.current_user_error = Some(status);
        self
    }

    pub fn fail_update_of(mut self, incident_id: &str) -> Self {
        self.failing_update = Some(incident_id.to_string());
        self
    }

    /// Serve every stored incident regardless of the status filter, as a
    /// stale listing would.
    pub fn ignore_status_filter(mut self) -> Self {
        self.ignore_status_filter = true;
        self
    }

    pub fn calls(&self) -> Calls {
        self.lock().calls.clone()
    }

    pub fn status_of(&self, incident_id: &str) -> Option<IncidentStatus> {
        self.lock()
            .incidents
            .iter()
            .find(|i| i.id == incident_id)
            .map(|i| i.status)
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

fn window<T: Clone>(items: &[T], page: PageRequest) -> Page<T> {
    let start = (page.offset as usize).min(items.len());
    let end = (start + page.limit as usize).min(items.len());
    Page::new(
        items[start..end].to_vec(),
        end < items.len(),
        Some(items.len() as u64),
    )
}

#[async_trait]
impl IncidentApi for FakeApi {
    async fn current_user(&self) -> Result<CurrentUser> {
        self.lock().calls.current_user += 1;
        if let Some(status) = self.current_user_error {
            return Err(PagerDutyError::Api {
                operation: "get current user".into(),
                status,
                body: String::new(),
            });
        }
        Ok(self.user.clone())
    }

    async fn incidents_page(
        &self,
        query: &IncidentQuery,
        page: PageRequest,
    ) -> Result<Page<Incident>> {
        let mut state = self.lock();
        state.calls.incident_pages.push(page);
        state.calls.incident_queries.push(query.clone());

        let matching: Vec<Incident> = state
            .incidents
            .iter()
            .filter(|i| {
                self.ignore_status_filter
                    || query.statuses.is_empty()
                    || query.statuses.contains(&i.status)
            })
            .cloned()
            .collect();
        Ok(window(&matching, page))
    }

    async fn log_entries_page(
        &self,
        _query: &LogEntryQuery,
        page: PageRequest,
    ) -> Result<Page<LogEntry>> {
        let mut state = self.lock();
        state.calls.log_entry_pages += 1;
        Ok(window(&state.log_entries, page))
    }

    async fn update_status(
        &self,
        incident_id: &str,
        status: IncidentStatus,
        from: &str,
    ) -> Result<()> {
        let mut state = self.lock();
        state
            .calls
            .updates
            .push((incident_id.to_string(), status, from.to_string()));

        if self.failing_update.as_deref() == Some(incident_id) {
            return Err(PagerDutyError::Api {
                operation: "update incident".into(),
                status: 500,
                body: "boom".into(),
            });
        }

        if let Some(incident) = state.incidents.iter_mut().find(|i| i.id == incident_id) {
            incident.status = status;
        }
        Ok(())
    }

    async fn list_notes(&self, incident_id: &str) -> Result<Vec<Note>> {
        let mut state = self.lock();
        state.calls.list_notes.push(incident_id.to_string());
        Ok(state.notes.get(incident_id).cloned().unwrap_or_default())
    }

    async fn create_note(&self, incident_id: &str, content: &str, from: &str) -> Result<Note> {
        let mut state = self.lock();
        state.calls.created_notes.push((
            incident_id.to_string(),
            content.to_string(),
            from.to_string(),
        ));
        let created = note(content);
        state
            .notes
            .entry(incident_id.to_string())
            .or_default()
            .push(created.clone());
        Ok(created)
    }
}

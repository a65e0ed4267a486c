//! Notes on resolved incidents.
//!
//! For each resolved incident of the team, the annotator decides whether the
//! current user triggered it, skips incidents that already carry a note, and
//! asks a [`NoteProvider`] for the content of a new one.
//!
//! Authorship comes from the incident's embedded `first_trigger_log_entry`
//! when its agent is a user. Incidents triggered by a service or integration,
//! or without an embedded agent, fall back to the team's log entries, fetched
//! once per run and searched for an assignment to the user.

use std::collections::{HashSet, VecDeque};

use serde::Serialize;
use tracing::{debug, info};

use crate::client::IncidentApi;
use crate::context::UserContext;
use crate::error::{PagerDutyError, Result};
use crate::models::{Incident, IncidentSummary};
use crate::pagination::{self, PaginationOptions};
use crate::query::{IncidentQuery, LogEntryQuery};
use crate::window::TimeWindow;

/// Supplies note content for an incident.
pub trait NoteProvider {
    /// Content for a note on `incident`; `None` skips it.
    fn note_for(&mut self, incident: &Incident) -> Result<Option<String>>;
}

/// Prompts on the terminal for each note.
#[derive(Debug, Default)]
pub struct TerminalNotes;

impl NoteProvider for TerminalNotes {
    fn note_for(&mut self, incident: &Incident) -> Result<Option<String>> {
        let content: String = dialoguer::Input::new()
            .with_prompt(format!(
                "Enter a note for #{} {}",
                incident.incident_number,
                incident.display_name()
            ))
            .allow_empty(true)
            .interact_text()
            .map_err(PagerDutyError::from_prompt)?;
        Ok(Some(content))
    }
}

/// Hands out queued notes in order, then declines.
#[derive(Debug, Default)]
pub struct QueuedNotes(VecDeque<String>);

impl QueuedNotes {
    /// Notes left in the queue.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.0.len()
    }
}

impl<S: Into<String>> FromIterator<S> for QueuedNotes {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

impl NoteProvider for QueuedNotes {
    fn note_for(&mut self, _incident: &Incident) -> Result<Option<String>> {
        Ok(self.0.pop_front())
    }
}

/// Uses the same text for every incident.
#[derive(Debug, Clone)]
pub struct FixedNote(pub String);

impl NoteProvider for FixedNote {
    fn note_for(&mut self, _incident: &Incident) -> Result<Option<String>> {
        Ok(Some(self.0.clone()))
    }
}

/// How authorship was established
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Authorship {
    /// Embedded trigger log entry names the user
    TriggerLogEntry,
    /// A log entry assigns the incident to the user
    AssignmentLog,
    /// The user did not trigger this incident
    Denied,
}

impl Authorship {
    #[must_use]
    pub const fn is_confirmed(self) -> bool {
        !matches!(self, Self::Denied)
    }
}

/// What happened to one incident
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AnnotationOutcome {
    Annotated,
    NotAuthored,
    AlreadyNoted,
    Declined,
}

/// Outcome of an annotation run
#[derive(Debug, Clone, Default, Serialize)]
pub struct AnnotationReport {
    /// Resolved incidents examined
    pub examined: usize,
    /// Incidents that received a note
    pub annotated: Vec<IncidentSummary>,
    /// Incidents triggered by someone else
    pub not_authored: usize,
    /// Incidents that already had a note
    pub already_noted: usize,
    /// Incidents the provider declined to annotate
    pub declined: usize,
}

impl AnnotationReport {
    fn record(&mut self, incident: &Incident, outcome: AnnotationOutcome) {
        match outcome {
            AnnotationOutcome::Annotated => self.annotated.push(incident.into()),
            AnnotationOutcome::NotAuthored => self.not_authored += 1,
            AnnotationOutcome::AlreadyNoted => self.already_noted += 1,
            AnnotationOutcome::Declined => self.declined += 1,
        }
    }
}

/// Adds notes to resolved incidents the current user triggered.
pub struct Annotator<'a, A: ?Sized> {
    api: &'a A,
    ctx: &'a UserContext,
    window: &'a TimeWindow,
    pagination: PaginationOptions,
    /// Incident ids assigned to the user, loaded on first use.
    assignments: Option<HashSet<String>>,
}

impl<'a, A> Annotator<'a, A>
where
    A: IncidentApi + ?Sized,
{
    #[must_use]
    pub fn new(
        api: &'a A,
        ctx: &'a UserContext,
        window: &'a TimeWindow,
        pagination: PaginationOptions,
    ) -> Self {
        Self {
            api,
            ctx,
            window,
            pagination,
            assignments: None,
        }
    }

    /// Annotate every resolved incident of the team in the window.
    ///
    /// `on_progress` is called once per incident with its outcome.
    pub async fn annotate_resolved<N, F>(
        &mut self,
        notes: &mut N,
        mut on_progress: F,
    ) -> Result<AnnotationReport>
    where
        N: NoteProvider + ?Sized,
        F: FnMut(&Incident, AnnotationOutcome),
    {
        let query = IncidentQuery::resolved_for_team(self.ctx, self.window);
        let incidents = pagination::all_incidents(self.api, &query, self.pagination).await?;

        let mut report = AnnotationReport {
            examined: incidents.len(),
            ..AnnotationReport::default()
        };

        for incident in &incidents {
            let outcome = self.annotate(incident, &mut *notes).await?;
            on_progress(incident, outcome);
            report.record(incident, outcome);
        }

        info!(
            examined = report.examined,
            annotated = report.annotated.len(),
            "Annotation finished"
        );
        Ok(report)
    }

    /// Run the per-incident state machine.
    pub async fn annotate<N>(&mut self, incident: &Incident, notes: &mut N) -> Result<AnnotationOutcome>
    where
        N: NoteProvider + ?Sized,
    {
        let authorship = self.authorship(incident).await?;
        if !authorship.is_confirmed() {
            debug!(incident_id = %incident.id, "Not triggered by current user, skipping");
            return Ok(AnnotationOutcome::NotAuthored);
        }

        let existing = self.api.list_notes(&incident.id).await?;
        if !existing.is_empty() {
            debug!(incident_id = %incident.id, notes = existing.len(), "Already has notes, skipping");
            return Ok(AnnotationOutcome::AlreadyNoted);
        }

        let content = match notes.note_for(incident)? {
            Some(content) if !content.trim().is_empty() => content,
            _ => return Ok(AnnotationOutcome::Declined),
        };

        self.api
            .create_note(&incident.id, content.trim(), &self.ctx.email)
            .await?;
        info!(incident_id = %incident.id, ?authorship, "Note added");

        Ok(AnnotationOutcome::Annotated)
    }

    /// Decide whether the current user triggered `incident`.
    pub async fn authorship(&mut self, incident: &Incident) -> Result<Authorship> {
        if let Some(user_id) = incident.trigger_user_id() {
            return Ok(if user_id == self.ctx.id {
                Authorship::TriggerLogEntry
            } else {
                Authorship::Denied
            });
        }

        if self.assigned_via_log(&incident.id).await? {
            Ok(Authorship::AssignmentLog)
        } else {
            Ok(Authorship::Denied)
        }
    }

    async fn assigned_via_log(&mut self, incident_id: &str) -> Result<bool> {
        if let Some(assigned) = &self.assignments {
            return Ok(assigned.contains(incident_id));
        }

        let query = LogEntryQuery::for_team(self.ctx, self.window);
        let entries = pagination::all_log_entries(self.api, &query, self.pagination).await?;

        let assigned: HashSet<String> = entries
            .iter()
            .filter_map(|entry| entry.assigned_incident(&self.ctx.id))
            .map(str::to_string)
            .collect();
        debug!(count = assigned.len(), "Indexed assignments from log entries");

        let found = assigned.contains(incident_id);
        self.assignments = Some(assigned);
        Ok(found)
    }
}

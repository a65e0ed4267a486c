//! Bulk status transitions: acknowledge triggered incidents, resolve
//! acknowledged ones.

use serde::Serialize;
use tracing::{info, warn};

use crate::client::IncidentApi;
use crate::context::UserContext;
use crate::error::Result;
use crate::models::{Incident, IncidentStatus, IncidentSummary};
use crate::pagination::{self, PaginationOptions};
use crate::query::IncidentQuery;
use crate::window::TimeWindow;

/// Outcome of a bulk transition
#[derive(Debug, Clone, Serialize)]
pub struct TransitionReport {
    /// Status incidents were moved to
    pub target: IncidentStatus,
    /// Incidents returned by the listing
    pub fetched: usize,
    /// Incidents moved (or, in a dry run, that would have been moved)
    pub transitioned: Vec<IncidentSummary>,
    /// Incidents whose status no longer matched the precondition
    pub skipped: Vec<IncidentSummary>,
    pub dry_run: bool,
}

impl TransitionReport {
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.fetched == 0
    }
}

/// Applies status transitions to the current user's incidents.
pub struct Transitioner<'a, A: ?Sized> {
    api: &'a A,
    ctx: &'a UserContext,
    window: &'a TimeWindow,
    pagination: PaginationOptions,
    dry_run: bool,
}

impl<'a, A> Transitioner<'a, A>
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
            dry_run: false,
        }
    }

    /// List matching incidents without issuing any update.
    #[must_use]
    pub const fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Acknowledge every triggered incident assigned to the user.
    ///
    /// `on_progress` is called once per incident after its update succeeds.
    pub async fn acknowledge_all<F>(&self, on_progress: F) -> Result<TransitionReport>
    where
        F: FnMut(&Incident, IncidentStatus),
    {
        self.transition(IncidentStatus::Triggered, IncidentStatus::Acknowledged, on_progress)
            .await
    }

    /// Resolve every acknowledged incident assigned to the user.
    pub async fn resolve_all<F>(&self, on_progress: F) -> Result<TransitionReport>
    where
        F: FnMut(&Incident, IncidentStatus),
    {
        self.transition(IncidentStatus::Acknowledged, IncidentStatus::Resolved, on_progress)
            .await
    }

    /// Move each incident in `from` to `to`, one request per incident.
    ///
    /// Updates are not rolled back: if one fails, the error is returned and
    /// incidents updated before it keep their new status.
    async fn transition<F>(
        &self,
        from: IncidentStatus,
        to: IncidentStatus,
        mut on_progress: F,
    ) -> Result<TransitionReport>
    where
        F: FnMut(&Incident, IncidentStatus),
    {
        let query = IncidentQuery::assigned(self.ctx, from, self.window);
        let incidents = pagination::all_incidents(self.api, &query, self.pagination).await?;

        let mut report = TransitionReport {
            target: to,
            fetched: incidents.len(),
            transitioned: Vec::new(),
            skipped: Vec::new(),
            dry_run: self.dry_run,
        };

        for incident in &incidents {
            if incident.status != from {
                warn!(
                    incident_id = %incident.id,
                    status = %incident.status,
                    expected = %from,
                    "Incident status changed since listing, skipping"
                );
                report.skipped.push(incident.into());
                continue;
            }

            if !self.dry_run {
                self.api
                    .update_status(&incident.id, to, &self.ctx.email)
                    .await?;
            }

            info!(
                incident_id = %incident.id,
                number = incident.incident_number,
                status = %to,
                dry_run = self.dry_run,
                "Incident transitioned"
            );
            on_progress(incident, to);
            report.transitioned.push(incident.into());
        }

        Ok(report)
    }
}

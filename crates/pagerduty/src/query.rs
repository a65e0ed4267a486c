//! Filters for the incident and log entry list endpoints.

use crate::context::UserContext;
use crate::models::IncidentStatus;
use crate::window::TimeWindow;

/// Sort order used for incident listings.
pub const SORT_BY_NUMBER_DESC: &str = "incident_number:desc";

/// Filters for `GET /incidents`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncidentQuery {
    pub statuses: Vec<IncidentStatus>,
    pub user_ids: Vec<String>,
    pub team_ids: Vec<String>,
    pub time_zone: Option<String>,
    pub window: TimeWindow,
    pub sort_by: Option<&'static str>,
    pub include: Vec<&'static str>,
}

impl IncidentQuery {
    /// Incidents in `status` assigned to the current user within their team.
    #[must_use]
    pub fn assigned(ctx: &UserContext, status: IncidentStatus, window: &TimeWindow) -> Self {
        Self {
            statuses: vec![status],
            user_ids: vec![ctx.id.clone()],
            team_ids: vec![ctx.team_id.clone()],
            time_zone: Some(ctx.time_zone.clone()),
            window: window.clone(),
            sort_by: Some(SORT_BY_NUMBER_DESC),
            include: Vec::new(),
        }
    }

    /// Resolved incidents of the current team, with the trigger log entry
    /// embedded so authorship can be read without further requests.
    ///
    /// Resolved incidents have no assignees, so no user filter applies.
    #[must_use]
    pub fn resolved_for_team(ctx: &UserContext, window: &TimeWindow) -> Self {
        Self {
            statuses: vec![IncidentStatus::Resolved],
            user_ids: Vec::new(),
            team_ids: vec![ctx.team_id.clone()],
            time_zone: Some(ctx.time_zone.clone()),
            window: window.clone(),
            sort_by: Some(SORT_BY_NUMBER_DESC),
            include: vec!["first_trigger_log_entries"],
        }
    }

    /// Query string pairs, without `limit`/`offset`.
    #[must_use]
    pub fn to_params(&self) -> Vec<(&'static str, String)> {
        let mut params = Vec::new();
        for status in &self.statuses {
            params.push(("statuses[]", status.as_str().to_string()));
        }
        for id in &self.user_ids {
            params.push(("user_ids[]", id.clone()));
        }
        for id in &self.team_ids {
            params.push(("team_ids[]", id.clone()));
        }
        for include in &self.include {
            params.push(("include[]", (*include).to_string()));
        }
        if let Some(tz) = &self.time_zone {
            params.push(("time_zone", tz.clone()));
        }
        params.push(("since", self.window.since_param()));
        params.push(("until", self.window.until_param()));
        if let Some(sort_by) = self.sort_by {
            params.push(("sort_by", sort_by.to_string()));
        }
        params.push(("total", "true".to_string()));
        params
    }
}

/// Filters for `GET /log_entries`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntryQuery {
    pub team_ids: Vec<String>,
    pub time_zone: Option<String>,
    pub window: TimeWindow,
}

impl LogEntryQuery {
    /// Overview log entries of the current team within the window.
    #[must_use]
    pub fn for_team(ctx: &UserContext, window: &TimeWindow) -> Self {
        Self {
            team_ids: vec![ctx.team_id.clone()],
            time_zone: Some(ctx.time_zone.clone()),
            window: window.clone(),
        }
    }

    #[must_use]
    pub fn to_params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![("include[]", "incidents".to_string())];
        for id in &self.team_ids {
            params.push(("team_ids[]", id.clone()));
        }
        if let Some(tz) = &self.time_zone {
            params.push(("time_zone", tz.clone()));
        }
        params.push(("since", self.window.since_param()));
        params.push(("until", self.window.until_param()));
        params.push(("is_overview", "true".to_string()));
        params.push(("total", "true".to_string()));
        params
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::window;
    use chrono::NaiveDate;

    fn ctx() -> UserContext {
        UserContext {
            id: "PUSER1".into(),
            email: "oncall@example.com".into(),
            time_zone: "Pacific/Auckland".into(),
            team_id: "PTEAM1".into(),
        }
    }

    fn window() -> TimeWindow {
        let day = NaiveDate::from_ymd_opt(2026, 10, 19).unwrap();
        TimeWindow::around(day, window::default_offset(), 8).unwrap()
    }

    fn value<'a>(params: &'a [(&'static str, String)], key: &str) -> Vec<&'a str> {
        params
            .iter()
            .filter(|(k, _)| *k == key)
            .map(|(_, v)| v.as_str())
            .collect()
    }

    #[test]
    fn test_assigned_query_is_scoped_to_user_and_team() {
        let params = IncidentQuery::assigned(&ctx(), IncidentStatus::Triggered, &window()).to_params();

        assert_eq!(value(&params, "statuses[]"), ["triggered"]);
        assert_eq!(value(&params, "user_ids[]"), ["PUSER1"]);
        assert_eq!(value(&params, "team_ids[]"), ["PTEAM1"]);
        assert_eq!(value(&params, "time_zone"), ["Pacific/Auckland"]);
        assert_eq!(value(&params, "since"), ["2026-10-18T08:00:00+12:00"]);
        assert_eq!(value(&params, "until"), ["2026-10-20T08:00:00+12:00"]);
        assert_eq!(value(&params, "sort_by"), ["incident_number:desc"]);
        assert!(value(&params, "include[]").is_empty());
    }

    #[test]
    fn test_resolved_query_embeds_trigger_entries() {
        let params = IncidentQuery::resolved_for_team(&ctx(), &window()).to_params();

        assert_eq!(value(&params, "statuses[]"), ["resolved"]);
        assert!(value(&params, "user_ids[]").is_empty());
        assert_eq!(value(&params, "include[]"), ["first_trigger_log_entries"]);
    }

    #[test]
    fn test_log_entry_query() {
        let params = LogEntryQuery::for_team(&ctx(), &window()).to_params();

        assert_eq!(value(&params, "include[]"), ["incidents"]);
        assert_eq!(value(&params, "team_ids[]"), ["PTEAM1"]);
        assert_eq!(value(&params, "is_overview"), ["true"]);
        assert_eq!(value(&params, "total"), ["true"]);
    }
}

//! Identity of the acting user, resolved once per invocation.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;
use tracing::{debug, info};

use crate::client::IncidentApi;
use crate::error::{PagerDutyError, Result};
use crate::models::{CurrentUser, Reference};

/// Rule for choosing the working team when a user belongs to several.
///
/// Parsed from `first`, `last`, `only` or `id:<TEAM_ID>`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TeamSelection {
    /// First team listed on the user's profile
    #[default]
    First,
    /// Last team listed on the user's profile
    Last,
    /// The user's single team; more than one is an error
    Only,
    /// A specific team, which must be one of the user's teams
    Id(String),
}

impl TeamSelection {
    /// Apply the rule to `user`'s teams.
    ///
    /// # Errors
    /// [`PagerDutyError::NoTeam`], [`PagerDutyError::AmbiguousTeam`] or
    /// [`PagerDutyError::TeamNotFound`] depending on the rule.
    pub fn select<'a>(&self, user: &'a CurrentUser) -> Result<&'a Reference> {
        let no_team = || PagerDutyError::NoTeam {
            user_id: user.id.clone(),
        };

        match self {
            Self::First => user.teams.first().ok_or_else(no_team),
            Self::Last => user.teams.last().ok_or_else(no_team),
            Self::Only => match user.teams.as_slice() {
                [] => Err(no_team()),
                [team] => Ok(team),
                teams => Err(PagerDutyError::AmbiguousTeam {
                    user_id: user.id.clone(),
                    count: teams.len(),
                }),
            },
            Self::Id(team_id) => user
                .teams
                .iter()
                .find(|t| &t.id == team_id)
                .ok_or_else(|| PagerDutyError::TeamNotFound {
                    user_id: user.id.clone(),
                    team_id: team_id.clone(),
                }),
        }
    }
}

impl FromStr for TeamSelection {
    type Err = PagerDutyError;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if let Some(id) = s.strip_prefix("id:") {
            let id = id.trim();
            if id.is_empty() {
                return Err(PagerDutyError::Config("team id must not be empty".into()));
            }
            return Ok(Self::Id(id.to_string()));
        }
        match s.to_ascii_lowercase().as_str() {
            "first" => Ok(Self::First),
            "last" => Ok(Self::Last),
            "only" => Ok(Self::Only),
            other => Err(PagerDutyError::Config(format!(
                "unknown team rule '{other}' (expected first, last, only or id:<TEAM_ID>)"
            ))),
        }
    }
}

impl fmt::Display for TeamSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::First => f.write_str("first"),
            Self::Last => f.write_str("last"),
            Self::Only => f.write_str("only"),
            Self::Id(id) => write!(f, "id:{id}"),
        }
    }
}

/// The acting user's identity and working team
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserContext {
    pub id: String,
    pub email: String,
    pub time_zone: String,
    pub team_id: String,
}

impl UserContext {
    /// Fetch `users/me` once and pick the working team.
    ///
    /// # Errors
    /// Maps 404 to [`PagerDutyError::PrincipalNotFound`] and 401/403 to
    /// [`PagerDutyError::Unauthorized`]; team rule failures and any other
    /// request error propagate unchanged.
    pub async fn resolve<A>(api: &A, selection: &TeamSelection) -> Result<Self>
    where
        A: IncidentApi + ?Sized,
    {
        let user = api.current_user().await.map_err(|e| match e.status() {
            Some(404) => PagerDutyError::PrincipalNotFound,
            Some(status @ (401 | 403)) => PagerDutyError::Unauthorized { status },
            _ => e,
        })?;

        debug!(user_id = %user.id, teams = user.teams.len(), rule = %selection, "Resolving team");
        let team = selection.select(&user)?;

        info!(user_id = %user.id, team_id = %team.id, "Resolved user context");

        Ok(Self {
            id: user.id.clone(),
            email: user.email.clone(),
            time_zone: user.time_zone.clone(),
            team_id: team.id.clone(),
        })
    }
}

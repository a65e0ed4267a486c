//! Error types for the PagerDuty automation client.

use thiserror::Error;

/// Errors that can occur while talking to `PagerDuty`.
#[derive(Debug, Error)]
pub enum PagerDutyError {
    /// Required configuration is missing or malformed
    #[error("Configuration error: {0}")]
    Config(String),

    /// `users/me` returned 404 for this token
    #[error("Your PagerDuty account does not exist? (users/me returned 404)")]
    PrincipalNotFound,

    /// The API token was rejected
    #[error("PagerDuty rejected the API token (HTTP {status})")]
    Unauthorized { status: u16 },

    /// The current user is not a member of any team
    #[error("User {user_id} does not belong to any team")]
    NoTeam { user_id: String },

    /// The `only` team rule matched more than one team
    #[error("User {user_id} belongs to {count} teams; pick one with --team id:<TEAM_ID>")]
    AmbiguousTeam { user_id: String, count: usize },

    /// An explicitly requested team is not among the user's teams
    #[error("User {user_id} is not a member of team {team_id}")]
    TeamNotFound { user_id: String, team_id: String },

    /// The API answered with a non-success status
    #[error("PagerDuty API {operation} failed with status {status}: {body}")]
    Api {
        operation: String,
        status: u16,
        body: String,
    },

    /// HTTP transport failed
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Pagination did not terminate within the configured bound
    #[error("Pagination of {endpoint} exceeded {max_pages} pages")]
    PageLimitExceeded { endpoint: String, max_pages: u32 },

    /// Reading interactive input failed
    #[error("Failed to read input: {0}")]
    NoteInput(String),

    /// The operator pressed Ctrl-C at a prompt
    #[error("Interrupted")]
    Interrupted,
}

impl PagerDutyError {
    /// Whether this error stems from credentials, identity or team setup
    /// rather than from a failed request.
    #[must_use]
    pub const fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::Config(_)
                | Self::PrincipalNotFound
                | Self::Unauthorized { .. }
                | Self::NoTeam { .. }
                | Self::AmbiguousTeam { .. }
                | Self::TeamNotFound { .. }
        )
    }

    /// Map a prompt failure, keeping Ctrl-C distinct from other I/O errors.
    #[must_use]
    pub fn from_prompt(error: dialoguer::Error) -> Self {
        match error {
            dialoguer::Error::IO(io) if io.kind() == std::io::ErrorKind::Interrupted => {
                Self::Interrupted
            }
            other => Self::NoteInput(other.to_string()),
        }
    }

    /// HTTP status carried by this error, if any.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } | Self::Unauthorized { status } => Some(*status),
            Self::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, PagerDutyError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn test_configuration_classification() {
        assert!(PagerDutyError::Config("PD_API_KEY".into()).is_configuration());
        assert!(PagerDutyError::PrincipalNotFound.is_configuration());
        assert!(PagerDutyError::NoTeam {
            user_id: "U1".into()
        }
        .is_configuration());

        let api = PagerDutyError::Api {
            operation: "update incident".into(),
            status: 500,
            body: String::new(),
        };
        assert!(!api.is_configuration());
        assert_eq!(api.status(), Some(500));
    }

    #[test]
    fn test_prompt_interrupt_is_distinct() {
        let interrupted = dialoguer::Error::IO(io::Error::from(io::ErrorKind::Interrupted));
        assert!(matches!(
            PagerDutyError::from_prompt(interrupted),
            PagerDutyError::Interrupted
        ));

        let closed = dialoguer::Error::IO(io::Error::from(io::ErrorKind::UnexpectedEof));
        assert!(matches!(
            PagerDutyError::from_prompt(closed),
            PagerDutyError::NoteInput(_)
        ));
    }

    #[test]
    fn test_messages_are_single_line() {
        let err = PagerDutyError::AmbiguousTeam {
            user_id: "U1".into(),
            count: 3,
        };
        let message = err.to_string();
        assert!(!message.contains('\n'));
        assert!(message.contains("3 teams"));
    }
}

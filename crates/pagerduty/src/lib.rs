//! `PagerDuty` incident automation.
//!
//! Small workflows an on-call engineer runs at the start and end of a shift:
//!
//! - acknowledge every triggered incident assigned to them
//! - resolve every incident they acknowledged
//! - add a note to each resolved incident they triggered
//! - check the public status page for outages
//!
//! # Configuration
//!
//! Read from the environment by [`Config::from_env`]:
//!
//! - `PD_API_KEY`: REST API token (required)
//! - `PD_API_URL`: API base URL
//! - `PD_UTC_OFFSET` and `PD_WINDOW_HOUR`: anchor of the daily query window
//! - `PD_TEAM`: team rule (`first`, `last`, `only` or `id:<TEAM_ID>`)
//! - `PD_MAX_PAGES`, `PD_RETRY_ATTEMPTS`, `PD_RETRY_BASE_DELAY_MS`,
//!   `PD_TIMEOUT_SECS`
//!
//! # Architecture
//!
//! Workflows depend on the [`IncidentApi`] trait; [`PagerDutyClient`] is the
//! HTTP implementation. The acting user is resolved once into a
//! [`UserContext`] and passed to each workflow explicitly.

#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]

pub mod annotate;
pub mod client;
pub mod config;
pub mod context;
pub mod error;
pub mod models;
pub mod pagination;
pub mod query;
pub mod retry;
pub mod status;
pub mod transition;
pub mod window;

#[cfg(test)]
mod testing;

pub use annotate::{
    AnnotationOutcome, AnnotationReport, Annotator, FixedNote, NoteProvider, QueuedNotes,
    TerminalNotes,
};
pub use client::{IncidentApi, PagerDutyClient};
pub use config::Config;
pub use context::{TeamSelection, UserContext};
pub use error::{PagerDutyError, Result};
pub use models::{Incident, IncidentStatus, IncidentSummary};
pub use pagination::PaginationOptions;
pub use status::{CheckCode, CheckResult, StatusClient};
pub use transition::{TransitionReport, Transitioner};
pub use window::TimeWindow;

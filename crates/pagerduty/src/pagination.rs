//! Offset/limit pagination over `PagerDuty` list endpoints.
//!
//! The server's `more` flag drives the loop. The loop also stops once the
//! reported `total` has been collected or a page comes back empty, and it
//! fails after `max_pages` pages instead of looping forever.

use std::future::Future;

use tracing::{debug, info, warn};

use crate::client::IncidentApi;
use crate::error::{PagerDutyError, Result};
use crate::models::{Incident, LogEntry, Page};
use crate::query::{IncidentQuery, LogEntryQuery};

/// Records requested per page.
pub const DEFAULT_PAGE_SIZE: u32 = 100;

/// `PagerDuty` rejects classic pagination beyond offset 10,000.
pub const DEFAULT_MAX_PAGES: u32 = 100;

/// Page size and upper bound on pages fetched per listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaginationOptions {
    pub page_size: u32,
    pub max_pages: u32,
}

impl Default for PaginationOptions {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            max_pages: DEFAULT_MAX_PAGES,
        }
    }
}

/// Cursor for a single page
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub offset: u32,
    pub limit: u32,
}

impl PageRequest {
    #[must_use]
    pub fn to_params(self) -> [(&'static str, String); 2] {
        [
            ("limit", self.limit.to_string()),
            ("offset", self.offset.to_string()),
        ]
    }
}

/// Fetch every page from `fetch` and concatenate the records in server order.
///
/// # Errors
/// Propagates the first fetch error, or returns
/// [`PagerDutyError::PageLimitExceeded`] when the server keeps reporting
/// more pages past `options.max_pages`.
pub async fn collect_pages<T, F, Fut>(
    endpoint: &str,
    options: PaginationOptions,
    mut fetch: F,
) -> Result<Vec<T>>
where
    F: FnMut(PageRequest) -> Fut,
    Fut: Future<Output = Result<Page<T>>>,
{
    let limit = options.page_size.max(1);
    let mut records = Vec::new();
    let mut offset = 0_u32;
    let mut pages = 0_u32;

    loop {
        if pages >= options.max_pages {
            warn!(endpoint, pages, "Server still reports more results, giving up");
            return Err(PagerDutyError::PageLimitExceeded {
                endpoint: endpoint.to_string(),
                max_pages: options.max_pages,
            });
        }

        let page = fetch(PageRequest { offset, limit }).await?;
        pages += 1;

        let received = page.items.len();
        records.extend(page.items);
        debug!(endpoint, offset, received, more = page.more, "Fetched page");

        if !page.more {
            break;
        }
        if received == 0 {
            warn!(endpoint, offset, "Empty page with more=true, stopping");
            break;
        }
        if let Some(total) = page.total {
            if records.len() as u64 >= total {
                debug!(endpoint, total, "Collected reported total, stopping");
                break;
            }
        }

        offset = offset.saturating_add(limit);
    }

    Ok(records)
}

/// All incidents matching `query`.
pub async fn all_incidents<A>(
    api: &A,
    query: &IncidentQuery,
    options: PaginationOptions,
) -> Result<Vec<Incident>>
where
    A: IncidentApi + ?Sized,
{
    let incidents =
        collect_pages("incidents", options, move |page| api.incidents_page(query, page)).await?;

    if incidents.is_empty() {
        info!("No incidents found");
    } else {
        info!(count = incidents.len(), "Fetched incidents");
    }

    Ok(incidents)
}

/// All log entries matching `query`.
pub async fn all_log_entries<A>(
    api: &A,
    query: &LogEntryQuery,
    options: PaginationOptions,
) -> Result<Vec<LogEntry>>
where
    A: IncidentApi + ?Sized,
{
    let entries =
        collect_pages("log_entries", options, move |page| api.log_entries_page(query, page))
            .await?;
    info!(count = entries.len(), "Fetched log entries");
    Ok(entries)
}

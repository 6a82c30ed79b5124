//! Paginated collection fetching.
//!
//! Two ways of walking an endpoint to completion:
//!
//! - **Offset fan-out** ([`fetch_offset_pages`], [`fetch_offset_pages_discovering`]):
//!   the total is known (up front, or from the first page), so every offset
//!   is computed and fetched by its own task, at most
//!   [`FetchOptions::max_in_flight`] at a time.
//! - **Offset walk** ([`fetch_offset_pages_sequential`]): same offsets, one
//!   request at a time. For collections fetched from inside another fan-out.
//! - **Cursor walk** ([`fetch_cursor_pages`]): the cursor of page N+1 is only
//!   known once page N arrived, so pages are fetched one after the other.
//!
//! Every page request goes through the [`RetryPolicy`](super::RetryPolicy)
//! of the [`Remote`]. What happens when a page still fails is decided by
//! [`PageFailurePolicy`].

use std::{future::Future, sync::Arc};

use tokio::{sync::Semaphore, task::JoinSet};

use crate::{config, error::RemoteError, types::Page, warning};

use super::Remote;

/// What to do with a page that failed after retries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PageFailurePolicy {
    /// Log it and carry on without that page's items. The run verifies the
    /// final playlist size, which exposes the gap.
    #[default]
    Skip,
    /// Fail the whole fetch with the page's error.
    Abort,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchOptions {
    /// Upper bound of concurrently running requests per fan-out point.
    pub max_in_flight: usize,
    pub on_page_failure: PageFailurePolicy,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            max_in_flight: config::DEFAULT_MAX_IN_FLIGHT,
            on_page_failure: PageFailurePolicy::Skip,
        }
    }
}

/// Offsets of every page of an endpoint holding `total` items.
pub fn page_offsets(total: u32, page_size: u32) -> Vec<u32> {
    let page_size = page_size.max(1);
    (0..total).step_by(page_size as usize).collect()
}

/// Runs `task` once per input, at most `max_in_flight` at a time.
///
/// Results come back in input order regardless of completion order. A task
/// that panics yields [`RemoteError::TaskFailed`] in its slot.
pub async fn fan_out<I, O, F, Fut>(
    inputs: Vec<I>,
    max_in_flight: usize,
    task: F,
) -> Vec<Result<O, RemoteError>>
where
    I: Send + 'static,
    O: Send + 'static,
    F: Fn(I) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<O, RemoteError>> + Send + 'static,
{
    let count = inputs.len();
    let semaphore = Arc::new(Semaphore::new(max_in_flight.max(1)));
    let task = Arc::new(task);
    let mut set = JoinSet::new();

    for (index, input) in inputs.into_iter().enumerate() {
        let semaphore = Arc::clone(&semaphore);
        let task = Arc::clone(&task);
        set.spawn(async move {
            // the semaphore is never closed
            let _permit = semaphore.acquire_owned().await.ok();
            (index, task(input).await)
        });
    }

    let mut slots: Vec<Option<Result<O, RemoteError>>> = (0..count).map(|_| None).collect();
    while let Some(joined) = set.join_next().await {
        match joined {
            Ok((index, result)) => slots[index] = Some(result),
            Err(e) => warning!("Task join error: {}", e),
        }
    }

    slots
        .into_iter()
        .map(|slot| slot.unwrap_or_else(|| Err(RemoteError::TaskFailed)))
        .collect()
}

/// Fetches every page of an offset-paginated endpoint whose total is known.
///
/// Issues exactly `ceil(total / page_size)` page requests, concurrently.
/// `fetch` receives `(offset, limit)`. Items are returned in page order.
///
/// # Errors
///
/// Only with [`PageFailurePolicy::Abort`]: the first failed page's error.
pub async fn fetch_offset_pages<T, F, Fut>(
    remote: &Remote,
    operation: &str,
    total: u32,
    page_size: u32,
    fetch: F,
) -> Result<Vec<T>, RemoteError>
where
    T: Send + 'static,
    F: Fn(Remote, u32, u32) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Page<T>, RemoteError>> + Send + 'static,
{
    fetch_from(remote, operation, total, page_size, 0, Arc::new(fetch)).await
}

/// Like [`fetch_offset_pages`] but learns the total from the first page.
///
/// The first page is fetched on its own; the remaining offsets are fanned
/// out afterwards.
///
/// # Errors
///
/// The first page's error, since without it the total is unknown. Later
/// pages follow the configured [`PageFailurePolicy`].
pub async fn fetch_offset_pages_discovering<T, F, Fut>(
    remote: &Remote,
    operation: &str,
    page_size: u32,
    fetch: F,
) -> Result<Vec<T>, RemoteError>
where
    T: Send + 'static,
    F: Fn(Remote, u32, u32) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Page<T>, RemoteError>> + Send + 'static,
{
    let page_size = page_size.max(1);
    let fetch = Arc::new(fetch);

    let first = remote
        .retry()
        .execute(operation, || fetch(remote.clone(), 0, page_size))
        .await?;

    let total = reported_total(operation, &first);
    let mut items = first.items;
    if total > page_size {
        let rest = fetch_from(remote, operation, total, page_size, page_size, fetch).await?;
        items.extend(rest);
    }
    Ok(items)
}

/// Like [`fetch_offset_pages_discovering`] but requests one page at a time.
///
/// Meant for collections fetched per element of an outer [`fan_out`], where
/// a nested fan-out would multiply the requests in flight.
///
/// # Errors
///
/// The first page's error. Later pages follow the configured
/// [`PageFailurePolicy`].
pub async fn fetch_offset_pages_sequential<T, F, Fut>(
    remote: &Remote,
    operation: &str,
    page_size: u32,
    mut fetch: F,
) -> Result<Vec<T>, RemoteError>
where
    F: FnMut(u32, u32) -> Fut,
    Fut: Future<Output = Result<Page<T>, RemoteError>>,
{
    let page_size = page_size.max(1);
    let on_page_failure = remote.fetch_options().on_page_failure;

    let first = remote
        .retry()
        .execute(operation, || fetch(0, page_size))
        .await?;

    let total = reported_total(operation, &first);
    let mut items = first.items;

    for offset in page_offsets(total, page_size).into_iter().skip(1) {
        match remote
            .retry()
            .execute(operation, || fetch(offset, page_size))
            .await
        {
            Ok(page) => items.extend(page.items),
            Err(e) => match on_page_failure {
                PageFailurePolicy::Skip => {
                    warning!("Dropping page at offset {} of {}: {}", offset, operation, e);
                }
                PageFailurePolicy::Abort => return Err(e),
            },
        }
    }
    Ok(items)
}

/// Total announced by a first page, falling back to its own length.
fn reported_total<T>(operation: &str, first: &Page<T>) -> u32 {
    match first.total {
        Some(total) => total,
        None if first.next.is_some() => {
            warning!(
                "{} did not report a total, only the first page was read",
                operation
            );
            first.items.len() as u32
        }
        None => first.items.len() as u32,
    }
}

async fn fetch_from<T, F, Fut>(
    remote: &Remote,
    operation: &str,
    total: u32,
    page_size: u32,
    start: u32,
    fetch: Arc<F>,
) -> Result<Vec<T>, RemoteError>
where
    T: Send + 'static,
    F: Fn(Remote, u32, u32) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Page<T>, RemoteError>> + Send + 'static,
{
    let page_size = page_size.max(1);
    let offsets: Vec<u32> = page_offsets(total, page_size)
        .into_iter()
        .filter(|offset| *offset >= start)
        .collect();

    let options = *remote.fetch_options();
    let task_remote = remote.clone();
    let task_operation: Arc<str> = Arc::from(operation);

    let pages = fan_out(offsets.clone(), options.max_in_flight, move |offset| {
        let remote = task_remote.clone();
        let fetch = Arc::clone(&fetch);
        let operation = Arc::clone(&task_operation);
        async move {
            remote
                .retry()
                .execute(&operation, || fetch(remote.clone(), offset, page_size))
                .await
        }
    })
    .await;

    let mut items = Vec::new();
    for (offset, page) in offsets.into_iter().zip(pages) {
        match page {
            Ok(page) => items.extend(page.items),
            Err(e) => match options.on_page_failure {
                PageFailurePolicy::Skip => {
                    warning!("Dropping page at offset {} of {}: {}", offset, operation, e);
                }
                PageFailurePolicy::Abort => return Err(e),
            },
        }
    }
    Ok(items)
}

/// Walks a cursor-paginated endpoint one page at a time.
///
/// `fetch` receives the cursor of the page to load (`None` for the first
/// page). The walk ends when a page has no `next` cursor or comes back empty.
///
/// # Errors
///
/// With [`PageFailurePolicy::Abort`] the failing page's error. With
/// [`PageFailurePolicy::Skip`] the walk stops at the failing page and the
/// items gathered so far are returned, unless it was the first page.
pub async fn fetch_cursor_pages<T, F, Fut>(
    remote: &Remote,
    operation: &str,
    mut fetch: F,
) -> Result<Vec<T>, RemoteError>
where
    F: FnMut(Option<String>) -> Fut,
    Fut: Future<Output = Result<Page<T>, RemoteError>>,
{
    let mut items = Vec::new();
    let mut cursor: Option<String> = None;
    let mut pages = 0usize;
    let skip_failures = remote.fetch_options().on_page_failure == PageFailurePolicy::Skip;

    loop {
        let current = cursor.clone();
        let page = match remote
            .retry()
            .execute(operation, || fetch(current.clone()))
            .await
        {
            Ok(page) => page,
            Err(e) if pages > 0 && skip_failures => {
                warning!("Stopping {} after {} page(s): {}", operation, pages, e);
                break;
            }
            Err(e) => return Err(e),
        };

        pages += 1;
        let empty = page.items.is_empty();
        items.extend(page.items);

        match page.next {
            Some(next) if !empty => cursor = Some(next),
            _ => break,
        }
    }

    Ok(items)
}

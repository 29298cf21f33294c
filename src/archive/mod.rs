//! Remote archive inventory: resolves an item's JP2 zip listing and extracts
//! the page-image filenames it contains.
//!
//! Session handling and link resolution live behind [`ArchiveService`]; the
//! listing GET lives behind [`ListingClient`]. [`IaClient`] implements both
//! against the live archive.

pub mod error;
pub mod ia;
pub mod listing;

use async_trait::async_trait;

pub use error::FetchError;
pub use ia::{Credentials, IaClient};

use crate::record::AuditRecord;
use crate::retry::{retry_with_backoff, RetryAction, RetryConfig};

/// Session and link resolution for the remote archive.
#[async_trait]
pub trait ArchiveService: Send + Sync {
    /// `Cookie` header value for authenticated requests (may be empty).
    async fn login_cookies(&self) -> Result<String, FetchError>;

    /// Base URL of the item's downloadable JP2 archive, or an empty string
    /// when the item has none.
    async fn remote_file_link(&self, item_id: &str) -> Result<String, FetchError>;
}

/// Single GET of a directory listing page, following redirects.
#[async_trait]
pub trait ListingClient: Send + Sync {
    /// Returns the response body; `None` when the server sent none.
    async fn get_listing(&self, url: &str, cookies: &str) -> Result<Option<String>, FetchError>;
}

fn classify(err: &FetchError) -> RetryAction {
    if err.is_retryable() {
        RetryAction::Retry
    } else {
        RetryAction::Abort
    }
}

/// Listing URL for a resolved link; the listing endpoint needs the trailing slash.
fn listing_url(link: &str) -> Option<String> {
    let url = format!("{}/", link.trim().trim_end_matches('/'));
    if url == "/" {
        None
    } else {
        Some(url)
    }
}

/// One resolve-and-fetch attempt.
async fn fetch_listing(
    service: &dyn ArchiveService,
    client: &dyn ListingClient,
    item_id: &str,
) -> Result<Option<String>, FetchError> {
    let link = service.remote_file_link(item_id).await?;
    let url = listing_url(&link).ok_or(FetchError::MalformedUrl)?;
    let cookies = service.login_cookies().await?;
    tracing::debug!(url = %url, "Fetching remote listing");
    client.get_listing(&url, &cookies).await
}

/// Fetch the filenames the archive lists for `item_id`.
///
/// Timeouts are retried per `retry`. Any failure is recorded as the
/// record's status and yields an empty list; an empty body yields an empty
/// list without touching the status.
pub async fn fetch_remote_filenames(
    service: &dyn ArchiveService,
    client: &dyn ListingClient,
    retry: &RetryConfig,
    item_id: &str,
    record: &mut AuditRecord,
) -> Vec<String> {
    let result = retry_with_backoff(retry, classify, || {
        fetch_listing(service, client, item_id)
    })
    .await;

    match result {
        Ok(Some(body)) if !body.is_empty() => listing::jp2_filenames(&body),
        Ok(_) => Vec::new(),
        Err(e) => {
            tracing::warn!("{} -- remote fetch failed: {}", item_id, e);
            record.status = Some(e.status());
            Vec::new()
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! In-memory fakes for the archive seams.

    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;

    use super::*;

    pub struct FakeArchive {
        pub link: String,
    }

    impl FakeArchive {
        pub fn with_link(link: &str) -> Self {
            Self {
                link: link.to_string(),
            }
        }
    }

    #[async_trait]
    impl ArchiveService for FakeArchive {
        async fn login_cookies(&self) -> Result<String, FetchError> {
            Ok("logged-in-sig=test".to_string())
        }

        async fn remote_file_link(&self, _item_id: &str) -> Result<String, FetchError> {
            Ok(self.link.clone())
        }
    }

    type Reply = Result<Option<String>, FetchError>;

    /// Replays queued replies; once drained, returns an empty body.
    #[derive(Default)]
    pub struct ScriptedListing {
        replies: Mutex<VecDeque<Reply>>,
        calls: AtomicU32,
        pub last_request: Mutex<Option<(String, String)>>,
    }

    impl ScriptedListing {
        pub fn new(replies: impl IntoIterator<Item = Reply>) -> Self {
            Self {
                replies: Mutex::new(replies.into_iter().collect()),
                ..Default::default()
            }
        }

        pub fn calls(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ListingClient for ScriptedListing {
        async fn get_listing(&self, url: &str, cookies: &str) -> Reply {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.last_request.lock().unwrap() = Some((url.to_string(), cookies.to_string()));
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Ok(None))
        }
    }
}

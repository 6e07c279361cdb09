//! The directory source contract.

use std::future::Future;

use crate::error::Result;
use crate::types::UserPage;

/// A paginated producer of raw directory records.
///
/// Callers request the first page with `None` and keep passing the returned
/// `next_page_token` until it comes back `None`. Transient failures (rate
/// limiting, flaky network) are the implementation's business; any error
/// that escapes is treated as fatal by the caller.
pub trait DirectorySource {
    /// Fetch one page of users.
    fn fetch_users_page(
        &self,
        page_token: Option<&str>,
    ) -> impl Future<Output = Result<UserPage>> + Send;
}

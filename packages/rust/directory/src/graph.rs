//! Microsoft Graph `/users` client.
//!
//! Authenticates with the OAuth2 client-credentials grant, then pages through
//! `/users` following `@odata.nextLink`. Throttling (429) and transient
//! gateway errors are retried here; everything else surfaces as
//! [`OrgChartError::SourceUnavailable`].

use std::time::Duration;

use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};
use url::Url;
use uuid::Uuid;

use orgchart_shared::{
    DirectorySource, GraphConfig, GraphCredentials, OrgChartError, Result, UserPage, UserRecord,
};

use crate::wire::GraphUsersResponse;

/// User-Agent string for Graph requests.
const USER_AGENT: &str = concat!("org-hierarchy/", env!("CARGO_PKG_VERSION"));

/// Application-permission scope for Graph.
const GRAPH_SCOPE: &str = "https://graph.microsoft.com/.default";

/// Fields requested for each user.
const USER_SELECT: &str =
    "id,displayName,userPrincipalName,mail,jobTitle,department,accountEnabled,userType";

/// Manager expansion; only the id is needed.
const MANAGER_EXPAND: &str = "manager($select=id)";

/// Maximum bytes of an error body echoed into messages.
const ERROR_BODY_PREVIEW: usize = 500;

#[derive(Debug, Deserialize)]
struct TokenResponse {
    #[serde(default)]
    access_token: Option<String>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    error_description: Option<String>,
}

/// Directory source backed by Microsoft Graph.
pub struct GraphDirectory {
    config: GraphConfig,
    credentials: GraphCredentials,
    client: Client,
    token: Mutex<Option<String>>,
}

impl GraphDirectory {
    /// Create a new Graph client. No network traffic happens until the first page.
    pub fn new(config: GraphConfig, credentials: GraphCredentials) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| {
                OrgChartError::source_unavailable(format!("failed to build HTTP client: {e}"))
            })?;

        Ok(Self {
            config,
            credentials,
            client,
            token: Mutex::new(None),
        })
    }

    /// URL of the first `/users` page.
    fn first_page_url(&self) -> Result<Url> {
        let base = self.config.base_url.trim_end_matches('/');
        let mut url = Url::parse(&format!("{base}/users")).map_err(|e| {
            OrgChartError::config(format!("invalid graph base_url '{base}': {e}"))
        })?;
        url.query_pairs_mut()
            .append_pair("$select", USER_SELECT)
            .append_pair("$expand", MANAGER_EXPAND)
            .append_pair("$top", &self.config.page_size.to_string());
        Ok(url)
    }

    /// Cached bearer token, requesting one if none is held.
    async fn access_token(&self) -> Result<String> {
        let mut cached = self.token.lock().await;
        if let Some(token) = cached.as_ref() {
            return Ok(token.clone());
        }
        let token = self.request_token().await?;
        *cached = Some(token.clone());
        Ok(token)
    }

    /// Drop the cached token so the next request acquires a fresh one.
    async fn invalidate_token(&self) {
        self.token.lock().await.take();
    }

    #[instrument(skip_all, fields(tenant = %self.credentials.tenant_id))]
    async fn request_token(&self) -> Result<String> {
        let authority = self.config.authority_url.trim_end_matches('/');
        let token_url = format!(
            "{authority}/{}/oauth2/v2.0/token",
            self.credentials.tenant_id
        );

        let form = [
            ("client_id", self.credentials.client_id.as_str()),
            ("client_secret", self.credentials.client_secret.as_str()),
            ("scope", GRAPH_SCOPE),
            ("grant_type", "client_credentials"),
        ];

        let response = self
            .client
            .post(&token_url)
            .form(&form)
            .send()
            .await
            .map_err(|e| OrgChartError::source_unavailable(format!("token request failed: {e}")))?;

        let status = response.status();
        let body: TokenResponse = response.json().await.map_err(|e| {
            OrgChartError::source_unavailable(format!(
                "token endpoint returned HTTP {status} with an unreadable body: {e}"
            ))
        })?;

        match body.access_token {
            Some(token) if status.is_success() && !token.is_empty() => {
                info!("acquired Graph access token");
                Ok(token)
            }
            _ => {
                let detail = body
                    .error_description
                    .or(body.error)
                    .unwrap_or_else(|| "unknown error".to_string());
                Err(OrgChartError::source_unavailable(format!(
                    "could not acquire access token (HTTP {status}): {detail}"
                )))
            }
        }
    }

    /// GET a users page, retrying throttled and transient failures.
    ///
    /// A 401 on a page is retried once with a fresh token; long runs can
    /// outlive the token acquired for the first page.
    async fn get_page(&self, url: &str) -> Result<GraphUsersResponse> {
        let mut bearer = self.access_token().await?;
        let mut attempt: u32 = 0;
        let mut refreshed = false;

        loop {
            let sent = self
                .client
                .get(url)
                .bearer_auth(&bearer)
                .header("ConsistencyLevel", "eventual")
                .header("client-request-id", Uuid::now_v7().to_string())
                .send()
                .await;

            let response = match sent {
                Ok(response) => response,
                Err(e) if (e.is_timeout() || e.is_connect()) && attempt < self.config.max_retries => {
                    attempt += 1;
                    let delay = Duration::from_millis(self.config.retry_delay_ms);
                    warn!(attempt, error = %e, ?delay, "transient network error, retrying");
                    tokio::time::sleep(delay).await;
                    continue;
                }
                Err(e) => {
                    return Err(OrgChartError::source_unavailable(format!("GET {url}: {e}")));
                }
            };

            let status = response.status();
            if status.is_success() {
                return response.json().await.map_err(|e| {
                    OrgChartError::source_unavailable(format!("GET {url}: invalid JSON body: {e}"))
                });
            }

            if status == StatusCode::UNAUTHORIZED && !refreshed {
                refreshed = true;
                warn!("access token rejected, requesting a new one");
                self.invalidate_token().await;
                bearer = self.access_token().await?;
                continue;
            }

            if is_retriable(status) && attempt < self.config.max_retries {
                attempt += 1;
                let delay = retry_after(&response)
                    .unwrap_or_else(|| Duration::from_millis(self.config.retry_delay_ms));
                warn!(attempt, %status, ?delay, "directory throttled or unavailable, retrying");
                tokio::time::sleep(delay).await;
                continue;
            }

            let body = response.text().await.unwrap_or_default();
            let preview: String = body.chars().take(ERROR_BODY_PREVIEW).collect();
            return Err(OrgChartError::source_unavailable(format!(
                "GET {url}: HTTP {status}: {preview}"
            )));
        }
    }
}

impl DirectorySource for GraphDirectory {
    #[instrument(skip_all, fields(continuation = page_token.is_some()))]
    async fn fetch_users_page(&self, page_token: Option<&str>) -> Result<UserPage> {
        let url = match page_token {
            Some(next_link) => next_link.to_string(),
            None => self.first_page_url()?.to_string(),
        };

        let page = self.get_page(&url).await?;
        debug!(
            records = page.value.len(),
            has_next = page.next_link.is_some(),
            "fetched users page"
        );

        Ok(UserPage {
            records: page.value.into_iter().map(UserRecord::from).collect(),
            next_page_token: page.next_link,
        })
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn is_retriable(status: StatusCode) -> bool {
    matches!(
        status,
        StatusCode::TOO_MANY_REQUESTS
            | StatusCode::SERVICE_UNAVAILABLE
            | StatusCode::GATEWAY_TIMEOUT
    )
}

/// `Retry-After` in seconds, if the server sent one.
fn retry_after(response: &Response) -> Option<Duration> {
    response
        .headers()
        .get(reqwest::header::RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()
        .map(Duration::from_secs)
}

//! Thin typed wrapper over the Notion HTTP API.
//!
//! All list endpoints are exhausted (continuation cursors followed).
//! Transient failures (HTTP 429, 5xx, timeouts) are retried with
//! exponential backoff capped at five attempts; 401/403/404 are fatal for
//! the item. A global token bucket keeps sustained throughput at 3 req/s
//! with bursts up to 8, and a semaphore bounds concurrent in-flight
//! requests. Writes to any single page must be serialized by the caller;
//! the client only bounds global parallelism.

use std::sync::Arc;
use std::time::Duration;

use reqwest::StatusCode;
use serde_json::json;
use tokio::sync::{Mutex, Semaphore};
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::notion::types::{Block, BlockList, Page};
use crate::resolver::{compact_id, dashed_id};

const API_BASE: &str = "https://api.notion.com/v1";
const API_VERSION: &str = "2022-06-28";
const REQUEST_TIMEOUT_SECS: u64 = 30;
const MAX_ATTEMPTS: u32 = 5;
/// Maximum blocks per append request (API limit is 100).
const APPEND_BATCH: usize = 100;

/// Default worker-pool width for independent remote operations.
pub const DEFAULT_PARALLELISM: usize = 8;

/// Sustained request rate (tokens per second).
const RATE_PER_SEC: f64 = 3.0;
/// Bucket capacity (burst size).
const RATE_BURST: f64 = 8.0;

/// Global token bucket enforcing the upstream rate limit.
struct RateBucket {
    tokens: f64,
    last_refill: Instant,
}

impl RateBucket {
    fn new() -> Self {
        Self {
            tokens: RATE_BURST,
            last_refill: Instant::now(),
        }
    }

    fn refill(&mut self) {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_refill).as_secs_f64();
        self.tokens = (self.tokens + elapsed * RATE_PER_SEC).min(RATE_BURST);
        self.last_refill = now;
    }

    /// Time to wait before a token is available; consumes one when ready.
    fn take(&mut self) -> Duration {
        self.refill();
        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            Duration::ZERO
        } else {
            Duration::from_secs_f64((1.0 - self.tokens) / RATE_PER_SEC)
        }
    }
}

/// Typed Notion API client shared across workers.
#[derive(Clone)]
pub struct NotionClient {
    http: reqwest::Client,
    token: String,
    bucket: Arc<Mutex<RateBucket>>,
    permits: Arc<Semaphore>,
}

impl NotionClient {
    /// Build a client with the given auth token and worker-pool width.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying HTTP client cannot be built.
    pub fn new(token: String, parallelism: usize) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| Error::RemoteFailed(e.to_string()))?;
        Ok(Self {
            http,
            token,
            bucket: Arc::new(Mutex::new(RateBucket::new())),
            permits: Arc::new(Semaphore::new(parallelism.max(1))),
        })
    }

    /// Acquire a pool slot and a rate token, then run one HTTP attempt.
    async fn send(
        &self,
        method: reqwest::Method,
        path: &str,
        body: Option<&serde_json::Value>,
    ) -> std::result::Result<reqwest::Response, reqwest::Error> {
        let _permit = self.permits.acquire().await.expect("semaphore closed");
        loop {
            let wait = self.bucket.lock().await.take();
            if wait.is_zero() {
                break;
            }
            tokio::time::sleep(wait).await;
        }

        let mut req = self
            .http
            .request(method, format!("{API_BASE}{path}"))
            .bearer_auth(&self.token)
            .header("Notion-Version", API_VERSION);
        if let Some(body) = body {
            req = req.json(body);
        }
        req.send().await
    }

    /// Run a request with retry on transient failures, decoding the
    /// JSON response.
    async fn request<T: serde::de::DeserializeOwned>(
        &self,
        method: reqwest::Method,
        path: &str,
        body: Option<serde_json::Value>,
    ) -> Result<T> {
        let mut delay = Duration::from_millis(500);
        let mut last_err = String::new();

        for attempt in 1..=MAX_ATTEMPTS {
            match self.send(method.clone(), path, body.as_ref()).await {
                Ok(resp) => {
                    let status = resp.status();
                    if status.is_success() {
                        return resp
                            .json::<T>()
                            .await
                            .map_err(|e| Error::RemoteFailed(e.to_string()));
                    }
                    let text = resp.text().await.unwrap_or_default();
                    if matches!(
                        status,
                        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN | StatusCode::NOT_FOUND
                    ) {
                        return Err(Error::RemoteFatal {
                            status: status.as_u16(),
                            message: text,
                        });
                    }
                    if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
                        last_err = format!("{status}: {text}");
                        debug!(path, attempt, %status, "transient remote error, backing off");
                    } else {
                        // Unexpected client error (400 conflict etc.): no retry
                        return Err(Error::RemoteFailed(format!("{status}: {text}")));
                    }
                }
                Err(e) => {
                    if e.status().is_some_and(|s| {
                        matches!(s.as_u16(), 401 | 403 | 404)
                    }) {
                        return Err(Error::from_reqwest(&e));
                    }
                    last_err = e.to_string();
                    debug!(path, attempt, error = %last_err, "request error, backing off");
                }
            }

            if attempt < MAX_ATTEMPTS {
                tokio::time::sleep(delay).await;
                delay = delay.saturating_mul(2);
            }
        }

        warn!(path, "giving up after {MAX_ATTEMPTS} attempts");
        Err(Error::RemoteFailed(last_err))
    }

    // ── Pages ─────────────────────────────────────────────────

    /// Retrieve a page object.
    pub async fn retrieve_page(&self, page_id: &str) -> Result<Page> {
        let id = dashed_id(page_id);
        self.request(reqwest::Method::GET, &format!("/pages/{id}"), None)
            .await
    }

    /// The page's `last_edited_time` (RFC-3339).
    pub async fn get_last_edited_time(&self, page_id: &str) -> Result<String> {
        Ok(self.retrieve_page(page_id).await?.last_edited_time)
    }

    /// Create a child page under a parent, optionally with an emoji icon.
    pub async fn create_child_page(
        &self,
        parent_id: &str,
        title: &str,
        icon: Option<&str>,
    ) -> Result<Page> {
        let mut body = json!({
            "parent": {"type": "page_id", "page_id": dashed_id(parent_id)},
            "properties": {
                "title": {
                    "title": [{"type": "text", "text": {"content": title}}]
                }
            }
        });
        if let Some(emoji) = icon {
            body["icon"] = json!({"type": "emoji", "emoji": emoji});
        }
        self.request(reqwest::Method::POST, "/pages", Some(body))
            .await
    }

    /// Rename a page.
    pub async fn update_page_title(&self, page_id: &str, title: &str) -> Result<Page> {
        let id = dashed_id(page_id);
        let body = json!({
            "properties": {
                "title": {
                    "title": [{"type": "text", "text": {"content": title}}]
                }
            }
        });
        self.request(reqwest::Method::PATCH, &format!("/pages/{id}"), Some(body))
            .await
    }

    /// Archive (soft-delete) a page.
    pub async fn archive_page(&self, page_id: &str) -> Result<Page> {
        let id = dashed_id(page_id);
        let body = json!({"archived": true});
        self.request(reqwest::Method::PATCH, &format!("/pages/{id}"), Some(body))
            .await
    }

    // ── Blocks ────────────────────────────────────────────────

    /// List all child blocks of a page or block, following cursors.
    pub async fn get_child_blocks(&self, block_id: &str) -> Result<Vec<Block>> {
        let id = dashed_id(block_id);
        let mut blocks = Vec::new();
        let mut cursor: Option<String> = None;

        loop {
            let path = match &cursor {
                Some(c) => format!("/blocks/{id}/children?page_size=100&start_cursor={c}"),
                None => format!("/blocks/{id}/children?page_size=100"),
            };
            let page: BlockList = self.request(reqwest::Method::GET, &path, None).await?;
            blocks.extend(page.results);
            if !page.has_more {
                break;
            }
            cursor = page.next_cursor;
            if cursor.is_none() {
                break;
            }
        }
        Ok(blocks)
    }

    /// Append blocks to a page, splitting into batches of at most 100.
    ///
    /// Batches are sent in order; callers must not append to the same
    /// page concurrently.
    pub async fn append_blocks(&self, block_id: &str, blocks: &[Block]) -> Result<()> {
        let id = dashed_id(block_id);
        for batch in blocks.chunks(APPEND_BATCH) {
            let body = json!({ "children": batch });
            let _: serde_json::Value = self
                .request(
                    reqwest::Method::PATCH,
                    &format!("/blocks/{id}/children"),
                    Some(body),
                )
                .await?;
        }
        Ok(())
    }

    /// Delete a single block.
    pub async fn delete_block(&self, block_id: &str) -> Result<()> {
        let id = dashed_id(block_id);
        let _: serde_json::Value = self
            .request(reqwest::Method::DELETE, &format!("/blocks/{id}"), None)
            .await?;
        Ok(())
    }

    /// Delete every existing child of a page, serially.
    pub async fn clear_children(&self, page_id: &str) -> Result<usize> {
        let children = self.get_child_blocks(page_id).await?;
        let mut deleted = 0;
        for block in &children {
            if let Some(id) = &block.id {
                self.delete_block(id).await?;
                deleted += 1;
            }
        }
        Ok(deleted)
    }

    /// Find a direct child page by exact title.
    ///
    /// Returns the child's dashed page id, or `None` when no child page
    /// matches.
    pub async fn find_child_page_by_title(
        &self,
        parent_id: &str,
        title: &str,
    ) -> Result<Option<String>> {
        use crate::notion::types::BlockPayload;

        let children = self.get_child_blocks(parent_id).await?;
        for block in children {
            if let BlockPayload::ChildPage { child_page } = &block.payload {
                if child_page.title == title {
                    return Ok(block.id.map(|id| dashed_id(&id)));
                }
            }
        }
        Ok(None)
    }

    /// Canonical URL for a page id.
    #[must_use]
    pub fn page_url(page_id: &str) -> String {
        format!("https://www.notion.so/{}", compact_id(page_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_bucket_burst_then_throttle() {
        let mut bucket = RateBucket::new();
        // The full burst drains without waiting
        for _ in 0..RATE_BURST as usize {
            assert_eq!(bucket.take(), Duration::ZERO);
        }
        // The next token requires a wait of roughly 1/rate seconds
        let wait = bucket.take();
        assert!(wait > Duration::ZERO);
        assert!(wait <= Duration::from_secs_f64(1.0 / RATE_PER_SEC + 0.05));
    }

    #[test]
    fn test_page_url_is_compact() {
        assert_eq!(
            NotionClient::page_url("27db1a4f-8d1c-4ce5-9f2a-11aa6bb41234"),
            "https://www.notion.so/27db1a4f8d1c4ce59f2a11aa6bb41234"
        );
    }
}

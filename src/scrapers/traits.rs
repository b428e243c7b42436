use crate::cookies::StoredCookie;
use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;

/// A rendering session (one browser) that hands out pages.
///
/// Extraction and discovery only talk to this seam, so they can run against
/// synthetic documents without a real browser.
#[async_trait]
pub trait RenderSession: Send + Sync {
    /// Open a fresh, blank page
    async fn open_page(&self) -> Result<Box<dyn RenderedPage>>;

    /// Install cookies on the session. Returns how many were applied.
    async fn apply_cookies(&self, _cookies: &[StoredCookie]) -> Result<usize> {
        Ok(0)
    }

    /// Check whether the restored session is logged in.
    async fn verify_login(&self) -> Result<bool> {
        Ok(false)
    }

    /// Current session cookies, in the persisted cookie file format.
    async fn export_cookies(&self) -> Result<Vec<Value>> {
        Ok(Vec::new())
    }

    /// Shut the session down. Pending waits on its pages fail afterwards.
    async fn close(&self) -> Result<()>;
}

/// One page of a rendering session
#[async_trait]
pub trait RenderedPage: Send + Sync {
    async fn navigate(&self, url: &str) -> Result<()>;

    async fn reload(&self) -> Result<()>;

    /// Wait until `selector` matches, or fail after `timeout`.
    async fn wait_for(&self, selector: &str, timeout: Duration) -> Result<()>;

    /// Click the first element matching `selector`.
    async fn click(&self, selector: &str) -> Result<()>;

    /// Scroll down by one viewport height.
    async fn scroll_step(&self) -> Result<()>;

    /// Snapshot of the rendered document as HTML
    async fn content(&self) -> Result<String>;

    async fn close(&self) -> Result<()>;
}

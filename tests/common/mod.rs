// Shared fakes for the integration tests: an in-memory rendering session
// serving synthetic documents, a recording sink and a one-shot HTTP responder.
#![allow(dead_code)]

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use divar_scout::cookies::StoredCookie;
use divar_scout::error::SendError;
use divar_scout::models::ExtractedAd;
use divar_scout::scrapers::{RenderSession, RenderedPage};
use divar_scout::sender::AdSink;
use scraper::{Html, Selector};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

pub const ORIGIN: &str = "https://divar.ir";
pub const LISTING_URL: &str = "https://divar.ir/s/test/real-estate";

/// A document as it looks before and after user interaction
#[derive(Debug, Clone, Default)]
pub struct FakeDocument {
    pub initial: String,
    pub after_click: Option<String>,
    pub after_reload: Option<String>,
}

impl FakeDocument {
    pub fn new(initial: impl Into<String>) -> Self {
        Self {
            initial: initial.into(),
            ..Default::default()
        }
    }

    pub fn on_click(mut self, html: impl Into<String>) -> Self {
        self.after_click = Some(html.into());
        self
    }

    pub fn on_reload(mut self, html: impl Into<String>) -> Self {
        self.after_reload = Some(html.into());
        self
    }
}

#[derive(Default)]
pub struct FakeSession {
    site: Arc<HashMap<String, FakeDocument>>,
    opened: Arc<AtomicUsize>,
    closed: Arc<AtomicUsize>,
    session_closed: AtomicBool,
    applied: Mutex<Vec<StoredCookie>>,
    login_checks: AtomicUsize,
    browser_cookies: Vec<Value>,
}

impl FakeSession {
    pub fn new(pages: Vec<(&str, FakeDocument)>) -> Self {
        Self {
            site: Arc::new(
                pages
                    .into_iter()
                    .map(|(url, doc)| (url.to_string(), doc))
                    .collect(),
            ),
            ..Default::default()
        }
    }

    /// Cookies the session reports when asked to export them
    pub fn with_browser_cookies(mut self, cookies: Vec<Value>) -> Self {
        self.browser_cookies = cookies;
        self
    }

    pub fn applied_cookies(&self) -> Vec<StoredCookie> {
        self.applied.lock().unwrap().clone()
    }

    pub fn login_checks(&self) -> usize {
        self.login_checks.load(Ordering::SeqCst)
    }

    pub fn pages_opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    pub fn pages_closed(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }

    pub fn is_closed(&self) -> bool {
        self.session_closed.load(Ordering::SeqCst)
    }

    /// A page for driving components directly
    pub fn page(&self) -> FakePage {
        self.opened.fetch_add(1, Ordering::SeqCst);
        FakePage {
            site: Arc::clone(&self.site),
            url: Mutex::new(None),
            clicked: AtomicBool::new(false),
            reloaded: AtomicBool::new(false),
            closed: Arc::clone(&self.closed),
        }
    }
}

#[async_trait]
impl RenderSession for FakeSession {
    async fn open_page(&self) -> Result<Box<dyn RenderedPage>> {
        if self.is_closed() {
            return Err(anyhow!("session closed"));
        }
        Ok(Box::new(self.page()))
    }

    async fn apply_cookies(&self, cookies: &[StoredCookie]) -> Result<usize> {
        self.applied.lock().unwrap().extend_from_slice(cookies);
        Ok(cookies.len())
    }

    async fn verify_login(&self) -> Result<bool> {
        self.login_checks.fetch_add(1, Ordering::SeqCst);
        Ok(true)
    }

    async fn export_cookies(&self) -> Result<Vec<Value>> {
        Ok(self.browser_cookies.clone())
    }

    async fn close(&self) -> Result<()> {
        self.session_closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

pub struct FakePage {
    site: Arc<HashMap<String, FakeDocument>>,
    url: Mutex<Option<String>>,
    clicked: AtomicBool,
    reloaded: AtomicBool,
    closed: Arc<AtomicUsize>,
}

impl FakePage {
    fn current_html(&self) -> String {
        let url = self.url.lock().unwrap().clone();
        let Some(doc) = url.and_then(|u| self.site.get(&u).cloned()) else {
            return "<html><body></body></html>".to_string();
        };

        if self.clicked.load(Ordering::SeqCst) {
            if let Some(html) = doc.after_click {
                return html;
            }
        }
        if self.reloaded.load(Ordering::SeqCst) {
            if let Some(html) = doc.after_reload {
                return html;
            }
        }
        doc.initial
    }

    fn has(&self, selector: &str) -> bool {
        let selector = Selector::parse(selector).unwrap();
        let doc = Html::parse_document(&self.current_html());
        let found = doc.select(&selector).next().is_some();
        found
    }
}

#[async_trait]
impl RenderedPage for FakePage {
    async fn navigate(&self, url: &str) -> Result<()> {
        if !self.site.contains_key(url) {
            return Err(anyhow!("net::ERR_NAME_NOT_RESOLVED for {url}"));
        }
        *self.url.lock().unwrap() = Some(url.to_string());
        self.clicked.store(false, Ordering::SeqCst);
        self.reloaded.store(false, Ordering::SeqCst);
        Ok(())
    }

    async fn reload(&self) -> Result<()> {
        self.reloaded.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn wait_for(&self, selector: &str, timeout: Duration) -> Result<()> {
        if self.has(selector) {
            return Ok(());
        }
        tokio::time::sleep(timeout).await;
        if self.has(selector) {
            Ok(())
        } else {
            Err(anyhow!("timed out waiting for {selector}"))
        }
    }

    async fn click(&self, selector: &str) -> Result<()> {
        if !self.has(selector) {
            return Err(anyhow!("no element matches {selector}"));
        }
        self.clicked.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn scroll_step(&self) -> Result<()> {
        Ok(())
    }

    async fn content(&self) -> Result<String> {
        Ok(self.current_html())
    }

    async fn close(&self) -> Result<()> {
        self.closed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Collects submitted ads; ids in `reject` fail with a 500.
#[derive(Default)]
pub struct RecordingSink {
    pub sent: Mutex<Vec<ExtractedAd>>,
    pub reject: Vec<String>,
}

#[async_trait]
impl AdSink for RecordingSink {
    async fn submit(&self, ad: &ExtractedAd) -> Result<(), SendError> {
        if self.reject.contains(&ad.ad_id) {
            return Err(SendError::Status(reqwest::StatusCode::INTERNAL_SERVER_ERROR));
        }
        self.sent.lock().unwrap().push(ad.clone());
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// HTML fixtures
// ---------------------------------------------------------------------------

pub fn listing_page(cards: &[(&str, &str)]) -> String {
    let cards: String = cards
        .iter()
        .map(|(href, text)| {
            format!(
                r#"<article class="kt-post-card"><a class="kt-post-card__action" href="{href}"><h2>{text}</h2></a></article>"#
            )
        })
        .collect();
    format!("<html><body><main>{cards}</main></body></html>")
}

fn ad_shell(extra: &str) -> String {
    format!(
        r#"<html><body>
<h1>آپارتمان ۱۰۰ متری</h1>
<div class="kt-page-title__subtitle">لحظاتی پیش در نورآباد</div>
<button class="post-actions__get-contact">اطلاعات تماس</button>
<table class="kt-group-row">
  <thead><tr><th>متراژ</th><th>ساخت</th><th>اتاق</th></tr></thead>
  <tbody><tr><td>۱۰۰</td><td>۱۳۹۸</td><td>۲</td></tr></tbody>
</table>
<div class="kt-unexpandable-row">
  <p class="kt-unexpandable-row__title">قیمت کل</p>
  <p class="kt-unexpandable-row__value">۵۰۰٬۰۰۰٬۰۰۰ تومان</p>
</div>
{extra}
</body></html>"#
    )
}

/// Ad page whose contact button reveals `phone`
pub fn revealing_ad(phone: &str) -> FakeDocument {
    FakeDocument::new(ad_shell("")).on_click(ad_shell(&format!(
        r#"<a href="tel:{phone}">{phone}</a>"#
    )))
}

/// Ad page whose contact button shows the hidden-number notice
pub fn hidden_ad() -> FakeDocument {
    FakeDocument::new(ad_shell("")).on_click(ad_shell(
        r#"<div class="kt-unexpandable-row"><p class="kt-unexpandable-row__title">شماره مخفی شده است</p></div>"#,
    ))
}

/// Ad page whose contact button does nothing visible
pub fn silent_ad() -> FakeDocument {
    FakeDocument::new(ad_shell(""))
}

// ---------------------------------------------------------------------------
// One-shot HTTP responder
// ---------------------------------------------------------------------------

/// Serve exactly one request with the given status and body. The handle
/// yields the raw request that was received.
pub async fn serve_once(status: u16, body: &str) -> (String, JoinHandle<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let response = format!(
        "HTTP/1.1 {status} {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
        if status < 400 { "OK" } else { "Error" },
        body.len()
    );

    let handle = tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();
        let request = read_request(&mut stream).await;
        stream.write_all(response.as_bytes()).await.unwrap();
        let _ = stream.shutdown().await;
        request
    });

    (format!("http://{addr}/"), handle)
}

async fn read_request(stream: &mut tokio::net::TcpStream) -> String {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];

    loop {
        let n = stream.read(&mut chunk).await.unwrap();
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);

        let text = String::from_utf8_lossy(&buf);
        if let Some(header_end) = text.find("\r\n\r\n") {
            let content_length = text[..header_end]
                .lines()
                .find_map(|line| {
                    let (name, value) = line.split_once(':')?;
                    name.eq_ignore_ascii_case("content-length")
                        .then(|| value.trim().parse::<usize>().ok())
                        .flatten()
                })
                .unwrap_or(0);
            if buf.len() >= header_end + 4 + content_length {
                break;
            }
        }
    }

    String::from_utf8_lossy(&buf).into_owned()
}

/// An address nothing listens on
pub fn unreachable_url() -> String {
    "http://127.0.0.1:9/known".to_string()
}

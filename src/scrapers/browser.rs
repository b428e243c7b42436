use crate::config::BrowserConfig;
use crate::cookies::StoredCookie;
use crate::scrapers::traits::{RenderSession, RenderedPage};
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use headless_chrome::protocol::cdp::Network::CookieParam;
use headless_chrome::{Browser, LaunchOptions, Tab};
use serde_json::Value;
use std::ffi::OsStr;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{debug, info, warn};

/// The browser's idle watchdog would otherwise kill it during the long
/// pauses between candidates.
const IDLE_TIMEOUT: Duration = Duration::from_secs(60 * 60 * 24 * 365);

/// Opens the account menu and reports which icon it shows.
const LOGIN_CHECK_SCRIPT: &str = r#"
(async () => {
    const button = [...document.querySelectorAll('button.kt-nav-button')]
        .find(b => b.querySelector('.kt-icon-person'));
    if (!button) return 'unknown';
    button.click();
    await new Promise(r => setTimeout(r, 800));
    const menu = document.querySelector('.kt-dropdown-menu__menu--open');
    let status = 'unknown';
    if (menu) {
        if (menu.querySelector('.kt-icon-log-in-o')) status = 'logged_out';
        else if (menu.querySelector('.kt-icon-log-out-o')) status = 'logged_in';
        else if (menu.querySelector('a[href="/my-divar/my-posts"]')) status = 'logged_in';
        else status = 'logged_out';
    }
    document.body.click();
    return status;
})()
"#;

/// Rendering session backed by a headless Chrome process
pub struct ChromeSession {
    browser: Mutex<Option<Browser>>,
    /// Tab used for cookie handling and the login check
    main_tab: Arc<Tab>,
    site_origin: String,
    page_load_timeout: Duration,
}

impl ChromeSession {
    /// Launch Chrome and open the main tab
    pub async fn launch(config: &BrowserConfig, site_origin: &str) -> Result<Self> {
        info!("Launching headless Chrome...");

        let headless = config.headless;
        let chrome_path = config.chrome_path.clone();
        let page_load_timeout = config.page_load_timeout;

        let (browser, main_tab) = blocking(move || {
            let options = LaunchOptions::default_builder()
                .headless(headless)
                .sandbox(false)
                .window_size(Some((1920, 1080)))
                .path(chrome_path)
                .idle_browser_timeout(IDLE_TIMEOUT)
                .args(vec![
                    OsStr::new("--disable-dev-shm-usage"),
                    OsStr::new("--disable-blink-features=AutomationControlled"),
                ])
                .build()
                .context("Failed to build launch options")?;

            let browser = Browser::new(options).context("Failed to launch Chrome browser")?;
            let main_tab = browser.new_tab().context("Failed to open main tab")?;
            main_tab.set_default_timeout(page_load_timeout);
            Ok((browser, main_tab))
        })
        .await?;

        Ok(Self {
            browser: Mutex::new(Some(browser)),
            main_tab,
            site_origin: site_origin.to_string(),
            page_load_timeout,
        })
    }

    /// Handle to the running browser; the lock is released before any CDP call.
    fn browser(&self) -> Result<Browser> {
        let guard = self
            .browser
            .lock()
            .map_err(|_| anyhow!("browser lock poisoned"))?;
        guard.clone().context("Browser already closed")
    }

    async fn new_tab(&self) -> Result<Arc<Tab>> {
        let browser = self.browser()?;
        let timeout = self.page_load_timeout;
        blocking(move || {
            let tab = browser.new_tab().context("Failed to open tab")?;
            tab.set_default_timeout(timeout);
            Ok(tab)
        })
        .await
    }
}

#[async_trait]
impl RenderSession for ChromeSession {
    async fn open_page(&self) -> Result<Box<dyn RenderedPage>> {
        let tab = self.new_tab().await?;
        Ok(Box::new(ChromePage { tab }))
    }

    async fn apply_cookies(&self, cookies: &[StoredCookie]) -> Result<usize> {
        if cookies.is_empty() {
            info!("ℹ️  No cookies to apply");
            return Ok(0);
        }

        let mut params = Vec::with_capacity(cookies.len());
        for cookie in cookies {
            match serde_json::from_value::<CookieParam>(cookie.to_cookie_param(&self.site_origin)) {
                Ok(param) => params.push(param),
                Err(e) => warn!(name = %cookie.name, error = %e, "Skipping unusable cookie"),
            }
        }

        let count = params.len();
        let tab = Arc::clone(&self.main_tab);
        blocking(move || tab.set_cookies(params)).await?;
        info!("✅ Applied {} cookies", count);
        Ok(count)
    }

    async fn verify_login(&self) -> Result<bool> {
        let tab = Arc::clone(&self.main_tab);
        let origin = self.site_origin.clone();

        let status = blocking(move || {
            tab.navigate_to(&origin)?.wait_until_navigated()?;
            let result = tab.evaluate(LOGIN_CHECK_SCRIPT, true)?;
            Ok(result.value)
        })
        .await?;

        let logged_in = matches!(status, Some(Value::String(ref s)) if s == "logged_in");
        if logged_in {
            info!("✅ Session is logged in");
        } else {
            warn!(status = ?status, "⚠️  Session is not logged in");
        }
        Ok(logged_in)
    }

    async fn export_cookies(&self) -> Result<Vec<Value>> {
        let tab = Arc::clone(&self.main_tab);
        let cookies = blocking(move || tab.get_cookies()).await?;
        cookies
            .iter()
            .map(|c| serde_json::to_value(c).context("Failed to serialize cookie"))
            .collect()
    }

    async fn close(&self) -> Result<()> {
        let browser = self
            .browser
            .lock()
            .map_err(|_| anyhow!("browser lock poisoned"))?
            .take();

        if let Some(browser) = browser {
            info!("Closing browser...");
            // Dropping the handle terminates the Chrome process
            tokio::task::spawn_blocking(move || drop(browser)).await?;
        }
        Ok(())
    }
}

/// One Chrome tab
pub struct ChromePage {
    tab: Arc<Tab>,
}

#[async_trait]
impl RenderedPage for ChromePage {
    async fn navigate(&self, url: &str) -> Result<()> {
        let tab = Arc::clone(&self.tab);
        let url = url.to_string();
        debug!(%url, "Navigating");
        blocking(move || {
            tab.navigate_to(&url)?.wait_until_navigated()?;
            Ok(())
        })
        .await
    }

    async fn reload(&self) -> Result<()> {
        let tab = Arc::clone(&self.tab);
        blocking(move || {
            tab.reload(false, None)?.wait_until_navigated()?;
            Ok(())
        })
        .await
    }

    async fn wait_for(&self, selector: &str, timeout: Duration) -> Result<()> {
        let tab = Arc::clone(&self.tab);
        let selector = selector.to_string();
        blocking(move || {
            tab.wait_for_element_with_custom_timeout(&selector, timeout)
                .with_context(|| format!("Timed out waiting for {selector}"))?;
            Ok(())
        })
        .await
    }

    async fn click(&self, selector: &str) -> Result<()> {
        let tab = Arc::clone(&self.tab);
        let selector = selector.to_string();
        blocking(move || {
            tab.find_element(&selector)?.click()?;
            Ok(())
        })
        .await
    }

    async fn scroll_step(&self) -> Result<()> {
        let tab = Arc::clone(&self.tab);
        blocking(move || {
            tab.evaluate("window.scrollBy(0, window.innerHeight)", false)?;
            Ok(())
        })
        .await
    }

    async fn content(&self) -> Result<String> {
        let tab = Arc::clone(&self.tab);
        blocking(move || tab.get_content()).await
    }

    async fn close(&self) -> Result<()> {
        let tab = Arc::clone(&self.tab);
        blocking(move || {
            tab.close(true)?;
            Ok(())
        })
        .await
    }
}

/// headless_chrome is synchronous; keep its calls off the async workers.
async fn blocking<T, F>(f: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .context("Browser task panicked")?
}

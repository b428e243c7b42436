use crate::scrapers::contact::RevealTiming;
use crate::scrapers::discovery::DiscoveryConfig;
use crate::scrapers::extractor::ExtractorConfig;
use anyhow::{bail, Context, Result};
use dotenvy::dotenv;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Headless browser settings
#[derive(Debug, Clone)]
pub struct BrowserConfig {
    pub chrome_path: Option<PathBuf>,
    pub headless: bool,
    /// Timeout for navigations and page loads
    pub page_load_timeout: Duration,
}

/// Remote endpoints
#[derive(Debug, Clone)]
pub struct RemoteConfig {
    /// `None` disables the known-ids lookup
    pub known_ids_url: Option<String>,
    pub known_ids_timeout: Duration,
    pub collector_url: String,
    pub collector_token: Option<String>,
}

/// Cycle cadence and throttling
#[derive(Debug, Clone)]
pub struct MonitorSettings {
    pub check_interval: Duration,
    /// Inclusive minute range slept between two candidates
    pub delay_minutes: (u64, u64),
}

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub discovery: DiscoveryConfig,
    pub extractor: ExtractorConfig,
    pub browser: BrowserConfig,
    pub remote: RemoteConfig,
    pub monitor: MonitorSettings,
    pub blacklist_path: PathBuf,
    pub cookies_path: PathBuf,
    pub save_cookies_on_exit: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            discovery: DiscoveryConfig::default(),
            extractor: ExtractorConfig::default(),
            browser: BrowserConfig {
                chrome_path: default_chrome_path(),
                headless: true,
                page_load_timeout: Duration::from_secs(30),
            },
            remote: RemoteConfig {
                known_ids_url: Some("https://malko.ir/external-refs".to_string()),
                known_ids_timeout: Duration::from_secs(15),
                collector_url: "https://malko.ir/new-place".to_string(),
                collector_token: None,
            },
            monitor: MonitorSettings {
                check_interval: Duration::from_secs(60),
                delay_minutes: (5, 15),
            },
            blacklist_path: PathBuf::from("data/blacklisted-ads.json"),
            cookies_path: PathBuf::from("cookies.json"),
            save_cookies_on_exit: true,
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if present (development)
        let _ = dotenv();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from an arbitrary key lookup; unset keys keep their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let d = Self::default();
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let element_wait = secs(&lookup, "SCOUT_ELEMENT_WAIT_TIMEOUT_SECS", 10)?;

        let discovery = DiscoveryConfig {
            listing_url: get("SCOUT_LISTING_URL").unwrap_or(d.discovery.listing_url),
            site_origin: get("SCOUT_SITE_ORIGIN").unwrap_or(d.discovery.site_origin),
            card_wait: element_wait,
            reload_delay: Duration::from_millis(parse(&lookup, "SCOUT_RELOAD_DELAY_MS", 3000)?),
            scroll_steps: parse(&lookup, "SCOUT_SCROLL_STEPS", d.discovery.scroll_steps)?,
            scroll_delay_ms: range(
                &lookup,
                "SCOUT_SCROLL_DELAY_MIN_MS",
                "SCOUT_SCROLL_DELAY_MAX_MS",
                d.discovery.scroll_delay_ms,
            )?,
        };

        let extractor = ExtractorConfig {
            content_wait: element_wait,
            reveal: RevealTiming {
                control_wait: element_wait,
                resolution_timeout: Duration::from_millis(parse(&lookup, "SCOUT_REVEAL_TIMEOUT_MS", 5000)?),
                poll_interval: Duration::from_millis(parse(&lookup, "SCOUT_REVEAL_POLL_MS", 100)?),
            },
        };

        let browser = BrowserConfig {
            chrome_path: get("SCOUT_CHROME_PATH")
                .map(PathBuf::from)
                .or(d.browser.chrome_path),
            headless: parse(&lookup, "SCOUT_HEADLESS", true)?,
            page_load_timeout: secs(&lookup, "SCOUT_PAGE_LOAD_TIMEOUT_SECS", 30)?,
        };

        // An explicitly empty value turns the lookup off
        let known_ids_url = match lookup("SCOUT_KNOWN_IDS_URL") {
            Some(url) if url.trim().is_empty() => None,
            Some(url) => Some(url),
            None => d.remote.known_ids_url,
        };

        let remote = RemoteConfig {
            known_ids_url,
            known_ids_timeout: secs(&lookup, "SCOUT_KNOWN_IDS_TIMEOUT_SECS", 15)?,
            collector_url: get("SCOUT_COLLECTOR_URL").unwrap_or(d.remote.collector_url),
            collector_token: get("SCOUT_COLLECTOR_TOKEN"),
        };

        let monitor = MonitorSettings {
            check_interval: secs(&lookup, "SCOUT_CHECK_INTERVAL_SECS", 60)?,
            delay_minutes: range(
                &lookup,
                "SCOUT_MIN_DELAY_MINUTES",
                "SCOUT_MAX_DELAY_MINUTES",
                d.monitor.delay_minutes,
            )?,
        };

        if monitor.check_interval.is_zero() {
            bail!("SCOUT_CHECK_INTERVAL_SECS must be greater than zero");
        }

        Ok(Self {
            discovery,
            extractor,
            browser,
            remote,
            monitor,
            blacklist_path: get("SCOUT_BLACKLIST_PATH")
                .map(PathBuf::from)
                .unwrap_or(d.blacklist_path),
            cookies_path: get("SCOUT_COOKIES_PATH")
                .map(PathBuf::from)
                .unwrap_or(d.cookies_path),
            save_cookies_on_exit: parse(&lookup, "SCOUT_SAVE_COOKIES_ON_EXIT", true)?,
        })
    }
}

fn parse<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key).filter(|v| !v.trim().is_empty()) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{key} has an invalid value: {raw:?}")),
        None => Ok(default),
    }
}

fn secs(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: u64) -> Result<Duration> {
    Ok(Duration::from_secs(parse(lookup, key, default)?))
}

fn range(
    lookup: &impl Fn(&str) -> Option<String>,
    min_key: &str,
    max_key: &str,
    default: (u64, u64),
) -> Result<(u64, u64)> {
    let min = parse(lookup, min_key, default.0)?;
    let max = parse(lookup, max_key, default.1)?;
    if min > max {
        bail!("{min_key} ({min}) must not exceed {max_key} ({max})");
    }
    Ok((min, max))
}

/// Usual Chrome location for this OS, if it is installed there.
fn default_chrome_path() -> Option<PathBuf> {
    let candidate = if cfg!(target_os = "windows") {
        r"C:\Program Files\Google\Chrome\Application\chrome.exe"
    } else if cfg!(target_os = "macos") {
        "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome"
    } else {
        "/usr/bin/google-chrome"
    };

    let path = PathBuf::from(candidate);
    path.exists().then_some(path)
}

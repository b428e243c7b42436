use anyhow::{Context, Result};
use chrono::DateTime;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// One cookie as stored in the cookie file (browser export format)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StoredCookie {
    pub name: String,
    pub value: String,
    #[serde(default)]
    pub domain: Option<String>,
    #[serde(default)]
    pub path: Option<String>,
    /// Epoch seconds, or a date string in files written by hand
    #[serde(default)]
    pub expires: Option<Value>,
    #[serde(default)]
    pub http_only: Option<bool>,
    #[serde(default)]
    pub secure: Option<bool>,
    #[serde(default)]
    pub same_site: Option<String>,
}

impl StoredCookie {
    /// Expiry as epoch seconds. Session cookies (`-1`) and unparsable
    /// values yield `None`.
    pub fn expires_epoch(&self) -> Option<f64> {
        match self.expires.as_ref()? {
            Value::Number(n) => n.as_f64().filter(|secs| *secs > 0.0),
            Value::String(s) => DateTime::parse_from_rfc3339(s)
                .or_else(|_| DateTime::parse_from_rfc2822(s))
                .ok()
                .map(|dt| dt.timestamp() as f64),
            _ => None,
        }
    }

    /// Cookie in the DevTools `Network.CookieParam` JSON shape.
    pub fn to_cookie_param(&self, default_url: &str) -> Value {
        let mut param = Map::new();
        param.insert("name".into(), Value::String(self.name.clone()));
        param.insert("value".into(), Value::String(self.value.clone()));

        match &self.domain {
            Some(domain) => {
                param.insert("domain".into(), Value::String(domain.clone()));
            }
            None => {
                param.insert("url".into(), Value::String(default_url.to_string()));
            }
        }
        if let Some(path) = &self.path {
            param.insert("path".into(), Value::String(path.clone()));
        }
        if let Some(expires) = self.expires_epoch() {
            param.insert("expires".into(), Value::from(expires));
        }
        if let Some(http_only) = self.http_only {
            param.insert("httpOnly".into(), Value::Bool(http_only));
        }
        if let Some(secure) = self.secure {
            param.insert("secure".into(), Value::Bool(secure));
        }
        if let Some(same_site) = self.same_site.as_deref().and_then(same_site_value) {
            param.insert("sameSite".into(), Value::String(same_site.to_string()));
        }

        Value::Object(param)
    }
}

fn same_site_value(raw: &str) -> Option<&'static str> {
    match raw.to_ascii_lowercase().as_str() {
        "strict" => Some("Strict"),
        "lax" => Some("Lax"),
        "none" | "no_restriction" => Some("None"),
        _ => None,
    }
}

/// Cookie file on disk
#[derive(Debug, Clone)]
pub struct CookieJar {
    path: PathBuf,
}

impl CookieJar {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load saved cookies. Missing or malformed files yield an empty list.
    pub async fn load(&self) -> Vec<StoredCookie> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                warn!(path = %self.path.display(), "⚠️  Cookie file not found, continuing without a session");
                return Vec::new();
            }
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Could not read cookie file");
                return Vec::new();
            }
        };

        match serde_json::from_str::<Vec<StoredCookie>>(&content) {
            Ok(cookies) => cookies,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Cookie file is malformed, ignoring it");
                Vec::new()
            }
        }
    }

    /// Overwrite the file with the given cookie objects.
    pub async fn save(&self, cookies: &[Value]) -> Result<()> {
        let json = serde_json::to_string_pretty(cookies)?;
        tokio::fs::write(&self.path, json)
            .await
            .with_context(|| format!("Failed to write {}", self.path.display()))?;
        info!("✅ Saved {} cookies", cookies.len());
        Ok(())
    }
}

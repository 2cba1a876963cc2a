//! Application settings structures.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{AppError, Result};
use crate::pipeline::filter::TypeMismatch;
use crate::utils::expand_home;

/// Root settings of a watch run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Path of the persisted store document (`~` expands to the home directory)
    pub storage: PathBuf,

    /// Days an already known listing must go unseen before it is reported again
    #[serde(default = "defaults::refresh_window_days")]
    pub refresh_window_days: i64,

    /// Verdict for filter keys whose record and filter shapes match no rule
    #[serde(default)]
    pub on_type_mismatch: TypeMismatch,

    /// Where listings come from
    pub source: SourceConfig,

    /// HTTP client behavior for URL sources
    #[serde(default)]
    pub http: HttpConfig,

    /// Inline filter specification
    #[serde(default)]
    pub filter: Option<Value>,

    /// Separate JSON filter document, used when no inline filter is given
    #[serde(default)]
    pub filter_path: Option<PathBuf>,
}

impl Settings {
    /// Load settings from a TOML file, or JSON when the extension is `.json`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        Self::parse(&content, is_json(path))
    }

    /// Parse settings text.
    pub fn parse(content: &str, json: bool) -> Result<Self> {
        if json {
            Ok(serde_json::from_str(content)?)
        } else {
            Ok(toml::from_str(content)?)
        }
    }

    /// Storage path with `~` expanded.
    pub fn storage_path(&self) -> PathBuf {
        expand_home(&self.storage)
    }

    /// Refresh window as a duration.
    pub fn refresh_window(&self) -> Result<chrono::Duration> {
        chrono::Duration::try_days(self.refresh_window_days).ok_or_else(|| {
            AppError::validation(format!(
                "refresh_window_days {} is out of range",
                self.refresh_window_days
            ))
        })
    }

    /// Resolve the filter specification: inline first, then `filter_path`.
    ///
    /// Returns `None` when neither is configured.
    pub fn filter_spec(&self) -> Result<Option<Value>> {
        if let Some(filter) = &self.filter {
            return Ok(Some(filter.clone()));
        }
        match &self.filter_path {
            Some(path) => {
                let path = expand_home(path);
                let content = fs::read_to_string(&path).map_err(|e| {
                    AppError::config(format!("Filter file {} unreadable: {}", path.display(), e))
                })?;
                Ok(Some(serde_json::from_str(&content)?))
            }
            None => Ok(None),
        }
    }

    /// Validate settings values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        if self.storage.as_os_str().is_empty() {
            return Err(AppError::validation("storage path is empty"));
        }
        if self.refresh_window_days < 0 {
            return Err(AppError::validation("refresh_window_days must be >= 0"));
        }
        self.refresh_window()?;
        if self.filter.is_some() && self.filter_path.is_some() {
            return Err(AppError::validation(
                "filter and filter_path are mutually exclusive",
            ));
        }
        self.source.validate()?;
        self.http.validate()?;
        Ok(())
    }
}

fn is_json(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"))
}

/// Listing source selection. Exactly one of `path` and `url` must be set.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SourceConfig {
    /// JSON snapshot file with an array of listings
    #[serde(default)]
    pub path: Option<PathBuf>,

    /// HTTP endpoint returning a JSON array of listings
    #[serde(default)]
    pub url: Option<String>,

    /// Per-listing details endpoint; `{id}` is replaced by the listing id
    #[serde(default)]
    pub details_url: Option<String>,
}

impl SourceConfig {
    pub fn validate(&self) -> Result<()> {
        match (&self.path, &self.url) {
            (Some(_), Some(_)) => Err(AppError::validation(
                "source.path and source.url are mutually exclusive",
            )),
            (None, None) => Err(AppError::validation(
                "source needs either path or url",
            )),
            (Some(_), None) => {
                if self.details_url.is_some() {
                    return Err(AppError::validation(
                        "source.details_url requires source.url",
                    ));
                }
                Ok(())
            }
            (None, Some(url)) => {
                url::Url::parse(url)?;
                if let Some(details) = &self.details_url {
                    if !details.contains("{id}") {
                        return Err(AppError::validation(
                            "source.details_url must contain an {id} placeholder",
                        ));
                    }
                    url::Url::parse(&details.replace("{id}", "0"))?;
                }
                Ok(())
            }
        }
    }
}

/// HTTP client and fetching behavior settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// User-Agent header for HTTP requests
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,

    /// Request timeout in seconds
    #[serde(default = "defaults::timeout")]
    pub timeout_secs: u64,

    /// Delay between detail requests in milliseconds
    #[serde(default = "defaults::request_delay")]
    pub request_delay_ms: u64,

    /// Maximum concurrent detail requests
    #[serde(default = "defaults::max_concurrent")]
    pub max_concurrent: usize,
}

impl HttpConfig {
    pub fn validate(&self) -> Result<()> {
        if self.user_agent.trim().is_empty() {
            return Err(AppError::validation("http.user_agent is empty"));
        }
        if self.timeout_secs == 0 {
            return Err(AppError::validation("http.timeout_secs must be > 0"));
        }
        if self.max_concurrent == 0 {
            return Err(AppError::validation("http.max_concurrent must be > 0"));
        }
        Ok(())
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agent: defaults::user_agent(),
            timeout_secs: defaults::timeout(),
            request_delay_ms: defaults::request_delay(),
            max_concurrent: defaults::max_concurrent(),
        }
    }
}

mod defaults {
    pub fn refresh_window_days() -> i64 {
        7
    }

    pub fn user_agent() -> String {
        "Mozilla/5.0 (compatible; estate-watch/0.1)".into()
    }
    pub fn timeout() -> u64 {
        30
    }
    pub fn request_delay() -> u64 {
        100
    }
    pub fn max_concurrent() -> usize {
        5
    }
}

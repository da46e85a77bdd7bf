//! Explicit client configuration.
//!
//! Everything the store needs to talk to the host (page, token, endpoint,
//! timeout) lives in one struct injected at construction. Sources layer in
//! this order, later wins: defaults, RON file, host data, environment, and
//! finally whatever the caller sets directly (CLI flags).
//!
//! ```ron
//! (
//!     page_id: 42,
//!     auth_token: "5f2c9a1b3e",
//!     site_url: "https://example.com",
//!     api_base_url: Some("https://example.com/wp-json/unicorn-builder/v1"),
//!     request_timeout_secs: 10,
//! )
//! ```

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use ubr_types::{HostData, PageId};
use url::Url;

use crate::constants::{
    API_NAMESPACE, DEFAULT_SITE_URL, ENV_API_BASE, ENV_NONCE, ENV_PAGE_ID, ENV_SITE,
    ENV_TIMEOUT_SECS, REQUEST_TIMEOUT,
};

/// Errors from loading or validating configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("RON parse error: {0}")]
    Ron(#[from] ron::error::SpannedError),
    #[error("host data JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Connection and page settings for one editor session.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Page whose sections are managed. Unset leaves the store inert.
    pub page_id: PageId,
    /// Anti-forgery token. Empty is allowed; the server decides.
    pub auth_token: String,
    /// Site root, used for the REST base and the edit surface URL.
    pub site_url: String,
    /// Explicit REST base, overriding `{site_url}/wp-json/unicorn-builder/v1`.
    pub api_base_url: Option<String>,
    pub request_timeout_secs: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            page_id: PageId::UNSET,
            auth_token: String::new(),
            site_url: DEFAULT_SITE_URL.to_string(),
            api_base_url: None,
            request_timeout_secs: REQUEST_TIMEOUT.as_secs(),
        }
    }
}

impl ClientConfig {
    pub fn new(site_url: impl Into<String>, page_id: PageId) -> Self {
        Self {
            site_url: site_url.into(),
            page_id,
            ..Self::default()
        }
    }

    /// Load from a RON file. Missing fields keep their defaults.
    pub fn load_ron(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Ok(ron::from_str(&text)?)
    }

    /// Take page id and token from the host's startup data.
    ///
    /// A missing page id is logged, not fatal: the store just stays inert.
    pub fn apply_host(&mut self, host: &HostData) {
        match host.current_page_id.and_then(PageId::checked) {
            Some(page) => self.page_id = page,
            None => tracing::warn!("Page ID not found in host data"),
        }
        self.auth_token = host.token();
    }

    /// Override fields from `UBR_*` environment variables.
    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        self.apply_env_from(|key| std::env::var(key).ok())
    }

    /// Same as [`apply_env`](Self::apply_env) with an injectable lookup.
    pub fn apply_env_from<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(raw) = lookup(ENV_PAGE_ID) {
            let id = raw.trim().parse::<u64>().map_err(|e| ConfigError::Invalid {
                field: "page id",
                reason: format!("{ENV_PAGE_ID}={raw}: {e}"),
            })?;
            self.page_id = PageId::new(id);
        }
        if let Some(nonce) = lookup(ENV_NONCE) {
            self.auth_token = nonce;
        }
        if let Some(site) = lookup(ENV_SITE) {
            self.site_url = site;
        }
        if let Some(base) = lookup(ENV_API_BASE) {
            self.api_base_url = Some(base);
        }
        if let Some(raw) = lookup(ENV_TIMEOUT_SECS) {
            self.request_timeout_secs =
                raw.trim().parse().map_err(|e| ConfigError::Invalid {
                    field: "request timeout",
                    reason: format!("{ENV_TIMEOUT_SECS}={raw}: {e}"),
                })?;
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Parsed site root, always ending in `/` so relative joins stay inside it.
    pub fn site(&self) -> Result<Url, ConfigError> {
        let mut raw = self.site_url.trim().to_string();
        if !raw.ends_with('/') {
            raw.push('/');
        }
        Url::parse(&raw).map_err(|e| ConfigError::Invalid {
            field: "site url",
            reason: format!("{}: {e}", self.site_url),
        })
    }

    /// REST base URL without a trailing slash.
    pub fn api_base(&self) -> Result<String, ConfigError> {
        let base = match &self.api_base_url {
            Some(explicit) => {
                Url::parse(explicit).map_err(|e| ConfigError::Invalid {
                    field: "api base url",
                    reason: format!("{explicit}: {e}"),
                })?;
                explicit.clone()
            }
            None => format!("{}{}", self.site()?, API_NAMESPACE),
        };
        Ok(base.trim_end_matches('/').to_string())
    }

    /// Check everything a client needs before any request goes out.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.request_timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                field: "request timeout",
                reason: "must be at least one second".to_string(),
            });
        }
        self.api_base()?;
        Ok(())
    }
}

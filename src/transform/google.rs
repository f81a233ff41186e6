//! Networked transform backed by the mobile Google Translate page.

use super::TextTransform;
use crate::{Error, ErrorContext, Result};
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::Proxy;
use std::env;
use std::time::Duration;
use tracing::debug;
use url::Url;

pub const DEFAULT_ENDPOINT: &str = "https://translate.google.com/m";

static RESULT_CONTAINER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?s)<div[^>]*class="(?:t0|result-container)"[^>]*>(.*?)</div>"#)
        .expect("static pattern")
});

static HTML_ENTITY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"&(#[0-9]+|#[xX][0-9a-fA-F]+|[a-zA-Z]+);").expect("static pattern"));

#[derive(Debug, Clone)]
pub struct GoogleWebConfig {
    pub endpoint: String,
    pub timeout: Duration,
    pub proxy: Option<String>,
}

impl Default for GoogleWebConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            timeout: Duration::from_secs(30),
            proxy: None,
        }
    }
}

impl GoogleWebConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Defaults overridden by `TRANSPOOL_HTTP_TIMEOUT_SECS` and `TRANSPOOL_PROXY_URL`.
    pub fn from_env() -> Self {
        let timeout_secs = env::var("TRANSPOOL_HTTP_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(30);
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            timeout: Duration::from_secs(timeout_secs),
            proxy: env::var("TRANSPOOL_PROXY_URL").ok().filter(|s| !s.is_empty()),
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_proxy(mut self, proxy: impl Into<String>) -> Self {
        self.proxy = Some(proxy.into());
        self
    }
}

pub struct GoogleWebTransform {
    client: reqwest::Client,
    endpoint: Url,
}

impl GoogleWebTransform {
    pub fn new(config: GoogleWebConfig) -> Result<Self> {
        let endpoint = Url::parse(&config.endpoint).map_err(|e| {
            Error::configuration_with_context(
                "invalid transform endpoint",
                ErrorContext::new()
                    .with_field_path("endpoint")
                    .with_details(e.to_string())
                    .with_source("google_web"),
            )
        })?;

        let mut builder = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent("Mozilla/5.0 (Linux; Android 10) AppleWebKit/537.36 Mobile");

        if let Some(proxy_url) = &config.proxy {
            let proxy = Proxy::all(proxy_url).map_err(|e| {
                Error::configuration_with_context(
                    "invalid proxy url",
                    ErrorContext::new()
                        .with_field_path("proxy")
                        .with_details(e.to_string())
                        .with_source("google_web"),
                )
            })?;
            builder = builder.proxy(proxy);
        }

        let client = builder.build().map_err(|e| {
            Error::configuration_with_context(
                "cannot build http client",
                ErrorContext::new()
                    .with_details(e.to_string())
                    .with_source("google_web"),
            )
        })?;

        Ok(Self { client, endpoint })
    }

    fn extract(page: &str) -> Option<String> {
        RESULT_CONTAINER
            .captures(page)
            .and_then(|c| c.get(1))
            .map(|m| unescape_html(m.as_str()))
    }
}

#[async_trait]
impl TextTransform for GoogleWebTransform {
    async fn transform(&self, source_locale: &str, target_locale: &str, text: &str) -> Result<String> {
        let ctx = || ErrorContext::new().with_source("google_web");
        let resp = self
            .client
            .get(self.endpoint.clone())
            .query(&[("sl", source_locale), ("tl", target_locale), ("q", text)])
            .send()
            .await
            .map_err(|e| Error::transform(e.to_string(), ctx()))?;

        let status = resp.status();
        if !status.is_success() {
            let msg = format!("HTTP {}", status.as_u16());
            let ctx = ctx().with_details(format!("{source_locale} -> {target_locale}"));
            return Err(if status.as_u16() == 429 || status.is_server_error() {
                Error::transform(msg, ctx)
            } else {
                Error::transform_fatal(msg, ctx)
            });
        }

        let page = resp
            .text()
            .await
            .map_err(|e| Error::transform(e.to_string(), ctx()))?;
        debug!(bytes_in = text.len(), bytes_out = page.len(), "google web response");

        Self::extract(&page).ok_or_else(|| {
            Error::transform(
                "result container not found in response page",
                ctx().with_details(format!("{} bytes", page.len())),
            )
        })
    }

    fn name(&self) -> &'static str {
        "google_web"
    }
}

/// Decode the HTML entities the result page uses.
pub(crate) fn unescape_html(s: &str) -> String {
    HTML_ENTITY
        .replace_all(s, |caps: &regex::Captures<'_>| {
            let entity = &caps[1];
            let decoded = match entity {
                "amp" => Some('&'),
                "lt" => Some('<'),
                "gt" => Some('>'),
                "quot" => Some('"'),
                "apos" => Some('\''),
                "nbsp" => Some('\u{a0}'),
                _ => {
                    let code = if let Some(hex) = entity
                        .strip_prefix("#x")
                        .or_else(|| entity.strip_prefix("#X"))
                    {
                        u32::from_str_radix(hex, 16).ok()
                    } else {
                        entity.strip_prefix('#').and_then(|d| d.parse::<u32>().ok())
                    };
                    code.and_then(char::from_u32)
                }
            };
            match decoded {
                Some(c) => c.to_string(),
                None => caps[0].to_string(),
            }
        })
        .into_owned()
}

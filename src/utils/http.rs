// src/utils/http.rs

//! HTTP client utilities.

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};

use crate::error::Result;
use crate::models::FetcherConfig;

/// Create a configured asynchronous HTTP client.
///
/// The User-Agent is not fixed here; it is rotated per request.
pub fn create_async_client(config: &FetcherConfig) -> Result<reqwest::Client> {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.timeout_secs))
        .redirect(reqwest::redirect::Policy::limited(10))
        .build()?;
    Ok(client)
}

/// Pick one User-Agent uniformly from the rotation pool.
pub fn pick_user_agent(config: &FetcherConfig) -> Option<&str> {
    let pool: Vec<&str> = config
        .user_agents
        .iter()
        .map(String::as_str)
        .filter(|ua| !ua.trim().is_empty())
        .collect();
    if pool.is_empty() {
        return None;
    }
    Some(pool[fastrand::usize(..pool.len())])
}

/// A fresh browser-like header set with a randomly rotated User-Agent.
pub fn browser_headers(config: &FetcherConfig) -> HeaderMap {
    let mut headers = HeaderMap::new();
    let mut insert = |name: &'static str, value: &str| {
        if let Ok(value) = HeaderValue::from_str(value) {
            headers.insert(HeaderName::from_static(name), value);
        }
    };

    if let Some(ua) = pick_user_agent(config) {
        insert("user-agent", ua);
    }
    insert(
        "accept",
        "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8",
    );
    insert("accept-language", "en-US,en;q=0.5");
    insert("upgrade-insecure-requests", "1");
    insert("sec-fetch-dest", "document");
    insert("sec-fetch-mode", "navigate");
    insert("sec-fetch-site", "none");
    insert("cache-control", "max-age=0");
    if !config.referer.is_empty() {
        insert("referer", &config.referer);
    }

    headers
}

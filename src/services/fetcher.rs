// src/services/fetcher.rs

//! Resilient page fetcher.
//!
//! Lookup order: cache, direct GET with rotated headers (retried with
//! exponential backoff), one paid-proxy GET, one text-extraction proxy GET.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use reqwest::header::HeaderMap;

use crate::error::{AppError, Result};
use crate::models::{Config, FetcherConfig, ProxyConfig};
use crate::storage::CacheStore;
use crate::utils::http::{browser_headers, create_async_client};
use crate::utils::url::strip_scheme;

/// Status and body of one HTTP exchange.
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: u16,
    pub body: String,
}

/// Minimal HTTP GET seam.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn get(&self, url: &str, headers: HeaderMap, timeout: Duration) -> Result<RawResponse>;
}

/// Production transport backed by `reqwest`.
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    pub fn new(config: &FetcherConfig) -> Result<Self> {
        Ok(Self {
            client: create_async_client(config)?,
        })
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn get(&self, url: &str, headers: HeaderMap, timeout: Duration) -> Result<RawResponse> {
        let response = self
            .client
            .get(url)
            .headers(headers)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| AppError::network(url, e))?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| AppError::network(url, e))?;

        Ok(RawResponse { status, body })
    }
}

/// Fetcher that only gives up after every fallback path has failed.
pub struct ResilientFetcher {
    transport: Box<dyn HttpTransport>,
    cache: CacheStore,
    fetcher: FetcherConfig,
    proxy: ProxyConfig,
    /// Cache entries older than this are ignored
    fresh_after: Option<DateTime<Utc>>,
}

impl ResilientFetcher {
    pub fn new(transport: Box<dyn HttpTransport>, cache: CacheStore, config: &Config) -> Self {
        Self {
            transport,
            cache,
            fetcher: config.fetcher.clone(),
            proxy: config.proxy.clone(),
            fresh_after: None,
        }
    }

    /// Fetcher using the real network.
    pub fn with_reqwest(cache: CacheStore, config: &Config) -> Result<Self> {
        let transport = ReqwestTransport::new(&config.fetcher)?;
        Ok(Self::new(Box::new(transport), cache, config))
    }

    /// Ignore cache entries written before this call.
    ///
    /// Pages fetched later in the same run are still served from cache, so a
    /// refreshed run downloads each URL at most once.
    pub fn refresh(mut self, refresh: bool) -> Self {
        self.fresh_after = refresh.then(Utc::now);
        self
    }

    /// Politeness delay between successive network operations.
    pub async fn pause(&self) {
        if self.fetcher.request_delay_ms > 0 {
            tokio::time::sleep(Duration::from_millis(self.fetcher.request_delay_ms)).await;
        }
    }

    pub async fn fetch(&self, url: &str) -> Result<String> {
        let cached = match self.fresh_after {
            Some(since) => self.cache.get_since(url, since).await,
            None => self.cache.get(url).await,
        };
        if let Some(content) = cached {
            log::debug!("Serving {} from cache", url);
            return Ok(content);
        }

        let retries = self.fetcher.max_retries.max(1);
        let mut proxy_tried = false;

        for attempt in 1..=retries {
            match self.direct(url).await {
                Ok(body) => return Ok(self.remember(url, body).await),
                Err(e) if e.is_retryable() => {
                    log::warn!("Attempt {}/{} for {} failed: {}", attempt, retries, url, e);

                    if !proxy_tried {
                        if let Some(key) = self.proxy.credential() {
                            proxy_tried = true;
                            match self.via_proxy(url, key).await {
                                Ok(body) => return Ok(self.remember(url, body).await),
                                Err(e) => log::warn!("Proxy fetch for {} failed: {}", url, e),
                            }
                        }
                    }

                    if attempt < retries {
                        let wait = self.backoff(attempt);
                        log::info!("Backing off {}s before retrying {}", wait.as_secs(), url);
                        tokio::time::sleep(wait).await;
                    }
                }
                Err(e) => {
                    log::warn!("Giving up direct fetch of {}: {}", url, e);
                    break;
                }
            }
        }

        match self.via_text_proxy(url).await {
            Ok(body) => Ok(self.remember(url, body).await),
            Err(e) => {
                log::error!("All fetch paths failed for {}", url);
                Err(AppError::FetchFailed {
                    url: url.to_string(),
                    last_error: e.to_string(),
                })
            }
        }
    }

    /// `min(2^attempt, max_backoff)` seconds.
    fn backoff(&self, attempt: u32) -> Duration {
        let secs = 2u64
            .saturating_pow(attempt)
            .min(self.fetcher.max_backoff_secs);
        Duration::from_secs(secs)
    }

    async fn direct(&self, url: &str) -> Result<String> {
        let timeout = Duration::from_secs(self.fetcher.timeout_secs);
        let response = self
            .transport
            .get(url, browser_headers(&self.fetcher), timeout)
            .await?;
        check_status(url, response)
    }

    async fn via_proxy(&self, url: &str, key: &str) -> Result<String> {
        let proxied = proxy_url(&self.proxy.endpoint, key, url)?;
        log::info!("Retrying {} through proxy", url);
        let timeout = Duration::from_secs(self.fetcher.text_proxy_timeout_secs);
        let response = self.transport.get(&proxied, HeaderMap::new(), timeout).await?;
        check_status(url, response)
    }

    async fn via_text_proxy(&self, url: &str) -> Result<String> {
        let proxied = text_proxy_url(&self.proxy.text_proxy_prefix, url);
        log::info!("Falling back to text proxy for {}", url);
        let timeout = Duration::from_secs(self.fetcher.text_proxy_timeout_secs);
        let response = self.transport.get(&proxied, HeaderMap::new(), timeout).await?;
        check_status(url, response)
    }

    async fn remember(&self, url: &str, body: String) -> String {
        if let Err(e) = self.cache.put(url, &body).await {
            log::warn!("Could not cache {}: {}", url, e);
        }
        body
    }
}

fn check_status(url: &str, response: RawResponse) -> Result<String> {
    if response.status >= 400 {
        return Err(AppError::from_status(url, response.status));
    }
    Ok(response.body)
}

/// `{endpoint}?api_key={key}&url={target}` with query encoding.
pub fn proxy_url(endpoint: &str, key: &str, target: &str) -> Result<String> {
    let url = url::Url::parse_with_params(endpoint, &[("api_key", key), ("url", target)])?;
    Ok(url.to_string())
}

/// `{prefix}{target without scheme}`
pub fn text_proxy_url(prefix: &str, target: &str) -> String {
    format!("{}{}", prefix, strip_scheme(target))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};
    use tempfile::TempDir;

    pub(crate) type Responder = Box<dyn Fn(&str) -> Result<RawResponse> + Send + Sync>;

    /// In-memory transport recording every requested URL.
    pub(crate) struct MockTransport {
        pub calls: Arc<Mutex<Vec<String>>>,
        respond: Responder,
    }

    impl MockTransport {
        pub fn new(respond: Responder) -> (Self, Arc<Mutex<Vec<String>>>) {
            let calls = Arc::new(Mutex::new(Vec::new()));
            (
                Self {
                    calls: Arc::clone(&calls),
                    respond,
                },
                calls,
            )
        }
    }

    #[async_trait]
    impl HttpTransport for MockTransport {
        async fn get(&self, url: &str, _headers: HeaderMap, _timeout: Duration) -> Result<RawResponse> {
            self.calls.lock().unwrap().push(url.to_string());
            (self.respond)(url)
        }
    }

    pub(crate) fn ok(body: &str) -> Result<RawResponse> {
        Ok(RawResponse {
            status: 200,
            body: body.to_string(),
        })
    }

    pub(crate) fn status(code: u16) -> Result<RawResponse> {
        Ok(RawResponse {
            status: code,
            body: String::new(),
        })
    }

    const TARGET: &str = "https://www.kllotteryresult.com/kerala-lottery-result-SS-498";

    fn config(with_proxy: bool) -> Config {
        let mut config = Config::default();
        config.proxy.api_key = with_proxy.then(|| "secret".to_string());
        config
    }

    fn fetcher(dir: &TempDir, config: &Config, respond: Responder) -> (ResilientFetcher, Arc<Mutex<Vec<String>>>) {
        let (transport, calls) = MockTransport::new(respond);
        let cache = CacheStore::new(dir.path(), Duration::from_secs(3600));
        (ResilientFetcher::new(Box::new(transport), cache, config), calls)
    }

    fn is_proxy(url: &str) -> bool {
        url.starts_with("http://api.scraperapi.com")
    }

    fn is_text_proxy(url: &str) -> bool {
        url.starts_with("https://r.jina.ai/")
    }

    #[tokio::test]
    async fn test_success_is_cached() {
        let dir = TempDir::new().unwrap();
        let (fetcher, calls) = fetcher(&dir, &config(false), Box::new(|_: &str| ok("<html>page</html>")));

        assert_eq!(fetcher.fetch(TARGET).await.unwrap(), "<html>page</html>");
        assert_eq!(fetcher.fetch(TARGET).await.unwrap(), "<html>page</html>");
        assert_eq!(calls.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_refresh_bypasses_cache_reads() {
        let dir = TempDir::new().unwrap();
        let (fetcher, calls) = fetcher(&dir, &config(false), Box::new(|_: &str| ok("fresh")));
        fetcher
            .cache
            .put_at(TARGET, "stale", Utc::now() - chrono::Duration::minutes(1))
            .await
            .unwrap();
        let fetcher = fetcher.refresh(true);

        assert_eq!(fetcher.fetch(TARGET).await.unwrap(), "fresh");
        assert_eq!(calls.lock().unwrap().len(), 1);
        assert_eq!(fetcher.cache.get(TARGET).await.as_deref(), Some("fresh"));

        assert_eq!(fetcher.fetch(TARGET).await.unwrap(), "fresh");
        assert_eq!(calls.lock().unwrap().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_always_500_exhausts_every_path() {
        let dir = TempDir::new().unwrap();
        let (fetcher, calls) = fetcher(&dir, &config(true), Box::new(|_: &str| status(500)));

        let started = tokio::time::Instant::now();
        let err = fetcher.fetch(TARGET).await.unwrap_err();
        let elapsed = started.elapsed();

        assert!(matches!(err, AppError::FetchFailed { ref url, .. } if url == TARGET));
        let calls = calls.lock().unwrap();
        assert_eq!(calls.iter().filter(|u| u.as_str() == TARGET).count(), 3);
        assert_eq!(calls.iter().filter(|u| is_proxy(u)).count(), 1);
        assert_eq!(calls.iter().filter(|u| is_text_proxy(u)).count(), 1);
        assert_eq!(calls.len(), 5);
        assert_eq!(elapsed, Duration::from_secs(2 + 4));
    }

    #[tokio::test(start_paused = true)]
    async fn test_backoff_is_capped() {
        let dir = TempDir::new().unwrap();
        let mut config = config(false);
        config.fetcher.max_retries = 5;
        let (fetcher, calls) = fetcher(&dir, &config, Box::new(|_: &str| status(429)));

        let started = tokio::time::Instant::now();
        assert!(fetcher.fetch(TARGET).await.is_err());
        assert_eq!(started.elapsed(), Duration::from_secs(2 + 4 + 8 + 10));
        assert_eq!(calls.lock().unwrap().len(), 6);
    }

    #[tokio::test(start_paused = true)]
    async fn test_proxy_success_short_circuits() {
        let dir = TempDir::new().unwrap();
        let (fetcher, calls) = fetcher(
            &dir,
            &config(true),
            Box::new(|url: &str| if is_proxy(url) { ok("via proxy") } else { status(403) }),
        );

        let started = tokio::time::Instant::now();
        assert_eq!(fetcher.fetch(TARGET).await.unwrap(), "via proxy");
        assert_eq!(started.elapsed(), Duration::ZERO);
        assert_eq!(calls.lock().unwrap().len(), 2);
        assert_eq!(fetcher.cache.get(TARGET).await.as_deref(), Some("via proxy"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_network_error_then_success() {
        let dir = TempDir::new().unwrap();
        let seen = Arc::new(Mutex::new(0));
        let counter = Arc::clone(&seen);
        let (fetcher, calls) = fetcher(
            &dir,
            &config(false),
            Box::new(move |url: &str| {
                let mut n = counter.lock().unwrap();
                *n += 1;
                if *n == 1 {
                    Err(AppError::network(url, "connection reset"))
                } else {
                    ok("second time")
                }
            }),
        );

        assert_eq!(fetcher.fetch(TARGET).await.unwrap(), "second time");
        assert_eq!(calls.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_not_found_skips_retries_and_uses_text_proxy() {
        let dir = TempDir::new().unwrap();
        let (fetcher, calls) = fetcher(
            &dir,
            &config(true),
            Box::new(|url: &str| if is_text_proxy(url) { ok("Title: rendered") } else { status(404) }),
        );

        assert_eq!(fetcher.fetch(TARGET).await.unwrap(), "Title: rendered");
        let calls = calls.lock().unwrap();
        assert_eq!(
            *calls,
            vec![
                TARGET.to_string(),
                "https://r.jina.ai/http://www.kllotteryresult.com/kerala-lottery-result-SS-498"
                    .to_string()
            ]
        );
    }

    #[test]
    fn test_proxy_urls() {
        assert_eq!(
            proxy_url("http://api.scraperapi.com", "k", "https://a.com/x?y=1").unwrap(),
            "http://api.scraperapi.com/?api_key=k&url=https%3A%2F%2Fa.com%2Fx%3Fy%3D1"
        );
        assert_eq!(
            text_proxy_url("https://r.jina.ai/http://", "https://a.com/x"),
            "https://r.jina.ai/http://a.com/x"
        );
    }
}

// src/services/discovery.rs

//! Result-page link discovery.
//!
//! Walks the listing's pagination, collects result-page links, reads each
//! candidate's date and keeps those the mode's date policy accepts.

use std::collections::HashSet;

use chrono::{Duration, Local, NaiveDate};
use regex::Regex;
use scraper::Html;

use crate::error::{AppError, Result};
use crate::models::DiscoveryConfig;
use crate::services::ResilientFetcher;
use crate::storage::CacheStore;
use crate::utils::date::{parse_date_from_text, parse_dmy};
use crate::utils::html::{anchors, first_text, visible_lines};
use crate::utils::resolve;
use crate::utils::url::{normalize, result_path_regex};

/// Which caller's date policy applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscoveryMode {
    /// Batch backfill: only draws strictly before today, dated by headings.
    Historical,
    /// Near-real-time update: recent window plus a future grace, undated allowed.
    Recent,
}

impl DiscoveryMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            DiscoveryMode::Historical => "historical",
            DiscoveryMode::Recent => "recent",
        }
    }
}

/// Date acceptance rule for one discovery mode.
#[derive(Debug, Clone, Copy)]
pub struct DatePolicy {
    mode: DiscoveryMode,
    window_days: i64,
    grace_days: i64,
}

impl DatePolicy {
    pub fn new(mode: DiscoveryMode, config: &DiscoveryConfig) -> Self {
        Self {
            mode,
            window_days: config.recent_window_days,
            grace_days: config.future_grace_days,
        }
    }

    pub fn accepts(&self, date: Option<NaiveDate>, today: NaiveDate) -> bool {
        match (self.mode, date) {
            (DiscoveryMode::Historical, Some(date)) => date < today,
            (DiscoveryMode::Historical, None) => false,
            (DiscoveryMode::Recent, Some(date)) => {
                date >= today - Duration::days(self.window_days)
                    && date <= today + Duration::days(self.grace_days)
            }
            (DiscoveryMode::Recent, None) => true,
        }
    }
}

/// Listing page contents relevant to discovery.
struct ListingPage {
    candidates: Vec<String>,
    next: Option<String>,
}

/// Collects candidate result-page URLs, newest first.
pub struct LinkDiscoverer<'a> {
    fetcher: &'a ResilientFetcher,
    config: DiscoveryConfig,
    mode: DiscoveryMode,
    policy: DatePolicy,
    result_pattern: Regex,
    raw_pattern: Regex,
    next_pattern: Regex,
    link_cache: Option<CacheStore>,
    refresh: bool,
}

impl<'a> LinkDiscoverer<'a> {
    pub fn new(
        fetcher: &'a ResilientFetcher,
        config: &DiscoveryConfig,
        mode: DiscoveryMode,
    ) -> Result<Self> {
        let prefix = regex::escape(&config.result_path_prefix);
        Ok(Self {
            fetcher,
            config: config.clone(),
            mode,
            policy: DatePolicy::new(mode, config),
            result_pattern: result_path_regex(&config.result_path_prefix)?,
            raw_pattern: Regex::new(&format!(
                r#"(?:https?://[^\s"'<>()\[\]]*?)?{prefix}[A-Z]+-\d+"#
            ))?,
            next_pattern: Regex::new(&format!("(?i){}", config.next_link_pattern))?,
            link_cache: None,
            refresh: false,
        })
    }

    /// Cache the discovered list (short TTL).
    pub fn with_link_cache(mut self, cache: CacheStore) -> Self {
        self.link_cache = Some(cache);
        self
    }

    /// Ignore a cached list; a fresh one is still stored.
    pub fn refresh(mut self, refresh: bool) -> Self {
        self.refresh = refresh;
        self
    }

    pub async fn discover(&self, n: usize) -> Result<Vec<String>> {
        self.discover_as_of(n, Local::now().date_naive()).await
    }

    /// Discovery relative to an explicit `today`.
    pub async fn discover_as_of(&self, n: usize, today: NaiveDate) -> Result<Vec<String>> {
        if n == 0 {
            return Ok(Vec::new());
        }

        let cache_key = format!(
            "links:{}:{}:{}",
            self.config.listing_url,
            self.mode.as_str(),
            n
        );
        if let Some(cached) = self.cached_links(&cache_key).await {
            log::info!("Using {} cached {} links", cached.len(), self.mode.as_str());
            return Ok(cached);
        }

        let mut visited: HashSet<String> = HashSet::new();
        let mut seen: HashSet<String> = HashSet::new();
        let mut accepted: Vec<(NaiveDate, String)> = Vec::new();
        let mut next = Some(self.config.listing_url.clone());

        while let Some(page_url) = next.take() {
            if visited.len() >= self.config.max_listing_pages || !visited.insert(page_url.clone()) {
                break;
            }
            if visited.len() > 1 {
                self.fetcher.pause().await;
            }

            let body = match self.fetcher.fetch(&page_url).await {
                Ok(body) => body,
                Err(e) if visited.len() == 1 => {
                    return Err(AppError::discovery(format!(
                        "listing {} unavailable: {}",
                        page_url, e
                    )));
                }
                Err(e) => {
                    log::warn!("Stopping pagination at {}: {}", page_url, e);
                    break;
                }
            };

            let listing = self.parse_listing(&page_url, &body);
            log::info!(
                "Listing page {}: {} candidates",
                visited.len(),
                listing.candidates.len()
            );

            for candidate in listing.candidates {
                if accepted.len() >= n {
                    break;
                }
                if !seen.insert(candidate.clone()) {
                    continue;
                }

                self.fetcher.pause().await;
                let page = match self.fetcher.fetch(&candidate).await {
                    Ok(page) => page,
                    Err(e) => {
                        log::warn!("Skip {}: {}", candidate, e);
                        continue;
                    }
                };

                let date = self.page_date(&page);
                if self.policy.accepts(date, today) {
                    accepted.push((date.unwrap_or(today), candidate));
                } else {
                    match date {
                        Some(date) => {
                            log::debug!("Skip {}: date {} outside window", candidate, date)
                        }
                        None => log::debug!("Skip {}: no date found", candidate),
                    }
                }
            }

            if accepted.len() >= n {
                break;
            }
            next = listing.next;
        }

        accepted.sort_by(|a, b| b.0.cmp(&a.0));
        let links: Vec<String> = accepted.into_iter().take(n).map(|(_, url)| url).collect();
        log::info!("Discovered {} {} links", links.len(), self.mode.as_str());

        if !links.is_empty() {
            self.store_links(&cache_key, &links).await;
        }
        Ok(links)
    }

    fn parse_listing(&self, page_url: &str, body: &str) -> ListingPage {
        let document = Html::parse_document(body);
        let mut candidates = Vec::new();
        let mut next = None;

        for (href, text) in anchors(&document) {
            let Some(absolute) = resolve(page_url, &href) else {
                continue;
            };
            if self.result_pattern.is_match(&absolute) {
                push_unique(&mut candidates, normalize(&absolute));
            } else if next.is_none() && self.next_pattern.is_match(&text) {
                next = Some(absolute);
            }
        }

        if candidates.is_empty() {
            for m in self.raw_pattern.find_iter(body) {
                if let Some(absolute) = resolve(page_url, m.as_str()) {
                    push_unique(&mut candidates, normalize(&absolute));
                }
            }
            if !candidates.is_empty() {
                log::debug!("Recovered {} links from raw text", candidates.len());
            }
        }

        ListingPage { candidates, next }
    }

    /// Draw date of a candidate page under this mode's reading rules.
    fn page_date(&self, page: &str) -> Option<NaiveDate> {
        let document = Html::parse_document(page);
        match self.mode {
            DiscoveryMode::Historical => ["h1", "title", "h2", "h3"]
                .iter()
                .find_map(|tag| first_text(&document, tag).and_then(|t| parse_dmy(&t))),
            DiscoveryMode::Recent => {
                let mut text = first_text(&document, "title").unwrap_or_default();
                text.push('\n');
                text.push_str(&visible_lines(&document).join("\n"));
                parse_date_from_text(&text)
            }
        }
    }

    async fn cached_links(&self, key: &str) -> Option<Vec<String>> {
        if self.refresh {
            return None;
        }
        let content = self.link_cache.as_ref()?.get(key).await?;
        serde_json::from_str(&content).ok()
    }

    async fn store_links(&self, key: &str, links: &[String]) {
        let Some(cache) = &self.link_cache else {
            return;
        };
        match serde_json::to_string(links) {
            Ok(json) => {
                if let Err(e) = cache.put(key, &json).await {
                    log::warn!("Could not cache discovered links: {}", e);
                }
            }
            Err(e) => log::warn!("Could not serialize discovered links: {}", e),
        }
    }
}

fn push_unique(list: &mut Vec<String>, url: String) {
    if !list.contains(&url) {
        list.push(url);
    }
}

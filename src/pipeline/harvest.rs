// src/pipeline/harvest.rs

//! Discovery → fetch → extract → persist.

use std::path::PathBuf;
use std::time::Duration;

use chrono::{Local, NaiveDate};

use crate::error::Result;
use crate::models::{Config, DrawRecord};
use crate::services::{DiscoveryMode, DrawExtractor, HttpTransport, LinkDiscoverer, ResilientFetcher};
use crate::storage::{CacheStore, RecordStore};

/// Result of processing one URL.
#[derive(Debug)]
pub enum ItemOutcome {
    Extracted(DrawRecord),
    Skipped { url: String, reason: String },
}

/// Aggregate counts of a batch run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub discovered: usize,
    pub extracted: usize,
    pub skipped: usize,
    pub applied: usize,
    pub latest: Option<String>,
}

impl RunSummary {
    pub fn log(&self) {
        log::info!(
            "Run finished: {} discovered, {} extracted, {} skipped, {} new",
            self.discovered,
            self.extracted,
            self.skipped,
            self.applied
        );
        if let Some(latest) = &self.latest {
            log::info!("Latest draw: {}", latest);
        }
    }
}

/// Owns the fetcher, extractor and record store for one run.
pub struct Harvester {
    config: Config,
    fetcher: ResilientFetcher,
    extractor: DrawExtractor,
    store: RecordStore,
    link_cache: CacheStore,
    refresh: bool,
}

impl Harvester {
    /// Harvester using the real network, rooted at `root`.
    pub fn new(config: &Config, root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        let page_cache = page_cache(config, &root);
        let fetcher = ResilientFetcher::with_reqwest(page_cache, config)?;
        Self::assemble(config, root, fetcher)
    }

    /// Harvester over a caller-supplied transport.
    pub fn with_transport(
        config: &Config,
        root: impl Into<PathBuf>,
        transport: Box<dyn HttpTransport>,
    ) -> Result<Self> {
        let root = root.into();
        let fetcher = ResilientFetcher::new(transport, page_cache(config, &root), config);
        Self::assemble(config, root, fetcher)
    }

    fn assemble(config: &Config, root: PathBuf, fetcher: ResilientFetcher) -> Result<Self> {
        let link_cache = CacheStore::new(
            config.paths.cache_path(&root).join("links"),
            Duration::from_secs(config.fetcher.link_cache_ttl_secs),
        );
        Ok(Self {
            config: config.clone(),
            extractor: DrawExtractor::new(&config.extraction, &config.discovery)?,
            store: RecordStore::new(root, config.paths.clone()),
            fetcher,
            link_cache,
            refresh: false,
        })
    }

    /// Bypass cache reads for pages and link lists.
    pub fn refresh(mut self, refresh: bool) -> Self {
        self.fetcher = self.fetcher.refresh(refresh);
        self.refresh = refresh;
        self
    }

    pub fn store(&self) -> &RecordStore {
        &self.store
    }

    /// Discover up to `count` links in `mode`, then process them.
    pub async fn run_discovery(&self, mode: DiscoveryMode, count: usize) -> Result<RunSummary> {
        self.run_discovery_as_of(mode, count, Local::now().date_naive())
            .await
    }

    /// Discovery run relative to an explicit `today`.
    ///
    /// An unreachable listing yields an empty summary and leaves stored data untouched.
    pub async fn run_discovery_as_of(
        &self,
        mode: DiscoveryMode,
        count: usize,
        today: NaiveDate,
    ) -> Result<RunSummary> {
        let discoverer = LinkDiscoverer::new(&self.fetcher, &self.config.discovery, mode)?
            .with_link_cache(self.link_cache.clone())
            .refresh(self.refresh);

        let links = match discoverer.discover_as_of(count, today).await {
            Ok(links) => links,
            Err(e) => {
                log::error!("Discovery failed: {}", e);
                let summary = RunSummary::default();
                summary.log();
                return Ok(summary);
            }
        };

        let mut summary = self.run_urls(&links).await;
        summary.discovered = links.len();
        summary.log();
        Ok(summary)
    }

    /// Fetch, extract and persist an explicit list of result URLs.
    pub async fn run_urls(&self, urls: &[String]) -> RunSummary {
        let mut summary = RunSummary {
            discovered: urls.len(),
            ..RunSummary::default()
        };
        let mut records = Vec::new();

        for (i, url) in urls.iter().enumerate() {
            if i > 0 {
                self.fetcher.pause().await;
            }
            match self.process(url).await {
                ItemOutcome::Extracted(record) => records.push(record),
                ItemOutcome::Skipped { url, reason } => {
                    summary.skipped += 1;
                    log::warn!("Skipped {}: {}", url, reason);
                }
            }
        }
        summary.extracted = records.len();

        for record in &records {
            if let Err(e) = self.store.save_record(record).await {
                log::error!("Failed to write {}: {}", record.filename, e);
            }
        }

        summary.applied = match self.store.merge(&records).await {
            Ok(applied) => applied,
            Err(e) => {
                log::error!("Failed to update manifest/history: {}", e);
                0
            }
        };

        summary.latest = match self.store.update_latest().await {
            Ok(latest) => latest,
            Err(e) => {
                log::error!("Failed to update latest pointer: {}", e);
                None
            }
        };

        summary
    }

    async fn process(&self, url: &str) -> ItemOutcome {
        let skipped = |reason: String| ItemOutcome::Skipped {
            url: url.to_string(),
            reason,
        };

        let raw = match self.fetcher.fetch(url).await {
            Ok(raw) => raw,
            Err(e) => return skipped(e.to_string()),
        };

        match self.extractor.extract(url, &raw) {
            Ok(record) => {
                log::info!("Extracted {} from {}", record.filename, url);
                ItemOutcome::Extracted(record)
            }
            Err(e) => skipped(e.to_string()),
        }
    }
}

fn page_cache(config: &Config, root: &std::path::Path) -> CacheStore {
    CacheStore::new(
        config.paths.cache_path(root).join("pages"),
        Duration::from_secs(config.fetcher.page_cache_ttl_secs),
    )
}

//! Application configuration structures.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::models::PrizeTierKey;

/// Root application configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// HTTP fetching, retry and cache settings
    #[serde(default)]
    pub fetcher: FetcherConfig,

    /// Paid proxy and text-extraction proxy settings
    #[serde(default)]
    pub proxy: ProxyConfig,

    /// Listing crawl settings
    #[serde(default)]
    pub discovery: DiscoveryConfig,

    /// Page parsing tables and thresholds
    #[serde(default)]
    pub extraction: ExtractionConfig,

    /// Output and cache locations
    #[serde(default)]
    pub paths: PathsConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .map_err(|e| AppError::config(format!("cannot read {}: {}", path.display(), e)))?;
        let mut config: Config = toml::from_str(&content)?;
        config.proxy.apply_env();
        Ok(config)
    }

    /// Load configuration or return default if loading fails.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        Self::load(&path).unwrap_or_else(|e| {
            log::warn!(
                "Config load failed from {:?}: {}. Using defaults.",
                path.as_ref(),
                e
            );
            let mut config = Self::default();
            config.proxy.apply_env();
            config
        })
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        if self.fetcher.user_agents.iter().all(|ua| ua.trim().is_empty()) {
            return Err(AppError::validation("fetcher.user_agents is empty"));
        }
        if self.fetcher.timeout_secs == 0 {
            return Err(AppError::validation("fetcher.timeout_secs must be > 0"));
        }
        if self.fetcher.text_proxy_timeout_secs == 0 {
            return Err(AppError::validation(
                "fetcher.text_proxy_timeout_secs must be > 0",
            ));
        }
        if self.fetcher.max_retries == 0 {
            return Err(AppError::validation("fetcher.max_retries must be > 0"));
        }
        if url::Url::parse(&self.discovery.listing_url).is_err() {
            return Err(AppError::validation("discovery.listing_url is not a URL"));
        }
        if self.discovery.result_path_prefix.trim().is_empty() {
            return Err(AppError::validation(
                "discovery.result_path_prefix is empty",
            ));
        }
        if self.discovery.max_listing_pages == 0 {
            return Err(AppError::validation(
                "discovery.max_listing_pages must be > 0",
            ));
        }
        if self.extraction.tiers.is_empty() {
            return Err(AppError::validation("No prize tiers defined"));
        }
        if let Some(tier) = self.extraction.tiers.iter().find(|t| t.variants.is_empty()) {
            return Err(AppError::validation(format!(
                "Prize tier {} has no label variants",
                tier.key.as_str()
            )));
        }
        if self.extraction.heading_max_chars == 0 {
            return Err(AppError::validation(
                "extraction.heading_max_chars must be > 0",
            ));
        }
        Ok(())
    }
}

/// HTTP fetching behavior settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetcherConfig {
    /// Browser User-Agent strings rotated per attempt
    #[serde(default = "defaults::user_agents")]
    pub user_agents: Vec<String>,

    /// Referer header sent with direct requests
    #[serde(default = "defaults::referer")]
    pub referer: String,

    /// Per-attempt timeout for direct and proxy requests
    #[serde(default = "defaults::timeout")]
    pub timeout_secs: u64,

    /// Timeout for the text-extraction proxy
    #[serde(default = "defaults::text_proxy_timeout")]
    pub text_proxy_timeout_secs: u64,

    /// Direct attempts before falling back to the text-extraction proxy
    #[serde(default = "defaults::max_retries")]
    pub max_retries: u32,

    /// Upper bound of a single backoff sleep
    #[serde(default = "defaults::max_backoff")]
    pub max_backoff_secs: u64,

    /// Delay between successive page fetches in milliseconds
    #[serde(default = "defaults::request_delay")]
    pub request_delay_ms: u64,

    /// Lifetime of cached page bodies
    #[serde(default = "defaults::page_cache_ttl")]
    pub page_cache_ttl_secs: u64,

    /// Lifetime of cached discovery results
    #[serde(default = "defaults::link_cache_ttl")]
    pub link_cache_ttl_secs: u64,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            user_agents: defaults::user_agents(),
            referer: defaults::referer(),
            timeout_secs: defaults::timeout(),
            text_proxy_timeout_secs: defaults::text_proxy_timeout(),
            max_retries: defaults::max_retries(),
            max_backoff_secs: defaults::max_backoff(),
            request_delay_ms: defaults::request_delay(),
            page_cache_ttl_secs: defaults::page_cache_ttl(),
            link_cache_ttl_secs: defaults::link_cache_ttl(),
        }
    }
}

/// Proxy fallbacks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProxyConfig {
    /// ScraperAPI-compatible endpoint
    #[serde(default = "defaults::proxy_endpoint")]
    pub endpoint: String,

    /// Proxy credential; the proxy path is disabled without one
    #[serde(default)]
    pub api_key: Option<String>,

    /// Prefix of the text-extraction proxy, target appended without scheme
    #[serde(default = "defaults::text_proxy_prefix")]
    pub text_proxy_prefix: String,
}

impl ProxyConfig {
    /// Environment variables win over the config file for secrets.
    pub fn apply_env(&mut self) {
        if let Ok(key) = std::env::var("SCRAPERAPI_KEY") {
            let key = key.trim();
            if !key.is_empty() {
                self.api_key = Some(key.to_string());
            }
        }
        if let Ok(endpoint) = std::env::var("SCRAPERAPI_ENDPOINT") {
            let endpoint = endpoint.trim();
            if !endpoint.is_empty() {
                self.endpoint = endpoint.to_string();
            }
        }
    }

    /// The configured credential, if any non-blank one exists.
    pub fn credential(&self) -> Option<&str> {
        self.api_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
    }
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            endpoint: defaults::proxy_endpoint(),
            api_key: None,
            text_proxy_prefix: defaults::text_proxy_prefix(),
        }
    }
}

/// Listing crawl settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoveryConfig {
    /// Root of the paginated listing
    #[serde(default = "defaults::listing_url")]
    pub listing_url: String,

    /// Path prefix shared by every result page, followed by `CODE-NUMBER`
    #[serde(default = "defaults::result_path_prefix")]
    pub result_path_prefix: String,

    /// Case-insensitive pattern matched against pagination anchor text
    #[serde(default = "defaults::next_link_pattern")]
    pub next_link_pattern: String,

    /// Hard stop on pagination depth
    #[serde(default = "defaults::max_listing_pages")]
    pub max_listing_pages: usize,

    /// How far back the recent mode looks
    #[serde(default = "defaults::recent_window_days")]
    pub recent_window_days: i64,

    /// How far ahead of today a draw date may be in recent mode
    #[serde(default = "defaults::future_grace_days")]
    pub future_grace_days: i64,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            listing_url: defaults::listing_url(),
            result_path_prefix: defaults::result_path_prefix(),
            next_link_pattern: defaults::next_link_pattern(),
            max_listing_pages: defaults::max_listing_pages(),
            recent_window_days: defaults::recent_window_days(),
            future_grace_days: defaults::future_grace_days(),
        }
    }
}

/// Page parsing tables and thresholds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionConfig {
    /// Lowercased `h1` texts that carry no draw information
    #[serde(default = "defaults::generic_titles")]
    pub generic_titles: Vec<String>,

    /// Longest line still treated as a tier heading
    #[serde(default = "defaults::heading_max_chars")]
    pub heading_max_chars: usize,

    /// Winner text used while results are unpublished
    #[serde(default = "defaults::placeholder")]
    pub placeholder: String,

    /// Minimum alphanumeric length of a kept winner token
    #[serde(default = "defaults::min_winner_len")]
    pub min_winner_len: usize,

    /// Canonical prize tiers in output order
    #[serde(default = "defaults::tiers")]
    pub tiers: Vec<TierDefinition>,

    /// Lottery code to canonical name
    #[serde(default = "defaults::lottery_names")]
    pub lottery_names: Vec<LotteryName>,
}

impl ExtractionConfig {
    /// Canonical name for a lottery code.
    pub fn name_for_code(&self, code: &str) -> Option<&str> {
        self.lottery_names
            .iter()
            .find(|n| n.code == code)
            .map(|n| n.name.as_str())
    }

    /// Tier definition by key.
    pub fn tier(&self, key: PrizeTierKey) -> Option<&TierDefinition> {
        self.tiers.iter().find(|t| t.key == key)
    }
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            generic_titles: defaults::generic_titles(),
            heading_max_chars: defaults::heading_max_chars(),
            placeholder: defaults::placeholder(),
            min_winner_len: defaults::min_winner_len(),
            tiers: defaults::tiers(),
            lottery_names: defaults::lottery_names(),
        }
    }
}

/// One prize tier with its fixed amount and the labels that announce it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TierDefinition {
    pub key: PrizeTierKey,

    /// Display label written to output
    pub label: String,

    /// Fixed prize amount in rupees
    pub amount: u64,

    /// Substrings that mark a heading line for this tier
    pub variants: Vec<String>,
}

/// Mapping from lottery code to canonical name.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LotteryName {
    pub code: String,
    pub name: String,
}

/// Output and cache locations, relative to the storage directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    #[serde(default = "defaults::note_dir")]
    pub note_dir: String,

    #[serde(default = "defaults::manifest_file")]
    pub manifest_file: String,

    #[serde(default = "defaults::history_file")]
    pub history_file: String,

    /// Latest pointer file name inside `note_dir`
    #[serde(default = "defaults::latest_file")]
    pub latest_file: String,

    #[serde(default = "defaults::cache_dir")]
    pub cache_dir: String,

    /// Public raw-content base that per-draw files are served from
    #[serde(default = "defaults::raw_base_url")]
    pub raw_base_url: String,
}

impl PathsConfig {
    pub fn cache_path(&self, root: &Path) -> PathBuf {
        root.join(&self.cache_dir)
    }
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            note_dir: defaults::note_dir(),
            manifest_file: defaults::manifest_file(),
            history_file: defaults::history_file(),
            latest_file: defaults::latest_file(),
            cache_dir: defaults::cache_dir(),
            raw_base_url: defaults::raw_base_url(),
        }
    }
}

mod defaults {
    use super::{LotteryName, TierDefinition};
    use crate::models::PrizeTierKey;

    // Fetcher defaults
    pub fn user_agents() -> Vec<String> {
        vec![
            "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36".into(),
            "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:120.0) Gecko/20100101 Firefox/120.0".into(),
            "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36".into(),
        ]
    }
    pub fn referer() -> String {
        "https://www.kllotteryresult.com/".into()
    }
    pub fn timeout() -> u64 {
        20
    }
    pub fn text_proxy_timeout() -> u64 {
        30
    }
    pub fn max_retries() -> u32 {
        3
    }
    pub fn max_backoff() -> u64 {
        10
    }
    pub fn request_delay() -> u64 {
        1000
    }
    pub fn page_cache_ttl() -> u64 {
        6 * 3600
    }
    pub fn link_cache_ttl() -> u64 {
        3600
    }

    // Proxy defaults
    pub fn proxy_endpoint() -> String {
        "http://api.scraperapi.com".into()
    }
    pub fn text_proxy_prefix() -> String {
        "https://r.jina.ai/http://".into()
    }

    // Discovery defaults
    pub fn listing_url() -> String {
        "https://www.kllotteryresult.com/".into()
    }
    pub fn result_path_prefix() -> String {
        "/kerala-lottery-result-".into()
    }
    pub fn next_link_pattern() -> String {
        "Older Posts|Next".into()
    }
    pub fn max_listing_pages() -> usize {
        20
    }
    pub fn recent_window_days() -> i64 {
        15
    }
    pub fn future_grace_days() -> i64 {
        1
    }

    // Extraction defaults
    pub fn generic_titles() -> Vec<String> {
        vec!["lottery results".into(), "kerala lottery results".into()]
    }
    pub fn heading_max_chars() -> usize {
        40
    }
    pub fn placeholder() -> String {
        "Please wait, results will be published at 3 PM.".into()
    }
    pub fn min_winner_len() -> usize {
        4
    }

    fn tier(key: PrizeTierKey, label: &str, amount: u64, variants: &[&str]) -> TierDefinition {
        TierDefinition {
            key,
            label: label.to_string(),
            amount,
            variants: variants.iter().map(|v| v.to_string()).collect(),
        }
    }

    pub fn tiers() -> Vec<TierDefinition> {
        vec![
            tier(PrizeTierKey::First, "1st Prize", 10_000_000, &["1st Prize", "1st"]),
            tier(
                PrizeTierKey::Consolation,
                "Consolation Prize",
                5_000,
                &["Consolation Prize", "Consolation", "Cons Prize-Rs", "Cons Prize", "Cons"],
            ),
            tier(PrizeTierKey::Second, "2nd Prize", 3_000_000, &["2nd Prize", "2nd"]),
            tier(PrizeTierKey::Third, "3rd Prize", 500_000, &["3rd Prize", "3rd"]),
            tier(PrizeTierKey::Fourth, "4th Prize", 5_000, &["4th Prize", "4th"]),
            tier(PrizeTierKey::Fifth, "5th Prize", 2_000, &["5th Prize", "5th"]),
            tier(PrizeTierKey::Sixth, "6th Prize", 1_000, &["6th Prize", "6th"]),
            tier(PrizeTierKey::Seventh, "7th Prize", 500, &["7th Prize", "7th"]),
            tier(PrizeTierKey::Eighth, "8th Prize", 200, &["8th Prize", "8th"]),
            tier(PrizeTierKey::Ninth, "9th Prize", 100, &["9th Prize", "9th"]),
        ]
    }

    pub fn lottery_names() -> Vec<LotteryName> {
        [
            ("AK", "AKSHAYA"),
            ("BT", "BHAGYATHARA"),
            ("DL", "DHANALEKSHMI"),
            ("FF", "FIFTY FIFTY"),
            ("KN", "KARUNYA PLUS"),
            ("KR", "KARUNYA"),
            ("NR", "NIRMAL"),
            ("SK", "SUVARNA KERALAM"),
            ("SM", "SAMRUDHI"),
            ("SS", "STHREE SAKTHI"),
            ("WW", "WIN WIN"),
            ("BR", "BUMPER"),
        ]
        .into_iter()
        .map(|(code, name)| LotteryName {
            code: code.to_string(),
            name: name.to_string(),
        })
        .collect()
    }

    // Path defaults
    pub fn note_dir() -> String {
        "note".into()
    }
    pub fn manifest_file() -> String {
        "result_manifest.json".into()
    }
    pub fn history_file() -> String {
        "history.json".into()
    }
    pub fn latest_file() -> String {
        "latest.json".into()
    }
    pub fn cache_dir() -> String {
        "cache".into()
    }
    pub fn raw_base_url() -> String {
        "https://raw.githubusercontent.com/santhkhd/kerala_loto/main/note/".into()
    }
}

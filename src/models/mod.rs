// src/models/mod.rs

//! Domain models for the harvester.
//!
//! This module contains all data structures used throughout the application,
//! organized by their primary purpose.

mod collections;
mod config;
mod draw;

// Re-export all public types
pub use collections::{HistoryEntry, HistoryPrize, ManifestEntry, cmp_date_desc, raw_url};
pub use config::{
    Config, DiscoveryConfig, ExtractionConfig, FetcherConfig, LotteryName, PathsConfig,
    ProxyConfig, TierDefinition,
};
pub use draw::{
    DrawDate, DrawRecord, FilenameParts, PrizeMap, PrizeTier, PrizeTierKey, UNKNOWN_DATE,
    UNKNOWN_DRAW, derive_filename, parse_filename, strip_code_prefix,
};

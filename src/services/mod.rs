//! Service layer for the harvester.
//!
//! This module contains the business logic for:
//! - Resilient page fetching (`ResilientFetcher`)
//! - Result link discovery (`LinkDiscoverer`)
//! - Draw record extraction (`DrawExtractor`)

mod discovery;
mod extractor;
mod fetcher;

pub use discovery::{DatePolicy, DiscoveryMode, LinkDiscoverer};
pub use extractor::{DrawExtractor, OpenTier, commit_tier, is_noise};
pub use fetcher::{
    HttpTransport, RawResponse, ReqwestTransport, ResilientFetcher, proxy_url, text_proxy_url,
};

#[cfg(test)]
pub(crate) use fetcher::tests::{MockTransport, Responder, ok, status};

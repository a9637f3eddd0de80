pub mod config;
pub mod logging;

pub mod cancel;
pub mod driver;
pub mod error;
pub mod image_cache;
pub mod label;
pub mod metadata;
pub mod request;
pub mod resolver;
pub mod shield_table;
pub mod step;
pub mod transport;

use std::sync::Arc;

use crate::config::RoadshieldConfig;
use crate::image_cache::ImageCache;
use crate::resolver::ShieldResolver;
use crate::transport::CurlClient;

/// Builds a curl-backed resolver with an in-memory thumbnail cache from `cfg`.
pub fn resolver_from_config(cfg: &RoadshieldConfig) -> ShieldResolver {
    let http = Arc::new(CurlClient::new(cfg.curl_options()));
    let images = Arc::new(ImageCache::new(http.clone(), cfg.image_cache_options()));
    ShieldResolver::new(cfg.lookup_table(), cfg.endpoint(), http, images)
}

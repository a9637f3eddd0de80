use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::image_cache::ImageCacheOptions;
use crate::request::{MetadataEndpoint, DEFAULT_API_ENDPOINT, DEFAULT_MAX_AGE_SECS};
use crate::shield_table::ShieldLookupTable;
use crate::transport::CurlOptions;

/// Global configuration loaded from `~/.config/roadshield/config.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoadshieldConfig {
    /// Commons API endpoint used for `imageinfo` queries.
    pub api_endpoint: String,
    /// `maxage` (seconds) sent with every metadata query.
    pub max_age_secs: u64,
    /// Shield height in points for street labels.
    pub label_height_pt: f64,
    /// Display pixels per point.
    pub display_scale: f64,
    /// Curl connect timeout in seconds.
    pub connect_timeout_secs: u64,
    /// Curl total transfer timeout in seconds.
    pub request_timeout_secs: u64,
    /// Thumbnails larger than this many pixels on either side are scaled down (0 = never).
    pub max_image_dimension: u32,
    /// Number of decoded thumbnails kept in memory.
    pub image_cache_capacity: usize,
    /// Extra or overriding network -> image-name templates (must contain `{ref}`).
    pub networks: BTreeMap<String, String>,
}

impl Default for RoadshieldConfig {
    fn default() -> Self {
        Self {
            api_endpoint: DEFAULT_API_ENDPOINT.to_string(),
            max_age_secs: DEFAULT_MAX_AGE_SECS,
            label_height_pt: 32.0,
            display_scale: 2.0,
            connect_timeout_secs: 15,
            request_timeout_secs: 30,
            max_image_dimension: 512,
            image_cache_capacity: 64,
            networks: BTreeMap::new(),
        }
    }
}

impl RoadshieldConfig {
    pub fn endpoint(&self) -> MetadataEndpoint {
        MetadataEndpoint::new(self.api_endpoint.clone(), self.max_age_secs)
    }

    pub fn lookup_table(&self) -> ShieldLookupTable {
        ShieldLookupTable::with_overrides(&self.networks)
    }

    pub fn curl_options(&self) -> CurlOptions {
        CurlOptions {
            connect_timeout: Duration::from_secs(self.connect_timeout_secs),
            timeout: Duration::from_secs(self.request_timeout_secs),
            ..CurlOptions::default()
        }
    }

    pub fn image_cache_options(&self) -> ImageCacheOptions {
        ImageCacheOptions {
            capacity: self.image_cache_capacity,
            max_dimension: (self.max_image_dimension > 0).then_some(self.max_image_dimension),
        }
    }

    /// Shield height in pixels for street labels.
    pub fn label_height_px(&self) -> f64 {
        self.label_height_pt * self.display_scale
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("roadshield")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<RoadshieldConfig> {
    load_or_init_at(&config_path()?)
}

/// Like `load_or_init` for an explicit path.
pub fn load_or_init_at(path: &Path) -> Result<RoadshieldConfig> {
    if !path.exists() {
        let default_cfg = RoadshieldConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, toml).with_context(|| format!("write {}", path.display()))?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }

    let data = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: RoadshieldConfig =
        toml::from_str(&data).with_context(|| format!("parse {}", path.display()))?;
    Ok(cfg)
}

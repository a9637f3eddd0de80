//! Shield requests and metadata-query URL construction.

use url::form_urlencoded;

/// Default Wikimedia Commons API endpoint.
pub const DEFAULT_API_ENDPOINT: &str = "https://commons.wikimedia.org/w/api.php";

/// Default `maxage` (seconds) asked of the API's cache.
pub const DEFAULT_MAX_AGE_SECS: u64 = 86_400;

/// One shield to resolve: network code, route number, and target height in pixels.
#[derive(Debug, Clone, PartialEq)]
pub struct ShieldRequest {
    network: String,
    route_number: String,
    target_height_px: f64,
}

impl ShieldRequest {
    pub fn new(
        network: impl Into<String>,
        route_number: impl Into<String>,
        target_height_px: f64,
    ) -> Self {
        Self {
            network: network.into(),
            route_number: route_number.into(),
            target_height_px,
        }
    }

    /// Builds a request from a step road code such as `"US:I 90"`.
    ///
    /// The code is split on whitespace; the first component is the network and
    /// the second the route number. Codes with fewer than two components yield `None`.
    pub fn from_code(code: &str, target_height_px: f64) -> Option<Self> {
        let mut parts = code.split_whitespace();
        let network = parts.next()?;
        let number = parts.next()?;
        Some(Self::new(network, number, target_height_px))
    }

    pub fn network(&self) -> &str {
        &self.network
    }

    pub fn route_number(&self) -> &str {
        &self.route_number
    }

    pub fn target_height_px(&self) -> f64 {
        self.target_height_px
    }

    /// Target height rounded to the nearest whole pixel, at least 1.
    pub fn height_px(&self) -> u32 {
        let h = self.target_height_px.round();
        if h.is_finite() && h >= 1.0 {
            h.min(u32::MAX as f64) as u32
        } else {
            1
        }
    }
}

/// Where and how metadata queries are sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataEndpoint {
    base: String,
    max_age_secs: u64,
}

impl Default for MetadataEndpoint {
    fn default() -> Self {
        Self::new(DEFAULT_API_ENDPOINT, DEFAULT_MAX_AGE_SECS)
    }
}

impl MetadataEndpoint {
    pub fn new(base: impl Into<String>, max_age_secs: u64) -> Self {
        Self {
            base: base.into(),
            max_age_secs,
        }
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    /// `imageinfo` query URL for `File:<image_name>` scaled to `height_px`.
    ///
    /// The image name is percent-encoded; the rest of the query string is fixed.
    pub fn query_url(&self, image_name: &str, height_px: u32) -> String {
        let encoded: String = form_urlencoded::byte_serialize(image_name.as_bytes()).collect();
        format!(
            "{}?action=query&format=json&maxage={}&prop=imageinfo&titles=File%3A{}&iiprop=url%7Csize&iiurlheight={}",
            self.base, self.max_age_secs, encoded, height_px
        )
    }
}

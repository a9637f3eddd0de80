//! Error taxonomy for shield resolution.
//!
//! None of these cross the resolver boundary: the resolver logs them and
//! reports "no image" (or nothing at all, for superseded work).

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ShieldError {
    /// The lookup table has no template for this network.
    #[error("no shield template for network {0:?}")]
    UnsupportedNetwork(String),

    /// Curl reported an error (DNS, connect, timeout, ...).
    #[error("transport: {0}")]
    Transport(#[from] curl::Error),

    /// The server answered with a non-2xx status.
    #[error("HTTP {0}")]
    Http(u32),

    /// Metadata response was not JSON.
    #[error("expected a JSON response, got content type {0:?}")]
    NotJson(Option<String>),

    /// JSON failed to parse or lacked `query.pages.*.imageinfo[0].thumburl`.
    #[error("malformed metadata response: {0}")]
    MalformedResponse(String),

    /// Thumbnail bytes could not be decoded.
    #[error("image decode: {0}")]
    Image(#[from] image::ImageError),

    /// A blocking fetch task panicked or was aborted.
    #[error("fetch task failed: {0}")]
    Join(#[from] tokio::task::JoinError),

    /// Newer work superseded this fetch.
    #[error("fetch cancelled")]
    Cancelled,
}

impl ShieldError {
    /// Errors that are expected during normal operation and only worth a debug line.
    pub fn is_quiet(&self) -> bool {
        matches!(
            self,
            ShieldError::UnsupportedNetwork(_) | ShieldError::Cancelled
        )
    }
}

//! Blocking HTTP GET with cooperative cancellation.
//!
//! Uses the curl crate (libcurl). The resolver runs `HttpClient::get` on
//! tokio's blocking pool, the same way long transfers are kept off the async
//! workers elsewhere.

use std::str;
use std::time::Duration;

use crate::cancel::CancellationToken;
use crate::error::ShieldError;

/// Response body plus the two headers the pipeline cares about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u32,
    /// `Content-Type` as sent by the server, parameters included.
    pub content_type: Option<String>,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// True if the media type mentions JSON (`application/json`, `text/json; charset=utf-8`, ...).
    pub fn is_json(&self) -> bool {
        self.content_type
            .as_deref()
            .and_then(|ct| ct.split(';').next())
            .map(|essence| essence.trim().to_ascii_lowercase().contains("json"))
            .unwrap_or(false)
    }
}

/// Transport seam. Implemented by `CurlClient` and by test doubles.
pub trait HttpClient: Send + Sync + 'static {
    /// Performs a GET. Must return `ShieldError::Cancelled` promptly once
    /// `cancel` is set.
    fn get(&self, url: &str, cancel: &CancellationToken) -> Result<HttpResponse, ShieldError>;
}

/// Timeouts and identification for curl transfers.
#[derive(Debug, Clone)]
pub struct CurlOptions {
    pub connect_timeout: Duration,
    pub timeout: Duration,
    pub user_agent: String,
}

impl Default for CurlOptions {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(15),
            timeout: Duration::from_secs(30),
            user_agent: concat!("roadshield/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

/// libcurl-backed client; one Easy handle per request.
#[derive(Debug, Clone, Default)]
pub struct CurlClient {
    opts: CurlOptions,
}

impl CurlClient {
    pub fn new(opts: CurlOptions) -> Self {
        Self { opts }
    }
}

impl HttpClient for CurlClient {
    fn get(&self, url: &str, cancel: &CancellationToken) -> Result<HttpResponse, ShieldError> {
        if cancel.is_cancelled() {
            return Err(ShieldError::Cancelled);
        }

        let mut body: Vec<u8> = Vec::new();

        let mut easy = curl::easy::Easy::new();
        easy.url(url)?;
        easy.follow_location(true)?;
        easy.max_redirections(10)?;
        easy.connect_timeout(self.opts.connect_timeout)?;
        easy.timeout(self.opts.timeout)?;
        easy.useragent(&self.opts.user_agent)?;
        // Progress callbacks are off by default; they are our cancellation hook.
        easy.progress(true)?;

        {
            let mut transfer = easy.transfer();
            transfer.write_function(|data| {
                body.extend_from_slice(data);
                Ok(data.len())
            })?;
            transfer.progress_function(|_, _, _, _| !cancel.is_cancelled())?;
            if let Err(e) = transfer.perform() {
                if cancel.is_cancelled() || e.is_aborted_by_callback() {
                    return Err(ShieldError::Cancelled);
                }
                return Err(ShieldError::Transport(e));
            }
        }

        let status = easy.response_code()?;
        let content_type = easy.content_type()?.map(str::to_string);
        tracing::trace!(url, status, ?content_type, bytes = body.len(), "GET finished");

        Ok(HttpResponse {
            status,
            content_type,
            body,
        })
    }
}

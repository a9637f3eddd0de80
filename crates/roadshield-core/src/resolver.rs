//! Shield image resolver.
//!
//! Turns a `ShieldRequest` into a bitmap in two stages: a Commons `imageinfo`
//! metadata query, then a thumbnail download. At most one metadata query and
//! one thumbnail download are pending per resolver:
//!
//! - a request for the URL already pending joins it;
//! - a request for a different URL cancels the pending query first;
//! - a thumbnail URL that differs from the one downloading cancels the stale
//!   download first.
//!
//! Failures never escape: callers see `Resolution::NoImage` (or
//! `Resolution::Superseded` for cancelled work) and the cause is logged.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::watch;

use crate::cancel::CancellationToken;
use crate::error::ShieldError;
use crate::image_cache::{Bitmap, ImageDownloader};
use crate::metadata::{self, ThumbnailInfo};
use crate::request::{MetadataEndpoint, ShieldRequest};
use crate::shield_table::ShieldLookupTable;
use crate::transport::HttpClient;

/// A fetched shield.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedImage {
    /// Thumbnail URL the bitmap was downloaded from.
    pub url: String,
    pub bitmap: Arc<Bitmap>,
    /// Width the metadata API reported for the thumbnail.
    pub reported_width: Option<u32>,
    /// Height the metadata API reported for the thumbnail.
    pub reported_height: Option<u32>,
}

impl ResolvedImage {
    /// Natural size of the downloaded bitmap in pixels.
    pub fn pixel_size(&self) -> (u32, u32) {
        (self.bitmap.width(), self.bitmap.height())
    }

    /// Display size in points for a screen with `scale` pixels per point.
    pub fn presentation_size(&self, scale: f64) -> (f64, f64) {
        self.bitmap.presentation_size(scale)
    }
}

/// Terminal outcome of one resolve call.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    Ready(ResolvedImage),
    /// Unsupported network, transport failure, or unusable response.
    NoImage,
    /// Newer work cancelled this request. Callers should ignore it.
    Superseded,
}

impl Resolution {
    pub fn into_image(self) -> Option<ResolvedImage> {
        match self {
            Resolution::Ready(image) => Some(image),
            Resolution::NoImage | Resolution::Superseded => None,
        }
    }

    pub fn is_superseded(&self) -> bool {
        matches!(self, Resolution::Superseded)
    }
}

struct PendingQuery {
    id: u64,
    url: String,
    token: CancellationToken,
    /// `None` until the query finishes; the sender is dropped without a value
    /// when the query is superseded.
    outcome: watch::Receiver<Option<Resolution>>,
}

struct PendingDownload {
    url: String,
    token: CancellationToken,
}

#[derive(Default)]
struct ResolverState {
    next_id: u64,
    query: Option<PendingQuery>,
    download: Option<PendingDownload>,
}

struct Inner {
    table: ShieldLookupTable,
    endpoint: MetadataEndpoint,
    http: Arc<dyn HttpClient>,
    images: Arc<dyn ImageDownloader>,
    state: Mutex<ResolverState>,
}

/// Resolves road shields for one display surface. Cheap to clone; clones
/// share pending-work state.
///
/// Methods that start work spawn onto the current Tokio runtime and must be
/// called from within one.
#[derive(Clone)]
pub struct ShieldResolver {
    inner: Arc<Inner>,
}

impl ShieldResolver {
    /// `http` serves metadata queries; `images` downloads (and caches) thumbnails.
    pub fn new(
        table: ShieldLookupTable,
        endpoint: MetadataEndpoint,
        http: Arc<dyn HttpClient>,
        images: Arc<dyn ImageDownloader>,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                table,
                endpoint,
                http,
                images,
                state: Mutex::new(ResolverState::default()),
            }),
        }
    }

    pub fn table(&self) -> &ShieldLookupTable {
        &self.inner.table
    }

    /// Metadata query URL for `request`, or `None` if its network is unsupported.
    pub fn query_url(&self, request: &ShieldRequest) -> Option<String> {
        let image_name = self
            .inner
            .table
            .image_name(request.network(), request.route_number())?;
        Some(self.inner.endpoint.query_url(&image_name, request.height_px()))
    }

    /// Resolves `request`, joining or superseding pending work as needed.
    pub async fn resolve(&self, request: &ShieldRequest) -> Resolution {
        let Some(url) = self.query_url(request) else {
            let err = ShieldError::UnsupportedNetwork(request.network().to_string());
            tracing::debug!(route = request.route_number(), "{}", err);
            return Resolution::NoImage;
        };
        let (outcome, _) = self.begin_query(url);
        wait_for_outcome(outcome).await
    }

    /// Callback form of `resolve`. `on_complete` receives the image (or `None`
    /// on failure) and is never called for superseded or cancelled work.
    ///
    /// The returned token cancels the underlying metadata query.
    pub fn resolve_with<F>(&self, request: ShieldRequest, on_complete: F) -> CancellationToken
    where
        F: FnOnce(Option<ResolvedImage>) + Send + 'static,
    {
        let Some(url) = self.query_url(&request) else {
            tracing::debug!(network = request.network(), "no shield template for network");
            on_complete(None);
            return CancellationToken::new();
        };
        let (outcome, token) = self.begin_query(url);
        tokio::spawn(async move {
            match wait_for_outcome(outcome).await {
                Resolution::Ready(image) => on_complete(Some(image)),
                Resolution::NoImage => on_complete(None),
                Resolution::Superseded => {
                    tracing::trace!(route = request.route_number(), "shield request superseded")
                }
            }
        });
        token
    }

    /// Cancels any pending metadata query and thumbnail download.
    pub fn cancel_all(&self) {
        let mut state = self.inner.lock();
        if let Some(query) = state.query.take() {
            query.token.cancel();
        }
        if let Some(download) = state.download.take() {
            download.token.cancel();
        }
    }

    /// Joins the pending query for `url`, or cancels it and starts a new one.
    fn begin_query(&self, url: String) -> (watch::Receiver<Option<Resolution>>, CancellationToken) {
        let mut state = self.inner.lock();
        if let Some(pending) = state.query.as_ref() {
            if pending.url == url && !pending.token.is_cancelled() {
                tracing::debug!(%url, "joining pending shield query");
                return (pending.outcome.clone(), pending.token.clone());
            }
        }
        if let Some(stale) = state.query.take() {
            tracing::debug!(url = %stale.url, "cancelling superseded shield query");
            stale.token.cancel();
        }

        let id = state.next_id;
        state.next_id += 1;
        let token = CancellationToken::new();
        let (tx, rx) = watch::channel(None);
        state.query = Some(PendingQuery {
            id,
            url: url.clone(),
            token: token.clone(),
            outcome: rx.clone(),
        });
        drop(state);

        let inner = Arc::clone(&self.inner);
        let query_token = token.clone();
        tokio::spawn(async move {
            inner.run_query(id, url, query_token, tx).await;
        });
        (rx, token)
    }
}

impl Inner {
    fn lock(&self) -> MutexGuard<'_, ResolverState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn run_query(
        self: Arc<Self>,
        id: u64,
        url: String,
        token: CancellationToken,
        tx: watch::Sender<Option<Resolution>>,
    ) {
        let result = self.fetch_shield(&url, &token).await;

        // Superseding happens under this lock, so the token check here is final.
        let mut state = self.lock();
        let is_current = state.query.as_ref().map(|q| q.id) == Some(id);
        let superseded = token.is_cancelled()
            || !is_current
            || matches!(&result, Err(e) if e.is_quiet());
        if superseded {
            if is_current {
                state.query = None;
            }
            tracing::debug!(%url, "shield query superseded");
            // Dropping `tx` without a value tells waiters they were superseded.
            return;
        }

        match result {
            Ok(image) => {
                // The completed query stays current so repeated requests for
                // the same URL reuse its result.
                let _ = tx.send(Some(Resolution::Ready(image)));
            }
            Err(e) => {
                tracing::warn!(%url, error = %e, "shield resolution failed");
                // Failures are not remembered; the next request retries.
                state.query = None;
                let _ = tx.send(Some(Resolution::NoImage));
            }
        }
    }

    async fn fetch_shield(
        &self,
        url: &str,
        token: &CancellationToken,
    ) -> Result<ResolvedImage, ShieldError> {
        let http = Arc::clone(&self.http);
        let query_url = url.to_string();
        let query_token = token.clone();
        let response =
            tokio::task::spawn_blocking(move || http.get(&query_url, &query_token)).await??;
        if token.is_cancelled() {
            return Err(ShieldError::Cancelled);
        }

        let thumb: ThumbnailInfo = metadata::parse_response(&response)?;
        tracing::debug!(query = url, thumbnail = %thumb.url, "shield metadata resolved");

        let download_token = self.begin_download(&thumb.url);
        let images = Arc::clone(&self.images);
        let thumb_url = thumb.url.clone();
        let bitmap_token = download_token.clone();
        let result =
            tokio::task::spawn_blocking(move || images.download_image(&thumb_url, &bitmap_token))
                .await;
        self.end_download(&thumb.url, &download_token);
        let bitmap = result??;

        Ok(ResolvedImage {
            url: thumb.url,
            bitmap,
            reported_width: thumb.width,
            reported_height: thumb.height,
        })
    }

    /// Registers a thumbnail download for `url`, cancelling a stale one for a
    /// different URL. A download already running for `url` keeps its token.
    fn begin_download(&self, url: &str) -> CancellationToken {
        let mut state = self.lock();
        if let Some(current) = state.download.as_ref() {
            if current.url == url && !current.token.is_cancelled() {
                return current.token.clone();
            }
        }
        if let Some(stale) = state.download.take() {
            tracing::debug!(url = %stale.url, "cancelling stale shield thumbnail download");
            stale.token.cancel();
        }
        let token = CancellationToken::new();
        state.download = Some(PendingDownload {
            url: url.to_string(),
            token: token.clone(),
        });
        token
    }

    fn end_download(&self, url: &str, token: &CancellationToken) {
        let mut state = self.lock();
        let finished = state
            .download
            .as_ref()
            .map(|d| d.url == url && d.token.same_as(token))
            .unwrap_or(false);
        if finished {
            state.download = None;
        }
    }
}

async fn wait_for_outcome(mut outcome: watch::Receiver<Option<Resolution>>) -> Resolution {
    match outcome.wait_for(Option::is_some).await {
        Ok(value) => value.clone().unwrap_or(Resolution::Superseded),
        Err(_) => Resolution::Superseded,
    }
}

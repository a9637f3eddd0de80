//! Thumbnail downloader with an in-memory, URL-keyed bitmap cache.
//!
//! The resolver only depends on the `ImageDownloader` trait; `ImageCache` is
//! the production implementation on top of any `HttpClient`.

use image::imageops::FilterType;
use image::RgbaImage;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, PoisonError};

use crate::cancel::CancellationToken;
use crate::error::ShieldError;
use crate::transport::HttpClient;

/// Decoded RGBA bitmap.
#[derive(Debug, Clone, PartialEq)]
pub struct Bitmap {
    pixels: RgbaImage,
}

impl Bitmap {
    pub fn new(pixels: RgbaImage) -> Self {
        Self { pixels }
    }

    /// Decodes PNG/JPEG/GIF bytes.
    pub fn decode(bytes: &[u8]) -> Result<Self, ShieldError> {
        Ok(Self::new(image::load_from_memory(bytes)?.to_rgba8()))
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    pub fn pixels(&self) -> &RgbaImage {
        &self.pixels
    }

    /// Size in display points: pixel size divided by `scale` (pixels per point).
    pub fn presentation_size(&self, scale: f64) -> (f64, f64) {
        let scale = if scale.is_finite() && scale > 0.0 { scale } else { 1.0 };
        (
            f64::from(self.width()) / scale,
            f64::from(self.height()) / scale,
        )
    }

    /// Shrinks the bitmap so neither side exceeds `max_dimension`, keeping aspect ratio.
    /// Smaller bitmaps are returned unchanged.
    pub fn scaled_down(self, max_dimension: u32) -> Self {
        let (w, h) = (self.width(), self.height());
        if max_dimension == 0 || (w <= max_dimension && h <= max_dimension) {
            return self;
        }
        let ratio = f64::from(max_dimension) / f64::from(w.max(h));
        let nw = ((f64::from(w) * ratio).round() as u32).max(1);
        let nh = ((f64::from(h) * ratio).round() as u32).max(1);
        Self::new(image::imageops::resize(&self.pixels, nw, nh, FilterType::Triangle))
    }

    /// Encodes as PNG (for writing a resolved shield to disk).
    pub fn to_png(&self) -> Result<Vec<u8>, ShieldError> {
        let mut out = std::io::Cursor::new(Vec::new());
        self.pixels.write_to(&mut out, image::ImageFormat::Png)?;
        Ok(out.into_inner())
    }
}

/// Downloader seam used by the resolver for thumbnails.
pub trait ImageDownloader: Send + Sync + 'static {
    /// Fetches and decodes `url`. Must honor `cancel` like `HttpClient::get`.
    fn download_image(
        &self,
        url: &str,
        cancel: &CancellationToken,
    ) -> Result<Arc<Bitmap>, ShieldError>;
}

/// Cache tuning.
#[derive(Debug, Clone, Copy)]
pub struct ImageCacheOptions {
    /// Maximum number of bitmaps kept; the oldest entry is evicted first.
    pub capacity: usize,
    /// Bitmaps larger than this (either side, pixels) are scaled down. `None` keeps them as-is.
    pub max_dimension: Option<u32>,
}

impl Default for ImageCacheOptions {
    fn default() -> Self {
        Self {
            capacity: 64,
            max_dimension: Some(512),
        }
    }
}

#[derive(Default)]
struct Entries {
    by_url: HashMap<String, Arc<Bitmap>>,
    order: VecDeque<String>,
}

/// `ImageDownloader` that remembers decoded bitmaps by URL.
pub struct ImageCache {
    client: Arc<dyn HttpClient>,
    opts: ImageCacheOptions,
    entries: Mutex<Entries>,
}

impl ImageCache {
    pub fn new(client: Arc<dyn HttpClient>, opts: ImageCacheOptions) -> Self {
        Self {
            client,
            opts,
            entries: Mutex::new(Entries::default()),
        }
    }

    /// Cached bitmap for `url`, if any.
    pub fn get(&self, url: &str) -> Option<Arc<Bitmap>> {
        self.lock().by_url.get(url).cloned()
    }

    pub fn len(&self) -> usize {
        self.lock().by_url.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn insert(&self, url: &str, bitmap: Arc<Bitmap>) {
        if self.opts.capacity == 0 {
            return;
        }
        let mut entries = self.lock();
        if entries.by_url.insert(url.to_string(), bitmap).is_none() {
            entries.order.push_back(url.to_string());
        }
        while entries.order.len() > self.opts.capacity {
            if let Some(oldest) = entries.order.pop_front() {
                entries.by_url.remove(&oldest);
            }
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Entries> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl ImageDownloader for ImageCache {
    fn download_image(
        &self,
        url: &str,
        cancel: &CancellationToken,
    ) -> Result<Arc<Bitmap>, ShieldError> {
        if let Some(hit) = self.get(url) {
            tracing::debug!(url, "shield thumbnail cache hit");
            return Ok(hit);
        }

        let response = self.client.get(url, cancel)?;
        if !response.is_success() {
            return Err(ShieldError::Http(response.status));
        }
        let mut bitmap = Bitmap::decode(&response.body)?;
        if let Some(max) = self.opts.max_dimension {
            bitmap = bitmap.scaled_down(max);
        }
        if cancel.is_cancelled() {
            return Err(ShieldError::Cancelled);
        }

        let bitmap = Arc::new(bitmap);
        self.insert(url, Arc::clone(&bitmap));
        tracing::debug!(
            url,
            width = bitmap.width(),
            height = bitmap.height(),
            "shield thumbnail downloaded"
        );
        Ok(bitmap)
    }
}

//! `roadshield resolve` – fetch one shield and report its size.

use anyhow::{Context, Result};
use roadshield_core::config::RoadshieldConfig;
use roadshield_core::request::ShieldRequest;
use roadshield_core::resolver_from_config;
use std::path::Path;

pub async fn run_resolve(
    cfg: &RoadshieldConfig,
    network: &str,
    number: &str,
    height_pt: Option<f64>,
    scale: Option<f64>,
    out: Option<&Path>,
) -> Result<()> {
    let scale = scale.unwrap_or(cfg.display_scale);
    let height_px = height_pt.unwrap_or(cfg.label_height_pt) * scale;
    let request = ShieldRequest::new(network, number, height_px);
    let resolver = resolver_from_config(cfg);

    let Some(image) = resolver.resolve(&request).await.into_image() else {
        println!("No shield for {} {}.", network, number);
        return Ok(());
    };

    let (w, h) = image.pixel_size();
    let (pw, ph) = image.presentation_size(scale);
    println!("{}", image.url);
    println!("{w}x{h} px, {pw}x{ph} pt at scale {scale}");

    if let Some(path) = out {
        let png = image.bitmap.to_png()?;
        std::fs::write(path, png).with_context(|| format!("write {}", path.display()))?;
        println!("Wrote {}", path.display());
    }
    Ok(())
}

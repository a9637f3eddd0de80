//! `roadshield replay` – feed recorded step-progress events through the label driver.

use anyhow::{Context, Result};
use roadshield_core::config::RoadshieldConfig;
use roadshield_core::driver::{LabelDriver, LabelFrame};
use roadshield_core::label::LabelComposer;
use roadshield_core::resolver_from_config;
use roadshield_core::step::StepProgress;
use std::path::Path;
use tokio::sync::mpsc;

pub async fn run_replay(cfg: &RoadshieldConfig, path: &Path) -> Result<()> {
    let data = std::fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let events: Vec<StepProgress> =
        serde_json::from_str(&data).with_context(|| format!("parse {}", path.display()))?;
    tracing::info!(events = events.len(), "replaying step events from {}", path.display());

    let driver = LabelDriver::new(
        resolver_from_config(cfg),
        LabelComposer::new(cfg.label_height_pt, cfg.display_scale),
        cfg.display_scale,
    );
    let (step_tx, step_rx) = mpsc::channel(16);
    let (frame_tx, mut frame_rx) = mpsc::channel(16);
    let task = tokio::spawn(driver.run(step_rx, frame_tx));

    let feeder = tokio::spawn(async move {
        for event in events {
            if step_tx.send(event).await.is_err() {
                break;
            }
        }
    });

    while let Some(frame) = frame_rx.recv().await {
        print_frame(&frame);
    }
    feeder.await.context("step feeder")?;
    task.await.context("label driver")?;
    Ok(())
}

fn print_frame(frame: &LabelFrame) {
    match frame {
        LabelFrame::Text(label) => {
            let distance = label.distance.as_deref().unwrap_or("-");
            let slot = if label.shield_slot { " [shield]" } else { "" };
            println!("{:<8} {}{}", distance, label.text.replace('\n', " / "), slot);
        }
        LabelFrame::Shield {
            label,
            image_url,
            pixel_size,
            presentation_size,
        } => {
            println!(
                "{:<8} {}<- {} ({}x{} px, {}x{} pt)",
                "shield",
                label.text.replace('\n', " / "),
                image_url,
                pixel_size.0,
                pixel_size.1,
                presentation_size.0,
                presentation_size.1
            );
        }
    }
}

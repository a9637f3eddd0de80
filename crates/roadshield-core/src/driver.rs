//! Label driver: the owner loop between step events and the banner.
//!
//! Consumes `StepProgress` events from a channel, composes the street label,
//! asks the resolver for a shield when the label text changes, and emits
//! `LabelFrame`s on an output channel. Shield completions come back through
//! the same loop, so the consumer sees one ordered sequence of updates.

use tokio::sync::mpsc;

use crate::label::{LabelComposer, StreetLabel};
use crate::resolver::{Resolution, ShieldResolver};
use crate::step::StepProgress;

/// A banner update.
#[derive(Debug, Clone, PartialEq)]
pub enum LabelFrame {
    /// Text (and distance) changed.
    Text(StreetLabel),
    /// A shield image arrived for the label currently shown.
    Shield {
        label: StreetLabel,
        image_url: String,
        pixel_size: (u32, u32),
        /// Size in points at the driver's display scale.
        presentation_size: (f64, f64),
    },
}

pub struct LabelDriver {
    resolver: ShieldResolver,
    composer: LabelComposer,
    display_scale: f64,
    displayed: Option<StreetLabel>,
}

impl LabelDriver {
    pub fn new(resolver: ShieldResolver, composer: LabelComposer, display_scale: f64) -> Self {
        Self {
            resolver,
            composer,
            display_scale,
            displayed: None,
        }
    }

    /// Runs until `steps` closes and every outstanding shield request has
    /// settled, or until `frames` is dropped.
    pub async fn run(
        mut self,
        mut steps: mpsc::Receiver<StepProgress>,
        frames: mpsc::Sender<LabelFrame>,
    ) {
        let (done_tx, mut done_rx) = mpsc::unbounded_channel::<(String, Resolution)>();
        let mut done_tx = Some(done_tx);

        loop {
            tokio::select! {
                step = steps.recv(), if done_tx.is_some() => match step {
                    Some(progress) => {
                        let Some(tx) = done_tx.as_ref() else { continue };
                        if let Some(frame) = self.on_progress(&progress, tx) {
                            if frames.send(frame).await.is_err() {
                                self.resolver.cancel_all();
                                return;
                            }
                        }
                    }
                    None => {
                        tracing::debug!("step events closed; draining shield requests");
                        done_tx = None;
                    }
                },
                done = done_rx.recv() => match done {
                    Some((text, resolution)) => {
                        if let Some(frame) = self.on_shield(&text, resolution) {
                            if frames.send(frame).await.is_err() {
                                self.resolver.cancel_all();
                                return;
                            }
                        }
                    }
                    None => break,
                },
            }
        }
    }

    fn on_progress(
        &mut self,
        progress: &StepProgress,
        done_tx: &mpsc::UnboundedSender<(String, Resolution)>,
    ) -> Option<LabelFrame> {
        let plan = self.composer.compose(progress, self.displayed.as_ref());

        if let Some(request) = plan.shield {
            let resolver = self.resolver.clone();
            let tx = done_tx.clone();
            let text = plan.label.text.clone();
            tracing::debug!(
                network = request.network(),
                route = request.route_number(),
                "requesting shield for street label"
            );
            tokio::spawn(async move {
                let resolution = resolver.resolve(&request).await;
                let _ = tx.send((text, resolution));
            });
        }

        if self.displayed.as_ref() == Some(&plan.label) {
            return None;
        }
        self.displayed = Some(plan.label.clone());
        Some(LabelFrame::Text(plan.label))
    }

    fn on_shield(&mut self, text: &str, resolution: Resolution) -> Option<LabelFrame> {
        let image = resolution.into_image()?;
        let label = self.displayed.as_ref()?;
        if !label.shield_slot || label.text != text {
            tracing::debug!(text, "dropping shield for a label no longer shown");
            return None;
        }
        Some(LabelFrame::Shield {
            label: label.clone(),
            pixel_size: image.pixel_size(),
            presentation_size: image.presentation_size(self.display_scale),
            image_url: image.url,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cancel::CancellationToken;
    use crate::error::ShieldError;
    use crate::image_cache::{Bitmap, ImageDownloader};
    use crate::request::MetadataEndpoint;
    use crate::shield_table::ShieldLookupTable;
    use crate::step::UpcomingStep;
    use crate::transport::{HttpClient, HttpResponse};
    use image::RgbaImage;
    use std::sync::{Arc, Mutex};

    /// Answers every query with a thumbnail named after the requested file.
    #[derive(Default)]
    struct Commons {
        calls: Mutex<Vec<String>>,
    }

    impl HttpClient for Commons {
        fn get(&self, url: &str, _cancel: &CancellationToken) -> Result<HttpResponse, ShieldError> {
            self.calls.lock().unwrap().push(url.to_string());
            let file = url
                .split("titles=File%3A")
                .nth(1)
                .and_then(|rest| rest.split('&').next())
                .unwrap_or("unknown");
            let body = format!(
                r#"{{"query":{{"pages":{{"1":{{"imageinfo":[{{"thumburl":"https://thumbs.test/{file}.png"}}]}}}}}}}}"#
            );
            Ok(HttpResponse {
                status: 200,
                content_type: Some("application/json".into()),
                body: body.into_bytes(),
            })
        }
    }

    struct Thumbs;

    impl ImageDownloader for Thumbs {
        fn download_image(
            &self,
            _url: &str,
            _cancel: &CancellationToken,
        ) -> Result<Arc<Bitmap>, ShieldError> {
            Ok(Arc::new(Bitmap::new(RgbaImage::new(90, 64))))
        }
    }

    fn step(name: &str, code: &str) -> StepProgress {
        StepProgress {
            step: UpcomingStep {
                names: vec![name.into()],
                codes: vec![code.into()],
                instructions: format!("Turn onto {name}"),
                ..Default::default()
            },
            seconds_remaining: 60.0,
            distance_remaining_m: 500.0,
            arriving: false,
        }
    }

    async fn drive(events: Vec<StepProgress>) -> (Vec<LabelFrame>, Vec<String>) {
        let commons = Arc::new(Commons::default());
        let resolver = ShieldResolver::new(
            ShieldLookupTable::builtin(),
            MetadataEndpoint::default(),
            Arc::clone(&commons) as Arc<dyn HttpClient>,
            Arc::new(Thumbs),
        );
        let driver = LabelDriver::new(resolver, LabelComposer::new(32.0, 2.0), 2.0);
        let (step_tx, step_rx) = mpsc::channel(16);
        let (frame_tx, mut frame_rx) = mpsc::channel(16);
        let task = tokio::spawn(driver.run(step_rx, frame_tx));
        for event in events {
            step_tx.send(event).await.unwrap();
        }
        drop(step_tx);
        let mut frames = Vec::new();
        while let Some(frame) = frame_rx.recv().await {
            frames.push(frame);
        }
        task.await.unwrap();
        let calls = commons.calls.lock().unwrap().clone();
        (frames, calls)
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn text_then_shield_frame() {
        let (frames, calls) = drive(vec![step("Interstate 90", "US:I 90")]).await;
        assert_eq!(calls.len(), 1);
        assert_eq!(frames.len(), 2, "{frames:?}");
        match &frames[0] {
            LabelFrame::Text(label) => assert_eq!(label.text, "Interstate 90 "),
            other => panic!("expected text frame, got {other:?}"),
        }
        match &frames[1] {
            LabelFrame::Shield {
                label,
                image_url,
                pixel_size,
                presentation_size,
            } => {
                assert_eq!(label.text, "Interstate 90 ");
                assert_eq!(image_url, "https://thumbs.test/I-90.svg.png");
                assert_eq!(*pixel_size, (90, 64));
                assert_eq!(*presentation_size, (45.0, 32.0));
            }
            other => panic!("expected shield frame, got {other:?}"),
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn repeated_progress_requests_once() {
        let mut later = step("Interstate 90", "US:I 90");
        later.distance_remaining_m = 300.0;
        let (frames, calls) = drive(vec![step("Interstate 90", "US:I 90"), later]).await;
        assert_eq!(calls.len(), 1);
        let texts = frames
            .iter()
            .filter(|f| matches!(f, LabelFrame::Text(_)))
            .count();
        assert_eq!(texts, 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn unsupported_network_emits_text_only() {
        let (frames, calls) = drive(vec![step("Autobahn 7", "DE:BAB 7")]).await;
        assert!(calls.is_empty());
        assert_eq!(frames.len(), 1);
        assert!(matches!(&frames[0], LabelFrame::Text(l) if l.text == "Autobahn 7 "));
    }
}

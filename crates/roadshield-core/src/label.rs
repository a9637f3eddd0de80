//! Street-label composition for the maneuver banner.
//!
//! Decides what the banner shows for a progress update and whether a shield
//! image should be requested for it.

use crate::request::ShieldRequest;
use crate::step::StepProgress;

/// Below this many seconds to the maneuver the banner shows the instruction.
pub const INSTRUCTION_THRESHOLD_SECS: f64 = 5.0;

/// What the banner displays.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreetLabel {
    pub text: String,
    /// Formatted distance to the maneuver; `None` hides it.
    pub distance: Option<String>,
    /// True if the text ends in a slot for an inline shield image.
    pub shield_slot: bool,
}

/// Result of composing one progress update.
#[derive(Debug, Clone, PartialEq)]
pub struct LabelPlan {
    pub label: StreetLabel,
    /// Shield to fetch for the slot; only set when the label text changed.
    pub shield: Option<ShieldRequest>,
}

#[derive(Debug, Clone, Copy)]
pub struct LabelComposer {
    shield_height_px: f64,
}

impl LabelComposer {
    /// Shields are requested at `label_height_pt * display_scale` pixels.
    pub fn new(label_height_pt: f64, display_scale: f64) -> Self {
        Self {
            shield_height_px: label_height_pt * display_scale,
        }
    }

    pub fn shield_height_px(&self) -> f64 {
        self.shield_height_px
    }

    /// Composes the label for `progress`. `displayed` is what the banner shows now.
    pub fn compose(&self, progress: &StepProgress, displayed: Option<&StreetLabel>) -> LabelPlan {
        let step = &progress.step;

        if progress.arriving || progress.seconds_remaining < INSTRUCTION_THRESHOLD_SECS {
            return LabelPlan {
                label: StreetLabel {
                    text: step.instructions.clone(),
                    distance: None,
                    shield_slot: false,
                },
                shield: None,
            };
        }

        let distance = Some(format_distance(progress.distance_remaining_m));
        let name = step.display_name();

        if let (Some(name), Some(code)) = (name.as_deref(), step.primary_code()) {
            let label = StreetLabel {
                text: format!("{name} "),
                distance,
                shield_slot: true,
            };
            let changed = displayed.map(|d| d.text != label.text || !d.shield_slot).unwrap_or(true);
            let shield = if changed {
                ShieldRequest::from_code(code, self.shield_height_px)
            } else {
                None
            };
            return LabelPlan { label, shield };
        }

        LabelPlan {
            label: StreetLabel {
                text: name.unwrap_or_default(),
                distance,
                shield_slot: false,
            },
            shield: None,
        }
    }
}

/// Formats a distance for the banner: "850 m" below 1 km (rounded to 10 m), "1.2 km" above.
pub fn format_distance(meters: f64) -> String {
    let meters = meters.max(0.0);
    if meters >= 1000.0 {
        format!("{:.1} km", meters / 1000.0)
    } else {
        format!("{} m", (meters / 10.0).round() as i64 * 10)
    }
}

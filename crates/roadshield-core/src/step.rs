//! Upcoming-step data delivered by the route-progress notifier.
//!
//! Read-only input to label composition. Deserializable so step events can
//! be replayed from JSON.

use serde::{Deserialize, Serialize};

/// Direction of the maneuver at the end of a step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ManeuverDirection {
    Straight,
    SlightLeft,
    Left,
    SharpLeft,
    SlightRight,
    Right,
    SharpRight,
    UTurn,
}

/// An intersection along the step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Intersection {
    /// `[longitude, latitude]`.
    pub location: [f64; 2],
    /// Bearings of the roads meeting here, degrees clockwise from north.
    #[serde(default)]
    pub bearings: Vec<u16>,
}

/// The next maneuver of the active route.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UpcomingStep {
    /// Road names, most specific first.
    #[serde(default)]
    pub names: Vec<String>,
    /// Signed destinations (e.g. exit signage).
    #[serde(default)]
    pub destinations: Vec<String>,
    /// Road codes such as `"US:I 90"`.
    #[serde(default)]
    pub codes: Vec<String>,
    /// Spoken/written instruction for the maneuver.
    #[serde(default)]
    pub instructions: String,
    #[serde(default)]
    pub maneuver_direction: Option<ManeuverDirection>,
    #[serde(default)]
    pub intersections: Vec<Intersection>,
}

impl UpcomingStep {
    /// First road name, else the destinations joined with newlines.
    pub fn display_name(&self) -> Option<String> {
        if let Some(name) = self.names.first().filter(|n| !n.is_empty()) {
            return Some(name.clone());
        }
        if self.destinations.is_empty() {
            None
        } else {
            Some(self.destinations.join("\n"))
        }
    }

    /// First road code, if any.
    pub fn primary_code(&self) -> Option<&str> {
        self.codes.first().map(String::as_str).filter(|c| !c.is_empty())
    }
}

/// A route-progress update for the current leg.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StepProgress {
    pub step: UpcomingStep,
    /// Seconds until the maneuver.
    pub seconds_remaining: f64,
    /// Meters until the maneuver.
    pub distance_remaining_m: f64,
    /// True once the user is arriving at the destination.
    #[serde(default)]
    pub arriving: bool,
}

//! AQI heatmap scattered around the selected map coordinate.
//!
//! Points are drawn from a [`SeededRandom`] keyed on the mode (or the chosen
//! date in historical mode) plus the centre coordinate, so the same view
//! regenerates the same circles on every request.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::models::{Coordinates, HeatmapPoint};
use crate::services::aqi::AqiTheme;
use crate::services::seeded::{coordinate_seed, SeededRandom};

/// Circles drawn per heatmap.
pub const HEATMAP_POINTS: usize = 12;
/// Total spread of the scatter box in degrees (centre ± half of this).
const HEATMAP_SPREAD_DEG: f64 = 0.15;
/// Exclusive upper bound of scattered AQI values.
const HEATMAP_MAX_AQI: f64 = 250.0;
/// Seed prefix used in live mode.
const LIVE_SEED_PREFIX: &str = "live";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum HeatmapMode {
    Off,
    Live,
    Historical,
}

impl HeatmapMode {
    /// Toggle order: off → live → historical → off.
    pub fn next(self) -> Self {
        match self {
            HeatmapMode::Off => HeatmapMode::Live,
            HeatmapMode::Live => HeatmapMode::Historical,
            HeatmapMode::Historical => HeatmapMode::Off,
        }
    }

    /// Seed prefix for this mode, `None` when the heatmap is hidden.
    fn seed_prefix(self, date: NaiveDate) -> Option<String> {
        match self {
            HeatmapMode::Off => None,
            HeatmapMode::Live => Some(LIVE_SEED_PREFIX.to_string()),
            HeatmapMode::Historical => Some(date.format("%Y-%m-%d").to_string()),
        }
    }
}

/// Generate the heatmap for a mode, date and centre.
pub fn generate_heatmap(
    mode: HeatmapMode,
    date: NaiveDate,
    center: Coordinates,
) -> Vec<HeatmapPoint> {
    let Some(prefix) = mode.seed_prefix(date) else {
        return Vec::new();
    };

    let mut rng = SeededRandom::from_seed(&coordinate_seed(&prefix, center.lat, center.lng));

    (0..HEATMAP_POINTS)
        .map(|_| {
            let offset_lat = (rng.next_f64() - 0.5) * HEATMAP_SPREAD_DEG;
            let offset_lng = (rng.next_f64() - 0.5) * HEATMAP_SPREAD_DEG;
            let aqi = (rng.next_f64() * HEATMAP_MAX_AQI).floor() as u32;
            let theme = AqiTheme::for_aqi(aqi);
            HeatmapPoint {
                lat: center.lat + offset_lat,
                lng: center.lng + offset_lng,
                aqi,
                category: theme.category,
                color: theme.color,
            }
        })
        .collect()
}

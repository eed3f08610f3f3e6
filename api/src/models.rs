//! Domain types shared by the services and the HTTP layer.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::services::aqi::AqiCategory;

/// Carbon intensity assumed when a location carries none (gCO2/kWh).
pub const DEFAULT_CARBON_INTENSITY: f64 = 450.0;

/// A WGS84 coordinate pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

impl Coordinates {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }
}

/// Environmental readings for a coordinate, as produced by a metrics provider.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct EnvironmentalMetrics {
    pub aqi: u32,
    /// PM2.5 in µg/m³
    pub pm25: f64,
    /// NO2 in ppb
    pub no2: f64,
    /// Grid carbon intensity in gCO2/kWh
    pub carbon_intensity: Option<f64>,
}

/// The session's current location. Always replaced as a whole.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct LocationData {
    /// Display name (search text, place title, or a coordinate label)
    pub name: String,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    /// Air Quality Index
    pub aqi: u32,
    /// PM2.5 in µg/m³
    pub pm25: f64,
    /// NO2 in ppb
    pub no2: f64,
    /// Grid carbon intensity in gCO2/kWh
    #[serde(skip_serializing_if = "Option::is_none")]
    pub carbon_intensity: Option<f64>,
}

impl LocationData {
    pub fn from_metrics(
        name: impl Into<String>,
        coords: Coordinates,
        metrics: EnvironmentalMetrics,
    ) -> Self {
        Self {
            name: name.into(),
            lat: Some(coords.lat),
            lng: Some(coords.lng),
            aqi: metrics.aqi,
            pm25: metrics.pm25,
            no2: metrics.no2,
            carbon_intensity: metrics.carbon_intensity,
        }
    }

    pub fn coordinates(&self) -> Option<Coordinates> {
        match (self.lat, self.lng) {
            (Some(lat), Some(lng)) => Some(Coordinates { lat, lng }),
            _ => None,
        }
    }

    pub fn category(&self) -> AqiCategory {
        AqiCategory::from_aqi(self.aqi)
    }

    pub fn carbon_intensity_or_default(&self) -> f64 {
        self.carbon_intensity.unwrap_or(DEFAULT_CARBON_INTENSITY)
    }
}

impl Default for LocationData {
    fn default() -> Self {
        Self {
            name: "San Francisco, CA".to_string(),
            lat: Some(37.7749),
            lng: Some(-122.4194),
            aqi: 42,
            pm25: 12.4,
            no2: 8.2,
            carbon_intensity: None,
        }
    }
}

/// Household inputs to the footprint calculator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ImpactData {
    /// Number of air-conditioning units
    pub ac_units: u32,
    /// Daily fan usage in hours (0-24)
    pub fan_usage: f64,
    /// Energy source label, e.g. "Main Grid (Coal/Gas)"
    pub energy_source: String,
    /// Emission rate of the energy source in kg CO2/kWh
    pub co2_rate: f64,
    /// Measured gas levels
    pub gas_levels: f64,
}

impl Default for ImpactData {
    fn default() -> Self {
        Self {
            ac_units: 2,
            fan_usage: 8.0,
            energy_source: "Main Grid (Coal/Gas)".to_string(),
            co2_rate: 0.45,
            gas_levels: 0.0,
        }
    }
}

/// Percentage split of a footprint. Values need not sum to 100.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct Breakdown {
    pub ac_usage: f64,
    pub gas_emissions: f64,
    pub energy_source: f64,
}

/// Estimated yearly footprint.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct FootprintResult {
    /// Tonnes of CO2 per year, one decimal
    pub total_tons: f64,
    pub breakdown: Breakdown,
}

/// One day of the map history chart.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct HistoryPoint {
    /// Short weekday label, e.g. "Fri"
    pub date: String,
    /// Month/day label, e.g. "Oct 16"
    pub full_date: String,
    pub aqi: u32,
    /// Grid carbon intensity in gCO2/kWh
    pub carbon: u32,
}

/// Screens the client can show.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Screen {
    Dashboard,
    Map,
    Calculator,
    Results,
    Settings,
    Emergency,
    Profile,
}

/// The signed-in user shown on the profile screen.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct User {
    pub name: String,
    pub email: String,
    pub avatar: String,
    pub is_logged_in: bool,
}

impl Default for User {
    fn default() -> Self {
        Self {
            name: "Guest".to_string(),
            email: String::new(),
            avatar: String::new(),
            is_logged_in: false,
        }
    }
}

/// A place returned by grounded search, offered for disambiguation.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct GroundingCandidate {
    pub title: String,
    /// Link to the place on Google Maps
    pub uri: String,
    /// Coordinates parsed from the reply (calculator searches only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lat: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lng: Option<f64>,
    /// Grid emission factor in kg CO2/kWh (calculator searches only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub co2_factor: Option<f64>,
    /// Eco profile label (calculator searches only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub eco_profile: Option<String>,
}

/// Current conditions at a coordinate.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct WeatherSnapshot {
    pub temperature_c: f64,
    pub feels_like_c: f64,
    pub humidity_pct: f64,
    pub wind_speed_ms: f64,
    pub precipitation_mm: f64,
    /// WMO weather interpretation code
    pub weather_code: i32,
    /// Icon name, e.g. "sunny", "rainy"
    pub condition: String,
    /// Human-readable condition, e.g. "Partly Cloudy"
    pub condition_text: String,
}

/// A single scattered heatmap circle.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct HeatmapPoint {
    pub lat: f64,
    pub lng: f64,
    pub aqi: u32,
    pub category: AqiCategory,
    pub color: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_location() {
        let loc = LocationData::default();
        assert_eq!(loc.name, "San Francisco, CA");
        assert_eq!(loc.aqi, 42);
        assert_eq!(loc.category(), AqiCategory::Healthy);
        assert_eq!(loc.coordinates(), Some(Coordinates::new(37.7749, -122.4194)));
    }

    #[test]
    fn test_carbon_intensity_default_when_absent() {
        let loc = LocationData::default();
        assert_eq!(loc.carbon_intensity_or_default(), DEFAULT_CARBON_INTENSITY);

        let with = LocationData {
            carbon_intensity: Some(610.0),
            ..LocationData::default()
        };
        assert_eq!(with.carbon_intensity_or_default(), 610.0);
    }

    #[test]
    fn test_from_metrics_replaces_every_field() {
        let loc = LocationData::from_metrics(
            "Oslo",
            Coordinates::new(59.91, 10.75),
            EnvironmentalMetrics {
                aqi: 12,
                pm25: 3.4,
                no2: 1.2,
                carbon_intensity: None,
            },
        );
        assert_eq!(loc.name, "Oslo");
        assert_eq!(loc.lat, Some(59.91));
        assert_eq!(loc.lng, Some(10.75));
        assert_eq!(loc.aqi, 12);
        assert_eq!(loc.pm25, 3.4);
        assert_eq!(loc.no2, 1.2);
        assert_eq!(loc.carbon_intensity, None);
    }

    #[test]
    fn test_coordinates_missing() {
        let loc = LocationData {
            lat: None,
            ..LocationData::default()
        };
        assert_eq!(loc.coordinates(), None);
    }

    #[test]
    fn test_location_json_omits_absent_carbon() {
        let json = serde_json::to_value(LocationData::default()).unwrap();
        assert!(json.get("carbon_intensity").is_none());
        assert_eq!(json["aqi"], 42);
    }
}

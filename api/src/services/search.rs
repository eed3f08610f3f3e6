//! Prompt building and reply parsing for grounded place search.
//!
//! The model is asked to answer in a pipe-separated line such as
//! `LOCATION: Oslo | COORDS: [59.91, 10.75] | INTENSITY: 28 | PROFILE: Hydro Grid`.
//! Anything it returns that does not match is treated as "no result".

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::models::Coordinates;

/// Emission factor used when the reply carries no intensity (kg CO2/kWh).
pub const DEFAULT_CO2_FACTOR: f64 = 0.45;
/// Profile label used when the reply carries none.
pub const DEFAULT_ECO_PROFILE: &str = "Verified Grid";

static COORDS_PATTERN: LazyLock<Option<Regex>> = LazyLock::new(|| {
    // Matches: COORDS: [37.7749, -122.4194]
    Regex::new(r"(?i)COORDS:\s*\[\s*(-?\d+\.?\d*)\s*,\s*(-?\d+\.?\d*)\s*\]").ok()
});

static INTENSITY_PATTERN: LazyLock<Option<Regex>> = LazyLock::new(|| {
    // Matches: INTENSITY: 420 (gCO2/kWh)
    Regex::new(r"(?i)INTENSITY:\s*(\d+)").ok()
});

static PROFILE_PATTERN: LazyLock<Option<Regex>> = LazyLock::new(|| {
    // Matches: PROFILE: Hydro Heavy (up to the next pipe)
    Regex::new(r"(?i)PROFILE:\s*([^|]+)").ok()
});

/// Screen a search was issued from. Decides the prompt and how results apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum LookupScope {
    Dashboard,
    Map,
    Calculator,
}

/// Grid data parsed from a calculator reply.
#[derive(Debug, Clone, PartialEq)]
pub struct GridContext {
    /// kg CO2/kWh
    pub co2_factor: f64,
    pub eco_profile: String,
}

impl Default for GridContext {
    fn default() -> Self {
        Self {
            co2_factor: DEFAULT_CO2_FACTOR,
            eco_profile: DEFAULT_ECO_PROFILE.to_string(),
        }
    }
}

pub fn build_prompt(scope: LookupScope, query: &str) -> String {
    match scope {
        LookupScope::Dashboard => format!(
            "Locate precise coordinates and place info for: \"{}\". \
             Return in format: \"LOCATION: [Name] | COORDS: [LAT, LNG]\"",
            query
        ),
        LookupScope::Map => format!(
            "Locate precise coordinates and place details for: \"{}\". \
             Format: \"LOCATION: [Name] | COORDS: [LAT, LNG]\"",
            query
        ),
        LookupScope::Calculator => format!(
            "Find precise coordinates and carbon data for: \"{}\". \
             Determine regional grid carbon intensity (gCO2/kWh). \
             Format: \"LOCATION: [Name] | COORDS: [LAT, LNG] | INTENSITY: [Value] | PROFILE: [Eco Level]\"",
            query
        ),
    }
}

/// Title given to a grounded place that came back without one.
pub fn untitled_place(scope: LookupScope) -> &'static str {
    match scope {
        LookupScope::Map => "Found Area",
        LookupScope::Dashboard | LookupScope::Calculator => "Target Area",
    }
}

/// First `COORDS: [lat, lng]` in the reply.
pub fn parse_coordinates(text: &str) -> Option<Coordinates> {
    let pattern = COORDS_PATTERN.as_ref()?;
    let caps = pattern.captures(text)?;
    let lat = caps.get(1)?.as_str().parse::<f64>().ok()?;
    let lng = caps.get(2)?.as_str().parse::<f64>().ok()?;
    Some(Coordinates::new(lat, lng))
}

/// Grid intensity (as kg/kWh) and eco profile, with defaults for what is missing.
pub fn parse_grid_context(text: &str) -> GridContext {
    let co2_factor = INTENSITY_PATTERN
        .as_ref()
        .and_then(|p| p.captures(text))
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse::<f64>().ok())
        .map_or(DEFAULT_CO2_FACTOR, |grams| grams / 1000.0);

    let eco_profile = PROFILE_PATTERN
        .as_ref()
        .and_then(|p| p.captures(text))
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| DEFAULT_ECO_PROFILE.to_string());

    GridContext {
        co2_factor,
        eco_profile,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompts_name_the_query() {
        let p = build_prompt(LookupScope::Dashboard, "Ferry Building");
        assert!(p.contains("\"Ferry Building\""));
        assert!(p.contains("COORDS: [LAT, LNG]"));
        assert!(!p.contains("INTENSITY"));

        let m = build_prompt(LookupScope::Map, "Ferry Building");
        assert!(m.contains("place details for: \"Ferry Building\""));
        assert!(!m.contains("INTENSITY"));

        let c = build_prompt(LookupScope::Calculator, "Oslo");
        assert!(c.contains("INTENSITY: [Value]"));
        assert!(c.contains("PROFILE: [Eco Level]"));
    }

    #[test]
    fn test_untitled_place() {
        assert_eq!(untitled_place(LookupScope::Map), "Found Area");
        assert_eq!(untitled_place(LookupScope::Calculator), "Target Area");
    }

    #[test]
    fn test_parse_coordinates() {
        let text = "LOCATION: Golden Gate Park | COORDS: [37.7694, -122.4862]";
        assert_eq!(
            parse_coordinates(text),
            Some(Coordinates::new(37.7694, -122.4862))
        );
    }

    #[test]
    fn test_parse_coordinates_case_and_spacing() {
        let text = "location: x | coords:[ -33.86 ,151 ]";
        assert_eq!(parse_coordinates(text), Some(Coordinates::new(-33.86, 151.0)));
    }

    #[test]
    fn test_parse_coordinates_malformed() {
        assert_eq!(parse_coordinates("I could not find that place."), None);
        assert_eq!(parse_coordinates("COORDS: 37.7, -122.4"), None);
        assert_eq!(parse_coordinates("COORDS: [north, west]"), None);
    }

    #[test]
    fn test_parse_grid_context() {
        let text = "LOCATION: Oslo | COORDS: [59.91, 10.75] | INTENSITY: 28 | PROFILE: Hydro Heavy";
        let grid = parse_grid_context(text);
        assert!((grid.co2_factor - 0.028).abs() < 1e-12);
        assert_eq!(grid.eco_profile, "Hydro Heavy");
    }

    #[test]
    fn test_parse_grid_context_stops_at_pipe() {
        let grid = parse_grid_context("PROFILE: Coal Reliant | INTENSITY: 720");
        assert_eq!(grid.eco_profile, "Coal Reliant");
        assert!((grid.co2_factor - 0.72).abs() < 1e-12);
    }

    #[test]
    fn test_parse_grid_context_defaults() {
        let grid = parse_grid_context("LOCATION: Nowhere | COORDS: [0, 0]");
        assert_eq!(grid, GridContext::default());
        assert_eq!(grid.co2_factor, 0.45);
        assert_eq!(grid.eco_profile, "Verified Grid");
    }
}

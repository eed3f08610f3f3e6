//! AQI categorisation.
//!
//! The category thresholds are inclusive upper bounds:
//! Healthy <= 50 < Moderate <= 100 < Unhealthy <= 200 < Hazardous.

use serde::Serialize;
use utoipa::ToSchema;

/// Upper bound (inclusive) of the Healthy band.
const HEALTHY_MAX: u32 = 50;
/// Upper bound (inclusive) of the Moderate band.
const MODERATE_MAX: u32 = 100;
/// Upper bound (inclusive) of the Unhealthy band.
const UNHEALTHY_MAX: u32 = 200;

/// Severity bucket derived from an AQI reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum AqiCategory {
    Healthy,
    Moderate,
    Unhealthy,
    Hazardous,
}

impl AqiCategory {
    pub fn from_aqi(aqi: u32) -> Self {
        if aqi <= HEALTHY_MAX {
            AqiCategory::Healthy
        } else if aqi <= MODERATE_MAX {
            AqiCategory::Moderate
        } else if aqi <= UNHEALTHY_MAX {
            AqiCategory::Unhealthy
        } else {
            AqiCategory::Hazardous
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            AqiCategory::Healthy => "Healthy",
            AqiCategory::Moderate => "Moderate",
            AqiCategory::Unhealthy => "Unhealthy",
            AqiCategory::Hazardous => "Hazardous",
        }
    }

    /// Theme colour used for map markers and heatmap circles.
    pub fn color(&self) -> &'static str {
        match self {
            AqiCategory::Healthy => "#10b981",
            AqiCategory::Moderate => "#f59e0b",
            AqiCategory::Unhealthy => "#f97316",
            AqiCategory::Hazardous => "#e11d48",
        }
    }
}

/// Display summary of a reading: category, label and colour together.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AqiTheme {
    pub category: AqiCategory,
    pub label: String,
    pub color: String,
}

impl AqiTheme {
    pub fn for_aqi(aqi: u32) -> Self {
        let category = AqiCategory::from_aqi(aqi);
        Self {
            category,
            label: category.label().to_string(),
            color: category.color().to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_boundaries() {
        assert_eq!(AqiCategory::from_aqi(0), AqiCategory::Healthy);
        assert_eq!(AqiCategory::from_aqi(50), AqiCategory::Healthy);
        assert_eq!(AqiCategory::from_aqi(51), AqiCategory::Moderate);
        assert_eq!(AqiCategory::from_aqi(100), AqiCategory::Moderate);
        assert_eq!(AqiCategory::from_aqi(101), AqiCategory::Unhealthy);
        assert_eq!(AqiCategory::from_aqi(200), AqiCategory::Unhealthy);
        assert_eq!(AqiCategory::from_aqi(201), AqiCategory::Hazardous);
        assert_eq!(AqiCategory::from_aqi(500), AqiCategory::Hazardous);
    }

    #[test]
    fn test_labels() {
        assert_eq!(AqiCategory::Healthy.label(), "Healthy");
        assert_eq!(AqiCategory::Hazardous.label(), "Hazardous");
    }

    #[test]
    fn test_theme_for_aqi() {
        let theme = AqiTheme::for_aqi(150);
        assert_eq!(theme.category, AqiCategory::Unhealthy);
        assert_eq!(theme.label, "Unhealthy");
        assert_eq!(theme.color, "#f97316");
    }
}

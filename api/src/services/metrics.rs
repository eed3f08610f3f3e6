//! Environmental metrics providers.
//!
//! The session never draws readings itself; it asks a [`MetricsProvider`]
//! for a coordinate under a [`MetricsProfile`] naming the flow that asked.
//! Three providers exist:
//!
//! - [`SyntheticMetricsProvider`]: uniform random placeholders (default)
//! - [`SeededMetricsProvider`]: same draws, but keyed on the coordinate so a
//!   given place always reads the same (`METRICS_PROVIDER=seeded`, tests)
//! - [`crate::services::air_quality::AirQualityClient`]: live readings

use std::sync::Mutex;

use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::errors::AppError;
use crate::helpers::round_1dp;
use crate::models::{Coordinates, EnvironmentalMetrics};
use crate::services::seeded::{coordinate_seed, SeededRandom};

/// Which flow is asking for metrics. Each flow draws from its own ranges.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricsProfile {
    /// Device-position fix from the dashboard.
    DeviceFix,
    /// Text search or a geocoded search candidate.
    Search,
    /// Map click, marker drag, or map-scoped search.
    MapProbe,
}

/// Half-open `[min, max)` ranges for one profile.
#[derive(Debug, Clone, Copy)]
struct ProfileRanges {
    aqi: (u32, u32),
    pm25: (f64, f64),
    no2: (f64, f64),
    carbon: Option<(u32, u32)>,
}

impl MetricsProfile {
    fn ranges(self) -> ProfileRanges {
        match self {
            MetricsProfile::DeviceFix => ProfileRanges {
                aqi: (10, 70),
                pm25: (5.0, 20.0),
                no2: (2.0, 12.0),
                carbon: None,
            },
            MetricsProfile::Search => ProfileRanges {
                aqi: (20, 200),
                pm25: (5.0, 45.0),
                no2: (5.0, 35.0),
                carbon: None,
            },
            MetricsProfile::MapProbe => ProfileRanges {
                aqi: (0, 250),
                pm25: (2.0, 32.0),
                no2: (1.0, 16.0),
                carbon: Some((100, 700)),
            },
        }
    }
}

/// Source of readings for a coordinate.
#[async_trait]
pub trait MetricsProvider: Send + Sync {
    /// Short identifier for logs and the health endpoint.
    fn name(&self) -> &'static str;

    async fn metrics(
        &self,
        coords: Coordinates,
        profile: MetricsProfile,
    ) -> Result<EnvironmentalMetrics, AppError>;
}

/// Turn a stream of `[0, 1)` draws into readings for `profile`.
///
/// Draw order is fixed: aqi, pm25, no2, then carbon when the profile has it.
fn draw_metrics(mut unit: impl FnMut() -> f64, profile: MetricsProfile) -> EnvironmentalMetrics {
    let ranges = profile.ranges();
    let int_in = |u: f64, (lo, hi): (u32, u32)| lo + (u * f64::from(hi - lo)).floor() as u32;
    let float_in = |u: f64, (lo, hi): (f64, f64)| round_1dp(lo + u * (hi - lo));

    let aqi = int_in(unit(), ranges.aqi);
    let pm25 = float_in(unit(), ranges.pm25);
    let no2 = float_in(unit(), ranges.no2);
    let carbon_intensity = ranges.carbon.map(|range| f64::from(int_in(unit(), range)));

    EnvironmentalMetrics {
        aqi,
        pm25,
        no2,
        carbon_intensity,
    }
}

/// Random placeholder readings.
pub struct SyntheticMetricsProvider {
    rng: Mutex<StdRng>,
}

impl SyntheticMetricsProvider {
    pub fn new() -> Self {
        Self {
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    /// Reproducible sequence, for tests.
    #[cfg(test)]
    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }
}

#[async_trait]
impl MetricsProvider for SyntheticMetricsProvider {
    fn name(&self) -> &'static str {
        "synthetic"
    }

    async fn metrics(
        &self,
        _coords: Coordinates,
        profile: MetricsProfile,
    ) -> Result<EnvironmentalMetrics, AppError> {
        let mut rng = self
            .rng
            .lock()
            .map_err(|_| AppError::InternalError("metrics RNG lock poisoned".to_string()))?;
        Ok(draw_metrics(|| rng.gen::<f64>(), profile))
    }
}

/// Deterministic readings keyed on `<prefix><lat><lng>`.
pub struct SeededMetricsProvider {
    prefix: String,
}

impl SeededMetricsProvider {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }
}

#[async_trait]
impl MetricsProvider for SeededMetricsProvider {
    fn name(&self) -> &'static str {
        "seeded"
    }

    async fn metrics(
        &self,
        coords: Coordinates,
        profile: MetricsProfile,
    ) -> Result<EnvironmentalMetrics, AppError> {
        let mut rng = SeededRandom::from_seed(&coordinate_seed(&self.prefix, coords.lat, coords.lng));
        Ok(draw_metrics(|| rng.next_f64(), profile))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn here() -> Coordinates {
        Coordinates::new(48.8566, 2.3522)
    }

    fn assert_in_profile(m: &EnvironmentalMetrics, profile: MetricsProfile) {
        let r = profile.ranges();
        assert!(m.aqi >= r.aqi.0 && m.aqi < r.aqi.1, "aqi {}", m.aqi);
        // Rounding to 1dp may land exactly on the upper bound.
        assert!(m.pm25 >= r.pm25.0 && m.pm25 <= r.pm25.1, "pm25 {}", m.pm25);
        assert!(m.no2 >= r.no2.0 && m.no2 <= r.no2.1, "no2 {}", m.no2);
        match (r.carbon, m.carbon_intensity) {
            (Some((lo, hi)), Some(c)) => assert!(c >= f64::from(lo) && c < f64::from(hi)),
            (None, None) => {}
            other => panic!("carbon presence mismatch: {:?}", other),
        }
    }

    #[test]
    fn test_draw_lower_bounds() {
        let m = draw_metrics(|| 0.0, MetricsProfile::MapProbe);
        assert_eq!(m.aqi, 0);
        assert_eq!(m.pm25, 2.0);
        assert_eq!(m.no2, 1.0);
        assert_eq!(m.carbon_intensity, Some(100.0));
    }

    #[test]
    fn test_draw_near_upper_bounds() {
        let m = draw_metrics(|| 0.999_999, MetricsProfile::DeviceFix);
        assert_eq!(m.aqi, 69);
        assert_eq!(m.pm25, 20.0);
        assert_eq!(m.no2, 12.0);
        assert_eq!(m.carbon_intensity, None);
    }

    #[test]
    fn test_draw_order() {
        let mut draws = vec![0.5, 0.25, 0.75, 0.1].into_iter();
        let m = draw_metrics(|| draws.next().unwrap(), MetricsProfile::MapProbe);
        // aqi 0 + 0.5*250, pm25 2 + 0.25*30, no2 1 + 0.75*15, carbon 100 + 0.1*600
        assert_eq!(m.aqi, 125);
        assert_eq!(m.pm25, 9.5);
        assert_eq!(m.no2, 12.3);
        assert_eq!(m.carbon_intensity, Some(160.0));
    }

    #[tokio::test]
    async fn test_synthetic_within_ranges() {
        let provider = SyntheticMetricsProvider::with_seed(11);
        for profile in [
            MetricsProfile::DeviceFix,
            MetricsProfile::Search,
            MetricsProfile::MapProbe,
        ] {
            for _ in 0..500 {
                let m = provider.metrics(here(), profile).await.unwrap();
                assert_in_profile(&m, profile);
            }
        }
    }

    #[tokio::test]
    async fn test_seeded_is_deterministic_per_coordinate() {
        let provider = SeededMetricsProvider::new("test");
        let a = provider.metrics(here(), MetricsProfile::MapProbe).await.unwrap();
        let b = provider.metrics(here(), MetricsProfile::MapProbe).await.unwrap();
        assert_eq!(a, b);
        assert_in_profile(&a, MetricsProfile::MapProbe);

        let elsewhere = provider
            .metrics(Coordinates::new(51.5074, -0.1278), MetricsProfile::MapProbe)
            .await
            .unwrap();
        assert_ne!(a, elsewhere);
    }

    #[test]
    fn test_provider_names() {
        assert_eq!(SyntheticMetricsProvider::new().name(), "synthetic");
        assert_eq!(SeededMetricsProvider::new("x").name(), "seeded");
    }
}

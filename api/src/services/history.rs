//! Seven-day history series for the map's chart drawer.
//!
//! The most recent day is pinned to the current reading; the six days before
//! it are perturbed around it (AQI ±40, carbon ±75) and floored at 10 / 50.

use chrono::{Duration, NaiveDate};
use rand::Rng;

use crate::errors::AppError;
use crate::models::HistoryPoint;

/// Days in the history series, including the base date.
pub const HISTORY_DAYS: i64 = 7;
/// Full width of the AQI perturbation window.
const AQI_SPREAD: f64 = 80.0;
/// Full width of the carbon perturbation window (gCO2/kWh).
const CARBON_SPREAD: f64 = 150.0;
const MIN_AQI: f64 = 10.0;
const MIN_CARBON: f64 = 50.0;

/// Build the series ending at `base_date`, oldest first.
///
/// Fails when the earliest day would fall before the first representable date.
pub fn generate_history<R: Rng + ?Sized>(
    current_aqi: u32,
    current_carbon: f64,
    base_date: NaiveDate,
    rng: &mut R,
) -> Result<Vec<HistoryPoint>, AppError> {
    (0..HISTORY_DAYS)
        .rev()
        .map(|days_back| {
            let day = base_date
                .checked_sub_signed(Duration::days(days_back))
                .ok_or_else(|| {
                    AppError::BadRequest(format!(
                        "History base date {} is too early",
                        base_date
                    ))
                })?;
            let (aqi, carbon) = if days_back == 0 {
                (current_aqi, current_carbon.max(0.0) as u32)
            } else {
                let aqi = (f64::from(current_aqi) + (rng.gen::<f64>() - 0.5) * AQI_SPREAD)
                    .floor()
                    .max(MIN_AQI);
                let carbon = (current_carbon + (rng.gen::<f64>() - 0.5) * CARBON_SPREAD)
                    .floor()
                    .max(MIN_CARBON);
                (aqi as u32, carbon as u32)
            };
            Ok(HistoryPoint {
                date: day.format("%a").to_string(),
                full_date: day.format("%b %-d").to_string(),
                aqi,
                carbon,
            })
        })
        .collect()
}

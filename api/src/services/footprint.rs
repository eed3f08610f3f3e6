//! Household carbon-footprint estimate.
//!
//! ```text
//! ac      = ac_units  * 1.5 * co2_rate
//! fan     = fan_usage * 0.1 * co2_rate
//! total   = 2.0 + ac + fan
//! ac%     = round(ac / total * 100)
//! gas%    = round(gas_levels / total * 100), or 15 when that is 0
//! energy% = 100 - (ac% + 15)
//! ```
//!
//! The energy share subtracts the fixed 15, not the computed gas share, so the
//! three percentages only sum to 100 when gas% is itself 15. No input
//! validation: a non-positive total yields NaN/∞ percentages.

use serde::Serialize;
use utoipa::ToSchema;

use crate::helpers::{round_1dp, round_half_up};
use crate::models::{Breakdown, FootprintResult, ImpactData};

/// Baseline yearly footprint in tonnes before appliance load.
const BASELINE_TONS: f64 = 2.0;
/// AC load factor per unit.
const AC_FACTOR: f64 = 1.5;
/// Fan load factor per daily hour.
const FAN_FACTOR: f64 = 0.1;
/// Gas share reported when the computed share rounds to zero.
const DEFAULT_GAS_PCT: f64 = 15.0;

pub fn calculate(data: &ImpactData) -> FootprintResult {
    let ac_impact = f64::from(data.ac_units) * AC_FACTOR * data.co2_rate;
    let fan_impact = data.fan_usage * FAN_FACTOR * data.co2_rate;
    let total = BASELINE_TONS + ac_impact + fan_impact;

    let ac_pct = round_half_up(ac_impact / total * 100.0);
    let gas_raw = round_half_up(data.gas_levels / total * 100.0);
    let gas_pct = if gas_raw == 0.0 || gas_raw.is_nan() {
        DEFAULT_GAS_PCT
    } else {
        gas_raw
    };

    FootprintResult {
        total_tons: round_1dp(total),
        breakdown: Breakdown {
            ac_usage: ac_pct,
            gas_emissions: gas_pct,
            energy_source: 100.0 - (ac_pct + DEFAULT_GAS_PCT),
        },
    }
}

/// Tier shown on the results screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ImpactStatus {
    EcoGuardian,
    ActiveReducer,
    HighImpact,
}

impl ImpactStatus {
    pub fn for_tons(total_tons: f64) -> Self {
        if total_tons < 2.0 {
            ImpactStatus::EcoGuardian
        } else if total_tons < 4.0 {
            ImpactStatus::ActiveReducer
        } else {
            ImpactStatus::HighImpact
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ImpactStatus::EcoGuardian => "Eco Guardian",
            ImpactStatus::ActiveReducer => "Active Reducer",
            ImpactStatus::HighImpact => "High Impact",
        }
    }
}

/// A suggestion for lowering the footprint.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ReductionTip {
    pub id: &'static str,
    pub title: &'static str,
    pub description: &'static str,
    /// Estimated saving, e.g. "-0.5T"
    pub impact: &'static str,
    pub icon: &'static str,
}

pub const REDUCTION_TIPS: [ReductionTip; 3] = [
    ReductionTip {
        id: "1",
        title: "Switch to LED Bulbs",
        description: "Reduce lighting impact by up to 75%.",
        impact: "-0.2T",
        icon: "lightbulb",
    },
    ReductionTip {
        id: "2",
        title: "Smart AC Scheduling",
        description: "Optimize usage based on occupancy.",
        impact: "-0.5T",
        icon: "thermostat",
    },
    ReductionTip {
        id: "3",
        title: "Commute Greener",
        description: "Cycle or use transit 2 days/week.",
        impact: "-0.8T",
        icon: "directions_bike",
    },
];

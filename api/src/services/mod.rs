pub mod air_quality;
pub mod aqi;
pub mod emergency;
pub mod fence;
pub mod footprint;
pub mod gemini;
pub mod heatmap;
pub mod history;
pub mod metrics;
pub mod nominatim;
pub mod registry;
pub mod search;
pub mod seeded;
pub mod session;
pub mod weather;

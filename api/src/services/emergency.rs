//! Emergency trigger and siren.
//!
//! The trigger is a one-way latch: it moves to [`EmergencyState::Alerting`]
//! when a location with AQI >= 200 is applied or the user engages it by hand,
//! and returns to [`EmergencyState::Normal`] only on an explicit dismissal.
//! A cleaner reading does not clear it.
//!
//! While alerting, the owning session keeps a [`Siren`] running. The tone
//! itself is rendered by the client; the server tracks the sweep so the view
//! can report the instantaneous frequency and how many sweeps have completed.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use utoipa::ToSchema;
use uuid::Uuid;

/// AQI at or above which the trigger latches.
pub const EMERGENCY_AQI_THRESHOLD: u32 = 200;

pub const SIREN_LOW_HZ: f64 = 440.0;
pub const SIREN_HIGH_HZ: f64 = 880.0;
/// One full low-high-low sweep.
const SIREN_CYCLE: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum EmergencyState {
    Normal,
    Alerting,
}

/// What latched the trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum AlertCause {
    AqiThreshold,
    Manual,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum DismissAction {
    /// "I am safe"
    ConfirmSafety,
    QuietAlarm,
}

#[derive(Debug, Clone)]
pub struct EmergencyTrigger {
    state: EmergencyState,
    cause: Option<AlertCause>,
    /// AQI that latched the trigger, when it was a reading.
    trigger_aqi: Option<u32>,
    since: Option<DateTime<Utc>>,
}

impl Default for EmergencyTrigger {
    fn default() -> Self {
        Self {
            state: EmergencyState::Normal,
            cause: None,
            trigger_aqi: None,
            since: None,
        }
    }
}

impl EmergencyTrigger {
    pub fn state(&self) -> EmergencyState {
        self.state
    }

    pub fn is_alerting(&self) -> bool {
        self.state == EmergencyState::Alerting
    }

    pub fn cause(&self) -> Option<AlertCause> {
        self.cause
    }

    pub fn trigger_aqi(&self) -> Option<u32> {
        self.trigger_aqi
    }

    pub fn since(&self) -> Option<DateTime<Utc>> {
        self.since
    }

    /// Check a newly applied reading. Returns `true` if this reading latched
    /// the trigger; an already-alerting trigger is left as is.
    pub fn observe(&mut self, aqi: u32) -> bool {
        if self.is_alerting() || aqi < EMERGENCY_AQI_THRESHOLD {
            return false;
        }
        self.latch(AlertCause::AqiThreshold, Some(aqi));
        true
    }

    /// Manual "Engage Emergency Mode". Returns `true` if it latched.
    pub fn engage(&mut self) -> bool {
        if self.is_alerting() {
            return false;
        }
        self.latch(AlertCause::Manual, None);
        true
    }

    /// Returns `true` if the trigger was alerting and is now normal.
    pub fn dismiss(&mut self, action: DismissAction) -> bool {
        if !self.is_alerting() {
            return false;
        }
        tracing::info!("Emergency dismissed ({:?})", action);
        *self = Self::default();
        true
    }

    fn latch(&mut self, cause: AlertCause, aqi: Option<u32>) {
        tracing::info!("Emergency latched: {:?} (aqi {:?})", cause, aqi);
        self.state = EmergencyState::Alerting;
        self.cause = Some(cause);
        self.trigger_aqi = aqi;
        self.since = Some(Utc::now());
    }
}

/// Siren pitch `elapsed` into the sweep.
///
/// Exponential ramp 440 → 880 Hz over the first half second, then back down
/// to 440 Hz by the end of the second; repeats every second.
pub fn siren_frequency_hz(elapsed: Duration) -> f64 {
    let cycle = SIREN_CYCLE.as_secs_f64();
    let half = cycle / 2.0;
    let t = elapsed.as_secs_f64() % cycle;
    let ratio = SIREN_HIGH_HZ / SIREN_LOW_HZ;
    if t <= half {
        SIREN_LOW_HZ * ratio.powf(t / half)
    } else {
        SIREN_HIGH_HZ * ratio.powf(-(t - half) / half)
    }
}

/// A running siren. Dropping it stops the sweep task.
#[derive(Debug)]
pub struct Siren {
    started: Instant,
    cycles: Arc<AtomicU64>,
    task: JoinHandle<()>,
}

impl Siren {
    /// Start the sweep. Must be called from within a Tokio runtime.
    pub fn start(session_id: Uuid) -> Self {
        let started = Instant::now();
        let cycles = Arc::new(AtomicU64::new(0));
        let counter = Arc::clone(&cycles);
        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(started + SIREN_CYCLE, SIREN_CYCLE);
            loop {
                ticker.tick().await;
                let done = counter.fetch_add(1, Ordering::Relaxed) + 1;
                tracing::trace!("Siren cycle {} for session {}", done, session_id);
            }
        });
        tracing::debug!("Siren started for session {}", session_id);
        Self {
            started,
            cycles,
            task,
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    pub fn frequency_hz(&self) -> f64 {
        siren_frequency_hz(self.elapsed())
    }

    /// Full sweeps completed since the siren started.
    pub fn cycles(&self) -> u64 {
        self.cycles.load(Ordering::Relaxed)
    }

    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }
}

impl Drop for Siren {
    fn drop(&mut self) {
        self.task.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-6
    }

    #[test]
    fn test_threshold_boundary() {
        let mut trigger = EmergencyTrigger::default();
        assert!(!trigger.observe(199));
        assert_eq!(trigger.state(), EmergencyState::Normal);

        assert!(trigger.observe(200));
        assert_eq!(trigger.state(), EmergencyState::Alerting);
        assert_eq!(trigger.cause(), Some(AlertCause::AqiThreshold));
        assert_eq!(trigger.trigger_aqi(), Some(200));
        assert!(trigger.since().is_some());
    }

    #[test]
    fn test_latch_survives_clean_reading() {
        let mut trigger = EmergencyTrigger::default();
        trigger.observe(240);
        assert!(!trigger.observe(50));
        assert!(trigger.is_alerting());
        // A second hazardous reading does not re-latch.
        assert!(!trigger.observe(300));
        assert_eq!(trigger.trigger_aqi(), Some(240));
    }

    #[test]
    fn test_dismissal_resets() {
        for action in [DismissAction::ConfirmSafety, DismissAction::QuietAlarm] {
            let mut trigger = EmergencyTrigger::default();
            trigger.observe(210);
            assert!(trigger.dismiss(action));
            assert_eq!(trigger.state(), EmergencyState::Normal);
            assert_eq!(trigger.cause(), None);
            assert_eq!(trigger.since(), None);
        }
    }

    #[test]
    fn test_dismiss_when_normal_is_noop() {
        let mut trigger = EmergencyTrigger::default();
        assert!(!trigger.dismiss(DismissAction::QuietAlarm));
    }

    #[test]
    fn test_manual_engage() {
        let mut trigger = EmergencyTrigger::default();
        assert!(trigger.engage());
        assert_eq!(trigger.cause(), Some(AlertCause::Manual));
        assert_eq!(trigger.trigger_aqi(), None);
        assert!(!trigger.engage());
        assert!(!trigger.observe(250));
        assert_eq!(trigger.cause(), Some(AlertCause::Manual));
    }

    #[test]
    fn test_siren_sweep_shape() {
        assert!(approx(siren_frequency_hz(Duration::ZERO), 440.0));
        assert!(approx(siren_frequency_hz(Duration::from_millis(250)), 440.0 * 2f64.sqrt()));
        assert!(approx(siren_frequency_hz(Duration::from_millis(500)), 880.0));
        assert!(approx(siren_frequency_hz(Duration::from_millis(750)), 440.0 * 2f64.sqrt()));
        assert!(approx(siren_frequency_hz(Duration::from_millis(1000)), 440.0));
        // Repeats every second.
        assert!(approx(
            siren_frequency_hz(Duration::from_millis(3500)),
            siren_frequency_hz(Duration::from_millis(500))
        ));
    }

    #[test]
    fn test_siren_frequency_in_band() {
        for ms in (0..2000).step_by(7) {
            let f = siren_frequency_hz(Duration::from_millis(ms));
            assert!((SIREN_LOW_HZ - 1e-9..=SIREN_HIGH_HZ + 1e-9).contains(&f), "{} Hz at {} ms", f, ms);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_siren_tracks_elapsed_and_stops_on_drop() {
        let siren = Siren::start(Uuid::new_v4());
        assert!(approx(siren.frequency_hz(), 440.0));

        tokio::time::advance(Duration::from_millis(500)).await;
        assert!(approx(siren.frequency_hz(), 880.0));
        assert!(siren.is_running());

        let handle = siren.task.abort_handle();
        drop(siren);
        for _ in 0..10 {
            if handle.is_finished() {
                break;
            }
            tokio::task::yield_now().await;
        }
        assert!(handle.is_finished());
    }

    #[tokio::test(start_paused = true)]
    async fn test_siren_counts_completed_sweeps() {
        let siren = Siren::start(Uuid::new_v4());
        tokio::task::yield_now().await;
        assert_eq!(siren.cycles(), 0);

        tokio::time::advance(Duration::from_millis(2500)).await;
        for _ in 0..10 {
            if siren.cycles() == 2 {
                break;
            }
            tokio::task::yield_now().await;
        }
        assert_eq!(siren.cycles(), 2);
        assert!(approx(siren.frequency_hz(), 880.0));
    }
}

//! Scan State Machine
//!
//! Owns the moment-to-moment targeting/scanning lifecycle:
//! Idle → Targeting → Scanning → {Completed → Idle | GracePeriod}.
//! The machine is a pure timer FSM keyed by opaque uids — it never sees
//! the spatial layer. The external detection collaborator reports
//! target acquired/lost, the input layer requests scan start, and a
//! per-frame tick advances timers. Everything observable comes out as
//! `ScanEvent`s.
//!
//! Losing the target mid-scan opens a grace period: progress decays
//! toward zero while a separate wall-clock timer runs; re-acquiring the
//! same uid before it expires resumes the scan with progress intact.

use bevy::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::constants::{GRACE_DECAY_RATE, GRACE_PERIOD_SECS, MIN_SCAN_TIME_SECS};

/// Lifecycle phase of the scanner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ScanPhase {
    #[default]
    Idle,
    Targeting,
    Scanning,
    GracePeriod,
}

/// Why a scan was aborted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InterruptReason {
    GracePeriodExpired,
}

impl InterruptReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            InterruptReason::GracePeriodExpired => "grace_period_expired",
        }
    }
}

/// The single in-flight scan. Ephemeral: destroyed on completion,
/// interruption, or unrecovered target loss.
#[derive(Debug, Clone, PartialEq)]
pub struct ScanSession {
    pub target_uid: String,
    pub progress: f32,
    pub required_time: f32,
}

/// Timing knobs for the grace period.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ScanConfig {
    pub grace_period_secs: f32,
    pub grace_decay_rate: f32,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            grace_period_secs: GRACE_PERIOD_SECS,
            grace_decay_rate: GRACE_DECAY_RATE,
        }
    }
}

/// Everything the scanner makes observable.
#[derive(Event, Debug, Clone, PartialEq)]
pub enum ScanEvent {
    TargetAcquired { uid: String },
    TargetLost { uid: String },
    ScanStarted { uid: String },
    ScanProgressed { uid: String, progress: f32 },
    ScanCompleted { uid: String },
    ScanInterrupted { uid: String, reason: InterruptReason },
    GraceStarted { uid: String },
    GraceExpired { uid: String },
}

/// The scan FSM. One per process, driven once per frame via [`update`].
///
/// [`update`]: ScanStateMachine::update
#[derive(Resource, Debug, Default)]
pub struct ScanStateMachine {
    phase: ScanPhase,
    session: Option<ScanSession>,
    grace_elapsed: f32,
    config: ScanConfig,
    events: Vec<ScanEvent>,
}

impl ScanStateMachine {
    pub fn new(config: ScanConfig) -> Self {
        Self {
            config,
            ..Default::default()
        }
    }

    pub fn phase(&self) -> ScanPhase {
        self.phase
    }

    pub fn current_target(&self) -> Option<&str> {
        self.session.as_ref().map(|s| s.target_uid.as_str())
    }

    pub fn progress(&self) -> f32 {
        self.session.as_ref().map(|s| s.progress).unwrap_or(0.0)
    }

    /// Detection collaborator: a scannable target entered range.
    ///
    /// Ignored while scanning a *different* target. Re-acquiring the uid
    /// currently in grace resumes the interrupted scan with its progress
    /// intact; anything else becomes a fresh `Targeting` session.
    pub fn report_target_acquired(&mut self, uid: &str, scan_time: f32) {
        let required_time = if scan_time < MIN_SCAN_TIME_SECS {
            warn!(uid, scan_time, "non-positive scan time reported, clamping");
            MIN_SCAN_TIME_SECS
        } else {
            scan_time
        };

        match self.phase {
            ScanPhase::Scanning => {
                // Mid-scan acquisitions of other targets are noise.
            }
            ScanPhase::GracePeriod
                if self.current_target() == Some(uid) =>
            {
                self.grace_elapsed = 0.0;
                self.phase = ScanPhase::Scanning;
                self.events.push(ScanEvent::TargetAcquired { uid: uid.into() });
            }
            _ => {
                self.session = Some(ScanSession {
                    target_uid: uid.into(),
                    progress: 0.0,
                    required_time,
                });
                self.grace_elapsed = 0.0;
                self.phase = ScanPhase::Targeting;
                self.events.push(ScanEvent::TargetAcquired { uid: uid.into() });
            }
        }
    }

    /// Detection collaborator: a target left range. No-op unless `uid`
    /// is the active target.
    pub fn report_target_lost(&mut self, uid: &str) {
        if self.current_target() != Some(uid) {
            return;
        }
        self.events.push(ScanEvent::TargetLost { uid: uid.into() });

        if self.phase == ScanPhase::Scanning {
            // Progress survives; the grace timer decides its fate.
            self.phase = ScanPhase::GracePeriod;
            self.grace_elapsed = 0.0;
            self.events.push(ScanEvent::GraceStarted { uid: uid.into() });
        } else {
            self.session = None;
            self.phase = ScanPhase::Idle;
        }
    }

    /// Input collaborator: the player pressed scan. Valid only while
    /// `Targeting`; anything else (including a repeat press mid-scan) is
    /// a no-op.
    pub fn request_scan_start(&mut self) {
        if self.phase != ScanPhase::Targeting {
            return;
        }
        if let Some(session) = self.session.as_mut() {
            session.progress = 0.0;
            self.phase = ScanPhase::Scanning;
            self.events.push(ScanEvent::ScanStarted {
                uid: session.target_uid.clone(),
            });
        }
    }

    /// Per-frame tick, driven by the external scheduler.
    pub fn update(&mut self, delta: f32) {
        match self.phase {
            ScanPhase::Scanning => {
                let Some(session) = self.session.as_mut() else {
                    return;
                };
                session.progress =
                    (session.progress + delta / session.required_time).min(1.0);
                let uid = session.target_uid.clone();
                let progress = session.progress;
                self.events.push(ScanEvent::ScanProgressed {
                    uid: uid.clone(),
                    progress,
                });
                if progress >= 1.0 {
                    self.events.push(ScanEvent::ScanCompleted { uid });
                    self.session = None;
                    self.phase = ScanPhase::Idle;
                }
            }
            ScanPhase::GracePeriod => {
                let Some(session) = self.session.as_mut() else {
                    return;
                };
                session.progress =
                    (session.progress - self.config.grace_decay_rate * delta).max(0.0);
                self.grace_elapsed += delta;
                if self.grace_elapsed >= self.config.grace_period_secs {
                    let uid = session.target_uid.clone();
                    self.events.push(ScanEvent::GraceExpired { uid: uid.clone() });
                    self.events.push(ScanEvent::ScanInterrupted {
                        uid,
                        reason: InterruptReason::GracePeriodExpired,
                    });
                    self.session = None;
                    self.phase = ScanPhase::Idle;
                }
            }
            ScanPhase::Idle | ScanPhase::Targeting => {}
        }
    }

    /// Take the pending events (the plugin system forwards them as Bevy
    /// events; tests consume them directly).
    pub fn drain_events(&mut self) -> Vec<ScanEvent> {
        std::mem::take(&mut self.events)
    }

    /// Abandon everything and go back to `Idle` (new-game path).
    pub fn reset(&mut self) {
        self.session = None;
        self.grace_elapsed = 0.0;
        self.phase = ScanPhase::Idle;
        self.events.clear();
    }
}

pub struct ScannerPlugin;

impl Plugin for ScannerPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<ScanStateMachine>()
            .add_event::<ScanEvent>()
            .add_systems(Update, scanner_tick);
    }
}

/// Advances the scan timers once per frame and republishes the machine's
/// events on the app-wide stream.
pub fn scanner_tick(
    time: Res<Time>,
    mut machine: ResMut<ScanStateMachine>,
    mut writer: EventWriter<ScanEvent>,
) {
    machine.update(time.delta_secs());
    for event in machine.drain_events() {
        writer.send(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn machine() -> ScanStateMachine {
        ScanStateMachine::new(ScanConfig {
            grace_period_secs: 2.0,
            grace_decay_rate: 0.25,
        })
    }

    fn completed(events: &[ScanEvent]) -> Vec<&str> {
        events
            .iter()
            .filter_map(|e| match e {
                ScanEvent::ScanCompleted { uid } => Some(uid.as_str()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_full_scan_cycle() {
        let mut m = machine();
        m.report_target_acquired("rock_01", 2.0);
        assert_eq!(m.phase(), ScanPhase::Targeting);

        m.request_scan_start();
        assert_eq!(m.phase(), ScanPhase::Scanning);

        m.update(1.0);
        assert!((m.progress() - 0.5).abs() < 1e-6);
        m.update(1.0);
        assert_eq!(m.phase(), ScanPhase::Idle);
        assert!(m.current_target().is_none());

        let events = m.drain_events();
        assert_eq!(completed(&events), vec!["rock_01"]);
        assert!(events.contains(&ScanEvent::ScanStarted { uid: "rock_01".into() }));
    }

    #[test]
    fn test_scan_start_without_target_is_noop() {
        let mut m = machine();
        m.request_scan_start();
        assert_eq!(m.phase(), ScanPhase::Idle);
        assert!(m.drain_events().is_empty());
    }

    #[test]
    fn test_repeat_scan_start_does_not_reset_progress() {
        let mut m = machine();
        m.report_target_acquired("rock_01", 2.0);
        m.request_scan_start();
        m.update(1.0);
        m.request_scan_start(); // repeated press mid-scan
        assert!((m.progress() - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_acquire_other_target_ignored_while_scanning() {
        let mut m = machine();
        m.report_target_acquired("rock_01", 2.0);
        m.request_scan_start();
        m.report_target_acquired("fern_01", 2.0);
        assert_eq!(m.current_target(), Some("rock_01"));
        assert_eq!(m.phase(), ScanPhase::Scanning);
    }

    #[test]
    fn test_target_switch_while_targeting() {
        let mut m = machine();
        m.report_target_acquired("rock_01", 2.0);
        m.report_target_acquired("fern_01", 3.0);
        assert_eq!(m.current_target(), Some("fern_01"));
        assert_eq!(m.phase(), ScanPhase::Targeting);
    }

    #[test]
    fn test_lost_non_active_uid_is_noop() {
        let mut m = machine();
        m.report_target_acquired("rock_01", 2.0);
        m.report_target_lost("fern_01");
        assert_eq!(m.phase(), ScanPhase::Targeting);
        assert_eq!(m.current_target(), Some("rock_01"));
    }

    #[test]
    fn test_lost_while_targeting_goes_idle() {
        let mut m = machine();
        m.report_target_acquired("rock_01", 2.0);
        m.report_target_lost("rock_01");
        assert_eq!(m.phase(), ScanPhase::Idle);
        assert!(m.current_target().is_none());
    }

    #[test]
    fn test_grace_resume_keeps_progress() {
        let mut m = machine();
        m.report_target_acquired("rock_01", 2.0);
        m.request_scan_start();
        m.update(1.0); // progress 0.5
        m.report_target_lost("rock_01");
        assert_eq!(m.phase(), ScanPhase::GracePeriod);

        m.update(0.5); // decays 0.125
        m.report_target_acquired("rock_01", 2.0);
        assert_eq!(m.phase(), ScanPhase::Scanning);
        assert!((m.progress() - 0.375).abs() < 1e-6, "progress must survive");

        // Finish the resumed scan.
        m.update(2.0);
        assert_eq!(completed(&m.drain_events()), vec!["rock_01"]);
    }

    #[test]
    fn test_grace_expiry_interrupts_exactly_once() {
        let mut m = machine();
        m.report_target_acquired("rock_01", 2.0);
        m.request_scan_start();
        m.update(1.0);
        m.report_target_lost("rock_01");

        for _ in 0..30 {
            m.update(0.1);
        }
        assert_eq!(m.phase(), ScanPhase::Idle);

        let events = m.drain_events();
        let interrupts: Vec<_> = events
            .iter()
            .filter(|e| matches!(e, ScanEvent::ScanInterrupted { .. }))
            .collect();
        assert_eq!(interrupts.len(), 1);
        assert_eq!(
            interrupts[0],
            &ScanEvent::ScanInterrupted {
                uid: "rock_01".into(),
                reason: InterruptReason::GracePeriodExpired,
            }
        );
        assert!(events.contains(&ScanEvent::GraceExpired { uid: "rock_01".into() }));
    }

    #[test]
    fn test_grace_decay_floors_at_zero() {
        let mut m = ScanStateMachine::new(ScanConfig {
            grace_period_secs: 100.0,
            grace_decay_rate: 10.0,
        });
        m.report_target_acquired("rock_01", 2.0);
        m.request_scan_start();
        m.update(0.5);
        m.report_target_lost("rock_01");
        m.update(5.0); // would decay far below zero
        assert_eq!(m.progress(), 0.0);
        assert_eq!(m.phase(), ScanPhase::GracePeriod);
    }

    #[test]
    fn test_acquire_different_uid_during_grace_starts_fresh() {
        let mut m = machine();
        m.report_target_acquired("rock_01", 2.0);
        m.request_scan_start();
        m.update(1.0);
        m.report_target_lost("rock_01");
        m.report_target_acquired("fern_01", 3.0);
        assert_eq!(m.phase(), ScanPhase::Targeting);
        assert_eq!(m.current_target(), Some("fern_01"));
        assert_eq!(m.progress(), 0.0);
    }

    #[test]
    fn test_zero_scan_time_clamped() {
        let mut m = machine();
        m.report_target_acquired("rock_01", 0.0);
        m.request_scan_start();
        m.update(MIN_SCAN_TIME_SECS);
        assert_eq!(m.phase(), ScanPhase::Idle);
        assert_eq!(completed(&m.drain_events()), vec!["rock_01"]);
    }

    #[test]
    fn test_interrupt_reason_wire_name() {
        assert_eq!(
            InterruptReason::GracePeriodExpired.as_str(),
            "grace_period_expired"
        );
        let json = serde_json::to_string(&InterruptReason::GracePeriodExpired).unwrap();
        assert_eq!(json, "\"grace_period_expired\"");
    }

    #[test]
    fn test_reset() {
        let mut m = machine();
        m.report_target_acquired("rock_01", 2.0);
        m.request_scan_start();
        m.reset();
        assert_eq!(m.phase(), ScanPhase::Idle);
        assert!(m.current_target().is_none());
        assert!(m.drain_events().is_empty());
    }
}

//! Round timing and goal detection.
//!
//! [`RoundTimer`] is a reducer: every user action and every runtime tick is a
//! [`TimerEvent`] handled one at a time, and each call returns the
//! [`Lifecycle`] events that collaborators (cue player, UI) react to.
//! Out-of-sequence events are ignored rather than reported.

use std::time::{Duration, Instant};

use tracing::{debug, info};

use crate::session::{parse_goal, CalibrationState, RepeatingTimer, Session};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimerEvent {
    CalibrationStart,
    CalibrationStop,
    SetGoal(String),
    StartCounting,
    Tick,
    Reset,
    PlaybackFinished,
}

/// Emitted by the timer for collaborators.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lifecycle {
    CalibrationStarted,
    Calibrated { round_duration: Duration },
    CountingStarted { period: Duration },
    RoundCompleted { round: u32 },
    /// Exactly one per false-to-true transition of `goal_reached`.
    GoalReached { rounds: u32 },
    Reset,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerSettings {
    pub default_goal: u32,
    /// Added to every calibrated duration.
    pub calibration_offset: Duration,
}

impl Default for TimerSettings {
    fn default() -> Self {
        Self {
            default_goal: crate::config::DEFAULT_GOAL,
            calibration_offset: Duration::ZERO,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RoundTimer {
    settings: TimerSettings,
    session: Session,
}

impl RoundTimer {
    pub fn new(settings: TimerSettings) -> Self {
        Self {
            session: Session::new(settings.default_goal),
            settings,
        }
    }

    pub fn settings(&self) -> TimerSettings {
        self.settings
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn round_count(&self) -> u32 {
        self.session.round_count
    }

    pub fn goal_rounds(&self) -> u32 {
        self.session.goal_rounds
    }

    pub fn calibration(&self) -> CalibrationState {
        self.session.calibration
    }

    pub fn round_duration(&self) -> Option<Duration> {
        self.session.round_duration
    }

    pub fn round_duration_millis(&self) -> Option<u64> {
        self.session
            .round_duration
            .map(|d| d.as_millis().min(u64::MAX as u128) as u64)
    }

    pub fn goal_reached(&self) -> bool {
        self.session.goal_reached()
    }

    pub fn is_counting(&self) -> bool {
        self.session.is_counting()
    }

    pub fn is_calibrating(&self) -> bool {
        matches!(self.session.calibration, CalibrationState::Calibrating { .. })
    }

    pub fn is_calibrated(&self) -> bool {
        self.session.calibration == CalibrationState::Calibrated
    }

    pub fn cue_pending(&self) -> bool {
        self.session.cue_pending
    }

    /// Whether `start_counting` would do anything right now.
    pub fn can_start_counting(&self) -> bool {
        self.is_calibrated() && !self.is_counting() && !self.goal_reached()
    }

    /// Apply one event. The only place session state changes.
    pub fn handle(&mut self, event: TimerEvent, now: Instant) -> Vec<Lifecycle> {
        let was_reached = self.session.goal_reached();
        let mut emitted = Vec::new();

        match event {
            TimerEvent::CalibrationStart => self.on_calibration_start(now, &mut emitted),
            TimerEvent::CalibrationStop => self.on_calibration_stop(now, &mut emitted),
            TimerEvent::SetGoal(input) => {
                self.session.goal_rounds = parse_goal(&input);
                debug!(goal = self.session.goal_rounds, "goal updated");
            }
            TimerEvent::StartCounting => self.on_start_counting(now, &mut emitted),
            TimerEvent::Tick => self.on_tick(now, &mut emitted),
            TimerEvent::Reset => {
                self.session = Session::new(self.settings.default_goal);
                info!("session reset");
                emitted.push(Lifecycle::Reset);
                return emitted;
            }
            TimerEvent::PlaybackFinished => {
                self.session.cue_pending = false;
            }
        }

        if !was_reached && self.session.goal_reached() && !self.reached_in(&emitted) {
            self.stop_on_goal(&mut emitted);
        }

        emitted
    }

    pub fn start_calibration(&mut self, now: Instant) -> Vec<Lifecycle> {
        self.handle(TimerEvent::CalibrationStart, now)
    }

    pub fn stop_calibration(&mut self, now: Instant) -> Vec<Lifecycle> {
        self.handle(TimerEvent::CalibrationStop, now)
    }

    pub fn set_goal(&mut self, input: &str) -> Vec<Lifecycle> {
        self.handle(TimerEvent::SetGoal(input.to_string()), Instant::now())
    }

    pub fn start_counting(&mut self, now: Instant) -> Vec<Lifecycle> {
        self.handle(TimerEvent::StartCounting, now)
    }

    pub fn tick(&mut self, now: Instant) -> Vec<Lifecycle> {
        self.handle(TimerEvent::Tick, now)
    }

    pub fn reset(&mut self) -> Vec<Lifecycle> {
        self.handle(TimerEvent::Reset, Instant::now())
    }

    pub fn playback_finished(&mut self) -> Vec<Lifecycle> {
        self.handle(TimerEvent::PlaybackFinished, Instant::now())
    }

    fn on_calibration_start(&mut self, now: Instant, emitted: &mut Vec<Lifecycle>) {
        if self.session.calibration != CalibrationState::Idle {
            debug!(state = self.session.calibration.label(), "ignoring calibration start");
            return;
        }
        self.session.calibration = CalibrationState::Calibrating { started_at: now };
        info!("calibration started");
        emitted.push(Lifecycle::CalibrationStarted);
    }

    fn on_calibration_stop(&mut self, now: Instant, emitted: &mut Vec<Lifecycle>) {
        let CalibrationState::Calibrating { started_at } = self.session.calibration else {
            debug!(state = self.session.calibration.label(), "ignoring calibration stop");
            return;
        };
        let round_duration =
            now.saturating_duration_since(started_at) + self.settings.calibration_offset;

        self.session.round_duration = Some(round_duration);
        // the calibration round itself counts
        self.session.round_count = 1;
        self.session.calibration = CalibrationState::Calibrated;
        info!(millis = round_duration.as_millis() as u64, "calibrated");
        emitted.push(Lifecycle::Calibrated { round_duration });
    }

    fn on_start_counting(&mut self, now: Instant, emitted: &mut Vec<Lifecycle>) {
        if !self.can_start_counting() {
            debug!(
                state = self.session.calibration.label(),
                counting = self.is_counting(),
                goal_reached = self.goal_reached(),
                "ignoring start counting"
            );
            return;
        }
        let Some(period) = self.session.round_duration else {
            return;
        };
        self.session.timer = Some(RepeatingTimer::arm(period, now));
        info!(millis = period.as_millis() as u64, "counting started");
        emitted.push(Lifecycle::CountingStarted { period });
    }

    fn on_tick(&mut self, now: Instant, emitted: &mut Vec<Lifecycle>) {
        loop {
            let Some(timer) = self.session.timer.as_mut() else {
                return;
            };
            if !timer.fire_once(now) {
                return;
            }

            self.session.round_count = self.session.round_count.saturating_add(1);
            emitted.push(Lifecycle::RoundCompleted {
                round: self.session.round_count,
            });

            if self.session.goal_reached() {
                self.stop_on_goal(emitted);
                return;
            }
        }
    }

    /// Cancel the timer and request exactly one notification.
    fn stop_on_goal(&mut self, emitted: &mut Vec<Lifecycle>) {
        self.session.timer = None;
        self.session.cue_pending = true;
        let rounds = self.session.round_count;
        info!(rounds, goal = self.session.goal_rounds, "goal reached");
        emitted.push(Lifecycle::GoalReached { rounds });
    }

    fn reached_in(&self, emitted: &[Lifecycle]) -> bool {
        emitted
            .iter()
            .any(|e| matches!(e, Lifecycle::GoalReached { .. }))
    }
}

impl Default for RoundTimer {
    fn default() -> Self {
        Self::new(TimerSettings::default())
    }
}

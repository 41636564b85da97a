use std::sync::mpsc::{Receiver, TryRecvError};
use std::time::{Duration, Instant};

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use tracing::{debug, info, warn};

use crate::config::{Config, GoalAction};
use crate::cue::{Cue, CueOutcome, CueWorker};
use crate::round_timer::{Lifecycle, RoundTimer, TimerEvent};
use crate::session::parse_goal;

const NOTICE_TTL: Duration = Duration::from_secs(5);
const MAX_GOAL_DIGITS: usize = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Warning,
}

/// A short, self-expiring message shown under the counter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub text: String,
    pub level: NoticeLevel,
    pub shown_at: Instant,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Control {
    Continue,
    Quit,
}

/// Everything the UI renders, plus the collaborators the timer talks to.
pub struct App {
    pub config: Config,
    pub timer: RoundTimer,
    pub goal_input: String,
    pub visitor_count: Option<u64>,
    pub notice: Option<Notice>,
    cue: Option<Cue>,
    cue_worker: Option<CueWorker>,
    // the request whose outcome ends the current `cue_pending`
    cue_request: Option<u64>,
    visitors: Option<Receiver<u64>>,
}

impl App {
    pub fn new(config: Config) -> Self {
        Self {
            timer: RoundTimer::new(config.timer_settings()),
            goal_input: config.default_goal.to_string(),
            cue: Cue::for_config(&config),
            config,
            visitor_count: None,
            notice: None,
            cue_worker: None,
            cue_request: None,
            visitors: None,
        }
    }

    pub fn with_cue_worker(mut self, worker: CueWorker) -> Self {
        self.cue_worker = Some(worker);
        self
    }

    pub fn with_visitor_count(mut self, rx: Receiver<u64>) -> Self {
        self.visitors = Some(rx);
        self
    }

    pub fn cue(&self) -> Option<&Cue> {
        self.cue.as_ref()
    }

    /// Whether the goal field accepts edits right now.
    pub fn goal_editable(&self) -> bool {
        !self.timer.is_counting()
    }

    /// Once a round is calibrated, goal edits wait for the next start so
    /// intermediate values never reach the timer.
    pub fn goal_staged(&self) -> bool {
        self.timer.is_calibrated() && parse_goal(&self.goal_input) != self.timer.goal_rounds()
    }

    pub fn on_key(&mut self, key: KeyEvent, now: Instant) -> Control {
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            return Control::Quit;
        }

        match key.code {
            KeyCode::Esc | KeyCode::Char('q') => return Control::Quit,
            KeyCode::Char(' ') | KeyCode::Enter => self.primary_action(now),
            KeyCode::Char('c') => {
                let event = if self.timer.is_calibrating() {
                    TimerEvent::CalibrationStop
                } else {
                    TimerEvent::CalibrationStart
                };
                self.dispatch(event, now);
            }
            KeyCode::Char('s') => self.start_counting(now),
            KeyCode::Char('r') => {
                self.dispatch(TimerEvent::Reset, now);
            }
            KeyCode::Char(d) if d.is_ascii_digit() => {
                if self.goal_editable() && self.goal_input.len() < MAX_GOAL_DIGITS {
                    self.goal_input.push(d);
                    self.goal_edited(now);
                }
            }
            KeyCode::Backspace => {
                if self.goal_editable() && self.goal_input.pop().is_some() {
                    self.goal_edited(now);
                }
            }
            _ => {}
        }
        Control::Continue
    }

    /// Space/Enter walks the whole flow: calibrate, stop, start counting.
    fn primary_action(&mut self, now: Instant) {
        if self.timer.is_calibrated() {
            self.start_counting(now);
            return;
        }
        let event = if self.timer.is_calibrating() {
            TimerEvent::CalibrationStop
        } else {
            TimerEvent::CalibrationStart
        };
        self.dispatch(event, now);
    }

    fn goal_edited(&mut self, now: Instant) {
        if !self.timer.is_calibrated() {
            self.dispatch(TimerEvent::SetGoal(self.goal_input.clone()), now);
        }
    }

    /// Apply a staged goal, then start. A goal at or below the count is
    /// reached right here and counting stays off.
    fn start_counting(&mut self, now: Instant) {
        if self.goal_staged() {
            self.dispatch(TimerEvent::SetGoal(self.goal_input.clone()), now);
        }
        self.dispatch(TimerEvent::StartCounting, now);
    }

    pub fn on_tick(&mut self, now: Instant) {
        self.dispatch(TimerEvent::Tick, now);
        self.poll_cue(now);
        self.poll_visitors();

        if self
            .notice
            .as_ref()
            .is_some_and(|n| now.saturating_duration_since(n.shown_at) >= NOTICE_TTL)
        {
            self.notice = None;
        }
    }

    /// Feed one event to the timer and route its lifecycle output.
    pub fn dispatch(&mut self, event: TimerEvent, now: Instant) -> Vec<Lifecycle> {
        let emitted = self.timer.handle(event, now);
        for lifecycle in &emitted {
            match lifecycle {
                Lifecycle::CalibrationStarted => {
                    if let Some(worker) = &self.cue_worker {
                        worker.prime();
                    }
                }
                Lifecycle::GoalReached { rounds } => self.request_cue(*rounds, now),
                Lifecycle::Reset => {
                    self.goal_input = self.config.default_goal.to_string();
                    self.notice = None;
                    self.cue_request = None;
                }
                Lifecycle::Calibrated { .. }
                | Lifecycle::CountingStarted { .. }
                | Lifecycle::RoundCompleted { .. } => {}
            }
        }
        emitted
    }

    fn request_cue(&mut self, rounds: u32, now: Instant) {
        info!(rounds, action = %self.config.goal_action, "requesting goal cue");
        let Some(cue) = self.cue.clone() else {
            if self.config.goal_action == GoalAction::Clip {
                self.show_notice("No sound clip configured", NoticeLevel::Warning, now);
            }
            self.timer.playback_finished();
            return;
        };
        match &self.cue_worker {
            Some(worker) => self.cue_request = Some(worker.request(cue, self.config.cue_repeat)),
            None => {
                self.timer.playback_finished();
            }
        }
    }

    fn poll_cue(&mut self, now: Instant) {
        while let Some(report) = self.cue_worker.as_ref().and_then(CueWorker::try_outcome) {
            if self.cue_request != Some(report.request) {
                debug!(request = report.request, "ignoring outcome of an earlier cue");
                continue;
            }
            self.cue_request = None;
            if let CueOutcome::Failed(reason) = &report.outcome {
                warn!(reason = %reason, "goal cue failed");
                self.show_notice(
                    &format!("Could not play the goal sound: {reason}"),
                    NoticeLevel::Warning,
                    now,
                );
            }
            self.dispatch(TimerEvent::PlaybackFinished, now);
        }
    }

    fn poll_visitors(&mut self) {
        let Some(rx) = &self.visitors else {
            return;
        };
        match rx.try_recv() {
            Ok(count) => {
                // 0 means the store was unavailable; keep the badge hidden
                self.visitor_count = (count > 0).then_some(count);
                self.visitors = None;
            }
            Err(TryRecvError::Empty) => {}
            Err(TryRecvError::Disconnected) => self.visitors = None,
        }
    }

    pub fn show_notice(&mut self, text: &str, level: NoticeLevel, now: Instant) {
        self.notice = Some(Notice {
            text: text.to_string(),
            level,
            shown_at: now,
        });
    }
}

use std::time::{Duration, Instant};

/// Where the session is in the calibrate-then-count lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalibrationState {
    Idle,
    Calibrating { started_at: Instant },
    Calibrated,
}

impl CalibrationState {
    pub fn label(&self) -> &'static str {
        match self {
            CalibrationState::Idle => "idle",
            CalibrationState::Calibrating { .. } => "calibrating",
            CalibrationState::Calibrated => "calibrated",
        }
    }
}

/// A repeating timer owned by the session. Dropping it cancels it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepeatingTimer {
    period: Duration,
    next_fire: Instant,
}

impl RepeatingTimer {
    pub fn arm(period: Duration, now: Instant) -> Self {
        Self {
            period,
            next_fire: now + period,
        }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Returns whether one period has elapsed by `now`, advancing the next
    /// fire time when it has. Call repeatedly to drain several overdue periods.
    ///
    /// A zero period fires once per poll so that a degenerate calibration
    /// cannot spin the caller.
    pub fn fire_once(&mut self, now: Instant) -> bool {
        if now < self.next_fire {
            return false;
        }
        self.next_fire = if self.period.is_zero() {
            now + Duration::from_nanos(1)
        } else {
            self.next_fire + self.period
        };
        true
    }
}

/// The single live counting session.
#[derive(Debug, Clone)]
pub struct Session {
    pub round_count: u32,
    pub goal_rounds: u32,
    pub calibration: CalibrationState,
    pub round_duration: Option<Duration>,
    pub timer: Option<RepeatingTimer>,
    pub cue_pending: bool,
}

impl Session {
    pub fn new(goal_rounds: u32) -> Self {
        Self {
            round_count: 0,
            goal_rounds,
            calibration: CalibrationState::Idle,
            round_duration: None,
            timer: None,
            cue_pending: false,
        }
    }

    /// Derived on every read; a goal of 0 means "no goal yet".
    pub fn goal_reached(&self) -> bool {
        self.goal_rounds > 0 && self.round_count > 0 && self.round_count >= self.goal_rounds
    }

    pub fn is_counting(&self) -> bool {
        self.timer.is_some()
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new(crate::config::DEFAULT_GOAL)
    }
}

/// Parse raw goal input. Anything that is not a positive integer becomes 0.
///
/// Leading digits are honoured the way a lenient number field reads them,
/// so `"12abc"` is 12 while `"abc"` is 0.
pub fn parse_goal(input: &str) -> u32 {
    let trimmed = input.trim_start();
    let (negative, digits) = match trimmed.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, trimmed.strip_prefix('+').unwrap_or(trimmed)),
    };
    let end = digits
        .char_indices()
        .find(|(_, c)| !c.is_ascii_digit())
        .map(|(i, _)| i)
        .unwrap_or(digits.len());

    if negative || end == 0 {
        return 0;
    }
    digits[..end].parse::<u32>().unwrap_or(u32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_goal_accepts_plain_numbers() {
        assert_eq!(parse_goal("10"), 10);
        assert_eq!(parse_goal("  7"), 7);
        assert_eq!(parse_goal("+3"), 3);
    }

    #[test]
    fn parse_goal_normalizes_garbage_to_zero() {
        assert_eq!(parse_goal("abc"), 0);
        assert_eq!(parse_goal(""), 0);
        assert_eq!(parse_goal("-5"), 0);
        assert_eq!(parse_goal("0"), 0);
    }

    #[test]
    fn parse_goal_reads_leading_digits() {
        assert_eq!(parse_goal("12abc"), 12);
        assert_eq!(parse_goal("4.5"), 4);
    }

    #[test]
    fn parse_goal_saturates_on_overflow() {
        assert_eq!(parse_goal("99999999999999"), u32::MAX);
    }

    #[test]
    fn goal_reached_is_derived() {
        let mut session = Session::new(3);
        assert!(!session.goal_reached());
        session.round_count = 3;
        assert!(session.goal_reached());
        session.goal_rounds = 4;
        assert!(!session.goal_reached());
        session.goal_rounds = 0;
        assert!(!session.goal_reached());
    }

    #[test]
    fn zero_count_never_reaches_goal() {
        let session = Session::new(1);
        assert_eq!(session.round_count, 0);
        assert!(!session.goal_reached());
    }

    #[test]
    fn timer_fires_once_per_elapsed_period() {
        let t0 = Instant::now();
        let mut timer = RepeatingTimer::arm(Duration::from_millis(100), t0);

        assert!(!timer.fire_once(t0 + Duration::from_millis(99)));
        assert!(timer.fire_once(t0 + Duration::from_millis(100)));
        assert!(!timer.fire_once(t0 + Duration::from_millis(150)));

        let late = t0 + Duration::from_millis(420);
        let mut fired = 0;
        while timer.fire_once(late) {
            fired += 1;
        }
        assert_eq!(fired, 3);
    }

    #[test]
    fn zero_period_timer_fires_once_per_poll() {
        let t0 = Instant::now();
        let mut timer = RepeatingTimer::arm(Duration::ZERO, t0);
        assert!(timer.fire_once(t0));
        assert!(!timer.fire_once(t0));
    }
}

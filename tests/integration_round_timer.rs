use std::time::{Duration, Instant};

use assert_matches::assert_matches;
use roundcount::round_timer::{Lifecycle, RoundTimer, TimerSettings};
use roundcount::session::CalibrationState;

fn ms(n: u64) -> Duration {
    Duration::from_millis(n)
}

fn goal_count(events: &[Lifecycle]) -> usize {
    events
        .iter()
        .filter(|e| matches!(e, Lifecycle::GoalReached { .. }))
        .count()
}

#[test]
fn calibration_measures_wall_clock_round() {
    let mut timer = RoundTimer::default();
    timer.start_calibration(Instant::now());
    std::thread::sleep(ms(30));
    timer.stop_calibration(Instant::now());

    let millis = timer.round_duration_millis().unwrap();
    assert!((30..500).contains(&millis), "calibrated {millis} ms");
    assert_eq!(timer.round_count(), 1);
}

#[test]
fn k_ticks_add_k_rounds_until_goal() {
    for goal in 2..8u32 {
        for period in [50u64, 333, 2000] {
            let t0 = Instant::now();
            let mut timer = RoundTimer::default();
            timer.start_calibration(t0);
            timer.stop_calibration(t0 + ms(period));
            timer.set_goal(&goal.to_string());

            let start = t0 + ms(period);
            timer.start_counting(start);

            let mut goal_events = 0;
            for k in 1..=(goal as u64 + 5) {
                goal_events += goal_count(&timer.tick(start + ms(period * k)));
                let expected = (1 + k as u32).min(goal);
                assert_eq!(timer.round_count(), expected, "goal {goal} period {period} k {k}");
            }
            assert_eq!(goal_events, 1);
            assert!(!timer.is_counting());
        }
    }
}

#[test]
fn reset_from_every_state() {
    let t0 = Instant::now();
    let build: Vec<Box<dyn Fn() -> RoundTimer>> = vec![
        Box::new(RoundTimer::default),
        Box::new(move || {
            let mut t = RoundTimer::default();
            t.start_calibration(t0);
            t
        }),
        Box::new(move || {
            let mut t = RoundTimer::default();
            t.start_calibration(t0);
            t.stop_calibration(t0 + ms(100));
            t
        }),
        Box::new(move || {
            let mut t = RoundTimer::default();
            t.start_calibration(t0);
            t.stop_calibration(t0 + ms(100));
            t.start_counting(t0 + ms(100));
            t.tick(t0 + ms(300));
            t
        }),
        Box::new(move || {
            let mut t = RoundTimer::default();
            t.set_goal("1");
            t.start_calibration(t0);
            t.stop_calibration(t0 + ms(100));
            t
        }),
    ];

    for make in build {
        let mut timer = make();
        timer.reset();
        assert_eq!(timer.round_count(), 0);
        assert_eq!(timer.calibration(), CalibrationState::Idle);
        assert_eq!(timer.round_duration(), None);
        assert!(!timer.goal_reached());
        assert!(!timer.is_counting());
        assert!(timer.tick(t0 + ms(60_000)).is_empty());
    }
}

#[test]
fn goal_at_or_below_count_is_reached_without_tick() {
    let t0 = Instant::now();
    let mut timer = RoundTimer::default();
    timer.start_calibration(t0);
    timer.stop_calibration(t0 + ms(100));
    timer.set_goal("50");
    timer.start_counting(t0 + ms(100));
    timer.tick(t0 + ms(700));
    assert_eq!(timer.round_count(), 7);

    let events = timer.set_goal("7");
    assert!(timer.goal_reached());
    assert_matches!(events.as_slice(), [Lifecycle::GoalReached { rounds: 7 }]);
}

#[test]
fn two_second_round_goal_of_three() {
    let t0 = Instant::now();
    let mut timer = RoundTimer::default();
    timer.start_calibration(t0);
    timer.stop_calibration(t0 + ms(2000));
    assert_eq!(timer.round_duration_millis(), Some(2000));
    assert_eq!(timer.round_count(), 1);

    timer.set_goal("3");
    let start = t0 + ms(2000);
    timer.start_counting(start);

    let mut events = Vec::new();
    events.extend(timer.tick(start + ms(2000)));
    events.extend(timer.tick(start + ms(4000)));
    events.extend(timer.tick(start + ms(6000)));

    assert_eq!(timer.round_count(), 3);
    assert!(timer.goal_reached());
    assert!(!timer.is_counting());
    assert_eq!(goal_count(&events), 1);
}

#[test]
fn non_numeric_goal_stays_unreached() {
    let t0 = Instant::now();
    let mut timer = RoundTimer::default();
    timer.set_goal("abc");
    assert_eq!(timer.goal_rounds(), 0);

    timer.start_calibration(t0);
    timer.stop_calibration(t0 + ms(10));
    timer.start_counting(t0 + ms(10));
    timer.tick(t0 + ms(1000));
    assert!(timer.round_count() > 50);
    assert!(!timer.goal_reached());

    timer.set_goal("3");
    assert!(timer.goal_reached());
}

#[test]
fn offset_setting_extends_each_round() {
    let t0 = Instant::now();
    let mut timer = RoundTimer::new(TimerSettings {
        default_goal: 3,
        calibration_offset: Duration::from_secs(10),
    });
    timer.start_calibration(t0);
    timer.stop_calibration(t0 + ms(2000));
    assert_eq!(timer.round_duration_millis(), Some(12_000));

    timer.start_counting(t0 + ms(2000));
    timer.tick(t0 + ms(2000 + 11_999));
    assert_eq!(timer.round_count(), 1);
    timer.tick(t0 + ms(2000 + 12_000));
    assert_eq!(timer.round_count(), 2);

    timer.reset();
    assert_eq!(timer.goal_rounds(), 3);
}

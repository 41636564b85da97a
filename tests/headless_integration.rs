use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use roundcount::app::{App, Control};
use roundcount::config::{Config, GoalAction};
use roundcount::runtime::{AppEvent, FixedTicker, Runner, TestEventSource};

fn key(code: KeyCode) -> AppEvent {
    AppEvent::Key(KeyEvent::new(code, KeyModifiers::NONE))
}

fn quiet_config() -> Config {
    Config {
        goal_action: GoalAction::None,
        count_visitors: false,
        ..Config::default()
    }
}

/// Drive the app like the binary does, until `done` or the step budget runs out.
fn drive<F: Fn(&App) -> bool>(app: &mut App, runner: &Runner<TestEventSource, FixedTicker>, done: F) {
    for _ in 0..2_000u32 {
        match runner.step() {
            AppEvent::Tick => app.on_tick(Instant::now()),
            AppEvent::Resize => {}
            AppEvent::Key(k) => {
                if app.on_key(k, Instant::now()) == Control::Quit {
                    return;
                }
            }
        }
        if done(app) {
            return;
        }
    }
}

// Headless integration using the internal runtime without a TTY:
// calibrate, set a goal of 3, start, and wait for the counter to stop.
#[test]
fn headless_counting_flow_reaches_goal() {
    let mut app = App::new(quiet_config());
    let (tx, rx) = mpsc::channel();
    let runner = Runner::new(
        TestEventSource::new(rx),
        FixedTicker::new(Duration::from_millis(5)),
    );

    let producer = thread::spawn(move || {
        // goal before calibrating applies on every keystroke
        tx.send(key(KeyCode::Backspace)).unwrap();
        tx.send(key(KeyCode::Backspace)).unwrap();
        tx.send(key(KeyCode::Char('3'))).unwrap();
        tx.send(key(KeyCode::Char(' '))).unwrap();
        thread::sleep(Duration::from_millis(80));
        tx.send(key(KeyCode::Char(' '))).unwrap();
        tx.send(key(KeyCode::Char(' '))).unwrap();
        tx
    });

    drive(&mut app, &runner, |a| a.timer.goal_reached());
    let _tx = producer.join().unwrap();

    let duration = app.timer.round_duration_millis().expect("calibrated");
    assert!(duration >= 60, "round duration {duration} shorter than calibration");
    assert_eq!(app.timer.goal_rounds(), 3);
    assert_eq!(app.timer.round_count(), 3);
    assert!(app.timer.goal_reached());
    assert!(!app.timer.is_counting());
}

#[test]
fn headless_no_rounds_after_goal() {
    let mut app = App::new(quiet_config());
    let t0 = Instant::now();
    app.on_key(KeyEvent::new(KeyCode::Backspace, KeyModifiers::NONE), t0);
    app.on_key(KeyEvent::new(KeyCode::Backspace, KeyModifiers::NONE), t0);
    app.on_key(KeyEvent::new(KeyCode::Char('2'), KeyModifiers::NONE), t0);
    app.on_key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::NONE), t0);
    app.on_key(
        KeyEvent::new(KeyCode::Char('c'), KeyModifiers::NONE),
        t0 + Duration::from_millis(10),
    );
    app.on_key(
        KeyEvent::new(KeyCode::Char('s'), KeyModifiers::NONE),
        t0 + Duration::from_millis(10),
    );

    for i in 1..=20u64 {
        app.on_tick(t0 + Duration::from_millis(10 + i * 10));
    }
    assert_eq!(app.timer.round_count(), 2);
}

#[test]
fn headless_quit_stops_the_loop() {
    let mut app = App::new(quiet_config());
    let (tx, rx) = mpsc::channel();
    let runner = Runner::new(
        TestEventSource::new(rx),
        FixedTicker::new(Duration::from_millis(5)),
    );
    tx.send(key(KeyCode::Char(' '))).unwrap();
    tx.send(key(KeyCode::Esc)).unwrap();
    tx.send(key(KeyCode::Char(' '))).unwrap();

    drive(&mut app, &runner, |_| false);

    // the second space was never processed
    assert!(app.timer.is_calibrating());
}

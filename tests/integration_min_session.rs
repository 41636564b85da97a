// Drives the compiled binary through a PTY: calibrate a round, start
// counting, and quit. Needs a pseudo terminal, so it is unix-only and
// ignored by default.
// Run via: `cargo test --test integration_min_session -- --ignored`.

#![cfg(unix)]

use std::time::Duration;

use expectrl::{spawn, Eof};

#[test]
#[ignore]
fn minimal_session_counts_and_exits() -> Result<(), Box<dyn std::error::Error>> {
    let bin = assert_cmd::cargo::cargo_bin("roundcount");
    let cmd = format!("{} --no-visitors -a none -g 2", bin.display());

    let mut p = spawn(cmd)?;
    std::thread::sleep(Duration::from_millis(200));

    // start and stop calibration, then start counting
    p.send(" ")?;
    std::thread::sleep(Duration::from_millis(100));
    p.send(" ")?;
    p.send(" ")?;
    std::thread::sleep(Duration::from_millis(300));

    p.send("q")?;
    p.expect(Eof)?;
    Ok(())
}

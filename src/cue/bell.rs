use std::io::Write;
use std::thread;
use std::time::Duration;

use super::{Cue, CueError, CuePlayer};

const BEL: &[u8] = b"\x07";

/// Rings the terminal bell for the length of a tone cue.
pub struct TerminalBell<W: Write + Send + 'static> {
    out: W,
}

impl<W: Write + Send + 'static> TerminalBell<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write + Send + 'static> CuePlayer for TerminalBell<W> {
    fn play(&mut self, cue: &Cue) -> Result<(), CueError> {
        let duration = match cue {
            Cue::Tone { duration, .. } => *duration,
            _ => Duration::ZERO,
        };
        self.out.write_all(BEL)?;
        self.out.flush()?;
        // a bell has no length of its own; hold for the tone so repeats stay apart
        thread::sleep(duration);
        Ok(())
    }
}

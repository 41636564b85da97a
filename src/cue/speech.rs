use std::process::{Command, Stdio};

use tracing::debug;

use super::{Cue, CueError, CuePlayer};

/// Speaks text through an external TTS program and waits for it to exit.
#[derive(Debug, Clone)]
pub struct SpeechPlayer {
    program: Option<String>,
    args: Vec<String>,
}

impl SpeechPlayer {
    /// `command` is a program followed by optional arguments; the text to
    /// speak is appended as the final argument.
    pub fn new(command: &str) -> Self {
        let mut parts = command.split_whitespace().map(str::to_string);
        Self {
            program: parts.next(),
            args: parts.collect(),
        }
    }

    pub fn platform_default() -> Self {
        if cfg!(target_os = "macos") {
            Self::new("say")
        } else if cfg!(target_os = "linux") {
            Self::new("espeak")
        } else {
            Self {
                program: None,
                args: Vec::new(),
            }
        }
    }

    pub fn program(&self) -> Option<&str> {
        self.program.as_deref()
    }
}

impl CuePlayer for SpeechPlayer {
    fn play(&mut self, cue: &Cue) -> Result<(), CueError> {
        let Cue::Speech(text) = cue else {
            return Err(CueError::Unavailable(
                "speech backend only plays text".to_string(),
            ));
        };
        let Some(program) = &self.program else {
            return Err(CueError::Unavailable(
                "no speech command configured".to_string(),
            ));
        };

        debug!(program = %program, "speaking cue");
        let status = Command::new(program)
            .args(&self.args)
            .arg(text)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map_err(|e| CueError::Unavailable(format!("{program}: {e}")))?;

        if status.success() {
            Ok(())
        } else {
            Err(CueError::Playback(format!("{program} exited with {status}")))
        }
    }
}
